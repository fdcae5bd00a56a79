//! # Callback Journal
//!
//! The callback target bundled with the node. It stands in for any external
//! recipient named on the command line: every release notification is
//! appended as one JSON line to `callbacks.jsonl` in the data directory.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use lockbox_contracts::{CallbackError, ReleaseCallback};
use lockbox_protocol::identity::{ContractId, Principal};
use serde::{Deserialize, Serialize};

/// File name of the journal inside the data directory.
pub const JOURNAL_FILE: &str = "callbacks.jsonl";

/// One line of the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub target: ContractId,
    pub recipient: Principal,
    pub amount: u64,
    /// Wall-clock time of the notification (RFC 3339).
    pub recorded_at: String,
}

/// Appends release notifications for `target` to a JSON-lines file.
pub struct JournalCallback {
    target: ContractId,
    path: PathBuf,
}

impl JournalCallback {
    pub fn new(target: ContractId, data_dir: &Path) -> Self {
        Self {
            target,
            path: data_dir.join(JOURNAL_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReleaseCallback for JournalCallback {
    fn contract_id(&self) -> ContractId {
        self.target.clone()
    }

    fn on_release(&mut self, recipient: &Principal, amount: u64) -> Result<(), CallbackError> {
        let entry = JournalEntry {
            target: self.target.clone(),
            recipient: recipient.clone(),
            amount,
            recorded_at: Utc::now().to_rfc3339(),
        };
        let line =
            serde_json::to_string(&entry).map_err(|e| CallbackError::Unavailable(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                CallbackError::Unavailable(format!("{}: {e}", self.path.display()))
            })?;
        writeln!(file, "{line}").map_err(|e| CallbackError::Unavailable(e.to_string()))?;

        tracing::debug!(target_contract = %self.target, recipient = %recipient, amount, "release journaled");
        Ok(())
    }
}
