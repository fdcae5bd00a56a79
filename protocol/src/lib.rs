// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Lockbox Protocol — Core Primitives
//!
//! The building blocks the vault ledger stands on. Nothing in here knows what
//! a vault is; it only knows who is asking, what time it is, and whether a
//! signature checks out.
//!
//! - **config** — policy constants: lock durations, grace period, limits.
//! - **clock** — the injected time source. The ledger never calls `now()` on
//!   the OS directly.
//! - **identity** — principals and callback-target identities.
//! - **crypto** — 33-byte auth keys, signatures, digests, and the
//!   [`SignatureVerifier`](crypto::SignatureVerifier) seam.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod identity;
