//! Cipher Scribe node library
//!
//! Encrypted peer-review ledger: paper registry, encrypted score aggregation
//! and gated disclosure, plus the storage and HTTP layers that host them.

pub mod api;
pub mod config;
pub mod ledger;
pub mod storage;
