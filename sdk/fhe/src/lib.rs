//! Encrypted value service
//!
//! The ledger never sees plaintext scores. Everything it needs from the FHE
//! coprocessor goes through [`EncryptedValueService`]:
//!
//! ```text
//!  reviewer ──encrypt──▶ (handle, proof) ──submit──▶ ledger
//!                                                     │ verify_proof
//!                                                     │ clamp(min, max)
//!                                                     │ add(total, clamped)
//!  requester ◀──decrypt── authorization ◀──grant──────┘
//! ```
//!
//! [`MockCoprocessor`] is a deterministic stand-in used by the dev node and tests.

pub mod error;
pub mod mock;
pub mod service;
pub mod table;
pub mod types;

pub use error::FheError;
pub use mock::MockCoprocessor;
pub use service::EncryptedValueService;
pub use table::{CiphertextTable, MemoryTable};
pub use types::{
    CiphertextHandle, DecryptAuthorization, DisclosurePurpose, EncryptedInput, InputProof,
};
