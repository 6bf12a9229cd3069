use crate::error::FheError;
use crate::types::{
    CiphertextHandle, DecryptAuthorization, DisclosurePurpose, EncryptedInput, InputProof,
};
use scribe_paper::Principal;

/// Capability surface of the FHE coprocessor/relayer.
///
/// All arithmetic is on 32-bit unsigned ciphertexts. Implementations must never
/// expose a plaintext except through [`decrypt`](Self::decrypt) with a valid
/// authorization, or through the diagnostic [`reveal`](Self::reveal).
pub trait EncryptedValueService: Send + Sync {
    /// Encrypt a plaintext on behalf of `submitter`
    fn encrypt(&self, plaintext: u32, submitter: &Principal) -> Result<EncryptedInput, FheError>;

    /// Check that `proof` binds `handle` to `submitter`
    fn verify_proof(
        &self,
        handle: &CiphertextHandle,
        proof: &InputProof,
        submitter: &Principal,
    ) -> Result<(), FheError>;

    /// Publicly known encryption of a constant (used for zero totals)
    fn trivial_encrypt(&self, plaintext: u32) -> Result<CiphertextHandle, FheError>;

    fn add(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, FheError>;

    /// `min(handle, bound)` without decrypting
    fn min_scalar(
        &self,
        handle: &CiphertextHandle,
        bound: u32,
    ) -> Result<CiphertextHandle, FheError>;

    /// `max(handle, bound)` without decrypting
    fn max_scalar(
        &self,
        handle: &CiphertextHandle,
        bound: u32,
    ) -> Result<CiphertextHandle, FheError>;

    /// Bound a ciphertext into `[min, max]`: min against the upper bound first, then max.
    fn clamp(
        &self,
        handle: &CiphertextHandle,
        min: u32,
        max: u32,
    ) -> Result<CiphertextHandle, FheError> {
        let capped = self.min_scalar(handle, max)?;
        self.max_scalar(&capped, min)
    }

    /// Grant `grantee` one decryption of `handle`
    fn grant_decrypt(
        &self,
        handle: &CiphertextHandle,
        grantee: &Principal,
        purpose: DisclosurePurpose,
    ) -> Result<DecryptAuthorization, FheError>;

    /// Decrypt with a previously granted authorization. The grant is consumed.
    fn decrypt(
        &self,
        authorization: &DecryptAuthorization,
        requester: &Principal,
    ) -> Result<u32, FheError>;

    /// Plaintext of any handle, for diagnostics only
    fn reveal(&self, _handle: &CiphertextHandle) -> Result<u32, FheError> {
        Err(FheError::Unsupported("plaintext reveal"))
    }
}
