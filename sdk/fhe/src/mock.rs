//! Mock coprocessor
//!
//! Keeps plaintexts in a [`CiphertextTable`] behind keyed-BLAKE3 handles. It
//! offers no confidentiality against whoever holds the table; it only enforces
//! the same access rules a real coprocessor would:
//!
//! ```text
//! handle = BLAKE3_k( "handle" || epoch || seq )
//! proof  = BLAKE3_k( "input"  || handle || submitter )
//! token  = BLAKE3_k( "grant"  || handle || grantee || purpose || nonce )
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::error::FheError;
use crate::service::EncryptedValueService;
use crate::table::CiphertextTable;
use crate::types::{
    CiphertextHandle, DecryptAuthorization, DisclosurePurpose, EncryptedInput, InputProof,
};
use scribe_paper::Principal;

const KEY_CONTEXT: &str = "cipher-scribe mock coprocessor v1";

/// Unredeemed grants kept before the oldest are evicted
pub const DEFAULT_GRANT_LIMIT: usize = 4096;

struct Grant {
    handle: CiphertextHandle,
    grantee: Principal,
    purpose: DisclosurePurpose,
    nonce: u64,
}

impl Grant {
    fn covers(
        &self,
        handle: &CiphertextHandle,
        grantee: &Principal,
        purpose: DisclosurePurpose,
    ) -> bool {
        self.handle == *handle && self.grantee == *grantee && self.purpose == purpose
    }
}

pub struct MockCoprocessor<T: CiphertextTable> {
    key: [u8; 32],
    table: T,
    /// Distinguishes handles minted by different process lifetimes
    epoch: u128,
    sequence: AtomicU64,
    grant_nonce: AtomicU64,
    grants: Mutex<HashMap<[u8; 32], Grant>>,
    grant_limit: usize,
}

impl<T: CiphertextTable> MockCoprocessor<T> {
    /// Derive the coprocessor key from `seed` and serve ciphertexts out of `table`
    pub fn new(seed: &str, table: T) -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        Self {
            key: blake3::derive_key(KEY_CONTEXT, seed.as_bytes()),
            table,
            epoch,
            sequence: AtomicU64::new(0),
            grant_nonce: AtomicU64::new(0),
            grants: Mutex::new(HashMap::new()),
            grant_limit: DEFAULT_GRANT_LIMIT,
        }
    }

    /// Cap on unredeemed grants. Once reached, issuing a grant evicts the oldest.
    pub fn with_grant_limit(mut self, limit: usize) -> Self {
        self.grant_limit = limit.max(1);
        self
    }

    /// Number of decryption grants not yet consumed
    pub fn outstanding_grants(&self) -> usize {
        self.grants.lock().map(|g| g.len()).unwrap_or(0)
    }

    fn mint(&self, value: u32) -> Result<CiphertextHandle, FheError> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);

        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(b"handle");
        hasher.update(&self.epoch.to_le_bytes());
        hasher.update(&seq.to_le_bytes());
        let handle = CiphertextHandle(*hasher.finalize().as_bytes());

        self.table.put(&handle, value)?;
        Ok(handle)
    }

    fn load(&self, handle: &CiphertextHandle) -> Result<u32, FheError> {
        self.table
            .get(handle)?
            .ok_or_else(|| FheError::UnknownHandle(handle.to_hex()))
    }

    fn input_tag(&self, handle: &CiphertextHandle, submitter: &Principal) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(b"input");
        hasher.update(&handle.0);
        hasher.update(submitter.as_bytes());
        hasher.finalize()
    }

    fn grant_token(
        &self,
        handle: &CiphertextHandle,
        grantee: &Principal,
        purpose: DisclosurePurpose,
        nonce: u64,
    ) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(b"grant");
        hasher.update(&handle.0);
        hasher.update(grantee.as_bytes());
        hasher.update(&[purpose.tag()]);
        hasher.update(&nonce.to_le_bytes());
        *hasher.finalize().as_bytes()
    }
}

impl<T: CiphertextTable> EncryptedValueService for MockCoprocessor<T> {
    fn encrypt(&self, plaintext: u32, submitter: &Principal) -> Result<EncryptedInput, FheError> {
        let handle = self.mint(plaintext)?;
        let proof = InputProof(self.input_tag(&handle, submitter).as_bytes().to_vec());
        debug!("encrypted input {} for {}", handle, submitter.short());
        Ok(EncryptedInput { handle, proof })
    }

    fn verify_proof(
        &self,
        handle: &CiphertextHandle,
        proof: &InputProof,
        submitter: &Principal,
    ) -> Result<(), FheError> {
        let given: [u8; 32] = proof
            .0
            .as_slice()
            .try_into()
            .map_err(|_| FheError::InvalidProof(handle.to_hex()))?;

        // blake3::Hash equality is constant time
        if self.input_tag(handle, submitter) != blake3::Hash::from(given) {
            return Err(FheError::InvalidProof(handle.to_hex()));
        }

        self.load(handle).map(|_| ())
    }

    fn trivial_encrypt(&self, plaintext: u32) -> Result<CiphertextHandle, FheError> {
        self.mint(plaintext)
    }

    fn add(
        &self,
        lhs: &CiphertextHandle,
        rhs: &CiphertextHandle,
    ) -> Result<CiphertextHandle, FheError> {
        let sum = self.load(lhs)?.wrapping_add(self.load(rhs)?);
        self.mint(sum)
    }

    fn min_scalar(
        &self,
        handle: &CiphertextHandle,
        bound: u32,
    ) -> Result<CiphertextHandle, FheError> {
        let value = self.load(handle)?;
        self.mint(value.min(bound))
    }

    fn max_scalar(
        &self,
        handle: &CiphertextHandle,
        bound: u32,
    ) -> Result<CiphertextHandle, FheError> {
        let value = self.load(handle)?;
        self.mint(value.max(bound))
    }

    fn grant_decrypt(
        &self,
        handle: &CiphertextHandle,
        grantee: &Principal,
        purpose: DisclosurePurpose,
    ) -> Result<DecryptAuthorization, FheError> {
        // Grants are only issued for live ciphertexts
        self.load(handle)?;

        let nonce = self.grant_nonce.fetch_add(1, Ordering::SeqCst);
        let token = self.grant_token(handle, grantee, purpose, nonce);

        let mut grants = self
            .grants
            .lock()
            .map_err(|_| FheError::Storage("grant table poisoned".into()))?;

        // A new grant supersedes any unredeemed one for the same request
        grants.retain(|_, g| !g.covers(handle, grantee, purpose));
        while grants.len() >= self.grant_limit {
            let oldest = grants
                .iter()
                .min_by_key(|(_, g)| g.nonce)
                .map(|(token, _)| *token);
            match oldest {
                Some(token) => {
                    debug!("evicting unredeemed grant {}", hex::encode(&token[..4]));
                    grants.remove(&token);
                }
                None => break,
            }
        }
        grants.insert(
            token,
            Grant {
                handle: *handle,
                grantee: *grantee,
                purpose,
                nonce,
            },
        );
        drop(grants);

        Ok(DecryptAuthorization {
            handle: *handle,
            grantee: *grantee,
            purpose,
            token,
        })
    }

    fn decrypt(
        &self,
        authorization: &DecryptAuthorization,
        requester: &Principal,
    ) -> Result<u32, FheError> {
        let mut grants = self
            .grants
            .lock()
            .map_err(|_| FheError::Storage("grant table poisoned".into()))?;

        let grant = grants
            .get(&authorization.token)
            .ok_or_else(|| FheError::Unauthorized("unknown or already used grant".into()))?;

        if grant.handle != authorization.handle
            || grant.grantee != authorization.grantee
            || grant.purpose != authorization.purpose
        {
            return Err(FheError::Unauthorized("grant does not match request".into()));
        }
        if grant.grantee != *requester {
            return Err(FheError::Unauthorized(format!(
                "grant belongs to {}",
                grant.grantee.short()
            )));
        }

        let value = self.load(&authorization.handle)?;
        grants.remove(&authorization.token);
        Ok(value)
    }

    fn reveal(&self, handle: &CiphertextHandle) -> Result<u32, FheError> {
        self.load(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::MemoryTable;

    fn coprocessor() -> MockCoprocessor<MemoryTable> {
        MockCoprocessor::new("test-seed", MemoryTable::new())
    }

    #[test]
    fn test_encrypt_and_verify() {
        let fhe = coprocessor();
        let alice = Principal::from_label("alice");

        let input = fhe.encrypt(7, &alice).unwrap();
        assert!(fhe.verify_proof(&input.handle, &input.proof, &alice).is_ok());
    }

    #[test]
    fn test_proof_bound_to_submitter() {
        let fhe = coprocessor();
        let alice = Principal::from_label("alice");
        let bob = Principal::from_label("bob");

        let input = fhe.encrypt(7, &alice).unwrap();
        let err = fhe.verify_proof(&input.handle, &input.proof, &bob).unwrap_err();
        assert!(matches!(err, FheError::InvalidProof(_)));
    }

    #[test]
    fn test_malformed_proof_rejected() {
        let fhe = coprocessor();
        let alice = Principal::from_label("alice");
        let input = fhe.encrypt(3, &alice).unwrap();

        let err = fhe
            .verify_proof(&input.handle, &InputProof(vec![1, 2, 3]), &alice)
            .unwrap_err();
        assert!(matches!(err, FheError::InvalidProof(_)));
    }

    #[test]
    fn test_clamp_bounds_values() {
        let fhe = coprocessor();

        let high = fhe.trivial_encrypt(12).unwrap();
        let mid = fhe.trivial_encrypt(8).unwrap();
        let clamped_high = fhe.clamp(&high, 0, 10).unwrap();
        let clamped_mid = fhe.clamp(&mid, 0, 10).unwrap();

        assert_eq!(fhe.reveal(&clamped_high).unwrap(), 10);
        assert_eq!(fhe.reveal(&clamped_mid).unwrap(), 8);

        let low = fhe.trivial_encrypt(1).unwrap();
        assert_eq!(fhe.reveal(&fhe.clamp(&low, 2, 10).unwrap()).unwrap(), 2);
    }

    #[test]
    fn test_add_produces_fresh_handle() {
        let fhe = coprocessor();
        let a = fhe.trivial_encrypt(10).unwrap();
        let b = fhe.trivial_encrypt(8).unwrap();

        let sum = fhe.add(&a, &b).unwrap();
        assert_ne!(sum, a);
        assert_ne!(sum, b);
        assert_eq!(fhe.reveal(&sum).unwrap(), 18);
    }

    #[test]
    fn test_grant_is_single_use() {
        let fhe = coprocessor();
        let alice = Principal::from_label("alice");
        let handle = fhe.trivial_encrypt(18).unwrap();

        let auth = fhe
            .grant_decrypt(&handle, &alice, DisclosurePurpose::TotalShare)
            .unwrap();
        assert_eq!(fhe.outstanding_grants(), 1);
        assert_eq!(fhe.decrypt(&auth, &alice).unwrap(), 18);
        assert_eq!(fhe.outstanding_grants(), 0);

        let err = fhe.decrypt(&auth, &alice).unwrap_err();
        assert!(matches!(err, FheError::Unauthorized(_)));
    }

    #[test]
    fn test_grant_scoped_to_grantee_and_purpose() {
        let fhe = coprocessor();
        let alice = Principal::from_label("alice");
        let bob = Principal::from_label("bob");
        let handle = fhe.trivial_encrypt(5).unwrap();

        let auth = fhe
            .grant_decrypt(&handle, &alice, DisclosurePurpose::FinalScore)
            .unwrap();

        assert!(fhe.decrypt(&auth, &bob).is_err(), "other principal must not decrypt");

        let mut forged = auth.clone();
        forged.purpose = DisclosurePurpose::TotalShare;
        assert!(fhe.decrypt(&forged, &alice).is_err());

        // Failed attempts leave the grant usable by its owner
        assert_eq!(fhe.decrypt(&auth, &alice).unwrap(), 5);
    }

    #[test]
    fn test_repeated_grant_replaces_previous() {
        let fhe = coprocessor();
        let carol = Principal::from_label("carol");
        let handle = fhe.trivial_encrypt(9).unwrap();

        let first = fhe
            .grant_decrypt(&handle, &carol, DisclosurePurpose::TotalShare)
            .unwrap();
        for _ in 0..1_000 {
            fhe.grant_decrypt(&handle, &carol, DisclosurePurpose::TotalShare)
                .unwrap();
        }
        assert_eq!(fhe.outstanding_grants(), 1);

        // Superseded grant is gone; the newest one still works
        assert!(fhe.decrypt(&first, &carol).is_err());
        let latest = fhe
            .grant_decrypt(&handle, &carol, DisclosurePurpose::TotalShare)
            .unwrap();
        assert_eq!(fhe.decrypt(&latest, &carol).unwrap(), 9);
    }

    #[test]
    fn test_grant_limit_evicts_oldest() {
        let fhe = coprocessor().with_grant_limit(4);
        let handle = fhe.trivial_encrypt(3).unwrap();

        let mut auths = Vec::new();
        for i in 0..10 {
            let who = Principal::from_label(&format!("reader-{i}"));
            let auth = fhe
                .grant_decrypt(&handle, &who, DisclosurePurpose::FinalScore)
                .unwrap();
            auths.push((who, auth));
        }
        assert_eq!(fhe.outstanding_grants(), 4);

        let (oldest, auth) = &auths[0];
        assert!(fhe.decrypt(auth, oldest).is_err());
        let (newest, auth) = &auths[9];
        assert_eq!(fhe.decrypt(auth, newest).unwrap(), 3);
    }

    #[test]
    fn test_unknown_handle() {
        let fhe = coprocessor();
        let err = fhe.reveal(&CiphertextHandle([9u8; 32])).unwrap_err();
        assert!(matches!(err, FheError::UnknownHandle(_)));
    }
}
