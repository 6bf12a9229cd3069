use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::FheError;
use crate::types::CiphertextHandle;

/// Backing storage for the mock coprocessor's ciphertexts
pub trait CiphertextTable: Send + Sync {
    fn put(&self, handle: &CiphertextHandle, value: u32) -> Result<(), FheError>;

    fn get(&self, handle: &CiphertextHandle) -> Result<Option<u32>, FheError>;
}

/// Process-local ciphertext table
#[derive(Default)]
pub struct MemoryTable {
    values: RwLock<HashMap<CiphertextHandle, u32>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CiphertextTable for MemoryTable {
    fn put(&self, handle: &CiphertextHandle, value: u32) -> Result<(), FheError> {
        self.values
            .write()
            .map_err(|_| FheError::Storage("ciphertext table poisoned".into()))?
            .insert(*handle, value);
        Ok(())
    }

    fn get(&self, handle: &CiphertextHandle) -> Result<Option<u32>, FheError> {
        Ok(self
            .values
            .read()
            .map_err(|_| FheError::Storage("ciphertext table poisoned".into()))?
            .get(handle)
            .copied())
    }
}
