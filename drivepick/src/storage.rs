use keyring::Entry;
use thiserror::Error;

const SERVICE_NAME: &str = "drivepick";
const TOKEN_KEY: &str = "api_token";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("keyring error: {0}")]
    KeyringError(#[from] keyring::Error),
    #[error("token not found")]
    TokenNotFound,
}

/// API token kept in the OS keyring.
pub struct TokenStorage {
    entry: Entry,
}

impl TokenStorage {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            entry: Entry::new(SERVICE_NAME, TOKEN_KEY)?,
        })
    }

    pub fn save_token(&self, token: &str) -> Result<(), StorageError> {
        self.entry.set_password(token)?;
        Ok(())
    }

    pub fn get_token(&self) -> Result<String, StorageError> {
        match self.entry.get_password() {
            Ok(token) => Ok(token),
            Err(keyring::Error::NoEntry) => Err(StorageError::TokenNotFound),
            Err(err) => Err(StorageError::KeyringError(err)),
        }
    }

    pub fn delete_token(&self) -> Result<(), StorageError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(StorageError::KeyringError(err)),
        }
    }
}
