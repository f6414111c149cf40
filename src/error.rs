use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Address space exhausted: {0}")]
    AddressExhausted(String),

    #[error("Watch registration failed: {0}")]
    WatchRegistrationFailed(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Wallet directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}
