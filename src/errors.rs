use thiserror::Error;

/// All errors that can occur in CloudVault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Validation errors ---
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // --- Format errors ---
    /// The input stream ended before a fixed-size header could be read.
    #[error("{0}")]
    MalformedInput(String),

    #[error(
        "Ciphertext is too short for authentication tag. Expected at least {expected} bytes but got {actual}."
    )]
    CiphertextTooShort { expected: usize, actual: usize },

    // --- Integrity errors ---
    #[error("Authentication tag mismatch: data was tampered with or the key is wrong")]
    TamperDetected,

    #[error("Padding is invalid and cannot be removed.")]
    InvalidPadding,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    // --- Key derivation errors ---
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Option '{0}' not found")]
    OptionNotFound(String),

    #[error("Option '{key}' has invalid type: expected {expected}, found {actual}")]
    OptionInvalidType {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Unknown key derivation algorithm '{0}'")]
    UnknownAlgorithm(String),

    // --- Random errors ---
    #[error("The random generator has already been released")]
    RandomReleased,

    // --- Storage errors ---
    #[error("Vault '{vault_id}' not found for identity '{identity_id}'")]
    VaultNotFound {
        identity_id: String,
        vault_id: String,
    },

    #[error("Invalid object key: {0}")]
    InvalidObjectKey(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // --- Vault errors ---
    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Secret '{0}' not found")]
    SecretNotFound(String),

    #[error("Secret '{0}' already exists (use update to change it)")]
    SecretAlreadyExists(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for CloudVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
