//! Unified error system for Tessera
//!
//! A single error enum covers every failure the authorization and fee
//! pipelines can report. Each variant carries a human readable message; the
//! variant itself is the stable, matchable part.

use serde::{Deserialize, Serialize};

/// Unified error type for all Tessera operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TesseraError {
    /// Address string could not be decoded
    #[error("Invalid address: {message}")]
    InvalidAddress {
        /// What was wrong with the address
        message: String,
    },

    /// Request failed stateless validation
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message describing the invalid request
        message: String,
    },

    /// Exec was submitted without a grantee
    #[error("Empty grantee: {message}")]
    EmptyGrantee {
        /// Error message
        message: String,
    },

    /// Exec was submitted without messages
    #[error("Empty messages: {message}")]
    EmptyMessages {
        /// Error message
        message: String,
    },

    /// Granter and grantee are the same account
    #[error("Invalid grantee: {message}")]
    InvalidGrantee {
        /// Error message
        message: String,
    },

    /// Authorization constraints are self-inconsistent
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Error message describing the inconsistency
        message: String,
    },

    /// Grant expiration is not in the future
    #[error("Expiration in past: {message}")]
    ExpirationInPast {
        /// Error message
        message: String,
    },

    /// Authorization targets a grant-management message
    #[error("Disallowed target: {message}")]
    DisallowedTarget {
        /// Error message
        message: String,
    },

    /// Exec contains a grant-management message
    #[error("Disallowed nested message: {message}")]
    DisallowedNested {
        /// Error message
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Grant expiration has passed
    #[error("Expired: {message}")]
    Expired {
        /// Error message
        message: String,
    },

    /// Authorization denied the message
    #[error("Denied: {message}")]
    Denied {
        /// Error message describing the denial
        message: String,
    },

    /// Transaction does not expose the expected fields
    #[error("Malformed transaction: {message}")]
    MalformedTx {
        /// Error message
        message: String,
    },

    /// Gas limit is zero outside of genesis and simulation
    #[error("Invalid gas limit: {message}")]
    InvalidGasLimit {
        /// Error message
        message: String,
    },

    /// Offered fee is below the required minimum
    #[error("Insufficient fee: {message}")]
    InsufficientFee {
        /// Error message
        message: String,
    },

    /// Fee coin set is malformed
    #[error("Invalid fee: {message}")]
    InvalidFee {
        /// Error message
        message: String,
    },

    /// Fee grants requested but not configured
    #[error("Fee grants disabled: {message}")]
    GrantsDisabled {
        /// Error message
        message: String,
    },

    /// Fee granter refused to pay
    #[error("Fee grant denied: {message}")]
    FeeGrantDenied {
        /// Error message
        message: String,
    },

    /// Account balance cannot cover a transfer
    #[error("Insufficient funds: {message}")]
    InsufficientFunds {
        /// Error message
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Storage operation failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

/// Coarse classification used when reporting a rejected transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Malformed request, rejected before any state read
    Validation,
    /// Rejected after a state read, no mutation applied
    Authorization,
    /// Rejected after computing requirements, no mutation applied
    Resource,
    /// Caller or programmer error
    Invariant,
    /// Serialization, storage or internal failure; aborts the transaction
    Fatal,
}

macro_rules! constructors {
    ($($fn_name:ident => $variant:ident),* $(,)?) => {
        impl TesseraError {
            $(
                #[doc = concat!("Create a `", stringify!($variant), "` error")]
                pub fn $fn_name(message: impl Into<String>) -> Self {
                    Self::$variant {
                        message: message.into(),
                    }
                }
            )*
        }
    };
}

constructors! {
    invalid_address => InvalidAddress,
    invalid_request => InvalidRequest,
    empty_grantee => EmptyGrantee,
    empty_messages => EmptyMessages,
    invalid_grantee => InvalidGrantee,
    validation_failed => ValidationFailed,
    expiration_in_past => ExpirationInPast,
    disallowed_target => DisallowedTarget,
    disallowed_nested => DisallowedNested,
    not_found => NotFound,
    expired => Expired,
    denied => Denied,
    malformed_tx => MalformedTx,
    invalid_gas_limit => InvalidGasLimit,
    insufficient_fee => InsufficientFee,
    invalid_fee => InvalidFee,
    grants_disabled => GrantsDisabled,
    fee_grant_denied => FeeGrantDenied,
    insufficient_funds => InsufficientFunds,
    serialization => Serialization,
    storage => Storage,
    config => Config,
    internal => Internal,
}

impl TesseraError {
    /// Classify the error for reporting
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidAddress { .. }
            | Self::InvalidRequest { .. }
            | Self::EmptyGrantee { .. }
            | Self::EmptyMessages { .. }
            | Self::ValidationFailed { .. }
            | Self::MalformedTx { .. }
            | Self::InvalidGasLimit { .. }
            | Self::InvalidFee { .. } => ErrorClass::Validation,
            Self::NotFound { .. }
            | Self::Expired { .. }
            | Self::Denied { .. }
            | Self::DisallowedNested { .. }
            | Self::DisallowedTarget { .. } => ErrorClass::Authorization,
            Self::InsufficientFunds { .. }
            | Self::InsufficientFee { .. }
            | Self::FeeGrantDenied { .. }
            | Self::GrantsDisabled { .. } => ErrorClass::Resource,
            Self::InvalidGrantee { .. } | Self::ExpirationInPast { .. } => ErrorClass::Invariant,
            Self::Serialization { .. }
            | Self::Storage { .. }
            | Self::Config { .. }
            | Self::Internal { .. } => ErrorClass::Fatal,
        }
    }

    /// The message carried by the error, without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidAddress { message }
            | Self::InvalidRequest { message }
            | Self::EmptyGrantee { message }
            | Self::EmptyMessages { message }
            | Self::InvalidGrantee { message }
            | Self::ValidationFailed { message }
            | Self::ExpirationInPast { message }
            | Self::DisallowedTarget { message }
            | Self::DisallowedNested { message }
            | Self::NotFound { message }
            | Self::Expired { message }
            | Self::Denied { message }
            | Self::MalformedTx { message }
            | Self::InvalidGasLimit { message }
            | Self::InsufficientFee { message }
            | Self::InvalidFee { message }
            | Self::GrantsDisabled { message }
            | Self::FeeGrantDenied { message }
            | Self::InsufficientFunds { message }
            | Self::Serialization { message }
            | Self::Storage { message }
            | Self::Config { message }
            | Self::Internal { message } => message,
        }
    }

    /// Prefix additional context onto the message, keeping the variant
    pub fn wrap(mut self, context: impl std::fmt::Display) -> Self {
        let wrapped = format!("{context}: {}", self.message());
        match &mut self {
            Self::InvalidAddress { message }
            | Self::InvalidRequest { message }
            | Self::EmptyGrantee { message }
            | Self::EmptyMessages { message }
            | Self::InvalidGrantee { message }
            | Self::ValidationFailed { message }
            | Self::ExpirationInPast { message }
            | Self::DisallowedTarget { message }
            | Self::DisallowedNested { message }
            | Self::NotFound { message }
            | Self::Expired { message }
            | Self::Denied { message }
            | Self::MalformedTx { message }
            | Self::InvalidGasLimit { message }
            | Self::InsufficientFee { message }
            | Self::InvalidFee { message }
            | Self::GrantsDisabled { message }
            | Self::FeeGrantDenied { message }
            | Self::InsufficientFunds { message }
            | Self::Serialization { message }
            | Self::Storage { message }
            | Self::Config { message }
            | Self::Internal { message } => *message = wrapped,
        }
        self
    }
}

/// Standard Result type for Tessera operations
pub type Result<T> = std::result::Result<T, TesseraError>;

impl From<bincode::Error> for TesseraError {
    fn from(err: bincode::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for TesseraError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}
