//! Authorization capabilities
//!
//! An authorization describes what a grantee may do with a granter's
//! account for one message type. Decisions are pure: [`Authorization::accept`]
//! looks only at the capability's own state and the candidate message, and
//! returns the replacement capability instead of mutating in place.
//!
//! Variants are stored behind a type tag inside an [`Any`] envelope and
//! decoded through an [`AuthorizationRegistry`], so new variants can be
//! registered without touching the keeper.

mod generic;
mod send;
mod stake;

pub use generic::{GenericAuthorization, GENERIC_AUTHORIZATION_TYPE_URL};
pub use send::{SendAuthorization, SEND_AUTHORIZATION_TYPE_URL};
pub use stake::{
    StakeAuthorization, StakeAuthorizationType, Validators, STAKE_AUTHORIZATION_TYPE_URL,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tessera_core::codec::{self, Any};
use tessera_core::{Msg, Result, TesseraError};

/// Outcome of presenting a message to an authorization
#[derive(Debug)]
pub struct AcceptResponse {
    /// Whether the message may execute
    pub accept: bool,
    /// Whether the grant is used up and must be deleted
    pub delete: bool,
    /// Replacement capability to persist with the same expiration
    pub updated: Option<Box<dyn Authorization>>,
    /// Why the message was refused, when it was
    pub reason: Option<String>,
}

impl AcceptResponse {
    /// Allow without changing the grant
    pub fn allow() -> Self {
        Self {
            accept: true,
            delete: false,
            updated: None,
            reason: None,
        }
    }

    /// Allow and delete the grant
    pub fn allow_and_consume() -> Self {
        Self {
            delete: true,
            ..Self::allow()
        }
    }

    /// Allow and replace the capability
    pub fn allow_with_update(updated: Box<dyn Authorization>) -> Self {
        Self {
            updated: Some(updated),
            ..Self::allow()
        }
    }

    /// Refuse the message
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            accept: false,
            delete: false,
            updated: None,
            reason: Some(reason.into()),
        }
    }
}

/// A capability governing one message type
pub trait Authorization: fmt::Debug + Send + Sync {
    /// Type tag of this variant, used in the stored envelope
    fn type_url(&self) -> &'static str;

    /// Message type this capability governs
    fn msg_type_url(&self) -> &str;

    /// Check the constraints are self-consistent
    fn validate_basic(&self) -> Result<()>;

    /// Decide whether `msg` may run under this capability
    fn accept(&self, msg: &dyn Msg) -> Result<AcceptResponse>;

    /// Encode the variant payload
    fn encode(&self) -> Result<Vec<u8>>;

    /// Clone behind a box
    fn clone_box(&self) -> Box<dyn Authorization>;
}

impl Clone for Box<dyn Authorization> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Wrap an authorization in its self-describing envelope
pub fn pack(authorization: &dyn Authorization) -> Result<Any> {
    Ok(Any::new(authorization.type_url(), authorization.encode()?))
}

/// Concrete authorization variants with a static type tag
pub trait AuthorizationType:
    Authorization + Clone + Serialize + DeserializeOwned + 'static
{
    /// Type tag under which the variant is registered
    const TYPE_URL: &'static str;
}

fn decode_variant<T: AuthorizationType>(bytes: &[u8]) -> Result<Box<dyn Authorization>> {
    Ok(Box::new(codec::decode::<T>(bytes)?))
}

type DecodeFn = fn(&[u8]) -> Result<Box<dyn Authorization>>;

/// Maps authorization type tags to decoders
#[derive(Clone, Default)]
pub struct AuthorizationRegistry {
    decoders: BTreeMap<String, DecodeFn>,
}

impl fmt::Debug for AuthorizationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationRegistry")
            .field("types", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AuthorizationRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in generic, send and stake variants
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register::<GenericAuthorization>();
        registry.register::<SendAuthorization>();
        registry.register::<StakeAuthorization>();
        registry
    }

    /// Register a variant; re-registering a tag replaces its decoder
    pub fn register<T: AuthorizationType>(&mut self) {
        self.decoders
            .insert(T::TYPE_URL.to_string(), decode_variant::<T>);
    }

    /// Whether a type tag is known
    pub fn contains(&self, type_url: &str) -> bool {
        self.decoders.contains_key(type_url)
    }

    /// Decode an envelope into its variant
    pub fn unpack(&self, any: &Any) -> Result<Box<dyn Authorization>> {
        let decode = self.decoders.get(&any.type_url).ok_or_else(|| {
            TesseraError::serialization(format!(
                "unregistered authorization type {}",
                any.type_url
            ))
        })?;
        let authorization = decode(&any.value)?;
        if authorization.type_url() != any.type_url {
            return Err(TesseraError::serialization(format!(
                "authorization tagged {} decoded as {}",
                any.type_url,
                authorization.type_url()
            )));
        }
        Ok(authorization)
    }
}
