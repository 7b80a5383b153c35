//! Unconstrained capability for a single message type

use super::{AcceptResponse, Authorization, AuthorizationType};
use serde::{Deserialize, Serialize};
use tessera_core::codec;
use tessera_core::{Msg, Result, TesseraError};

/// Type tag of [`GenericAuthorization`]
pub const GENERIC_AUTHORIZATION_TYPE_URL: &str = "/tessera.authz.v1.GenericAuthorization";

/// Allows any message of the named type, forever, without bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericAuthorization {
    /// Message type this capability governs
    pub msg: String,
}

impl GenericAuthorization {
    /// Authorize every message of type `msg_type_url`
    pub fn new(msg_type_url: impl Into<String>) -> Self {
        Self {
            msg: msg_type_url.into(),
        }
    }
}

impl Authorization for GenericAuthorization {
    fn type_url(&self) -> &'static str {
        GENERIC_AUTHORIZATION_TYPE_URL
    }

    fn msg_type_url(&self) -> &str {
        &self.msg
    }

    fn validate_basic(&self) -> Result<()> {
        if self.msg.trim().is_empty() {
            return Err(TesseraError::validation_failed("missing msg method name"));
        }
        Ok(())
    }

    fn accept(&self, _msg: &dyn Msg) -> Result<AcceptResponse> {
        Ok(AcceptResponse::allow())
    }

    fn encode(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    fn clone_box(&self) -> Box<dyn Authorization> {
        Box::new(self.clone())
    }
}

impl AuthorizationType for GenericAuthorization {
    const TYPE_URL: &'static str = GENERIC_AUTHORIZATION_TYPE_URL;
}
