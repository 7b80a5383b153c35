//! Validator-restricted staking capability

use super::{AcceptResponse, Authorization, AuthorizationType};
use serde::{Deserialize, Serialize};
use tessera_core::codec;
use tessera_core::coins::validate_denom;
use tessera_core::msgs::staking::{
    MsgBeginRedelegate, MsgDelegate, MsgUndelegate, MSG_BEGIN_REDELEGATE_TYPE_URL,
    MSG_DELEGATE_TYPE_URL, MSG_UNDELEGATE_TYPE_URL,
};
use tessera_core::{downcast_msg, Coin, Msg, Result, TesseraError};

/// Type tag of [`StakeAuthorization`]
pub const STAKE_AUTHORIZATION_TYPE_URL: &str = "/tessera.staking.v1.StakeAuthorization";

/// Staking action a [`StakeAuthorization`] covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakeAuthorizationType {
    /// Not set; never valid
    Unspecified,
    /// Bond tokens
    Delegate,
    /// Unbond tokens
    Undelegate,
    /// Move a bond
    Redelegate,
}

impl StakeAuthorizationType {
    fn msg_type_url(self) -> &'static str {
        match self {
            Self::Unspecified => "",
            Self::Delegate => MSG_DELEGATE_TYPE_URL,
            Self::Undelegate => MSG_UNDELEGATE_TYPE_URL,
            Self::Redelegate => MSG_BEGIN_REDELEGATE_TYPE_URL,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Unspecified => "stake with",
            Self::Delegate => "delegate to",
            Self::Undelegate => "undelegate from",
            Self::Redelegate => "redelegate to",
        }
    }
}

/// Validators the grantee may or may not target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validators {
    /// Only these validators
    AllowList(Vec<String>),
    /// Any validator except these
    DenyList(Vec<String>),
}

impl Validators {
    fn addresses(&self) -> &[String] {
        match self {
            Self::AllowList(list) | Self::DenyList(list) => list,
        }
    }

    fn permits(&self, validator: &str) -> bool {
        match self {
            Self::AllowList(list) => list.iter().any(|v| v == validator),
            Self::DenyList(list) => !list.iter().any(|v| v == validator),
        }
    }
}

/// Allows one staking action against a set of validators, optionally up to
/// a cumulative token limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeAuthorization {
    /// Remaining tokens; `None` means unlimited
    pub max_tokens: Option<Coin>,
    /// Validator restriction
    pub validators: Validators,
    /// Covered action
    pub authorization_type: StakeAuthorizationType,
}

impl StakeAuthorization {
    /// Create a staking capability
    pub fn new(
        max_tokens: Option<Coin>,
        validators: Validators,
        authorization_type: StakeAuthorizationType,
    ) -> Self {
        Self {
            max_tokens,
            validators,
            authorization_type,
        }
    }

    fn target<'m>(&self, msg: &'m dyn Msg) -> Result<(&'m str, &'m Coin)> {
        let target = match self.authorization_type {
            StakeAuthorizationType::Delegate => downcast_msg::<MsgDelegate>(msg)
                .map(|m| (m.validator_address.as_str(), &m.amount)),
            StakeAuthorizationType::Undelegate => downcast_msg::<MsgUndelegate>(msg)
                .map(|m| (m.validator_address.as_str(), &m.amount)),
            StakeAuthorizationType::Redelegate => downcast_msg::<MsgBeginRedelegate>(msg)
                .map(|m| (m.validator_dst_address.as_str(), &m.amount)),
            StakeAuthorizationType::Unspecified => None,
        };
        target.ok_or_else(|| {
            TesseraError::invalid_request(format!(
                "type mismatch: stake authorization cannot accept {}",
                msg.type_url()
            ))
        })
    }
}

impl Authorization for StakeAuthorization {
    fn type_url(&self) -> &'static str {
        STAKE_AUTHORIZATION_TYPE_URL
    }

    fn msg_type_url(&self) -> &str {
        self.authorization_type.msg_type_url()
    }

    fn validate_basic(&self) -> Result<()> {
        if let Some(max) = &self.max_tokens {
            validate_denom(&max.denom)?;
            if max.is_zero() {
                return Err(TesseraError::validation_failed(
                    "max tokens should be positive",
                ));
            }
        }
        if self.authorization_type == StakeAuthorizationType::Unspecified {
            return Err(TesseraError::validation_failed(
                "unknown authorization type",
            ));
        }
        if self.validators.addresses().is_empty() {
            return Err(TesseraError::validation_failed(
                "both allowed & deny list cannot be empty",
            ));
        }
        Ok(())
    }

    fn accept(&self, msg: &dyn Msg) -> Result<AcceptResponse> {
        let (validator, amount) = self.target(msg)?;

        if !self.validators.permits(validator) {
            return Ok(AcceptResponse::deny(format!(
                "cannot {} {validator} validator",
                self.authorization_type.verb()
            )));
        }

        let Some(max) = &self.max_tokens else {
            return Ok(AcceptResponse::allow());
        };
        if max.denom != amount.denom {
            return Ok(AcceptResponse::deny(format!(
                "invalid denom {}, expected {}",
                amount.denom, max.denom
            )));
        }
        let Some(left) = max.amount.checked_sub(amount.amount) else {
            return Ok(AcceptResponse::deny("negative coin amount"));
        };
        if left == 0 {
            return Ok(AcceptResponse::allow_and_consume());
        }
        Ok(AcceptResponse::allow_with_update(Box::new(Self {
            max_tokens: Some(Coin::new(max.denom.clone(), left)),
            ..self.clone()
        })))
    }

    fn encode(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    fn clone_box(&self) -> Box<dyn Authorization> {
        Box::new(self.clone())
    }
}

impl AuthorizationType for StakeAuthorization {
    const TYPE_URL: &'static str = STAKE_AUTHORIZATION_TYPE_URL;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delegate(validator: &str, amount: u128) -> MsgDelegate {
        MsgDelegate {
            delegator_address: "granter".into(),
            validator_address: validator.into(),
            amount: Coin::new("stake", amount),
        }
    }

    fn allow(validators: &[&str], max: Option<u128>) -> StakeAuthorization {
        StakeAuthorization::new(
            max.map(|m| Coin::new("stake", m)),
            Validators::AllowList(validators.iter().map(|v| v.to_string()).collect()),
            StakeAuthorizationType::Delegate,
        )
    }

    #[test]
    fn unlimited_grant_is_left_untouched() {
        let resp = allow(&["val1"], None).accept(&delegate("val1", 500)).unwrap();
        assert!(resp.accept && !resp.delete && resp.updated.is_none());
    }

    #[test]
    fn limit_shrinks_then_consumes() {
        let auth = allow(&["val1"], Some(10));
        let resp = auth.accept(&delegate("val1", 4)).unwrap();
        let bytes = resp.updated.unwrap().encode().unwrap();
        let updated: StakeAuthorization = codec::decode(&bytes).unwrap();
        assert_eq!(updated.max_tokens, Some(Coin::new("stake", 6)));

        let resp = updated.accept(&delegate("val1", 6)).unwrap();
        assert!(resp.accept && resp.delete);
    }

    #[test]
    fn validator_lists_are_enforced() {
        let resp = allow(&["val1"], None).accept(&delegate("val2", 1)).unwrap();
        assert!(!resp.accept);
        assert_eq!(
            resp.reason.as_deref(),
            Some("cannot delegate to val2 validator")
        );

        let deny = StakeAuthorization::new(
            None,
            Validators::DenyList(vec!["val2".into()]),
            StakeAuthorizationType::Delegate,
        );
        assert!(deny.accept(&delegate("val1", 1)).unwrap().accept);
        assert!(!deny.accept(&delegate("val2", 1)).unwrap().accept);
    }

    #[test]
    fn exceeding_max_tokens_is_denied() {
        let resp = allow(&["val1"], Some(3)).accept(&delegate("val1", 4)).unwrap();
        assert!(!resp.accept);
    }

    #[test]
    fn redelegation_checks_the_destination() {
        let auth = StakeAuthorization::new(
            None,
            Validators::AllowList(vec!["dst".into()]),
            StakeAuthorizationType::Redelegate,
        );
        let msg = MsgBeginRedelegate {
            delegator_address: "granter".into(),
            validator_src_address: "src".into(),
            validator_dst_address: "dst".into(),
            amount: Coin::new("stake", 1),
        };
        assert_eq!(auth.msg_type_url(), MSG_BEGIN_REDELEGATE_TYPE_URL);
        assert!(auth.accept(&msg).unwrap().accept);
        assert!(auth.accept(&delegate("dst", 1)).is_err());
    }

    #[test]
    fn validation_rules() {
        assert!(allow(&[], None).validate_basic().is_err());
        assert!(allow(&["v"], Some(0)).validate_basic().is_err());
        let unspecified = StakeAuthorization::new(
            None,
            Validators::AllowList(vec!["v".into()]),
            StakeAuthorizationType::Unspecified,
        );
        assert!(unspecified.validate_basic().is_err());
        assert!(allow(&["v"], Some(1)).validate_basic().is_ok());
    }
}
