//! Grant manager
//!
//! The keeper is the only writer of grant state. Every operation is
//! all-or-nothing: operations that touch more than one record run inside
//! [`Context::branch`] so a failure part way leaves the store untouched.

use crate::authorization::{Authorization, AuthorizationRegistry};
use crate::events::{EventGrant, EventPruneExpiredGrants, EventRevoke};
use crate::grant::{is_grant_management, Grant};
use crate::keys::GrantKey;
use crate::store::GrantStore;
use std::fmt;
use std::sync::Arc;
use tessera_core::config::{ConfigValidation, QueryConfig};
use tessera_core::{
    Address, AddressCodec, Context, KvStore, Msg, MsgResponse, MsgRouter, Result, TesseraError,
    Timestamp,
};
use tracing::{debug, info, warn};

/// Upper bound on grants pruned by [`Keeper::begin_blocker`] per block
pub const BLOCK_PRUNE_LIMIT: usize = 200;

/// Grant manager
#[derive(Clone)]
pub struct Keeper {
    grants: GrantStore,
    codec: Arc<dyn AddressCodec>,
    query_config: QueryConfig,
}

impl fmt::Debug for Keeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keeper")
            .field("registry", self.grants.registry())
            .field("query_config", &self.query_config)
            .finish_non_exhaustive()
    }
}

impl Keeper {
    /// Create a keeper decoding capabilities through `registry` and
    /// addresses through `codec`
    pub fn new(registry: AuthorizationRegistry, codec: Arc<dyn AddressCodec>) -> Self {
        Self {
            grants: GrantStore::new(Arc::new(registry)),
            codec,
            query_config: QueryConfig::default(),
        }
    }

    /// Replace the pagination limits; rejects limits that could never
    /// advance a page
    pub fn with_query_config(mut self, query_config: QueryConfig) -> Result<Self> {
        query_config.validate()?;
        self.query_config = query_config;
        Ok(self)
    }

    /// Underlying grant store
    pub fn grant_store(&self) -> &GrantStore {
        &self.grants
    }

    /// Address codec
    pub fn codec(&self) -> &dyn AddressCodec {
        self.codec.as_ref()
    }

    pub(crate) fn query_config(&self) -> &QueryConfig {
        &self.query_config
    }

    pub(crate) fn address_string(&self, address: &Address) -> Result<String> {
        self.codec.bytes_to_string(address)
    }

    /// Load a grant regardless of expiry
    pub fn get_grant(&self, store: &dyn KvStore, key: &GrantKey) -> Result<Option<Grant>> {
        self.grants.get(store, key)
    }

    /// Load the live capability for `key`; expired grants read as absent
    pub fn get_authorization(
        &self,
        store: &dyn KvStore,
        now: Timestamp,
        key: &GrantKey,
    ) -> Result<Option<Grant>> {
        Ok(self.grants.get(store, key)?.filter(|g| !g.is_expired(now)))
    }

    /// Issue or replace a grant
    pub fn grant(
        &self,
        ctx: &mut Context<'_>,
        granter: &Address,
        grantee: &Address,
        authorization: Box<dyn Authorization>,
        expiration: Option<Timestamp>,
    ) -> Result<()> {
        if granter == grantee {
            return Err(TesseraError::invalid_grantee(
                "grantee and granter should be different",
            ));
        }
        authorization.validate_basic().map_err(|err| match err {
            TesseraError::ValidationFailed { .. } => err,
            other => TesseraError::validation_failed(other.message()),
        })?;
        if let Some(exp) = expiration {
            if exp <= ctx.block_time() {
                return Err(TesseraError::expiration_in_past(format!(
                    "expiration must be after the current block time: {exp} <= {}",
                    ctx.block_time()
                )));
            }
        }
        let msg_type_url = authorization.msg_type_url().to_string();
        if is_grant_management(&msg_type_url) {
            return Err(TesseraError::disallowed_target(format!(
                "{msg_type_url} cannot be granted"
            )));
        }
        if !self.grants.registry().contains(authorization.type_url()) {
            return Err(TesseraError::validation_failed(format!(
                "unregistered authorization type {}",
                authorization.type_url()
            )));
        }

        let event = EventGrant {
            msg_type_url: msg_type_url.clone(),
            granter: self.address_string(granter)?,
            grantee: self.address_string(grantee)?,
        };
        let key = GrantKey::new(granter.clone(), grantee.clone(), msg_type_url);
        let grant = Grant::new(authorization, expiration);
        ctx.branch(|ctx| self.grants.put(ctx.store_mut(), &key, &grant))?;
        ctx.emit(event.into());

        info!(
            granter = %key.granter,
            grantee = %key.grantee,
            msg_type_url = %key.msg_type_url,
            expiration = ?expiration,
            "Grant stored"
        );
        Ok(())
    }

    /// Revoke one grant
    pub fn revoke(
        &self,
        ctx: &mut Context<'_>,
        granter: &Address,
        grantee: &Address,
        msg_type_url: &str,
    ) -> Result<()> {
        let key = GrantKey::new(granter.clone(), grantee.clone(), msg_type_url);
        let event = EventRevoke {
            msg_type_url: msg_type_url.to_string(),
            granter: self.address_string(granter)?,
            grantee: self.address_string(grantee)?,
        };
        ctx.branch(|ctx| match self.grants.delete(ctx.store_mut(), &key)? {
            Some(_) => Ok(()),
            None => Err(TesseraError::not_found("authorization not found")),
        })?;
        ctx.emit(event.into());

        info!(granter = %granter, grantee = %grantee, msg_type_url, "Grant revoked");
        Ok(())
    }

    /// Revoke every grant issued by `granter`, returning how many were removed
    pub fn revoke_all(&self, ctx: &mut Context<'_>, granter: &Address) -> Result<usize> {
        let keys: Vec<GrantKey> = self
            .grants
            .iter_by_granter(ctx.store(), granter)?
            .map(|entry| entry.map(|(key, _)| key))
            .collect::<Result<_>>()?;
        if keys.is_empty() {
            return Err(TesseraError::not_found("authorization not found"));
        }

        ctx.branch(|ctx| {
            for key in &keys {
                self.grants.delete(ctx.store_mut(), key)?;
                let event = EventRevoke {
                    msg_type_url: key.msg_type_url.clone(),
                    granter: self.address_string(&key.granter)?,
                    grantee: self.address_string(&key.grantee)?,
                };
                ctx.emit(event.into());
            }
            Ok(())
        })?;

        info!(granter = %granter, revoked = keys.len(), "All grants revoked");
        Ok(keys.len())
    }

    /// Delete every grant whose expiration is at or before `as_of`
    pub fn prune_expired_grants(
        &self,
        ctx: &mut Context<'_>,
        as_of: Timestamp,
        pruner: Option<&Address>,
    ) -> Result<u64> {
        self.prune(ctx, as_of, None, pruner)
    }

    /// Prune a bounded number of expired grants at the block time
    pub fn begin_blocker(&self, ctx: &mut Context<'_>) -> Result<u64> {
        let now = ctx.block_time();
        self.prune(ctx, now, Some(BLOCK_PRUNE_LIMIT), None)
    }

    fn prune(
        &self,
        ctx: &mut Context<'_>,
        as_of: Timestamp,
        limit: Option<usize>,
        pruner: Option<&Address>,
    ) -> Result<u64> {
        let due: Vec<_> = self
            .grants
            .iter_expiring(ctx.store(), as_of)
            .take(limit.unwrap_or(usize::MAX))
            .collect::<Result<_>>()?;
        let pruner = pruner.map(|p| self.address_string(p)).transpose()?;

        let pruned = ctx.branch(|ctx| {
            let mut pruned = 0u64;
            for (expiration, key) in &due {
                match self.grants.get(ctx.store(), key)? {
                    Some(grant) if grant.is_expired(as_of) => {
                        self.grants.delete(ctx.store_mut(), key)?;
                        pruned += 1;
                    }
                    _ => {
                        warn!(
                            granter = %key.granter,
                            grantee = %key.grantee,
                            msg_type_url = %key.msg_type_url,
                            "Dropping stale expiration queue entry"
                        );
                        self.grants
                            .remove_queue_entry(ctx.store_mut(), *expiration, key)?;
                    }
                }
            }
            Ok(pruned)
        })?;

        if pruned > 0 || pruner.is_some() {
            ctx.emit(EventPruneExpiredGrants { pruner, pruned }.into());
        }
        debug!(as_of = %as_of, pruned, "Expired grants pruned");
        Ok(pruned)
    }

    /// Authorize and run `msgs` on behalf of their signers.
    ///
    /// Every message is authorized before any is dispatched. Grant updates
    /// and handler effects share one branch of `ctx`, so a failure anywhere
    /// leaves the store exactly as it was.
    pub fn exec(
        &self,
        ctx: &mut Context<'_>,
        router: &dyn MsgRouter,
        grantee: &Address,
        msgs: &[Box<dyn Msg>],
    ) -> Result<Vec<MsgResponse>> {
        if grantee.is_empty() {
            return Err(TesseraError::empty_grantee("grantee cannot be empty"));
        }
        if msgs.is_empty() {
            return Err(TesseraError::empty_messages("messages cannot be empty"));
        }

        ctx.branch(|ctx| {
            for msg in msgs {
                self.authorize(ctx, grantee, msg.as_ref())?;
            }
            msgs.iter()
                .map(|msg| router.dispatch(ctx, msg.as_ref()))
                .collect()
        })
    }

    fn authorize(&self, ctx: &mut Context<'_>, grantee: &Address, msg: &dyn Msg) -> Result<()> {
        let msg_type_url = msg.type_url();
        if is_grant_management(msg_type_url) {
            return Err(TesseraError::disallowed_nested(format!(
                "{msg_type_url} cannot be executed through a grant"
            )));
        }
        let granter = self.codec.string_to_bytes(msg.signer())?;
        if &granter == grantee {
            debug!(signer = %granter, msg_type_url, "Signer executes its own message");
            return Ok(());
        }

        let key = GrantKey::new(granter, grantee.clone(), msg_type_url);
        let grant = self
            .grants
            .get(ctx.store(), &key)?
            .ok_or_else(|| TesseraError::not_found("authorization not found"))?;
        if grant.is_expired(ctx.block_time()) {
            return Err(TesseraError::expired("authorization expired"));
        }

        let response = grant.accept(msg)?;
        if response.delete {
            self.grants.delete(ctx.store_mut(), &key)?;
        } else if let Some(updated) = response.updated {
            let replacement = Grant::new(updated, grant.expiration);
            self.grants.put(ctx.store_mut(), &key, &replacement)?;
        }
        if !response.accept {
            let reason = response.reason.unwrap_or_else(|| "unauthorized".to_string());
            warn!(
                granter = %key.granter,
                grantee = %key.grantee,
                msg_type_url,
                reason = %reason,
                "Authorization denied message"
            );
            return Err(TesseraError::denied(reason));
        }

        debug!(
            granter = %key.granter,
            grantee = %key.grantee,
            msg_type_url,
            consumed = response.delete,
            "Message authorized"
        );
        Ok(())
    }
}
