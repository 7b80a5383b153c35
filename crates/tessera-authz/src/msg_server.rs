//! Request handlers
//!
//! Each handler decodes the request's address strings, then delegates to
//! the keeper operation of the same name.

use crate::authorization::Authorization;
use crate::keeper::Keeper;
use crate::msgs::{
    MsgExec, MsgExecResponse, MsgGrant, MsgPruneExpiredGrants, MsgRevoke, MsgRevokeAll,
    MSG_EXEC_TYPE_URL, MSG_GRANT_TYPE_URL, MSG_PRUNE_EXPIRED_GRANTS_TYPE_URL,
    MSG_REVOKE_ALL_TYPE_URL, MSG_REVOKE_TYPE_URL,
};
use tessera_core::codec;
use tessera_core::{
    downcast_msg, Address, Context, Msg, MsgResponse, MsgRouter, Result, TesseraError,
};

/// Message types served by [`Keeper::handle`]
pub const HANDLED_MSG_TYPE_URLS: [&str; 5] = [
    MSG_GRANT_TYPE_URL,
    MSG_REVOKE_TYPE_URL,
    MSG_REVOKE_ALL_TYPE_URL,
    MSG_EXEC_TYPE_URL,
    MSG_PRUNE_EXPIRED_GRANTS_TYPE_URL,
];

fn expect_msg<'m, T: Msg>(msg: &'m dyn Msg) -> Result<&'m T> {
    downcast_msg::<T>(msg).ok_or_else(|| {
        TesseraError::internal(format!("{} does not match its type url", msg.type_url()))
    })
}

impl Keeper {
    fn decode_address(&self, field: &str, text: &str) -> Result<Address> {
        self.codec()
            .string_to_bytes(text)
            .map_err(|err| err.wrap(format!("invalid {field} address")))
    }

    /// Whether `type_url` is one of the grant manager's request messages
    pub fn handles(type_url: &str) -> bool {
        HANDLED_MSG_TYPE_URLS.contains(&type_url)
    }

    /// Route a grant manager request to its handler
    pub fn handle(
        &self,
        ctx: &mut Context<'_>,
        router: &dyn MsgRouter,
        msg: &dyn Msg,
    ) -> Result<MsgResponse> {
        match msg.type_url() {
            MSG_GRANT_TYPE_URL => self.handle_grant(ctx, expect_msg(msg)?),
            MSG_REVOKE_TYPE_URL => self.handle_revoke(ctx, expect_msg(msg)?),
            MSG_REVOKE_ALL_TYPE_URL => self.handle_revoke_all(ctx, expect_msg(msg)?),
            MSG_EXEC_TYPE_URL => self.handle_exec(ctx, router, expect_msg(msg)?),
            MSG_PRUNE_EXPIRED_GRANTS_TYPE_URL => {
                self.handle_prune_expired_grants(ctx, expect_msg(msg)?)
            }
            other => Err(TesseraError::invalid_request(format!(
                "unrecognized authz message type {other}"
            ))),
        }
    }

    /// Handle [`MsgGrant`]
    pub fn handle_grant(&self, ctx: &mut Context<'_>, msg: &MsgGrant) -> Result<MsgResponse> {
        let granter = self.decode_address("granter", &msg.granter)?;
        let grantee = self.decode_address("grantee", &msg.grantee)?;
        if granter == grantee {
            return Err(TesseraError::invalid_grantee(
                "grantee and granter should be different",
            ));
        }
        let any = msg
            .authorization
            .as_ref()
            .ok_or_else(|| TesseraError::validation_failed("authorization is nil: invalid type"))?;
        let authorization: Box<dyn Authorization> = self
            .grant_store()
            .registry()
            .unpack(any)
            .map_err(|err| TesseraError::validation_failed(err.message()))?;
        self.grant(ctx, &granter, &grantee, authorization, msg.expiration)?;
        Ok(MsgResponse::default())
    }

    /// Handle [`MsgRevoke`]
    pub fn handle_revoke(&self, ctx: &mut Context<'_>, msg: &MsgRevoke) -> Result<MsgResponse> {
        let granter = self.decode_address("granter", &msg.granter)?;
        let grantee = self.decode_address("grantee", &msg.grantee)?;
        if granter == grantee {
            return Err(TesseraError::invalid_grantee(
                "grantee and granter should be different",
            ));
        }
        if msg.msg_type_url.trim().is_empty() {
            return Err(TesseraError::invalid_request("missing msg method name"));
        }
        self.revoke(ctx, &granter, &grantee, &msg.msg_type_url)?;
        Ok(MsgResponse::default())
    }

    /// Handle [`MsgRevokeAll`]
    pub fn handle_revoke_all(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgRevokeAll,
    ) -> Result<MsgResponse> {
        let granter = self.decode_address("granter", &msg.granter)?;
        self.revoke_all(ctx, &granter)?;
        Ok(MsgResponse::default())
    }

    /// Handle [`MsgExec`]
    pub fn handle_exec(
        &self,
        ctx: &mut Context<'_>,
        router: &dyn MsgRouter,
        msg: &MsgExec,
    ) -> Result<MsgResponse> {
        if msg.grantee.trim().is_empty() {
            return Err(TesseraError::empty_grantee(
                "invalid grantee address: empty address string is not allowed",
            ));
        }
        let grantee = self.decode_address("grantee", &msg.grantee)?;
        let results = self.exec(ctx, router, &grantee, &msg.msgs)?;
        Ok(MsgResponse::new(codec::encode(&MsgExecResponse { results })?))
    }

    /// Handle [`MsgPruneExpiredGrants`]
    pub fn handle_prune_expired_grants(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgPruneExpiredGrants,
    ) -> Result<MsgResponse> {
        let pruner = self.decode_address("pruner", &msg.pruner)?;
        let now = ctx.block_time();
        self.prune_expired_grants(ctx, now, Some(&pruner))?;
        Ok(MsgResponse::default())
    }
}
