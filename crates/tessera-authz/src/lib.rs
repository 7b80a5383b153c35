//! # Tessera Authz - Delegated Authorization
//!
//! **Purpose**: Let one account (the granter) authorize another (the
//! grantee) to run specific messages on its behalf, under constraints
//! carried by a polymorphic capability.
//!
//! ## Core Concepts
//!
//! - **Authorization**: a capability for one message type, with a pure
//!   [`Authorization::accept`] decision ([`GenericAuthorization`],
//!   [`SendAuthorization`], [`StakeAuthorization`])
//! - **Grant**: a capability plus optional expiration, unique per
//!   (granter, grantee, message type)
//! - **Grant store**: grant records and an expiration queue ordered for
//!   ascending pruning scans
//! - **Keeper**: grant, revoke, revoke-all, prune and exec, each atomic
//! - **Queries**: paginated read-only views over stored grants
//!
//! Exec authorizes every message before dispatching any, and runs both
//! phases on one discardable branch of the context.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authorization;
pub mod events;
pub mod genesis;
pub mod grant;
pub mod keeper;
pub mod keys;
pub mod msg_server;
pub mod msgs;
pub mod query;
pub mod store;

pub use authorization::{
    pack, AcceptResponse, Authorization, AuthorizationRegistry, AuthorizationType,
    GenericAuthorization, SendAuthorization, StakeAuthorization, StakeAuthorizationType,
    Validators,
};
pub use genesis::GenesisState;
pub use grant::{is_grant_management, Grant};
pub use keeper::{Keeper, BLOCK_PRUNE_LIMIT};
pub use keys::GrantKey;
pub use msgs::{
    MsgExec, MsgExecResponse, MsgGrant, MsgPruneExpiredGrants, MsgRevoke, MsgRevokeAll,
};
pub use query::{GrantAuthorization, GrantsPage, PageRequest, PageResponse};
pub use store::GrantStore;
