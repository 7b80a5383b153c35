//! Read-only query surface with key-based pagination
//!
//! Queries never write. Expired grants that have not been pruned yet are
//! reported as absent, matching how [`Keeper::exec`] treats them.

use crate::grant::Grant;
use crate::keeper::Keeper;
use crate::keys::{granter_grantee_prefix, granter_prefix, GrantKey, GRANT_PREFIX};
use serde::{Deserialize, Serialize};
use tessera_core::store::prefix_end;
use tessera_core::{Any, Context, Result, TesseraError, Timestamp};

/// Page selector: resume after `key`, return at most `limit` items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Store key to resume from, as returned in [`PageResponse::next_key`]
    pub key: Option<Vec<u8>>,
    /// Page size; zero selects the configured default
    pub limit: u64,
}

impl PageRequest {
    /// First page of at most `limit` items
    pub fn with_limit(limit: u64) -> Self {
        Self { key: None, limit }
    }
}

/// Continuation of a paginated query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    /// Key to request the next page with; `None` on the last page
    pub next_key: Option<Vec<u8>>,
}

/// A grant together with the parties it binds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantAuthorization {
    /// Granter address string
    pub granter: String,
    /// Grantee address string
    pub grantee: String,
    /// Packed capability
    pub authorization: Any,
    /// Optional expiration
    pub expiration: Option<Timestamp>,
}

/// One page of grants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantsPage {
    /// Grants on this page
    pub grants: Vec<GrantAuthorization>,
    /// Continuation
    pub pagination: PageResponse,
}

impl Keeper {
    fn page_limit(&self, requested: u64) -> u64 {
        let limits = self.query_config();
        match requested {
            0 => limits.default_page_limit,
            n => n.min(limits.max_page_limit),
        }
    }

    pub(crate) fn view(&self, key: &GrantKey, grant: &Grant) -> Result<GrantAuthorization> {
        Ok(GrantAuthorization {
            granter: self.address_string(&key.granter)?,
            grantee: self.address_string(&key.grantee)?,
            authorization: grant.authorization_any()?,
            expiration: grant.expiration,
        })
    }

    fn paginate(
        &self,
        ctx: &Context<'_>,
        prefix: &[u8],
        page: &PageRequest,
        keep: impl Fn(&GrantKey) -> bool,
    ) -> Result<GrantsPage> {
        let limit = self.page_limit(page.limit);
        let start = match &page.key {
            Some(key) if key.starts_with(prefix) => key.clone(),
            Some(_) => {
                return Err(TesseraError::invalid_request(
                    "pagination key does not belong to this query",
                ))
            }
            None => prefix.to_vec(),
        };
        let end = prefix_end(prefix);
        let now = ctx.block_time();
        let registry = self.grant_store().registry();

        let mut grants = Vec::new();
        for (raw_key, value) in ctx.store().range(&start, end.as_deref()) {
            let key = GrantKey::from_bytes(&raw_key)?;
            if !keep(&key) {
                continue;
            }
            let grant = Grant::decode(&value, registry)?;
            if grant.is_expired(now) {
                continue;
            }
            if grants.len() as u64 >= limit {
                return Ok(GrantsPage {
                    grants,
                    pagination: PageResponse {
                        next_key: Some(raw_key),
                    },
                });
            }
            grants.push(self.view(&key, &grant)?);
        }
        Ok(GrantsPage {
            grants,
            pagination: PageResponse::default(),
        })
    }

    /// Grants from `granter` to `grantee`, optionally for one message type
    pub fn query_grants(
        &self,
        ctx: &Context<'_>,
        granter: &str,
        grantee: &str,
        msg_type_url: Option<&str>,
        page: &PageRequest,
    ) -> Result<GrantsPage> {
        let granter = self.codec().string_to_bytes(granter)?;
        let grantee = self.codec().string_to_bytes(grantee)?;

        if let Some(msg_type_url) = msg_type_url.filter(|url| !url.is_empty()) {
            let key = GrantKey::new(granter, grantee, msg_type_url);
            let grant = self
                .get_authorization(ctx.store(), ctx.block_time(), &key)?
                .ok_or_else(|| {
                    TesseraError::not_found(format!(
                        "no authorization found for {msg_type_url} type"
                    ))
                })?;
            return Ok(GrantsPage {
                grants: vec![self.view(&key, &grant)?],
                pagination: PageResponse::default(),
            });
        }

        let prefix = granter_grantee_prefix(&granter, &grantee)?;
        self.paginate(ctx, &prefix, page, |_| true)
    }

    /// Grants issued by `granter`
    pub fn query_granter_grants(
        &self,
        ctx: &Context<'_>,
        granter: &str,
        page: &PageRequest,
    ) -> Result<GrantsPage> {
        let granter = self.codec().string_to_bytes(granter)?;
        self.paginate(ctx, &granter_prefix(&granter)?, page, |_| true)
    }

    /// Grants received by `grantee`
    pub fn query_grantee_grants(
        &self,
        ctx: &Context<'_>,
        grantee: &str,
        page: &PageRequest,
    ) -> Result<GrantsPage> {
        let grantee = self.codec().string_to_bytes(grantee)?;
        self.paginate(ctx, &[GRANT_PREFIX], page, |key| key.grantee == grantee)
    }
}
