//! Store key layout
//!
//! ```text
//! grant  0x01 | len(granter) | granter | len(grantee) | grantee | msg_type_url
//! queue  0x02 | expiration ms (u64 BE) | len(granter) | granter | len(grantee) | grantee | msg_type_url
//! ```
//!
//! Big-endian expirations make an ascending scan of the queue visit grants
//! in expiration order, and the granter-first grant key makes every grant
//! of one granter (or one granter/grantee pair) a contiguous prefix.

use tessera_core::store::prefix_end;
use tessera_core::{Address, Result, TesseraError, Timestamp};

/// Prefix of grant records
pub const GRANT_PREFIX: u8 = 0x01;
/// Prefix of the expiration queue
pub const GRANT_QUEUE_PREFIX: u8 = 0x02;

/// Identity of a grant: one capability per (granter, grantee, message type)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GrantKey {
    /// Account whose authority is delegated
    pub granter: Address,
    /// Account receiving the authority
    pub grantee: Address,
    /// Governed message type
    pub msg_type_url: String,
}

impl GrantKey {
    /// Create a key
    pub fn new(granter: Address, grantee: Address, msg_type_url: impl Into<String>) -> Self {
        Self {
            granter,
            grantee,
            msg_type_url: msg_type_url.into(),
        }
    }

    fn write_suffix(&self, out: &mut Vec<u8>) -> Result<()> {
        self.granter.write_length_prefixed(out)?;
        self.grantee.write_length_prefixed(out)?;
        out.extend_from_slice(self.msg_type_url.as_bytes());
        Ok(())
    }

    fn read_suffix(bytes: &[u8]) -> Result<Self> {
        let (granter, rest) = Address::read_length_prefixed(bytes)?;
        let (grantee, rest) = Address::read_length_prefixed(rest)?;
        let msg_type_url = std::str::from_utf8(rest)
            .map_err(|e| TesseraError::storage(format!("grant key message type: {e}")))?;
        Ok(Self::new(granter, grantee, msg_type_url))
    }

    /// Store key of the grant record
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut key = vec![GRANT_PREFIX];
        self.write_suffix(&mut key)?;
        Ok(key)
    }

    /// Parse a grant record key
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.split_first() {
            Some((&GRANT_PREFIX, rest)) => Self::read_suffix(rest),
            _ => Err(TesseraError::storage("not a grant key")),
        }
    }
}

/// Prefix covering every grant issued by `granter`
pub fn granter_prefix(granter: &Address) -> Result<Vec<u8>> {
    let mut prefix = vec![GRANT_PREFIX];
    granter.write_length_prefixed(&mut prefix)?;
    Ok(prefix)
}

/// Prefix covering every grant from `granter` to `grantee`
pub fn granter_grantee_prefix(granter: &Address, grantee: &Address) -> Result<Vec<u8>> {
    let mut prefix = granter_prefix(granter)?;
    grantee.write_length_prefixed(&mut prefix)?;
    Ok(prefix)
}

/// Expiration queue key for a grant
pub fn queue_key(expiration: Timestamp, key: &GrantKey) -> Result<Vec<u8>> {
    let mut out = vec![GRANT_QUEUE_PREFIX];
    out.extend_from_slice(&expiration.to_be_bytes());
    key.write_suffix(&mut out)?;
    Ok(out)
}

/// Parse an expiration queue key
pub fn parse_queue_key(bytes: &[u8]) -> Result<(Timestamp, GrantKey)> {
    let Some((&GRANT_QUEUE_PREFIX, rest)) = bytes.split_first() else {
        return Err(TesseraError::storage("not a grant queue key"));
    };
    if rest.len() < 8 {
        return Err(TesseraError::storage("truncated grant queue expiration"));
    }
    let (time, rest) = rest.split_at(8);
    let mut raw = [0u8; 8];
    raw.copy_from_slice(time);
    Ok((Timestamp::from_be_bytes(raw), GrantKey::read_suffix(rest)?))
}

/// Exclusive upper bound of queue entries expiring at or before `as_of`
pub fn queue_end_inclusive(as_of: Timestamp) -> Option<Vec<u8>> {
    match as_of.as_millis().checked_add(1) {
        Some(next) => {
            let mut end = vec![GRANT_QUEUE_PREFIX];
            end.extend_from_slice(&next.to_be_bytes());
            Some(end)
        }
        None => prefix_end(&[GRANT_QUEUE_PREFIX]),
    }
}
