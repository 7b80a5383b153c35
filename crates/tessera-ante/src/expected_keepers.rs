//! Collaborators the decorators depend on

use tessera_core::{Address, AddressCodec, Coins, Context, Msg, Result};

/// Module-account resolution
pub trait AccountKeeper: Send + Sync {
    /// Address of a module account, if it has been set up
    fn module_address(&self, name: &str) -> Option<Address>;

    /// Codec for rendering addresses in events
    fn address_codec(&self) -> &dyn AddressCodec;
}

/// Funds transfer
pub trait BankKeeper: Send + Sync {
    /// Move `amount` from `from` to `to`; fails with `InsufficientFunds`
    fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<()>;
}

/// Fee allowances granted by one account to another
pub trait FeeGrantKeeper: Send + Sync {
    /// Charge `fee` against the allowance from `granter` to `grantee` for a
    /// transaction carrying `msgs`; fails when the allowance refuses
    fn use_granted_fees(
        &self,
        ctx: &mut Context<'_>,
        granter: &Address,
        grantee: &Address,
        fee: &Coins,
        msgs: &[Box<dyn Msg>],
    ) -> Result<()>;
}
