//! Blacklist enforcement for value movements the program performs itself.
//!
//! Token-2022 only calls the transfer hook on `transfer_checked`. Mints into a
//! recipient and the burn/mint pairs that move funds in and out of redemption
//! escrow never reach it, so every such path goes through a [`TransferGate`]
//! before any token instruction is issued.

use anchor_lang::prelude::*;

use crate::errors::GoldTokenError;
use crate::utils::find_blacklist_address;

pub trait TransferGate {
    /// Fails when value may not leave `from` or arrive at `to`.
    /// `None` marks the side that is the mint itself (issuance or burn).
    fn before_transfer(&self, from: Option<&Pubkey>, to: Option<&Pubkey>) -> Result<()>;
}

/// Gate backed by the `["blacklist", wallet]` marker accounts.
pub struct BlacklistGate<'a, 'info> {
    pub source_entry: Option<&'a AccountInfo<'info>>,
    pub destination_entry: Option<&'a AccountInfo<'info>>,
}

impl<'a, 'info> BlacklistGate<'a, 'info> {
    pub fn inbound(destination_entry: &'a AccountInfo<'info>) -> Self {
        Self {
            source_entry: None,
            destination_entry: Some(destination_entry),
        }
    }

    pub fn outbound(source_entry: &'a AccountInfo<'info>) -> Self {
        Self {
            source_entry: Some(source_entry),
            destination_entry: None,
        }
    }
}

impl TransferGate for BlacklistGate<'_, '_> {
    fn before_transfer(&self, from: Option<&Pubkey>, to: Option<&Pubkey>) -> Result<()> {
        for (wallet, entry) in [(from, self.source_entry), (to, self.destination_entry)] {
            if let Some(wallet) = wallet {
                let entry = entry.ok_or(GoldTokenError::InvalidBlacklistEntry)?;
                require_not_denied(wallet, entry)?;
            }
        }
        Ok(())
    }
}

/// Token accounts that are their own authority. Redemption escrows are
/// created this way, so such accounts are never wiped or paid into.
pub fn is_escrow_account(token_account: &Pubkey, owner: &Pubkey) -> bool {
    token_account == owner
}

/// A live entry is a non-empty account owned by this program.
pub fn is_denied(entry: &AccountInfo) -> bool {
    entry.owner == &crate::ID && !entry.data_is_empty()
}

pub fn require_not_denied(wallet: &Pubkey, entry: &AccountInfo) -> Result<()> {
    let (expected, _) = find_blacklist_address(wallet);
    require_keys_eq!(
        entry.key(),
        expected,
        GoldTokenError::InvalidBlacklistEntry
    );
    if is_denied(entry) {
        msg!("{} is blacklisted", wallet);
        return err!(GoldTokenError::AddressBlacklisted);
    }
    Ok(())
}
