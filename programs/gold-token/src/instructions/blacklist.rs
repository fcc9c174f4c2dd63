use anchor_lang::prelude::*;

use crate::compliance::is_denied;
use crate::constants::{BLACKLIST_SEED, CONFIG_SEED};
use crate::errors::GoldTokenError;
use crate::events::{AddressBlacklisted, AddressUnblacklisted};
use crate::state::{BlacklistEntry, Config, Role};
use crate::utils::{close_program_account, require_role};

#[derive(Accounts)]
#[instruction(wallet: Pubkey)]
pub struct AddToBlacklist<'info> {
    #[account(mut)]
    pub asset_protection: Signer<'info>,

    #[account(seeds = [CONFIG_SEED], bump = config.bump)]
    pub config: Account<'info, Config>,

    #[account(
        init_if_needed,
        payer = asset_protection,
        space = 8 + BlacklistEntry::INIT_SPACE,
        seeds = [BLACKLIST_SEED, wallet.as_ref()],
        bump
    )]
    pub blacklist_entry: Account<'info, BlacklistEntry>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(wallet: Pubkey)]
pub struct RemoveFromBlacklist<'info> {
    #[account(mut)]
    pub asset_protection: Signer<'info>,

    #[account(seeds = [CONFIG_SEED], bump = config.bump)]
    pub config: Account<'info, Config>,

    /// CHECK: May be empty; emptiness is reported as `NotBlacklisted`.
    #[account(mut, seeds = [BLACKLIST_SEED, wallet.as_ref()], bump)]
    pub blacklist_entry: UncheckedAccount<'info>,
}

pub fn add_handler(ctx: Context<AddToBlacklist>, wallet: Pubkey) -> Result<()> {
    let asset_protection = ctx.accounts.asset_protection.key();
    require_role(&ctx.accounts.config, Role::AssetProtection, &asset_protection)?;

    let entry = &mut ctx.accounts.blacklist_entry;
    if entry.is_initialized() {
        return err!(GoldTokenError::AlreadyBlacklisted);
    }

    let now = Clock::get()?.unix_timestamp;
    entry.wallet = wallet;
    entry.blacklisted_by = asset_protection;
    entry.blacklisted_at = now;
    entry.bump = ctx.bumps.blacklist_entry;

    emit!(AddressBlacklisted {
        wallet,
        blacklisted_by: asset_protection,
        timestamp: now,
    });
    Ok(())
}

pub fn remove_handler(ctx: Context<RemoveFromBlacklist>, wallet: Pubkey) -> Result<()> {
    let asset_protection = ctx.accounts.asset_protection.to_account_info();
    require_role(&ctx.accounts.config, Role::AssetProtection, asset_protection.key)?;

    let entry = ctx.accounts.blacklist_entry.to_account_info();
    require!(is_denied(&entry), GoldTokenError::NotBlacklisted);
    close_program_account(&entry, &asset_protection)?;

    emit!(AddressUnblacklisted {
        wallet,
        removed_by: asset_protection.key(),
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
