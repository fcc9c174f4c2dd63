use anchor_lang::prelude::*;
use anchor_spl::token_2022::{self, Token2022};
use anchor_spl::token_interface::{Mint, TokenAccount};

use crate::compliance::{is_denied, is_escrow_account};
use crate::constants::{BLACKLIST_SEED, CONFIG_SEED};
use crate::errors::GoldTokenError;
use crate::events::TokensWiped;
use crate::state::{Config, Role};
use crate::utils::require_role;

#[derive(Accounts)]
#[instruction(wallet: Pubkey)]
pub struct WipeBlacklistedAddress<'info> {
    pub asset_protection: Signer<'info>,

    #[account(seeds = [CONFIG_SEED], bump = config.bump, has_one = mint)]
    pub config: Account<'info, Config>,

    #[account(mut)]
    pub mint: InterfaceAccount<'info, Mint>,

    #[account(
        mut,
        token::mint = mint,
        token::authority = wallet,
        token::token_program = token_2022_program
    )]
    pub target_token_account: InterfaceAccount<'info, TokenAccount>,

    /// CHECK: Must be a live entry; checked in the handler.
    #[account(seeds = [BLACKLIST_SEED, wallet.as_ref()], bump)]
    pub blacklist_entry: UncheckedAccount<'info>,

    pub token_2022_program: Program<'info, Token2022>,
}

pub fn wipe_handler(ctx: Context<WipeBlacklistedAddress>, wallet: Pubkey, amount: u64) -> Result<()> {
    let config = &ctx.accounts.config;
    require_role(config, Role::AssetProtection, ctx.accounts.asset_protection.key)?;
    require!(amount > 0, GoldTokenError::InvalidAmount);
    require!(
        !is_escrow_account(&ctx.accounts.target_token_account.key(), &wallet),
        GoldTokenError::EscrowProtected
    );
    require!(
        is_denied(&ctx.accounts.blacklist_entry),
        GoldTokenError::NotBlacklisted
    );

    let wiped_amount = amount.min(ctx.accounts.target_token_account.amount);
    if wiped_amount > 0 {
        // The config PDA is the mint's permanent delegate.
        let signer_seeds: &[&[u8]] = &[CONFIG_SEED, &[config.bump]];
        let signer_seeds_arr = [signer_seeds];
        let cpi_accounts = token_2022::Burn {
            mint: ctx.accounts.mint.to_account_info(),
            from: ctx.accounts.target_token_account.to_account_info(),
            authority: config.to_account_info(),
        };
        let cpi_ctx = CpiContext::new_with_signer(
            ctx.accounts.token_2022_program.to_account_info(),
            cpi_accounts,
            &signer_seeds_arr,
        );
        token_2022::burn(cpi_ctx, wiped_amount)?;
    }
    msg!("wiped {} of {} from {}", wiped_amount, amount, wallet);

    emit!(TokensWiped {
        wallet,
        token_account: ctx.accounts.target_token_account.key(),
        requested_amount: amount,
        wiped_amount,
        wiped_by: ctx.accounts.asset_protection.key(),
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
