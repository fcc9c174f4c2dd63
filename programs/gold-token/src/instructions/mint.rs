use anchor_lang::prelude::*;
use anchor_spl::{
    associated_token::AssociatedToken,
    token_2022::{self, Token2022},
    token_interface::{Mint, TokenAccount},
};

use crate::compliance::{BlacklistGate, TransferGate};
use crate::constants::CONFIG_SEED;
use crate::errors::GoldTokenError;
use crate::events::TokensMinted;
use crate::state::{Config, Role};
use crate::utils::require_role;

#[derive(Accounts)]
#[instruction(amount: u64, recipient: Pubkey)]
pub struct MintTokens<'info> {
    #[account(mut)]
    pub supply_controller: Signer<'info>,

    #[account(seeds = [CONFIG_SEED], bump = config.bump, has_one = mint)]
    pub config: Account<'info, Config>,

    #[account(mut)]
    pub mint: InterfaceAccount<'info, Mint>,

    /// CHECK: Only used as the associated token account owner.
    #[account(address = recipient)]
    pub recipient_wallet: UncheckedAccount<'info>,

    #[account(
        init_if_needed,
        payer = supply_controller,
        associated_token::mint = mint,
        associated_token::authority = recipient_wallet,
        associated_token::token_program = token_2022_program
    )]
    pub recipient_token_account: InterfaceAccount<'info, TokenAccount>,

    /// CHECK: Checked by the blacklist gate against the recipient.
    pub recipient_blacklist_entry: UncheckedAccount<'info>,

    pub token_2022_program: Program<'info, Token2022>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

pub fn mint_handler(ctx: Context<MintTokens>, amount: u64, recipient: Pubkey) -> Result<()> {
    let config = &ctx.accounts.config;
    let mint = &ctx.accounts.mint;

    require_role(config, Role::SupplyController, ctx.accounts.supply_controller.key)?;
    config.require_active()?;
    require!(amount > 0, GoldTokenError::InvalidAmount);

    let entry = ctx.accounts.recipient_blacklist_entry.to_account_info();
    BlacklistGate::inbound(&entry).before_transfer(None, Some(&recipient))?;

    let signer_seeds: &[&[u8]] = &[CONFIG_SEED, &[config.bump]];
    let signer_seeds_arr = [signer_seeds];
    let cpi_accounts = token_2022::MintTo {
        mint: mint.to_account_info(),
        to: ctx.accounts.recipient_token_account.to_account_info(),
        authority: config.to_account_info(),
    };
    let cpi_ctx = CpiContext::new_with_signer(
        ctx.accounts.token_2022_program.to_account_info(),
        cpi_accounts,
        &signer_seeds_arr,
    );
    token_2022::mint_to(cpi_ctx, amount)?;

    let new_total_supply = mint
        .supply
        .checked_add(amount)
        .ok_or(GoldTokenError::Overflow)?;

    emit!(TokensMinted {
        mint: mint.key(),
        recipient,
        recipient_token_account: ctx.accounts.recipient_token_account.key(),
        amount,
        supply_controller: ctx.accounts.supply_controller.key(),
        new_total_supply,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
