use anchor_lang::prelude::*;
use anchor_lang::solana_program::program::invoke;
use anchor_spl::token_2022::spl_token_2022::{
    extension::{transfer_fee, BaseStateWithExtensions, ExtensionType, StateWithExtensions},
    instruction as token_2022_instruction,
    state::{Account as Token2022Account, Mint as Token2022Mint},
};
use anchor_spl::token_2022::{self, Token2022};
use anchor_spl::token_interface::{Mint, TokenAccount};

use crate::compliance::{BlacklistGate, TransferGate};
use crate::constants::{CONFIG_SEED, REDEMPTION_ESCROW_SEED, REDEMPTION_REQUEST_SEED};
use crate::errors::GoldTokenError;
use crate::events::{
    RedemptionCancelled, RedemptionClosed, RedemptionFulfilled, RedemptionRequested,
    RedemptionStatusUpdated,
};
use crate::state::{Config, RedemptionAction, RedemptionRequest, RedemptionStatus, Role};
use crate::instructions::fees::withheld_in_account;
use crate::utils::{create_pda_account, require_role};

#[derive(Accounts)]
pub struct RequestRedemption<'info> {
    #[account(mut)]
    pub user: Signer<'info>,

    #[account(mut, seeds = [CONFIG_SEED], bump = config.bump, has_one = mint)]
    pub config: Account<'info, Config>,

    #[account(mut)]
    pub mint: InterfaceAccount<'info, Mint>,

    #[account(
        mut,
        token::mint = mint,
        token::authority = user,
        token::token_program = token_2022_program
    )]
    pub user_token_account: InterfaceAccount<'info, TokenAccount>,

    #[account(
        init,
        payer = user,
        space = 8 + RedemptionRequest::INIT_SPACE,
        seeds = [
            REDEMPTION_REQUEST_SEED,
            user.key().as_ref(),
            config.next_request_id().to_le_bytes().as_ref()
        ],
        bump
    )]
    pub redemption_request: Account<'info, RedemptionRequest>,

    /// CHECK: Created here as a token account that is its own authority.
    #[account(
        mut,
        seeds = [
            REDEMPTION_ESCROW_SEED,
            user.key().as_ref(),
            config.next_request_id().to_le_bytes().as_ref()
        ],
        bump
    )]
    pub escrow: UncheckedAccount<'info>,

    /// CHECK: Checked by the blacklist gate against the user.
    pub user_blacklist_entry: UncheckedAccount<'info>,

    pub token_2022_program: Program<'info, Token2022>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct SetRedemptionProcessing<'info> {
    pub supply_controller: Signer<'info>,

    #[account(seeds = [CONFIG_SEED], bump = config.bump)]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [
            REDEMPTION_REQUEST_SEED,
            redemption_request.user.as_ref(),
            redemption_request.request_id.to_le_bytes().as_ref()
        ],
        bump = redemption_request.bump
    )]
    pub redemption_request: Account<'info, RedemptionRequest>,
}

#[derive(Accounts)]
pub struct FulfillRedemption<'info> {
    pub supply_controller: Signer<'info>,

    #[account(seeds = [CONFIG_SEED], bump = config.bump, has_one = mint)]
    pub config: Account<'info, Config>,

    #[account(mut)]
    pub mint: InterfaceAccount<'info, Mint>,

    #[account(
        mut,
        seeds = [
            REDEMPTION_REQUEST_SEED,
            redemption_request.user.as_ref(),
            redemption_request.request_id.to_le_bytes().as_ref()
        ],
        bump = redemption_request.bump,
        has_one = user
    )]
    pub redemption_request: Account<'info, RedemptionRequest>,

    #[account(
        mut,
        seeds = [
            REDEMPTION_ESCROW_SEED,
            redemption_request.user.as_ref(),
            redemption_request.request_id.to_le_bytes().as_ref()
        ],
        bump = redemption_request.escrow_bump,
        token::mint = mint,
        token::token_program = token_2022_program
    )]
    pub escrow: InterfaceAccount<'info, TokenAccount>,

    /// CHECK: Receives the escrow rent; pinned to the request's user.
    #[account(mut)]
    pub user: UncheckedAccount<'info>,

    pub token_2022_program: Program<'info, Token2022>,
}

#[derive(Accounts)]
pub struct CancelRedemption<'info> {
    #[account(mut)]
    pub user: Signer<'info>,

    #[account(seeds = [CONFIG_SEED], bump = config.bump, has_one = mint)]
    pub config: Account<'info, Config>,

    #[account(mut)]
    pub mint: InterfaceAccount<'info, Mint>,

    #[account(
        mut,
        seeds = [
            REDEMPTION_REQUEST_SEED,
            user.key().as_ref(),
            redemption_request.request_id.to_le_bytes().as_ref()
        ],
        bump = redemption_request.bump,
        has_one = user
    )]
    pub redemption_request: Account<'info, RedemptionRequest>,

    #[account(
        mut,
        seeds = [
            REDEMPTION_ESCROW_SEED,
            user.key().as_ref(),
            redemption_request.request_id.to_le_bytes().as_ref()
        ],
        bump = redemption_request.escrow_bump,
        token::mint = mint,
        token::token_program = token_2022_program
    )]
    pub escrow: InterfaceAccount<'info, TokenAccount>,

    #[account(
        mut,
        token::mint = mint,
        token::authority = user,
        token::token_program = token_2022_program
    )]
    pub user_token_account: InterfaceAccount<'info, TokenAccount>,

    /// CHECK: Checked by the blacklist gate against the user.
    pub user_blacklist_entry: UncheckedAccount<'info>,

    pub token_2022_program: Program<'info, Token2022>,
}

#[derive(Accounts)]
pub struct CloseRedemptionRequest<'info> {
    #[account(mut)]
    pub user: Signer<'info>,

    #[account(
        mut,
        seeds = [
            REDEMPTION_REQUEST_SEED,
            user.key().as_ref(),
            redemption_request.request_id.to_le_bytes().as_ref()
        ],
        bump = redemption_request.bump,
        has_one = user,
        close = user
    )]
    pub redemption_request: Account<'info, RedemptionRequest>,
}

fn escrow_seeds<'a>(user: &'a Pubkey, request_id: &'a [u8; 8], bump: &'a [u8; 1]) -> [&'a [u8]; 4] {
    [REDEMPTION_ESCROW_SEED, user.as_ref(), request_id, bump]
}

/// Escrow balance above the requested amount. Only the engine funds an
/// escrow, so a shortfall means the account is not the one it created.
pub fn stray_escrow_amount(escrow_balance: u64, requested: u64) -> Result<u64> {
    let stray = escrow_balance
        .checked_sub(requested)
        .ok_or(GoldTokenError::EscrowMismatch)?;
    if stray > 0 {
        msg!("burning {} stray escrow units", stray);
    }
    Ok(stray)
}

/// Burns the whole escrow balance, moves any withheld fees to the mint and
/// closes the escrow with its rent going to `rent_destination`.
fn settle_escrow<'info>(
    token_program: &AccountInfo<'info>,
    mint: &AccountInfo<'info>,
    escrow: &AccountInfo<'info>,
    rent_destination: &AccountInfo<'info>,
    escrow_signer: &[&[u8]],
    balance: u64,
) -> Result<()> {
    token_2022::burn(
        CpiContext::new_with_signer(
            token_program.clone(),
            token_2022::Burn {
                mint: mint.clone(),
                from: escrow.clone(),
                authority: escrow.clone(),
            },
            &[escrow_signer],
        ),
        balance,
    )?;

    // Token-2022 refuses to close an account that still carries withheld fees.
    let withheld = withheld_in_account(&escrow.try_borrow_data()?, mint.key)?;
    if withheld > 0 {
        let harvest_ix = transfer_fee::instruction::harvest_withheld_tokens_to_mint(
            token_program.key,
            mint.key,
            &[escrow.key],
        )?;
        invoke(
            &harvest_ix,
            &[mint.clone(), escrow.clone(), token_program.clone()],
        )?;
    }

    token_2022::close_account(CpiContext::new_with_signer(
        token_program.clone(),
        token_2022::CloseAccount {
            account: escrow.clone(),
            destination: rent_destination.clone(),
            authority: escrow.clone(),
        },
        &[escrow_signer],
    ))
}

pub fn request_handler(ctx: Context<RequestRedemption>, amount: u64) -> Result<()> {
    let user_key = ctx.accounts.user.key();
    ctx.accounts.config.require_active()?;
    require!(amount > 0, GoldTokenError::InvalidAmount);
    require!(
        ctx.accounts.user_token_account.amount >= amount,
        GoldTokenError::InsufficientBalance
    );

    let entry = ctx.accounts.user_blacklist_entry.to_account_info();
    BlacklistGate::outbound(&entry).before_transfer(Some(&user_key), None)?;

    let request_id = ctx.accounts.config.advance_request_counter()?;
    let id_bytes = request_id.to_le_bytes();
    let escrow_bump = [ctx.bumps.escrow];
    let escrow_signer = escrow_seeds(&user_key, &id_bytes, &escrow_bump);

    let mint_info = ctx.accounts.mint.to_account_info();
    let escrow_info = ctx.accounts.escrow.to_account_info();
    let token_program_info = ctx.accounts.token_2022_program.to_account_info();

    // Escrow needs room for the per-account extensions the mint implies.
    let space = {
        let mint_data = mint_info.try_borrow_data()?;
        let mint_state = StateWithExtensions::<Token2022Mint>::unpack(&mint_data)?;
        let required = ExtensionType::get_required_init_account_extensions(
            &mint_state.get_extension_types()?,
        );
        ExtensionType::try_calculate_account_len::<Token2022Account>(&required)?
    };
    create_pda_account(
        &ctx.accounts.user.to_account_info(),
        &escrow_info,
        &ctx.accounts.system_program.to_account_info(),
        space,
        token_program_info.key,
        &escrow_signer,
    )?;
    let init_ix = token_2022_instruction::initialize_account3(
        token_program_info.key,
        escrow_info.key,
        mint_info.key,
        escrow_info.key,
    )?;
    invoke(
        &init_ix,
        &[escrow_info.clone(), mint_info.clone(), token_program_info.clone()],
    )?;

    // Burn + mint keeps supply flat and skips the transfer fee.
    token_2022::burn(
        CpiContext::new(
            token_program_info.clone(),
            token_2022::Burn {
                mint: mint_info.clone(),
                from: ctx.accounts.user_token_account.to_account_info(),
                authority: ctx.accounts.user.to_account_info(),
            },
        ),
        amount,
    )?;
    let config_seeds: &[&[u8]] = &[CONFIG_SEED, &[ctx.accounts.config.bump]];
    token_2022::mint_to(
        CpiContext::new_with_signer(
            token_program_info,
            token_2022::MintTo {
                mint: mint_info,
                to: escrow_info,
                authority: ctx.accounts.config.to_account_info(),
            },
            &[config_seeds],
        ),
        amount,
    )?;

    let now = Clock::get()?.unix_timestamp;
    let request = &mut ctx.accounts.redemption_request;
    request.user = user_key;
    request.request_id = request_id;
    request.amount = amount;
    request.status = RedemptionStatus::Pending;
    request.requested_at = now;
    request.completed_at = 0;
    request.bump = ctx.bumps.redemption_request;
    request.escrow_bump = ctx.bumps.escrow;

    emit!(RedemptionRequested {
        user: user_key,
        request_id,
        amount,
        escrow: ctx.accounts.escrow.key(),
        timestamp: now,
    });
    Ok(())
}

pub fn set_processing_handler(ctx: Context<SetRedemptionProcessing>) -> Result<()> {
    require_role(
        &ctx.accounts.config,
        Role::SupplyController,
        ctx.accounts.supply_controller.key,
    )?;

    let now = Clock::get()?.unix_timestamp;
    let request = &mut ctx.accounts.redemption_request;
    let old_status = request.transition(RedemptionAction::Process, now)?;

    emit!(RedemptionStatusUpdated {
        user: request.user,
        request_id: request.request_id,
        old_status,
        new_status: request.status,
        timestamp: now,
    });
    Ok(())
}

pub fn fulfill_handler(ctx: Context<FulfillRedemption>) -> Result<()> {
    let config = &ctx.accounts.config;
    require_role(config, Role::SupplyController, ctx.accounts.supply_controller.key)?;
    config.require_active()?;

    let now = Clock::get()?.unix_timestamp;
    let request = &mut ctx.accounts.redemption_request;
    request.transition(RedemptionAction::Fulfill, now)?;
    let escrow_balance = ctx.accounts.escrow.amount;
    stray_escrow_amount(escrow_balance, request.amount)?;

    let id_bytes = request.request_id.to_le_bytes();
    let escrow_bump = [request.escrow_bump];
    let escrow_signer = escrow_seeds(&request.user, &id_bytes, &escrow_bump);
    settle_escrow(
        &ctx.accounts.token_2022_program.to_account_info(),
        &ctx.accounts.mint.to_account_info(),
        &ctx.accounts.escrow.to_account_info(),
        &ctx.accounts.user.to_account_info(),
        &escrow_signer,
        escrow_balance,
    )?;

    let new_total_supply = ctx
        .accounts
        .mint
        .supply
        .checked_sub(escrow_balance)
        .ok_or(GoldTokenError::Overflow)?;

    emit!(RedemptionFulfilled {
        user: request.user,
        request_id: request.request_id,
        amount: request.amount,
        new_total_supply,
        timestamp: now,
    });
    Ok(())
}

pub fn cancel_handler(ctx: Context<CancelRedemption>) -> Result<()> {
    let user_key = ctx.accounts.user.key();
    ctx.accounts.config.require_active()?;

    let now = Clock::get()?.unix_timestamp;
    let request = &mut ctx.accounts.redemption_request;
    request.transition(RedemptionAction::Cancel, now)?;
    let escrow_balance = ctx.accounts.escrow.amount;
    stray_escrow_amount(escrow_balance, request.amount)?;

    let entry = ctx.accounts.user_blacklist_entry.to_account_info();
    BlacklistGate::inbound(&entry).before_transfer(None, Some(&user_key))?;

    let id_bytes = request.request_id.to_le_bytes();
    let escrow_bump = [request.escrow_bump];
    let escrow_signer = escrow_seeds(&user_key, &id_bytes, &escrow_bump);
    let mint_info = ctx.accounts.mint.to_account_info();
    let token_program_info = ctx.accounts.token_2022_program.to_account_info();

    settle_escrow(
        &token_program_info,
        &mint_info,
        &ctx.accounts.escrow.to_account_info(),
        &ctx.accounts.user.to_account_info(),
        &escrow_signer,
        escrow_balance,
    )?;
    let config_seeds: &[&[u8]] = &[CONFIG_SEED, &[ctx.accounts.config.bump]];
    token_2022::mint_to(
        CpiContext::new_with_signer(
            token_program_info,
            token_2022::MintTo {
                mint: mint_info,
                to: ctx.accounts.user_token_account.to_account_info(),
                authority: ctx.accounts.config.to_account_info(),
            },
            &[config_seeds],
        ),
        request.amount,
    )?;

    emit!(RedemptionCancelled {
        user: user_key,
        request_id: request.request_id,
        amount: request.amount,
        timestamp: now,
    });
    Ok(())
}

pub fn close_handler(ctx: Context<CloseRedemptionRequest>) -> Result<()> {
    let request = &ctx.accounts.redemption_request;
    require!(
        request.status.is_terminal(),
        GoldTokenError::RedemptionNotFinalized
    );

    emit!(RedemptionClosed {
        user: request.user,
        request_id: request.request_id,
        status: request.status,
    });
    Ok(())
}
