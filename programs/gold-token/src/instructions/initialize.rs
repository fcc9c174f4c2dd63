use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::solana_program::program::{invoke, invoke_signed};
use anchor_lang::system_program;
use anchor_spl::token_2022::spl_token_2022::{
    extension::{metadata_pointer, transfer_fee, transfer_hook, ExtensionType},
    instruction as token_2022_instruction,
    state::Mint as Token2022Mint,
};
use anchor_spl::token_2022::Token2022;
use spl_transfer_hook_interface::get_extra_account_metas_address;
use spl_transfer_hook_interface::instruction::TransferHookInstruction;

use crate::constants::{
    CONFIG_SEED, MAX_FEE_BASIS_POINTS, MAX_NAME_LEN, MAX_SYMBOL_LEN,
    MAX_URI_LEN, TOKEN_DECIMALS,
};
use crate::errors::GoldTokenError;
use crate::events::TokenInitialized;
use crate::state::Config;
use crate::utils::build_extra_account_metas;

#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct InitializeArgs {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub transfer_fee_basis_points: u16,
    pub maximum_fee: u64,
    pub supply_controller: Pubkey,
    pub asset_protection: Pubkey,
    pub fee_controller: Pubkey,
}

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(mut)]
    pub admin: Signer<'info>,

    #[account(mut)]
    pub mint: Signer<'info>,

    #[account(
        init,
        payer = admin,
        space = 8 + Config::INIT_SPACE,
        seeds = [CONFIG_SEED],
        bump
    )]
    pub config: Account<'info, Config>,

    /// CHECK: Registered as the mint's transfer hook; must be an executable program.
    #[account(executable)]
    pub gatekeeper_program: UncheckedAccount<'info>,

    /// CHECK: Verified against the gatekeeper's derived address, created by its CPI.
    #[account(mut)]
    pub extra_account_meta_list: UncheckedAccount<'info>,

    pub token_2022_program: Program<'info, Token2022>,

    pub system_program: Program<'info, System>,
}

/// Bytes the token metadata TLV entry occupies once written to the mint.
pub fn metadata_space(name: &str, symbol: &str, uri: &str) -> usize {
    // type (2) + length (2), update authority, mint, three strings, empty vec
    const TLV_HEADER: usize = 2 + 2;
    TLV_HEADER + 32 + 32 + (4 + name.len()) + (4 + symbol.len()) + (4 + uri.len()) + 4
}

pub fn validate_args(admin: &Pubkey, args: &InitializeArgs) -> Result<()> {
    require!(args.name.len() <= MAX_NAME_LEN, GoldTokenError::NameTooLong);
    require!(
        args.symbol.len() <= MAX_SYMBOL_LEN,
        GoldTokenError::SymbolTooLong
    );
    require!(args.uri.len() <= MAX_URI_LEN, GoldTokenError::UriTooLong);
    require!(
        args.transfer_fee_basis_points <= MAX_FEE_BASIS_POINTS,
        GoldTokenError::InvalidFeeBasisPoints
    );

    let roles = [
        *admin,
        args.supply_controller,
        args.asset_protection,
        args.fee_controller,
    ];
    for (i, role) in roles.iter().enumerate() {
        require_keys_neq!(*role, Pubkey::default(), GoldTokenError::InvalidRoleAddress);
        require!(
            !roles[i + 1..].contains(role),
            GoldTokenError::RoleConflict
        );
    }
    Ok(())
}

pub fn initialize_handler(ctx: Context<Initialize>, args: InitializeArgs) -> Result<()> {
    validate_args(&ctx.accounts.admin.key(), &args)?;

    let mint_key = ctx.accounts.mint.key();
    let token_program_id = ctx.accounts.token_2022_program.key();
    let config_key = ctx.accounts.config.key();
    let config_bump = ctx.bumps.config;
    let hook_program_id = ctx.accounts.gatekeeper_program.key();

    let extensions = [
        ExtensionType::TransferFeeConfig,
        ExtensionType::PermanentDelegate,
        ExtensionType::TransferHook,
        ExtensionType::MetadataPointer,
    ];
    let base_len = ExtensionType::try_calculate_account_len::<Token2022Mint>(&extensions)?;
    // Token-2022 reallocs the mint for metadata but does not fund it.
    let funded_len = base_len + metadata_space(&args.name, &args.symbol, &args.uri);
    let lamports = Rent::get()?.minimum_balance(funded_len);
    let create_accounts = system_program::CreateAccount {
        from: ctx.accounts.admin.to_account_info(),
        to: ctx.accounts.mint.to_account_info(),
    };
    let create_ctx = CpiContext::new(
        ctx.accounts.system_program.to_account_info(),
        create_accounts,
    );
    system_program::create_account(create_ctx, lamports, base_len as u64, &token_program_id)?;

    let mint_info = ctx.accounts.mint.to_account_info();
    let token_program_info = ctx.accounts.token_2022_program.to_account_info();
    let config_info = ctx.accounts.config.to_account_info();
    let admin_info = ctx.accounts.admin.to_account_info();

    // Every mint-level authority is the config PDA so role rotation alone moves power.
    let fee_ix = transfer_fee::instruction::initialize_transfer_fee_config(
        &token_program_id,
        &mint_key,
        Some(&config_key),
        Some(&config_key),
        args.transfer_fee_basis_points,
        args.maximum_fee,
    )?;
    invoke(&fee_ix, &[mint_info.clone(), token_program_info.clone()])?;

    let delegate_ix =
        token_2022_instruction::initialize_permanent_delegate(&token_program_id, &mint_key, &config_key)?;
    invoke(
        &delegate_ix,
        &[mint_info.clone(), token_program_info.clone()],
    )?;

    let hook_ix = transfer_hook::instruction::initialize(
        &token_program_id,
        &mint_key,
        Some(config_key),
        Some(hook_program_id),
    )?;
    invoke(&hook_ix, &[mint_info.clone(), token_program_info.clone()])?;

    let pointer_ix = metadata_pointer::instruction::initialize(
        &token_program_id,
        &mint_key,
        Some(config_key),
        Some(mint_key),
    )?;
    invoke(&pointer_ix, &[mint_info.clone(), token_program_info.clone()])?;

    let mint_ix = token_2022_instruction::initialize_mint2(
        &token_program_id,
        &mint_key,
        &config_key,
        None,
        TOKEN_DECIMALS,
    )?;
    invoke(&mint_ix, &[mint_info.clone(), token_program_info.clone()])?;

    let signer_seeds: &[&[u8]] = &[CONFIG_SEED, &[config_bump]];
    let metadata_ix = spl_token_metadata_interface::instruction::initialize(
        &token_program_id,
        &mint_key,
        &config_key,
        &mint_key,
        &config_key,
        args.name.clone(),
        args.symbol.clone(),
        args.uri.clone(),
    );
    invoke_signed(
        &metadata_ix,
        &[
            mint_info.clone(),
            config_info.clone(),
            mint_info.clone(),
            config_info.clone(),
            token_program_info.clone(),
        ],
        &[signer_seeds],
    )?;

    let config = &mut ctx.accounts.config;
    config.admin = ctx.accounts.admin.key();
    config.supply_controller = args.supply_controller;
    config.asset_protection = args.asset_protection;
    config.fee_controller = args.fee_controller;
    config.mint = mint_key;
    config.gatekeeper_program = hook_program_id;
    config.transfer_fee_basis_points = args.transfer_fee_basis_points;
    config.maximum_fee = args.maximum_fee;
    config.decimals = TOKEN_DECIMALS;
    config.redemption_request_counter = 0;
    config.is_paused = false;
    config.bump = config_bump;

    let extra_metas_key = get_extra_account_metas_address(&mint_key, &hook_program_id);
    require_keys_eq!(
        ctx.accounts.extra_account_meta_list.key(),
        extra_metas_key,
        GoldTokenError::InvalidExtraAccountMetas
    );
    let extra_metas_ix = Instruction {
        program_id: hook_program_id,
        accounts: vec![
            AccountMeta::new(extra_metas_key, false),
            AccountMeta::new_readonly(mint_key, false),
            AccountMeta::new(admin_info.key(), true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
        data: TransferHookInstruction::InitializeExtraAccountMetaList {
            extra_account_metas: build_extra_account_metas()?,
        }
        .pack(),
    };
    invoke(
        &extra_metas_ix,
        &[
            ctx.accounts.extra_account_meta_list.to_account_info(),
            mint_info,
            admin_info,
            ctx.accounts.system_program.to_account_info(),
            ctx.accounts.gatekeeper_program.to_account_info(),
        ],
    )?;

    emit!(TokenInitialized {
        config: config.key(),
        mint: mint_key,
        admin: config.admin,
        gatekeeper_program: hook_program_id,
        name: args.name,
        symbol: args.symbol,
        transfer_fee_basis_points: config.transfer_fee_basis_points,
        maximum_fee: config.maximum_fee,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spl_token_metadata_interface::state::TokenMetadata;

    fn args() -> InitializeArgs {
        InitializeArgs {
            name: "Gold".to_string(),
            symbol: "GOLD".to_string(),
            uri: "https://example.com/gold.json".to_string(),
            transfer_fee_basis_points: 20,
            maximum_fee: 1_000_000_000,
            supply_controller: Pubkey::new_unique(),
            asset_protection: Pubkey::new_unique(),
            fee_controller: Pubkey::new_unique(),
        }
    }

    #[test]
    fn accepts_distinct_roles() {
        assert!(validate_args(&Pubkey::new_unique(), &args()).is_ok());
    }

    #[test]
    fn rejects_shared_or_empty_roles() {
        let admin = Pubkey::new_unique();
        let mut shared = args();
        shared.fee_controller = admin;
        assert_eq!(
            validate_args(&admin, &shared).unwrap_err(),
            GoldTokenError::RoleConflict.into()
        );

        let mut empty = args();
        empty.asset_protection = Pubkey::default();
        assert_eq!(
            validate_args(&admin, &empty).unwrap_err(),
            GoldTokenError::InvalidRoleAddress.into()
        );
    }

    #[test]
    fn rejects_out_of_range_fee_and_long_metadata() {
        let admin = Pubkey::new_unique();
        let mut fee = args();
        fee.transfer_fee_basis_points = 10_001;
        assert_eq!(
            validate_args(&admin, &fee).unwrap_err(),
            GoldTokenError::InvalidFeeBasisPoints.into()
        );

        let mut symbol = args();
        symbol.symbol = "GOLDGOLDGOLD".to_string();
        assert_eq!(
            validate_args(&admin, &symbol).unwrap_err(),
            GoldTokenError::SymbolTooLong.into()
        );
    }

    #[test]
    fn metadata_space_counts_string_prefixes() {
        assert_eq!(metadata_space("", "", ""), 4 + 64 + 16);
        assert_eq!(metadata_space("Gold", "GOLD", "u"), 4 + 64 + 16 + 9);
    }

    #[test]
    fn metadata_space_matches_token_metadata_entry() {
        let args = args();
        let metadata = TokenMetadata {
            name: args.name.clone(),
            symbol: args.symbol.clone(),
            uri: args.uri.clone(),
            ..Default::default()
        };
        assert_eq!(
            metadata_space(&args.name, &args.symbol, &args.uri),
            metadata.tlv_size_of().unwrap()
        );
    }
}
