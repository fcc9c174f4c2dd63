use anyhow::Result;
use borsh::BorshSerialize;
use gold_token::constants::EXTRA_ACCOUNT_METAS_SEED;
use gold_token::state::Role;
use gold_token::utils::{
    find_blacklist_address, find_config_address, find_redemption_escrow_address,
    find_redemption_request_address,
};
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use spl_associated_token_account::get_associated_token_address_with_program_id;
use spl_token_2022::extension::transfer_fee::instruction::transfer_checked_with_fee;

pub fn anchor_discriminator(name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(format!("global:{}", name));
    let hash = hasher.finalize();
    let mut output = [0u8; 8];
    output.copy_from_slice(&hash[..8]);
    output
}

fn build_instruction(name: &str, data: Vec<u8>, accounts: Vec<AccountMeta>) -> Instruction {
    let mut payload = Vec::with_capacity(8 + data.len());
    payload.extend_from_slice(&anchor_discriminator(name));
    payload.extend_from_slice(&data);
    Instruction {
        program_id: gold_token::ID,
        accounts,
        data: payload,
    }
}

pub fn token_account_address(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(wallet, mint, &spl_token_2022::id())
}

pub fn find_extra_account_metas_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[EXTRA_ACCOUNT_METAS_SEED, mint.as_ref()],
        &transfer_hook::ID,
    )
    .0
}

/// Creates the Token-2022 associated account for `wallet` unless it exists.
pub fn build_create_token_account_instruction(
    payer: &Pubkey,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    spl_associated_token_account::instruction::create_associated_token_account_idempotent(
        payer,
        wallet,
        mint,
        &spl_token_2022::id(),
    )
}

#[derive(BorshSerialize)]
struct InitializeArgs {
    name: String,
    symbol: String,
    uri: String,
    transfer_fee_basis_points: u16,
    maximum_fee: u64,
    supply_controller: Pubkey,
    asset_protection: Pubkey,
    fee_controller: Pubkey,
}

#[derive(BorshSerialize)]
struct MintTokensArgs {
    amount: u64,
    recipient: Pubkey,
}

#[derive(BorshSerialize)]
struct AmountArgs {
    amount: u64,
}

#[derive(BorshSerialize)]
struct WalletArgs {
    wallet: Pubkey,
}

#[derive(BorshSerialize)]
struct WipeArgs {
    wallet: Pubkey,
    amount: u64,
}

pub struct InitializeParams {
    pub admin: Pubkey,
    pub mint: Pubkey,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub transfer_fee_basis_points: u16,
    pub maximum_fee: u64,
    pub supply_controller: Pubkey,
    pub asset_protection: Pubkey,
    pub fee_controller: Pubkey,
}

pub fn build_initialize_instruction(params: InitializeParams) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(params.admin, true),
        AccountMeta::new(params.mint, true),
        AccountMeta::new(find_config_address().0, false),
        AccountMeta::new_readonly(transfer_hook::ID, false),
        AccountMeta::new(find_extra_account_metas_address(&params.mint), false),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let data = InitializeArgs {
        name: params.name,
        symbol: params.symbol,
        uri: params.uri,
        transfer_fee_basis_points: params.transfer_fee_basis_points,
        maximum_fee: params.maximum_fee,
        supply_controller: params.supply_controller,
        asset_protection: params.asset_protection,
        fee_controller: params.fee_controller,
    }
    .try_to_vec()?;
    Ok(build_instruction("initialize", data, accounts))
}

pub struct MintParams {
    pub supply_controller: Pubkey,
    pub mint: Pubkey,
    pub recipient: Pubkey,
    pub amount: u64,
}

pub fn build_mint_instruction(params: MintParams) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(params.supply_controller, true),
        AccountMeta::new_readonly(find_config_address().0, false),
        AccountMeta::new(params.mint, false),
        AccountMeta::new_readonly(params.recipient, false),
        AccountMeta::new(token_account_address(&params.recipient, &params.mint), false),
        AccountMeta::new_readonly(find_blacklist_address(&params.recipient).0, false),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let data = MintTokensArgs {
        amount: params.amount,
        recipient: params.recipient,
    }
    .try_to_vec()?;
    Ok(build_instruction("mint_tokens", data, accounts))
}

pub fn build_toggle_pause_instruction(admin: Pubkey) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(admin, true),
        AccountMeta::new(find_config_address().0, false),
    ];
    build_instruction("toggle_pause", Vec::new(), accounts)
}

pub fn build_update_role_instruction(
    admin: Pubkey,
    role: Role,
    new_authority: Pubkey,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new_readonly(admin, true),
        AccountMeta::new(find_config_address().0, false),
    ];
    let name = format!("update_{}", role.label());
    Ok(build_instruction(
        &name,
        new_authority.try_to_vec()?,
        accounts,
    ))
}

pub fn build_add_to_blacklist_instruction(
    asset_protection: Pubkey,
    wallet: Pubkey,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(asset_protection, true),
        AccountMeta::new_readonly(find_config_address().0, false),
        AccountMeta::new(find_blacklist_address(&wallet).0, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let data = WalletArgs { wallet }.try_to_vec()?;
    Ok(build_instruction("add_to_blacklist", data, accounts))
}

pub fn build_remove_from_blacklist_instruction(
    asset_protection: Pubkey,
    wallet: Pubkey,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(asset_protection, true),
        AccountMeta::new_readonly(find_config_address().0, false),
        AccountMeta::new(find_blacklist_address(&wallet).0, false),
    ];
    let data = WalletArgs { wallet }.try_to_vec()?;
    Ok(build_instruction("remove_from_blacklist", data, accounts))
}

pub struct WipeParams {
    pub asset_protection: Pubkey,
    pub mint: Pubkey,
    pub wallet: Pubkey,
    pub amount: u64,
}

pub fn build_wipe_instruction(params: WipeParams) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new_readonly(params.asset_protection, true),
        AccountMeta::new_readonly(find_config_address().0, false),
        AccountMeta::new(params.mint, false),
        AccountMeta::new(token_account_address(&params.wallet, &params.mint), false),
        AccountMeta::new_readonly(find_blacklist_address(&params.wallet).0, false),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
    ];
    let data = WipeArgs {
        wallet: params.wallet,
        amount: params.amount,
    }
    .try_to_vec()?;
    Ok(build_instruction("wipe_blacklisted_address", data, accounts))
}

pub struct RedemptionParams {
    pub user: Pubkey,
    pub mint: Pubkey,
    pub request_id: u64,
}

impl RedemptionParams {
    fn request(&self) -> Pubkey {
        find_redemption_request_address(&self.user, self.request_id).0
    }

    fn escrow(&self) -> Pubkey {
        find_redemption_escrow_address(&self.user, self.request_id).0
    }
}

/// `params.request_id` must be the config counter plus one.
pub fn build_request_redemption_instruction(
    params: &RedemptionParams,
    amount: u64,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(params.user, true),
        AccountMeta::new(find_config_address().0, false),
        AccountMeta::new(params.mint, false),
        AccountMeta::new(token_account_address(&params.user, &params.mint), false),
        AccountMeta::new(params.request(), false),
        AccountMeta::new(params.escrow(), false),
        AccountMeta::new_readonly(find_blacklist_address(&params.user).0, false),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let data = AmountArgs { amount }.try_to_vec()?;
    Ok(build_instruction("request_redemption", data, accounts))
}

pub fn build_set_processing_instruction(
    supply_controller: Pubkey,
    params: &RedemptionParams,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(supply_controller, true),
        AccountMeta::new_readonly(find_config_address().0, false),
        AccountMeta::new(params.request(), false),
    ];
    build_instruction("set_redemption_processing", Vec::new(), accounts)
}

pub fn build_fulfill_instruction(
    supply_controller: Pubkey,
    params: &RedemptionParams,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(supply_controller, true),
        AccountMeta::new_readonly(find_config_address().0, false),
        AccountMeta::new(params.mint, false),
        AccountMeta::new(params.request(), false),
        AccountMeta::new(params.escrow(), false),
        AccountMeta::new(params.user, false),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
    ];
    build_instruction("fulfill_redemption", Vec::new(), accounts)
}

pub fn build_cancel_instruction(params: &RedemptionParams) -> Instruction {
    let accounts = vec![
        AccountMeta::new(params.user, true),
        AccountMeta::new_readonly(find_config_address().0, false),
        AccountMeta::new(params.mint, false),
        AccountMeta::new(params.request(), false),
        AccountMeta::new(params.escrow(), false),
        AccountMeta::new(token_account_address(&params.user, &params.mint), false),
        AccountMeta::new_readonly(find_blacklist_address(&params.user).0, false),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
    ];
    build_instruction("cancel_redemption", Vec::new(), accounts)
}

pub fn build_close_request_instruction(params: &RedemptionParams) -> Instruction {
    let accounts = vec![
        AccountMeta::new(params.user, true),
        AccountMeta::new(params.request(), false),
    ];
    build_instruction("close_redemption_request", Vec::new(), accounts)
}

fn withdraw_accounts(fee_controller: Pubkey, mint: Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(fee_controller, true),
        AccountMeta::new_readonly(find_config_address().0, false),
        AccountMeta::new(mint, false),
        AccountMeta::new(token_account_address(&fee_controller, &mint), false),
        AccountMeta::new_readonly(spl_token_2022::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ]
}

pub fn build_withdraw_from_mint_instruction(fee_controller: Pubkey, mint: Pubkey) -> Instruction {
    build_instruction(
        "withdraw_withheld_tokens_from_mint",
        Vec::new(),
        withdraw_accounts(fee_controller, mint),
    )
}

pub fn build_withdraw_from_accounts_instruction(
    fee_controller: Pubkey,
    mint: Pubkey,
    sources: &[Pubkey],
) -> Instruction {
    let mut accounts = withdraw_accounts(fee_controller, mint);
    accounts.extend(
        sources
            .iter()
            .map(|source| AccountMeta::new(*source, false)),
    );
    build_instruction("withdraw_withheld_tokens_from_accounts", Vec::new(), accounts)
}

pub struct TransferParams {
    pub owner: Pubkey,
    pub recipient: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
    pub decimals: u8,
    pub fee: u64,
}

/// `transfer_checked_with_fee` plus the accounts Token-2022 needs to invoke
/// the hook: the resolved extras, then the hook program and its meta list.
pub fn build_transfer_instruction(params: TransferParams) -> Result<Instruction> {
    let source = token_account_address(&params.owner, &params.mint);
    let destination = token_account_address(&params.recipient, &params.mint);
    let mut ix = transfer_checked_with_fee(
        &spl_token_2022::id(),
        &source,
        &params.mint,
        &destination,
        &params.owner,
        &[],
        params.amount,
        params.decimals,
        params.fee,
    )?;
    ix.accounts.extend([
        AccountMeta::new_readonly(gold_token::ID, false),
        AccountMeta::new_readonly(find_config_address().0, false),
        AccountMeta::new_readonly(find_blacklist_address(&params.owner).0, false),
        AccountMeta::new_readonly(find_blacklist_address(&params.recipient).0, false),
        AccountMeta::new_readonly(transfer_hook::ID, false),
        AccountMeta::new_readonly(find_extra_account_metas_address(&params.mint), false),
    ]);
    Ok(ix)
}
