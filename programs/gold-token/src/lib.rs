use anchor_lang::prelude::*;

pub mod compliance;
pub mod constants;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;
pub mod utils;

pub use instructions::*;
use state::Role;

declare_id!("EmAVX6yoxozANh9DUWNHp49Tac3rwjSU44aisUexD71f");

#[program]
pub mod gold_token {
    use super::*;

    pub fn initialize(
        ctx: Context<Initialize>,
        args: initialize::InitializeArgs,
    ) -> Result<()> {
        initialize::initialize_handler(ctx, args)
    }

    pub fn mint_tokens(
        ctx: Context<MintTokens>,
        amount: u64,
        recipient: Pubkey,
    ) -> Result<()> {
        mint::mint_handler(ctx, amount, recipient)
    }

    pub fn toggle_pause(ctx: Context<TogglePause>) -> Result<()> {
        pause::toggle_pause_handler(ctx)
    }

    pub fn update_admin(ctx: Context<UpdateRole>, new_admin: Pubkey) -> Result<()> {
        roles::update_role_handler(ctx, Role::Admin, new_admin)
    }

    pub fn update_supply_controller(
        ctx: Context<UpdateRole>,
        new_supply_controller: Pubkey,
    ) -> Result<()> {
        roles::update_role_handler(ctx, Role::SupplyController, new_supply_controller)
    }

    pub fn update_asset_protection(
        ctx: Context<UpdateRole>,
        new_asset_protection: Pubkey,
    ) -> Result<()> {
        roles::update_role_handler(ctx, Role::AssetProtection, new_asset_protection)
    }

    pub fn update_fee_controller(
        ctx: Context<UpdateRole>,
        new_fee_controller: Pubkey,
    ) -> Result<()> {
        roles::update_role_handler(ctx, Role::FeeController, new_fee_controller)
    }

    pub fn add_to_blacklist(
        ctx: Context<AddToBlacklist>,
        wallet: Pubkey,
    ) -> Result<()> {
        blacklist::add_handler(ctx, wallet)
    }

    pub fn remove_from_blacklist(
        ctx: Context<RemoveFromBlacklist>,
        wallet: Pubkey,
    ) -> Result<()> {
        blacklist::remove_handler(ctx, wallet)
    }

    pub fn wipe_blacklisted_address(
        ctx: Context<WipeBlacklistedAddress>,
        wallet: Pubkey,
        amount: u64,
    ) -> Result<()> {
        wipe::wipe_handler(ctx, wallet, amount)
    }

    pub fn request_redemption(
        ctx: Context<RequestRedemption>,
        amount: u64,
    ) -> Result<()> {
        redemption::request_handler(ctx, amount)
    }

    pub fn set_redemption_processing(
        ctx: Context<SetRedemptionProcessing>,
    ) -> Result<()> {
        redemption::set_processing_handler(ctx)
    }

    pub fn fulfill_redemption(ctx: Context<FulfillRedemption>) -> Result<()> {
        redemption::fulfill_handler(ctx)
    }

    pub fn cancel_redemption(ctx: Context<CancelRedemption>) -> Result<()> {
        redemption::cancel_handler(ctx)
    }

    pub fn close_redemption_request(
        ctx: Context<CloseRedemptionRequest>,
    ) -> Result<()> {
        redemption::close_handler(ctx)
    }

    pub fn withdraw_withheld_tokens_from_mint(
        ctx: Context<WithdrawWithheld>,
    ) -> Result<()> {
        fees::from_mint_handler(ctx)
    }

    pub fn withdraw_withheld_tokens_from_accounts<'info>(
        ctx: Context<'_, '_, 'info, 'info, WithdrawWithheld<'info>>,
    ) -> Result<()> {
        fees::from_accounts_handler(ctx)
    }
}
