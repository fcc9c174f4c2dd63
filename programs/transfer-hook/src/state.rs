use anchor_lang::prelude::*;

/// Read-only mirror of the gold token program's `Config`. The layout and name
/// must match so the account discriminator agrees.
#[account]
#[derive(Debug)]
pub struct Config {
    pub admin: Pubkey,
    pub supply_controller: Pubkey,
    pub asset_protection: Pubkey,
    pub fee_controller: Pubkey,
    pub mint: Pubkey,
    pub gatekeeper_program: Pubkey,
    pub transfer_fee_basis_points: u16,
    pub maximum_fee: u64,
    pub decimals: u8,
    pub redemption_request_counter: u64,
    pub is_paused: bool,
    pub bump: u8,
}
