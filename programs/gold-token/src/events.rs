use anchor_lang::prelude::*;

use crate::state::RedemptionStatus;

#[event]
pub struct TokenInitialized {
    pub config: Pubkey,
    pub mint: Pubkey,
    pub admin: Pubkey,
    pub gatekeeper_program: Pubkey,
    pub name: String,
    pub symbol: String,
    pub transfer_fee_basis_points: u16,
    pub maximum_fee: u64,
    pub timestamp: i64,
}

#[event]
pub struct TokensMinted {
    pub mint: Pubkey,
    pub recipient: Pubkey,
    pub recipient_token_account: Pubkey,
    pub amount: u64,
    pub supply_controller: Pubkey,
    pub new_total_supply: u64,
    pub timestamp: i64,
}

#[event]
pub struct PauseToggled {
    pub is_paused: bool,
    pub admin: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct RoleUpdated {
    pub role: String,
    pub old_authority: Pubkey,
    pub new_authority: Pubkey,
    pub updated_by: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct AddressBlacklisted {
    pub wallet: Pubkey,
    pub blacklisted_by: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct AddressUnblacklisted {
    pub wallet: Pubkey,
    pub removed_by: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct TokensWiped {
    pub wallet: Pubkey,
    pub token_account: Pubkey,
    pub requested_amount: u64,
    pub wiped_amount: u64,
    pub wiped_by: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct WithheldTokensWithdrawn {
    pub mint: Pubkey,
    pub destination: Pubkey,
    pub amount: u64,
    pub source_accounts: u32,
    pub fee_controller: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct RedemptionRequested {
    pub user: Pubkey,
    pub request_id: u64,
    pub amount: u64,
    pub escrow: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct RedemptionStatusUpdated {
    pub user: Pubkey,
    pub request_id: u64,
    pub old_status: RedemptionStatus,
    pub new_status: RedemptionStatus,
    pub timestamp: i64,
}

#[event]
pub struct RedemptionFulfilled {
    pub user: Pubkey,
    pub request_id: u64,
    pub amount: u64,
    pub new_total_supply: u64,
    pub timestamp: i64,
}

#[event]
pub struct RedemptionCancelled {
    pub user: Pubkey,
    pub request_id: u64,
    pub amount: u64,
    pub timestamp: i64,
}

#[event]
pub struct RedemptionClosed {
    pub user: Pubkey,
    pub request_id: u64,
    pub status: RedemptionStatus,
}
