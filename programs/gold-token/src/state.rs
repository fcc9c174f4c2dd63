use anchor_lang::prelude::*;

use crate::errors::GoldTokenError;

/// Deployment-wide singleton stored at `["config"]`.
///
/// The PDA is also the mint authority, permanent delegate, transfer fee
/// authority and withdraw-withheld authority of the governed mint, so rotating
/// a role here is all it takes to move that power.
#[account]
#[derive(InitSpace)]
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

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    SupplyController,
    AssetProtection,
    FeeController,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Admin,
        Role::SupplyController,
        Role::AssetProtection,
        Role::FeeController,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SupplyController => "supply_controller",
            Role::AssetProtection => "asset_protection",
            Role::FeeController => "fee_controller",
        }
    }
}

impl Config {
    pub fn authority(&self, role: Role) -> Pubkey {
        match role {
            Role::Admin => self.admin,
            Role::SupplyController => self.supply_controller,
            Role::AssetProtection => self.asset_protection,
            Role::FeeController => self.fee_controller,
        }
    }

    /// Replaces one role holder and returns the previous one.
    pub fn rotate(&mut self, role: Role, new_authority: Pubkey) -> Result<Pubkey> {
        require_keys_neq!(
            new_authority,
            Pubkey::default(),
            GoldTokenError::InvalidRoleAddress
        );
        for other in Role::ALL.into_iter().filter(|other| *other != role) {
            require_keys_neq!(
                self.authority(other),
                new_authority,
                GoldTokenError::RoleConflict
            );
        }

        let slot = match role {
            Role::Admin => &mut self.admin,
            Role::SupplyController => &mut self.supply_controller,
            Role::AssetProtection => &mut self.asset_protection,
            Role::FeeController => &mut self.fee_controller,
        };
        Ok(std::mem::replace(slot, new_authority))
    }

    pub fn require_active(&self) -> Result<()> {
        require!(!self.is_paused, GoldTokenError::ProgramPaused);
        Ok(())
    }

    /// Id the next redemption request will receive. Used for PDA derivation.
    pub fn next_request_id(&self) -> u64 {
        self.redemption_request_counter.wrapping_add(1)
    }

    pub fn advance_request_counter(&mut self) -> Result<u64> {
        let request_id = self
            .redemption_request_counter
            .checked_add(1)
            .ok_or(GoldTokenError::CounterOverflow)?;
        self.redemption_request_counter = request_id;
        Ok(request_id)
    }
}

/// Marker stored at `["blacklist", wallet]`. Existence means denied.
#[account]
#[derive(InitSpace)]
pub struct BlacklistEntry {
    pub wallet: Pubkey,
    pub blacklisted_by: Pubkey,
    pub blacklisted_at: i64,
    pub bump: u8,
}

impl BlacklistEntry {
    pub fn is_initialized(&self) -> bool {
        self.wallet != Pubkey::default()
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, InitSpace)]
pub enum RedemptionStatus {
    Pending,
    Processing,
    Fulfilled,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedemptionAction {
    Process,
    Fulfill,
    Cancel,
}

impl RedemptionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RedemptionStatus::Fulfilled | RedemptionStatus::Cancelled)
    }

    pub fn apply(self, action: RedemptionAction) -> Result<RedemptionStatus> {
        use RedemptionAction::*;
        use RedemptionStatus::*;

        match (self, action) {
            (Fulfilled | Cancelled, _) => err!(GoldTokenError::RedemptionFinalized),
            (Pending, Process) => Ok(Processing),
            (Pending, Cancel) => Ok(Cancelled),
            (Pending, Fulfill) => err!(GoldTokenError::RedemptionNotProcessing),
            (Processing, Fulfill) => Ok(Fulfilled),
            (Processing, Process) => err!(GoldTokenError::RedemptionAlreadyProcessing),
            (Processing, Cancel) => err!(GoldTokenError::RedemptionNotPending),
        }
    }
}

/// Stored at `["redemption_request", user, request_id]`. The escrowed tokens
/// sit in a token account at `["redemption_pda", user, request_id]`.
#[account]
#[derive(InitSpace)]
pub struct RedemptionRequest {
    pub user: Pubkey,
    pub request_id: u64,
    pub amount: u64,
    pub status: RedemptionStatus,
    pub requested_at: i64,
    pub completed_at: i64,
    pub bump: u8,
    pub escrow_bump: u8,
}

impl RedemptionRequest {
    /// Moves the request along its lifecycle and returns the previous status.
    pub fn transition(&mut self, action: RedemptionAction, now: i64) -> Result<RedemptionStatus> {
        let previous = self.status;
        self.status = previous.apply(action)?;
        if self.status.is_terminal() {
            self.completed_at = now;
        }
        Ok(previous)
    }
}
