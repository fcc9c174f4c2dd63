use anchor_lang::prelude::*;

use crate::constants::CONFIG_SEED;
use crate::events::RoleUpdated;
use crate::state::{Config, Role};
use crate::utils::require_role;

#[derive(Accounts)]
pub struct UpdateRole<'info> {
    pub admin: Signer<'info>,

    #[account(mut, seeds = [CONFIG_SEED], bump = config.bump)]
    pub config: Account<'info, Config>,
}

/// Replaces one role holder. Works while paused.
pub fn update_role_handler(ctx: Context<UpdateRole>, role: Role, new_authority: Pubkey) -> Result<()> {
    let admin = ctx.accounts.admin.key();
    let config = &mut ctx.accounts.config;
    require_role(config, Role::Admin, &admin)?;

    let old_authority = config.rotate(role, new_authority)?;
    msg!("{} rotated to {}", role.label(), new_authority);

    emit!(RoleUpdated {
        role: role.label().to_string(),
        old_authority,
        new_authority,
        updated_by: admin,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
