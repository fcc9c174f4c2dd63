use anchor_lang::prelude::*;

use crate::constants::CONFIG_SEED;
use crate::events::PauseToggled;
use crate::state::{Config, Role};
use crate::utils::require_role;

#[derive(Accounts)]
pub struct TogglePause<'info> {
    pub admin: Signer<'info>,

    #[account(mut, seeds = [CONFIG_SEED], bump = config.bump)]
    pub config: Account<'info, Config>,
}

/// Not gated on the pause flag, otherwise the admin could never unpause.
pub fn toggle_pause_handler(ctx: Context<TogglePause>) -> Result<()> {
    let config = &mut ctx.accounts.config;
    require_role(config, Role::Admin, ctx.accounts.admin.key)?;

    config.is_paused = !config.is_paused;
    msg!("paused: {}", config.is_paused);

    emit!(PauseToggled {
        is_paused: config.is_paused,
        admin: ctx.accounts.admin.key(),
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}
