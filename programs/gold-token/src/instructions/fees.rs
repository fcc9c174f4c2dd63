use anchor_lang::prelude::*;
use anchor_lang::solana_program::program::invoke_signed;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token_2022::spl_token_2022::{
    extension::{
        transfer_fee::{self, TransferFeeAmount, TransferFeeConfig},
        BaseStateWithExtensions, StateWithExtensions,
    },
    state::{Account as Token2022Account, Mint as Token2022Mint},
};
use anchor_spl::token_2022::Token2022;
use anchor_spl::token_interface::{Mint, TokenAccount};

use crate::constants::{CONFIG_SEED, MAX_FEE_SOURCES_PER_WITHDRAWAL};
use crate::errors::GoldTokenError;
use crate::events::WithheldTokensWithdrawn;
use crate::state::{Config, Role};
use crate::utils::require_role;

#[derive(Accounts)]
pub struct WithdrawWithheld<'info> {
    #[account(mut)]
    pub fee_controller: Signer<'info>,

    #[account(seeds = [CONFIG_SEED], bump = config.bump, has_one = mint)]
    pub config: Account<'info, Config>,

    #[account(mut)]
    pub mint: InterfaceAccount<'info, Mint>,

    #[account(
        init_if_needed,
        payer = fee_controller,
        associated_token::mint = mint,
        associated_token::authority = fee_controller,
        associated_token::token_program = token_2022_program
    )]
    pub fee_controller_token_account: InterfaceAccount<'info, TokenAccount>,

    pub token_2022_program: Program<'info, Token2022>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

/// Withheld amount recorded on a token account of `mint`.
pub fn withheld_in_account(data: &[u8], mint: &Pubkey) -> Result<u64> {
    let state = StateWithExtensions::<Token2022Account>::unpack(data)
        .map_err(|_| error!(GoldTokenError::InvalidFeeSource))?;
    require_keys_eq!(state.base.mint, *mint, GoldTokenError::InvalidFeeSource);
    let fee_amount = state
        .get_extension::<TransferFeeAmount>()
        .map_err(|_| error!(GoldTokenError::InvalidFeeSource))?;
    Ok(u64::from(fee_amount.withheld_amount))
}

pub fn withheld_in_mint(data: &[u8]) -> Result<u64> {
    let state = StateWithExtensions::<Token2022Mint>::unpack(data)?;
    let fee_config = state.get_extension::<TransferFeeConfig>()?;
    Ok(u64::from(fee_config.withheld_amount))
}

impl<'info> WithdrawWithheld<'info> {
    fn check(&self) -> Result<()> {
        require_role(&self.config, Role::FeeController, self.fee_controller.key)?;
        self.config.require_active()
    }

    fn emit_withdrawn(&self, amount: u64, source_accounts: u32) -> Result<()> {
        emit!(WithheldTokensWithdrawn {
            mint: self.mint.key(),
            destination: self.fee_controller_token_account.key(),
            amount,
            source_accounts,
            fee_controller: self.fee_controller.key(),
            timestamp: Clock::get()?.unix_timestamp,
        });
        Ok(())
    }
}

pub fn from_mint_handler(ctx: Context<WithdrawWithheld>) -> Result<()> {
    let accounts = &ctx.accounts;
    accounts.check()?;

    let mint_info = accounts.mint.to_account_info();
    let amount = withheld_in_mint(&mint_info.try_borrow_data()?)?;
    if amount == 0 {
        msg!("no withheld fees on mint");
        return accounts.emit_withdrawn(0, 0);
    }

    let config_info = accounts.config.to_account_info();
    let ix = transfer_fee::instruction::withdraw_withheld_tokens_from_mint(
        accounts.token_2022_program.key,
        mint_info.key,
        &accounts.fee_controller_token_account.key(),
        config_info.key,
        &[],
    )?;
    let signer_seeds: &[&[u8]] = &[CONFIG_SEED, &[accounts.config.bump]];
    invoke_signed(
        &ix,
        &[
            mint_info.clone(),
            accounts.fee_controller_token_account.to_account_info(),
            config_info,
            accounts.token_2022_program.to_account_info(),
        ],
        &[signer_seeds],
    )?;

    accounts.emit_withdrawn(amount, 0)
}

/// Sources arrive as remaining accounts, each a writable token account of the mint.
pub fn from_accounts_handler<'info>(
    ctx: Context<'_, '_, 'info, 'info, WithdrawWithheld<'info>>,
) -> Result<()> {
    let accounts = &ctx.accounts;
    accounts.check()?;

    let sources = ctx.remaining_accounts;
    require!(
        sources.len() <= MAX_FEE_SOURCES_PER_WITHDRAWAL,
        GoldTokenError::TooManyFeeSources
    );

    let mint_key = accounts.mint.key();
    let mut total: u64 = 0;
    for source in sources {
        require_keys_eq!(
            *source.owner,
            accounts.token_2022_program.key(),
            GoldTokenError::InvalidFeeSource
        );
        let withheld = withheld_in_account(&source.try_borrow_data()?, &mint_key)?;
        total = total.checked_add(withheld).ok_or(GoldTokenError::Overflow)?;
    }
    let source_count = sources.len() as u32;
    if total == 0 {
        msg!("no withheld fees across {} sources", source_count);
        return accounts.emit_withdrawn(0, source_count);
    }

    let config_info = accounts.config.to_account_info();
    let source_keys: Vec<&Pubkey> = sources.iter().map(|source| source.key).collect();
    let ix = transfer_fee::instruction::withdraw_withheld_tokens_from_accounts(
        accounts.token_2022_program.key,
        &mint_key,
        &accounts.fee_controller_token_account.key(),
        config_info.key,
        &[],
        &source_keys,
    )?;

    let mut infos = Vec::with_capacity(sources.len() + 4);
    infos.push(accounts.mint.to_account_info());
    infos.push(accounts.fee_controller_token_account.to_account_info());
    infos.push(config_info);
    infos.extend(sources.iter().cloned());
    infos.push(accounts.token_2022_program.to_account_info());

    let signer_seeds: &[&[u8]] = &[CONFIG_SEED, &[accounts.config.bump]];
    invoke_signed(&ix, &infos, &[signer_seeds])?;

    accounts.emit_withdrawn(total, source_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_spl::token_2022::spl_token_2022::extension::{
        BaseStateWithExtensionsMut, ExtensionType,
    };
    use anchor_spl::token_2022::spl_token_2022::state::AccountState;
    use anchor_spl::token_2022::spl_token_2022::extension::StateWithExtensionsMut;

    fn token_account_bytes(mint: &Pubkey, withheld: u64) -> Vec<u8> {
        let len = ExtensionType::try_calculate_account_len::<Token2022Account>(&[
            ExtensionType::TransferFeeAmount,
        ])
        .unwrap();
        let mut data = vec![0u8; len];
        let mut state =
            StateWithExtensionsMut::<Token2022Account>::unpack_uninitialized(&mut data).unwrap();
        state.base = Token2022Account {
            mint: *mint,
            owner: Pubkey::new_unique(),
            amount: 1_000,
            state: AccountState::Initialized,
            ..Default::default()
        };
        state.pack_base();
        state.init_account_type().unwrap();
        let extension = state.init_extension::<TransferFeeAmount>(true).unwrap();
        extension.withheld_amount = withheld.into();
        data
    }

    #[test]
    fn reads_withheld_amount_for_matching_mint() {
        let mint = Pubkey::new_unique();
        let data = token_account_bytes(&mint, 2_000_000);
        assert_eq!(withheld_in_account(&data, &mint).unwrap(), 2_000_000);
    }

    #[test]
    fn rejects_account_of_other_mint() {
        let data = token_account_bytes(&Pubkey::new_unique(), 5);
        assert_eq!(
            withheld_in_account(&data, &Pubkey::new_unique()).unwrap_err(),
            GoldTokenError::InvalidFeeSource.into()
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            withheld_in_account(&[7u8; 40], &Pubkey::new_unique()).unwrap_err(),
            GoldTokenError::InvalidFeeSource.into()
        );
    }
}
