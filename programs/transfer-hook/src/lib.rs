use anchor_lang::prelude::*;
use anchor_lang::system_program::{create_account, CreateAccount};
use anchor_spl::token_2022::spl_token_2022::{
    extension::{transfer_hook::TransferHookAccount, BaseStateWithExtensions, StateWithExtensions},
    state::Account as Token2022Account,
};
use anchor_spl::token_interface::{Mint, TokenAccount};
use spl_tlv_account_resolution::{
    account::ExtraAccountMeta,
    seeds::Seed,
    state::ExtraAccountMetaList,
};
use spl_transfer_hook_interface::instruction::{ExecuteInstruction, TransferHookInstruction};
use spl_type_length_value::state::TlvStateBorrowed;

pub mod errors;
pub mod state;

use errors::TransferHookError;

declare_id!("3eU6xgLEEFE9aNAWpMERYBiXnyPFHxUcCWK9rg4vYM7U");

pub const GOLD_TOKEN_PROGRAM_ID: Pubkey =
    anchor_lang::pubkey!("EmAVX6yoxozANh9DUWNHp49Tac3rwjSU44aisUexD71f");

const CONFIG_SEED: &[u8] = b"config";
const BLACKLIST_SEED: &[u8] = b"blacklist";
const EXTRA_ACCOUNT_METAS_SEED: &[u8] = b"extra-account-metas";

const SOURCE_TOKEN_ACCOUNT_INDEX: u8 = 0;
const DESTINATION_TOKEN_ACCOUNT_INDEX: u8 = 2;
const GOLD_TOKEN_PROGRAM_INDEX: u8 = 5;
const TOKEN_ACCOUNT_OWNER_OFFSET: u8 = 32;
const TOKEN_ACCOUNT_OWNER_LENGTH: u8 = 32;

#[program]
pub mod transfer_hook {
    use super::*;

    pub fn initialize_extra_account_meta_list(
        ctx: Context<InitializeExtraAccountMetaList>,
    ) -> Result<()> {
        let extra_account_metas = build_extra_account_metas()?;
        let account_size = ExtraAccountMetaList::size_of(extra_account_metas.len())?;
        let lamports = Rent::get()?.minimum_balance(account_size);

        let mint = ctx.accounts.mint.key();
        let signer_seeds: &[&[u8]] = &[
            EXTRA_ACCOUNT_METAS_SEED,
            mint.as_ref(),
            &[ctx.bumps.extra_account_meta_list],
        ];
        create_account(
            CpiContext::new_with_signer(
                ctx.accounts.system_program.to_account_info(),
                CreateAccount {
                    from: ctx.accounts.payer.to_account_info(),
                    to: ctx.accounts.extra_account_meta_list.to_account_info(),
                },
                &[signer_seeds],
            ),
            lamports,
            account_size as u64,
            ctx.program_id,
        )?;

        ExtraAccountMetaList::init::<ExecuteInstruction>(
            &mut ctx.accounts.extra_account_meta_list.try_borrow_mut_data()?,
            &extra_account_metas,
        )?;
        msg!("extra account metas initialised for {}", mint);
        Ok(())
    }

    pub fn transfer_hook(ctx: Context<TransferHook>, amount: u64) -> Result<()> {
        require_transferring(&ctx.accounts.source_token_account.to_account_info())?;
        verify_extra_account_metas(&ctx.accounts.extra_account_metas)?;

        let config = deserialize_config(&ctx.accounts.gold_token_config)?;
        require_keys_eq!(
            config.mint,
            ctx.accounts.mint.key(),
            TransferHookError::InvalidConfig
        );
        require!(!config.is_paused, TransferHookError::TransferPaused);
        require!(
            !is_escrow_account(
                &ctx.accounts.destination_token_account.key(),
                &ctx.accounts.destination_token_account.owner,
            ),
            TransferHookError::EscrowDestination
        );

        check_blacklist(
            &ctx.accounts.source_blacklist_entry,
            &ctx.accounts.source_token_account.owner,
        )?;
        check_blacklist(
            &ctx.accounts.destination_blacklist_entry,
            &ctx.accounts.destination_token_account.owner,
        )?;

        msg!("transfer of {} approved", amount);
        Ok(())
    }

    /// Token-2022 calls hooks with the SPL interface discriminators, not Anchor's.
    pub fn fallback<'info>(
        program_id: &Pubkey,
        accounts: &'info [AccountInfo<'info>],
        data: &[u8],
    ) -> Result<()> {
        match TransferHookInstruction::unpack(data)? {
            TransferHookInstruction::Execute { amount } => {
                __private::__global::transfer_hook(program_id, accounts, &amount.to_le_bytes())
            }
            TransferHookInstruction::InitializeExtraAccountMetaList {
                extra_account_metas,
            } => {
                require!(
                    extra_account_metas == build_extra_account_metas()?,
                    TransferHookError::InvalidExtraAccountMetas
                );
                __private::__global::initialize_extra_account_meta_list(program_id, accounts, &[])
            }
            _ => Err(ProgramError::InvalidInstructionData.into()),
        }
    }
}

/// Account order follows the SPL `InitializeExtraAccountMetaList` layout.
#[derive(Accounts)]
pub struct InitializeExtraAccountMetaList<'info> {
    /// CHECK: Created here at the interface's derived address.
    #[account(
        mut,
        seeds = [EXTRA_ACCOUNT_METAS_SEED, mint.key().as_ref()],
        bump
    )]
    pub extra_account_meta_list: UncheckedAccount<'info>,

    pub mint: InterfaceAccount<'info, Mint>,

    #[account(mut)]
    pub payer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// Account order follows the SPL `Execute` layout, then the resolved extras.
#[derive(Accounts)]
pub struct TransferHook<'info> {
    #[account(token::mint = mint)]
    pub source_token_account: InterfaceAccount<'info, TokenAccount>,

    pub mint: InterfaceAccount<'info, Mint>,

    #[account(token::mint = mint)]
    pub destination_token_account: InterfaceAccount<'info, TokenAccount>,

    /// CHECK: Owner or delegate of the source account; authorised by Token-2022.
    pub source_authority: UncheckedAccount<'info>,

    /// CHECK: Contents validated against the expected list.
    #[account(seeds = [EXTRA_ACCOUNT_METAS_SEED, mint.key().as_ref()], bump)]
    pub extra_account_metas: UncheckedAccount<'info>,

    /// CHECK: Address pinned to the gold token program.
    #[account(address = GOLD_TOKEN_PROGRAM_ID @ TransferHookError::InvalidGoldTokenProgram)]
    pub gold_token_program: UncheckedAccount<'info>,

    /// CHECK: Ownership and discriminator checked on deserialize.
    #[account(seeds = [CONFIG_SEED], bump, seeds::program = GOLD_TOKEN_PROGRAM_ID)]
    pub gold_token_config: UncheckedAccount<'info>,

    /// CHECK: May be empty; existence means the source owner is blacklisted.
    #[account(
        seeds = [BLACKLIST_SEED, source_token_account.owner.as_ref()],
        bump,
        seeds::program = GOLD_TOKEN_PROGRAM_ID
    )]
    pub source_blacklist_entry: UncheckedAccount<'info>,

    /// CHECK: May be empty; existence means the destination owner is blacklisted.
    #[account(
        seeds = [BLACKLIST_SEED, destination_token_account.owner.as_ref()],
        bump,
        seeds::program = GOLD_TOKEN_PROGRAM_ID
    )]
    pub destination_blacklist_entry: UncheckedAccount<'info>,
}

pub fn build_extra_account_metas() -> Result<Vec<ExtraAccountMeta>> {
    let owner_entry = |account_index: u8| {
        ExtraAccountMeta::new_external_pda_with_seeds(
            GOLD_TOKEN_PROGRAM_INDEX,
            &[
                Seed::Literal {
                    bytes: BLACKLIST_SEED.to_vec(),
                },
                Seed::AccountData {
                    account_index,
                    data_index: TOKEN_ACCOUNT_OWNER_OFFSET,
                    length: TOKEN_ACCOUNT_OWNER_LENGTH,
                },
            ],
            false,
            false,
        )
    };

    Ok(vec![
        ExtraAccountMeta::new_with_pubkey(&GOLD_TOKEN_PROGRAM_ID, false, false)?,
        ExtraAccountMeta::new_external_pda_with_seeds(
            GOLD_TOKEN_PROGRAM_INDEX,
            &[Seed::Literal {
                bytes: CONFIG_SEED.to_vec(),
            }],
            false,
            false,
        )?,
        owner_entry(SOURCE_TOKEN_ACCOUNT_INDEX)?,
        owner_entry(DESTINATION_TOKEN_ACCOUNT_INDEX)?,
    ])
}

fn verify_extra_account_metas(account: &AccountInfo) -> Result<()> {
    require_keys_eq!(
        *account.owner,
        crate::ID,
        TransferHookError::InvalidExtraAccountMetas
    );
    let expected = build_extra_account_metas()?;
    let data = account.try_borrow_data()?;
    let tlv_state = TlvStateBorrowed::unpack(&data)
        .map_err(|_| error!(TransferHookError::InvalidExtraAccountMetas))?;
    let actual = ExtraAccountMetaList::unpack_with_tlv_state::<ExecuteInstruction>(&tlv_state)
        .map_err(|_| error!(TransferHookError::InvalidExtraAccountMetas))?;
    require!(
        actual.data() == expected.as_slice(),
        TransferHookError::InvalidExtraAccountMetas
    );
    Ok(())
}

/// Token-2022 raises `transferring` on the source account only for the
/// duration of `transfer_checked`.
fn require_transferring(source: &AccountInfo) -> Result<()> {
    let data = source.try_borrow_data()?;
    let account = StateWithExtensions::<Token2022Account>::unpack(&data)
        .map_err(|_| error!(TransferHookError::InvalidTokenAccount))?;
    let hook_account = account
        .get_extension::<TransferHookAccount>()
        .map_err(|_| error!(TransferHookError::NotTransferring))?;
    require!(
        bool::from(hook_account.transferring),
        TransferHookError::NotTransferring
    );
    Ok(())
}

fn deserialize_config(account: &AccountInfo) -> Result<state::Config> {
    require_keys_eq!(
        *account.owner,
        GOLD_TOKEN_PROGRAM_ID,
        TransferHookError::InvalidConfig
    );
    let data = account.try_borrow_data()?;
    let mut slice: &[u8] = &data;
    state::Config::try_deserialize(&mut slice).map_err(|_| error!(TransferHookError::InvalidConfig))
}

/// Redemption escrows are their own authority and only change through the
/// gold token program.
fn is_escrow_account(token_account: &Pubkey, owner: &Pubkey) -> bool {
    token_account == owner
}

fn is_listed(entry: &AccountInfo) -> bool {
    entry.owner == &GOLD_TOKEN_PROGRAM_ID && !entry.data_is_empty()
}

fn check_blacklist(entry: &AccountInfo, wallet: &Pubkey) -> Result<()> {
    if is_listed(entry) {
        msg!("{} is blacklisted", wallet);
        return err!(TransferHookError::TransferDenied);
    }
    Ok(())
}
