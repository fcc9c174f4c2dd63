use anchor_lang::prelude::*;
use anchor_lang::system_program;
use spl_tlv_account_resolution::account::ExtraAccountMeta;
use spl_tlv_account_resolution::seeds::Seed;

use crate::constants::{
    BLACKLIST_SEED, CONFIG_SEED, DESTINATION_TOKEN_ACCOUNT_INDEX, GOLD_TOKEN_PROGRAM_INDEX,
    REDEMPTION_ESCROW_SEED, REDEMPTION_REQUEST_SEED, SOURCE_TOKEN_ACCOUNT_INDEX,
    TOKEN_ACCOUNT_OWNER_LENGTH, TOKEN_ACCOUNT_OWNER_OFFSET,
};
use crate::errors::GoldTokenError;
use crate::state::{Config, Role};

pub fn require_role(config: &Config, role: Role, signer: &Pubkey) -> Result<()> {
    if config.authority(role) != *signer {
        msg!("{} signature required", role.label());
        return err!(GoldTokenError::Unauthorized);
    }
    Ok(())
}

pub fn find_config_address() -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], &crate::ID)
}

pub fn find_blacklist_address(wallet: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[BLACKLIST_SEED, wallet.as_ref()], &crate::ID)
}

pub fn find_redemption_request_address(user: &Pubkey, request_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            REDEMPTION_REQUEST_SEED,
            user.as_ref(),
            &request_id.to_le_bytes(),
        ],
        &crate::ID,
    )
}

pub fn find_redemption_escrow_address(user: &Pubkey, request_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            REDEMPTION_ESCROW_SEED,
            user.as_ref(),
            &request_id.to_le_bytes(),
        ],
        &crate::ID,
    )
}

/// Accounts the transfer hook needs on top of the `Execute` base accounts:
/// this program, the config PDA and the blacklist entries of the source and
/// destination owners. The hook program keeps an identical list.
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
        ExtraAccountMeta::new_with_pubkey(&crate::ID, false, false)?,
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

/// Returns a program-owned account's lamports to `destination` and leaves it
/// empty and system-owned, the same way Anchor's `close` constraint does.
pub fn close_program_account<'info>(
    account: &AccountInfo<'info>,
    destination: &AccountInfo<'info>,
) -> Result<()> {
    let lamports = account.lamports();
    **destination.try_borrow_mut_lamports()? = destination
        .lamports()
        .checked_add(lamports)
        .ok_or(GoldTokenError::Overflow)?;
    **account.try_borrow_mut_lamports()? = 0;
    account.assign(&system_program::ID);
    account.realloc(0, false)?;
    Ok(())
}

/// Lamports still owed before an account holding `current` is rent exempt at
/// `space` bytes.
pub fn rent_top_up(rent: &Rent, space: usize, current: u64) -> u64 {
    rent.minimum_balance(space).saturating_sub(current)
}

/// Creates a PDA owned by `owner`. An address that was pre-funded by a third
/// party is topped up, allocated and assigned instead of failing
/// `create_account`, the same way Anchor's `init` constraint does.
pub fn create_pda_account<'info>(
    payer: &AccountInfo<'info>,
    target: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    space: usize,
    owner: &Pubkey,
    signer_seeds: &[&[u8]],
) -> Result<()> {
    let rent = Rent::get()?;
    let current = target.lamports();
    if current == 0 {
        return system_program::create_account(
            CpiContext::new_with_signer(
                system_program.clone(),
                system_program::CreateAccount {
                    from: payer.clone(),
                    to: target.clone(),
                },
                &[signer_seeds],
            ),
            rent.minimum_balance(space),
            space as u64,
            owner,
        );
    }

    let top_up = rent_top_up(&rent, space, current);
    if top_up > 0 {
        system_program::transfer(
            CpiContext::new(
                system_program.clone(),
                system_program::Transfer {
                    from: payer.clone(),
                    to: target.clone(),
                },
            ),
            top_up,
        )?;
    }
    system_program::allocate(
        CpiContext::new_with_signer(
            system_program.clone(),
            system_program::Allocate {
                account_to_allocate: target.clone(),
            },
            &[signer_seeds],
        ),
        space as u64,
    )?;
    system_program::assign(
        CpiContext::new_with_signer(
            system_program.clone(),
            system_program::Assign {
                account_to_assign: target.clone(),
            },
            &[signer_seeds],
        ),
        owner,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(admin: Pubkey, supply_controller: Pubkey) -> Config {
        Config {
            admin,
            supply_controller,
            asset_protection: Pubkey::new_unique(),
            fee_controller: Pubkey::new_unique(),
            mint: Pubkey::new_unique(),
            gatekeeper_program: Pubkey::new_unique(),
            transfer_fee_basis_points: 0,
            maximum_fee: 0,
            decimals: 9,
            redemption_request_counter: 0,
            is_paused: false,
            bump: 0,
        }
    }

    #[test]
    fn role_checker_matches_exact_holder() {
        let admin = Pubkey::new_unique();
        let supply = Pubkey::new_unique();
        let config = config_with(admin, supply);

        assert!(require_role(&config, Role::Admin, &admin).is_ok());
        assert!(require_role(&config, Role::SupplyController, &supply).is_ok());
        assert_eq!(
            require_role(&config, Role::SupplyController, &admin).unwrap_err(),
            GoldTokenError::Unauthorized.into()
        );
        assert_eq!(
            require_role(&config, Role::FeeController, &Pubkey::new_unique()).unwrap_err(),
            GoldTokenError::Unauthorized.into()
        );
    }

    #[test]
    fn derived_addresses_are_deterministic_and_distinct() {
        let user = Pubkey::new_unique();
        let (request, _) = find_redemption_request_address(&user, 7);
        let (escrow, _) = find_redemption_escrow_address(&user, 7);

        assert_eq!(find_redemption_request_address(&user, 7).0, request);
        assert_ne!(request, escrow);
        assert_ne!(find_redemption_request_address(&user, 8).0, request);
        assert_ne!(find_blacklist_address(&user).0, find_blacklist_address(&Pubkey::new_unique()).0);

        let (config, bump) = find_config_address();
        assert_eq!(
            Pubkey::create_program_address(&[CONFIG_SEED, &[bump]], &crate::ID).unwrap(),
            config
        );
    }

    #[test]
    fn extra_account_metas_resolve_program_then_pdas() {
        let metas = build_extra_account_metas().unwrap();
        assert_eq!(metas.len(), 4);
        assert_eq!(metas[0].discriminator, 0);
        assert_eq!(metas[0].address_config, crate::ID.to_bytes());
        // external PDA discriminators are 1 << 7 | program index
        for meta in &metas[1..] {
            assert_eq!(meta.discriminator, 128 + GOLD_TOKEN_PROGRAM_INDEX);
            assert!(!bool::from(meta.is_signer));
            assert!(!bool::from(meta.is_writable));
        }
        assert_ne!(metas[2], metas[3]);
    }

    #[test]
    fn pre_funded_account_is_only_topped_up() {
        let rent = Rent::default();
        let needed = rent.minimum_balance(165);
        assert_eq!(rent_top_up(&rent, 165, 0), needed);
        assert_eq!(rent_top_up(&rent, 165, 1_000), needed - 1_000);
        assert_eq!(rent_top_up(&rent, 165, needed + 5), 0);
    }
}
