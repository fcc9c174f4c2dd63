//! In-memory harness: both programs run natively inside `ProgramTest` next to
//! the bundled Token-2022 and associated token account programs.

#![allow(dead_code)]

use anchor_lang::{AccountDeserialize, InstructionData, ToAccountMetas};
use anchor_spl::associated_token::get_associated_token_address_with_program_id;
use anchor_spl::token_2022::spl_token_2022::{
    extension::{
        transfer_fee::{TransferFeeAmount, TransferFeeConfig},
        BaseStateWithExtensions, StateWithExtensions,
    },
    instruction::transfer_checked,
    state::{Account as TokenAccount, Mint},
};
use gold_token::instructions::initialize::InitializeArgs;
use gold_token::state::{Config, RedemptionRequest};
use gold_token::utils::{
    find_blacklist_address, find_config_address, find_redemption_escrow_address,
    find_redemption_request_address,
};
use solana_program_test::{processor, BanksClientError, ProgramTest, ProgramTestContext};
use solana_sdk::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    instruction::{AccountMeta, Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction, system_program,
    transaction::{Transaction, TransactionError},
};
use spl_transfer_hook_interface::get_extra_account_metas_address;

pub use anchor_spl::token_2022::ID as TOKEN_2022_ID;

pub type TestResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

pub const DECIMALS: u8 = 9;
pub const ONE_TOKEN: u64 = 1_000_000_000;
pub const FEE_BASIS_POINTS: u16 = 20;
pub const MAXIMUM_FEE: u64 = ONE_TOKEN;

fn process_gold_token(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let accounts = Box::leak(accounts.to_vec().into_boxed_slice());
    gold_token::entry(program_id, accounts, data)
}

fn process_transfer_hook(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let accounts = Box::leak(accounts.to_vec().into_boxed_slice());
    transfer_hook::entry(program_id, accounts, data)
}

/// Fails unless `result` is the custom program error `expected`.
pub fn assert_custom_error(result: Result<(), BanksClientError>, expected: u32) {
    let error = match result {
        Ok(()) => panic!("transaction succeeded, expected error {}", expected),
        Err(error) => error.unwrap(),
    };
    match error {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => {
            assert_eq!(code, expected, "unexpected custom error")
        }
        other => panic!("expected custom error {}, got {:?}", expected, other),
    }
}

pub struct TestSuite {
    pub context: ProgramTestContext,
    pub admin: Keypair,
    pub supply_controller: Keypair,
    pub asset_protection: Keypair,
    pub fee_controller: Keypair,
    pub mint: Pubkey,
    pub config: Pubkey,
}

impl TestSuite {
    /// Starts the bank and runs `initialize` with a 20 bps fee capped at one token.
    pub async fn new() -> TestResult<Self> {
        let mut program_test = ProgramTest::default();
        program_test.prefer_bpf(false);
        program_test.add_program("gold_token", gold_token::ID, processor!(process_gold_token));
        program_test.add_program(
            "transfer_hook",
            transfer_hook::ID,
            processor!(process_transfer_hook),
        );
        program_test.set_compute_max_units(1_400_000);

        let context = program_test.start_with_context().await;
        let mut suite = Self {
            context,
            admin: Keypair::new(),
            supply_controller: Keypair::new(),
            asset_protection: Keypair::new(),
            fee_controller: Keypair::new(),
            mint: Pubkey::default(),
            config: find_config_address().0,
        };
        for wallet in [
            suite.admin.pubkey(),
            suite.supply_controller.pubkey(),
            suite.asset_protection.pubkey(),
            suite.fee_controller.pubkey(),
        ] {
            suite.airdrop(&wallet, 10 * ONE_TOKEN).await?;
        }

        let mint = Keypair::new();
        let args = InitializeArgs {
            name: "Gold Token".to_string(),
            symbol: "GOLD".to_string(),
            uri: "https://example.com/gold.json".to_string(),
            transfer_fee_basis_points: FEE_BASIS_POINTS,
            maximum_fee: MAXIMUM_FEE,
            supply_controller: suite.supply_controller.pubkey(),
            asset_protection: suite.asset_protection.pubkey(),
            fee_controller: suite.fee_controller.pubkey(),
        };
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts: gold_token::accounts::Initialize {
                admin: suite.admin.pubkey(),
                mint: mint.pubkey(),
                config: suite.config,
                gatekeeper_program: transfer_hook::ID,
                extra_account_meta_list: get_extra_account_metas_address(
                    &mint.pubkey(),
                    &transfer_hook::ID,
                ),
                token_2022_program: TOKEN_2022_ID,
                system_program: system_program::ID,
            }
            .to_account_metas(None),
            data: gold_token::instruction::Initialize { args }.data(),
        };
        let admin = suite.admin.insecure_clone();
        suite.process(&[ix], &[&admin, &mint]).await?;
        suite.mint = mint.pubkey();
        Ok(suite)
    }

    pub async fn process(
        &mut self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> Result<(), BanksClientError> {
        let blockhash = self.context.get_new_latest_blockhash().await?;
        let mut all_signers: Vec<&Keypair> = vec![&self.context.payer];
        all_signers.extend_from_slice(signers);
        let tx = Transaction::new_signed_with_payer(
            instructions,
            Some(&self.context.payer.pubkey()),
            &all_signers[..],
            blockhash,
        );
        self.context.banks_client.process_transaction(tx).await
    }

    pub async fn airdrop(&mut self, to: &Pubkey, lamports: u64) -> Result<(), BanksClientError> {
        let ix = system_instruction::transfer(&self.context.payer.pubkey(), to, lamports);
        self.process(&[ix], &[]).await
    }

    pub async fn funded_wallet(&mut self) -> TestResult<Keypair> {
        let wallet = Keypair::new();
        self.airdrop(&wallet.pubkey(), 10 * ONE_TOKEN).await?;
        Ok(wallet)
    }

    pub fn token_account(&self, owner: &Pubkey) -> Pubkey {
        get_associated_token_address_with_program_id(owner, &self.mint, &TOKEN_2022_ID)
    }

    pub async fn account_data(&mut self, address: &Pubkey) -> TestResult<Option<Vec<u8>>> {
        Ok(self
            .context
            .banks_client
            .get_account(*address)
            .await?
            .map(|account| account.data))
    }

    pub async fn balance(&mut self, token_account: &Pubkey) -> TestResult<u64> {
        let data = self
            .account_data(token_account)
            .await?
            .ok_or("token account missing")?;
        Ok(StateWithExtensions::<TokenAccount>::unpack(&data)?.base.amount)
    }

    pub async fn withheld(&mut self, token_account: &Pubkey) -> TestResult<u64> {
        let data = self
            .account_data(token_account)
            .await?
            .ok_or("token account missing")?;
        let state = StateWithExtensions::<TokenAccount>::unpack(&data)?;
        Ok(u64::from(state.get_extension::<TransferFeeAmount>()?.withheld_amount))
    }

    pub async fn supply(&mut self) -> TestResult<u64> {
        let mint = self.mint;
        let data = self.account_data(&mint).await?.ok_or("mint missing")?;
        Ok(StateWithExtensions::<Mint>::unpack(&data)?.base.supply)
    }

    pub async fn mint_withheld(&mut self) -> TestResult<u64> {
        let mint = self.mint;
        let data = self.account_data(&mint).await?.ok_or("mint missing")?;
        let state = StateWithExtensions::<Mint>::unpack(&data)?;
        Ok(u64::from(state.get_extension::<TransferFeeConfig>()?.withheld_amount))
    }

    pub async fn config(&mut self) -> TestResult<Config> {
        let config = self.config;
        let data = self.account_data(&config).await?.ok_or("config missing")?;
        Ok(Config::try_deserialize(&mut data.as_slice())?)
    }

    pub async fn redemption_request(
        &mut self,
        user: &Pubkey,
        request_id: u64,
    ) -> TestResult<Option<RedemptionRequest>> {
        let address = find_redemption_request_address(user, request_id).0;
        match self.account_data(&address).await? {
            Some(data) => Ok(Some(RedemptionRequest::try_deserialize(&mut data.as_slice())?)),
            None => Ok(None),
        }
    }

    pub fn mint_ix(&self, recipient: &Pubkey, amount: u64) -> Instruction {
        Instruction {
            program_id: gold_token::ID,
            accounts: gold_token::accounts::MintTokens {
                supply_controller: self.supply_controller.pubkey(),
                config: self.config,
                mint: self.mint,
                recipient_wallet: *recipient,
                recipient_token_account: self.token_account(recipient),
                recipient_blacklist_entry: find_blacklist_address(recipient).0,
                token_2022_program: TOKEN_2022_ID,
                associated_token_program: anchor_spl::associated_token::ID,
                system_program: system_program::ID,
            }
            .to_account_metas(None),
            data: gold_token::instruction::MintTokens {
                amount,
                recipient: *recipient,
            }
            .data(),
        }
    }

    pub async fn mint_to(&mut self, recipient: &Pubkey, amount: u64) -> Result<(), BanksClientError> {
        let ix = self.mint_ix(recipient, amount);
        let supply_controller = self.supply_controller.insecure_clone();
        self.process(&[ix], &[&supply_controller]).await
    }

    pub async fn toggle_pause(&mut self) -> Result<(), BanksClientError> {
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts: gold_token::accounts::TogglePause {
                admin: self.admin.pubkey(),
                config: self.config,
            }
            .to_account_metas(None),
            data: gold_token::instruction::TogglePause {}.data(),
        };
        let admin = self.admin.insecure_clone();
        self.process(&[ix], &[&admin]).await
    }

    pub async fn blacklist(&mut self, wallet: &Pubkey) -> Result<(), BanksClientError> {
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts: gold_token::accounts::AddToBlacklist {
                asset_protection: self.asset_protection.pubkey(),
                config: self.config,
                blacklist_entry: find_blacklist_address(wallet).0,
                system_program: system_program::ID,
            }
            .to_account_metas(None),
            data: gold_token::instruction::AddToBlacklist { wallet: *wallet }.data(),
        };
        let asset_protection = self.asset_protection.insecure_clone();
        self.process(&[ix], &[&asset_protection]).await
    }

    pub async fn unblacklist(&mut self, wallet: &Pubkey) -> Result<(), BanksClientError> {
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts: gold_token::accounts::RemoveFromBlacklist {
                asset_protection: self.asset_protection.pubkey(),
                config: self.config,
                blacklist_entry: find_blacklist_address(wallet).0,
            }
            .to_account_metas(None),
            data: gold_token::instruction::RemoveFromBlacklist { wallet: *wallet }.data(),
        };
        let asset_protection = self.asset_protection.insecure_clone();
        self.process(&[ix], &[&asset_protection]).await
    }

    /// Wipes `target_token_account`, whose owner must be `wallet`.
    pub async fn wipe(
        &mut self,
        wallet: &Pubkey,
        target_token_account: &Pubkey,
        amount: u64,
    ) -> Result<(), BanksClientError> {
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts: gold_token::accounts::WipeBlacklistedAddress {
                asset_protection: self.asset_protection.pubkey(),
                config: self.config,
                mint: self.mint,
                target_token_account: *target_token_account,
                blacklist_entry: find_blacklist_address(wallet).0,
                token_2022_program: TOKEN_2022_ID,
            }
            .to_account_metas(None),
            data: gold_token::instruction::WipeBlacklistedAddress {
                wallet: *wallet,
                amount,
            }
            .data(),
        };
        let asset_protection = self.asset_protection.insecure_clone();
        self.process(&[ix], &[&asset_protection]).await
    }

    /// `transfer_checked` plus the accounts Token-2022 forwards to the hook.
    pub fn transfer_ix(
        &self,
        owner: &Pubkey,
        destination: &Pubkey,
        destination_owner: &Pubkey,
        amount: u64,
    ) -> Instruction {
        let mut ix = transfer_checked(
            &TOKEN_2022_ID,
            &self.token_account(owner),
            &self.mint,
            destination,
            owner,
            &[],
            amount,
            DECIMALS,
        )
        .unwrap();
        ix.accounts.extend([
            AccountMeta::new_readonly(gold_token::ID, false),
            AccountMeta::new_readonly(self.config, false),
            AccountMeta::new_readonly(find_blacklist_address(owner).0, false),
            AccountMeta::new_readonly(find_blacklist_address(destination_owner).0, false),
            AccountMeta::new_readonly(transfer_hook::ID, false),
            AccountMeta::new_readonly(
                get_extra_account_metas_address(&self.mint, &transfer_hook::ID),
                false,
            ),
        ]);
        ix
    }

    pub async fn transfer(
        &mut self,
        owner: &Keypair,
        recipient: &Pubkey,
        amount: u64,
    ) -> Result<(), BanksClientError> {
        let destination = self.token_account(recipient);
        let ix = self.transfer_ix(&owner.pubkey(), &destination, recipient, amount);
        self.process(&[ix], &[owner]).await
    }

    pub async fn next_request_id(&mut self) -> TestResult<u64> {
        Ok(self.config().await?.next_request_id())
    }

    pub async fn request_redemption(
        &mut self,
        user: &Keypair,
        amount: u64,
    ) -> TestResult<(u64, Result<(), BanksClientError>)> {
        let request_id = self.next_request_id().await?;
        let user_key = user.pubkey();
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts: gold_token::accounts::RequestRedemption {
                user: user_key,
                config: self.config,
                mint: self.mint,
                user_token_account: self.token_account(&user_key),
                redemption_request: find_redemption_request_address(&user_key, request_id).0,
                escrow: find_redemption_escrow_address(&user_key, request_id).0,
                user_blacklist_entry: find_blacklist_address(&user_key).0,
                token_2022_program: TOKEN_2022_ID,
                system_program: system_program::ID,
            }
            .to_account_metas(None),
            data: gold_token::instruction::RequestRedemption { amount }.data(),
        };
        Ok((request_id, self.process(&[ix], &[user]).await))
    }

    pub async fn set_processing(
        &mut self,
        user: &Pubkey,
        request_id: u64,
    ) -> Result<(), BanksClientError> {
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts: gold_token::accounts::SetRedemptionProcessing {
                supply_controller: self.supply_controller.pubkey(),
                config: self.config,
                redemption_request: find_redemption_request_address(user, request_id).0,
            }
            .to_account_metas(None),
            data: gold_token::instruction::SetRedemptionProcessing {}.data(),
        };
        let supply_controller = self.supply_controller.insecure_clone();
        self.process(&[ix], &[&supply_controller]).await
    }

    pub async fn fulfill(&mut self, user: &Pubkey, request_id: u64) -> Result<(), BanksClientError> {
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts: gold_token::accounts::FulfillRedemption {
                supply_controller: self.supply_controller.pubkey(),
                config: self.config,
                mint: self.mint,
                redemption_request: find_redemption_request_address(user, request_id).0,
                escrow: find_redemption_escrow_address(user, request_id).0,
                user: *user,
                token_2022_program: TOKEN_2022_ID,
            }
            .to_account_metas(None),
            data: gold_token::instruction::FulfillRedemption {}.data(),
        };
        let supply_controller = self.supply_controller.insecure_clone();
        self.process(&[ix], &[&supply_controller]).await
    }

    pub async fn cancel(&mut self, user: &Keypair, request_id: u64) -> Result<(), BanksClientError> {
        let user_key = user.pubkey();
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts: gold_token::accounts::CancelRedemption {
                user: user_key,
                config: self.config,
                mint: self.mint,
                redemption_request: find_redemption_request_address(&user_key, request_id).0,
                escrow: find_redemption_escrow_address(&user_key, request_id).0,
                user_token_account: self.token_account(&user_key),
                user_blacklist_entry: find_blacklist_address(&user_key).0,
                token_2022_program: TOKEN_2022_ID,
            }
            .to_account_metas(None),
            data: gold_token::instruction::CancelRedemption {}.data(),
        };
        self.process(&[ix], &[user]).await
    }

    pub async fn close_request(
        &mut self,
        user: &Keypair,
        request_id: u64,
    ) -> Result<(), BanksClientError> {
        let user_key = user.pubkey();
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts: gold_token::accounts::CloseRedemptionRequest {
                user: user_key,
                redemption_request: find_redemption_request_address(&user_key, request_id).0,
            }
            .to_account_metas(None),
            data: gold_token::instruction::CloseRedemptionRequest {}.data(),
        };
        self.process(&[ix], &[user]).await
    }

    fn withdraw_accounts(&self) -> Vec<AccountMeta> {
        let fee_controller = self.fee_controller.pubkey();
        gold_token::accounts::WithdrawWithheld {
            fee_controller,
            config: self.config,
            mint: self.mint,
            fee_controller_token_account: self.token_account(&fee_controller),
            token_2022_program: TOKEN_2022_ID,
            associated_token_program: anchor_spl::associated_token::ID,
            system_program: system_program::ID,
        }
        .to_account_metas(None)
    }

    pub async fn withdraw_from_mint(&mut self) -> Result<(), BanksClientError> {
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts: self.withdraw_accounts(),
            data: gold_token::instruction::WithdrawWithheldTokensFromMint {}.data(),
        };
        let fee_controller = self.fee_controller.insecure_clone();
        self.process(&[ix], &[&fee_controller]).await
    }

    pub async fn withdraw_from_accounts(
        &mut self,
        sources: &[Pubkey],
    ) -> Result<(), BanksClientError> {
        let mut accounts = self.withdraw_accounts();
        accounts.extend(sources.iter().map(|source| AccountMeta::new(*source, false)));
        let ix = Instruction {
            program_id: gold_token::ID,
            accounts,
            data: gold_token::instruction::WithdrawWithheldTokensFromAccounts {}.data(),
        };
        let fee_controller = self.fee_controller.insecure_clone();
        self.process(&[ix], &[&fee_controller]).await
    }
}
