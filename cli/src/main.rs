mod config;
mod instructions;
mod sweep;

use anchor_lang::{AccountDeserialize, Discriminator};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gold_token::constants::{MAX_FEE_SOURCES_PER_WITHDRAWAL, TOKEN_DECIMALS};
use gold_token::state::{BlacklistEntry, Config, RedemptionRequest, Role};
use gold_token::utils::{
    find_blacklist_address, find_config_address, find_redemption_request_address,
};
use serde::Serialize;
use solana_account_decoder::UiAccountEncoding;
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signer};
use solana_sdk::transaction::Transaction;
use spl_token_2022::extension::transfer_fee::TransferFeeConfig;
use spl_token_2022::extension::{BaseStateWithExtensions, StateWithExtensions};
use spl_token_2022::state::{Account as TokenAccount2022, Mint as Mint2022};
use std::str::FromStr;

use config::{
    expand_tilde, load_deploy_config, load_solana_cli_config, parse_commitment, resolve_cluster,
    ClusterInfo, DeployConfig, NetworkConfig, SolanaCliConfig,
};
use instructions::{
    build_add_to_blacklist_instruction, build_cancel_instruction, build_close_request_instruction,
    build_create_token_account_instruction, build_fulfill_instruction,
    build_initialize_instruction, build_mint_instruction, build_remove_from_blacklist_instruction,
    build_request_redemption_instruction, build_set_processing_instruction,
    build_toggle_pause_instruction, build_transfer_instruction, build_update_role_instruction,
    build_wipe_instruction, build_withdraw_from_accounts_instruction,
    build_withdraw_from_mint_instruction, find_extra_account_metas_address, token_account_address,
    InitializeParams, MintParams, RedemptionParams, TransferParams, WipeParams,
};
use sweep::{
    expected_transfer_fee, plan_batches, total_withheld, FeeScanner, RpcAccountSource,
    ScanCursor, SweepOutcome, SweptBatch, MAX_PAGE_SIZE,
};

#[derive(Parser)]
#[command(name = "gold-token", version, about = "Gold token operator CLI")]
struct Cli {
    #[arg(long)]
    cluster: Option<String>,

    #[arg(long)]
    keypair: Option<String>,

    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the mint, the config and the hook's account list.
    Init(InitArgs),
    Mint(MintArgs),
    /// Transfer from the signer's token account, fee and hook included.
    Transfer(MintArgs),
    /// Flip the pause flag.
    Pause,
    Roles(RolesArgs),
    Blacklist(BlacklistArgs),
    Wipe(WipeArgs),
    Redeem(RedeemArgs),
    Fees(FeesArgs),
    Status,
}

#[derive(Parser)]
struct InitArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    symbol: Option<String>,

    #[arg(long)]
    uri: Option<String>,

    #[arg(long)]
    fee_basis_points: Option<u16>,

    #[arg(long)]
    maximum_fee: Option<String>,

    #[arg(long)]
    supply_controller: Option<String>,

    #[arg(long)]
    asset_protection: Option<String>,

    #[arg(long)]
    fee_controller: Option<String>,

    /// Keypair for the new mint; a fresh one is generated otherwise.
    #[arg(long)]
    mint_keypair: Option<String>,
}

#[derive(Parser)]
struct MintArgs {
    recipient: String,
    amount: String,
}

#[derive(Parser)]
struct RolesArgs {
    #[command(subcommand)]
    command: RolesCmd,
}

#[derive(Subcommand)]
enum RolesCmd {
    Update(RoleUpdateArgs),
}

#[derive(Parser)]
struct RoleUpdateArgs {
    #[arg(value_enum)]
    role: RoleArg,
    address: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Admin,
    SupplyController,
    AssetProtection,
    FeeController,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => Role::Admin,
            RoleArg::SupplyController => Role::SupplyController,
            RoleArg::AssetProtection => Role::AssetProtection,
            RoleArg::FeeController => Role::FeeController,
        }
    }
}

#[derive(Parser)]
struct BlacklistArgs {
    #[command(subcommand)]
    command: BlacklistCmd,
}

#[derive(Subcommand)]
enum BlacklistCmd {
    Add(AddressArgs),
    Remove(AddressArgs),
    Check(AddressArgs),
}

#[derive(Parser)]
struct AddressArgs {
    address: String,
}

#[derive(Parser)]
struct WipeArgs {
    address: String,

    /// Defaults to the whole balance.
    #[arg(long)]
    amount: Option<String>,
}

#[derive(Parser)]
struct RedeemArgs {
    #[command(subcommand)]
    command: RedeemCmd,
}

#[derive(Subcommand)]
enum RedeemCmd {
    Request(AmountArgs),
    Process(RequestRefArgs),
    Fulfill(RequestRefArgs),
    Cancel(OwnRequestArgs),
    Close(OwnRequestArgs),
    Show(RequestRefArgs),
    List(ListRequestsArgs),
}

#[derive(Parser)]
struct AmountArgs {
    amount: String,
}

#[derive(Parser)]
struct RequestRefArgs {
    user: String,
    request_id: u64,
}

#[derive(Parser)]
struct OwnRequestArgs {
    request_id: u64,
}

#[derive(Parser)]
struct ListRequestsArgs {
    #[arg(long)]
    user: Option<String>,
}

#[derive(Parser)]
struct FeesArgs {
    #[command(subcommand)]
    command: FeesCmd,
}

#[derive(Subcommand)]
enum FeesCmd {
    /// Move fees already harvested to the mint.
    WithdrawMint,
    /// Scan every token account of the mint and withdraw its withheld fees.
    Sweep(SweepArgs),
}

#[derive(Parser)]
struct SweepArgs {
    #[arg(long, default_value_t = MAX_PAGE_SIZE)]
    page_size: usize,

    #[arg(long, default_value_t = 20)]
    batch_size: usize,

    #[arg(long)]
    dry_run: bool,

    /// Resume point printed by an interrupted scan, as SHARD:OFFSET.
    #[arg(long, default_value_t = ScanCursor::default())]
    start_at: ScanCursor,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let solana_config = load_solana_cli_config().ok();

    let deploy = match &cli.command {
        Commands::Init(args) => args.config.as_deref().map(load_deploy_config).transpose()?,
        _ => None,
    };
    let network = deploy.as_ref().and_then(|cfg| cfg.network.as_ref());
    let ctx = build_context(&cli, solana_config.as_ref(), network)?;

    match &cli.command {
        Commands::Init(args) => handle_init(&ctx, args, deploy.as_ref()),
        Commands::Mint(args) => handle_mint(&ctx, args),
        Commands::Transfer(args) => handle_transfer(&ctx, args),
        Commands::Pause => handle_pause(&ctx),
        Commands::Roles(args) => match &args.command {
            RolesCmd::Update(update) => handle_role_update(&ctx, update),
        },
        Commands::Blacklist(args) => handle_blacklist(&ctx, &args.command),
        Commands::Wipe(args) => handle_wipe(&ctx, args),
        Commands::Redeem(args) => handle_redeem(&ctx, &args.command),
        Commands::Fees(args) => match &args.command {
            FeesCmd::WithdrawMint => handle_withdraw_mint(&ctx),
            FeesCmd::Sweep(sweep) => handle_sweep(&ctx, sweep),
        },
        Commands::Status => handle_status(&ctx),
    }
}

struct AppContext {
    client: RpcClient,
    payer: Keypair,
    output: OutputFormat,
    cluster: ClusterInfo,
    commitment: CommitmentConfig,
}

fn build_context(
    cli: &Cli,
    solana_config: Option<&SolanaCliConfig>,
    network_override: Option<&NetworkConfig>,
) -> Result<AppContext> {
    let cluster_value = cli
        .cluster
        .clone()
        .or_else(|| network_override.and_then(|cfg| cfg.cluster.clone()))
        .or_else(|| solana_config.map(|cfg| cfg.json_rpc_url.clone()))
        .unwrap_or_else(|| "devnet".to_string());
    let cluster = resolve_cluster(&cluster_value)?;

    let keypair_value = cli
        .keypair
        .clone()
        .or_else(|| network_override.and_then(|cfg| cfg.keypair_path.clone()))
        .or_else(|| solana_config.map(|cfg| cfg.keypair_path.clone()))
        .ok_or_else(|| anyhow!("Missing keypair path. Use --keypair or Solana CLI config."))?;

    let commitment_value = network_override
        .and_then(|cfg| cfg.commitment.clone())
        .or_else(|| solana_config.and_then(|cfg| cfg.commitment.clone()));
    let commitment = parse_commitment(commitment_value.as_deref());

    let payer = read_keypair_file(expand_tilde(&keypair_value))
        .map_err(|err| anyhow!("Failed to read keypair: {}", err))?;
    log::debug!("Using {} as {}", cluster.url, payer.pubkey());

    Ok(AppContext {
        client: RpcClient::new_with_commitment(cluster.url.clone(), commitment),
        payer,
        output: cli.output,
        cluster,
        commitment,
    })
}

impl AppContext {
    fn signer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    fn is_json(&self) -> bool {
        self.output == OutputFormat::Json
    }
}

fn handle_init(ctx: &AppContext, args: &InitArgs, deploy: Option<&DeployConfig>) -> Result<()> {
    let params = match deploy {
        Some(deploy) => InitializeParams {
            admin: ctx.signer(),
            mint: Pubkey::default(),
            name: deploy.token.name.clone(),
            symbol: deploy.token.symbol.clone(),
            uri: deploy.token.uri.clone().unwrap_or_default(),
            transfer_fee_basis_points: deploy.fees.basis_points,
            maximum_fee: parse_amount(&deploy.fees.maximum_fee, TOKEN_DECIMALS)?,
            supply_controller: parse_pubkey(&deploy.roles.supply_controller)?,
            asset_protection: parse_pubkey(&deploy.roles.asset_protection)?,
            fee_controller: parse_pubkey(&deploy.roles.fee_controller)?,
        },
        None => InitializeParams {
            admin: ctx.signer(),
            mint: Pubkey::default(),
            name: required(&args.name, "--name")?.clone(),
            symbol: required(&args.symbol, "--symbol")?.clone(),
            uri: args.uri.clone().unwrap_or_default(),
            transfer_fee_basis_points: args
                .fee_basis_points
                .ok_or_else(|| anyhow!("--fee-basis-points is required without --config"))?,
            maximum_fee: parse_amount(required(&args.maximum_fee, "--maximum-fee")?, TOKEN_DECIMALS)?,
            supply_controller: parse_pubkey(required(&args.supply_controller, "--supply-controller")?)?,
            asset_protection: parse_pubkey(required(&args.asset_protection, "--asset-protection")?)?,
            fee_controller: parse_pubkey(required(&args.fee_controller, "--fee-controller")?)?,
        },
    };

    let mint_keypair = match &args.mint_keypair {
        Some(path) => read_keypair_file(expand_tilde(path))
            .map_err(|err| anyhow!("Failed to read mint keypair: {}", err))?,
        None => Keypair::new(),
    };
    let mint = mint_keypair.pubkey();
    let symbol = params.symbol.clone();
    let initialize_ix = build_initialize_instruction(InitializeParams { mint, ..params })?;
    let signature = send_transaction(ctx, vec![initialize_ix], vec![&mint_keypair])?;

    let output = InitOutput {
        mint: mint.to_string(),
        config: find_config_address().0.to_string(),
        extra_account_metas: find_extra_account_metas_address(&mint).to_string(),
        explorer: explorer_url(&signature, &ctx.cluster),
        signature,
    };
    if ctx.is_json() {
        print_json(&output)
    } else {
        println!("{} initialized", symbol);
        println!("Mint:        {}", output.mint);
        println!("Config:      {}", output.config);
        println!("Hook metas:  {}", output.extra_account_metas);
        print_signature(&output.signature, output.explorer.as_deref());
        Ok(())
    }
}

fn handle_mint(ctx: &AppContext, args: &MintArgs) -> Result<()> {
    let config = fetch_config(ctx)?;
    let amount = parse_amount(&args.amount, config.decimals)?;
    let recipient = parse_pubkey(&args.recipient)?;
    let mint_ix = build_mint_instruction(MintParams {
        supply_controller: ctx.signer(),
        mint: config.mint,
        recipient,
        amount,
    })?;
    let signature = send_transaction(ctx, vec![mint_ix], vec![])?;
    let supply = fetch_mint_state(ctx, &config.mint)?.supply;

    let output = SupplyChangeOutput {
        amount,
        new_supply: supply,
        explorer: explorer_url(&signature, &ctx.cluster),
        signature,
    };
    if ctx.is_json() {
        print_json(&output)
    } else {
        println!(
            "Minted {} to {}",
            format_amount(amount, config.decimals),
            recipient
        );
        println!("New supply: {}", format_amount(supply, config.decimals));
        print_signature(&output.signature, output.explorer.as_deref());
        Ok(())
    }
}

fn handle_transfer(ctx: &AppContext, args: &MintArgs) -> Result<()> {
    let config = fetch_config(ctx)?;
    let amount = parse_amount(&args.amount, config.decimals)?;
    let recipient = parse_pubkey(&args.recipient)?;
    let fee = expected_transfer_fee(amount, config.transfer_fee_basis_points, config.maximum_fee);

    let create_ix = build_create_token_account_instruction(&ctx.signer(), &recipient, &config.mint);
    let transfer_ix = build_transfer_instruction(TransferParams {
        owner: ctx.signer(),
        recipient,
        mint: config.mint,
        amount,
        decimals: config.decimals,
        fee,
    })?;
    let signature = send_transaction(ctx, vec![create_ix, transfer_ix], vec![])?;

    let output = TransferOutput {
        amount,
        fee,
        received: amount.saturating_sub(fee),
        explorer: explorer_url(&signature, &ctx.cluster),
        signature,
    };
    if ctx.is_json() {
        print_json(&output)
    } else {
        println!(
            "Sent {} to {} ({} withheld as fee)",
            format_amount(amount, config.decimals),
            recipient,
            format_amount(fee, config.decimals)
        );
        print_signature(&output.signature, output.explorer.as_deref());
        Ok(())
    }
}

fn handle_pause(ctx: &AppContext) -> Result<()> {
    let signature = send_transaction(ctx, vec![build_toggle_pause_instruction(ctx.signer())], vec![])?;
    let config = fetch_config(ctx)?;
    let state = if config.is_paused { "paused" } else { "active" };
    report(ctx, format!("Token is now {}", state), signature)
}

fn handle_role_update(ctx: &AppContext, args: &RoleUpdateArgs) -> Result<()> {
    let role = Role::from(args.role);
    let new_authority = parse_pubkey(&args.address)?;
    let update_ix = build_update_role_instruction(ctx.signer(), role, new_authority)?;
    let signature = send_transaction(ctx, vec![update_ix], vec![])?;
    report(ctx, format!("{} set to {}", role.label(), new_authority), signature)
}

fn handle_blacklist(ctx: &AppContext, cmd: &BlacklistCmd) -> Result<()> {
    match cmd {
        BlacklistCmd::Add(args) => {
            let wallet = parse_pubkey(&args.address)?;
            let add_ix = build_add_to_blacklist_instruction(ctx.signer(), wallet)?;
            let signature = send_transaction(ctx, vec![add_ix], vec![])?;
            report(ctx, format!("Blacklisted: {}", wallet), signature)
        }
        BlacklistCmd::Remove(args) => {
            let wallet = parse_pubkey(&args.address)?;
            let remove_ix = build_remove_from_blacklist_instruction(ctx.signer(), wallet)?;
            let signature = send_transaction(ctx, vec![remove_ix], vec![])?;
            report(ctx, format!("Removed from blacklist: {}", wallet), signature)
        }
        BlacklistCmd::Check(args) => {
            let wallet = parse_pubkey(&args.address)?;
            let entry = fetch_blacklist_entry(ctx, &wallet)?;
            let output = BlacklistStatusOutput {
                wallet: wallet.to_string(),
                is_blacklisted: entry.is_some(),
                blacklisted_by: entry.as_ref().map(|entry| entry.blacklisted_by.to_string()),
                blacklisted_at: entry.as_ref().map(|entry| entry.blacklisted_at),
            };
            if ctx.is_json() {
                print_json(&output)
            } else {
                match entry {
                    Some(entry) => {
                        println!("Blacklisted: {}", wallet);
                        println!("By: {} at {}", entry.blacklisted_by, entry.blacklisted_at);
                    }
                    None => println!("Not blacklisted: {}", wallet),
                }
                Ok(())
            }
        }
    }
}

fn handle_wipe(ctx: &AppContext, args: &WipeArgs) -> Result<()> {
    let config = fetch_config(ctx)?;
    let wallet = parse_pubkey(&args.address)?;
    let amount = match &args.amount {
        Some(value) => parse_amount(value, config.decimals)?,
        None => token_balance(ctx, &token_account_address(&wallet, &config.mint))?,
    };
    if amount == 0 {
        return Err(anyhow!("Nothing to wipe for {}", wallet));
    }
    let wipe_ix = build_wipe_instruction(WipeParams {
        asset_protection: ctx.signer(),
        mint: config.mint,
        wallet,
        amount,
    })?;
    let signature = send_transaction(ctx, vec![wipe_ix], vec![])?;
    report(
        ctx,
        format!("Wiped up to {} from {}", format_amount(amount, config.decimals), wallet),
        signature,
    )
}

fn handle_redeem(ctx: &AppContext, cmd: &RedeemCmd) -> Result<()> {
    let config = fetch_config(ctx)?;
    match cmd {
        RedeemCmd::Request(args) => {
            let amount = parse_amount(&args.amount, config.decimals)?;
            let request_id = config
                .redemption_request_counter
                .checked_add(1)
                .ok_or_else(|| anyhow!("Request counter exhausted"))?;
            let params = RedemptionParams {
                user: ctx.signer(),
                mint: config.mint,
                request_id,
            };
            let request_ix = build_request_redemption_instruction(&params, amount)?;
            let signature = send_transaction(ctx, vec![request_ix], vec![])?;
            report(
                ctx,
                format!(
                    "Redemption #{} requested for {}",
                    request_id,
                    format_amount(amount, config.decimals)
                ),
                signature,
            )
        }
        RedeemCmd::Process(args) => {
            let params = request_params(&config, &args.user, args.request_id)?;
            let ix = build_set_processing_instruction(ctx.signer(), &params);
            let signature = send_transaction(ctx, vec![ix], vec![])?;
            report(ctx, format!("Redemption #{} is processing", args.request_id), signature)
        }
        RedeemCmd::Fulfill(args) => {
            let params = request_params(&config, &args.user, args.request_id)?;
            let ix = build_fulfill_instruction(ctx.signer(), &params);
            let signature = send_transaction(ctx, vec![ix], vec![])?;
            report(ctx, format!("Redemption #{} fulfilled", args.request_id), signature)
        }
        RedeemCmd::Cancel(args) => {
            let params = RedemptionParams {
                user: ctx.signer(),
                mint: config.mint,
                request_id: args.request_id,
            };
            let signature = send_transaction(ctx, vec![build_cancel_instruction(&params)], vec![])?;
            report(ctx, format!("Redemption #{} cancelled", args.request_id), signature)
        }
        RedeemCmd::Close(args) => {
            let params = RedemptionParams {
                user: ctx.signer(),
                mint: config.mint,
                request_id: args.request_id,
            };
            let signature =
                send_transaction(ctx, vec![build_close_request_instruction(&params)], vec![])?;
            report(ctx, format!("Redemption #{} closed", args.request_id), signature)
        }
        RedeemCmd::Show(args) => {
            let user = parse_pubkey(&args.user)?;
            let address = find_redemption_request_address(&user, args.request_id).0;
            let request = fetch_account::<RedemptionRequest>(ctx, &address)?
                .ok_or_else(|| anyhow!("No redemption #{} for {}", args.request_id, user))?;
            print_requests(ctx, &[(address, request)], config.decimals)
        }
        RedeemCmd::List(args) => {
            let user = args.user.as_deref().map(parse_pubkey).transpose()?;
            let requests = list_requests(ctx, user.as_ref())?;
            print_requests(ctx, &requests, config.decimals)
        }
    }
}

fn request_params(config: &Config, user: &str, request_id: u64) -> Result<RedemptionParams> {
    Ok(RedemptionParams {
        user: parse_pubkey(user)?,
        mint: config.mint,
        request_id,
    })
}

fn print_requests(
    ctx: &AppContext,
    requests: &[(Pubkey, RedemptionRequest)],
    decimals: u8,
) -> Result<()> {
    let rows: Vec<RequestOutput> = requests
        .iter()
        .map(|(address, request)| RequestOutput {
            address: address.to_string(),
            user: request.user.to_string(),
            request_id: request.request_id,
            amount: request.amount,
            status: format!("{:?}", request.status),
            requested_at: request.requested_at,
            completed_at: request.completed_at,
        })
        .collect();
    if ctx.is_json() {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No redemption requests");
    }
    for row in rows {
        println!(
            "#{} {} {} {} (requested {})",
            row.request_id,
            row.user,
            format_amount(row.amount, decimals),
            row.status,
            row.requested_at
        );
    }
    Ok(())
}

fn handle_withdraw_mint(ctx: &AppContext) -> Result<()> {
    let config = fetch_config(ctx)?;
    let withheld = fetch_mint_state(ctx, &config.mint)?.withheld;
    let create_ix = build_create_token_account_instruction(&ctx.signer(), &ctx.signer(), &config.mint);
    let withdraw_ix = build_withdraw_from_mint_instruction(ctx.signer(), config.mint);
    let signature = send_transaction(ctx, vec![create_ix, withdraw_ix], vec![])?;
    report(
        ctx,
        format!("Withdrew {} from the mint", format_amount(withheld, config.decimals)),
        signature,
    )
}

fn handle_sweep(ctx: &AppContext, args: &SweepArgs) -> Result<()> {
    if args.batch_size == 0 || args.batch_size > MAX_FEE_SOURCES_PER_WITHDRAWAL {
        return Err(anyhow!(
            "Batch size must be between 1 and {}",
            MAX_FEE_SOURCES_PER_WITHDRAWAL
        ));
    }
    let config = fetch_config(ctx)?;
    let source = RpcAccountSource::new(&ctx.client, ctx.commitment);
    let mut scanner =
        FeeScanner::new(&source, config.mint, args.page_size)?.start_at(args.start_at);
    let eligible = scanner.scan()?;

    let outcome = if eligible.is_empty() {
        SweepOutcome::NothingToWithdraw {
            scanned: scanner.scanned(),
            skipped: scanner.skipped(),
        }
    } else {
        let total = total_withheld(&eligible)?;
        let batches = plan_batches(&eligible, args.batch_size);
        log::info!(
            "{} accounts hold {} withheld, {} batches",
            eligible.len(),
            total,
            batches.len()
        );
        if args.dry_run {
            let planned = batches
                .iter()
                .map(|batch| {
                    Ok(SweptBatch {
                        sources: batch.len(),
                        amount: total_withheld(batch)?,
                        signature: None,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            SweepOutcome::Planned {
                total,
                batches: planned,
            }
        } else {
            SweepOutcome::Swept {
                total,
                batches: execute_sweep(ctx, &config.mint, &batches)?,
            }
        }
    };

    if ctx.is_json() {
        return print_json(&outcome);
    }
    match outcome {
        SweepOutcome::NothingToWithdraw { scanned, skipped } => {
            println!(
                "Nothing to withdraw ({} accounts scanned, {} skipped)",
                scanned, skipped
            );
        }
        SweepOutcome::Planned { total, batches } => {
            println!(
                "Would withdraw {} in {} batches",
                format_amount(total, config.decimals),
                batches.len()
            );
        }
        SweepOutcome::Swept { total, batches } => {
            println!(
                "Withdrew {} in {} batches",
                format_amount(total, config.decimals),
                batches.len()
            );
            for batch in batches.iter() {
                if let Some(signature) = &batch.signature {
                    print_signature(signature, explorer_url(signature, &ctx.cluster).as_deref());
                }
            }
        }
    }
    Ok(())
}

fn execute_sweep(
    ctx: &AppContext,
    mint: &Pubkey,
    batches: &[Vec<sweep::WithheldAccount>],
) -> Result<Vec<SweptBatch>> {
    let fee_controller = ctx.signer();
    let mut swept = Vec::with_capacity(batches.len());
    for (index, batch) in batches.iter().enumerate() {
        let sources: Vec<Pubkey> = batch.iter().map(|account| account.address).collect();
        let mut ixs = Vec::with_capacity(2);
        if index == 0 {
            ixs.push(build_create_token_account_instruction(
                &fee_controller,
                &fee_controller,
                mint,
            ));
        }
        ixs.push(build_withdraw_from_accounts_instruction(fee_controller, *mint, &sources));
        let signature = send_transaction(ctx, ixs, vec![]).with_context(|| {
            format!(
                "Batch {} of {} failed; {} earlier batches already settled",
                index + 1,
                batches.len(),
                index
            )
        })?;
        let amount = total_withheld(batch)?;
        log::info!(
            "Batch {}/{} withdrew {} from {} accounts: {}",
            index + 1,
            batches.len(),
            amount,
            sources.len(),
            signature
        );
        swept.push(SweptBatch {
            sources: sources.len(),
            amount,
            signature: Some(signature),
        });
    }
    Ok(swept)
}

fn handle_status(ctx: &AppContext) -> Result<()> {
    let config = fetch_config(ctx)?;
    let mint_state = fetch_mint_state(ctx, &config.mint)?;
    let output = StatusOutput {
        mint: config.mint.to_string(),
        gatekeeper_program: config.gatekeeper_program.to_string(),
        is_paused: config.is_paused,
        supply: mint_state.supply,
        withheld_on_mint: mint_state.withheld,
        transfer_fee_basis_points: config.transfer_fee_basis_points,
        maximum_fee: config.maximum_fee,
        redemption_requests: config.redemption_request_counter,
        roles: Role::ALL
            .iter()
            .map(|role| RoleOutput {
                role: role.label().to_string(),
                authority: config.authority(*role).to_string(),
            })
            .collect(),
    };
    if ctx.is_json() {
        return print_json(&output);
    }
    println!("Gold token status");
    println!("Mint: {}", output.mint);
    println!("Hook: {}", output.gatekeeper_program);
    println!("Status: {}", if output.is_paused { "Paused" } else { "Active" });
    println!("Supply: {}", format_amount(output.supply, config.decimals));
    println!(
        "Fee: {} bps, max {}",
        output.transfer_fee_basis_points,
        format_amount(output.maximum_fee, config.decimals)
    );
    println!(
        "Withheld on mint: {}",
        format_amount(output.withheld_on_mint, config.decimals)
    );
    println!("Redemption requests: {}", output.redemption_requests);
    println!("Roles:");
    for role in &output.roles {
        println!("  {}: {}", role.role, role.authority);
    }
    Ok(())
}

fn required<'a>(value: &'a Option<String>, flag: &str) -> Result<&'a String> {
    value
        .as_ref()
        .ok_or_else(|| anyhow!("{} is required without --config", flag))
}

fn parse_pubkey(value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).map_err(|_| anyhow!("Invalid pubkey: {}", value))
}

fn parse_amount(value: &str, decimals: u8) -> Result<u64> {
    let sanitized = value.replace('_', "");
    let scale = 10u64
        .checked_pow(u32::from(decimals))
        .ok_or_else(|| anyhow!("Decimal overflow"))?;
    let (whole, fractional) = sanitized.split_once('.').unwrap_or((sanitized.as_str(), ""));
    if fractional.len() > decimals as usize {
        return Err(anyhow!("Too many decimal places"));
    }
    let whole_value: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().with_context(|| format!("Invalid amount: {}", value))?
    };
    let fractional_value: u64 = if fractional.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fractional, width = decimals as usize);
        padded.parse().with_context(|| format!("Invalid amount: {}", value))?
    };
    whole_value
        .checked_mul(scale)
        .and_then(|value| value.checked_add(fractional_value))
        .ok_or_else(|| anyhow!("Amount overflow"))
}

fn format_amount(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let scale = 10u64.pow(u32::from(decimals));
    format!(
        "{}.{:0width$}",
        amount / scale,
        amount % scale,
        width = decimals as usize
    )
}

fn explorer_url(signature: &str, cluster: &ClusterInfo) -> Option<String> {
    cluster.label.as_ref().map(|label| {
        format!(
            "https://explorer.solana.com/tx/{}?cluster={}",
            signature, label
        )
    })
}

fn send_transaction(
    ctx: &AppContext,
    instructions: Vec<Instruction>,
    extra_signers: Vec<&Keypair>,
) -> Result<String> {
    let blockhash = ctx
        .client
        .get_latest_blockhash()
        .context("Failed to fetch blockhash")?;
    let mut transaction = Transaction::new_with_payer(&instructions, Some(&ctx.signer()));
    let mut signers: Vec<&dyn Signer> = vec![&ctx.payer];
    for signer in extra_signers {
        if signer.pubkey() != ctx.signer() {
            signers.push(signer);
        }
    }
    transaction.try_sign(&signers, blockhash)?;
    let signature = ctx
        .client
        .send_and_confirm_transaction(&transaction)
        .context("Transaction failed")?;
    Ok(signature.to_string())
}

/// `None` when the account does not exist.
fn fetch_account<T: AccountDeserialize>(ctx: &AppContext, address: &Pubkey) -> Result<Option<T>> {
    let account = ctx
        .client
        .get_account_with_commitment(address, ctx.commitment)
        .with_context(|| format!("Failed to fetch {}", address))?
        .value;
    account
        .map(|account| {
            let mut data = account.data.as_slice();
            T::try_deserialize(&mut data).with_context(|| format!("Failed to decode {}", address))
        })
        .transpose()
}

fn fetch_config(ctx: &AppContext) -> Result<Config> {
    let address = find_config_address().0;
    fetch_account::<Config>(ctx, &address)?
        .ok_or_else(|| anyhow!("Config {} not found; run init first", address))
}

fn fetch_blacklist_entry(ctx: &AppContext, wallet: &Pubkey) -> Result<Option<BlacklistEntry>> {
    fetch_account(ctx, &find_blacklist_address(wallet).0)
}

struct MintState {
    supply: u64,
    withheld: u64,
}

fn fetch_mint_state(ctx: &AppContext, mint: &Pubkey) -> Result<MintState> {
    let account = ctx
        .client
        .get_account(mint)
        .with_context(|| format!("Failed to fetch mint {}", mint))?;
    let state = StateWithExtensions::<Mint2022>::unpack(&account.data)
        .map_err(|err| anyhow!("Failed to decode mint: {}", err))?;
    let withheld = state
        .get_extension::<TransferFeeConfig>()
        .map(|fee_config| u64::from(fee_config.withheld_amount))
        .unwrap_or_default();
    Ok(MintState {
        supply: state.base.supply,
        withheld,
    })
}

fn token_balance(ctx: &AppContext, address: &Pubkey) -> Result<u64> {
    let account = ctx
        .client
        .get_account_with_commitment(address, ctx.commitment)
        .with_context(|| format!("Failed to fetch {}", address))?
        .value;
    match account {
        Some(account) => {
            let state = StateWithExtensions::<TokenAccount2022>::unpack(&account.data)
                .map_err(|err| anyhow!("Failed to decode token account: {}", err))?;
            Ok(state.base.amount)
        }
        None => Ok(0),
    }
}

fn list_requests(
    ctx: &AppContext,
    user: Option<&Pubkey>,
) -> Result<Vec<(Pubkey, RedemptionRequest)>> {
    let mut filters = vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
        0,
        &RedemptionRequest::DISCRIMINATOR,
    ))];
    if let Some(user) = user {
        filters.push(RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
            8,
            user.as_ref(),
        )));
    }
    let config = RpcProgramAccountsConfig {
        filters: Some(filters),
        account_config: RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            commitment: Some(ctx.commitment),
            data_slice: None,
            min_context_slot: None,
        },
        ..RpcProgramAccountsConfig::default()
    };
    let accounts = ctx
        .client
        .get_program_accounts_with_config(&gold_token::ID, config)
        .context("Failed to list redemption requests")?;

    let mut requests = Vec::new();
    for (address, account) in accounts {
        let mut data = account.data.as_slice();
        match RedemptionRequest::try_deserialize(&mut data) {
            Ok(request) => requests.push((address, request)),
            Err(err) => log::debug!("Skipping {}: {}", address, err),
        }
    }
    requests.sort_by_key(|(_, request)| (request.user, request.request_id));
    Ok(requests)
}

fn report(ctx: &AppContext, headline: String, signature: String) -> Result<()> {
    let output = SimpleOutput {
        explorer: explorer_url(&signature, &ctx.cluster),
        signature,
    };
    if ctx.is_json() {
        print_json(&output)
    } else {
        println!("{}", headline);
        print_signature(&output.signature, output.explorer.as_deref());
        Ok(())
    }
}

fn print_signature(signature: &str, explorer: Option<&str>) {
    println!("Tx: {}", signature);
    if let Some(url) = explorer {
        println!("Explorer: {}", url);
    }
}

#[derive(Serialize)]
struct InitOutput {
    mint: String,
    config: String,
    extra_account_metas: String,
    signature: String,
    explorer: Option<String>,
}

#[derive(Serialize)]
struct SupplyChangeOutput {
    amount: u64,
    new_supply: u64,
    signature: String,
    explorer: Option<String>,
}

#[derive(Serialize)]
struct TransferOutput {
    amount: u64,
    fee: u64,
    received: u64,
    signature: String,
    explorer: Option<String>,
}

#[derive(Serialize)]
struct SimpleOutput {
    signature: String,
    explorer: Option<String>,
}

#[derive(Serialize)]
struct BlacklistStatusOutput {
    wallet: String,
    is_blacklisted: bool,
    blacklisted_by: Option<String>,
    blacklisted_at: Option<i64>,
}

#[derive(Serialize)]
struct RequestOutput {
    address: String,
    user: String,
    request_id: u64,
    amount: u64,
    status: String,
    requested_at: i64,
    completed_at: i64,
}

#[derive(Serialize)]
struct RoleOutput {
    role: String,
    authority: String,
}

#[derive(Serialize)]
struct StatusOutput {
    mint: String,
    gatekeeper_program: String,
    is_paused: bool,
    supply: u64,
    withheld_on_mint: u64,
    transfer_fee_basis_points: u16,
    maximum_fee: u64,
    redemption_requests: u64,
    roles: Vec<RoleOutput>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
