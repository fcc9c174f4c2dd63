use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use solana_sdk::commitment_config::CommitmentConfig;
use std::fs;
use std::path::PathBuf;

/// Deployment file read by `init --config`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    pub token: TokenConfig,
    pub fees: FeesConfig,
    pub roles: RolesConfig,
    pub network: Option<NetworkConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeesConfig {
    pub basis_points: u16,
    /// Whole-token amount, same syntax as command line amounts.
    pub maximum_fee: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolesConfig {
    pub supply_controller: String,
    pub asset_protection: String,
    pub fee_controller: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub cluster: Option<String>,
    pub keypair_path: Option<String>,
    pub commitment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolanaCliConfig {
    pub json_rpc_url: String,
    pub keypair_path: String,
    pub commitment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClusterInfo {
    pub url: String,
    pub label: Option<String>,
}

pub fn load_deploy_config(path: &str) -> Result<DeployConfig> {
    let contents = fs::read_to_string(expand_tilde(path))
        .with_context(|| format!("Failed to read config: {}", path))?;
    toml::from_str(&contents).context("Failed to parse config")
}

pub fn load_solana_cli_config() -> Result<SolanaCliConfig> {
    let path = default_solana_config_path();
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read Solana config: {}", path.display()))?;
    serde_yaml::from_str(&contents).context("Failed to parse Solana config")
}

fn default_solana_config_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("solana");
    path.push("cli");
    path.push("config.yml");
    path
}

pub fn resolve_cluster(input: &str) -> Result<ClusterInfo> {
    let lowered = input.to_lowercase();
    let (url, label) = match lowered.as_str() {
        "devnet" => ("https://api.devnet.solana.com", Some("devnet")),
        "testnet" => ("https://api.testnet.solana.com", Some("testnet")),
        "mainnet" | "mainnet-beta" => ("https://api.mainnet-beta.solana.com", Some("mainnet-beta")),
        "localnet" | "localhost" => ("http://127.0.0.1:8899", None),
        _ if input.starts_with("http://") || input.starts_with("https://") => {
            let label = ["devnet", "testnet", "mainnet"]
                .into_iter()
                .find(|name| lowered.contains(name))
                .map(|name| if name == "mainnet" { "mainnet-beta" } else { name });
            (input, label)
        }
        _ => return Err(anyhow!("Unknown cluster: {}", input)),
    };
    Ok(ClusterInfo {
        url: url.to_string(),
        label: label.map(str::to_string),
    })
}

pub fn parse_commitment(value: Option<&str>) -> CommitmentConfig {
    match value.unwrap_or("confirmed") {
        "processed" => CommitmentConfig::processed(),
        "finalized" => CommitmentConfig::finalized(),
        _ => CommitmentConfig::confirmed(),
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
