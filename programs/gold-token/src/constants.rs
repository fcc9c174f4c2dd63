pub const CONFIG_SEED: &[u8] = b"config";
pub const BLACKLIST_SEED: &[u8] = b"blacklist";
pub const REDEMPTION_REQUEST_SEED: &[u8] = b"redemption_request";
pub const REDEMPTION_ESCROW_SEED: &[u8] = b"redemption_pda";
pub const EXTRA_ACCOUNT_METAS_SEED: &[u8] = b"extra-account-metas";

pub const TOKEN_DECIMALS: u8 = 9;
pub const MAX_FEE_BASIS_POINTS: u16 = 10_000;

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_SYMBOL_LEN: usize = 10;
pub const MAX_URI_LEN: usize = 200;

pub const MAX_FEE_SOURCES_PER_WITHDRAWAL: usize = 24;

// Account positions in the transfer hook `Execute` instruction.
pub const SOURCE_TOKEN_ACCOUNT_INDEX: u8 = 0;
pub const DESTINATION_TOKEN_ACCOUNT_INDEX: u8 = 2;
pub const GOLD_TOKEN_PROGRAM_INDEX: u8 = 5;
pub const TOKEN_ACCOUNT_OWNER_OFFSET: u8 = 32;
pub const TOKEN_ACCOUNT_OWNER_LENGTH: u8 = 32;
