use anchor_lang::prelude::*;

#[error_code]
pub enum TransferHookError {
    #[msg("Transfer denied: sender or receiver is blacklisted")]
    TransferDenied,

    #[msg("Transfers are paused")]
    TransferPaused,

    #[msg("Hook invoked outside of a token transfer")]
    NotTransferring,

    #[msg("Invalid extra account metas account")]
    InvalidExtraAccountMetas,

    #[msg("Invalid gold token program account")]
    InvalidGoldTokenProgram,

    #[msg("Invalid gold token config account")]
    InvalidConfig,

    #[msg("Invalid token account")]
    InvalidTokenAccount,

    #[msg("Redemption escrow accounts cannot receive transfers")]
    EscrowDestination,
}
