use anchor_lang::prelude::*;

#[error_code]
pub enum GoldTokenError {
    #[msg("Signer does not hold the role required for this operation")]
    Unauthorized,

    #[msg("Program is paused")]
    ProgramPaused,

    #[msg("Amount must be greater than zero")]
    InvalidAmount,

    #[msg("Insufficient token balance")]
    InsufficientBalance,

    #[msg("Transfer fee basis points must be between 0 and 10000")]
    InvalidFeeBasisPoints,

    #[msg("Role address must not be the default public key")]
    InvalidRoleAddress,

    #[msg("Role address is already held by another role")]
    RoleConflict,

    #[msg("Name exceeds maximum length of 32 characters")]
    NameTooLong,

    #[msg("Symbol exceeds maximum length of 10 characters")]
    SymbolTooLong,

    #[msg("URI exceeds maximum length of 200 characters")]
    UriTooLong,

    #[msg("Extra account metas PDA does not match expected address")]
    InvalidExtraAccountMetas,

    #[msg("Address is blacklisted")]
    AddressBlacklisted,

    #[msg("Address is already blacklisted")]
    AlreadyBlacklisted,

    #[msg("Address is not blacklisted")]
    NotBlacklisted,

    #[msg("Blacklist entry account does not match the expected address")]
    InvalidBlacklistEntry,

    #[msg("Redemption request is not pending")]
    RedemptionNotPending,

    #[msg("Redemption request must be processing before fulfillment")]
    RedemptionNotProcessing,

    #[msg("Redemption request is already processing")]
    RedemptionAlreadyProcessing,

    #[msg("Redemption request is already fulfilled or cancelled")]
    RedemptionFinalized,

    #[msg("Redemption request is not fulfilled or cancelled")]
    RedemptionNotFinalized,

    #[msg("Escrow balance does not match the requested amount")]
    EscrowMismatch,

    #[msg("Redemption escrow accounts are moved only by the redemption engine")]
    EscrowProtected,

    #[msg("Token account does not belong to the governed mint")]
    InvalidFeeSource,

    #[msg("Too many fee source accounts for one withdrawal")]
    TooManyFeeSources,

    #[msg("Redemption request counter overflow")]
    CounterOverflow,

    #[msg("Arithmetic overflow")]
    Overflow,
}
