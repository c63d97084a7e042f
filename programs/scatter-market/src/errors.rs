//! Error codes for the Scatter storage marketplace

use anchor_lang::prelude::*;

#[error_code]
pub enum MarketError {
    // Authorization errors (6000-6099)
    #[msg("Caller is not authorized for this action")]
    Unauthorized,

    #[msg("Ledger writer set is full")]
    WriterSetFull,

    #[msg("Writer is not in the ledger writer set")]
    WriterNotFound,

    #[msg("Writer identity cannot be the default key")]
    InvalidWriter,

    #[msg("Ledger account does not match the resolved reference")]
    StaleReference,

    #[msg("Account is not owned by this program")]
    InvalidAccountOwner,

    // Registry and config errors (6100-6199)
    #[msg("Router has no free route slots")]
    RouterFull,

    #[msg("Config string exceeds the maximum length")]
    StringTooLong,

    #[msg("Config string contains invalid characters")]
    InvalidString,

    #[msg("Config parameter is out of range")]
    InvalidParameter,

    #[msg("Config entry key does not match the expected key")]
    EnvKeyMismatch,

    #[msg("Market account version is too old")]
    AccountVersionTooOld,

    #[msg("Market account version is newer than this program")]
    AccountVersionTooNew,

    #[msg("Market minimum supported version is inconsistent")]
    VersionMismatchProtocol,

    // Bid errors (6200-6299)
    #[msg("File hash must be non-zero")]
    InvalidFileHash,

    #[msg("Bid not found")]
    BidNotFound,

    #[msg("Instruction does not apply to this bid's quorum kind")]
    QuorumKindMismatch,

    #[msg("Bidder cannot host their own bid")]
    BidderCannotHost,

    #[msg("Another candidate holds this bid")]
    NotCandidateHoster,

    #[msg("Bid is not open for this action")]
    BidClosed,

    #[msg("Invalid bid status transition")]
    InvalidStatusTransition,

    // Stake and pin errors (6300-6399)
    #[msg("Stake amount must be greater than zero")]
    InvalidStakeAmount,

    #[msg("Proof signer address must be non-zero")]
    InvalidProofSigner,

    #[msg("Proof signer does not match the signer bound to this stake")]
    ProofSignerMismatch,

    #[msg("Stake cannot be released in the bid's current state")]
    StakeLocked,

    #[msg("Stake record holds no value")]
    StakeEmpty,

    #[msg("Stake accounts supplied are duplicated or not writable")]
    InvalidStakeSet,

    #[msg("Stakes can only be burned once the bid has failed")]
    BidNotFailed,

    #[msg("Stake account does not belong to this bid")]
    StakeBidMismatch,

    // Validation errors (6400-6499)
    #[msg("Bidder cannot validate their own bid")]
    BidderCannotValidate,

    #[msg("Hoster cannot validate the bid they host")]
    HosterCannotValidate,

    #[msg("Bid has not been pinned")]
    BidNotPinned,

    // Challenge and defense errors (6500-6599)
    #[msg("Challenge is not active for this bid")]
    ChallengeNotActive,

    #[msg("Challenge account is required to raise a challenge")]
    MissingChallengeAccount,

    #[msg("Defense window has closed")]
    DefenseWindowClosed,

    #[msg("Defense window is still open")]
    DefenseWindowOpen,

    #[msg("Caller is not a pinner under this challenge")]
    NotAChallengedPinner,

    #[msg("Pinner has already defended this challenge")]
    AlreadyDefended,

    #[msg("Signature recovery id is malformed")]
    MalformedSignature,

    // Value accounting errors (6600-6699)
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,

    #[msg("Market vault cannot cover the requested transfer")]
    InsufficientVaultBalance,
}
