//! Challenge and defense logic for pinner-count bids.
//!
//! A defense reveals the two halves of the bid's file hash in a
//! nonce-selected order, signed Ethereum-style by the staker's bound
//! proof signer.

use crate::errors::MarketError;
use crate::instructions::constants::ETH_SIGNED_MESSAGE_PREFIX;
use crate::outcome::Outcome;
use crate::state::{
    Bid, BidStatus, ChallengeLedger, ChallengeRecord, DefenseLedger, DefenseRecord, QuorumKind,
    StakeRecord, ETH_ADDRESS_SIZE, HALF_HASH_SIZE, HASH_SIZE,
};
use anchor_lang::prelude::*;
use solana_keccak_hasher as keccak;
use solana_secp256k1_recover::secp256k1_recover;

/// Signature and revealed halves submitted with a defense
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct DefenseProof {
    pub half_hash_a: [u8; HALF_HASH_SIZE],
    pub half_hash_b: [u8; HALF_HASH_SIZE],
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

/// Rebuild the 32-byte hash from its halves.
///
/// Odd nonces give A‖B, even nonces give B‖A.
pub fn assemble_hash(
    nonce: u64,
    a: &[u8; HALF_HASH_SIZE],
    b: &[u8; HALF_HASH_SIZE],
) -> [u8; HASH_SIZE] {
    let (first, second) = if nonce % 2 == 1 { (a, b) } else { (b, a) };
    let mut hash = [0u8; HASH_SIZE];
    hash[..HALF_HASH_SIZE].copy_from_slice(first);
    hash[HALF_HASH_SIZE..].copy_from_slice(second);
    hash
}

/// keccak256("\x19Ethereum Signed Message:\n32" ‖ hash)
pub fn eth_signed_digest(hash: &[u8; HASH_SIZE]) -> [u8; HASH_SIZE] {
    keccak::hashv(&[ETH_SIGNED_MESSAGE_PREFIX, hash.as_ref()]).to_bytes()
}

/// Last 20 bytes of keccak256 over an uncompressed public key (x ‖ y)
pub fn eth_address(pubkey: &[u8; 64]) -> [u8; ETH_ADDRESS_SIZE] {
    let digest = keccak::hash(pubkey).to_bytes();
    let mut address = [0u8; ETH_ADDRESS_SIZE];
    address.copy_from_slice(&digest[HASH_SIZE - ETH_ADDRESS_SIZE..]);
    address
}

/// Accepts raw (0, 1) and Ethereum (27, 28) recovery ids.
pub fn normalize_recovery_id(v: u8) -> Result<u8> {
    match v {
        0 | 1 => Ok(v),
        27 | 28 => Ok(v - 27),
        _ => err!(MarketError::MalformedSignature),
    }
}

/// Address that signed `hash`, or `None` if the signature does not recover.
pub fn recover_signer(
    hash: &[u8; HASH_SIZE],
    v: u8,
    r: &[u8; 32],
    s: &[u8; 32],
) -> Result<Option<[u8; ETH_ADDRESS_SIZE]>> {
    let recovery_id = normalize_recovery_id(v)?;
    let mut signature = [0u8; 64];
    signature[..32].copy_from_slice(r);
    signature[32..].copy_from_slice(s);

    let digest = eth_signed_digest(hash);
    Ok(secp256k1_recover(&digest, recovery_id, &signature)
        .ok()
        .map(|pubkey| eth_address(&pubkey.to_bytes())))
}

/// Halves reassemble to `file_hash` and the signature over it recovers to
/// `signer`.
pub fn verify_defense(
    file_hash: &[u8; HASH_SIZE],
    nonce: u64,
    proof: &DefenseProof,
    signer: &[u8; ETH_ADDRESS_SIZE],
) -> Result<bool> {
    let hash = assemble_hash(nonce, &proof.half_hash_a, &proof.half_hash_b);
    let recovered = recover_signer(&hash, proof.v, &proof.r, &proof.s)?;
    Ok(&hash == file_hash && recovered.as_ref() == Some(signer))
}

/// Append a challenge against a fully pinned bid and open its defense window.
pub fn raise_challenge(
    bid: &mut Bid,
    ledger: &mut ChallengeLedger,
    issuer: Pubkey,
    now: i64,
    window: i64,
    bump: u8,
) -> Result<ChallengeRecord> {
    bid.require_kind(QuorumKind::PinnerCount)?;
    let id = ledger.add_challenge(&issuer)?;
    bid.set_status(BidStatus::Challenged)?;
    bid.challenge_id = id;
    bid.challenge_deadline = now
        .checked_add(window)
        .ok_or(MarketError::ArithmeticOverflow)?;

    Ok(ChallengeRecord {
        id,
        bid_id: bid.id,
        issuer,
        created_at: now,
        bump,
    })
}

/// Append a defense record. Used by the coordinator and the direct-writer path.
#[allow(clippy::too_many_arguments)]
pub fn record_defense(
    ledger: &mut DefenseLedger,
    writer: &Pubkey,
    bid_id: u64,
    challenge_id: u64,
    nonce: u64,
    defender: Pubkey,
    proof: &DefenseProof,
    now: i64,
    bump: u8,
) -> Result<DefenseRecord> {
    let id = ledger.add_defense(writer)?;
    Ok(DefenseRecord {
        id,
        bid_id,
        challenge_id,
        nonce,
        defender,
        half_hash_a: proof.half_hash_a,
        half_hash_b: proof.half_hash_b,
        v: proof.v,
        r: proof.r,
        s: proof.s,
        timestamp: now,
        bump,
    })
}

/// Apply one pinner's defense to a challenged bid.
///
/// A valid defense marks the stake defended and satisfies the bid once every
/// pinner has answered. An invalid one returns `DefenseFailed`; the caller
/// then burns the bid's stake set.
pub fn submit_defense(
    bid: &mut Bid,
    stake: &mut StakeRecord,
    challenge: &ChallengeRecord,
    defender: Pubkey,
    valid: bool,
    now: i64,
) -> Result<Outcome> {
    require!(
        bid.status == BidStatus::Challenged
            && challenge.bid_id == bid.id
            && challenge.id == bid.challenge_id,
        MarketError::ChallengeNotActive
    );
    require!(now <= bid.challenge_deadline, MarketError::DefenseWindowClosed);
    require!(
        stake.account == defender && stake.bid_id == bid.id && stake.pinned && stake.value > 0,
        MarketError::NotAChallengedPinner
    );
    require!(!stake.defended, MarketError::AlreadyDefended);

    if !valid {
        return Ok(Outcome::DefenseFailed { bid_id: bid.id });
    }

    stake.defended = true;
    bid.valid_defenses = bid
        .valid_defenses
        .checked_add(1)
        .ok_or(MarketError::ArithmeticOverflow)?;

    let satisfied_now = bid.valid_defenses >= bid.pinner_count;
    if satisfied_now {
        bid.set_status(BidStatus::Satisfied)?;
        bid.settled = true;
    }

    Ok(Outcome::Defended {
        bid_id: bid.id,
        satisfied_now,
    })
}

/// Check that a challenge may be resolved by expiry.
pub fn check_expired(bid: &Bid, now: i64) -> Result<()> {
    require!(
        bid.status == BidStatus::Challenged,
        MarketError::ChallengeNotActive
    );
    require!(now > bid.challenge_deadline, MarketError::DefenseWindowOpen);
    Ok(())
}
