//! Arbitrary input generators for fuzz testing
//!
//! Generates random inputs for market instructions, biased toward the
//! boundaries the coordinator checks.

use proptest::prelude::*;
use scatter_market::instructions::bid_helpers::BidTerms;
use scatter_market::instructions::constants::{
    EMPTY_FILE_HASH, MAX_PINNERS, MAX_VALIDATORS, MIN_PINNERS, WINDOW_24H,
};
use scatter_market::state::{Quorum, QuorumKind};

/// One ether-equivalent unit used by the scenario amounts
pub const ONE_SOL: u64 = 1_000_000_000;

/// Arbitrary 32-byte value
pub fn arb_bytes32() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

/// File hash with the two rejected sentinels mixed in
pub fn arb_file_hash() -> impl Strategy<Value = [u8; 32]> {
    prop_oneof![
        1 => Just([0u8; 32]),
        1 => Just(EMPTY_FILE_HASH),
        8 => arb_bytes32(),
    ]
}

/// Bid price with edge cases
pub fn arb_price() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        Just(1u64),
        Just(ONE_SOL),
        Just(u64::MAX),
        1u64..1_000_000u64,
        1_000_000u64..100 * ONE_SOL,
    ]
}

/// Validation pool; often a multiple of small quorums
pub fn arb_pool() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        Just(1u64),
        Just(ONE_SOL / 10),
        (1u64..1_000_000u64).prop_map(|n| n * 12),
        0u64..ONE_SOL,
    ]
}

/// Hosting duration in seconds
pub fn arb_duration() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(0i64),
        Just(WINDOW_24H - 1),
        Just(WINDOW_24H),
        Just(14 * WINDOW_24H),
        -WINDOW_24H..365 * WINDOW_24H,
    ]
}

/// Requested quorum, including out-of-range values
pub fn arb_quorum() -> impl Strategy<Value = Option<Quorum>> {
    let validation = (0u16..=MAX_VALIDATORS + 2).prop_map(|value| {
        Some(Quorum {
            kind: QuorumKind::Validation,
            value,
        })
    });
    let pinners = (0u16..=MAX_PINNERS + 2).prop_map(|value| {
        Some(Quorum {
            kind: QuorumKind::PinnerCount,
            value,
        })
    });
    prop_oneof![
        Just(None),
        validation,
        pinners,
        Just(Some(Quorum {
            kind: QuorumKind::PinnerCount,
            value: MIN_PINNERS,
        })),
    ]
}

/// Arbitrary timestamp (seconds since Unix epoch)
pub fn arb_timestamp() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(0i64),
        Just(1_000_000_000i64),
        1_700_000_000i64..1_800_000_000i64,
    ]
}

/// Arbitrary stake amount
pub fn arb_stake() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        Just(1u64),
        Just(ONE_SOL),
        1u64..10 * ONE_SOL,
    ]
}

/// Input for bid fuzz testing
#[derive(Debug, Clone)]
pub struct BidInput {
    pub file_hash: [u8; 32],
    pub file_size: u64,
    pub duration: i64,
    pub price: u64,
    pub validation_pool: u64,
    pub quorum: Option<Quorum>,
    /// Added to `price + pool` to form the transferred value
    pub value_delta: i64,
    pub banned: bool,
}

impl BidInput {
    pub fn terms(&self) -> BidTerms {
        BidTerms {
            file_hash: self.file_hash,
            file_size: self.file_size,
            duration: self.duration,
            price: self.price,
            validation_pool: self.validation_pool,
            quorum: self.quorum,
        }
    }

    /// Transferred value implied by the input; mismatched when `value_delta != 0`
    pub fn value(&self) -> u64 {
        let exact = self.price.saturating_add(self.validation_pool);
        if self.value_delta >= 0 {
            exact.saturating_add(self.value_delta.unsigned_abs())
        } else {
            exact.saturating_sub(self.value_delta.unsigned_abs())
        }
    }
}

impl Arbitrary for BidInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            arb_file_hash(),
            prop_oneof![Just(0u64), 1u64..u64::MAX],
            arb_duration(),
            arb_price(),
            arb_pool(),
            arb_quorum(),
            prop_oneof![8 => Just(0i64), 1 => Just(1i64), 1 => Just(-1i64)],
            prop::bool::weighted(0.05),
        )
            .prop_map(
                |(file_hash, file_size, duration, price, validation_pool, quorum, value_delta, banned)| {
                    BidInput {
                        file_hash,
                        file_size,
                        duration,
                        price,
                        validation_pool,
                        quorum,
                        value_delta,
                        banned,
                    }
                },
            )
            .boxed()
    }
}

/// Input for accept-hold fuzz testing
#[derive(Debug, Clone)]
pub struct AcceptInput {
    pub hold: i64,
    pub first_at: i64,
    /// Seconds between the first and second accept
    pub second_after: i64,
    /// Whether the second caller is the sitting candidate
    pub same_caller: bool,
}

impl Arbitrary for AcceptInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop_oneof![Just(1i64), Just(3_600i64), 1i64..WINDOW_24H],
            arb_timestamp(),
            prop_oneof![Just(0i64), Just(3_599i64), Just(3_600i64), 0i64..2 * WINDOW_24H],
            prop::bool::weighted(0.2),
        )
            .prop_map(|(hold, first_at, second_after, same_caller)| AcceptInput {
                hold,
                first_at,
                second_after,
                same_caller,
            })
            .boxed()
    }
}

/// Input for validation fuzz testing
#[derive(Debug, Clone)]
pub struct ValidationInput {
    pub quorum: u16,
    /// Pool share per paid validator
    pub share: u64,
    pub price: u64,
    /// Verdicts in submission order; each comes from a distinct validator
    pub votes: Vec<bool>,
    /// Indices of votes replayed by the same validator
    pub replays: Vec<usize>,
}

impl Arbitrary for ValidationInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            1u16..=8u16,
            0u64..1_000_000u64,
            1u64..100 * ONE_SOL,
            prop::collection::vec(any::<bool>(), 0..16),
            prop::collection::vec(0usize..16, 0..4),
        )
            .prop_map(|(quorum, share, price, votes, replays)| ValidationInput {
                quorum,
                share,
                price,
                votes,
                replays,
            })
            .boxed()
    }
}

/// One staker's part in a pinner-count bid
#[derive(Debug, Clone)]
pub struct StakerPlan {
    /// Stake amounts in call order; zero amounts are hard failures
    pub stakes: Vec<u64>,
    pub pins: bool,
    /// Submits a defense that does not reconstruct or recover correctly
    pub dishonest: bool,
    /// Answers the challenge at all
    pub defends: bool,
    pub eth_v: bool,
}

/// Input for pinning, challenge and defense fuzz testing
#[derive(Debug, Clone)]
pub struct PinnerInput {
    pub file_hash: [u8; 32],
    pub price: u64,
    pub required: u16,
    pub stakers: Vec<StakerPlan>,
}

fn arb_staker_plan() -> impl Strategy<Value = StakerPlan> {
    (
        prop::collection::vec(arb_stake(), 0..4),
        prop::bool::weighted(0.8),
        prop::bool::weighted(0.15),
        prop::bool::weighted(0.9),
        any::<bool>(),
    )
        .prop_map(|(stakes, pins, dishonest, defends, eth_v)| StakerPlan {
            stakes,
            pins,
            dishonest,
            defends,
            eth_v,
        })
}

impl Arbitrary for PinnerInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            arb_bytes32().prop_filter("sentinel hash", |h| *h != [0u8; 32] && *h != EMPTY_FILE_HASH),
            1u64..100 * ONE_SOL,
            MIN_PINNERS..=4u16,
            prop::collection::vec(arb_staker_plan(), 1..6),
        )
            .prop_map(|(file_hash, price, required, stakers)| PinnerInput {
                file_hash,
                price,
                required,
                stakers,
            })
            .boxed()
    }
}

/// One step of a random market session
#[derive(Debug, Clone)]
pub enum MarketOp {
    Bid {
        bidder: u8,
        pinner_mode: bool,
        price: u64,
        pool_share: u64,
        quorum: u16,
    },
    Accept { bid: u8, hoster: u8 },
    Stake { bid: u8, pinner: u8, amount: u64 },
    Pin { bid: u8, caller: u8 },
    Validate { bid: u8, validator: u8, is_valid: bool },
    Defend { bid: u8, pinner: u8, honest: bool },
    Expire { bid: u8 },
    Burn { bid: u8 },
    Release { bid: u8, pinner: u8 },
    Withdraw { account: u8 },
    WithdrawBid { bid: u8, account: u8 },
    Advance { seconds: i64 },
}

impl Arbitrary for MarketOp {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        let id = || 0u8..8u8;
        prop_oneof![
            3 => (id(), any::<bool>(), 1u64..100 * ONE_SOL, 0u64..1_000u64, 1u16..=4u16).prop_map(
                |(bidder, pinner_mode, price, pool_share, quorum)| MarketOp::Bid {
                    bidder,
                    pinner_mode,
                    price,
                    pool_share,
                    quorum,
                }
            ),
            2 => (id(), id()).prop_map(|(bid, hoster)| MarketOp::Accept { bid, hoster }),
            3 => (id(), id(), arb_stake()).prop_map(|(bid, pinner, amount)| MarketOp::Stake {
                bid,
                pinner,
                amount,
            }),
            3 => (id(), id()).prop_map(|(bid, caller)| MarketOp::Pin { bid, caller }),
            3 => (id(), id(), any::<bool>()).prop_map(|(bid, validator, is_valid)| {
                MarketOp::Validate {
                    bid,
                    validator,
                    is_valid,
                }
            }),
            2 => (id(), id(), prop::bool::weighted(0.8)).prop_map(|(bid, pinner, honest)| {
                MarketOp::Defend { bid, pinner, honest }
            }),
            1 => id().prop_map(|bid| MarketOp::Expire { bid }),
            1 => id().prop_map(|bid| MarketOp::Burn { bid }),
            2 => (id(), id()).prop_map(|(bid, pinner)| MarketOp::Release { bid, pinner }),
            2 => id().prop_map(|account| MarketOp::Withdraw { account }),
            1 => (id(), id()).prop_map(|(bid, account)| MarketOp::WithdrawBid { bid, account }),
            1 => prop_oneof![Just(1i64), Just(3_600i64), Just(WINDOW_24H + 1)]
                .prop_map(|seconds| MarketOp::Advance { seconds }),
        ]
        .boxed()
    }
}
