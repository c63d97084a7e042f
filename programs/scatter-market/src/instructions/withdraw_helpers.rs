//! Balance withdrawal rules shared by `withdraw` and `withdraw_bid`.

use crate::outcome::{reason, Outcome};
use crate::state::{Balance, Bid, MarketConfig};
use anchor_lang::prelude::*;

/// Drain an account's balance. A missing or empty balance is a soft failure.
pub fn withdraw_balance(market: &mut MarketConfig, balance: Option<&mut Balance>) -> Result<Outcome> {
    let balance = match balance {
        Some(balance) if balance.owed > 0 => balance,
        _ => {
            return Ok(Outcome::WithdrawFailed {
                reason: reason::ZERO_BALANCE,
            })
        }
    };
    let value = balance.drain()?;
    market.pay_out(value)?;
    Ok(Outcome::Withdrawn { value })
}

/// Hoster withdrawal scoped to one bid.
///
/// Only the bid's hoster may call, and only once the bid has settled. The
/// bidder is never the hoster, so a bidder can never take their own payout.
/// Pays at most the bid's price, once; other credit stays in the balance.
pub fn withdraw_for_bid(
    market: &mut MarketConfig,
    bid: &mut Bid,
    caller: Pubkey,
    balance: Option<&mut Balance>,
) -> Result<Outcome> {
    if bid.hoster == Pubkey::default() || bid.hoster != caller {
        return Ok(Outcome::WithdrawFailed {
            reason: reason::INVALID_WITHDRAWER,
        });
    }
    if !bid.settled {
        return Ok(Outcome::WithdrawFailed {
            reason: reason::NOT_SATISFIED,
        });
    }
    let balance = match balance {
        Some(balance) if balance.owed > 0 && !bid.payout_withdrawn => balance,
        _ => {
            return Ok(Outcome::WithdrawFailed {
                reason: reason::ZERO_BALANCE,
            })
        }
    };
    let value = balance.debit(bid.price)?;
    market.pay_out(value)?;
    bid.payout_withdrawn = true;
    Ok(Outcome::Withdrawn { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BidStatus;

    fn market_owing(amount: u64) -> MarketConfig {
        let mut market = MarketConfig::default();
        market.escrow(amount).unwrap();
        market.release_escrow(amount).unwrap();
        market
    }

    #[test]
    fn test_zero_balance_is_soft() {
        let mut market = MarketConfig::default();
        assert_eq!(
            withdraw_balance(&mut market, None).unwrap(),
            Outcome::WithdrawFailed {
                reason: reason::ZERO_BALANCE
            }
        );
        let mut empty = Balance::default();
        assert_eq!(
            withdraw_balance(&mut market, Some(&mut empty)).unwrap(),
            Outcome::WithdrawFailed {
                reason: reason::ZERO_BALANCE
            }
        );
        assert_eq!(empty.total_withdrawn, 0);
    }

    #[test]
    fn test_withdraw_twice_never_doubles() {
        let mut market = market_owing(500);
        let mut balance = Balance {
            owed: 500,
            ..Balance::default()
        };
        assert_eq!(
            withdraw_balance(&mut market, Some(&mut balance)).unwrap(),
            Outcome::Withdrawn { value: 500 }
        );
        assert!(withdraw_balance(&mut market, Some(&mut balance))
            .unwrap()
            .is_rejection());
        assert_eq!(balance.total_withdrawn, 500);
        assert_eq!(market.total_owed, 0);
    }

    #[test]
    fn test_bid_scoped_withdraw_rules() {
        let hoster = Pubkey::new_unique();
        let mut bid = Bid {
            bidder: Pubkey::new_unique(),
            hoster,
            status: BidStatus::Pinned,
            ..Bid::default()
        };
        let mut market = market_owing(100);
        let mut balance = Balance {
            owed: 100,
            ..Balance::default()
        };

        let bidder = bid.bidder;
        assert_eq!(
            withdraw_for_bid(&mut market, &mut bid, bidder, Some(&mut balance)).unwrap(),
            Outcome::WithdrawFailed {
                reason: reason::INVALID_WITHDRAWER
            }
        );
        assert_eq!(
            withdraw_for_bid(&mut market, &mut bid, hoster, Some(&mut balance)).unwrap(),
            Outcome::WithdrawFailed {
                reason: reason::NOT_SATISFIED
            }
        );

        bid.settled = true;
        bid.price = 100;
        assert_eq!(
            withdraw_for_bid(&mut market, &mut bid, hoster, Some(&mut balance)).unwrap(),
            Outcome::Withdrawn { value: 100 }
        );
        assert_eq!(balance.owed, 0);
        assert!(bid.payout_withdrawn);
    }

    #[test]
    fn test_bid_withdraw_pays_only_that_bid() {
        let hoster = Pubkey::new_unique();
        let mut bid = Bid {
            bidder: Pubkey::new_unique(),
            hoster,
            price: 300,
            settled: true,
            status: BidStatus::Satisfied,
            ..Bid::default()
        };
        // Payout of this bid plus credit earned elsewhere
        let mut market = market_owing(1_000);
        let mut balance = Balance {
            owed: 1_000,
            ..Balance::default()
        };

        assert_eq!(
            withdraw_for_bid(&mut market, &mut bid, hoster, Some(&mut balance)).unwrap(),
            Outcome::Withdrawn { value: 300 }
        );
        assert_eq!(balance.owed, 700);
        assert_eq!(market.total_owed, 700);

        // A second call on the same bid pays nothing
        assert_eq!(
            withdraw_for_bid(&mut market, &mut bid, hoster, Some(&mut balance)).unwrap(),
            Outcome::WithdrawFailed {
                reason: reason::ZERO_BALANCE
            }
        );
        assert_eq!(balance.owed, 700);

        // The rest comes out through the plain withdrawal
        assert_eq!(
            withdraw_balance(&mut market, Some(&mut balance)).unwrap(),
            Outcome::Withdrawn { value: 700 }
        );
        assert_eq!(balance.total_withdrawn, 1_000);
    }

    #[test]
    fn test_bid_withdraw_capped_by_balance() {
        let hoster = Pubkey::new_unique();
        let mut bid = Bid {
            hoster,
            price: 300,
            settled: true,
            ..Bid::default()
        };
        let mut market = market_owing(120);
        let mut balance = Balance {
            owed: 120,
            ..Balance::default()
        };
        assert_eq!(
            withdraw_for_bid(&mut market, &mut bid, hoster, Some(&mut balance)).unwrap(),
            Outcome::Withdrawn { value: 120 }
        );
        assert_eq!(balance.owed, 0);
    }

    #[test]
    fn test_unhosted_bid_has_no_withdrawer() {
        let mut bid = Bid::default();
        assert_eq!(
            withdraw_for_bid(&mut MarketConfig::default(), &mut bid, Pubkey::default(), None).unwrap(),
            Outcome::WithdrawFailed {
                reason: reason::INVALID_WITHDRAWER
            }
        );
    }
}
