//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that settlement arithmetic maintains its
//! invariants across random inputs.

use proptest::prelude::*;

use coinpredict::domain::bet::{Bet, Direction};
use coinpredict::domain::settlement::{Outcome, outcome, payouts};

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Up), Just(Direction::Down)]
}

fn arb_bets() -> impl Strategy<Value = Vec<Bet>> {
    prop::collection::vec(
        (1i64..1000, arb_direction(), 1i64..10_000),
        0..50,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (user_id, direction, amount))| Bet {
                id: i as i64 + 1,
                user_id,
                market_id: 1,
                direction,
                amount,
                resolved: false,
            })
            .collect()
    })
}

// ── Outcome Classification Properties ───────────────────────

proptest! {
    /// Within the epsilon the market is always a tie, regardless of sign.
    #[test]
    fn outcome_within_epsilon_is_tie(
        open in 1_000.0f64..100_000.0,
        delta in -0.009f64..0.009,
    ) {
        prop_assert_eq!(outcome(open, open + delta, 0.01), Outcome::Tie);
    }

    /// Beyond the epsilon the winner matches the sign of the move.
    #[test]
    fn outcome_beyond_epsilon_matches_move_sign(
        open in 1_000.0f64..100_000.0,
        magnitude in 0.02f64..5_000.0,
        up in any::<bool>(),
    ) {
        let close = if up { open + magnitude } else { open - magnitude };
        let expected = if up { Direction::Up } else { Direction::Down };
        prop_assert_eq!(outcome(open, close, 0.01), Outcome::Winner(expected));
    }
}

// ── Payout Properties ───────────────────────────────────────

proptest! {
    /// A tie refunds exactly the sum of all stakes.
    #[test]
    fn tie_refunds_exactly_the_stakes(bets in arb_bets()) {
        let credits = payouts(&bets, Outcome::Tie, 2);
        prop_assert_eq!(credits.len(), bets.len());

        let refunded: i64 = credits.iter().map(|p| p.amount).sum();
        let staked: i64 = bets.iter().map(|b| b.amount).sum();
        prop_assert_eq!(refunded, staked);
    }

    /// A decided market pays winning stakes times the multiplier and
    /// nothing else.
    #[test]
    fn winners_paid_stake_times_multiplier(
        bets in arb_bets(),
        winner in arb_direction(),
        multiplier in 1i64..10,
    ) {
        let credits = payouts(&bets, Outcome::Winner(winner), multiplier);

        let paid: i64 = credits.iter().map(|p| p.amount).sum();
        let winning_stakes: i64 = bets
            .iter()
            .filter(|b| b.direction == winner)
            .map(|b| b.amount)
            .sum();
        prop_assert_eq!(paid, winning_stakes * multiplier);

        // Every credited bet actually bet the winning direction.
        for credit in &credits {
            let bet = bets.iter().find(|b| b.id == credit.bet_id).unwrap();
            prop_assert_eq!(bet.direction, winner);
        }
    }

    /// No settlement ever produces a non-positive credit.
    #[test]
    fn credits_are_always_positive(
        bets in arb_bets(),
        winner in arb_direction(),
    ) {
        for out in [Outcome::Tie, Outcome::Winner(winner)] {
            for credit in payouts(&bets, out, 2) {
                prop_assert!(credit.amount > 0);
            }
        }
    }
}
