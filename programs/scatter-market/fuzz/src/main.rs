//! Fuzz test runner for the Scatter storage market
//!
//! Run with: cargo run --release
//! Or: cargo test (for property-based tests)

use proptest::prelude::*;
use proptest::strategy::ValueTree;
use scatter_market::instructions::bid_helpers::check_bid_terms;
use scatter_market::outcome::Outcome;
use scatter_market_fuzz::*;
use std::time::Instant;

fn main() {
    println!("=== Scatter Storage Market Fuzz Testing ===\n");

    let start = Instant::now();
    let mut total_tests = 0;
    let mut passed = 0;
    let mut failed = 0;

    println!("Running bid fuzz tests...");
    let (p, f) = run_bid_fuzz(200);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running validation fuzz tests...");
    let (p, f) = run_validation_fuzz(100);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running defense fuzz tests...");
    let (p, f) = run_defense_fuzz(100);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running market session fuzz tests...");
    let (p, f) = run_session_fuzz(100);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running scenario tests...");
    let (p, f) = run_scenarios();
    passed += p;
    failed += f;
    total_tests += p + f;

    let duration = start.elapsed();

    println!("\n=== Fuzz Testing Complete ===");
    println!("Total tests: {}", total_tests);
    println!("Passed: {}", passed);
    println!("Failed: {}", failed);
    println!("Duration: {:?}", duration);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn run_bid_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = proptest::test_runner::TestRunner::default();

    for i in 0..iterations {
        let input = any::<BidInput>()
            .new_tree(&mut runner)
            .expect("Failed to generate BidInput")
            .current();

        let mut sim = SimulatedMarket::default();
        let bidder = actor(10);
        if input.banned {
            sim.banned.insert(bidder);
        }
        let terms = input.terms();
        let value = input.value();
        let expected = match check_bid_terms(&sim.market, &terms, value, input.banned) {
            Some(reason) => Outcome::BidInvalid { reason },
            None => Outcome::BidSuccessful { bid_id: 1 },
        };

        let result = sim.step(|s| s.place_bid(bidder, terms, value));
        if result.outcome() != Some(&expected) {
            println!("  [FAIL] Iteration {}: {:?}, expected {:?}", i, result, expected);
            failed += 1;
        } else {
            passed += 1;
        }
    }

    println!("  bid: {} passed, {} failed", passed, failed);
    (passed, failed)
}

fn run_validation_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = proptest::test_runner::TestRunner::default();

    for i in 0..iterations {
        let input = any::<ValidationInput>()
            .new_tree(&mut runner)
            .expect("Failed to generate ValidationInput")
            .current();

        let mut sim = SimulatedMarket::default();
        let hoster = actor(20);
        let pool = input.share * u64::from(input.quorum);
        let bid_id = match must_place(
            &mut sim,
            actor(10),
            validation_terms(SCENARIO_HASH, input.price, pool, input.quorum),
        ) {
            Some(id) => id,
            None => {
                println!("  [FAIL] Iteration {}: bid rejected {:?}", i, input);
                failed += 1;
                continue;
            }
        };
        sim.step(|s| s.accept(bid_id, hoster));
        sim.step(|s| s.pin(bid_id, hoster));

        let mut violation = None;
        for (n, verdict) in input.votes.iter().enumerate() {
            let result = sim.step(|s| s.validate(bid_id, actor(40 + n as u8), *verdict));
            if !result.is_success() {
                violation = Some(result);
                break;
            }
        }

        match violation {
            Some(result) => {
                println!("  [FAIL] Iteration {}: {:?}", i, result);
                failed += 1;
            }
            None => passed += 1,
        }
    }

    println!("  validation: {} passed, {} failed", passed, failed);
    (passed, failed)
}

fn run_defense_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = proptest::test_runner::TestRunner::default();

    for i in 0..iterations {
        let input = any::<PinnerInput>()
            .new_tree(&mut runner)
            .expect("Failed to generate PinnerInput")
            .current();

        match run_defense_round(&input) {
            Ok(report) if report.mad && report.remaining_stake != 0 => {
                println!("  [FAIL] Iteration {}: stake survived MAD {:?}", i, report);
                failed += 1;
            }
            Ok(_) => passed += 1,
            Err(e) => {
                println!("  [FAIL] Iteration {}: {}", i, e);
                failed += 1;
            }
        }
    }

    println!("  defense: {} passed, {} failed", passed, failed);
    (passed, failed)
}

fn run_session_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = proptest::test_runner::TestRunner::default();
    let strategy = prop::collection::vec(any::<MarketOp>(), 1..64);

    for i in 0..iterations {
        let ops = strategy
            .new_tree(&mut runner)
            .expect("Failed to generate MarketOp sequence")
            .current();

        match run_operations(&ops) {
            Ok(_) => passed += 1,
            Err(e) => {
                println!("  [FAIL] Iteration {}: {}", i, e);
                failed += 1;
            }
        }
    }

    println!("  sessions: {} passed, {} failed", passed, failed);
    (passed, failed)
}

fn run_scenarios() -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    // Accept hold: wait, then displace
    match scenario_accept_hold() {
        Ok(outcomes)
            if matches!(outcomes.get(1), Some(Outcome::AcceptWait { .. }))
                && matches!(outcomes.get(2), Some(Outcome::Accepted { .. })) =>
        {
            passed += 1
        }
        other => {
            println!("  [FAIL] accept hold: {:?}", other);
            failed += 1;
        }
    }

    // Four validators, one dissent
    match scenario_validation_quorum() {
        Ok(report)
            if report.sway == 2
                && report.satisfied
                && report.hoster_paid == ONE_SOL
                && report.validator_owed.iter().all(|v| *v == ONE_SOL / 40) =>
        {
            passed += 1
        }
        other => {
            println!("  [FAIL] validation quorum: {:?}", other);
            failed += 1;
        }
    }

    println!("  scenarios: {} passed, {} failed", passed, failed);
    (passed, failed)
}
