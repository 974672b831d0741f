//! # Concurrent Commands
//!
//! A Complete racing a Cancel on the same instance settles exactly once.
//! Commands on distinct instances proceed in parallel without interfering.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{World, ESCROW_AMOUNT, STARTING_BALANCE};
use solpay_escrow::{EscrowError, Stage};

#[test]
fn complete_and_cancel_race_settles_once() {
    for round in 0..25u64 {
        let world = Arc::new(World::new());
        world.open(round, ESCROW_AMOUNT).expect("open");
        let total = world.tokens_in_play();
        let barrier = Arc::new(Barrier::new(2));

        let completer = {
            let world = Arc::clone(&world);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                world.complete(round)
            })
        };
        let canceller = {
            let world = Arc::clone(&world);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                world.cancel(round)
            })
        };
        let completed = completer.join().expect("completer thread");
        let cancelled = canceller.join().expect("canceller thread");

        let stage = world.program.get_state(&world.key(round)).expect("record").stage();
        match (completed, cancelled) {
            (Ok(()), Err(EscrowError::WrongStage { stage: seen, .. })) => {
                assert_eq!(seen, Stage::Completed);
                assert_eq!(stage, Stage::Completed);
                assert_eq!(world.balance(&world.recipient_account()), ESCROW_AMOUNT);
                assert_eq!(
                    world.balance(&world.sender_account()),
                    STARTING_BALANCE - ESCROW_AMOUNT
                );
            }
            (Err(EscrowError::WrongStage { stage: seen, .. }), Ok(())) => {
                assert_eq!(seen, Stage::Cancelled);
                assert_eq!(stage, Stage::Cancelled);
                assert_eq!(world.balance(&world.recipient_account()), 0);
                assert_eq!(world.balance(&world.sender_account()), STARTING_BALANCE);
            }
            other => panic!("round {round}: expected exactly one winner, got {other:?}"),
        }
        assert_eq!(world.tokens_in_play(), total);
    }
}

#[test]
fn concurrent_duplicate_opens_admit_one() {
    let world = Arc::new(World::new());
    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let world = Arc::clone(&world);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                world.open(1, ESCROW_AMOUNT)
            })
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("open thread"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().filter(|r| r.is_err()).all(|r| matches!(
        r,
        Err(EscrowError::DuplicateInstance { .. })
    )));
    assert_eq!(
        world.balance(&world.sender_account()),
        STARTING_BALANCE - ESCROW_AMOUNT
    );
    assert_eq!(world.program.records().len(), 1);
}

#[test]
fn distinct_instances_settle_in_parallel() {
    const INSTANCES: u64 = 16;
    let world = Arc::new(World::new());
    for id in 0..INSTANCES {
        world.open(id, 1_000 + id).expect("open");
    }

    let handles: Vec<_> = (0..INSTANCES)
        .map(|id| {
            let world = Arc::clone(&world);
            thread::spawn(move || {
                if id % 2 == 0 {
                    world.complete(id)
                } else {
                    world.cancel(id)
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("settle thread").expect("settle");
    }

    let completed: u64 = (0..INSTANCES).filter(|id| id % 2 == 0).map(|id| 1_000 + id).sum();
    assert_eq!(world.balance(&world.recipient_account()), completed);
    assert_eq!(
        world.balance(&world.sender_account()),
        STARTING_BALANCE - completed
    );
    for id in 0..INSTANCES {
        let expected = if id % 2 == 0 {
            Stage::Completed
        } else {
            Stage::Cancelled
        };
        assert_eq!(
            world.program.get_state(&world.key(id)).expect("record").stage(),
            expected
        );
    }
}
