//! Change Address Allocator Integration Tests

mod common;

use common::{engine, MNEMONIC};
use std::collections::HashSet;
use std::sync::Arc;
use wallet_core::TxDetails;

const WALLET: &str = "alice";

#[test]
fn sequential_allocations_never_repeat() {
    let t = engine();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();

    let mut seen = HashSet::new();
    for _ in 0..10 {
        let address = t
            .manager
            .next_change_address(WALLET, TxDetails::default())
            .unwrap();
        assert!(seen.insert(address), "change address handed out twice");
    }
}

#[test]
fn concurrent_allocations_return_distinct_addresses() {
    let t = engine();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();
    let manager = Arc::new(t.manager);

    const THREADS: usize = 16;
    let mut addresses = Vec::new();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let manager = manager.clone();
                scope.spawn(move || {
                    manager
                        .next_change_address(WALLET, TxDetails::default())
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            addresses.push(handle.join().unwrap());
        }
    });

    let distinct: HashSet<&String> = addresses.iter().collect();
    assert_eq!(distinct.len(), THREADS, "each caller must get its own address");
}

#[test]
fn change_and_receive_chains_are_disjoint() {
    let t = engine();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();

    let request_id = t
        .manager
        .create_request(WALLET, TxDetails::default(), false)
        .unwrap();
    let receive = t.manager.request_address(WALLET, &request_id).unwrap();

    for _ in 0..10 {
        let change = t
            .manager
            .next_change_address(WALLET, TxDetails::default())
            .unwrap();
        assert_ne!(change, receive);
    }
}

#[test]
fn allocations_survive_reopen() {
    let t = engine();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();

    let before = t
        .manager
        .next_change_address(WALLET, TxDetails::default())
        .unwrap();

    t.manager.close_wallet(WALLET).unwrap();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();

    let after = t
        .manager
        .next_change_address(WALLET, TxDetails::default())
        .unwrap();
    assert_ne!(before, after, "consumed index must stay consumed across reopen");
}
