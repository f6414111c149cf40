//! Ingestion Engine Integration Tests
//!
//! Covers malleability dedup, idempotent re-delivery, request crediting,
//! and height-driven confirmation batching.

mod common;

use common::{engine, observed, random_chain_id, MNEMONIC};
use wallet_core::{ChainEvent, EngineEvent};

const WALLET: &str = "alice";

#[test]
fn duplicate_chain_id_yields_one_record_with_stable_internal_id() {
    let t = engine();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();

    let chain_id = random_chain_id();
    let tx = observed(&chain_id, "", "tb1qcounterparty", 1000);

    t.manager.handle_event(ChainEvent::TransactionObserved {
        wallet_id: WALLET.to_string(),
        tx: tx.clone(),
    });
    let first = t.manager.list_transactions(WALLET, 0, i64::MAX).unwrap();
    assert_eq!(first.len(), 1);
    let internal_id = first[0].internal_id.clone();

    // Reprocessing the identical event is a no-op.
    for _ in 0..3 {
        t.manager.handle_event(ChainEvent::TransactionObserved {
            wallet_id: WALLET.to_string(),
            tx: tx.clone(),
        });
    }
    let after = t.manager.list_transactions(WALLET, 0, i64::MAX).unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].internal_id, internal_id);
}

#[test]
fn malleated_id_updates_the_same_record() {
    let t = engine();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();

    let mal_id = random_chain_id();
    let tx_a = observed("chain-a", &mal_id, "tb1qcounterparty", 1000);
    let tx_b = observed("chain-b", &mal_id, "tb1qcounterparty", 1000);

    t.manager.handle_event(ChainEvent::TransactionObserved {
        wallet_id: WALLET.to_string(),
        tx: tx_a,
    });
    let internal_id = t.manager.list_transactions(WALLET, 0, i64::MAX).unwrap()[0]
        .internal_id
        .clone();

    t.manager.handle_event(ChainEvent::TransactionObserved {
        wallet_id: WALLET.to_string(),
        tx: tx_b,
    });

    let records = t.manager.list_transactions(WALLET, 0, i64::MAX).unwrap();
    assert_eq!(records.len(), 1, "malleation must not duplicate the record");
    assert_eq!(records[0].internal_id, internal_id);
    assert_eq!(records[0].chain_id.as_deref(), Some("chain-b"));

    // The record stays reachable under both chain-level ids.
    assert!(t.manager.get_transaction(WALLET, "chain-b").is_ok());
}

#[test]
fn crediting_is_idempotent_and_accumulates_across_transactions() {
    let t = engine();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();

    let request_id = t
        .manager
        .create_request(WALLET, Default::default(), false)
        .unwrap();
    let address = t.manager.request_address(WALLET, &request_id).unwrap();

    let first = observed(&random_chain_id(), "", &address, 50_000);
    t.manager.handle_event(ChainEvent::TransactionObserved {
        wallet_id: WALLET.to_string(),
        tx: first.clone(),
    });
    let pending = t.manager.pending_requests(WALLET).unwrap();
    assert_eq!(pending[0].amount_received, 50_000);

    // Identical re-delivery leaves the total untouched.
    t.manager.handle_event(ChainEvent::TransactionObserved {
        wallet_id: WALLET.to_string(),
        tx: first,
    });
    let pending = t.manager.pending_requests(WALLET).unwrap();
    assert_eq!(pending[0].amount_received, 50_000);

    // A distinct transaction to the same address adds up.
    let second = observed(&random_chain_id(), "", &address, 10_000);
    t.manager.handle_event(ChainEvent::TransactionObserved {
        wallet_id: WALLET.to_string(),
        tx: second,
    });
    let pending = t.manager.pending_requests(WALLET).unwrap();
    assert_eq!(pending[0].amount_received, 60_000);
}

#[test]
fn credited_request_emits_event() {
    let t = engine();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();
    let mut events = t.manager.subscribe();

    let request_id = t
        .manager
        .create_request(WALLET, Default::default(), false)
        .unwrap();
    let address = t.manager.request_address(WALLET, &request_id).unwrap();

    t.manager.handle_event(ChainEvent::TransactionObserved {
        wallet_id: WALLET.to_string(),
        tx: observed(&random_chain_id(), "", &address, 50_000),
    });

    let mut credited = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::RequestCredited {
            request_id: id,
            amount_satoshi,
            ..
        } = event
        {
            credited.push((id, amount_satoshi));
        }
    }
    assert_eq!(credited, vec![(request_id, 50_000)]);
}

#[test]
fn foreign_wallet_events_are_dropped() {
    let t = engine();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();

    t.manager.handle_event(ChainEvent::TransactionObserved {
        wallet_id: "nobody".to_string(),
        tx: observed(&random_chain_id(), "", "tb1qcounterparty", 1000),
    });

    assert!(t.manager.list_transactions(WALLET, 0, i64::MAX).unwrap().is_empty());
}

#[test]
fn height_change_confirms_records_with_one_notification_per_wallet() {
    let t = engine();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();

    // Two transactions mined at height 100, observed while the wallet
    // still thinks the tip is 0.
    for _ in 0..2 {
        let mut tx = observed(&random_chain_id(), "", "tb1qcounterparty", 1000);
        tx.block_height = 100;
        t.manager.handle_event(ChainEvent::TransactionObserved {
            wallet_id: WALLET.to_string(),
            tx,
        });
    }
    for info in t.manager.list_transactions(WALLET, 0, i64::MAX).unwrap() {
        assert_eq!(info.confirmations, 0);
    }

    let mut events = t.manager.subscribe();
    t.manager.handle_event(ChainEvent::HeightChanged(105));

    let mut height_events = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::HeightChanged { wallet_id, height } = event {
            height_events.push((wallet_id, height));
        }
    }
    assert_eq!(
        height_events,
        vec![(WALLET.to_string(), 105)],
        "one notification per wallet, not per transaction"
    );

    for info in t.manager.list_transactions(WALLET, 0, i64::MAX).unwrap() {
        assert_eq!(info.confirmations, 6);
    }
}

#[test]
fn reorg_below_a_record_demotes_it_to_unconfirmed() {
    let t = engine();
    t.manager.open_wallet(WALLET, MNEMONIC).unwrap();

    let mut tx = observed(&random_chain_id(), "", "tb1qcounterparty", 1000);
    tx.block_height = 100;
    t.manager.handle_event(ChainEvent::TransactionObserved {
        wallet_id: WALLET.to_string(),
        tx,
    });

    t.manager.handle_event(ChainEvent::HeightChanged(100));
    let confirmed = &t.manager.list_transactions(WALLET, 0, i64::MAX).unwrap()[0];
    assert_eq!(confirmed.confirmations, 1);

    t.manager.handle_event(ChainEvent::HeightChanged(98));
    let demoted = &t.manager.list_transactions(WALLET, 0, i64::MAX).unwrap()[0];
    assert_eq!(demoted.confirmations, 0);
}
