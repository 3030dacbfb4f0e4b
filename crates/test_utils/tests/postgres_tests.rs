//! PostgresFeeStore tests against a real database
//!
//! Ignored by default; run with `cargo test -p test_utils -- --ignored`
//! on a machine with docker.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::DateRange;
use domain_calculation::CalculationStatus;

use test_utils::db_test;
use test_utils::*;

db_test!(test_postgres_charge_and_partial_payment, |db| {
    let world = FeeWorldBuilder::new().store(db.store()).build().await.unwrap();

    let calculation = world.approved(vec![ItemFixtures::plastic(dec!(2000))]).await.unwrap();
    assert!(calculation.number.starts_with("CALC-"));
    assert_eq!(world.balance().await.unwrap(), dec!(-800));

    let partial = world.pay(&calculation, dec!(500)).await.unwrap();
    assert_status(&partial, CalculationStatus::PartiallyPaid);

    let ledger = &world.services.ledger;
    let account = ledger.account(&world.reviewer, world.company).await.unwrap();
    let log = ledger
        .history(&world.reviewer, world.company, DateRange::unbounded())
        .await
        .unwrap();
    assert_eq!(log.len(), 2);
    assert_ledger_consistent(&account, &log);

    let reconciliation = ledger
        .reconcile(&world.reviewer, world.company, calculation.id)
        .await
        .unwrap();
    assert_money_eq(reconciliation.balance, dec!(300));
});

db_test!(test_postgres_rejects_overdrawn_refund, |db| {
    let world = FeeWorldBuilder::new().store(db.store()).build().await.unwrap();

    let result = world
        .services
        .ledger
        .refund_request(&world.reviewer, world.company, dec!(1000), "overpaid")
        .await;

    assert_business_rule(result);
    assert_eq!(world.balance().await.unwrap(), Decimal::ZERO);
});

db_test!(test_postgres_concurrent_payments_serialize, |db| {
    let world = FeeWorldBuilder::new().store(db.store()).build().await.unwrap();
    let ledger = world.services.ledger.clone();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let ledger = ledger.clone();
            let reviewer = world.reviewer.clone();
            let company = world.company;
            tokio::spawn(async move { ledger.pay(&reviewer, company, dec!(10), None, None).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let account = ledger.account(&world.reviewer, world.company).await.unwrap();
    let log = ledger
        .history(&world.reviewer, world.company, DateRange::unbounded())
        .await
        .unwrap();
    assert_balance(&account, dec!(100));
    assert_ledger_consistent(&account, &log);
});

db_test!(test_postgres_clear_data_empties_store, |db| {
    let world = FeeWorldBuilder::new().store(db.store()).build().await.unwrap();
    world.approved(vec![ItemFixtures::glass(dec!(1000))]).await.unwrap();

    db.clear_data().await.unwrap();

    let summary = world.services.ledger.summary(&world.reviewer).await.unwrap();
    assert_eq!(summary.total_accounts, 0);
});
