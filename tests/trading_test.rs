//! Protocol-level tests: the buying pass and the exactness guarantees
//! of request/send against real and scripted counterparts.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use caresim::model::{unit_price, ItemKind};
use caresim::trading::mock::{LedgerBuyer, ScriptedSeller};
use caresim::trading::{buy_from_sellers, Trader};
use caresim::{NullObserver, TradeError};

/// Three suppliers, two empty and one sufficiently stocked: the pass
/// obtains the full requested quantity and knocks on every empty door at
/// most once.
#[test]
fn buying_pass_reaches_the_stocked_seller() {
    let empty_a = Arc::new(ScriptedSeller::new(1, ItemKind::Pill, 0));
    let empty_b = Arc::new(ScriptedSeller::new(2, ItemKind::Pill, 0));
    let stocked = Arc::new(ScriptedSeller::new(3, ItemKind::Pill, 100));
    let sellers: Vec<Arc<dyn Trader>> = vec![empty_a.clone(), empty_b.clone(), stocked.clone()];

    let buyer = LedgerBuyer::new(9, 1000);

    // The pass outcome must hold for any shuffle order.
    for seed in 0..16 {
        let mut rng = StdRng::seed_from_u64(seed);
        let before_a = empty_a.request_calls();
        let before_b = empty_b.request_calls();

        let got = buy_from_sellers(&mut rng, &buyer, &sellers, ItemKind::Pill, 5, 5);
        assert_eq!(got, 5, "seed {seed}: full quantity expected");
        assert!(empty_a.request_calls() - before_a <= 1);
        assert!(empty_b.request_calls() - before_b <= 1);
    }

    // Every unit obtained was delivered and paid at the unit price.
    assert_eq!(buyer.received(ItemKind::Pill), 16 * 5);
    assert_eq!(buyer.funds(), 1000 - i64::from(16 * 5) * unit_price(ItemKind::Pill));
}

#[test]
fn pass_over_only_empty_sellers_obtains_nothing() {
    let sellers: Vec<Arc<dyn Trader>> = vec![
        Arc::new(ScriptedSeller::new(1, ItemKind::Syringe, 0)),
        Arc::new(ScriptedSeller::new(2, ItemKind::Syringe, 0)),
    ];
    let buyer = LedgerBuyer::new(9, 100);
    let mut rng = StdRng::seed_from_u64(1);

    assert_eq!(buy_from_sellers(&mut rng, &buyer, &sellers, ItemKind::Syringe, 5, 5), 0);
    assert_eq!(buyer.funds(), 100);
    assert_eq!(buyer.received(ItemKind::Syringe), 0);
}

/// A seller that overbills does not abort the committed order; the buyer
/// keeps the goods and its prepayment stands.
#[test]
fn price_mismatch_never_aborts_a_committed_order() {
    let greedy = Arc::new(ScriptedSeller::with_surcharge(1, ItemKind::Scalpel, 10, 3));
    let sellers: Vec<Arc<dyn Trader>> = vec![greedy];
    let buyer = LedgerBuyer::new(9, 100);
    let mut rng = StdRng::seed_from_u64(1);

    let got = buy_from_sellers(&mut rng, &buyer, &sellers, ItemKind::Scalpel, 1, 1);
    assert_eq!(got, 1);
    assert_eq!(buyer.received(ItemKind::Scalpel), 1);
    // The buyer's debit is the expected price, not the inflated bill.
    assert_eq!(buyer.funds(), 100 - unit_price(ItemKind::Scalpel));
}

/// Nonzero return means the callee moved exactly the communicated
/// amounts; an error means it moved nothing.
#[test]
fn callee_deltas_are_exact() {
    use caresim::actors::Supplier;

    let supplier = Supplier::pharmacy(1, 100, Arc::new(NullObserver));
    let funds_before = supplier.funds();
    let stock_before = supplier.snapshot();

    let err = supplier.request(ItemKind::Pill, 1).unwrap_err();
    assert_eq!(err, TradeError::InsufficientStock { item: ItemKind::Pill, qty: 1 });
    assert_eq!(supplier.funds(), funds_before);
    assert_eq!(supplier.snapshot(), stock_before);

    let err = supplier.request(ItemKind::Scalpel, 1).unwrap_err();
    assert_eq!(err, TradeError::UnsupportedItem { item: ItemKind::Scalpel });
    assert_eq!(supplier.funds(), funds_before);
    assert_eq!(supplier.snapshot(), stock_before);
}

/// The hospital moves funds and stock by exactly the communicated
/// amounts in both directions of a successful round trip.
#[test]
fn hospital_round_trip_deltas_are_exact() {
    use caresim::actors::Hospital;
    use caresim::model::{wage, Role};

    let hospital = Hospital::new(7, 1000, 10, 3, Arc::new(NullObserver));

    let accepted = hospital.send(ItemKind::Sick, 3, 75).unwrap();
    assert_eq!(accepted, 3);
    assert_eq!(hospital.snapshot().qty(ItemKind::Sick), 3);
    assert_eq!(hospital.funds(), 1000 - 75 - 3 * wage(Role::Nurse));

    let after_admission = hospital.funds();
    let benefit = hospital.request(ItemKind::Sick, 3).unwrap();
    assert_eq!(benefit, 3 * unit_price(ItemKind::Sick));
    assert_eq!(hospital.snapshot().qty(ItemKind::Sick), 0);
    assert_eq!(hospital.funds(), after_admission + benefit);
    assert_eq!(hospital.current_beds(), 0);
}
