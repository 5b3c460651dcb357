//! Counterpart selection and the one-pass buying loop.
//!
//! [`buy_from_sellers`] is the retry-until-exhausted algorithm every
//! buying actor uses: one pass over a shuffled candidate list, at most
//! one order per candidate, stopping early when the wanted quantity is
//! reached or the buyer's funds run out. Explicit iteration rather than
//! recursion keeps the no-repeat and termination guarantees easy to see.

use std::sync::Arc;

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use tracing::debug;

use crate::actors::ActorId;
use crate::model::{unit_price, ItemKind};

use super::protocol::{check_charged_price, Trader};

/// Uniform random pick from a candidate set. `None` for an empty set.
pub fn choose_random_seller<'a, R: Rng>(
    rng: &mut R,
    candidates: &'a [Arc<dyn Trader>],
) -> Option<&'a Arc<dyn Trader>> {
    candidates.choose(rng)
}

/// The caller side of a purchase.
///
/// The buying pass never touches the buyer's state directly; it goes
/// through this seam so each method is one critical section on the
/// buyer's own lock, taken while no counterpart call is in flight.
pub trait Buyer: Send + Sync {
    fn id(&self) -> ActorId;

    /// Debit `cost` if funds cover it, under the buyer's own lock.
    /// Returns false (and debits nothing) otherwise.
    fn try_debit(&self, cost: i64) -> bool;

    /// Return a prepaid amount after a refused order.
    fn refund(&self, amount: i64);

    /// Take delivery of purchased goods.
    fn receive(&self, item: ItemKind, qty: u32);
}

/// One buying pass: order `item` from `sellers` until `max_qty` units
/// are obtained, funds are exhausted, or every candidate has been tried
/// once. Each order asks for at most `per_order` units and is prepaid at
/// the expected unit price; a refusal refunds the prepayment and drops
/// that candidate for the rest of the pass.
///
/// Returns the total quantity obtained, 0 if none.
pub fn buy_from_sellers<R: Rng>(
    rng: &mut R,
    buyer: &dyn Buyer,
    sellers: &[Arc<dyn Trader>],
    item: ItemKind,
    max_qty: u32,
    per_order: u32,
) -> u32 {
    let mut order_of: Vec<&Arc<dyn Trader>> = sellers.iter().collect();
    order_of.shuffle(rng);

    let mut obtained = 0u32;
    for seller in order_of {
        let remaining = max_qty - obtained;
        if remaining == 0 {
            break;
        }
        let qty = per_order.min(remaining);
        let expected = unit_price(item) * i64::from(qty);

        if !buyer.try_debit(expected) {
            debug!(buyer = buyer.id(), %item, "buying pass stopped, funds exhausted");
            break;
        }

        match seller.request(item, qty) {
            Ok(charged) => {
                check_charged_price(buyer.id(), seller.id(), item, qty, expected, charged);
                buyer.receive(item, qty);
                obtained += qty;
            }
            Err(err) => {
                buyer.refund(expected);
                debug!(
                    buyer = buyer.id(),
                    seller = seller.id(),
                    %item,
                    qty,
                    %err,
                    "order refused"
                );
            }
        }
    }
    obtained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::mock::{LedgerBuyer, ScriptedSeller};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn choose_random_seller_handles_empty_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let none: Vec<Arc<dyn Trader>> = Vec::new();
        assert!(choose_random_seller(&mut rng, &none).is_none());
    }

    #[test]
    fn choose_random_seller_picks_from_nonempty_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let sellers: Vec<Arc<dyn Trader>> =
            vec![Arc::new(ScriptedSeller::new(1, ItemKind::Pill, 4))];
        let picked = choose_random_seller(&mut rng, &sellers).unwrap();
        assert_eq!(picked.id(), 1);
    }

    #[test]
    fn pass_stops_when_buyer_funds_run_out() {
        let mut rng = StdRng::seed_from_u64(3);
        let sellers: Vec<Arc<dyn Trader>> =
            vec![Arc::new(ScriptedSeller::new(1, ItemKind::Scalpel, 100))];
        // One scalpel costs 7; the buyer can afford none.
        let buyer = LedgerBuyer::new(9, 5);
        let got = buy_from_sellers(&mut rng, &buyer, &sellers, ItemKind::Scalpel, 3, 1);
        assert_eq!(got, 0);
        assert_eq!(buyer.funds(), 5);
    }

    #[test]
    fn refused_order_is_refunded_in_full() {
        let mut rng = StdRng::seed_from_u64(3);
        let sellers: Vec<Arc<dyn Trader>> =
            vec![Arc::new(ScriptedSeller::new(1, ItemKind::Pill, 0))];
        let buyer = LedgerBuyer::new(9, 50);
        let got = buy_from_sellers(&mut rng, &buyer, &sellers, ItemKind::Pill, 5, 5);
        assert_eq!(got, 0);
        assert_eq!(buyer.funds(), 50);
        assert_eq!(buyer.received(ItemKind::Pill), 0);
    }
}
