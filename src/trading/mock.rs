//! Scripted trade doubles for tests.
//!
//! [`ScriptedSeller`] is a one-item [`Trader`] with a fixed starting
//! stock and a call counter, so tests can assert exactly how often a
//! buying pass knocked on each door. [`LedgerBuyer`] is a bare [`Buyer`]
//! that just tracks funds and deliveries. Both live outside `#[cfg(test)]`
//! so integration tests in `tests/` can use them too.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::actors::ActorId;
use crate::model::{unit_price, ItemKind, Stock};

use super::market::Buyer;
use super::protocol::{TradeError, Trader};

/// A seller of a single item kind with a fixed starting stock.
pub struct ScriptedSeller {
    id: ActorId,
    item: ItemKind,
    stock: Mutex<u32>,
    surcharge: i64,
    request_calls: AtomicU32,
}

impl ScriptedSeller {
    pub fn new(id: ActorId, item: ItemKind, stock: u32) -> Self {
        Self {
            id,
            item,
            stock: Mutex::new(stock),
            surcharge: 0,
            request_calls: AtomicU32::new(0),
        }
    }

    /// A seller that overbills every order by `surcharge`, for exercising
    /// the price-mismatch consistency check.
    pub fn with_surcharge(id: ActorId, item: ItemKind, stock: u32, surcharge: i64) -> Self {
        Self {
            surcharge,
            ..Self::new(id, item, stock)
        }
    }

    /// How many `request` calls this seller has seen.
    pub fn request_calls(&self) -> u32 {
        self.request_calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> u32 {
        *self.stock.lock().unwrap()
    }
}

impl Trader for ScriptedSeller {
    fn id(&self) -> ActorId {
        self.id
    }

    fn request(&self, item: ItemKind, qty: u32) -> Result<i64, TradeError> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        if item != self.item {
            return Err(TradeError::UnsupportedItem { item });
        }
        let mut stock = self.stock.lock().unwrap();
        if *stock < qty {
            return Err(TradeError::InsufficientStock { item, qty });
        }
        *stock -= qty;
        Ok(unit_price(item) * i64::from(qty) + self.surcharge)
    }

    fn send(&self, item: ItemKind, _qty: u32, _bill: i64) -> Result<u32, TradeError> {
        Err(TradeError::UnsupportedItem { item })
    }
}

/// A buyer that is nothing but a funds balance and a delivery ledger.
pub struct LedgerBuyer {
    id: ActorId,
    funds: Mutex<i64>,
    deliveries: Mutex<Stock>,
}

impl LedgerBuyer {
    pub fn new(id: ActorId, funds: i64) -> Self {
        Self {
            id,
            funds: Mutex::new(funds),
            deliveries: Mutex::new(Stock::new()),
        }
    }

    pub fn funds(&self) -> i64 {
        *self.funds.lock().unwrap()
    }

    pub fn received(&self, item: ItemKind) -> u32 {
        self.deliveries.lock().unwrap().get(&item).copied().unwrap_or(0)
    }
}

impl Buyer for LedgerBuyer {
    fn id(&self) -> ActorId {
        self.id
    }

    fn try_debit(&self, cost: i64) -> bool {
        let mut funds = self.funds.lock().unwrap();
        if *funds < cost {
            return false;
        }
        *funds -= cost;
        true
    }

    fn refund(&self, amount: i64) {
        *self.funds.lock().unwrap() += amount;
    }

    fn receive(&self, item: ItemKind, qty: u32) {
        *self.deliveries.lock().unwrap().entry(item).or_insert(0) += qty;
    }
}
