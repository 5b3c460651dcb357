//! Suppliers produce raw materials and sell them on demand.
//!
//! Each cycle a supplier picks the scarcest item of its supplied set,
//! pays the supplier wage if its funds allow, and after the production
//! pause adds one unit to stock. It never initiates purchases; sales
//! happen entirely inside [`Trader::request`].

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::model::{unit_price, wage, ItemKind, Role, Stock, StockSnapshot};
use crate::observer::{Notifier, Observer};
use crate::trading::{TradeError, Trader};

use super::{ActorId, Pacer, StopFlag};

struct SupplierState {
    funds: i64,
    stock: Stock,
    produced: u32,
}

pub struct Supplier {
    id: ActorId,
    supplied: Vec<ItemKind>,
    state: Mutex<SupplierState>,
    notifier: Notifier,
    initial_funds: i64,
}

impl Supplier {
    pub fn new(
        id: ActorId,
        funds: i64,
        supplied: Vec<ItemKind>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let stock = supplied.iter().map(|&item| (item, 0)).collect();
        let notifier = Notifier::new(id, observer);
        notifier.funds(funds);
        notifier.log("supplier created");
        Self {
            id,
            supplied,
            state: Mutex::new(SupplierState {
                funds,
                stock,
                produced: 0,
            }),
            notifier,
            initial_funds: funds,
        }
    }

    /// A supplier of surgical and diagnostic tools.
    pub fn medical_devices(id: ActorId, funds: i64, observer: Arc<dyn Observer>) -> Self {
        Self::new(
            id,
            funds,
            vec![ItemKind::Scalpel, ItemKind::Thermometer, ItemKind::Stethoscope],
            observer,
        )
    }

    /// A supplier of consumables.
    pub fn pharmacy(id: ActorId, funds: i64, observer: Arc<dyn Observer>) -> Self {
        Self::new(id, funds, vec![ItemKind::Syringe, ItemKind::Pill], observer)
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn supplied(&self) -> &[ItemKind] {
        &self.supplied
    }

    pub fn funds(&self) -> i64 {
        self.state.lock().unwrap().funds
    }

    pub fn initial_funds(&self) -> i64 {
        self.initial_funds
    }

    pub fn snapshot(&self) -> StockSnapshot {
        StockSnapshot::of(&self.state.lock().unwrap().stock)
    }

    pub fn items_produced(&self) -> u32 {
        self.state.lock().unwrap().produced
    }

    /// Total wages this supplier has paid out to its workers.
    pub fn wages_paid(&self) -> i64 {
        i64::from(self.items_produced()) * wage(Role::Supplier)
    }

    /// Cost of one unit of everything in the supplied set.
    pub fn material_cost(&self) -> i64 {
        self.supplied.iter().map(|&item| unit_price(item)).sum()
    }

    /// Picks the scarcest supplied item and pays the wage for producing
    /// it, all under one lock acquisition. Returns `None`, debiting
    /// nothing, when funds do not cover the wage.
    fn start_production(&self) -> Option<ItemKind> {
        let cost = wage(Role::Supplier);
        let mut state = self.state.lock().unwrap();
        if state.funds < cost {
            return None;
        }
        // Scarcest first; ties go to the earliest declared item.
        let item = *self
            .supplied
            .iter()
            .min_by_key(|item| state.stock.get(*item).copied().unwrap_or(0))?;
        state.funds -= cost;
        Some(item)
    }

    /// Books the finished unit into stock and publishes the result.
    fn finish_production(&self, item: ItemKind) {
        let (funds, snapshot) = {
            let mut state = self.state.lock().unwrap();
            *state.stock.entry(item).or_insert(0) += 1;
            state.produced += 1;
            (state.funds, StockSnapshot::of(&state.stock))
        };
        self.notifier.publish(funds, &snapshot, &format!("supplied 1 {item}"));
    }

    pub async fn run(self: Arc<Self>, stop: StopFlag, pacer: Arc<dyn Pacer>) {
        info!(supplier = self.id, "run loop started");
        self.notifier.log("[start] supplier routine");

        while !stop.is_stopped() {
            let in_production = self.start_production();

            // Models the time the worker spends producing; no lock held.
            pacer.pause().await;

            match in_production {
                Some(item) => self.finish_production(item),
                None => self.notifier.log("production skipped, wage not covered"),
            }
        }

        self.notifier.log("[stop] supplier routine");
        info!(supplier = self.id, "run loop finished");
    }
}

impl Trader for Supplier {
    fn id(&self) -> ActorId {
        self.id
    }

    fn request(&self, item: ItemKind, qty: u32) -> Result<i64, TradeError> {
        if !self.supplied.contains(&item) {
            self.notifier.log(&format!("refused request for {qty} {item}"));
            return Err(TradeError::UnsupportedItem { item });
        }

        let sale = {
            let mut state = self.state.lock().unwrap();
            let held = state.stock.get(&item).copied().unwrap_or(0);
            if held < qty {
                None
            } else {
                let cost = unit_price(item) * i64::from(qty);
                state.stock.insert(item, held - qty);
                state.funds += cost;
                Some((cost, state.funds, StockSnapshot::of(&state.stock)))
            }
        };

        match sale {
            Some((cost, funds, snapshot)) => {
                self.notifier.publish(funds, &snapshot, &format!("sold {qty} {item}"));
                Ok(cost)
            }
            None => {
                self.notifier.log(&format!("refused request for {qty} {item}"));
                Err(TradeError::InsufficientStock { item, qty })
            }
        }
    }

    fn send(&self, item: ItemKind, _qty: u32, _bill: i64) -> Result<u32, TradeError> {
        // Suppliers never buy anything.
        Err(TradeError::UnsupportedItem { item })
    }
}
