//! Ambulances move a finite pool of sick patients into hospitals.
//!
//! An ambulance never restocks: its initial pool of sick patients is all
//! it will ever carry. Each cycle it offers a batch to one randomly
//! chosen hospital; a refusal is logged and retried next cycle, and the
//! run loop ends on its own once the pool is empty.

use std::sync::{Arc, Mutex, OnceLock};

use rand::rngs::StdRng;
use tracing::{error, info, warn};

use crate::model::{unit_price, wage, ItemKind, Role, Stock, StockSnapshot};
use crate::observer::{Notifier, Observer};
use crate::trading::{choose_random_seller, TradeError, Trader};

use super::{ActorId, Pacer, SetupError, StopFlag};

struct AmbulanceState {
    funds: i64,
    sick: u32,
    transfers: u32,
}

pub struct Ambulance {
    id: ActorId,
    /// Patients offered per transfer, clamped to what is left on board.
    batch: u32,
    state: Mutex<AmbulanceState>,
    notifier: Notifier,
    hospitals: OnceLock<Vec<Arc<dyn Trader>>>,
    initial_funds: i64,
    initial_pool: u32,
}

impl Ambulance {
    pub fn new(
        id: ActorId,
        funds: i64,
        pool: u32,
        batch: u32,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let notifier = Notifier::new(id, observer);
        notifier.funds(funds);
        notifier.log("ambulance created");
        Self {
            id,
            batch: batch.max(1),
            state: Mutex::new(AmbulanceState {
                funds,
                sick: pool,
                transfers: 0,
            }),
            notifier,
            hospitals: OnceLock::new(),
            initial_funds: funds,
            initial_pool: pool,
        }
    }

    /// Wires the hospitals this ambulance delivers to. Called once
    /// during setup, before the run loop starts.
    pub fn set_hospitals(&self, hospitals: Vec<Arc<dyn Trader>>) {
        if self.hospitals.set(hospitals).is_err() {
            warn!(ambulance = self.id, "hospitals already wired, ignoring");
        }
    }

    fn hospitals(&self) -> Result<&[Arc<dyn Trader>], SetupError> {
        match self.hospitals.get() {
            Some(hospitals) if !hospitals.is_empty() => Ok(hospitals),
            _ => Err(SetupError::MissingPartners {
                actor: "ambulance",
                id: self.id,
                role: "hospital",
            }),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn funds(&self) -> i64 {
        self.state.lock().unwrap().funds
    }

    pub fn initial_funds(&self) -> i64 {
        self.initial_funds
    }

    pub fn initial_pool(&self) -> u32 {
        self.initial_pool
    }

    pub fn remaining_patients(&self) -> u32 {
        self.state.lock().unwrap().sick
    }

    pub fn snapshot(&self) -> StockSnapshot {
        let state = self.state.lock().unwrap();
        let mut stock = Stock::new();
        stock.insert(ItemKind::Sick, state.sick);
        StockSnapshot(stock)
    }

    pub fn transfers_completed(&self) -> u32 {
        self.state.lock().unwrap().transfers
    }

    pub fn wages_paid(&self) -> i64 {
        i64::from(self.transfers_completed()) * wage(Role::Supplier)
    }

    /// What the next transfer would offer: the batch clamped to the
    /// remaining pool, or `None` when the pool is empty or the transfer
    /// wage is not covered.
    fn plan_transfer(&self) -> TransferPlan {
        let state = self.state.lock().unwrap();
        if state.sick == 0 {
            return TransferPlan::Exhausted;
        }
        if state.funds < wage(Role::Supplier) {
            return TransferPlan::WageNotCovered;
        }
        TransferPlan::Offer(self.batch.min(state.sick))
    }

    /// One delivery attempt against a randomly chosen hospital.
    pub fn send_patients(&self, rng: &mut StdRng) -> Result<u32, SetupError> {
        let hospitals = self.hospitals()?;
        let qty = match self.plan_transfer() {
            TransferPlan::Offer(qty) => qty,
            TransferPlan::Exhausted => {
                self.notifier.log("no patient left to send");
                return Ok(0);
            }
            TransferPlan::WageNotCovered => {
                self.notifier.log("transfer skipped, wage not covered");
                return Ok(0);
            }
        };

        let hospital = match choose_random_seller(rng, hospitals) {
            Some(hospital) => hospital,
            None => return Ok(0),
        };

        let bill = i64::from(qty) * unit_price(ItemKind::Sick);
        match hospital.send(ItemKind::Sick, qty, bill) {
            Ok(accepted) => {
                let (funds, snapshot) = {
                    let mut state = self.state.lock().unwrap();
                    state.sick -= accepted;
                    state.funds += bill - wage(Role::Supplier);
                    state.transfers += 1;
                    let mut stock = Stock::new();
                    stock.insert(ItemKind::Sick, state.sick);
                    (state.funds, StockSnapshot(stock))
                };
                self.notifier.publish(
                    funds,
                    &snapshot,
                    &format!("sent {accepted} patient(s) to hospital {}", hospital.id()),
                );
                Ok(accepted)
            }
            Err(err) => {
                self.notifier
                    .log(&format!("hospital {} refused the transfer: {err}", hospital.id()));
                Ok(0)
            }
        }
    }

    pub async fn run(self: Arc<Self>, stop: StopFlag, pacer: Arc<dyn Pacer>, mut rng: StdRng) {
        if let Err(err) = self.hospitals() {
            error!(ambulance = self.id, %err, "refusing to start");
            self.notifier.log(&err.to_string());
            return;
        }

        info!(ambulance = self.id, "run loop started");
        self.notifier.log("[start] ambulance routine");

        while !stop.is_stopped() && self.remaining_patients() > 0 {
            let _ = self.send_patients(&mut rng);

            // Models the drive; no lock held.
            pacer.pause().await;
        }

        if self.remaining_patients() == 0 {
            self.notifier.log("patient pool exhausted");
        }
        self.notifier.log("[stop] ambulance routine");
        info!(ambulance = self.id, "run loop finished");
    }
}

enum TransferPlan {
    Offer(u32),
    Exhausted,
    WageNotCovered,
}

impl Trader for Ambulance {
    fn id(&self) -> ActorId {
        self.id
    }

    // Nobody trades against an ambulance; it only pushes patients out.

    fn request(&self, item: ItemKind, _qty: u32) -> Result<i64, TradeError> {
        Err(TradeError::UnsupportedItem { item })
    }

    fn send(&self, item: ItemKind, _qty: u32, _bill: i64) -> Result<u32, TradeError> {
        Err(TradeError::UnsupportedItem { item })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::Hospital;
    use crate::observer::NullObserver;
    use rand::SeedableRng;

    fn wired(pool: u32, batch: u32, funds: i64) -> (Ambulance, Arc<Hospital>) {
        let hospital = Arc::new(Hospital::new(1, 10_000, 10, 3, Arc::new(NullObserver)));
        let ambulance = Ambulance::new(2, funds, pool, batch, Arc::new(NullObserver));
        ambulance.set_hospitals(vec![hospital.clone()]);
        (ambulance, hospital)
    }

    #[test]
    fn transfer_moves_the_batch_and_nets_bill_minus_wage() {
        let (ambulance, hospital) = wired(5, 2, 100);
        let mut rng = StdRng::seed_from_u64(5);

        let sent = ambulance.send_patients(&mut rng).unwrap();
        assert_eq!(sent, 2);
        assert_eq!(ambulance.remaining_patients(), 3);
        assert_eq!(hospital.snapshot().qty(ItemKind::Sick), 2);

        let bill = 2 * unit_price(ItemKind::Sick);
        assert_eq!(ambulance.funds(), 100 + bill - wage(Role::Supplier));
        assert_eq!(ambulance.transfers_completed(), 1);
    }

    #[test]
    fn last_batch_is_clamped_to_the_remaining_pool() {
        let (ambulance, _hospital) = wired(1, 4, 100);
        let mut rng = StdRng::seed_from_u64(5);

        let sent = ambulance.send_patients(&mut rng).unwrap();
        assert_eq!(sent, 1);
        assert_eq!(ambulance.remaining_patients(), 0);
    }

    #[test]
    fn empty_pool_sends_nothing() {
        let (ambulance, hospital) = wired(0, 2, 100);
        let mut rng = StdRng::seed_from_u64(5);

        assert_eq!(ambulance.send_patients(&mut rng).unwrap(), 0);
        assert_eq!(hospital.snapshot().qty(ItemKind::Sick), 0);
        assert_eq!(ambulance.funds(), 100);
    }

    #[test]
    fn unpaid_wage_skips_the_cycle_without_debit() {
        let (ambulance, hospital) = wired(5, 2, wage(Role::Supplier) - 1);
        let mut rng = StdRng::seed_from_u64(5);

        assert_eq!(ambulance.send_patients(&mut rng).unwrap(), 0);
        assert_eq!(ambulance.remaining_patients(), 5);
        assert_eq!(ambulance.funds(), wage(Role::Supplier) - 1);
        assert_eq!(hospital.snapshot().qty(ItemKind::Sick), 0);
    }

    #[test]
    fn refused_delivery_keeps_the_pool_intact() {
        // Hospital with a single bed: the two-patient batch is refused.
        let hospital = Arc::new(Hospital::new(1, 10_000, 1, 3, Arc::new(NullObserver)));
        let ambulance = Ambulance::new(2, 100, 5, 2, Arc::new(NullObserver));
        ambulance.set_hospitals(vec![hospital.clone()]);
        let mut rng = StdRng::seed_from_u64(5);

        assert_eq!(ambulance.send_patients(&mut rng).unwrap(), 0);
        assert_eq!(ambulance.remaining_patients(), 5);
        assert_eq!(ambulance.funds(), 100);
    }
}
