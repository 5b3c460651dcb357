//! Clinics turn sick patients plus materials into healed patients.
//!
//! A clinic alternates between two states: when every needed resource is
//! in stock and the treatment wage is covered it treats a patient,
//! otherwise it restocks, buying sick patients from hospitals and
//! consumables from suppliers. Healed patients are its only product and
//! are sold back to hospitals through [`Trader::request`].

use std::sync::{Arc, Mutex, OnceLock};

use rand::rngs::StdRng;
use tracing::{error, info, warn};

use crate::model::{
    unit_price, wage, ItemKind, Role, Stock, StockSnapshot, MAX_ITEMS_PER_ORDER,
};
use crate::observer::{Notifier, Observer};
use crate::trading::{buy_from_sellers, Buyer, TradeError, Trader};

use super::{ActorId, Pacer, SetupError, StopFlag};

struct ClinicState {
    funds: i64,
    stock: Stock,
    treated: u32,
}

/// Sellers a clinic buys from, wired once before the run loop starts.
struct ClinicPartners {
    hospitals: Vec<Arc<dyn Trader>>,
    suppliers: Vec<Arc<dyn Trader>>,
}

pub struct Clinic {
    id: ActorId,
    /// Everything one treatment consumes, the sick patient included.
    needed: Vec<ItemKind>,
    state: Mutex<ClinicState>,
    notifier: Notifier,
    partners: OnceLock<ClinicPartners>,
    initial_funds: i64,
}

impl Clinic {
    pub fn new(
        id: ActorId,
        funds: i64,
        needed: Vec<ItemKind>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        let mut stock: Stock = needed.iter().map(|&item| (item, 0)).collect();
        stock.insert(ItemKind::Healed, 0);
        let notifier = Notifier::new(id, observer);
        notifier.funds(funds);
        notifier.log("clinic created");
        Self {
            id,
            needed,
            state: Mutex::new(ClinicState {
                funds,
                stock,
                treated: 0,
            }),
            notifier,
            partners: OnceLock::new(),
            initial_funds: funds,
        }
    }

    pub fn pulmonology(id: ActorId, funds: i64, observer: Arc<dyn Observer>) -> Self {
        Self::new(
            id,
            funds,
            vec![ItemKind::Sick, ItemKind::Pill, ItemKind::Thermometer],
            observer,
        )
    }

    pub fn cardiology(id: ActorId, funds: i64, observer: Arc<dyn Observer>) -> Self {
        Self::new(
            id,
            funds,
            vec![ItemKind::Sick, ItemKind::Syringe, ItemKind::Stethoscope],
            observer,
        )
    }

    pub fn neurology(id: ActorId, funds: i64, observer: Arc<dyn Observer>) -> Self {
        Self::new(
            id,
            funds,
            vec![ItemKind::Sick, ItemKind::Pill, ItemKind::Scalpel],
            observer,
        )
    }

    /// Wires the immutable partner sets. Called once during setup,
    /// before the run loop starts.
    pub fn set_partners(
        &self,
        hospitals: Vec<Arc<dyn Trader>>,
        suppliers: Vec<Arc<dyn Trader>>,
    ) {
        let wired = self
            .partners
            .set(ClinicPartners { hospitals, suppliers })
            .is_ok();
        if !wired {
            warn!(clinic = self.id, "partners already wired, ignoring");
        }
    }

    fn partners(&self) -> Result<&ClinicPartners, SetupError> {
        let partners = self.partners.get().ok_or(SetupError::MissingPartners {
            actor: "clinic",
            id: self.id,
            role: "hospital and supplier",
        })?;
        if partners.hospitals.is_empty() {
            return Err(SetupError::MissingPartners {
                actor: "clinic",
                id: self.id,
                role: "hospital",
            });
        }
        if partners.suppliers.is_empty() {
            return Err(SetupError::MissingPartners {
                actor: "clinic",
                id: self.id,
                role: "supplier",
            });
        }
        Ok(partners)
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

    pub fn snapshot(&self) -> StockSnapshot {
        StockSnapshot::of(&self.state.lock().unwrap().stock)
    }

    pub fn patients_treated(&self) -> u32 {
        self.state.lock().unwrap().treated
    }

    pub fn wages_paid(&self) -> i64 {
        i64::from(self.patients_treated()) * Self::treatment_wage()
    }

    /// Sick and healed patients currently inside the clinic.
    pub fn resident_patients(&self) -> u32 {
        let state = self.state.lock().unwrap();
        state.stock.get(&ItemKind::Sick).copied().unwrap_or(0)
            + state.stock.get(&ItemKind::Healed).copied().unwrap_or(0)
    }

    fn treatment_wage() -> i64 {
        wage(Role::Doctor)
    }

    /// True iff every needed resource is in stock and funds cover the
    /// treatment wage. One lock acquisition, no mutation.
    pub fn verify_resources(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.funds >= Self::treatment_wage()
            && self
                .needed
                .iter()
                .all(|item| state.stock.get(item).copied().unwrap_or(0) > 0)
    }

    /// One treatment: consume one unit of every needed resource, debit
    /// the wage, produce one healed patient. Check and commit happen
    /// under a single lock acquisition; returns false, changing nothing,
    /// if a resource disappeared since the caller last looked.
    pub fn treat_patient(&self) -> bool {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            let cost = Self::treatment_wage();
            let ready = state.funds >= cost
                && self
                    .needed
                    .iter()
                    .all(|item| state.stock.get(item).copied().unwrap_or(0) > 0);
            if !ready {
                return false;
            }
            for &item in &self.needed {
                let held = state.stock.get(&item).copied().unwrap_or(0);
                state.stock.insert(item, held - 1);
            }
            *state.stock.entry(ItemKind::Healed).or_insert(0) += 1;
            state.funds -= cost;
            state.treated += 1;
            (state.funds, StockSnapshot::of(&state.stock))
        };
        let (funds, snapshot) = outcome;
        self.notifier.publish(funds, &snapshot, "treated a patient");
        true
    }

    /// Restocks every needed material that ran out. A failed buying pass
    /// is reported and the loop continues with the next material.
    pub fn order_resources(&self, rng: &mut StdRng) -> Result<(), SetupError> {
        let partners = self.partners()?;
        for &item in &self.needed {
            let missing = {
                let state = self.state.lock().unwrap();
                state.stock.get(&item).copied().unwrap_or(0) == 0
            };
            if !missing {
                continue;
            }

            // Sick patients come from hospitals one at a time;
            // consumables from suppliers in one full order.
            let (sellers, per_order) = if item == ItemKind::Sick {
                (&partners.hospitals, 1)
            } else {
                (&partners.suppliers, MAX_ITEMS_PER_ORDER)
            };

            let got = buy_from_sellers(rng, self, sellers, item, MAX_ITEMS_PER_ORDER, per_order);
            if got > 0 {
                let (funds, snapshot) = {
                    let state = self.state.lock().unwrap();
                    (state.funds, StockSnapshot::of(&state.stock))
                };
                self.notifier
                    .publish(funds, &snapshot, &format!("bought {got} {item}"));
            } else {
                self.notifier
                    .log(&format!("no {item} available this pass"));
            }
        }
        Ok(())
    }

    pub async fn run(self: Arc<Self>, stop: StopFlag, pacer: Arc<dyn Pacer>, mut rng: StdRng) {
        if let Err(err) = self.partners() {
            error!(clinic = self.id, %err, "refusing to start");
            self.notifier.log(&err.to_string());
            return;
        }

        info!(clinic = self.id, "run loop started");
        self.notifier.log("[start] clinic routine");

        while !stop.is_stopped() {
            if self.verify_resources() {
                self.treat_patient();
            } else if self.order_resources(&mut rng).is_err() {
                break;
            }

            // Models the treatment/restocking time; no lock held.
            pacer.pause().await;
        }

        self.notifier.log("[stop] clinic routine");
        info!(clinic = self.id, "run loop finished");
    }
}

impl Trader for Clinic {
    fn id(&self) -> ActorId {
        self.id
    }

    /// Clinics sell healed patients and nothing else.
    fn request(&self, item: ItemKind, qty: u32) -> Result<i64, TradeError> {
        if item != ItemKind::Healed {
            self.notifier.log(&format!("refused request for {qty} {item}"));
            return Err(TradeError::UnsupportedItem { item });
        }

        let sale = {
            let mut state = self.state.lock().unwrap();
            let held = state.stock.get(&ItemKind::Healed).copied().unwrap_or(0);
            if held < qty {
                None
            } else {
                let benefit = unit_price(ItemKind::Healed) * i64::from(qty);
                state.stock.insert(ItemKind::Healed, held - qty);
                state.funds += benefit;
                Some((benefit, state.funds, StockSnapshot::of(&state.stock)))
            }
        };

        match sale {
            Some((benefit, funds, snapshot)) => {
                self.notifier
                    .publish(funds, &snapshot, &format!("provided {qty} {item}"));
                Ok(benefit)
            }
            None => {
                self.notifier.log(&format!("refused request for {qty} {item}"));
                Err(TradeError::InsufficientStock { item, qty })
            }
        }
    }

    fn send(&self, item: ItemKind, _qty: u32, _bill: i64) -> Result<u32, TradeError> {
        // Clinics pull their inputs themselves; nothing is pushed to them.
        Err(TradeError::UnsupportedItem { item })
    }
}

impl Buyer for Clinic {
    fn id(&self) -> ActorId {
        self.id
    }

    fn try_debit(&self, cost: i64) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.funds < cost {
            return false;
        }
        state.funds -= cost;
        true
    }

    fn refund(&self, amount: i64) {
        self.state.lock().unwrap().funds += amount;
    }

    fn receive(&self, item: ItemKind, qty: u32) {
        let mut state = self.state.lock().unwrap();
        *state.stock.entry(item).or_insert(0) += qty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;

    fn stocked_clinic(funds: i64) -> Clinic {
        let clinic = Clinic::pulmonology(2, funds, Arc::new(NullObserver));
        clinic.receive(ItemKind::Sick, 1);
        clinic.receive(ItemKind::Pill, 1);
        clinic.receive(ItemKind::Thermometer, 1);
        clinic
    }

    #[test]
    fn treatment_consumes_inputs_and_produces_one_healed() {
        let clinic = stocked_clinic(100);
        assert!(clinic.verify_resources());
        assert!(clinic.treat_patient());

        assert_eq!(clinic.funds(), 90);
        let snap = clinic.snapshot();
        assert_eq!(snap.qty(ItemKind::Sick), 0);
        assert_eq!(snap.qty(ItemKind::Healed), 1);
        assert_eq!(snap.qty(ItemKind::Pill), 0);
        assert_eq!(snap.qty(ItemKind::Thermometer), 0);
        assert_eq!(clinic.patients_treated(), 1);
    }

    #[test]
    fn verify_resources_fails_on_any_missing_input() {
        let clinic = Clinic::pulmonology(2, 100, Arc::new(NullObserver));
        clinic.receive(ItemKind::Pill, 1);
        clinic.receive(ItemKind::Thermometer, 1);
        // No sick patient yet.
        assert!(!clinic.verify_resources());
    }

    #[test]
    fn verify_resources_fails_when_the_wage_is_not_covered() {
        let clinic = stocked_clinic(Clinic::treatment_wage() - 1);
        assert!(!clinic.verify_resources());
        assert!(!clinic.treat_patient());
        assert_eq!(clinic.funds(), Clinic::treatment_wage() - 1);
    }

    #[test]
    fn only_healed_patients_are_for_sale() {
        let clinic = stocked_clinic(100);
        let before = clinic.snapshot();

        let err = clinic.request(ItemKind::Sick, 1).unwrap_err();
        assert_eq!(err, TradeError::UnsupportedItem { item: ItemKind::Sick });
        assert_eq!(clinic.snapshot(), before);
        assert_eq!(clinic.funds(), 100);
    }

    #[test]
    fn healed_sale_credits_the_unit_price() {
        let clinic = stocked_clinic(100);
        assert!(clinic.treat_patient());
        let funds = clinic.funds();

        let benefit = clinic.request(ItemKind::Healed, 1).unwrap();
        assert_eq!(benefit, unit_price(ItemKind::Healed));
        assert_eq!(clinic.funds(), funds + benefit);
        assert_eq!(clinic.snapshot().qty(ItemKind::Healed), 0);
    }

    #[test]
    fn unwired_clinic_reports_missing_partners() {
        let clinic = Clinic::cardiology(2, 100, Arc::new(NullObserver));
        assert!(matches!(
            clinic.partners(),
            Err(SetupError::MissingPartners { actor: "clinic", .. })
        ));
    }
}
