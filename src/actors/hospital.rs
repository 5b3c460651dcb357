//! Hospitals admit, rest and discharge patients.
//!
//! A hospital is the only actor with capacity: every resident patient,
//! sick or healed, occupies one bed. Sick patients arrive pushed by
//! ambulances and leave pulled by clinics; healed patients are bought
//! back from clinics and spend a fixed number of cycles in the rest
//! queue before discharge earns the hospital its benefit.
//!
//! The rest queue is a fixed-length delay line: slot `i` holds the count
//! of healed patients with `i` cycles of rest remaining. Its total always
//! equals the number of resident healed patients.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock};

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::model::{unit_price, wage, ItemKind, Role, Stock, StockSnapshot, DISCHARGE_BENEFIT};
use crate::observer::{Notifier, Observer};
use crate::trading::{check_charged_price, TradeError, Trader};

use super::{ActorId, Pacer, SetupError, StopFlag};

struct HospitalState {
    funds: i64,
    sick: u32,
    healed: u32,
    current_beds: u32,
    /// `rest[i]` = healed patients with `i` cycles of rest remaining.
    rest: VecDeque<u32>,
    admitted: u32,
    discharged: u32,
}

pub struct Hospital {
    id: ActorId,
    max_beds: u32,
    rest_period: usize,
    state: Mutex<HospitalState>,
    notifier: Notifier,
    clinics: OnceLock<Vec<Arc<dyn Trader>>>,
    initial_funds: i64,
}

impl Hospital {
    pub fn new(
        id: ActorId,
        funds: i64,
        max_beds: u32,
        rest_period: usize,
        observer: Arc<dyn Observer>,
    ) -> Self {
        assert!(rest_period >= 1, "rest period must be at least one cycle");
        let notifier = Notifier::new(id, observer);
        notifier.funds(funds);
        notifier.log(&format!("hospital created with {max_beds} beds"));
        Self {
            id,
            max_beds,
            rest_period,
            state: Mutex::new(HospitalState {
                funds,
                sick: 0,
                healed: 0,
                current_beds: 0,
                rest: VecDeque::from(vec![0; rest_period]),
                admitted: 0,
                discharged: 0,
            }),
            notifier,
            clinics: OnceLock::new(),
            initial_funds: funds,
        }
    }

    /// Wires the clinics this hospital buys healed patients from. Called
    /// once during setup, before the run loop starts.
    pub fn set_clinics(&self, clinics: Vec<Arc<dyn Trader>>) {
        if self.clinics.set(clinics).is_err() {
            warn!(hospital = self.id, "clinics already wired, ignoring");
        }
    }

    fn clinics(&self) -> Result<&[Arc<dyn Trader>], SetupError> {
        match self.clinics.get() {
            Some(clinics) if !clinics.is_empty() => Ok(clinics),
            _ => Err(SetupError::MissingPartners {
                actor: "hospital",
                id: self.id,
                role: "clinic",
            }),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn max_beds(&self) -> u32 {
        self.max_beds
    }

    pub fn funds(&self) -> i64 {
        self.state.lock().unwrap().funds
    }

    pub fn initial_funds(&self) -> i64 {
        self.initial_funds
    }

    pub fn current_beds(&self) -> u32 {
        self.state.lock().unwrap().current_beds
    }

    pub fn snapshot(&self) -> StockSnapshot {
        let state = self.state.lock().unwrap();
        let mut stock = Stock::new();
        stock.insert(ItemKind::Sick, state.sick);
        stock.insert(ItemKind::Healed, state.healed);
        StockSnapshot(stock)
    }

    /// Sum of the rest-queue slots. Always equals the resident healed
    /// count.
    pub fn rest_queue_total(&self) -> u32 {
        self.state.lock().unwrap().rest.iter().sum()
    }

    pub fn resident_healed(&self) -> u32 {
        self.state.lock().unwrap().healed
    }

    pub fn patients_admitted(&self) -> u32 {
        self.state.lock().unwrap().admitted
    }

    pub fn patients_discharged(&self) -> u32 {
        self.state.lock().unwrap().discharged
    }

    pub fn wages_paid(&self) -> i64 {
        i64::from(self.patients_admitted()) * wage(Role::Nurse)
    }

    /// Revenue earned from discharging rested patients.
    pub fn funding_from_healed(&self) -> i64 {
        i64::from(self.patients_discharged()) * DISCHARGE_BENEFIT
    }

    /// One buying pass against the clinics: pull healed patients one at
    /// a time while a free bed and the transfer cost remain available.
    ///
    /// The bed and the cost are reserved under the hospital's own lock
    /// *before* each outward call, and rolled back if the clinic
    /// refuses, so the admission never overshoots capacity or funds even
    /// while ambulances are pushing patients in concurrently. The pass
    /// is capped at the free beds observed at its start and ends without
    /// busy-retrying once every clinic has refused.
    pub fn transfer_patients_from_clinic(&self, rng: &mut StdRng) -> Result<u32, SetupError> {
        let clinics = self.clinics()?;
        let price = unit_price(ItemKind::Healed);
        let cost = price + wage(Role::Nurse);

        let cap = {
            let state = self.state.lock().unwrap();
            self.max_beds - state.current_beds
        };

        let mut candidates: Vec<usize> = (0..clinics.len()).collect();
        let mut transferred = 0u32;

        while transferred < cap && !candidates.is_empty() {
            // Reserve one bed and prepay the transfer before calling out.
            let reserved = {
                let mut state = self.state.lock().unwrap();
                if state.current_beds < self.max_beds && state.funds >= cost {
                    state.current_beds += 1;
                    state.funds -= cost;
                    true
                } else {
                    false
                }
            };
            if !reserved {
                break;
            }

            let pick = rng.random_range(0..candidates.len());
            let clinic = &clinics[candidates[pick]];

            match clinic.request(ItemKind::Healed, 1) {
                Ok(charged) => {
                    check_charged_price(self.id, clinic.id(), ItemKind::Healed, 1, price, charged);
                    let rest_slot = self.rest_period - 1;
                    let mut state = self.state.lock().unwrap();
                    state.healed += 1;
                    state.rest[rest_slot] += 1;
                    state.admitted += 1;
                    transferred += 1;
                }
                Err(err) => {
                    // Roll back the reservation; this clinic is done for
                    // the pass.
                    let mut state = self.state.lock().unwrap();
                    state.current_beds -= 1;
                    state.funds += cost;
                    drop(state);
                    debug!(hospital = self.id, clinic = clinic.id(), %err, "transfer refused");
                    candidates.swap_remove(pick);
                }
            }
        }

        if transferred > 0 {
            let (funds, snapshot) = self.funds_and_snapshot();
            self.notifier.publish(
                funds,
                &snapshot,
                &format!("transferred {transferred} healed patient(s) from the clinics"),
            );
        } else {
            self.notifier.log("no healed patients available at the clinics");
        }
        Ok(transferred)
    }

    /// Discharges everyone whose rest has fully elapsed: slot 0 leaves,
    /// every other slot shifts one cycle closer, and a fresh empty slot
    /// is appended at the back. One critical section per cycle.
    pub fn free_healed_patient(&self) -> u32 {
        let (released, funds, snapshot) = {
            let mut state = self.state.lock().unwrap();
            let released = state.rest.pop_front().unwrap_or(0);
            state.rest.push_back(0);
            state.healed -= released;
            state.current_beds -= released;
            state.funds += i64::from(released) * DISCHARGE_BENEFIT;
            state.discharged += released;
            let mut stock = Stock::new();
            stock.insert(ItemKind::Sick, state.sick);
            stock.insert(ItemKind::Healed, state.healed);
            (released, state.funds, StockSnapshot(stock))
        };
        if released > 0 {
            self.notifier.publish(
                funds,
                &snapshot,
                &format!("discharged {released} rested patient(s)"),
            );
        }
        released
    }

    fn funds_and_snapshot(&self) -> (i64, StockSnapshot) {
        let state = self.state.lock().unwrap();
        let mut stock = Stock::new();
        stock.insert(ItemKind::Sick, state.sick);
        stock.insert(ItemKind::Healed, state.healed);
        (state.funds, StockSnapshot(stock))
    }

    pub async fn run(self: Arc<Self>, stop: StopFlag, pacer: Arc<dyn Pacer>, mut rng: StdRng) {
        if let Err(err) = self.clinics() {
            error!(hospital = self.id, %err, "refusing to start");
            self.notifier.log(&err.to_string());
            return;
        }

        info!(hospital = self.id, "run loop started");
        self.notifier.log("[start] hospital routine");

        while !stop.is_stopped() {
            let _ = self.transfer_patients_from_clinic(&mut rng);

            if stop.is_stopped() {
                break;
            }
            self.free_healed_patient();

            let (funds, snapshot) = self.funds_and_snapshot();
            self.notifier.funds(funds);
            self.notifier.snapshot(&snapshot);

            // Models a day on the ward; no lock held.
            pacer.pause().await;
        }

        self.notifier.log("[stop] hospital routine");
        info!(hospital = self.id, "run loop finished");
    }
}

impl Trader for Hospital {
    fn id(&self) -> ActorId {
        self.id
    }

    /// Clinics pull resident sick patients out of the hospital.
    fn request(&self, item: ItemKind, qty: u32) -> Result<i64, TradeError> {
        if item != ItemKind::Sick {
            self.notifier.log(&format!("refused request for {qty} {item}"));
            return Err(TradeError::UnsupportedItem { item });
        }

        let sale = {
            let mut state = self.state.lock().unwrap();
            if state.sick < qty {
                None
            } else {
                let benefit = unit_price(ItemKind::Sick) * i64::from(qty);
                state.sick -= qty;
                state.current_beds -= qty;
                state.funds += benefit;
                Some(benefit)
            }
        };

        match sale {
            Some(benefit) => {
                let (funds, snapshot) = self.funds_and_snapshot();
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

    /// Ambulances push sick patients in. Admission needs a free bed per
    /// patient and funds covering the bill plus the per-patient nurse
    /// wage; anything less is refused with no state change.
    fn send(&self, item: ItemKind, qty: u32, bill: i64) -> Result<u32, TradeError> {
        if item != ItemKind::Sick {
            self.notifier.log(&format!("refused delivery of {qty} {item}"));
            return Err(TradeError::UnsupportedItem { item });
        }

        let total = i64::from(qty) * wage(Role::Nurse) + bill;
        let admission = {
            let mut state = self.state.lock().unwrap();
            if self.max_beds - state.current_beds < qty {
                Err(TradeError::NoBedCapacity { qty })
            } else if state.funds < total {
                Err(TradeError::InsufficientFunds {
                    needed: total,
                    available: state.funds,
                })
            } else {
                state.sick += qty;
                state.current_beds += qty;
                state.funds -= total;
                state.admitted += qty;
                Ok(())
            }
        };

        match admission {
            Ok(()) => {
                let (funds, snapshot) = self.funds_and_snapshot();
                self.notifier
                    .publish(funds, &snapshot, &format!("admitted {qty} {item}(s)"));
                Ok(qty)
            }
            Err(err) => {
                self.notifier.log(&format!("refused delivery of {qty} {item}: {err}"));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use crate::trading::mock::ScriptedSeller;
    use rand::SeedableRng;

    fn hospital(funds: i64, max_beds: u32, rest: usize) -> Hospital {
        Hospital::new(3, funds, max_beds, rest, Arc::new(NullObserver))
    }

    #[test]
    fn admission_fills_beds_and_debits_wage_plus_bill() {
        let h = hospital(1000, 5, 3);
        let accepted = h.send(ItemKind::Sick, 2, 50).unwrap();
        assert_eq!(accepted, 2);
        assert_eq!(h.current_beds(), 2);
        assert_eq!(h.snapshot().qty(ItemKind::Sick), 2);
        assert_eq!(h.funds(), 1000 - 50 - 2 * wage(Role::Nurse));
        assert_eq!(h.patients_admitted(), 2);
    }

    #[test]
    fn full_hospital_refuses_admission_unchanged() {
        let h = hospital(1000, 5, 3);
        assert_eq!(h.send(ItemKind::Sick, 5, 0).unwrap(), 5);
        let funds = h.funds();

        let err = h.send(ItemKind::Sick, 1, 10).unwrap_err();
        assert_eq!(err, TradeError::NoBedCapacity { qty: 1 });
        assert_eq!(h.current_beds(), 5);
        assert_eq!(h.snapshot().qty(ItemKind::Sick), 5);
        assert_eq!(h.funds(), funds);
    }

    #[test]
    fn broke_hospital_refuses_admission() {
        let h = hospital(wage(Role::Nurse) - 1, 5, 3);
        let err = h.send(ItemKind::Sick, 1, 0).unwrap_err();
        assert!(matches!(err, TradeError::InsufficientFunds { .. }));
        assert_eq!(h.current_beds(), 0);
    }

    #[test]
    fn selling_sick_patients_frees_their_beds() {
        let h = hospital(1000, 5, 3);
        h.send(ItemKind::Sick, 3, 0).unwrap();
        let funds = h.funds();

        let benefit = h.request(ItemKind::Sick, 2).unwrap();
        assert_eq!(benefit, 2 * unit_price(ItemKind::Sick));
        assert_eq!(h.current_beds(), 1);
        assert_eq!(h.snapshot().qty(ItemKind::Sick), 1);
        assert_eq!(h.funds(), funds + benefit);
    }

    #[test]
    fn healed_patients_cannot_be_requested() {
        let h = hospital(1000, 5, 3);
        let err = h.request(ItemKind::Healed, 1).unwrap_err();
        assert_eq!(err, TradeError::UnsupportedItem { item: ItemKind::Healed });
    }

    #[test]
    fn rest_queue_discharges_after_the_full_rest_period() {
        let h = hospital(10_000, 10, 5);
        h.set_clinics(vec![Arc::new(ScriptedSeller::new(9, ItemKind::Healed, 2))]);
        let mut rng = StdRng::seed_from_u64(11);

        let transferred = h.transfer_patients_from_clinic(&mut rng).unwrap();
        assert_eq!(transferred, 2);
        assert_eq!(h.resident_healed(), 2);
        assert_eq!(h.rest_queue_total(), 2);
        assert_eq!(h.current_beds(), 2);

        // Four cycles of rest: still resident.
        for _ in 0..4 {
            assert_eq!(h.free_healed_patient(), 0);
        }
        assert_eq!(h.resident_healed(), 2);

        // Fifth cycle: both leave, the queue reads zero everywhere.
        assert_eq!(h.free_healed_patient(), 2);
        assert_eq!(h.resident_healed(), 0);
        assert_eq!(h.rest_queue_total(), 0);
        assert_eq!(h.current_beds(), 0);
        assert_eq!(h.patients_discharged(), 2);
        assert_eq!(h.funding_from_healed(), 2 * DISCHARGE_BENEFIT);

        // And nothing more comes out afterwards.
        assert_eq!(h.free_healed_patient(), 0);
    }

    #[test]
    fn transfer_pass_rolls_back_on_refusal() {
        let h = hospital(10_000, 10, 5);
        // Clinic with nothing to sell: every attempt refuses.
        h.set_clinics(vec![Arc::new(ScriptedSeller::new(9, ItemKind::Healed, 0))]);
        let mut rng = StdRng::seed_from_u64(11);
        let funds = h.funds();

        let transferred = h.transfer_patients_from_clinic(&mut rng).unwrap();
        assert_eq!(transferred, 0);
        assert_eq!(h.current_beds(), 0);
        assert_eq!(h.funds(), funds);
    }

    #[test]
    fn each_refusing_clinic_is_tried_once_per_pass() {
        let h = hospital(10_000, 10, 5);
        let empty_a = Arc::new(ScriptedSeller::new(8, ItemKind::Healed, 0));
        let empty_b = Arc::new(ScriptedSeller::new(9, ItemKind::Healed, 0));
        h.set_clinics(vec![empty_a.clone(), empty_b.clone()]);
        let mut rng = StdRng::seed_from_u64(11);

        h.transfer_patients_from_clinic(&mut rng).unwrap();
        assert_eq!(empty_a.request_calls(), 1);
        assert_eq!(empty_b.request_calls(), 1);
    }

    #[test]
    fn transfer_pass_is_capped_by_free_beds() {
        let h = hospital(10_000, 3, 5);
        h.set_clinics(vec![Arc::new(ScriptedSeller::new(9, ItemKind::Healed, 50))]);
        let mut rng = StdRng::seed_from_u64(11);

        let transferred = h.transfer_patients_from_clinic(&mut rng).unwrap();
        assert_eq!(transferred, 3);
        assert_eq!(h.current_beds(), 3);
        assert_eq!(h.rest_queue_total(), 3);
    }

    #[test]
    fn unwired_hospital_reports_missing_partners() {
        let h = hospital(1000, 5, 3);
        assert!(matches!(
            h.clinics(),
            Err(SetupError::MissingPartners { actor: "hospital", .. })
        ));
    }
}
