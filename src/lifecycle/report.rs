//! End-of-run accounting.
//!
//! After the fleet has stopped, the report gathers every actor's final
//! funds, stock and counters, then checks the two conservation
//! identities the economy is supposed to respect:
//!
//! - patients are never created or destroyed: everything the ambulances
//!   started with is still on board, resident somewhere, or discharged;
//! - money only enters through discharge benefits and only leaves
//!   through wages, so the system-wide funds drift must equal benefits
//!   credited minus wages paid.
//!
//! A violated identity is a bug in the trading core, not a tuning
//! problem, so mismatches are logged as warnings and asserted exactly in
//! the integration tests.

use serde::Serialize;
use tracing::{info, warn};

use crate::actors::{Actor, ActorId};
use crate::model::StockSnapshot;

#[derive(Debug, Clone, Serialize)]
pub struct ActorReport {
    pub id: ActorId,
    pub kind: &'static str,
    pub initial_funds: i64,
    pub final_funds: i64,
    pub stock: StockSnapshot,
    /// Total wages this actor paid out over the run.
    pub wages_paid: i64,
    /// Kind-specific work counter: items produced, patients treated,
    /// patients admitted, or transfers completed.
    pub work_done: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub actors: Vec<ActorReport>,
    /// Sick patients the ambulances started with.
    pub patients_initial: u32,
    /// Patients still on board, resident in a clinic or hospital, or
    /// discharged after rest.
    pub patients_accounted: u32,
    pub patients_discharged: u32,
    pub discharge_benefits: i64,
    pub wages_paid: i64,
    /// Sum over all actors of final minus initial funds.
    pub money_drift: i64,
}

impl Report {
    pub fn collect(actors: &[Actor]) -> Self {
        let mut rows = Vec::with_capacity(actors.len());
        let mut patients_initial = 0u32;
        let mut patients_accounted = 0u32;
        let mut patients_discharged = 0u32;
        let mut discharge_benefits = 0i64;
        let mut wages_paid = 0i64;
        let mut money_drift = 0i64;

        for actor in actors {
            let row = match actor {
                Actor::Supplier(s) => ActorReport {
                    id: s.id(),
                    kind: "supplier",
                    initial_funds: s.initial_funds(),
                    final_funds: s.funds(),
                    stock: s.snapshot(),
                    wages_paid: s.wages_paid(),
                    work_done: s.items_produced(),
                },
                Actor::Clinic(c) => {
                    patients_accounted += c.resident_patients();
                    ActorReport {
                        id: c.id(),
                        kind: "clinic",
                        initial_funds: c.initial_funds(),
                        final_funds: c.funds(),
                        stock: c.snapshot(),
                        wages_paid: c.wages_paid(),
                        work_done: c.patients_treated(),
                    }
                }
                Actor::Hospital(h) => {
                    let snapshot = h.snapshot();
                    patients_accounted += snapshot.qty(crate::model::ItemKind::Sick)
                        + snapshot.qty(crate::model::ItemKind::Healed)
                        + h.patients_discharged();
                    patients_discharged += h.patients_discharged();
                    discharge_benefits += h.funding_from_healed();
                    ActorReport {
                        id: h.id(),
                        kind: "hospital",
                        initial_funds: h.initial_funds(),
                        final_funds: h.funds(),
                        stock: snapshot,
                        wages_paid: h.wages_paid(),
                        work_done: h.patients_admitted(),
                    }
                }
                Actor::Ambulance(a) => {
                    patients_initial += a.initial_pool();
                    patients_accounted += a.remaining_patients();
                    ActorReport {
                        id: a.id(),
                        kind: "ambulance",
                        initial_funds: a.initial_funds(),
                        final_funds: a.funds(),
                        stock: a.snapshot(),
                        wages_paid: a.wages_paid(),
                        work_done: a.transfers_completed(),
                    }
                }
            };
            wages_paid += row.wages_paid;
            money_drift += row.final_funds - row.initial_funds;
            rows.push(row);
        }

        Self {
            actors: rows,
            patients_initial,
            patients_accounted,
            patients_discharged,
            discharge_benefits,
            wages_paid,
            money_drift,
        }
    }

    /// No patient was created or destroyed over the run.
    pub fn patients_conserved(&self) -> bool {
        self.patients_initial == self.patients_accounted
    }

    /// The system-wide funds drift equals external injections minus
    /// external sinks.
    pub fn money_conserved(&self) -> bool {
        self.money_drift == self.discharge_benefits - self.wages_paid
    }

    /// Renders the report through tracing; conservation mismatches are
    /// warnings.
    pub fn emit(&self) {
        for row in &self.actors {
            info!(
                id = row.id,
                kind = row.kind,
                funds = row.final_funds,
                wages = row.wages_paid,
                work = row.work_done,
                stock = ?row.stock.0,
                "actor final state"
            );
        }
        info!(
            patients_initial = self.patients_initial,
            patients_accounted = self.patients_accounted,
            discharged = self.patients_discharged,
            benefits = self.discharge_benefits,
            wages = self.wages_paid,
            drift = self.money_drift,
            "run totals"
        );
        if !self.patients_conserved() {
            warn!(
                initial = self.patients_initial,
                accounted = self.patients_accounted,
                "patient count not conserved"
            );
        }
        if !self.money_conserved() {
            warn!(
                drift = self.money_drift,
                benefits = self.discharge_benefits,
                wages = self.wages_paid,
                "funds drift does not match benefits minus wages"
            );
        }
    }
}
