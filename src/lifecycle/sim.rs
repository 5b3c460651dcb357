//! Builds the fleet, wires partner sets, and owns the run lifecycle.
//!
//! `Simulation` is the dependency-injection point of the system: it
//! constructs every actor with its initial funds and stock, hands each
//! one the shared observer, fixes the immutable partner sets, and only
//! then spawns the run loops. Stopping is cooperative: the shared
//! [`StopFlag`] is raised and every task is joined.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::actors::{Actor, Ambulance, Clinic, Hospital, Pacer, StopFlag, Supplier};
use crate::config::Config;
use crate::observer::Observer;
use crate::trading::Trader;

use super::report::Report;

pub struct Simulation {
    actors: Vec<Actor>,
    stop: StopFlag,
    handles: Vec<JoinHandle<()>>,
    seed: Option<u64>,
}

impl Simulation {
    /// Constructs and wires the whole fleet. No task is spawned yet.
    pub fn build(config: &Config, observer: Arc<dyn Observer>) -> Self {
        let mut actors: Vec<Actor> = Vec::new();
        let mut next_id = 0u32;
        let mut id = || {
            let id = next_id;
            next_id += 1;
            id
        };

        let suppliers: Vec<Arc<Supplier>> = (0..config.suppliers)
            .map(|n| {
                // Alternate the two supplier specialities.
                let supplier = if n % 2 == 0 {
                    Supplier::medical_devices(id(), config.supplier_funds, observer.clone())
                } else {
                    Supplier::pharmacy(id(), config.supplier_funds, observer.clone())
                };
                Arc::new(supplier)
            })
            .collect();

        let clinics: Vec<Arc<Clinic>> = (0..config.clinics)
            .map(|n| {
                let clinic = match n % 3 {
                    0 => Clinic::pulmonology(id(), config.clinic_funds, observer.clone()),
                    1 => Clinic::cardiology(id(), config.clinic_funds, observer.clone()),
                    _ => Clinic::neurology(id(), config.clinic_funds, observer.clone()),
                };
                Arc::new(clinic)
            })
            .collect();

        let hospitals: Vec<Arc<Hospital>> = (0..config.hospitals)
            .map(|_| {
                Arc::new(Hospital::new(
                    id(),
                    config.hospital_funds,
                    config.max_beds,
                    config.rest_period,
                    observer.clone(),
                ))
            })
            .collect();

        let ambulances: Vec<Arc<Ambulance>> = (0..config.ambulances)
            .map(|_| {
                Arc::new(Ambulance::new(
                    id(),
                    config.ambulance_funds,
                    config.ambulance_pool,
                    config.transfer_batch,
                    observer.clone(),
                ))
            })
            .collect();

        // Immutable partner sets, fixed before any run loop starts.
        let supplier_traders: Vec<Arc<dyn Trader>> =
            suppliers.iter().map(|s| s.clone() as Arc<dyn Trader>).collect();
        let clinic_traders: Vec<Arc<dyn Trader>> =
            clinics.iter().map(|c| c.clone() as Arc<dyn Trader>).collect();
        let hospital_traders: Vec<Arc<dyn Trader>> =
            hospitals.iter().map(|h| h.clone() as Arc<dyn Trader>).collect();

        for clinic in &clinics {
            clinic.set_partners(hospital_traders.clone(), supplier_traders.clone());
        }
        for hospital in &hospitals {
            hospital.set_clinics(clinic_traders.clone());
        }
        for ambulance in &ambulances {
            ambulance.set_hospitals(hospital_traders.clone());
        }

        let mut fleet = Vec::new();
        fleet.extend(suppliers.into_iter().map(Actor::Supplier));
        fleet.extend(clinics.into_iter().map(Actor::Clinic));
        fleet.extend(hospitals.into_iter().map(Actor::Hospital));
        fleet.extend(ambulances.into_iter().map(Actor::Ambulance));

        Self {
            actors: fleet,
            stop: StopFlag::new(),
            handles: Vec::new(),
            seed: config.seed,
        }
    }

    /// Spawns one tokio task per actor.
    pub fn start(&mut self, pacer: Arc<dyn Pacer>) {
        assert!(self.handles.is_empty(), "simulation already started");
        info!(actors = self.actors.len(), "starting the fleet");
        for actor in &self.actors {
            let rng = match self.seed {
                // Per-actor stream off the run seed keeps runs replayable.
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(u64::from(actor.id()))),
                None => StdRng::from_os_rng(),
            };
            self.handles
                .push(actor.spawn(self.stop.clone(), pacer.clone(), rng));
        }
    }

    /// The shared stop flag, for external control.
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Raises the process-wide stop signal. Every loop observes it
    /// cooperatively at its next poll point.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Waits for every actor task and collects the end-of-run report.
    pub async fn join(mut self) -> Report {
        for handle in self.handles.drain(..) {
            if let Err(err) = handle.await {
                error!(%err, "actor task failed");
            }
        }
        info!("fleet stopped");
        Report::collect(&self.actors)
    }

    /// Convenience for the demo binary and tests: start, run for
    /// `duration`, stop, join.
    pub async fn run_for(mut self, pacer: Arc<dyn Pacer>, duration: Duration) -> Report {
        self.start(pacer);
        tokio::time::sleep(duration).await;
        self.stop();
        self.join().await
    }
}
