//! Runtime configuration (env-driven).
//!
//! Every knob has a default so `cargo run` works out of the box; the
//! `CARESIM_*` variables override them. Parse failures carry context
//! through `anyhow`.

use std::time::Duration;

use anyhow::{ensure, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Actor counts per role.
    pub suppliers: usize,
    pub clinics: usize,
    pub hospitals: usize,
    pub ambulances: usize,

    /// Initial funds per role.
    pub supplier_funds: i64,
    pub clinic_funds: i64,
    pub hospital_funds: i64,
    pub ambulance_funds: i64,

    /// Beds per hospital.
    pub max_beds: u32,
    /// Cycles a healed patient rests before discharge.
    pub rest_period: usize,

    /// Sick patients each ambulance starts with.
    pub ambulance_pool: u32,
    /// Patients offered per ambulance transfer.
    pub transfer_batch: u32,

    /// Bounds of the randomized per-cycle service pause.
    pub pause_min: Duration,
    pub pause_max: Duration,

    /// How long the demo binary lets the economy run.
    pub run_for: Duration,

    /// RNG seed for replayable runs; absent means OS entropy.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            suppliers: 2,
            clinics: 3,
            hospitals: 2,
            ambulances: 2,
            supplier_funds: 150,
            clinic_funds: 200,
            hospital_funds: 500,
            ambulance_funds: 50,
            max_beds: 10,
            rest_period: 5,
            ambulance_pool: 20,
            transfer_batch: 2,
            pause_min: Duration::from_millis(100),
            pause_max: Duration::from_millis(500),
            run_for: Duration::from_secs(30),
            seed: None,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(name)
        .ok()
        .map(|raw| raw.parse())
        .transpose()
        .with_context(|| format!("{name} could not be parsed"))
}

impl Config {
    /// Loads the configuration from the environment over the defaults,
    /// then validates it.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            suppliers: env_parsed("CARESIM_SUPPLIERS")?.unwrap_or(defaults.suppliers),
            clinics: env_parsed("CARESIM_CLINICS")?.unwrap_or(defaults.clinics),
            hospitals: env_parsed("CARESIM_HOSPITALS")?.unwrap_or(defaults.hospitals),
            ambulances: env_parsed("CARESIM_AMBULANCES")?.unwrap_or(defaults.ambulances),
            supplier_funds: env_parsed("CARESIM_SUPPLIER_FUNDS")?
                .unwrap_or(defaults.supplier_funds),
            clinic_funds: env_parsed("CARESIM_CLINIC_FUNDS")?.unwrap_or(defaults.clinic_funds),
            hospital_funds: env_parsed("CARESIM_HOSPITAL_FUNDS")?
                .unwrap_or(defaults.hospital_funds),
            ambulance_funds: env_parsed("CARESIM_AMBULANCE_FUNDS")?
                .unwrap_or(defaults.ambulance_funds),
            max_beds: env_parsed("CARESIM_MAX_BEDS")?.unwrap_or(defaults.max_beds),
            rest_period: env_parsed("CARESIM_REST_PERIOD")?.unwrap_or(defaults.rest_period),
            ambulance_pool: env_parsed("CARESIM_AMBULANCE_POOL")?
                .unwrap_or(defaults.ambulance_pool),
            transfer_batch: env_parsed("CARESIM_TRANSFER_BATCH")?
                .unwrap_or(defaults.transfer_batch),
            pause_min: env_parsed("CARESIM_PAUSE_MIN_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.pause_min),
            pause_max: env_parsed("CARESIM_PAUSE_MAX_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.pause_max),
            run_for: env_parsed("CARESIM_RUN_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.run_for),
            seed: env_parsed("CARESIM_SEED")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.suppliers >= 1, "at least one supplier is required");
        ensure!(self.clinics >= 1, "at least one clinic is required");
        ensure!(self.hospitals >= 1, "at least one hospital is required");
        ensure!(self.rest_period >= 1, "the rest period must be at least one cycle");
        ensure!(self.transfer_batch >= 1, "the transfer batch must be at least 1");
        ensure!(
            self.pause_min <= self.pause_max,
            "the pause bounds are inverted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn inverted_pause_bounds_are_rejected() {
        let config = Config {
            pause_min: Duration::from_millis(500),
            pause_max: Duration::from_millis(100),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn a_fleet_without_clinics_is_rejected() {
        let config = Config {
            clinics: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
