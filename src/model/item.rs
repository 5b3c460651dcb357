//! Item kinds and stock bookkeeping.
//!
//! Everything traded in the simulation is an [`ItemKind`]: five raw
//! materials produced by suppliers, plus the two patient kinds that move
//! between ambulances, hospitals and clinics. A [`Stock`] is owned by
//! exactly one actor and is only ever touched while that actor's state
//! lock is held; [`StockSnapshot`] is the owned copy handed to observers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of goods traded between actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Pill,
    Syringe,
    Thermometer,
    Stethoscope,
    Scalpel,
    /// A patient waiting for treatment.
    Sick,
    /// A treated patient resting before discharge.
    Healed,
}

impl ItemKind {
    /// Every kind, materials first, in declaration order.
    pub const ALL: [ItemKind; 7] = [
        ItemKind::Pill,
        ItemKind::Syringe,
        ItemKind::Thermometer,
        ItemKind::Stethoscope,
        ItemKind::Scalpel,
        ItemKind::Sick,
        ItemKind::Healed,
    ];

    /// True for the two patient kinds, which occupy hospital beds.
    pub fn is_patient(self) -> bool {
        matches!(self, ItemKind::Sick | ItemKind::Healed)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemKind::Pill => "pill",
            ItemKind::Syringe => "syringe",
            ItemKind::Thermometer => "thermometer",
            ItemKind::Stethoscope => "stethoscope",
            ItemKind::Scalpel => "scalpel",
            ItemKind::Sick => "sick patient",
            ItemKind::Healed => "healed patient",
        };
        f.write_str(name)
    }
}

/// Quantity per item kind, exclusively owned by one actor.
///
/// A `BTreeMap` keeps iteration order deterministic, which keeps log
/// output and snapshot comparisons stable across runs.
pub type Stock = BTreeMap<ItemKind, u32>;

/// An owned copy of an actor's stock, taken under its state lock and
/// published to the observer after the lock is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSnapshot(pub Stock);

impl StockSnapshot {
    pub fn of(stock: &Stock) -> Self {
        Self(stock.clone())
    }

    /// Quantity of `kind`, zero when the kind is not tracked at all.
    pub fn qty(&self, kind: ItemKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }
}
