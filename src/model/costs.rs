//! The static cost and wage table.
//!
//! Pure reference data: per-unit prices for every [`ItemKind`], the wage
//! of the worker role that produces or handles it, and the two tuning
//! constants the trading loops use. Nothing in here holds state.

use super::item::ItemKind;

/// Worker roles that are paid a wage when an item is produced or handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Supplier,
    Nurse,
    Doctor,
}

/// Revenue credited to a hospital per patient discharged after rest.
pub const DISCHARGE_BENEFIT: i64 = 100;

/// How many units a clinic asks for when restocking a material.
pub const MAX_ITEMS_PER_ORDER: u32 = 5;

/// Fixed per-unit sale price of each item kind.
pub fn unit_price(kind: ItemKind) -> i64 {
    match kind {
        ItemKind::Pill => 2,
        ItemKind::Syringe => 3,
        ItemKind::Thermometer => 5,
        ItemKind::Scalpel => 7,
        ItemKind::Stethoscope => 8,
        ItemKind::Sick => 25,
        ItemKind::Healed => 60,
    }
}

/// Fixed wage paid per unit of work done by `role`.
pub fn wage(role: Role) -> i64 {
    match role {
        Role::Supplier => 4,
        Role::Nurse => 6,
        Role::Doctor => 10,
    }
}

/// The role paid when one unit of `kind` is produced or handled.
pub fn producer_of(kind: ItemKind) -> Role {
    match kind {
        ItemKind::Pill
        | ItemKind::Syringe
        | ItemKind::Thermometer
        | ItemKind::Stethoscope
        | ItemKind::Scalpel => Role::Supplier,
        ItemKind::Sick => Role::Nurse,
        ItemKind::Healed => Role::Doctor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_price_and_producer() {
        for kind in ItemKind::ALL {
            assert!(unit_price(kind) > 0);
            assert!(wage(producer_of(kind)) > 0);
        }
    }

    #[test]
    fn treatment_is_paid_at_the_doctor_wage() {
        assert_eq!(producer_of(ItemKind::Healed), Role::Doctor);
        assert_eq!(wage(Role::Doctor), 10);
    }
}
