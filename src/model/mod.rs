//! Pure data: item kinds, stock maps, and the static cost/wage table.

pub mod costs;
pub mod item;

pub use costs::{producer_of, unit_price, wage, Role, DISCHARGE_BENEFIT, MAX_ITEMS_PER_ORDER};
pub use item::{ItemKind, Stock, StockSnapshot};
