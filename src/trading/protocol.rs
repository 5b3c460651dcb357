//! The request/send trade contract.
//!
//! Every trade in the simulation is one call through the [`Trader`]
//! trait: `request` pulls goods out of the callee, `send` pushes goods
//! into it. Both are a single bounded critical section on the callee's
//! own state lock, and neither ever calls into another actor. That
//! one-directional rule (a caller never holds its own lock across a
//! counterpart call, a callee never calls outward) is what keeps
//! mutually-trading actors deadlock-free without a global lock order.
//!
//! A refused trade is an [`Err`] carrying the reason and guarantees the
//! callee's stock and funds are untouched. All refusals are non-fatal:
//! the caller skips the action this cycle and retries later.

use tracing::warn;

use crate::actors::ActorId;
use crate::model::ItemKind;

/// Why a trade was refused. Every variant leaves the callee unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    /// The callee does not hold enough of the requested item.
    #[error("insufficient stock of {item} (wanted {qty})")]
    InsufficientStock { item: ItemKind, qty: u32 },

    /// The callee cannot cover the cost of accepting the trade.
    #[error("insufficient funds (needed {needed}, available {available})")]
    InsufficientFunds { needed: i64, available: i64 },

    /// The callee has no free bed for the offered patients.
    #[error("no bed capacity for {qty} patient(s)")]
    NoBedCapacity { qty: u32 },

    /// No counterpart was available to trade with at all.
    #[error("no counterpart available")]
    NoCounterpartAvailable,

    /// The callee does not deal in this item kind.
    #[error("{item} is not traded here")]
    UnsupportedItem { item: ItemKind },
}

/// One side of a trade. Implemented by every actor kind.
///
/// Implementations must not block, must keep the critical section to the
/// callee's own state lock, and must not invoke any other actor from
/// inside `request` or `send`.
pub trait Trader: Send + Sync {
    fn id(&self) -> ActorId;

    /// Pull transaction: the caller buys `qty` of `item` from the callee.
    ///
    /// On success the callee has already decremented its stock and
    /// credited its funds; the returned value is the price charged. The
    /// caller commits its own debit only after this returns `Ok`.
    fn request(&self, item: ItemKind, qty: u32) -> Result<i64, TradeError>;

    /// Push transaction: the caller offers `qty` of `item` for `bill`.
    ///
    /// On success the callee has incremented its stock and debited the
    /// bill; the returned value is the quantity accepted.
    fn send(&self, item: ItemKind, qty: u32, bill: i64) -> Result<u32, TradeError>;
}

/// Consistency check on a committed trade: a charged amount that differs
/// from the expected per-unit price is logged as a warning and never
/// aborts the trade.
pub fn check_charged_price(
    buyer: ActorId,
    seller: ActorId,
    item: ItemKind,
    qty: u32,
    expected: i64,
    charged: i64,
) {
    if charged != expected {
        warn!(
            buyer,
            seller,
            %item,
            qty,
            expected,
            charged,
            "price mismatch on committed trade"
        );
    }
}
