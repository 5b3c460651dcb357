//! The trade protocol: the request/send contract, the buying pass, and
//! scripted doubles for tests.

pub mod market;
pub mod mock;
pub mod protocol;

pub use market::{buy_from_sellers, choose_random_seller, Buyer};
pub use protocol::{check_charged_price, TradeError, Trader};
