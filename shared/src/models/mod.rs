//! Domain models for the TradeFlow marketplace

mod alert;
mod award;
mod bid;
mod order;
mod proposal;
mod review;
mod stock;
mod user;

pub use alert::*;
pub use award::*;
pub use bid::*;
pub use order::*;
pub use proposal::*;
pub use review::*;
pub use stock::*;
pub use user::*;
