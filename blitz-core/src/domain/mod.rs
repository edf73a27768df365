//! Domain types for Blitz

pub mod bar;
pub mod ids;
pub mod position;

pub use bar::{heikin_ashi_close, Bar, PriceSource};
pub use ids::{TradeId, TradeIdGen};
pub use position::{Direction, Position};
