//! Blitz Core: streaming UT-Bot / Hull / STC signal engine.
//!
//! Turns a stream of closed OHLC bars into validated long/short signals with
//! bracket levels, then manages the open position's stop with a breakeven
//! rule:
//! - Domain types (bars, directions, positions, trade IDs)
//! - Streaming indicators with explicit warmup (ATR, UT trailing stop,
//!   Hull family, Schaff Trend Cycle)
//! - Bracket risk pricing and the multi-gate signal validator
//! - Trade lifecycle (entry, breakeven, reversal, external exits)
//! - The per-bar fold over an explicit, cloneable state
//! - Configuration and run fingerprinting

pub mod config;
pub mod domain;
pub mod engine;
pub mod events;
pub mod fingerprint;
pub mod indicators;
pub mod lifecycle;
pub mod risk;
pub mod session;
pub mod validator;

pub use config::{BreakevenMode, ConfigError, SameDirection, StrategyConfig};
pub use domain::{Bar, Direction, Position, PriceSource, TradeId};
pub use engine::{run, BarOutput, Engine, EngineError, EngineState, RunOutput};
pub use events::{
    BarMarkers, EngineEvent, ExitReason, PositionClosedEvent, SignalEvent, StopAdjustmentEvent,
};
pub use lifecycle::ExitNotice;
