//! Run fingerprinting: deterministic identity of a config and of the event
//! stream it produced.
//!
//! Both hashes are blake3 over canonical JSON. The event hash covers the
//! exact JSON-lines text (one event per line, `\n` terminated), so it also
//! matches a hash of the file the CLI writes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::StrategyConfig;
use crate::events::EngineEvent;

/// Hex-encoded blake3 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    fn from_hasher(hasher: &blake3::Hasher) -> Self {
        Self(hasher.finalize().to_hex().to_string())
    }

    /// First 12 hex chars, for logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn config_fingerprint(config: &StrategyConfig) -> Result<Fingerprint, serde_json::Error> {
    let json = serde_json::to_vec(config)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(&json);
    Ok(Fingerprint::from_hasher(&hasher))
}

/// Incremental hash of an event stream, fed in emission order.
#[derive(Clone, Default)]
pub struct EventStreamHasher {
    hasher: blake3::Hasher,
    count: usize,
}

impl EventStreamHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash one event and return its JSON line (without the newline).
    pub fn push(&mut self, event: &EngineEvent) -> Result<String, serde_json::Error> {
        let line = serde_json::to_string(event)?;
        self.hasher.update(line.as_bytes());
        self.hasher.update(b"\n");
        self.count += 1;
        Ok(line)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn finish(&self) -> Fingerprint {
        Fingerprint::from_hasher(&self.hasher)
    }
}

pub fn event_stream_fingerprint<'a, I>(events: I) -> Result<Fingerprint, serde_json::Error>
where
    I: IntoIterator<Item = &'a EngineEvent>,
{
    let mut hasher = EventStreamHasher::new();
    for event in events {
        hasher.push(event)?;
    }
    Ok(hasher.finish())
}
