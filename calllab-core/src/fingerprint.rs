//! Input fingerprinting: deterministic identity of a simulation's inputs.
//!
//! Two simulators cross-checked for parity must be fed identical inputs. The
//! fingerprint hashes the canonical JSON of the calls, their candle paths (in
//! call order, so the map's iteration order never leaks in), the simulator
//! config, and any search-space description the caller attaches.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SimulatorConfig;
use crate::domain::{Call, Candle, CandlesByCallId};

/// BLAKE3 digest of a simulation's inputs, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputFingerprint(pub String);

#[derive(Serialize)]
struct Canonical<'a, S: Serialize> {
    calls: &'a [Call],
    candles: Vec<(&'a str, Option<&'a [Candle]>)>,
    config: &'a SimulatorConfig,
    search: &'a S,
}

impl InputFingerprint {
    /// Hash `(calls, candles, config, search)`.
    pub fn compute<S: Serialize>(
        calls: &[Call],
        candles: &CandlesByCallId,
        config: &SimulatorConfig,
        search: &S,
    ) -> Result<Self, serde_json::Error> {
        let canonical = Canonical {
            calls,
            candles: calls
                .iter()
                .map(|c| (c.id.as_str(), candles.get(&c.id).map(|p| p.as_slice())))
                .collect(),
            config,
            search,
        };
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, &canonical)?;
        Ok(Self(hasher.finalize().to_hex().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InputFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
