//! Data source identifiers.
//!
//! A source id names one external data provider (or the simulator) in
//! configuration, logs, and provenance tags. It is a thin newtype rather than a
//! closed enum because the fallback chain (§6 `fallback_chain.*`) is an
//! operator-supplied ordered list of ids — new sources are added by configuration,
//! not by recompiling the core (§9, plugin-adapter design note).

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    pub const SIMULATOR: &'static str = "simulator";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn is_simulator(&self) -> bool {
        self.0 == Self::SIMULATOR
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
