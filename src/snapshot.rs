use crate::prelude::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

// Value {{{
/// A single scalar read from (or optimistically written to) the device.
/// Enum-like registers are carried as their human label in `Text`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
} // }}}

// Snapshot {{{
/// Point-in-time view of every register group read in one successful cycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, Value>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Folds one register group's values in; later groups win on key clashes.
    pub fn merge(&mut self, data: RegisterData) {
        self.0.extend(data);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// The extended control mode currently reported by storage, if any.
    pub fn extended_control_mode(&self) -> Option<ExtendedControlMode> {
        self.get(mode::MODE_KEY)
            .and_then(ExtendedControlMode::from_value)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl FromIterator<(String, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
} // }}}

// SnapshotStore {{{
struct State {
    snapshot: Snapshot,
    last_update_success: bool,
    last_update: Option<DateTime<Utc>>,
}

/// Holds the latest merged snapshot. The coordinator is the only caller of
/// `replace` and `mark_failed`; command paths only ever use `set_key`.
#[derive(Clone)]
pub struct SnapshotStore {
    state: Arc<Mutex<State>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                snapshot: Snapshot::default(),
                last_update_success: false,
                last_update: None,
            })),
        }
    }

    // a panic while holding the lock can't leave State half-written, every
    // mutation below is a single assignment
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> Snapshot {
        self.state().snapshot.clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state().snapshot.get(key).cloned()
    }

    pub fn extended_control_mode(&self) -> Option<ExtendedControlMode> {
        self.state().snapshot.extended_control_mode()
    }

    pub fn replace(&self, snapshot: Snapshot) {
        let mut state = self.state();
        state.snapshot = snapshot;
        state.last_update_success = true;
        state.last_update = Some(Utc::now());
    }

    pub fn mark_failed(&self) {
        self.state().last_update_success = false;
    }

    /// Optimistically reflects a just-written value. The next successful
    /// poll replaces it with whatever the device reports.
    pub fn set_key(&self, key: &str, value: impl Into<Value>) {
        self.state().snapshot.insert(key, value);
    }

    pub fn last_update_success(&self) -> bool {
        self.state().last_update_success
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.state().last_update
    }
} // }}}
