use thiserror::Error;

pub type HubResult<T> = std::result::Result<T, HubError>;

/// Failures surfaced by the hub to its callers.
///
/// Only `Connectivity` (and `NotReady`, which wraps it at startup) ever come
/// from the device; every other kind is detected before any register write.
#[derive(Debug, Error)]
pub enum HubError {
    /// Device unreachable or a transaction timed out.
    #[error("{context} failed: {source}")]
    Connectivity {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("client library {found} found, please update to {required} or higher")]
    VersionIncompatible { found: String, required: String },

    /// Mode code out of range, unknown option label, unknown control point or
    /// a value outside the point's bounds.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("{key} is not available in extended control mode {mode}")]
    Unavailable { key: String, mode: String },

    /// Addressing a register group whose capability was not discovered on the
    /// device. This is a caller bug, never a transient failure.
    #[error("{key} requires {capability}, which is not configured on this device")]
    CapabilityMismatch {
        key: String,
        capability: &'static str,
    },

    #[error("write operations are disabled in read-only mode")]
    ReadOnly,

    #[error("hub not ready: {0}")]
    NotReady(#[source] Box<HubError>),
}

impl HubError {
    pub fn connectivity(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Connectivity {
            context: context.into(),
            source,
        }
    }

    pub fn not_ready(cause: HubError) -> Self {
        Self::NotReady(Box::new(cause))
    }

    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Connectivity { .. } => true,
            Self::NotReady(inner) => inner.is_connectivity(),
            _ => false,
        }
    }
}
