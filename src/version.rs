//! Client library version gate.

use crate::prelude::*;

use std::cmp::Ordering;

/// Oldest Modbus client library the register client may be built on.
pub const MIN_CLIENT_VERSION: &str = "3.11.2";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionCheck {
    Exact,
    Newer,
    /// The client could not report its library version.
    Unknown,
}

/// Parse "X.Y.Z" (a leading "v" and any "-pre"/"+build" suffix are ignored,
/// missing minor/patch count as 0).
pub fn parse_version(s: &str) -> Option<(u32, u32, u32)> {
    let s = s.trim().trim_start_matches(['v', 'V']);
    let s = s.split(['-', '+']).next()?;

    let mut parts = s.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    let patch = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }

    Some((major, minor, patch))
}

/// Older than `required` fails, newer only warns.
pub fn check_client_version(found: Option<&str>, required: &str) -> HubResult<VersionCheck> {
    let Some(found) = found else {
        warn!("client library version not found, skipping compatibility check");
        return Ok(VersionCheck::Unknown);
    };

    let incompatible = || HubError::VersionIncompatible {
        found: found.to_owned(),
        required: required.to_owned(),
    };

    let current = parse_version(found).ok_or_else(incompatible)?;
    let minimum = parse_version(required).ok_or_else(incompatible)?;

    match current.cmp(&minimum) {
        Ordering::Less => {
            error!("client library {} is older than {}", found, required);
            Err(incompatible())
        }
        Ordering::Greater => {
            warn!("newer client library {} found", found);
            Ok(VersionCheck::Newer)
        }
        Ordering::Equal => {
            debug!("client library {}", found);
            Ok(VersionCheck::Exact)
        }
    }
}
