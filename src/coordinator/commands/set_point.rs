use crate::prelude::*;

use std::sync::Arc;

/// Writes a numeric control point. `value` is in presented units (watts for
/// rate-like points).
pub struct SetPoint<C> {
    client: Arc<C>,
    store: SnapshotStore,
    capabilities: Capabilities,
    key: String,
    value: f64,
}

impl<C: RegisterClient> SetPoint<C> {
    pub fn new(
        client: Arc<C>,
        store: SnapshotStore,
        capabilities: Capabilities,
        key: String,
        value: f64,
    ) -> Self {
        Self {
            client,
            store,
            capabilities,
            key,
            value,
        }
    }

    pub async fn run(&self) -> HubResult<()> {
        let point = ControlPoint::from_key(&self.key)
            .ok_or_else(|| HubError::InvalidSelection(format!("unknown control point {}", self.key)))?;
        self.capabilities
            .ensure(point.required_capability(), point.key())?;

        let snapshot = self.store.current();
        let mode = snapshot.extended_control_mode();
        if !point.is_available(mode) {
            return Err(HubError::Unavailable {
                key: point.key().to_owned(),
                mode: mode.map_or_else(|| "unknown".to_owned(), |m| m.label().to_owned()),
            });
        }

        let min = point.descriptor().min;
        let max = point.max_value(&snapshot);
        if !self.value.is_finite() || self.value < min || self.value > max {
            return Err(HubError::InvalidSelection(format!(
                "{} {} outside {}..={}",
                point, self.value, min, max
            )));
        }

        self.client
            .write(point.write(self.value))
            .await
            .map_err(|err| HubError::connectivity(format!("set {} to {}", point, self.value), err))?;

        info!("{} set to {}", point, self.value);
        self.store.set_key(point.key(), point.raw_value(self.value, &snapshot));

        Ok(())
    }
}
