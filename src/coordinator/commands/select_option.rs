use crate::prelude::*;

use std::sync::Arc;

pub struct SelectOption<C> {
    client: Arc<C>,
    store: SnapshotStore,
    capabilities: Capabilities,
    key: String,
    label: String,
}

impl<C: RegisterClient> SelectOption<C> {
    pub fn new(
        client: Arc<C>,
        store: SnapshotStore,
        capabilities: Capabilities,
        key: String,
        label: String,
    ) -> Self {
        Self {
            client,
            store,
            capabilities,
            key,
            label,
        }
    }

    pub async fn run(&self) -> HubResult<()> {
        let point = SelectPoint::from_key(&self.key)
            .ok_or_else(|| HubError::InvalidSelection(format!("unknown select {}", self.key)))?;
        self.capabilities
            .ensure(point.required_capability(), point.key())?;

        let code = point.code_for(&self.label).ok_or_else(|| {
            HubError::InvalidSelection(format!("{} is not an option of {}", self.label, point))
        })?;
        let write = point.write(code)?;

        self.client
            .write(write)
            .await
            .map_err(|err| HubError::connectivity(format!("select {} {}", point, self.label), err))?;

        info!("{} set to {}", point, self.label);
        self.store.set_key(point.key(), self.label.as_str());

        Ok(())
    }
}
