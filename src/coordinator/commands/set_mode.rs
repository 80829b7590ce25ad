use crate::prelude::*;
use crate::mode::MODE_KEY;

use std::sync::Arc;

pub struct SetMode<C> {
    client: Arc<C>,
    store: SnapshotStore,
    capabilities: Capabilities,
    code: u16,
}

impl<C: RegisterClient> SetMode<C> {
    pub fn new(client: Arc<C>, store: SnapshotStore, capabilities: Capabilities, code: u16) -> Self {
        Self {
            client,
            store,
            capabilities,
            code,
        }
    }

    pub async fn run(&self) -> HubResult<()> {
        self.capabilities.ensure(Some(Capability::Storage), MODE_KEY)?;
        let mode = ExtendedControlMode::from_code(self.code)?;

        self.client
            .write(Write::ExtendedControlMode(mode))
            .await
            .map_err(|err| HubError::connectivity(format!("set {} to {}", MODE_KEY, mode), err))?;

        info!("{} set to {} ({})", MODE_KEY, mode, mode.code());
        self.store.set_key(MODE_KEY, mode.label());

        Ok(())
    }
}
