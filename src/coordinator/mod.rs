use crate::prelude::*;

pub mod commands;

use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelData {
    /// A poll cycle completed; carries the new snapshot.
    Updated(Snapshot),
    UpdateFailed(String),
    /// A command received over `Channels::to_hub` failed.
    CommandFailed { topic: String, error: String },
    /// A command received over `Channels::to_hub` was dropped because the
    /// hub was busy; the host may retry it.
    CommandSkipped { topic: String },
    Shutdown,
}

#[derive(Clone, Debug, Default)]
pub struct PollStats {
    pub polls: u64,
    pub polls_failed: u64,
    pub polls_skipped: u64,
    pub group_reads: u64,
    pub commands: u64,
    pub commands_failed: u64,
    pub commands_skipped: u64,
    pub last_error: Option<String>,
}

impl PollStats {
    pub fn print_summary(&self) {
        info!("Poll Statistics:");
        info!("  Poll cycles: {}", self.polls);
        info!("    Failed: {}", self.polls_failed);
        info!("    Skipped (busy): {}", self.polls_skipped);
        info!("  Register group reads: {}", self.group_reads);
        info!("  Commands: {}", self.commands);
        info!("    Failed: {}", self.commands_failed);
        info!("    Skipped (busy): {}", self.commands_skipped);
        if let Some(error) = &self.last_error {
            info!("  Last error: {}", error);
        }
    }
}

/// Register groups a poll cycle reads, in order. Meters are numbered by
/// their position in `meter_unit_ids`, starting at 1; ids past the 255th are
/// never read (`Config` refuses them).
pub fn read_plan(capabilities: &Capabilities, meter_unit_ids: &[u8]) -> Vec<RegisterGroup> {
    let mut plan = vec![
        RegisterGroup::InverterData,
        RegisterGroup::InverterStatus,
        RegisterGroup::InverterModelSettings,
        RegisterGroup::InverterControls,
    ];

    if capabilities.meter_configured {
        plan.extend(
            meter_unit_ids
                .iter()
                .zip(1..=u8::MAX)
                .map(|(&unit_id, meter)| RegisterGroup::MeterData { unit_id, meter }),
        );
    }
    if capabilities.mppt_configured {
        plan.push(RegisterGroup::MpptData);
    }
    plan.push(RegisterGroup::ExportLimitData);
    if capabilities.storage_configured {
        plan.push(RegisterGroup::StorageData);
    }

    plan
}

pub struct Coordinator<C> {
    client: Arc<C>,
    capabilities: Capabilities,
    meter_unit_ids: Vec<u8>,
    read_only: bool,
    store: SnapshotStore,
    guard: BusyGuard,
    channels: Channels,
    pub stats: Arc<Mutex<PollStats>>,
}

impl<C> Clone for Coordinator<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            capabilities: self.capabilities,
            meter_unit_ids: self.meter_unit_ids.clone(),
            read_only: self.read_only,
            store: self.store.clone(),
            guard: self.guard.clone(),
            channels: self.channels.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<C: RegisterClient> Coordinator<C> {
    /// Capabilities are taken from `client` now, so it must already be
    /// connected.
    pub fn new(config: &Config, client: Arc<C>, guard: BusyGuard, channels: Channels) -> Self {
        let capabilities = client.capabilities();
        let meter_unit_ids = config.meter_unit_ids().to_vec();

        Self {
            client,
            capabilities,
            meter_unit_ids,
            read_only: config.read_only(),
            store: SnapshotStore::new(),
            guard,
            channels,
            stats: Arc::new(Mutex::new(PollStats::default())),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn meter_unit_ids(&self) -> &[u8] {
        &self.meter_unit_ids
    }

    pub fn read_plan(&self) -> Vec<RegisterGroup> {
        read_plan(&self.capabilities, &self.meter_unit_ids)
    }

    /// Command receiver; returns on `Shutdown` or when every sender is gone.
    pub async fn start(&self) -> Result<()> {
        let mut receiver = self.channels.to_hub.subscribe();

        loop {
            match receiver.recv().await {
                Ok(command::ChannelData::Command(command)) => {
                    info!("received command {:?}", command);
                    let topic = command.to_result_topic();
                    match self.process_command(command).await {
                        Ok(Outcome::Ran(())) => {}
                        Ok(Outcome::Skipped) => self.notify(ChannelData::CommandSkipped { topic }),
                        Err(err) => self.notify(ChannelData::CommandFailed {
                            topic,
                            error: err.to_string(),
                        }),
                    }
                }
                Ok(command::ChannelData::Shutdown) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("command receiver lagged, {} commands dropped", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_hub.send(command::ChannelData::Shutdown);
        let _ = self.channels.from_hub.send(ChannelData::Shutdown);
    }

    /// One poll cycle. Either every planned group is read and the merged
    /// snapshot replaces the stored one, or the stored snapshot is left as
    /// it was and the first failing group is reported.
    pub async fn refresh(&self) -> HubResult<Outcome<Snapshot>> {
        let result = self.guard.run("refresh", self.poll()).await;

        match &result {
            Ok(Outcome::Ran(snapshot)) => {
                self.update_stats(|s| s.polls += 1);
                self.notify(ChannelData::Updated(snapshot.clone()));
            }
            Ok(Outcome::Skipped) => self.update_stats(|s| s.polls_skipped += 1),
            Err(err) => {
                self.store.mark_failed();
                let error = err.to_string();
                self.update_stats(|s| {
                    s.polls += 1;
                    s.polls_failed += 1;
                    s.last_error = Some(error.clone());
                });
                self.notify(ChannelData::UpdateFailed(error));
            }
        }

        result
    }

    async fn poll(&self) -> HubResult<Snapshot> {
        let mut snapshot = Snapshot::new();

        for group in self.read_plan() {
            let data = self
                .client
                .read(group)
                .await
                .map_err(|err| HubError::connectivity(format!("read {}", group), err))?;
            self.update_stats(|s| s.group_reads += 1);
            trace!("{}: {} values", group, data.len());
            snapshot.merge(data);
        }

        // replaced while still holding the guard so no optimistic write can
        // land between the last read and the swap
        self.store.replace(snapshot.clone());
        debug!("refresh complete, {} keys", snapshot.len());

        Ok(snapshot)
    }

    pub async fn process_command(&self, command: Command) -> HubResult<Outcome<()>> {
        use commands::{select_option::SelectOption, set_mode::SetMode, set_point::SetPoint};

        if command.is_write() && self.read_only {
            warn!("{} refused, read-only mode", command.key());
            return Err(HubError::ReadOnly);
        }

        let name = command.key().to_owned();
        let client = Arc::clone(&self.client);
        let store = self.store.clone();
        let capabilities = self.capabilities;

        let result = match command {
            Command::Refresh => return self.refresh().await.map(|o| o.map(|_| ())),
            Command::SetMode(code) => {
                self.guard
                    .run(&name, SetMode::new(client, store, capabilities, code).run())
                    .await
            }
            Command::SetPoint(key, value) => {
                self.guard
                    .run(&name, SetPoint::new(client, store, capabilities, key, value).run())
                    .await
            }
            Command::SelectOption(key, label) => {
                self.guard
                    .run(&name, SelectOption::new(client, store, capabilities, key, label).run())
                    .await
            }
        };

        match &result {
            Ok(Outcome::Ran(())) => self.update_stats(|s| s.commands += 1),
            Ok(Outcome::Skipped) => self.update_stats(|s| s.commands_skipped += 1),
            Err(err) => {
                let error = err.to_string();
                self.update_stats(|s| {
                    s.commands += 1;
                    s.commands_failed += 1;
                    s.last_error = Some(error.clone());
                });
            }
        }

        result
    }

    fn notify(&self, data: ChannelData) {
        if self.channels.from_hub.send(data).is_err() {
            trace!("no subscribers for hub notifications");
        }
    }

    fn update_stats<F: FnOnce(&mut PollStats)>(&self, f: F) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_for_minimal_device() {
        let plan = read_plan(&Capabilities::default(), &[200]);
        assert_eq!(
            plan,
            vec![
                RegisterGroup::InverterData,
                RegisterGroup::InverterStatus,
                RegisterGroup::InverterModelSettings,
                RegisterGroup::InverterControls,
                RegisterGroup::ExportLimitData,
            ]
        );
    }

    #[test]
    fn plan_for_full_device() {
        let capabilities = Capabilities {
            meter_configured: true,
            mppt_configured: true,
            storage_configured: true,
        };
        let plan = read_plan(&capabilities, &[200, 201]);
        assert_eq!(
            &plan[4..],
            &[
                RegisterGroup::MeterData { unit_id: 200, meter: 1 },
                RegisterGroup::MeterData { unit_id: 201, meter: 2 },
                RegisterGroup::MpptData,
                RegisterGroup::ExportLimitData,
                RegisterGroup::StorageData,
            ]
        );
    }

    #[test]
    fn meter_numbers_stop_at_255() {
        let capabilities = Capabilities {
            meter_configured: true,
            ..Default::default()
        };
        let ids = vec![200u8; 300];
        let meters: Vec<_> = read_plan(&capabilities, &ids)
            .into_iter()
            .filter_map(|g| match g {
                RegisterGroup::MeterData { meter, .. } => Some(meter),
                _ => None,
            })
            .collect();
        assert_eq!(meters.len(), 255);
        assert_eq!(meters.last(), Some(&255));
    }

    #[test]
    fn meters_skipped_when_not_configured() {
        let capabilities = Capabilities {
            storage_configured: true,
            ..Default::default()
        };
        let plan = read_plan(&capabilities, &[200, 201]);
        assert!(!plan
            .iter()
            .any(|g| matches!(g, RegisterGroup::MeterData { .. })));
        assert_eq!(plan.last(), Some(&RegisterGroup::StorageData));
    }
}
