#![allow(dead_code)]

use fronius_bridge::prelude::*;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

pub fn common_setup() {
    fronius_bridge::logging::init("debug");
}

pub struct Factory;

impl Factory {
    pub fn config() -> Config {
        Config::from_yaml("name: Gen24\nhost: 192.168.1.50\nmeter_unit_ids: [200]\n")
            .expect("valid test config")
    }

    pub fn config_with_meters(meter_unit_ids: &[u8]) -> Config {
        let ids: Vec<String> = meter_unit_ids.iter().map(|id| id.to_string()).collect();
        Config::from_yaml(&format!(
            "name: Gen24\nhost: 192.168.1.50\nmeter_unit_ids: [{}]\n",
            ids.join(", ")
        ))
        .expect("valid test config")
    }

    pub fn read_only_config() -> Config {
        Config::from_yaml("name: Gen24\nhost: 192.168.1.50\nread_only: true\n")
            .expect("valid test config")
    }

    pub fn full_capabilities() -> Capabilities {
        Capabilities {
            meter_configured: true,
            mppt_configured: true,
            storage_configured: true,
        }
    }

    pub fn inverter_only() -> Capabilities {
        Capabilities::default()
    }

    pub async fn hub(client: FakeClient) -> (Hub<FakeClient>, Arc<FakeClient>) {
        Self::hub_with(Self::config(), client).await
    }

    pub async fn hub_with(config: Config, client: FakeClient) -> (Hub<FakeClient>, Arc<FakeClient>) {
        let client = Arc::new(client);
        let hub = Hub::init(config, Arc::clone(&client), Channels::new())
            .await
            .expect("hub init");
        (hub, client)
    }
}

#[derive(Default)]
struct State {
    fixtures: HashMap<RegisterGroup, RegisterData>,
    reads: Vec<RegisterGroup>,
    writes: Vec<Write>,
    failing_group: Option<RegisterGroup>,
    fail_writes: bool,
    read_gate: Option<oneshot::Receiver<()>>,
}

/// Scripted register client: serves fixture data per group and records
/// every read and successful write.
pub struct FakeClient {
    capabilities: Capabilities,
    /// Meters the fixtures are generated for.
    meter_unit_ids: Vec<u8>,
    settings: Option<ConnectionSettings>,
    version: Option<String>,
    connect_result: Mutex<std::result::Result<bool, String>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
    state: Mutex<State>,
}

fn data(pairs: &[(&str, Value)]) -> RegisterData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

impl FakeClient {
    pub fn new(capabilities: Capabilities) -> Self {
        let client = Self {
            capabilities,
            meter_unit_ids: vec![200],
            settings: None,
            version: Some("3.11.2".to_owned()),
            connect_result: Mutex::new(Ok(true)),
            connects: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            state: Mutex::new(State::default()),
        };
        client.load_default_fixtures();
        client
    }

    pub fn with_version(mut self, version: Option<&str>) -> Self {
        self.version = version.map(str::to_owned);
        self
    }

    pub fn with_meters(mut self, meter_unit_ids: &[u8]) -> Self {
        self.meter_unit_ids = meter_unit_ids.to_vec();
        self.load_default_fixtures();
        self
    }

    pub fn with_connect_result(self, result: std::result::Result<bool, &str>) -> Self {
        self.set_connect_result(result);
        self
    }

    pub fn set_connect_result(&self, result: std::result::Result<bool, &str>) {
        *self.connect_result.lock().unwrap() = result.map_err(str::to_owned);
    }

    fn load_default_fixtures(&self) {
        let mut state = self.state.lock().unwrap();
        state.fixtures.clear();

        state.fixtures.insert(
            RegisterGroup::InverterData,
            data(&[
                ("i_ac_power", 2500.0.into()),
                ("i_manufacturer", "Fronius".into()),
                ("i_model", "Symo GEN24 10.0 Plus".into()),
                ("i_serial", "12345678".into()),
                ("i_sw_version", "1.30.7-1".into()),
            ]),
        );
        state
            .fixtures
            .insert(RegisterGroup::InverterStatus, data(&[("i_status", "Normal".into())]));
        state.fixtures.insert(
            RegisterGroup::InverterModelSettings,
            data(&[("i_wmax", 10000.0.into())]),
        );
        state
            .fixtures
            .insert(RegisterGroup::InverterControls, data(&[("conn_status", 1u16.into())]));

        for (unit_id, meter) in self.meter_unit_ids.iter().copied().zip(1..=u8::MAX) {
            let prefix = format!("m{}_", meter);
            let mut values = RegisterData::new();
            values.insert(format!("{}power", prefix), Value::from(-300.0));
            values.insert(format!("{}manufacturer", prefix), Value::from("Fronius"));
            values.insert(format!("{}model", prefix), Value::from("Smart Meter TS 65A-3"));
            values.insert(format!("{}unit_id", prefix), Value::from(unit_id as u16));
            state
                .fixtures
                .insert(RegisterGroup::MeterData { unit_id, meter }, values);
        }

        state
            .fixtures
            .insert(RegisterGroup::MpptData, data(&[("i_mppt1_power", 1500.0.into())]));
        state.fixtures.insert(
            RegisterGroup::ExportLimitData,
            data(&[
                ("export_limit_rate", 5000.0.into()),
                ("export_limit_enable", "Disabled".into()),
            ]),
        );
        state.fixtures.insert(
            RegisterGroup::StorageData,
            data(&[
                ("s_soc", 55.0.into()),
                ("s_manufacturer", "BYD".into()),
                ("s_model", "Battery-Box Premium HVS".into()),
                ("ext_control_mode", 0u16.into()),
                ("minimum_reserve", 10.0.into()),
                ("max_charge_rate_w", 8000.0.into()),
                ("max_discharge_rate_w", 8000.0.into()),
                ("charge_limit", 50.0.into()),
                ("discharge_limit", 100.0.into()),
                ("grid_charge_power", 25.0.into()),
                ("grid_discharge_power", 0.0.into()),
            ]),
        );
    }

    /// Overrides one fixture value for subsequent reads of `group`.
    pub fn set(&self, group: RegisterGroup, key: &str, value: impl Into<Value>) {
        self.state
            .lock()
            .unwrap()
            .fixtures
            .entry(group)
            .or_default()
            .insert(key.to_owned(), value.into());
    }

    pub fn fail_group(&self, group: Option<RegisterGroup>) {
        self.state.lock().unwrap().failing_group = group;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// The next read blocks until the returned sender fires (or is dropped).
    pub fn pause_next_read(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().read_gate = Some(rx);
        tx
    }

    pub fn settings(&self) -> Option<&ConnectionSettings> {
        self.settings.as_ref()
    }

    pub fn reads(&self) -> Vec<RegisterGroup> {
        self.state.lock().unwrap().reads.clone()
    }

    pub fn clear_reads(&self) {
        self.state.lock().unwrap().reads.clear();
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegisterClient for FakeClient {
    fn from_settings(settings: ConnectionSettings) -> Result<Self> {
        let mut client = Self::new(Factory::full_capabilities()).with_meters(&settings.meter_unit_ids);
        client.settings = Some(settings);
        Ok(client)
    }

    async fn connect(&self) -> Result<bool> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.connect_result
            .lock()
            .unwrap()
            .clone()
            .map_err(|e| anyhow!(e))
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    async fn read(&self, group: RegisterGroup) -> Result<RegisterData> {
        let (gate, failing, data) = {
            let mut state = self.state.lock().unwrap();
            state.reads.push(group);
            (
                state.read_gate.take(),
                state.failing_group == Some(group),
                state.fixtures.get(&group).cloned().unwrap_or_default(),
            )
        };

        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if failing {
            bail!("timeout reading {}", group);
        }

        Ok(data)
    }

    async fn write(&self, write: Write) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            bail!("timeout writing {:?}", write);
        }
        state.writes.push(write);
        Ok(())
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn library_version(&self) -> Option<String> {
        self.version.clone()
    }
}
