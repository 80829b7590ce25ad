pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};
pub use tokio::sync::broadcast;

pub use crate::channels::Channels;
pub use crate::client::{Capabilities, Capability, ConnectionSettings, RegisterClient, RegisterData, RegisterGroup, Write};
pub use crate::command::Command;
pub use crate::config::Config;
pub use crate::control::{ControlPoint, NumberDescriptor, SelectPoint};
pub use crate::error::{HubError, HubResult};
pub use crate::guard::{BusyGuard, Outcome};
pub use crate::hub::Hub;
pub use crate::mode::ExtendedControlMode;
pub use crate::snapshot::{Snapshot, SnapshotStore, Value};

pub use crate::{channels, client, command, config, control, coordinator, hub, mode, snapshot};
