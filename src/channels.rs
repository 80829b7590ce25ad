use crate::prelude::*;

#[derive(Debug, Clone)]
pub struct Channels {
    /// Commands from the host shell into the hub.
    pub to_hub: broadcast::Sender<command::ChannelData>,
    /// Snapshot notifications from the coordinator to presentation layers.
    pub from_hub: broadcast::Sender<coordinator::ChannelData>,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

impl Channels {
    pub fn new() -> Self {
        Self {
            to_hub: Self::channel(),
            from_hub: Self::channel(),
        }
    }

    fn channel<T: Clone>() -> broadcast::Sender<T> {
        broadcast::channel(2048).0
    }
}
