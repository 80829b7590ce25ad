use crate::prelude::*;

use tokio::time::MissedTickBehavior;

/// Drives one refresh per scan interval until a `Shutdown` arrives on
/// `Channels::to_hub`.
pub struct Scheduler<C> {
    hub: Hub<C>,
}

impl<C: RegisterClient> Scheduler<C> {
    pub fn new(hub: Hub<C>) -> Self {
        Self { hub }
    }

    pub async fn start(&self) -> Result<()> {
        let mut receiver = self.hub.channels().to_hub.subscribe();
        let mut interval = tokio::time::interval(self.hub.config().scan_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // the first tick completes immediately; init already polled once
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.hub.refresh().await {
                        Ok(Outcome::Ran(_)) => {}
                        Ok(Outcome::Skipped) => debug!("scheduled refresh skipped"),
                        Err(err) => warn!("scheduled refresh: {}", err),
                    }
                }
                message = receiver.recv() => match message {
                    Ok(command::ChannelData::Shutdown) | Err(broadcast::error::RecvError::Closed) => break,
                    _ => {}
                }
            }
        }

        info!("scheduler stopped");
        Ok(())
    }
}
