use std::future::Future;
use std::time::Duration;

use shared::Conversation;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub fn refresh_interval(
    conversation: Option<&Conversation>,
    has_credential: bool,
    interval: Duration,
) -> Option<Duration> {
    let conversation = conversation?;

    (has_credential && conversation.state.needs_polling()).then_some(interval)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Stop,
}

#[derive(Debug)]
pub struct Poller {
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Starts ticking unless already running. The first tick fires immediately;
    /// the loop ends when `tick` answers [`PollControl::Stop`].
    pub fn start<F, Fut>(&mut self, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = PollControl> + Send + 'static,
    {
        if self.is_running() {
            return;
        }

        let period = self.interval;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if tick().await == PollControl::Stop {
                    debug!("polling stopped");
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
