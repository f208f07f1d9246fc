//! Debounced typing presence. One timer per conversation participant;
//! a keystroke restarts the quiet-period timer instead of stacking a
//! second expiry, so each idle period produces exactly one stop signal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::ChannelEvent;

struct TypingTimer {
    reset: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

pub struct TypingTracker {
    quiet: Duration,
    events: broadcast::Sender<ChannelEvent>,
    timers: Arc<Mutex<HashMap<Uuid, TypingTimer>>>,
}

impl TypingTracker {
    pub fn new(quiet: Duration, events: broadcast::Sender<ChannelEvent>) -> Self {
        Self {
            quiet,
            events,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a keystroke. The first keystroke of an idle period emits
    /// a single `typing` signal and arms the timer; further keystrokes
    /// before expiry only push the deadline out.
    pub async fn keystroke(&self, participant_id: Uuid) {
        let mut timers = self.timers.lock().await;
        if let Some(timer) = timers.get(&participant_id) {
            if timer.reset.try_send(()).is_ok() {
                return;
            }
            // Timer expired between our lookup and the reset; rearm below.
        }

        let _ = self.events.send(ChannelEvent::Typing { participant_id });

        let (reset_tx, mut reset_rx) = mpsc::channel::<()>(8);
        let events = self.events.clone();
        let timers_map = Arc::clone(&self.timers);
        let quiet = self.quiet;
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(quiet) => {
                        // A reset that raced the deadline still counts. The
                        // second check runs under the map lock, so a
                        // keystroke holding it cannot slip its reset in
                        // after we decided to stop.
                        if reset_rx.try_recv().is_ok() {
                            continue;
                        }
                        let mut timers = timers_map.lock().await;
                        if reset_rx.try_recv().is_ok() {
                            drop(timers);
                            continue;
                        }
                        let _ = events.send(ChannelEvent::StopTyping { participant_id });
                        timers.remove(&participant_id);
                        break;
                    }
                    reset = reset_rx.recv() => {
                        if reset.is_none() {
                            break;
                        }
                    }
                }
            }
        });
        timers.insert(participant_id, TypingTimer { reset: reset_tx, task });
    }

    /// Cancels all pending timers without emitting stop signals. Called
    /// on channel close so no signal outlives the conversation.
    pub async fn shutdown(&self) {
        let mut timers = self.timers.lock().await;
        for (_, timer) in timers.drain() {
            timer.task.abort();
        }
    }
}
