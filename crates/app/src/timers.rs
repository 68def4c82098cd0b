use std::collections::HashMap;
use std::time::Duration;

use services::SessionEvent;
use services::ports::Timers;
use services::session::TimerId;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::runner::Input;

/// Timers backed by tokio sleeps; expiry is delivered as
/// `SessionEvent::TimerFired` on the host's input channel.
pub struct TokioTimers {
    events: UnboundedSender<Input>,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioTimers {
    #[must_use]
    pub fn new(events: UnboundedSender<Input>) -> Self {
        Self {
            events,
            tasks: HashMap::new(),
        }
    }
}

impl Timers for TokioTimers {
    fn schedule(&mut self, id: TimerId, delay: Duration) {
        self.tasks.retain(|_, task| !task.is_finished());
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone once the session loop ended.
            let _ = events.send(Input::Event(SessionEvent::TimerFired(id)));
        });
        self.tasks.insert(id, task);
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
