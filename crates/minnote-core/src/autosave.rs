//! Autosave Policy
//!
//! Trailing-edge debounce: each edit (re)starts a single-shot timer for its
//! session, and only the last timer in a burst of edits fires. Timers are
//! independent of which session is visible and survive switching or
//! closing; a fired timer for a closed session finds nothing to save.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use minnote_tabs::SessionId;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

struct PendingTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerTable {
    next_generation: u64,
    pending: HashMap<SessionId, PendingTimer>,
}

#[derive(Clone)]
pub struct AutosavePolicy {
    delay: Duration,
    timers: Arc<Mutex<TimerTable>>,
}

impl AutosavePolicy {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: Arc::new(Mutex::new(TimerTable::default())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the quiet-period timer for `id`.
    ///
    /// A pending timer for the same session is cancelled and replaced. A
    /// timer that has already fired is not touched, so a save in flight
    /// always runs to completion.
    pub fn on_edit<F, Fut>(&self, id: SessionId, fire: F)
    where
        F: FnOnce(SessionId) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!(session_id = %id, "No async runtime, autosave not scheduled");
                return;
            }
        };

        let mut table = self.timers.lock();
        let generation = table.next_generation;
        table.next_generation += 1;

        if let Some(previous) = table.pending.remove(&id) {
            previous.handle.abort();
        }

        let timers = Arc::clone(&self.timers);
        let delay = self.delay;
        let timer_id = id.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            // Claim the slot; a newer edit may have replaced us meanwhile
            let claimed = {
                let mut table = timers.lock();
                let current = table.pending.get(&timer_id).map(|timer| timer.generation);
                if current == Some(generation) {
                    table.pending.remove(&timer_id);
                    true
                } else {
                    false
                }
            };

            if claimed {
                tracing::debug!(session_id = %timer_id, "Autosave timer fired");
                fire(timer_id).await;
            }
        });

        table.pending.insert(id.clone(), PendingTimer { generation, handle });

        tracing::debug!(
            session_id = %id,
            delay_ms = self.delay.as_millis() as u64,
            "Autosave scheduled"
        );
    }

    pub fn is_pending(&self, id: &SessionId) -> bool {
        self.timers.lock().pending.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.timers.lock().pending.len()
    }

    /// Cancel every pending timer
    pub fn cancel_all(&self) {
        let mut table = self.timers.lock();
        for (_, timer) in table.pending.drain() {
            timer.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minnote_tabs::{Session, SessionKind};

    fn fire_counter(
        fired: &Arc<Mutex<Vec<SessionId>>>,
    ) -> impl FnOnce(SessionId) -> std::future::Ready<()> + Send + 'static {
        let fired = Arc::clone(fired);
        move |id| {
            fired.lock().push(id);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_quiet_period() {
        let policy = AutosavePolicy::new(Duration::from_millis(1000));
        let fired = Arc::new(Mutex::new(Vec::new()));
        let id = Session::new(SessionKind::Document).id;

        policy.on_edit(id.clone(), fire_counter(&fired));
        assert!(policy.is_pending(&id));

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(fired.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(*fired.lock(), vec![id.clone()]);
        assert!(!policy.is_pending(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_edit_replaces_pending_timer() {
        let policy = AutosavePolicy::new(Duration::from_millis(1000));
        let fired = Arc::new(Mutex::new(Vec::new()));
        let id = Session::new(SessionKind::Document).id;

        policy.on_edit(id.clone(), fire_counter(&fired));
        tokio::time::sleep(Duration::from_millis(600)).await;
        policy.on_edit(id.clone(), fire_counter(&fired));
        assert_eq!(policy.pending_count(), 1);

        // The first timer would have fired by now
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(fired.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_are_per_session() {
        let policy = AutosavePolicy::new(Duration::from_millis(1000));
        let fired = Arc::new(Mutex::new(Vec::new()));
        let a = Session::new(SessionKind::Document).id;
        let b = Session::new(SessionKind::Document).id;

        policy.on_edit(a.clone(), fire_counter(&fired));
        policy.on_edit(b.clone(), fire_counter(&fired));
        assert_eq!(policy.pending_count(), 2);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let fired = fired.lock();
        assert_eq!(fired.len(), 2);
        assert!(fired.contains(&a));
        assert!(fired.contains(&b));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let policy = AutosavePolicy::new(Duration::from_millis(1000));
        let fired = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..3 {
            let id = Session::new(SessionKind::Document).id;
            policy.on_edit(id, fire_counter(&fired));
        }
        policy.cancel_all();

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(fired.lock().is_empty());
        assert_eq!(policy.pending_count(), 0);
    }

    #[test]
    fn test_no_runtime_does_not_schedule() {
        let policy = AutosavePolicy::new(Duration::from_millis(10));
        let fired = Arc::new(Mutex::new(Vec::new()));
        let id = Session::new(SessionKind::Document).id;

        policy.on_edit(id.clone(), fire_counter(&fired));
        assert!(!policy.is_pending(&id));
    }
}
