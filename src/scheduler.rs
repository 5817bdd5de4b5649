//! Repeating gravity and soft-drop timers
//!
//! Each timer is a tokio task that posts [`TimerFired`] into a channel read
//! by the driver. Every start hands out a new generation number; a tick is
//! only acted on while its generation is still the live one for its key, so
//! a tick already queued when its timer was cancelled is dropped.

use crate::protocol::PlayerId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Gravity for every player of a room
    Gravity(String),
    /// Soft drop for one player
    SoftDrop(PlayerId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFired {
    pub key: TimerKey,
    pub generation: u64,
}

struct Timer {
    generation: u64,
    period: Duration,
    task: Option<JoinHandle<()>>,
}

pub struct Scheduler {
    timers: HashMap<TimerKey, Timer>,
    next_generation: u64,
    /// Without a sender timers are only tracked, never spawned
    fired_tx: Option<mpsc::UnboundedSender<TimerFired>>,
}

impl Scheduler {
    pub fn new(fired_tx: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            timers: HashMap::new(),
            next_generation: 0,
            fired_tx: Some(fired_tx),
        }
    }

    /// A scheduler that keeps the bookkeeping but runs no tasks
    pub fn detached() -> Self {
        Self {
            timers: HashMap::new(),
            next_generation: 0,
            fired_tx: None,
        }
    }

    /// Start (or restart) the timer for `key`. The first tick comes one
    /// full period from now. Returns the new generation.
    pub fn start(&mut self, key: TimerKey, period: Duration) -> u64 {
        self.cancel(&key);
        self.next_generation += 1;
        let generation = self.next_generation;

        let task = self.fired_tx.clone().map(|tx| {
            let key = key.clone();
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let fired = TimerFired {
                        key: key.clone(),
                        generation,
                    };
                    if tx.send(fired).is_err() {
                        break;
                    }
                }
            })
        });

        debug!("Timer {:?} started, every {:?} (gen {})", key, period, generation);
        self.timers.insert(
            key,
            Timer {
                generation,
                period,
                task,
            },
        );
        generation
    }

    /// Stop the timer for `key`. Returns false if none was running.
    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        match self.timers.remove(key) {
            Some(timer) => {
                if let Some(task) = timer.task {
                    task.abort();
                }
                debug!("Timer {:?} cancelled (gen {})", key, timer.generation);
                true
            }
            None => false,
        }
    }

    /// Whether a tick still belongs to the running timer for its key
    pub fn is_live(&self, fired: &TimerFired) -> bool {
        self.timers
            .get(&fired.key)
            .is_some_and(|timer| timer.generation == fired.generation)
    }

    pub fn is_running(&self, key: &TimerKey) -> bool {
        self.timers.contains_key(key)
    }

    pub fn period_of(&self, key: &TimerKey) -> Option<Duration> {
        self.timers.get(key).map(|timer| timer.period)
    }

    pub fn generation_of(&self, key: &TimerKey) -> Option<u64> {
        self.timers.get(key).map(|timer| timer.generation)
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.timers.drain() {
            if let Some(task) = timer.task {
                task.abort();
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::time::sleep;

    fn gravity() -> TimerKey {
        TimerKey::Gravity("lobby".into())
    }

    #[test]
    fn test_detached_tracks_generations() {
        let mut scheduler = Scheduler::detached();
        let first = scheduler.start(gravity(), Duration::from_millis(1000));
        let second = scheduler.start(gravity(), Duration::from_millis(900));
        assert_ne!(first, second);
        assert_eq!(scheduler.period_of(&gravity()), Some(Duration::from_millis(900)));
        assert!(!scheduler.is_live(&TimerFired {
            key: gravity(),
            generation: first,
        }));
        assert!(scheduler.is_live(&TimerFired {
            key: gravity(),
            generation: second,
        }));
        assert!(scheduler.cancel(&gravity()));
        assert!(!scheduler.cancel(&gravity()));
        assert!(!scheduler.is_running(&gravity()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_every_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);
        let generation = scheduler.start(gravity(), Duration::from_millis(1000));

        sleep(Duration::from_millis(500)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        sleep(Duration::from_millis(600)).await;
        let fired = rx.try_recv().unwrap();
        assert_eq!(fired, TimerFired { key: gravity(), generation });
        assert!(scheduler.is_live(&fired));

        sleep(Duration::from_millis(1000)).await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_cancel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);
        scheduler.start(TimerKey::SoftDrop("c1".into()), Duration::from_millis(50));
        sleep(Duration::from_millis(20)).await;
        scheduler.cancel_all();

        sleep(Duration::from_millis(500)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_invalidates_queued_tick() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);
        scheduler.start(gravity(), Duration::from_millis(100));
        sleep(Duration::from_millis(150)).await;

        // Tick queued, then the timer is rescheduled before it is handled
        scheduler.start(gravity(), Duration::from_millis(90));
        let stale = rx.try_recv().unwrap();
        assert!(!scheduler.is_live(&stale));
    }
}
