//! Application-level liveness probing.
//!
//! Like the correlator, the monitor only does bookkeeping. The connection
//! task calls [`LivenessMonitor::poll`] whenever it wakes and acts on the
//! returned events.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::TransportConfig;

/// What the owner should do after a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessEvent {
    /// Send a probe now.
    SendProbe,
    /// The slow-connection threshold was just reached.
    Slow {
        /// Consecutive unanswered probes.
        missed: u32,
    },
    /// Too many probes went unanswered; close the connection.
    Dead {
        /// Consecutive unanswered probes.
        missed: u32,
    },
}

/// Probe schedule and missed-pong bookkeeping.
///
/// Every probe carries its own timeout. Any pong clears all outstanding
/// probes and resets the missed count.
#[derive(Debug)]
pub struct LivenessMonitor {
    interval: Duration,
    timeout: Duration,
    max_missed: u32,
    slow_threshold: u32,
    missed: u32,
    outstanding: VecDeque<Instant>,
    next_probe_at: Option<Instant>,
    last_probe_at: Option<Instant>,
}

impl LivenessMonitor {
    /// Creates a stopped monitor.
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration, max_missed: u32, slow_threshold: u32) -> Self {
        Self {
            interval,
            timeout,
            max_missed: max_missed.max(1),
            slow_threshold,
            missed: 0,
            outstanding: VecDeque::new(),
            next_probe_at: None,
            last_probe_at: None,
        }
    }

    /// Creates a stopped monitor from the transport settings.
    #[must_use]
    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(
            config.heartbeat_interval(),
            config.heartbeat_timeout(),
            config.max_missed_pongs,
            config.slow_connection_threshold,
        )
    }

    /// Starts probing; the first probe is due one interval from `now`.
    pub fn start(&mut self, now: Instant) {
        self.reset();
        self.next_probe_at = Some(now + self.interval);
    }

    /// Stops probing and forgets all bookkeeping.
    pub fn stop(&mut self) {
        self.reset();
    }

    /// Returns true while probing.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.next_probe_at.is_some()
    }

    /// Consecutive unanswered probes.
    #[must_use]
    pub fn missed(&self) -> u32 {
        self.missed
    }

    /// When the most recent probe went out.
    #[must_use]
    pub fn last_probe_at(&self) -> Option<Instant> {
        self.last_probe_at
    }

    /// Records a pong.
    pub fn on_pong(&mut self) {
        self.missed = 0;
        self.outstanding.clear();
    }

    /// Earliest instant at which [`poll`](Self::poll) has work to do.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Instant> {
        match (self.next_probe_at, self.outstanding.front().copied()) {
            (Some(probe), Some(timeout)) => Some(probe.min(timeout)),
            (probe, timeout) => probe.or(timeout),
        }
    }

    /// Advances to `now`.
    ///
    /// Expired probe timeouts are counted before a new probe is scheduled.
    /// After `Dead` the monitor is stopped and nothing else is returned.
    pub fn poll(&mut self, now: Instant) -> Vec<LivenessEvent> {
        let mut events = Vec::new();
        if !self.is_running() {
            return events;
        }

        while let Some(&deadline) = self.outstanding.front()
            && deadline <= now
        {
            self.outstanding.pop_front();
            self.missed += 1;
            if self.missed >= self.max_missed {
                events.push(LivenessEvent::Dead {
                    missed: self.missed,
                });
                self.stop();
                return events;
            }
            if self.missed == self.slow_threshold {
                events.push(LivenessEvent::Slow {
                    missed: self.missed,
                });
            }
        }

        if let Some(due) = self.next_probe_at
            && due <= now
        {
            events.push(LivenessEvent::SendProbe);
            self.outstanding.push_back(now + self.timeout);
            self.last_probe_at = Some(now);
            self.next_probe_at = Some(now + self.interval);
        }

        events
    }

    fn reset(&mut self) {
        self.missed = 0;
        self.outstanding.clear();
        self.next_probe_at = None;
        self.last_probe_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn monitor() -> LivenessMonitor {
        LivenessMonitor::new(ms(100), ms(200), 3, 2)
    }

    /// Polls every wakeup up to `until`, recording (offset, event).
    fn run(
        monitor: &mut LivenessMonitor,
        start: Instant,
        until: u64,
        mut on_probe: impl FnMut(u64, &mut LivenessMonitor),
    ) -> Vec<(u64, LivenessEvent)> {
        let mut seen = Vec::new();
        while let Some(at) = monitor.next_wakeup() {
            let offset = u64::try_from((at - start).as_millis()).unwrap();
            if offset > until {
                break;
            }
            for event in monitor.poll(at) {
                seen.push((offset, event));
                if event == LivenessEvent::SendProbe {
                    on_probe(offset, monitor);
                }
            }
        }
        seen
    }

    #[test]
    fn test_stopped_monitor_is_inert() {
        let mut monitor = monitor();
        assert!(!monitor.is_running());
        assert_eq!(monitor.next_wakeup(), None);
        assert!(monitor.poll(Instant::now()).is_empty());
    }

    #[test]
    fn test_three_unanswered_probes_escalate_once() {
        let start = Instant::now();
        let mut monitor = monitor();
        monitor.start(start);

        let events = run(&mut monitor, start, 10_000, |_, _| {});
        assert_eq!(
            events,
            vec![
                (100, LivenessEvent::SendProbe),
                (200, LivenessEvent::SendProbe),
                (300, LivenessEvent::SendProbe),
                (400, LivenessEvent::Slow { missed: 2 }),
                (400, LivenessEvent::SendProbe),
                (500, LivenessEvent::Dead { missed: 3 }),
            ]
        );
        assert!(!monitor.is_running());
    }

    #[test]
    fn test_pong_on_second_probe_resets() {
        let start = Instant::now();
        let mut monitor = monitor();
        monitor.start(start);

        let events = run(&mut monitor, start, 2_000, |offset, monitor| {
            if offset % 200 == 0 {
                monitor.on_pong();
            }
        });

        assert!(
            events
                .iter()
                .all(|(_, event)| *event == LivenessEvent::SendProbe)
        );
        assert_eq!(events.len(), 20);
        assert!(monitor.is_running());
    }

    #[test]
    fn test_single_pong_resets_missed_count() {
        let start = Instant::now();
        let mut monitor = monitor();
        monitor.start(start);

        monitor.poll(start + ms(100));
        monitor.poll(start + ms(200));
        monitor.poll(start + ms(300));
        assert_eq!(monitor.missed(), 1);

        monitor.on_pong();
        assert_eq!(monitor.missed(), 0);
        assert_eq!(monitor.next_wakeup(), Some(start + ms(400)));
    }

    #[test]
    fn test_stop_clears_everything() {
        let start = Instant::now();
        let mut monitor = monitor();
        monitor.start(start);
        monitor.poll(start + ms(100));
        assert!(monitor.last_probe_at().is_some());

        monitor.stop();
        assert_eq!(monitor.next_wakeup(), None);
        assert_eq!(monitor.missed(), 0);
        assert!(monitor.poll(start + ms(1_000)).is_empty());
    }
}
