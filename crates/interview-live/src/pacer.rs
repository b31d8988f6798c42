//! Outbound frame pacing.
//!
//! Microphone audio is latency-critical and bypasses this module entirely;
//! camera frames are heavier and flow through a FIFO drained at most once
//! per minimum interval so they cannot starve the channel. The drain timer
//! only exists while the queue is non-empty.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

pub(crate) struct FramePacer {
    queue: VecDeque<String>,
    min_interval: Duration,
    last_sent: Option<Instant>,
    timer: Option<Interval>,
}

impl FramePacer {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            min_interval,
            last_sent: None,
            timer: None,
        }
    }

    /// Appends a frame and arms the drain timer if it was idle.
    pub(crate) fn enqueue(&mut self, data: String) {
        self.queue.push_back(data);
        if self.timer.is_none() {
            let mut timer = time::interval(self.min_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.timer = Some(timer);
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    /// Waits for the next drain tick. Pends forever while the timer is
    /// disarmed; callers gate on [`is_active`](Self::is_active) in `select!`.
    pub(crate) async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Pops the next frame if the minimum interval has elapsed since the
    /// last send. Timer ticks and the elapsed-interval floor need not line
    /// up, so this re-checks the clock instead of trusting the tick.
    pub(crate) fn pop_due(&mut self) -> Option<String> {
        if let Some(last) = self.last_sent {
            if last.elapsed() < self.min_interval {
                return None;
            }
        }
        self.queue.pop_front()
    }

    pub(crate) fn mark_sent(&mut self) {
        self.last_sent = Some(Instant::now());
    }

    /// Returns a frame that failed to send to the head of the queue so it is
    /// retried before anything newer.
    pub(crate) fn requeue_front(&mut self, data: String) {
        self.queue.push_front(data);
    }

    /// Disarms the timer once the queue has drained, so an idle session
    /// stops waking up.
    pub(crate) fn disarm_if_empty(&mut self) {
        if self.queue.is_empty() {
            self.timer = None;
        }
    }

    /// Drops all queued frames and the timer.
    pub(crate) fn clear(&mut self) {
        self.queue.clear();
        self.timer = None;
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }
}
