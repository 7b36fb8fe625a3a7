//! Bounded polling
//!
//! Long running instrument operations (calibration, acquisition, integrated current) are
//! polled: sleep, ask, repeat until the instrument says done, a poll fails, or the retry
//! budget runs out. Sleeping goes through `Sleeper` so tests never wait on the clock.

use std::time::Duration;

use crate::protocol::Reply;

/// Blocks the calling thread
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Not polled yet
    Waiting,
    /// Last poll came back not done, budget left
    Polling,
    /// The instrument reported completion
    Succeeded,
    /// A poll returned an unsuccessful reply
    Failed,
    /// Budget used up without completion
    Exhausted,
}

impl PollState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            PollState::Succeeded | PollState::Failed | PollState::Exhausted
        )
    }
}

/// How a poll run ended
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub state: PollState,
    pub polls: u32,
    /// Reply of the last poll; `None` only when the budget was zero
    pub reply: Option<Reply>,
}

#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    remaining: u32,
    polls: u32,
    state: PollState,
}

impl Poller {
    pub fn new(retries: u32, interval: Duration) -> Self {
        Self {
            interval,
            remaining: retries,
            polls: 0,
            state: PollState::Waiting,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Apply the result of one poll. A failed poll wins over everything, then
    /// completion, then an empty budget.
    pub fn observe(&mut self, poll_ok: bool, complete: bool) -> PollState {
        self.polls += 1;
        self.remaining = self.remaining.saturating_sub(1);

        self.state = if !poll_ok {
            PollState::Failed
        } else if complete {
            PollState::Succeeded
        } else if self.remaining == 0 {
            PollState::Exhausted
        } else {
            PollState::Polling
        };

        self.state
    }

    /// Run to a finished state, sleeping `interval` before every poll.
    pub fn run<P, C>(mut self, sleeper: &dyn Sleeper, mut poll: P, is_complete: C) -> PollOutcome
    where
        P: FnMut() -> Reply,
        C: Fn(&Reply) -> bool,
    {
        let mut last = None;

        if self.remaining == 0 {
            self.state = PollState::Exhausted;
        }

        while !self.state.is_finished() {
            sleeper.sleep(self.interval);
            let reply = poll();
            let complete = reply.success && is_complete(&reply);
            self.observe(reply.success, complete);
            last = Some(reply);
        }

        PollOutcome {
            state: self.state,
            polls: self.polls,
            reply: last,
        }
    }
}
