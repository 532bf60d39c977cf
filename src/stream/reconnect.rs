//! Reconnect state machine for the push stream
//!
//! `Disconnected -> Connecting -> Subscribed -> Streaming`, with any failure
//! moving to `Backoff(delay)` and an elapsed backoff moving back to
//! `Connecting`. The delay doubles per consecutive failure up to a ceiling
//! and resets to the base as soon as a subscription succeeds.

use std::time::Duration;
use tracing::debug;

/// Exponential delay without jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
    next: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            next: base,
        }
    }

    /// Delay for the current failure; doubles the next one, capped
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.next = self.base;
    }

    /// Delay the next failure would produce
    pub fn peek(&self) -> Duration {
        self.next
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Subscribed,
    Streaming,
    Backoff(Duration),
}

/// Input driving the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTransition {
    /// Start (or restart) a connection attempt
    Connect,
    /// Subscribe message accepted by the socket
    Subscribed,
    /// First inbound frame after subscribing
    MessageReceived,
    /// I/O or protocol error, or the server closed the stream
    Failed,
    /// Backoff delay has elapsed
    BackoffElapsed,
}

/// Reconnect state machine
#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    state: StreamState,
    backoff: ExponentialBackoff,
    consecutive_failures: u32,
}

impl ReconnectMachine {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            state: StreamState::Disconnected,
            backoff: ExponentialBackoff::new(base, max),
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Apply a transition and return the resulting state
    ///
    /// Transitions that make no sense in the current state leave it as is.
    pub fn apply(&mut self, transition: StreamTransition) -> StreamState {
        use StreamState as S;
        use StreamTransition as T;

        let next = match (self.state, transition) {
            (S::Disconnected, T::Connect) => S::Connecting,
            (S::Connecting, T::Subscribed) => {
                self.backoff.reset();
                self.consecutive_failures = 0;
                S::Subscribed
            }
            (S::Subscribed, T::MessageReceived) => S::Streaming,
            (S::Streaming, T::MessageReceived) => S::Streaming,
            (S::Connecting | S::Subscribed | S::Streaming, T::Failed) => {
                self.consecutive_failures += 1;
                S::Backoff(self.backoff.next_delay())
            }
            (S::Backoff(_), T::BackoffElapsed) => S::Connecting,
            (state, transition) => {
                debug!(?state, ?transition, "Ignoring stream transition");
                state
            }
        };

        self.state = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn fail_once(machine: &mut ReconnectMachine) -> Duration {
        machine.apply(StreamTransition::Connect);
        match machine.apply(StreamTransition::Failed) {
            StreamState::Backoff(delay) => {
                machine.apply(StreamTransition::BackoffElapsed);
                delay
            }
            other => panic!("expected backoff, got {:?}", other),
        }
    }

    #[test]
    fn test_happy_path() {
        let mut machine = ReconnectMachine::new(secs(5), secs(60));
        assert_eq!(machine.state(), StreamState::Disconnected);
        assert_eq!(machine.apply(StreamTransition::Connect), StreamState::Connecting);
        assert_eq!(machine.apply(StreamTransition::Subscribed), StreamState::Subscribed);
        assert_eq!(
            machine.apply(StreamTransition::MessageReceived),
            StreamState::Streaming
        );
        assert_eq!(
            machine.apply(StreamTransition::MessageReceived),
            StreamState::Streaming
        );
    }

    #[test]
    fn test_backoff_progression() {
        let mut machine = ReconnectMachine::new(secs(5), secs(60));
        machine.apply(StreamTransition::Connect);
        machine.apply(StreamTransition::Failed);
        machine.apply(StreamTransition::BackoffElapsed);
        assert_eq!(machine.state(), StreamState::Connecting);

        // first failure above was 5s
        let delays: Vec<_> = (0..5)
            .map(|_| match machine.apply(StreamTransition::Failed) {
                StreamState::Backoff(d) => {
                    machine.apply(StreamTransition::BackoffElapsed);
                    d
                }
                other => panic!("expected backoff, got {:?}", other),
            })
            .collect();

        assert_eq!(delays, vec![secs(10), secs(20), secs(40), secs(60), secs(60)]);
        assert_eq!(machine.consecutive_failures(), 6);
    }

    #[test]
    fn test_four_failures_from_base() {
        let mut machine = ReconnectMachine::new(secs(5), secs(60));
        machine.apply(StreamTransition::Connect);
        let mut delays = Vec::new();
        for _ in 0..4 {
            if let StreamState::Backoff(d) = machine.apply(StreamTransition::Failed) {
                delays.push(d);
            }
            machine.apply(StreamTransition::BackoffElapsed);
        }
        assert_eq!(delays, vec![secs(5), secs(10), secs(20), secs(40)]);
    }

    #[test]
    fn test_subscribe_resets_backoff() {
        let mut machine = ReconnectMachine::new(secs(5), secs(60));
        assert_eq!(fail_once(&mut machine), secs(5));
        machine.apply(StreamTransition::Failed);
        machine.apply(StreamTransition::BackoffElapsed);
        machine.apply(StreamTransition::Failed);
        machine.apply(StreamTransition::BackoffElapsed);

        // One successful subscription resets the delay
        machine.apply(StreamTransition::Subscribed);
        assert_eq!(machine.consecutive_failures(), 0);
        machine.apply(StreamTransition::MessageReceived);
        match machine.apply(StreamTransition::Failed) {
            StreamState::Backoff(d) => assert_eq!(d, secs(5)),
            other => panic!("expected backoff, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_from_every_live_state() {
        for setup in [
            vec![StreamTransition::Connect],
            vec![StreamTransition::Connect, StreamTransition::Subscribed],
            vec![
                StreamTransition::Connect,
                StreamTransition::Subscribed,
                StreamTransition::MessageReceived,
            ],
        ] {
            let mut machine = ReconnectMachine::new(secs(5), secs(60));
            for t in setup {
                machine.apply(t);
            }
            assert_eq!(
                machine.apply(StreamTransition::Failed),
                StreamState::Backoff(secs(5))
            );
        }
    }

    #[test]
    fn test_invalid_transition_ignored() {
        let mut machine = ReconnectMachine::new(secs(5), secs(60));
        assert_eq!(
            machine.apply(StreamTransition::Failed),
            StreamState::Disconnected
        );
        assert_eq!(
            machine.apply(StreamTransition::MessageReceived),
            StreamState::Disconnected
        );
    }

    #[test]
    fn test_exponential_backoff_peek() {
        let mut backoff = ExponentialBackoff::new(secs(5), secs(60));
        assert_eq!(backoff.peek(), secs(5));
        backoff.next_delay();
        assert_eq!(backoff.peek(), secs(10));
        backoff.reset();
        assert_eq!(backoff.next_delay(), secs(5));
    }
}
