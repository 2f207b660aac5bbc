//! Recording transport for tests.
//!
//! [`MockConnector`] hands out [`MockConnection`]s and records every wire
//! level event (connect, send, close) in one shared, ordered log.  Tests can
//! kill the current connection, refuse new ones, or make sends fail, and
//! then wait for the worker thread to catch up with
//! [`wait_for_events`](MockConnector::wait_for_events).

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Condvar, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

use super::{Connection, Connector, TransportError};

const MOCK_ENDPOINT: &str = "ws://mock/remote";

/// One entry of the wire log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    Connect,
    ConnectFailed,
    Send(String),
    Close,
}

#[derive(Default)]
struct Shared {
    events: Mutex<Vec<WireEvent>>,
    changed: Condvar,
    refuse: AtomicBool,
    fail_sends: AtomicBool,
    current: Mutex<Option<Arc<AtomicBool>>>,
    gate_closed: Mutex<bool>,
    gate: Condvar,
    blocked: AtomicUsize,
}

impl Shared {
    fn record(&self, event: WireEvent) {
        self.events.lock().expect("lock poisoned").push(event);
        self.changed.notify_all();
    }
}

/// A cloneable, recording [`Connector`].  All clones share one log.
#[derive(Clone, Default)]
pub struct MockConnector {
    shared: Arc<Shared>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the wire log.
    pub fn events(&self) -> Vec<WireEvent> {
        self.shared.events.lock().expect("lock poisoned").clone()
    }

    /// Waits until at least `count` events are logged or `timeout` elapses,
    /// then returns a snapshot.
    pub fn wait_for_events(&self, count: usize, timeout: Duration) -> Vec<WireEvent> {
        let guard = self.shared.events.lock().expect("lock poisoned");
        let (guard, _) = self
            .shared
            .changed
            .wait_timeout_while(guard, timeout, |events| events.len() < count)
            .expect("lock poisoned");
        guard.clone()
    }

    /// Payloads that reached the wire, in order.
    pub fn sent_payloads(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WireEvent::Send(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    /// Successful connects.
    pub fn connect_count(&self) -> usize {
        self.count(|e| *e == WireEvent::Connect)
    }

    /// Successful and failed connects.
    pub fn connect_attempts(&self) -> usize {
        self.count(|e| matches!(e, WireEvent::Connect | WireEvent::ConnectFailed))
    }

    /// Makes the most recent connection report dead.
    pub fn kill_connection(&self) {
        if let Some(alive) = self.shared.current.lock().expect("lock poisoned").as_ref() {
            alive.store(false, Ordering::SeqCst);
        }
    }

    /// Makes subsequent connects fail (or succeed again).
    pub fn refuse_connections(&self, refuse: bool) {
        self.shared.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.shared.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Holds every `connect` call until [`unblock_connects`](Self::unblock_connects).
    pub fn block_connects(&self) {
        *self.shared.gate_closed.lock().expect("lock poisoned") = true;
    }

    pub fn unblock_connects(&self) {
        *self.shared.gate_closed.lock().expect("lock poisoned") = false;
        self.shared.gate.notify_all();
    }

    /// Waits until `count` connect calls are parked behind the gate, or
    /// `timeout` elapses.  Returns whether they got there.
    pub fn wait_for_blocked_connects(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.shared.blocked.load(Ordering::SeqCst) < count {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    fn count(&self, predicate: impl Fn(&WireEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl Connector for MockConnector {
    fn connect(&mut self) -> Result<Box<dyn Connection>, TransportError> {
        let gate = self.shared.gate_closed.lock().expect("lock poisoned");
        let parked = *gate;
        if parked {
            self.shared.blocked.fetch_add(1, Ordering::SeqCst);
        }
        drop(
            self.shared
                .gate
                .wait_while(gate, |closed| *closed)
                .expect("lock poisoned"),
        );
        if parked {
            self.shared.blocked.fetch_sub(1, Ordering::SeqCst);
        }

        if self.shared.refuse.load(Ordering::SeqCst) {
            self.shared.record(WireEvent::ConnectFailed);
            return Err(TransportError::ConnectFailed {
                endpoint: MOCK_ENDPOINT.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let alive = Arc::new(AtomicBool::new(true));
        *self.shared.current.lock().expect("lock poisoned") = Some(Arc::clone(&alive));
        self.shared.record(WireEvent::Connect);
        Ok(Box::new(MockConnection {
            shared: Arc::clone(&self.shared),
            alive,
            closed: false,
        }))
    }

    fn endpoint(&self) -> &str {
        MOCK_ENDPOINT
    }
}

/// A connection handed out by [`MockConnector`].
pub struct MockConnection {
    shared: Arc<Shared>,
    alive: Arc<AtomicBool>,
    closed: bool,
}

impl Connection for MockConnection {
    fn is_alive(&mut self) -> bool {
        !self.closed && self.alive.load(Ordering::SeqCst)
    }

    fn send_text(&mut self, payload: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.shared.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed("broken pipe".to_string()));
        }
        self.shared.record(WireEvent::Send(payload.to_string()));
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.shared.record(WireEvent::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_connector_records_in_order() {
        // Arrange
        let mut connector = MockConnector::new();

        // Act
        let mut conn = connector.connect().unwrap();
        conn.send_text("hello").unwrap();
        conn.close();
        conn.close();

        // Assert
        assert_eq!(
            connector.events(),
            vec![
                WireEvent::Connect,
                WireEvent::Send("hello".to_string()),
                WireEvent::Close
            ]
        );
    }

    #[test]
    fn test_kill_connection_affects_only_current_connection() {
        let mut connector = MockConnector::new();
        let mut old = connector.connect().unwrap();

        connector.kill_connection();
        let mut fresh = connector.connect().unwrap();

        assert!(!old.is_alive());
        assert!(fresh.is_alive());
    }

    #[test]
    fn test_refused_and_failed_sends_are_reported() {
        let mut connector = MockConnector::new();
        connector.refuse_connections(true);
        assert!(connector.connect().is_err());

        connector.refuse_connections(false);
        connector.fail_sends(true);
        let mut conn = connector.connect().unwrap();

        assert!(conn.send_text("x").is_err());
        assert_eq!(connector.connect_attempts(), 2);
        assert!(connector.sent_payloads().is_empty());
    }
}
