//! Background delivery of outbound commands over a persistent connection.
//!
//! Each network-controlled target owns one [`CommandWorker`].  Callers only
//! ever [`enqueue`](CommandWorker::enqueue), which never blocks; the worker
//! thread owns the queue receiver, the connection, and the connection state.
//!
//! # Connection state machine
//!
//! ```text
//!                 connect ok + auth sent
//! Disconnected ──▶ Connecting ──────────────▶ Authenticated
//!      ▲               │ connect failed            │ dead / send failed
//!      └───────────────┴───────────────────────────┘
//!
//! any state ── shutdown sentinel ──▶ Stopped
//! ```
//!
//! Authentication is fire-and-forget: the message is sent right after the
//! socket opens and queued commands follow without waiting for a reply.
//!
//! # Shutdown
//!
//! [`shutdown`](CommandWorker::shutdown) sets the cancellation flag,
//! enqueues the sentinel, and joins the thread.  Commands queued ahead of
//! the sentinel are still delivered; while cancelled the worker makes at
//! most one connect attempt so teardown cannot hang on an unreachable peer.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, Sender},
    Arc, Mutex, PoisonError,
};
use std::thread::{self, JoinHandle};

use clicker_core::{OutboundCommand, RemoteAction};
use tracing::{debug, info, warn};

use super::{Connection, Connector, Credentials};

/// Connection lifecycle of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticated,
    /// Terminal; the worker thread has exited.
    Stopped,
}

/// Queue entries.  `Shutdown` is the sentinel and is never sent.
#[derive(Debug)]
enum QueueItem {
    Command(OutboundCommand),
    Shutdown,
}

/// Handle to a running delivery worker.
pub struct CommandWorker {
    name: String,
    queue: Sender<QueueItem>,
    cancelled: Arc<AtomicBool>,
    state: Arc<Mutex<ConnectionState>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl CommandWorker {
    /// Starts a worker thread named after `name`.
    ///
    /// No connection is opened until the first command arrives.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(
        name: &str,
        connector: Box<dyn Connector>,
        credentials: Credentials,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(ConnectionState::Disconnected));

        let delivery = DeliveryLoop {
            connector,
            credentials,
            connection: None,
            cancelled: Arc::clone(&cancelled),
            state: Arc::clone(&state),
            shutdown_connect_attempted: false,
        };
        let thread = thread::Builder::new()
            .name(format!("{name}-commands"))
            .spawn(move || delivery.run(rx))?;

        info!("{name}: command worker started");
        Ok(Self {
            name: name.to_string(),
            queue: tx,
            cancelled,
            state,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Appends `command` to the queue.  Never blocks.
    ///
    /// Commands submitted after shutdown was requested are discarded.
    pub fn enqueue(&self, command: OutboundCommand) {
        if self.cancelled.load(Ordering::Acquire) {
            debug!("{}: discarding command after shutdown: {command}", self.name);
            return;
        }
        if self.queue.send(QueueItem::Command(command)).is_err() {
            debug!("{}: worker already exited; command discarded", self.name);
        }
    }

    /// Read-only snapshot of the connection state for diagnostics.
    ///
    /// Only the worker thread writes the state; the value may already be
    /// stale when it is returned and must not drive delivery decisions.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops the worker and waits for it to exit.  Idempotent.
    pub fn shutdown(&self) {
        let Some(thread) = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        self.cancelled.store(true, Ordering::Release);
        // The receiver only disappears if the thread already exited.
        let _ = self.queue.send(QueueItem::Shutdown);
        if thread.join().is_err() {
            warn!("{}: command worker panicked", self.name);
        }
        info!("{}: command worker stopped", self.name);
    }
}

impl Drop for CommandWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State owned by the worker thread.
struct DeliveryLoop {
    connector: Box<dyn Connector>,
    credentials: Credentials,
    connection: Option<Box<dyn Connection>>,
    cancelled: Arc<AtomicBool>,
    state: Arc<Mutex<ConnectionState>>,
    shutdown_connect_attempted: bool,
}

impl DeliveryLoop {
    fn run(mut self, queue: Receiver<QueueItem>) {
        while let Ok(item) = queue.recv() {
            match item {
                QueueItem::Command(command) => self.deliver(&command),
                QueueItem::Shutdown => break,
            }
        }
        self.drop_connection();
        self.set_state(ConnectionState::Stopped);
    }

    fn deliver(&mut self, command: &OutboundCommand) {
        if !self.ensure_connected() {
            debug!("no connection to {}; dropped {command}", self.connector.endpoint());
            return;
        }
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        match connection.send_text(command.payload()) {
            Ok(()) => debug!("sent {command}"),
            Err(e) => {
                warn!("dropped {command}: {e}");
                self.drop_connection();
            }
        }
    }

    /// Returns `true` when an authenticated connection is ready for use.
    fn ensure_connected(&mut self) -> bool {
        if let Some(connection) = self.connection.as_mut() {
            if connection.is_alive() {
                return true;
            }
            debug!("connection to {} is dead", self.connector.endpoint());
            self.drop_connection();
        }

        if self.cancelled.load(Ordering::Acquire) {
            if self.shutdown_connect_attempted {
                return false;
            }
            self.shutdown_connect_attempted = true;
        }

        self.set_state(ConnectionState::Connecting);
        let attempt = self.connector.connect();
        // An attempt that was already in flight when shutdown began still
        // uses up the single connect allowed during teardown.
        if self.cancelled.load(Ordering::Acquire) {
            self.shutdown_connect_attempted = true;
        }
        let mut connection = match attempt {
            Ok(connection) => connection,
            Err(e) => {
                warn!("{e}");
                self.set_state(ConnectionState::Disconnected);
                return false;
            }
        };

        let auth = RemoteAction::authenticate(
            self.credentials.protocol.as_str(),
            self.credentials.password.as_str(),
        );
        let sent = OutboundCommand::from_action(&auth)
            .map(|command| connection.send_text(command.payload()));
        match sent {
            Some(Ok(())) => {
                info!("connected to {}", self.connector.endpoint());
                self.connection = Some(connection);
                self.set_state(ConnectionState::Authenticated);
                true
            }
            Some(Err(e)) => {
                warn!("authentication to {} failed: {e}", self.connector.endpoint());
                connection.close();
                self.set_state(ConnectionState::Disconnected);
                false
            }
            None => {
                connection.close();
                self.set_state(ConnectionState::Disconnected);
                false
            }
        }
    }

    fn drop_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::network::mock::{MockConnector, WireEvent};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);
    const AUTH: &str = r#"{"action":"authenticate","protocol":"600","password":"secret"}"#;

    fn next() -> OutboundCommand {
        OutboundCommand::from_action(&RemoteAction::PresentationTriggerNext).unwrap()
    }

    fn previous() -> OutboundCommand {
        OutboundCommand::from_action(&RemoteAction::PresentationTriggerPrevious).unwrap()
    }

    fn worker(connector: &MockConnector) -> CommandWorker {
        CommandWorker::spawn("test", Box::new(connector.clone()), Credentials::new("secret"))
            .expect("spawn worker")
    }

    #[test]
    fn test_worker_does_not_connect_until_first_command() {
        // Arrange
        let connector = MockConnector::new();

        // Act
        let w = worker(&connector);
        w.shutdown();

        // Assert
        assert!(connector.events().is_empty());
        assert_eq!(w.state(), ConnectionState::Stopped);
    }

    #[test]
    fn test_first_command_connects_and_authenticates_before_sending() {
        // Arrange
        let connector = MockConnector::new();
        let w = worker(&connector);

        // Act
        w.enqueue(next());
        let events = connector.wait_for_events(3, WAIT);

        // Assert
        assert_eq!(
            events,
            vec![
                WireEvent::Connect,
                WireEvent::Send(AUTH.to_string()),
                WireEvent::Send(next().into_payload()),
            ]
        );
        assert_eq!(w.state(), ConnectionState::Authenticated);
    }

    #[test]
    fn test_commands_are_sent_in_submission_order_over_one_connection() {
        let connector = MockConnector::new();
        let w = worker(&connector);

        w.enqueue(next());
        w.enqueue(previous());
        w.enqueue(next());
        w.shutdown();

        assert_eq!(
            connector.sent_payloads(),
            vec![
                AUTH.to_string(),
                next().into_payload(),
                previous().into_payload(),
                next().into_payload(),
            ]
        );
        assert_eq!(connector.connect_count(), 1);
    }

    #[test]
    fn test_shutdown_flushes_queued_commands_and_never_sends_sentinel() {
        // Arrange
        let connector = MockConnector::new();
        let w = worker(&connector);

        // Act: enqueue immediately followed by shutdown
        w.enqueue(next());
        w.enqueue(previous());
        w.shutdown();

        // Assert: auth + both commands, then close; nothing else on the wire
        assert_eq!(
            connector.events(),
            vec![
                WireEvent::Connect,
                WireEvent::Send(AUTH.to_string()),
                WireEvent::Send(next().into_payload()),
                WireEvent::Send(previous().into_payload()),
                WireEvent::Close,
            ]
        );
    }

    #[test]
    fn test_commands_after_shutdown_are_discarded() {
        let connector = MockConnector::new();
        let w = worker(&connector);
        w.shutdown();

        w.enqueue(next());

        assert!(connector.events().is_empty());
    }

    #[test]
    fn test_dead_connection_triggers_single_reconnect_and_auth() {
        // Arrange: one delivered command on a live connection
        let connector = MockConnector::new();
        let w = worker(&connector);
        w.enqueue(next());
        connector.wait_for_events(3, WAIT);

        // Act: peer goes away, then another command
        connector.kill_connection();
        w.enqueue(previous());
        let events = connector.wait_for_events(7, WAIT);

        // Assert
        assert_eq!(
            events[3..],
            [
                WireEvent::Close,
                WireEvent::Connect,
                WireEvent::Send(AUTH.to_string()),
                WireEvent::Send(previous().into_payload()),
            ]
        );
    }

    #[test]
    fn test_refused_connection_drops_command_and_retries_on_next() {
        // Arrange
        let connector = MockConnector::new();
        connector.refuse_connections(true);
        let w = worker(&connector);

        // Act
        w.enqueue(next());
        connector.wait_for_events(1, WAIT);
        connector.refuse_connections(false);
        w.enqueue(previous());
        let events = connector.wait_for_events(4, WAIT);

        // Assert: the first command is gone, the second goes out
        assert_eq!(
            events,
            vec![
                WireEvent::ConnectFailed,
                WireEvent::Connect,
                WireEvent::Send(AUTH.to_string()),
                WireEvent::Send(previous().into_payload()),
            ]
        );
    }

    #[test]
    fn test_send_failure_drops_connection_and_next_command_reconnects() {
        // Arrange
        let connector = MockConnector::new();
        let w = worker(&connector);
        w.enqueue(next());
        connector.wait_for_events(3, WAIT);

        // Act
        connector.fail_sends(true);
        w.enqueue(next());
        connector.wait_for_events(4, WAIT);
        connector.fail_sends(false);
        w.enqueue(previous());
        let events = connector.wait_for_events(7, WAIT);

        // Assert
        assert_eq!(
            events[3..],
            [
                WireEvent::Close,
                WireEvent::Connect,
                WireEvent::Send(AUTH.to_string()),
                WireEvent::Send(previous().into_payload()),
            ]
        );
    }

    #[test]
    fn test_shutdown_makes_at_most_one_connect_attempt() {
        // Arrange: unreachable peer, several queued commands
        let connector = MockConnector::new();
        connector.refuse_connections(true);
        let w = worker(&connector);
        connector.block_connects();
        for _ in 0..3 {
            w.enqueue(next());
        }

        // Act
        let stopper = thread::spawn({
            let connector = connector.clone();
            move || {
                // Let shutdown set the flag before the first connect returns.
                thread::sleep(Duration::from_millis(50));
                connector.unblock_connects();
            }
        });
        w.shutdown();
        stopper.join().unwrap();

        // Assert
        assert_eq!(connector.connect_attempts(), 1);
        assert!(connector.sent_payloads().is_empty());
    }

    #[test]
    fn test_connect_in_flight_at_shutdown_is_the_only_attempt() {
        // Arrange: first command is stuck inside connect, more are queued
        let connector = MockConnector::new();
        connector.refuse_connections(true);
        connector.block_connects();
        let w = worker(&connector);
        for _ in 0..5 {
            w.enqueue(next());
        }
        assert!(connector.wait_for_blocked_connects(1, WAIT));

        // Act
        let stopper = thread::spawn({
            let connector = connector.clone();
            move || {
                thread::sleep(Duration::from_millis(50));
                connector.unblock_connects();
            }
        });
        w.shutdown();
        stopper.join().unwrap();

        // Assert
        assert_eq!(connector.events(), vec![WireEvent::ConnectFailed]);
        assert_eq!(w.state(), ConnectionState::Stopped);
    }

    #[test]
    fn test_shutdown_twice_is_harmless() {
        let connector = MockConnector::new();
        let w = worker(&connector);
        w.enqueue(next());

        w.shutdown();
        w.shutdown();
        drop(w);

        assert_eq!(
            connector
                .events()
                .iter()
                .filter(|e| **e == WireEvent::Close)
                .count(),
            1
        );
    }
}
