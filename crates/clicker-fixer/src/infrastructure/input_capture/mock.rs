//! Mock input source for unit and integration testing.
//!
//! Allows tests to inject synthetic [`RawInputEvent`]s without a kernel
//! driver, map device handles to hardware identity strings, and observe
//! which events were passed through.
//!
//! The mock is cheaply cloneable: all clones share the same channel and
//! records, so a test keeps one clone while the dispatcher owns another.

use std::collections::HashMap;
use std::sync::{
    mpsc::{self, Receiver, RecvTimeoutError, Sender},
    Arc, Mutex,
};
use std::time::Duration;

use clicker_core::{DeviceId, RawInputEvent};

use super::{CaptureError, InputSource, Received};

/// A mock implementation of [`InputSource`].
#[derive(Clone)]
pub struct MockInputSource {
    sender: Arc<Mutex<Option<Sender<RawInputEvent>>>>,
    receiver: Arc<Mutex<Receiver<RawInputEvent>>>,
    identities: Arc<Mutex<HashMap<DeviceId, String>>>,
    forwarded: Arc<Mutex<Vec<RawInputEvent>>>,
}

impl MockInputSource {
    /// Creates a new, open mock source.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            sender: Arc::new(Mutex::new(Some(tx))),
            receiver: Arc::new(Mutex::new(rx)),
            identities: Arc::new(Mutex::new(HashMap::new())),
            forwarded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Associates `device` with a hardware identity string.
    pub fn register_device(&self, device: DeviceId, identity: impl Into<String>) {
        self.identities
            .lock()
            .expect("lock poisoned")
            .insert(device, identity.into());
    }

    /// Injects a synthetic event, as if captured from hardware.
    ///
    /// Panics if [`close`](Self::close) has been called.
    pub fn inject_event(&self, event: RawInputEvent) {
        let guard = self.sender.lock().expect("lock poisoned");
        match *guard {
            Some(ref sender) => sender.send(event).expect("receiver alive"),
            None => panic!("MockInputSource::inject_event called after close()"),
        }
    }

    /// Ends the stream.  Already injected events are still delivered first.
    pub fn close(&self) {
        *self.sender.lock().expect("lock poisoned") = None;
    }

    /// Events handed back through [`InputSource::pass_through`], in order.
    pub fn forwarded(&self) -> Vec<RawInputEvent> {
        self.forwarded.lock().expect("lock poisoned").clone()
    }
}

impl Default for MockInputSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for MockInputSource {
    fn receive(&mut self, timeout: Duration) -> Result<Received, CaptureError> {
        let rx = self.receiver.lock().expect("lock poisoned");
        match rx.recv_timeout(timeout) {
            Ok(event) => Ok(Received::Event(event)),
            Err(RecvTimeoutError::Timeout) => Ok(Received::Idle),
            Err(RecvTimeoutError::Disconnected) => Ok(Received::Closed),
        }
    }

    fn pass_through(&mut self, event: &RawInputEvent) -> Result<(), CaptureError> {
        self.forwarded.lock().expect("lock poisoned").push(*event);
        Ok(())
    }

    fn hardware_id(&mut self, device: DeviceId) -> Option<String> {
        self.identities
            .lock()
            .expect("lock poisoned")
            .get(&device)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clicker_core::KeyState;

    const TICK: Duration = Duration::from_millis(10);

    #[test]
    fn test_mock_input_source_delivers_injected_events() {
        // Arrange
        let mut source = MockInputSource::new();
        let event = RawInputEvent::keyboard(DeviceId(1), 0x4D, KeyState::ExtendedMake);

        // Act
        source.inject_event(event);

        // Assert
        assert_eq!(source.receive(TICK).unwrap(), Received::Event(event));
    }

    #[test]
    fn test_mock_input_source_reports_idle_on_timeout() {
        let mut source = MockInputSource::new();
        assert_eq!(source.receive(TICK).unwrap(), Received::Idle);
    }

    #[test]
    fn test_mock_input_source_close_drains_then_reports_closed() {
        // Arrange
        let mut source = MockInputSource::new();
        let event = RawInputEvent::keyboard(DeviceId(2), 0x1E, KeyState::Make);
        source.inject_event(event);

        // Act
        source.close();

        // Assert
        assert_eq!(source.receive(TICK).unwrap(), Received::Event(event));
        assert_eq!(source.receive(TICK).unwrap(), Received::Closed);
    }

    #[test]
    fn test_mock_input_source_clones_share_records() {
        // Arrange
        let observer = MockInputSource::new();
        let mut owned = observer.clone();
        observer.register_device(DeviceId(7), "HID\\VID_046D&PID_C540");
        let event = RawInputEvent::keyboard(DeviceId(7), 0x4B, KeyState::ExtendedMake);

        // Act
        owned.pass_through(&event).unwrap();

        // Assert
        assert_eq!(observer.forwarded(), vec![event]);
        assert_eq!(
            owned.hardware_id(DeviceId(7)).as_deref(),
            Some("HID\\VID_046D&PID_C540")
        );
        assert_eq!(owned.hardware_id(DeviceId(8)), None);
    }
}
