//! Downlink dispatch to the application callback.
//!
//! Downlinks surface on the read path while some other command is being
//! awaited, so delivery has to be a side channel: the driver owns at most
//! one registered callback and forwards every classified downlink to it
//! synchronously, before the read loop resumes. There are no globals and
//! no queues; an event with no callback registered is logged and dropped.

use tracing::{debug, trace};

use asr650x_protocol::DownlinkEvent;

/// Callback invoked for every received downlink.
///
/// Callbacks must not panic; a panic unwinds through the driver's read
/// loop and poisons the command in flight.
pub type DownlinkCallback = Box<dyn FnMut(&DownlinkEvent) + Send>;

/// Holds the registered downlink callback, if any.
///
/// Last registration wins. Dispatch is synchronous and completes before
/// the caller continues reading.
#[derive(Default)]
pub struct DownlinkDispatcher {
    callback: Option<DownlinkCallback>,
}

impl DownlinkDispatcher {
    /// Create a dispatcher with no callback registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback, replacing any previous registration.
    pub fn set(&mut self, callback: DownlinkCallback) {
        self.callback = Some(callback);
    }

    /// Remove the registered callback.
    pub fn clear(&mut self) {
        self.callback = None;
    }

    /// Returns `true` if a callback is registered.
    #[must_use]
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Deliver one event. Returns `true` if a callback consumed it.
    pub fn dispatch(&mut self, event: &DownlinkEvent) -> bool {
        match self.callback.as_mut() {
            Some(callback) => {
                trace!(%event, "Dispatching downlink");
                callback(event);
                true
            }
            None => {
                debug!(%event, "Downlink dropped: no callback registered");
                false
            }
        }
    }
}

impl std::fmt::Debug for DownlinkDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownlinkDispatcher")
            .field("has_callback", &self.has_callback())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asr650x_protocol::DownlinkKind;
    use std::sync::{Arc, Mutex};

    fn sample_event() -> DownlinkEvent {
        DownlinkEvent {
            kind: DownlinkKind::Confirmed,
            port: 5,
            length: 3,
            payload: "AABBCC".to_string(),
        }
    }

    #[test]
    fn test_dispatch_without_callback_drops() {
        let mut dispatcher = DownlinkDispatcher::new();
        assert!(!dispatcher.has_callback());
        assert!(!dispatcher.dispatch(&sample_event()));
    }

    #[test]
    fn test_dispatch_invokes_callback() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        let mut dispatcher = DownlinkDispatcher::new();
        dispatcher.set(Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        }));

        assert!(dispatcher.dispatch(&sample_event()));
        assert!(dispatcher.dispatch(&sample_event()));

        let events = received.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].port, 5);
        assert_eq!(events[0].payload, "AABBCC");
    }

    #[test]
    fn test_last_registration_wins() {
        let first = Arc::new(Mutex::new(0u32));
        let second = Arc::new(Mutex::new(0u32));

        let mut dispatcher = DownlinkDispatcher::new();
        let counter = Arc::clone(&first);
        dispatcher.set(Box::new(move |_| *counter.lock().unwrap() += 1));
        let counter = Arc::clone(&second);
        dispatcher.set(Box::new(move |_| *counter.lock().unwrap() += 1));

        dispatcher.dispatch(&sample_event());
        assert_eq!(*first.lock().unwrap(), 0);
        assert_eq!(*second.lock().unwrap(), 1);
    }

    #[test]
    fn test_clear_removes_callback() {
        let mut dispatcher = DownlinkDispatcher::new();
        dispatcher.set(Box::new(|_| {}));
        assert!(dispatcher.has_callback());

        dispatcher.clear();
        assert!(!dispatcher.has_callback());
        assert!(!dispatcher.dispatch(&sample_event()));
    }
}
