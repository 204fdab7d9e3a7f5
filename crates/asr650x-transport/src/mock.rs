//! Mock transport for testing and development without hardware.
//!
//! The mock is driven by a [`MockTransportHandle`]: tests script the reply
//! batch each written line should produce, inject unsolicited lines (the
//! module volunteers downlinks and join outcomes at its own pace), and
//! inspect everything the code under test wrote.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{Result, Transport, TransportError};

/// Scripted state shared between the transport and its handle.
#[derive(Debug, Default)]
struct MockState {
    /// Reply batches, one consumed per written line.
    script: VecDeque<Vec<String>>,

    /// Every line written, in order.
    writes: Vec<String>,
}

/// Scripted in-memory transport.
///
/// Reads first drain the replies scripted for lines already written, then
/// wait on the unsolicited-line channel. A read with nothing available
/// times out exactly like a silent serial port.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use asr650x_transport::{MockTransport, Transport};
///
/// #[tokio::main]
/// async fn main() -> asr650x_transport::Result<()> {
///     let (mut transport, handle) = MockTransport::new();
///     handle.enqueue_replies(["OK"]);
///
///     transport.write_line("AT+CSAVE").await?;
///     let reply = transport.read_line(Duration::from_millis(100)).await?;
///     assert_eq!(reply, "OK");
///     assert_eq!(handle.writes(), vec!["AT+CSAVE"]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    /// Channel receiver for unsolicited lines.
    injected_rx: mpsc::Receiver<String>,

    /// Replies already released by writes, waiting to be read.
    pending: VecDeque<String>,

    /// State shared with the handle.
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a mock transport and its controlling handle.
    pub fn new() -> (Self, MockTransportHandle) {
        let (injected_tx, injected_rx) = mpsc::channel(32);
        let state = Arc::new(Mutex::new(MockState::default()));

        let transport = MockTransport {
            injected_rx,
            pending: VecDeque::new(),
            state: Arc::clone(&state),
        };

        let handle = MockTransportHandle { injected_tx, state };

        (transport, handle)
    }
}

impl Transport for MockTransport {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut state = self.state.lock().expect("mock state lock poisoned");
        state.writes.push(line.to_string());

        if let Some(batch) = state.script.pop_front() {
            self.pending.extend(batch);
        }
        Ok(())
    }

    async fn read_line(&mut self, deadline: Duration) -> Result<String> {
        if let Some(line) = self.pending.pop_front() {
            return Ok(line);
        }

        match tokio::time::timeout(deadline, self.injected_rx.recv()).await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(TransportError::Closed),
            Err(_) => Err(TransportError::ReadTimeout(deadline.as_millis() as u64)),
        }
    }
}

/// Handle for controlling a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    /// Channel sender for unsolicited lines.
    injected_tx: mpsc::Sender<String>,

    /// State shared with the transport.
    state: Arc<Mutex<MockState>>,
}

impl MockTransportHandle {
    /// Script the reply batch released by the next unscripted write.
    ///
    /// Batches are consumed in FIFO order, one per written line. A write
    /// with no scripted batch releases nothing, which models a module
    /// that stays silent.
    pub fn enqueue_replies<I, S>(&self, replies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let batch = replies.into_iter().map(Into::into).collect();
        self.state
            .lock()
            .expect("mock state lock poisoned")
            .script
            .push_back(batch);
    }

    /// Inject a line the module sends on its own, such as a delayed
    /// `+CJOIN:OK` or a downlink notification.
    ///
    /// # Errors
    /// Returns [`TransportError::Closed`] if the transport was dropped.
    pub async fn inject_line(&self, line: impl Into<String>) -> Result<()> {
        self.injected_tx
            .send(line.into())
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Get every line written so far, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("mock state lock poisoned")
            .writes
            .clone()
    }

    /// Number of lines written so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state
            .lock()
            .expect("mock state lock poisoned")
            .writes
            .len()
    }
}
