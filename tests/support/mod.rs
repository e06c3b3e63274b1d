//! Shared test support: a scripted transport double.
#![allow(dead_code)] // each test binary uses a different subset

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use periscope::{Result, Transport, TransportEvent, ViewerError};

/// One scripted delivery.
#[derive(Debug)]
pub enum Step {
    /// Deliver immediately.
    Deliver(TransportEvent),
    /// Deliver only once the driver has sent at least `sends` messages —
    /// sequences the script against the handshake's outbound traffic.
    AfterSends { sends: usize, event: TransportEvent },
}

impl Step {
    pub fn open() -> Self {
        Step::Deliver(TransportEvent::Opened)
    }

    pub fn data(bytes: Vec<u8>) -> Self {
        Step::Deliver(TransportEvent::Data(Bytes::from(bytes)))
    }

    pub fn data_after(sends: usize, bytes: Vec<u8>) -> Self {
        Step::AfterSends { sends, event: TransportEvent::Data(Bytes::from(bytes)) }
    }

    pub fn close_after(sends: usize) -> Self {
        Step::AfterSends { sends, event: TransportEvent::Closed }
    }
}

/// Shared observation point for a [`ScriptedTransport`].
#[derive(Clone)]
pub struct Probe {
    sent: Arc<Mutex<Vec<Bytes>>>,
    delivered: Arc<AtomicUsize>,
}

impl Probe {
    pub fn snapshot(&self) -> Vec<Bytes> {
        self.sent.lock().expect("sent log poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().expect("sent log poisoned").len()
    }

    /// Wait until at least `n` messages were sent; panics after two seconds.
    pub async fn wait_for(&self, n: usize) {
        self.wait_until(|| self.count() >= n, format!("{n} sends")).await;
    }

    /// Wait until the driver has consumed at least `n` scripted events.
    ///
    /// A delivery is counted when `recv` hands it to the driver, and the
    /// driver fully dispatches each event before polling for local intents
    /// again, so this is a safe ordering barrier for tests that interleave
    /// intents with inbound data.
    pub async fn wait_for_delivered(&self, n: usize) {
        self.wait_until(|| self.delivered.load(Ordering::SeqCst) >= n, format!("{n} deliveries"))
            .await;
    }

    async fn wait_until(&self, done: impl Fn() -> bool, what: String) {
        let poll = async {
            while !done() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(2), poll)
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
    }
}

/// Transport double that replays a script and records outbound bytes.
///
/// After the script is exhausted the transport idles open (the driver keeps
/// running until the test drops the connection), unless the script itself
/// ends with a close.
pub struct ScriptedTransport {
    script: VecDeque<Step>,
    probe: Probe,
    open: bool,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Step>) -> (Self, Probe) {
        let probe =
            Probe { sent: Arc::new(Mutex::new(Vec::new())), delivered: Arc::new(AtomicUsize::new(0)) };
        let transport = Self { script: script.into(), probe: probe.clone(), open: false };
        (transport, probe)
    }

    fn deliver(&mut self, event: TransportEvent) -> Result<Option<TransportEvent>> {
        match event {
            TransportEvent::Opened => self.open = true,
            TransportEvent::Closed => self.open = false,
            TransportEvent::Data(_) => {}
        }
        self.probe.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(Some(event))
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn recv(&mut self) -> Result<Option<TransportEvent>> {
        loop {
            match self.script.front() {
                Some(Step::Deliver(_)) => {
                    let Some(Step::Deliver(event)) = self.script.pop_front() else {
                        unreachable!()
                    };
                    return self.deliver(event);
                }
                Some(Step::AfterSends { sends, .. }) => {
                    if self.probe.count() >= *sends {
                        let Some(Step::AfterSends { event, .. }) = self.script.pop_front() else {
                            unreachable!()
                        };
                        return self.deliver(event);
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                None => {
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    async fn send(&mut self, bytes: Bytes) -> Result<()> {
        if !self.open {
            return Err(ViewerError::NotOpen);
        }
        self.probe.sent.lock().expect("sent log poisoned").push(bytes);
        Ok(())
    }
}

/// Build an inbound wire frame: sync marker + tag + LE length + payload.
pub fn framed(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut wire = vec![0x31u8; 4];
    wire.extend_from_slice(tag);
    wire.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    wire.extend_from_slice(payload);
    wire
}

/// A config with the settle window shrunk for tests.
pub fn quick_config() -> periscope::ViewerConfig {
    periscope::ViewerConfig { connect_delay_ms: 5, ..Default::default() }
}
