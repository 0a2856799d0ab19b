//! In-process sender doubles shared by the unit tests.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::endpoint::Endpoint;
use crate::transport::{DatagramSender, SenderFactory};

type Outbox = Arc<Mutex<Vec<(Endpoint, Vec<u8>)>>>;

/// Records every datagram instead of sending it.
#[derive(Debug)]
pub struct RecordingSender {
    endpoint: Endpoint,
    outbox: Outbox,
    refuse: Arc<AtomicBool>,
}

impl DatagramSender for RecordingSender {
    fn send(&self, datagram: &[u8]) -> io::Result<usize> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        self.outbox
            .lock()
            .unwrap()
            .push((self.endpoint.clone(), datagram.to_vec()));
        Ok(datagram.len())
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// Counts connects and hands out [`RecordingSender`]s sharing one outbox.
#[derive(Debug, Clone, Default)]
pub struct CountingFactory {
    connects: Arc<AtomicUsize>,
    fail_next: Arc<AtomicBool>,
    refuse_sends: Arc<AtomicBool>,
    outbox: Outbox,
}

impl CountingFactory {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make the next `connect` fail.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Make every sender's `send` return `WouldBlock` while set.
    pub fn refuse_sends(&self, refuse: bool) {
        self.refuse_sends.store(refuse, Ordering::SeqCst);
    }

    /// Every datagram sent so far, with the endpoint it went to.
    pub fn sent(&self) -> Vec<(Endpoint, Vec<u8>)> {
        self.outbox.lock().unwrap().clone()
    }
}

impl SenderFactory for CountingFactory {
    fn connect(
        &self,
        endpoint: &Endpoint,
        _remote: SocketAddr,
    ) -> io::Result<Arc<dyn DatagramSender>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "no sockets left"));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(RecordingSender {
            endpoint: endpoint.clone(),
            outbox: Arc::clone(&self.outbox),
            refuse: Arc::clone(&self.refuse_sends),
        }))
    }
}

/// Always fails, counting attempts.
#[derive(Debug, Clone, Default)]
pub struct FailingFactory {
    attempts: Arc<AtomicUsize>,
}

impl FailingFactory {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl SenderFactory for FailingFactory {
    fn connect(
        &self,
        _endpoint: &Endpoint,
        _remote: SocketAddr,
    ) -> io::Result<Arc<dyn DatagramSender>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "no sockets left"))
    }
}
