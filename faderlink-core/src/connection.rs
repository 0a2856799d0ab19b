//! Connection manager: owns the one live sender.
//!
//! Host and port text flows in through [`ConnectionManager::set_host`] and
//! [`ConnectionManager::set_port`]; once the pair is valid and changed, a
//! new sender is built and published. Publication goes through a
//! `tokio::sync::watch` channel holding an immutable `Arc`, so readers on
//! any thread see either the previous sender or the new one.
//!
//! IP literals connect on the spot. Host names are looked up on the tokio
//! runtime; the result is picked up by [`ConnectionManager::poll_resolution`]
//! on a later frame.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::endpoint::{Endpoint, EndpointEditor, HostPolicy};
use crate::error::FaderError;
use crate::persist::EndpointStore;
use crate::transport::{self, DatagramSender, SenderFactory, UdpSenderFactory};

type Published = Option<Arc<dyn DatagramSender>>;

// ── ConnectionStatus ─────────────────────────────────────────────

/// Observable connection state for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No endpoint has been applied yet.
    #[default]
    Disconnected,

    /// The host name is being looked up; nothing is sent meanwhile.
    Resolving(Endpoint),

    /// A sender for this endpoint is live.
    Connected(Endpoint),

    /// The last valid endpoint could not be turned into a sender.
    /// Transmission stays paused until a new or re-confirmed endpoint.
    Failed { endpoint: Endpoint, reason: String },
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Resolving(ep) => write!(f, "Resolving {ep}"),
            Self::Connected(ep) => write!(f, "Connected to {ep}"),
            Self::Failed { endpoint, reason } => {
                write!(f, "Connection to {endpoint} failed: {reason}")
            }
        }
    }
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self, Self::Resolving(_))
    }
}

// ── SenderHandle ─────────────────────────────────────────────────

/// Read-only view of the manager's current sender.
///
/// Holders ask for the sender on every send and never keep it longer.
#[derive(Debug, Clone)]
pub struct SenderHandle {
    rx: watch::Receiver<Published>,
}

impl SenderHandle {
    /// The sender live right now, if any.
    pub fn current(&self) -> Option<Arc<dyn DatagramSender>> {
        self.rx.borrow().clone()
    }

    /// `true` once after each reconnect or teardown.
    pub fn take_changed(&mut self) -> bool {
        match self.rx.has_changed() {
            Ok(true) => {
                self.rx.borrow_and_update();
                true
            }
            _ => false,
        }
    }
}

// ── ConnectionManager ────────────────────────────────────────────

/// A host-name lookup in flight.
#[derive(Debug)]
struct Resolution {
    endpoint: Endpoint,
    rx: oneshot::Receiver<io::Result<SocketAddr>>,
}

/// Validates endpoint input, (re)builds the sender and persists the last
/// good endpoint.
pub struct ConnectionManager {
    editor: EndpointEditor,
    factory: Box<dyn SenderFactory>,
    store: Box<dyn EndpointStore>,
    sender_tx: watch::Sender<Published>,
    status_tx: watch::Sender<ConnectionStatus>,
    applied: Option<Endpoint>,
    pending: Option<Resolution>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("editor", &self.editor)
            .field("applied", &self.applied)
            .field("pending", &self.pending.as_ref().map(|p| &p.endpoint))
            .field("status", &*self.status_tx.borrow())
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(
        policy: HostPolicy,
        factory: Box<dyn SenderFactory>,
        store: Box<dyn EndpointStore>,
    ) -> Self {
        let (sender_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            editor: EndpointEditor::new(policy),
            factory,
            store,
            sender_tx,
            status_tx,
            applied: None,
            pending: None,
        }
    }

    /// Manager sending over real UDP sockets.
    pub fn udp(policy: HostPolicy, store: Box<dyn EndpointStore>) -> Self {
        Self::new(policy, Box::new(UdpSenderFactory), store)
    }

    /// Host and port field state, for display.
    pub fn editor(&self) -> &EndpointEditor {
        &self.editor
    }

    /// Validate host text and reconnect if the endpoint became ready.
    ///
    /// Only validation errors are returned; they leave any working
    /// connection untouched. Connection failures show up in [`status`].
    ///
    /// [`status`]: Self::status
    pub fn set_host(&mut self, text: &str) -> Result<(), FaderError> {
        if let Some(endpoint) = self.editor.set_host(text)? {
            self.apply(endpoint);
        }
        Ok(())
    }

    /// Validate port text and reconnect if the endpoint became ready.
    pub fn set_port(&mut self, text: &str) -> Result<(), FaderError> {
        if let Some(endpoint) = self.editor.set_port(text)? {
            self.apply(endpoint);
        }
        Ok(())
    }

    fn apply(&mut self, endpoint: Endpoint) {
        if let Err(e) = self.on_endpoint_ready(endpoint) {
            debug!(error = %e, "connection failure published");
        }
    }

    /// Replace the live sender with one bound to `endpoint`.
    ///
    /// On failure the old sender is dropped too, the status becomes
    /// `Failed` and nothing is retried until the endpoint is supplied again.
    /// A host name starts a lookup on the current tokio runtime and
    /// returns at once with status `Resolving`; without a runtime the
    /// connection fails.
    pub fn on_endpoint_ready(&mut self, endpoint: Endpoint) -> Result<(), FaderError> {
        // A newer endpoint supersedes any lookup still in flight.
        self.pending = None;
        match endpoint.socket_addr() {
            Some(remote) => self.connect_to(endpoint, remote),
            None => self.begin_resolve(endpoint),
        }
    }

    /// Pick up a finished host-name lookup and connect to its result.
    ///
    /// Call once per frame. `None` while no lookup has finished.
    pub fn poll_resolution(&mut self) -> Option<Result<(), FaderError>> {
        let pending = self.pending.as_mut()?;
        let result = match pending.rx.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(io::Error::other("host lookup was cancelled"))
            }
        };
        let endpoint = self.pending.take()?.endpoint;
        Some(match result {
            Ok(remote) => self.connect_to(endpoint, remote),
            Err(source) => self.fail(endpoint, source),
        })
    }

    fn begin_resolve(&mut self, endpoint: Endpoint) -> Result<(), FaderError> {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => return self.fail(endpoint, io::Error::other(e)),
        };

        self.sender_tx.send_replace(None);
        self.applied = None;

        let (tx, rx) = oneshot::channel();
        let target = endpoint.clone();
        handle.spawn(async move {
            // The manager may have moved on; a dropped receiver is fine.
            let _ = tx.send(transport::resolve(&target).await);
        });

        info!(%endpoint, "resolving");
        self.status_tx
            .send_replace(ConnectionStatus::Resolving(endpoint.clone()));
        self.pending = Some(Resolution { endpoint, rx });
        Ok(())
    }

    fn connect_to(&mut self, endpoint: Endpoint, remote: SocketAddr) -> Result<(), FaderError> {
        match self.factory.connect(&endpoint, remote) {
            Ok(sender) => {
                // The swap drops the previous sender.
                self.sender_tx.send_replace(Some(sender));
                self.applied = Some(endpoint.clone());
                info!(%endpoint, %remote, "connected");
                self.status_tx
                    .send_replace(ConnectionStatus::Connected(endpoint));
                if let Err(e) = self.save() {
                    warn!(error = %e, "could not save endpoint");
                }
                Ok(())
            }
            Err(source) => self.fail(endpoint, source),
        }
    }

    fn fail(&mut self, endpoint: Endpoint, source: io::Error) -> Result<(), FaderError> {
        self.sender_tx.send_replace(None);
        self.applied = None;
        self.editor.rearm();
        warn!(%endpoint, error = %source, "connection failed");
        self.status_tx.send_replace(ConnectionStatus::Failed {
            endpoint: endpoint.clone(),
            reason: source.to_string(),
        });
        Err(FaderError::ConnectionFailed { endpoint, source })
    }

    /// The live sender, if any.
    pub fn active_sender(&self) -> Option<Arc<dyn DatagramSender>> {
        self.sender_tx.borrow().clone()
    }

    /// A handle for components that send through this manager.
    pub fn subscribe(&self) -> SenderHandle {
        SenderHandle {
            rx: self.sender_tx.subscribe(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status_tx.borrow().clone()
    }

    pub fn status_receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// The endpoint the live sender was built for.
    pub fn applied(&self) -> Option<&Endpoint> {
        self.applied.as_ref()
    }

    /// Persist the last successfully applied endpoint.
    pub fn save(&mut self) -> Result<(), FaderError> {
        match &self.applied {
            Some(endpoint) => {
                self.store.save(endpoint)?;
                info!(%endpoint, "endpoint saved");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Replay the stored endpoint through the interactive validation path.
    ///
    /// Missing or malformed data leaves the manager disconnected; returns
    /// the endpoint that ended up connected. A saved host name is still
    /// resolving when this returns.
    pub fn load(&mut self) -> Option<Endpoint> {
        let stored = match self.store.load() {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "could not read saved endpoint");
                return None;
            }
        };

        if let Some(host) = stored.host.as_deref() {
            if let Err(e) = self.set_host(host) {
                warn!(error = %e, "saved host ignored");
            }
        }
        if let Some(port) = stored.port.as_deref() {
            if let Err(e) = self.set_port(port) {
                warn!(error = %e, "saved port ignored");
            }
        }

        let applied = self.applied.clone();
        if let Some(endpoint) = &applied {
            info!(%endpoint, "restored saved endpoint");
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryEndpointStore;
    use crate::test_support::{CountingFactory, FailingFactory};

    fn manager(factory: &CountingFactory) -> ConnectionManager {
        ConnectionManager::new(
            HostPolicy::IpLiteral,
            Box::new(factory.clone()),
            Box::new(MemoryEndpointStore::new()),
        )
    }

    #[test]
    fn valid_pair_connects_once() {
        let factory = CountingFactory::default();
        let mut mgr = manager(&factory);

        mgr.set_host("192.168.1.50").unwrap();
        assert!(mgr.active_sender().is_none());
        mgr.set_port("8000").unwrap();

        assert!(mgr.editor().is_valid());
        assert_eq!(factory.connects(), 1);
        let sender = mgr.active_sender().expect("sender");
        assert_eq!(sender.endpoint().to_string(), "192.168.1.50:8000");
        assert!(mgr.status().is_connected());
    }

    #[test]
    fn same_host_twice_does_not_reconnect() {
        let factory = CountingFactory::default();
        let mut mgr = manager(&factory);
        mgr.set_port("8000").unwrap();
        mgr.set_host("10.0.0.1").unwrap();
        mgr.set_host("10.0.0.1").unwrap();
        assert_eq!(factory.connects(), 1);
    }

    #[test]
    fn invalid_host_keeps_previous_sender() {
        let factory = CountingFactory::default();
        let mut mgr = manager(&factory);
        mgr.set_host("10.0.0.1").unwrap();
        mgr.set_port("8000").unwrap();

        let err = mgr.set_host("not-an-ip").unwrap_err();
        assert!(matches!(err, FaderError::InvalidAddress(_)));
        assert_eq!(factory.connects(), 1);
        let sender = mgr.active_sender().expect("previous sender kept");
        assert_eq!(sender.endpoint().host(), "10.0.0.1");
        assert_eq!(mgr.editor().host_status().message(), Some("Invalid IP Address"));
    }

    #[test]
    fn invalid_host_without_previous_creates_nothing() {
        let factory = CountingFactory::default();
        let mut mgr = manager(&factory);
        assert!(mgr.set_host("not-an-ip").is_err());
        mgr.set_port("8000").unwrap();
        assert_eq!(factory.connects(), 0);
        assert!(mgr.active_sender().is_none());
    }

    #[test]
    fn failed_connection_clears_sender_and_allows_reconfirm() {
        let factory = FailingFactory::default();
        let mut mgr = ConnectionManager::new(
            HostPolicy::IpLiteral,
            Box::new(factory.clone()),
            Box::new(MemoryEndpointStore::new()),
        );
        mgr.set_host("10.0.0.1").unwrap();
        // Connection failures are reported through the status only.
        mgr.set_port("8000").unwrap();
        assert!(mgr.active_sender().is_none());
        assert!(matches!(mgr.status(), ConnectionStatus::Failed { .. }));

        // Re-confirming the same value tries again.
        mgr.set_port("8000").unwrap();
        assert_eq!(factory.attempts(), 2);

        let endpoint = mgr.editor().endpoint().unwrap();
        let err = mgr.on_endpoint_ready(endpoint).unwrap_err();
        assert!(matches!(err, FaderError::ConnectionFailed { .. }));
        assert_eq!(factory.attempts(), 3);
    }

    #[test]
    fn failure_tears_down_previous_sender() {
        let factory = CountingFactory::default();
        let mut mgr = manager(&factory);
        mgr.set_host("10.0.0.1").unwrap();
        mgr.set_port("8000").unwrap();

        factory.fail_next();
        mgr.set_port("9000").unwrap();
        assert!(mgr.active_sender().is_none());

        mgr.set_port("9001").unwrap();
        assert_eq!(mgr.active_sender().unwrap().endpoint().port(), 9001);
    }

    #[test]
    fn reconnect_swaps_sender_and_notifies_handle() {
        let factory = CountingFactory::default();
        let mut mgr = manager(&factory);
        let mut handle = mgr.subscribe();
        assert!(!handle.take_changed());

        mgr.set_host("10.0.0.1").unwrap();
        mgr.set_port("8000").unwrap();
        assert!(handle.take_changed());
        assert!(!handle.take_changed());
        let first = handle.current().unwrap();

        mgr.set_host("10.0.0.2").unwrap();
        assert!(handle.take_changed());
        let second = handle.current().unwrap();
        assert_eq!(first.endpoint().host(), "10.0.0.1");
        assert_eq!(second.endpoint().host(), "10.0.0.2");
        assert_eq!(factory.connects(), 2);
    }

    #[test]
    fn status_receiver_observes_changes() {
        let factory = CountingFactory::default();
        let mut mgr = manager(&factory);
        let mut rx = mgr.status_receiver();
        mgr.set_host("10.0.0.1").unwrap();
        mgr.set_port("8000").unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().to_string(), "Connected to 10.0.0.1:8000");
    }

    #[test]
    fn successful_connect_is_saved_and_reloaded() {
        let factory = CountingFactory::default();
        let store = MemoryEndpointStore::new();
        let mut mgr = ConnectionManager::new(
            HostPolicy::IpLiteral,
            Box::new(factory.clone()),
            Box::new(store.clone()),
        );
        mgr.set_host(" 192.168.1.50 ").unwrap();
        mgr.set_port("8000 ").unwrap();

        let saved = store.get().unwrap();
        assert_eq!(saved.host.as_deref(), Some("192.168.1.50"));
        assert_eq!(saved.port.as_deref(), Some("8000"));

        let mut restored = ConnectionManager::new(
            HostPolicy::IpLiteral,
            Box::new(factory.clone()),
            Box::new(store),
        );
        let endpoint = restored.load().expect("restored");
        assert_eq!(Some(&endpoint), mgr.applied());
        assert!(restored.active_sender().is_some());
    }

    #[test]
    fn corrupt_store_degrades_to_disconnected() {
        let factory = CountingFactory::default();
        let mut mgr = ConnectionManager::new(
            HostPolicy::IpLiteral,
            Box::new(factory.clone()),
            Box::new(MemoryEndpointStore::with_contents("garbage!", "99999")),
        );
        assert_eq!(mgr.load(), None);
        assert!(mgr.active_sender().is_none());
        assert_eq!(mgr.status(), ConnectionStatus::Disconnected);
        assert_eq!(factory.connects(), 0);
    }

    #[test]
    fn empty_store_loads_nothing() {
        let factory = CountingFactory::default();
        let mut mgr = manager(&factory);
        assert_eq!(mgr.load(), None);
    }

    // ── Host names ───────────────────────────────────────────────

    fn hostname_manager(factory: &CountingFactory) -> ConnectionManager {
        ConnectionManager::new(
            HostPolicy::AllowHostnames,
            Box::new(factory.clone()),
            Box::new(MemoryEndpointStore::new()),
        )
    }

    async fn wait_for_resolution(mgr: &mut ConnectionManager) -> Result<(), FaderError> {
        let wait = async {
            loop {
                if let Some(result) = mgr.poll_resolution() {
                    return result;
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(std::time::Duration::from_secs(10), wait)
            .await
            .expect("lookup did not finish")
    }

    #[tokio::test]
    async fn hostname_is_resolved_in_the_background() {
        let factory = CountingFactory::default();
        let mut mgr = hostname_manager(&factory);
        mgr.set_port("9000").unwrap();
        mgr.set_host("localhost").unwrap();

        // set_host returned before the lookup ran.
        assert!(mgr.status().is_resolving());
        assert!(mgr.active_sender().is_none());
        assert_eq!(factory.connects(), 0);
        assert!(mgr.poll_resolution().is_none());

        wait_for_resolution(&mut mgr).await.unwrap();
        assert_eq!(factory.connects(), 1);
        assert!(mgr.status().is_connected());
        assert_eq!(mgr.active_sender().unwrap().endpoint().host(), "localhost");
    }

    #[tokio::test]
    async fn newer_endpoint_supersedes_lookup() {
        let factory = CountingFactory::default();
        let mut mgr = hostname_manager(&factory);
        mgr.set_port("9000").unwrap();
        mgr.set_host("localhost").unwrap();
        mgr.set_host("10.0.0.1").unwrap();

        assert!(mgr.status().is_connected());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(mgr.poll_resolution().is_none());
        assert_eq!(factory.connects(), 1);
        assert_eq!(mgr.active_sender().unwrap().endpoint().host(), "10.0.0.1");
    }

    #[tokio::test]
    async fn lookup_tears_down_previous_sender() {
        let factory = CountingFactory::default();
        let mut mgr = hostname_manager(&factory);
        mgr.set_host("10.0.0.1").unwrap();
        mgr.set_port("9000").unwrap();
        assert!(mgr.active_sender().is_some());

        mgr.set_host("localhost").unwrap();
        assert!(mgr.active_sender().is_none());
        assert_eq!(mgr.applied(), None);
    }

    #[test]
    fn hostname_without_runtime_fails() {
        let factory = CountingFactory::default();
        let mut mgr = hostname_manager(&factory);
        mgr.set_port("9000").unwrap();
        mgr.set_host("localhost").unwrap();
        assert!(matches!(mgr.status(), ConnectionStatus::Failed { .. }));
        assert!(mgr.poll_resolution().is_none());
        assert_eq!(factory.connects(), 0);
    }
}
