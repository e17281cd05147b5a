//! Test doubles: a scripted transport and a recording event sink.

use crate::transport::{
    CredentialStore, MediaRef, Transport, TransportContext, TransportError, TransportEvent,
    TransportFactory,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use switchboard_core::{UserId, WebhookEvent};
use switchboard_webhooks::EventSink;

/// A message handed to [`ScriptedTransport::send`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub address: String,
    pub content: String,
    pub media: Option<MediaRef>,
}

#[derive(Debug, Clone, Default)]
struct Script {
    start_events: Vec<TransportEvent>,
    create_delay: Duration,
    start_delay: Duration,
    send_delay: Duration,
    fail_create: bool,
    fail_start: bool,
    fail_send: bool,
    fail_destroy: bool,
}

/// Transport whose behaviour is fixed up front
#[derive(Debug)]
pub struct ScriptedTransport {
    user_id: UserId,
    credentials: CredentialStore,
    context: TransportContext,
    script: Script,
    sent: Mutex<Vec<SentMessage>>,
    destroyed: AtomicBool,
}

impl ScriptedTransport {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Push an event to the registry as the network would
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.context.emit(event)
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.context.cancellation().is_cancelled()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn start(&self) -> Result<(), TransportError> {
        for event in self.script.start_events.iter().cloned() {
            self.context.emit(event);
        }
        tokio::time::sleep(self.script.start_delay).await;
        if self.script.fail_start {
            return Err(TransportError::Connect("scripted bootstrap failure".into()));
        }
        Ok(())
    }

    async fn send(
        &self,
        address: &str,
        content: &str,
        media: Option<&MediaRef>,
    ) -> Result<(), TransportError> {
        tokio::time::sleep(self.script.send_delay).await;
        if self.script.fail_send {
            return Err(TransportError::Send("scripted send failure".into()));
        }
        self.sent.lock().push(SentMessage {
            address: address.to_string(),
            content: content.to_string(),
            media: media.cloned(),
        });
        Ok(())
    }

    async fn destroy(&self) -> Result<(), TransportError> {
        self.destroyed.store(true, Ordering::SeqCst);
        if self.script.fail_destroy {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

/// Factory producing [`ScriptedTransport`]s and remembering each of them
#[derive(Debug, Default)]
pub struct ScriptedTransportFactory {
    script: Script,
    created: AtomicUsize,
    transports: Mutex<Vec<Arc<ScriptedTransport>>>,
}

impl ScriptedTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events emitted at the start of every bootstrap
    pub fn with_start_events(mut self, events: impl IntoIterator<Item = TransportEvent>) -> Self {
        self.script.start_events = events.into_iter().collect();
        self
    }

    /// Emit a challenge followed by authenticated and ready on bootstrap
    pub fn connecting() -> Self {
        Self::new().with_start_events([
            TransportEvent::Challenge("scripted-challenge".into()),
            TransportEvent::Authenticated,
            TransportEvent::Ready,
        ])
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.script.create_delay = delay;
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.script.start_delay = delay;
        self
    }

    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.script.send_delay = delay;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.script.fail_create = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.script.fail_start = true;
        self
    }

    pub fn failing_send(mut self) -> Self {
        self.script.fail_send = true;
        self
    }

    pub fn failing_destroy(mut self) -> Self {
        self.script.fail_destroy = true;
        self
    }

    /// Number of successful constructions
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Most recently constructed transport
    pub fn last(&self) -> Option<Arc<ScriptedTransport>> {
        self.transports.lock().last().cloned()
    }

    /// Every transport constructed so far
    pub fn transports(&self) -> Vec<Arc<ScriptedTransport>> {
        self.transports.lock().clone()
    }
}

#[async_trait]
impl TransportFactory for ScriptedTransportFactory {
    async fn create(
        &self,
        user_id: UserId,
        credentials: CredentialStore,
        context: TransportContext,
    ) -> Result<Arc<dyn Transport>, TransportError> {
        tokio::time::sleep(self.script.create_delay).await;
        if self.script.fail_create {
            return Err(TransportError::Connect("scripted construction failure".into()));
        }

        let transport = Arc::new(ScriptedTransport {
            user_id,
            credentials,
            context,
            script: self.script.clone(),
            sent: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
        });
        self.created.fetch_add(1, Ordering::SeqCst);
        self.transports.lock().push(transport.clone());
        Ok(transport)
    }
}

/// Event sink that keeps every event it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(UserId, WebhookEvent)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(UserId, WebhookEvent)> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for RecordingSink {
    fn trigger_event(&self, user_id: UserId, event: WebhookEvent) {
        self.events.lock().push((user_id, event));
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
