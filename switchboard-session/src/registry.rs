//! Per-user session registry.

use crate::challenge::Challenge;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::media::{self, MediaStorage, UploadedMedia};
use crate::message_store::MessageStore;
use crate::state::{Effect, LifecycleEvent, SessionState, transition};
use crate::transport::{
    CredentialStore, InboundMessage, MediaRef, Transport, TransportContext, TransportError,
    TransportEvent, TransportFactory,
};
use bytes::Bytes;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use switchboard_core::{
    Message, MessageId, MessageReceivedData, MessageSentData, MessageStatus, MessageStatusData,
    MessageType, NewMessage, UserId, ValidationError, phone,
};
use switchboard_webhooks::EventSink;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Content of an inbound message whose media could not be stored
pub const MEDIA_UNAVAILABLE: &str = "[media unavailable]";

/// Snapshot returned by [`SessionRegistry::status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub initialized: bool,
    pub ready: bool,
    pub has_challenge: bool,
}

/// An outbound message request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub phone_number: String,
    pub content: String,
    pub message_type: MessageType,
    pub media_url: Option<String>,
}

impl OutboundMessage {
    /// Plain text message
    pub fn text(phone_number: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            content: content.into(),
            message_type: MessageType::Text,
            media_url: None,
        }
    }

    /// Attach media; `content` becomes the caption
    pub fn with_media(mut self, message_type: MessageType, url: impl Into<String>) -> Self {
        self.message_type = message_type;
        self.media_url = Some(url.into());
        self
    }

    fn validate(&self) -> Result<(), ValidationError> {
        phone::validate(&self.phone_number)?;
        if !self.message_type.is_media() && self.content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(())
    }

    fn media_ref(&self) -> Option<MediaRef> {
        match (&self.media_url, self.message_type.is_media()) {
            (Some(url), true) => Some(MediaRef {
                url: url.clone(),
                message_type: self.message_type,
            }),
            _ => None,
        }
    }
}

struct Session {
    state: SessionState,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
    generation: u64,
}

/// Per-user slot: `op` serializes mutating operations, `session` is read
/// without waiting on `op`.
#[derive(Default)]
struct SessionSlot {
    op: Mutex<()>,
    session: parking_lot::RwLock<Option<Session>>,
}

struct RegistryInner {
    config: SessionConfig,
    factory: Arc<dyn TransportFactory>,
    messages: Arc<dyn MessageStore>,
    storage: Arc<dyn MediaStorage>,
    events: Arc<dyn EventSink>,
    slots: DashMap<UserId, Arc<SessionSlot>>,
    generation: AtomicU64,
    pumps: TaskTracker,
    timers: TaskTracker,
}

/// Owns at most one transport session per user and drives each session's
/// state machine from transport events and caller commands.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(
        config: SessionConfig,
        factory: Arc<dyn TransportFactory>,
        messages: Arc<dyn MessageStore>,
        storage: Arc<dyn MediaStorage>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                factory,
                messages,
                storage,
                events,
                slots: DashMap::new(),
                generation: AtomicU64::new(0),
                pumps: TaskTracker::new(),
                timers: TaskTracker::new(),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    fn slot(&self, user_id: UserId) -> Arc<SessionSlot> {
        self.inner.slots.entry(user_id).or_default().value().clone()
    }

    fn existing_slot(&self, user_id: UserId) -> Option<Arc<SessionSlot>> {
        self.inner.slots.get(&user_id).map(|slot| slot.value().clone())
    }

    /// Drop the slot once nobody holds it and it carries no session.
    fn release(&self, user_id: UserId) {
        self.inner.slots.remove_if(&user_id, |_, slot| {
            Arc::strong_count(slot) == 1 && slot.session.read().is_none()
        });
    }

    /// Start a session for `user_id`.
    ///
    /// A no-op when a live session already exists. The transport is
    /// constructed once; its bootstrap runs without holding the per-user
    /// lock so that challenge events can be applied while it is pending.
    pub async fn initialize(&self, user_id: UserId) -> SessionResult<()> {
        let slot = self.slot(user_id);

        let (transport, cancel, generation) = {
            let _op = slot.op.lock().await;

            let live = slot
                .session
                .read()
                .as_ref()
                .is_some_and(|s| s.state.is_live());
            if live {
                debug!(user_id, "Session already exists");
                return Ok(());
            }

            let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
            let cancel = CancellationToken::new();
            let (tx, rx) = mpsc::unbounded_channel();
            let credentials = CredentialStore::for_user(&self.inner.config.credentials_dir, user_id);
            let context = TransportContext::new(tx, cancel.clone());

            let transport = match self.inner.factory.create(user_id, credentials, context).await {
                Ok(transport) => transport,
                Err(e) => {
                    error!(user_id, error = %e, "Failed to construct transport");
                    drop(_op);
                    drop(slot);
                    self.release(user_id);
                    return Err(e.into());
                }
            };

            *slot.session.write() = Some(Session {
                state: SessionState::Initializing,
                transport: transport.clone(),
                cancel: cancel.clone(),
                generation,
            });

            let registry = self.clone();
            let pump_cancel = cancel.clone();
            self.inner.pumps.spawn(async move {
                registry.pump(user_id, generation, rx, pump_cancel).await;
            });

            (transport, cancel, generation)
        };

        info!(user_id, generation, "Session initializing");

        let started = tokio::select! {
            result = transport.start() => result,
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
        };

        if let Err(e) = started {
            error!(user_id, error = %e, "Transport bootstrap failed");
            let owned = {
                let _op = slot.op.lock().await;
                let mut session = slot.session.write();
                if session.as_ref().is_some_and(|s| s.generation == generation) {
                    if let Some(s) = session.take() {
                        s.cancel.cancel();
                    }
                    true
                } else {
                    false
                }
            };
            if owned {
                destroy_transport(user_id, transport.as_ref()).await;
            }
            drop(slot);
            self.release(user_id);
            return Err(e.into());
        }

        debug!(user_id, "Transport bootstrap finished");
        Ok(())
    }

    /// Connection status; never waits on a pending operation.
    pub fn status(&self, user_id: UserId) -> SessionStatus {
        let Some(slot) = self.existing_slot(user_id) else {
            return SessionStatus::default();
        };
        let session = slot.session.read();
        match session.as_ref() {
            Some(s) => SessionStatus {
                initialized: true,
                ready: s.state.is_connected(),
                has_challenge: s.state.challenge().is_some(),
            },
            None => SessionStatus::default(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self, user_id: UserId) -> SessionState {
        let Some(slot) = self.existing_slot(user_id) else {
            return SessionState::Uninitialized;
        };
        let session = slot.session.read();
        session
            .as_ref()
            .map(|s| s.state.clone())
            .unwrap_or_default()
    }

    /// Pending challenge, present only while awaiting a scan
    pub fn challenge(&self, user_id: UserId) -> Option<Challenge> {
        let slot = self.existing_slot(user_id)?;
        let session = slot.session.read();
        session.as_ref()?.state.challenge().cloned()
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.inner
            .slots
            .iter()
            .filter(|slot| slot.session.read().is_some())
            .count()
    }

    /// Send a message through the user's connected transport.
    ///
    /// On success the message is persisted as `sent`, `message.sent` is
    /// triggered and a timer later marks it `delivered`.
    pub async fn send(&self, user_id: UserId, request: OutboundMessage) -> SessionResult<Message> {
        request.validate()?;

        let (transport, cancel) = {
            let slot = self
                .existing_slot(user_id)
                .ok_or(SessionError::NotInitialized(user_id))?;
            let session = slot.session.read();
            match session.as_ref() {
                None => return Err(SessionError::NotInitialized(user_id)),
                Some(s) if !s.state.is_connected() => return Err(SessionError::NotReady(user_id)),
                Some(s) => (s.transport.clone(), s.cancel.clone()),
            }
        };

        let address = phone::to_address(&request.phone_number, &self.inner.config.address_domain);
        let media = request.media_ref();

        let sent = tokio::select! {
            result = transport.send(&address, &request.content, media.as_ref()) => result,
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
        };
        if let Err(e) = sent {
            warn!(user_id, error = %e, "Send failed");
            return Err(e.into());
        }

        let message = self
            .inner
            .messages
            .create_message(
                NewMessage::outbound(user_id, &request.phone_number, &request.content)
                    .with_type(request.message_type)
                    .with_media_url(request.media_url.clone()),
            )
            .await?;

        self.inner.events.trigger_event(
            user_id,
            MessageSentData {
                message_id: message.id,
                phone_number: message.phone_number.clone(),
                content: message.content.clone(),
                message_type: message.message_type,
                media_url: message.media_url.clone(),
            }
            .into(),
        );

        self.schedule_delivered(user_id, message.id);

        info!(user_id, message_id = message.id, "Message sent");
        Ok(message)
    }

    fn schedule_delivered(&self, user_id: UserId, message_id: MessageId) {
        let delay = self.inner.config.delivery_status_delay;
        let messages = self.inner.messages.clone();
        let events = self.inner.events.clone();

        self.inner.timers.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = messages.update_status(message_id, MessageStatus::Delivered).await {
                error!(user_id, message_id, error = %e, "Failed to mark message delivered");
                return;
            }
            events.trigger_event(
                user_id,
                MessageStatusData {
                    message_id,
                    status: MessageStatus::Delivered,
                }
                .into(),
            );
        });
    }

    /// Tear down the user's session.
    ///
    /// Cancels in-flight transport calls. Teardown failures are logged only.
    pub async fn disconnect(&self, user_id: UserId) {
        let Some(slot) = self.existing_slot(user_id) else {
            return;
        };

        {
            let _op = slot.op.lock().await;
            let session = slot.session.write().take();
            if let Some(session) = session {
                session.cancel.cancel();
                destroy_transport(user_id, session.transport.as_ref()).await;
                info!(user_id, state = session.state.name(), "Session disconnected");
            }
        }

        drop(slot);
        self.release(user_id);
    }

    /// Inject an inbound message without a transport.
    pub async fn simulate_receive(
        &self,
        user_id: UserId,
        request: OutboundMessage,
    ) -> SessionResult<Message> {
        phone::validate(&request.phone_number)?;
        if request.content.is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }

        self.record_inbound(
            user_id,
            NewMessage::inbound(user_id, request.phone_number, request.content)
                .with_type(request.message_type)
                .with_media_url(request.media_url),
        )
        .await
    }

    /// Validate and store media for `user_id`.
    pub async fn upload_media(
        &self,
        user_id: UserId,
        data: Bytes,
        filename: &str,
        mime_type: &str,
    ) -> SessionResult<UploadedMedia> {
        media::upload(
            self.inner.storage.as_ref(),
            user_id,
            data,
            filename,
            mime_type,
            self.inner.config.max_media_size,
        )
        .await
    }

    /// Wait for pending delivered-status timers.
    pub async fn drain(&self) {
        let timers = &self.inner.timers;
        timers.close();
        timers.wait().await;
        timers.reopen();
    }

    /// Disconnect every session and wait for background work to finish.
    pub async fn shutdown(&self) {
        let users: Vec<UserId> = self.inner.slots.iter().map(|slot| *slot.key()).collect();
        info!(sessions = users.len(), "Shutting down session registry");

        futures::future::join_all(users.into_iter().map(|user_id| self.disconnect(user_id))).await;

        let pumps = &self.inner.pumps;
        pumps.close();
        pumps.wait().await;
        pumps.reopen();
        self.drain().await;
    }

    async fn pump(
        &self,
        user_id: UserId,
        generation: u64,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let lifecycle = match event {
                TransportEvent::MessageReceived(message) => {
                    self.handle_inbound(user_id, message).await;
                    continue;
                }
                TransportEvent::Challenge(payload) => {
                    LifecycleEvent::ChallengeReady(Challenge::new(payload))
                }
                TransportEvent::Authenticated => LifecycleEvent::Authenticated,
                TransportEvent::Ready => LifecycleEvent::Ready,
                TransportEvent::AuthFailed(reason) => LifecycleEvent::AuthFailed(reason),
                TransportEvent::Disconnected(reason) => LifecycleEvent::Disconnected(reason),
            };

            if !self.apply(user_id, generation, lifecycle).await {
                break;
            }
        }
        debug!(user_id, generation, "Event pump stopped");
    }

    /// Apply a lifecycle event. Returns `false` once the session is gone.
    async fn apply(&self, user_id: UserId, generation: u64, event: LifecycleEvent) -> bool {
        let Some(slot) = self.existing_slot(user_id) else {
            return false;
        };

        let removed = {
            let _op = slot.op.lock().await;

            let (next, transport, removed) = {
                let mut guard = slot.session.write();
                let Some(session) = guard.as_mut().filter(|s| s.generation == generation) else {
                    return false;
                };

                let next = transition(&session.state, &event);
                if next.state != session.state {
                    info!(
                        user_id,
                        from = session.state.name(),
                        to = next.state.name(),
                        "Session state changed"
                    );
                }
                session.state = next.state.clone();
                let transport = session.transport.clone();

                let removed = next.has(Effect::RemoveSession);
                if removed {
                    if let Some(session) = guard.take() {
                        session.cancel.cancel();
                    }
                }
                (next, transport, removed)
            };

            if next.has(Effect::DestroyTransport) {
                destroy_transport(user_id, transport.as_ref()).await;
            }
            removed
        };

        if removed {
            drop(slot);
            self.release(user_id);
        }
        !removed
    }

    async fn handle_inbound(&self, user_id: UserId, message: InboundMessage) {
        let phone_number = phone::digits_only(&message.from);
        let mut new = NewMessage::inbound(user_id, phone_number, message.body.clone());

        if let Some(inbound_media) = message.media {
            let filename = inbound_media.filename.clone().unwrap_or_else(|| {
                let subtype = inbound_media
                    .mime_type
                    .split(['/', ';'])
                    .nth(1)
                    .unwrap_or("bin");
                format!("media_{}.{}", chrono::Utc::now().timestamp_millis(), subtype.trim())
            });

            match self
                .upload_media(user_id, inbound_media.data, &filename, &inbound_media.mime_type)
                .await
            {
                Ok(uploaded) => {
                    if message.body.is_empty() {
                        new.content = uploaded.media_type.placeholder();
                    }
                    new = new
                        .with_type(uploaded.media_type.into())
                        .with_media_url(Some(uploaded.url));
                }
                Err(e) => {
                    warn!(
                        user_id,
                        error = %e,
                        mime_type = %inbound_media.mime_type,
                        "Inbound media rejected"
                    );
                    if message.body.is_empty() {
                        new.content = MEDIA_UNAVAILABLE.to_string();
                    }
                }
            }
        }

        if let Err(e) = self.record_inbound(user_id, new).await {
            error!(user_id, error = %e, "Failed to process inbound message");
        }
    }

    async fn record_inbound(&self, user_id: UserId, new: NewMessage) -> SessionResult<Message> {
        let message = self.inner.messages.create_message(new).await?;

        self.inner.events.trigger_event(
            user_id,
            MessageReceivedData {
                message_id: message.id,
                phone_number: message.phone_number.clone(),
                content: message.content.clone(),
                message_type: message.message_type,
                media_url: message.media_url.clone(),
            }
            .into(),
        );

        debug!(
            user_id,
            message_id = message.id,
            message_type = %message.message_type,
            "Message received"
        );
        Ok(message)
    }
}

async fn destroy_transport(user_id: UserId, transport: &dyn Transport) {
    if let Err(e) = transport.destroy().await {
        warn!(user_id, error = %e, "Transport teardown failed");
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.inner.config)
            .field("sessions", &self.session_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::InMemoryMediaStorage;
    use crate::message_store::InMemoryMessageStore;
    use crate::testing::{RecordingSink, ScriptedTransportFactory, eventually};
    use crate::transport::InboundMedia;
    use std::time::Duration;
    use switchboard_core::{Direction, EventKind, MAX_MEDIA_SIZE, MediaError, WebhookEvent};

    struct Harness {
        registry: SessionRegistry,
        factory: Arc<ScriptedTransportFactory>,
        messages: Arc<InMemoryMessageStore>,
        storage: Arc<InMemoryMediaStorage>,
        events: Arc<RecordingSink>,
    }

    fn harness(factory: ScriptedTransportFactory) -> Harness {
        let factory = Arc::new(factory);
        let messages = Arc::new(InMemoryMessageStore::new());
        let storage = Arc::new(InMemoryMediaStorage::default());
        let events = Arc::new(RecordingSink::new());
        let config =
            SessionConfig::default().with_delivery_status_delay(Duration::from_millis(10));

        let registry = SessionRegistry::new(
            config,
            factory.clone(),
            messages.clone(),
            storage.clone(),
            events.clone(),
        );
        Harness {
            registry,
            factory,
            messages,
            storage,
            events,
        }
    }

    async fn connected(factory: ScriptedTransportFactory) -> Harness {
        let h = harness(factory);
        h.registry.initialize(1).await.unwrap();
        assert!(eventually(|| h.registry.status(1).ready).await);
        h
    }

    fn kinds(events: &[(UserId, WebhookEvent)]) -> Vec<EventKind> {
        events.iter().map(|(_, e)| e.kind()).collect()
    }

    #[tokio::test]
    async fn test_initialize_connects() {
        let h = connected(ScriptedTransportFactory::connecting()).await;

        let status = h.registry.status(1);
        assert!(status.initialized);
        assert!(!status.has_challenge);
        assert_eq!(h.registry.state(1), SessionState::Connected);
        assert_eq!(h.registry.session_count(), 1);

        let transport = h.factory.last().unwrap();
        assert_eq!(transport.credentials().client_id, "user_1");
        assert!(transport.credentials().data_path.ends_with("session_1"));
    }

    #[tokio::test]
    async fn test_challenge_lifecycle() {
        let h = harness(
            ScriptedTransportFactory::new()
                .with_start_events([TransportEvent::Challenge("qr-1".into())]),
        );
        h.registry.initialize(1).await.unwrap();

        assert!(eventually(|| h.registry.status(1).has_challenge).await);
        assert_eq!(h.registry.challenge(1).unwrap().payload(), "qr-1");

        let transport = h.factory.last().unwrap();
        transport.emit(TransportEvent::Challenge("qr-2".into()));
        assert!(
            eventually(|| {
                h.registry
                    .challenge(1)
                    .is_some_and(|c| c.payload() == "qr-2")
            })
            .await
        );

        transport.emit(TransportEvent::Authenticated);
        transport.emit(TransportEvent::Ready);
        assert!(eventually(|| h.registry.status(1).ready).await);
        assert!(h.registry.challenge(1).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_initialize_constructs_once() {
        let h = harness(
            ScriptedTransportFactory::connecting().with_create_delay(Duration::from_millis(50)),
        );

        let (first, second) = tokio::join!(h.registry.initialize(1), h.registry.initialize(1));
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(h.factory.created(), 1);

        h.registry.initialize(1).await.unwrap();
        assert_eq!(h.factory.created(), 1);
        assert_eq!(h.registry.session_count(), 1);
    }

    #[tokio::test]
    async fn test_different_users_get_separate_sessions() {
        let h = harness(ScriptedTransportFactory::connecting());
        let (a, b) = tokio::join!(h.registry.initialize(1), h.registry.initialize(2));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(h.factory.created(), 2);
        assert_eq!(h.registry.session_count(), 2);
    }

    #[tokio::test]
    async fn test_status_does_not_wait_for_bootstrap() {
        let h = harness(
            ScriptedTransportFactory::new().with_start_delay(Duration::from_millis(300)),
        );
        let registry = h.registry.clone();
        let pending = tokio::spawn(async move { registry.initialize(1).await });

        assert!(eventually(|| h.registry.status(1).initialized).await);
        assert!(!pending.is_finished());
        assert_eq!(h.registry.state(1), SessionState::Initializing);

        pending.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_send_requires_connected_session() {
        let h = harness(ScriptedTransportFactory::new());
        let request = OutboundMessage::text("+551199999999", "hello");

        assert!(matches!(
            h.registry.send(1, request.clone()).await,
            Err(SessionError::NotInitialized(1))
        ));

        // Initializing
        h.registry.initialize(1).await.unwrap();
        assert!(matches!(
            h.registry.send(1, request.clone()).await,
            Err(SessionError::NotReady(1))
        ));

        // AwaitingScan
        let transport = h.factory.last().unwrap();
        transport.emit(TransportEvent::Challenge("qr".into()));
        assert!(eventually(|| h.registry.status(1).has_challenge).await);
        assert!(matches!(
            h.registry.send(1, request.clone()).await,
            Err(SessionError::NotReady(1))
        ));

        h.registry.disconnect(1).await;
        assert!(matches!(
            h.registry.send(1, request).await,
            Err(SessionError::NotInitialized(1))
        ));

        assert!(h.messages.is_empty());
        assert!(h.events.is_empty());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_persists_and_marks_delivered() {
        let h = connected(ScriptedTransportFactory::connecting()).await;

        let message = h
            .registry
            .send(1, OutboundMessage::text("+55 (11) 99999-9999", "hello"))
            .await
            .unwrap();

        assert_eq!(message.direction, Direction::Outbound);
        assert_eq!(message.status, MessageStatus::Sent);
        assert_eq!(message.phone_number, "+55 (11) 99999-9999");

        let sent = h.factory.last().unwrap().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].address, "5511999999999@c.us");
        assert_eq!(sent[0].content, "hello");
        assert!(sent[0].media.is_none());

        assert_eq!(kinds(&h.events.events()), vec![EventKind::MessageSent]);

        h.registry.drain().await;
        assert_eq!(
            h.messages.get(message.id).unwrap().status,
            MessageStatus::Delivered
        );
        assert_eq!(
            kinds(&h.events.events()),
            vec![EventKind::MessageSent, EventKind::MessageStatus]
        );
    }

    #[tokio::test]
    async fn test_send_with_media_passes_reference() {
        let h = connected(ScriptedTransportFactory::connecting()).await;

        let request = OutboundMessage::text("551199999999", "look")
            .with_media(MessageType::Image, "https://cdn.example.com/a.png");
        let message = h.registry.send(1, request).await.unwrap();
        assert_eq!(message.message_type, MessageType::Image);
        assert_eq!(message.media_url.as_deref(), Some("https://cdn.example.com/a.png"));

        let sent = h.factory.last().unwrap().sent();
        let media = sent[0].media.as_ref().unwrap();
        assert_eq!(media.url, "https://cdn.example.com/a.png");
        assert_eq!(media.message_type, MessageType::Image);
        assert_eq!(sent[0].content, "look");
    }

    #[tokio::test]
    async fn test_send_failure_surfaces_and_persists_nothing() {
        let h = connected(ScriptedTransportFactory::connecting().failing_send()).await;

        let err = h
            .registry
            .send(1, OutboundMessage::text("551199999999", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Transport(TransportError::Send(_))));
        assert!(!err.to_string().is_empty());
        assert!(h.messages.is_empty());
        assert!(h.events.is_empty());
        assert!(h.registry.status(1).ready);
    }

    #[tokio::test]
    async fn test_send_validates_input() {
        let h = connected(ScriptedTransportFactory::connecting()).await;

        assert!(matches!(
            h.registry.send(1, OutboundMessage::text("", "hello")).await,
            Err(SessionError::Validation(ValidationError::PhoneNumber(_)))
        ));
        assert!(matches!(
            h.registry.send(1, OutboundMessage::text("5511", "")).await,
            Err(SessionError::Validation(ValidationError::EmptyContent))
        ));
    }

    #[tokio::test]
    async fn test_auth_failure_removes_session() {
        let h = harness(
            ScriptedTransportFactory::new()
                .with_start_events([TransportEvent::Challenge("qr".into())]),
        );
        h.registry.initialize(1).await.unwrap();
        assert!(eventually(|| h.registry.status(1).has_challenge).await);

        let transport = h.factory.last().unwrap();
        transport.emit(TransportEvent::AuthFailed("rejected".into()));

        assert!(eventually(|| !h.registry.status(1).initialized).await);
        assert!(eventually(|| transport.is_destroyed()).await);
        assert!(transport.is_cancelled());

        // A fresh session can be started afterwards
        h.registry.initialize(1).await.unwrap();
        assert_eq!(h.factory.created(), 2);
    }

    #[tokio::test]
    async fn test_remote_disconnect_removes_session() {
        let h = connected(ScriptedTransportFactory::connecting()).await;
        let transport = h.factory.last().unwrap();

        transport.emit(TransportEvent::Disconnected("logout".into()));

        assert!(eventually(|| !h.registry.status(1).initialized).await);
        assert!(eventually(|| transport.is_destroyed()).await);
        assert_eq!(h.registry.session_count(), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_failure_leaves_no_entry() {
        let h = harness(ScriptedTransportFactory::new().failing_start());

        let result = h.registry.initialize(1).await;
        assert!(matches!(result, Err(SessionError::Transport(_))));
        assert_eq!(h.registry.status(1), SessionStatus::default());
        assert_eq!(h.registry.session_count(), 0);
        assert!(h.factory.last().unwrap().is_destroyed());

        // Immediate retry constructs a new transport
        assert!(h.registry.initialize(1).await.is_err());
        assert_eq!(h.factory.created(), 2);
    }

    #[tokio::test]
    async fn test_construction_failure_leaves_no_entry() {
        let h = harness(ScriptedTransportFactory::new().failing_create());

        let result = h.registry.initialize(1).await;
        assert!(matches!(
            result,
            Err(SessionError::Transport(TransportError::Connect(_)))
        ));
        assert_eq!(h.factory.created(), 0);
        assert!(!h.registry.status(1).initialized);
    }

    #[tokio::test]
    async fn test_disconnect_cancels_pending_bootstrap() {
        let h = harness(
            ScriptedTransportFactory::new().with_start_delay(Duration::from_millis(300)),
        );
        let registry = h.registry.clone();
        let pending = tokio::spawn(async move { registry.initialize(1).await });
        assert!(eventually(|| h.registry.status(1).initialized).await);

        h.registry.disconnect(1).await;

        let result = pending.await.unwrap();
        assert!(matches!(
            result,
            Err(SessionError::Transport(TransportError::Cancelled))
        ));
        assert_eq!(h.registry.session_count(), 0);
        let first = h.factory.last().unwrap();
        assert!(first.is_destroyed());
        assert!(first.is_cancelled());

        h.registry.initialize(1).await.unwrap();
        assert_eq!(h.factory.created(), 2);
        assert_eq!(h.registry.session_count(), 1);
        assert!(!h.factory.last().unwrap().is_destroyed());
    }

    #[tokio::test]
    async fn test_auth_failure_cancels_pending_bootstrap() {
        let h = harness(
            ScriptedTransportFactory::new()
                .with_start_events([TransportEvent::Challenge("qr".into())])
                .with_start_delay(Duration::from_millis(300)),
        );
        let registry = h.registry.clone();
        let pending = tokio::spawn(async move { registry.initialize(1).await });
        assert!(eventually(|| h.registry.status(1).has_challenge).await);

        let first = h.factory.last().unwrap();
        first.emit(TransportEvent::AuthFailed("rejected".into()));

        let result = pending.await.unwrap();
        assert!(matches!(
            result,
            Err(SessionError::Transport(TransportError::Cancelled))
        ));
        assert!(eventually(|| first.is_destroyed()).await);
        assert_eq!(h.registry.session_count(), 0);
        assert!(!h.registry.status(1).initialized);

        h.registry.initialize(1).await.unwrap();
        assert_eq!(h.factory.created(), 2);
        assert_eq!(h.registry.session_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_cancels_in_flight_send() {
        let h = connected(
            ScriptedTransportFactory::connecting().with_send_delay(Duration::from_secs(5)),
        )
        .await;

        let registry = h.registry.clone();
        let pending = tokio::spawn(async move {
            registry
                .send(1, OutboundMessage::text("551199999999", "slow"))
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        h.registry.disconnect(1).await;

        let result = pending.await.unwrap();
        assert!(matches!(
            result,
            Err(SessionError::Transport(TransportError::Cancelled))
        ));
        assert!(h.messages.is_empty());
        assert!(h.factory.last().unwrap().is_destroyed());
    }

    #[tokio::test]
    async fn test_disconnect_tolerates_teardown_failure() {
        let h = connected(ScriptedTransportFactory::connecting().failing_destroy()).await;

        h.registry.disconnect(1).await;
        assert!(!h.registry.status(1).initialized);

        // Disconnecting an unknown user is a no-op
        h.registry.disconnect(42).await;
    }

    #[tokio::test]
    async fn test_inbound_text_message() {
        let h = connected(ScriptedTransportFactory::connecting()).await;

        h.factory
            .last()
            .unwrap()
            .emit(TransportEvent::MessageReceived(InboundMessage {
                from: "551199999999@c.us".into(),
                body: "hi".into(),
                media: None,
            }));

        assert!(eventually(|| h.messages.len() == 1).await);
        let message = &h.messages.messages_for(1)[0];
        assert_eq!(message.phone_number, "551199999999");
        assert_eq!(message.direction, Direction::Inbound);
        assert_eq!(message.status, MessageStatus::Delivered);
        assert_eq!(message.content, "hi");

        assert!(eventually(|| h.events.len() == 1).await);
        assert_eq!(kinds(&h.events.events()), vec![EventKind::MessageReceived]);
    }

    #[tokio::test]
    async fn test_inbound_media_is_stored_with_placeholder() {
        let h = connected(ScriptedTransportFactory::connecting()).await;

        h.factory
            .last()
            .unwrap()
            .emit(TransportEvent::MessageReceived(InboundMessage {
                from: "551199999999@c.us".into(),
                body: String::new(),
                media: Some(InboundMedia {
                    mime_type: "image/png".into(),
                    data: Bytes::from_static(b"\x89PNG"),
                    filename: None,
                }),
            }));

        assert!(eventually(|| h.messages.len() == 1).await);
        let message = &h.messages.messages_for(1)[0];
        assert_eq!(message.content, "[IMAGE]");
        assert_eq!(message.message_type, MessageType::Image);
        let url = message.media_url.as_deref().unwrap();
        assert!(url.contains("user_1/media/media_"));
        assert!(url.ends_with(".png"));
        assert_eq!(h.storage.len(), 1);
    }

    #[tokio::test]
    async fn test_inbound_media_keeps_caption() {
        let h = connected(ScriptedTransportFactory::connecting()).await;

        h.factory
            .last()
            .unwrap()
            .emit(TransportEvent::MessageReceived(InboundMessage {
                from: "551199999999".into(),
                body: "the contract".into(),
                media: Some(InboundMedia {
                    mime_type: "application/pdf".into(),
                    data: Bytes::from_static(b"%PDF"),
                    filename: Some("contract.pdf".into()),
                }),
            }));

        assert!(eventually(|| h.messages.len() == 1).await);
        let message = &h.messages.messages_for(1)[0];
        assert_eq!(message.content, "the contract");
        assert_eq!(message.message_type, MessageType::Document);
    }

    #[tokio::test]
    async fn test_inbound_rejected_media_falls_back_to_text() {
        let h = connected(ScriptedTransportFactory::connecting()).await;

        h.factory
            .last()
            .unwrap()
            .emit(TransportEvent::MessageReceived(InboundMessage {
                from: "551199999999".into(),
                body: String::new(),
                media: Some(InboundMedia {
                    mime_type: "application/x-msdownload".into(),
                    data: Bytes::from_static(b"MZ"),
                    filename: Some("setup.exe".into()),
                }),
            }));

        assert!(eventually(|| h.messages.len() == 1).await);
        let message = &h.messages.messages_for(1)[0];
        assert_eq!(message.content, MEDIA_UNAVAILABLE);
        assert_eq!(message.message_type, MessageType::Text);
        assert!(message.media_url.is_none());
        assert!(h.storage.is_empty());
    }

    #[tokio::test]
    async fn test_simulate_receive_without_session() {
        let h = harness(ScriptedTransportFactory::new());

        let message = h
            .registry
            .simulate_receive(1, OutboundMessage::text("+551199999999", "hi"))
            .await
            .unwrap();
        assert_eq!(message.direction, Direction::Inbound);
        assert_eq!(message.status, MessageStatus::Delivered);
        assert_eq!(kinds(&h.events.events()), vec![EventKind::MessageReceived]);
        assert_eq!(h.factory.created(), 0);
    }

    #[tokio::test]
    async fn test_simulate_receive_validation() {
        let h = harness(ScriptedTransportFactory::new());

        assert!(
            h.registry
                .simulate_receive(1, OutboundMessage::text("", "hi"))
                .await
                .is_err()
        );
        assert!(
            h.registry
                .simulate_receive(1, OutboundMessage::text("123456789012345678901", "hi"))
                .await
                .is_err()
        );
        assert!(matches!(
            h.registry
                .simulate_receive(1, OutboundMessage::text("5511", ""))
                .await,
            Err(SessionError::Validation(ValidationError::EmptyContent))
        ));
        assert!(h.messages.is_empty());
        assert!(h.events.is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_payload_first() {
        let h = harness(ScriptedTransportFactory::new());
        let data = Bytes::from(vec![0u8; (MAX_MEDIA_SIZE + 1) as usize]);

        let result = h
            .registry
            .upload_media(1, data, "big.mp4", "video/mp4")
            .await;
        assert!(matches!(
            result,
            Err(SessionError::Media(MediaError::FileTooLarge { .. }))
        ));
        assert!(h.storage.is_empty());
        assert_eq!(h.factory.created(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_everything() {
        let h = harness(ScriptedTransportFactory::connecting());
        h.registry.initialize(1).await.unwrap();
        h.registry.initialize(2).await.unwrap();
        assert!(eventually(|| h.registry.status(2).ready).await);

        h.registry.shutdown().await;

        assert_eq!(h.registry.session_count(), 0);
        assert!(h.factory.transports().iter().all(|t| t.is_destroyed()));
    }
}
