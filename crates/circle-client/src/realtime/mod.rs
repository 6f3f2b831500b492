//! # Realtime Change Streams
//!
//! Long-lived subscriptions to row changes on `profiles` and `follows`.
//!
//! ## Architecture
//!
//! One websocket per [`RealtimeClient`], opened lazily by the first
//! subscription and owned by a background task. Subscriptions talk to the
//! task over an mpsc command channel. The task joins channels, resolves each
//! join against the server's `phx_reply`, routes inbound `postgres_changes`
//! frames to the callback registered for the frame's topic, and keeps the
//! socket alive with heartbeats.
//!
//! ## Connection loss
//!
//! The socket counts as lost when the server closes it, a read or write
//! fails, or a heartbeat is still unanswered when the next one is due. The
//! task then reconnects following [`RealtimeConfig`]'s backoff and rejoins
//! every registered channel. After `max_reconnect_attempts` consecutive
//! failures it drops every registered callback: [`Subscription::is_active`]
//! turns `false` and anything the callback owned (a channel sender, say) is
//! released. The next subscription opens a fresh socket.
//!
//! Unsubscribing is the caller's responsibility: a [`Subscription`] that is
//! dropped without [`Subscription::unsubscribe`] keeps delivering events.

pub mod protocol;
mod registry;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;
use uuid::Uuid;

use circle_core::UserId;

use crate::config::RealtimeConfig;
use crate::error::ApiError;
use crate::session::SessionStore;

pub use protocol::{ChangeEvent, ChangeKind, PostgresChangeFilter};
pub use registry::ChangeCallback;

use protocol::PhoenixMessage;
use registry::Registry;

/// Default interval between socket heartbeats.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SocketSink = SplitSink<Socket, Message>;
type JoinAck = oneshot::Sender<Result<(), ApiError>>;

enum Command {
    Join {
        topic: String,
        id: Uuid,
        filters: Vec<PostgresChangeFilter>,
        callback: ChangeCallback,
        ack: JoinAck,
    },
    Leave {
        topic: String,
    },
    Close,
}

/// State shared by client handles and the socket task.
struct Shared {
    base_url: Url,
    anon_key: String,
    session: Arc<SessionStore>,
    config: RealtimeConfig,
    registry: Mutex<Registry>,
    next_ref: AtomicU64,
}

impl Shared {
    fn bearer(&self) -> String {
        self.session
            .access_token()
            .map(|t| t.as_str().to_owned())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn next_ref(&self) -> String {
        self.next_ref.fetch_add(1, Ordering::Relaxed).to_string()
    }

    async fn connect(&self) -> Result<Socket, ApiError> {
        let url = protocol::socket_url(&self.base_url, &self.anon_key)?;
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| ApiError::Realtime(format!("websocket connect failed: {e}")))?;
        tracing::info!(host = url.host_str().unwrap_or_default(), "realtime socket connected");
        Ok(ws)
    }
}

struct Inner {
    shared: Arc<Shared>,
    commands: tokio::sync::Mutex<Option<mpsc::UnboundedSender<Command>>>,
}

/// Client for realtime change streams.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("base_url", &self.inner.shared.base_url)
            .field("channels", &self.inner.shared.registry.lock().len())
            .finish()
    }
}

/// Handle to a live subscription.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    topic: String,
    client: RealtimeClient,
}

impl Subscription {
    /// Channel topic this subscription listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Whether the callback is still registered. Turns `false` once the
    /// socket is given up for lost or the server rejects a rejoin.
    pub fn is_active(&self) -> bool {
        self.client.inner.shared.registry.lock().contains(&self.topic, self.id)
    }

    /// Stop receiving events and leave the channel.
    pub async fn unsubscribe(self) {
        let removed = self.client.inner.shared.registry.lock().remove(&self.topic, self.id);
        if !removed {
            return;
        }
        self.client
            .command(Command::Leave {
                topic: self.topic.clone(),
            })
            .await;
        tracing::info!(topic = %self.topic, "realtime subscription removed");
    }
}

impl RealtimeClient {
    pub(crate) fn new(
        base_url: Url,
        anon_key: String,
        session: Arc<SessionStore>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                shared: Arc::new(Shared {
                    base_url,
                    anon_key,
                    session,
                    config,
                    registry: Mutex::new(Registry::default()),
                    next_ref: AtomicU64::new(1),
                }),
                commands: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Receive every insert/update/delete on the profile row of `user_id`.
    pub async fn subscribe_to_profile<F>(&self, user_id: UserId, callback: F) -> Result<Subscription, ApiError>
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        self.subscribe(
            &format!("profile:{user_id}"),
            vec![PostgresChangeFilter::all_where("profiles", "id", user_id)],
            Arc::new(callback),
        )
        .await
    }

    /// Receive every insert/update/delete on follow edges touching `user_id`,
    /// in either direction.
    pub async fn subscribe_to_follows<F>(&self, user_id: UserId, callback: F) -> Result<Subscription, ApiError>
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        self.subscribe(
            &format!("follows:{user_id}"),
            vec![
                PostgresChangeFilter::all_where("follows", "follower_id", user_id),
                PostgresChangeFilter::all_where("follows", "following_id", user_id),
            ],
            Arc::new(callback),
        )
        .await
    }

    /// Register `callback` for the given row changes on a fresh channel.
    ///
    /// Returns once the server has acknowledged the join. A rejected or
    /// unanswered join is an [`ApiError::Realtime`] and leaves nothing
    /// registered.
    pub async fn subscribe(
        &self,
        name: &str,
        filters: Vec<PostgresChangeFilter>,
        callback: ChangeCallback,
    ) -> Result<Subscription, ApiError> {
        let id = Uuid::new_v4();
        let topic = format!("realtime:{name}:{}", id.simple());
        let (ack, acked) = oneshot::channel();

        let commands = self.ensure_connected().await?;
        commands
            .send(Command::Join {
                topic: topic.clone(),
                id,
                filters,
                callback,
                ack,
            })
            .map_err(|_| ApiError::Realtime("realtime socket task has stopped".into()))?;

        let timeout = self.inner.shared.config.join_timeout;
        let outcome = match tokio::time::timeout(timeout, acked).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ApiError::Realtime(
                "realtime socket closed before the join was acknowledged".into(),
            )),
            Err(_) => Err(ApiError::Realtime(format!(
                "join of {topic} not acknowledged within {timeout:?}"
            ))),
        };

        if let Err(e) = outcome {
            let registered = self.inner.shared.registry.lock().remove(&topic, id);
            if registered {
                self.command(Command::Leave { topic }).await;
            }
            return Err(e);
        }

        tracing::info!(%topic, "realtime subscription added");
        Ok(Subscription {
            id,
            topic,
            client: self.clone(),
        })
    }

    /// Close the socket. Registered callbacks stay in place and are rejoined
    /// by the next subscription.
    pub async fn shutdown(&self) {
        if let Some(tx) = self.inner.commands.lock().await.take() {
            let _ = tx.send(Command::Close);
        }
    }

    /// Hand a command to the socket task, if one is running.
    async fn command(&self, command: Command) {
        let guard = self.inner.commands.lock().await;
        if let Some(tx) = guard.as_ref() {
            if tx.send(command).is_err() {
                tracing::debug!("realtime socket task has stopped; command dropped");
            }
        }
    }

    /// Sender for the running socket task, opening the socket first if no
    /// task is alive.
    async fn ensure_connected(&self) -> Result<mpsc::UnboundedSender<Command>, ApiError> {
        let mut guard = self.inner.commands.lock().await;
        if let Some(tx) = guard.as_ref().filter(|tx| !tx.is_closed()) {
            return Ok(tx.clone());
        }

        let socket = self.inner.shared.connect().await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Connection::new(Arc::clone(&self.inner.shared), rx);
        tokio::spawn(connection.run(socket));
        *guard = Some(tx.clone());
        Ok(tx)
    }
}

/// How one socket session ended.
enum SessionEnd {
    /// Closed on request, or every client handle is gone.
    Closed,
    /// Lost to the server or the network.
    Dropped,
}

/// The socket task.
struct Connection {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,
    /// Join ref of each channel joined on the current socket and not yet
    /// answered, by topic.
    joins: HashMap<String, String>,
    /// Subscribers waiting on their first join, by topic.
    acks: HashMap<String, JoinAck>,
    /// Ref of the heartbeat awaiting its reply.
    heartbeat: Option<String>,
}

impl Connection {
    fn new(shared: Arc<Shared>, commands: mpsc::UnboundedReceiver<Command>) -> Self {
        Self {
            shared,
            commands,
            joins: HashMap::new(),
            acks: HashMap::new(),
            heartbeat: None,
        }
    }

    async fn run(mut self, mut socket: Socket) {
        loop {
            if let SessionEnd::Closed = self.serve(socket).await {
                return;
            }
            self.joins.clear();
            self.heartbeat = None;
            socket = match self.reconnect().await {
                Some(socket) => socket,
                None => return,
            };
        }
    }

    /// Drive one socket until it closes or is lost.
    async fn serve(&mut self, socket: Socket) -> SessionEnd {
        let (mut sink, mut stream) = socket.split();

        let rejoin = self.shared.registry.lock().topics();
        for (topic, filters) in rejoin {
            if let Err(e) = self.join(&mut sink, topic, &filters).await {
                tracing::warn!("realtime rejoin failed: {e}");
                return SessionEnd::Dropped;
            }
        }

        let mut heartbeat = tokio::time::interval(self.shared.config.heartbeat_interval);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Join { topic, id, filters, callback, ack }) => {
                        self.shared.registry.lock().insert(topic.clone(), id, filters.clone(), callback);
                        self.acks.insert(topic.clone(), ack);
                        if let Err(e) = self.join(&mut sink, topic, &filters).await {
                            tracing::warn!("realtime join failed: {e}");
                            return SessionEnd::Dropped;
                        }
                    }
                    Some(Command::Leave { topic }) => {
                        self.joins.remove(&topic);
                        self.acks.remove(&topic);
                        let leave = PhoenixMessage::leave(&topic, self.shared.next_ref());
                        if let Err(e) = send_frame(&mut sink, &leave).await {
                            tracing::warn!(%topic, "realtime leave failed: {e}");
                            return SessionEnd::Dropped;
                        }
                    }
                    Some(Command::Close) | None => {
                        let _ = sink.close().await;
                        tracing::info!("realtime socket closed");
                        return SessionEnd::Closed;
                    }
                },
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(&text),
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::warn!("realtime socket closed by server");
                        return SessionEnd::Dropped;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("realtime socket error: {e}");
                        return SessionEnd::Dropped;
                    }
                },
                _ = heartbeat.tick() => {
                    if self.heartbeat.is_some() {
                        tracing::warn!("realtime heartbeat not acknowledged");
                        return SessionEnd::Dropped;
                    }
                    let reference = self.shared.next_ref();
                    if let Err(e) = send_frame(&mut sink, &PhoenixMessage::heartbeat(reference.clone())).await {
                        tracing::warn!("realtime heartbeat failed: {e}");
                        return SessionEnd::Dropped;
                    }
                    self.heartbeat = Some(reference);
                }
            }
        }
    }

    async fn join(
        &mut self,
        sink: &mut SocketSink,
        topic: String,
        filters: &[PostgresChangeFilter],
    ) -> Result<(), ApiError> {
        let reference = self.shared.next_ref();
        let frame = PhoenixMessage::join(&topic, filters, &self.shared.bearer(), reference.clone());
        send_frame(sink, &frame).await?;
        self.joins.insert(topic, reference);
        Ok(())
    }

    /// Open a new socket after a loss. `None` when closed meanwhile or when
    /// every attempt failed.
    async fn reconnect(&mut self) -> Option<Socket> {
        let shared = Arc::clone(&self.shared);
        let mut attempt = 0;
        loop {
            if attempt >= shared.config.max_reconnect_attempts {
                self.give_up();
                return None;
            }
            let delay = shared.config.backoff(attempt);
            attempt += 1;
            tracing::info!(attempt, ?delay, "realtime socket reconnecting");

            if !self.wait(delay).await {
                return None;
            }
            match shared.connect().await {
                Ok(socket) => return Some(socket),
                Err(e) => tracing::warn!(attempt, "{e}"),
            }
        }
    }

    /// Sleep for `delay` while still taking commands. `false` on close.
    async fn wait(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                command = self.commands.recv() => match command {
                    // Joined with the rest of the registry once a socket is back.
                    Some(Command::Join { topic, id, filters, callback, ack }) => {
                        self.shared.registry.lock().insert(topic.clone(), id, filters, callback);
                        self.acks.insert(topic, ack);
                    }
                    Some(Command::Leave { topic }) => {
                        self.acks.remove(&topic);
                    }
                    Some(Command::Close) | None => return false,
                },
            }
        }
    }

    /// Drop every subscription and fail every pending join.
    fn give_up(&mut self) {
        let dropped = self.shared.registry.lock().clear();
        tracing::warn!(
            subscriptions = dropped,
            "realtime socket could not be restored; subscriptions dropped"
        );
        for (_, ack) in self.acks.drain() {
            let _ = ack.send(Err(ApiError::Realtime("realtime socket lost".into())));
        }
    }

    /// Route one inbound text frame.
    fn handle_frame(&mut self, text: &str) {
        let msg: PhoenixMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("ignoring malformed realtime frame: {e}");
                return;
            }
        };

        match msg.event.as_str() {
            protocol::EVENT_POSTGRES_CHANGES => dispatch_change(&self.shared.registry, &msg),
            protocol::EVENT_REPLY => self.handle_reply(&msg),
            protocol::EVENT_ERROR | protocol::EVENT_CLOSE => {
                tracing::warn!(topic = %msg.topic, event = %msg.event, "realtime channel closed");
            }
            _ => tracing::trace!(topic = %msg.topic, event = %msg.event, "realtime frame"),
        }
    }

    fn handle_reply(&mut self, msg: &PhoenixMessage) {
        if msg.topic == protocol::PHOENIX_TOPIC {
            if msg.reference.is_some() && msg.reference == self.heartbeat {
                self.heartbeat = None;
            }
            return;
        }

        let answers_join = self
            .joins
            .get(&msg.topic)
            .is_some_and(|r| msg.reference.as_deref() == Some(r.as_str()));
        if !answers_join {
            tracing::trace!(topic = %msg.topic, "realtime reply");
            return;
        }
        self.joins.remove(&msg.topic);
        let ack = self.acks.remove(&msg.topic);

        if msg.reply_status() == Some("ok") {
            tracing::debug!(topic = %msg.topic, "realtime channel joined");
            if let Some(ack) = ack {
                let _ = ack.send(Ok(()));
            }
            return;
        }

        tracing::warn!(topic = %msg.topic, payload = %msg.payload, "realtime join rejected");
        self.shared.registry.lock().remove_topic(&msg.topic);
        if let Some(ack) = ack {
            let reason = &msg.payload["response"];
            let _ = ack.send(Err(ApiError::Realtime(format!("join rejected: {reason}"))));
        }
    }
}

async fn send_frame(sink: &mut SocketSink, msg: &PhoenixMessage) -> Result<(), ApiError> {
    let text = serde_json::to_string(msg)
        .map_err(|e| ApiError::Realtime(format!("cannot encode frame: {e}")))?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| ApiError::Realtime(e.to_string()))
}

/// Hand a `postgres_changes` frame to its topic's callback.
fn dispatch_change(registry: &Mutex<Registry>, msg: &PhoenixMessage) {
    let change = match protocol::parse_change(msg) {
        Ok(Some(change)) => change,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(topic = %msg.topic, "{e}");
            return;
        }
    };
    let callback = registry.lock().callback(&msg.topic);
    match callback {
        Some(cb) => cb(change),
        None => tracing::debug!(topic = %msg.topic, "change for unknown topic"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn shared() -> Arc<Shared> {
        Arc::new(Shared {
            base_url: Url::parse("http://127.0.0.1:1/").unwrap(),
            anon_key: "anon".into(),
            session: SessionStore::new(),
            config: RealtimeConfig::default(),
            registry: Mutex::new(Registry::default()),
            next_ref: AtomicU64::new(1),
        })
    }

    fn connection() -> (Connection, mpsc::UnboundedSender<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(shared(), rx), tx)
    }

    fn reply(topic: &str, reference: &str, status: &str) -> String {
        serde_json::json!({
            "topic": topic,
            "event": "phx_reply",
            "ref": reference,
            "payload": {"status": status, "response": {"reason": "denied"}}
        })
        .to_string()
    }

    /// Register a listener on `topic` as if its join had just been sent.
    fn pending_join(conn: &mut Connection, topic: &str, reference: &str) -> oneshot::Receiver<Result<(), ApiError>> {
        let (ack, acked) = oneshot::channel();
        conn.shared
            .registry
            .lock()
            .insert(topic.into(), Uuid::new_v4(), vec![], Arc::new(|_| {}));
        conn.joins.insert(topic.into(), reference.into());
        conn.acks.insert(topic.into(), ack);
        acked
    }

    #[test]
    fn change_frames_reach_the_topic_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let registry = Mutex::new(Registry::default());
        registry.lock().insert(
            "realtime:profile:x".into(),
            Uuid::new_v4(),
            vec![],
            Arc::new(move |change: ChangeEvent| {
                assert_eq!(change.kind, ChangeKind::Insert);
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let mut msg: PhoenixMessage = serde_json::from_value(serde_json::json!({
            "topic": "realtime:profile:x",
            "event": "postgres_changes",
            "ref": null,
            "payload": {"data": {"table": "profiles", "type": "INSERT", "record": {"id": "x"}}}
        }))
        .unwrap();
        dispatch_change(&registry, &msg);

        msg.topic = "realtime:profile:y".into();
        dispatch_change(&registry, &msg);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn malformed_frames_are_ignored() {
        let (mut conn, _tx) = connection();
        conn.handle_frame("not json");
        conn.handle_frame(r#"{"topic":"t","event":"postgres_changes","payload":{}}"#);
    }

    #[test]
    fn ok_reply_acknowledges_join() {
        let (mut conn, _tx) = connection();
        let mut acked = pending_join(&mut conn, "realtime:a", "4");

        conn.handle_frame(&reply("realtime:a", "3", "ok"));
        assert!(acked.try_recv().is_err(), "reply to another ref must not resolve the join");

        conn.handle_frame(&reply("realtime:a", "4", "ok"));
        assert!(matches!(acked.try_recv(), Ok(Ok(()))));
        assert!(conn.joins.is_empty());
        assert_eq!(conn.shared.registry.lock().len(), 1);
    }

    #[test]
    fn rejected_join_unregisters_and_reports() {
        let (mut conn, _tx) = connection();
        let mut acked = pending_join(&mut conn, "realtime:a", "4");

        conn.handle_frame(&reply("realtime:a", "4", "error"));
        match acked.try_recv() {
            Ok(Err(ApiError::Realtime(reason))) => assert!(reason.contains("denied"), "{reason}"),
            other => panic!("expected a rejection, got {other:?}"),
        }
        assert_eq!(conn.shared.registry.lock().len(), 0);
    }

    #[test]
    fn heartbeat_reply_clears_outstanding_heartbeat() {
        let (mut conn, _tx) = connection();
        conn.heartbeat = Some("9".into());
        conn.handle_frame(&reply("phoenix", "8", "ok"));
        assert_eq!(conn.heartbeat.as_deref(), Some("9"));
        conn.handle_frame(&reply("phoenix", "9", "ok"));
        assert!(conn.heartbeat.is_none());
    }

    #[test]
    fn giving_up_drops_subscriptions_and_pending_joins() {
        let (mut conn, _tx) = connection();
        let mut acked = pending_join(&mut conn, "realtime:a", "4");
        conn.give_up();
        assert!(matches!(acked.try_recv(), Ok(Err(ApiError::Realtime(_)))));
        assert_eq!(conn.shared.registry.lock().len(), 0);
    }

    #[tokio::test]
    async fn wait_stops_on_close() {
        let (mut conn, tx) = connection();
        tx.send(Command::Close).unwrap();
        assert!(!conn.wait(Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn subscribe_fails_cleanly_when_socket_is_unreachable() {
        let client = RealtimeClient::new(
            Url::parse("http://127.0.0.1:1/").unwrap(),
            "anon".into(),
            SessionStore::new(),
            RealtimeConfig::default(),
        );
        let result = client.subscribe_to_profile(UserId::new(), |_| {}).await;
        assert!(matches!(result, Err(ApiError::Realtime(_))));
        assert_eq!(client.inner.shared.registry.lock().len(), 0);
    }
}
