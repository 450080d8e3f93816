// web-server/src/live.rs
//
// Bridges one browser websocket onto the external realtime endpoint. Each
// bridge actor owns exactly one upstream connection, scoped to the session's
// user id and optionally joined to one channel room. The upstream connection
// is released (unsubscribe, then close) on every exit path.
use actix::{Actor, ActorContext, AsyncContext, Handler, Message, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use common::messages::{ClientEvent, ServerEvent};
use common::Config;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

use crate::backend::BackendClient;
use crate::history::{HistoryWindow, DEFAULT_WINDOW_CAP};
use crate::session_store::load_session;

// Internal messages from the upstream reader task
#[derive(Message)]
#[rtype(result = "()")]
enum UpstreamMessage {
    Connected,
    Event(ServerEvent),
    Disconnected,
}

pub struct LiveBridgeActor {
    user_id: String,
    channel_id: Option<String>,
    realtime_url: String,
    cap: usize,
    window: Option<HistoryWindow>,
    upstream: Option<mpsc::Sender<WsMessage>>,
    last_heartbeat: Instant,
}

impl LiveBridgeActor {
    pub fn new(user_id: String, channel_id: Option<String>, realtime_url: String, cap: usize) -> Self {
        let window = channel_id
            .as_deref()
            .map(|ch| HistoryWindow::new(ch, cap));

        Self {
            user_id,
            channel_id,
            realtime_url,
            cap,
            window,
            upstream: None,
            last_heartbeat: Instant::now(),
        }
    }

    /// Pre-populate the channel window from a server-side history read
    pub fn seed_window(&mut self, entries: Vec<common::models::HistoryEntry>) {
        if let Some(window) = self.window.as_mut() {
            window.seed(entries);
        }
    }

    // Heartbeat to detect a dead browser connection
    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(Duration::from_secs(5), |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > Duration::from_secs(30) {
                tracing::warn!("Live view heartbeat timeout for user: {}", act.user_id);
                act.release_upstream();
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    // Open the upstream connection, identified by user id
    fn connect_upstream(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let url = format!(
            "{}/socket?userId={}",
            self.realtime_url.trim_end_matches('/'),
            self.user_id
        );

        let (tx, mut rx) = mpsc::channel::<WsMessage>(100);
        self.upstream = Some(tx);

        let addr = ctx.address();

        let fut = async move {
            match connect_async(url).await {
                Ok((ws_stream, _)) => {
                    addr.do_send(UpstreamMessage::Connected);

                    let (mut ws_sink, mut ws_stream) = ws_stream.split();

                    // Forward queued outbound frames to the realtime server
                    tokio::spawn(async move {
                        while let Some(msg) = rx.recv().await {
                            let closing = matches!(msg, WsMessage::Close(_));
                            if let Err(e) = ws_sink.send(msg).await {
                                tracing::error!("Error sending to realtime server: {}", e);
                                break;
                            }
                            if closing {
                                break;
                            }
                        }
                    });

                    // Pump inbound events back into the actor
                    while let Some(msg) = ws_stream.next().await {
                        match msg {
                            Ok(WsMessage::Text(text)) => {
                                match serde_json::from_str::<ServerEvent>(&text) {
                                    Ok(event) => addr.do_send(UpstreamMessage::Event(event)),
                                    Err(e) => {
                                        // Untrusted input: drop it, don't crash the view
                                        tracing::debug!("Discarding malformed realtime event: {}", e);
                                    }
                                }
                            }
                            Ok(WsMessage::Close(_)) => {
                                addr.do_send(UpstreamMessage::Disconnected);
                                break;
                            }
                            Ok(_) => {
                                // Ping/pong and binary frames are transport noise here
                            }
                            Err(e) => {
                                tracing::error!("Realtime connection error: {}", e);
                                addr.do_send(UpstreamMessage::Disconnected);
                                break;
                            }
                        }
                    }

                    addr.do_send(UpstreamMessage::Disconnected);
                }
                Err(e) => {
                    tracing::error!("Failed to connect to realtime server: {}", e);
                    addr.do_send(UpstreamMessage::Disconnected);
                }
            }
        };

        actix::spawn(fut);
    }

    fn send_upstream(&self, event: &ClientEvent) {
        if let Some(tx) = &self.upstream {
            let payload = serde_json::to_string(event).unwrap_or_default();
            if tx.try_send(WsMessage::Text(payload)).is_err() {
                tracing::warn!("Realtime send queue full for user: {}", self.user_id);
            }
        }
    }

    fn forward(&self, event: &ServerEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(event) {
            Ok(json) => ctx.text(json),
            Err(e) => tracing::error!("Failed to serialize realtime event: {}", e),
        }
    }

    /// Apply a room change requested by the browser. Joining a new room
    /// leaves the previous one first, so the upstream never accumulates
    /// stale room memberships over one connection.
    fn retarget(&mut self, event: &ClientEvent) {
        match event {
            ClientEvent::Subscribe { channel_id } => {
                if let Some(previous) = self.channel_id.take() {
                    if previous != *channel_id {
                        self.send_upstream(&ClientEvent::Unsubscribe {
                            channel_id: previous,
                        });
                    }
                }
                self.channel_id = Some(channel_id.clone());
                self.window = Some(HistoryWindow::new(channel_id.clone(), self.cap));
            }
            ClientEvent::Unsubscribe { .. } => {
                self.channel_id = None;
                self.window = None;
            }
        }
        self.send_upstream(event);
    }

    /// Leave the room and close the upstream connection. Idempotent, so it
    /// can run from the close handler, the heartbeat timeout and actor stop.
    fn release_upstream(&mut self) {
        if let Some(tx) = self.upstream.take() {
            if let Some(channel_id) = &self.channel_id {
                let unsub = ClientEvent::Unsubscribe {
                    channel_id: channel_id.clone(),
                };
                let _ = tx.try_send(WsMessage::Text(
                    serde_json::to_string(&unsub).unwrap_or_default(),
                ));
            }
            let _ = tx.try_send(WsMessage::Close(None));
        }
    }
}

impl Actor for LiveBridgeActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "Live view opened for user {} (channel: {:?})",
            self.user_id,
            self.channel_id
        );

        self.last_heartbeat = Instant::now();
        self.heartbeat(ctx);
        self.connect_upstream(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.release_upstream();
        tracing::info!("Live view closed for user {}", self.user_id);
    }
}

impl Handler<UpstreamMessage> for LiveBridgeActor {
    type Result = ();

    fn handle(&mut self, msg: UpstreamMessage, ctx: &mut Self::Context) -> Self::Result {
        match msg {
            UpstreamMessage::Connected => {
                // Join the channel room before anything else is pushed
                if let Some(channel_id) = self.channel_id.clone() {
                    self.send_upstream(&ClientEvent::Subscribe { channel_id });
                }
                self.forward(&ServerEvent::Connected, ctx);
            }
            UpstreamMessage::Event(event) => match event {
                ServerEvent::HistoryUpdate { entry } => {
                    match self.window.as_mut() {
                        Some(window) => {
                            // Rooms can multiplex; only the viewed channel merges
                            if window.merge(entry.clone()) {
                                self.forward(&ServerEvent::HistoryUpdate { entry }, ctx);
                            }
                        }
                        // Unscoped connection: pass everything through
                        None => self.forward(&ServerEvent::HistoryUpdate { entry }, ctx),
                    }
                }
                ack @ (ServerEvent::Subscribed { .. } | ServerEvent::Unsubscribed { .. }) => {
                    self.forward(&ack, ctx);
                }
                ServerEvent::Connected | ServerEvent::Disconnected => {
                    // Status events are minted by this bridge, not upstream
                }
            },
            UpstreamMessage::Disconnected => {
                self.upstream = None;
                self.forward(&ServerEvent::Disconnected, ctx);
                // No retry loop here: the view reconnects on remount
                ctx.close(None);
                ctx.stop();
            }
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for LiveBridgeActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        self.last_heartbeat = Instant::now();

        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => {
                // The browser may retarget its room mid-session
                match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => self.retarget(&event),
                    Err(e) => {
                        tracing::debug!("Ignoring unrecognized client frame: {}", e);
                    }
                }
            }
            Ok(ws::Message::Close(reason)) => {
                self.release_upstream();
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("WebSocket protocol error: {}", e);
                self.release_upstream();
                ctx.stop();
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    /// History window cap for this view; channel pages use the default 200,
    /// the dashboard overview asks for 100.
    pub window: Option<usize>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws/live").route(web::get().to(live_route)))
        .service(web::resource("/ws/live/{channel_id}").route(web::get().to(live_channel_route)));
}

// Per-user live connection without a channel room
async fn live_route(
    req: HttpRequest,
    stream: web::Payload,
    config: web::Data<Config>,
    query: web::Query<LiveQuery>,
) -> Result<HttpResponse, Error> {
    start_bridge(req, stream, config, None, None, query.window).await
}

// Per-channel live view: joins the channel room and seeds the history
// window from the backend's stored history.
async fn live_channel_route(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<(String,)>,
    config: web::Data<Config>,
    backend: web::Data<BackendClient>,
    query: web::Query<LiveQuery>,
) -> Result<HttpResponse, Error> {
    let channel_id = path.into_inner().0;
    start_bridge(req, stream, config, Some(backend), Some(channel_id), query.window).await
}

async fn start_bridge(
    req: HttpRequest,
    stream: web::Payload,
    config: web::Data<Config>,
    backend: Option<web::Data<BackendClient>>,
    channel_id: Option<String>,
    window: Option<usize>,
) -> Result<HttpResponse, Error> {
    // No user id, no connection attempt
    let claims = match load_session(&req, config.session.secret.as_bytes()) {
        Some(claims) if !claims.user.id.is_empty() => claims,
        _ => {
            return Ok(HttpResponse::Unauthorized().json(json!({ "error": "Not authenticated" })));
        }
    };

    let cap = window
        .unwrap_or(DEFAULT_WINDOW_CAP)
        .clamp(1, DEFAULT_WINDOW_CAP);

    let mut bridge = LiveBridgeActor::new(
        claims.user.id.clone(),
        channel_id.clone(),
        config.realtime_url.clone(),
        cap,
    );

    // Seed from stored history; a fetch failure just means an empty window
    if let (Some(backend), Some(channel_id)) = (backend, channel_id) {
        match backend.channel(&claims.token, &channel_id).await {
            Ok(channel) => bridge.seed_window(channel.history),
            Err(e) => tracing::warn!("Could not seed history for {}: {}", channel_id, e),
        }
    }

    ws::start(bridge, &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge_with_upstream(
        channel_id: Option<&str>,
    ) -> (LiveBridgeActor, mpsc::Receiver<WsMessage>) {
        let (tx, rx) = mpsc::channel(8);
        let mut bridge = LiveBridgeActor::new(
            "u1".to_string(),
            channel_id.map(str::to_string),
            "ws://127.0.0.1:5000".to_string(),
            DEFAULT_WINDOW_CAP,
        );
        bridge.upstream = Some(tx);
        (bridge, rx)
    }

    fn next_client_event(rx: &mut mpsc::Receiver<WsMessage>) -> ClientEvent {
        match rx.try_recv().expect("a frame should be queued") {
            WsMessage::Text(text) => serde_json::from_str(&text).expect("client event frame"),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    #[test]
    fn release_queues_unsubscribe_before_close() {
        let (mut bridge, mut rx) = bridge_with_upstream(Some("ch1"));

        bridge.release_upstream();

        match next_client_event(&mut rx) {
            ClientEvent::Unsubscribe { channel_id } => assert_eq!(channel_id, "ch1"),
            other => panic!("expected unsubscribe first, got {:?}", other),
        }
        assert!(matches!(rx.try_recv(), Ok(WsMessage::Close(None))));

        // Releasing again must not queue anything further
        bridge.release_upstream();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn release_without_room_only_closes() {
        let (mut bridge, mut rx) = bridge_with_upstream(None);

        bridge.release_upstream();

        assert!(matches!(rx.try_recv(), Ok(WsMessage::Close(None))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn retarget_leaves_old_room_before_joining_new() {
        let (mut bridge, mut rx) = bridge_with_upstream(Some("ch1"));

        bridge.retarget(&ClientEvent::Subscribe {
            channel_id: "ch2".to_string(),
        });

        match next_client_event(&mut rx) {
            ClientEvent::Unsubscribe { channel_id } => assert_eq!(channel_id, "ch1"),
            other => panic!("expected unsubscribe first, got {:?}", other),
        }
        match next_client_event(&mut rx) {
            ClientEvent::Subscribe { channel_id } => assert_eq!(channel_id, "ch2"),
            other => panic!("expected subscribe second, got {:?}", other),
        }
        assert_eq!(bridge.channel_id.as_deref(), Some("ch2"));
        assert_eq!(bridge.window.as_ref().map(|w| w.channel_id()), Some("ch2"));
    }

    #[test]
    fn retarget_same_room_does_not_leave_it() {
        let (mut bridge, mut rx) = bridge_with_upstream(Some("ch1"));

        bridge.retarget(&ClientEvent::Subscribe {
            channel_id: "ch1".to_string(),
        });

        match next_client_event(&mut rx) {
            ClientEvent::Subscribe { channel_id } => assert_eq!(channel_id, "ch1"),
            other => panic!("expected subscribe only, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn retarget_unsubscribe_clears_room_state() {
        let (mut bridge, mut rx) = bridge_with_upstream(Some("ch1"));

        bridge.retarget(&ClientEvent::Unsubscribe {
            channel_id: "ch1".to_string(),
        });

        match next_client_event(&mut rx) {
            ClientEvent::Unsubscribe { channel_id } => assert_eq!(channel_id, "ch1"),
            other => panic!("expected unsubscribe, got {:?}", other),
        }
        assert!(bridge.channel_id.is_none());
        assert!(bridge.window.is_none());

        // A later release has no room left to leave
        bridge.release_upstream();
        assert!(matches!(rx.try_recv(), Ok(WsMessage::Close(None))));
    }
}
