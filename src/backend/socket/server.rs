/**
 * Socket Server
 *
 * Tracks connected sessions and the event registry. Each session owns an
 * unbounded channel drained by its connection task, so emitting never
 * blocks on a slow client.
 */

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::http::HeaderMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::backend::socket::events::EventRegistry;
use crate::backend::store::Document;
use crate::shared::SocketFrame;

/// What a socket middleware gets to inspect before the upgrade
#[derive(Debug, Clone)]
pub struct Handshake {
    pub headers: HeaderMap,
    /// User decoded from the auth token, if any
    pub user: Option<Document>,
}

/// Returning `Err(reason)` refuses the connection
pub type SocketMiddleware = Arc<dyn Fn(&Handshake) -> Result<(), String> + Send + Sync>;

type Sessions = HashMap<String, mpsc::UnboundedSender<SocketFrame>>;

#[derive(Default)]
struct Inner {
    sessions: RwLock<Sessions>,
    events: RwLock<EventRegistry>,
    middlewares: RwLock<Vec<SocketMiddleware>>,
}

#[derive(Clone, Default)]
pub struct SocketServer {
    inner: Arc<Inner>,
}

impl SocketServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register event handlers and connection middlewares
    pub fn listen(&self, events: EventRegistry, middlewares: Vec<SocketMiddleware>) {
        let count = events.len();
        self.inner
            .events
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .merge(events);
        self.inner
            .middlewares
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .extend(middlewares);
        info!(events = count, "=> Socket initialized");
    }

    pub fn events(&self) -> EventRegistry {
        self.inner.events.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Run every middleware against a handshake, stopping at the first refusal
    pub fn authorize(&self, handshake: &Handshake) -> Result<(), String> {
        let middlewares = self.inner.middlewares.read().unwrap_or_else(|e| e.into_inner());
        middlewares.iter().try_for_each(|middleware| middleware(handshake))
    }

    /// Register a connection and hand back its session
    pub fn connect(&self, tx: mpsc::UnboundedSender<SocketFrame>, user: Option<Document>) -> Session {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.inner
            .sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), tx.clone());
        Session {
            id,
            user: user.map(Arc::new),
            tx,
            server: self.clone(),
        }
    }

    pub fn disconnect(&self, id: &str) {
        self.inner
            .sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Send to every connected session; returns how many were reached
    pub fn emit(&self, event: &str, data: Value) -> usize {
        self.send_where(&SocketFrame::new(event, data), |_| true)
    }

    fn send_where(&self, frame: &SocketFrame, include: impl Fn(&str) -> bool) -> usize {
        let sessions = self.inner.sessions.read().unwrap_or_else(|e| e.into_inner());
        let mut delivered = 0;
        for (id, tx) in sessions.iter().filter(|(id, _)| include(id)) {
            if tx.send(frame.clone()).is_ok() {
                delivered += 1;
            } else {
                warn!(session = %id, "Socket session closed before emit");
            }
        }
        delivered
    }
}

/// One connected client
#[derive(Clone)]
pub struct Session {
    id: String,
    user: Option<Arc<Document>>,
    tx: mpsc::UnboundedSender<SocketFrame>,
    server: SocketServer,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user(&self) -> Option<&Document> {
        self.user.as_deref()
    }

    /// Send to this session only
    pub fn emit(&self, event: &str, data: Value) -> bool {
        self.tx.send(SocketFrame::new(event, data)).is_ok()
    }

    /// Send to every session except this one
    pub fn broadcast(&self, event: &str, data: Value) -> usize {
        self.server
            .send_where(&SocketFrame::new(event, data), |id| id != self.id)
    }
}
