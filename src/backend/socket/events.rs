/**
 * Socket Event Registry
 *
 * Maps event names to async handlers. A handler receives the frame payload,
 * the session that sent it and the static props registered with it.
 *
 * ```rust,no_run
 * use coredevs::backend::socket::EventRegistry;
 *
 * let events = EventRegistry::new().on("ping", |ctx| async move {
 *     ctx.session.emit("pong", ctx.data);
 * });
 * ```
 */

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;
use tracing::debug;

use crate::backend::socket::server::Session;
use crate::shared::SocketFrame;

/// Arguments passed to an event handler
#[derive(Clone)]
pub struct EventContext {
    pub data: Value,
    pub session: Session,
    pub props: Value,
}

pub type EventMethod = Arc<dyn Fn(EventContext) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Clone)]
pub struct EventHandler {
    pub method: EventMethod,
    pub props: Value,
}

#[derive(Clone, Default)]
pub struct EventRegistry {
    handlers: HashMap<String, EventHandler>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F, Fut>(self, event: impl Into<String>, method: F) -> Self
    where
        F: Fn(EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_with_props(event, Value::Null, method)
    }

    pub fn on_with_props<F, Fut>(mut self, event: impl Into<String>, props: Value, method: F) -> Self
    where
        F: Fn(EventContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let method: EventMethod = Arc::new(move |ctx| method(ctx).boxed());
        self.handlers.insert(event.into(), EventHandler { method, props });
        self
    }

    /// Add every handler of `other`, replacing duplicates
    pub fn merge(&mut self, other: EventRegistry) {
        self.handlers.extend(other.handlers);
    }

    pub fn get(&self, event: &str) -> Option<&EventHandler> {
        self.handlers.get(event)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `frame.event`; unknown events are ignored
    pub async fn dispatch(&self, frame: SocketFrame, session: Session) -> bool {
        let Some(handler) = self.handlers.get(&frame.event) else {
            debug!(session = %session.id(), event = %frame.event, "Unhandled socket event");
            return false;
        };
        let ctx = EventContext {
            data: frame.data,
            session,
            props: handler.props.clone(),
        };
        (handler.method)(ctx).await;
        true
    }
}
