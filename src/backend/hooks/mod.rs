//! Process lifecycle hooks
//!
//! A hook gets the application state once the server is ready to accept
//! connections and again when a shutdown signal arrives. Hooks run in the
//! order they were registered.

use futures_util::future::BoxFuture;
use tracing::info;

use crate::backend::server::state::AppState;

pub trait Hook: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn on_start(&self, _state: AppState) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }

    fn on_shutdown(&self, _state: AppState) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

#[derive(Default)]
pub struct Hooks {
    hooks: Vec<Box<dyn Hook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: impl Hook) {
        self.hooks.push(Box::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub async fn start(&self, state: &AppState) {
        for hook in &self.hooks {
            info!(hook = hook.name(), "=> Hook started");
            hook.on_start(state.clone()).await;
        }
    }

    pub async fn shutdown(&self, state: &AppState) {
        for hook in &self.hooks {
            hook.on_shutdown(state.clone()).await;
            info!(hook = hook.name(), "=> Hook stopped");
        }
    }
}
