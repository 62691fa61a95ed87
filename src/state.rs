use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::insights::TextGenerator;
use crate::notify::{Dispatcher, NotifyJob};
use crate::store::Store;

/// Shared per-request context. Every service is constructed once in
/// `main` and injected here; nothing is a module-level singleton.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub dispatcher: Arc<Dispatcher>,
    pub llm: Arc<dyn TextGenerator>,
    pub notify_tx: mpsc::Sender<NotifyJob>,
}
