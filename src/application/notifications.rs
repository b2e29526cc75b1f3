use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub title: String,
    pub message: Option<String>,
}

struct Inner {
    toasts: watch::Sender<Vec<Toast>>,
    next_id: AtomicU64,
}

/// Operator/customer-facing notifications. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Notifications {
    inner: Arc<Inner>,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifications {
    pub fn new() -> Self {
        let (toasts, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                toasts,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn push(&self, kind: ToastKind, title: &str, message: Option<String>) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        match kind {
            ToastKind::Error | ToastKind::Warning => {
                warn!(toast_id = id, title, detail = message.as_deref(), "notification")
            }
            _ => info!(toast_id = id, title, detail = message.as_deref(), "notification"),
        }
        self.inner.toasts.send_modify(|toasts| {
            toasts.push(Toast {
                id,
                kind,
                title: title.to_string(),
                message,
            })
        });
        id
    }

    pub fn success(&self, title: &str, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Success, title, Some(message.into()))
    }

    pub fn error(&self, title: &str, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Error, title, Some(message.into()))
    }

    pub fn dismiss(&self, id: u64) {
        self.inner.toasts.send_if_modified(|toasts| {
            let before = toasts.len();
            toasts.retain(|t| t.id != id);
            toasts.len() != before
        });
    }

    pub fn clear(&self) {
        self.inner.toasts.send_replace(Vec::new());
    }

    pub fn snapshot(&self) -> Vec<Toast> {
        self.inner.toasts.borrow().clone()
    }

    pub fn count(&self, kind: ToastKind) -> usize {
        self.inner.toasts.borrow().iter().filter(|t| t.kind == kind).count()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Toast>> {
        self.inner.toasts.subscribe()
    }
}
