//! Logging setup and the log-viewer feed.
//!
//! Everything goes to `<data_dir>/mediatree.log`.  WARN/ERROR events, and
//! info events logged with `target: "mediatree::ui"`, are also forwarded to
//! the log viewer through an unbounded channel.

use std::collections::VecDeque;
use std::path::Path;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Target for user-facing info events.
pub const UI_TARGET: &str = "mediatree::ui";

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: Local::now(),
            level,
            message: message.into(),
        }
    }

    /// `HH:MM:SS [LEVEL] message`
    pub fn line(&self) -> String {
        format!("{} [{}] {}", self.time.format("%H:%M:%S"), self.level, self.message)
    }
}

/// Bounded ring of entries, oldest dropped first.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }
}

// ── Layer ─────────────────────────────────────────────────────────────────────

pub struct UiLogLayer {
    sender: mpsc::UnboundedSender<LogEntry>,
}

impl UiLogLayer {
    pub fn new(sender: mpsc::UnboundedSender<LogEntry>) -> Self {
        Self { sender }
    }
}

impl<S> tracing_subscriber::Layer<S> for UiLogLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let meta = event.metadata();
        let level = *meta.level();
        let forward = matches!(level, Level::WARN | Level::ERROR)
            || (meta.target() == UI_TARGET && level <= Level::INFO);
        if !forward {
            return;
        }

        let mut message = String::new();
        let mut visitor = MessageVisitor(&mut message);
        event.record(&mut visitor);

        // The viewer may already be gone during shutdown.
        let _ = self.sender.send(LogEntry::new(level, message));
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl<'a> tracing::field::Visit for MessageVisitor<'a> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        } else {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

/// File logging plus the viewer feed.  Returns the receiving end of the feed.
pub fn init(log_path: &Path) -> anyhow::Result<mpsc::UnboundedReceiver<LogEntry>> {
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let (tx, rx) = mpsc::unbounded_channel();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(UiLogLayer::new(tx))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,mediatree=debug")),
        )
        .init();

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_buffer_drops_oldest() {
        let mut buf = LogBuffer::new(2);
        buf.push(LogEntry::new(Level::WARN, "one"));
        buf.push(LogEntry::new(Level::WARN, "two"));
        buf.push(LogEntry::new(Level::ERROR, "three"));
        let messages: Vec<_> = buf.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_layer_forwards_warnings_and_ui_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscriber = tracing_subscriber::registry().with(UiLogLayer::new(tx));
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("hidden");
            tracing::info!("hidden too");
            tracing::warn!("lost {}", 3);
            tracing::info!(target: "mediatree::ui", "rescan finished");
        });
        let first = rx.try_recv().unwrap();
        assert_eq!(first.level, Level::WARN);
        assert_eq!(first.message, "lost 3");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.message, "rescan finished");
        assert!(rx.try_recv().is_err());
    }
}
