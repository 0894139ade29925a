use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Transient user-facing notification. Never stored in the message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl Notifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn success(&self, text: impl Into<String>) {
        self.emit(NoticeLevel::Success, text);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.emit(NoticeLevel::Info, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.emit(NoticeLevel::Error, text);
    }

    fn emit(&self, level: NoticeLevel, text: impl Into<String>) {
        // Nobody listening is fine; notices are fire-and-forget.
        let _ = self.tx.send(Notice {
            level,
            text: text.into(),
        });
    }
}
