use drivepick_core::{ApiErrorClass, GatewayError};
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Short user-facing message about the outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, description)
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, description)
    }

    /// Error notice whose description follows the failure class.
    pub fn failure(title: impl Into<String>, err: &GatewayError) -> Self {
        Self::error(title, describe_failure(err))
    }

    fn new(level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
        }
    }
}

pub fn describe_failure(err: &GatewayError) -> &'static str {
    match err.classification() {
        ApiErrorClass::Auth => "Your session has expired. Please sign in again.",
        ApiErrorClass::RateLimit => "Too many requests. Please wait a moment and try again.",
        ApiErrorClass::Transient => "The file service is unavailable. Please try again.",
        ApiErrorClass::Permanent => "The request could not be completed.",
    }
}

/// Sending half of the notice channel. Sending never blocks and never fails
/// loudly; notices sent after the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            tracing::debug!("notice receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn failure_description_follows_classification() {
        let auth = GatewayError::Api {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        let notice = Notice::failure("Error", &auth);
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.description.contains("sign in"));

        let down = GatewayError::Unavailable("offline".into());
        assert!(Notice::failure("Error", &down).description.contains("try again"));
    }

    #[tokio::test]
    async fn notices_arrive_in_order_and_survive_dropped_receiver() {
        let (notifier, mut rx) = Notifier::channel();
        notifier.send(Notice::info("a", ""));
        notifier.send(Notice::success("b", ""));
        assert_eq!(rx.recv().await.unwrap().title, "a");
        assert_eq!(rx.recv().await.unwrap().level, NoticeLevel::Success);

        drop(rx);
        notifier.send(Notice::error("c", ""));
    }
}
