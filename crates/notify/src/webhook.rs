use std::time::Duration;

use {
    tokio::{
        sync::mpsc::{self, error::TrySendError},
        task::JoinHandle,
    },
    tracing::{debug, warn},
};

use crate::{NotificationEvent, Notifier};

/// Messages buffered before new ones are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Posts `{"content": <message>}` to a webhook URL.
///
/// Delivery runs on one background task, so messages leave in the order
/// they were queued and the caller never waits on the network.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    tx: mpsc::Sender<String>,
}

impl WebhookNotifier {
    /// Start the delivery worker.
    ///
    /// The returned handle completes once every clone of the notifier has
    /// been dropped and the queue is drained. Must be called inside a tokio
    /// runtime.
    pub fn spawn(
        url: impl Into<String>,
        timeout: Duration,
        capacity: usize,
    ) -> Result<(Self, JoinHandle<()>), reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(deliver_all(client, url.into(), rx));
        Ok((Self { tx }, worker))
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: NotificationEvent) {
        let category = event.category();
        match self.tx.try_send(event.message()) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                debug!(category, "notification queue full, dropping message");
            },
            Err(TrySendError::Closed(_)) => {
                debug!(category, "notification worker gone, dropping message");
            },
        }
    }
}

async fn deliver_all(client: reqwest::Client, url: String, mut rx: mpsc::Receiver<String>) {
    while let Some(message) = rx.recv().await {
        deliver(&client, &url, &message).await;
    }
    debug!("notification worker stopped");
}

/// At-most-once POST; every failure ends here.
async fn deliver(client: &reqwest::Client, url: &str, message: &str) {
    let body = serde_json::json!({ "content": message });
    match client.post(url).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => {},
        Ok(resp) => {
            let status = resp.status();
            warn!(status = %status, "notification webhook rejected message");
        },
        Err(e) => {
            warn!(error = %e, "notification webhook unreachable");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> NotificationEvent {
        NotificationEvent::Started {
            credentials: 2,
            models: 3,
        }
    }

    #[tokio::test]
    async fn posts_each_message_in_order() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/hook")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "content": started().message()
            })))
            .with_status(204)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/hook")
            .match_body(mockito::Matcher::Regex("all attempts failed".into()))
            .with_status(204)
            .create_async()
            .await;

        let (notifier, worker) = WebhookNotifier::spawn(
            format!("{}/hook", server.url()),
            Duration::from_secs(2),
            DEFAULT_QUEUE_CAPACITY,
        )
        .unwrap();
        notifier.notify(started());
        notifier.notify(NotificationEvent::Failed {
            attempts: 6,
            kind: "rate_limited",
            detail: "HTTP 429".into(),
        });
        drop(notifier);
        worker.await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_swallowed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let (notifier, worker) = WebhookNotifier::spawn(
            format!("{}/hook", server.url()),
            Duration::from_secs(2),
            DEFAULT_QUEUE_CAPACITY,
        )
        .unwrap();
        notifier.notify(started());
        notifier.notify(started());
        drop(notifier);
        worker.await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_endpoint_does_not_block_or_panic() {
        let (notifier, worker) = WebhookNotifier::spawn(
            "http://127.0.0.1:9/unreachable",
            Duration::from_millis(200),
            DEFAULT_QUEUE_CAPACITY,
        )
        .unwrap();
        notifier.notify(started());
        drop(notifier);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let notifier = WebhookNotifier { tx };
        notifier.notify(started());
        notifier.notify(started());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn noop_accepts_everything() {
        crate::NoopNotifier.notify(started());
    }
}
