//! Sink which POSTs each batch as JSON to a collector endpoint.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::{Error, Result};

use async_trait::async_trait;
use beacon_sink::{Event, Sink};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::trace;
use url::Url;

static JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Serialize)]
struct EventsBody<'a> {
    events: &'a [Event],
}

/// An HTTP implementation of the `Sink` trait.
#[derive(Clone, Debug)]
pub struct HttpSink {
    client: Client,
    endpoint: Url,
}

impl HttpSink {
    /// Creates a new `HttpSink` posting to the given endpoint.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The endpoint is empty
    /// - The endpoint is not a valid URL
    /// - The endpoint scheme is not `http` or `https`
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_client(endpoint, Client::new())
    }

    /// Creates a new `HttpSink` using a preconfigured client.
    ///
    /// # Errors
    ///
    /// Same as [`HttpSink::new`].
    pub fn with_client(endpoint: &str, client: Client) -> Result<Self> {
        let endpoint = endpoint.trim();

        if endpoint.is_empty() {
            return Err(Error::MissingEndpoint);
        }

        let endpoint = Url::parse(endpoint).map_err(|source| Error::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;

        match endpoint.scheme() {
            "http" | "https" => Ok(Self { client, endpoint }),
            scheme => Err(Error::UnsupportedScheme(scheme.to_string())),
        }
    }

    /// The endpoint batches are posted to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Sink for HttpSink {
    type Error = Error;

    async fn deliver(&self, events: &[Event]) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(&EventsBody { events })
            .send()
            .await?;

        let status = response.status();
        trace!(%status, events = events.len(), endpoint = %self.endpoint, "posted batch");

        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Status(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    async fn collect(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> StatusCode {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        captured.lock().await.push((content_type, body));

        StatusCode::NO_CONTENT
    }

    async fn reject() -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    async fn start_collector() -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route("/events", post(collect))
            .route("/unavailable", post(reject))
            .with_state(captured.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), captured)
    }

    #[tokio::test]
    async fn test_posts_events_as_json() {
        let (base, captured) = start_collector().await;
        let sink = HttpSink::new(&format!("{base}/events")).unwrap();

        let events = vec![
            Event::at(1, "page_load", json!({ "match": "m1", "page": "home" }), "", ""),
            Event::at(2, "click", json!({ "match": "m1" }), "https://app/", "agent"),
        ];

        sink.deliver(&events).await.unwrap();

        let captured = captured.lock().await;
        assert_eq!(captured.len(), 1);

        let (content_type, body) = &captured[0];
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(
            body,
            &json!({
                "events": [
                    {
                        "event": "page_load",
                        "properties": { "match": "m1", "page": "home" },
                        "timestamp": 1,
                        "url": "",
                        "userAgent": "",
                    },
                    {
                        "event": "click",
                        "properties": { "match": "m1" },
                        "timestamp": 2,
                        "url": "https://app/",
                        "userAgent": "agent",
                    },
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let (base, _captured) = start_collector().await;
        let sink = HttpSink::new(&format!("{base}/unavailable")).unwrap();

        let result = sink.deliver(&[Event::new("a", json!({}), "", "")]).await;

        assert!(matches!(
            result,
            Err(Error::Status(StatusCode::SERVICE_UNAVAILABLE))
        ));
    }

    #[tokio::test]
    async fn test_connection_failure_is_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = HttpSink::new(&format!("http://{addr}/events")).unwrap();
        let result = sink.deliver(&[Event::new("a", json!({}), "", "")]).await;

        assert!(matches!(result, Err(Error::Request(_))));
    }

    #[tokio::test]
    async fn test_rejects_missing_endpoint() {
        assert!(matches!(HttpSink::new(""), Err(Error::MissingEndpoint)));
        assert!(matches!(HttpSink::new("   "), Err(Error::MissingEndpoint)));
    }

    #[tokio::test]
    async fn test_rejects_invalid_endpoint() {
        assert!(matches!(
            HttpSink::new("not a url"),
            Err(Error::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            HttpSink::new("ftp://example.com/events"),
            Err(Error::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
    }

    #[tokio::test]
    async fn test_keeps_endpoint() {
        let sink = HttpSink::new("https://api.example.com/analytics").unwrap();

        assert_eq!(sink.endpoint().as_str(), "https://api.example.com/analytics");
    }
}
