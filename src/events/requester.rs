//! HTTP client for the Diablo IV events API.
//!
//! This module provides the [`EventsRequester`] struct for fetching the
//! current [`EventSnapshot`] from the upstream API.

use log::{debug, info};
use mockall::automock;
use reqwest::Client;
use serenity::async_trait;

use crate::events::{
    FetchError, response_structs::EventsResponse, structs::EventSnapshot,
};

/// HTTP client requesting the recent events from the events API.
///
/// # Examples
///
/// ```no_run
/// let requester = EventsRequester::new("https://d4armory.io/api/events/recent");
/// let snapshot = requester.fetch().await?;
/// println!("Events: {}", snapshot);
/// ```
pub struct EventsRequester {
    /// Full URL of the recent events endpoint
    url: String,
    /// HTTP client
    client: Client,
}

/// Trait for fetching events.
///
/// This trait abstracts the HTTP operations for easier testing with mocks.
#[automock]
#[async_trait]
pub trait EventRequester: Send + Sync {
    /// Fetches the current events.
    ///
    /// There is no retry: the caller keeps its previous snapshot and tries
    /// again on its next tick.
    async fn fetch(&self) -> Result<EventSnapshot, FetchError>;
}

impl EventsRequester {
    /// Create a new [EventsRequester].
    ///
    /// # Arguments
    ///
    /// * `url` - The full URL of the recent events endpoint.
    pub fn new(url: &str) -> Self {
        EventsRequester {
            url: url.to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl EventRequester for EventsRequester {
    /// Request the recent events.
    ///
    /// This api call returns a json object with the three events:
    /// ```text
    /// {
    ///   boss: { name, expectedName, nextExpectedName, timestamp, expected, nextExpected, territory, zone },
    ///   legion: { timestamp, expected, nextExpected, territory, zone },
    ///   helltide: { timestamp, zone, refresh }
    /// }
    /// ```
    /// A non-success status or a payload that does not match this shape is an
    /// error.
    async fn fetch(&self) -> Result<EventSnapshot, FetchError> {
        info!("request events");
        debug!("request {}", &self.url);

        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        let events: EventsResponse = serde_json::from_slice(&body)?;

        debug!("response from {} -> {:?}", &self.url, &events);

        Ok(events.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "boss": {"name": "Avarice", "expectedName": "Ashava", "nextExpectedName": "Wandering Death",
                 "timestamp": 1700000000, "expected": 1700020000, "nextExpected": 1700040000,
                 "territory": "Fractured Peaks", "zone": "Sarkova Pass"},
        "legion": {"timestamp": 1700000100, "expected": 1700001900, "nextExpected": 1700003700,
                   "territory": "Scosglen", "zone": "Deep Forest"},
        "helltide": {"timestamp": 1700000200, "zone": "scos", "refresh": 1700003800}
    }"#;

    #[tokio::test]
    async fn test_fetch() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/api/events/recent", server.url());

        server
            .mock("GET", "/api/events/recent")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let requester = EventsRequester::new(&url);
        let snapshot = requester.fetch().await.unwrap();
        assert_eq!(snapshot.boss.expected_name, "Ashava");
        assert_eq!(snapshot.boss.expected, 1700020000);
        assert_eq!(snapshot.legion.timestamp, 1700000100);
        assert_eq!(snapshot.helltide.zone, "scos");
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/api/events/recent", server.url());

        server
            .mock("GET", "/api/events/recent")
            .with_status(503)
            .create_async()
            .await;

        let requester = EventsRequester::new(&url);
        let result = requester.fetch().await;
        assert!(matches!(
            result,
            Err(FetchError::Status(status)) if status.as_u16() == 503
        ));
    }

    #[tokio::test]
    async fn test_fetch_schema_error() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/api/events/recent", server.url());

        server
            .mock("GET", "/api/events/recent")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY.replace(r#""zone": "scos", "#, ""))
            .create_async()
            .await;

        let requester = EventsRequester::new(&url);
        assert!(matches!(requester.fetch().await, Err(FetchError::Schema(_))));
    }

    #[tokio::test]
    async fn test_fetch_not_json() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/api/events/recent", server.url());

        server
            .mock("GET", "/api/events/recent")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let requester = EventsRequester::new(&url);
        assert!(matches!(requester.fetch().await, Err(FetchError::Schema(_))));
    }

    #[tokio::test]
    async fn test_fetch_network_error() {
        // nothing listens on port 9 of localhost
        let requester = EventsRequester::new("http://127.0.0.1:9/api/events/recent");
        assert!(matches!(requester.fetch().await, Err(FetchError::Network(_))));
    }
}
