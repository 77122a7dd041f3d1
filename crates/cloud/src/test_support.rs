//! A local HTTP server standing in for a managed service in adapter tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Router;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use tokio::sync::oneshot;

pub(crate) const ACCESS_KEY_ID: &str = "AKIDEXAMPLE";

/// SDK configuration for `eu-west-1` whose calls all go to `mock`.
pub(crate) fn sdk_config_for(mock: &MockService) -> SdkConfig {
    SdkConfig::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("eu-west-1"))
        .endpoint_url(mock.url())
        .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
            ACCESS_KEY_ID,
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            None,
            None,
            "test",
        )))
        .retry_config(RetryConfig::disabled())
        .build()
}

/// One request received by the mock.
#[derive(Debug, Clone)]
pub(crate) struct Captured {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// Decodes a form-encoded body.
    pub fn form(&self) -> HashMap<String, String> {
        let decode = |s: &str| urlencoding::decode(&s.replace('+', " ")).unwrap().into_owned();
        std::str::from_utf8(&self.body)
            .unwrap()
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (decode(k), decode(v)))
            .collect()
    }

    /// Whether the request was signed with the test credentials.
    pub fn signed_by_test_credentials(&self) -> bool {
        self.header("authorization")
            .is_some_and(|auth| auth.contains(&format!("Credential={ACCESS_KEY_ID}/")))
    }
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: &'static str,
    requests: Arc<Mutex<Vec<Captured>>>,
}

async fn capture(
    State(state): State<MockState>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    state
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Captured {
            path: uri.path().to_string(),
            headers,
            body,
        });
    (state.status, state.body)
}

/// Answers every request with a fixed status and body, recording it first.
///
/// The server shuts down when the mock is dropped.
pub(crate) struct MockService {
    base_url: String,
    requests: Arc<Mutex<Vec<Captured>>>,
    _shutdown: oneshot::Sender<()>,
}

impl MockService {
    pub async fn start(status: u16, body: &'static str) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status: StatusCode::from_u16(status).unwrap(),
            body,
            requests: requests.clone(),
        };
        let app = Router::new().fallback(capture).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            _shutdown: shutdown_tx,
        }
    }

    pub fn url(&self) -> String {
        self.base_url.clone()
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn single_request(&self) -> Captured {
        let mut requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.remove(0)
    }
}
