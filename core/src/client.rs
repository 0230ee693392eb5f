//! Client for a remote mock HTTP server.
//!
//! # Design
//! `Mocker` holds only a base URL and a transport, and carries no mutable
//! state between calls, so one instance can be shared across threads when the
//! transport allows it. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`; `register`, `fetch_results`, `clear_all` and `verify`
//! run the round trip in between. Nothing is retried.

use url::Url;

use crate::error::MockerError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::pretty;
use crate::types::{ExpectedRequest, ResultSet};

/// Environment variable read by [`Mocker::from_env`].
pub const BASE_URL_ENV: &str = "MOCKER_URL";

const MOCKS_PATH: &str = "/mocks";

/// Synchronous, stateless client for a mock server's `/mocks` resource.
#[derive(Debug, Clone)]
pub struct Mocker<T = UreqTransport> {
    base_url: String,
    transport: T,
}

impl Mocker<UreqTransport> {
    /// Bind to `base_url`. The URL is not validated until first use.
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, UreqTransport::new())
    }

    /// Bind to the URL in `MOCKER_URL`.
    pub fn from_env() -> Result<Self, MockerError> {
        let base_url = std::env::var(BASE_URL_ENV)
            .map_err(|_| MockerError::InvalidRequest(format!("{BASE_URL_ENV} is not set")))?;
        Ok(Self::new(&base_url))
    }
}

impl<T: Transport> Mocker<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}/mocks` and decode the pending and unexpected calls.
    pub fn fetch_results(&self) -> Result<ResultSet, MockerError> {
        let request = self.build_fetch_results()?;
        self.parse_fetch_results(self.transport.execute(&request)?)
    }

    /// Fetch results and fail if any expectation is pending or any
    /// unexpected call was recorded.
    pub fn verify(&self) -> Result<(), MockerError> {
        let results = self.fetch_results()?;
        check(&results)
    }

    /// `POST {base}/mocks` with `expectation` as JSON.
    pub fn register(&self, expectation: &ExpectedRequest) -> Result<(), MockerError> {
        let request = self.build_register(expectation)?;
        self.parse_register(self.transport.execute(&request)?)
    }

    /// `DELETE {base}/mocks`, dropping all expectations and recorded calls.
    pub fn clear_all(&self) -> Result<(), MockerError> {
        let request = self.build_clear_all()?;
        self.parse_clear_all(self.transport.execute(&request)?)
    }

    pub fn build_fetch_results(&self) -> Result<HttpRequest, MockerError> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: self.mocks_url()?,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn build_register(&self, expectation: &ExpectedRequest) -> Result<HttpRequest, MockerError> {
        let url = self.mocks_url()?;
        let body = serde_json::to_vec(expectation)
            .map_err(|e| MockerError::Serialization(e.to_string()))?;
        log::trace!("registering {}", String::from_utf8_lossy(&body));
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    pub fn build_clear_all(&self) -> Result<HttpRequest, MockerError> {
        Ok(HttpRequest {
            method: HttpMethod::Delete,
            url: self.mocks_url()?,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn parse_fetch_results(&self, response: HttpResponse) -> Result<ResultSet, MockerError> {
        if response.status != 200 {
            return Err(server_error(response.status, "failed to get mocks"));
        }
        serde_json::from_slice(&response.body).map_err(|e| MockerError::Decode(e.to_string()))
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<(), MockerError> {
        if response.status == 201 {
            return Ok(());
        }
        Err(server_error(
            response.status,
            format!("failed to create mock {}", pretty::indent_raw(&response.body)),
        ))
    }

    pub fn parse_clear_all(&self, response: HttpResponse) -> Result<(), MockerError> {
        if response.status != 204 {
            return Err(server_error(response.status, "failed to clear mocks"));
        }
        Ok(())
    }

    fn mocks_url(&self) -> Result<String, MockerError> {
        let raw = format!("{}{MOCKS_PATH}", self.base_url);
        Url::parse(&raw)
            .map(String::from)
            .map_err(|e| MockerError::InvalidRequest(format!("parse {raw}: {e}")))
    }
}

/// Turn a result set into `Ok` when both lists are empty, otherwise a
/// `Verification` error listing missing calls first, then unexpected ones.
pub fn check(results: &ResultSet) -> Result<(), MockerError> {
    let mut lines = Vec::new();

    if !results.expected.is_empty() {
        let dump = pretty::to_pretty_string(&results.expected)
            .map_err(|e| MockerError::Serialization(e.to_string()))?;
        lines.push(format!(
            "missing {} expected calls: {dump}",
            results.expected.len()
        ));
    }

    if !results.unexpected.is_empty() {
        let dump = pretty::to_pretty_string(&results.unexpected)
            .map_err(|e| MockerError::Serialization(e.to_string()))?;
        lines.push(format!(
            "{} unexpected calls: {dump}",
            results.unexpected.len()
        ));
    }

    if lines.is_empty() {
        return Ok(());
    }

    Err(MockerError::Verification {
        missing: results.expected.len(),
        unexpected: results.unexpected.len(),
        message: lines.join("\n"),
    })
}

fn server_error(status: u16, message: impl Into<String>) -> MockerError {
    MockerError::Server {
        status,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseSpec;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request it sees.
    #[derive(Default)]
    struct FakeTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, MockerError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn replying(response: HttpResponse) -> Self {
            Self::failing_or(Ok(response))
        }

        fn failing_or(result: Result<HttpResponse, MockerError>) -> Self {
            let fake = Self::default();
            fake.responses.lock().unwrap().push_back(result);
            fake
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, MockerError> {
            self.seen.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no canned response left")
        }
    }

    const BASE: &str = "http://localhost:3000";

    fn squash(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn sample() -> ExpectedRequest {
        ExpectedRequest::new("foo", "bar", ResponseSpec::new(200)).query("biz", "baz")
    }

    #[test]
    fn new_keeps_base_url() {
        assert_eq!(Mocker::new("foo").base_url(), "foo");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let mocker = Mocker::new("http://localhost:3000/");
        let req = mocker.build_fetch_results().unwrap();
        assert_eq!(req.url, "http://localhost:3000/mocks");
    }

    #[test]
    fn unparseable_base_fails_before_io() {
        let fake = FakeTransport::default();
        let mocker = Mocker::with_transport(":", &fake);

        for err in [
            mocker.fetch_results().map(|_| ()).unwrap_err(),
            mocker.register(&sample()).unwrap_err(),
            mocker.clear_all().unwrap_err(),
            mocker.verify().unwrap_err(),
        ] {
            assert!(matches!(err, MockerError::InvalidRequest(_)), "got {err:?}");
            assert!(err.to_string().starts_with("parse :/mocks: "));
        }
        assert!(fake.requests().is_empty());
    }

    #[test]
    fn empty_base_is_invalid() {
        let err = Mocker::new("").build_clear_all().unwrap_err();
        assert!(matches!(err, MockerError::InvalidRequest(_)));
    }

    #[test]
    fn transport_errors_pass_through() {
        let fake = FakeTransport::failing_or(Err(MockerError::Transport("refused".into())));
        let err = Mocker::with_transport(BASE, &fake).clear_all().unwrap_err();
        assert_eq!(err, MockerError::Transport("refused".into()));
    }

    #[test]
    fn fetch_results_issues_get() {
        let fake = FakeTransport::replying(HttpResponse::new(200, r#"{"expected":[],"unexpected":[]}"#));
        let results = Mocker::with_transport(BASE, &fake).fetch_results().unwrap();
        assert!(results.is_empty());

        let seen = fake.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, HttpMethod::Get);
        assert_eq!(seen[0].url, "http://localhost:3000/mocks");
        assert!(seen[0].body.is_none());
    }

    #[test]
    fn fetch_results_non_200_is_server_error() {
        let fake = FakeTransport::replying(HttpResponse::new(500, ""));
        let err = Mocker::with_transport(BASE, &fake).fetch_results().unwrap_err();
        assert_eq!(
            err,
            MockerError::Server {
                status: 500,
                message: "failed to get mocks".into()
            }
        );
    }

    #[test]
    fn fetch_results_bad_json_is_decode_error() {
        let fake = FakeTransport::replying(HttpResponse::new(200, "foo"));
        let err = Mocker::with_transport(BASE, &fake).fetch_results().unwrap_err();
        assert!(matches!(err, MockerError::Decode(_)), "got {err:?}");
    }

    #[test]
    fn register_posts_sparse_json() {
        let fake = FakeTransport::replying(HttpResponse::new(201, ""));
        Mocker::with_transport(BASE, &fake).register(&sample()).unwrap();

        let seen = fake.requests();
        assert_eq!(seen[0].method, HttpMethod::Post);
        assert_eq!(seen[0].url, "http://localhost:3000/mocks");
        assert_eq!(
            seen[0].headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        assert_eq!(
            seen[0].body.as_deref(),
            Some(&br#"{"method":"foo","path":"bar","query":{"biz":"baz"},"response":{"status":200}}"#[..])
        );
    }

    #[test]
    fn register_failure_echoes_pretty_body() {
        let fake = FakeTransport::replying(HttpResponse::new(500, r#"{"err":"damn"}"#));
        let err = Mocker::with_transport(BASE, &fake).register(&sample()).unwrap_err();
        assert_eq!(err.to_string(), "failed to create mock {\n\t\"err\": \"damn\"\n}");
        assert_eq!(squash(&err.to_string()), r#"failed to create mock { "err": "damn" }"#);
    }

    #[test]
    fn register_failure_echoes_raw_text() {
        let fake = FakeTransport::replying(HttpResponse::new(400, "bad mock"));
        let err = Mocker::with_transport(BASE, &fake).register(&sample()).unwrap_err();
        assert_eq!(err.to_string(), "failed to create mock bad mock");
        assert_eq!(err.kind(), crate::error::ErrorKind::Server);
    }

    #[test]
    fn register_rejects_200() {
        let fake = FakeTransport::replying(HttpResponse::new(200, ""));
        let err = Mocker::with_transport(BASE, &fake).register(&sample()).unwrap_err();
        assert!(matches!(err, MockerError::Server { status: 200, .. }));
    }

    #[test]
    fn clear_all_issues_delete() {
        let fake = FakeTransport::replying(HttpResponse::new(204, ""));
        Mocker::with_transport(BASE, &fake).clear_all().unwrap();
        assert_eq!(fake.requests()[0].method, HttpMethod::Delete);
    }

    #[test]
    fn clear_all_non_204_is_server_error() {
        let fake = FakeTransport::replying(HttpResponse::new(200, ""));
        let err = Mocker::with_transport(BASE, &fake).clear_all().unwrap_err();
        assert_eq!(err.to_string(), "failed to clear mocks");
    }

    #[test]
    fn verify_passes_on_empty_results() {
        let fake = FakeTransport::replying(HttpResponse::new(
            200,
            r#"{"unexpected": [], "expected": []}"#,
        ));
        assert!(Mocker::with_transport(BASE, &fake).verify().is_ok());
    }

    #[test]
    fn verify_reports_missing_calls() {
        let fake = FakeTransport::replying(HttpResponse::new(200, r#"{"expected": [{}]}"#));
        let err = Mocker::with_transport(BASE, &fake).verify().unwrap_err();
        assert_eq!(
            squash(&err.to_string()),
            r#"missing 1 expected calls: [ { "method": "", "path": "", "response": null } ]"#
        );
    }

    #[test]
    fn verify_reports_unexpected_calls() {
        let fake = FakeTransport::replying(HttpResponse::new(200, r#"{"unexpected": [{}]}"#));
        let err = Mocker::with_transport(BASE, &fake).verify().unwrap_err();
        assert_eq!(
            squash(&err.to_string()),
            r#"1 unexpected calls: [ { "method": "", "path": "", "response": null } ]"#
        );
    }

    #[test]
    fn verify_lists_missing_before_unexpected() {
        let results = ResultSet {
            expected: vec![ExpectedRequest::new("GET", "/a", ResponseSpec::new(200))],
            unexpected: vec![
                ExpectedRequest {
                    method: "GET".into(),
                    path: "/b".into(),
                    ..ExpectedRequest::default()
                },
                ExpectedRequest {
                    method: "GET".into(),
                    path: "/c".into(),
                    ..ExpectedRequest::default()
                },
            ],
        };
        let err = check(&results).unwrap_err();
        let message = err.to_string();
        let missing = message.find("missing 1 expected calls: [").unwrap();
        let unexpected = message.find("\n2 unexpected calls: [").unwrap();
        assert!(missing < unexpected);
        assert!(matches!(
            err,
            MockerError::Verification {
                missing: 1,
                unexpected: 2,
                ..
            }
        ));
    }

    #[test]
    fn verify_propagates_fetch_errors() {
        let fake = FakeTransport::replying(HttpResponse::new(503, ""));
        let err = Mocker::with_transport(BASE, &fake).verify().unwrap_err();
        assert_eq!(err.to_string(), "failed to get mocks");
    }

    #[test]
    fn mocker_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Mocker>();
    }
}
