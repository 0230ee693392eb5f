//! Synchronous client for a remote mock HTTP server.
//!
//! # Overview
//! A test registers expected request/response pairs with the server, lets
//! traffic flow, then asks the server whether every expectation was consumed
//! and nothing unexpected arrived. All state lives on the server; this crate
//! only builds requests, interprets status codes and formats failures.
//!
//! # Design
//! - `Mocker` is stateless: a base URL plus a `Transport`.
//! - Each operation is split into `build_*` and `parse_*` around a single
//!   transport call, so status handling is testable without sockets.
//! - `MockerError` keeps transport, server, decode and verification failures
//!   apart so callers can tell them apart programmatically.
//!
//! ```no_run
//! use mocker_core::{ExpectedRequest, Mocker, ResponseSpec};
//!
//! let mocker = Mocker::new("http://127.0.0.1:3000");
//! mocker.clear_all()?;
//! mocker.register(&ExpectedRequest::new("GET", "/users", ResponseSpec::new(200)))?;
//! // ... exercise the code under test ...
//! mocker.verify()?;
//! # Ok::<(), mocker_core::MockerError>(())
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod pretty;
pub mod types;

pub use client::{check, Mocker, BASE_URL_ENV};
pub use error::{ErrorKind, MockerError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use types::{ExpectedRequest, ResponseSpec, ResultSet};
