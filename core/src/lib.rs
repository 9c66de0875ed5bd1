//! Typed client for the Learnify premium API.
//!
//! # Overview
//! Covers the user/subscription endpoints and the book and answer-lookup
//! ("GDZ") endpoints. The client builds authenticated requests, sends them
//! over a scoped session and decodes responses into typed records.
//!
//! ```no_run
//! use learnify_core::{ClientConfig, LearnifyClient};
//!
//! let mut client = LearnifyClient::new(ClientConfig::new("token"));
//! let user = client.scoped(|api| api.get_user(42))?;
//! println!("{} is active: {}", user.user_id, user.is_active);
//! # Ok::<(), learnify_core::ApiError>(())
//! ```
//!
//! # Design
//! - Each operation has a pure `build_*` step producing an `ApiCall`, so the
//!   exact method, path, query and body can be checked without I/O.
//! - `request` takes an explicit `DecodeMode` and returns the matching
//!   `Decoded` variant.
//! - Network access goes through the `Transport` / `Connector` traits; the
//!   default implementation uses `ureq`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod call;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod query;
pub mod session;
pub mod time;
pub mod types;

pub use call::ApiCall;
pub use client::{LearnifyClient, Session};
pub use config::ClientConfig;
pub use decode::{DecodeMode, Decoded};
pub use error::ApiError;
pub use http::{CustomHeaders, HttpMethod, HttpRequest, HttpResponse};
pub use query::{encode_query, Query, QueryValue};
pub use session::{Connector, Transport, UreqConnector, UreqTransport};
pub use types::{Book, BookDetails, BookLookup, BookUpdate, GdzAnswer, GdzQuery, GdzSolution, User, UserUpdate};
