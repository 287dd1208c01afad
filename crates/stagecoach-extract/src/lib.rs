//! Request facet extraction for Stagecoach.
//!
//! A *facet* is one named slice of an inbound request: its headers, decoded
//! body, query string, cookies, raw `Authorization` value, method or path.
//! This crate turns a [`Request`](stagecoach_core::Request) into those raw
//! facet values; parse stages in `stagecoach-pipeline` hand them to user
//! handlers.
//!
//! # Facets
//!
//! | Facet | Raw value | Failure status |
//! |-------|-----------|----------------|
//! | `headers` | [`http::HeaderMap`] | 400 |
//! | `body` | [`decode_body`] result | 400 |
//! | `query` | [`QueryMap`] | 400 |
//! | `cookies` | [`CookieMap`] | 400 |
//! | `auth` | [`authorization`] result | 401 |
//! | `method` | [`MethodSet::check`] result | 405 |
//! | `path` | [`PathMatch`] | 404 |
//!
//! # Example
//!
//! ```
//! use stagecoach_extract::{parse_cookies, parse_query, MethodSet};
//! use http::Method;
//!
//! let query = parse_query("page=2").unwrap();
//! assert_eq!(query["page"], "2");
//!
//! let cookies = parse_cookies("session=abc");
//! assert_eq!(cookies["session"], "abc");
//!
//! assert!(MethodSet::from(Method::GET).check(&Method::POST).is_err());
//! ```

#![doc(html_root_url = "https://docs.rs/stagecoach-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod body;
mod cache;
mod cookie;
mod error;
mod facet;
mod header;
mod method;
mod path;
mod query;

pub use body::decode_body;
pub use cache::FacetCache;
pub use cookie::{cookies_from_headers, parse_cookies, CookieMap};
pub use error::FacetError;
pub use facet::Facet;
pub use header::authorization;
pub use method::MethodSet;
pub use path::{match_exact, PathMatch};
pub use query::{parse_query, QueryMap};
