//! # Article API Adapter
//!
//! HTTP client for the article fetch/save API.
//!
//! The reconciliation engine only talks to this API twice per session: once
//! to seed the editor with the stored article body, and optionally once more
//! to save the converged body when the session closes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod encoding;

pub use client::{Article, ArticleClient, ArticleClientConfig, ClientError};
pub use encoding::{decode_article_id, encode_article_id};
