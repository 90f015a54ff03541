//! reviewdesk: conference review desk tooling.
//!
//! Scrapes review metadata from OpenReview, triages papers by topical
//! relevance with an LLM, and exports summary rows to Google Sheets.
//! Expensive remote calls go through the disk-backed [`cache::MemoCache`].

pub mod ac_tasks;
pub mod cache;
pub mod config;
pub mod error;
pub mod llm;
pub mod openreview;
pub mod relevance;
pub mod sheets;

pub use error::{Result, ReviewDeskError};

/// Crate version, as reported by `reviewdesk --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
