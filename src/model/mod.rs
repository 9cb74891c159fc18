//! Data model for crawled posts
//!
//! - `Post`: a crawled record with its deterministic identity
//! - `PostIdentity`: the dedup key derived from a post's name and link
//! - `Outcome`: what the ingestion policy did with one candidate

mod outcome;
mod post;

pub use outcome::Outcome;
pub use post::{normalize_tag, Post, PostIdentity};
