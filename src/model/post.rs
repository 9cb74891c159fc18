//! Post records and their identity
//!
//! A post's identity is a SHA-256 digest over its name and link. The tag is
//! deliberately left out, so a re-crawl that only sees a different tag maps
//! to the same stored entry and is not treated as a change.

use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic dedup key of a post, hex-encoded SHA-256
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostIdentity(String);

impl PostIdentity {
    /// Derives the identity of a `(name, link)` pair
    ///
    /// Both fields are length-prefixed before hashing so that moving bytes
    /// between the name and the link always changes the digest.
    pub fn derive(name: &str, link: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((name.len() as u64).to_be_bytes());
        hasher.update(name.as_bytes());
        hasher.update((link.len() as u64).to_be_bytes());
        hasher.update(link.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps an identity read back from storage
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A crawled blog post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Display title
    pub name: String,

    /// Absolute URL of the post
    pub link: String,

    /// Normalized lowercase tag, possibly empty
    pub tag: String,

    /// Dedup key, always `PostIdentity::derive(name, link)` for fresh posts
    pub identity: PostIdentity,
}

impl Post {
    /// Builds a post candidate, normalizing the tag and deriving the identity
    pub fn new(name: impl Into<String>, link: impl Into<String>, tag: &str) -> Self {
        let name = name.into();
        let link = link.into();
        let identity = PostIdentity::derive(&name, &link);
        Self {
            name,
            link,
            tag: normalize_tag(tag),
            identity,
        }
    }

    /// Rebuilds a post as stored, keeping the persisted identity as-is
    pub fn from_stored(name: String, link: String, tag: String, identity: PostIdentity) -> Self {
        Self {
            name,
            link,
            tag,
            identity,
        }
    }
}

/// Normalizes raw tag text scraped from a listing
///
/// Newlines are dropped, `#` markers become spaces, the result is lowercased
/// and trimmed.
///
/// ```
/// use devread_crawler::model::normalize_tag;
///
/// assert_eq!(normalize_tag("\n#Rust#Async\n"), "rust async");
/// ```
pub fn normalize_tag(raw: &str) -> String {
    raw.replace('\n', "")
        .replace('#', " ")
        .to_lowercase()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_stable() {
        let a = PostIdentity::derive("Hello", "https://example.com/hello");
        let b = PostIdentity::derive("Hello", "https://example.com/hello");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_identity_differs_on_name_or_link() {
        let base = PostIdentity::derive("Hello", "https://example.com/hello");
        assert_ne!(base, PostIdentity::derive("Hello!", "https://example.com/hello"));
        assert_ne!(base, PostIdentity::derive("Hello", "https://example.com/hello2"));
    }

    #[test]
    fn test_identity_not_fooled_by_shifted_boundary() {
        let a = PostIdentity::derive("ab", "c");
        let b = PostIdentity::derive("a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_ignores_tag() {
        let a = Post::new("Hello", "https://example.com/hello", "rust");
        let b = Post::new("Hello", "https://example.com/hello", "go");
        assert_eq!(a.identity, b.identity);
        assert_ne!(a.tag, b.tag);
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("#Rust"), "rust");
        assert_eq!(normalize_tag("#Rust\n#Tokio"), "rust tokio");
        assert_eq!(normalize_tag(""), "");
        assert_eq!(normalize_tag("  Web  "), "web");
    }

    #[test]
    fn test_new_post_normalizes_tag() {
        let post = Post::new("Title", "https://example.com/t", "#DevOps");
        assert_eq!(post.tag, "devops");
    }
}
