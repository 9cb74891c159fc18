//! Post extraction from listing pages
//!
//! The orchestrator only knows the `Extractor` trait. `SelectorExtractor` is
//! the stock implementation, driven by the CSS selectors of a site entry.

use crate::config::SiteConfig;
use crate::crawler::fetcher::Document;
use crate::model::Post;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Turns a fetched document into post candidates
///
/// A malformed or unexpected document yields an empty vector.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &Document) -> Vec<Post>;
}

/// Selector-driven extractor
///
/// # Extraction Rules
///
/// For every element matching `post`:
/// - name: trimmed text of the first `title` match
/// - link: `href` of the first `link` match (defaults to `title`), resolved
///   against the base URL or, without one, the page URL
/// - tag: text of all `tag` matches, normalized
///
/// Candidates missing a name or a resolvable link are skipped.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    post: Selector,
    title: Selector,
    link: Selector,
    tag: Option<Selector>,
    base_url: Option<Url>,
}

impl SelectorExtractor {
    /// Builds the extractor for a configured site
    pub fn from_config(site: &SiteConfig) -> Result<Self, ConfigError> {
        let selectors = &site.selectors;
        let base_url = site
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| ConfigError::InvalidUrl(format!("site '{}': {}", site.name, e)))?;

        Ok(Self {
            post: parse_selector(&selectors.post)?,
            title: parse_selector(&selectors.title)?,
            link: parse_selector(selectors.link.as_deref().unwrap_or(&selectors.title))?,
            tag: selectors.tag.as_deref().map(parse_selector).transpose()?,
            base_url,
        })
    }

    fn extract_one(&self, element: ElementRef<'_>, base: &Url) -> Option<Post> {
        let name = element
            .select(&self.title)
            .next()
            .map(|title| title.text().collect::<String>().trim().to_string())
            .filter(|name| !name.is_empty())?;

        let href = element
            .select(&self.link)
            .next()
            .and_then(|link| link.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())?;
        let link = base.join(href).ok()?;

        let tag = self
            .tag
            .as_ref()
            .map(|selector| {
                element
                    .select(selector)
                    .flat_map(|tag| tag.text())
                    .collect::<String>()
            })
            .unwrap_or_default();

        Some(Post::new(name, link.to_string(), &tag))
    }
}

impl Extractor for SelectorExtractor {
    fn extract(&self, document: &Document) -> Vec<Post> {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => match Url::parse(&document.url) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Cannot resolve links on {}: {}", document.url, e);
                    return Vec::new();
                }
            },
        };

        let html = Html::parse_document(&document.body);
        let posts: Vec<Post> = html
            .select(&self.post)
            .filter_map(|element| self.extract_one(element, &base))
            .collect();

        for post in &posts {
            tracing::trace!("Extracted {} -> {} [{}]", post.name, post.link, post.tag);
        }

        posts
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
