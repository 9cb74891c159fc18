//! Page discovery
//!
//! Listing pages are enumerated either as a fixed range `1..=K` or by
//! following the next-page link from page 1. Link following is serial by
//! nature: each step needs the previous page's body.

use crate::config::PaginationConfig;
use crate::crawler::extractor::parse_selector;
use crate::crawler::fetcher::Fetcher;
use crate::ConfigError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One listing page to crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTask {
    pub page: u32,
    pub url: String,
}

/// Substitutes `page` into a `{page}` URL template
pub fn expand_page_url(template: &str, page: u32) -> String {
    template.replace("{page}", &page.to_string())
}

/// Page enumeration strategy
#[derive(Debug, Clone)]
pub enum PageDiscovery {
    FixedRange { pages: u32 },
    LinkFollowing { next: Selector },
}

impl PageDiscovery {
    pub fn from_config(config: &PaginationConfig) -> Result<Self, ConfigError> {
        Ok(match config {
            PaginationConfig::FixedRange { pages } => Self::FixedRange { pages: *pages },
            PaginationConfig::LinkFollowing { next_selector } => Self::LinkFollowing {
                next: parse_selector(next_selector)?,
            },
        })
    }

    /// Lists the pages to crawl
    ///
    /// Link following stops when a page has no next link, when the next link
    /// points at a page already visited, when a fetch gives up, or when the
    /// run is cancelled. Pages found before the stop are kept.
    pub async fn plan(
        &self,
        template: &str,
        fetcher: &Fetcher,
        cancel: &CancellationToken,
    ) -> Vec<PageTask> {
        match self {
            Self::FixedRange { pages } => (1..=*pages)
                .map(|page| PageTask {
                    page,
                    url: expand_page_url(template, page),
                })
                .collect(),
            Self::LinkFollowing { next } => follow_links(template, next, fetcher, cancel).await,
        }
    }
}

async fn follow_links(
    template: &str,
    next: &Selector,
    fetcher: &Fetcher,
    cancel: &CancellationToken,
) -> Vec<PageTask> {
    let mut pages = Vec::new();
    let mut seen = HashSet::new();
    let mut page = 1;

    loop {
        if cancel.is_cancelled() {
            tracing::warn!("Run cancelled during page discovery");
            break;
        }

        if !seen.insert(page) {
            tracing::warn!("Next link loops back to page {}; stopping discovery", page);
            break;
        }

        let url = expand_page_url(template, page);
        pages.push(PageTask {
            page,
            url: url.clone(),
        });

        let document = match fetcher.fetch(&url).await {
            Ok(document) => document,
            Err(e) => {
                tracing::error!("Page discovery stopped at {}: {}", url, e);
                break;
            }
        };

        match next_page_number(&document.body, next) {
            Some(n) => page = n,
            None => break,
        }
    }

    tracing::info!("Discovered {} pages", pages.len());
    pages
}

/// Reads the target page number of the next-page link in `body`
pub fn next_page_number(body: &str, next: &Selector) -> Option<u32> {
    let html = Html::parse_document(body);
    let href = html
        .select(next)
        .find_map(|element| element.value().attr("href"))?;
    page_number_from_href(href)
}

/// Extracts a page number from a next-page href
///
/// Understands `?page=N` queries and `/page/N` style paths, and otherwise
/// falls back to the text after the last `=`.
pub fn page_number_from_href(href: &str) -> Option<u32> {
    let href = href.trim();
    let base = Url::parse("http://localhost/").ok()?;

    if let Ok(url) = base.join(href) {
        if let Some((_, value)) = url.query_pairs().find(|(key, _)| key == "page") {
            return value.parse().ok();
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        if let [.., marker, number] = segments.as_slice() {
            if *marker == "page" {
                return number.parse().ok();
            }
        }
    }

    href.rsplit_once('=')
        .and_then(|(_, value)| value.parse().ok())
}
