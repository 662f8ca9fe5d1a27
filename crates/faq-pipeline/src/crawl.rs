//! Forum crawler.
//!
//! Walks the paginated FAQ listing, follows every thread marked answered and extracts one
//! record per thread page. Pagination is bounded by a [`PageBudget`]: the first listing page
//! is always fetched, and each followed "next page" link spends one unit of the budget.
//!
//! Fetch failures are fatal for the crawl. Extraction failures only skip the thread.
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{CrawlError, PipelineError};
use crate::extract::{compile, join_fragments, Extractor};
use crate::files;
use crate::model::Record;
use crate::normalize::Normalizer;

pub const DEFAULT_START_URL: &str = "https://doctor-yab.ir/faq/?page=1";
pub const DEFAULT_PAGE_LIMIT: u32 = 2;

/// Source of page bodies. Implemented over HTTP in production and by in-memory sites in tests.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, CrawlError>> + Send;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("faq-pipeline/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(CrawlError::Client)?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, CrawlError> {
        let http_err = |source| CrawlError::Http {
            url: url.to_string(),
            source,
        };
        let resp = self.client.get(url.clone()).send().await.map_err(http_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(http_err)
    }
}

/// Countdown of "next page" links the crawler may still follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBudget {
    remaining: u32,
}

impl PageBudget {
    pub fn new(limit: u32) -> Self {
        Self { remaining: limit }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Spend one page. `false` once the budget is exhausted.
    pub fn try_take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// CSS selectors for the FAQ listing pages.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub item: String,
    pub title_link: String,
    pub snippet: String,
    pub answered_marker: String,
    pub next_page: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item: "ul.questions li".to_string(),
            title_link: "h3 a".to_string(),
            snippet: "h3 + span".to_string(),
            answered_marker: "i.fa-check".to_string(),
            next_page: "li.PagedList-skipToNext a".to_string(),
        }
    }
}

/// One entry of a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub title: String,
    /// Question preview shown under the title; may be truncated by the forum. Used as the
    /// question when the thread page has none.
    pub snippet: String,
    pub link: Url,
    pub answered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub items: Vec<ListingItem>,
    pub next_page: Option<Url>,
}

pub struct ListingParser {
    normalizer: Arc<Normalizer>,
    item: Selector,
    title_link: Selector,
    snippet: Selector,
    answered_marker: Selector,
    next_page: Selector,
}

impl ListingParser {
    pub fn new(
        normalizer: Arc<Normalizer>,
        selectors: &ListingSelectors,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            normalizer,
            item: compile(&selectors.item)?,
            title_link: compile(&selectors.title_link)?,
            snippet: compile(&selectors.snippet)?,
            answered_marker: compile(&selectors.answered_marker)?,
            next_page: compile(&selectors.next_page)?,
        })
    }

    /// Parse a listing page fetched from `page_url`. Relative links resolve against it.
    ///
    /// Items without a usable thread link are dropped with a warning.
    pub fn parse(&self, html: &str, page_url: &Url) -> ListingPage {
        let document = Html::parse_document(html);

        let mut items = Vec::new();
        for element in document.select(&self.item) {
            let Some(anchor) = element.select(&self.title_link).next() else {
                warn!(page = %page_url, "listing item without a thread link, skipping");
                continue;
            };
            let Some(link) = anchor
                .value()
                .attr("href")
                .and_then(|href| resolve(page_url, href))
            else {
                warn!(page = %page_url, "listing item with an invalid thread link, skipping");
                continue;
            };

            let snippet = element
                .select(&self.snippet)
                .next()
                .map(|el| join_fragments(el.text()))
                .unwrap_or_default();

            items.push(ListingItem {
                title: self.normalizer.normalize(&join_fragments(anchor.text())),
                snippet: self.normalizer.normalize(&snippet),
                link,
                answered: element.select(&self.answered_marker).next().is_some(),
            });
        }

        let next_page = document
            .select(&self.next_page)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve(page_url, href));

        ListingPage { items, next_page }
    }
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    base.join(href.trim())
        .inspect_err(|e| debug!(error = %e, href, "unresolvable link"))
        .ok()
}

/// Counters reported at the end of a crawl.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlStats {
    pub listing_pages: usize,
    pub threads_fetched: usize,
    pub records: usize,
    /// Threads fetched but rejected by the extractor.
    pub skipped: usize,
    /// Listing items not marked answered, never fetched.
    pub unanswered: usize,
}

pub struct Crawler<F> {
    fetcher: F,
    listing: ListingParser,
    extractor: Extractor,
    page_limit: u32,
}

impl<F: PageFetcher> Crawler<F> {
    /// `page_limit` is the number of listing pages followed after the first one.
    pub fn new(fetcher: F, listing: ListingParser, extractor: Extractor, page_limit: u32) -> Self {
        Self {
            fetcher,
            listing,
            extractor,
            page_limit,
        }
    }

    /// Crawl from `start`, appending one record per answered thread to `records`.
    ///
    /// Records land in `records` as soon as they are extracted, so on error the caller
    /// still holds everything collected before the failing fetch.
    pub async fn run(&self, start: &Url, records: &mut Vec<Record>) -> Result<CrawlStats, CrawlError> {
        let mut budget = PageBudget::new(self.page_limit);
        let mut stats = CrawlStats::default();
        let mut next = Some(start.clone());

        while let Some(page_url) = next.take() {
            let html = self.fetcher.fetch(&page_url).await?;
            stats.listing_pages += 1;
            let page = self.listing.parse(&html, &page_url);
            info!(
                page = %page_url,
                items = page.items.len(),
                remaining_pages = budget.remaining(),
                "listing page parsed"
            );

            for item in &page.items {
                if !item.answered {
                    stats.unanswered += 1;
                    debug!(link = %item.link, "thread not answered, skipping");
                    continue;
                }

                let thread_html = self.fetcher.fetch(&item.link).await?;
                stats.threads_fetched += 1;
                match self
                    .extractor
                    .extract_thread(&thread_html, Some(item.link.as_str()), Some(&item.snippet))
                {
                    Ok(record) => {
                        records.push(record);
                        stats.records += 1;
                    }
                    Err(e) => {
                        stats.skipped += 1;
                        warn!(link = %item.link, title = %item.title, error = %e, "skipping thread");
                    }
                }
            }

            next = match page.next_page {
                Some(url) if budget.try_take() => Some(url),
                Some(_) => {
                    info!(limit = self.page_limit, "page limit reached, stopping");
                    None
                }
                None => None,
            };
        }

        Ok(stats)
    }

    /// Crawl from `start` and write the records file at `path`.
    ///
    /// The file is written even when the crawl fails, holding the records collected before
    /// the failure; the crawl error is returned afterwards.
    pub async fn run_to_file(&self, start: &Url, path: &Path) -> Result<CrawlStats, PipelineError> {
        let mut records = Vec::new();
        let outcome = self.run(start, &mut records).await;
        files::write_records(path, &records)?;

        match outcome {
            Ok(stats) => {
                info!(
                    listing_pages = stats.listing_pages,
                    threads = stats.threads_fetched,
                    records = stats.records,
                    skipped = stats.skipped,
                    unanswered = stats.unanswered,
                    "crawl finished"
                );
                Ok(stats)
            }
            Err(e) => {
                error!(error = %e, records = records.len(), "crawl aborted, partial records written");
                Err(e.into())
            }
        }
    }
}
