//! Crawl drivers: link harvesting, document crawling, glossary crawling.
//!
//! Workers claim URLs from the shared queue and process them
//! independently; the versioning and session bookkeeping they call into
//! is safe to invoke from any number of concurrent workers. The fetch is
//! the only long-latency step.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::models::{CrawlSession, CrawlUrl, ItemOutcome, Term};
use crate::repository::{DbContext, HarvestStats};
use crate::scrape::{
    parse_document_fields, parse_glossary, parse_listing, parse_relations, PageFetcher,
};

/// Progress events emitted while a crawl session runs.
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    Started { worker_id: usize, url: String },
    Finished { url: String, outcome: ItemOutcome },
}

/// Drives crawl batches against the shared store.
#[derive(Clone)]
pub struct CrawlService {
    ctx: DbContext,
    fetcher: Arc<dyn PageFetcher>,
    settings: Settings,
}

impl CrawlService {
    pub fn new(ctx: DbContext, fetcher: Arc<dyn PageFetcher>, settings: Settings) -> Self {
        Self {
            ctx,
            fetcher,
            settings,
        }
    }

    /// Harvest listing pages and run each link through the re-queue policy.
    ///
    /// Stops at the first empty page (end of the listing) or fetch
    /// failure, keeping whatever progress was made.
    pub async fn harvest(&self, start_page: u32, pages: u32) -> anyhow::Result<HarvestStats> {
        let mut stats = HarvestStats::default();

        for page in start_page..start_page + pages {
            let url = Settings::page_url(&self.settings.listing_url, page);
            let fetched = match self.fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("listing page {page} failed: {e}");
                    break;
                }
            };

            let links = parse_listing(&fetched.text, &self.settings.base_url);
            if links.is_empty() {
                debug!("listing page {page} empty, stopping");
                break;
            }

            for link in &links {
                let outcome =
                    self.ctx
                        .crawl()
                        .upsert_link(&link.url, &link.title, link.reported_date)?;
                stats.record(outcome);
            }
            info!("harvested page {page}: {} links", links.len());
        }

        Ok(stats)
    }

    /// Crawl pending URLs with a pool of workers inside a tracked session.
    ///
    /// Every processed item records exactly one outcome against the
    /// session. Per-item failures are recorded and retried in later runs;
    /// only a failure of the session machinery itself aborts the batch,
    /// and already-versioned items are kept.
    pub async fn crawl_pending(
        &self,
        limit: u64,
        workers: usize,
        events: mpsc::Sender<CrawlEvent>,
    ) -> anyhow::Result<CrawlSession> {
        self.ctx.crawl().requeue_retryable(self.settings.max_retries)?;

        let session_id = self.ctx.sessions().start()?;
        info!("session {session_id} started");

        let processed = Arc::new(AtomicU64::new(0));
        let mut handles = Vec::new();

        for worker_id in 0..workers.max(1) {
            let service = self.clone();
            let processed = processed.clone();
            let events = events.clone();

            let handle = tokio::spawn(async move {
                loop {
                    if limit > 0 && processed.load(Ordering::Relaxed) >= limit {
                        break;
                    }

                    let claimed = match service.ctx.crawl().claim_pending(1) {
                        Ok(urls) => urls,
                        Err(e) => {
                            warn!("worker {worker_id}: claim failed: {e}");
                            break;
                        }
                    };
                    let Some(claim) = claimed.into_iter().next() else {
                        break;
                    };
                    processed.fetch_add(1, Ordering::Relaxed);

                    let _ = events
                        .send(CrawlEvent::Started {
                            worker_id,
                            url: claim.url.clone(),
                        })
                        .await;

                    let outcome = service.process_document(&claim, session_id).await;
                    if let Err(e) = service.ctx.sessions().record_outcome(session_id, outcome) {
                        warn!("worker {worker_id}: recording outcome failed: {e}");
                    }

                    let _ = events
                        .send(CrawlEvent::Finished {
                            url: claim.url,
                            outcome,
                        })
                        .await;
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            let _ = handle.await;
        }
        drop(events);

        // Documents crawled this session may satisfy edges recorded in
        // earlier sessions, and vice versa.
        let result: anyhow::Result<String> = (|| {
            let backfilled = self.ctx.relationships().backfill_unresolved()?;
            Ok(format!("backfilled {backfilled} relationships"))
        })();

        match result {
            Ok(notes) => self.ctx.sessions().complete(session_id, Some(&notes))?,
            Err(e) => {
                self.ctx.sessions().fail(session_id, &e.to_string())?;
                return Err(e);
            }
        }

        self.ctx
            .sessions()
            .get(session_id)?
            .ok_or_else(|| anyhow::anyhow!("session {session_id} vanished"))
    }

    /// Process one claimed URL: fetch, extract, version, record edges.
    async fn process_document(&self, claim: &CrawlUrl, session_id: i64) -> ItemOutcome {
        let page = match self.fetcher.fetch(&claim.url).await {
            Ok(page) => page,
            Err(e) => return self.fail_url(claim, &e.to_string()),
        };

        let fields = parse_document_fields(&page.text);
        if fields.is_empty() {
            return self.fail_url(claim, "no document properties found");
        }

        let outcome = match self.ctx.documents().upsert(&claim.url, &fields, Some(session_id)) {
            Ok(outcome) => outcome,
            Err(e) => return self.fail_url(claim, &e.to_string()),
        };

        // Edges hang off the version current at extraction time.
        match self.ctx.documents().current_version(&claim.url) {
            Ok(Some(current)) => {
                for relation in parse_relations(&page.text, &self.settings.base_url) {
                    if let Err(e) = self.ctx.relationships().record_edge(
                        current.id,
                        &relation.target_url,
                        &relation.relation_type,
                        relation.target_title.as_deref(),
                    ) {
                        warn!("{}: recording edge failed: {e}", claim.url);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!("{}: loading current version failed: {e}", claim.url),
        }

        if let Err(e) = self.ctx.crawl().mark_completed(claim.id) {
            warn!("{}: marking completed failed: {e}", claim.url);
        }

        if !outcome.created {
            ItemOutcome::Unchanged
        } else if outcome.version == 1 {
            ItemOutcome::New
        } else {
            ItemOutcome::Updated
        }
    }

    fn fail_url(&self, claim: &CrawlUrl, error: &str) -> ItemOutcome {
        warn!("{} failed: {error}", claim.url);
        if let Err(e) = self.ctx.crawl().mark_failed(claim.id, error) {
            warn!("{}: marking failed failed: {e}", claim.url);
        }
        ItemOutcome::Failed
    }

    /// Crawl glossary listing pages inside a tracked session.
    ///
    /// Terms are either new or refreshed; a page fetch failure stops the
    /// run but keeps everything saved so far.
    pub async fn crawl_glossary(&self, pages: u32) -> anyhow::Result<CrawlSession> {
        let session_id = self.ctx.sessions().start()?;
        info!("glossary session {session_id} started");

        let mut pages_done = 0u32;
        for page in 1..=pages {
            let url = Settings::page_url(&self.settings.glossary_url, page);
            let fetched = match self.fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("glossary page {page} failed: {e}");
                    break;
                }
            };

            let entries = parse_glossary(&fetched.text, &self.settings.base_url);
            if entries.is_empty() {
                break;
            }

            for entry in &entries {
                let term = Term::new(&entry.name, &entry.definition, &entry.url, Some(&url));
                let outcome = match self.ctx.terms().save_term(&term) {
                    Ok(true) => ItemOutcome::New,
                    Ok(false) => ItemOutcome::Updated,
                    Err(e) => {
                        warn!("{}: saving term failed: {e}", entry.url);
                        ItemOutcome::Failed
                    }
                };
                self.ctx.sessions().record_outcome(session_id, outcome)?;
            }
            pages_done += 1;
        }

        let notes = format!("glossary crawl, {pages_done} pages");
        self.ctx.sessions().complete(session_id, Some(&notes))?;

        self.ctx
            .sessions()
            .get(session_id)?
            .ok_or_else(|| anyhow::anyhow!("session {session_id} vanished"))
    }
}
