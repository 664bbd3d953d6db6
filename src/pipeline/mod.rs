//! Crawl orchestrator: drives the list → detail → list loop over every page.
//!
//! ## Session states
//!
//! ```text
//! ListPage --(value clicked)--> DetailPage --(back issued)--> Restoring
//!    ^                                                           |
//!    +-----------------(replay done or stopped early)------------+
//! ListPage --(no more pages)--> Terminated
//! ```
//!
//! A fault while handling one row ends that row only: the session goes back
//! to the list, replays its page position and carries on with the next row.
//! Only a listing that cannot be reached or never renders stops the run, and
//! even then the records gathered so far are returned.

use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, SiteConfig, TimingConfig};
use crate::driver::{settle, DriverResult, Locator, NavigationPolicy, PageDriver};
use crate::error::CrawlError;
use crate::models::{ContractRecord, CrawlOutcome, CrawlStats, DetailField, Termination};
use crate::scraper::row::SummarizedRow;
use crate::scraper::{Advance, DetailExtractor, PaginationController, RowExtractor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    ListPage,
    DetailPage,
    Restoring,
    Terminated,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (ListPage, DetailPage) | (DetailPage, Restoring) | (Restoring, ListPage) | (_, Terminated)
        )
    }
}

enum RowFlow {
    Continue,
    /// The render holds fewer rows than when the page was first counted.
    PageShrank,
}

pub struct CrawlSession<D: PageDriver> {
    driver: D,
    site: SiteConfig,
    timing: TimingConfig,
    max_pages: Option<u32>,
    table_body: Locator,
    row_locator: Locator,
    rows: RowExtractor,
    detail: DetailExtractor,
    pager: PaginationController,
    state: SessionState,
    records: Vec<ContractRecord>,
    stats: CrawlStats,
}

impl<D: PageDriver> CrawlSession<D> {
    /// Takes ownership of `driver` for the whole run; it is closed when
    /// [`run`](Self::run) returns.
    pub fn new(driver: D, config: &AppConfig) -> Self {
        let site = config.site.clone();
        let timing = config.timing.clone();
        Self {
            table_body: Locator::css(&site.table_body_selector),
            row_locator: Locator::css(&site.row_selector),
            rows: RowExtractor::new(&site.value_cell_selector),
            detail: DetailExtractor::new(&site, timing.detail_timeout()),
            pager: PaginationController::new(&site, timing.page_settle()),
            max_pages: config.crawl.max_pages,
            state: SessionState::ListPage,
            records: Vec::new(),
            stats: CrawlStats::default(),
            driver,
            site,
            timing,
        }
    }

    pub async fn run(mut self) -> CrawlOutcome {
        let termination = match self.crawl().await {
            Ok(termination) => termination,
            Err(e) => {
                error!("Fatal error: {}", e);
                Termination::Fatal(e)
            }
        };
        self.transition(SessionState::Terminated);

        let CrawlSession { driver, records, stats, .. } = self;
        if let Err(e) = driver.close().await {
            warn!("Browser session did not close cleanly: {}", e);
        }

        info!(
            "Crawl finished ({}): {} records, {} pages, {} skipped, {} row failures",
            termination,
            records.len(),
            stats.pages_visited,
            stats.rows_skipped,
            stats.row_failures
        );
        CrawlOutcome { records, termination, stats }
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn navigation_policy(&self) -> NavigationPolicy {
        NavigationPolicy {
            timeout: self.timing.navigation_timeout(),
            settle: self.timing.initial_settle(),
        }
    }

    async fn open_listing(&self) -> Result<(), CrawlError> {
        let url = self.site.listing_url.as_str();
        let driver = &self.driver;
        let policy = self.navigation_policy();
        let backoff = ExponentialBackoff::from_millis(2)
            .factor(250)
            .map(jitter)
            .take(self.timing.navigation_retries);

        info!("Navigating to contracts page {}", url);
        Retry::start(backoff, move || async move {
            let attempt = driver.navigate(url, &policy).await;
            if let Err(e) = &attempt {
                warn!("Navigation failed: {}", e);
            }
            attempt
        })
        .await
        .map_err(|source| CrawlError::ListingUnreachable {
            url: url.to_string(),
            source,
        })
    }

    async fn wait_for_table(&self, page: u32) -> Result<(), CrawlError> {
        self.driver
            .wait_for(&self.table_body, self.timing.table_timeout())
            .await
            .map_err(|source| CrawlError::ListingNeverAppeared { page, source })
    }

    async fn crawl(&mut self) -> Result<Termination, CrawlError> {
        self.open_listing().await?;

        loop {
            let page = self.pager.page_index();
            info!("Processing page {}...", page);

            self.wait_for_table(page).await?;
            let row_count = self
                .driver
                .locate(&self.row_locator)
                .await
                .map_err(|source| CrawlError::ListingNeverAppeared { page, source })?
                .len();
            self.stats.pages_visited += 1;

            info!("Found {} contracts on page {}", row_count, page);
            if row_count == 0 {
                info!("No rows found, stopping");
                return Ok(Termination::EmptyPage);
            }

            for index in 0..row_count {
                info!("Processing contract {}/{} on page {}", index + 1, row_count, page);
                match self.process_row(page, index).await {
                    RowFlow::Continue => {}
                    RowFlow::PageShrank => {
                        self.wait_for_table(page).await?;
                        warn!(
                            "Page {} now renders fewer than {} rows, moving on",
                            page,
                            index + 1
                        );
                        break;
                    }
                }
            }

            if self.max_pages.is_some_and(|max| page >= max) {
                info!("Reached page limit ({}), stopping", page);
                return Ok(Termination::PageLimit);
            }

            if !self.pager.has_more_pages(&self.driver).await {
                info!("Next button is disabled or not visible, finished pagination");
                return Ok(Termination::Exhausted);
            }
            if self.pager.advance_one_page(&self.driver).await == Advance::Blocked {
                info!("Next button went away before it could be used, finished pagination");
                return Ok(Termination::Exhausted);
            }
        }
    }

    /// Handles row `index` (0-based) of the current render. Never fails: every
    /// fault is logged and turned into a sentinel or a skipped row.
    async fn process_row(&mut self, page: u32, index: usize) -> RowFlow {
        // Handles from before a detour are stale, so rows are located afresh.
        let row = match self.driver.locate(&self.row_locator).await {
            Ok(rows) => rows.into_iter().nth(index),
            Err(e) => {
                warn!("Could not locate rows: {}", e);
                None
            }
        };
        let Some(row) = row else {
            return RowFlow::PageShrank;
        };
        self.stats.rows_seen += 1;

        let Some(SummarizedRow { summary, trigger }) = self.rows.summarize(&self.driver, &row).await
        else {
            info!("No contract value found for row {}, skipping...", index + 1);
            self.stats.rows_skipped += 1;
            return RowFlow::Continue;
        };
        info!("Contract value: {}", summary.contract_value);

        let purpose = match self.open_detail(&trigger).await {
            Ok(()) => self.detail.extract(&self.driver).await,
            Err(e) => {
                warn!("Error opening detail for row {}: {}", index + 1, e);
                self.check_list_after_click_fault().await;
                DetailField::ExtractionError
            }
        };
        info!("Purpose: {}", purpose);
        let mut failed = purpose == DetailField::ExtractionError;

        self.records
            .push(ContractRecord::new(summary, purpose, page, index + 1));
        debug!("Added contract {}", self.records.len());

        if self.state == SessionState::DetailPage {
            failed |= !self.return_to_list().await;
        }
        if failed {
            self.stats.row_failures += 1;
        }
        RowFlow::Continue
    }

    async fn open_detail(&mut self, trigger: &D::Element) -> DriverResult<()> {
        self.driver.click(trigger).await?;
        self.transition(SessionState::DetailPage);
        settle(self.timing.detail_settle()).await;
        Ok(())
    }

    /// A click can fault after the browser already left the list (e.g. a
    /// timeout firing once the detail view loaded). Unless the rows are still
    /// there, the session is treated as being on the detail view so the
    /// normal way back runs.
    async fn check_list_after_click_fault(&mut self) {
        match self
            .driver
            .wait_for(&self.row_locator, self.timing.rows_timeout())
            .await
        {
            Ok(()) => debug!("Still on the list after the failed click"),
            Err(e) => {
                warn!("List gone after the failed click ({}), going back", e);
                self.transition(SessionState::DetailPage);
            }
        }
    }

    /// DetailPage → Restoring → ListPage, whatever faults happen on the way.
    /// Returns `false` when the way back hit a fault.
    async fn return_to_list(&mut self) -> bool {
        let mut clean = true;
        if let Err(e) = self.driver.go_back().await {
            warn!("Back navigation failed ({}), trying once more", e);
            clean = false;
            settle(self.timing.back_settle()).await;
            if let Err(e) = self.driver.go_back().await {
                warn!("Could not go back, continuing: {}", e);
            }
        }
        self.transition(SessionState::Restoring);
        settle(self.timing.back_settle()).await;

        if let Err(e) = self
            .driver
            .wait_for(&self.row_locator, self.timing.rows_timeout())
            .await
        {
            // Reloading lands on page 1 as well, so the replay below still holds.
            warn!("List did not re-render after detail view ({}), reloading it", e);
            clean = false;
            let policy = self.navigation_policy();
            if let Err(e) = self.driver.navigate(&self.site.listing_url, &policy).await {
                warn!("Reloading the list failed: {}", e);
            }
        }

        let restoration = self.pager.restore_position_after_detour(&self.driver).await;
        if restoration.is_complete() {
            if restoration.target > 1 {
                debug!("Back on page {}", restoration.target);
            }
        } else {
            self.stats.early_restorations += 1;
            warn!(
                "Displayed page {} lags behind logical page {}",
                restoration.reached, restoration.target
            );
        }
        self.transition(SessionState::ListPage);
        clean
    }
}
