//! Page position tracking for the contract list.
//!
//! The portal always lands on page 1 when navigating back from a detail view,
//! whatever page the list was on before. [`PaginationController`] keeps the
//! logical position in a [`PageCursor`] and restores it by replaying forward
//! clicks on the next-page control.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SiteConfig;
use crate::driver::{settle, DriverResult, Locator, PageDriver};
use crate::models::PageCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved,
    /// The next control was gone or disabled by the time it was used.
    Blocked,
}

/// Report of a replay after a detour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restoration {
    /// Logical page the replay aimed for.
    pub target: u32,
    /// Page actually reached, assuming the list started on page 1.
    pub reached: u32,
}

impl Restoration {
    pub fn is_complete(&self) -> bool {
        self.reached == self.target
    }
}

pub struct PaginationController {
    cursor: PageCursor,
    next: Locator,
    next_label: String,
    settle_delay: Duration,
}

impl PaginationController {
    pub fn new(site: &SiteConfig, settle_delay: Duration) -> Self {
        Self {
            cursor: PageCursor::new(),
            next: Locator::css(&site.next_selector),
            next_label: site.next_label.clone(),
            settle_delay,
        }
    }

    pub fn page_index(&self) -> u32 {
        self.cursor.page_index()
    }

    /// First next-page control that is present, visible and enabled.
    async fn usable_next<D: PageDriver>(&self, driver: &D) -> DriverResult<Option<D::Element>> {
        for candidate in driver.locate(&self.next).await? {
            let text = driver.read_text(&candidate).await?.unwrap_or_default();
            if !text.contains(&self.next_label) {
                continue;
            }
            let disabled = driver.read_attribute(&candidate, "disabled").await?;
            if disabled.is_some_and(|v| !v.is_empty()) {
                debug!("Next control is disabled");
                return Ok(None);
            }
            if !driver.is_visible(&candidate).await? {
                debug!("Next control is not visible");
                return Ok(None);
            }
            return Ok(Some(candidate));
        }
        Ok(None)
    }

    pub async fn has_more_pages<D: PageDriver>(&self, driver: &D) -> bool {
        match self.usable_next(driver).await {
            Ok(next) => next.is_some(),
            Err(e) => {
                warn!("Could not inspect next control: {}", e);
                false
            }
        }
    }

    /// Re-checks and clicks the next control once, without touching the cursor.
    async fn click_next<D: PageDriver>(&self, driver: &D) -> Advance {
        let next = match self.usable_next(driver).await {
            Ok(Some(next)) => next,
            Ok(None) => return Advance::Blocked,
            Err(e) => {
                warn!("Could not inspect next control: {}", e);
                return Advance::Blocked;
            }
        };
        if let Err(e) = driver.click(&next).await {
            warn!("Next click failed: {}", e);
            return Advance::Blocked;
        }
        settle(self.settle_delay).await;
        Advance::Moved
    }

    pub async fn advance_one_page<D: PageDriver>(&mut self, driver: &D) -> Advance {
        let advance = self.click_next(driver).await;
        if advance == Advance::Moved {
            self.cursor.advance();
            info!("Moved to page {}", self.cursor.page_index());
        }
        advance
    }

    /// Replays `page_index - 1` forward clicks from page 1.
    ///
    /// Stops as soon as the next control is unusable, so the list never ends
    /// up past the logical page. The cursor is left untouched either way.
    pub async fn restore_position_after_detour<D: PageDriver>(&self, driver: &D) -> Restoration {
        let target = self.cursor.page_index();
        let mut reached = 1;

        if target > 1 {
            debug!("Replaying {} next clicks to return to page {}", target - 1, target);
        }
        while reached < target {
            match self.click_next(driver).await {
                Advance::Moved => reached += 1,
                Advance::Blocked => {
                    warn!(
                        "Next control unusable during replay, stopped on page {} of {}",
                        reached, target
                    );
                    break;
                }
            }
        }

        Restoration { target, reached }
    }
}
