//! Page automation capability consumed by the crawler.
//!
//! The crawl core only talks to a browser through [`PageDriver`]; the
//! WebDriver-backed implementation lives in [`webdriver`], a scripted
//! in-memory site for tests in `mock`.

#[cfg(test)]
pub mod mock;
pub mod webdriver;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::error::DriverError;

pub type DriverResult<T> = Result<T, DriverError>;

// ── Locator ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    /// The enclosing element of a scope.
    pub fn parent() -> Self {
        Locator::xpath("..")
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css `{}`", s),
            Locator::XPath(s) => write!(f, "xpath `{}`", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationPolicy {
    /// Upper bound for the page load itself.
    pub timeout: Duration,
    /// Quiet period after load so client-side rendering can finish.
    pub settle: Duration,
}

// ── Capability ────────────────────────────────────────────────────────────────

/// A single navigable browser page.
///
/// Element handles are only valid for the render they were located in; after
/// a navigation they must be located again.
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Element: Clone + Send + Sync;

    async fn navigate(&self, url: &str, policy: &NavigationPolicy) -> DriverResult<()>;

    async fn locate(&self, locator: &Locator) -> DriverResult<Vec<Self::Element>>;

    async fn locate_within(
        &self,
        scope: &Self::Element,
        locator: &Locator,
    ) -> DriverResult<Vec<Self::Element>>;

    /// Resolves once `locator` matches at least one element, or fails with
    /// [`DriverError::Timeout`].
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> DriverResult<()>;

    async fn read_text(&self, element: &Self::Element) -> DriverResult<Option<String>>;

    async fn read_attribute(&self, element: &Self::Element, name: &str)
    -> DriverResult<Option<String>>;

    async fn is_visible(&self, element: &Self::Element) -> DriverResult<bool>;

    async fn click(&self, element: &Self::Element) -> DriverResult<()>;

    async fn go_back(&self) -> DriverResult<()>;

    /// Ends the browser session.
    async fn close(self) -> DriverResult<()>
    where
        Self: Sized;
}

/// Sleeps for `delay` unless it is zero.
pub async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
