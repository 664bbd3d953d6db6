use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use tokio::time::{timeout, Instant};
use tracing::{debug, info};

use super::{settle, DriverResult, Locator, NavigationPolicy, PageDriver};
use crate::config::DriverConfig;
use crate::error::DriverError;

impl From<WebDriverError> for DriverError {
    fn from(e: WebDriverError) -> Self {
        DriverError::Backend(e.to_string())
    }
}

fn by(locator: &Locator) -> By {
    match locator {
        Locator::Css(s) => By::Css(s.as_str()),
        Locator::XPath(s) => By::XPath(s.as_str()),
    }
}

/// [`PageDriver`] over a W3C WebDriver session (chromedriver by default).
pub struct WebDriverPage {
    driver: WebDriver,
    poll_interval: Duration,
}

impl WebDriverPage {
    pub async fn connect(config: &DriverConfig, poll_interval: Duration) -> DriverResult<Self> {
        let mut caps = DesiredCapabilities::chrome();
        if config.headless {
            caps.set_headless()?;
        }
        caps.add_arg(&format!(
            "--window-size={},{}",
            config.window_width, config.window_height
        ))?;
        caps.add_arg(&format!("--user-agent={}", config.user_agent))?;

        info!("Connecting to WebDriver at {}", config.webdriver_url);
        let driver = WebDriver::new(config.webdriver_url.as_str(), caps).await?;

        Ok(Self {
            driver,
            poll_interval: poll_interval.max(Duration::from_millis(50)),
        })
    }
}

#[async_trait]
impl PageDriver for WebDriverPage {
    type Element = WebElement;

    async fn navigate(&self, url: &str, policy: &NavigationPolicy) -> DriverResult<()> {
        debug!("GET {}", url);
        timeout(policy.timeout, self.driver.goto(url))
            .await
            .map_err(|_| DriverError::Timeout {
                what: format!("navigation to {}", url),
                after: policy.timeout,
            })??;
        settle(policy.settle).await;
        Ok(())
    }

    async fn locate(&self, locator: &Locator) -> DriverResult<Vec<WebElement>> {
        Ok(self.driver.find_all(by(locator)).await?)
    }

    async fn locate_within(
        &self,
        scope: &WebElement,
        locator: &Locator,
    ) -> DriverResult<Vec<WebElement>> {
        Ok(scope.find_all(by(locator)).await?)
    }

    async fn wait_for(&self, locator: &Locator, limit: Duration) -> DriverResult<()> {
        let deadline = Instant::now() + limit;
        loop {
            if !self.driver.find_all(by(locator)).await?.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    what: locator.to_string(),
                    after: limit,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn read_text(&self, element: &WebElement) -> DriverResult<Option<String>> {
        let text = element.text().await?;
        Ok(if text.is_empty() { None } else { Some(text) })
    }

    async fn read_attribute(&self, element: &WebElement, name: &str) -> DriverResult<Option<String>> {
        Ok(element.attr(name).await?)
    }

    async fn is_visible(&self, element: &WebElement) -> DriverResult<bool> {
        Ok(element.is_displayed().await?)
    }

    async fn click(&self, element: &WebElement) -> DriverResult<()> {
        Ok(element.click().await?)
    }

    async fn go_back(&self) -> DriverResult<()> {
        Ok(self.driver.back().await?)
    }

    async fn close(self) -> DriverResult<()> {
        info!("Closing browser session");
        Ok(self.driver.quit().await?)
    }
}
