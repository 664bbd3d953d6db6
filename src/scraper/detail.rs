//! Purpose extraction from the contract detail view.
//!
//! The detail form is rendered by a dynamic form engine whose nesting depth
//! varies between record types. A fixed structural path covers the common
//! layout; a label search (`dt` text → sibling `dd`) covers the rest.

use std::time::Duration;
use tracing::{debug, warn};

use super::cleaner::{clean_text, label_matches};
use crate::config::SiteConfig;
use crate::driver::{DriverResult, Locator, PageDriver};
use crate::models::DetailField;

/// Result of running one strategy against the detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Found(String),
    /// The field node matched but carries no text.
    Empty,
    /// Nothing matched; the next strategy may try.
    NoMatch,
}

#[derive(Debug, Clone)]
pub enum Strategy {
    /// Repeated-field container at a known structural path; value in its `dd`.
    Structural(Locator),
    /// Any `dt` whose text is the label; value in the `dd` of the same group.
    Labelled(String),
}

impl Strategy {
    pub async fn probe<D: PageDriver>(&self, driver: &D) -> DriverResult<Probe> {
        match self {
            Strategy::Structural(path) => {
                let Some(field) = driver.locate(path).await?.into_iter().next() else {
                    return Ok(Probe::NoMatch);
                };
                read_description(driver, &field).await
            }
            Strategy::Labelled(label) => {
                for term in driver.locate(&Locator::css("dt")).await? {
                    let text = driver.read_text(&term).await?.unwrap_or_default();
                    if !label_matches(&text, label) {
                        continue;
                    }
                    let Some(group) = driver.locate_within(&term, &Locator::parent()).await?.into_iter().next() else {
                        return Ok(Probe::Empty);
                    };
                    return read_description(driver, &group).await;
                }
                Ok(Probe::NoMatch)
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Strategy::Structural(_) => "structural",
            Strategy::Labelled(_) => "labelled",
        }
    }
}

async fn read_description<D: PageDriver>(driver: &D, scope: &D::Element) -> DriverResult<Probe> {
    let Some(dd) = driver.locate_within(scope, &Locator::css("dd")).await?.into_iter().next() else {
        return Ok(Probe::Empty);
    };
    Ok(match clean_text(driver.read_text(&dd).await?) {
        Some(text) => Probe::Found(text),
        None => Probe::Empty,
    })
}

pub struct DetailExtractor {
    root: Locator,
    strategies: Vec<Strategy>,
    load_timeout: Duration,
}

impl DetailExtractor {
    pub fn new(site: &SiteConfig, load_timeout: Duration) -> Self {
        Self {
            root: Locator::css(&site.detail_root_selector),
            strategies: vec![
                Strategy::Structural(Locator::css(&site.purpose_field_selector)),
                Strategy::Labelled(site.purpose_label.clone()),
            ],
            load_timeout,
        }
    }

    /// Reads the purpose off the detail view currently displayed.
    ///
    /// Strategies run in order and the first one that matches decides the
    /// outcome. A matched but empty field is `NotFound`; a driver fault or a
    /// detail form that never renders is `ExtractionError`.
    pub async fn extract<D: PageDriver>(&self, driver: &D) -> DetailField {
        if let Err(e) = driver.wait_for(&self.root, self.load_timeout).await {
            warn!("Detail view failed to load: {}", e);
            return DetailField::ExtractionError;
        }

        for strategy in &self.strategies {
            match strategy.probe(driver).await {
                Ok(Probe::NoMatch) => {
                    debug!("Purpose: no match with {} strategy", strategy.name());
                }
                Ok(Probe::Found(text)) => return DetailField::Found(text),
                Ok(Probe::Empty) => return DetailField::NotFound,
                Err(e) => {
                    warn!("Error extracting purpose ({} strategy): {}", strategy.name(), e);
                    return DetailField::ExtractionError;
                }
            }
        }

        debug!("Purpose not found with any strategy");
        DetailField::NotFound
    }
}
