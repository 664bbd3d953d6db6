use tracing::{debug, warn};

use crate::driver::{Locator, PageDriver};
use crate::models::ListRowSummary;

/// Reads the summary value out of a list row.
pub struct RowExtractor {
    value_cell: Locator,
}

/// A row's summary together with the node that opens its detail view.
pub struct SummarizedRow<E> {
    pub summary: ListRowSummary,
    pub trigger: E,
}

impl RowExtractor {
    pub fn new(value_cell_selector: &str) -> Self {
        Self {
            value_cell: Locator::css(value_cell_selector),
        }
    }

    /// `None` when the value node is missing, blank, or unreadable.
    pub async fn summarize<D: PageDriver>(
        &self,
        driver: &D,
        row: &D::Element,
    ) -> Option<SummarizedRow<D::Element>> {
        let cells = match driver.locate_within(row, &self.value_cell).await {
            Ok(cells) => cells,
            Err(e) => {
                warn!("Could not locate value cell: {}", e);
                return None;
            }
        };
        let Some(cell) = cells.into_iter().next() else {
            debug!("Row has no {}", self.value_cell);
            return None;
        };

        let summary = match driver.read_text(&cell).await {
            Ok(text) => ListRowSummary::from_raw(text.as_deref().unwrap_or_default())?,
            Err(e) => {
                warn!("Could not read value cell: {}", e);
                return None;
            }
        };

        Some(SummarizedRow { summary, trigger: cell })
    }
}
