use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::CrawlError;

pub const NOT_FOUND: &str = "Not found";
pub const EXTRACTION_ERROR: &str = "Error extracting";

// ── List row ──────────────────────────────────────────────────────────────────

/// Summary captured from a row of the list page. `contract_value` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRowSummary {
    pub contract_value: String,
}

impl ListRowSummary {
    /// Trims `raw`; empty text yields no summary.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let value = raw.trim();
        if value.is_empty() {
            None
        } else {
            Some(Self { contract_value: value.to_string() })
        }
    }
}

// ── Detail field ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailField {
    Found(String),
    /// The field is genuinely absent from the detail view.
    NotFound,
    /// The detail view could not be read (load timeout, driver fault).
    ExtractionError,
}

impl DetailField {
    pub fn as_str(&self) -> &str {
        match self {
            DetailField::Found(text) => text,
            DetailField::NotFound => NOT_FOUND,
            DetailField::ExtractionError => EXTRACTION_ERROR,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            DetailField::Found(_) => "found",
            DetailField::NotFound => "not_found",
            DetailField::ExtractionError => "extraction_error",
        }
    }
}

impl fmt::Display for DetailField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Contract record ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRecord {
    pub contract_value: String,
    pub purpose: DetailField,
    /// Logical page the row was listed on.
    pub page: u32,
    /// 1-based position within that page.
    pub row: usize,
}

impl ContractRecord {
    pub fn new(summary: ListRowSummary, purpose: DetailField, page: u32, row: usize) -> Self {
        Self {
            contract_value: summary.contract_value,
            purpose,
            page,
            row,
        }
    }
}

impl Serialize for ContractRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ContractRecord", 5)?;
        s.serialize_field("page", &self.page)?;
        s.serialize_field("row", &self.row)?;
        s.serialize_field("contract_value", &self.contract_value)?;
        s.serialize_field("purpose", self.purpose.as_str())?;
        s.serialize_field("purpose_status", self.purpose.status())?;
        s.end()
    }
}

// ── Page cursor ───────────────────────────────────────────────────────────────

/// Logical page position. Starts at 1 and only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page_index: u32,
}

impl PageCursor {
    pub fn new() -> Self {
        Self { page_index: 1 }
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub(crate) fn advance(&mut self) {
        self.page_index += 1;
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new()
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Termination {
    /// The next-page control is gone or disabled.
    Exhausted,
    /// A page rendered with no rows.
    EmptyPage,
    /// The configured page cap was reached.
    PageLimit,
    Fatal(CrawlError),
}

impl Termination {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Termination::Fatal(_))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted => f.write_str("pagination exhausted"),
            Termination::EmptyPage => f.write_str("empty page"),
            Termination::PageLimit => f.write_str("page limit reached"),
            Termination::Fatal(e) => write!(f, "fatal: {}", e),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages_visited: u32,
    pub rows_seen: usize,
    pub rows_skipped: usize,
    /// Rows whose detail could not be read or whose way back faulted.
    pub row_failures: usize,
    pub early_restorations: usize,
}

#[derive(Debug)]
pub struct CrawlOutcome {
    pub records: Vec<ContractRecord>,
    pub termination: Termination,
    pub stats: CrawlStats,
}

impl CrawlOutcome {
    pub fn total(&self) -> usize {
        self.records.len()
    }
}
