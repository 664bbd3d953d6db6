//! Scripted in-memory listing site.
//!
//! Mirrors the behaviour the crawler has to cope with: a paginated table
//! whose rows open a detail view, and a back-navigation that always lands on
//! page 1 of the list.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{DriverResult, Locator, NavigationPolicy, PageDriver};
use crate::config::SiteConfig;
use crate::error::DriverError;

/// What the detail view of a row looks like.
#[derive(Debug, Clone)]
pub enum MockDetail {
    /// Field reachable through the fixed structural path.
    Structured(Option<String>),
    /// Only a labelled `dt`/`dd` group carries the field.
    Labelled(Option<String>),
    /// Neither layout carries the field.
    Missing,
    /// The detail form never renders.
    NeverLoads,
    /// The structural path matches but reading it faults.
    Unreadable,
}

#[derive(Debug, Clone)]
pub struct MockRow {
    /// `None` when the value cell is missing from the row.
    pub value: Option<String>,
    pub detail: MockDetail,
    /// Clicking the value cell faults.
    pub click_fails: bool,
    /// Clicking opens the detail view but still reports a timeout.
    pub click_opens_then_fails: bool,
}

impl MockRow {
    pub fn new(value: &str, purpose: &str) -> Self {
        Self {
            value: Some(value.to_string()),
            detail: MockDetail::Structured(Some(purpose.to_string())),
            click_fails: false,
            click_opens_then_fails: false,
        }
    }

    pub fn with_detail(value: &str, detail: MockDetail) -> Self {
        Self {
            value: Some(value.to_string()),
            detail,
            click_fails: false,
            click_opens_then_fails: false,
        }
    }

    pub fn without_value() -> Self {
        Self {
            value: None,
            detail: MockDetail::Missing,
            click_fails: false,
            click_opens_then_fails: false,
        }
    }

    pub fn failing_click(value: &str) -> Self {
        Self {
            click_fails: true,
            ..Self::new(value, "unused")
        }
    }

    pub fn late_failing_click(value: &str, purpose: &str) -> Self {
        Self {
            click_opens_then_fails: true,
            ..Self::new(value, purpose)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Blank,
    List(usize),
    Detail(usize, usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockElement {
    TableBody,
    Row(usize, usize),
    ValueCell(usize, usize),
    DetailRoot,
    StructuredField,
    StructuredDd,
    Label(usize),
    Group(usize),
    GroupDd(usize),
    Next,
}

#[derive(Debug)]
pub struct SiteState {
    site: SiteConfig,
    pages: Vec<Vec<MockRow>>,
    view: View,
    pub unreachable: bool,
    pub table_missing: bool,
    /// The next control disappears once this many forward clicks happened.
    pub next_vanishes_after: Option<usize>,
    /// The next control is in the DOM but not displayed.
    pub next_hidden: bool,
    /// This many upcoming back-navigations fault and leave the view as is.
    pub back_failures: usize,
    pub next_clicks: usize,
    pub back_navigations: usize,
    pub closes: usize,
    pub navigations: usize,
    /// Every list page shown, 1-based, in order.
    pub list_pages_shown: Vec<usize>,
    /// Every detail view opened as (page, row), both 1-based.
    pub details_opened: Vec<(usize, usize)>,
}

impl SiteState {
    fn current_page(&self) -> Option<usize> {
        match self.view {
            View::List(p) => Some(p),
            _ => None,
        }
    }

    fn detail(&self) -> Option<&MockDetail> {
        match self.view {
            View::Detail(p, r) => Some(&self.pages[p][r].detail),
            _ => None,
        }
    }

    fn show_list(&mut self, page: usize) {
        self.view = View::List(page);
        self.list_pages_shown.push(page + 1);
    }

    fn next_present(&self) -> bool {
        self.current_page().is_some()
            && self
                .next_vanishes_after
                .map_or(true, |limit| self.next_clicks < limit)
    }

    fn next_disabled(&self) -> bool {
        self.current_page()
            .map_or(true, |p| p + 1 >= self.pages.len())
    }

    fn labels(&self) -> Vec<(&'static str, Option<String>)> {
        let mut labels = vec![("Objeto:", Some("Aquisição de materiais".to_string()))];
        match self.detail() {
            Some(MockDetail::Structured(text)) | Some(MockDetail::Labelled(text)) => {
                labels.push(("Finalidade:", text.clone()));
            }
            _ => {}
        }
        labels
    }

    fn locate(&self, locator: &Locator) -> DriverResult<Vec<MockElement>> {
        let Locator::Css(css) = locator else {
            return Ok(vec![]);
        };
        let site = &self.site;
        let found = if *css == site.table_body_selector {
            match (self.current_page(), self.table_missing) {
                (Some(_), false) => vec![MockElement::TableBody],
                _ => vec![],
            }
        } else if *css == site.row_selector {
            match (self.current_page(), self.table_missing) {
                (Some(p), false) => (0..self.pages[p].len())
                    .map(|r| MockElement::Row(p, r))
                    .collect(),
                _ => vec![],
            }
        } else if *css == site.next_selector {
            if self.next_present() {
                vec![MockElement::Next]
            } else {
                vec![]
            }
        } else if *css == site.detail_root_selector {
            match self.detail() {
                Some(MockDetail::NeverLoads) | None => vec![],
                Some(_) => vec![MockElement::DetailRoot],
            }
        } else if *css == site.purpose_field_selector {
            match self.detail() {
                Some(MockDetail::Structured(_)) | Some(MockDetail::Unreadable) => {
                    vec![MockElement::StructuredField]
                }
                _ => vec![],
            }
        } else if css == "dt" {
            match self.detail() {
                Some(MockDetail::NeverLoads) | None => vec![],
                Some(_) => (0..self.labels().len()).map(MockElement::Label).collect(),
            }
        } else {
            vec![]
        };
        Ok(found)
    }
}

/// A [`PageDriver`] over a scripted site. Clones share the same state.
#[derive(Debug, Clone)]
pub struct MockSite {
    state: Arc<Mutex<SiteState>>,
}

impl MockSite {
    pub fn new(pages: Vec<Vec<MockRow>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SiteState {
                site: SiteConfig::default(),
                pages,
                view: View::Blank,
                unreachable: false,
                table_missing: false,
                next_vanishes_after: None,
                next_hidden: false,
                back_failures: 0,
                next_clicks: 0,
                back_navigations: 0,
                closes: 0,
                navigations: 0,
                list_pages_shown: Vec::new(),
                details_opened: Vec::new(),
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap()
    }

    /// Puts the site on list page `page` (1-based) without going through
    /// navigation, as if the user had paged there.
    pub fn show_page(&self, page: usize) {
        self.state().show_list(page - 1);
    }

    /// 1-based list page currently displayed, if any.
    pub fn displayed_page(&self) -> Option<usize> {
        self.state().current_page().map(|p| p + 1)
    }
}

fn stale(element: &MockElement) -> DriverError {
    DriverError::Backend(format!("stale element reference: {:?}", element))
}

#[async_trait]
impl PageDriver for MockSite {
    type Element = MockElement;

    async fn navigate(&self, url: &str, _policy: &NavigationPolicy) -> DriverResult<()> {
        let mut state = self.state();
        state.navigations += 1;
        if state.unreachable {
            return Err(DriverError::Backend(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)));
        }
        state.show_list(0);
        Ok(())
    }

    async fn locate(&self, locator: &Locator) -> DriverResult<Vec<MockElement>> {
        self.state().locate(locator)
    }

    async fn locate_within(
        &self,
        scope: &MockElement,
        locator: &Locator,
    ) -> DriverResult<Vec<MockElement>> {
        let state = self.state();
        let found = match (scope, locator) {
            (MockElement::Row(p, r), Locator::Css(css)) if *css == state.site.value_cell_selector => {
                if state.current_page() != Some(*p) {
                    return Err(stale(scope));
                }
                match state.pages[*p][*r].value {
                    Some(_) => vec![MockElement::ValueCell(*p, *r)],
                    None => vec![],
                }
            }
            (MockElement::StructuredField, Locator::Css(css)) if css == "dd" => {
                vec![MockElement::StructuredDd]
            }
            (MockElement::Label(i), Locator::XPath(x)) if x == ".." => vec![MockElement::Group(*i)],
            (MockElement::Group(i), Locator::Css(css)) if css == "dd" => vec![MockElement::GroupDd(*i)],
            _ => vec![],
        };
        Ok(found)
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> DriverResult<()> {
        if self.state().locate(locator)?.is_empty() {
            Err(DriverError::Timeout {
                what: locator.to_string(),
                after: timeout,
            })
        } else {
            Ok(())
        }
    }

    async fn read_text(&self, element: &MockElement) -> DriverResult<Option<String>> {
        let state = self.state();
        let text = match element {
            MockElement::ValueCell(p, r) => {
                if state.current_page() != Some(*p) {
                    return Err(stale(element));
                }
                state.pages[*p][*r].value.clone()
            }
            MockElement::StructuredDd => match state.detail() {
                Some(MockDetail::Structured(text)) => text.clone(),
                Some(MockDetail::Unreadable) => {
                    return Err(DriverError::Backend("node detached while reading".into()));
                }
                _ => return Err(stale(element)),
            },
            MockElement::Label(i) => state.labels().get(*i).map(|(label, _)| label.to_string()),
            MockElement::GroupDd(i) => state.labels().get(*i).and_then(|(_, text)| text.clone()),
            MockElement::Next => Some(format!(" {} ", state.site.next_label)),
            _ => None,
        };
        Ok(text)
    }

    async fn read_attribute(&self, element: &MockElement, name: &str) -> DriverResult<Option<String>> {
        let state = self.state();
        match (element, name) {
            (MockElement::Next, "disabled") if state.next_disabled() => Ok(Some("disabled".into())),
            _ => Ok(None),
        }
    }

    async fn is_visible(&self, element: &MockElement) -> DriverResult<bool> {
        Ok(!(*element == MockElement::Next && self.state().next_hidden))
    }

    async fn click(&self, element: &MockElement) -> DriverResult<()> {
        let mut state = self.state();
        match element {
            MockElement::ValueCell(p, r) => {
                if state.current_page() != Some(*p) {
                    return Err(stale(element));
                }
                let row = &state.pages[*p][*r];
                if row.click_fails {
                    return Err(DriverError::Backend("element click intercepted".into()));
                }
                let late_failure = row.click_opens_then_fails;
                state.view = View::Detail(*p, *r);
                state.details_opened.push((p + 1, r + 1));
                if late_failure {
                    return Err(DriverError::Timeout {
                        what: "click to complete".into(),
                        after: Duration::from_secs(30),
                    });
                }
                Ok(())
            }
            MockElement::Next => {
                if !state.next_present() {
                    return Err(stale(element));
                }
                state.next_clicks += 1;
                if let Some(p) = state.current_page() {
                    if p + 1 < state.pages.len() {
                        state.show_list(p + 1);
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn go_back(&self) -> DriverResult<()> {
        let mut state = self.state();
        state.back_navigations += 1;
        if state.back_failures > 0 {
            state.back_failures -= 1;
            return Err(DriverError::Backend("history navigation aborted".into()));
        }
        let view = state.view;
        match view {
            View::Detail(..) => state.show_list(0),
            View::List(_) => state.view = View::Blank,
            View::Blank => {}
        }
        Ok(())
    }

    async fn close(self) -> DriverResult<()> {
        self.state().closes += 1;
        Ok(())
    }
}
