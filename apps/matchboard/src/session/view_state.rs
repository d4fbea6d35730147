use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ranking::{FilterState, PageWindow, SortSpec};

/// Per-view UI state restored when the recruiter navigates back to a list.
/// Feeding `filters`, `sort` and `page` back into `RankedListPipeline::rank`
/// reproduces the page the user left.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewState {
    pub filters: FilterState,
    pub sort: SortSpec,
    pub page: PageWindow,
    pub scroll_offset: f64,
    pub selection: BTreeSet<String>,
}

impl ViewState {
    pub fn with_filters(&self, filters: FilterState) -> Self {
        Self {
            filters,
            // A new filter set invalidates the page position.
            page: PageWindow::new(self.page.page_size, 0),
            scroll_offset: 0.0,
            ..self.clone()
        }
    }

    pub fn with_sort(&self, sort: SortSpec) -> Self {
        Self {
            sort,
            ..self.clone()
        }
    }

    pub fn with_page(&self, page: PageWindow) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    pub fn with_scroll_offset(&self, scroll_offset: f64) -> Self {
        Self {
            scroll_offset,
            ..self.clone()
        }
    }

    pub fn toggle_selected(&self, id: &str) -> Self {
        let mut next = self.clone();
        if !next.selection.remove(id) {
            next.selection.insert(id.to_string());
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Staleness {
    Fresh,
    Warning,
    Stale,
}

/// Advisory age thresholds. The cache never evicts on age; callers decide
/// whether a stale value should trigger a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub fresh: Duration,
    pub stale: Duration,
}

impl StalenessPolicy {
    pub fn new(fresh: Duration, stale: Duration) -> Self {
        Self {
            fresh,
            stale: stale.max(fresh),
        }
    }

    pub fn classify(&self, age: Duration) -> Staleness {
        if age < self.fresh {
            Staleness::Fresh
        } else if age <= self.stale {
            Staleness::Warning
        } else {
            Staleness::Stale
        }
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5 * 60), Duration::from_secs(10 * 60))
    }
}
