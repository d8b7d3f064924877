use std::collections::BTreeSet;

use perkdir_client::PerkRecord;

pub const LOADING_INDICATOR: &str = "Loading perks...";
pub const SEARCHING_INDICATOR: &str = "Searching...";
pub const NAME_INPUT_PLACEHOLDER: &str = "Enter perk name...";

/// The page's current filter input. Each effective edit produces a new
/// query; superseded ones are discarded by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub name_substring: Option<String>,
    pub merchant: Option<String>,
}

impl FilterQuery {
    pub fn is_unfiltered(&self) -> bool {
        self.name_substring.is_none() && self.merchant.is_none()
    }

    /// Applies a raw text-input value; returns whether the query changed.
    pub(crate) fn set_name(&mut self, raw: &str) -> bool {
        let next = normalize(raw);
        if self.name_substring == next {
            return false;
        }
        self.name_substring = next;
        true
    }

    /// Applies a combobox selection; returns whether the query changed.
    pub(crate) fn set_merchant(&mut self, selection: Option<String>) -> bool {
        let next = selection.as_deref().and_then(|raw| normalize(raw));
        if self.merchant == next {
            return false;
        }
        self.merchant = next;
        true
    }
}

fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Observable phase of the directory page. `Searching` keeps the previously
/// displayed items so the page never flashes empty mid-search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryViewState {
    Loading,
    Ready {
        items: Vec<PerkRecord>,
        result_count: usize,
    },
    Searching {
        previous_items: Vec<PerkRecord>,
    },
}

impl DirectoryViewState {
    pub fn indicator(&self) -> Option<&'static str> {
        match self {
            Self::Loading => Some(LOADING_INDICATOR),
            Self::Searching { .. } => Some(SEARCHING_INDICATOR),
            Self::Ready { .. } => None,
        }
    }

    pub fn visible_items(&self) -> &[PerkRecord] {
        match self {
            Self::Loading => &[],
            Self::Ready { items, .. } => items,
            Self::Searching { previous_items } => previous_items,
        }
    }
}

/// What an observer of the rendered page can see. Scenario assertions key on
/// this projection and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryViewSnapshot {
    pub indicator: Option<&'static str>,
    pub summary: Option<String>,
    pub result_count: Option<usize>,
    pub visible_titles: Vec<String>,
    pub merchant_options: Vec<String>,
    pub name_placeholder: &'static str,
    pub load_error: Option<String>,
}

impl DirectoryViewSnapshot {
    pub fn is_settled(&self) -> bool {
        self.indicator.is_none()
    }

    pub fn shows_title(&self, title: &str) -> bool {
        self.visible_titles.iter().any(|visible| visible == title)
    }
}

pub(crate) fn distinct_merchants(items: &[PerkRecord]) -> Vec<String> {
    items
        .iter()
        .map(|record| record.merchant.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, merchant: &str) -> PerkRecord {
        PerkRecord {
            id: Some(format!("id-{title}")),
            title: title.to_owned(),
            description: String::new(),
            category: String::new(),
            merchant: merchant.to_owned(),
            discount_percent: 0,
        }
    }

    #[test]
    fn blank_input_clears_the_name_filter() {
        let mut query = FilterQuery::default();
        assert!(query.set_name("Coffee"));
        assert!(query.set_name("   "));
        assert!(query.is_unfiltered());
    }

    #[test]
    fn unchanged_input_is_not_an_effective_edit() {
        let mut query = FilterQuery::default();
        assert!(query.set_name("Coffee"));
        assert!(!query.set_name("  Coffee "));
        assert!(query.set_merchant(Some("Cafe".to_owned())));
        assert!(!query.set_merchant(Some("Cafe".to_owned())));
        assert!(query.set_merchant(None));
    }

    #[test]
    fn searching_keeps_the_previous_items_visible() {
        let state = DirectoryViewState::Searching {
            previous_items: vec![record("a", "m")],
        };
        assert_eq!(state.indicator(), Some(SEARCHING_INDICATOR));
        assert_eq!(state.visible_items().len(), 1);
    }

    #[test]
    fn merchant_options_are_distinct_and_sorted() {
        let items = [
            record("a", "Zeta"),
            record("b", "Alpha"),
            record("c", "Zeta"),
        ];
        assert_eq!(distinct_merchants(&items), ["Alpha", "Zeta"]);
    }
}
