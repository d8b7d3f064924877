//! Tolerant parsing for the API's unstable response shapes.
//!
//! The listing endpoint has been observed returning both a bare sequence and
//! a sequence nested under a named field; the strategies are tried in order
//! and the first one yielding a well-typed sequence wins.

use serde_json::Value;

use crate::types::PerkRecord;

type ListingStrategy = fn(&Value) -> Option<Vec<PerkRecord>>;

const LISTING_STRATEGIES: &[ListingStrategy] = &[parse_bare_listing, parse_wrapped_listing];

pub(crate) fn parse_listing(value: &Value) -> Option<Vec<PerkRecord>> {
    LISTING_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(value))
}

/// A single record arrives either bare or wrapped as `{"perk": record}`.
pub(crate) fn parse_perk_record(value: &Value) -> Option<PerkRecord> {
    record_from_entry(value.get("perk").unwrap_or(value))
}

fn parse_bare_listing(value: &Value) -> Option<Vec<PerkRecord>> {
    records_from_entries(value.as_array()?)
}

fn parse_wrapped_listing(value: &Value) -> Option<Vec<PerkRecord>> {
    records_from_entries(value.get("perks")?.as_array()?)
}

fn records_from_entries(entries: &[Value]) -> Option<Vec<PerkRecord>> {
    entries.iter().map(record_from_entry).collect()
}

fn record_from_entry(entry: &Value) -> Option<PerkRecord> {
    serde_json::from_value(entry.clone()).ok()
}
