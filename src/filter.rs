//! Applies a [`FilterSelection`] to an ingested table.

use crate::schema::{FilterSelection, Table, Transaction};

/// Keeps rows whose date falls inside the inclusive range and whose store
/// location, category, and type are each members of the selection's sets.
///
/// An empty result is not an error; callers surface it as a distinct
/// "no data" state before computing any metrics.
pub fn filter(table: &[Transaction], selection: &FilterSelection) -> Table {
    table
        .iter()
        .filter(|row| selection.matches(row))
        .cloned()
        .collect()
}
