//! Persisted grid state
//!
//! A serializable snapshot of everything the user can change through the
//! API: the filter model, the sort model and per-column state. Round-trips
//! through JSON so hosts can stash it and restore a session later.

use serde::{Deserialize, Serialize};

use grid_core::{ColumnState, FilterModel, SortModel};

/// Snapshot of the grid's user-mutable state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_state: Option<Vec<ColumnState>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_core::{ColumnState, PinnedSide, SortDirection, SortModelItem};

    #[test]
    fn state_round_trips_through_json() {
        let state = GridState {
            filter: Some(FilterModel::default()),
            sort: Some(vec![SortModelItem {
                col_id: "name".to_string(),
                sort: SortDirection::Desc,
            }]),
            column_state: Some(vec![ColumnState {
                col_id: "name".to_string(),
                width: Some(120),
                hide: false,
                pinned: Some(PinnedSide::Left),
            }]),
        };
        let wire = serde_json::to_string(&state).unwrap();
        let back: GridState = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn empty_state_serializes_compactly() {
        assert_eq!(serde_json::to_string(&GridState::default()).unwrap(), "{}");
    }
}
