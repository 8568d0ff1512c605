//! Core engines and models for the grid
//!
//! This crate provides the leaf building blocks every row model shares:
//! field resolution over dynamic row records, the filter predicate and
//! comparator engines, column definitions, and the grid event bus.

pub mod column;
pub mod events;
pub mod filter;
pub mod row;
pub mod sort;
pub mod value;

// Re-export commonly used types
pub use column::{merge_column_defs, ColumnDef, ColumnFilterKind, ColumnState, PinnedSide};
pub use events::{EventBus, GridEvent};
pub use filter::{
    row_matches_quick_filter, DateFilter, DateFilterOp, FilterDescriptor, FilterModel,
    NumberFilter, NumberFilterOp, SetFilter, TextFilter, TextFilterOp,
};
pub use row::{make_row_nodes, row_id, RowIdFn, RowNode};
pub use sort::{default_compare, sort_rows, SortDirection, SortModel, SortModelItem};
pub use value::{as_number, display_string, is_blank, resolve_field};
