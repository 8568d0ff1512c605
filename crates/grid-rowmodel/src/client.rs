//! Client-side row pipeline
//!
//! A pure projection: given the raw rows, the merged column definitions
//! and the active models, deterministically produce the displayed slice.
//! Stages run in a fixed order -- quick filter and column filters, then
//! the stable multi-key sort, then node materialization, then the
//! pagination slice. There is no incremental state; identical inputs
//! always yield identical output.

use serde_json::Value;

use grid_core::{
    make_row_nodes, resolve_field, row_matches_quick_filter, sort_rows, ColumnDef, FilterModel,
    RowIdFn, RowNode, SortModel,
};

/// Pagination inputs for the slice stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub enabled: bool,
    pub page: usize,
    pub page_size: usize,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            enabled: false,
            page: 0,
            page_size: 10,
        }
    }
}

impl PaginationState {
    /// Number of pages for a given row count; at least one.
    pub fn total_pages(&self, row_count: usize) -> usize {
        if self.page_size == 0 {
            return 1;
        }
        row_count.div_ceil(self.page_size).max(1)
    }
}

/// Filter stage: keep rows passing the quick filter and every active
/// column filter. Filter entries naming unknown or fieldless columns
/// pass trivially.
pub fn filter_rows(
    rows: &[Value],
    columns: &[ColumnDef],
    filter_model: &FilterModel,
    quick_filter: &str,
) -> Vec<Value> {
    rows.iter()
        .filter(|row| {
            if !quick_filter.is_empty() && !row_matches_quick_filter(row, columns, quick_filter) {
                return false;
            }
            filter_model.iter().all(|(col_id, descriptor)| {
                let Some(col) = find_column(columns, col_id) else {
                    return true;
                };
                let Some(field) = col.field.as_deref() else {
                    return true;
                };
                descriptor.passes(resolve_field(row, field))
            })
        })
        .cloned()
        .collect()
}

/// Pagination stage: slice out the current page. A page past the end
/// yields an empty slice, not an error.
pub fn paginate(nodes: Vec<RowNode>, pagination: &PaginationState) -> Vec<RowNode> {
    if !pagination.enabled {
        return nodes;
    }
    let start = pagination.page * pagination.page_size;
    if start >= nodes.len() {
        return Vec::new();
    }
    let end = (start + pagination.page_size).min(nodes.len());
    nodes[start..end].to_vec()
}

/// Run the full pipeline: filter, sort, materialize, paginate.
///
/// `row_index` on the returned nodes reflects the post-sort,
/// pre-pagination position.
pub fn run_pipeline(
    rows: &[Value],
    columns: &[ColumnDef],
    filter_model: &FilterModel,
    quick_filter: &str,
    sort_model: &SortModel,
    id_fn: Option<&RowIdFn>,
    pagination: &PaginationState,
) -> Vec<RowNode> {
    let mut surviving = filter_rows(rows, columns, filter_model, quick_filter);
    sort_rows(&mut surviving, sort_model, columns);
    let nodes = make_row_nodes(surviving, id_fn, 0);
    paginate(nodes, pagination)
}

/// Unique string-coerced values of one column, sorted with the null
/// entry last; used to populate set-filter choices.
pub fn set_filter_values(rows: &[Value], column: &ColumnDef) -> Vec<Option<String>> {
    let Some(field) = column.field.as_deref() else {
        return Vec::new();
    };

    let mut values: Vec<Option<String>> = Vec::new();
    for row in rows {
        let value = resolve_field(row, field).map(|v| grid_core::display_string(Some(v)));
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values.sort_by(|a, b| match (a, b) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (Some(_), None) => std::cmp::Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    });
    values
}

fn find_column<'a>(columns: &'a [ColumnDef], col_id: &str) -> Option<&'a ColumnDef> {
    columns
        .iter()
        .enumerate()
        .find(|(i, c)| c.effective_id(*i) == col_id)
        .map(|(_, c)| c)
}
