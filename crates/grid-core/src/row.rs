//! Row nodes
//!
//! A row node pairs a raw row record with its identity, its position in
//! the current ordering, and a selection flag. Nodes are derived values:
//! the row models recreate them on every recomputation and consumers
//! must not mutate them.

use std::sync::Arc;

use serde_json::Value;

/// Caller-supplied row identity function.
///
/// Supply one whenever rows can be sorted or filtered: the positional
/// fallback id is not stable across reordering.
pub type RowIdFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Derived wrapper around one row record.
#[derive(Debug, Clone, PartialEq)]
pub struct RowNode {
    /// Unique within the current row set.
    pub id: String,
    /// The raw row record.
    pub data: Value,
    /// Position in the current (post-sort, pre-pagination) ordering.
    pub row_index: usize,
    /// Denormalized selection flag, recomputed from the selection set.
    pub is_selected: bool,
}

/// Derive a row id, falling back to the positional `row-<index>` form.
pub fn row_id(data: &Value, index: usize, id_fn: Option<&RowIdFn>) -> String {
    match id_fn {
        Some(f) => f(data),
        None => format!("row-{index}"),
    }
}

/// Materialize row nodes from records already in display order.
pub fn make_row_nodes(
    rows: impl IntoIterator<Item = Value>,
    id_fn: Option<&RowIdFn>,
    start_index: usize,
) -> Vec<RowNode> {
    rows.into_iter()
        .enumerate()
        .map(|(offset, data)| {
            let row_index = start_index + offset;
            RowNode {
                id: row_id(&data, row_index, id_fn),
                data,
                row_index,
                is_selected: false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn positional_fallback_ids() {
        let nodes = make_row_nodes([json!({"a": 1}), json!({"a": 2})], None, 0);
        assert_eq!(nodes[0].id, "row-0");
        assert_eq!(nodes[1].id, "row-1");
        assert_eq!(nodes[1].row_index, 1);
    }

    #[test]
    fn caller_supplied_ids() {
        let id_fn: RowIdFn = Arc::new(|data| data["id"].to_string());
        let nodes = make_row_nodes([json!({"id": 7})], Some(&id_fn), 3);
        assert_eq!(nodes[0].id, "7");
        assert_eq!(nodes[0].row_index, 3);
    }
}
