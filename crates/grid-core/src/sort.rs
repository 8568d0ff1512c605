//! Comparator engine and multi-key sorting
//!
//! The default comparator sorts missing values last regardless of
//! direction, numbers numerically, and everything else as strings.
//! Multi-column sorts walk the sort model in priority order; a full tie
//! preserves the incoming order (the sort is stable).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::column::ColumnDef;
use crate::row::RowNode;
use crate::value::{as_number, display_string, resolve_field};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One entry of the sort model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortModelItem {
    #[serde(rename = "colId")]
    pub col_id: String,
    pub sort: SortDirection,
}

/// Ordered sort entries; the first entry is the primary key.
pub type SortModel = Vec<SortModelItem>;

/// Default total order over cell values.
///
/// Missing values compare greater than present ones so they land at the
/// end before direction negation is applied.
pub fn default_compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(va), Some(vb)) => {
            if va == vb {
                return Ordering::Equal;
            }
            if let (Some(na), Some(nb)) = (as_number(Some(va)), as_number(Some(vb))) {
                return na.partial_cmp(&nb).unwrap_or(Ordering::Equal);
            }
            compare_strings(&display_string(Some(va)), &display_string(Some(vb)))
        }
    }
}

// Case-insensitive with a code-point tiebreak; deterministic stand-in
// for locale collation.
fn compare_strings(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Stable multi-key sort of row records per the sort model.
///
/// Unknown column ids fall through to the next entry; an empty model
/// leaves the order untouched.
pub fn sort_rows(rows: &mut [Value], sort_model: &SortModel, columns: &[ColumnDef]) {
    if sort_model.is_empty() {
        return;
    }

    rows.sort_by(|a, b| {
        for entry in sort_model {
            let Some(col) = columns
                .iter()
                .enumerate()
                .find(|(i, c)| c.effective_id(*i) == entry.col_id)
                .map(|(_, c)| c)
            else {
                continue;
            };

            let value_a = col.field.as_deref().and_then(|f| resolve_field(a, f));
            let value_b = col.field.as_deref().and_then(|f| resolve_field(b, f));

            let mut ordering = match &col.comparator {
                Some(comparator) => {
                    // Transient context nodes, identity not yet assigned.
                    let node_a = placeholder_node(a);
                    let node_b = placeholder_node(b);
                    comparator(value_a, value_b, &node_a, &node_b)
                }
                None => default_compare(value_a, value_b),
            };

            if entry.sort == SortDirection::Desc {
                ordering = ordering.reverse();
            }
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn placeholder_node(data: &Value) -> RowNode {
    RowNode {
        id: String::new(),
        data: data.clone(),
        row_index: 0,
        is_selected: false,
    }
}
