//! Column definitions
//!
//! A `ColumnDef` declares one column's data binding, display metadata and
//! behavior. Columns are identified by `col_id`, defaulting to the field
//! path, defaulting to a positional `col-<index>`; callers persisting
//! column state should supply explicit ids, since the positional
//! fallback shifts when columns are reordered or conditionally included.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::row::RowNode;
use crate::sort::SortDirection;
use crate::value::{display_string, resolve_field};

/// Which side a column is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinnedSide {
    Left,
    Right,
}

/// Which filter a column offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnFilterKind {
    #[serde(rename = "agTextColumnFilter")]
    Text,
    #[serde(rename = "agNumberColumnFilter")]
    Number,
    #[serde(rename = "agDateColumnFilter")]
    Date,
    #[serde(rename = "agSetColumnFilter")]
    Set,
}

/// Custom cell value extraction; receives the row record.
pub type ValueGetter = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// Custom cell formatting; receives the extracted value.
pub type ValueFormatter = Arc<dyn Fn(Option<&Value>) -> String + Send + Sync>;

/// Custom sort comparator; receives both cell values and both row nodes
/// for context.
pub type Comparator =
    Arc<dyn Fn(Option<&Value>, Option<&Value>, &RowNode, &RowNode) -> Ordering + Send + Sync>;

/// Declarative description of one grid column.
#[derive(Clone, Default)]
pub struct ColumnDef {
    /// Unique identifier; falls back to `field`, then `col-<index>`.
    pub col_id: Option<String>,
    /// Dot-delimited field path into the row record.
    pub field: Option<String>,
    /// Header label; falls back to the field path.
    pub header_name: Option<String>,
    pub width: Option<u32>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub sortable: bool,
    pub filter: Option<ColumnFilterKind>,
    pub floating_filter: bool,
    pub resizable: bool,
    pub editable: bool,
    pub hide: bool,
    pub pinned: Option<PinnedSide>,
    /// Initial sort direction applied when the grid is constructed.
    pub sort: Option<SortDirection>,
    /// Priority of the initial sort among columns that declare one.
    pub sort_index: Option<usize>,
    pub value_getter: Option<ValueGetter>,
    pub value_formatter: Option<ValueFormatter>,
    pub comparator: Option<Comparator>,
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("col_id", &self.col_id)
            .field("field", &self.field)
            .field("header_name", &self.header_name)
            .field("hide", &self.hide)
            .field("pinned", &self.pinned)
            .field("sortable", &self.sortable)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl ColumnDef {
    /// Column bound to a field path.
    pub fn new(field: &str) -> Self {
        Self {
            field: Some(field.to_string()),
            ..Self::default()
        }
    }

    /// Effective column id given the column's position.
    pub fn effective_id(&self, index: usize) -> String {
        self.col_id
            .clone()
            .or_else(|| self.field.clone())
            .unwrap_or_else(|| format!("col-{index}"))
    }

    /// Header label shown to the renderer.
    pub fn header_label(&self) -> String {
        self.header_name
            .clone()
            .or_else(|| self.field.clone())
            .unwrap_or_default()
    }

    /// Extract this column's cell value from a row record.
    pub fn cell_value(&self, data: &Value) -> Option<Value> {
        if let Some(getter) = &self.value_getter {
            return getter(data);
        }
        self.field
            .as_deref()
            .and_then(|field| resolve_field(data, field))
            .cloned()
    }

    /// Format a cell value for display and export.
    pub fn format_value(&self, value: Option<&Value>) -> String {
        match &self.value_formatter {
            Some(formatter) => formatter(value),
            None => display_string(value),
        }
    }
}

/// Persistable per-column state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnState {
    pub col_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default)]
    pub hide: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<PinnedSide>,
}

/// Merge the default column definition under every column and resolve
/// effective column ids. The per-column definition wins field by field;
/// `global_sortable`/`global_floating_filter` sit between the column and
/// the default, mirroring the grid-level options.
pub fn merge_column_defs(
    defs: &[ColumnDef],
    default_def: Option<&ColumnDef>,
    global_sortable: Option<bool>,
    global_floating_filter: Option<bool>,
) -> Vec<ColumnDef> {
    defs.iter()
        .enumerate()
        .map(|(index, def)| {
            let mut merged = def.clone();
            if let Some(base) = default_def {
                merged.header_name = merged.header_name.or_else(|| base.header_name.clone());
                merged.width = merged.width.or(base.width);
                merged.min_width = merged.min_width.or(base.min_width);
                merged.max_width = merged.max_width.or(base.max_width);
                merged.sortable = merged.sortable || base.sortable;
                merged.filter = merged.filter.or(base.filter);
                merged.floating_filter = merged.floating_filter || base.floating_filter;
                merged.resizable = merged.resizable || base.resizable;
                merged.editable = merged.editable || base.editable;
                if merged.value_formatter.is_none() {
                    merged.value_formatter = base.value_formatter.clone();
                }
                if merged.comparator.is_none() {
                    merged.comparator = base.comparator.clone();
                }
            }
            if let Some(sortable) = global_sortable {
                merged.sortable = merged.sortable || sortable;
            }
            if let Some(floating) = global_floating_filter {
                merged.floating_filter = merged.floating_filter || floating;
            }
            merged.col_id = Some(def.effective_id(index));
            merged
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn effective_id_fallback_chain() {
        let explicit = ColumnDef {
            col_id: Some("custom".to_string()),
            ..ColumnDef::new("name")
        };
        assert_eq!(explicit.effective_id(0), "custom");
        assert_eq!(ColumnDef::new("name").effective_id(0), "name");
        assert_eq!(ColumnDef::default().effective_id(3), "col-3");
    }

    #[test]
    fn cell_value_prefers_getter() {
        let col = ColumnDef {
            value_getter: Some(Arc::new(|data: &Value| {
                Some(json!(format!("{}!", data["name"].as_str().unwrap_or(""))))
            })),
            ..ColumnDef::new("name")
        };
        let row = json!({ "name": "Ann" });
        assert_eq!(col.cell_value(&row), Some(json!("Ann!")));
    }

    #[test]
    fn format_value_uses_formatter() {
        let col = ColumnDef {
            value_formatter: Some(Arc::new(|v: Option<&Value>| {
                format!("${}", display_string(v))
            })),
            ..ColumnDef::new("price")
        };
        assert_eq!(col.format_value(Some(&json!(10))), "$10");
        assert_eq!(ColumnDef::new("price").format_value(None), "");
    }

    #[test]
    fn merge_applies_defaults_and_globals() {
        let default_def = ColumnDef {
            sortable: true,
            filter: Some(ColumnFilterKind::Text),
            ..ColumnDef::default()
        };
        let defs = vec![
            ColumnDef::new("name"),
            ColumnDef {
                filter: Some(ColumnFilterKind::Number),
                ..ColumnDef::new("age")
            },
        ];
        let merged = merge_column_defs(&defs, Some(&default_def), None, Some(true));
        assert!(merged[0].sortable);
        assert_eq!(merged[0].filter, Some(ColumnFilterKind::Text));
        assert!(merged[0].floating_filter);
        assert_eq!(merged[1].filter, Some(ColumnFilterKind::Number));
        assert_eq!(merged[0].col_id.as_deref(), Some("name"));
    }
}
