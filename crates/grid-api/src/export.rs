//! CSV export
//!
//! Exports the currently displayed rows across the visible columns.
//! Headers come from `header_label`, cells go through the column's value
//! getter and formatter, so what lands in the file is exactly what a
//! renderer would show. Cells are joined with plain commas and rows with
//! newlines; values are not quoted or escaped, so fields containing
//! commas or newlines will shift columns in the output.

use grid_core::{ColumnDef, RowNode};

/// Render `nodes` as CSV over the visible (non-hidden) columns.
pub fn export_csv(columns: &[ColumnDef], nodes: &[RowNode]) -> String {
    let visible: Vec<&ColumnDef> = columns.iter().filter(|c| !c.hide).collect();

    let mut lines = Vec::with_capacity(nodes.len() + 1);
    lines.push(
        visible
            .iter()
            .map(|c| c.header_label())
            .collect::<Vec<_>>()
            .join(","),
    );
    for node in nodes {
        let cells: Vec<String> = visible
            .iter()
            .map(|c| {
                let value = c.cell_value(&node.data);
                c.format_value(value.as_ref())
            })
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_core::make_row_nodes;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn nodes() -> Vec<RowNode> {
        make_row_nodes(
            vec![
                json!({"name": "Ann", "age": 25}),
                json!({"name": "Bob", "age": 30}),
            ],
            None,
            0,
        )
    }

    #[test]
    fn header_and_rows() {
        let columns = vec![
            grid_core::ColumnDef {
                header_name: Some("Name".to_string()),
                ..grid_core::ColumnDef::new("name")
            },
            grid_core::ColumnDef::new("age"),
        ];
        assert_eq!(export_csv(&columns, &nodes()), "Name,age\nAnn,25\nBob,30");
    }

    #[test]
    fn hidden_columns_are_excluded() {
        let columns = vec![
            grid_core::ColumnDef::new("name"),
            grid_core::ColumnDef {
                hide: true,
                ..grid_core::ColumnDef::new("age")
            },
        ];
        assert_eq!(export_csv(&columns, &nodes()), "name\nAnn\nBob");
    }

    #[test]
    fn formatter_shapes_cells() {
        let columns = vec![grid_core::ColumnDef {
            value_formatter: Some(Arc::new(|v: Option<&Value>| {
                format!("[{}]", grid_core::display_string(v))
            })),
            ..grid_core::ColumnDef::new("age")
        }];
        assert_eq!(export_csv(&columns, &nodes()), "age\n[25]\n[30]");
    }

    #[test]
    fn missing_values_export_as_empty_cells() {
        let columns = vec![
            grid_core::ColumnDef::new("name"),
            grid_core::ColumnDef::new("city"),
        ];
        assert_eq!(export_csv(&columns, &nodes()), "name,city\nAnn,\nBob,");
    }
}
