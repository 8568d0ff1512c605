//! Datasource contracts for the server-side and infinite row models
//!
//! The caller supplies an implementation; the grid only builds requests
//! and interprets responses. Both shapes reduce to the same internal
//! contract: fetch the rows for `[start_row, end_row)` under the current
//! sort and filter models.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use grid_core::{FilterModel, SortModel};

/// Column descriptor carried in grouping/pivot request fields.
///
/// Row grouping and pivoting are not executed by this grid; the fields
/// exist so server contracts stay wire-compatible and are always empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnVo {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agg_func: Option<String>,
}

/// Server-side row request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSideGetRowsRequest {
    /// First row requested.
    pub start_row: usize,
    /// Last row requested (exclusive).
    pub end_row: usize,
    pub row_group_cols: Vec<ColumnVo>,
    pub value_cols: Vec<ColumnVo>,
    pub pivot_cols: Vec<ColumnVo>,
    pub pivot_mode: bool,
    pub group_keys: Vec<String>,
    pub filter_model: FilterModel,
    pub sort_model: SortModel,
}

impl ServerSideGetRowsRequest {
    pub fn new(
        start_row: usize,
        end_row: usize,
        sort_model: SortModel,
        filter_model: FilterModel,
    ) -> Self {
        Self {
            start_row,
            end_row,
            row_group_cols: Vec::new(),
            value_cols: Vec::new(),
            pivot_cols: Vec::new(),
            pivot_mode: false,
            group_keys: Vec::new(),
            filter_model,
            sort_model,
        }
    }
}

/// Successful server-side response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSuccess {
    pub rows: Vec<Value>,
    /// Total row count, if the server knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
}

/// Datasource for the server-side row model.
#[async_trait]
pub trait ServerSideDatasource: Send + Sync {
    async fn get_rows(&self, request: ServerSideGetRowsRequest) -> anyhow::Result<LoadSuccess>;
}

/// Infinite-scroll row request; the simpler of the two shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRowsRequest {
    pub start_row: usize,
    pub end_row: usize,
    pub sort_model: SortModel,
    pub filter_model: FilterModel,
}

/// Successful infinite-scroll response; `last_row` plays the role of the
/// server-side total count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfiniteLoadResult {
    pub rows: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_row: Option<usize>,
}

/// Datasource for the infinite row model.
#[async_trait]
pub trait InfiniteDatasource: Send + Sync {
    async fn get_rows(&self, request: GetRowsRequest) -> anyhow::Result<InfiniteLoadResult>;
}

/// Whichever datasource the grid currently holds.
#[derive(Clone)]
pub enum DatasourceHandle {
    ServerSide(Arc<dyn ServerSideDatasource>),
    Infinite(Arc<dyn InfiniteDatasource>),
}

impl DatasourceHandle {
    /// Fetch `[start_row, end_row)` through either shape, normalized to
    /// rows plus an optional total count.
    pub async fn fetch(
        &self,
        start_row: usize,
        end_row: usize,
        sort_model: SortModel,
        filter_model: FilterModel,
    ) -> anyhow::Result<(Vec<Value>, Option<i64>)> {
        match self {
            DatasourceHandle::ServerSide(ds) => {
                let response = ds
                    .get_rows(ServerSideGetRowsRequest::new(
                        start_row,
                        end_row,
                        sort_model,
                        filter_model,
                    ))
                    .await?;
                Ok((response.rows, response.row_count))
            }
            DatasourceHandle::Infinite(ds) => {
                let response = ds
                    .get_rows(GetRowsRequest {
                        start_row,
                        end_row,
                        sort_model,
                        filter_model,
                    })
                    .await?;
                Ok((response.rows, response.last_row.map(|n| n as i64)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_side_request_wire_format() {
        let request =
            ServerSideGetRowsRequest::new(0, 100, Vec::new(), FilterModel::default());
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["startRow"], json!(0));
        assert_eq!(wire["endRow"], json!(100));
        assert_eq!(wire["pivotMode"], json!(false));
        assert_eq!(wire["rowGroupCols"], json!([]));
        assert_eq!(wire["groupKeys"], json!([]));
    }

    struct Fixed;

    #[async_trait]
    impl InfiniteDatasource for Fixed {
        async fn get_rows(&self, request: GetRowsRequest) -> anyhow::Result<InfiniteLoadResult> {
            Ok(InfiniteLoadResult {
                rows: vec![json!({ "start": request.start_row })],
                last_row: Some(42),
            })
        }
    }

    #[tokio::test]
    async fn handle_normalizes_infinite_responses() {
        let handle = DatasourceHandle::Infinite(Arc::new(Fixed));
        let (rows, total) = handle
            .fetch(10, 20, Vec::new(), FilterModel::default())
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({ "start": 10 })]);
        assert_eq!(total, Some(42));
    }
}
