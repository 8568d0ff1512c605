//! Row models: the client-side pipeline and the block cache
//!
//! The client-side row model recomputes the displayed row set as a pure
//! projection of the raw rows and the active models. The server-side and
//! infinite row models share one block cache that fetches contiguous row
//! ranges from a caller-supplied datasource.

pub mod block_cache;
pub mod client;
pub mod datasource;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-exports
pub use block_cache::{BlockCache, BlockCacheConfig, BlockFetch};
pub use client::{filter_rows, paginate, run_pipeline, set_filter_values, PaginationState};
pub use datasource::{
    ColumnVo, DatasourceHandle, GetRowsRequest, InfiniteDatasource, InfiniteLoadResult,
    LoadSuccess, ServerSideDatasource, ServerSideGetRowsRequest,
};

/// Which row model drives the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowModelType {
    #[default]
    ClientSide,
    ServerSide,
    Infinite,
}

/// Errors that can occur in grid operations.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("datasource error: {0}")]
    Datasource(String),

    #[error("no datasource configured")]
    NoDatasource,

    #[error("operation requires the {0:?} row model")]
    WrongRowModel(RowModelType),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("other error: {0}")]
    Other(String),
}
