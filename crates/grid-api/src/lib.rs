//! Grid controller and public API
//!
//! `Grid` is the entry point: construct one from `GridOptions`, then
//! drive it through the control API. State persistence lives in
//! [`state`], CSV export in [`export`].

pub mod export;
pub mod grid;
pub mod state;

pub use export::export_csv;
pub use grid::{Grid, GridOptions, SelectionMode};
pub use state::GridState;
