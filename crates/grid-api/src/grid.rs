//! Grid controller
//!
//! `Grid` owns the mutable grid state behind an `Arc<RwLock>` and exposes
//! the control API: sort toggling, filter and quick-filter updates, row
//! selection, column state, pagination and datasource management. It is
//! cheap to clone and safe to share across threads; every read-side query
//! recomputes the displayed row set from the current state rather than
//! caching it.
//!
//! Mutations follow one pattern: take the write lock, change the state,
//! decide whether the content actually changed, drop the lock, then
//! publish events and schedule any datasource reload. Events never fire
//! while a lock is held.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::warn;

use grid_core::{
    merge_column_defs, ColumnDef, ColumnFilterKind, ColumnState, EventBus, FilterDescriptor,
    FilterModel, GridEvent, NumberFilter, NumberFilterOp, PinnedSide, RowIdFn, RowNode,
    SortDirection, SortModel, SortModelItem, TextFilter, TextFilterOp,
};
use grid_rowmodel::{
    filter_rows, paginate, set_filter_values, BlockCache, BlockCacheConfig, DatasourceHandle,
    GridError, InfiniteDatasource, PaginationState, RowModelType, ServerSideDatasource,
};

use crate::export::export_csv;
use crate::state::GridState;

/// How row selection behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Selecting a row replaces the previous selection.
    Single,
    /// Selecting a row toggles it in and out of the selection.
    Multiple,
}

/// Construction-time grid options.
#[derive(Default)]
pub struct GridOptions {
    pub row_data: Vec<Value>,
    pub column_defs: Vec<ColumnDef>,
    /// Defaults merged under every column definition.
    pub default_col_def: Option<ColumnDef>,
    pub row_model_type: RowModelType,
    /// Stable row identity; positional ids are used when absent.
    pub row_id_fn: Option<RowIdFn>,
    pub pagination: bool,
    pub pagination_page_size: usize,
    /// Grid-level sortable override, or-ed into every column.
    pub sortable: Option<bool>,
    /// Grid-level floating filter override, or-ed into every column.
    pub floating_filter: Option<bool>,
    pub quick_filter_text: String,
    pub cache: BlockCacheConfig,
    pub server_side_datasource: Option<Arc<dyn ServerSideDatasource>>,
    pub datasource: Option<Arc<dyn InfiniteDatasource>>,
}

/// Options fixed at construction.
struct StaticOptions {
    row_id_fn: Option<RowIdFn>,
    pagination: bool,
    page_size: usize,
    sortable: Option<bool>,
    floating_filter: Option<bool>,
}

struct GridInner {
    row_data: Vec<Value>,
    column_defs: Vec<ColumnDef>,
    default_col_def: Option<ColumnDef>,
    row_model_type: RowModelType,
    sort_model: SortModel,
    filter_model: FilterModel,
    quick_filter_text: String,
    /// Raw floating-filter text per column, kept so the renderer can
    /// repopulate its inputs.
    floating_filter_values: AHashMap<String, String>,
    selected_ids: AHashSet<String>,
    page: usize,
    cache: BlockCache,
    datasource: Option<DatasourceHandle>,
}

/// Shared handle to one grid instance.
#[derive(Clone)]
pub struct Grid {
    inner: Arc<RwLock<GridInner>>,
    events: EventBus,
    opts: Arc<StaticOptions>,
}

fn merged_columns(inner: &GridInner, opts: &StaticOptions) -> Vec<ColumnDef> {
    merge_column_defs(
        &inner.column_defs,
        inner.default_col_def.as_ref(),
        opts.sortable,
        opts.floating_filter,
    )
}

/// Displayed row set before pagination, with selection marks applied.
fn compute_all_nodes(inner: &GridInner, opts: &StaticOptions) -> Vec<RowNode> {
    let mut nodes = match inner.row_model_type {
        RowModelType::ClientSide => {
            let columns = merged_columns(inner, opts);
            let mut surviving = filter_rows(
                &inner.row_data,
                &columns,
                &inner.filter_model,
                &inner.quick_filter_text,
            );
            grid_core::sort_rows(&mut surviving, &inner.sort_model, &columns);
            grid_core::make_row_nodes(surviving, opts.row_id_fn.as_ref(), 0)
        }
        // The server is the source of truth for order and membership.
        _ => inner.cache.nodes(opts.row_id_fn.as_ref()),
    };
    for node in &mut nodes {
        node.is_selected = inner.selected_ids.contains(&node.id);
    }
    nodes
}

fn initial_sort_model(defs: &[ColumnDef]) -> SortModel {
    let mut declared: Vec<(usize, usize, SortModelItem)> = defs
        .iter()
        .enumerate()
        .filter_map(|(index, def)| {
            def.sort.map(|sort| {
                (
                    def.sort_index.unwrap_or(usize::MAX),
                    index,
                    SortModelItem {
                        col_id: def.effective_id(index),
                        sort,
                    },
                )
            })
        })
        .collect();
    declared.sort_by_key(|(priority, index, _)| (*priority, *index));
    declared.into_iter().map(|(_, _, item)| item).collect()
}

impl Grid {
    pub fn new(options: GridOptions) -> Self {
        let sort_model = initial_sort_model(&options.column_defs);
        let datasource = match (options.server_side_datasource, options.datasource) {
            (Some(ds), _) => Some(DatasourceHandle::ServerSide(ds)),
            (None, Some(ds)) => Some(DatasourceHandle::Infinite(ds)),
            (None, None) => None,
        };
        let has_datasource = datasource.is_some();
        let row_model_type = options.row_model_type;

        let inner = GridInner {
            row_data: options.row_data,
            column_defs: options.column_defs,
            default_col_def: options.default_col_def,
            row_model_type,
            sort_model,
            filter_model: FilterModel::default(),
            quick_filter_text: options.quick_filter_text,
            floating_filter_values: AHashMap::new(),
            selected_ids: AHashSet::new(),
            page: 0,
            cache: BlockCache::new(options.cache),
            datasource,
        };
        let grid = Self {
            inner: Arc::new(RwLock::new(inner)),
            events: EventBus::new(),
            opts: Arc::new(StaticOptions {
                row_id_fn: options.row_id_fn,
                pagination: options.pagination,
                page_size: if options.pagination_page_size == 0 {
                    10
                } else {
                    options.pagination_page_size
                },
                sortable: options.sortable,
                floating_filter: options.floating_filter,
            }),
        };
        if has_datasource && row_model_type != RowModelType::ClientSide {
            grid.schedule_reload();
        }
        grid
    }

    /// Subscribe to grid events.
    pub fn on_event<F>(&self, handler: F)
    where
        F: Fn(&GridEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler);
    }

    // ---- row data --------------------------------------------------

    pub fn get_row_data(&self) -> Vec<Value> {
        self.inner.read().row_data.clone()
    }

    /// Replace the client-side row set. Selection entries whose rows
    /// survive are retained; the current page is clamped to the new
    /// page count.
    pub fn set_row_data(&self, rows: Vec<Value>) {
        let displayed = {
            let mut inner = self.inner.write();
            inner.row_data = rows;
            let nodes = compute_all_nodes(&inner, &self.opts);
            let live: AHashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
            inner.selected_ids.retain(|id| live.contains(id));
            let pages = self.pagination_state(&inner).total_pages(nodes.len());
            inner.page = inner.page.min(pages - 1);
            nodes.len()
        };
        self.events
            .publish(&GridEvent::ModelUpdated { displayed_rows: displayed });
    }

    // ---- sorting ---------------------------------------------------

    pub fn get_sort_model(&self) -> SortModel {
        self.inner.read().sort_model.clone()
    }

    pub fn set_sort_model(&self, sort_model: SortModel) {
        let changed = {
            let mut inner = self.inner.write();
            if inner.sort_model == sort_model {
                false
            } else {
                inner.sort_model = sort_model;
                self.invalidate_if_remote(&mut inner);
                true
            }
        };
        if changed {
            self.publish_sort_changed();
            self.schedule_reload_if_remote();
        }
    }

    /// Advance a column through the sort cycle.
    ///
    /// Single-column mode replaces the whole model: unsorted goes to
    /// ascending, ascending to descending, descending back to unsorted.
    /// Multi mode cycles the column in place, keeping other entries and
    /// their priority order; a descending entry is removed.
    pub fn toggle_sort(&self, col_id: &str, multi: bool) {
        let changed = {
            let mut inner = self.inner.write();
            let position = inner.sort_model.iter().position(|s| s.col_id == col_id);
            if multi {
                match position {
                    None => inner.sort_model.push(SortModelItem {
                        col_id: col_id.to_string(),
                        sort: SortDirection::Asc,
                    }),
                    Some(i) => match inner.sort_model[i].sort {
                        SortDirection::Asc => inner.sort_model[i].sort = SortDirection::Desc,
                        SortDirection::Desc => {
                            inner.sort_model.remove(i);
                        }
                    },
                }
            } else {
                let current = position.map(|i| inner.sort_model[i].sort);
                inner.sort_model = match current {
                    None => vec![SortModelItem {
                        col_id: col_id.to_string(),
                        sort: SortDirection::Asc,
                    }],
                    Some(SortDirection::Asc) => vec![SortModelItem {
                        col_id: col_id.to_string(),
                        sort: SortDirection::Desc,
                    }],
                    Some(SortDirection::Desc) => Vec::new(),
                };
            }
            self.invalidate_if_remote(&mut inner);
            true
        };
        if changed {
            self.publish_sort_changed();
            self.schedule_reload_if_remote();
        }
    }

    fn publish_sort_changed(&self) {
        let sort_model = self.inner.read().sort_model.clone();
        self.events.publish(&GridEvent::SortChanged { sort_model });
    }

    // ---- filtering -------------------------------------------------

    pub fn get_filter_model(&self) -> FilterModel {
        self.inner.read().filter_model.clone()
    }

    /// Replace the whole filter model; `None` clears it. A content
    /// change resets pagination to the first page.
    pub fn set_filter_model(&self, model: Option<FilterModel>) {
        let next = model.unwrap_or_default();
        let changed = {
            let mut inner = self.inner.write();
            if inner.filter_model == next {
                false
            } else {
                inner.filter_model = next;
                inner.page = 0;
                self.invalidate_if_remote(&mut inner);
                true
            }
        };
        if changed {
            self.publish_filter_changed();
            self.schedule_reload_if_remote();
        }
    }

    /// Set or clear one column's filter.
    pub fn set_filter(&self, col_id: &str, descriptor: Option<FilterDescriptor>) {
        let mut model = self.get_filter_model();
        match descriptor {
            Some(d) => {
                model.insert(col_id.to_string(), d);
            }
            None => {
                model.remove(col_id);
            }
        }
        self.set_filter_model(Some(model));
    }

    pub fn get_quick_filter(&self) -> String {
        self.inner.read().quick_filter_text.clone()
    }

    pub fn set_quick_filter(&self, text: &str) {
        let changed = {
            let mut inner = self.inner.write();
            if inner.quick_filter_text == text {
                false
            } else {
                inner.quick_filter_text = text.to_string();
                inner.page = 0;
                true
            }
        };
        if changed {
            self.publish_filter_changed();
        }
    }

    /// Map a floating-filter input to a column filter. Number columns
    /// get an equals filter when the text parses; text that does not
    /// parse leaves the filter model untouched. Every other column kind
    /// gets a contains filter. Empty text clears the column's filter.
    pub fn set_floating_filter(&self, col_id: &str, text: &str) {
        let kind = {
            let mut inner = self.inner.write();
            if text.is_empty() {
                inner.floating_filter_values.remove(col_id);
            } else {
                inner
                    .floating_filter_values
                    .insert(col_id.to_string(), text.to_string());
            }
            merged_columns(&inner, &self.opts)
                .iter()
                .find(|c| c.col_id.as_deref() == Some(col_id))
                .and_then(|c| c.filter)
        };

        if text.is_empty() {
            self.set_filter(col_id, None);
            return;
        }
        let descriptor = match kind {
            Some(ColumnFilterKind::Number) => match text.parse::<f64>() {
                Ok(n) => FilterDescriptor::Number(NumberFilter {
                    op: NumberFilterOp::Equals,
                    filter: Some(n),
                    filter_to: None,
                }),
                Err(_) => return,
            },
            _ => FilterDescriptor::Text(TextFilter {
                op: TextFilterOp::Contains,
                filter: Some(text.to_string()),
            }),
        };
        self.set_filter(col_id, Some(descriptor));
    }

    pub fn get_floating_filter(&self, col_id: &str) -> Option<String> {
        self.inner.read().floating_filter_values.get(col_id).cloned()
    }

    fn publish_filter_changed(&self) {
        let filter_model = self.inner.read().filter_model.clone();
        self.events
            .publish(&GridEvent::FilterChanged { filter_model });
    }

    /// Distinct values of one column, for populating set-filter choices.
    /// Client-side rows only; remote models supply their own choices.
    pub fn column_filter_values(&self, col_id: &str) -> Vec<Option<String>> {
        let inner = self.inner.read();
        merged_columns(&inner, &self.opts)
            .iter()
            .find(|c| c.col_id.as_deref() == Some(col_id))
            .map(|col| set_filter_values(&inner.row_data, col))
            .unwrap_or_default()
    }

    // ---- selection -------------------------------------------------

    /// Select a row by id. Single mode replaces the selection; multiple
    /// mode toggles membership.
    pub fn select_row(&self, id: &str, mode: SelectionMode) {
        let changed = {
            let mut inner = self.inner.write();
            match mode {
                SelectionMode::Single => {
                    let already =
                        inner.selected_ids.len() == 1 && inner.selected_ids.contains(id);
                    if already {
                        false
                    } else {
                        inner.selected_ids.clear();
                        inner.selected_ids.insert(id.to_string());
                        true
                    }
                }
                SelectionMode::Multiple => {
                    if !inner.selected_ids.remove(id) {
                        inner.selected_ids.insert(id.to_string());
                    }
                    true
                }
            }
        };
        if changed {
            self.publish_selection_changed();
        }
    }

    /// Select every row in the current (post-filter) row set.
    pub fn select_all(&self) {
        let changed = {
            let mut inner = self.inner.write();
            let next: AHashSet<String> = compute_all_nodes(&inner, &self.opts)
                .into_iter()
                .map(|n| n.id)
                .collect();
            if inner.selected_ids == next {
                false
            } else {
                inner.selected_ids = next;
                true
            }
        };
        if changed {
            self.publish_selection_changed();
        }
    }

    pub fn deselect_all(&self) {
        let changed = {
            let mut inner = self.inner.write();
            if inner.selected_ids.is_empty() {
                false
            } else {
                inner.selected_ids.clear();
                true
            }
        };
        if changed {
            self.publish_selection_changed();
        }
    }

    /// Data of the selected rows, in displayed order.
    pub fn get_selected_rows(&self) -> Vec<Value> {
        self.all_nodes()
            .into_iter()
            .filter(|n| n.is_selected)
            .map(|n| n.data)
            .collect()
    }

    fn publish_selection_changed(&self) {
        let mut selected_ids: Vec<String> = {
            let inner = self.inner.read();
            inner.selected_ids.iter().cloned().collect()
        };
        selected_ids.sort();
        self.events
            .publish(&GridEvent::SelectionChanged { selected_ids });
    }

    // ---- row access ------------------------------------------------

    /// Displayed row set before pagination.
    pub fn all_nodes(&self) -> Vec<RowNode> {
        let inner = self.inner.read();
        compute_all_nodes(&inner, &self.opts)
    }

    /// The current page of the displayed row set.
    pub fn get_displayed_nodes(&self) -> Vec<RowNode> {
        let inner = self.inner.read();
        let nodes = compute_all_nodes(&inner, &self.opts);
        paginate(nodes, &self.pagination_state(&inner))
    }

    /// Rows surviving the filter stage, across all pages.
    pub fn get_displayed_row_count(&self) -> usize {
        self.all_nodes().len()
    }

    pub fn get_row_node(&self, id: &str) -> Option<RowNode> {
        self.all_nodes().into_iter().find(|n| n.id == id)
    }

    pub fn for_each_node<F>(&self, mut f: F)
    where
        F: FnMut(&RowNode, usize),
    {
        for (index, node) in self.all_nodes().iter().enumerate() {
            f(node, index);
        }
    }

    // ---- columns ---------------------------------------------------

    /// Column definitions with defaults and grid-level flags merged in.
    pub fn get_column_defs(&self) -> Vec<ColumnDef> {
        let inner = self.inner.read();
        merged_columns(&inner, &self.opts)
    }

    pub fn set_column_defs(&self, defs: Vec<ColumnDef>) {
        {
            let mut inner = self.inner.write();
            inner.column_defs = defs;
        }
        let displayed = self.get_displayed_row_count();
        self.events
            .publish(&GridEvent::ModelUpdated { displayed_rows: displayed });
    }

    pub fn set_column_visible(&self, col_id: &str, visible: bool) {
        let changed = self.patch_column(col_id, |def| {
            if def.hide != !visible {
                def.hide = !visible;
                true
            } else {
                false
            }
        });
        if changed {
            self.events.publish(&GridEvent::ColumnVisible {
                col_id: col_id.to_string(),
                visible,
            });
        }
    }

    pub fn set_column_pinned(&self, col_id: &str, pinned: Option<PinnedSide>) {
        let changed = self.patch_column(col_id, |def| {
            if def.pinned != pinned {
                def.pinned = pinned;
                true
            } else {
                false
            }
        });
        if changed {
            self.events.publish(&GridEvent::ColumnPinned {
                col_id: col_id.to_string(),
                pinned,
            });
        }
    }

    pub fn set_column_width(&self, col_id: &str, width: u32) {
        let changed = self.patch_column(col_id, |def| {
            if def.width != Some(width) {
                def.width = Some(width);
                true
            } else {
                false
            }
        });
        if changed {
            self.events.publish(&GridEvent::ColumnResized {
                col_id: col_id.to_string(),
                width,
            });
        }
    }

    /// Move a column to a new position; the index is clamped and an
    /// unknown id is a no-op.
    pub fn move_column(&self, col_id: &str, to_index: usize) {
        let moved = {
            let mut inner = self.inner.write();
            let Some(from) = inner
                .column_defs
                .iter()
                .enumerate()
                .position(|(i, c)| c.effective_id(i) == col_id)
            else {
                return;
            };
            let to = to_index.min(inner.column_defs.len() - 1);
            if from == to {
                None
            } else {
                let def = inner.column_defs.remove(from);
                inner.column_defs.insert(to, def);
                Some(to)
            }
        };
        if let Some(to_index) = moved {
            self.events.publish(&GridEvent::ColumnMoved {
                col_id: col_id.to_string(),
                to_index,
            });
        }
    }

    fn patch_column<F>(&self, col_id: &str, patch: F) -> bool
    where
        F: FnOnce(&mut ColumnDef) -> bool,
    {
        let mut inner = self.inner.write();
        let Some(index) = inner
            .column_defs
            .iter()
            .enumerate()
            .position(|(i, c)| c.effective_id(i) == col_id)
        else {
            return false;
        };
        patch(&mut inner.column_defs[index])
    }

    pub fn get_column_state(&self) -> Vec<ColumnState> {
        self.get_column_defs()
            .iter()
            .enumerate()
            .map(|(index, def)| ColumnState {
                col_id: def.effective_id(index),
                width: def.width,
                hide: def.hide,
                pinned: def.pinned,
            })
            .collect()
    }

    /// Apply a previously captured column state. Entries naming unknown
    /// columns are ignored.
    pub fn apply_column_state(&self, states: &[ColumnState]) {
        let mut inner = self.inner.write();
        for state in states {
            let found = inner
                .column_defs
                .iter()
                .enumerate()
                .position(|(i, c)| c.effective_id(i) == state.col_id);
            if let Some(index) = found {
                let def = &mut inner.column_defs[index];
                def.width = state.width.or(def.width);
                def.hide = state.hide;
                def.pinned = state.pinned;
            }
        }
    }

    // ---- pagination ------------------------------------------------

    fn pagination_state(&self, inner: &GridInner) -> PaginationState {
        PaginationState {
            enabled: self.opts.pagination,
            page: inner.page,
            page_size: self.opts.page_size,
        }
    }

    pub fn current_page(&self) -> usize {
        self.inner.read().page
    }

    pub fn total_pages(&self) -> usize {
        let inner = self.inner.read();
        let count = match inner.row_model_type {
            RowModelType::ClientSide => compute_all_nodes(&inner, &self.opts).len(),
            _ => {
                let total = inner.cache.total_count();
                if total >= 0 {
                    total as usize
                } else {
                    inner.cache.stored_row_count()
                }
            }
        };
        self.pagination_state(&inner).total_pages(count)
    }

    /// Jump to a page, clamped to the valid range.
    pub fn set_page(&self, page: usize) {
        let pages = self.total_pages();
        let mut inner = self.inner.write();
        inner.page = page.min(pages - 1);
    }

    pub fn next_page(&self) {
        let page = self.current_page();
        self.set_page(page + 1);
    }

    pub fn previous_page(&self) {
        let page = self.current_page();
        self.set_page(page.saturating_sub(1));
    }

    // ---- datasources -----------------------------------------------

    /// Install a server-side datasource and reload from scratch. The
    /// selection is cleared, since row identity belongs to the new
    /// source.
    pub fn set_server_side_datasource(&self, datasource: Arc<dyn ServerSideDatasource>) {
        self.install_datasource(
            DatasourceHandle::ServerSide(datasource),
            RowModelType::ServerSide,
        );
    }

    /// Install an infinite-scroll datasource and reload from scratch.
    pub fn set_datasource(&self, datasource: Arc<dyn InfiniteDatasource>) {
        self.install_datasource(DatasourceHandle::Infinite(datasource), RowModelType::Infinite);
    }

    fn install_datasource(&self, handle: DatasourceHandle, row_model_type: RowModelType) {
        let had_selection = {
            let mut inner = self.inner.write();
            inner.datasource = Some(handle);
            inner.row_model_type = row_model_type;
            inner.page = 0;
            inner.cache.invalidate();
            let had = !inner.selected_ids.is_empty();
            inner.selected_ids.clear();
            had
        };
        if had_selection {
            self.publish_selection_changed();
        }
        self.schedule_reload();
    }

    /// Drop cached server-side blocks and refetch. `purge` also blanks
    /// the store immediately; without it the semantics are currently the
    /// same, since the cache always reloads from row zero.
    pub fn refresh_server_side(&self, _purge: bool) -> Result<(), GridError> {
        self.refresh_remote(RowModelType::ServerSide)
    }

    /// Refetch all infinite-scroll blocks.
    pub fn refresh_infinite_cache(&self) -> Result<(), GridError> {
        self.refresh_remote(RowModelType::Infinite)
    }

    /// Drop all infinite-scroll blocks and refetch from row zero.
    pub fn purge_infinite_cache(&self) -> Result<(), GridError> {
        self.refresh_remote(RowModelType::Infinite)
    }

    fn refresh_remote(&self, required: RowModelType) -> Result<(), GridError> {
        {
            let mut inner = self.inner.write();
            if inner.row_model_type != required {
                return Err(GridError::WrongRowModel(required));
            }
            if inner.datasource.is_none() {
                return Err(GridError::NoDatasource);
            }
            inner.cache.invalidate();
        }
        self.schedule_reload();
        Ok(())
    }

    /// True while any block fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.inner.read().cache.is_loading()
    }

    /// Make sure the block containing `row` is loaded or loading,
    /// fetching it in the background. Used by renderers as rows scroll
    /// into view.
    pub fn ensure_row_loaded(&self, row: usize) {
        let grid = self.clone();
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime; block fetch not scheduled");
            return;
        };
        handle.spawn(async move {
            match grid.load_block(row).await {
                Ok(_) => {}
                Err(error) => warn!(%error, row, "block fetch failed"),
            }
        });
    }

    /// Load the block containing `row` through the current datasource.
    ///
    /// Returns `Ok(false)` when nothing was fetched, either because the
    /// block is already loaded or in flight, or because the response
    /// arrived for a superseded generation and was discarded. `Ok(true)`
    /// means new rows landed in the cache.
    pub async fn load_block(&self, row: usize) -> Result<bool, GridError> {
        let (fetch, handle, sort_model, filter_model) = {
            let mut inner = self.inner.write();
            let Some(handle) = inner.datasource.clone() else {
                return Err(GridError::NoDatasource);
            };
            let Some(fetch) = inner.cache.begin_load(row) else {
                return Ok(false);
            };
            (
                fetch,
                handle,
                inner.sort_model.clone(),
                inner.filter_model.clone(),
            )
        };

        match handle
            .fetch(fetch.start_row, fetch.end_row, sort_model, filter_model)
            .await
        {
            Ok((rows, total)) => {
                let (applied, displayed) = {
                    let mut inner = self.inner.write();
                    let applied = inner.cache.complete_success(&fetch, rows, total);
                    (applied, inner.cache.stored_row_count())
                };
                if applied {
                    self.events
                        .publish(&GridEvent::ModelUpdated { displayed_rows: displayed });
                }
                Ok(applied)
            }
            Err(error) => {
                self.inner.write().cache.complete_failure(&fetch);
                Err(GridError::Datasource(error.to_string()))
            }
        }
    }

    fn invalidate_if_remote(&self, inner: &mut GridInner) {
        if inner.row_model_type != RowModelType::ClientSide {
            inner.cache.invalidate();
        }
    }

    fn schedule_reload_if_remote(&self) {
        let remote = {
            let inner = self.inner.read();
            inner.row_model_type != RowModelType::ClientSide && inner.datasource.is_some()
        };
        if remote {
            self.schedule_reload();
        }
    }

    /// Schedule a fetch of block zero after the configured debounce. The
    /// generation is captured up front; if another change lands during
    /// the debounce window, this task yields to the newer one.
    fn schedule_reload(&self) {
        let (generation, debounce) = {
            let inner = self.inner.read();
            (inner.cache.generation(), inner.cache.config().debounce)
        };
        let grid = self.clone();
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime; block fetch not scheduled");
            return;
        };
        handle.spawn(async move {
            if !debounce.is_zero() {
                tokio::time::sleep(debounce).await;
            }
            if grid.inner.read().cache.generation() != generation {
                return;
            }
            match grid.load_block(0).await {
                Ok(_) => {}
                Err(error) => warn!(%error, "initial block fetch failed"),
            }
        });
    }

    // ---- export and state ------------------------------------------

    /// CSV of the current (post-filter, pre-pagination) row set over the
    /// visible columns.
    pub fn export_data_as_csv(&self) -> String {
        let (columns, nodes) = {
            let inner = self.inner.read();
            (
                merged_columns(&inner, &self.opts),
                compute_all_nodes(&inner, &self.opts),
            )
        };
        export_csv(&columns, &nodes)
    }

    /// Snapshot of the user-mutable state, for persistence.
    pub fn get_state(&self) -> GridState {
        GridState {
            filter: Some(self.get_filter_model()),
            sort: Some(self.get_sort_model()),
            column_state: Some(self.get_column_state()),
        }
    }

    /// Restore a previously captured snapshot.
    pub fn apply_state(&self, state: &GridState) {
        if let Some(column_state) = &state.column_state {
            self.apply_column_state(column_state);
        }
        if let Some(sort) = &state.sort {
            self.set_sort_model(sort.clone());
        }
        if let Some(filter) = &state.filter {
            self.set_filter_model(Some(filter.clone()));
        }
    }
}
