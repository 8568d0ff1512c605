//! Grid event bus
//!
//! The controller publishes a change event only when the underlying
//! model's content actually changed, so subscribers never see redundant
//! notifications from unrelated recomputations.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::column::PinnedSide;
use crate::filter::FilterModel;
use crate::sort::SortModel;

/// Events emitted by the grid controller.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    SortChanged { sort_model: SortModel },
    FilterChanged { filter_model: FilterModel },
    SelectionChanged { selected_ids: Vec<String> },
    /// The displayed row set was rebuilt.
    ModelUpdated { displayed_rows: usize },
    ColumnVisible { col_id: String, visible: bool },
    ColumnPinned { col_id: String, pinned: Option<PinnedSide> },
    ColumnResized { col_id: String, width: u32 },
    ColumnMoved { col_id: String, to_index: usize },
}

type Handler = Box<dyn Fn(&GridEvent) + Send + Sync>;

/// Subscriber registry for grid events.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<Mutex<Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to all grid events.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&GridEvent) + Send + Sync + 'static,
    {
        self.handlers.lock().push(Box::new(handler));
    }

    /// Publish an event to every subscriber.
    pub fn publish(&self, event: &GridEvent) {
        let handlers = self.handlers.lock();
        for handler in handlers.iter() {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delivers_to_all_subscribers() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let count = Arc::clone(&count);
            bus.subscribe(move |event| {
                if matches!(event, GridEvent::ModelUpdated { displayed_rows: 3 }) {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
        bus.publish(&GridEvent::ModelUpdated { displayed_rows: 3 });
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
