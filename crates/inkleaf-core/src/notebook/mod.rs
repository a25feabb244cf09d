//! Notebook collaborator: page identity, navigation and stroke persistence.
//!
//! The engine owns no page storage. It resolves the current page into a
//! [`PageRef`] once, then reads and writes that page's stroke log through
//! the [`Notebook`] trait.

mod memory;

pub use memory::{MemoryNotebook, Page};

use crate::stroke::Stroke;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Notebook errors.
#[derive(Debug, Error)]
pub enum NotebookError {
    #[error("Page not found: {0}")]
    PageNotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for notebook operations.
pub type NotebookResult<T> = Result<T, NotebookError>;

/// Typed reference to one page of the notebook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    /// Stable page identity.
    pub id: String,
    /// Zero-based position in the notebook.
    pub index: usize,
}

/// Page state owned by the surrounding application.
///
/// Navigation methods return false when there is no page to move to; they
/// never wrap around.
pub trait Notebook {
    /// The page currently shown, if the notebook has any.
    fn current_page(&self) -> Option<PageRef>;

    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Read a page's stroke log.
    fn load_strokes(&self, page: &PageRef) -> NotebookResult<Vec<Stroke>>;

    /// Replace a page's stroke log.
    fn store_strokes(&mut self, page: &PageRef, strokes: &[Stroke]) -> NotebookResult<()>;

    /// Move to the next page.
    fn go_to_next_page(&mut self) -> bool;

    /// Move to the previous page.
    fn go_to_previous_page(&mut self) -> bool;

    /// Remove every stroke of a page.
    fn clear_strokes(&mut self, page: &PageRef) -> NotebookResult<()>;
}
