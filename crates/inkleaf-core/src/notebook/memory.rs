//! In-memory notebook implementation.

use super::{Notebook, NotebookError, NotebookResult, PageRef};
use crate::stroke::Stroke;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A page and its stroke log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub strokes: Vec<Stroke>,
}

impl Page {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            strokes: Vec::new(),
        }
    }
}

/// In-memory notebook for testing and ephemeral use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNotebook {
    pages: Vec<Page>,
    current: usize,
}

impl Default for MemoryNotebook {
    fn default() -> Self {
        Self::with_pages(1)
    }
}

impl MemoryNotebook {
    /// Create a notebook with a single empty page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notebook with `count` empty pages (at least one).
    pub fn with_pages(count: usize) -> Self {
        Self {
            pages: (0..count.max(1)).map(|_| Page::new()).collect(),
            current: 0,
        }
    }

    /// Append an empty page at the end.
    pub fn add_page(&mut self) -> PageRef {
        let page = Page::new();
        let page_ref = PageRef {
            id: page.id.clone(),
            index: self.pages.len(),
        };
        self.pages.push(page);
        page_ref
    }

    /// Reference to the page at `index`.
    pub fn page(&self, index: usize) -> Option<PageRef> {
        self.pages.get(index).map(|page| PageRef {
            id: page.id.clone(),
            index,
        })
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    fn find(&self, page: &PageRef) -> NotebookResult<usize> {
        // The index is a hint; the id is authoritative.
        match self.pages.get(page.index) {
            Some(p) if p.id == page.id => Ok(page.index),
            _ => self
                .pages
                .iter()
                .position(|p| p.id == page.id)
                .ok_or_else(|| NotebookError::PageNotFound(page.id.clone())),
        }
    }

    /// Serialize the notebook to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a notebook from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut notebook: Self = serde_json::from_str(json)?;
        if notebook.pages.is_empty() {
            notebook.pages.push(Page::new());
        }
        notebook.current = notebook.current.min(notebook.pages.len() - 1);
        Ok(notebook)
    }
}

impl Notebook for MemoryNotebook {
    fn current_page(&self) -> Option<PageRef> {
        self.page(self.current)
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn load_strokes(&self, page: &PageRef) -> NotebookResult<Vec<Stroke>> {
        let index = self.find(page)?;
        Ok(self.pages[index].strokes.clone())
    }

    fn store_strokes(&mut self, page: &PageRef, strokes: &[Stroke]) -> NotebookResult<()> {
        let index = self.find(page)?;
        self.pages[index].strokes = strokes.to_vec();
        Ok(())
    }

    fn go_to_next_page(&mut self) -> bool {
        if self.current + 1 < self.pages.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn go_to_previous_page(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    fn clear_strokes(&mut self, page: &PageRef) -> NotebookResult<()> {
        let index = self.find(page)?;
        self.pages[index].strokes.clear();
        Ok(())
    }
}
