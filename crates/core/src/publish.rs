//! Notebook catalog and page publishing.
//!
//! [`NotebookPublisher`] remembers the notebooks and sections it last listed
//! along with the current selection, and posts articles as pages into the
//! selected section.

use crate::article::Article;
use crate::auth::{IdentityProvider, SessionManager};
use crate::graph::{GraphClient, NotebookRef, PageRef, SectionRef};
use crate::page::render_page;
use crate::{ClipperError, Result};

/// Catalog of notebooks and sections plus the current selection.
#[derive(Debug, Clone)]
pub struct NotebookPublisher {
    graph: GraphClient,
    notebooks: Vec<NotebookRef>,
    sections: Vec<SectionRef>,
    selected_notebook: Option<String>,
    selected_section: Option<String>,
}

impl NotebookPublisher {
    pub fn new(graph: GraphClient) -> Self {
        Self { graph, notebooks: Vec::new(), sections: Vec::new(), selected_notebook: None, selected_section: None }
    }

    pub fn notebooks(&self) -> &[NotebookRef] {
        &self.notebooks
    }

    /// Sections of the selected notebook.
    pub fn sections(&self) -> &[SectionRef] {
        &self.sections
    }

    pub fn selected_notebook(&self) -> Option<&str> {
        self.selected_notebook.as_deref()
    }

    pub fn selected_section(&self) -> Option<&str> {
        self.selected_section.as_deref()
    }

    /// Finds a listed notebook by id or, case-insensitively, by name.
    pub fn find_notebook(&self, key: &str) -> Option<&NotebookRef> {
        self.notebooks
            .iter()
            .find(|n| n.id == key)
            .or_else(|| self.notebooks.iter().find(|n| n.display_name.eq_ignore_ascii_case(key)))
    }

    /// Finds a listed section by id or, case-insensitively, by name.
    pub fn find_section(&self, key: &str) -> Option<&SectionRef> {
        self.sections
            .iter()
            .find(|s| s.id == key)
            .or_else(|| self.sections.iter().find(|s| s.display_name.eq_ignore_ascii_case(key)))
    }

    /// Lists notebooks and loads the sections of the selected one.
    ///
    /// The first notebook is selected when nothing is selected or the
    /// selection is no longer listed.
    pub async fn list_notebooks<P: IdentityProvider>(&mut self, session: &mut SessionManager<P>) -> Result<&[NotebookRef]> {
        let token = session.get_access_token().await?;
        self.notebooks = self.graph.list_notebooks(&token).await?;
        tracing::debug!(count = self.notebooks.len(), "loaded notebooks");

        let still_listed = self
            .selected_notebook
            .as_ref()
            .is_some_and(|id| self.notebooks.iter().any(|n| &n.id == id));
        if !still_listed {
            self.selected_notebook = self.notebooks.first().map(|n| n.id.clone());
            self.selected_section = None;
        }

        match self.selected_notebook.clone() {
            Some(notebook_id) => {
                self.list_sections(session, &notebook_id).await?;
            }
            None => self.sections.clear(),
        }

        Ok(&self.notebooks)
    }

    /// Lists a notebook's sections.
    ///
    /// The first section is selected when nothing is selected or the
    /// selection is not in this notebook.
    pub async fn list_sections<P: IdentityProvider>(
        &mut self, session: &mut SessionManager<P>, notebook_id: &str,
    ) -> Result<&[SectionRef]> {
        let token = session.get_access_token().await?;
        self.sections = self.graph.list_sections(&token, notebook_id).await?;
        tracing::debug!(notebook_id, count = self.sections.len(), "loaded sections");

        let still_listed = self
            .selected_section
            .as_ref()
            .is_some_and(|id| self.sections.iter().any(|s| &s.id == id));
        if !still_listed {
            self.selected_section = self.sections.first().map(|s| s.id.clone());
        }

        Ok(&self.sections)
    }

    /// Selects a notebook and loads its sections.
    ///
    /// The previous notebook's sections are dropped first, so a failed
    /// listing leaves the section list empty.
    pub async fn select_notebook<P: IdentityProvider>(
        &mut self, session: &mut SessionManager<P>, notebook_id: &str,
    ) -> Result<()> {
        self.selected_notebook = Some(notebook_id.to_string());
        self.selected_section = None;
        self.sections.clear();
        self.list_sections(session, notebook_id).await?;
        Ok(())
    }

    pub fn select_section(&mut self, section_id: &str) {
        self.selected_section = Some(section_id.to_string());
    }

    /// Empties the catalog and the selection.
    pub fn clear(&mut self) {
        self.notebooks.clear();
        self.sections.clear();
        self.selected_notebook = None;
        self.selected_section = None;
    }

    /// Posts an article as a new page.
    ///
    /// Uses `section_id`, or the selected section. With neither, notebook
    /// discovery runs once more; if that still selects nothing the call fails
    /// with [`ClipperError::NoSectionSelected`] without contacting the page
    /// endpoint. Sign-in errors from that discovery are returned as-is.
    pub async fn publish<P: IdentityProvider>(
        &mut self, session: &mut SessionManager<P>, article: &Article, section_id: Option<&str>,
    ) -> Result<PageRef> {
        let explicit = section_id.filter(|id| !id.is_empty()).map(str::to_string);
        let section_id = match explicit.or_else(|| self.selected_section.clone()) {
            Some(id) => id,
            None => {
                tracing::info!("no section selected, re-running notebook discovery");
                match self.list_notebooks(session).await {
                    Err(e @ (ClipperError::AuthRequired | ClipperError::AuthFailed(_))) => return Err(e),
                    Err(e) => tracing::warn!(error = %e, "notebook discovery failed"),
                    Ok(_) => {}
                }
                self.selected_section.clone().ok_or(ClipperError::NoSectionSelected)?
            }
        };

        let token = session.get_access_token().await?;
        let page = self.graph.create_page(&token, &section_id, &render_page(article)).await?;
        tracing::info!(section_id = %section_id, page_id = ?page.id, "page published");

        Ok(page)
    }
}
