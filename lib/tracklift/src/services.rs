use std::sync::Arc;

use crate::{AudioFetcher, CatalogResolver};

/// The collaborators a run talks to: one playlist catalog and one fetch tool.
#[derive(Clone)]
pub struct Services {
    catalog: Arc<dyn CatalogResolver>,
    fetcher: Arc<dyn AudioFetcher>,
}

impl Services {
    pub fn catalog(&self) -> &Arc<dyn CatalogResolver> {
        &self.catalog
    }

    pub fn fetcher(&self) -> &Arc<dyn AudioFetcher> {
        &self.fetcher
    }

    /// `(id, name)` of each configured collaborator
    pub fn describe(&self) -> Vec<(&str, &str)> {
        vec![
            (self.catalog.id(), self.catalog.name()),
            (self.fetcher.id(), self.fetcher.name()),
        ]
    }
}

#[derive(Default)]
pub struct ServicesBuilder {
    catalog: Option<Arc<dyn CatalogResolver>>,
    fetcher: Option<Arc<dyn AudioFetcher>>,
}

impl ServicesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(mut self, catalog: impl CatalogResolver + 'static) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    pub fn fetcher(mut self, fetcher: impl AudioFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn build(self) -> Result<Services, &'static str> {
        let catalog = self.catalog.ok_or("a catalog resolver is required")?;
        let fetcher = self.fetcher.ok_or("an audio fetcher is required")?;

        Ok(Services { catalog, fetcher })
    }
}
