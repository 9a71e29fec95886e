use crate::catalog::{CatalogError, TransactionCatalog};
use crate::conflict::ConflictRule;
use crate::protocol::Protocol;
use std::path::Path;

/// Everything a session needs before the first command.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SimulatorConfig {
    pub protocol: Protocol,
    pub conflict_rule: ConflictRule,
    pub catalog: TransactionCatalog,
}

impl SimulatorConfig {
    pub fn new(protocol: Protocol, conflict_rule: ConflictRule) -> Self {
        Self {
            protocol,
            conflict_rule,
            catalog: TransactionCatalog::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: TransactionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_catalog_file<P: AsRef<Path>>(self, path: P) -> Result<Self, CatalogError> {
        let catalog = TransactionCatalog::from_file(path)?;
        Ok(self.with_catalog(catalog))
    }
}
