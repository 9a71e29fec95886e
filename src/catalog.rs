use crate::operation::{Operation, OperationParseError};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

pub type ResourceId = String;

/// The five transactions every session starts with.
pub static DEFAULT_CATALOG: Lazy<TransactionCatalog> = Lazy::new(|| {
    let defaults: [(&str, &[&str]); 5] = [
        ("Transaction 1", &["Read x", "Write y"]),
        ("Transaction 2", &["Read y", "Write x"]),
        ("Transaction 3", &["Read z", "Write z"]),
        ("Transaction 4", &["Read x", "Read y", "Write z"]),
        ("Transaction 5", &["Read y", "Read z", "Write x"]),
    ];
    let transactions = defaults
        .iter()
        .map(|(name, ops)| Transaction {
            name: name.to_string(),
            operations: ops
                .iter()
                .filter_map(|op| op.parse().ok())
                .collect(),
        })
        .collect();
    TransactionCatalog { transactions }
});

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse YAML catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Catalog has no transactions")]
    Empty,
    #[error("Duplicate transaction {0}")]
    DuplicateName(String),
    #[error("Transaction {0} has no operations")]
    NoOperations(String),
    #[error("Transaction {name}: {source}")]
    BadOperation {
        name: String,
        source: OperationParseError,
    },
}

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct Transaction {
    pub name: String,
    pub operations: Vec<Operation>,
}

impl Transaction {
    pub fn new(name: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            name: name.into(),
            operations,
        }
    }

    /// Lines of the form `" - Read x"`, as listed in the panes.
    pub fn listing(&self) -> Vec<String> {
        self.operations
            .iter()
            .map(|op| format!(" - {}", op))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    transactions: Vec<TransactionEntry>,
}

#[derive(Debug, Deserialize)]
struct TransactionEntry {
    name: String,
    operations: Vec<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TransactionCatalog {
    transactions: Vec<Transaction>,
}

impl Default for TransactionCatalog {
    fn default() -> Self {
        DEFAULT_CATALOG.clone()
    }
}

impl TransactionCatalog {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(content)?;
        if file.transactions.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        let mut transactions = Vec::with_capacity(file.transactions.len());
        for entry in file.transactions {
            if !seen.insert(entry.name.clone()) {
                return Err(CatalogError::DuplicateName(entry.name));
            }
            if entry.operations.is_empty() {
                return Err(CatalogError::NoOperations(entry.name));
            }
            let operations = entry
                .operations
                .iter()
                .map(|op| op.parse::<Operation>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| CatalogError::BadOperation {
                    name: entry.name.clone(),
                    source,
                })?;
            transactions.push(Transaction::new(entry.name, operations));
        }
        Ok(Self { transactions })
    }

    pub fn get(&self, name: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.name == name)
    }

    /// Accepts the full name or, as a shorthand, its trailing number ("2").
    pub fn resolve(&self, input: &str) -> Option<&Transaction> {
        let input = input.trim();
        self.get(input).or_else(|| {
            self.transactions
                .iter()
                .find(|t| t.name.rsplit(' ').next() == Some(input))
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.transactions.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
