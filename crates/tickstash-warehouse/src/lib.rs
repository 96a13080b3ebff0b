//! # Tickstash Warehouse
//!
//! Document-store layer for tickstash.
//!
//! ## Overview
//!
//! Cached market records are stored as JSON documents grouped into
//! collections inside one logical database namespace. Every store implements
//! [`DocumentStore`], which offers exactly three operations:
//!
//! - **read**: filter, optional single-field sort, optional limit
//! - **upsert**: replace the whole document matched by a filter, or insert it
//! - **collections**: list collection names (plus a derived `count`)
//!
//! Two implementations ship with the crate:
//!
//! | Store | Backing | Use |
//! |-------|---------|-----|
//! | [`Warehouse`] | `DuckDB` file | persistent cache |
//! | [`MemoryStore`] | process memory | tests, throwaway sessions |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tickstash_warehouse::{DocumentStore, Filter, SortSpec, Warehouse, WarehouseConfig};
//!
//! let warehouse = Warehouse::open(WarehouseConfig::new("/tmp/finance.duckdb", "finance"))?;
//! let key = Filter::eq("date", "2025-12-23");
//! warehouse.upsert("stock-AAPL", &key, json!({ "date": "2025-12-23", "close": 272.36 }))?;
//!
//! let newest_first = SortSpec::descending("date");
//! let latest = warehouse.read("stock-AAPL", &Filter::All, Some(&newest_first), Some(100))?;
//! assert_eq!(latest.len(), 1);
//! # Ok::<(), tickstash_warehouse::StoreError>(())
//! ```
//!
//! ## Upsert keys
//!
//! The `DuckDB` table is keyed by `(namespace, collection, doc_key)`. An upsert
//! replaces the row of the first document the filter matches and only mints a
//! new `doc_key` (the filter's [`Filter::match_key`]) when nothing matches.
//!
//! ## Filter pushdown
//!
//! String `Eq` and `Range` predicates are evaluated in SQL through
//! `json_extract_string`; every other predicate is applied to the decoded rows.

pub mod document;
pub mod duckdb;
pub mod memory;
mod migrations;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::ToSql;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use document::{select_documents, Filter, SortOrder, SortSpec};
pub use duckdb::{ConnectionPool, PooledConnection};
pub use memory::MemoryStore;

/// Errors raised by document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error while preparing the database location.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A stored or submitted document is not valid JSON.
    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The store refused the operation.
    #[error("operation rejected: {0}")]
    Rejected(String),

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Keyed JSON document storage.
pub trait DocumentStore: Send + Sync {
    /// Return documents of `collection` matching `filter`, optionally sorted and limited.
    fn read(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&SortSpec>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Replace the document matched by `filter` with `record`, or insert it.
    fn upsert(&self, collection: &str, filter: &Filter, record: Value) -> Result<bool, StoreError>;

    /// Names of collections holding at least one document.
    fn collections(&self) -> Result<Vec<String>, StoreError>;

    fn count(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        Ok(self.read(collection, filter, None, None)?.len())
    }
}

/// Configuration for the `DuckDB`-backed warehouse.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Logical namespace all collections live in.
    pub namespace: String,
    /// Maximum number of idle connections kept around.
    pub max_pool_size: usize,
}

impl WarehouseConfig {
    pub fn new(db_path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            namespace: namespace.into(),
            max_pool_size: 4,
        }
    }
}

/// Persistent [`DocumentStore`] on top of a `DuckDB` file.
#[derive(Clone)]
pub struct Warehouse {
    namespace: String,
    pool: ConnectionPool,
    writes: Arc<Mutex<()>>,
}

impl Warehouse {
    /// Open (and migrate) the warehouse described by `config`.
    pub fn open(config: WarehouseConfig) -> Result<Self, StoreError> {
        if config.namespace.trim().is_empty() {
            return Err(StoreError::Rejected(String::from(
                "warehouse namespace must not be empty",
            )));
        }
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let pool = ConnectionPool::open(config.db_path, config.max_pool_size)?;
        {
            let connection = pool.acquire()?;
            migrations::apply_migrations(&connection)?;
        }
        debug!(db_path = %pool.db_path().display(), "warehouse opened");

        Ok(Self {
            namespace: config.namespace,
            pool,
            writes: Arc::new(Mutex::new(())),
        })
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    /// Rows of `collection` matching `filter`, as `(doc_key, document)` in key order.
    fn load_matching(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let mut sql = String::from(
            "SELECT doc_key, body FROM documents WHERE namespace = ? AND collection = ?",
        );
        let mut bound = vec![self.namespace.clone(), collection.to_owned()];
        push_down(filter, &mut sql, &mut bound);
        sql.push_str(" ORDER BY doc_key");

        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(&sql)?;
        let params = bound.iter().map(|value| value as &dyn ToSql).collect::<Vec<_>>();
        let rows = statement
            .query_map(params.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut matching = Vec::with_capacity(rows.len());
        for (doc_key, body) in rows {
            let document: Value = serde_json::from_str(&body)?;
            if filter.matches(&document) {
                matching.push((doc_key, document));
            }
        }
        Ok(matching)
    }
}

/// Append SQL predicates for the string comparisons in `filter`.
///
/// The SQL result is a superset of what `filter` matches; callers re-check rows.
fn push_down(filter: &Filter, sql: &mut String, bound: &mut Vec<String>) {
    match filter {
        Filter::Eq {
            field,
            value: Value::String(value),
        } if is_plain_path(field) => {
            sql.push_str(" AND json_extract_string(body, CAST(? AS VARCHAR)) = ?");
            bound.push(format!("$.{field}"));
            bound.push(value.clone());
        }
        Filter::Range { field, from, to } if is_plain_path(field) => {
            for (bound_value, operator) in [(from, ">="), (to, "<=")] {
                if let Some(Value::String(limit)) = bound_value {
                    sql.push_str(" AND json_extract_string(body, CAST(? AS VARCHAR)) ");
                    sql.push_str(operator);
                    sql.push_str(" ?");
                    bound.push(format!("$.{field}"));
                    bound.push(limit.clone());
                }
            }
        }
        Filter::And { filters } => {
            for nested in filters {
                push_down(nested, sql, bound);
            }
        }
        _ => {}
    }
}

/// Dotted field path that is safe to use as a JSON path.
fn is_plain_path(field: &str) -> bool {
    !field.is_empty()
        && field.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
        })
}

impl DocumentStore for Warehouse {
    fn read(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&SortSpec>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, StoreError> {
        let documents = self
            .load_matching(collection, filter)?
            .into_iter()
            .map(|(_, document)| document);
        Ok(select_documents(documents, &Filter::All, sort, limit))
    }

    fn upsert(&self, collection: &str, filter: &Filter, record: Value) -> Result<bool, StoreError> {
        if !record.is_object() {
            return Err(StoreError::Rejected(format!(
                "documents must be JSON objects (collection '{collection}')"
            )));
        }

        let body = serde_json::to_string(&record)?;
        let _writes = self.writes.lock().map_err(|_| StoreError::Poisoned)?;
        let doc_key = self
            .load_matching(collection, filter)?
            .into_iter()
            .next()
            .map_or_else(|| filter.match_key(), |(doc_key, _)| doc_key);
        let connection = self.pool.acquire()?;
        let params: [&dyn ToSql; 4] = [&self.namespace, &collection, &doc_key, &body];
        let affected = connection.execute(
            "INSERT OR REPLACE INTO documents \
             (namespace, collection, doc_key, body, updated_at) \
             VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)",
            params.as_slice(),
        )?;
        Ok(affected > 0)
    }

    fn collections(&self) -> Result<Vec<String>, StoreError> {
        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(
            "SELECT DISTINCT collection FROM documents WHERE namespace = ? ORDER BY collection",
        )?;
        let params: [&dyn ToSql; 1] = [&self.namespace];
        let names = statement
            .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn count(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        if *filter != Filter::All {
            return Ok(self.load_matching(collection, filter)?.len());
        }

        let connection = self.pool.acquire()?;
        let params: [&dyn ToSql; 2] = [&self.namespace, &collection];
        let count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM documents WHERE namespace = ? AND collection = ?",
            params.as_slice(),
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
