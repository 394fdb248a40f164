//! Read-only access to the measurement SQLite database.
//!
//! Schema (written by the measurement engine, never by us):
//! - `runs` / `experiments`: one row per run, joined for sample/experiment
//!   names and the per-run result table name.
//! - `layouts`: one row per parameter of a run (name, label, unit).
//! - `dependencies`: (dependent, independent, axis_num) layout-id pairs; a
//!   parameter is dependent iff it appears on the `dependent` side.
//! - one result table per run, one REAL column per parameter, NULL where a
//!   value has not been recorded yet; rowid is the write position.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use crate::types::{ParamRole, ParamSpec, RawRow, RowBatch, RunId, RunMeta};
use crate::{StoreError, StoreResult};

const BUSY_TIMEOUT_MS: u64 = 2_000;

pub struct MeasurementDb {
    conn: Connection,
    path: PathBuf,
}

impl MeasurementDb {
    /// Open a measurement database read-only. The writer keeps appending
    /// while runs are live; we take no locks beyond sqlite's read locks.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Greatest run id in the database, or `None` when no runs exist yet.
    pub fn latest_run_id(&self) -> StoreResult<Option<RunId>> {
        let id: Option<RunId> =
            self.conn
                .query_row("SELECT MAX(run_id) FROM runs", [], |row| row.get(0))?;
        Ok(id)
    }

    pub fn run_ids(&self) -> StoreResult<Vec<RunId>> {
        let mut stmt = self.conn.prepare("SELECT run_id FROM runs ORDER BY run_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<RunId>, _>>()?;
        Ok(ids)
    }

    pub fn fetch_metadata(&self, run_id: RunId) -> StoreResult<RunMeta> {
        let head = self
            .conn
            .query_row(
                "SELECT r.name, r.result_table_name, r.result_counter, r.run_timestamp, \
                        r.is_completed, e.name, e.sample_name \
                 FROM runs r JOIN experiments e ON r.exp_id = e.exp_id \
                 WHERE r.run_id = ?1",
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<i64>>(4)?.unwrap_or(0) != 0,
                        row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                        row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                    ))
                },
            )
            .optional()?
            .ok_or(StoreError::RunNotFound { run_id })?;

        let (name, result_table, counter, started_at, completed, experiment_name, sample_name) =
            head;
        let params = self.fetch_params(run_id)?;
        debug!(run_id, params = params.len(), completed, "fetched run metadata");

        Ok(RunMeta {
            run_id,
            name,
            experiment_name,
            sample_name,
            counter,
            result_table,
            started_at,
            completed,
            params,
        })
    }

    /// All rows of the run with write position >= `since_position`, in write
    /// order, one column per parameter. Safe against an actively-writing run.
    pub fn fetch_rows(&self, run_id: RunId, since_position: i64) -> StoreResult<RowBatch> {
        let meta = self.fetch_metadata(run_id)?;
        self.fetch_run_rows(&meta, since_position)
    }

    /// Like [`fetch_rows`](Self::fetch_rows) for callers that already hold
    /// the run's metadata (one metadata query less per refresh tick).
    pub fn fetch_run_rows(&self, meta: &RunMeta, since_position: i64) -> StoreResult<RowBatch> {
        if !self.table_exists(&meta.result_table)? {
            return Err(StoreError::RunNotFound {
                run_id: meta.run_id,
            });
        }

        let columns: Vec<String> = meta.params.iter().map(|p| p.name.clone()).collect();
        if columns.is_empty() {
            return Ok(RowBatch {
                columns,
                rows: Vec::new(),
                next_position: since_position,
            });
        }
        let select_list = columns
            .iter()
            .map(|c| quoted(c))
            .collect::<StoreResult<Vec<_>>>()?
            .join(", ");
        let sql = format!(
            "SELECT rowid, {} FROM {} WHERE rowid >= ?1 ORDER BY rowid",
            select_list,
            quoted(&meta.result_table)?
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = Vec::new();
        let mut query = stmt.query(params![since_position])?;
        while let Some(row) = query.next()? {
            let position: i64 = row.get(0)?;
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(numeric_value(row.get_ref(i + 1)?));
            }
            rows.push(RawRow { position, values });
        }

        let next_position = rows.last().map(|r| r.position + 1).unwrap_or(since_position);
        debug!(
            run_id = meta.run_id,
            since = since_position,
            fetched = rows.len(),
            "fetched result rows"
        );

        Ok(RowBatch {
            columns,
            rows,
            next_position,
        })
    }

    /// Total rows written so far for a run.
    pub fn row_count(&self, meta: &RunMeta) -> StoreResult<i64> {
        if !self.table_exists(&meta.result_table)? {
            return Err(StoreError::RunNotFound {
                run_id: meta.run_id,
            });
        }
        let sql = format!("SELECT COUNT(*) FROM {}", quoted(&meta.result_table)?);
        let count = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    fn table_exists(&self, table: &str) -> StoreResult<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn fetch_params(&self, run_id: RunId) -> StoreResult<Vec<ParamSpec>> {
        let mut stmt = self.conn.prepare(
            "SELECT layout_id, parameter, label, unit FROM layouts \
             WHERE run_id = ?1 ORDER BY layout_id",
        )?;
        let layouts = stmt
            .query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut specs: Vec<ParamSpec> = layouts
            .iter()
            .map(|(_, name, label, unit)| ParamSpec {
                name: name.clone(),
                label: label.clone(),
                unit: unit.clone(),
                role: ParamRole::Independent,
                depends_on: vec![],
            })
            .collect();

        let mut dep_stmt = self.conn.prepare(
            "SELECT d.dependent, d.independent FROM dependencies d \
             JOIN layouts l ON d.dependent = l.layout_id \
             WHERE l.run_id = ?1 ORDER BY d.dependent, d.axis_num",
        )?;
        let deps = dep_stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let name_of = |layout_id: i64| {
            layouts
                .iter()
                .find(|(id, ..)| *id == layout_id)
                .map(|(_, name, ..)| name.clone())
        };

        for (dependent, independent) in deps {
            let dep_name = name_of(dependent).ok_or_else(|| StoreError::Schema {
                message: format!("dependency references unknown layout {dependent}"),
            })?;
            let ind_name = name_of(independent).ok_or_else(|| StoreError::Schema {
                message: format!(
                    "dependency of {dep_name} references layout {independent} outside run {run_id}"
                ),
            })?;
            let spec = specs
                .iter_mut()
                .find(|s| s.name == dep_name)
                .ok_or_else(|| StoreError::Schema {
                    message: format!("layout/parameter mismatch for {dep_name}"),
                })?;
            spec.role = ParamRole::Dependent;
            spec.depends_on.push(ind_name);
        }

        Ok(specs)
    }
}

/// Result tables are named by the engine ("results-3-7"), so identifiers are
/// always double-quoted; anything we cannot quote safely is rejected.
fn quoted(ident: &str) -> StoreResult<String> {
    if ident.contains('"') {
        return Err(StoreError::Schema {
            message: format!("unquotable identifier: {ident}"),
        });
    }
    Ok(format!("\"{ident}\""))
}

/// NULL and non-numeric payloads (the engine can store text or blobs in
/// auxiliary columns) both map to "no value here".
fn numeric_value(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        _ => None,
    }
}
