//! On-disk fixture databases mirroring the measurement engine's schema.
//!
//! Test support only: the production adapter never writes, so the write
//! path lives here instead of [`crate::store`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use crate::types::RunId;

const SCHEMA: &str = "
CREATE TABLE experiments (
    exp_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    sample_name TEXT,
    start_time REAL,
    end_time REAL
);
CREATE TABLE runs (
    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
    exp_id INTEGER,
    name TEXT,
    result_table_name TEXT,
    result_counter INTEGER,
    run_timestamp REAL,
    completed_timestamp REAL,
    is_completed INTEGER DEFAULT 0
);
CREATE TABLE layouts (
    layout_id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER,
    parameter TEXT,
    label TEXT,
    unit TEXT,
    inferred_from TEXT
);
CREATE TABLE dependencies (
    dependent INTEGER,
    independent INTEGER,
    axis_num INTEGER
);
";

pub struct FixtureParam {
    pub name: String,
    pub label: String,
    pub unit: String,
    pub depends_on: Vec<String>,
}

pub fn indep(name: &str) -> FixtureParam {
    FixtureParam {
        name: name.to_string(),
        label: String::new(),
        unit: String::new(),
        depends_on: vec![],
    }
}

pub fn indep_with(name: &str, label: &str, unit: &str) -> FixtureParam {
    FixtureParam {
        name: name.to_string(),
        label: label.to_string(),
        unit: unit.to_string(),
        depends_on: vec![],
    }
}

pub fn dep(name: &str, depends_on: &[&str]) -> FixtureParam {
    FixtureParam {
        name: name.to_string(),
        label: String::new(),
        unit: String::new(),
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
    }
}

/// Writable stand-in for the measurement engine.
pub struct FixtureDb {
    conn: Connection,
    path: PathBuf,
    tables: HashMap<RunId, (String, Vec<String>)>,
}

impl FixtureDb {
    pub fn create(path: &Path) -> Self {
        let conn = Connection::open(path).expect("open fixture db");
        conn.execute_batch(SCHEMA).expect("create fixture schema");
        Self {
            conn,
            path: path.to_path_buf(),
            tables: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_experiment(&self, name: &str, sample: &str) -> i64 {
        self.conn
            .execute(
                "INSERT INTO experiments (name, sample_name, start_time) VALUES (?1, ?2, ?3)",
                params![name, sample, 0.0_f64],
            )
            .expect("insert experiment");
        self.conn.last_insert_rowid()
    }

    /// Register a run with its parameters and create its result table.
    pub fn start_run(&mut self, exp_id: i64, name: &str, specs: &[FixtureParam]) -> RunId {
        let counter: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) + 1 FROM runs WHERE exp_id = ?1",
                params![exp_id],
                |row| row.get(0),
            )
            .expect("count runs");
        let table = format!("results-{exp_id}-{counter}");
        self.conn
            .execute(
                "INSERT INTO runs (exp_id, name, result_table_name, result_counter, \
                                   run_timestamp, is_completed) \
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                params![exp_id, name, table, counter, 1_700_000_000.0_f64],
            )
            .expect("insert run");
        let run_id = self.conn.last_insert_rowid();

        let mut layout_ids = HashMap::new();
        for spec in specs {
            self.conn
                .execute(
                    "INSERT INTO layouts (run_id, parameter, label, unit) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![run_id, spec.name, spec.label, spec.unit],
                )
                .expect("insert layout");
            layout_ids.insert(spec.name.clone(), self.conn.last_insert_rowid());
        }
        for spec in specs {
            for (axis, ind) in spec.depends_on.iter().enumerate() {
                self.conn
                    .execute(
                        "INSERT INTO dependencies (dependent, independent, axis_num) \
                         VALUES (?1, ?2, ?3)",
                        params![layout_ids[&spec.name], layout_ids[ind], axis as i64],
                    )
                    .expect("insert dependency");
            }
        }

        let columns: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        let column_defs: Vec<String> = columns.iter().map(|c| format!("\"{c}\" REAL")).collect();
        self.conn
            .execute(
                &format!(
                    "CREATE TABLE \"{table}\" (id INTEGER PRIMARY KEY AUTOINCREMENT, {})",
                    column_defs.join(", ")
                ),
                [],
            )
            .expect("create result table");
        self.tables.insert(run_id, (table, columns));
        run_id
    }

    /// Append one measurement tuple; omitted parameters stay NULL.
    pub fn insert_row(&self, run_id: RunId, values: &[(&str, f64)]) {
        let (table, columns) = self.tables.get(&run_id).expect("unknown fixture run");
        let names: Vec<String> = values.iter().map(|(n, _)| format!("\"{n}\"")).collect();
        for (name, _) in values {
            assert!(
                columns.iter().any(|c| c == name),
                "fixture row references unknown parameter {name}"
            );
        }
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO \"{table}\" ({}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        );
        let bound: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
        self.conn
            .execute(&sql, rusqlite::params_from_iter(bound))
            .expect("insert result row");
    }

    pub fn complete_run(&self, run_id: RunId) {
        self.conn
            .execute(
                "UPDATE runs SET is_completed = 1, completed_timestamp = ?1 WHERE run_id = ?2",
                params![1_700_000_100.0_f64, run_id],
            )
            .expect("complete run");
    }

    /// Simulate the engine losing a run's result table (e.g. a truncated
    /// copy of the database).
    pub fn drop_result_table(&self, run_id: RunId) {
        let (table, _) = self.tables.get(&run_id).expect("unknown fixture run");
        self.conn
            .execute(&format!("DROP TABLE \"{table}\""), [])
            .expect("drop result table");
    }
}
