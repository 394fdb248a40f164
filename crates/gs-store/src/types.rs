//! Run and row metadata types.

use serde::{Deserialize, Serialize};

/// Run identifier, issued monotonically by the measurement engine.
pub type RunId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamRole {
    Independent,
    Dependent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub label: String,
    pub unit: String,
    pub role: ParamRole,
    /// Independent parameters this one is measured against, in axis order.
    /// Empty for independent parameters.
    pub depends_on: Vec<String>,
}

impl ParamSpec {
    /// Human-readable axis label: "label (unit)", falling back to the name.
    pub fn axis_label(&self) -> String {
        let base = if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        };
        if self.unit.is_empty() {
            base.clone()
        } else {
            format!("{} ({})", base, self.unit)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: RunId,
    pub name: String,
    pub experiment_name: String,
    pub sample_name: String,
    /// Run counter within its experiment.
    pub counter: i64,
    /// Name of this run's result table in the database.
    pub result_table: String,
    /// Start time as seconds since the Unix epoch, if recorded.
    pub started_at: Option<f64>,
    pub completed: bool,
    pub params: Vec<ParamSpec>,
}

impl RunMeta {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn independent(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params
            .iter()
            .filter(|p| p.role == ParamRole::Independent)
    }

    pub fn dependent(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params
            .iter()
            .filter(|p| p.role == ParamRole::Dependent)
    }

    /// One-line description shown above the plot.
    pub fn info_line(&self) -> String {
        let started = self
            .started_at
            .and_then(|t| chrono::DateTime::from_timestamp(t as i64, 0))
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "{} / {} run {} (started {})",
            self.sample_name, self.experiment_name, self.counter, started
        )
    }
}

/// One measurement tuple in write order. Slots align with the owning
/// [`RowBatch`] columns; `None` where the engine has not recorded a value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRow {
    /// Write position (sqlite rowid, 1-based, strictly increasing).
    pub position: i64,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Cursor for the next incremental fetch: first position not yet seen.
    pub next_position: i64,
}

impl RowBatch {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a later incremental batch. Column sets are immutable per run,
    /// so both batches are expected to share the same columns.
    pub fn append(&mut self, more: RowBatch) {
        debug_assert_eq!(self.columns, more.columns);
        self.rows.extend(more.rows);
        self.next_position = self.next_position.max(more.next_position);
    }
}
