//! Dataset shape resolution from parameter metadata.

use gs_store::{ParamRole, ParamSpec, RunMeta};

use crate::{PlotError, PlotResult};

/// Axis roles of a dataset, resolved once per run and pattern-matched by the
/// assembler and the slice engine.
#[derive(Debug, Clone)]
pub enum DatasetShape {
    OneD {
        x: ParamSpec,
        value: ParamSpec,
    },
    TwoD {
        x: ParamSpec,
        y: ParamSpec,
        value: ParamSpec,
    },
}

impl DatasetShape {
    pub fn dimension(&self) -> u8 {
        match self {
            DatasetShape::OneD { .. } => 1,
            DatasetShape::TwoD { .. } => 2,
        }
    }

    pub fn x(&self) -> &ParamSpec {
        match self {
            DatasetShape::OneD { x, .. } | DatasetShape::TwoD { x, .. } => x,
        }
    }

    pub fn y(&self) -> Option<&ParamSpec> {
        match self {
            DatasetShape::OneD { .. } => None,
            DatasetShape::TwoD { y, .. } => Some(y),
        }
    }

    pub fn value(&self) -> &ParamSpec {
        match self {
            DatasetShape::OneD { value, .. } | DatasetShape::TwoD { value, .. } => value,
        }
    }
}

/// Classify a run as 1D or 2D for the given dependent parameter.
///
/// With no selection, the first dependent parameter is used (the UI default
/// when a run records several measured quantities).
pub fn resolve_shape(meta: &RunMeta, selected: Option<&str>) -> PlotResult<DatasetShape> {
    let value = match selected {
        Some(name) => meta.param(name).ok_or_else(|| PlotError::UnknownParameter {
            name: name.to_string(),
        })?,
        None => meta.dependent().next().ok_or(PlotError::NoDependentParameter)?,
    };

    match value.depends_on.len() {
        1 | 2 => {}
        n => {
            return Err(PlotError::UnsupportedShape {
                parameter: value.name.clone(),
                dependency_count: n,
            })
        }
    }

    let mut axes = Vec::with_capacity(value.depends_on.len());
    for dep_name in &value.depends_on {
        let axis = meta
            .param(dep_name)
            .ok_or_else(|| PlotError::SchemaInconsistency {
                message: format!("{} depends on undeclared parameter {}", value.name, dep_name),
            })?;
        if axis.role != ParamRole::Independent {
            return Err(PlotError::SchemaInconsistency {
                message: format!(
                    "{} depends on {}, which is not an independent parameter",
                    value.name, dep_name
                ),
            });
        }
        axes.push(axis.clone());
    }

    Ok(if axes.len() == 1 {
        DatasetShape::OneD {
            x: axes.remove(0),
            value: value.clone(),
        }
    } else {
        let y = axes.remove(1);
        DatasetShape::TwoD {
            x: axes.remove(0),
            y,
            value: value.clone(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, depends_on: &[&str]) -> ParamSpec {
        ParamSpec {
            name: name.to_string(),
            label: String::new(),
            unit: String::new(),
            role: if depends_on.is_empty() {
                ParamRole::Independent
            } else {
                ParamRole::Dependent
            },
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn meta(params: Vec<ParamSpec>) -> RunMeta {
        RunMeta {
            run_id: 1,
            name: "run".to_string(),
            experiment_name: "exp".to_string(),
            sample_name: "sample".to_string(),
            counter: 1,
            result_table: "results-1-1".to_string(),
            started_at: None,
            completed: false,
            params,
        }
    }

    #[test]
    fn one_dependency_resolves_to_1d() {
        let m = meta(vec![param("x", &[]), param("v", &["x"])]);
        let shape = resolve_shape(&m, None).unwrap();
        assert_eq!(shape.dimension(), 1);
        assert_eq!(shape.x().name, "x");
        assert_eq!(shape.value().name, "v");
    }

    #[test]
    fn two_dependencies_resolve_to_2d_in_axis_order() {
        let m = meta(vec![param("x", &[]), param("y", &[]), param("v", &["y", "x"])]);
        let shape = resolve_shape(&m, None).unwrap();
        assert_eq!(shape.dimension(), 2);
        assert_eq!(shape.x().name, "y");
        assert_eq!(shape.y().unwrap().name, "x");
    }

    #[test]
    fn three_dependencies_are_unsupported() {
        let m = meta(vec![
            param("a", &[]),
            param("b", &[]),
            param("c", &[]),
            param("v", &["a", "b", "c"]),
        ]);
        match resolve_shape(&m, None) {
            Err(PlotError::UnsupportedShape {
                dependency_count, ..
            }) => assert_eq!(dependency_count, 3),
            other => panic!("expected UnsupportedShape, got {other:?}"),
        }
    }

    #[test]
    fn zero_dependencies_are_unsupported() {
        // A parameter explicitly selected for plotting but measured against
        // nothing cannot be laid out on an axis.
        let m = meta(vec![param("x", &[]), param("v", &["x"])]);
        match resolve_shape(&m, Some("x")) {
            Err(PlotError::UnsupportedShape {
                dependency_count, ..
            }) => assert_eq!(dependency_count, 0),
            other => panic!("expected UnsupportedShape, got {other:?}"),
        }
    }

    #[test]
    fn undeclared_dependency_is_schema_inconsistency() {
        let mut v = param("v", &["ghost"]);
        v.role = ParamRole::Dependent;
        let m = meta(vec![param("x", &[]), v]);
        assert!(matches!(
            resolve_shape(&m, None),
            Err(PlotError::SchemaInconsistency { .. })
        ));
    }

    #[test]
    fn selection_picks_among_multiple_dependents() {
        let m = meta(vec![
            param("x", &[]),
            param("v1", &["x"]),
            param("v2", &["x"]),
        ]);
        let shape = resolve_shape(&m, Some("v2")).unwrap();
        assert_eq!(shape.value().name, "v2");
        // default is the first dependent parameter
        let default = resolve_shape(&m, None).unwrap();
        assert_eq!(default.value().name, "v1");
    }

    #[test]
    fn run_without_dependents_has_nothing_to_plot() {
        let m = meta(vec![param("x", &[])]);
        assert!(matches!(
            resolve_shape(&m, None),
            Err(PlotError::NoDependentParameter)
        ));
    }
}
