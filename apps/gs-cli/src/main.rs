use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use gs_app::{
    AppError, AppResult, LiveMonitor, MonitorEvent, Pipeline, PlotRequest, SliceRequest,
};
use gs_plot::{resolve_shape, Grid, SliceAxis};
use gs_store::MeasurementDb;

#[derive(Parser)]
#[command(name = "gs-cli")]
#[command(about = "Gridscope CLI - live viewer for measurement databases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List runs in a measurement database
    Runs {
        /// Path to the measurement SQLite database
        db_path: PathBuf,
    },
    /// Show parameters and resolved plot shape for a run
    Info {
        /// Path to the measurement SQLite database
        db_path: PathBuf,
        /// Run id
        run_id: i64,
    },
    /// Assemble a run's grid once and export it
    Snapshot {
        /// Path to the measurement SQLite database
        db_path: PathBuf,
        /// Run id
        run_id: i64,
        /// Dependent parameter to plot (defaults to the run's first)
        #[arg(short, long)]
        parameter: Option<String>,
        /// Axis to cut a 2D grid along (x or y)
        #[arg(long)]
        slice_axis: Option<String>,
        /// Coordinate value to cut at
        #[arg(long)]
        slice_at: Option<f64>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Emit the whole frame as JSON instead of CSV
        #[arg(long)]
        json: bool,
    },
    /// Poll a run live and print a summary per refresh
    Watch {
        /// Path to the measurement SQLite database
        db_path: PathBuf,
        /// Run id (defaults to the newest run in the database)
        run_id: Option<i64>,
        /// Dependent parameter to plot (defaults to the run's first)
        #[arg(short, long)]
        parameter: Option<String>,
        /// Refresh interval in seconds
        #[arg(long, default_value_t = 3.0)]
        interval: f64,
    },
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Runs { db_path } => cmd_runs(&db_path),
        Commands::Info { db_path, run_id } => cmd_info(&db_path, run_id),
        Commands::Snapshot {
            db_path,
            run_id,
            parameter,
            slice_axis,
            slice_at,
            output,
            json,
        } => cmd_snapshot(
            &db_path, run_id, parameter, slice_axis, slice_at, output, json,
        ),
        Commands::Watch {
            db_path,
            run_id,
            parameter,
            interval,
        } => cmd_watch(&db_path, run_id, parameter, interval),
    }
}

fn cmd_runs(db_path: &Path) -> AppResult<()> {
    let db = MeasurementDb::open(db_path)?;
    let ids = db.run_ids()?;
    if ids.is_empty() {
        println!("No runs in {}", db_path.display());
        return Ok(());
    }

    println!("{:>6}  {:>8}  {:>9}  name", "run", "rows", "status");
    for id in ids {
        let meta = db.fetch_metadata(id)?;
        let rows = db.row_count(&meta)?;
        let status = if meta.completed { "completed" } else { "running" };
        println!("{:>6}  {:>8}  {:>9}  {}", id, rows, status, meta.name);
    }
    Ok(())
}

fn cmd_info(db_path: &Path, run_id: i64) -> AppResult<()> {
    let db = MeasurementDb::open(db_path)?;
    let meta = db.fetch_metadata(run_id)?;

    println!("{}", meta.info_line());
    println!("Parameters:");
    for p in &meta.params {
        if p.depends_on.is_empty() {
            println!("  {} [independent]", p.axis_label());
        } else {
            println!(
                "  {} [dependent on {}]",
                p.axis_label(),
                p.depends_on.join(", ")
            );
        }
    }

    match resolve_shape(&meta, None) {
        Ok(shape) => {
            print!("Shape: {}D, x = {}", shape.dimension(), shape.x().name);
            if let Some(y) = shape.y() {
                print!(", y = {}", y.name);
            }
            println!(", value = {}", shape.value().name);
        }
        Err(e) => println!("Shape: not plottable ({e})"),
    }
    Ok(())
}

fn cmd_snapshot(
    db_path: &Path,
    run_id: i64,
    parameter: Option<String>,
    slice_axis: Option<String>,
    slice_at: Option<f64>,
    output: Option<PathBuf>,
    json: bool,
) -> AppResult<()> {
    let request = PlotRequest {
        run_id,
        parameter,
        slice: parse_slice(slice_axis.as_deref(), slice_at)?,
    };
    let mut pipeline = Pipeline::new(MeasurementDb::open(db_path)?);
    let frame = pipeline.refresh(&request)?;

    let body = if json {
        serde_json::to_string_pretty(&frame)
            .map_err(|e| AppError::InvalidInput(format!("serialization failed: {e}")))?
    } else {
        frame_csv(&frame)
    };

    match output {
        Some(path) => fs::write(path, body)?,
        None => {
            io::stdout().write_all(body.as_bytes())?;
        }
    }
    Ok(())
}

fn cmd_watch(
    db_path: &Path,
    run_id: Option<i64>,
    parameter: Option<String>,
    interval: f64,
) -> AppResult<()> {
    if !interval.is_finite() || interval <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "refresh interval must be positive, got {interval}"
        )));
    }

    let db = MeasurementDb::open(db_path)?;
    let run_id = match run_id {
        Some(id) => id,
        None => db
            .latest_run_id()?
            .ok_or_else(|| AppError::InvalidInput("database has no runs".to_string()))?,
    };

    let mut monitor = LiveMonitor::new(db);
    monitor.start(
        PlotRequest {
            run_id,
            parameter,
            slice: None,
        },
        Duration::from_secs_f64(interval),
    );
    println!("Watching run {run_id} (interval {interval}s, Ctrl-C to stop)");

    loop {
        for event in monitor.poll() {
            match event {
                MonitorEvent::Frame { frame, .. } => {
                    let size = match &frame.grid {
                        Grid::OneD { points } => format!("{} points", points.len()),
                        Grid::TwoD { xs, ys, .. } => format!("{} x {} grid", xs.len(), ys.len()),
                    };
                    println!(
                        "run {}: {} rows, {} ({})",
                        frame.run_id, frame.row_count, size, frame.value_label
                    );
                    if frame.completed {
                        println!("Run {} completed", frame.run_id);
                        monitor.stop();
                        return Ok(());
                    }
                }
                MonitorEvent::Failed { error, .. } => {
                    if error.is_transient() {
                        eprintln!("warning: {error} (retrying)");
                    } else {
                        monitor.stop();
                        return Err(error);
                    }
                }
            }
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn parse_slice(axis: Option<&str>, at: Option<f64>) -> AppResult<Option<SliceRequest>> {
    match (axis, at) {
        (None, None) => Ok(None),
        (Some(axis), Some(target)) => {
            let axis = match axis {
                "x" => SliceAxis::X,
                "y" => SliceAxis::Y,
                other => {
                    return Err(AppError::InvalidInput(format!(
                        "slice axis must be x or y, got {other}"
                    )))
                }
            };
            Ok(Some(SliceRequest { axis, target }))
        }
        _ => Err(AppError::InvalidInput(
            "--slice-axis and --slice-at must be given together".to_string(),
        )),
    }
}

fn frame_csv(frame: &gs_app::PlotFrame) -> String {
    let mut out = String::new();
    if let Some(slice) = &frame.slice {
        out.push_str(&format!("# slice {} = {}\n", slice.axis, slice.at));
        out.push_str("coordinate,value\n");
        for (c, v) in &slice.points {
            out.push_str(&format!("{c},{v}\n"));
        }
        return out;
    }
    match &frame.grid {
        Grid::OneD { points } => {
            out.push_str("x,value\n");
            for (x, v) in points {
                out.push_str(&format!("{x},{v}\n"));
            }
        }
        Grid::TwoD { xs, ys, .. } => {
            out.push_str("x,y,value\n");
            for (ix, x) in xs.iter().enumerate() {
                for (iy, y) in ys.iter().enumerate() {
                    if let Some(v) = frame.grid.cell(ix, iy) {
                        out.push_str(&format!("{x},{y},{v}\n"));
                    }
                }
            }
        }
    }
    out
}
