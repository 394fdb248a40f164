use std::path::PathBuf;
use std::time::Duration;

use egui_plot::{Legend, Line, Plot, PlotImage, PlotPoint, PlotPoints, Points};
use gs_app::{LiveMonitor, MonitorEvent, PlotFrame, PlotRequest, SliceRequest};
use gs_plot::{Grid, SliceAxis};
use gs_store::MeasurementDb;

use crate::colormap;

pub struct GridscopeApp {
    db_path_input: String,
    db_path: Option<PathBuf>,
    monitor: Option<LiveMonitor>,
    run_id: i64,
    parameter: Option<String>,
    live: bool,
    interval_s: f64,
    slice_enabled: bool,
    slice_axis: SliceAxis,
    slice_target: f64,
    frame: Option<PlotFrame>,
    status: Option<String>,
    heatmap: Option<Heatmap>,
}

struct Heatmap {
    texture: egui::TextureHandle,
    // plot-space extent of the image (samples sit at cell centers)
    x_edges: (f64, f64),
    y_edges: (f64, f64),
}

impl GridscopeApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            db_path_input: String::new(),
            db_path: None,
            monitor: None,
            run_id: 1,
            parameter: None,
            live: false,
            interval_s: 3.0,
            slice_enabled: false,
            slice_axis: SliceAxis::X,
            slice_target: 0.0,
            frame: None,
            status: None,
            heatmap: None,
        }
    }

    fn request(&self) -> PlotRequest {
        PlotRequest {
            run_id: self.run_id,
            parameter: self.parameter.clone(),
            slice: self.slice_enabled.then_some(SliceRequest {
                axis: self.slice_axis,
                target: self.slice_target,
            }),
        }
    }

    /// Push the current selection to the monitor: live mode (re)schedules,
    /// paused mode refreshes once.
    fn apply_selection(&mut self) {
        let request = self.request();
        let interval = Duration::from_secs_f64(self.interval_s);
        if let Some(monitor) = &mut self.monitor {
            if self.live {
                if monitor.is_running() {
                    monitor.set_request(request);
                } else {
                    monitor.start(request, interval);
                }
            } else {
                if monitor.is_running() {
                    monitor.stop();
                }
                monitor.refresh_once(request);
            }
        }
    }

    fn open_database(&mut self) {
        let path = PathBuf::from(self.db_path_input.trim());
        match MeasurementDb::open(&path) {
            Ok(db) => {
                match db.latest_run_id() {
                    Ok(Some(id)) => self.run_id = id,
                    Ok(None) => self.status = Some("Database has no runs yet".to_string()),
                    Err(e) => self.status = Some(format!("{e}")),
                }
                self.monitor = Some(LiveMonitor::new(db));
                self.db_path = Some(path);
                self.frame = None;
                self.heatmap = None;
                self.parameter = None;
                self.apply_selection();
            }
            Err(e) => self.status = Some(format!("Failed to open database: {e}")),
        }
    }

    fn jump_to_latest_run(&mut self) {
        let Some(path) = &self.db_path else { return };
        // short-lived second handle; the monitor's connection lives on its
        // worker thread
        match MeasurementDb::open(path).and_then(|db| db.latest_run_id()) {
            Ok(Some(id)) => {
                if id != self.run_id {
                    self.run_id = id;
                    self.parameter = None;
                    self.apply_selection();
                }
            }
            Ok(None) => self.status = Some("Database has no runs yet".to_string()),
            Err(e) => self.status = Some(format!("{e}")),
        }
    }

    fn poll_monitor(&mut self, ctx: &egui::Context) {
        let Some(monitor) = &mut self.monitor else {
            return;
        };
        for event in monitor.poll() {
            match event {
                MonitorEvent::Frame { frame, .. } => {
                    self.heatmap = build_heatmap(ctx, &frame.grid);
                    self.frame = Some(*frame);
                    self.status = None;
                }
                MonitorEvent::Failed { error, .. } => {
                    self.status = Some(error.to_string());
                }
            }
        }
    }

    fn controls_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Gridscope");
        ui.separator();

        ui.label("Database:");
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.db_path_input);
            if ui.button("Open").clicked() {
                self.open_database();
            }
        });

        ui.separator();
        let mut changed = false;

        ui.horizontal(|ui| {
            ui.label("Run:");
            changed |= ui
                .add(egui::DragValue::new(&mut self.run_id).range(1..=i64::MAX))
                .changed();
            if ui.button("Latest").clicked() {
                self.jump_to_latest_run();
            }
        });

        let parameters = self
            .frame
            .as_ref()
            .map(|f| f.parameters.clone())
            .unwrap_or_default();
        ui.horizontal(|ui| {
            ui.label("Parameter:");
            egui::ComboBox::from_id_salt("parameter_selector")
                .selected_text(self.parameter.clone().unwrap_or_else(|| "(first)".to_string()))
                .show_ui(ui, |ui| {
                    for name in &parameters {
                        let selected = self.parameter.as_deref() == Some(name);
                        if ui.selectable_label(selected, name).clicked() && !selected {
                            self.parameter = Some(name.clone());
                            changed = true;
                        }
                    }
                });
        });

        ui.separator();

        ui.horizontal(|ui| {
            changed |= ui.checkbox(&mut self.live, "Live refresh").changed();
            if self.live {
                ui.label("every");
                if ui
                    .add(egui::Slider::new(&mut self.interval_s, 0.5..=30.0).suffix(" s"))
                    .changed()
                {
                    // restart the schedule with the new tick interval
                    let request = self.request();
                    if let Some(monitor) = &mut self.monitor {
                        monitor.start(request, Duration::from_secs_f64(self.interval_s));
                    }
                }
            }
        });

        let slice_possible = self
            .frame
            .as_ref()
            .map(|f| f.slice_available)
            .unwrap_or(false);
        ui.add_enabled_ui(slice_possible, |ui| {
            changed |= ui.checkbox(&mut self.slice_enabled, "1D cut").changed();
            if self.slice_enabled {
                ui.horizontal(|ui| {
                    ui.label("along");
                    for axis in [SliceAxis::X, SliceAxis::Y] {
                        if ui
                            .selectable_label(self.slice_axis == axis, axis.to_string())
                            .clicked()
                            && self.slice_axis != axis
                        {
                            self.slice_axis = axis;
                            changed = true;
                        }
                    }
                    ui.label("at");
                    changed |= ui
                        .add(egui::DragValue::new(&mut self.slice_target).speed(0.1))
                        .changed();
                });
            }
        });

        if changed {
            self.apply_selection();
        }

        if let Some(frame) = &self.frame {
            ui.separator();
            ui.label(frame.info.clone());
            ui.label(format!(
                "{} rows, {}",
                frame.row_count,
                if frame.completed { "completed" } else { "running" }
            ));
        }
    }

    fn plot_panel(&mut self, ui: &mut egui::Ui) {
        if let Some(status) = &self.status {
            ui.colored_label(egui::Color32::RED, status);
        }

        // Clone to keep the plot closures free of self borrows.
        let Some(frame) = self.frame.clone() else {
            if self.status.is_none() {
                ui.label("Open a database and pick a run to plot");
            }
            return;
        };

        match &frame.grid {
            Grid::OneD { points } => {
                let line: PlotPoints = points.iter().map(|(x, v)| [*x, *v]).collect();
                let markers: PlotPoints = points.iter().map(|(x, v)| [*x, *v]).collect();
                Plot::new("plot_1d")
                    .legend(Legend::default())
                    .x_axis_label(frame.x_label.clone())
                    .y_axis_label(frame.y_label.clone())
                    .show(ui, |plot_ui| {
                        plot_ui.line(Line::new(line).name(frame.value_label.clone()));
                        plot_ui.points(Points::new(markers).radius(2.5));
                    });
            }
            Grid::TwoD { .. } => {
                let slice = frame.slice.clone();
                let plot_height = if slice.is_some() {
                    ui.available_height() * 0.6
                } else {
                    ui.available_height()
                };
                Plot::new("plot_2d")
                    .x_axis_label(frame.x_label.clone())
                    .y_axis_label(frame.y_label.clone())
                    .height(plot_height)
                    .show(ui, |plot_ui| {
                        if let Some(heatmap) = &self.heatmap {
                            let (x0, x1) = heatmap.x_edges;
                            let (y0, y1) = heatmap.y_edges;
                            let center = PlotPoint::new((x0 + x1) / 2.0, (y0 + y1) / 2.0);
                            let size = egui::vec2((x1 - x0) as f32, (y1 - y0) as f32);
                            plot_ui.image(
                                PlotImage::new(heatmap.texture.id(), center, size)
                                    .name(frame.value_label.clone()),
                            );
                        }
                    });

                if let Some(slice) = slice {
                    ui.separator();
                    ui.label(format!("Cut along {} = {}", slice.axis, slice.at));
                    let line: PlotPoints = slice.points.iter().map(|(c, v)| [*c, *v]).collect();
                    let markers: PlotPoints = slice.points.iter().map(|(c, v)| [*c, *v]).collect();
                    Plot::new("plot_slice")
                        .x_axis_label(match slice.axis {
                            SliceAxis::X => frame.y_label.clone(),
                            SliceAxis::Y => frame.x_label.clone(),
                        })
                        .y_axis_label(frame.value_label.clone())
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new(line).name(frame.value_label.clone()));
                            plot_ui.points(Points::new(markers).radius(2.5));
                        });
                }
            }
        }
    }
}

impl eframe::App for GridscopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_monitor(ctx);

        egui::SidePanel::left("controls")
            .default_width(280.0)
            .show(ctx, |ui| self.controls_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.plot_panel(ui));

        if self.live {
            // keep polling the worker while a schedule is active
            ctx.request_repaint_after(Duration::from_millis(200));
        }
    }
}

/// Render a 2D grid into a nearest-filtered texture; missing cells stay
/// transparent. Returns `None` until the grid has measured cells.
fn build_heatmap(ctx: &egui::Context, grid: &Grid) -> Option<Heatmap> {
    let Grid::TwoD { xs, ys, .. } = grid else {
        return None;
    };
    if xs.is_empty() || ys.is_empty() {
        return None;
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for ix in 0..xs.len() {
        for iy in 0..ys.len() {
            if let Some(v) = grid.cell(ix, iy) {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
    }
    if !lo.is_finite() {
        return None;
    }
    let span = if hi > lo { hi - lo } else { 1.0 };

    let mut image = egui::ColorImage::new([xs.len(), ys.len()], egui::Color32::TRANSPARENT);
    for ix in 0..xs.len() {
        for iy in 0..ys.len() {
            if let Some(v) = grid.cell(ix, iy) {
                // image row 0 is the top of the drawn rect, i.e. max y
                image[(ix, ys.len() - 1 - iy)] =
                    colormap::viridis(((v - lo) / span) as f32);
            }
        }
    }

    let texture = ctx.load_texture("heatmap", image, egui::TextureOptions::NEAREST);
    Some(Heatmap {
        texture,
        x_edges: edges(xs),
        y_edges: edges(ys),
    })
}

/// Outer edges of an axis, half a cell beyond the first/last sample.
fn edges(coords: &[f64]) -> (f64, f64) {
    let n = coords.len();
    if n == 1 {
        return (coords[0] - 0.5, coords[0] + 0.5);
    }
    let first = coords[1] - coords[0];
    let last = coords[n - 1] - coords[n - 2];
    (coords[0] - first / 2.0, coords[n - 1] + last / 2.0)
}
