use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};
use tracing::{error, info};

use crate::config::{EngineConfig, PhysicsConfig};
use crate::payload::{GraphData, IngestReport, collect_graph_data};

mod camera;
mod driver;
mod graph;
mod highlight;
mod interaction;
mod loader;
mod physics;
mod render_utils;
mod scene;
mod ui;

use driver::{DriverCallbacks, GalaxyDriver, LoadMode, NodeClick};

type LoadResult = Result<(GraphData, IngestReport), String>;

/// Settings the binary resolves from the command line before the window opens.
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub payload: PathBuf,
    pub config: EngineConfig,
    pub default_book_id: Option<String>,
    pub highlight_ids: Vec<String>,
    pub progressive: bool,
}

pub struct GalaxyApp {
    options: LaunchOptions,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

/// Messages the engine callbacks hand to the host panels.
enum HostEvent {
    Visible(Vec<String>),
    Clicked(NodeClick),
}

struct ViewModel {
    driver: GalaxyDriver,
    host_rx: Receiver<HostEvent>,
    report: IngestReport,
    load_mode: LoadMode,
    search: String,
    physics: PhysicsConfig,
    pointer_inside: bool,
    label_all: bool,
    scene_error: Option<String>,
    visible_ids: Vec<String>,
    last_click: Option<NodeClick>,
    related_rows_visible: usize,
    drawn_node_count: usize,
    last_frame_time: Option<f64>,
    show_fps_bar: bool,
    fps_show_average: bool,
    fps_show_frame_time: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
}

impl GalaxyApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, options: LaunchOptions) -> Self {
        let state = Self::start_load(options.payload.clone());
        Self {
            options,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(payload: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = collect_graph_data(&payload).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(payload: PathBuf) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(payload),
        }
    }

    fn ready(options: &LaunchOptions, data: GraphData, report: IngestReport) -> AppState {
        let mut model = ViewModel::new(options);
        model.install(data, report);
        AppState::Ready(Box::new(model))
    }
}

impl eframe::App for GalaxyApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok((data, report))) => {
                        transition = Some(Self::ready(&self.options, data, report));
                    }
                    Ok(Err(message)) => {
                        error!(%message, "payload load failed");
                        transition = Some(AppState::Error(message));
                    }
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading knowledge graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the graph payload");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.options.payload.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.options.payload, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.options.payload.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok((data, report))) => model.install(data, report),
                        Ok(Err(message)) => {
                            error!(%message, "payload reload failed");
                            transition = Some(AppState::Error(message));
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}

impl ViewModel {
    fn new(options: &LaunchOptions) -> Self {
        let (tx, host_rx) = mpsc::channel();
        let visible_tx = tx.clone();
        let default_book_id = options.default_book_id.clone();

        let callbacks = DriverCallbacks {
            on_node_visibility_change: Some(Rc::new(move |ids: &[String]| {
                let _ = visible_tx.send(HostEvent::Visible(ids.to_vec()));
            })),
            on_node_click: Some(Rc::new(move |click: &NodeClick| {
                let click = NodeClick {
                    book_id: click.book_id.clone().or_else(|| default_book_id.clone()),
                    ..click.clone()
                };
                let _ = tx.send(HostEvent::Clicked(click));
            })),
        };

        let mut driver = GalaxyDriver::new(options.config, callbacks);
        driver.set_highlight_ids(options.highlight_ids.clone());

        Self {
            physics: driver.physics_config(),
            driver,
            host_rx,
            report: IngestReport::default(),
            load_mode: if options.progressive {
                LoadMode::Progressive
            } else {
                LoadMode::Immediate
            },
            search: String::new(),
            pointer_inside: false,
            label_all: false,
            scene_error: None,
            visible_ids: Vec::new(),
            last_click: None,
            related_rows_visible: Self::INITIAL_RELATED_ROWS,
            drawn_node_count: 0,
            last_frame_time: None,
            show_fps_bar: true,
            fps_show_average: true,
            fps_show_frame_time: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
        }
    }

    fn install(&mut self, data: GraphData, report: IngestReport) {
        info!(
            nodes = data.node_count(),
            links = data.link_count(),
            dropped = report.dropped_links,
            "payload ready"
        );
        self.report = report;
        self.visible_ids.clear();
        self.last_click = None;
        self.related_rows_visible = Self::INITIAL_RELATED_ROWS;
        self.driver.replace_generation(Arc::new(data), self.load_mode);
    }

    fn drain_host_events(&mut self) {
        while let Ok(event) = self.host_rx.try_recv() {
            match event {
                HostEvent::Visible(ids) => {
                    info!(count = ids.len(), "visible node set settled");
                    self.visible_ids = ids;
                }
                HostEvent::Clicked(click) => {
                    info!(id = %click.id, book = ?click.book_id, "node clicked");
                    self.last_click = Some(click);
                    self.related_rows_visible = Self::INITIAL_RELATED_ROWS;
                }
            }
        }
    }
}
