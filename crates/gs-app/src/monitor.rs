//! Live refresh scheduling.
//!
//! One worker thread owns the pipeline and re-runs it on a timer while live.
//! The worker is sequential, so at most one pipeline invocation is ever in
//! flight; the next tick is scheduled from completion, which skips ticks
//! under a slow store instead of queuing them. Every command bumps a
//! generation counter, results carry the generation they were computed for,
//! and [`LiveMonitor::poll`] drops anything superseded — a stopped schedule
//! or a changed run id can never surface a stale frame.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use gs_store::MeasurementDb;
use tracing::debug;

use crate::error::AppError;
use crate::frame::PlotFrame;
use crate::pipeline::{Pipeline, PlotRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
}

enum Command {
    Start {
        generation: u64,
        request: PlotRequest,
        interval: Duration,
    },
    SetRequest {
        generation: u64,
        request: PlotRequest,
    },
    Once {
        generation: u64,
        request: PlotRequest,
    },
    Stop,
    Shutdown,
}

#[derive(Debug)]
pub enum MonitorEvent {
    Frame {
        generation: u64,
        frame: Box<PlotFrame>,
    },
    Failed {
        generation: u64,
        error: AppError,
    },
}

impl MonitorEvent {
    fn generation(&self) -> u64 {
        match self {
            MonitorEvent::Frame { generation, .. } | MonitorEvent::Failed { generation, .. } => {
                *generation
            }
        }
    }
}

pub struct LiveMonitor {
    commands: Sender<Command>,
    events: Receiver<MonitorEvent>,
    state: MonitorState,
    generation: u64,
    _handle: JoinHandle<()>,
}

impl LiveMonitor {
    pub fn new(db: MeasurementDb) -> Self {
        let (cmd_tx, cmd_rx) = channel();
        let (event_tx, event_rx) = channel();
        let handle = thread::spawn(move || worker_loop(Pipeline::new(db), cmd_rx, event_tx));
        Self {
            commands: cmd_tx,
            events: event_rx,
            state: MonitorState::Idle,
            generation: 0,
            _handle: handle,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Running
    }

    /// Begin (or re-target) live refreshing. Supersedes any in-flight result
    /// of a previous schedule.
    pub fn start(&mut self, request: PlotRequest, interval: Duration) {
        self.generation += 1;
        self.state = MonitorState::Running;
        let _ = self.commands.send(Command::Start {
            generation: self.generation,
            request,
            interval,
        });
    }

    /// Change run, parameter or slice selection while live. The schedule and
    /// interval stay; the next cycle runs immediately.
    pub fn set_request(&mut self, request: PlotRequest) {
        if self.state != MonitorState::Running {
            return;
        }
        self.generation += 1;
        let _ = self.commands.send(Command::SetRequest {
            generation: self.generation,
            request,
        });
    }

    /// Run a single refresh cycle without entering live mode (paused-mode
    /// updates: slice moved, parameter changed). Supersedes earlier results.
    pub fn refresh_once(&mut self, request: PlotRequest) {
        self.generation += 1;
        let _ = self.commands.send(Command::Once {
            generation: self.generation,
            request,
        });
    }

    /// Leave live mode. An in-flight cycle may still complete, but its result
    /// is suppressed at poll time.
    pub fn stop(&mut self) {
        self.generation += 1;
        self.state = MonitorState::Idle;
        let _ = self.commands.send(Command::Stop);
    }

    /// Drain available results, dropping any from superseded generations.
    pub fn poll(&mut self) -> Vec<MonitorEvent> {
        let mut fresh = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if event.generation() == self.generation {
                fresh.push(event);
            } else {
                debug!(
                    stale = event.generation(),
                    current = self.generation,
                    "discarded superseded monitor event"
                );
            }
        }
        fresh
    }
}

impl Drop for LiveMonitor {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

fn worker_loop(
    mut pipeline: Pipeline,
    commands: Receiver<Command>,
    events: Sender<MonitorEvent>,
) {
    let mut active: Option<(u64, PlotRequest, Duration)> = None;
    let mut next_tick = Instant::now();

    loop {
        let command = match &active {
            Some(_) => {
                let timeout = next_tick.saturating_duration_since(Instant::now());
                match commands.recv_timeout(timeout) {
                    Ok(c) => Some(c),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
            None => match commands.recv() {
                Ok(c) => Some(c),
                Err(_) => return,
            },
        };

        match command {
            Some(Command::Start {
                generation,
                request,
                interval,
            }) => {
                active = Some((generation, request, interval));
                next_tick = Instant::now();
            }
            Some(Command::SetRequest {
                generation,
                request,
            }) => {
                if let Some((g, r, _)) = active.as_mut() {
                    *g = generation;
                    *r = request;
                    next_tick = Instant::now();
                }
            }
            Some(Command::Once {
                generation,
                request,
            }) => {
                let event = match pipeline.refresh(&request) {
                    Ok(frame) => MonitorEvent::Frame {
                        generation,
                        frame: Box::new(frame),
                    },
                    Err(error) => MonitorEvent::Failed { generation, error },
                };
                if events.send(event).is_err() {
                    return;
                }
            }
            Some(Command::Stop) => {
                active = None;
            }
            Some(Command::Shutdown) => return,
            None => {}
        }

        if let Some((generation, request, interval)) = active.clone() {
            if Instant::now() >= next_tick {
                let event = match pipeline.refresh(&request) {
                    Ok(frame) => MonitorEvent::Frame {
                        generation,
                        frame: Box::new(frame),
                    },
                    Err(error) => MonitorEvent::Failed { generation, error },
                };
                // schedule from completion, not from the nominal tick
                next_tick = Instant::now() + interval;
                if events.send(event).is_err() {
                    return;
                }
            }
        }
    }
}
