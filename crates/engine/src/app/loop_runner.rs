use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::{resolve_app_paths, StartupError};

use super::input::ActionStates;
use super::metrics::LoopMetrics;
use super::scene::SceneHost;
use super::{InputAction, InputSnapshot, Renderer, Scene, SceneCommand, Viewport};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Knight".to_string(),
            window_width: 1024,
            window_height: 768,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: Some(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        assets_dir = %app_paths.assets_dir.display(),
        saves_dir = %app_paths.saves_dir.display(),
        "startup"
    );

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let viewport = Viewport {
        width: config.window_width,
        height: config.window_height,
    };
    let renderer = Renderer::new(Arc::clone(&window), viewport, app_paths.assets_dir.clone())
        .map_err(AppError::CreateRenderer)?;

    let mut host = HostState::new(config, scene, renderer);
    host.scenes.start();
    info!(
        entity_count = host.scenes.world().entity_count(),
        "scene_loaded"
    );
    host.log_config();

    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop
        .run(move |event, target| match event {
            Event::WindowEvent { window_id, event } if window_id == host.renderer.window().id() => {
                host.handle_window_event(event, target);
            }
            Event::AboutToWait => host.renderer.window().request_redraw(),
            Event::LoopExiting => {
                host.scenes.stop();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

struct HostState {
    window_title: String,
    scenes: SceneHost,
    renderer: Renderer,
    input: InputCollector,
    clock: FixedStepClock,
    pacer: RenderPacer,
    metrics: LoopMetrics,
    last_frame: Instant,
    applied_title: Option<String>,
}

impl HostState {
    fn new(config: LoopConfig, scene: Box<dyn Scene>, renderer: Renderer) -> Self {
        let metrics_window = non_zero_or(config.metrics_log_interval, Duration::from_secs(1));
        Self {
            scenes: SceneHost::new(scene),
            renderer,
            input: InputCollector::default(),
            clock: FixedStepClock::new(
                config.target_tps,
                non_zero_or(config.max_frame_delta, Duration::from_millis(250)),
                config.max_ticks_per_frame,
            ),
            pacer: RenderPacer::new(config.max_render_fps),
            metrics: LoopMetrics::new(metrics_window),
            last_frame: Instant::now(),
            applied_title: None,
            window_title: config.window_title,
        }
    }

    fn log_config(&self) {
        info!(
            target_tps = self.clock.target_tps(),
            max_frame_delta_ms = self.clock.max_frame_delta.as_millis() as u64,
            max_ticks_per_frame = self.clock.max_ticks_per_frame,
            render_fps_cap = %self.pacer.describe(),
            "loop_config"
        );
    }

    fn handle_window_event(&mut self, event: WindowEvent, target: &EventLoopWindowTarget<()>) {
        match event {
            // The scene sees the request on its next tick and answers with Quit.
            WindowEvent::CloseRequested => self.input.mark_quit_requested(),
            WindowEvent::Resized(size) => self.resize(size.width, size.height, target),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = self.renderer.window().inner_size();
                self.resize(size.width, size.height, target);
            }
            // Key-up events are lost while unfocused.
            WindowEvent::Focused(false) => self.input.release_all(),
            WindowEvent::KeyboardInput { event, .. } => {
                self.input.handle_physical_key(event.physical_key, event.state);
            }
            WindowEvent::RedrawRequested => self.frame(target),
            _ => {}
        }
    }

    fn resize(&mut self, width: u32, height: u32, target: &EventLoopWindowTarget<()>) {
        if let Err(error) = self.renderer.resize(width, height) {
            warn!(error = %error, "renderer_resize_failed");
            target.exit();
        }
    }

    fn frame(&mut self, target: &EventLoopWindowTarget<()>) {
        let now = Instant::now();
        let frame_dt = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;

        let plan = self.clock.advance(frame_dt);
        let mut ticks_run = 0;
        for _ in 0..plan.ticks_to_run {
            let input = self.input.snapshot_for_tick();
            ticks_run += 1;
            match self.scenes.step(self.clock.fixed_dt_seconds(), &input) {
                SceneCommand::None => {}
                SceneCommand::GameOver => {
                    self.scenes.restart();
                    info!(
                        entity_count = self.scenes.world().entity_count(),
                        "new_game_started"
                    );
                }
                SceneCommand::Quit => {
                    info!(reason = "scene_quit", "shutdown_requested");
                    target.exit();
                    break;
                }
            }
        }
        let clamped = plan.dropped_backlog > Duration::ZERO;
        if clamped {
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame = self.clock.max_ticks_per_frame,
                "sim_clamp_triggered"
            );
        }

        self.pacer.wait_for_slot();
        self.scenes.render();
        if let Err(error) = self
            .renderer
            .render_world(self.scenes.world(), self.scenes.status_bars())
        {
            warn!(error = %error, "renderer_draw_failed");
            target.exit();
        }
        self.pacer.presented();
        self.sync_title();

        self.metrics.frame(frame_dt, ticks_run, clamped);
        if let Some(snapshot) = self.metrics.poll(now) {
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                avg_frame_ms = snapshot.avg_frame_ms,
                worst_frame_ms = snapshot.worst_frame_ms,
                clamped_frames = snapshot.clamped_frames,
                entity_count = self.scenes.world().entity_count(),
                "loop_metrics"
            );
        }
    }

    fn sync_title(&mut self) {
        let title = self.scenes.title();
        if title == self.applied_title {
            return;
        }
        let shown = title.as_deref().unwrap_or(&self.window_title);
        self.renderer.window().set_title(shown);
        self.applied_title = title;
    }
}

/// Samples key state between ticks. Level state lives in `down`; `pressed`
/// holds edges since the last snapshot and is cleared by `snapshot_for_tick`.
#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    down: ActionStates,
    pressed: ActionStates,
}

impl InputCollector {
    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, state: ElementState) {
        let Some(action) = action_for_key(key) else {
            return;
        };
        match state {
            ElementState::Pressed => {
                // OS key repeat arrives as further presses while already down.
                if !self.down.is_down(action) {
                    self.pressed.set(action, true);
                }
                self.down.set(action, true);
            }
            ElementState::Released => self.down.set(action, false),
        }
    }

    fn release_all(&mut self) {
        self.down.clear();
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(self.quit_requested, self.down, self.pressed);
        self.pressed.clear();
        snapshot
    }
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let action = match code {
        KeyCode::KeyW | KeyCode::ArrowUp => InputAction::MoveUp,
        KeyCode::KeyS | KeyCode::ArrowDown => InputAction::MoveDown,
        KeyCode::KeyA | KeyCode::ArrowLeft => InputAction::MoveLeft,
        KeyCode::KeyD | KeyCode::ArrowRight => InputAction::MoveRight,
        KeyCode::Space => InputAction::Attack,
        KeyCode::KeyE => InputAction::Interact,
        KeyCode::KeyI => InputAction::ToggleInventory,
        KeyCode::Escape => InputAction::ToggleMenu,
        KeyCode::KeyP => InputAction::ToggleMusic,
        KeyCode::KeyH => InputAction::UseHealthPotion,
        KeyCode::KeyM => InputAction::UseManaPotion,
        KeyCode::Digit1 => InputAction::AnswerOption1,
        KeyCode::Digit2 => InputAction::AnswerOption2,
        KeyCode::Digit3 => InputAction::AnswerOption3,
        KeyCode::Digit4 => InputAction::AnswerOption4,
        KeyCode::F5 => InputAction::Save,
        KeyCode::F9 => InputAction::Load,
        _ => return None,
    };
    Some(action)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    dropped_backlog: Duration,
}

/// Fixed-timestep accumulator. Frame deltas are capped at `max_frame_delta`
/// and at most `max_ticks_per_frame` ticks run per frame; backlog past the
/// cap is dropped rather than carried.
#[derive(Debug)]
struct FixedStepClock {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    accumulator: Duration,
}

impl FixedStepClock {
    fn new(target_tps: u32, max_frame_delta: Duration, max_ticks_per_frame: u32) -> Self {
        Self {
            fixed_dt: Duration::from_secs_f64(1.0 / target_tps.max(1) as f64),
            max_frame_delta,
            max_ticks_per_frame: max_ticks_per_frame.max(1),
            accumulator: Duration::ZERO,
        }
    }

    fn target_tps(&self) -> u32 {
        (1.0 / self.fixed_dt.as_secs_f64()).round() as u32
    }

    fn fixed_dt_seconds(&self) -> f32 {
        self.fixed_dt.as_secs_f32()
    }

    fn advance(&mut self, frame_dt: Duration) -> StepPlan {
        self.accumulator = self
            .accumulator
            .saturating_add(frame_dt.min(self.max_frame_delta));

        let mut ticks_to_run = 0;
        while self.accumulator >= self.fixed_dt && ticks_to_run < self.max_ticks_per_frame {
            self.accumulator -= self.fixed_dt;
            ticks_to_run += 1;
        }

        let mut dropped_backlog = Duration::ZERO;
        if self.accumulator >= self.fixed_dt {
            dropped_backlog = self.accumulator;
            self.accumulator = Duration::ZERO;
        }
        StepPlan {
            ticks_to_run,
            dropped_backlog,
        }
    }
}

#[derive(Debug)]
struct RenderPacer {
    frame_budget: Option<Duration>,
    last_present: Instant,
}

impl RenderPacer {
    fn new(max_render_fps: Option<u32>) -> Self {
        Self {
            frame_budget: max_render_fps
                .filter(|fps| *fps > 0)
                .map(|fps| Duration::from_secs_f64(1.0 / fps as f64)),
            last_present: Instant::now(),
        }
    }

    fn sleep_needed(&self, since_present: Duration) -> Duration {
        match self.frame_budget {
            Some(budget) => budget.saturating_sub(since_present),
            None => Duration::ZERO,
        }
    }

    fn wait_for_slot(&self) {
        let sleep = self.sleep_needed(self.last_present.elapsed());
        if !sleep.is_zero() {
            thread::sleep(sleep);
        }
    }

    fn presented(&mut self) {
        self.last_present = Instant::now();
    }

    fn describe(&self) -> String {
        match self.frame_budget {
            Some(budget) => format!("{:.0}", 1.0 / budget.as_secs_f64()),
            None => "off".to_string(),
        }
    }
}

fn non_zero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
