//! The detection-and-correction polling loop.
//!
//! One background thread per [`Monitor`] repeatedly reads the
//! foreground window, decides whether it belongs to the configured
//! target, inspects its keyboard layout, and forces English back when
//! the layout has drifted. Status lines and error notifications flow
//! out through caller-supplied callbacks so the loop never touches a
//! UI thread directly.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use windows::Win32::Foundation::HWND;

use crate::monitor::diag::RateLimitedLog;
use crate::monitor::state::{LayoutState, LayoutTransition};
use crate::monitor::target::{MonitoringTarget, SystemProbe, WinProbe};
use crate::winapi_utils::{
    force_english_layout, get_foreground_window, get_window_text, keyboard_layout_for_window,
    CorrectionOutcome,
};

/// Tunables for a monitoring session.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// How often to poll the foreground window (default: 100ms).
    pub poll_interval: Duration,

    /// Pause after a delivered layout-change request, giving the
    /// target time to apply it before the next read.
    pub settle_delay: Duration,

    /// Timeout for the `WM_INPUTLANGCHANGEREQUEST` send.
    pub message_timeout_ms: u32,

    /// Whether rate-limited skip diagnostics are emitted.
    pub debug: bool,

    /// Minimum spacing between diagnostics sharing a key.
    pub debug_min_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            settle_delay: Duration::from_millis(100),
            message_timeout_ms: 200,
            debug: false,
            debug_min_interval: Duration::from_secs(2),
        }
    }
}

/// One published cycle result.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    /// Mode-aware human-readable status line.
    pub text: String,
    /// Whether the target's last observed layout is English. Stays
    /// `false` until the target has been seen in the foreground.
    pub is_english: bool,
}

/// Thread-safe delivery of status lines and error notifications.
///
/// Both callbacks are invoked from the polling thread; a UI adapter
/// should marshal them onto its own event queue.
pub struct StatusSink {
    on_status: Box<dyn Fn(StatusUpdate) + Send + Sync>,
    on_error: Box<dyn Fn(String) + Send + Sync>,
}

impl StatusSink {
    pub fn new(
        on_status: impl Fn(StatusUpdate) + Send + Sync + 'static,
        on_error: impl Fn(String) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_status: Box::new(on_status),
            on_error: Box::new(on_error),
        }
    }

    /// A sink that drops everything.
    pub fn noop() -> Self {
        Self::new(|_| {}, |_| {})
    }
}

/// A monitoring session: the running flag, the shared layout state,
/// and the single background polling thread.
///
/// At most one polling thread is live per `Monitor`; `start` while
/// running is a warning no-op and `stop` joins the thread, so
/// stop-then-start can never leak a duplicate.
pub struct Monitor {
    running: Arc<AtomicBool>,
    state: Arc<Mutex<LayoutState>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(LayoutState::default())),
            handle: Mutex::new(None),
        }
    }

    /// Starts monitoring `target`. Returns `false` (with a warning)
    /// if a session is already running; the prior session is left
    /// untouched.
    pub fn start(&self, target: MonitoringTarget, config: MonitorConfig, sink: StatusSink) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("monitoring is already running, ignoring start request");
            return false;
        }

        tracing::info!(
            target = %target.describe(),
            interval_ms = config.poll_interval.as_millis(),
            "starting monitor"
        );

        let running = Arc::clone(&self.running);
        let state = Arc::clone(&self.state);
        let thread = thread::spawn(move || run_poll_loop(target, config, sink, running, state));

        *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(thread);
        true
    }

    /// Stops the session and joins the polling thread. The flag is
    /// checked every cycle, so the thread exits within one interval.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            tracing::warn!("no monitoring session is running");
            return;
        }

        if let Some(thread) = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take() {
            if thread.join().is_err() {
                tracing::error!("polling thread panicked during shutdown");
            }
        }
        tracing::info!("monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Last observed layout code and English flag, for status readers.
    pub fn layout_snapshot(&self) -> (Option<u16>, bool) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        (state.last_langid(), state.is_english())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}

/// What a single poll cycle decided before any correction runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleDecision {
    /// No foreground window at all (desktop, lock screen).
    NoForeground,
    /// The foreground window does not belong to the target.
    NotTarget,
    /// The target is in the foreground but its layout could not be
    /// read; nothing is recorded this cycle.
    LayoutUnavailable,
    /// The target is in the foreground and its layout was recorded.
    Observed {
        is_english: bool,
        transition: Option<LayoutTransition>,
    },
}

impl CycleDecision {
    /// Whether the foreground window belonged to the target.
    fn matched(&self) -> bool {
        matches!(self, Self::LayoutUnavailable | Self::Observed { .. })
    }
}

/// Resolves one cycle against the target and records the observation.
///
/// `state` is only touched when the foreground window belongs to the
/// target; a non-matching window can never update the layout state.
fn resolve_cycle(
    target: &MonitoringTarget,
    probe: &dyn SystemProbe,
    foreground: Option<isize>,
    read_layout: impl Fn(isize) -> Option<u16>,
    state: &Mutex<LayoutState>,
) -> CycleDecision {
    let Some(foreground) = foreground else {
        return CycleDecision::NoForeground;
    };

    if !target.matches(foreground, probe) {
        return CycleDecision::NotTarget;
    }

    let Some(langid) = read_layout(foreground) else {
        return CycleDecision::LayoutUnavailable;
    };

    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
    let transition = state.observe(langid);
    CycleDecision::Observed {
        is_english: state.is_english(),
        transition,
    }
}

/// Builds the mode-aware status line for one cycle.
fn status_line(
    target: &MonitoringTarget,
    matched: bool,
    layout_tag: &str,
    foreground_title: &str,
) -> String {
    if matched {
        match target {
            MonitoringTarget::Window { pid, title, .. } => {
                format!("monitoring window PID {pid} | HKL {layout_tag} | {title}")
            }
            MonitoringTarget::Process { name, .. } | MonitoringTarget::Path { name, .. } => {
                format!("monitoring {name} | HKL {layout_tag} | {foreground_title}")
            }
        }
    } else {
        match target {
            MonitoringTarget::Window { title, .. } => {
                format!("waiting for target window: {title}")
            }
            MonitoringTarget::Process { name, .. } => format!("waiting for {name} window"),
            MonitoringTarget::Path { name, .. } => {
                format!("waiting for {name} to start")
            }
        }
    }
}

fn run_poll_loop(
    target: MonitoringTarget,
    config: MonitorConfig,
    sink: StatusSink,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<LayoutState>>,
) {
    tracing::info!("polling thread started");

    let probe = WinProbe;
    let mut diag = RateLimitedLog::new(config.debug, config.debug_min_interval);
    let mut correction_notified = false;
    let mut panic_notified = false;

    while running.load(Ordering::SeqCst) {
        let cycle = catch_unwind(AssertUnwindSafe(|| {
            let foreground = get_foreground_window();
            let fg_title = foreground.map(get_window_text).unwrap_or_default();

            poll_cycle(
                &target,
                &probe,
                &config,
                &sink,
                &state,
                &mut diag,
                &mut correction_notified,
                foreground.map(|h| h.0 as isize),
                &fg_title,
                |hwnd| keyboard_layout_for_window(HWND(hwnd as *mut core::ffi::c_void)),
                &mut |hwnd| {
                    force_english_layout(
                        HWND(hwnd as *mut core::ffi::c_void),
                        config.message_timeout_ms,
                    )
                },
            )
        }));

        if cycle.is_err() {
            tracing::error!("poll cycle panicked, continuing");
            if !panic_notified {
                (sink.on_error)("unexpected error while monitoring; see log".to_string());
                panic_notified = true;
            }
        }

        thread::sleep(config.poll_interval);
    }

    tracing::info!("polling thread shutting down");
}

/// Performs a single poll cycle: resolve, inspect, correct, publish.
///
/// The foreground handle, layout read, and corrector come in from the
/// caller; `run_poll_loop` wires the Win32 implementations in.
#[allow(clippy::too_many_arguments)]
fn poll_cycle(
    target: &MonitoringTarget,
    probe: &dyn SystemProbe,
    config: &MonitorConfig,
    sink: &StatusSink,
    state: &Mutex<LayoutState>,
    diag: &mut RateLimitedLog,
    correction_notified: &mut bool,
    foreground: Option<isize>,
    foreground_title: &str,
    read_layout: impl Fn(isize) -> Option<u16>,
    correct: &mut dyn FnMut(isize) -> windows::core::Result<CorrectionOutcome>,
) {
    let decision = resolve_cycle(target, probe, foreground, read_layout, state);

    match decision {
        CycleDecision::NoForeground | CycleDecision::LayoutUnavailable => {}
        CycleDecision::NotTarget => {
            diag.emit("skip_non_target", || {
                format!(
                    "foreground window does not belong to {}, skipping",
                    target.describe()
                )
            });
        }
        CycleDecision::Observed {
            is_english,
            transition,
        } => {
            match transition {
                Some(LayoutTransition::BecameEnglish) => {
                    tracing::info!("layout switched to English");
                    *correction_notified = false;
                }
                Some(LayoutTransition::LeftEnglish) => {
                    tracing::info!("layout left English, forcing it back");
                }
                None => {}
            }

            // A layout observation implies a foreground window.
            if let (false, Some(hwnd)) = (is_english, foreground) {
                match correct(hwnd) {
                    Ok(CorrectionOutcome::Requested) => {
                        diag.emit("correct", || {
                            "requested English via WM_INPUTLANGCHANGEREQUEST".to_string()
                        });
                        thread::sleep(config.settle_delay);
                    }
                    Ok(CorrectionOutcome::Forced) => {
                        diag.emit("correct", || {
                            "forced English via AttachThreadInput".to_string()
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to force English layout, will retry");
                        if !*correction_notified {
                            (sink.on_error)(format!("could not switch layout to English: {e}"));
                            *correction_notified = true;
                        }
                    }
                }
            }
        }
    }

    let (layout_tag, is_english) = {
        let state = state.lock().unwrap_or_else(|e| e.into_inner());
        (state.layout_tag(), state.is_english())
    };

    (sink.on_status)(StatusUpdate {
        text: status_line(target, decision.matched(), &layout_tag, foreground_title),
        is_english,
    });
}
