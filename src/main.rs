//! langkeep - command-line front end.
//!
//! Lists candidate windows/processes and runs the monitor against a
//! selected target until Ctrl+C.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use langkeep::monitor::{Monitor, MonitorConfig, MonitoringTarget, StatusSink};
use langkeep::winapi_utils::{get_process_name, get_root_window, list_windows};
use windows::Win32::Foundation::HWND;

#[derive(Parser)]
#[command(name = "langkeep", version, about = "Keeps a target application's keyboard layout on English")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List visible top-level windows (candidates for --title)
    Windows,
    /// List processes owning visible windows (candidates for --pid)
    Processes,
    /// Monitor a target and keep its layout English until Ctrl+C
    Watch(WatchArgs),
}

#[derive(Args)]
struct WatchArgs {
    /// Window mode: first visible window whose title contains this text
    #[arg(long, group = "target")]
    title: Option<String>,

    /// Process mode: windows owned by this process id
    #[arg(long, group = "target")]
    pid: Option<u32>,

    /// Path mode: windows owned by processes running this executable
    #[arg(long, group = "target", value_name = "PATH")]
    exe: Option<String>,

    /// Polling interval in milliseconds
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Emit rate-limited skip diagnostics
    #[arg(long)]
    debug: bool,

    /// Minimum seconds between diagnostics sharing a key
    #[arg(long, default_value_t = 2)]
    debug_interval_secs: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("langkeep=info")),
        )
        .init();

    match Cli::parse().command {
        Command::Windows => print_windows(),
        Command::Processes => print_processes(),
        Command::Watch(args) => watch(args)?,
    }

    Ok(())
}

fn print_windows() {
    let mut seen = std::collections::HashSet::new();
    for entry in list_windows() {
        let line = format!("{} (PID {})", entry.title, entry.pid);
        if seen.insert(line.clone()) {
            println!("{line}");
        }
    }
}

fn print_processes() {
    let mut processes: Vec<(String, u32)> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for entry in list_windows() {
        if !seen.insert(entry.pid) {
            continue;
        }
        let name = get_process_name(entry.pid).unwrap_or_else(|| "Unknown".to_string());
        processes.push((name, entry.pid));
    }

    processes.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));
    for (name, pid) in processes {
        println!("{name} (PID {pid})");
    }
}

/// Turns the watch arguments into a monitoring target, the stand-in
/// for the picker UI this tool does not have.
fn select_target(args: &WatchArgs) -> Result<MonitoringTarget, String> {
    if let Some(needle) = &args.title {
        let needle_lower = needle.to_lowercase();
        let entry = list_windows()
            .into_iter()
            .find(|w| w.title.to_lowercase().contains(&needle_lower))
            .ok_or_else(|| format!("no visible window title contains \"{needle}\""))?;

        let root = get_root_window(HWND(entry.hwnd as *mut core::ffi::c_void))
            .ok_or("could not resolve the window's top-level ancestor")?;

        return Ok(MonitoringTarget::Window {
            root: root.0 as isize,
            pid: entry.pid,
            title: entry.title,
        });
    }

    if let Some(pid) = args.pid {
        let name = get_process_name(pid).ok_or(format!("no accessible process with PID {pid}"))?;
        return Ok(MonitoringTarget::Process { pid, name });
    }

    if let Some(exe) = &args.exe {
        let path = Path::new(exe);
        if !path.exists() {
            return Err(format!("file does not exist: {exe}"));
        }
        if !path.is_file() {
            return Err(format!("not a file: {exe}"));
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| exe.clone());
        return Ok(MonitoringTarget::for_path(exe, &name));
    }

    Err("select a target with --title, --pid or --exe".to_string())
}

fn watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let target = select_target(&args)?;
    println!("target: {}", target.describe());

    let config = MonitorConfig {
        poll_interval: Duration::from_millis(args.interval_ms),
        debug: args.debug,
        debug_min_interval: Duration::from_secs(args.debug_interval_secs),
        ..MonitorConfig::default()
    };

    // Print the status line only when it changes; the sink fires every
    // cycle.
    let last_line = Mutex::new(String::new());
    let sink = StatusSink::new(
        move |update| {
            let mut last = last_line.lock().unwrap_or_else(|e| e.into_inner());
            if *last != update.text {
                let marker = if update.is_english { "EN" } else { "!!" };
                println!("[{marker}] {}", update.text);
                *last = update.text;
            }
        },
        |message| {
            tracing::error!("{message}");
        },
    );

    let monitor = Monitor::new();
    if !monitor.start(target, config, sink) {
        return Err("monitor failed to start".into());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        println!("\nshutting down...");
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    })?;

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    monitor.stop();

    let (langid, is_english) = monitor.layout_snapshot();
    if let Some(langid) = langid {
        println!(
            "last observed layout: {langid:04X} ({})",
            if is_english { "English" } else { "non-English" }
        );
    }

    Ok(())
}
