//! Monitoring targets and foreground-window matching.
//!
//! A target names the one application whose layout is being kept
//! English, in one of three modes: a concrete window (normalized to
//! its top-level ancestor), a process id, or an executable path. The
//! OS lookups behind matching sit behind [`SystemProbe`] so the logic
//! can be exercised without a desktop.

use windows::Win32::Foundation::HWND;

use crate::winapi_utils::{get_process_path, get_root_window, get_window_thread_process_id};

/// OS lookups needed to decide target membership.
///
/// Every method returns `None` on failure; matching treats failure as
/// "does not belong" so an unidentified window is never corrected.
pub trait SystemProbe {
    /// Top-level ancestor of a window.
    fn root_window(&self, hwnd: isize) -> Option<isize>;
    /// Process id owning a window.
    fn window_pid(&self, hwnd: isize) -> Option<u32>;
    /// Full executable path of a process.
    fn process_path(&self, pid: u32) -> Option<String>;
}

/// Production probe backed by `winapi_utils`.
pub struct WinProbe;

impl SystemProbe for WinProbe {
    fn root_window(&self, hwnd: isize) -> Option<isize> {
        get_root_window(HWND(hwnd as *mut core::ffi::c_void)).map(|h| h.0 as isize)
    }

    fn window_pid(&self, hwnd: isize) -> Option<u32> {
        let (_, pid) = get_window_thread_process_id(HWND(hwnd as *mut core::ffi::c_void));
        if pid == 0 {
            None
        } else {
            Some(pid)
        }
    }

    fn process_path(&self, pid: u32) -> Option<String> {
        get_process_path(pid)
    }
}

/// The application being monitored. Exactly one variant at a time;
/// selecting a new target replaces the old one wholesale.
#[derive(Debug, Clone)]
pub enum MonitoringTarget {
    /// A specific window, stored as its top-level ancestor handle.
    Window {
        root: isize,
        pid: u32,
        title: String,
    },
    /// Any window owned by a process id.
    Process { pid: u32, name: String },
    /// Any window owned by a process running the given executable.
    /// `path` is pre-normalized with [`normalize_path`].
    Path { path: String, name: String },
}

impl MonitoringTarget {
    /// Builds a path-mode target, normalizing the stored path once.
    pub fn for_path(path: &str, name: &str) -> Self {
        Self::Path {
            path: normalize_path(path),
            name: name.to_string(),
        }
    }

    /// Decides whether a foreground window belongs to this target.
    ///
    /// Fail-closed: any probe lookup that comes back `None` resolves
    /// to `false`.
    pub fn matches(&self, foreground: isize, probe: &dyn SystemProbe) -> bool {
        match self {
            Self::Window { root, .. } => probe
                .root_window(foreground)
                .is_some_and(|fg_root| fg_root == *root),
            Self::Process { pid, .. } => probe
                .window_pid(foreground)
                .is_some_and(|fg_pid| fg_pid == *pid),
            Self::Path { path, .. } => probe
                .window_pid(foreground)
                .and_then(|fg_pid| probe.process_path(fg_pid))
                .is_some_and(|fg_path| normalize_path(&fg_path) == *path),
        }
    }

    /// Short human-readable description for status lines.
    pub fn describe(&self) -> String {
        match self {
            Self::Window { pid, title, .. } => format!("window \"{title}\" (PID {pid})"),
            Self::Process { pid, name } => format!("{name} (PID {pid})"),
            Self::Path { name, .. } => name.clone(),
        }
    }
}

/// Normalizes an executable path for comparison: lowercased, forward
/// slashes folded to backslashes, trailing separators trimmed.
pub fn normalize_path(path: &str) -> String {
    path.trim()
        .replace('/', "\\")
        .trim_end_matches('\\')
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Probe with scripted answers; anything unscripted fails.
    #[derive(Default)]
    struct FakeProbe {
        roots: HashMap<isize, isize>,
        pids: HashMap<isize, u32>,
        paths: HashMap<u32, String>,
    }

    impl SystemProbe for FakeProbe {
        fn root_window(&self, hwnd: isize) -> Option<isize> {
            self.roots.get(&hwnd).copied()
        }
        fn window_pid(&self, hwnd: isize) -> Option<u32> {
            self.pids.get(&hwnd).copied()
        }
        fn process_path(&self, pid: u32) -> Option<String> {
            self.paths.get(&pid).cloned()
        }
    }

    fn window_target(root: isize) -> MonitoringTarget {
        MonitoringTarget::Window {
            root,
            pid: 42,
            title: "Editor".into(),
        }
    }

    #[test]
    fn test_window_mode_matches_children_of_root() {
        let mut probe = FakeProbe::default();
        probe.roots.insert(100, 100); // the top-level window itself
        probe.roots.insert(101, 100); // a child dialog
        probe.roots.insert(200, 200); // unrelated window

        let target = window_target(100);
        assert!(target.matches(100, &probe));
        assert!(target.matches(101, &probe));
        assert!(!target.matches(200, &probe));
    }

    #[test]
    fn test_process_mode_matches_by_pid() {
        let mut probe = FakeProbe::default();
        probe.pids.insert(100, 42);
        probe.pids.insert(200, 43);

        let target = MonitoringTarget::Process {
            pid: 42,
            name: "editor.exe".into(),
        };
        assert!(target.matches(100, &probe));
        assert!(!target.matches(200, &probe));
    }

    #[test]
    fn test_path_mode_is_case_and_separator_insensitive() {
        let mut probe = FakeProbe::default();
        probe.pids.insert(100, 42);
        probe.paths.insert(42, r"C:\Apps\Foo.EXE".into());

        let target = MonitoringTarget::for_path("c:/apps/foo.exe", "Foo");
        assert!(target.matches(100, &probe));

        let other = MonitoringTarget::for_path(r"c:\apps\bar.exe", "Bar");
        assert!(!other.matches(100, &probe));
    }

    #[test]
    fn test_all_modes_fail_closed_on_lookup_failure() {
        let probe = FakeProbe::default();

        assert!(!window_target(100).matches(100, &probe));
        assert!(!MonitoringTarget::Process {
            pid: 42,
            name: "x".into()
        }
        .matches(100, &probe));
        assert!(!MonitoringTarget::for_path(r"c:\x.exe", "x").matches(100, &probe));
    }

    #[test]
    fn test_path_mode_fails_closed_without_process_path() {
        // PID resolves but the executable path does not.
        let mut probe = FakeProbe::default();
        probe.pids.insert(100, 42);

        let target = MonitoringTarget::for_path(r"c:\apps\foo.exe", "Foo");
        assert!(!target.matches(100, &probe));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(r"C:\Apps\Foo.EXE"), r"c:\apps\foo.exe");
        assert_eq!(normalize_path("c:/apps/foo.exe"), r"c:\apps\foo.exe");
        assert_eq!(normalize_path(" c:/apps/dir/ "), r"c:\apps\dir");
    }
}
