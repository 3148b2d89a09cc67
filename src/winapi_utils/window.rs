//! Window-related WinAPI wrappers.
//!
//! Provides safe abstractions for foreground-window queries, ancestor
//! resolution, window text retrieval, and top-level window enumeration.

use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetAncestor, GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW,
    GetWindowThreadProcessId, IsWindowVisible, GA_ROOT,
};

/// Gets the handle of the currently focused (foreground) window.
///
/// Returns `None` if no window has focus (e.g., desktop is focused,
/// lock screen, or a window is mid-activation).
pub fn get_foreground_window() -> Option<HWND> {
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.0.is_null() {
        None
    } else {
        Some(hwnd)
    }
}

/// Resolves a window to its top-level ancestor (`GA_ROOT`).
///
/// Child and owned windows normalize to the same root handle, so a
/// dialog or embedded pane of an application compares equal to its
/// main window. Returns `None` for a null handle or an empty lookup.
pub fn get_root_window(hwnd: HWND) -> Option<HWND> {
    if hwnd.0.is_null() {
        return None;
    }
    let root = unsafe { GetAncestor(hwnd, GA_ROOT) };
    if root.0.is_null() {
        None
    } else {
        Some(root)
    }
}

/// Gets the title text of a window.
///
/// Returns an empty string if the window has no title or if the call fails.
/// Handles Unicode window titles correctly.
pub fn get_window_text(hwnd: HWND) -> String {
    unsafe {
        let len = GetWindowTextLengthW(hwnd);
        if len == 0 {
            return String::new();
        }

        let mut buffer: Vec<u16> = vec![0; (len + 1) as usize];

        let copied = GetWindowTextW(hwnd, &mut buffer);
        if copied == 0 {
            return String::new();
        }

        String::from_utf16_lossy(&buffer[..copied as usize])
    }
}

/// Gets the thread ID and process ID of the window's owner.
///
/// # Returns
/// A tuple of `(thread_id, process_id)`. Both will be 0 if the call fails.
pub fn get_window_thread_process_id(hwnd: HWND) -> (u32, u32) {
    let mut process_id: u32 = 0;
    let thread_id = unsafe { GetWindowThreadProcessId(hwnd, Some(&mut process_id)) };
    (thread_id, process_id)
}

/// A visible, titled top-level window as seen during enumeration.
#[derive(Debug, Clone)]
pub struct WindowEntry {
    /// Raw window handle, carried as `isize` so the entry is `Send`.
    pub hwnd: isize,
    pub title: String,
    pub pid: u32,
}

/// Enumerates visible top-level windows that carry a non-empty title.
///
/// Untitled windows (message-only windows, hidden hosts) are skipped.
/// The order is the Z-order reported by `EnumWindows`.
pub fn list_windows() -> Vec<WindowEntry> {
    unsafe extern "system" fn enum_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let entries = unsafe { &mut *(lparam.0 as *mut Vec<WindowEntry>) };
        if unsafe { IsWindowVisible(hwnd) }.as_bool() {
            let title = get_window_text(hwnd);
            if !title.trim().is_empty() {
                let (_, pid) = get_window_thread_process_id(hwnd);
                entries.push(WindowEntry {
                    hwnd: hwnd.0 as isize,
                    title,
                    pid,
                });
            }
        }
        BOOL(1)
    }

    let mut entries: Vec<WindowEntry> = Vec::new();
    let lparam = LPARAM(&mut entries as *mut Vec<WindowEntry> as isize);
    // EnumWindows only errors when the callback stops early; ours never does.
    let _ = unsafe { EnumWindows(Some(enum_proc), lparam) };
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_window_text_empty_on_invalid_handle() {
        let invalid_hwnd = HWND(std::ptr::null_mut());
        let text = get_window_text(invalid_hwnd);
        assert!(text.is_empty());
    }

    #[test]
    fn test_get_window_thread_process_id_on_invalid_handle() {
        let invalid_hwnd = HWND(std::ptr::null_mut());
        let (tid, pid) = get_window_thread_process_id(invalid_hwnd);
        assert_eq!(tid, 0);
        assert_eq!(pid, 0);
    }

    #[test]
    fn test_get_root_window_none_on_null_handle() {
        assert!(get_root_window(HWND(std::ptr::null_mut())).is_none());
    }

    #[test]
    fn test_list_windows_entries_are_titled() {
        // Actual contents depend on the desktop; entries that do come
        // back must carry a title.
        for entry in list_windows() {
            assert!(!entry.title.trim().is_empty());
        }
    }
}
