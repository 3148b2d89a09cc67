//! Keyboard-layout WinAPI wrappers.
//!
//! Reads the input layout of a window's owning thread and forces a
//! window over to the English-US layout. Forcing is two-tier: a polite
//! `WM_INPUTLANGCHANGEREQUEST` first, then an attach-based activation
//! for applications that ignore the request. Activating a layout from
//! a foreign thread without attaching is unreliable, which is why the
//! invasive path exists at all.

use once_cell::sync::OnceCell;
use windows::core::{w, Error, Result};
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    ActivateKeyboardLayout, AttachThreadInput, GetKeyboardLayout, LoadKeyboardLayoutW,
    ACTIVATE_KEYBOARD_LAYOUT_FLAGS, HKL, KLF_ACTIVATE, KLF_SETFORPROCESS,
};
use windows::Win32::UI::WindowsAndMessaging::{
    SendMessageTimeoutW, SMTO_ABORTIFHUNG, WM_INPUTLANGCHANGEREQUEST,
};

use super::window::get_window_thread_process_id;

/// Loaded English-US layout handle, cached after the first successful
/// load. Stored as `isize` because raw handles are not `Sync`.
static ENGLISH_HKL: OnceCell<isize> = OnceCell::new();

/// Which tier of the correction strategy succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionOutcome {
    /// The window accepted `WM_INPUTLANGCHANGEREQUEST`. Callers should
    /// allow a short settle delay before re-reading the layout.
    Requested,
    /// The layout was activated via `AttachThreadInput`.
    Forced,
}

/// Reads the 16-bit layout identifier of the window's owning thread.
///
/// The low word of the layout handle is the language identifier
/// (e.g., `0x0409` for English-US). Returns `None` when the handle is
/// null, the thread cannot be resolved, or the layout comes back
/// empty; callers treat that as "skip this cycle".
pub fn keyboard_layout_for_window(hwnd: HWND) -> Option<u16> {
    if hwnd.0.is_null() {
        return None;
    }

    let (thread_id, _) = get_window_thread_process_id(hwnd);
    if thread_id == 0 {
        return None;
    }

    let hkl = unsafe { GetKeyboardLayout(thread_id) };
    if hkl.0.is_null() {
        return None;
    }

    Some((hkl.0 as usize & 0xFFFF) as u16)
}

/// Loads the English-US layout and returns its handle.
///
/// The handle is cached; `LoadKeyboardLayoutW` is only retried while
/// it keeps failing.
fn english_hkl() -> Result<HKL> {
    if let Some(raw) = ENGLISH_HKL.get() {
        return Ok(HKL(*raw as *mut core::ffi::c_void));
    }

    // KLID string for English-US; loading is idempotent if already present.
    let hkl = unsafe { LoadKeyboardLayoutW(w!("00000409"), ACTIVATE_KEYBOARD_LAYOUT_FLAGS(0))? };
    let _ = ENGLISH_HKL.set(hkl.0 as isize);
    Ok(hkl)
}

/// Forces the window's input layout to English-US.
///
/// Tier 1 sends a timed `WM_INPUTLANGCHANGEREQUEST` with
/// abort-if-hung semantics, so an unresponsive target cannot stall
/// the caller. Tier 2 attaches the calling thread's input state to
/// the window's owning thread, activates the layout for that process
/// scope, and detaches again.
///
/// Errors are fit for logging only; the polling loop retries next
/// cycle while the condition persists.
pub fn force_english_layout(hwnd: HWND, timeout_ms: u32) -> Result<CorrectionOutcome> {
    let hkl = english_hkl()?;

    let mut msg_result: usize = 0;
    let sent = unsafe {
        SendMessageTimeoutW(
            hwnd,
            WM_INPUTLANGCHANGEREQUEST,
            WPARAM(0),
            LPARAM(hkl.0 as isize),
            SMTO_ABORTIFHUNG,
            timeout_ms,
            Some(&mut msg_result),
        )
    };
    if sent.0 != 0 {
        return Ok(CorrectionOutcome::Requested);
    }
    tracing::debug!(?hwnd, "WM_INPUTLANGCHANGEREQUEST not delivered, attaching");

    let (target_tid, _) = get_window_thread_process_id(hwnd);
    if target_tid == 0 {
        return Err(Error::from_win32());
    }

    let current_tid = unsafe { GetCurrentThreadId() };
    let attached =
        unsafe { AttachThreadInput(current_tid, target_tid, true) }.as_bool();

    let activated = unsafe { ActivateKeyboardLayout(hkl, KLF_ACTIVATE | KLF_SETFORPROCESS) };
    let outcome = if activated.0.is_null() {
        Err(Error::from_win32())
    } else {
        Ok(CorrectionOutcome::Forced)
    };

    // Detach unconditionally so a failed activation never leaves the
    // input queues glued together.
    if attached {
        let _ = unsafe { AttachThreadInput(current_tid, target_tid, false) };
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_for_null_window_is_none() {
        assert!(keyboard_layout_for_window(HWND(std::ptr::null_mut())).is_none());
    }

    #[test]
    fn test_layout_for_own_thread_window() {
        // Without a real window of our own the best we can do is read
        // the foreground window, tolerating a headless environment.
        if let Some(hwnd) = crate::winapi_utils::get_foreground_window() {
            if let Some(langid) = keyboard_layout_for_window(hwnd) {
                assert_ne!(langid, 0);
            }
        }
    }
}
