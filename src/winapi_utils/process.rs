//! Process-related WinAPI wrappers.
//!
//! Provides safe abstractions for retrieving process information:
//! executable base names and full image paths.

use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE, MAX_PATH};
use windows::Win32::System::ProcessStatus::GetModuleBaseNameW;
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
    PROCESS_VM_READ,
};

/// RAII wrapper for Windows process handles.
///
/// Automatically closes the handle when dropped to prevent handle leaks.
struct ProcessHandle(HANDLE);

impl ProcessHandle {
    /// Opens a process with limited query permissions, adding VM read
    /// only when the base name is needed.
    ///
    /// Returns `None` if the process cannot be opened (e.g., access
    /// denied for system processes, or the process has exited).
    fn open(pid: u32, vm_read: bool) -> Option<Self> {
        let mut access = PROCESS_QUERY_LIMITED_INFORMATION;
        if vm_read {
            access |= PROCESS_VM_READ;
        }
        let handle = unsafe { OpenProcess(access, false, pid) };

        match handle {
            Ok(h) if !h.is_invalid() => Some(Self(h)),
            _ => None,
        }
    }

    fn as_raw(&self) -> HANDLE {
        self.0
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

/// Gets the executable name of a process by its process ID.
///
/// Returns `None` if the process cannot be opened or the module name
/// cannot be retrieved.
pub fn get_process_name(pid: u32) -> Option<String> {
    let handle = ProcessHandle::open(pid, true)?;

    let mut buffer: [u16; MAX_PATH as usize] = [0; MAX_PATH as usize];

    let len = unsafe { GetModuleBaseNameW(handle.as_raw(), None, &mut buffer) };

    if len == 0 {
        return None;
    }

    Some(String::from_utf16_lossy(&buffer[..len as usize]))
}

/// Gets the full executable path of a process by its process ID.
///
/// Uses `QueryFullProcessImageNameW`, which works with
/// `PROCESS_QUERY_LIMITED_INFORMATION` alone and therefore reaches
/// more processes than the module-based name lookup.
///
/// Returns `None` if the process cannot be opened or the path cannot
/// be retrieved.
pub fn get_process_path(pid: u32) -> Option<String> {
    let handle = ProcessHandle::open(pid, false)?;

    let mut buffer: [u16; 1024] = [0; 1024];
    let mut len: u32 = buffer.len() as u32;

    unsafe {
        QueryFullProcessImageNameW(
            handle.as_raw(),
            PROCESS_NAME_WIN32,
            PWSTR::from_raw(buffer.as_mut_ptr()),
            &mut len,
        )
        .ok()?;
    }

    if len == 0 {
        return None;
    }

    Some(String::from_utf16_lossy(&buffer[..len as usize]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_current_process_name() {
        let pid = std::process::id();
        let name = get_process_name(pid);

        assert!(name.is_some());
        assert!(!name.unwrap().is_empty());
    }

    #[test]
    fn test_get_current_process_path() {
        let pid = std::process::id();
        let path = get_process_path(pid);

        // Our own image path must resolve and look like a path.
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.contains('\\') || path.contains('/'));
    }

    #[test]
    fn test_get_process_path_invalid_pid() {
        // PID 0 is the System Idle Process and typically inaccessible
        assert!(get_process_path(0).is_none());
        assert!(get_process_name(0).is_none());
    }

    #[test]
    fn test_process_handle_drop() {
        // Just verify we can open and close without leaking
        let pid = std::process::id();
        {
            let _handle = ProcessHandle::open(pid, false);
        }
    }
}
