//! Safe wrappers around Windows API calls.
//!
//! This module provides safe Rust abstractions over unsafe WinAPI
//! functions for window queries, process information, and keyboard
//! layout inspection and switching.

pub mod layout;
pub mod process;
pub mod window;

pub use layout::*;
pub use process::*;
pub use window::*;
