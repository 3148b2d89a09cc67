//! langkeep - keeps a chosen application's keyboard layout on English.
//!
//! Watches the foreground window and, whenever it belongs to the
//! configured target and its input layout has drifted away from
//! English, forces the layout back to English-US. Windows-only by
//! design; the switching mechanism is Win32-specific.

pub mod monitor;
pub mod winapi_utils;
