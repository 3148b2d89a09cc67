//! Core monitoring logic.
//!
//! This module contains the target resolver, layout classification,
//! and the polling loop that keeps the target's layout English.

pub mod diag;
pub mod poller;
pub mod state;
pub mod target;

pub use diag::*;
pub use poller::*;
pub use state::*;
pub use target::*;
