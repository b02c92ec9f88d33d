//! Host command handlers
//!
//! This module contains the entry points the host UI calls into.

pub mod recording;
