// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host side of inbetween: project files, editing sessions and undo history.
//!
//! The engine only plans edits. This crate owns the authoritative timeline, applies the
//! planned batches and records inverse snapshots so every user action can be undone.

pub mod commands;
pub mod history;
pub mod project;
pub mod session;
