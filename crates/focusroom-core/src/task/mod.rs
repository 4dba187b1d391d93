//! Focused-task selection.
//!
//! A session is "about" at most one task, chosen once at start from a
//! read-only snapshot of candidates and never re-selected mid-session.

pub mod selector;

pub use selector::{rank, select, FocusedTask, PriorityLevel, TaskCandidate, TaskSelection};
