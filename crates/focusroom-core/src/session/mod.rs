//! Focus session countdown and lifecycle.

mod controller;
mod model;
mod report;
mod timekeeper;

pub use controller::{SessionController, MAX_FOCUS_MINUTES, MIN_FOCUS_MINUTES};
pub use model::{CompletionReason, Session, SessionStatus, SessionView};
pub use report::{DiscardReporter, ReportSource, SessionReporter, SessionSummary};
pub use timekeeper::TimeKeeper;
