use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use focusroom_core::{
    Config, Database, Event, NoSound, Session, SessionController, SessionLog, SessionStatus, SystemClock,
};

use super::{print_json, session_sound, task_selection};

const SESSION_KEY: &str = "session";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a focus session
    Start {
        /// Focus length in minutes (1-180); defaults to the configured length
        #[arg(long)]
        minutes: Option<u32>,
        /// JSON file with task candidates
        #[arg(long)]
        tasks: Option<PathBuf>,
        /// Use the first task as given instead of ranking
        #[arg(long)]
        manual: bool,
        /// Sound category to record for the session
        #[arg(long)]
        sound: Option<String>,
    },
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// End the session now and report it as completed
    End,
    /// Cancel the session and report it as not completed
    Cancel,
    /// Print current session state as JSON
    Status,
    /// Clear a finished or cancelled session
    Reset,
}

fn load_session(db: &Database) -> Option<Session> {
    if let Ok(Some(json)) = db.kv_get(SESSION_KEY) {
        if let Ok(session) = serde_json::from_str::<Session>(&json) {
            return Some(session);
        }
    }
    None
}

fn save_session(db: &Database, ctl: &SessionController) -> Result<(), Box<dyn std::error::Error>> {
    match ctl.session() {
        Some(session) => db.kv_set(SESSION_KEY, &serde_json::to_string(session)?)?,
        None => db.kv_delete(SESSION_KEY)?,
    }
    Ok(())
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let log = SessionLog::new(&db, config.session.min_recorded_minutes);

    // Sound is not driven between invocations.
    let mut ctl = SessionController::new(Arc::new(SystemClock), Arc::new(NoSound));
    if let Some(session) = load_session(&db) {
        // Catch up on the time since the last invocation; a session that
        // ran out in the meantime is reported right away.
        if let Some(event) = ctl.restore(session) {
            tracing::debug!(?event, "restored session");
        }
        if ctl.status() == SessionStatus::Completing {
            if let Some(event) = ctl.report(&log) {
                print_json(&event)?;
            }
        }
    }

    match action {
        SessionAction::Start {
            minutes,
            tasks,
            manual,
            sound,
        } => {
            let minutes = minutes.unwrap_or(config.session.default_minutes);
            let selection = task_selection(&config, tasks.as_deref(), manual)?;
            ctl.set_sound(session_sound(&config, sound.as_deref())?);
            let event = ctl.start(minutes, &selection)?;
            print_json(&event)?;
        }
        SessionAction::Pause => {
            let event = ctl.pause();
            print_or_snapshot(&ctl, event)?;
        }
        SessionAction::Resume => {
            let event = ctl.resume();
            print_or_snapshot(&ctl, event)?;
        }
        SessionAction::End => {
            let event = ctl.user_end();
            finish(&mut ctl, &log, event)?;
        }
        SessionAction::Cancel => {
            let event = ctl.user_cancel();
            finish(&mut ctl, &log, event)?;
        }
        SessionAction::Status => {
            ctl.tick();
            print_json(&ctl.snapshot())?;
        }
        SessionAction::Reset => {
            let event = ctl.reset();
            print_or_snapshot(&ctl, event)?;
        }
    }

    save_session(&db, &ctl)?;
    Ok(())
}

fn print_or_snapshot(
    ctl: &SessionController,
    event: Option<Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    match event {
        Some(event) => print_json(&event),
        None => print_json(&ctl.snapshot()),
    }
}

/// Print the end-of-session event and report the result right away.
fn finish(
    ctl: &mut SessionController,
    log: &SessionLog<'_>,
    event: Option<Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(event) = event else {
        return print_json(&ctl.snapshot());
    };
    print_json(&event)?;
    if let Some(report) = ctl.report(log) {
        print_json(&report)?;
    }
    Ok(())
}
