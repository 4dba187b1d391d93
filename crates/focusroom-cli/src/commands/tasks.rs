use std::path::PathBuf;

use clap::Subcommand;
use focusroom_core::task::rank;

use super::{print_json, read_tasks};

#[derive(Subcommand)]
pub enum TasksAction {
    /// Print candidates best first, as automatic selection sees them
    Rank {
        /// JSON file with an array of task candidates
        #[arg(long)]
        file: PathBuf,
    },
}

pub fn run(action: TasksAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TasksAction::Rank { file } => {
            let candidates = read_tasks(&file)?;
            print_json(&rank(&candidates))?;
        }
    }
    Ok(())
}
