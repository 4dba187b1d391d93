use focusroom_core::Database;

use super::print_json;

pub fn run(limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    print_json(&db.recent_results(limit)?)
}
