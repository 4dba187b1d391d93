use focusroom_core::Database;

use super::print_json;

/// All-time and today's totals in one object.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    print_json(&db.stats()?)
}
