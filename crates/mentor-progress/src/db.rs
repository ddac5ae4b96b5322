use rusqlite::{Connection, Result};

/// Initialise the progress tables. CREATE IF NOT EXISTS keeps this
/// idempotent — it runs on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_xp (
            user_id      TEXT PRIMARY KEY NOT NULL,
            xp           INTEGER NOT NULL DEFAULT 0,
            level        INTEGER NOT NULL DEFAULT 1,
            last_xp_gain TEXT
        );

        CREATE TABLE IF NOT EXISTS achievement_progress (
            user_id         TEXT NOT NULL,
            achievement_id  TEXT NOT NULL,
            current_count   INTEGER NOT NULL DEFAULT 0,
            completed       INTEGER NOT NULL DEFAULT 0,
            completion_date TEXT,
            PRIMARY KEY (user_id, achievement_id)
        );

        CREATE TABLE IF NOT EXISTS study_dates (
            user_id    TEXT NOT NULL,
            study_date TEXT NOT NULL,
            PRIMARY KEY (user_id, study_date)
        );",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
        conn.execute(
            "INSERT INTO user_xp (user_id, xp, level) VALUES ('1', 10, 1)",
            [],
        )
        .unwrap();
    }
}
