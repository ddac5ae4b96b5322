use rusqlite::{Connection, Result};

/// Initialise the study-service tables. Idempotent; runs on every startup.
/// `study_progress` is shared with the progress engine, which carries an
/// identical idempotent definition.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS flashcards (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id       TEXT NOT NULL,
            subject       TEXT NOT NULL,
            front         TEXT NOT NULL,
            back          TEXT NOT NULL,
            review_count  INTEGER NOT NULL DEFAULT 0,
            last_reviewed TEXT,
            created_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_flashcards_user
            ON flashcards (user_id, subject);

        CREATE TABLE IF NOT EXISTS study_progress (
            user_id         TEXT NOT NULL,
            subject         TEXT NOT NULL,
            topic           TEXT NOT NULL,
            correct_answers INTEGER NOT NULL DEFAULT 0,
            total_attempts  INTEGER NOT NULL DEFAULT 0,
            last_study_time TEXT,
            PRIMARY KEY (user_id, subject, topic)
        );

        CREATE TABLE IF NOT EXISTS study_schedule (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id          TEXT NOT NULL,
            subject          TEXT NOT NULL,
            start_date       TEXT NOT NULL,
            end_date         TEXT NOT NULL,
            daily_topics     TEXT NOT NULL,             -- JSON array
            completed_topics TEXT NOT NULL DEFAULT '[]', -- JSON array
            created_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS study_tip_categories (
            id   INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS study_tips (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER NOT NULL REFERENCES study_tip_categories(id),
            tip         TEXT NOT NULL
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
    }
}
