//! SQLite-backed study services: flashcards, schedules, per-topic accuracy,
//! and study tips. One shared connection, serialized by its mutex.

use std::sync::Mutex;

use chrono::{Duration, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::db;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Flashcard {
    pub id: i64,
    pub subject: String,
    pub front: String,
    pub back: String,
    pub review_count: i64,
}

#[derive(Debug, Clone)]
pub struct Schedule {
    pub id: i64,
    pub subject: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_topics: Vec<String>,
    pub completed_topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicProgress {
    pub subject: String,
    pub topic: String,
    pub correct_answers: i64,
    pub total_attempts: i64,
}

pub struct StudyServices {
    db: Mutex<Connection>,
}

/// Starter tips inserted on first run so `!studytip` has something to say.
const DEFAULT_TIPS: &[(&str, &str)] = &[
    ("memory", "Use spaced repetition — review today, in 3 days, then in a week."),
    ("memory", "Teach the concept to someone else; gaps show up immediately."),
    ("focus", "Study in 25-minute blocks with 5-minute breaks."),
    ("focus", "Keep your phone in another room during practice sessions."),
    ("exam", "Attempt previous years' papers under timed conditions."),
    ("exam", "Start with the questions you know — momentum matters."),
];

impl StudyServices {
    pub fn new(conn: Connection) -> Result<Self> {
        db::init_db(&conn)?;
        let services = Self { db: Mutex::new(conn) };
        services.seed_default_tips()?;
        Ok(services)
    }

    fn seed_default_tips(&self) -> Result<()> {
        let count: i64 = {
            let conn = self.db.lock().unwrap();
            conn.query_row("SELECT COUNT(*) FROM study_tips", [], |r| r.get(0))?
        };
        if count > 0 {
            return Ok(());
        }
        for (category, tip) in DEFAULT_TIPS {
            self.add_tip(category, tip)?;
        }
        Ok(())
    }

    // --- flashcards ---------------------------------------------------------

    pub fn add_flashcard(&self, user_id: u64, subject: &str, front: &str, back: &str) -> Result<i64> {
        let conn = self.db.lock().unwrap();
        conn.execute(
            "INSERT INTO flashcards (user_id, subject, front, back, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![user_id.to_string(), subject, front, back, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Least-reviewed card first, so rotation is automatic.
    pub fn next_flashcard(&self, user_id: u64, subject: Option<&str>) -> Result<Option<Flashcard>> {
        let conn = self.db.lock().unwrap();
        let map = |r: &rusqlite::Row<'_>| {
            Ok(Flashcard {
                id: r.get(0)?,
                subject: r.get(1)?,
                front: r.get(2)?,
                back: r.get(3)?,
                review_count: r.get(4)?,
            })
        };
        let card = match subject {
            Some(subject) => conn
                .query_row(
                    "SELECT id, subject, front, back, review_count FROM flashcards
                     WHERE user_id = ?1 AND subject = ?2
                     ORDER BY review_count ASC, id ASC LIMIT 1",
                    rusqlite::params![user_id.to_string(), subject],
                    map,
                )
                .optional()?,
            None => conn
                .query_row(
                    "SELECT id, subject, front, back, review_count FROM flashcards
                     WHERE user_id = ?1
                     ORDER BY review_count ASC, id ASC LIMIT 1",
                    [user_id.to_string()],
                    map,
                )
                .optional()?,
        };
        Ok(card)
    }

    pub fn record_flashcard_review(&self, card_id: i64) -> Result<()> {
        let conn = self.db.lock().unwrap();
        conn.execute(
            "UPDATE flashcards SET review_count = review_count + 1, last_reviewed = ?1
             WHERE id = ?2",
            rusqlite::params![Utc::now().to_rfc3339(), card_id],
        )?;
        Ok(())
    }

    pub fn flashcard_count(&self, user_id: u64) -> Result<i64> {
        let conn = self.db.lock().unwrap();
        let n = conn.query_row(
            "SELECT COUNT(*) FROM flashcards WHERE user_id = ?1",
            [user_id.to_string()],
            |r| r.get(0),
        )?;
        Ok(n)
    }

    // --- study schedule -----------------------------------------------------

    pub fn create_schedule(
        &self,
        user_id: u64,
        subject: &str,
        days: u32,
        daily_topics: Vec<String>,
    ) -> Result<Schedule> {
        let start = Utc::now().date_naive();
        let end = start + Duration::days(days as i64);
        let topics_json = serde_json::to_string(&daily_topics)
            .map_err(|e| crate::error::StudyError::InvalidJson(e.to_string()))?;

        let conn = self.db.lock().unwrap();
        conn.execute(
            "INSERT INTO study_schedule
                 (user_id, subject, start_date, end_date, daily_topics, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                user_id.to_string(),
                subject,
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string(),
                topics_json,
                Utc::now().to_rfc3339()
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(user_id, subject, days, "study schedule created");

        Ok(Schedule {
            id,
            subject: subject.to_string(),
            start_date: start,
            end_date: end,
            daily_topics,
            completed_topics: Vec::new(),
        })
    }

    /// Schedules whose end date has not passed, oldest first.
    pub fn active_schedules(&self, user_id: u64) -> Result<Vec<Schedule>> {
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let conn = self.db.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, subject, start_date, end_date, daily_topics, completed_topics
             FROM study_schedule
             WHERE user_id = ?1 AND end_date >= ?2
             ORDER BY start_date ASC",
        )?;
        let schedules = stmt
            .query_map(rusqlite::params![user_id.to_string(), today], |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(id, subject, start, end, topics, done)| {
                Some(Schedule {
                    id,
                    subject,
                    start_date: NaiveDate::parse_from_str(&start, "%Y-%m-%d").ok()?,
                    end_date: NaiveDate::parse_from_str(&end, "%Y-%m-%d").ok()?,
                    daily_topics: serde_json::from_str(&topics).ok()?,
                    completed_topics: serde_json::from_str(&done).ok()?,
                })
            })
            .collect();
        Ok(schedules)
    }

    pub fn complete_topic(&self, schedule_id: i64, topic: &str) -> Result<()> {
        let conn = self.db.lock().unwrap();
        let done_json: Option<String> = conn
            .query_row(
                "SELECT completed_topics FROM study_schedule WHERE id = ?1",
                [schedule_id],
                |r| r.get(0),
            )
            .optional()?;
        let mut done: Vec<String> = done_json
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        if !done.iter().any(|t| t == topic) {
            done.push(topic.to_string());
        }
        let done_json = serde_json::to_string(&done)
            .map_err(|e| crate::error::StudyError::InvalidJson(e.to_string()))?;
        conn.execute(
            "UPDATE study_schedule SET completed_topics = ?1 WHERE id = ?2",
            rusqlite::params![done_json, schedule_id],
        )?;
        Ok(())
    }

    // --- per-topic accuracy -------------------------------------------------

    pub fn record_answer(
        &self,
        user_id: u64,
        subject: &str,
        topic: &str,
        correct: bool,
    ) -> Result<()> {
        let conn = self.db.lock().unwrap();
        conn.execute(
            "INSERT INTO study_progress
                 (user_id, subject, topic, correct_answers, total_attempts, last_study_time)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)
             ON CONFLICT(user_id, subject, topic) DO UPDATE SET
                 correct_answers = correct_answers + excluded.correct_answers,
                 total_attempts = total_attempts + 1,
                 last_study_time = excluded.last_study_time",
            rusqlite::params![
                user_id.to_string(),
                subject,
                topic,
                correct as i64,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// The user's weakest topic for a subject (lowest accuracy, attempts > 0).
    pub fn weakest_topic(&self, user_id: u64, subject: &str) -> Result<Option<TopicProgress>> {
        let conn = self.db.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT subject, topic, correct_answers, total_attempts
                 FROM study_progress
                 WHERE user_id = ?1 AND subject = ?2 AND total_attempts > 0
                 ORDER BY CAST(correct_answers AS REAL) / total_attempts ASC
                 LIMIT 1",
                rusqlite::params![user_id.to_string(), subject],
                |r| {
                    Ok(TopicProgress {
                        subject: r.get(0)?,
                        topic: r.get(1)?,
                        correct_answers: r.get(2)?,
                        total_attempts: r.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn progress_summary(&self, user_id: u64) -> Result<Vec<TopicProgress>> {
        let conn = self.db.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT subject, topic, correct_answers, total_attempts
             FROM study_progress WHERE user_id = ?1
             ORDER BY subject, topic",
        )?;
        let rows = stmt
            .query_map([user_id.to_string()], |r| {
                Ok(TopicProgress {
                    subject: r.get(0)?,
                    topic: r.get(1)?,
                    correct_answers: r.get(2)?,
                    total_attempts: r.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // --- study tips ---------------------------------------------------------

    pub fn add_tip(&self, category: &str, tip: &str) -> Result<()> {
        let conn = self.db.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO study_tip_categories (name) VALUES (?1)",
            [category],
        )?;
        conn.execute(
            "INSERT INTO study_tips (category_id, tip)
             SELECT id, ?2 FROM study_tip_categories WHERE name = ?1",
            rusqlite::params![category, tip],
        )?;
        Ok(())
    }

    /// An arbitrary tip, optionally limited to one category.
    pub fn any_tip(&self, category: Option<&str>) -> Result<Option<String>> {
        let conn = self.db.lock().unwrap();
        let tip = match category {
            Some(category) => conn
                .query_row(
                    "SELECT t.tip FROM study_tips t
                     JOIN study_tip_categories c ON c.id = t.category_id
                     WHERE c.name = ?1
                     ORDER BY RANDOM() LIMIT 1",
                    [category],
                    |r| r.get(0),
                )
                .optional()?,
            None => conn
                .query_row(
                    "SELECT tip FROM study_tips ORDER BY RANDOM() LIMIT 1",
                    [],
                    |r| r.get(0),
                )
                .optional()?,
        };
        Ok(tip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services() -> StudyServices {
        StudyServices::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn flashcards_rotate_by_review_count() {
        let s = services();
        s.add_flashcard(1, "physics", "F = ?", "ma").unwrap();
        let second = s.add_flashcard(1, "physics", "v = ?", "u + at").unwrap();

        let first = s.next_flashcard(1, Some("physics")).unwrap().unwrap();
        s.record_flashcard_review(first.id).unwrap();

        let next = s.next_flashcard(1, Some("physics")).unwrap().unwrap();
        assert_eq!(next.id, second);
        assert_eq!(s.flashcard_count(1).unwrap(), 2);

        // Other users see nothing.
        assert!(s.next_flashcard(2, None).unwrap().is_none());
    }

    #[test]
    fn schedule_roundtrip_and_completion() {
        let s = services();
        let topics = vec!["Kinematics".to_string(), "Dynamics".to_string()];
        let created = s.create_schedule(1, "physics", 14, topics.clone()).unwrap();

        let active = s.active_schedules(1).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].daily_topics, topics);
        assert!(active[0].completed_topics.is_empty());

        s.complete_topic(created.id, "Kinematics").unwrap();
        s.complete_topic(created.id, "Kinematics").unwrap();
        let active = s.active_schedules(1).unwrap();
        assert_eq!(active[0].completed_topics, vec!["Kinematics".to_string()]);
    }

    #[test]
    fn weakest_topic_orders_by_accuracy() {
        let s = services();
        // waves: 0/2, optics: 1/1
        s.record_answer(1, "physics", "waves", false).unwrap();
        s.record_answer(1, "physics", "waves", false).unwrap();
        s.record_answer(1, "physics", "optics", true).unwrap();

        let weakest = s.weakest_topic(1, "physics").unwrap().unwrap();
        assert_eq!(weakest.topic, "waves");
        assert_eq!(weakest.total_attempts, 2);

        assert!(s.weakest_topic(1, "biology").unwrap().is_none());
    }

    #[test]
    fn tips_by_category() {
        let s = services();
        s.add_tip("revision", "Summarise each chapter in your own words.")
            .unwrap();

        let tip = s.any_tip(Some("revision")).unwrap().unwrap();
        assert_eq!(tip, "Summarise each chapter in your own words.");
        assert!(s.any_tip(Some("nonexistent")).unwrap().is_none());
        // Default tips are seeded on first run.
        assert!(s.any_tip(None).unwrap().is_some());
        assert!(s.any_tip(Some("memory")).unwrap().is_some());
    }
}
