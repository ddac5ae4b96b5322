use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Timelike, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, warn};

use mentor_core::config::COMMAND_PREFIX;

use crate::backup::{self, AwardMap};
use crate::catalog::{self, Achievement};
use crate::db;
use crate::error::Result;
use crate::level::{level_for_xp, XP_COOLDOWN_SECS, XP_QUANTUM};

/// Speed-learner window: this many questions inside the window unlocks it.
const SPEED_LEARNER_COUNT: usize = 5;
const SPEED_LEARNER_WINDOW_SECS: i64 = 300;
/// Consecutive study days for the streak achievement.
const STREAK_DAYS: usize = 7;
/// Question count in one subject for the specialist achievement.
const SPECIALIST_THRESHOLD: i64 = 25;

/// Outbound notifications. Implemented over the platform adapter by the
/// binary; the engine never holds a gateway handle itself.
#[async_trait]
pub trait ProgressNotifier: Send + Sync {
    /// Announce a level-up in the guild's first writable text channel.
    async fn level_up(&self, guild_id: Option<u64>, user_id: u64, level: u32, xp: u64);

    /// DM the unlock embed (best-effort) and assign the achievement role
    /// when a guild and role name are available.
    async fn achievement_unlocked(
        &self,
        guild_id: Option<u64>,
        user_id: u64,
        achievement: &Achievement,
    );
}

struct XpOutcome {
    xp: u64,
    level: u32,
    leveled_up: bool,
}

/// Mutates XP and achievement counters. Exclusive owner of `user_xp`,
/// `achievement_progress`, and `study_dates`.
pub struct ProgressEngine {
    db: Mutex<Connection>,
    notifier: Arc<dyn ProgressNotifier>,
    backup_path: PathBuf,
    /// Recent question timestamps per user, for the speed-learner window.
    recent_questions: Mutex<HashMap<u64, VecDeque<DateTime<Utc>>>>,
}

impl ProgressEngine {
    pub fn new(
        conn: Connection,
        notifier: Arc<dyn ProgressNotifier>,
        backup_path: PathBuf,
    ) -> Result<Self> {
        db::init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
            notifier,
            backup_path,
            recent_questions: Mutex::new(HashMap::new()),
        })
    }

    /// Message hook: XP (outside the 60 s cooldown), subject counters for
    /// `!11`/`!12` prefixes, and the time-based secret achievements.
    pub async fn on_message(
        &self,
        user_id: u64,
        _channel_id: u64,
        guild_id: Option<u64>,
        content: &str,
    ) -> Result<()> {
        let xp = self.award_xp(user_id)?;
        if xp.leveled_up {
            self.notifier
                .level_up(guild_id, user_id, xp.level, xp.xp)
                .await;
        }

        if let Some((_class, subject, topic)) = parse_study_prefix(content) {
            self.bump_subject_counter(user_id, &subject, topic.as_deref())?;

            if is_night_hour(Local::now().hour()) {
                self.award(user_id, "night_owl", guild_id).await?;
            }

            let (streak, weekend) = self.record_study_date(user_id)?;
            if streak {
                self.award(user_id, "streak_scholar", guild_id).await?;
            }
            if weekend {
                self.award(user_id, "weekend_warrior", guild_id).await?;
            }
        }

        Ok(())
    }

    /// Command hook: fired after a command completes successfully.
    pub async fn on_command(
        &self,
        user_id: u64,
        verb: &str,
        _channel_id: u64,
        guild_id: Option<u64>,
    ) -> Result<()> {
        match verb {
            "11" | "12" => {
                self.update_progress(user_id, "first_question", guild_id, 1).await?;
                self.update_progress(user_id, "master_student", guild_id, 1).await?;

                let distinct = self.distinct_subjects(user_id)?;
                self.promote_progress(user_id, "knowledge_seeker", guild_id, distinct).await?;

                if self.max_subject_count(user_id)? >= SPECIALIST_THRESHOLD {
                    self.award(user_id, "subject_specialist", guild_id).await?;
                }

                if self.note_question_time(user_id) {
                    self.award(user_id, "speed_learner", guild_id).await?;
                }
            }
            "ask" | "explain" | "solve" | "practice" | "compare" | "chat" => {
                self.update_progress(user_id, "ai_explorer", guild_id, 1).await?;
                self.update_progress(user_id, "deep_thinker", guild_id, 1).await?;
            }
            "play" => {
                self.update_progress(user_id, "music_lover", guild_id, 1).await?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Atomic read-modify-write on one achievement counter. Returns true
    /// when this call completed the achievement.
    pub async fn update_progress(
        &self,
        user_id: u64,
        achievement_id: &str,
        guild_id: Option<u64>,
        add: u32,
    ) -> Result<bool> {
        let completed = self.apply_progress(user_id, achievement_id, ProgressOp::Add(add))?;
        self.after_completion(user_id, guild_id, completed).await
    }

    /// Raise a counter to at least `target` (never lowers it).
    pub async fn promote_progress(
        &self,
        user_id: u64,
        achievement_id: &str,
        guild_id: Option<u64>,
        target: u32,
    ) -> Result<bool> {
        let completed = self.apply_progress(user_id, achievement_id, ProgressOp::AtLeast(target))?;
        self.after_completion(user_id, guild_id, completed).await
    }

    /// Jump straight to completion (detection-style achievements).
    pub async fn award(
        &self,
        user_id: u64,
        achievement_id: &str,
        guild_id: Option<u64>,
    ) -> Result<bool> {
        let required = catalog::find(achievement_id)
            .map(|a| a.required_count)
            .unwrap_or(1);
        self.promote_progress(user_id, achievement_id, guild_id, required).await
    }

    /// XP, level, and per-achievement state for profile displays.
    pub fn user_summary(&self, user_id: u64) -> Result<(u64, u32, Vec<(String, u32, bool)>)> {
        let conn = self.db.lock().unwrap();
        let uid = user_id.to_string();
        let (xp, level): (i64, i64) = conn
            .query_row(
                "SELECT xp, level FROM user_xp WHERE user_id = ?1",
                [&uid],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
            .unwrap_or((0, 1));

        let mut stmt = conn.prepare(
            "SELECT achievement_id, current_count, completed
             FROM achievement_progress WHERE user_id = ?1",
        )?;
        let rows = stmt
            .query_map([&uid], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, i64>(1)? as u32,
                    r.get::<_, i64>(2)? != 0,
                ))
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok((xp as u64, level as u32, rows))
    }

    pub fn completed_ids(&self, user_id: u64) -> Result<Vec<String>> {
        let conn = self.db.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT achievement_id FROM achievement_progress
             WHERE user_id = ?1 AND completed = 1",
        )?;
        let ids = stmt
            .query_map([user_id.to_string()], |r| r.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }

    // --- internals ----------------------------------------------------------

    /// Award XP if the user is outside the cooldown. Cooldown check and
    /// update share one transaction so concurrent messages can't both win.
    fn award_xp(&self, user_id: u64) -> Result<XpOutcome> {
        let conn = self.db.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now();
        let uid = user_id.to_string();

        let row: Option<(i64, i64, Option<String>)> = tx
            .query_row(
                "SELECT xp, level, last_xp_gain FROM user_xp WHERE user_id = ?1",
                [&uid],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;

        let (old_xp, old_level, last_gain) = row.unwrap_or((0, 1, None));

        let within_cooldown = last_gain
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| now.signed_duration_since(t).num_seconds() < XP_COOLDOWN_SECS)
            .unwrap_or(false);

        if within_cooldown {
            tx.commit()?;
            return Ok(XpOutcome {
                xp: old_xp as u64,
                level: old_level as u32,
                leveled_up: false,
            });
        }

        let new_xp = old_xp as u64 + XP_QUANTUM;
        let new_level = level_for_xp(new_xp);
        tx.execute(
            "INSERT INTO user_xp (user_id, xp, level, last_xp_gain)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                 xp = excluded.xp, level = excluded.level,
                 last_xp_gain = excluded.last_xp_gain",
            rusqlite::params![uid, new_xp as i64, new_level as i64, now.to_rfc3339()],
        )?;
        tx.commit()?;

        let leveled_up = new_level > old_level as u32;
        if leveled_up {
            info!(user_id, level = new_level, xp = new_xp, "level up");
        }

        Ok(XpOutcome {
            xp: new_xp,
            level: new_level,
            leveled_up,
        })
    }

    /// The transactional half of progress updates. Completed achievements
    /// are frozen: their counters never move again.
    fn apply_progress(
        &self,
        user_id: u64,
        achievement_id: &str,
        op: ProgressOp,
    ) -> Result<Option<&'static Achievement>> {
        let Some(achievement) = catalog::find(achievement_id) else {
            return Err(crate::error::ProgressError::UnknownAchievement(
                achievement_id.to_string(),
            ));
        };

        let conn = self.db.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let uid = user_id.to_string();

        let row: Option<(i64, i64)> = tx
            .query_row(
                "SELECT current_count, completed FROM achievement_progress
                 WHERE user_id = ?1 AND achievement_id = ?2",
                rusqlite::params![uid, achievement_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;

        let (current, completed) = row.unwrap_or((0, 0));
        if completed != 0 {
            tx.commit()?;
            return Ok(None);
        }

        let target = match op {
            ProgressOp::Add(n) => current as u32 + n,
            ProgressOp::AtLeast(n) => (current as u32).max(n),
        };
        let new_count = target.min(achievement.required_count);
        let now_complete = new_count >= achievement.required_count;
        let completion_date = now_complete.then(|| Utc::now().to_rfc3339());

        tx.execute(
            "INSERT INTO achievement_progress
                 (user_id, achievement_id, current_count, completed, completion_date)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, achievement_id) DO UPDATE SET
                 current_count = excluded.current_count,
                 completed = excluded.completed,
                 completion_date = excluded.completion_date",
            rusqlite::params![
                uid,
                achievement_id,
                new_count as i64,
                now_complete as i64,
                completion_date
            ],
        )?;
        tx.commit()?;

        if now_complete {
            info!(user_id, achievement = achievement_id, "achievement completed");
            Ok(Some(achievement))
        } else {
            debug!(user_id, achievement = achievement_id, count = new_count, "progress");
            Ok(None)
        }
    }

    async fn after_completion(
        &self,
        user_id: u64,
        guild_id: Option<u64>,
        completed: Option<&'static Achievement>,
    ) -> Result<bool> {
        let Some(achievement) = completed else {
            return Ok(false);
        };

        if let Err(e) = self.rewrite_backup() {
            warn!(error = %e, "achievement backup rewrite failed");
        }

        self.notifier
            .achievement_unlocked(guild_id, user_id, achievement)
            .await;
        Ok(true)
    }

    fn rewrite_backup(&self) -> Result<()> {
        let mut awards = AwardMap::new();
        {
            let conn = self.db.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT user_id, achievement_id FROM achievement_progress
                 WHERE completed = 1 ORDER BY user_id, achievement_id",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
            })?;
            for row in rows.filter_map(|r| r.ok()) {
                awards.entry(row.0).or_default().push(row.1);
            }
        }
        backup::write_backup(&self.backup_path, &awards)
    }

    /// Per-subject question counter, kept in the shared study_progress table.
    fn bump_subject_counter(&self, user_id: u64, subject: &str, topic: Option<&str>) -> Result<()> {
        let conn = self.db.lock().unwrap();
        ensure_study_progress_table(&conn)?;
        conn.execute(
            "INSERT INTO study_progress
                 (user_id, subject, topic, correct_answers, total_attempts, last_study_time)
             VALUES (?1, ?2, ?3, 0, 1, ?4)
             ON CONFLICT(user_id, subject, topic) DO UPDATE SET
                 total_attempts = total_attempts + 1,
                 last_study_time = excluded.last_study_time",
            rusqlite::params![
                user_id.to_string(),
                subject,
                topic.unwrap_or(""),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn distinct_subjects(&self, user_id: u64) -> Result<u32> {
        let conn = self.db.lock().unwrap();
        ensure_study_progress_table(&conn)?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT subject) FROM study_progress WHERE user_id = ?1",
            [user_id.to_string()],
            |r| r.get(0),
        )?;
        Ok(n as u32)
    }

    fn max_subject_count(&self, user_id: u64) -> Result<i64> {
        let conn = self.db.lock().unwrap();
        ensure_study_progress_table(&conn)?;
        let n: Option<i64> = conn
            .query_row(
                "SELECT MAX(total) FROM (
                     SELECT SUM(total_attempts) AS total FROM study_progress
                     WHERE user_id = ?1 GROUP BY subject
                 )",
                [user_id.to_string()],
                |r| r.get(0),
            )
            .optional()?
            .flatten();
        Ok(n.unwrap_or(0))
    }

    /// Insert today into the user's study-date set and evaluate the streak
    /// and weekend conditions over the sorted set.
    fn record_study_date(&self, user_id: u64) -> Result<(bool, bool)> {
        let today = Local::now().date_naive();
        let conn = self.db.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO study_dates (user_id, study_date) VALUES (?1, ?2)",
            rusqlite::params![user_id.to_string(), today.format("%Y-%m-%d").to_string()],
        )?;

        let mut stmt = conn.prepare(
            "SELECT study_date FROM study_dates WHERE user_id = ?1 ORDER BY study_date",
        )?;
        let dates: Vec<NaiveDate> = stmt
            .query_map([user_id.to_string()], |r| r.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .filter_map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
            .collect();

        let date_set: HashSet<NaiveDate> = dates.iter().copied().collect();
        Ok((
            has_consecutive_run(&dates, STREAK_DAYS),
            weekend_complete(&date_set, today),
        ))
    }

    /// Track a question timestamp; true when the speed-learner window fills.
    fn note_question_time(&self, user_id: u64) -> bool {
        let now = Utc::now();
        let mut map = self.recent_questions.lock().unwrap();
        let window = map.entry(user_id).or_default();
        window.push_back(now);
        while window
            .front()
            .is_some_and(|t| now.signed_duration_since(*t).num_seconds() > SPEED_LEARNER_WINDOW_SECS)
        {
            window.pop_front();
        }
        window.len() >= SPEED_LEARNER_COUNT
    }
}

enum ProgressOp {
    Add(u32),
    AtLeast(u32),
}

/// The study services own this table; creating it here too keeps the engine
/// usable against a fresh database in any initialisation order.
fn ensure_study_progress_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS study_progress (
            user_id         TEXT NOT NULL,
            subject         TEXT NOT NULL,
            topic           TEXT NOT NULL,
            correct_answers INTEGER NOT NULL DEFAULT 0,
            total_attempts  INTEGER NOT NULL DEFAULT 0,
            last_study_time TEXT,
            PRIMARY KEY (user_id, subject, topic)
        );",
    )
}

/// `!11 physics waves` → `(11, "physics", Some("waves"))`.
pub fn parse_study_prefix(content: &str) -> Option<(u8, String, Option<String>)> {
    let body = content.strip_prefix(COMMAND_PREFIX)?;
    let mut parts = body.split_whitespace();
    let class = match parts.next()? {
        "11" => 11,
        "12" => 12,
        _ => return None,
    };
    let subject = parts.next()?.to_lowercase();
    let topic: Vec<&str> = parts.collect();
    let topic = if topic.is_empty() {
        None
    } else {
        Some(topic.join(" ").to_lowercase())
    };
    Some((class, subject, topic))
}

/// Union of the original's two overlapping night conditions: hour ∈ [0, 6).
pub fn is_night_hour(hour: u32) -> bool {
    hour < 6
}

/// Any run of `len` consecutive days in an ascending date list.
pub fn has_consecutive_run(dates: &[NaiveDate], len: usize) -> bool {
    if dates.len() < len {
        return false;
    }
    let mut run = 1;
    for pair in dates.windows(2) {
        if pair[1] == pair[0] + Duration::days(1) {
            run += 1;
            if run >= len {
                return true;
            }
        } else if pair[1] != pair[0] {
            run = 1;
        }
    }
    run >= len
}

/// Both weekend days of the week containing `today` are in the set.
pub fn weekend_complete(dates: &HashSet<NaiveDate>, today: NaiveDate) -> bool {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let saturday = monday + Duration::days(5);
    let sunday = monday + Duration::days(6);
    dates.contains(&saturday) && dates.contains(&sunday)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct RecordingNotifier {
        level_ups: AtomicU32,
        unlocks: Mutex<Vec<&'static str>>,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                level_ups: AtomicU32::new(0),
                unlocks: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ProgressNotifier for RecordingNotifier {
        async fn level_up(&self, _guild_id: Option<u64>, _user_id: u64, _level: u32, _xp: u64) {
            self.level_ups.fetch_add(1, Ordering::SeqCst);
        }

        async fn achievement_unlocked(
            &self,
            _guild_id: Option<u64>,
            _user_id: u64,
            achievement: &Achievement,
        ) {
            self.unlocks.lock().unwrap().push(achievement.id);
        }
    }

    fn engine_with(notifier: Arc<RecordingNotifier>) -> (ProgressEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        let engine = ProgressEngine::new(
            conn,
            notifier,
            dir.path().join("achievements.json"),
        )
        .unwrap();
        (engine, dir)
    }

    #[tokio::test]
    async fn xp_cooldown_limits_to_one_quantum() {
        let notifier = RecordingNotifier::new();
        let (engine, _dir) = engine_with(Arc::clone(&notifier));

        engine.on_message(1, 10, Some(7), "hello").await.unwrap();
        engine.on_message(1, 10, Some(7), "again").await.unwrap();
        engine.on_message(1, 10, Some(7), "and again").await.unwrap();

        let (xp, _, _) = engine.user_summary(1).unwrap();
        assert_eq!(xp, XP_QUANTUM);
    }

    #[tokio::test]
    async fn level_up_fires_at_the_boundary() {
        let notifier = RecordingNotifier::new();
        let (engine, _dir) = engine_with(Arc::clone(&notifier));

        // Seed: 99 XP, last gain over a minute ago.
        {
            let conn = engine.db.lock().unwrap();
            conn.execute(
                "INSERT INTO user_xp (user_id, xp, level, last_xp_gain) VALUES ('1', 99, 1, ?1)",
                [(Utc::now() - Duration::seconds(61)).to_rfc3339()],
            )
            .unwrap();
        }

        engine.on_message(1, 10, Some(7), "studying hard").await.unwrap();

        let (xp, level, _) = engine.user_summary(1).unwrap();
        assert_eq!(xp, 109);
        assert_eq!(level, 2);
        assert_eq!(notifier.level_ups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn achievement_counts_are_monotonic_and_freeze() {
        let notifier = RecordingNotifier::new();
        let (engine, _dir) = engine_with(Arc::clone(&notifier));

        // knowledge_seeker requires 5.
        assert!(!engine.update_progress(1, "knowledge_seeker", None, 3).await.unwrap());
        assert!(engine.update_progress(1, "knowledge_seeker", None, 9).await.unwrap());

        let (_, _, rows) = engine.user_summary(1).unwrap();
        let (_, count, completed) = rows
            .iter()
            .find(|(id, _, _)| id == "knowledge_seeker")
            .cloned()
            .unwrap();
        // Clamped at required_count, never beyond.
        assert_eq!(count, 5);
        assert!(completed);

        // Frozen after completion.
        assert!(!engine.update_progress(1, "knowledge_seeker", None, 10).await.unwrap());
        let (_, _, rows) = engine.user_summary(1).unwrap();
        let (_, count, _) = rows
            .iter()
            .find(|(id, _, _)| id == "knowledge_seeker")
            .cloned()
            .unwrap();
        assert_eq!(count, 5);
        assert_eq!(notifier.unlocks.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn promote_never_lowers_a_count() {
        let notifier = RecordingNotifier::new();
        let (engine, _dir) = engine_with(notifier);

        engine.promote_progress(1, "deep_thinker", None, 10).await.unwrap();
        engine.promote_progress(1, "deep_thinker", None, 4).await.unwrap();

        let (_, _, rows) = engine.user_summary(1).unwrap();
        let (_, count, _) = rows
            .iter()
            .find(|(id, _, _)| id == "deep_thinker")
            .cloned()
            .unwrap();
        assert_eq!(count, 10);
    }

    #[tokio::test]
    async fn first_question_completes_on_first_command() {
        let notifier = RecordingNotifier::new();
        let (engine, _dir) = engine_with(Arc::clone(&notifier));

        engine.on_command(1, "11", 10, Some(7)).await.unwrap();
        assert!(engine.completed_ids(1).unwrap().contains(&"first_question".to_string()));
    }

    #[tokio::test]
    async fn ai_commands_drive_both_ai_achievements() {
        let notifier = RecordingNotifier::new();
        let (engine, _dir) = engine_with(Arc::clone(&notifier));

        engine.on_command(1, "ask", 10, None).await.unwrap();
        let completed = engine.completed_ids(1).unwrap();
        assert!(completed.contains(&"ai_explorer".to_string()));
        assert!(!completed.contains(&"deep_thinker".to_string()));
    }

    #[tokio::test]
    async fn backup_is_rewritten_on_unlock() {
        let notifier = RecordingNotifier::new();
        let (engine, dir) = engine_with(notifier);

        engine.award(1, "night_owl", None).await.unwrap();

        let map = backup::load_backup(&dir.path().join("achievements.json")).unwrap();
        assert_eq!(map.get("1").unwrap(), &vec!["night_owl".to_string()]);
    }

    #[tokio::test]
    async fn unknown_achievement_is_an_error() {
        let notifier = RecordingNotifier::new();
        let (engine, _dir) = engine_with(notifier);
        assert!(engine.update_progress(1, "not_real", None, 1).await.is_err());
    }

    #[test]
    fn speed_learner_window_fills_and_slides() {
        let notifier = RecordingNotifier::new();
        let (engine, _dir) = engine_with(notifier);

        for _ in 0..4 {
            assert!(!engine.note_question_time(1));
        }
        assert!(engine.note_question_time(1));

        // A different user has their own window.
        assert!(!engine.note_question_time(2));
    }

    #[test]
    fn study_prefix_parsing() {
        assert_eq!(
            parse_study_prefix("!11 physics waves"),
            Some((11, "physics".into(), Some("waves".into())))
        );
        assert_eq!(
            parse_study_prefix("!12 Chemistry"),
            Some((12, "chemistry".into(), None))
        );
        assert_eq!(parse_study_prefix("!help"), None);
        assert_eq!(parse_study_prefix("hello"), None);
        assert_eq!(parse_study_prefix("!11"), None);
    }

    #[test]
    fn night_window_is_midnight_to_six() {
        assert!(is_night_hour(0));
        assert!(is_night_hour(5));
        assert!(!is_night_hour(6));
        assert!(!is_night_hour(23));
    }

    #[test]
    fn consecutive_run_detection() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let run: Vec<NaiveDate> = (1..=7).map(|i| d(&format!("2026-03-0{i}"))).collect();
        assert!(has_consecutive_run(&run, 7));

        let mut broken = run.clone();
        broken.remove(3);
        assert!(!has_consecutive_run(&broken, 7));
        assert!(has_consecutive_run(&broken, 3));
        assert!(!has_consecutive_run(&[], 7));
    }

    #[test]
    fn weekend_detection_uses_the_current_week() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        // 2026-08-01 is a Saturday, 2026-08-02 a Sunday.
        let mut dates = HashSet::new();
        dates.insert(d("2026-08-01"));
        dates.insert(d("2026-08-02"));

        assert!(weekend_complete(&dates, d("2026-08-02")));
        // Mid-next-week, last weekend no longer counts.
        assert!(!weekend_complete(&dates, d("2026-08-05")));

        let mut saturday_only = HashSet::new();
        saturday_only.insert(d("2026-08-01"));
        assert!(!weekend_complete(&saturday_only, d("2026-08-01")));
    }

    #[tokio::test]
    async fn subject_counters_accumulate_from_messages() {
        let notifier = RecordingNotifier::new();
        let (engine, _dir) = engine_with(notifier);

        engine.on_message(1, 10, None, "!11 physics waves").await.unwrap();
        engine.on_message(1, 10, None, "!11 physics optics").await.unwrap();
        engine.on_message(1, 10, None, "!12 biology").await.unwrap();

        assert_eq!(engine.distinct_subjects(1).unwrap(), 2);
        assert_eq!(engine.max_subject_count(1).unwrap(), 2);
    }
}
