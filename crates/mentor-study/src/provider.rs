use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::ai::AiAdapter;
use crate::bank;
use crate::error::{Result, StudyError};
use crate::subjects;

/// Per-subject cache cap; beyond this the oldest 20% is evicted.
const CACHE_CAP: usize = 1000;
/// Question-text prefix length used in fingerprints.
const FINGERPRINT_PREFIX: usize = 50;
/// AI generation attempts before declaring the pool exhausted.
const GENERATION_RETRIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: char,
    pub explanation: String,
}

/// Serves practice questions, guaranteeing that one user does not see the
/// same question twice for a given subject until their cache rolls over.
pub struct QuestionProvider {
    ai: Arc<dyn AiAdapter>,
    caches: Mutex<HashMap<(u64, String), SubjectCache>>,
}

impl QuestionProvider {
    pub fn new(ai: Arc<dyn AiAdapter>) -> Self {
        Self {
            ai,
            caches: Mutex::new(HashMap::new()),
        }
    }

    /// Bank first, then the AI adapter with validation retries; when every
    /// candidate collides with the cache, the user's subject cache is
    /// cleared and the whole sequence retried once.
    pub async fn next_question(
        &self,
        subject: &str,
        topic: Option<&str>,
        class_level: u8,
        user_id: u64,
    ) -> Result<Question> {
        let subject = subjects::normalize(subject)
            .ok_or_else(|| StudyError::UnknownSubject(subject.to_string()))?;

        match self.try_next(subject, topic, class_level, user_id).await {
            Err(StudyError::Exhausted) => {
                debug!(user_id, subject, "question cache exhausted — clearing and retrying");
                self.clear_user_subject(user_id, subject);
                self.try_next(subject, topic, class_level, user_id).await
            }
            other => other,
        }
    }

    pub fn clear_user_subject(&self, user_id: u64, subject: &str) {
        self.caches
            .lock()
            .unwrap()
            .remove(&(user_id, subject.to_string()));
    }

    async fn try_next(
        &self,
        subject: &'static str,
        topic: Option<&str>,
        class_level: u8,
        user_id: u64,
    ) -> Result<Question> {
        // Static bank first.
        for candidate in bank::stored_questions(subject, class_level, topic) {
            let question = Question {
                question: candidate.question.to_string(),
                options: candidate.options.iter().map(|o| o.to_string()).collect(),
                correct_answer: candidate.correct_answer,
                explanation: candidate.explanation.to_string(),
            };
            if self.claim(user_id, subject, &question) {
                return Ok(question);
            }
        }

        // Bank exhausted for this user — fall back to generation.
        let prompt = build_prompt(subject, topic, class_level);
        for attempt in 1..=GENERATION_RETRIES {
            let raw = match self.ai.generate(&prompt).await {
                Ok(raw) => raw,
                Err(e) if attempt < GENERATION_RETRIES => {
                    warn!(attempt, error = %e, "generation attempt failed");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let question = match parse_question(&raw) {
                Ok(q) => q,
                Err(e) => {
                    warn!(attempt, error = %e, "generated question failed validation");
                    continue;
                }
            };

            if self.claim(user_id, subject, &question) {
                return Ok(question);
            }
        }

        Err(StudyError::Exhausted)
    }

    /// Record the question's fingerprint; false when already seen.
    fn claim(&self, user_id: u64, subject: &str, question: &Question) -> bool {
        let fp = fingerprint(question);
        let mut caches = self.caches.lock().unwrap();
        let cache = caches
            .entry((user_id, subject.to_string()))
            .or_default();
        cache.insert(fp)
    }
}

/// Insertion-ordered fingerprint set with bulk eviction.
#[derive(Default)]
struct SubjectCache {
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl SubjectCache {
    /// Returns false when the fingerprint was already present.
    fn insert(&mut self, fp: String) -> bool {
        if self.seen.contains(&fp) {
            return false;
        }
        if self.order.len() >= CACHE_CAP {
            // Evict the oldest fifth in one sweep.
            for _ in 0..(CACHE_CAP / 5) {
                if let Some(old) = self.order.pop_front() {
                    self.seen.remove(&old);
                }
            }
        }
        self.order.push_back(fp.clone());
        self.seen.insert(fp);
        true
    }
}

/// Question-text prefix plus the joined options: stable across cosmetic
/// whitespace differences in the surrounding JSON.
pub fn fingerprint(question: &Question) -> String {
    let prefix: String = question.question.chars().take(FINGERPRINT_PREFIX).collect();
    format!("{}|{}", prefix, question.options.join("|"))
}

fn build_prompt(subject: &str, topic: Option<&str>, class_level: u8) -> String {
    let topic_clause = topic
        .map(|t| format!(" on the topic \"{t}\""))
        .unwrap_or_default();
    format!(
        "Generate one multiple-choice question for a class {class_level} student \
         in {subject}{topic_clause}. Respond with JSON only, in this shape: \
         {{\"question\": \"...\", \"options\": [\"A) ...\", \"B) ...\", \"C) ...\", \"D) ...\"], \
         \"correct_answer\": \"A\", \"explanation\": \"...\"}}"
    )
}

/// Validate a generated response: four options and an answer letter in A–D.
pub fn parse_question(raw: &str) -> Result<Question> {
    #[derive(Deserialize)]
    struct Wire {
        question: String,
        options: Vec<String>,
        correct_answer: String,
        explanation: Option<String>,
    }

    let wire: Wire =
        serde_json::from_str(raw).map_err(|e| StudyError::InvalidJson(e.to_string()))?;

    if wire.options.len() != 4 {
        return Err(StudyError::InvalidJson(format!(
            "expected 4 options, got {}",
            wire.options.len()
        )));
    }
    let letter = wire
        .correct_answer
        .trim()
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase());
    let Some(letter @ 'A'..='D') = letter else {
        return Err(StudyError::InvalidJson(format!(
            "correct_answer must be A-D, got {:?}",
            wire.correct_answer
        )));
    };

    Ok(Question {
        question: wire.question,
        options: wire.options,
        correct_answer: letter,
        explanation: wire.explanation.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Adapter that cycles through canned responses.
    struct ScriptedAi {
        responses: Vec<String>,
        cursor: AtomicUsize,
    }

    impl ScriptedAi {
        fn new(responses: Vec<String>) -> Arc<Self> {
            Arc::new(Self {
                responses,
                cursor: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AiAdapter for ScriptedAi {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            let i = self.cursor.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(i % self.responses.len())
                .cloned()
                .ok_or_else(|| StudyError::Provider("script empty".into()))
        }
    }

    fn wire_question(n: usize) -> String {
        format!(
            "{{\"question\": \"Generated question {n}?\", \
              \"options\": [\"A) one\", \"B) two\", \"C) three\", \"D) four\"], \
              \"correct_answer\": \"B\", \"explanation\": \"because\"}}"
        )
    }

    #[tokio::test]
    async fn consecutive_calls_return_distinct_questions() {
        let ai = ScriptedAi::new((0..20).map(wire_question).collect());
        let provider = QuestionProvider::new(ai);

        let mut seen = HashSet::new();
        for _ in 0..6 {
            let q = provider
                .next_question("physics", Some("waves"), 11, 1)
                .await
                .unwrap();
            assert!(seen.insert(fingerprint(&q)), "duplicate question served");
        }
    }

    #[tokio::test]
    async fn bank_is_preferred_over_generation() {
        // The script would panic the test if consulted for the first call:
        // an invalid payload is all it has.
        let ai = ScriptedAi::new(vec!["not json".into()]);
        let provider = QuestionProvider::new(ai);

        let q = provider
            .next_question("physics", Some("waves"), 11, 1)
            .await
            .unwrap();
        assert!(q.question.contains("wavelength"));
    }

    #[tokio::test]
    async fn exhausted_cache_is_cleared_and_retried() {
        // One canned response: the second request for it collides, the
        // provider clears the cache and serves it again.
        let ai = ScriptedAi::new(vec![wire_question(1)]);
        let provider = QuestionProvider::new(ai);

        // Drain the bank for this subject/class first.
        let bank_size = bank::stored_questions("english", 11, None).len();
        for _ in 0..bank_size {
            provider.next_question("english", None, 11, 1).await.unwrap();
        }

        let a = provider.next_question("english", None, 11, 1).await.unwrap();
        assert_eq!(a.question, "Generated question 1?");
        // Every candidate now collides: the provider clears this user's
        // subject cache and serves from the bank again instead of erroring.
        let b = provider.next_question("english", None, 11, 1).await.unwrap();
        assert!(b.question.contains("punctuated"));
    }

    #[tokio::test]
    async fn users_have_independent_caches() {
        let ai = ScriptedAi::new(vec![wire_question(1)]);
        let provider = QuestionProvider::new(ai);

        let a = provider
            .next_question("physics", Some("waves"), 11, 1)
            .await
            .unwrap();
        let b = provider
            .next_question("physics", Some("waves"), 11, 2)
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn unknown_subject_is_rejected() {
        let ai = ScriptedAi::new(vec![wire_question(1)]);
        let provider = QuestionProvider::new(ai);
        assert!(matches!(
            provider.next_question("history", None, 11, 1).await,
            Err(StudyError::UnknownSubject(_))
        ));
    }

    #[test]
    fn parse_rejects_malformed_payloads() {
        assert!(parse_question("not json").is_err());
        assert!(parse_question(
            "{\"question\": \"q\", \"options\": [\"A\"], \"correct_answer\": \"A\"}"
        )
        .is_err());
        assert!(parse_question(
            "{\"question\": \"q\", \"options\": [\"A\",\"B\",\"C\",\"D\"], \"correct_answer\": \"E\"}"
        )
        .is_err());

        let ok = parse_question(
            "{\"question\": \"q\", \"options\": [\"A\",\"B\",\"C\",\"D\"], \"correct_answer\": \"c\"}",
        )
        .unwrap();
        assert_eq!(ok.correct_answer, 'C');
        assert_eq!(ok.explanation, "");
    }

    #[test]
    fn cache_evicts_oldest_fifth_at_cap() {
        let mut cache = SubjectCache::default();
        for i in 0..CACHE_CAP {
            assert!(cache.insert(format!("fp-{i}")));
        }
        assert_eq!(cache.order.len(), CACHE_CAP);

        // The next insert triggers eviction of the oldest 20%.
        assert!(cache.insert("fp-new".into()));
        assert_eq!(cache.order.len(), CACHE_CAP - CACHE_CAP / 5 + 1);
        // Evicted entries can be seen again.
        assert!(cache.insert("fp-0".into()));
        // Recent entries are still blocked.
        assert!(!cache.insert(format!("fp-{}", CACHE_CAP - 1)));
    }
}
