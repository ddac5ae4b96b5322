//! Study domain services: the question bank and provider, the AI adapter,
//! the curriculum catalog, and the SQLite-backed flashcard/schedule/tips
//! services. Everything here is stateless glue except the provider's
//! uniqueness cache.

pub mod ai;
pub mod bank;
pub mod db;
pub mod error;
pub mod provider;
pub mod services;
pub mod subjects;

pub use ai::{AiAdapter, OpenAiChat};
pub use error::{Result, StudyError};
pub use provider::{Question, QuestionProvider};
