// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'quizzes' table: one timed attempt by one user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Quiz {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    /// Denormalized category name at start time.
    pub category: String,
    /// Denormalized type name at start time.
    pub quiz_type: String,
    pub difficulty: String,
    pub total_questions: i64,
    pub duration_seconds: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Fixed at creation: started_at + duration_seconds.
    pub expires_at: chrono::DateTime<chrono::Utc>,
    /// Transitions false -> true exactly once, on submit.
    pub completed: bool,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// 'started', 'completed' or 'expired'.
    pub status: String,
    pub score: i64,
    pub points_earned: i64,
}

/// One snapshot row in 'quiz_questions'. Grading always runs against this
/// copy, never against the live question bank.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question_id: i64,
    pub position: i64,
    pub question: String,
    pub question_type: String,
    pub difficulty: String,
    pub correct_answer: String,
    pub incorrect_answers: Json<Vec<String>>,
    pub user_answer: Option<String>,
    /// NULL until submitted; stays NULL for skipped questions.
    pub is_correct: Option<bool>,
}

/// DTO for starting a quiz session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizRequest {
    pub category_id: i64,
    pub type_id: Option<i64>,
    /// 'easy', 'medium' (default), 'hard' or 'any'.
    pub difficulty: Option<String>,
}

/// One submitted answer. The canonical tagged schema: answers are keyed by
/// question id, a bare positional string array does not deserialize.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: i64,
    /// None or empty string means the question was skipped.
    pub answer: Option<String>,
}

/// DTO for submitting a quiz session.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<SubmittedAnswer>,
}
