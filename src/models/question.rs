// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub category_id: i64,

    /// The text content of the question.
    pub question: String,

    /// Question kind: 'multiple' (multiple choice) or 'boolean' (true/false).
    #[serde(rename = "type")]
    pub question_type: String,

    /// 'easy', 'medium' or 'hard'.
    pub difficulty: String,

    pub correct_answer: String,

    /// Wrong options, stored as a JSON array in the database.
    /// One entry for boolean questions, usually three for multiple choice.
    pub incorrect_answers: Json<Vec<String>>,

    /// Optional explanation shown with results.
    pub explanation: Option<String>,

    pub created_by: Option<i64>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A question type with its question count, as listed publicly.
#[derive(Debug, Serialize, FromRow)]
pub struct TypeSummary {
    pub id: i64,
    pub name: String,
    pub question_count: i64,
}

/// A category joined with its type name and question count.
#[derive(Debug, Serialize, FromRow)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(rename = "typeId")]
    pub type_id: i64,
    pub question_count: i64,
}

/// Per-difficulty question counts for one category.
#[derive(Debug, Serialize, FromRow)]
pub struct CategoryCounts {
    pub total_question_count: i64,
    pub total_easy_question_count: i64,
    pub total_medium_question_count: i64,
    pub total_hard_question_count: i64,
}

/// Query params for the practice sampling endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListParams {
    pub category_id: Option<i64>,
    pub difficulty: Option<String>,
    pub amount: Option<i64>,
}

/// DTO for an admin creating a question type.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTypeRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

/// DTO for an admin creating a category.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub type_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// DTO for an admin seeding a question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub category_id: i64,
    #[validate(length(min = 1, max = 500, message = "Question cannot be more than 500 characters."))]
    pub question: String,
    /// 'multiple' (default) or 'boolean'.
    pub question_type: Option<String>,
    pub difficulty: String,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
    #[validate(custom(function = validate_incorrect_answers))]
    pub incorrect_answers: Vec<String>,
    #[validate(length(max = 1000, message = "Explanation cannot be more than 1000 characters."))]
    pub explanation: Option<String>,
}

fn validate_incorrect_answers(answers: &[String]) -> Result<(), validator::ValidationError> {
    if answers.is_empty() {
        return Err(validator::ValidationError::new("incorrect_answers_cannot_be_empty"));
    }
    for ans in answers {
        if ans.len() > 500 {
            return Err(validator::ValidationError::new("answer_too_long"));
        }
    }
    Ok(())
}

pub const DIFFICULTIES: [&str; 3] = ["easy", "medium", "hard"];
