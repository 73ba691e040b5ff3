// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::question::{
        CategoryCounts, CategorySummary, DIFFICULTIES, Question, QuestionListParams, TypeSummary,
    },
};

/// Lists all question types with their question counts, ordered by name.
pub async fn list_types(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let types = sqlx::query_as::<_, TypeSummary>(
        r#"
        SELECT t.id, t.name, COUNT(q.id) AS question_count
        FROM question_types t
        LEFT JOIN categories c ON c.type_id = t.id
        LEFT JOIN questions q ON q.category_id = c.id
        GROUP BY t.id, t.name
        ORDER BY t.name
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list question types: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(json!({
        "success": true,
        "count": types.len(),
        "data": types,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListParams {
    pub type_id: Option<i64>,
}

/// Lists categories, optionally filtered by type, each with its type name
/// and question count.
pub async fn list_categories(
    State(pool): State<SqlitePool>,
    Query(params): Query<CategoryListParams>,
) -> Result<impl IntoResponse, AppError> {
    let base = r#"
        SELECT c.id, c.name, t.name AS type_name, c.type_id, COUNT(q.id) AS question_count
        FROM categories c
        JOIN question_types t ON t.id = c.type_id
        LEFT JOIN questions q ON q.category_id = c.id
    "#;

    let categories = if let Some(type_id) = params.type_id {
        sqlx::query_as::<_, CategorySummary>(&format!(
            "{base} WHERE c.type_id = ? GROUP BY c.id, c.name, t.name, c.type_id ORDER BY c.name"
        ))
        .bind(type_id)
        .fetch_all(&pool)
        .await?
    } else {
        sqlx::query_as::<_, CategorySummary>(&format!(
            "{base} GROUP BY c.id, c.name, t.name, c.type_id ORDER BY c.name"
        ))
        .fetch_all(&pool)
        .await?
    };

    Ok(Json(json!({
        "success": true,
        "count": categories.len(),
        "data": categories,
    })))
}

/// Per-difficulty question counts for one category.
/// An unknown category id simply reports zeros.
pub async fn get_question_count(
    State(pool): State<SqlitePool>,
    Path(category_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let counts = sqlx::query_as::<_, CategoryCounts>(
        r#"
        SELECT
            COUNT(*) AS total_question_count,
            COALESCE(SUM(CASE WHEN difficulty = 'easy' THEN 1 ELSE 0 END), 0)
                AS total_easy_question_count,
            COALESCE(SUM(CASE WHEN difficulty = 'medium' THEN 1 ELSE 0 END), 0)
                AS total_medium_question_count,
            COALESCE(SUM(CASE WHEN difficulty = 'hard' THEN 1 ELSE 0 END), 0)
                AS total_hard_question_count
        FROM questions
        WHERE category_id = ?
        "#,
    )
    .bind(category_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({
        "success": true,
        "data": counts,
    })))
}

/// Samples N random questions for practice mode. Unlike a quiz session this
/// returns the full documents, correct answers included.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let amount = params.amount.unwrap_or(10);
    if !(1..=50).contains(&amount) {
        return Err(AppError::BadRequest(
            "Amount must be between 1 and 50".to_string(),
        ));
    }

    let difficulty = params
        .difficulty
        .as_deref()
        .filter(|d| *d != "any")
        .map(str::to_owned);
    if let Some(d) = &difficulty {
        if !DIFFICULTIES.contains(&d.as_str()) {
            return Err(AppError::BadRequest("Invalid difficulty".to_string()));
        }
    }

    let mut filter = String::from("WHERE 1 = 1");
    if params.category_id.is_some() {
        filter.push_str(" AND category_id = ?");
    }
    if difficulty.is_some() {
        filter.push_str(" AND difficulty = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM questions {filter}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(category_id) = params.category_id {
        count_query = count_query.bind(category_id);
    }
    if let Some(d) = &difficulty {
        count_query = count_query.bind(d);
    }
    let available = count_query.fetch_one(&pool).await?;

    if available < amount {
        return Err(AppError::NotFound(
            "No questions found for the specified criteria".to_string(),
        ));
    }

    let sample_sql = format!(
        r#"
        SELECT id, category_id, question, question_type, difficulty,
               correct_answer, incorrect_answers, explanation, created_by, created_at
        FROM questions
        {filter}
        ORDER BY RANDOM()
        LIMIT ?
        "#
    );
    let mut sample_query = sqlx::query_as::<_, Question>(&sample_sql);
    if let Some(category_id) = params.category_id {
        sample_query = sample_query.bind(category_id);
    }
    if let Some(d) = &difficulty {
        sample_query = sample_query.bind(d);
    }
    let questions = sample_query.bind(amount).fetch_all(&pool).await?;

    Ok(Json(json!({
        "success": true,
        "count": questions.len(),
        "data": questions,
    })))
}
