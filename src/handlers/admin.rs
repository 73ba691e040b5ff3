// src/handlers/admin.rs

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::question::{CreateCategoryRequest, CreateQuestionRequest, CreateTypeRequest, DIFFICULTIES},
    utils::jwt::Claims,
};

/// Creates a question type.
/// Admin only.
pub async fn create_type(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id: i64 = sqlx::query_scalar("INSERT INTO question_types (name) VALUES (?) RETURNING id")
        .bind(&payload.name)
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Type '{}' already exists", payload.name))
            } else {
                tracing::error!("Failed to create question type: {:?}", e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": { "id": id } })),
    ))
}

/// Creates a category under an existing type.
/// Admin only.
pub async fn create_category(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let type_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM question_types WHERE id = ?")
        .bind(payload.type_id)
        .fetch_optional(&pool)
        .await?;
    if type_exists.is_none() {
        return Err(AppError::NotFound("Question type not found".to_string()));
    }

    let id: i64 =
        sqlx::query_scalar("INSERT INTO categories (type_id, name) VALUES (?, ?) RETURNING id")
            .bind(payload.type_id)
            .bind(&payload.name)
            .fetch_one(&pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!(
                        "Category '{}' already exists for this type",
                        payload.name
                    ))
                } else {
                    tracing::error!("Failed to create category: {:?}", e);
                    AppError::InternalServerError(e.to_string())
                }
            })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": { "id": id } })),
    ))
}

/// Seeds a question into the bank. Questions are immutable once created.
/// Admin only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if !DIFFICULTIES.contains(&payload.difficulty.as_str()) {
        return Err(AppError::BadRequest("Invalid difficulty".to_string()));
    }

    let question_type = payload
        .question_type
        .unwrap_or_else(|| "multiple".to_string());
    if !["multiple", "boolean"].contains(&question_type.as_str()) {
        return Err(AppError::BadRequest("Invalid question type".to_string()));
    }

    let category_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ?")
        .bind(payload.category_id)
        .fetch_optional(&pool)
        .await?;
    if category_exists.is_none() {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions (category_id, question, question_type, difficulty,
                               correct_answer, incorrect_answers, explanation, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(payload.category_id)
    .bind(&payload.question)
    .bind(&question_type)
    .bind(&payload.difficulty)
    .bind(&payload.correct_answer)
    .bind(sqlx::types::Json(&payload.incorrect_answers))
    .bind(&payload.explanation)
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": { "id": id } })),
    ))
}
