// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        question::Question,
        quiz::{Quiz, QuizQuestion, StartQuizRequest, SubmitQuizRequest},
    },
    utils::jwt::Claims,
};

pub const QUIZ_QUESTION_COUNT: i64 = 15;
pub const QUIZ_DURATION_SECONDS: i64 = 30 * 60;

/// Scalar applied to the raw score when awarding points.
fn difficulty_multiplier(difficulty: &str) -> f64 {
    match difficulty {
        "hard" => 2.0,
        "medium" => 1.5,
        _ => 1.0,
    }
}

/// Helper struct for resolving a category together with its type.
#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    type_id: i64,
    type_name: String,
}

/// Starts a new quiz session.
///
/// Samples 15 random questions matching the category/difficulty filter,
/// snapshots them into `quiz_questions` and fixes the expiry at
/// `started_at + 30 minutes`. The response carries each question's options
/// as an independently shuffled permutation of incorrect + correct answers;
/// the correct answer itself never leaves the server.
pub async fn start_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let difficulty = payload.difficulty.unwrap_or_else(|| "medium".to_string());
    if !["easy", "medium", "hard", "any"].contains(&difficulty.as_str()) {
        return Err(AppError::BadRequest("Invalid difficulty".to_string()));
    }

    let category = sqlx::query_as::<_, CategoryRow>(
        r#"
        SELECT c.id, c.name, c.type_id, t.name AS type_name
        FROM categories c
        JOIN question_types t ON t.id = c.type_id
        WHERE c.id = ?
        "#,
    )
    .bind(payload.category_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Category not found".to_string()))?;

    if let Some(type_id) = payload.type_id {
        if type_id != category.type_id {
            return Err(AppError::BadRequest(
                "Category does not belong to the selected type".to_string(),
            ));
        }
    }

    let with_difficulty = difficulty != "any";
    let filter = if with_difficulty {
        "WHERE category_id = ? AND difficulty = ?"
    } else {
        "WHERE category_id = ?"
    };

    let count_sql = format!("SELECT COUNT(*) FROM questions {filter}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(category.id);
    if with_difficulty {
        count_query = count_query.bind(&difficulty);
    }
    let available = count_query.fetch_one(&pool).await?;

    if available < QUIZ_QUESTION_COUNT {
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
    let mut sample_query = sqlx::query_as::<_, Question>(&sample_sql).bind(category.id);
    if with_difficulty {
        sample_query = sample_query.bind(&difficulty);
    }
    let questions = sample_query
        .bind(QUIZ_QUESTION_COUNT)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to sample questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let started_at = Utc::now();
    let expires_at = started_at + Duration::seconds(QUIZ_DURATION_SECONDS);

    let mut tx = pool.begin().await?;

    let quiz_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (user_id, category_id, category, quiz_type, difficulty,
                             total_questions, duration_seconds, started_at, expires_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(claims.user_id())
    .bind(category.id)
    .bind(&category.name)
    .bind(&category.type_name)
    .bind(&difficulty)
    .bind(questions.len() as i64)
    .bind(QUIZ_DURATION_SECONDS)
    .bind(started_at)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await?;

    for (position, q) in questions.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO quiz_questions (quiz_id, question_id, position, question,
                                        question_type, difficulty, correct_answer,
                                        incorrect_answers)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(quiz_id)
        .bind(q.id)
        .bind(position as i64)
        .bind(&q.question)
        .bind(&q.question_type)
        .bind(&q.difficulty)
        .bind(&q.correct_answer)
        .bind(&q.incorrect_answers)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        "User {} started quiz {} ({} / {})",
        claims.user_id(),
        quiz_id,
        category.name,
        difficulty
    );

    // Sanitized view: each question's options are shuffled independently and
    // the correct answer is never exposed on its own.
    let questions_for_user: Vec<serde_json::Value> = {
        let mut rng = rand::thread_rng();
        questions
            .iter()
            .map(|q| {
                let mut answers: Vec<String> = q.incorrect_answers.0.clone();
                answers.push(q.correct_answer.clone());
                answers.shuffle(&mut rng);
                json!({
                    "questionId": q.id,
                    "question": q.question,
                    "category": category.name,
                    "type": q.question_type,
                    "difficulty": q.difficulty,
                    "answers": answers,
                })
            })
            .collect()
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "quizId": quiz_id,
            "startedAt": started_at,
            "expiresAt": expires_at,
            "durationSeconds": QUIZ_DURATION_SECONDS,
            "serverTime": Utc::now(),
            "questions": questions_for_user,
        })),
    ))
}

/// Submits a quiz's answers and grades the session.
///
/// Accepts at most one submission per session: the quiz update is guarded by
/// `completed = 0` and runs in the same transaction as the owner's points
/// increment, so concurrent submits cannot double-credit points. An overdue
/// submission is still graded but the session is marked 'expired'.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, user_id, category_id, category, quiz_type, difficulty,
               total_questions, duration_seconds, started_at, expires_at,
               completed, completed_at, status, score, points_earned
        FROM quizzes
        WHERE id = ?
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound(format!(
        "Quiz not found with id of {quiz_id}"
    )))?;

    if quiz.user_id != user_id {
        return Err(AppError::AuthError(
            "Not authorized to access this quiz".to_string(),
        ));
    }

    if quiz.completed {
        return Err(AppError::BadRequest(
            "This quiz has already been submitted".to_string(),
        ));
    }

    let snapshots = sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT id, quiz_id, question_id, position, question, question_type,
               difficulty, correct_answer, incorrect_answers, user_answer, is_correct
        FROM quiz_questions
        WHERE quiz_id = ?
        ORDER BY position
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&mut *tx)
    .await?;

    // Canonical tagged payload only: answers keyed by question id. Entries
    // for ids outside this quiz are ignored.
    let answer_map: HashMap<i64, String> = payload
        .answers
        .into_iter()
        .filter_map(|a| a.answer.map(|ans| (a.question_id, ans)))
        .collect();

    let mut score: i64 = 0;
    let mut correct_answers: i64 = 0;
    let mut incorrect_answers: i64 = 0;
    let mut skipped: i64 = 0;
    let mut results = Vec::with_capacity(snapshots.len());

    for snapshot in &snapshots {
        let user_answer: Option<String> = answer_map
            .get(&snapshot.question_id)
            .filter(|a| !a.is_empty())
            .cloned();

        let is_correct = match &user_answer {
            // Skipped: neither correct nor incorrect.
            None => {
                skipped += 1;
                None
            }
            Some(answer) => {
                let correct = *answer == snapshot.correct_answer;
                if correct {
                    score += 1;
                    correct_answers += 1;
                } else {
                    incorrect_answers += 1;
                }
                Some(correct)
            }
        };

        sqlx::query("UPDATE quiz_questions SET user_answer = ?, is_correct = ? WHERE id = ?")
            .bind(user_answer.clone())
            .bind(is_correct)
            .bind(snapshot.id)
            .execute(&mut *tx)
            .await?;

        results.push(json!({
            "questionId": snapshot.question_id,
            "question": snapshot.question,
            "correctAnswer": snapshot.correct_answer,
            "userAnswer": user_answer,
            "isCorrect": is_correct.unwrap_or(false),
        }));
    }

    let status = if now > quiz.expires_at {
        "expired"
    } else {
        "completed"
    };

    let percentage = if quiz.total_questions > 0 {
        ((score as f64 / quiz.total_questions as f64) * 100.0).round() as i64
    } else {
        0
    };

    let points_earned =
        (score as f64 * 10.0 * difficulty_multiplier(&quiz.difficulty)).round() as i64;

    // Guarded update: a concurrent submit that lost the race sees zero rows
    // affected and the whole transaction rolls back.
    let updated = sqlx::query(
        r#"
        UPDATE quizzes
        SET score = ?, points_earned = ?, completed = 1, completed_at = ?, status = ?
        WHERE id = ? AND completed = 0
        "#,
    )
    .bind(score)
    .bind(points_earned)
    .bind(now)
    .bind(status)
    .bind(quiz_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::BadRequest(
            "This quiz has already been submitted".to_string(),
        ));
    }

    sqlx::query("UPDATE users SET points = points + ? WHERE id = ?")
        .bind(points_earned)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        "User {} submitted quiz {}: {}/{} ({} points, {})",
        user_id,
        quiz_id,
        score,
        quiz.total_questions,
        points_earned,
        status
    );

    Ok(Json(json!({
        "success": true,
        "quizId": quiz_id,
        "score": score,
        "total": quiz.total_questions,
        "percentage": percentage,
        "correctAnswers": correct_answers,
        "incorrectAnswers": incorrect_answers,
        "skipped": skipped,
        "status": status,
        "pointsEarned": points_earned,
        "results": results,
    })))
}

/// Lists the caller's past quiz sessions, most recently completed first.
/// Summary fields only; question snapshots are not included.
pub async fn get_history(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, user_id, category_id, category, quiz_type, difficulty,
               total_questions, duration_seconds, started_at, expires_at,
               completed, completed_at, status, score, points_earned
        FROM quizzes
        WHERE user_id = ?
        ORDER BY completed_at DESC, started_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    let data: Vec<serde_json::Value> = quizzes.iter().map(quiz_summary).collect();

    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

/// Returns one quiz session in full, owner only.
///
/// For a session that has not been submitted yet the answer key is withheld:
/// questions come back without `correct_answer` or grading fields.
pub async fn get_result(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, user_id, category_id, category, quiz_type, difficulty,
               total_questions, duration_seconds, started_at, expires_at,
               completed, completed_at, status, score, points_earned
        FROM quizzes
        WHERE id = ?
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(format!(
        "Quiz not found with id of {quiz_id}"
    )))?;

    if quiz.user_id != claims.user_id() {
        return Err(AppError::AuthError(
            "Not authorized to access this quiz".to_string(),
        ));
    }

    let snapshots = sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT id, quiz_id, question_id, position, question, question_type,
               difficulty, correct_answer, incorrect_answers, user_answer, is_correct
        FROM quiz_questions
        WHERE quiz_id = ?
        ORDER BY position
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    let questions: Vec<serde_json::Value> = snapshots
        .iter()
        .map(|q| {
            if quiz.completed {
                json!({
                    "questionId": q.question_id,
                    "question": q.question,
                    "type": q.question_type,
                    "difficulty": q.difficulty,
                    "correctAnswer": q.correct_answer,
                    "incorrectAnswers": q.incorrect_answers.0,
                    "userAnswer": q.user_answer,
                    "isCorrect": q.is_correct,
                })
            } else {
                json!({
                    "questionId": q.question_id,
                    "question": q.question,
                    "type": q.question_type,
                    "difficulty": q.difficulty,
                })
            }
        })
        .collect();

    let mut data = quiz_summary(&quiz);
    data["durationSeconds"] = json!(quiz.duration_seconds);
    data["questions"] = json!(questions);

    Ok(Json(json!({
        "success": true,
        "data": data,
    })))
}

fn quiz_summary(quiz: &Quiz) -> serde_json::Value {
    json!({
        "id": quiz.id,
        "category": quiz.category,
        "quizType": quiz.quiz_type,
        "difficulty": quiz.difficulty,
        "totalQuestions": quiz.total_questions,
        "score": quiz.score,
        "pointsEarned": quiz.points_earned,
        "completed": quiz.completed,
        "status": quiz.status,
        "startedAt": quiz.started_at,
        "expiresAt": quiz.expires_at,
        "completedAt": quiz.completed_at,
    })
}
