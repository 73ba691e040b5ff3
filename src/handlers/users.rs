// src/handlers/users.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{LeaderboardEntry, UpdatePasswordRequest, UpdateProfileRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Helper struct for leaderboard rows before ranks are assigned.
#[derive(sqlx::FromRow)]
struct RankedUser {
    id: i64,
    name: String,
    points: i64,
}

/// Returns every user ranked by points.
///
/// Total order: points descending, ties broken by name ascending then id.
/// Ranks are 1-based; the caller's own rank is reported separately.
/// Full collection scan, no pagination.
pub async fn get_leaderboard(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, RankedUser>(
        r#"
        SELECT id, name, points
        FROM users
        ORDER BY points DESC, name ASC, id ASC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let current_user_id = claims.user_id();
    let mut current_user_rank: Option<i64> = None;

    let leaderboard: Vec<LeaderboardEntry> = users
        .into_iter()
        .enumerate()
        .map(|(index, u)| {
            let rank = index as i64 + 1;
            if u.id == current_user_id {
                current_user_rank = Some(rank);
            }
            LeaderboardEntry {
                rank,
                id: u.id,
                name: u.name,
                points: u.points,
            }
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "leaderboard": leaderboard,
            "currentUserRank": current_user_rank,
        }
    })))
}

/// Current user's profile.
pub async fn get_profile(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user(&pool, claims.user_id()).await?;

    Ok(Json(json!({
        "success": true,
        "data": user,
    })))
}

/// Updates the current user's name and/or email.
pub async fn update_profile(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();

    if let Some(name) = &payload.name {
        sqlx::query("UPDATE users SET name = ? WHERE id = ?")
            .bind(name)
            .bind(user_id)
            .execute(&pool)
            .await?;
    }

    if let Some(email) = &payload.email {
        sqlx::query("UPDATE users SET email = ? WHERE id = ?")
            .bind(email.to_lowercase())
            .bind(user_id)
            .execute(&pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict("User already exists with this email".to_string())
                } else {
                    AppError::from(e)
                }
            })?;
    }

    let user = fetch_user(&pool, user_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": user,
    })))
}

/// Changes the current user's password and re-issues a token.
pub async fn update_password(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = fetch_user(&pool, claims.user_id()).await?;

    if !verify_password(&payload.current_password, &user.password)? {
        return Err(AppError::AuthError("Password is incorrect".to_string()));
    }

    let hashed_password = hash_password(&payload.new_password)?;

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(&hashed_password)
        .bind(user.id)
        .execute(&pool)
        .await?;

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "success": true,
        "token": token,
    })))
}

async fn fetch_user(pool: &SqlitePool, user_id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, points, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))
}
