// tests/api_tests.rs

use quiz_app_api::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Each test gets its own in-memory SQLite database.
/// Returns the base URL (e.g., "http://127.0.0.1:12345") and the pool for
/// direct seeding.
async fn spawn_app() -> (String, SqlitePool) {
    // 1. Create a single-connection in-memory pool
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

/// Registers a fresh user and returns (token, email).
async fn register_user(client: &reqwest::Client, address: &str) -> (String, String) {
    let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(&format!("{}/api/v1/auth/register", address))
        .json(&serde_json::json!({
            "name": "Test User",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse register json");

    let token = response["token"].as_str().expect("Token not found").to_string();
    (token, email)
}

/// Seeds one type + one category and returns (type_id, category_id).
async fn seed_category(pool: &SqlitePool, type_name: &str, category_name: &str) -> (i64, i64) {
    let type_id: i64 =
        sqlx::query_scalar("INSERT INTO question_types (name) VALUES (?) RETURNING id")
            .bind(type_name)
            .fetch_one(pool)
            .await
            .unwrap();

    let category_id: i64 =
        sqlx::query_scalar("INSERT INTO categories (type_id, name) VALUES (?, ?) RETURNING id")
            .bind(type_id)
            .bind(category_name)
            .fetch_one(pool)
            .await
            .unwrap();

    (type_id, category_id)
}

/// Seeds `count` multiple-choice questions of the given difficulty.
async fn seed_questions(pool: &SqlitePool, category_id: i64, difficulty: &str, count: i64) {
    for i in 0..count {
        sqlx::query(
            r#"
            INSERT INTO questions (category_id, question, question_type, difficulty,
                                   correct_answer, incorrect_answers)
            VALUES (?, ?, 'multiple', ?, ?, ?)
            "#,
        )
        .bind(category_id)
        .bind(format!("Question {} ({})", i, difficulty))
        .bind(difficulty)
        .bind(format!("Right {}", i))
        .bind(serde_json::json!(["Wrong A", "Wrong B", "Wrong C"]).to_string())
        .execute(pool)
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn unknown_route_404() {
    // Arrange
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    // Arrange
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let email = format!("u_{}@Example.COM", &uuid::Uuid::new_v4().to_string()[..8]);

    // Act
    let response = client
        .post(&format!("{}/api/v1/auth/register", address))
        .json(&serde_json::json!({
            "name": "Alice",
            "email": email,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().is_some());
    // Emails are stored lowercase
    assert_eq!(body["data"]["email"], email.to_lowercase());
    assert_eq!(body["data"]["role"], "user");
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: invalid email
    let response = client
        .post(&format!("{}/api/v1/auth/register", address))
        .json(&serde_json::json!({
            "name": "Bob",
            "email": "not-an-email",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn register_duplicate_email_conflicts() {
    // Arrange
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);
    let payload = serde_json::json!({
        "name": "Carol",
        "email": email,
        "password": "password123"
    });

    client
        .post(&format!("{}/api/v1/auth/register", address))
        .json(&payload)
        .send()
        .await
        .expect("First register failed");

    // Act
    let response = client
        .post(&format!("{}/api/v1/auth/register", address))
        .json(&payload)
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    // Arrange
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_token, email) = register_user(&client, &address).await;

    // Act
    let ok = client
        .post(&format!("{}/api/v1/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap();
    let bad = client
        .post(&format!("{}/api/v1/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "wrong_password" }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(ok.status().as_u16(), 200);
    assert_eq!(bad.status().as_u16(), 401);
}

#[tokio::test]
async fn me_requires_token() {
    // Arrange
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, email) = register_user(&client, &address).await;

    // Act
    let without = client
        .get(&format!("{}/api/v1/auth/me", address))
        .send()
        .await
        .unwrap();
    let with = client
        .get(&format!("{}/api/v1/auth/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(without.status().as_u16(), 401);
    assert_eq!(with.status().as_u16(), 200);
    let body: serde_json::Value = with.json().await.unwrap();
    assert_eq!(body["data"]["email"], email);
    assert_eq!(body["data"]["points"], 0);
}

#[tokio::test]
async fn category_counts_split_by_difficulty() {
    // Arrange: 5 easy, 3 medium, 2 hard
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_type_id, category_id) = seed_category(&pool, "Academic", "History").await;
    seed_questions(&pool, category_id, "easy", 5).await;
    seed_questions(&pool, category_id, "medium", 3).await;
    seed_questions(&pool, category_id, "hard", 2).await;

    // Act
    let response = client
        .get(&format!("{}/api/v1/questions/count/{}", address, category_id))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total_question_count"], 10);
    assert_eq!(body["data"]["total_easy_question_count"], 5);
    assert_eq!(body["data"]["total_medium_question_count"], 3);
    assert_eq!(body["data"]["total_hard_question_count"], 2);
}

#[tokio::test]
async fn category_counts_unknown_category_reports_zeros() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/v1/questions/count/99999", address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["total_question_count"], 0);
}

#[tokio::test]
async fn types_and_categories_carry_question_counts() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (type_id, category_id) = seed_category(&pool, "Academic", "History").await;
    let (_other_type_id, other_category_id) = seed_category(&pool, "Entertainment", "Film").await;
    seed_questions(&pool, category_id, "easy", 4).await;
    seed_questions(&pool, other_category_id, "hard", 2).await;

    // Act
    let types: serde_json::Value = client
        .get(&format!("{}/api/v1/questions/types", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let filtered: serde_json::Value = client
        .get(&format!(
            "{}/api/v1/questions/categories?typeId={}",
            address, type_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert: types sorted by name, counts aggregated per type
    let type_list = types["data"].as_array().unwrap();
    assert_eq!(type_list.len(), 2);
    assert_eq!(type_list[0]["name"], "Academic");
    assert_eq!(type_list[0]["question_count"], 4);
    assert_eq!(type_list[1]["name"], "Entertainment");
    assert_eq!(type_list[1]["question_count"], 2);

    // Filtered categories only include the requested type
    let category_list = filtered["data"].as_array().unwrap();
    assert_eq!(category_list.len(), 1);
    assert_eq!(category_list[0]["name"], "History");
    assert_eq!(category_list[0]["type"], "Academic");
    assert_eq!(category_list[0]["question_count"], 4);
}

#[tokio::test]
async fn practice_sampling_respects_amount() {
    // Arrange
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_type_id, category_id) = seed_category(&pool, "Academic", "History").await;
    seed_questions(&pool, category_id, "easy", 8).await;

    // Act: 5 of 8 available
    let ok = client
        .get(&format!(
            "{}/api/v1/questions/?categoryId={}&difficulty=easy&amount=5",
            address, category_id
        ))
        .send()
        .await
        .unwrap();

    // More than available
    let too_many = client
        .get(&format!(
            "{}/api/v1/questions/?categoryId={}&amount=20",
            address, category_id
        ))
        .send()
        .await
        .unwrap();

    // Out of range
    let zero = client
        .get(&format!("{}/api/v1/questions/?amount=0", address))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(ok.status().as_u16(), 200);
    let body: serde_json::Value = ok.json().await.unwrap();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 5);
    // Practice mode exposes the full document, answer included
    assert!(data[0]["correct_answer"].as_str().is_some());

    assert_eq!(too_many.status().as_u16(), 404);
    assert_eq!(zero.status().as_u16(), 400);
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    // Arrange
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _email) = register_user(&client, &address).await;

    // Act
    let response = client
        .post(&format!("{}/api/v1/admin/types", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "name": "Academic" }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn admin_can_seed_the_question_bank() {
    // Arrange: promote a registered user to admin directly in the database
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_token, email) = register_user(&client, &address).await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE email = ?")
        .bind(&email)
        .execute(&pool)
        .await
        .unwrap();

    // Re-login to pick up the admin role in the token
    let login: serde_json::Value = client
        .post(&format!("{}/api/v1/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = login["token"].as_str().unwrap();

    // Act: type -> category -> question
    let type_resp: serde_json::Value = client
        .post(&format!("{}/api/v1/admin/types", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "name": "Academic" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let type_id = type_resp["data"]["id"].as_i64().unwrap();

    let category_resp: serde_json::Value = client
        .post(&format!("{}/api/v1/admin/categories", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "typeId": type_id, "name": "History" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let category_id = category_resp["data"]["id"].as_i64().unwrap();

    let question_resp = client
        .post(&format!("{}/api/v1/admin/questions", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "categoryId": category_id,
            "question": "In which year did World War II end?",
            "difficulty": "easy",
            "correctAnswer": "1945",
            "incorrectAnswers": ["1944", "1946", "1939"],
            "explanation": "Japan surrendered in September 1945."
        }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(question_resp.status().as_u16(), 201);

    // Duplicate type conflicts
    let duplicate = client
        .post(&format!("{}/api/v1/admin/types", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "name": "Academic" }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status().as_u16(), 409);
}
