#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::{SystemTime, UNIX_EPOCH};

use duelcore::services::queue_store::InMemoryQueueStore;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use sqlx::PgPool;
use tokio::net::TcpListener;
use uuid::Uuid;

pub fn init_tracing_once() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("duelcore=debug")
            .with_test_writer()
            .init();
    });
}

/// Spawns the application against an in-memory queue store (no live Redis
/// required for tests) and a mock judge that always returns `verdict`.
///
/// Returned address format: `http://127.0.0.1:8492`
pub async fn spawn_app(test_db_pool: PgPool) -> String {
    spawn_app_with_verdict(test_db_pool, true).await
}

pub async fn spawn_app_with_verdict(test_db_pool: PgPool, verdict: bool) -> String {
    dotenvy::from_filename_override("tests/data/.test.env").unwrap();
    init_tracing_once();

    let judge = Arc::new(duelcore::services::judge::LogJudgeClient { verdict });
    let queue_store = Arc::new(InMemoryQueueStore::new());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port at localhost");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let app = duelcore::app_with_collaborators(test_db_pool, Some(judge), Some(queue_store))
            .await;
        axum::serve(listener, app).await.unwrap();
    });

    let address = format!("http://127.0.0.1:{port}");

    let client = reqwest::Client::new();
    for _ in 0..10 {
        if client
            .get(format!("{address}/health-check"))
            .send()
            .await
            .is_ok()
        {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    address
}

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    jti: String,
    exp: u64,
    iat: u64,
}

/// Signs an access token for `user_id` with the test fixture's `JWT_SECRET`,
/// the way an external auth collaborator would.
pub fn access_token_for(user_id: Uuid) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = TestClaims {
        sub: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        exp: now + 3600,
        iat: now,
    };

    let encoding_key = EncodingKey::from_secret(b"test-secret-do-not-use-in-production");
    encode(&Header::default(), &claims, &encoding_key).expect("failed to sign test token")
}

/// Inserts a user row directly (bypassing the out-of-scope registration
/// collaborator) and returns its id and access token.
pub async fn create_user(pool: &PgPool, username: &str, rating: i32) -> (Uuid, String) {
    let row = sqlx::query!(
        "INSERT INTO users (username, rating) VALUES ($1, $2) RETURNING id",
        username,
        rating
    )
    .fetch_one(pool)
    .await
    .expect("failed to insert test user");

    let token = access_token_for(row.id);
    (row.id, token)
}

pub async fn create_problem(pool: &PgPool, rating: i32) -> i64 {
    let row = sqlx::query!(
        "INSERT INTO problems (rating) VALUES ($1) RETURNING id",
        rating
    )
    .fetch_one(pool)
    .await
    .expect("failed to insert test problem");
    row.id
}
