mod common;

use sqlx::PgPool;

use common::{create_user, spawn_app};

#[sqlx::test]
async fn find_match_then_cancel_allows_requeue(pool: PgPool) {
    let address = spawn_app(pool.clone()).await;
    let client = reqwest::Client::new();
    let (_, token) = create_user(&pool, "solo_player", 1000).await;

    let response = client
        .post(format!("{address}/match/find"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "queued");

    // Calling find again while still queued is a no-op, not an error.
    let response = client
        .post(format!("{address}/match/find"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("request failed");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "already_queued");

    let response = client
        .post(format!("{address}/match/cancel_find"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("request failed");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "removed");

    let response = client
        .post(format!("{address}/match/cancel_find"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("request failed");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "not_present");

    // Having left the queue, the user is eligible again.
    let response = client
        .post(format!("{address}/match/find"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("request failed");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "queued");
}

#[sqlx::test]
async fn unauthenticated_find_is_rejected(pool: PgPool) {
    let address = spawn_app(pool).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{address}/match/find"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[sqlx::test]
async fn active_match_query_404s_with_no_match(pool: PgPool) {
    let address = spawn_app(pool.clone()).await;
    let client = reqwest::Client::new();
    let (_, token) = create_user(&pool, "idle_player", 1000).await;

    let response = client
        .get(format!("{address}/match/active"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
