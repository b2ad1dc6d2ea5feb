// tests/quiz_tests.rs
//
// End-to-end coverage of the quiz attempt lifecycle: sampling, submission
// grading, the terminal completed state, and the history/performance views.

use std::collections::HashSet;

use skillquiz_backend::{config::Config, routes, state::AppState};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

async fn spawn_app() -> String {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "quiz_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState { pool, config };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn test_pool() -> PgPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test DB")
}

/// Seeds a fresh skill with `count` questions, all keyed to 'A'.
async fn seed_skill(pool: &PgPool, count: usize) -> i64 {
    let name = format!("Skill {}", &uuid::Uuid::new_v4().to_string()[..8]);
    let skill_id: i64 = sqlx::query_scalar("INSERT INTO skills (name) VALUES ($1) RETURNING id")
        .bind(&name)
        .fetch_one(pool)
        .await
        .unwrap();

    for i in 0..count {
        sqlx::query(
            "INSERT INTO questions (skill_id, question_text, option_a, option_b, option_c, option_d, correct_answer) \
             VALUES ($1, $2, 'a', 'b', 'c', 'd', 'A')",
        )
        .bind(skill_id)
        .bind(format!("Question {}", i))
        .execute(pool)
        .await
        .unwrap();
    }

    skill_id
}

async fn register_and_login(client: &reqwest::Client, address: &str) -> String {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Register failed");

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .unwrap();

    login["data"]["token"].as_str().unwrap().to_string()
}

/// Starts a quiz and returns (attempt_id, sampled question ids).
async fn start_quiz(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    skill_id: i64,
    count: i64,
) -> (i64, Vec<i64>) {
    let body: serde_json::Value = client
        .post(format!("{}/api/quiz/start", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "skillId": skill_id, "questionCount": count }))
        .send()
        .await
        .expect("Start failed")
        .json()
        .await
        .unwrap();

    let attempt_id = body["data"]["attemptId"].as_i64().expect("No attemptId");
    let ids = body["data"]["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect();
    (attempt_id, ids)
}

/// Submits answers for the given (question_id, label) pairs and returns the body.
async fn submit_quiz(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    attempt_id: i64,
    answers: &[(i64, &str)],
) -> reqwest::Response {
    let answers: Vec<serde_json::Value> = answers
        .iter()
        .map(|(id, label)| serde_json::json!({ "questionId": id, "selectedAnswer": label }))
        .collect();

    client
        .post(format!("{}/api/quiz/submit", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "attemptId": attempt_id, "answers": answers }))
        .send()
        .await
        .expect("Submit failed")
}

#[tokio::test]
async fn start_returns_distinct_questions_without_answer_keys() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 10).await;
    let token = register_and_login(&client, &address).await;

    let body: serde_json::Value = client
        .post(format!("{}/api/quiz/start", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "skillId": skill_id, "questionCount": 5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["totalQuestions"], 5);
    assert_eq!(body["data"]["skill"]["id"], skill_id);

    let questions = body["data"]["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 5);

    let ids: HashSet<i64> = questions.iter().map(|q| q["id"].as_i64().unwrap()).collect();
    assert_eq!(ids.len(), 5, "sampled questions must be distinct");

    for q in questions {
        assert!(q.get("correctAnswer").is_none(), "answer key leaked");
        assert!(q["options"]["A"].is_string());
        assert!(q["options"]["D"].is_string());
    }
}

#[tokio::test]
async fn start_rejects_insufficient_bank() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 3).await;
    let token = register_and_login(&client, &address).await;

    let resp = client
        .post(format!("{}/api/quiz/start", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "skillId": skill_id, "questionCount": 10 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(
        body["message"].as_str().unwrap().contains("Only 3 questions"),
        "message must report the available count: {}",
        body["message"]
    );
}

#[tokio::test]
async fn start_rejects_out_of_range_count() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 5).await;
    let token = register_and_login(&client, &address).await;

    for bad_count in [0, 51] {
        let resp = client
            .post(format!("{}/api/quiz/start", address))
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({ "skillId": skill_id, "questionCount": bad_count }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
    }
}

#[tokio::test]
async fn start_unknown_skill_is_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;

    let resp = client
        .post(format!("{}/api/quiz/start", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "skillId": 99999999, "questionCount": 5 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn submit_scores_against_retained_answers() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 5).await;
    let token = register_and_login(&client, &address).await;

    let (attempt_id, ids) = start_quiz(&client, &address, &token, skill_id, 5).await;

    // 3 correct ('A'), 2 wrong ('B') out of 5 retained -> 60.0%
    let answers: Vec<(i64, &str)> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, if i < 3 { "A" } else { "B" }))
        .collect();

    let resp = submit_quiz(&client, &address, &token, attempt_id, &answers).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();

    assert_eq!(body["data"]["totalQuestions"], 5);
    assert_eq!(body["data"]["correctAnswers"], 3);
    assert_eq!(body["data"]["incorrectAnswers"], 2);
    assert_eq!(body["data"]["score"], 60.0);
    assert_eq!(body["data"]["percentage"], "60.0%");
    assert_eq!(body["data"]["passed"], false);
}

#[tokio::test]
async fn submit_accepts_lowercase_labels() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 2).await;
    let token = register_and_login(&client, &address).await;

    let (attempt_id, ids) = start_quiz(&client, &address, &token, skill_id, 2).await;
    let answers: Vec<(i64, &str)> = ids.iter().map(|id| (*id, "a")).collect();

    let resp = submit_quiz(&client, &address, &token, attempt_id, &answers).await;
    let body: serde_json::Value = resp.json().await.unwrap();

    assert_eq!(body["data"]["correctAnswers"], 2);
    assert_eq!(body["data"]["score"], 100.0);
    assert_eq!(body["data"]["passed"], true);
}

#[tokio::test]
async fn submit_silently_discards_invalid_answers() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 5).await;
    let token = register_and_login(&client, &address).await;

    let (attempt_id, ids) = start_quiz(&client, &address, &token, skill_id, 5).await;

    // 3 valid answers, one bogus label, one nonexistent question
    let answers = vec![
        (ids[0], "A"),
        (ids[1], "A"),
        (ids[2], "B"),
        (ids[3], "Z"),
        (99999999, "A"),
    ];

    let resp = submit_quiz(&client, &address, &token, attempt_id, &answers).await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();

    // Denominator is the retained count, not the sampled total
    assert_eq!(body["data"]["totalQuestions"], 3);
    assert_eq!(body["data"]["correctAnswers"], 2);
}

#[tokio::test]
async fn submit_empty_batch_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 3).await;
    let token = register_and_login(&client, &address).await;

    let (attempt_id, _ids) = start_quiz(&client, &address, &token, skill_id, 3).await;

    let resp = submit_quiz(&client, &address, &token, attempt_id, &[]).await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn submit_all_invalid_batch_is_rejected_not_zero_percent() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 3).await;
    let token = register_and_login(&client, &address).await;

    let (attempt_id, ids) = start_quiz(&client, &address, &token, skill_id, 3).await;

    let resp = submit_quiz(
        &client,
        &address,
        &token,
        attempt_id,
        &[(ids[0], "Z"), (99999999, "A")],
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);

    // The attempt is still in progress: a valid resubmission succeeds.
    let resp = submit_quiz(&client, &address, &token, attempt_id, &[(ids[0], "A")]).await;
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn resubmission_conflicts() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 3).await;
    let token = register_and_login(&client, &address).await;

    let (attempt_id, ids) = start_quiz(&client, &address, &token, skill_id, 3).await;
    let answers: Vec<(i64, &str)> = ids.iter().map(|id| (*id, "A")).collect();

    let first = submit_quiz(&client, &address, &token, attempt_id, &answers).await;
    assert_eq!(first.status().as_u16(), 200);

    let second = submit_quiz(&client, &address, &token, attempt_id, &answers).await;
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn foreign_attempt_is_forbidden() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 3).await;
    let owner_token = register_and_login(&client, &address).await;
    let other_token = register_and_login(&client, &address).await;

    let (attempt_id, ids) = start_quiz(&client, &address, &owner_token, skill_id, 3).await;

    let resp = submit_quiz(&client, &address, &other_token, attempt_id, &[(ids[0], "A")]).await;
    assert_eq!(resp.status().as_u16(), 403);

    let resp = client
        .get(format!("{}/api/quiz/results/{}", address, attempt_id))
        .header("Authorization", format!("Bearer {}", other_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn results_break_down_each_question() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 2).await;
    let token = register_and_login(&client, &address).await;

    let (attempt_id, ids) = start_quiz(&client, &address, &token, skill_id, 2).await;
    submit_quiz(
        &client,
        &address,
        &token,
        attempt_id,
        &[(ids[0], "A"), (ids[1], "C")],
    )
    .await;

    let body: serde_json::Value = client
        .get(format!("{}/api/quiz/results/{}", address, attempt_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["data"]["attemptId"], attempt_id);
    assert_eq!(body["data"]["correctAnswers"], 1);
    assert!(body["data"]["completedAt"].is_string());

    let questions = body["data"]["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    for q in questions {
        assert_eq!(q["correctAnswer"], "A");
        assert!(q["options"]["B"].is_string());
    }
    let verdicts: Vec<bool> = questions
        .iter()
        .map(|q| q["isCorrect"].as_bool().unwrap())
        .collect();
    assert_eq!(verdicts.iter().filter(|v| **v).count(), 1);
}

#[tokio::test]
async fn history_excludes_in_progress_and_paginates() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let skill_id = seed_skill(&pool, 3).await;
    let token = register_and_login(&client, &address).await;

    // Three completed attempts and one abandoned in-progress attempt
    for _ in 0..3 {
        let (attempt_id, ids) = start_quiz(&client, &address, &token, skill_id, 3).await;
        let answers: Vec<(i64, &str)> = ids.iter().map(|id| (*id, "A")).collect();
        submit_quiz(&client, &address, &token, attempt_id, &answers).await;
    }
    let (_abandoned, _ids) = start_quiz(&client, &address, &token, skill_id, 3).await;

    let body: serde_json::Value = client
        .get(format!("{}/api/quiz/history?page=1&limit=2", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let attempts = body["data"]["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(body["data"]["pagination"]["totalItems"], 3);
    assert_eq!(body["data"]["pagination"]["totalPages"], 2);
    assert_eq!(attempts[0]["percentage"], "100.0%");
    assert_eq!(attempts[0]["passed"], true);
}

#[tokio::test]
async fn performance_reports_trends_and_gaps() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let pool = test_pool().await;
    let weak_skill = seed_skill(&pool, 10).await;
    let strong_skill = seed_skill(&pool, 2).await;
    let token = register_and_login(&client, &address).await;

    // Weak skill: 50.0 then 80.0 -> improving, average 65.0 -> gap
    let (attempt_id, ids) = start_quiz(&client, &address, &token, weak_skill, 2).await;
    submit_quiz(
        &client,
        &address,
        &token,
        attempt_id,
        &[(ids[0], "A"), (ids[1], "B")],
    )
    .await;

    let (attempt_id, ids) = start_quiz(&client, &address, &token, weak_skill, 5).await;
    let answers: Vec<(i64, &str)> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, if i < 4 { "A" } else { "B" }))
        .collect();
    submit_quiz(&client, &address, &token, attempt_id, &answers).await;

    // Strong skill: one perfect attempt -> insufficient_data, no gap
    let (attempt_id, ids) = start_quiz(&client, &address, &token, strong_skill, 2).await;
    let answers: Vec<(i64, &str)> = ids.iter().map(|id| (*id, "A")).collect();
    submit_quiz(&client, &address, &token, attempt_id, &answers).await;

    let body: serde_json::Value = client
        .get(format!("{}/api/quiz/performance", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let overall = &body["data"]["overallStats"];
    assert_eq!(overall["totalAttempts"], 3);
    assert_eq!(overall["skillsAttempted"], 2);
    assert_eq!(overall["skillsNeedingImprovement"], 1);

    let by_skill = body["data"]["performanceBySkill"].as_array().unwrap();
    assert_eq!(by_skill.len(), 2);
    // Weakest skill first
    assert_eq!(by_skill[0]["skill"]["id"], weak_skill);
    assert_eq!(by_skill[0]["averageScore"], 65.0);
    assert_eq!(by_skill[0]["bestScore"], 80.0);
    assert_eq!(by_skill[0]["worstScore"], 50.0);
    assert_eq!(by_skill[0]["trend"], "improving");
    assert_eq!(by_skill[1]["skill"]["id"], strong_skill);
    assert_eq!(by_skill[1]["trend"], "insufficient_data");

    let gaps = body["data"]["skillGaps"].as_array().unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0]["skill"]["id"], weak_skill);

    let recommendations = body["data"]["recommendations"].as_str().unwrap();
    assert!(recommendations.starts_with("Focus on improving: "));

    // Window filter: everything above happened within the last week
    let windowed: serde_json::Value = client
        .get(format!("{}/api/quiz/performance?timePeriod=week", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(windowed["data"]["timePeriod"], "week");
    assert_eq!(windowed["data"]["overallStats"]["totalAttempts"], 3);
}
