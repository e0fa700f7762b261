use axum::http::StatusCode;
use serde_json::json;

mod common;

fn submit_body(user: &str, answer: &str) -> serde_json::Value {
    json!({"userId": user, "answer": answer, "language": "en", "lessonId": "basic-1"})
}

async fn force_miss_first_question(app: &axum::Router, user: &str) {
    let start = json!({"userId": user, "language": "en", "lessonId": "basic-1"});
    common::post_json(app, "/lesson/start", start).await;
    for _ in 0..4 {
        common::post_json(app, "/lesson/submit", submit_body(user, "nope")).await;
    }
}

#[tokio::test]
async fn forced_advance_queues_review_item() {
    let app = common::create_test_app().await;
    force_miss_first_question(&app, "u1").await;

    let (status, body) =
        common::get_json(&app, "/review/suggest?userId=u1&language=en").await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["itemId"], "basic-1__qq1");
    assert_eq!(items[0]["lessonId"], "basic-1");
    assert_eq!(items[0]["questionId"], "q1");
    assert_eq!(items[0]["lastOutcome"], "forced");
    assert_eq!(items[0]["mistakeCount"], 4);
}

#[tokio::test]
async fn suggest_is_empty_for_unknown_user() {
    let app = common::create_test_app().await;

    let (status, body) =
        common::get_json(&app, "/review/suggest?userId=ghost&language=en").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn correct_reviews_raise_confidence_until_item_is_removed() {
    let app = common::create_test_app().await;
    force_miss_first_question(&app, "u1").await;

    let review = json!({
        "userId": "u1", "language": "en",
        "itemId": "basic-1__qq1", "answer": "Hello"
    });

    let mut previous = 0.0f64;
    let mut removed = false;
    for _ in 0..8 {
        let (status, body) = common::post_json(&app, "/review/submit", review.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["evaluation"]["result"], "correct");
        let confidence = body["confidence"].as_f64().unwrap();
        assert!(confidence >= previous, "confidence decreased on correct review");
        previous = confidence;
        if body["removed"] == true {
            removed = true;
            break;
        }
    }
    assert!(removed, "item never reached the mastery threshold");
    assert!(previous >= 0.8);

    // Once mastered the item is gone from the queue.
    let (status, body) = common::post_json(&app, "/review/submit", review).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn submitting_unknown_review_item_is_not_found() {
    let app = common::create_test_app().await;
    force_miss_first_question(&app, "u1").await;

    let (status, _) = common::post_json(
        &app,
        "/review/submit",
        json!({"userId": "u1", "language": "en", "itemId": "basic-1__qq9", "answer": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generate_review_requires_items() {
    let app = common::create_test_app().await;

    let (status, body) = common::post_json(
        &app,
        "/practice/generateReview",
        json!({"userId": "u1", "language": "en", "items": []}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = common::post_json(
        &app,
        "/practice/generateReview",
        json!({"userId": "u1", "language": "en"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generate_review_caps_processing_at_two_items() {
    let app = common::create_test_app().await;

    let (status, body) = common::post_json(
        &app,
        "/practice/generateReview",
        json!({"userId": "u1", "language": "en", "items": [
            {"lessonId": "basic-1", "questionId": "q1"},
            {"lessonId": "basic-1", "questionId": "q2"},
            {"lessonId": "basic-1", "questionId": "q3"}
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let practice = body["practice"].as_array().unwrap();
    assert_eq!(practice.len(), 2);
    // Mock mode: items come from the deterministic fallback generator.
    for item in practice {
        assert!(item["practiceId"].as_str().unwrap().starts_with("fallback-"));
        assert_eq!(item["language"], "en");
        assert_eq!(item["lessonId"], "basic-1");
        assert!(!item["expectedAnswerRaw"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn generate_review_skips_unknown_refs() {
    let app = common::create_test_app().await;

    let (status, body) = common::post_json(
        &app,
        "/practice/generateReview",
        json!({"userId": "u1", "language": "en", "items": [
            {"lessonId": "no-such-lesson", "questionId": "q1"},
            {"lessonId": "basic-1", "questionId": "q1"}
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["practice"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn profile_snapshot_lists_due_review() {
    let app = common::create_test_app().await;
    force_miss_first_question(&app, "u1").await;

    let (status, body) = common::get_json(&app, "/profile/u1?language=en").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["userId"], "u1");
    assert!(body["profile"]["reviewItems"]["basic-1__qq1"].is_object());
    let due = body["dueReview"].as_array().unwrap();
    assert_eq!(due.len(), 1);
    assert!(due.len() <= 5);

    let (status, body) = common::get_json(&app, "/profile/u1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn restart_clears_review_projection() {
    let app = common::create_test_app().await;
    force_miss_first_question(&app, "u1").await;

    let (_, body) = common::get_json(&app, "/review/suggest?userId=u1&language=en").await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, _) = common::post_json(
        &app,
        "/lesson/restart",
        json!({"userId": "u1", "language": "en", "lessonId": "basic-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = common::get_json(&app, "/review/suggest?userId=u1&language=en").await;
    assert!(body["items"].as_array().unwrap().is_empty());
}
