//! End-to-end plan request workflow:
//! submit -> assign -> draft -> publish -> daily tasks -> progress

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{draft_for, intake, TestApp, TestUser};
use helix_backend::repositories::TaskStore;
use helix_shared::Role;
use serde_json::{json, Value};

struct Cast {
    admin: TestUser,
    doctor: TestUser,
    client: TestUser,
}

async fn cast(app: &TestApp) -> Cast {
    Cast {
        admin: app.seed_user("Admin", Role::Admin).await,
        doctor: app.seed_user("Doctor", Role::Doctor).await,
        client: app.subscribed_client("Client").await,
    }
}

async fn submit(app: &TestApp, client: &TestUser) -> String {
    let (status, body) = app.post("/api/v1/requests", &client.token, intake()).await;
    assert_eq!(status, StatusCode::CREATED, "submit failed: {}", body);
    body["id"].as_str().unwrap().to_string()
}

async fn assign(app: &TestApp, cast: &Cast, id: &str) -> (StatusCode, Value) {
    app.put(
        &format!("/api/v1/requests/{}/assign", id),
        &cast.admin.token,
        json!({ "doctorId": cast.doctor.id }),
    )
    .await
}

async fn draft(app: &TestApp, doctor: &TestUser, id: &str, tasks: Value) -> (StatusCode, Value) {
    app.put(
        &format!("/api/v1/requests/{}/draft", id),
        &doctor.token,
        json!({ "tasks": tasks }),
    )
    .await
}

async fn publish(app: &TestApp, admin: &TestUser, id: &str, body: Value) -> (StatusCode, Value) {
    app.post(&format!("/api/v1/requests/{}/publish", id), &admin.token, body)
        .await
}

#[tokio::test]
async fn test_full_workflow() {
    let app = TestApp::new().await;
    let cast = cast(&app).await;
    let today = Utc::now().date_naive();

    let id = submit(&app, &cast.client).await;
    let (_, request) = app.get(&format!("/api/v1/requests/{}", id), &cast.client.token).await;
    assert_eq!(request["status"], "REQUESTED");
    assert_eq!(request["goals"], "Lose 5 kg before summer");
    assert_eq!(request["clientName"], "Client");

    let (status, request) = assign(&app, &cast, &id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["status"], "PROCESSING");
    assert_eq!(request["doctorName"], "Doctor");

    let (status, request) = draft(&app, &cast.doctor, &id, draft_for(today)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["status"], "PENDING_APPROVAL");
    assert_eq!(request["draftTasks"].as_array().unwrap().len(), 2);

    let (status, published) = publish(&app, &cast.admin, &id, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["success"], true);
    assert_eq!(published["tasksCreated"], 2);
    assert_eq!(published["request"]["status"], "ACTIVE");
    assert!(published["request"]["draftTasks"].as_array().unwrap().is_empty());

    let (status, tasks) = app.get("/api/v1/tasks", &cast.client.token).await;
    assert_eq!(status, StatusCode::OK);
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t["status"] == "PENDING"));
    assert_eq!(tasks[0]["time"], "08:00 AM");

    let task_id = tasks[0]["id"].as_str().unwrap();
    let (status, toggled) = app
        .put(&format!("/api/v1/tasks/{}/toggle", task_id), &cast.client.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["status"], "COMPLETED");

    let (status, stats) = app
        .get(&format!("/api/v1/stats/{}?range=week", cast.client.id), &cast.client.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let stats = stats.as_array().unwrap();
    assert_eq!(stats.len(), 7);
    let last = &stats[6];
    assert_eq!(last["completed"], 1);
    assert_eq!(last["total"], 2);
    assert_eq!(last["rate"], 50);

    // The client may open a new request once the previous one is active
    submit(&app, &cast.client).await;
}

#[tokio::test]
async fn test_submit_requires_live_subscription() {
    let app = TestApp::new().await;
    let client = app.register_client("NoPlan").await;

    let (status, body) = app.post("/api/v1/requests", &client.token, intake()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "SUBSCRIPTION_REQUIRED");

    let admin = app.seed_user("Admin", Role::Admin).await;
    let package_id = app.first_package_id().await;
    app.put(
        &format!("/api/v1/users/{}", client.id),
        &admin.token,
        json!({ "packageId": package_id, "packageEndDate": "2020-01-01T00:00:00Z" }),
    )
    .await;

    let (status, body) = app.post("/api/v1/requests", &client.token, intake()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "SUBSCRIPTION_EXPIRED");
}

#[tokio::test]
async fn test_one_open_request_per_client() {
    let app = TestApp::new().await;
    let client = app.subscribed_client("Client").await;

    submit(&app, &client).await;
    let (status, body) = app.post("/api/v1/requests", &client.token, intake()).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "OPEN_REQUEST_EXISTS");
}

#[tokio::test]
async fn test_intake_errors_are_reported_per_field() {
    let app = TestApp::new().await;
    let client = app.subscribed_client("Client").await;

    let (status, body) = app
        .post(
            "/api/v1/requests",
            &client.token,
            json!({ "goals": "", "age": 400, "currentWeight": 80.0 }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["error"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"goals"));
    assert!(fields.contains(&"age"));
}

#[tokio::test]
async fn test_transitions_out_of_order_are_rejected() {
    let app = TestApp::new().await;
    let cast = cast(&app).await;
    let today = Utc::now().date_naive();
    let id = submit(&app, &cast.client).await;

    // REQUESTED: no draft, no publish
    let (status, body) = draft(&app, &cast.doctor, &id, draft_for(today)).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
    let (status, body) = publish(&app, &cast.admin, &id, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    // PROCESSING: reassignment allowed, publish not
    assign(&app, &cast, &id).await;
    let (status, _) = assign(&app, &cast, &id).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = publish(&app, &cast.admin, &id, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // PENDING_APPROVAL: no reassignment, no second draft
    draft(&app, &cast.doctor, &id, draft_for(today)).await;
    let (status, body) = assign(&app, &cast, &id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
    let (status, _) = draft(&app, &cast.doctor, &id, draft_for(today)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // ACTIVE is terminal
    publish(&app, &cast.admin, &id, json!({})).await;
    let (status, _) = assign(&app, &cast, &id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = publish(&app, &cast.admin, &id, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_only_assigned_doctor_drafts() {
    let app = TestApp::new().await;
    let cast = cast(&app).await;
    let other = app.seed_user("Other", Role::Doctor).await;
    let id = submit(&app, &cast.client).await;
    assign(&app, &cast, &id).await;

    let (status, _) = draft(&app, &other, &id, draft_for(Utc::now().date_naive())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&format!("/api/v1/requests/{}", id), &other.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, listed) = app.get("/api/v1/requests", &other.token).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_publish_override_replaces_draft() {
    let app = TestApp::new().await;
    let cast = cast(&app).await;
    let today = Utc::now().date_naive();
    let id = submit(&app, &cast.client).await;
    assign(&app, &cast, &id).await;
    draft(&app, &cast.doctor, &id, draft_for(today)).await;

    let edited = json!([
        { "date": today, "title": "Edited lunch", "type": "MEAL", "time": "12:30 PM" },
        { "date": today + Duration::days(1), "title": "Sleep early", "type": "ACTIVITY" },
        { "date": today + Duration::days(1), "title": "Vitamin D", "type": "ACTIVITY" },
    ]);
    let (status, published) = publish(&app, &cast.admin, &id, json!({ "draftTasks": edited })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["tasksCreated"], 3);

    let (_, tasks) = app
        .get(&format!("/api/v1/tasks?date={}", today), &cast.client.token)
        .await;
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Edited lunch");
}

#[tokio::test]
async fn test_publish_without_body_uses_stored_draft() {
    let app = TestApp::new().await;
    let cast = cast(&app).await;
    let id = submit(&app, &cast.client).await;
    assign(&app, &cast, &id).await;
    draft(&app, &cast.doctor, &id, draft_for(Utc::now().date_naive())).await;

    let (status, published) = app
        .request(
            "POST",
            &format!("/api/v1/requests/{}/publish", id),
            Some(&cast.admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "publish failed: {}", published);
    assert_eq!(published["tasksCreated"], 2);
    assert_eq!(published["request"]["status"], "ACTIVE");
}

#[tokio::test]
async fn test_week_long_draft_publishes_every_task() {
    let app = TestApp::new().await;
    let cast = cast(&app).await;
    let today = Utc::now().date_naive();
    let id = submit(&app, &cast.client).await;
    assign(&app, &cast, &id).await;

    let week: Vec<Value> = (0..7)
        .flat_map(|day| {
            let date = today - Duration::days(6 - day);
            [
                json!({ "date": date, "title": format!("Breakfast {}", day), "type": "MEAL",
                        "time": "08:00 AM", "calories": 400 }),
                json!({ "date": date, "title": format!("Walk {}", day), "type": "ACTIVITY",
                        "time": "12:00 PM" }),
                json!({ "date": date, "title": format!("Dinner {}", day), "type": "MEAL",
                        "time": "07:00 PM", "calories": 600 }),
            ]
        })
        .collect();
    assert_eq!(week.len(), 21);
    let (status, _) = draft(&app, &cast.doctor, &id, Value::Array(week)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, published) = publish(&app, &cast.admin, &id, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["tasksCreated"], 21);
    assert_eq!(published["request"]["status"], "ACTIVE");
    assert!(published["request"]["draftTasks"].as_array().unwrap().is_empty());

    let stored = app.store.list_tasks(cast.client.id, None).await.unwrap();
    assert_eq!(stored.len(), 21);
    let first_day: Vec<&str> = stored.iter().take(3).map(|t| t.title.as_str()).collect();
    assert_eq!(first_day, ["Breakfast 0", "Walk 0", "Dinner 0"]);

    let (status, body) = publish(&app, &cast.admin, &id, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
    assert_eq!(app.store.list_tasks(cast.client.id, None).await.unwrap().len(), 21);

    let (status, stats) = app
        .get(&format!("/api/v1/stats/{}?range=month", cast.client.id), &cast.client.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let stats = stats.as_array().unwrap();
    assert_eq!(stats.len(), 30);
    assert!(stats[..23].iter().all(|day| day["total"] == 0));
    assert!(stats[23..].iter().all(|day| day["total"] == 3 && day["completed"] == 0));
}

#[tokio::test]
async fn test_failed_publish_writes_nothing() {
    let app = TestApp::new().await;
    let cast = cast(&app).await;
    let id = submit(&app, &cast.client).await;
    assign(&app, &cast, &id).await;
    draft(&app, &cast.doctor, &id, draft_for(Utc::now().date_naive())).await;

    app.store.fail_next_publish().await;
    let (status, _) = publish(&app, &cast.admin, &id, json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, request) = app.get(&format!("/api/v1/requests/{}", id), &cast.admin.token).await;
    assert_eq!(request["status"], "PENDING_APPROVAL");
    assert_eq!(request["draftTasks"].as_array().unwrap().len(), 2);
    assert!(app
        .store
        .list_tasks(cast.client.id, None)
        .await
        .unwrap()
        .is_empty());

    // The retry succeeds
    let (status, _) = publish(&app, &cast.admin, &id, json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_past_tasks_are_read_only() {
    let app = TestApp::new().await;
    let cast = cast(&app).await;
    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let id = submit(&app, &cast.client).await;
    assign(&app, &cast, &id).await;
    draft(&app, &cast.doctor, &id, draft_for(yesterday)).await;
    publish(&app, &cast.admin, &id, json!({})).await;

    let (_, tasks) = app.get("/api/v1/tasks", &cast.client.token).await;
    let task_id = tasks[0]["id"].as_str().unwrap();

    let (status, body) = app
        .put(&format!("/api/v1/tasks/{}/toggle", task_id), &cast.client.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "IMMUTABLE_HISTORICAL_TASK");

    // Doctors read but never toggle
    let (status, _) = app
        .put(&format!("/api/v1/tasks/{}/toggle", task_id), &cast.doctor.token, json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_task_access_follows_assignment() {
    let app = TestApp::new().await;
    let cast = cast(&app).await;
    let other = app.subscribed_client("Other").await;
    let id = submit(&app, &cast.client).await;

    let path = format!("/api/v1/tasks?clientId={}", cast.client.id);
    let (status, _) = app.get(&path, &cast.doctor.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assign(&app, &cast, &id).await;
    let (status, _) = app.get(&path, &cast.doctor.token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&path, &other.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(&format!("/api/v1/stats/{}", cast.client.id), &cast.admin.token)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .get(&format!("/api/v1/stats/{}?range=year", cast.client.id), &cast.admin.token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "range");
}

#[tokio::test]
async fn test_generate_without_ai_falls_back() {
    let app = TestApp::new().await;
    let cast = cast(&app).await;
    let today = Utc::now().date_naive();
    let id = submit(&app, &cast.client).await;
    assign(&app, &cast, &id).await;

    let (status, outcome) = app
        .post(
            &format!("/api/v1/requests/{}/generate", id),
            &cast.doctor.token,
            json!({
                "notes": "Low carb, morning walks",
                "startDate": today,
                "endDate": today + Duration::days(6),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(outcome["tasks"].as_array().unwrap().is_empty());
    assert!(outcome["fallbackReason"].is_string());

    // Generation never moves the request
    let (_, request) = app.get(&format!("/api/v1/requests/{}", id), &cast.doctor.token).await;
    assert_eq!(request["status"], "PROCESSING");
}
