//! End-to-end tests: the full router on an ephemeral port, backed by the
//! in-memory store, driven over HTTP with `reqwest`.

#![allow(clippy::panic)]

use std::sync::Arc;

use axum::Router;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use babylog::api;
use babylog::app_state::AppState;
use babylog::store::MemoryStore;

struct TestServer {
    base: String,
    client: Client,
}

impl TestServer {
    async fn spawn() -> Self {
        let app = Router::new()
            .merge(api::build_router())
            .with_state(AppState::new(Arc::new(MemoryStore::new())));
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        tokio::spawn(async move { axum::serve(listener, app).await });
        Self {
            base: format!("http://{addr}"),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> (StatusCode, Value) {
        let Ok(response) = request.send().await else {
            panic!("request failed");
        };
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(self.client.get(self.url(path))).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(self.client.post(self.url(path)).json(&body)).await
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(self.client.put(self.url(path)).json(&body)).await
    }

    async fn delete(&self, path: &str) -> StatusCode {
        self.send(self.client.delete(self.url(path))).await.0
    }

    async fn create_child(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/children",
                json!({"name": name, "birthDate": "2024-01-15", "sex": "girl"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let Some(id) = body["id"].as_str() else {
            panic!("child without id: {body}");
        };
        id.to_string()
    }
}

fn times(events: &Value) -> Vec<&str> {
    let Some(list) = events.as_array() else {
        panic!("expected an array, got {events}");
    };
    list.iter().filter_map(|e| e["time"].as_str()).collect()
}

#[tokio::test]
async fn health_and_openapi_are_served() {
    let server = TestServer::spawn().await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, doc) = server.get("/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/v1/children"].is_object());
}

#[tokio::test]
async fn child_lifecycle() {
    let server = TestServer::spawn().await;
    let ema = server.create_child("Ema").await;
    server.create_child("Tomáš").await;

    let (_, found) = server.get("/api/v1/children?name=EM").await;
    assert_eq!(found.as_array().map(Vec::len), Some(1));
    assert_eq!(found[0]["birth_date"], "2024-01-15");

    let (status, updated) = server
        .put(
            &format!("/api/v1/children/{ema}"),
            json!({"name": "Ema Marie", "birth_date": "2024-01-15", "sex": "girl"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ema Marie");

    assert_eq!(
        server.delete(&format!("/api/v1/children/{ema}")).await,
        StatusCode::NO_CONTENT
    );
    let (status, err) = server.get(&format!("/api/v1/children/{ema}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"]["code"], 2001);
}

#[tokio::test]
async fn invalid_child_is_rejected() {
    let server = TestServer::spawn().await;
    let (status, err) = server
        .post(
            "/api/v1/children",
            json!({"name": "Ema", "birth_date": "2024-02-30", "sex": "girl"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["code"], 1001);
}

#[tokio::test]
async fn writes_for_unknown_child_are_not_found() {
    let server = TestServer::spawn().await;
    let ghost = uuid::Uuid::new_v4();
    let (status, _) = server
        .post(
            &format!("/api/v1/children/{ghost}/sleep"),
            json!({"date": "2024-03-01", "time": "13:00", "state": "sleep"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server
        .put(&format!("/api/v1/children/{ghost}/sleep/day/2024-03-01"), json!([]))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_history_has_empty_stats() {
    let server = TestServer::spawn().await;
    let child = server.create_child("Ema").await;
    for log in ["breastfeeding", "sleep"] {
        let (status, body) = server
            .get(&format!("/api/v1/children/{child}/{log}/stats"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}

#[tokio::test]
async fn sleep_stats_credit_night_to_evening() {
    let server = TestServer::spawn().await;
    let child = server.create_child("Ema").await;
    let (status, _) = server
        .post(
            &format!("/api/v1/children/{child}/sleep/bulk"),
            json!([
                {"date": "2024-03-02", "time": "6:30", "state": "awake"},
                {"date": "2024-03-01", "time": "22:00", "state": "sleep"},
                {"date": "2024-03-01", "time": "13:00", "state": "sleep"},
                {"date": "2024-03-01", "time": "15:00", "state": "awake"},
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, stats) = server
        .get(&format!("/api/v1/children/{child}/sleep/stats"))
        .await;
    assert_eq!(
        stats,
        json!([
            {"date": "2024-03-01", "total_minutes": 630, "night_minutes": 510},
            {"date": "2024-03-02", "total_minutes": 0, "night_minutes": 0},
        ])
    );

    let (_, bounded) = server
        .get(&format!(
            "/api/v1/children/{child}/sleep/stats?from=2024-03-02&to=2024-03-02"
        ))
        .await;
    assert_eq!(
        bounded,
        json!([{"date": "2024-03-02", "total_minutes": 0, "night_minutes": 0}])
    );
}

#[tokio::test]
async fn feeding_stats_apply_plausibility_window() {
    let server = TestServer::spawn().await;
    let child = server.create_child("Ema").await;
    let (status, _) = server
        .post(
            &format!("/api/v1/children/{child}/breastfeeding/bulk"),
            json!([
                {"date": "2024-05-01", "time": "08:00", "state": "start", "label": "left"},
                {"date": "2024-05-01", "time": "08:20", "state": "stop"},
                {"date": "2024-05-01", "time": "12:00", "state": "start"},
                {"date": "2024-05-01", "time": "14:30", "state": "stop"},
                {"date": "2024-05-02", "time": "09:00", "state": "stop"},
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, stats) = server
        .get(&format!("/api/v1/children/{child}/breastfeeding/stats"))
        .await;
    assert_eq!(
        stats,
        json!([
            {"date": "2024-05-01", "total_minutes": 35},
            {"date": "2024-05-02", "total_minutes": 0},
        ])
    );
}

#[tokio::test]
async fn replace_day_is_sorted_and_idempotent() {
    let server = TestServer::spawn().await;
    let child = server.create_child("Ema").await;
    let day = format!("/api/v1/children/{child}/sleep/day/2024-03-01");
    let body = json!([
        {"time": "22:00", "state": "sleep"},
        {"time": "9:15", "state": "sleep", "label": "nap"},
        {"time": "10:00", "state": "awake"},
    ]);

    let (status, first) = server.put(&day, body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["deleted"], 0);
    assert_eq!(first["inserted"], 3);

    let (_, second) = server.put(&day, body).await;
    assert_eq!(second["deleted"], 3);
    assert_eq!(second["inserted"], 3);

    let (_, listed) = server
        .get(&format!("/api/v1/children/{child}/sleep?date=2024-03-01"))
        .await;
    assert_eq!(times(&listed), vec!["09:15", "10:00", "22:00"]);
}

#[tokio::test]
async fn rejected_replace_day_leaves_day_untouched() {
    let server = TestServer::spawn().await;
    let child = server.create_child("Ema").await;
    let day = format!("/api/v1/children/{child}/breastfeeding/day/2024-05-01");
    let (status, _) = server
        .put(&day, json!([{"time": "08:00", "state": "start"}]))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .put(
            &day,
            json!([
                {"time": "09:00", "state": "start"},
                {"time": "9:75", "state": "stop"},
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .put(
            &day,
            json!([{"date": "2024-05-02", "time": "09:00", "state": "start"}]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = server
        .get(&format!("/api/v1/children/{child}/breastfeeding"))
        .await;
    assert_eq!(times(&listed), vec!["08:00"]);
}

#[tokio::test]
async fn event_update_and_delete() {
    let server = TestServer::spawn().await;
    let child = server.create_child("Ema").await;
    let (_, event) = server
        .post(
            &format!("/api/v1/children/{child}/sleep"),
            json!({"date": "2024-03-01", "time": "13:00", "state": "sleep"}),
        )
        .await;
    let Some(id) = event["id"].as_str() else {
        panic!("event without id: {event}");
    };
    let path = format!("/api/v1/children/{child}/sleep/{id}");

    let (status, updated) = server
        .put(&path, json!({"time": "13:10", "extra": "stroller"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["time"], "13:10");
    assert_eq!(updated["extra"], "stroller");

    let (status, _) = server
        .get(&format!("/api/v1/children/{child}/breastfeeding/{id}"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(server.delete(&path).await, StatusCode::NO_CONTENT);
    assert_eq!(server.delete(&path).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn records_crud_upsert_and_filters() {
    let server = TestServer::spawn().await;
    let child = server.create_child("Ema").await;

    let teeth = format!("/api/v1/children/{child}/teeth");
    let (status, first) = server
        .post(&teeth, json!({"tooth_id": "51", "date": "2025-02-01"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, second) = server
        .post(&teeth, json!({"tooth_id": "51", "date": "2025-02-09"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["id"], second["id"]);

    let (status, _) = server
        .post(
            &format!("/api/v1/children/{child}/weight-height"),
            json!({"date": "2025-01-10", "weight": 7.4, "height": 66.0}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, growth) = server
        .get(&format!("/api/v1/children/{child}/growth?date=2025-01-10"))
        .await;
    assert_eq!(growth[0]["weight"], 7.4);

    let (status, _) = server
        .post(
            &format!("/api/v1/children/{child}/growth"),
            json!({"date": "2025-01-11"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let food = format!("/api/v1/children/{child}/food");
    let mut food_ids = Vec::new();
    for (category, name) in [("fruit", "apple"), ("vegetable", "carrot")] {
        let (status, body) = server
            .post(
                &food,
                json!({"category": category, "food_name": name, "date": "2025-03-01"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        food_ids.push(body["id"].clone());
    }
    let (_, veg) = server.get(&format!("{food}?category=vegetable")).await;
    assert_eq!(veg.as_array().map(Vec::len), Some(1));
    assert_eq!(veg[0]["food_name"], "carrot");

    let Some(carrot) = food_ids.get(1).and_then(Value::as_str) else {
        panic!("carrot without id");
    };
    let (status, body) = server
        .put(&format!("{food}/{carrot}"), json!({"food_name": "apple"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 2003);

    let (_, milestone) = server
        .post(
            &format!("/api/v1/children/{child}/milestones"),
            json!({"milId": "sits", "name": "Sits unaided", "date": "2025-04-02"}),
        )
        .await;
    let Some(id) = milestone["id"].as_str() else {
        panic!("milestone without id: {milestone}");
    };
    let path = format!("/api/v1/children/{child}/milestones/{id}");
    let (status, patched) = server.put(&path, json!({"note": "on the rug"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["note"], "on the rug");
    assert_eq!(patched["milestone_id"], "sits");
    assert_eq!(server.delete(&path).await, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn deleting_child_removes_its_entries() {
    let server = TestServer::spawn().await;
    let child = server.create_child("Ema").await;
    let (_, word) = server
        .post(
            &format!("/api/v1/children/{child}/words"),
            json!({"name": "máma", "date": "2025-01-01"}),
        )
        .await;
    let Some(id) = word["id"].as_str() else {
        panic!("word without id: {word}");
    };
    assert_eq!(
        server.delete(&format!("/api/v1/children/{child}")).await,
        StatusCode::NO_CONTENT
    );
    let (status, _) = server
        .get(&format!("/api/v1/children/{child}/words/{id}"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
