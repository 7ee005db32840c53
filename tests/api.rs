use std::sync::Arc;
use std::time::Instant;

use actix::Actor;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::{json, Value};

use taskboard::app_state::AppState;
use taskboard::auth::{create_jwt, Authentication};
use taskboard::chat_server::ChatServer;
use taskboard::config::Config;
use taskboard::models::User;
use taskboard::store::{MemoryStore, ReadyState, Store};

struct Harness {
    store: Arc<MemoryStore>,
    state: AppState,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = Config::from_lookup(|_| None).unwrap();
        let state = AppState {
            chat_server: ChatServer::new().start(),
            store: store.clone() as Arc<dyn Store>,
            config,
            started_at: Instant::now(),
        };
        Harness { store, state }
    }

    /// Inserts a user directly, skipping the bcrypt cost of signup.
    async fn user(&self, username: &str) -> (String, String) {
        let user = User::new(username, &format!("{}@example.com", username), "x".into()).unwrap();
        self.store.insert_user(&user).await.unwrap();
        let token = create_jwt(&user.id, &self.state.config.jwt_secret).unwrap();
        (user.id, token)
    }
}

async fn app(
    h: &Harness,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .wrap(Authentication::new(&h.state.config.jwt_secret))
            .app_data(web::Data::new(h.state.clone()))
            .configure(taskboard::configure),
    )
    .await
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

async fn create_project<S>(app: &S, token: &str, members: &[&str]) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::post()
        .uri("/projects")
        .insert_header(bearer(token))
        .set_json(json!({ "title": "Apollo", "members": members }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    test::read_body_json(resp).await
}

async fn create_task<S>(app: &S, token: &str, project: &str, title: &str) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::post()
        .uri(&format!("/projects/{}/tasks", project))
        .insert_header(bearer(token))
        .set_json(json!({ "title": title }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    test::read_body_json(resp).await
}

async fn create_sprint<S>(app: &S, token: &str, project: &str, name: &str) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::post()
        .uri(&format!("/projects/{}/sprints", project))
        .insert_header(bearer(token))
        .set_json(json!({
            "name": name,
            "startDate": "2024-01-01T00:00:00Z",
            "endDate": "2024-01-14T00:00:00Z",
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    test::read_body_json(resp).await
}

async fn post_message<S>(app: &S, token: &str, body: Value) -> Value
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let req = test::TestRequest::post()
        .uri("/chat/messages")
        .insert_header(bearer(token))
        .set_json(body)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    test::read_body_json(resp).await
}

#[actix_web::test]
async fn islive_follows_database_state() {
    let h = Harness::new();
    let app = app(&h).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/islive").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["readyState"], 1);

    h.store.set_ready_state(ReadyState::Disconnected);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/islive").to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["database"], "disconnected");
    assert_eq!(body["readyState"], 0);
}

#[actix_web::test]
async fn ping_answers_pong() {
    let h = Harness::new();
    let app = app(&h).await;
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/ping").to_request()).await;
    assert_eq!(body["message"], "pong");
    assert!(body["timestamp"].is_string());
}

#[actix_web::test]
async fn signup_then_login_issues_usable_token() {
    let h = Harness::new();
    let app = app(&h).await;
    let credentials = json!({ "username": "ada", "email": "ada@example.com", "password": "correct horse" });

    let req = test::TestRequest::post().uri("/auth/signup").set_json(&credentials).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    let req = test::TestRequest::post().uri("/auth/signup").set_json(&credentials).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": "ada", "password": "wrong password" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": "ada", "password": "correct horse" }))
        .to_request();
    let login: Value = test::call_and_read_body_json(&app, req).await;
    let token = login["token"].as_str().unwrap();

    let req = test::TestRequest::get().uri("/projects").insert_header(bearer(token)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn rejects_missing_and_invalid_tokens() {
    let h = Harness::new();
    let app = app(&h).await;

    let req = test::TestRequest::get().uri("/projects").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    let req = test::TestRequest::get().uri("/projects").insert_header(bearer("garbage")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn project_round_trip_and_membership() {
    let h = Harness::new();
    let app = app(&h).await;
    let (owner, owner_token) = h.user("owner").await;
    let (_, stranger_token) = h.user("stranger").await;
    let (mate, mate_token) = h.user("mate").await;

    let created = create_project(&app, &owner_token, &[]).await;
    let id = created["_id"].as_str().unwrap();
    assert_eq!(created["owner"], owner.as_str());
    assert_eq!(created["status"], "active");
    assert_eq!(created["columns"], json!(["todo", "inProgress", "done"]));

    let req = test::TestRequest::get()
        .uri(&format!("/projects/{}", id))
        .insert_header(bearer(&owner_token))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched, created);

    let req = test::TestRequest::get()
        .uri(&format!("/projects/{}", id))
        .insert_header(bearer(&stranger_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/projects/{}/members", id))
        .insert_header(bearer(&owner_token))
        .set_json(json!({ "userId": mate }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/projects/{}", id))
        .insert_header(bearer(&mate_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri(&format!("/projects/{}/members/{}", id, owner))
        .insert_header(bearer(&owner_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_project_is_not_found() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, token) = h.user("owner").await;
    let req = test::TestRequest::get().uri("/projects/nope").insert_header(bearer(&token)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn sprint_dates_and_status_are_validated() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, token) = h.user("owner").await;
    let project = create_project(&app, &token, &[]).await;
    let sprints = format!("/projects/{}/sprints", project["_id"].as_str().unwrap());

    let req = test::TestRequest::post()
        .uri(&sprints)
        .insert_header(bearer(&token))
        .set_json(json!({
            "name": "Sprint 1",
            "startDate": "2024-02-01T00:00:00Z",
            "endDate": "2024-01-01T00:00:00Z",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri(&sprints)
        .insert_header(bearer(&token))
        .set_json(json!({
            "name": "Sprint 1",
            "startDate": "2024-01-01T00:00:00Z",
            "endDate": "2024-01-14T00:00:00Z",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let sprint: Value = test::read_body_json(resp).await;
    assert_eq!(sprint["status"], "planned");
    let status_uri = format!("{}/{}/status", sprints, sprint["_id"].as_str().unwrap());

    let req = test::TestRequest::put()
        .uri(&status_uri)
        .insert_header(bearer(&token))
        .set_json(json!({ "status": "active" }))
        .to_request();
    let active: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(active["status"], "active");

    let req = test::TestRequest::put()
        .uri(&status_uri)
        .insert_header(bearer(&token))
        .set_json(json!({ "status": "planned" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::put()
        .uri(&status_uri)
        .insert_header(bearer(&token))
        .set_json(json!({ "status": "cancelled" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn sprint_for_unknown_project_is_rejected() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, token) = h.user("owner").await;
    let req = test::TestRequest::post()
        .uri("/projects/missing/sprints")
        .insert_header(bearer(&token))
        .set_json(json!({
            "name": "Sprint 1",
            "startDate": "2024-01-01T00:00:00Z",
            "endDate": "2024-01-14T00:00:00Z",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn dragging_a_task_reorders_the_zone() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, token) = h.user("owner").await;
    let project = create_project(&app, &token, &[]).await;
    let project_id = project["_id"].as_str().unwrap();

    let first = create_task(&app, &token, project_id, "first").await;
    let second = create_task(&app, &token, project_id, "second").await;
    let third = create_task(&app, &token, project_id, "third").await;
    assert_eq!(first["column"], "todo");
    assert!(first["position"].as_f64() < second["position"].as_f64());

    let req = test::TestRequest::put()
        .uri(&format!(
            "/projects/{}/tasks/{}/move",
            project_id,
            third["_id"].as_str().unwrap()
        ))
        .insert_header(bearer(&token))
        .set_json(json!({ "sprint": null, "column": "todo", "index": 0 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/projects/{}/tasks", project_id))
        .insert_header(bearer(&token))
        .to_request();
    let tasks: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    let titles: Vec<&str> = tasks.iter().map(|t| t["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["third", "first", "second"]);

    let req = test::TestRequest::put()
        .uri(&format!(
            "/projects/{}/tasks/{}/move",
            project_id,
            first["_id"].as_str().unwrap()
        ))
        .insert_header(bearer(&token))
        .set_json(json!({ "column": "blocked", "index": 0 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/projects/{}/board", project_id))
        .insert_header(bearer(&token))
        .to_request();
    let board: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(board["zones"].as_array().unwrap().len(), 3);
    assert_eq!(board["zones"][0]["tasks"].as_array().unwrap().len(), 3);
}

#[actix_web::test]
async fn chat_role_defaults_and_rejects_unknown_roles() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, owner_token) = h.user("owner").await;
    let (mate, mate_token) = h.user("mate").await;
    let project = create_project(&app, &owner_token, &[mate.as_str()]).await;

    let message = post_message(&app, &owner_token, json!({ "message": "hello" })).await;
    assert_eq!(message["role"], "member");
    assert_eq!(message["isPinned"], false);

    let message = post_message(
        &app,
        &owner_token,
        json!({ "message": "hello", "project": project["_id"], "role": "coAdmin" }),
    )
    .await;
    assert_eq!(message["role"], "coAdmin");

    let message = post_message(
        &app,
        &mate_token,
        json!({ "message": "hello", "project": project["_id"], "role": "admin" }),
    )
    .await;
    assert_eq!(message["role"], "member");

    let message = post_message(&app, &owner_token, json!({ "message": "hello", "role": "admin" })).await;
    assert_eq!(message["role"], "member");

    let req = test::TestRequest::post()
        .uri("/chat/messages")
        .insert_header(bearer(&owner_token))
        .set_json(json!({ "message": "hello", "role": "owner" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn project_chat_requires_membership() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, owner_token) = h.user("owner").await;
    let (_, stranger_token) = h.user("stranger").await;
    let project = create_project(&app, &owner_token, &[]).await;

    let req = test::TestRequest::post()
        .uri("/chat/messages")
        .insert_header(bearer(&stranger_token))
        .set_json(json!({ "message": "hi", "project": project["_id"] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn reactions_are_deduplicated_per_user() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, token) = h.user("owner").await;

    let req = test::TestRequest::post()
        .uri("/chat/messages")
        .insert_header(bearer(&token))
        .set_json(json!({ "message": "ship it" }))
        .to_request();
    let message: Value = test::call_and_read_body_json(&app, req).await;
    let reactions = format!("/chat/messages/{}/reactions", message["_id"].as_str().unwrap());

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&reactions)
            .insert_header(bearer(&token))
            .set_json(json!({ "kind": "thumbsUp" }))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["reactions"].as_array().unwrap().len(), 1);
    }

    let req = test::TestRequest::delete()
        .uri(&format!("{}/thumbsUp", reactions))
        .insert_header(bearer(&token))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert!(updated["reactions"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn pinning_follows_moderation_rules() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, owner_token) = h.user("owner").await;
    let (mate, mate_token) = h.user("mate").await;
    let (_, stranger_token) = h.user("stranger").await;
    let project = create_project(&app, &owner_token, &[mate.as_str()]).await;

    let scoped = post_message(&app, &mate_token, json!({ "message": "standup", "project": project["_id"] })).await;
    let pin = format!("/chat/messages/{}/pin", scoped["_id"].as_str().unwrap());

    for token in [&mate_token, &stranger_token] {
        let req = test::TestRequest::post().uri(&pin).insert_header(bearer(token)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }
    let req = test::TestRequest::post().uri(&pin).insert_header(bearer(&owner_token)).to_request();
    let pinned: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(pinned["isPinned"], true);
    let req = test::TestRequest::post().uri(&pin).insert_header(bearer(&owner_token)).to_request();
    let unpinned: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(unpinned["isPinned"], false);

    let global = post_message(&app, &mate_token, json!({ "message": "hi all" })).await;
    let pin = format!("/chat/messages/{}/pin", global["_id"].as_str().unwrap());
    let req = test::TestRequest::post().uri(&pin).insert_header(bearer(&owner_token)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    let req = test::TestRequest::post().uri(&pin).insert_header(bearer(&mate_token)).to_request();
    let pinned: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(pinned["isPinned"], true);

    let req = test::TestRequest::get()
        .uri("/chat/messages?pinned=true")
        .insert_header(bearer(&stranger_token))
        .to_request();
    let listed: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["_id"], global["_id"]);
}

#[actix_web::test]
async fn sprint_edit_rechecks_dates_and_keeps_status() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, token) = h.user("owner").await;
    let project = create_project(&app, &token, &[]).await;
    let project_id = project["_id"].as_str().unwrap();
    let sprint = create_sprint(&app, &token, project_id, "Sprint 1").await;
    let sprint_uri = format!("/projects/{}/sprints/{}", project_id, sprint["_id"].as_str().unwrap());

    let req = test::TestRequest::put()
        .uri(&sprint_uri)
        .insert_header(bearer(&token))
        .set_json(json!({ "endDate": "2023-12-01T00:00:00Z" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("{}/status", sprint_uri))
        .insert_header(bearer(&token))
        .set_json(json!({ "status": "active" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&sprint_uri)
        .insert_header(bearer(&token))
        .set_json(json!({ "name": "Sprint One" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["name"], "Sprint One");
    assert_eq!(updated["status"], "active");
    assert_eq!(updated["endDate"], sprint["endDate"]);
}

#[actix_web::test]
async fn deleting_a_sprint_returns_tasks_to_backlog() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, token) = h.user("owner").await;
    let project = create_project(&app, &token, &[]).await;
    let project_id = project["_id"].as_str().unwrap();
    let sprint = create_sprint(&app, &token, project_id, "Sprint 1").await;

    let req = test::TestRequest::post()
        .uri(&format!("/projects/{}/tasks", project_id))
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "planned work", "sprint": sprint["_id"], "column": "inProgress" }))
        .to_request();
    let task: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(task["sprint"], sprint["_id"]);

    let req = test::TestRequest::delete()
        .uri(&format!("/projects/{}/sprints/{}", project_id, sprint["_id"].as_str().unwrap()))
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/projects/{}/tasks/{}", project_id, task["_id"].as_str().unwrap()))
        .insert_header(bearer(&token))
        .to_request();
    let task: Value = test::call_and_read_body_json(&app, req).await;
    assert!(task["sprint"].is_null());
    assert_eq!(task["column"], "inProgress");
}

#[actix_web::test]
async fn completed_sprints_take_no_tasks() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, token) = h.user("owner").await;
    let project = create_project(&app, &token, &[]).await;
    let project_id = project["_id"].as_str().unwrap();
    let sprint = create_sprint(&app, &token, project_id, "Sprint 1").await;
    let task = create_task(&app, &token, project_id, "late work").await;

    let req = test::TestRequest::put()
        .uri(&format!("/projects/{}/sprints/{}/status", project_id, sprint["_id"].as_str().unwrap()))
        .insert_header(bearer(&token))
        .set_json(json!({ "status": "completed" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/projects/{}/tasks", project_id))
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "more", "sprint": sprint["_id"] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("/projects/{}/tasks/{}/move", project_id, task["_id"].as_str().unwrap()))
        .insert_header(bearer(&token))
        .set_json(json!({ "sprint": sprint["_id"], "column": "todo", "index": 0 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn columns_holding_tasks_cannot_be_removed() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, token) = h.user("owner").await;
    let project = create_project(&app, &token, &[]).await;
    let project_uri = format!("/projects/{}", project["_id"].as_str().unwrap());

    let req = test::TestRequest::post()
        .uri(&format!("{}/tasks", project_uri))
        .insert_header(bearer(&token))
        .set_json(json!({ "title": "shipped", "column": "done" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::put()
        .uri(&project_uri)
        .insert_header(bearer(&token))
        .set_json(json!({ "columns": ["todo", "inProgress"] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&project_uri)
        .insert_header(bearer(&token))
        .set_json(json!({ "columns": ["todo", "inProgress", "review", "done"] }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["columns"], json!(["todo", "inProgress", "review", "done"]));
}

#[actix_web::test]
async fn removing_a_member_clears_their_assignments() {
    let h = Harness::new();
    let app = app(&h).await;
    let (_, owner_token) = h.user("owner").await;
    let (mate, _) = h.user("mate").await;
    let project = create_project(&app, &owner_token, &[mate.as_str()]).await;
    let project_uri = format!("/projects/{}", project["_id"].as_str().unwrap());

    let req = test::TestRequest::post()
        .uri(&format!("{}/tasks", project_uri))
        .insert_header(bearer(&owner_token))
        .set_json(json!({ "title": "review", "assignee": &mate }))
        .to_request();
    let task: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(task["assignee"], mate.as_str());

    let req = test::TestRequest::delete()
        .uri(&format!("{}/members/{}", project_uri, mate))
        .insert_header(bearer(&owner_token))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert!(!updated["members"].as_array().unwrap().contains(&json!(&mate)));

    let req = test::TestRequest::get()
        .uri(&format!("{}/tasks/{}", project_uri, task["_id"].as_str().unwrap()))
        .insert_header(bearer(&owner_token))
        .to_request();
    let task: Value = test::call_and_read_body_json(&app, req).await;
    assert!(task["assignee"].is_null());
}

#[actix_web::test]
async fn users_are_found_by_email() {
    let h = Harness::new();
    let app = app(&h).await;
    let (owner, token) = h.user("owner").await;
    h.user("mate").await;

    let req = test::TestRequest::get()
        .uri("/users/find?query=OWNER%40")
        .insert_header(bearer(&token))
        .to_request();
    let users: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "owner@example.com");
    assert!(users[0].get("password").is_none());

    let req = test::TestRequest::get()
        .uri("/users/find?query=example")
        .insert_header(bearer(&token))
        .to_request();
    let users: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(users.len(), 2);

    let req = test::TestRequest::get().uri("/users/find?query=o").insert_header(bearer(&token)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    let req = test::TestRequest::get().uri("/users/find?query=owner").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}", owner))
        .insert_header(bearer(&token))
        .to_request();
    let user: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(user["username"], "owner");
    let req = test::TestRequest::get().uri("/users/nobody").insert_header(bearer(&token)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
