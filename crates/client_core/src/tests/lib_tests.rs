use std::{collections::HashMap, time::Duration};

use axum::{
    extract::State,
    http::{header, HeaderMap, Method as HttpMethod, StatusCode, Uri},
    Json, Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use shared::domain::{Role, UserId};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;

#[derive(Debug, Clone)]
struct SeenRequest {
    method: String,
    path: String,
    query: Option<String>,
    bearer: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct CannedResponse {
    status: StatusCode,
    body: Value,
    delay: Duration,
}

#[derive(Clone, Default)]
struct MockBackend {
    routes: Arc<Mutex<HashMap<(String, String), CannedResponse>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockBackend {
    async fn respond(&self, method: &str, path: &str, status: StatusCode, body: Value) {
        self.respond_after(method, path, status, body, Duration::ZERO)
            .await;
    }

    async fn respond_after(
        &self,
        method: &str,
        path: &str,
        status: StatusCode,
        body: Value,
        delay: Duration,
    ) {
        self.routes.lock().await.insert(
            (method.to_string(), format!("/api{path}")),
            CannedResponse {
                status,
                body,
                delay,
            },
        );
    }

    async fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().await.clone()
    }
}

async fn handle_any(
    State(backend): State<MockBackend>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);
    backend.seen.lock().await.push(SeenRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        bearer,
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    let canned = backend
        .routes
        .lock()
        .await
        .get(&(method.to_string(), uri.path().to_string()))
        .cloned();
    match canned {
        Some(canned) => {
            tokio::time::sleep(canned.delay).await;
            (canned.status, Json(canned.body))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Route not found" })),
        ),
    }
}

async fn spawn_backend(backend: MockBackend) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().fallback(handle_any).with_state(backend);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api")
}

fn client_for(api_url: String) -> Arc<EventPlannerClient> {
    let http = Client::builder().no_proxy().build().expect("http client");
    EventPlannerClient::with_http(http, Url::parse(&api_url).expect("api url"))
}

fn session_for(id: &str) -> Session {
    Session {
        user: Viewer {
            id: UserId::new(id),
            name: Some(format!("user {id}")),
            email: format!("{id}@example.com"),
        },
        token: format!("token-{id}"),
    }
}

fn ok(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

fn event_json(organizer: &str) -> Value {
    json!({
        "_id": "e1",
        "title": "Team offsite",
        "description": "Two days in the mountains",
        "date": "2025-03-14T19:30:00.000Z",
        "location": "Chalet",
        "organizer": { "_id": organizer, "name": "Ada", "email": "ada@example.com" },
        "invitees": [ { "user": "u4" } ],
        "attendees": [ { "user": { "_id": "u3", "name": "Cy" }, "status": "Maybe" } ],
        "collaborators": [ { "user": { "_id": "u2" }, "status": "Yes" } ],
        "collaboratorInvitees": [ { "user": "u5" } ]
    })
}

async fn backend_with_event() -> (MockBackend, String) {
    let backend = MockBackend::default();
    backend
        .respond("GET", "/events/e1", StatusCode::OK, ok(event_json("u1")))
        .await;
    let api_url = spawn_backend(backend.clone()).await;
    (backend, api_url)
}

async fn view_as(client: &EventPlannerClient, user: &str) -> EventView {
    client.restore_session(session_for(user)).await;
    client
        .open_event(&EventId::new("e1"))
        .await
        .expect("open event")
}

#[tokio::test]
async fn login_stores_session_and_attaches_bearer_token() {
    let backend = MockBackend::default();
    backend
        .respond(
            "POST",
            "/auth/login",
            StatusCode::OK,
            ok(json!({
                "user": { "id": "u1", "name": "Ada", "email": "ada@example.com" },
                "token": "tok-1"
            })),
        )
        .await;
    backend
        .respond(
            "GET",
            "/events",
            StatusCode::OK,
            ok(json!({ "events": [event_json("u1")] })),
        )
        .await;
    let client = client_for(spawn_backend(backend.clone()).await);

    let viewer = client.login("ada@example.com", "secret").await.expect("login");
    assert_eq!(viewer.id, UserId::new("u1"));
    assert_eq!(
        client.session().await.map(|s| s.token),
        Some("tok-1".to_string())
    );

    let dashboard = client.dashboard(&EventQuery::default()).await.expect("dashboard");
    assert_eq!(dashboard.events().len(), 1);
    assert_eq!(dashboard.events()[0].role(), Role::Organizer);

    let seen = backend.seen().await;
    assert_eq!(seen.len(), 2);
    assert_eq!(
        seen[0].body,
        json!({ "email": "ada@example.com", "password": "secret" })
    );
    assert_eq!(seen[0].bearer, None);
    assert_eq!(seen[1].bearer.as_deref(), Some("tok-1"));
    assert!(seen[1].query.clone().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn signup_sends_name_and_starts_a_session() {
    let backend = MockBackend::default();
    backend
        .respond(
            "POST",
            "/auth/signup",
            StatusCode::OK,
            ok(json!({
                "user": { "id": "u8", "name": "Bo", "email": "bo@example.com" },
                "token": "tok-8"
            })),
        )
        .await;
    let client = client_for(spawn_backend(backend.clone()).await);

    let viewer = client
        .signup("Bo", "bo@example.com", "pw")
        .await
        .expect("signup");
    assert_eq!(viewer.display_name(), "Bo");
    assert_eq!(
        client.current_viewer().await.map(|v| v.id),
        Some(UserId::new("u8"))
    );
    assert_eq!(backend.seen().await[0].body["name"], json!("Bo"));
}

#[tokio::test]
async fn list_events_sends_only_the_filters_that_are_set() {
    let backend = MockBackend::default();
    backend
        .respond("GET", "/events", StatusCode::OK, ok(json!({ "events": [] })))
        .await;
    let client = client_for(spawn_backend(backend.clone()).await);
    client.restore_session(session_for("u1")).await;

    let query = EventQuery::new(
        Some(Role::Invitee),
        Some("picnic".into()),
        NaiveDate::from_ymd_opt(2025, 3, 14),
    );
    let events = client.list_events(&query).await.expect("events");
    assert!(events.is_empty());

    let seen = backend.seen().await;
    let sent = seen[0].query.clone().unwrap_or_default();
    assert!(sent.contains("role=invitee"), "query was {sent}");
    assert!(sent.contains("q=picnic"), "query was {sent}");
    assert!(sent.contains("date=2025-03-14"), "query was {sent}");
}

#[tokio::test]
async fn session_requiring_calls_fail_fast_when_logged_out() {
    let (backend, api_url) = backend_with_event().await;
    let client = client_for(api_url);

    let err = client
        .list_events(&EventQuery::default())
        .await
        .expect_err("must fail");
    assert!(matches!(err, ClientError::NotLoggedIn));
    assert!(err.requires_reauth());

    let err = client
        .open_event(&EventId::new("e1"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, ClientError::NotLoggedIn));
    assert!(backend.seen().await.is_empty());
}

#[tokio::test]
async fn open_event_resolves_role_from_mixed_references() {
    let (_backend, api_url) = backend_with_event().await;
    let client = client_for(api_url);

    assert_eq!(view_as(&client, "u1").await.role(), Role::Organizer);
    assert_eq!(view_as(&client, "u2").await.role(), Role::Collaborator);
    assert_eq!(view_as(&client, "u3").await.role(), Role::Attendee);
    assert_eq!(view_as(&client, "u4").await.role(), Role::Invitee);
    assert_eq!(view_as(&client, "u5").await.role(), Role::CollaboratorInvitee);
    assert_eq!(view_as(&client, "u9").await.role(), Role::None);
}

#[tokio::test]
async fn gated_actions_never_reach_the_backend() {
    let (backend, api_url) = backend_with_event().await;
    let client = client_for(api_url);
    let view = view_as(&client, "u3").await;

    let err = client.delete_event(&view).await.expect_err("must refuse");
    assert!(matches!(
        err,
        ClientError::NotPermitted {
            action: Action::DeleteEvent,
            ..
        }
    ));
    assert!(client
        .invite_attendees(&view, &["x@example.com".to_string()])
        .await
        .is_err());
    assert!(client
        .respond_collaboration(&view, CollaborationResponse::Yes)
        .await
        .is_err());
    assert!(client.list_attendees(&view).await.is_err());

    let seen = backend.seen().await;
    assert_eq!(seen.len(), 1, "only the event fetch may hit the network");
    assert_eq!(seen[0].method, "GET");
}

#[tokio::test]
async fn backend_error_text_is_surfaced_verbatim() {
    let (backend, api_url) = backend_with_event().await;
    backend
        .respond(
            "DELETE",
            "/events/e1",
            StatusCode::FORBIDDEN,
            json!({ "success": false, "error": "Only the organizer can delete this event" }),
        )
        .await;
    let client = client_for(api_url);
    let view = view_as(&client, "u1").await;

    let err = client.delete_event(&view).await.expect_err("must fail");
    assert_eq!(err.to_string(), "Only the organizer can delete this event");
    assert!(matches!(
        err,
        ClientError::Api(ApiError {
            code: shared::error::ErrorCode::Forbidden,
            ..
        })
    ));
}

#[tokio::test]
async fn missing_error_text_falls_back_to_operation_message() {
    let (backend, api_url) = backend_with_event().await;
    backend
        .respond(
            "DELETE",
            "/events/e1",
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({}),
        )
        .await;
    let client = client_for(api_url);
    let view = view_as(&client, "u1").await;

    let err = client.delete_event(&view).await.expect_err("must fail");
    assert_eq!(err.to_string(), "Failed to delete event");
}

#[tokio::test]
async fn error_text_survives_a_mismatched_data_field() {
    let backend = MockBackend::default();
    backend
        .respond(
            "GET",
            "/events/e2",
            StatusCode::NOT_FOUND,
            json!({ "success": false, "error": "Event not found", "data": "gone" }),
        )
        .await;
    backend
        .respond(
            "GET",
            "/events/e3",
            StatusCode::OK,
            json!({ "success": false, "error": "Event is archived", "data": [] }),
        )
        .await;
    let client = client_for(spawn_backend(backend).await);
    client.restore_session(session_for("u1")).await;

    let err = client
        .fetch_event(&EventId::new("e2"))
        .await
        .expect_err("must fail");
    assert_eq!(err.to_string(), "Event not found");

    let err = client
        .fetch_event(&EventId::new("e3"))
        .await
        .expect_err("must fail");
    assert_eq!(err.to_string(), "Event is archived");
}

#[tokio::test]
async fn event_ids_stay_inside_one_path_segment() {
    let backend = MockBackend::default();
    let client = client_for(spawn_backend(backend.clone()).await);
    client.restore_session(session_for("u1")).await;

    for id in ["../auth/login", "e1?x=1", "a/b"] {
        client
            .fetch_event(&EventId::new(id))
            .await
            .expect_err("no such route");
    }

    let seen = backend.seen().await;
    let paths: Vec<&str> = seen.iter().map(|request| request.path.as_str()).collect();
    assert_eq!(
        paths,
        [
            "/api/events/..%2Fauth%2Flogin",
            "/api/events/e1%3Fx=1",
            "/api/events/a%2Fb",
        ]
    );
    assert!(seen.iter().all(|request| request.query.is_none()));
}

#[tokio::test]
async fn dot_segment_event_ids_are_rejected_locally() {
    let backend = MockBackend::default();
    let client = client_for(spawn_backend(backend.clone()).await);
    client.restore_session(session_for("u1")).await;

    for id in ["", ".", ".."] {
        let err = client
            .fetch_event(&EventId::new(id))
            .await
            .expect_err("must fail");
        assert!(matches!(err, ClientError::InvalidEventId(_)));
    }
    assert!(backend.seen().await.is_empty());
}

#[tokio::test]
async fn organizer_delete_and_update_hit_the_event_path() {
    let (backend, api_url) = backend_with_event().await;
    backend
        .respond("DELETE", "/events/e1", StatusCode::OK, json!({ "success": true }))
        .await;
    let mut updated = event_json("u1");
    updated["title"] = json!("Team offsite (moved)");
    backend
        .respond("PUT", "/events/e1", StatusCode::OK, ok(updated))
        .await;
    let client = client_for(api_url);
    let view = view_as(&client, "u1").await;

    let draft = EventDraft {
        title: "Team offsite (moved)".into(),
        description: String::new(),
        date: view.event().date,
        location: "Chalet".into(),
    };
    let snapshot = client.update_event(&view, &draft).await.expect("update");
    assert_eq!(snapshot.title, "Team offsite (moved)");
    client.delete_event(&view).await.expect("delete");

    let seen = backend.seen().await;
    assert_eq!(seen[1].method, "PUT");
    assert_eq!(seen[1].body["title"], json!("Team offsite (moved)"));
    assert_eq!(seen[2].method, "DELETE");
    assert_eq!(seen[2].path, "/api/events/e1");
    assert_eq!(seen[2].bearer.as_deref(), Some("token-u1"));
}

#[tokio::test]
async fn attendance_response_uses_backend_label() {
    let (backend, api_url) = backend_with_event().await;
    backend
        .respond(
            "PUT",
            "/events/e1/respond/attendee",
            StatusCode::OK,
            json!({ "success": true, "data": { "status": "Not Going" } }),
        )
        .await;
    let client = client_for(api_url);
    let view = view_as(&client, "u4").await;

    client
        .respond_attendance(&view, AttendanceResponse::NotGoing)
        .await
        .expect("respond");

    let seen = backend.seen().await;
    assert_eq!(seen[1].path, "/api/events/e1/respond/attendee");
    assert_eq!(seen[1].body, json!({ "status": "Not Going" }));
}

#[tokio::test]
async fn collaboration_response_goes_to_collaborator_endpoint() {
    let (backend, api_url) = backend_with_event().await;
    backend
        .respond(
            "PUT",
            "/events/e1/respond/collaborator",
            StatusCode::OK,
            json!({ "success": true }),
        )
        .await;
    let client = client_for(api_url);
    let view = view_as(&client, "u5").await;

    client
        .respond_collaboration(&view, CollaborationResponse::No)
        .await
        .expect("respond");
    assert_eq!(backend.seen().await[1].body, json!({ "status": "No" }));
}

#[tokio::test]
async fn invitations_trim_addresses_and_reject_empty_lists() {
    let (backend, api_url) = backend_with_event().await;
    backend
        .respond(
            "POST",
            "/events/e1/invite/collaborator",
            StatusCode::OK,
            json!({ "success": true }),
        )
        .await;
    let client = client_for(api_url);
    let view = view_as(&client, "u1").await;

    let err = client
        .invite_attendees(&view, &["  ".to_string(), String::new()])
        .await
        .expect_err("must fail");
    assert!(matches!(err, ClientError::NoRecipients));

    client
        .invite_collaborators(&view, &[" bo@example.com ".to_string()])
        .await
        .expect("invite");

    let seen = backend.seen().await;
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].body, json!({ "emails": ["bo@example.com"] }));
}

#[tokio::test]
async fn organizer_panels_fill_their_own_slots_independently() {
    let (backend, api_url) = backend_with_event().await;
    backend
        .respond_after(
            "GET",
            "/events/e1/attendees",
            StatusCode::OK,
            ok(json!([
                { "user": { "_id": "u3", "name": "Cy" }, "status": "Going" },
                { "user": null, "email": "guest@example.com" }
            ])),
            Duration::from_millis(150),
        )
        .await;
    backend
        .respond(
            "GET",
            "/events/e1/collaborators",
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "success": false, "error": "database unavailable" }),
        )
        .await;
    let client = client_for(api_url);
    let view = view_as(&client, "u1").await;

    let panels = client.load_organizer_panels(&view).await;

    let attendees = panels.attendees.participants();
    assert_eq!(attendees.len(), 2);
    assert_eq!(attendees[0].display_name(), "Cy");
    assert_eq!(attendees[0].status_label(), "Going");
    assert_eq!(attendees[1].display_name(), "guest@example.com");
    assert_eq!(attendees[1].status_label(), "Pending");
    assert_eq!(
        panels.collaborators,
        PanelState::Failed("database unavailable".into())
    );
}

#[tokio::test]
async fn non_organizers_get_hidden_panels_without_requests() {
    let (backend, api_url) = backend_with_event().await;
    let client = client_for(api_url);
    let view = view_as(&client, "u2").await;

    let panels = client.load_organizer_panels(&view).await;
    assert_eq!(panels.attendees, PanelState::Hidden);
    assert_eq!(panels.collaborators, PanelState::Hidden);
    assert_eq!(backend.seen().await.len(), 1);
}

#[tokio::test]
async fn unreachable_server_reports_no_response() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let client = client_for(format!("http://{addr}/api"));

    let err = client
        .login("ada@example.com", "secret")
        .await
        .expect_err("must fail");
    assert!(matches!(err, ClientError::NoResponse(_)));
    assert_eq!(err.to_string(), "No response from server");
    assert!(client.session().await.is_none());
}

#[tokio::test]
async fn logout_forgets_the_viewer() {
    let client = client_for("http://127.0.0.1:9/api".to_string());
    client.restore_session(session_for("u1")).await;
    assert!(client.current_viewer().await.is_some());

    client.logout().await;
    assert!(client.current_viewer().await.is_none());
}

struct FixedEvent(Value);

#[async_trait]
impl EventSource for FixedEvent {
    async fn fetch_event(&self, _event_id: &EventId) -> Result<EventSnapshot> {
        let payload: EventPayload = serde_json::from_value(self.0.clone())
            .map_err(|err| ClientError::UnexpectedResponse(err.to_string()))?;
        Ok(payload.into())
    }
}

struct FixedIdentity(Option<Viewer>);

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn current_viewer(&self) -> Option<Viewer> {
        self.0.clone()
    }
}

#[tokio::test]
async fn load_event_view_combines_source_and_identity() {
    let source = FixedEvent(event_json("u1"));

    let anonymous = load_event_view(&source, &FixedIdentity(None), &EventId::new("e1"))
        .await
        .expect("view");
    assert_eq!(anonymous.role(), Role::None);

    let organizer = load_event_view(
        &source,
        &FixedIdentity(Some(session_for("u1").user)),
        &EventId::new("e1"),
    )
    .await
    .expect("view");
    assert_eq!(organizer.role(), Role::Organizer);
    assert_eq!(organizer.event().organizer_label(), Some("Ada"));
}
