use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::{
    domain::{
        Action, AttendanceResponse, CollaborationResponse, EventId, EventSnapshot, Participant,
        Viewer,
    },
    error::ApiError,
    protocol::{
        ApiEnvelope, AttendanceRequest, AuthPayload, CollaborationRequest, EventDraft,
        EventListPayload, EventPayload, EventQuery, InviteRequest, LoginRequest,
        ParticipantPayload, SignupRequest,
    },
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

pub mod config;
pub mod error;
pub mod view;

pub use config::Settings;
pub use error::{ClientError, Result};
pub use view::{Dashboard, EventView, OrganizerPanels, PanelState};

/// Source of event snapshots, fetched by identifier.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_event(&self, event_id: &EventId) -> Result<EventSnapshot>;
}

/// Whoever is currently authenticated, if anyone.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_viewer(&self) -> Option<Viewer>;
}

/// Fetches a fresh snapshot and classifies the current viewer against it.
pub async fn load_event_view(
    source: &dyn EventSource,
    identity: &dyn IdentityProvider,
    event_id: &EventId,
) -> Result<EventView> {
    let event = source.fetch_event(event_id).await?;
    let viewer = identity.current_viewer().await;
    Ok(EventView::new(viewer.as_ref(), event))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: Viewer,
    pub token: String,
}

impl From<AuthPayload> for Session {
    fn from(value: AuthPayload) -> Self {
        Self {
            user: value.user,
            token: value.token,
        }
    }
}

pub struct EventPlannerClient {
    http: Client,
    api_url: Url,
    session: RwLock<Option<Session>>,
}

impl EventPlannerClient {
    pub fn new(settings: &Settings) -> Result<Arc<Self>> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(ClientError::Request)?;
        let api_url = Url::parse(&settings.api_url)?;
        Ok(Self::with_http(http, api_url))
    }

    pub fn with_http(http: Client, api_url: Url) -> Arc<Self> {
        Arc::new(Self {
            http,
            api_url,
            session: RwLock::new(None),
        })
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn restore_session(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    pub async fn logout(&self) {
        if self.session.write().await.take().is_some() {
            info!("session cleared");
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Viewer> {
        let payload: AuthPayload = self
            .request_data(
                self.request(Method::POST, &["auth", "login"]).await.json(&LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                }),
                "Login failed",
            )
            .await?;
        Ok(self.start_session(payload).await)
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<Viewer> {
        let payload: AuthPayload = self
            .request_data(
                self.request(Method::POST, &["auth", "signup"])
                    .await
                    .json(&SignupRequest {
                        email: email.to_string(),
                        password: password.to_string(),
                        name: name.to_string(),
                    }),
                "Signup failed",
            )
            .await?;
        Ok(self.start_session(payload).await)
    }

    async fn start_session(&self, payload: AuthPayload) -> Viewer {
        let session = Session::from(payload);
        let viewer = session.user.clone();
        info!(user_id = %viewer.id, "logged in");
        *self.session.write().await = Some(session);
        viewer
    }

    pub async fn list_events(&self, query: &EventQuery) -> Result<Vec<EventSnapshot>> {
        self.require_session().await?;
        let payload: EventListPayload = self
            .request_data(
                self.request(Method::GET, &["events"]).await.query(query),
                "Failed to load events",
            )
            .await?;
        Ok(payload.events.into_iter().map(EventSnapshot::from).collect())
    }

    /// Loads the event list and classifies each entry for the current viewer.
    pub async fn dashboard(&self, query: &EventQuery) -> Result<Dashboard> {
        let events = self.list_events(query).await?;
        let viewer = self.current_viewer().await;
        Ok(Dashboard::new(viewer, events))
    }

    pub async fn open_event(&self, event_id: &EventId) -> Result<EventView> {
        load_event_view(self, self, event_id).await
    }

    pub async fn create_event(&self, draft: &EventDraft) -> Result<EventSnapshot> {
        self.require_session().await?;
        let payload: EventPayload = self
            .request_data(
                self.request(Method::POST, &["events"]).await.json(draft),
                "Failed to create event",
            )
            .await?;
        Ok(payload.into())
    }

    pub async fn update_event(&self, view: &EventView, draft: &EventDraft) -> Result<EventSnapshot> {
        view.require(Action::EditEvent)?;
        let payload: EventPayload = self
            .request_data(
                self.event_request(Method::PUT, view.id(), &[])
                    .await?
                    .json(draft),
                "Failed to update event",
            )
            .await?;
        Ok(payload.into())
    }

    pub async fn delete_event(&self, view: &EventView) -> Result<()> {
        view.require(Action::DeleteEvent)?;
        self.request_ack(
            self.event_request(Method::DELETE, view.id(), &[]).await?,
            "Failed to delete event",
        )
        .await
    }

    pub async fn invite_attendees(&self, view: &EventView, emails: &[String]) -> Result<()> {
        view.require(Action::InviteAttendee)?;
        let emails = recipients(emails)?;
        self.request_ack(
            self.event_request(Method::POST, view.id(), &["invite", "attendee"])
                .await?
                .json(&InviteRequest { emails }),
            "Failed to send invitation",
        )
        .await
    }

    pub async fn invite_collaborators(&self, view: &EventView, emails: &[String]) -> Result<()> {
        view.require(Action::InviteCollaborator)?;
        let emails = recipients(emails)?;
        self.request_ack(
            self.event_request(Method::POST, view.id(), &["invite", "collaborator"])
                .await?
                .json(&InviteRequest { emails }),
            "Failed to invite collaborator",
        )
        .await
    }

    pub async fn list_attendees(&self, view: &EventView) -> Result<Vec<Participant>> {
        view.require(Action::ViewAttendeeList)?;
        self.fetch_participants(view.id(), "attendees", "Failed to load attendees")
            .await
    }

    pub async fn list_collaborators(&self, view: &EventView) -> Result<Vec<Participant>> {
        view.require(Action::ViewCollaboratorList)?;
        self.fetch_participants(view.id(), "collaborators", "Failed to load collaborators")
            .await
    }

    /// Loads both organizer lists concurrently. Each list lands in its own
    /// slot whatever order the responses arrive in, and one failing leaves
    /// the other untouched.
    pub async fn load_organizer_panels(&self, view: &EventView) -> OrganizerPanels {
        let attendees = async {
            if !view.permits(Action::ViewAttendeeList) {
                return PanelState::Hidden;
            }
            panel_state(self.list_attendees(view).await, "attendees")
        };
        let collaborators = async {
            if !view.permits(Action::ViewCollaboratorList) {
                return PanelState::Hidden;
            }
            panel_state(self.list_collaborators(view).await, "collaborators")
        };
        let (attendees, collaborators) = tokio::join!(attendees, collaborators);
        OrganizerPanels {
            attendees,
            collaborators,
        }
    }

    pub async fn respond_attendance(
        &self,
        view: &EventView,
        status: AttendanceResponse,
    ) -> Result<()> {
        view.require(Action::RespondAttendance)?;
        self.request_ack(
            self.event_request(Method::PUT, view.id(), &["respond", "attendee"])
                .await?
                .json(&AttendanceRequest { status }),
            "Failed to record response",
        )
        .await
    }

    pub async fn respond_collaboration(
        &self,
        view: &EventView,
        status: CollaborationResponse,
    ) -> Result<()> {
        view.require(Action::RespondCollaboration)?;
        self.request_ack(
            self.event_request(Method::PUT, view.id(), &["respond", "collaborator"])
                .await?
                .json(&CollaborationRequest { status }),
            "Failed to record response",
        )
        .await
    }

    async fn fetch_participants(
        &self,
        event_id: &EventId,
        list: &str,
        fallback: &str,
    ) -> Result<Vec<Participant>> {
        let payload: Vec<ParticipantPayload> = self
            .request_data(
                self.event_request(Method::GET, event_id, &[list]).await?,
                fallback,
            )
            .await?;
        Ok(payload.into_iter().map(Participant::from).collect())
    }

    async fn require_session(&self) -> Result<()> {
        if self.session.read().await.is_some() {
            Ok(())
        } else {
            Err(ClientError::NotLoggedIn)
        }
    }

    /// Each segment is percent-encoded, so ids cannot add path components
    /// or a query string.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!(%method, path = url.path(), "api request");
        let builder = self.http.request(method, url);
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.token.clone());
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn event_request(
        &self,
        method: Method,
        event_id: &EventId,
        rest: &[&str],
    ) -> Result<RequestBuilder> {
        let id = check_event_id(event_id)?;
        let mut segments = vec!["events", id];
        segments.extend_from_slice(rest);
        Ok(self.request(method, &segments).await)
    }

    async fn request_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T> {
        self.send_envelope(request, fallback).await?.ok_or_else(|| {
            ClientError::UnexpectedResponse("response is missing its data field".into())
        })
    }

    async fn request_ack(&self, request: RequestBuilder, fallback: &str) -> Result<()> {
        self.send_envelope::<serde_json::Value>(request, fallback)
            .await
            .map(|_| ())
    }

    async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<Option<T>> {
        let response = request.send().await.map_err(ClientError::from_transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ClientError::from_transport)?;

        let error_text = match serde_json::from_slice::<ApiEnvelope<T>>(&body) {
            Ok(envelope) if status.is_success() && envelope.success => return Ok(envelope.data),
            Ok(envelope) => envelope.error,
            // Failure bodies rarely carry a `data` of the expected shape.
            Err(err) => match serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(&body) {
                Ok(envelope) if !status.is_success() || !envelope.success => envelope.error,
                _ if !status.is_success() => None,
                _ => return Err(ClientError::UnexpectedResponse(err.to_string())),
            },
        };

        let err = ApiError::from_response(status.as_u16(), error_text, fallback);
        warn!(status = status.as_u16(), error = %err, "api request failed");
        Err(err.into())
    }
}

#[async_trait]
impl EventSource for EventPlannerClient {
    async fn fetch_event(&self, event_id: &EventId) -> Result<EventSnapshot> {
        self.require_session().await?;
        let payload: EventPayload = self
            .request_data(
                self.event_request(Method::GET, event_id, &[]).await?,
                "Failed to load event details",
            )
            .await?;
        Ok(payload.into())
    }
}

#[async_trait]
impl IdentityProvider for EventPlannerClient {
    async fn current_viewer(&self) -> Option<Viewer> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.user.clone())
    }
}

fn check_event_id(event_id: &EventId) -> Result<&str> {
    match event_id.as_str() {
        "" | "." | ".." => Err(ClientError::InvalidEventId(event_id.as_str().to_string())),
        id => Ok(id),
    }
}

fn recipients(emails: &[String]) -> Result<Vec<String>> {
    let emails: Vec<String> = emails
        .iter()
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
        .collect();
    if emails.is_empty() {
        return Err(ClientError::NoRecipients);
    }
    Ok(emails)
}

fn panel_state(result: Result<Vec<Participant>>, panel: &str) -> PanelState {
    match result {
        Ok(participants) => PanelState::Loaded(participants),
        Err(err) => {
            warn!(panel, error = %err, "failed to load participant panel");
            PanelState::Failed(err.to_string())
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
