//! JSON shapes exchanged with the event backend, and their conversion into
//! the canonical domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AttendanceResponse, CollaborationResponse, EventId, EventSnapshot, Participant, Role, UserId,
    UserSummary, Viewer,
};

/// Every backend response is wrapped in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// A user reference as the backend sends it: either populated or a bare id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Embedded(UserSummary),
    Bare(UserId),
}

impl UserRef {
    pub fn id(&self) -> &UserId {
        match self {
            UserRef::Embedded(user) => &user.id,
            UserRef::Bare(id) => id,
        }
    }

    fn into_parts(self) -> (UserId, Option<UserSummary>) {
        match self {
            UserRef::Embedded(user) => (user.id.clone(), Some(user)),
            UserRef::Bare(id) => (id, None),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl From<ParticipantPayload> for Participant {
    fn from(value: ParticipantPayload) -> Self {
        let (user_id, user) = match value.user.map(UserRef::into_parts) {
            Some((id, user)) => (Some(id), user),
            None => (None, None),
        };
        Self {
            user_id,
            user,
            email: value.email,
            status: value.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(rename = "_id", alias = "id")]
    pub id: EventId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<UserRef>,
    #[serde(default)]
    pub invitees: Vec<ParticipantPayload>,
    #[serde(default)]
    pub attendees: Vec<ParticipantPayload>,
    #[serde(default)]
    pub collaborators: Vec<ParticipantPayload>,
    #[serde(default)]
    pub collaborator_invitees: Vec<ParticipantPayload>,
}

fn participants(payloads: Vec<ParticipantPayload>) -> Vec<Participant> {
    payloads.into_iter().map(Participant::from).collect()
}

impl From<EventPayload> for EventSnapshot {
    fn from(value: EventPayload) -> Self {
        let (organizer_id, organizer) = match value.organizer.map(UserRef::into_parts) {
            Some((id, user)) => (Some(id), user),
            None => (None, None),
        };
        Self {
            id: value.id,
            title: value.title,
            description: value.description.filter(|text| !text.is_empty()),
            date: value.date,
            location: value.location.filter(|text| !text.is_empty()),
            organizer_id,
            organizer,
            invitees: participants(value.invitees),
            attendees: participants(value.attendees),
            collaborators: participants(value.collaborators),
            collaborator_invitees: participants(value.collaborator_invitees),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventListPayload {
    #[serde(default)]
    pub events: Vec<EventPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub user: Viewer,
    pub token: String,
}

/// Fields submitted when creating or editing an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteRequest {
    pub emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRequest {
    pub status: AttendanceResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationRequest {
    pub status: CollaborationResponse,
}

/// Dashboard filters. `role: None` means "all roles".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl EventQuery {
    pub fn new(role: Option<Role>, q: Option<String>, date: Option<NaiveDate>) -> Self {
        Self {
            role: role.filter(|role| *role != Role::None),
            q: q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            date,
        }
    }
}
