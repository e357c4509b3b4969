use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(EventId);

/// The authenticated user looking at an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    #[serde(alias = "_id")]
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

impl Viewer {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.email)
    }
}

/// A user as embedded in an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A viewer's relationship to a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Organizer,
    Collaborator,
    CollaboratorInvitee,
    Attendee,
    Invitee,
    None,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Organizer,
        Role::Collaborator,
        Role::CollaboratorInvitee,
        Role::Attendee,
        Role::Invitee,
        Role::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Organizer => "organizer",
            Role::Collaborator => "collaborator",
            Role::CollaboratorInvitee => "collaborator-invitee",
            Role::Attendee => "attendee",
            Role::Invitee => "invitee",
            Role::None => "none",
        }
    }

    /// Badge text shown next to an event; empty for [`Role::None`].
    pub fn badge(self) -> &'static str {
        match self {
            Role::Organizer => "Organizer",
            Role::Collaborator => "Collaborator",
            Role::CollaboratorInvitee => "Collaborator Invitee",
            Role::Attendee => "Attendee",
            Role::Invitee => "Invitee",
            Role::None => "",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Something the interface may offer for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewSummary,
    ViewDetail,
    ViewFullDetail,
    InviteAttendee,
    InviteCollaborator,
    ViewAttendeeList,
    ViewCollaboratorList,
    EditEvent,
    DeleteEvent,
    RespondAttendance,
    RespondCollaboration,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Action::ViewSummary => "view summary",
            Action::ViewDetail => "view detail",
            Action::ViewFullDetail => "view full detail",
            Action::InviteAttendee => "invite attendee",
            Action::InviteCollaborator => "invite collaborator",
            Action::ViewAttendeeList => "view attendee list",
            Action::ViewCollaboratorList => "view collaborator list",
            Action::EditEvent => "edit event",
            Action::DeleteEvent => "delete event",
            Action::RespondAttendance => "respond to attendance",
            Action::RespondCollaboration => "respond to collaboration request",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceResponse {
    Going,
    Maybe,
    #[serde(rename = "Not Going")]
    NotGoing,
}

impl AttendanceResponse {
    pub const ALL: [AttendanceResponse; 3] = [
        AttendanceResponse::Going,
        AttendanceResponse::Maybe,
        AttendanceResponse::NotGoing,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AttendanceResponse::Going => "Going",
            AttendanceResponse::Maybe => "Maybe",
            AttendanceResponse::NotGoing => "Not Going",
        }
    }
}

impl FromStr for AttendanceResponse {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_'], " ");
        AttendanceResponse::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("expected one of Going, Maybe, Not Going; got '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollaborationResponse {
    Yes,
    No,
}

impl CollaborationResponse {
    pub fn label(self) -> &'static str {
        match self {
            CollaborationResponse::Yes => "Yes",
            CollaborationResponse::No => "No",
        }
    }
}

impl FromStr for CollaborationResponse {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(CollaborationResponse::Yes),
            "no" => Ok(CollaborationResponse::No),
            _ => Err(format!("expected Yes or No; got '{s}'")),
        }
    }
}

/// One entry of an event's participant list, with the user reference
/// already normalized to a [`UserId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub user_id: Option<UserId>,
    pub user: Option<UserSummary>,
    pub email: Option<String>,
    pub status: Option<String>,
}

impl Participant {
    pub fn is_user(&self, user_id: &UserId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }

    pub fn status_label(&self) -> &str {
        self.status
            .as_deref()
            .filter(|status| !status.is_empty())
            .unwrap_or("Pending")
    }

    pub fn display_name(&self) -> &str {
        let from_user = self.user.as_ref().and_then(|user| {
            user.name
                .as_deref()
                .filter(|name| !name.is_empty())
                .or(user.email.as_deref())
        });
        from_user.or(self.email.as_deref()).unwrap_or("")
    }
}

/// Read-only snapshot of an event as last fetched from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSnapshot {
    pub id: EventId,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub location: Option<String>,
    pub organizer_id: Option<UserId>,
    pub organizer: Option<UserSummary>,
    pub invitees: Vec<Participant>,
    pub attendees: Vec<Participant>,
    pub collaborators: Vec<Participant>,
    pub collaborator_invitees: Vec<Participant>,
}

impl EventSnapshot {
    pub fn organizer_label(&self) -> Option<&str> {
        let organizer = self.organizer.as_ref()?;
        organizer
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(organizer.email.as_deref())
    }
}
