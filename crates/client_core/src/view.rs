//! View models handed to the rendering layer.
//!
//! The role of the viewer is resolved once, when an [`EventView`] is built,
//! and every affordance afterwards is read from its action set.

use std::fmt::Display;

use chrono::TimeZone;
use shared::{
    access::{permitted_actions, resolve_role, ActionSet},
    domain::{
        Action, AttendanceResponse, CollaborationResponse, EventId, EventSnapshot, Participant,
        Role, Viewer,
    },
};

use crate::error::{ClientError, Result};

const DESCRIPTION_PREVIEW_CHARS: usize = 100;
const SHORT_DATE_FORMAT: &str = "%a, %b %-d, %Y, %I:%M %p";
const LONG_DATE_FORMAT: &str = "%A, %B %-d, %Y, %I:%M %p";

#[derive(Debug, Clone, PartialEq)]
pub struct EventView {
    event: EventSnapshot,
    role: Role,
    actions: ActionSet,
}

impl EventView {
    pub fn new(viewer: Option<&Viewer>, event: EventSnapshot) -> Self {
        let role = resolve_role(viewer, &event);
        Self {
            actions: permitted_actions(role),
            event,
            role,
        }
    }

    pub fn event(&self) -> &EventSnapshot {
        &self.event
    }

    pub fn id(&self) -> &EventId {
        &self.event.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn permits(&self, action: Action) -> bool {
        self.actions.contains(action)
    }

    pub fn require(&self, action: Action) -> Result<()> {
        if self.permits(action) {
            Ok(())
        } else {
            Err(ClientError::NotPermitted {
                action,
                role: self.role,
            })
        }
    }

    pub fn badge(&self) -> &'static str {
        self.role.badge()
    }

    /// First 100 characters of the description, with an ellipsis when cut.
    pub fn description_preview(&self) -> Option<String> {
        let description = self.event.description.as_deref()?;
        if description.chars().count() > DESCRIPTION_PREVIEW_CHARS {
            let cut: String = description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
            Some(format!("{cut}..."))
        } else {
            Some(description.to_string())
        }
    }

    pub fn description_or_placeholder(&self) -> &str {
        self.event
            .description
            .as_deref()
            .unwrap_or("No description")
    }

    pub fn short_date<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.event
            .date
            .with_timezone(tz)
            .format(SHORT_DATE_FORMAT)
            .to_string()
    }

    pub fn long_date<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.event
            .date
            .with_timezone(tz)
            .format(LONG_DATE_FORMAT)
            .to_string()
    }

    /// Labels of the response buttons this viewer gets, if any.
    pub fn response_options(&self) -> Vec<&'static str> {
        if self.permits(Action::RespondCollaboration) {
            [CollaborationResponse::Yes, CollaborationResponse::No]
                .into_iter()
                .map(CollaborationResponse::label)
                .collect()
        } else if self.permits(Action::RespondAttendance) {
            AttendanceResponse::ALL
                .into_iter()
                .map(AttendanceResponse::label)
                .collect()
        } else {
            Vec::new()
        }
    }

    pub fn response_prompt(&self) -> Option<&'static str> {
        match self.role {
            Role::Invitee => Some("You are invited. Please respond!"),
            Role::Collaborator | Role::CollaboratorInvitee => {
                Some("You have been invited to collaborate on this event.")
            }
            _ => None,
        }
    }
}

/// The event list as last loaded, each entry already classified.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    viewer: Option<Viewer>,
    events: Vec<EventView>,
}

impl Dashboard {
    pub fn new(viewer: Option<Viewer>, snapshots: Vec<EventSnapshot>) -> Self {
        let events = snapshots
            .into_iter()
            .map(|event| EventView::new(viewer.as_ref(), event))
            .collect();
        Self { viewer, events }
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_ref()
    }

    pub fn events(&self) -> &[EventView] {
        &self.events
    }

    pub fn find(&self, event_id: &EventId) -> Option<&EventView> {
        self.events.iter().find(|view| view.id() == event_id)
    }

    /// Drops a deleted event locally. Returns whether it was present.
    pub fn remove(&mut self, event_id: &EventId) -> bool {
        let before = self.events.len();
        self.events.retain(|view| view.id() != event_id);
        self.events.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// One independently loaded participant list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
    Hidden,
    Loaded(Vec<Participant>),
    Failed(String),
}

impl PanelState {
    pub fn participants(&self) -> &[Participant] {
        match self {
            PanelState::Loaded(participants) => participants,
            PanelState::Hidden | PanelState::Failed(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizerPanels {
    pub attendees: PanelState,
    pub collaborators: PanelState,
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
