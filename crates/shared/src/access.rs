//! Role resolution and the permission gate.
//!
//! [`resolve_role`] classifies a viewer against one event snapshot and
//! [`permitted_actions`] maps that classification to what the interface may
//! offer. Both are pure and total. The gate is advisory; the backend remains
//! the authority on what a user may actually do.

use std::collections::BTreeSet;

use crate::domain::{Action, EventSnapshot, Participant, Role, Viewer};

/// Non-organizer memberships, highest precedence first.
const MEMBERSHIP_PRECEDENCE: [Role; 4] = [
    Role::Collaborator,
    Role::CollaboratorInvitee,
    Role::Attendee,
    Role::Invitee,
];

fn members(event: &EventSnapshot, role: Role) -> &[Participant] {
    match role {
        Role::Collaborator => &event.collaborators,
        Role::CollaboratorInvitee => &event.collaborator_invitees,
        Role::Attendee => &event.attendees,
        Role::Invitee => &event.invitees,
        Role::Organizer | Role::None => &[],
    }
}

pub fn resolve_role(viewer: Option<&Viewer>, event: &EventSnapshot) -> Role {
    let Some(viewer) = viewer else {
        return Role::None;
    };

    if event.organizer_id.as_ref() == Some(&viewer.id) {
        return Role::Organizer;
    }

    MEMBERSHIP_PRECEDENCE
        .into_iter()
        .find(|role| {
            members(event, *role)
                .iter()
                .any(|participant| participant.is_user(&viewer.id))
        })
        .unwrap_or(Role::None)
}

/// Set of actions the interface may expose for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet(BTreeSet<Action>);

impl ActionSet {
    pub fn contains(&self, action: Action) -> bool {
        self.0.contains(&action)
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn permitted_actions(role: Role) -> ActionSet {
    let actions: &[Action] = match role {
        Role::Organizer => &[
            Action::ViewFullDetail,
            Action::InviteAttendee,
            Action::InviteCollaborator,
            Action::ViewAttendeeList,
            Action::ViewCollaboratorList,
            Action::DeleteEvent,
            Action::EditEvent,
        ],
        Role::Collaborator | Role::CollaboratorInvitee => {
            &[Action::ViewDetail, Action::RespondCollaboration]
        }
        Role::Attendee | Role::Invitee => &[Action::ViewDetail, Action::RespondAttendance],
        Role::None => &[Action::ViewSummary],
    };
    actions.iter().copied().collect()
}

#[cfg(test)]
#[path = "tests/access_tests.rs"]
mod tests;
