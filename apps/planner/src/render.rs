//! Plain-text rendering of dashboard and event views.

use chrono::Local;
use client_core::{Dashboard, EventView, OrganizerPanels, PanelState};
use shared::domain::{Action, Participant};

pub fn dashboard(dashboard: &Dashboard) -> String {
    let mut lines = Vec::new();
    if let Some(viewer) = dashboard.viewer() {
        lines.push(format!("Welcome, {}", viewer.display_name()));
    }
    if dashboard.is_empty() {
        lines.push("No events found. Create your first event!".to_string());
        return finish(lines);
    }

    for view in dashboard.events() {
        lines.push(String::new());
        lines.push(match view.badge() {
            "" => format!("[{}] {}", view.id(), view.event().title),
            badge => format!("[{}] {}  ({badge})", view.id(), view.event().title),
        });
        if let Some(preview) = view.description_preview() {
            lines.push(format!("  {preview}"));
        }
        lines.push(format!("  Date: {}", view.short_date(&Local)));
        if let Some(location) = &view.event().location {
            lines.push(format!("  Location: {location}"));
        }
        if view.permits(Action::DeleteEvent) {
            lines.push("  (you can delete this event)".to_string());
        }
    }
    finish(lines)
}

pub fn event(view: &EventView, panels: Option<&OrganizerPanels>) -> String {
    let event = view.event();
    let mut lines = vec![
        event.title.clone(),
        view.description_or_placeholder().to_string(),
        format!("Date: {}", view.long_date(&Local)),
    ];
    if let Some(location) = &event.location {
        lines.push(format!("Location: {location}"));
    }
    if let Some(organizer) = event.organizer_label() {
        lines.push(format!("Organized by: {organizer}"));
    }

    if let Some(panels) = panels {
        participant_panel(&mut lines, "Attendees", "No attendees yet", &panels.attendees);
        participant_panel(
            &mut lines,
            "Collaborators",
            "No collaborators yet",
            &panels.collaborators,
        );
    }

    let options = view.response_options();
    if !options.is_empty() {
        lines.push(String::new());
        lines.push(format!("Your response: {}", options.join(" / ")));
        if let Some(prompt) = view.response_prompt() {
            lines.push(prompt.to_string());
        }
    }
    finish(lines)
}

fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn participant_panel(lines: &mut Vec<String>, title: &str, empty: &str, state: &PanelState) {
    lines.push(String::new());
    lines.push(title.to_string());
    match state {
        PanelState::Hidden => {}
        PanelState::Failed(reason) => lines.push(format!("  (could not load: {reason})")),
        PanelState::Loaded(participants) if participants.is_empty() => {
            lines.push(format!("  {empty}"));
        }
        PanelState::Loaded(participants) => {
            lines.extend(participants.iter().map(participant_line));
        }
    }
}

fn participant_line(participant: &Participant) -> String {
    format!(
        "  {} - {}",
        participant.display_name(),
        participant.status_label()
    )
}
