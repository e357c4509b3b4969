use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use client_core::{config::normalize_api_url, ClientError, EventPlannerClient, EventView};
use shared::{
    domain::{Action, AttendanceResponse, CollaborationResponse, EventId, Role},
    protocol::{EventDraft, EventQuery},
};
use tracing_subscriber::EnvFilter;

mod render;
mod session;

use session::SessionStore;

#[derive(Parser, Debug)]
#[command(name = "planner", about = "Plan events, invite people and answer invitations")]
struct Cli {
    /// Overrides the configured backend URL.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    List {
        /// all, organizer, attendee, invitee, collaborator or collaborator-invitee
        #[arg(long, default_value = "all")]
        role: String,
        #[arg(long)]
        q: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Show {
        event_id: String,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// RFC 3339, or local time as YYYY-MM-DDTHH:MM
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "")]
        location: String,
    },
    Edit {
        event_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },
    Delete {
        event_id: String,
    },
    Invite {
        event_id: String,
        /// Invite as collaborators instead of attendees.
        #[arg(long)]
        collaborator: bool,
        #[arg(required = true)]
        emails: Vec<String>,
    },
    Respond {
        event_id: String,
        /// Going / Maybe / "Not Going" for attendance, Yes / No for collaboration
        status: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = client_core::config::load_settings()?;
    if let Some(api_url) = &cli.api_url {
        settings.api_url = normalize_api_url(api_url)?;
    }
    let store = SessionStore::new(match &settings.session_path {
        Some(path) => path.clone(),
        None => SessionStore::default_path()?,
    });

    let client = EventPlannerClient::new(&settings)?;
    if let Some(session) = store.load()? {
        client.restore_session(session).await;
    }

    match run(&client, &store, cli.command).await {
        Ok(()) => Ok(()),
        Err(err) => {
            if let Some(client_err) = err.downcast_ref::<ClientError>() {
                if client_err.requires_reauth() {
                    store.clear()?;
                    eprintln!("Please log in again: planner login --email <email> --password <password>");
                }
            }
            Err(err)
        }
    }
}

async fn run(client: &EventPlannerClient, store: &SessionStore, command: Command) -> Result<()> {
    match command {
        Command::Signup {
            name,
            email,
            password,
        } => {
            let viewer = client.signup(&name, &email, &password).await?;
            persist_session(client, store).await?;
            println!("Success! Signed up as {}", viewer.display_name());
        }
        Command::Login { email, password } => {
            let viewer = client.login(&email, &password).await?;
            persist_session(client, store).await?;
            println!("Success! Logged in as {}", viewer.display_name());
        }
        Command::Logout => {
            client.logout().await;
            store.clear()?;
            println!("Logged out");
        }
        Command::List { role, q, date } => {
            let query = EventQuery::new(parse_role_filter(&role)?, q, date);
            let dashboard = client.dashboard(&query).await?;
            print!("{}", render::dashboard(&dashboard));
        }
        Command::Show { event_id } => {
            let view = client.open_event(&EventId::new(event_id)).await?;
            let panels = if view.permits(Action::ViewFullDetail) {
                Some(client.load_organizer_panels(&view).await)
            } else {
                None
            };
            print!("{}", render::event(&view, panels.as_ref()));
        }
        Command::Create {
            title,
            description,
            date,
            location,
        } => {
            let draft = EventDraft {
                title,
                description,
                date: parse_event_date(&date)?,
                location,
            };
            let event = client.create_event(&draft).await?;
            println!("Created event {} ({})", event.title, event.id);
        }
        Command::Edit {
            event_id,
            title,
            description,
            date,
            location,
        } => {
            let view = client.open_event(&EventId::new(event_id)).await?;
            let current = view.event();
            let draft = EventDraft {
                title: title.unwrap_or_else(|| current.title.clone()),
                description: description
                    .or_else(|| current.description.clone())
                    .unwrap_or_default(),
                date: match date {
                    Some(date) => parse_event_date(&date)?,
                    None => current.date,
                },
                location: location
                    .or_else(|| current.location.clone())
                    .unwrap_or_default(),
            };
            let event = client.update_event(&view, &draft).await?;
            println!("Updated event {} ({})", event.title, event.id);
        }
        Command::Delete { event_id } => {
            let view = client.open_event(&EventId::new(event_id)).await?;
            client.delete_event(&view).await?;
            println!("Deleted event {}", view.event().title);
        }
        Command::Invite {
            event_id,
            collaborator,
            emails,
        } => {
            let view = client.open_event(&EventId::new(event_id)).await?;
            if collaborator {
                client.invite_collaborators(&view, &emails).await?;
                println!("Collaborator invited!");
            } else {
                client.invite_attendees(&view, &emails).await?;
                println!("Invitation sent!");
            }
        }
        Command::Respond { event_id, status } => {
            let view = client.open_event(&EventId::new(event_id)).await?;
            respond(client, &view, &status).await?;
            println!("Response recorded!");
        }
    }
    Ok(())
}

async fn persist_session(client: &EventPlannerClient, store: &SessionStore) -> Result<()> {
    let session = client
        .session()
        .await
        .context("login succeeded but no session was stored")?;
    store.save(&session)
}

async fn respond(client: &EventPlannerClient, view: &EventView, status: &str) -> Result<()> {
    if view.permits(Action::RespondCollaboration) {
        let status = status
            .parse::<CollaborationResponse>()
            .map_err(anyhow::Error::msg)?;
        client.respond_collaboration(view, status).await?;
    } else if view.permits(Action::RespondAttendance) {
        let status = status
            .parse::<AttendanceResponse>()
            .map_err(anyhow::Error::msg)?;
        client.respond_attendance(view, status).await?;
    } else {
        bail!("you have no invitation to respond to for this event");
    }
    Ok(())
}

fn parse_role_filter(raw: &str) -> Result<Option<Role>> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    Ok(Some(raw.parse::<Role>()?))
}

fn parse_event_date(raw: &str) -> Result<DateTime<Utc>> {
    parse_event_date_in(raw, &Local)
}

fn parse_event_date_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DDTHH:MM"))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|date| date.with_timezone(&Utc))
        .with_context(|| format!("'{raw}' does not exist in the local time zone"))
}
