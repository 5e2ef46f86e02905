use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use intake_core::{FormController, FormSession, SessionEvent, SubmitError};
use shared::{
    domain::{is_hex_color, DraftProject, FormField},
    protocol::{Catalog, SubmissionPhase, PROJECTS_COLLECTION},
};
use storage::{open_store, FirestoreConfig, Storage, StoreBackend, StoreConfig};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/intake.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a draft described in a TOML file.
    Submit {
        #[arg(long)]
        file: PathBuf,
        /// Write to Firestore instead of the local database.
        #[arg(long)]
        firestore_project: Option<String>,
        #[arg(long, env = "FIRESTORE_API_KEY", default_value = "")]
        firestore_api_key: String,
        #[arg(long, default_value_t = 0)]
        success_delay_ms: u64,
    },
    List {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    Show {
        id: String,
    },
    Catalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Submit {
            file,
            firestore_project,
            firestore_api_key,
            success_delay_ms,
        } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read draft '{}'", file.display()))?;
            let draft = parse_draft(&raw)?;
            let config = match firestore_project {
                Some(project_id) => StoreConfig {
                    backend: StoreBackend::Firestore,
                    database_url: cli.database_url,
                    firestore: Some(FirestoreConfig::new(project_id, firestore_api_key)),
                },
                None => StoreConfig {
                    backend: StoreBackend::Sqlite,
                    database_url: cli.database_url,
                    firestore: None,
                },
            };
            submit_draft(&config, draft, Duration::from_millis(success_delay_ms)).await?;
        }
        Command::List { limit } => {
            let storage = Storage::new(&cli.database_url).await?;
            for stored in storage.list_records(PROJECTS_COLLECTION, limit).await? {
                println!(
                    "{}  {}  {}",
                    stored.id,
                    stored.record.project_type,
                    stored.record.project_name
                );
            }
        }
        Command::Show { id } => {
            let storage = Storage::new(&cli.database_url).await?;
            let Some(stored) = storage.load_record(PROJECTS_COLLECTION, &id).await? else {
                bail!("no project with id {id}");
            };
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        Command::Catalog => {
            println!("{}", toml::to_string_pretty(&Catalog::get())?);
        }
    }

    Ok(())
}

/// Reads a draft in the same camelCase shape the form uses. Colors are
/// checked here since the form itself accepts any text.
fn parse_draft(raw: &str) -> Result<DraftProject> {
    let draft: DraftProject = toml::from_str(raw).context("draft file is not valid TOML")?;
    for field in [
        FormField::PrimaryColor,
        FormField::SecondaryColor,
        FormField::AccentColor,
    ] {
        let value = draft.field_value(field);
        if !is_hex_color(value) {
            bail!("{field} must be a #rrggbb color, got '{value}'");
        }
    }
    Ok(draft)
}

async fn submit_draft(config: &StoreConfig, draft: DraftProject, delay: Duration) -> Result<()> {
    let store = open_store(config).await?;
    let session = FormSession::with_options(store, FormController::from_draft(draft), delay);
    let mut events = session.subscribe();

    let result = session.submit().await;
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }

    match result {
        Ok(created) => println!("stored project id={}", created.id),
        Err(SubmitError::Invalid(failure)) => {
            for error in &failure.errors {
                eprintln!("  {error}");
            }
            bail!("draft is incomplete");
        }
        Err(err) => return Err(err.into()),
    }

    while let Ok(event) = events.recv().await {
        print_event(&event);
        if event == SessionEvent::Reset {
            break;
        }
    }
    session.close().await;
    Ok(())
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::PhaseChanged(SubmissionPhase::Failed { message }) => {
            println!("phase: failed ({message})")
        }
        SessionEvent::PhaseChanged(phase) => println!("phase: {}", phase.as_str()),
        SessionEvent::Reset => println!("form reset"),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
