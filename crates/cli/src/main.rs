use anyhow::Context;
use clap::{Parser, Subcommand};
use forms_core::config::{resolve_forms_dir, session_mode_from_env_value};
use forms_core::{
    assemble, filter_form_by_intent, EncounterIdentity, EncounterPayload, FieldValue, FormSession,
    FormsConfig, NoopObserver, ObsHandler, QuestionId, SchemaStore, SessionContext, SessionMode,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "forms")]
#[command(about = "Clinical encounter form engine CLI")]
struct Cli {
    /// Directory holding `<category>/<discipline>.yaml` form files
    #[arg(long, env = "FORMS_DIR")]
    forms_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all loaded forms
    List,
    /// Print a form reduced to one workflow intent
    Filter {
        category: String,
        discipline: String,
        /// Workflow intent, e.g. HTS_PRETEST (omit for the whole form)
        #[arg(long)]
        intent: Option<String>,
        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
    /// Enter values into a form and print the assembled submission
    Validate {
        category: String,
        discipline: String,
        /// JSON object of question id to value
        #[arg(long)]
        values: PathBuf,
        #[arg(long)]
        intent: Option<String>,
        /// Question ids to mark as intentionally left blank (comma-separated)
        #[arg(long, value_delimiter = ',')]
        unspecified: Vec<String>,
        /// Patient UUID (a fresh one is generated when omitted)
        #[arg(long)]
        patient: Option<Uuid>,
        /// Print the encounter payload instead of the submission
        #[arg(long)]
        payload: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("forms=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let default_mode = session_mode_from_env_value(std::env::var("FORMS_SESSION_MODE").ok())?;
    let config = FormsConfig::new(resolve_forms_dir(cli.forms_dir)?, default_mode)?;
    let store = SchemaStore::load_dir(config.forms_dir())?;

    match cli.command {
        Some(Commands::List) => {
            if store.is_empty() {
                println!("No forms found in {}", config.forms_dir().display());
            }
            for key in store.keys() {
                let form = store.get(&key.category, &key.discipline)?;
                println!("{key}: {}", form.id);
            }
        }
        Some(Commands::Filter {
            category,
            discipline,
            intent,
            json,
        }) => {
            let form = store.get(&category, &discipline)?;
            let filtered = filter_form_by_intent(intent.as_deref(), Some(form.as_ref()))?;
            if json {
                println!("{}", filtered.render_json()?);
            } else {
                print!("{}", filtered.render_yaml()?);
            }
        }
        Some(Commands::Validate {
            category,
            discipline,
            values,
            intent,
            unspecified,
            patient,
            payload,
        }) => {
            let form = store.get(&category, &discipline)?;
            let filtered = filter_form_by_intent(intent.as_deref(), Some(form.as_ref()))?.into_owned();

            let text = std::fs::read_to_string(&values)
                .with_context(|| format!("reading {}", values.display()))?;
            let values: BTreeMap<QuestionId, Option<FieldValue>> =
                serde_json::from_str(&text).context("values must be a JSON object")?;

            let encounter = EncounterIdentity::new_encounter(patient.unwrap_or_else(Uuid::new_v4));
            let context = SessionContext::new(config.default_mode(), encounter, NoopObserver);
            let mut session = FormSession::new(filtered, context)?.with_handler(ObsHandler);

            for (id, value) in values {
                enter_value(&mut session, &id, value)?;
            }
            for id in unspecified {
                let id = QuestionId::new(&id)?;
                session.set_unspecified(&id, true)?;
            }

            let submission = assemble(&session);
            if payload {
                let document =
                    EncounterPayload::build(session.form(), &submission, session.context().encounter());
                println!("{}", serde_json::to_string_pretty(&document)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&submission)?);
            }

            if submission.has_errors() {
                tracing::warn!(errors = submission.errors.len(), "submission has errors");
                return Ok(ExitCode::from(2));
            }
        }
        None => {
            println!("Use 'forms --help' for commands");
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Drive one question through the same events a user would produce.
///
/// Read-only sessions have no editing events, so values are loaded as they are.
fn enter_value(
    session: &mut FormSession,
    id: &QuestionId,
    value: Option<FieldValue>,
) -> anyhow::Result<()> {
    if session.mode() == SessionMode::View {
        session.prefill(id, value)?;
        return Ok(());
    }
    session.focus(id)?;
    session.input(id, value)?;
    session.blur(id)?;
    Ok(())
}
