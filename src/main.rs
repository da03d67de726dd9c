use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use clinic_session::backend::gotrue::{GoTrueClient, GoTrueInitError};
use clinic_session::backend::memory::MemoryBackend;
use clinic_session::guard::{self, GuardDecision};
use clinic_session::{AuthBackend, NamePrompt, PromptRequest, Session, SessionStore, StoreError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("backend init failed: {0}")]
    Init(#[from] GoTrueInitError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Auth(String),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendKind {
    /// GoTrue / Supabase Auth configured from `AUTH_*` env vars.
    Gotrue,
    /// Throwaway in-process account table.
    Memory,
}

#[derive(Parser, Debug)]
#[command(name = "clinic-login", about = "Sign in (or sign up) against the clinic auth backend")]
struct Cli {
    #[arg(long, env = "CLINIC_EMAIL")]
    email: String,

    #[arg(long, env = "CLINIC_PASSWORD", hide_env_values = true)]
    password: String,

    #[arg(long, value_enum, default_value_t = BackendKind::Gotrue)]
    backend: BackendKind,

    /// Sign out again after a successful login.
    #[arg(long)]
    sign_out: bool,
}

/// Name prompt on the terminal. An empty line cancels.
struct StdinPrompt;

#[async_trait::async_trait]
impl NamePrompt for StdinPrompt {
    async fn prompt_for_name(&self, request: &PromptRequest) -> Option<String> {
        let mut stderr = tokio::io::stderr();
        let banner = format!("{}\nYour name (empty to cancel): ", request.message);
        stderr.write_all(banner.as_bytes()).await.ok()?;
        stderr.flush().await.ok()?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .ok()?;
        let name = line.trim();
        (!name.is_empty()).then(|| name.to_owned())
    }
}

fn build_backend(kind: BackendKind) -> Result<Arc<dyn AuthBackend>, CliError> {
    let backend: Arc<dyn AuthBackend> = match kind {
        BackendKind::Gotrue => Arc::new(GoTrueClient::from_env()?),
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
    };
    Ok(backend)
}

fn outcome(session: &Session) -> Result<(), CliError> {
    match guard::evaluate(session) {
        GuardDecision::Allow => {
            let label = session.user_label().unwrap_or("unknown user");
            println!("Logged in as {label}");
            Ok(())
        }
        _ if session.cancelled => {
            println!("Sign up cancelled.");
            Ok(())
        }
        _ => Err(CliError::Auth(
            session
                .failure_message()
                .unwrap_or_else(|| "Authentication failed. Please try again.".to_owned()),
        )),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let store = Arc::new(SessionStore::new(build_backend(cli.backend)?));
    let listener = store.spawn_auth_listener();

    let restored = store.fetch_user().await?;
    if restored.is_authenticated {
        tracing::info!("existing session found");
    }

    let session = store
        .sign_in_or_sign_up(&cli.email, &cli.password, &StdinPrompt)
        .await?;
    outcome(&session)?;

    if cli.sign_out && session.is_authenticated {
        let after = store.sign_out().await?;
        if let Some(err) = after.error {
            return Err(CliError::Auth(err.to_string()));
        }
        println!("Signed out.");
    }

    listener.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
