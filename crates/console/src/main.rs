//! `thesis-console` -- terminal admin console for the thesis render backend.
//!
//! `watch` keeps the job, user and stats views synchronized with the
//! backend and redraws whenever the rendered view changes.  The remaining
//! subcommands run once: list, inspect, or send one moderation command and
//! print the refreshed list.
//!
//! # Environment variables
//!
//! | Variable                      | Default                 | Description                      |
//! |-------------------------------|-------------------------|----------------------------------|
//! | `THESIS_BACKEND_URL`          | `http://localhost:8080` | Backend base URL                 |
//! | `THESIS_USERNAME`             | --                      | Log in before the command        |
//! | `THESIS_PASSWORD`             | --                      | Password for the login           |
//! | `THESIS_POLL_INTERVAL_SECS`   | `5`                     | Seconds between poll rounds      |
//! | `THESIS_REQUEST_TIMEOUT_SECS` | `30`                    | Per-request HTTP timeout         |
//! | `THESIS_DOWNLOAD_ROOT`        | `/output/`              | Public root of finished outputs  |
//! | `THESIS_LOG_FORMAT`           | `text`                  | `json` for structured log lines  |
//! | `THESIS_CLIPBOARD_CMD`        | platform default        | Clipboard helper for `copy-uid`  |

mod cli;
mod config;
mod prompt;

use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use thesis_client::api::ThesisApi;
use thesis_client::backend::JobSource;
use thesis_client::clipboard::{copy_uid, CommandClipboard, Notice};
use thesis_client::dispatcher::{
    ActionDispatcher, ActionOutcome, AdminAction, AlwaysConfirm, Confirm, RefreshTrigger,
};
use thesis_client::reconciler::{Command, Reconciler, ReconcilerConfig};
use thesis_client::session::{self, Session};
use thesis_client::view::{ConsoleView, Table, ViewOptions};
use thesis_core::sync::Resource;
use thesis_core::user::NewUser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FilterArgs};
use crate::config::ConsoleConfig;
use crate::prompt::StdinConfirm;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = ConsoleConfig::from_env()?.with_cli(&cli);

    let api = Arc::new(
        ThesisApi::new(&config.backend_url, config.request_timeout)
            .context("Failed to build HTTP client")?,
    );
    tracing::debug!(backend = %api.base_url(), "Console starting");

    let session = open_session(&api, &config).await?;

    match cli.command {
        Commands::Watch { own, ref filter } => {
            require_session(&session, own)?;
            watch(api, &config, own, filter).await
        }
        Commands::Jobs { own, ref filter } => {
            require_session(&session, own)?;
            let (mut reconciler, _handle) =
                Reconciler::new(api, reconciler_config(&config, own));
            reconciler.sync_once(Resource::Jobs).await;
            apply_filters(&mut reconciler, filter).await;
            print_jobs(&reconciler.view());
            Ok(())
        }
        Commands::Users => {
            session.require_admin()?;
            let (mut reconciler, _handle) = Reconciler::new(api, reconciler_config(&config, false));
            reconciler.sync_once(Resource::Users).await;
            print_users(&reconciler.view());
            Ok(())
        }
        Commands::Stats => {
            session.require_admin()?;
            let (mut reconciler, _handle) = Reconciler::new(api, reconciler_config(&config, false));
            reconciler.sync_once(Resource::Stats).await;
            let view = reconciler.view();
            println!("Templates: {}   Renders: {}", view.total_templates, view.total_renders);
            print_notices(&view);
            Ok(())
        }
        Commands::Status { ref uid } => {
            let status = api.render_status(uid).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Commands::CreateUser {
            ref username,
            ref password,
            ref role,
        } => {
            let user = NewUser::new(username, password, role)?;
            run_action(api, &config, &session, AdminAction::CreateUser(user), cli.yes).await
        }
        Commands::BlockUser { ref username } => {
            let action = AdminAction::BlockUser { username: username.clone() };
            run_action(api, &config, &session, action, cli.yes).await
        }
        Commands::UnblockUser { ref username } => {
            let action = AdminAction::UnblockUser { username: username.clone() };
            run_action(api, &config, &session, action, cli.yes).await
        }
        Commands::DeleteUser { ref username } => {
            let action = AdminAction::DeleteUser { username: username.clone() };
            run_action(api, &config, &session, action, cli.yes).await
        }
        Commands::RestartJob { ref uid } => {
            let action = AdminAction::RestartJob { uid: uid.clone() };
            run_action(api, &config, &session, action, cli.yes).await
        }
        Commands::DeleteJob { ref uid } => {
            let action = AdminAction::DeleteJob { uid: uid.clone() };
            run_action(api, &config, &session, action, cli.yes).await
        }
        Commands::CopyUid { ref uid } => {
            match copy_uid(&CommandClipboard::detect(), uid).await {
                Notice::Info(msg) => println!("{msg}"),
                Notice::Error(msg) => eprintln!("{msg}"),
            }
            Ok(())
        }
        Commands::Whoami => {
            match session.identity() {
                Some(identity) => println!("{} ({})", identity.username, identity.role),
                None => println!("Not logged in"),
            }
            Ok(())
        }
        Commands::Logout => {
            let session = session::logout(api.as_ref()).await;
            if session.identity().is_none() {
                println!("Logged out");
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "thesis_console=info,thesis_client=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so printed views stay clean on stdout.
    if std::env::var("THESIS_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

async fn open_session(api: &ThesisApi, config: &ConsoleConfig) -> anyhow::Result<Session> {
    match &config.username {
        Some(username) => {
            let password = config.password.as_deref().unwrap_or_default();
            Ok(session::login(api, username, password).await?)
        }
        None => Ok(session::check_session(api).await),
    }
}

/// Admin views need an admin session; the own history needs any session.
fn require_session(session: &Session, own: bool) -> anyhow::Result<()> {
    if own {
        anyhow::ensure!(session.identity().is_some(), "Not logged in");
    } else {
        session.require_admin()?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

fn reconciler_config(config: &ConsoleConfig, own: bool) -> ReconcilerConfig {
    let mut reconciler = if own {
        ReconcilerConfig::own_history(config.poll_interval)
    } else {
        ReconcilerConfig {
            poll_interval: config.poll_interval,
            ..ReconcilerConfig::default()
        }
    };
    reconciler.view = ViewOptions {
        source: if own { JobSource::Own } else { JobSource::Admin },
        download_root: config.download_root.clone(),
    };
    reconciler
}

fn filter_commands(filter: &FilterArgs) -> [Command; 3] {
    [
        Command::SetUidFilter(filter.uid.clone()),
        Command::SetStatusFilter(filter.status()),
        Command::SetUserFilter(filter.user()),
    ]
}

async fn apply_filters(reconciler: &mut Reconciler<ThesisApi>, filter: &FilterArgs) {
    for command in filter_commands(filter) {
        reconciler.handle_command(command).await;
    }
}

async fn watch(
    api: Arc<ThesisApi>,
    config: &ConsoleConfig,
    own: bool,
    filter: &FilterArgs,
) -> anyhow::Result<()> {
    let (reconciler, handle) = Reconciler::new(api, reconciler_config(config, own));
    for command in filter_commands(filter) {
        handle.send(command);
    }

    let cancel = CancellationToken::new();
    let task = tokio::spawn(reconciler.run(cancel.clone()));
    let mut views = handle.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                // Clear the screen and redraw from the top.
                print!("\x1b[2J\x1b[H{view}");
            }
        }
    }

    cancel.cancel();
    task.await.context("Reconciler task failed")?;
    Ok(())
}

fn print_notices(view: &ConsoleView) {
    for notice in &view.notices {
        eprintln!("! {notice}");
    }
}

fn print_jobs(view: &ConsoleView) {
    print_notices(view);
    match &view.jobs {
        Table::Loading => println!("No data"),
        Table::Error(msg) => println!("{msg}"),
        Table::Empty => println!("No renders"),
        Table::Rows(rows) => {
            for row in rows {
                println!(
                    "{:>3}  {:<24} {:<20} {:<12} {:<16} {:<10} {:>3}%  {}",
                    row.index,
                    row.uid,
                    row.template,
                    row.user,
                    row.when,
                    row.badge.label,
                    row.percent,
                    row.download.as_deref().unwrap_or(""),
                );
            }
        }
    }
}

fn print_users(view: &ConsoleView) {
    print_notices(view);
    match &view.users {
        Table::Loading => println!("No data"),
        Table::Error(msg) => println!("{msg}"),
        Table::Empty => println!("No users"),
        Table::Rows(rows) => {
            for row in rows {
                println!("{:<20} {:<10} {}", row.username, row.role, row.status);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Collects refresh requests so a one-shot run can perform them after the
/// action returns.
#[derive(Clone, Default)]
struct DeferredRefresh {
    requested: Arc<Mutex<Vec<Resource>>>,
}

impl DeferredRefresh {
    fn take(&self) -> Vec<Resource> {
        match self.requested.lock() {
            Ok(mut requested) => std::mem::take(&mut *requested),
            Err(_) => Vec::new(),
        }
    }
}

impl RefreshTrigger for DeferredRefresh {
    fn refresh(&self, resource: Resource) {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(resource);
        }
    }
}

async fn run_action(
    api: Arc<ThesisApi>,
    config: &ConsoleConfig,
    session: &Session,
    action: AdminAction,
    assume_yes: bool,
) -> anyhow::Result<()> {
    session.require_admin()?;

    let trigger = DeferredRefresh::default();
    let dispatcher = ActionDispatcher::new(Arc::clone(&api), trigger.clone());
    let confirm: &dyn Confirm = if assume_yes { &AlwaysConfirm } else { &StdinConfirm };

    match dispatcher.dispatch(action, confirm).await? {
        ActionOutcome::Cancelled => {
            println!("Cancelled");
            return Ok(());
        }
        ActionOutcome::Completed { .. } => println!("Done"),
    }

    let (mut reconciler, _handle) = Reconciler::new(api, reconciler_config(config, false));
    for resource in trigger.take() {
        reconciler.sync_once(resource).await;
        match resource {
            Resource::Jobs => print_jobs(&reconciler.view()),
            Resource::Users => print_users(&reconciler.view()),
            Resource::Stats => print_notices(&reconciler.view()),
        }
    }
    Ok(())
}
