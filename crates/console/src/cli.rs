use clap::{Args, Parser, Subcommand};
use thesis_core::job::JobStatus;
use thesis_core::roles::DEFAULT_ROLE;

/// Thesis console - terminal admin console for the thesis render backend
#[derive(Parser, Debug)]
#[command(name = "thesis-console")]
#[command(version)]
#[command(about = "Watch and moderate render jobs and accounts", long_about = None)]
pub struct Cli {
    /// Backend URL (e.g., http://localhost:8080)
    #[arg(short = 'u', long = "url", global = true)]
    pub url: Option<String>,

    /// Log in as this user before running the command
    #[arg(long = "username", global = true)]
    pub username: Option<String>,

    /// Password for --username
    #[arg(long = "password", global = true)]
    pub password: Option<String>,

    /// Seconds between reconciliation rounds in watch mode
    #[arg(
        long = "interval",
        value_name = "SECONDS",
        global = true,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: Option<u64>,

    /// Do not ask before destructive actions
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Keep the job, user and stats views in sync and redraw on change
    Watch {
        /// Follow your own render history instead of the admin views
        #[arg(long)]
        own: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Print the job list once
    Jobs {
        /// List your own render history instead of every job
        #[arg(long)]
        own: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Print the managed accounts once
    Users,

    /// Print the template and render counters
    Stats,

    /// Print the raw status document of one job
    Status { uid: String },

    /// Create an account
    CreateUser {
        username: String,

        #[arg(long)]
        password: String,

        #[arg(long, default_value = DEFAULT_ROLE)]
        role: String,
    },

    /// Block an account
    BlockUser { username: String },

    /// Unblock an account
    UnblockUser { username: String },

    /// Delete an account
    DeleteUser { username: String },

    /// Restart a render job
    RestartJob { uid: String },

    /// Delete a render job
    DeleteJob { uid: String },

    /// Copy a job uid to the clipboard
    CopyUid { uid: String },

    /// Show the logged-in account
    Whoami,

    /// End the session
    Logout,
}

/// Job list filters; all of them must match.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Case-insensitive uid substring
    #[arg(long = "uid", default_value = "")]
    pub uid: String,

    /// Exact status (queued, rendering, done, error, ...)
    #[arg(long = "status")]
    pub status: Option<String>,

    /// Exact job owner
    #[arg(long = "user")]
    pub user: Option<String>,
}

impl FilterArgs {
    pub fn status(&self) -> Option<JobStatus> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(JobStatus::from)
    }

    pub fn user(&self) -> Option<String> {
        self.user.clone().filter(|u| !u.is_empty())
    }
}
