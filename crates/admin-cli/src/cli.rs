use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "admin")]
#[command(about = "Admin dashboard API client")]
pub struct Cli {
    /// Path to the config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides the configured API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in with admin credentials
    Login(LoginArgs),
    /// End the session and forget stored tokens
    Logout,
    /// Show whether a session is stored
    Status,
    /// Send an arbitrary authenticated request
    Request(RequestArgs),
    /// Dashboard statistics
    Dashboard,
    /// List users
    Users(UsersArgs),
    /// List configured API keys
    ApiKeys,
    /// Browse API usage logs
    UsageLogs(UsageLogsArgs),
    /// Download usage logs as CSV
    ExportLogs(ExportLogsArgs),
    /// Check that a service's API key works
    TestApi(TestApiArgs),
    /// Cache statistics and maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
    /// Task queue statistics
    Queue,
    /// Overall system health
    Health,
    /// Upload a file as multipart form data
    Upload(UploadArgs),
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args)]
pub struct RequestArgs {
    /// HTTP method, e.g. GET or POST
    pub method: String,
    /// Endpoint path under the base URL
    pub path: String,
    /// JSON body
    #[arg(long)]
    pub body: Option<String>,
}

#[derive(Args)]
pub struct UsersArgs {
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 20)]
    pub per_page: u32,
}

#[derive(Args)]
pub struct UsageLogsArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 50)]
    pub per_page: u32,
    #[arg(long)]
    pub service: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Args)]
pub struct ExportLogsArgs {
    #[arg(long)]
    pub service: Option<String>,
    #[arg(long, default_value_t = 30)]
    pub days: u32,
    /// Write the CSV here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct TestApiArgs {
    /// Service name, e.g. openai
    pub service: String,
    #[arg(long, value_enum, default_value_t = TestKind::Image)]
    pub kind: TestKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TestKind {
    Image,
    Video,
    Speech,
}

#[derive(Subcommand)]
pub enum CacheCommand {
    Stats,
    /// Drop expired entries, or everything with --all
    Clear {
        #[arg(long)]
        all: bool,
    },
}

#[derive(Args)]
pub struct UploadArgs {
    /// Endpoint path under the base URL
    pub path: String,
    /// File to upload
    pub file: PathBuf,
    /// Form field carrying the file
    #[arg(long, default_value = "file")]
    pub field: String,
    #[arg(long, default_value = "application/octet-stream")]
    pub mime: String,
}
