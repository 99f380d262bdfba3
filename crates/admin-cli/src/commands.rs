use std::process::ExitCode;
use std::sync::Arc;

use admin_backend::admin::{CacheClearScope, ServiceTestKind, UsageLogQuery, UserQuery};
use admin_backend::api::Method;
use admin_backend::{ApiClient, ApiError, ApiRequest, ConfigManager, FileStore, Session, UploadForm};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{CacheCommand, Cli, Command, TestKind};

const LOGIN_HINT: &str = "Session expired or missing. Run `admin login` to sign in again.";

/// Builds the client from configuration and runs one command
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let manager = match cli.config {
        Some(path) => ConfigManager::with_path(path)?,
        None => ConfigManager::new()?,
    };
    let mut config = manager.get().with_env_overrides();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    debug!(base_url = %config.base_url, "Using API");

    let store = match config.credentials_file.clone() {
        Some(path) => FileStore::with_path(path, config.use_keyring),
        None => FileStore::new(config.use_keyring)?,
    };
    let session = Session::restore(Arc::new(store))
        .await
        .context("Failed to load stored credentials")?;
    let client = ApiClient::from_config(&config, session).context("Failed to build HTTP client")?;

    Ok(match cli.command {
        Command::Login(args) => emit(
            client
                .login(&args.email, &args.password)
                .await
                .into_result()
                .map(|body| login_summary(&body)),
        ),
        Command::Logout => emit(client.logout().await.into_result()),
        Command::Status => emit(Ok(serde_json::json!({
            "base_url": client.base_url(),
            "authenticated": client.is_authenticated().await,
        }))),
        Command::Request(args) => {
            let request = build_request(&args.method, &args.path, args.body.as_deref())?;
            emit(client.request(request).await.into_result())
        }
        Command::Dashboard => emit(client.dashboard_stats().await),
        Command::Users(args) => emit(
            client
                .list_users(&UserQuery {
                    page: args.page,
                    per_page: args.per_page,
                    search: args.search,
                })
                .await,
        ),
        Command::ApiKeys => emit(client.list_api_keys().await),
        Command::UsageLogs(args) => emit(
            client
                .usage_logs(&UsageLogQuery {
                    page: args.page,
                    per_page: args.per_page,
                    service_name: args.service,
                    status: args.status,
                    ..UsageLogQuery::default()
                })
                .await,
        ),
        Command::ExportLogs(args) => match client.export_logs(args.service.as_deref(), args.days).await {
            Ok(csv) => match args.output {
                Some(path) => {
                    tokio::fs::write(&path, csv)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Exported usage logs");
                    ExitCode::SUCCESS
                }
                None => {
                    print!("{csv}");
                    ExitCode::SUCCESS
                }
            },
            Err(err) => emit::<()>(Err(err)),
        },
        Command::TestApi(args) => emit(client.test_service(&args.service, test_kind(args.kind)).await),
        Command::Cache { command } => match command {
            CacheCommand::Stats => emit(client.cache_stats().await),
            CacheCommand::Clear { all } => {
                let scope = if all { CacheClearScope::All } else { CacheClearScope::Expired };
                emit(client.clear_cache(scope).await)
            }
        },
        Command::Queue => emit(client.queue_stats().await),
        Command::Health => emit(client.system_health().await),
        Command::Upload(args) => {
            let content = tokio::fs::read(&args.file)
                .await
                .with_context(|| format!("Failed to read {}", args.file.display()))?;
            let file_name = args
                .file
                .file_name()
                .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
            let form = UploadForm::new().file(args.field, file_name, args.mime, content);

            let response = client
                .upload(&args.path, form, Some(Arc::new(|p: f64| eprint!("\rUploading {p:>5.1}%"))))
                .await;
            eprintln!();
            emit(response.into_result())
        }
    })
}

/// Parses the method and body of an ad-hoc request
fn build_request(method: &str, path: &str, body: Option<&str>) -> Result<ApiRequest> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{method}'"))?;
    let mut request = ApiRequest::new(method, path);
    if let Some(body) = body {
        let value: serde_json::Value = serde_json::from_str(body).context("Body is not valid JSON")?;
        request = request.with_body(value);
    }
    Ok(request)
}

fn test_kind(kind: TestKind) -> ServiceTestKind {
    match kind {
        TestKind::Image => ServiceTestKind::Image,
        TestKind::Video => ServiceTestKind::Video,
        TestKind::Speech => ServiceTestKind::Speech,
    }
}

/// What `login` prints: the signed-in user, never the tokens
fn login_summary(body: &serde_json::Value) -> serde_json::Value {
    let user = body
        .get("user")
        .or_else(|| body.get("data").and_then(|d| d.get("user")))
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    serde_json::json!({ "authenticated": true, "user": user })
}

/// Prints a result as JSON and picks the exit code
fn emit<T: Serialize>(result: Result<T, ApiError>) -> ExitCode {
    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to encode output: {e}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("Error: {err}");
            if matches!(err, ApiError::AuthenticationRequired) {
                eprintln!("{LOGIN_HINT}");
            }
            ExitCode::from(exit_status(&err))
        }
    }
}

fn exit_status(err: &ApiError) -> u8 {
    match err {
        ApiError::AuthenticationRequired => 2,
        _ => 1,
    }
}
