//! LexSight: legal document analysis server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lexsight_core::{DocumentInput, LexSightConfig, SubmissionTracker};
use lexsight_runtime::Submission;
use lexsight_server::{jobs, routes, AppState};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_data_dir() -> PathBuf {
    std::env::var("LEXSIGHT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

/// Value following `flag` in `args`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Analyze one local file and print the result as JSON.
async fn analyze_file(path: &Path, persona: Option<&str>, job: Option<&str>) -> anyhow::Result<()> {
    let config = LexSightConfig::from_env(resolve_data_dir())?;
    let state = AppState::from_config(config)?;

    let doc = DocumentInput::from_path(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let submission = Submission::new(vec![doc], persona, job);

    let outcome = state
        .pipeline
        .process(submission, &SubmissionTracker::new(), &CancellationToken::new())
        .await
        .map_err(|e| match e {
            lexsight_core::Error::Extraction(inner) => {
                anyhow::anyhow!("{}\n{}", inner, inner.user_guidance())
            }
            other => other.into(),
        })?;

    println!("{}", serde_json::to_string_pretty(&outcome.record.result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "analyze" => {
                if args.len() < 3 {
                    eprintln!("Usage: lexsight analyze <file> [--persona P] [--job J]");
                    std::process::exit(1);
                }
                let rest = &args[3..];
                return analyze_file(
                    Path::new(&args[2]),
                    flag_value(rest, "--persona"),
                    flag_value(rest, "--job"),
                )
                .await;
            }
            "--help" | "-h" | "help" => {
                println!("LexSight: legal document analysis server");
                println!();
                println!("Usage: lexsight [command]");
                println!();
                println!("Commands:");
                println!("  (none)                          Start the server");
                println!("  analyze <file> [--persona P]    Analyze a PDF or text file and print JSON");
                println!("          [--job J]");
                println!("  help                            Show this help message");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'lexsight help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = LexSightConfig::from_env(&data_dir)?;
    let addr = format!("{}:{}", config.host, config.port);

    let state = Arc::new(AppState::from_config(config)?);

    // Start background job queue
    jobs::start_job_worker(state.clone());

    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("LexSight server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
