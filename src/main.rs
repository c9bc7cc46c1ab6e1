use anyhow::{Context, Result};
use clap::Parser;
use pelotonscraper::{
    config::{Config, Credentials},
    fetch::PelotonClient,
    process::extract_subtrees,
    schema::write_table_parquet,
};
use serde_json::Value;
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(version, about = "Fetch a Peloton user overview and write it out as tables")]
struct CliArgs {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Output directory (overrides `output.dir`)
    #[arg(short, long)]
    out: Option<PathBuf>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// Normalize a saved overview payload instead of calling the API
    #[arg(long)]
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pelotonscraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let args = CliArgs::parse();
    info!(config = ?args.config, input = ?args.input, "startup");

    // ─── 2) config ───────────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(out) = &args.out {
        config.output.dir = out.clone();
    }

    // ─── 3) overview payload: saved file or live API ─────────────────
    let payload: Value = match &args.input {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading overview payload {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing overview payload {}", path.display()))?
        }
        None => {
            let creds = Credentials::resolve(args.username.clone(), args.password.clone(), |k| {
                std::env::var(k).ok()
            })?;
            let client = PelotonClient::new(config.api.clone())?;
            let user_id = client.get_user_id(&creds).await?;
            client.user_overview(&user_id).await.into_result()?
        }
    };

    // ─── 4) normalize ────────────────────────────────────────────────
    let specs = config.table_specs();
    // diagnostics are logged where they arise
    let normalized = extract_subtrees(&payload, &specs);

    // ─── 5) write / summarize ────────────────────────────────────────
    for spec in &specs {
        let Some(table) = normalized.output.get(&spec.name) else {
            continue;
        };
        info!(
            table = %spec.name,
            rows = table.num_rows(),
            columns = table.num_columns(),
            "table ready"
        );
        if config.output.parquet {
            write_table_parquet(&spec.name, table, &config.output.dir)?;
        }
    }

    info!(
        tables = specs.len(),
        warnings = normalized.diagnostics.len(),
        "all done"
    );
    Ok(())
}
