//! 🚀 malstore-cli — the front desk of the sample archive.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Thin wrapper: parse args, set up logging, load config, run one subcommand against
//! a `ResultStore`, print what came back as a table. The library does the actual work.
//! Like a manager. 🦆

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use indicatif::{ProgressBar, ProgressStyle};
use malstore::app_config::{AppConfig, BackendConfig};
use malstore::{IndexSchema, IndexStatus, ResultStore, UpsertOutcome};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 🧫 Store malware-scan plugin results in Elasticsearch, one sample at a time.
#[derive(Debug, Parser)]
#[command(name = "malstore", version)]
struct Cli {
    /// TOML config file. Missing file = env vars and defaults only.
    #[arg(short, long, default_value = "malstore.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 🩺 Check the store once.
    Ping,
    /// ⏰ Poll until the store answers or the timeout runs out.
    Wait {
        /// Overrides `connection.wait_timeout_secs`.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// 🏗️ Create the index if it doesn't exist yet.
    EnsureIndex {
        /// Index name. Defaults to `index.name` from config.
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum, default_value_t = SchemaPreset::Samples)]
        schema: SchemaPreset,
    },
    /// 🔄 Write one plugin's result into a sample document.
    Upsert {
        sample_id: String,
        category: String,
        plugin: String,
        /// Plugin payload as a JSON object.
        #[arg(long, default_value = "{}")]
        data: String,
    },
    /// 🔐 Create a write-once document for a bare md5/sha1/sha256/sha512.
    StoreHash { hash: String },
    /// 📁 Hash a file on disk and create a write-once document for it.
    StoreFile {
        path: PathBuf,
        /// MIME type to record alongside the file metadata.
        #[arg(long)]
        mime: Option<String>,
    },
    /// 🔍 Fetch a sample document and print its source.
    Get { sample_id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaPreset {
    Samples,
    GeoAutocomplete,
}

impl SchemaPreset {
    fn schema(self) -> IndexSchema {
        match self {
            SchemaPreset::Samples => IndexSchema::samples(),
            SchemaPreset::GeoAutocomplete => IndexSchema::geo_autocomplete(),
        }
    }
}

/// 🚀 main() — where it all begins. The "I pressed enter and held my breath" moment.
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 println! debugging is a lifestyle choice we're trying to move past
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("onnection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
                || cause_str.contains("unplugged")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: Elasticsearch doesn't seem to be reachable. Check that it's running \
                 and that MALICE_ELASTICSEARCH_URL (or the [backend.Elasticsearch] config) points \
                 at it. In Docker: `docker ps`, then `docker compose up -d elasticsearch`. ☕"
            );
        }

        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    // 🔒 a missing config file is fine, env vars and defaults cover it
    let config_file = cli.config.as_path();
    let config_file = match config_file.try_exists().context(format!(
        "💀 Couldn't check whether the config file exists at '{}'. Permissions? Cosmic rays?",
        config_file.display()
    ))? {
        true => Some(config_file),
        false => None,
    };

    let mut app_config = malstore::load_config(config_file)
        .context("💀 Couldn't load the config. Check the TOML and any MALSTORE_* env vars.")?;
    detect_container(&mut app_config);

    let store = ResultStore::from_config(&app_config)
        .context("💀 Couldn't build the result store from config")?;
    info!("📡 backend: {}", store.backend().describe());

    match cli.command {
        Command::Ping => {
            let health = store.test_connection().await.context("💀 ping failed")?;
            print_table(&[
                ("backend", store.backend().describe()),
                ("cluster", health.cluster_name),
                ("status", format!("{:?}", health.status).to_lowercase()),
            ]);
        }
        Command::Wait { timeout_secs } => {
            let timeout = timeout_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| app_config.connection.wait_timeout());
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
            spinner.set_message(format!(
                "waiting for {} (up to {}s)",
                store.backend().describe(),
                timeout.as_secs()
            ));
            spinner.enable_steady_tick(Duration::from_millis(120));

            let waited = store.wait_for_connection(timeout).await;
            spinner.finish_and_clear();
            let health = waited.context("💀 the store never showed up")?;
            print_table(&[
                ("cluster", health.cluster_name),
                ("status", format!("{:?}", health.status).to_lowercase()),
            ]);
        }
        Command::EnsureIndex { name, schema } => {
            let name = name.unwrap_or_else(|| store.index_name().to_string());
            let status = store
                .ensure_index(&name, &schema.schema())
                .await
                .with_context(|| format!("💀 couldn't ensure index '{name}'"))?;
            let status = match status {
                IndexStatus::AlreadyExists => "already exists",
                IndexStatus::Created => "created",
                IndexStatus::CreatedUnacknowledged => "created (unacknowledged)",
            };
            print_table(&[("index", name), ("status", status.to_string())]);
        }
        Command::Upsert {
            sample_id,
            category,
            plugin,
            data,
        } => {
            let payload: Map<String, Value> = serde_json::from_str(&data)
                .context("💀 --data must be a JSON object, like '{\"infected\": false}'")?;
            let outcome = store
                .upsert(&sample_id, &category, &plugin, payload)
                .await
                .with_context(|| format!("💀 upsert of {category}.{plugin} into '{sample_id}' failed"))?;
            print_outcome(store.index_name(), &outcome);
        }
        Command::StoreHash { hash } => {
            let outcome = store
                .store_hash(&hash)
                .await
                .with_context(|| format!("💀 couldn't store hash '{hash}'"))?;
            print_outcome(store.index_name(), &outcome);
        }
        Command::StoreFile { path, mime } => {
            let sample = describe_file(&path, mime).await?;
            let outcome = store
                .store_file_info(sample)
                .await
                .with_context(|| format!("💀 couldn't store file info for '{}'", path.display()))?;
            print_outcome(store.index_name(), &outcome);
        }
        Command::Get { sample_id } => {
            match store
                .get_sample(&sample_id)
                .await
                .with_context(|| format!("💀 couldn't fetch '{sample_id}'"))?
            {
                Some(doc) => {
                    let version = doc.version.map_or_else(|| "-".to_string(), |v| v.to_string());
                    print_table(&[("id", doc.id.clone()), ("version", version)]);
                    println!("{}", serde_json::to_string_pretty(&doc.source)?);
                }
                None => bail!("sample '{sample_id}' not found in '{}'", store.index_name()),
            }
        }
    }

    Ok(())
}

// 🐳 `/.dockerenv` is how a process learns it's living in a container
fn detect_container(app_config: &mut AppConfig) {
    if let BackendConfig::Elasticsearch(es) = &mut app_config.backend {
        if !es.endpoint.in_docker && Path::new("/.dockerenv").exists() {
            info!("🐳 running inside a container, defaulting the Elasticsearch host accordingly");
            es.endpoint.in_docker = true;
        }
    }
}

/// 📁 name, size, sha256 (and mime when given) for a file on disk.
async fn describe_file(path: &Path, mime: Option<String>) -> Result<Map<String, Value>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("💀 couldn't read '{}'", path.display()))?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut sample = Map::new();
    sample.insert("name".into(), Value::String(name));
    sample.insert("size".into(), Value::from(bytes.len() as u64));
    sample.insert("sha256".into(), Value::String(sha256));
    if let Some(mime) = mime {
        sample.insert("mime".into(), Value::String(mime));
    }
    Ok(sample)
}

fn print_outcome(index: &str, outcome: &UpsertOutcome) {
    let version = outcome
        .version
        .map_or_else(|| "-".to_string(), |v| v.to_string());
    print_table(&[
        ("index", index.to_string()),
        ("id", outcome.id.clone()),
        ("result", outcome.result.as_str().to_string()),
        ("version", version),
    ]);
}

// 🍽️ two columns, key and value. Comfy.
fn print_table(rows: &[(&str, String)]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    for (key, value) in rows {
        table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    println!("{table}");
}
