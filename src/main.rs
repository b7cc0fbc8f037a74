//! `hashgen` CLI entry point.
//!
//! Manages the algorithm store and runs algorithms by name, one at a time
//! (`run`) or concurrently from a request file (`batch`).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::debug;

use hashgen::capability::CapabilityRegistry;
use hashgen::config::HashgenConfig;
use hashgen::logging::{self, LoggingGuard};
use hashgen::{
    parse_key_order, AlgorithmDefinition, AlgorithmStore, Engine, Failure, FileStore, Invoker,
    StoreError,
};

/// Hashgen: run user-defined signing algorithms by name.
#[derive(Parser)]
#[command(name = "hashgen", version, about)]
struct Cli {
    /// Config file (defaults to `$HASHGEN_CONFIG_PATH` or `~/.hashgen/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// List stored algorithm names.
    List,
    /// Print an algorithm's source.
    Show {
        /// Algorithm name.
        name: String,
    },
    /// Store an algorithm, reading its source from a file or stdin.
    Save {
        /// Algorithm name.
        name: String,
        /// Source file; stdin when omitted.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Free-form description.
        #[arg(long, default_value = "")]
        description: String,
        /// Skip the load and contract check.
        #[arg(long)]
        no_check: bool,
    },
    /// Delete an algorithm.
    Delete {
        /// Algorithm name.
        name: String,
    },
    /// List the capabilities algorithms may call.
    Capabilities,
    /// Load and contract-check a source file without running it.
    Check {
        /// Source file; stdin when omitted.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Run an algorithm and print the digest.
    Run {
        /// Algorithm name.
        name: String,
        /// JSON object payload, or `@path` to read it from a file.
        #[arg(long)]
        payload: String,
        /// Secret passcode.
        #[arg(long)]
        passcode: String,
        /// Optional API key.
        #[arg(long)]
        api_key: Option<String>,
        /// Comma-separated key order, e.g. `"a,b"`.
        #[arg(long)]
        keys: Option<String>,
    },
    /// Run every request in a JSON array file concurrently.
    Batch {
        /// File holding `[{algorithm, payload, passcode, api_key?, key_order?}, ...]`.
        file: PathBuf,
    },
}

/// One entry of a batch file.
#[derive(Debug, Deserialize)]
struct BatchRequest {
    algorithm: String,
    payload: serde_json::Value,
    passcode: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    key_order: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config =
        HashgenConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let _logging_guard = init_logging(&config)?;

    match cli.command {
        Command::List => handle_list(&config),
        Command::Show { name } => handle_show(&config, &name),
        Command::Save {
            name,
            file,
            description,
            no_check,
        } => handle_save(&config, &name, file.as_deref(), description, no_check),
        Command::Delete { name } => handle_delete(&config, &name),
        Command::Capabilities => handle_capabilities(),
        Command::Check { file } => handle_check(&config, file.as_deref()),
        Command::Run {
            name,
            payload,
            passcode,
            api_key,
            keys,
        } => handle_run(&config, name, &payload, passcode, api_key, keys).await,
        Command::Batch { file } => handle_batch(&config, &file).await,
    }
}

fn init_logging(config: &HashgenConfig) -> anyhow::Result<Option<LoggingGuard>> {
    match &config.logging.logs_dir {
        Some(dir) => logging::init_file(dir, &config.logging.level).map(Some),
        None => {
            logging::init_cli(&config.logging.level);
            Ok(None)
        }
    }
}

fn open_store(config: &HashgenConfig) -> anyhow::Result<FileStore> {
    let path = config.store_path()?;
    FileStore::open(&path, config.store.seed_defaults)
        .with_context(|| format!("failed to open algorithm store at {}", path.display()))
}

/// Print `error[<kind>]: <detail>` and return the failure exit code.
fn report(failure: &Failure) -> ExitCode {
    eprintln!("error[{}]: {}", failure.kind, failure.detail);
    ExitCode::FAILURE
}

/// Map a store error to a reported failure when it is the caller's fault.
fn store_failure(name: &str, error: StoreError) -> anyhow::Result<ExitCode> {
    match error {
        StoreError::NotFound(_) => Ok(report(&Failure::not_found(name.trim()))),
        StoreError::InvalidName(_) => Ok(report(&Failure::invalid_input(error.to_string()))),
        other => Err(other.into()),
    }
}

fn read_source(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("failed to read source from stdin")?;
            Ok(source)
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn handle_list(config: &HashgenConfig) -> anyhow::Result<ExitCode> {
    let store = open_store(config)?;
    let mut out = io::stdout().lock();
    for name in store.list()? {
        writeln!(out, "{name}")?;
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_show(config: &HashgenConfig, name: &str) -> anyhow::Result<ExitCode> {
    let store = open_store(config)?;
    match store.get(name) {
        Ok(definition) => {
            print!("{}", definition.source);
            if !definition.source.ends_with('\n') {
                println!();
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => store_failure(name, e),
    }
}

fn handle_save(
    config: &HashgenConfig,
    name: &str,
    file: Option<&Path>,
    description: String,
    no_check: bool,
) -> anyhow::Result<ExitCode> {
    let source = read_source(file)?;
    if !no_check {
        let engine = Engine::new(config.engine_config());
        if let Err(failure) = engine.check(&source) {
            return Ok(report(&failure));
        }
    }
    let store = open_store(config)?;
    let definition = AlgorithmDefinition::new(name, source).with_description(description);
    match store.put(definition) {
        Ok(()) => {
            debug!(algorithm = %name.trim(), "saved");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => store_failure(name, e),
    }
}

fn handle_delete(config: &HashgenConfig, name: &str) -> anyhow::Result<ExitCode> {
    let store = open_store(config)?;
    match store.delete(name) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => store_failure(name, e),
    }
}

fn handle_capabilities() -> anyhow::Result<ExitCode> {
    let registry = CapabilityRegistry::standard();
    let mut out = io::stdout().lock();
    for spec in registry.specs() {
        let call = format!("{}/{}", spec.name, spec.arity());
        writeln!(out, "{call:<24} {}", spec.summary)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_check(config: &HashgenConfig, file: Option<&Path>) -> anyhow::Result<ExitCode> {
    let source = read_source(file)?;
    let engine = Engine::new(config.engine_config());
    match engine.check(&source) {
        Ok(()) => {
            println!("ok");
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => Ok(report(&failure)),
    }
}

fn build_invoker(config: &HashgenConfig) -> anyhow::Result<Arc<Invoker>> {
    let store: Arc<dyn AlgorithmStore> = Arc::new(open_store(config)?);
    Ok(Arc::new(Invoker::new(
        store,
        Engine::new(config.engine_config()),
    )))
}

/// Parse `--payload`, reading `@path` from disk.
fn read_payload(arg: &str) -> anyhow::Result<Result<serde_json::Value, Failure>> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read payload file {path}"))?,
        None => arg.to_owned(),
    };
    Ok(serde_json::from_str(&text)
        .map_err(|e| Failure::invalid_input(format!("payload is not valid JSON: {e}"))))
}

async fn handle_run(
    config: &HashgenConfig,
    name: String,
    payload: &str,
    passcode: String,
    api_key: Option<String>,
    keys: Option<String>,
) -> anyhow::Result<ExitCode> {
    let payload = match read_payload(payload)? {
        Ok(payload) => payload,
        Err(failure) => return Ok(report(&failure)),
    };
    let invoker = build_invoker(config)?;
    let key_order = keys.as_deref().and_then(parse_key_order);
    match invoker
        .invoke_async(name, payload, passcode, api_key, key_order)
        .await
    {
        Ok(digest) => {
            println!("{digest}");
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => Ok(report(&failure)),
    }
}

async fn handle_batch(config: &HashgenConfig, file: &Path) -> anyhow::Result<ExitCode> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read batch file {}", file.display()))?;
    let requests: Vec<BatchRequest> = match serde_json::from_str(&text) {
        Ok(requests) => requests,
        Err(e) => {
            return Ok(report(&Failure::invalid_input(format!(
                "batch file is not a JSON array of requests: {e}"
            ))))
        }
    };
    let invoker = build_invoker(config)?;

    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let invoker = Arc::clone(&invoker);
            tokio::spawn(async move {
                invoker
                    .invoke_async(
                        request.algorithm,
                        request.payload,
                        request.passcode,
                        request.api_key,
                        request.key_order,
                    )
                    .await
            })
        })
        .collect();

    let mut all_ok = true;
    for (index, handle) in handles.into_iter().enumerate() {
        let result = handle
            .await
            .unwrap_or_else(|e| Err(Failure::runtime(format!("invocation task failed: {e}"))));
        let line = match result {
            Ok(digest) => serde_json::json!({ "index": index, "digest": digest }),
            Err(failure) => {
                all_ok = false;
                serde_json::json!({
                    "index": index,
                    "error": { "kind": failure.kind.as_str(), "detail": failure.detail },
                })
            }
        };
        println!("{line}");
    }
    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
