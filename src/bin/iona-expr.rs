//! IONA expression tool.
//!
//! - `check`: run deploy-time integrity analysis on a bundle
//! - `eval`: deploy a bundle and evaluate one entrypoint
//! - `print-config`: print the example config with defaults
//!
//! Bundles are JSON: `{"sources": ["<hex>", ...], "constants": ["42", "0x2a"]}`.
//! Contexts are JSON arrays of rows of words.

use std::path::PathBuf;

use anyhow::{anyhow, Context as _};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use iona_expr::config::{DebugSinkKind, InterpreterConfig};
use iona_expr::host::Interpreter;
use iona_expr::vm::{
    bytecode::{ExpressionBundle, Source},
    context::Context,
    dispatch::OpcodeTable,
    integrity,
    word::{parse_word, Caller, Word},
};

// ── CLI Args ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "iona-expr", version, about = "IONA expression interpreter")]
struct Args {
    /// Path to config.toml; defaults apply when missing
    #[arg(long, default_value = "iona-expr.toml")]
    config: String,
    #[arg(long)]
    log_level: Option<String>,
    #[arg(long)]
    gas_limit: Option<u64>,
    #[arg(long)]
    max_call_depth: Option<usize>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    Check {
        bundle: PathBuf,
        /// Min outputs per entrypoint, comma separated
        #[arg(long, value_delimiter = ',', default_value = "0")]
        min_outputs: Vec<usize>,
    },
    Eval {
        bundle: PathBuf,
        #[arg(long, default_value_t = 0)]
        entrypoint: usize,
        #[arg(long, value_delimiter = ',', default_value = "0")]
        min_outputs: Vec<usize>,
        /// JSON file holding the context grid
        #[arg(long)]
        context: Option<PathBuf>,
        /// 32-byte caller as hex
        #[arg(long)]
        caller: Option<String>,
    },
    PrintConfig,
}

#[derive(Deserialize)]
struct BundleFile {
    sources:   Vec<String>,
    #[serde(default)]
    constants: Vec<String>,
}

// ── Input decoding ────────────────────────────────────────────────────────

fn load_bundle(path: &PathBuf) -> anyhow::Result<ExpressionBundle> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: BundleFile = serde_json::from_str(&raw)?;
    let sources = file
        .sources
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let bytes = hex::decode(h.trim_start_matches("0x")).with_context(|| format!("source {i}: bad hex"))?;
            Source::decode(&bytes).map_err(|e| anyhow!("source {i}: {e}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let constants = parse_words(&file.constants)?;
    Ok(ExpressionBundle::new(sources, constants))
}

fn parse_words(raw: &[String]) -> anyhow::Result<Vec<Word>> {
    raw.iter().map(|s| parse_word(s).map_err(|e| anyhow!(e))).collect()
}

fn load_context(path: Option<&PathBuf>) -> anyhow::Result<Context> {
    let Some(path) = path else { return Ok(Context::empty()) };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let rows: Vec<Vec<String>> = serde_json::from_str(&raw)?;
    let rows = rows.iter().map(|r| parse_words(r)).collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Context::new(rows))
}

fn parse_caller(raw: Option<&str>) -> anyhow::Result<Caller> {
    let mut caller = [0u8; 32];
    if let Some(h) = raw {
        let bytes = hex::decode(h.trim_start_matches("0x"))?;
        if bytes.len() != 32 {
            return Err(anyhow!("caller must be 32 bytes, got {}", bytes.len()));
        }
        caller.copy_from_slice(&bytes);
    }
    Ok(caller)
}

// ── Main ──────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if matches!(args.cmd, Cmd::PrintConfig) {
        print!("{}", InterpreterConfig::example_toml());
        return Ok(());
    }

    let mut cfg = InterpreterConfig::load(&args.config)?;
    if let Some(v) = &args.log_level      { cfg.observability.log_level = v.clone(); }
    if let Some(v) = args.gas_limit       { cfg.gas.limit = v; }
    if let Some(v) = args.max_call_depth  { cfg.limits.max_call_depth = v; }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.observability.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    match args.cmd {
        Cmd::Check { bundle, min_outputs } => {
            let bundle = load_bundle(&bundle)?;
            let report = integrity::check(&bundle, &OpcodeTable::standard(), cfg.limits(), &min_outputs)?;
            println!("id {}", bundle.id());
            for e in report.entrypoints {
                println!("entrypoint {}: outputs={} max_stack={}", e.source_index, e.outputs, e.max_stack);
            }
        }
        Cmd::Eval { bundle, entrypoint, min_outputs, context, caller } => {
            let bundle = load_bundle(&bundle)?;
            let context = load_context(context.as_ref())?;
            let caller = parse_caller(caller.as_deref())?;
            if cfg.observability.debug_sink == DebugSinkKind::None {
                info!("debug ops are discarded");
            }
            let mut host = Interpreter::new(cfg);
            let id = host.deploy(bundle, &min_outputs)?;
            let r = host.evaluate(&id, entrypoint, &context, &caller)?;
            let out = serde_json::json!({
                "expression": id.to_hex(),
                "stack": r.stack.iter().map(|w| format!("{w:#x}")).collect::<Vec<_>>(),
                "writes": r.writes.iter().map(|(k, v)| [format!("{k:#x}"), format!("{v:#x}")]).collect::<Vec<_>>(),
                "gas_used": r.gas_used,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Cmd::PrintConfig => {}
    }
    Ok(())
}
