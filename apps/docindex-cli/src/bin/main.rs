use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docindex_core::config::{Config, Settings};
use docindex_core::source::JsonDocumentSource;
use docindex_core::traits::DocumentSource;
use docindex_core::types::{FieldValue, SearchCursor};
use docindex_text::{as_filter, search, AnalyzerConfig, IndexHandle, Interrupt, OpenMode, QueryBuilder, SearchRequest};

const USAGE: &str = "Usage: docindex <ingest <dir> [--mode create|append|create-or-append] | query <text> [--limit N] [--after DOC:SCORE] [--range FIELD:MIN:MAX]>";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

/// Value following flag `args[i]`, or an error naming the flag.
fn flag_value<'a>(args: &'a [String], i: usize) -> anyhow::Result<&'a str> {
    args.get(i + 1).map(String::as_str).ok_or_else(|| anyhow!("{} requires a value", args[i]))
}

fn parse_mode(s: &str) -> anyhow::Result<OpenMode> {
    match s {
        "create" => Ok(OpenMode::Create),
        "append" => Ok(OpenMode::Append),
        "create-or-append" => Ok(OpenMode::CreateOrAppend),
        other => bail!("unknown mode '{other}'"),
    }
}

fn ingest(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let mut data_dir = None;
    let mut mode = OpenMode::CreateOrAppend;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--mode" => { mode = parse_mode(flag_value(args, i)?)?; i += 1; }
            a if !a.starts_with('-') => data_dir = Some(PathBuf::from(a)),
            other => bail!("unknown flag '{other}'"),
        }
        i += 1;
    }
    let data_dir = data_dir.ok_or_else(|| anyhow!("{USAGE}"))?;

    let schema = settings.index_schema()?;
    let docs = JsonDocumentSource::new(&data_dir).documents(&schema)?;
    let handle = IndexHandle::from_settings(&settings.index)?;
    let mut writer = handle.open_writer(&schema, &AnalyzerConfig::from(&settings.analyzer), mode)?;

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    for doc in &docs {
        writer.add_document(doc)?;
        pb.inc(1);
    }
    writer.close()?;
    pb.finish_with_message("committed");
    info!(count = docs.len(), location = %handle.location(), "ingest complete");
    println!("Indexed {} documents into {}", docs.len(), handle.location());
    Ok(())
}

fn query(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let mut text = None;
    let mut limit = settings.search.default_limit;
    let mut after = None;
    let mut range = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => { limit = flag_value(args, i)?.parse().context("--limit requires a number")?; i += 1; }
            "--after" => { after = Some(flag_value(args, i)?.parse::<SearchCursor>()?); i += 1; }
            "--range" => { range = Some(flag_value(args, i)?.to_string()); i += 1; }
            a if text.is_none() => text = Some(a.to_string()),
            other => bail!("unexpected argument '{other}'"),
        }
        i += 1;
    }
    let text = text.ok_or_else(|| anyhow!("{USAGE}"))?;

    let handle = IndexHandle::from_settings(&settings.index)?;
    let reader = handle.open_reader()?;

    let filter = match (&range, &reader) {
        (Some(arg), Some(reader)) => {
            let mut parts = arg.splitn(3, ':');
            let (Some(field), Some(min), Some(max)) = (parts.next(), parts.next(), parts.next()) else {
                bail!("--range expects FIELD:MIN:MAX, got '{arg}'");
            };
            let kind = reader.schema().get(field).map(|d| d.kind).ok_or_else(|| anyhow!("unknown field '{field}'"))?;
            let min = FieldValue::from_json(kind, &serde_json::Value::String(min.to_string()))?;
            let max = FieldValue::from_json(kind, &serde_json::Value::String(max.to_string()))?;
            as_filter(QueryBuilder::strict().numeric_range(field, min, max)?)
        }
        _ => None,
    };

    let interrupt = match settings.search.timeout_ms {
        0 => Interrupt::none(),
        ms => Interrupt::with_timeout(Duration::from_millis(ms)),
    };
    let request = SearchRequest::new(&text, &settings.search.fulltext_field)
        .limit(limit)
        .filter(filter.as_ref())
        .after(after)
        .interrupt(interrupt);
    let result = search(reader.as_ref(), &request, &AnalyzerConfig::from(&settings.analyzer))?;

    let out = serde_json::json!({
        "total_hits": result.total_hits,
        "documents": result.documents,
        "next_cursor": result.next_cursor().map(|c| c.to_string()),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => ingest(&settings, &args),
        "query" => query(&settings, &args),
        _ => { eprintln!("Unknown command: {}\n{USAGE}", cmd); std::process::exit(1); }
    }
}
