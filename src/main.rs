mod aggregate;
mod catalog;
mod cli;
mod commands;
mod config;
mod extract;
mod pipeline;
mod providers;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::cli::LogFormat;
use crate::config::{CatalogConfig, DEFAULT_ENDPOINT, DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT_SECS};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Catalog file to write (overwritten if it exists)
    #[arg(index = 1)]
    output_path: Option<PathBuf>,

    /// Space-separated publishers to search, e.g. "Qwen bartowski"
    #[arg(index = 2)]
    publishers: Option<String>,

    /// Total memory of the machine in GB (defaults to 8 when unparseable)
    #[arg(index = 3)]
    total_mem_gb: Option<String>,

    /// Search GGUF repositories by keyword and print them as JSON, then exit
    #[arg(long)]
    search: Option<String>,

    /// Available memory in GB used to filter --search results (0 keeps all)
    #[arg(long, default_value_t = 0.0)]
    mem: f64,

    /// List the GGUF files of a repository (publisher/repo) as JSON, then exit
    #[arg(long)]
    files: Option<String>,

    /// Maximum number of requests in flight against the hub
    #[arg(short = 'c', long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    concurrency: usize,

    /// Per-request timeout in seconds, body read included
    #[arg(long = "timeout-secs", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Hub base URL
    #[arg(long, env = "HF_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormat,
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// The three positionals of a catalog run; clap marks them optional so the
/// `--search`/`--files` modes can run without them.
fn catalog_args(args: Args) -> Result<(PathBuf, String, String), clap::Error> {
    match (args.output_path, args.publishers, args.total_mem_gb) {
        (Some(output_path), Some(publishers), Some(total_mem)) => {
            Ok((output_path, publishers, total_mem))
        }
        _ => Err(Args::command().error(
            ErrorKind::MissingRequiredArgument,
            "expected <OUTPUT_PATH> <PUBLISHERS> <TOTAL_MEM_GB>",
        )),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_format);

    let config = CatalogConfig {
        endpoint: args.endpoint.clone(),
        max_concurrency: args.concurrency,
        request_timeout: Duration::from_secs(args.timeout_secs),
        ..Default::default()
    };
    config.validate()?;

    let rt = tokio::runtime::Runtime::new()?;

    if let Some(keyword) = &args.search {
        return rt.block_on(crate::commands::run_search(keyword, args.mem, &config));
    }

    if let Some(repo) = &args.files {
        return rt.block_on(crate::commands::run_files(repo, &config));
    }

    let (output_path, publishers, total_mem) = catalog_args(args).unwrap_or_else(|e| e.exit());

    rt.block_on(crate::commands::run_discover(
        output_path,
        crate::cli::parse_publishers(&publishers),
        crate::cli::parse_total_memory(&total_mem),
        &config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_catalog_args_requires_all_positionals() {
        for argv in [
            &["gguf-catalog"][..],
            &["gguf-catalog", "models.json"][..],
            &["gguf-catalog", "models.json", "Qwen bartowski"][..],
        ] {
            let err = catalog_args(parse(argv)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn test_catalog_args_accepts_three_positionals() {
        let args = parse(&["gguf-catalog", "models.json", "Qwen bartowski", "16"]);
        let (path, publishers, mem) = catalog_args(args).unwrap();
        assert_eq!(path, PathBuf::from("models.json"));
        assert_eq!(publishers, "Qwen bartowski");
        assert_eq!(mem, "16");
    }

    #[test]
    fn test_modes_parse_without_positionals() {
        let args = parse(&["gguf-catalog", "--search", "qwen", "--mem", "8"]);
        assert_eq!(args.search.as_deref(), Some("qwen"));
        assert_eq!(args.mem, 8.0);
        assert!(args.output_path.is_none());

        let args = parse(&["gguf-catalog", "--files", "Qwen/Qwen3-8B-GGUF"]);
        assert_eq!(args.files.as_deref(), Some("Qwen/Qwen3-8B-GGUF"));
    }
}
