use clap::{Parser, Subcommand};
use resembla_core::{
    build_inverse_files, build_tokenizer, construct_resembla, IdentifiedResult, ResemblaConfig,
    ResemblaWithId, ScoredResult,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "resembla")]
#[command(about = "Similar sentence retrieval with n-gram indexing and edit-distance reranking")]
#[command(version)]
struct Args {
    /// Configuration file (TOML); RESEMBLA_* variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum score of returned texts (overrides config)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Max number of returned texts, 0 for unlimited (overrides config)
    #[arg(short = 'n', long)]
    max_response: Option<usize>,

    /// Attach corpus ids to results
    #[arg(long)]
    with_id: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Log level (debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve corpus texts similar to a query
    Find { query: String },

    /// Score a query against the given texts only
    Eval {
        query: String,
        #[arg(required = true)]
        candidates: Vec<String>,
    },

    /// Build inverse maps for every configured measure from the corpus
    Index,
}

fn log_level(name: &str) -> Level {
    match name {
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    FmtSubscriber::builder()
        .with_max_level(log_level(&args.log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let config = ResemblaConfig::load(args.config.as_deref())?;
    info!("Resembla {}", env!("CARGO_PKG_VERSION"));
    info!("  Corpus: {}", config.corpus_path.display());
    info!(
        "  Measures: {}",
        config
            .measures
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(",")
    );

    let tokenizer = build_tokenizer(&config.tokenizer)?;

    if let Command::Index = args.command {
        for summary in build_inverse_files(&config, &tokenizer)? {
            println!("{}\t{}\t{}", summary.measure, summary.rows, summary.path.display());
        }
        return Ok(());
    }

    let threshold = args.threshold.unwrap_or(config.threshold);
    let max_response = match args.max_response.unwrap_or(config.max_response) {
        0 => None,
        n => Some(n),
    };

    let resembla = construct_resembla(&config, tokenizer)?;
    let results: Vec<IdentifiedResult> = if args.with_id {
        let resembla = ResemblaWithId::from_corpus(resembla, &config.corpus_path, config.columns())?;
        match &args.command {
            Command::Find { query } => resembla.find(query, threshold, max_response)?,
            Command::Eval { query, candidates } => {
                resembla.eval(query, candidates, threshold, max_response)?
            }
            Command::Index => Vec::new(),
        }
    } else {
        let plain = match &args.command {
            Command::Find { query } => resembla.find(query, threshold, max_response)?,
            Command::Eval { query, candidates } => {
                resembla.eval(query, candidates, threshold, max_response)?
            }
            Command::Index => Vec::new(),
        };
        plain
            .into_iter()
            .map(|result| IdentifiedResult { result, id: None })
            .collect()
    };

    if args.json {
        if args.with_id {
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else {
            let plain: Vec<&ScoredResult> = results.iter().map(|r| &r.result).collect();
            println!("{}", serde_json::to_string_pretty(&plain)?);
        }
    } else {
        for r in &results {
            println!("{}", format_line(r, args.with_id));
        }
    }
    Ok(())
}

/// `[id\t]score\tmeasure\ttext`; unknown ids print as `-`
fn format_line(r: &IdentifiedResult, with_id: bool) -> String {
    let line = format!("{:.6}\t{}\t{}", r.result.score, r.result.measure, r.result.text);
    if !with_id {
        return line;
    }
    match r.id {
        Some(id) => format!("{}\t{}", id, line),
        None => format!("-\t{}", line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(id: Option<i64>) -> IdentifiedResult {
        IdentifiedResult {
            result: ScoredResult {
                text: "東京駅".into(),
                measure: "edit_distance".into(),
                score: 0.75,
            },
            id,
        }
    }

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(&result(None), false), "0.750000\tedit_distance\t東京駅");
        assert_eq!(format_line(&result(Some(3)), true), "3\t0.750000\tedit_distance\t東京駅");
        assert_eq!(format_line(&result(None), true), "-\t0.750000\tedit_distance\t東京駅");
    }

    #[test]
    fn test_parse_eval_arguments() {
        let args = Args::parse_from(["resembla", "-t", "0.5", "eval", "query", "a", "b"]);
        assert_eq!(args.threshold, Some(0.5));
        match args.command {
            Command::Eval { query, candidates } => {
                assert_eq!(query, "query");
                assert_eq!(candidates, vec!["a", "b"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_logs_at_info_by_default() {
        let args = Args::parse_from(["resembla", "index"]);
        assert_eq!(args.log_level, "info");
        assert_eq!(log_level(&args.log_level), Level::INFO);
        assert_eq!(log_level("warn"), Level::WARN);
        assert_eq!(log_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_eval_requires_candidates() {
        assert!(Args::try_parse_from(["resembla", "eval", "query"]).is_err());
    }
}
