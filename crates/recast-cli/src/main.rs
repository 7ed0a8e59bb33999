use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use recast::{MutationRequest, Mutator, MutatorConfig};
use recast_client::MongoClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Find and replace text across every document of the configured collections.
#[derive(Debug, Parser)]
#[command(name = "recast", version)]
struct Cli {
    /// JSON file with connectionTarget, databaseName and collectionNames.
    #[arg(long, env = "RECAST_CONFIG")]
    config: PathBuf,

    /// Regular expression to search for.
    #[arg(long)]
    find: String,

    /// Regex options in MongoDB notation (i, m, s, x).
    #[arg(long, default_value = "")]
    flags: String,

    /// Text written in place of every match.
    #[arg(long)]
    replace: String,

    /// How to interpret --replace.
    #[arg(long, value_enum, default_value_t = ReplaceKind::Text)]
    replace_kind: ReplaceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReplaceKind {
    Text,
    Integer,
    Float,
    Boolean,
}

impl Cli {
    fn request(&self) -> anyhow::Result<MutationRequest> {
        let mut builder = MutationRequest::builder();
        builder.find(bson::Regex {
            pattern: self.find.clone(),
            options: self.flags.clone(),
        })?;

        let raw = self.replace.as_str();
        match self.replace_kind {
            ReplaceKind::Text => builder.replace_with(raw)?,
            ReplaceKind::Integer => builder.replace_with(
                raw.parse::<i64>()
                    .with_context(|| format!("{raw} is not an integer"))?,
            )?,
            ReplaceKind::Float => builder.replace_with(
                raw.parse::<f64>()
                    .with_context(|| format!("{raw} is not a number"))?,
            )?,
            ReplaceKind::Boolean => builder.replace_with(
                raw.parse::<bool>()
                    .with_context(|| format!("{raw} is not true or false"))?,
            )?,
        };
        Ok(builder.build()?)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = MutatorConfig::from_path(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let request = cli.request().context("invalid find/replace arguments")?;

    let client = MongoClient::new().with_app_name("recast");
    let mut mutator = Mutator::new(config, client)?;
    info!(
        database = %mutator.config().database_name,
        pattern = request.pattern().regex().as_str(),
        "starting mutation"
    );

    let report = mutator.execute(&request).await?;
    for collection in &report.collections {
        println!(
            "{}.{}: fetched {}, matched {}, modified {}",
            report.database,
            collection.collection,
            collection.fetched,
            collection.matched,
            collection.modified
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use recast::Replacement;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["recast", "--config", "recast.json"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_text_replacement() {
        let cli = parse(&["--find", "\\n", "--replace", ""]);
        assert_eq!(cli.replace_kind, ReplaceKind::Text);
        assert_eq!(cli.flags, "");

        let request = cli.request().unwrap();
        assert_eq!(request.replacement(), &Replacement::Text(String::new()));
        assert!(request.pattern().regex().is_match("a\nb"));
    }

    #[test]
    fn typed_replacements() {
        let cli = parse(&["--find", "x", "--replace", "42", "--replace-kind", "integer"]);
        assert_eq!(cli.request().unwrap().replacement(), &Replacement::Integer(42));

        let cli = parse(&["--find", "x", "--replace", "yes", "--replace-kind", "boolean"]);
        let err = cli.request().unwrap_err();
        assert!(err.to_string().contains("not true or false"));
    }

    #[test]
    fn flags_are_applied() {
        let cli = parse(&["--find", "^abc$", "--flags", "im", "--replace", "z"]);
        let request = cli.request().unwrap();
        assert!(request.pattern().regex().is_match("x\nABC"));

        let cli = parse(&["--find", "abc", "--flags", "q", "--replace", "z"]);
        assert!(cli.request().is_err());
    }
}
