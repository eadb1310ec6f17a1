use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use playbook_core::playbook::{parse_document, read_document, validate_rules_schema};
use playbook_core::{
    lint, signal_usage, Context, Engine, EngineConfig, Playbook, RuleSet, Severity,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a context against the playbook rules
    Evaluate {
        #[command(flatten)]
        sources: Sources,

        /// Context file (JSON or YAML), or "-" for stdin
        #[arg(short = 'x', long)]
        context: String,

        /// Print the per-rule trace instead of the match output
        #[arg(long)]
        explain: bool,
    },

    /// Validate rules against the schema and lint the playbook
    Check {
        #[command(flatten)]
        sources: Sources,
    },

    /// List the context signals each rule reads
    Signals {
        #[command(flatten)]
        sources: Sources,
    },
}

#[derive(Args)]
struct Sources {
    /// Playbook document: knowledge tree, optionally holding the rules
    #[arg(short, long)]
    playbook: PathBuf,

    /// Separate rules document, replacing the playbook's own rules
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Engine configuration (JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Documents as read from disk, before rule parsing.
struct Loaded {
    config: EngineConfig,
    playbook: Value,
    rules: Option<Value>,
}

impl Sources {
    fn load(&self) -> Result<Loaded> {
        let config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => EngineConfig::default(),
        };

        let playbook = load_document(&self.playbook)?;
        let rules = self.rules.as_deref().map(load_document).transpose()?;

        Ok(Loaded {
            config,
            playbook,
            rules,
        })
    }
}

impl Loaded {
    /// The raw rule list that will be used, for schema validation.
    fn rules_value(&self) -> Value {
        let document = self.rules.as_ref().unwrap_or(&self.playbook);
        match document {
            Value::Array(_) => document.clone(),
            other => other
                .get(&self.config.rules_key)
                .filter(|rules| !rules.is_null())
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
        }
    }

    fn into_playbook(self) -> Result<(Playbook, EngineConfig)> {
        let key = &self.config.rules_key;
        let mut playbook =
            Playbook::from_value(self.playbook, key).context("invalid playbook document")?;
        if let Some(rules) = self.rules {
            let rules = RuleSet::from_value(rules, key).context("invalid rules document")?;
            playbook = playbook.with_rules(rules);
        }
        Ok((playbook, self.config))
    }
}

fn load_document(path: &Path) -> Result<Value> {
    read_document(path).with_context(|| format!("failed to load {}", path.display()))
}

fn read_context(source: &str) -> Result<Context> {
    let value = if source == "-" {
        let mut contents = String::new();
        io::stdin()
            .read_to_string(&mut contents)
            .context("failed to read context from stdin")?;
        // YAML is a superset of JSON
        parse_document(&contents, false).context("failed to parse context from stdin")?
    } else {
        load_document(Path::new(source))?
    };

    match value {
        Value::Object(map) => Ok(Context::from(map)),
        Value::Null => Ok(Context::new()),
        _ => anyhow::bail!("context must be a mapping of signal names to values"),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Evaluate {
            sources,
            context,
            explain,
        } => {
            let (playbook, config) = sources.load()?.into_playbook()?;
            let engine = Engine::from_playbook(playbook, config).context("failed to build engine")?;
            let context = read_context(&context)?;
            debug!(signals = context.as_map().len(), "context loaded");

            if explain {
                print_json(&engine.explain(&context), cli.pretty)?;
            } else {
                print_json(&engine.evaluate_all(&context), cli.pretty)?;
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Check { sources } => {
            let loaded = sources.load()?;
            let mut errors = 0;
            let mut warnings = 0;

            if let Err(messages) = validate_rules_schema(&loaded.rules_value()) {
                for message in messages {
                    println!("error: schema: {}", message);
                    errors += 1;
                }
                eprintln!("{} error(s); rules do not match the schema", errors);
                return Ok(ExitCode::FAILURE);
            }

            let (playbook, config) = loaded.into_playbook()?;
            for issue in lint(&playbook, &config) {
                println!("{}", issue);
                match issue.severity {
                    Severity::Error => errors += 1,
                    Severity::Warning => warnings += 1,
                }
            }

            eprintln!(
                "{} rule(s) checked: {} error(s), {} warning(s)",
                playbook.rules().len(),
                errors,
                warnings
            );
            Ok(if errors > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }

        Commands::Signals { sources } => {
            let (playbook, _) = sources.load()?.into_playbook()?;
            print_json(&signal_usage(playbook.rules()), cli.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // stdout carries JSON output only
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_evaluate_args() {
        let cli = Cli::try_parse_from([
            "playbook",
            "-vv",
            "evaluate",
            "--playbook",
            "kb.yaml",
            "--context",
            "-",
            "--explain",
            "--pretty",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.pretty);
        assert!(matches!(
            cli.command,
            Commands::Evaluate { ref context, explain: true, .. } if context == "-"
        ));
    }

    fn loaded(playbook: Value, rules: Option<Value>) -> Loaded {
        Loaded {
            config: EngineConfig::default(),
            playbook,
            rules,
        }
    }

    #[test]
    fn test_rules_value_sources() {
        let embedded = loaded(json!({"ai_triggers": [{"id": "a"}]}), None);
        assert_eq!(embedded.rules_value(), json!([{"id": "a"}]));

        let separate = loaded(json!({"ai_triggers": []}), Some(json!([{"id": "b"}])));
        assert_eq!(separate.rules_value(), json!([{"id": "b"}]));

        let absent = loaded(json!({"tips": []}), None);
        assert_eq!(absent.rules_value(), json!([]));
    }

    #[test]
    fn test_separate_rules_replace_embedded() {
        let (playbook, _) = loaded(
            json!({"ai_triggers": [{"id": "a"}], "tips": []}),
            Some(json!({"ai_triggers": [{"id": "b"}, {"id": "c"}]})),
        )
        .into_playbook()
        .unwrap();
        let ids: Vec<&str> = playbook.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_unreadable_rule_does_not_abort_loading() {
        let (playbook, _) = loaded(
            json!({"ai_triggers": [
                {"id": "good", "condition": "a == 1"},
                {"id": "bad", "condition": null, "fetch": null},
                {"id": "odd", "priority": "high"}
            ]}),
            None,
        )
        .into_playbook()
        .unwrap();
        let ids: Vec<&str> = playbook.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["good", "bad"]);
        assert_eq!(playbook.rules().rejected().len(), 1);
    }
}
