//! Command-line interface of the `stoabot` binary.
//!
//! Every subcommand is one complete run. Skips and failed posts are reported
//! as status lines and still exit 0; argument errors and unreadable input
//! files exit non-zero.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::flow::{BotContext, FlowOutcome, ImageOptions};
use crate::imaging::CardStyle;
use crate::llms::EngineSelection;
use crate::utilities::config::AppConfig;
use crate::utilities::printer::{Printer, Status};

#[derive(Debug, Parser)]
#[command(name = "stoabot", version, about = "Quote, fact and thread poster with a generation fallback chain")]
pub struct Cli {
    /// Color the status lines.
    #[arg(long, global = true)]
    pub color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// `--dry-run` / `--no-dry-run`; neither means `DRY_RUN_DEFAULT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Args)]
pub struct DryRunArgs {
    /// Print what would be posted without posting.
    #[arg(long, overrides_with = "no_dry_run")]
    dry_run: bool,

    /// Post even when DRY_RUN_DEFAULT is on.
    #[arg(long, overrides_with = "dry_run")]
    no_dry_run: bool,
}

impl DryRunArgs {
    pub fn flag(&self) -> Option<bool> {
        match (self.dry_run, self.no_dry_run) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// `--engine auto|provider|ollama|hf|fallback`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Args)]
pub struct EngineArgs {
    /// Text engine; `auto` walks the whole chain.
    #[arg(long, value_enum)]
    engine: Option<EngineSelection>,
}

impl EngineArgs {
    pub fn selection(&self) -> EngineSelection {
        self.engine.unwrap_or_default()
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate text and print it; nothing is posted.
    Generate {
        prompt: String,
        /// Character limit for this run (clamped to 1..=275).
        #[arg(long, allow_hyphen_values = true)]
        max_length: Option<i64>,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Generate from a prompt and post, avoiding recent duplicates.
    Post {
        prompt: String,
        #[command(flatten)]
        engine: EngineArgs,
        #[command(flatten)]
        dry_run: DryRunArgs,
    },
    /// Post the given text as is.
    PostText {
        text: String,
        #[command(flatten)]
        dry_run: DryRunArgs,
    },
    /// Post a fact, or a thread of facts when the cadence is due.
    PostFact {
        /// Fact subject; defaults to FACT_SUBJECT.
        #[arg(long)]
        subject: Option<String>,
        /// Post a thread now regardless of the cadence.
        #[arg(long)]
        thread: bool,
        #[command(flatten)]
        engine: EngineArgs,
        #[command(flatten)]
        dry_run: DryRunArgs,
    },
    /// Post a quote from the Stoic quote API.
    PostStoic {
        #[command(flatten)]
        dry_run: DryRunArgs,
    },
    /// Post a quote from the store.
    PostQuote {
        /// Days before a posted quote is eligible again.
        #[arg(long)]
        cooldown_days: Option<i64>,
        #[command(flatten)]
        dry_run: DryRunArgs,
    },
    /// Post a quote from the store rendered onto an image.
    PostQuoteImage {
        #[arg(long)]
        cooldown_days: Option<i64>,
        #[arg(long, value_enum, default_value_t = CardStyle::Card)]
        style: CardStyle,
        /// Background image file instead of a generated one.
        #[arg(long)]
        background: Option<PathBuf>,
        /// Also write the JPEG to this path.
        #[arg(long)]
        save: Option<PathBuf>,
        #[command(flatten)]
        engine: EngineArgs,
        #[command(flatten)]
        dry_run: DryRunArgs,
    },
    /// Add quotes to the store from a file and/or the online sources.
    Ingest {
        /// `.json` array, or one quote per line.
        #[arg(long)]
        path: Option<PathBuf>,
        /// Source label stored with each quote.
        #[arg(long)]
        source: Option<String>,
        /// Number of quotes to fetch from the rotating sources.
        #[arg(long, default_value_t = 0)]
        fetch: usize,
    },
    /// Report missing credentials and available capabilities.
    Health,
}

/// Load configuration, build the context and run `cli.command`.
pub async fn run(cli: Cli) -> anyhow::Result<FlowOutcome> {
    let config = AppConfig::load();
    let mut ctx = BotContext::from_config(config, Printer::new(cli.color));
    execute(&mut ctx, cli.command).await
}

/// Dispatch one subcommand against an existing context.
pub async fn execute(ctx: &mut BotContext, command: Command) -> anyhow::Result<FlowOutcome> {
    log::debug!("Running {:?}", command);
    let outcome = match command {
        Command::Generate {
            prompt,
            max_length,
            engine,
        } => ctx.generate(&prompt, engine.selection(), max_length).await,
        Command::Post {
            prompt,
            engine,
            dry_run,
        } => {
            let dry_run = ctx.dry_run(dry_run.flag());
            ctx.post(&prompt, engine.selection(), dry_run).await
        }
        Command::PostText { text, dry_run } => {
            let dry_run = ctx.dry_run(dry_run.flag());
            ctx.post_text(&text, dry_run).await
        }
        Command::PostFact {
            subject,
            thread,
            engine,
            dry_run,
        } => {
            let dry_run = ctx.dry_run(dry_run.flag());
            ctx.post_fact(subject.as_deref(), thread, engine.selection(), dry_run)
                .await
        }
        Command::PostStoic { dry_run } => {
            let dry_run = ctx.dry_run(dry_run.flag());
            ctx.post_stoic(dry_run).await
        }
        Command::PostQuote {
            cooldown_days,
            dry_run,
        } => {
            let dry_run = ctx.dry_run(dry_run.flag());
            ctx.post_quote(cooldown_days, dry_run).await
        }
        Command::PostQuoteImage {
            cooldown_days,
            style,
            background,
            save,
            engine,
            dry_run,
        } => {
            let dry_run = ctx.dry_run(dry_run.flag());
            let options = ImageOptions {
                style,
                background,
                save,
                engine: engine.selection(),
            };
            ctx.post_quote_image(cooldown_days, &options, dry_run).await
        }
        Command::Ingest {
            path,
            source,
            fetch,
        } => {
            if path.is_none() && fetch == 0 {
                ctx.printer
                    .status(Status::Skip, "Nothing to ingest: pass --path FILE or --fetch N.");
                return Ok(FlowOutcome::skipped("nothing to ingest"));
            }
            let report = ctx
                .ingest(path.as_deref(), source.as_deref(), fetch)
                .await
                .with_context(|| match &path {
                    Some(p) => format!("failed to ingest {}", p.display()),
                    None => "failed to ingest fetched quotes".to_string(),
                })?;
            FlowOutcome::Ingested(report)
        }
        Command::Health => FlowOutcome::Health(ctx.health()),
    };
    log::debug!("Outcome: {:?}", outcome);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use clap::CommandFactory;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stoabot").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_dry_run_flags() {
        let Command::PostText { dry_run, .. } = parse(&["post-text", "hi"]).command else {
            panic!("wrong command");
        };
        assert_eq!(dry_run.flag(), None);

        let Command::PostText { dry_run, .. } = parse(&["post-text", "hi", "--no-dry-run"]).command
        else {
            panic!("wrong command");
        };
        assert_eq!(dry_run.flag(), Some(false));

        let Command::PostStoic { dry_run } =
            parse(&["post-stoic", "--no-dry-run", "--dry-run"]).command
        else {
            panic!("wrong command");
        };
        assert_eq!(dry_run.flag(), Some(true));
    }

    #[test]
    fn test_generate_arguments() {
        let Command::Generate {
            prompt,
            max_length,
            engine,
        } = parse(&["generate", "stoic calm", "--max-length", "-5", "--engine", "hf"]).command
        else {
            panic!("wrong command");
        };
        assert_eq!(prompt, "stoic calm");
        assert_eq!(max_length, Some(-5));
        assert_eq!(engine.selection(), EngineSelection::Hf);
    }

    #[test]
    fn test_image_and_fact_arguments() {
        let Command::PostQuoteImage { style, save, cooldown_days, .. } = parse(&[
            "post-quote-image",
            "--style",
            "poster",
            "--save",
            "out.jpg",
            "--cooldown-days",
            "3",
        ])
        .command
        else {
            panic!("wrong command");
        };
        assert_eq!(style, CardStyle::Poster);
        assert_eq!(save, Some(PathBuf::from("out.jpg")));
        assert_eq!(cooldown_days, Some(3));

        let Command::PostFact { subject, thread, engine, .. } =
            parse(&["post-fact", "--subject", "chess", "--thread"]).command
        else {
            panic!("wrong command");
        };
        assert_eq!(subject.as_deref(), Some("chess"));
        assert!(thread);
        assert_eq!(engine.selection(), EngineSelection::Auto);
    }

    #[test]
    fn test_rejects_unknown_engine() {
        assert!(Cli::try_parse_from(["stoabot", "post", "x", "--engine", "gpt"]).is_err());
    }

    fn context(dir: &TempDir) -> BotContext {
        let mut vars = HashMap::new();
        vars.insert(
            "BOT_STATE_DIR".to_string(),
            dir.path().join("state").display().to_string(),
        );
        vars.insert(
            "QUOTES_STORE_PATH".to_string(),
            dir.path().join("quotes.json").display().to_string(),
        );
        BotContext::from_config(AppConfig::from_map(&vars), Printer::default())
    }

    #[tokio::test]
    async fn test_ingest_without_input_is_a_skip() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let outcome = execute(&mut ctx, parse(&["ingest"]).command).await.unwrap();
        assert_eq!(outcome, FlowOutcome::skipped("nothing to ingest"));
    }

    #[tokio::test]
    async fn test_ingest_unreadable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let missing = dir.path().join("missing.txt");
        let command = parse(&["ingest", "--path", missing.to_str().unwrap()]).command;
        let err = execute(&mut ctx, command).await.unwrap_err();
        assert!(err.to_string().contains("failed to ingest"));
    }

    #[tokio::test]
    async fn test_health_dispatch() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        let outcome = execute(&mut ctx, parse(&["health"]).command).await.unwrap();
        match outcome {
            FlowOutcome::Health(report) => {
                assert_eq!(report.missing_credentials.len(), 4);
                assert_eq!(report.image_backends, vec!["horde".to_string()]);
            }
            other => panic!("expected a health report, got {:?}", other),
        }
    }
}
