use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vibe_resolver::catalog::{CatalogStore, NewCatalogEntry};
use vibe_resolver::config::{AppConfig, CliConfig, FileConfig};
use vibe_resolver::enrichment::EnrichmentReport;
use vibe_resolver::interpreter::{ChatTurn, PendingProposal, TurnInput};
use vibe_resolver::pipeline::{RequestPipeline, ResolutionOutcome, ResolutionStatus};
use vibe_resolver::vibe::VibeRuleSet;

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite catalog database file.
    #[clap(value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Values in the file override flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to a JSON vibe rule set.
    #[clap(long, value_parser = parse_path)]
    pub vibe: Option<PathBuf>,

    /// Base URL of an OpenAI-compatible chat completions API.
    #[clap(long)]
    pub llm_base_url: Option<String>,

    /// Model used for interpretation and classification.
    #[clap(long)]
    pub llm_model: Option<String>,

    /// YouTube Data API key. Discovery is disabled without it.
    #[clap(long)]
    pub discovery_api_key: Option<String>,
}

#[derive(Parser)]
#[command(name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Sends an utterance to the resolver, as a guest would in chat.
    Say { words: Vec<String> },

    /// Seeds the catalog from a JSON array of entries. Entries without
    /// moods are classified first.
    Import { path: String },

    /// Shows the catalog size and the resolver metrics.
    Stats,

    /// Shows the active vibe rules.
    Vibe,

    /// Forgets the conversation history and the pending proposal.
    Reset,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

/// Conversation state carried between turns.
#[derive(Default)]
struct Session {
    history: Vec<ChatTurn>,
    pending_proposal: Option<PendingProposal>,
}

impl Session {
    fn turn_input(&self, utterance: String) -> TurnInput {
        let input = TurnInput::new(utterance).with_history(self.history.clone());
        match &self.pending_proposal {
            Some(proposal) => input.with_pending_proposal(proposal.clone()),
            None => input,
        }
    }

    fn record(&mut self, utterance: String, outcome: &ResolutionOutcome) -> String {
        let reply = describe(outcome);
        self.pending_proposal = match outcome.status() {
            ResolutionStatus::Rejected => outcome.alternatives().first(),
            ResolutionStatus::NeedsDisambiguation => outcome.options().first(),
            _ => None,
        }
        .map(|e| PendingProposal::new(e.title.clone(), e.artist.clone()));
        self.history.push(ChatTurn::user(utterance));
        self.history.push(ChatTurn::assistant(reply.clone()));
        reply
    }
}

fn describe(outcome: &ResolutionOutcome) -> String {
    let reason = outcome.reason().unwrap_or_default();
    match outcome.status() {
        ResolutionStatus::Resolved => {
            let source = outcome.source().map(|s| s.label()).unwrap_or("catalog");
            match outcome.candidate() {
                Some(c) => format!("Queued {} (from {}).", c.label(), source),
                None => "Queued.".to_string(),
            }
        }
        ResolutionStatus::Rejected => {
            let rejected = outcome.candidate().map(|c| c.label()).unwrap_or_default();
            match outcome.alternatives() {
                [] => format!("{} doesn't fit the vibe: {}.", rejected, reason),
                alternatives => {
                    let list = alternatives
                        .iter()
                        .map(|a| a.label())
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!(
                        "{} doesn't fit the vibe: {}. How about {}?",
                        rejected, reason, list
                    )
                }
            }
        }
        ResolutionStatus::NeedsDisambiguation => {
            let list = outcome
                .options()
                .iter()
                .map(|o| o.label())
                .collect::<Vec<_>>()
                .join(", ");
            format!("Which one? {}", list)
        }
        ResolutionStatus::NotFound => "I couldn't find that song.".to_string(),
        ResolutionStatus::NotARequest => "That didn't sound like a song request.".to_string(),
    }
}

async fn import_entries(pipeline: &RequestPipeline, path: &Path) -> Result<()> {
    let enrichment = pipeline
        .enrichment()
        .context("Enrichment is not configured")?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {:?}", path))?;
    let entries: Vec<NewCatalogEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse import file: {:?}", path))?;

    let (mut inserted, mut present, mut skipped) = (0, 0, 0);
    for entry in entries {
        let label = format!("\"{}\" by {}", entry.title, entry.artist);
        match enrichment.seed(entry).await {
            EnrichmentReport::Inserted(_) => inserted += 1,
            EnrichmentReport::AlreadyPresent(_) => present += 1,
            EnrichmentReport::Skipped(reason) => {
                println!("  skipped {}: {}", label, reason);
                skipped += 1;
            }
        }
    }
    println!(
        "Imported {} entries ({} already present, {} skipped)",
        inserted, present, skipped
    );
    Ok(())
}

async fn execute_command(
    line: String,
    pipeline: &RequestPipeline,
    rules: Option<&VibeRuleSet>,
    session: &mut Session,
) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            match cli.command {
                InnerCommand::Say { words } => {
                    let utterance = words.join(" ");
                    if utterance.trim().is_empty() {
                        return CommandExecutionResult::Error("Nothing to say".to_string());
                    }
                    let outcome = pipeline
                        .resolve(session.turn_input(utterance.clone()), rules)
                        .await;
                    let reply = session.record(utterance, &outcome);
                    println!("{}", reply);
                    if let Some(report) = outcome.enrichment() {
                        println!("  (catalog: {})", report.label());
                    }
                }
                InnerCommand::Import { path } => {
                    let path = match parse_path(&path) {
                        Ok(p) => p,
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    if let Err(err) = import_entries(pipeline, &path).await {
                        return CommandExecutionResult::Error(format!("{:#}", err));
                    }
                }
                InnerCommand::Stats => {
                    match pipeline.catalog().count() {
                        Ok(count) => println!("Catalog entries: {}", count),
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                    println!("\n{}", vibe_resolver::metrics::gather_metrics());
                }
                InnerCommand::Vibe => match rules {
                    Some(rules) => println!("{:#?}", rules),
                    None => println!("No vibe rules set, everything is allowed."),
                },
                InnerCommand::Reset => {
                    *session = Session::default();
                    println!("Conversation reset.");
                }
                InnerCommand::Exit => return CommandExecutionResult::Exit,
            }
        }

        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct CommandHelper {
    commands_names: Vec<String>,
}

impl CommandHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        CommandHelper { commands_names }
    }
}

impl Completer for CommandHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for CommandHelper {}
impl Validator for CommandHelper {}
impl Helper for CommandHelper {}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db_path,
        vibe_path: cli_args.vibe,
        llm_base_url: cli_args.llm_base_url,
        llm_model: cli_args.llm_model,
        discovery_api_key: cli_args.discovery_api_key,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    vibe_resolver::metrics::init_metrics();

    let rules = match &config.vibe_path {
        Some(path) => {
            info!("Loading vibe rules from {:?}", path);
            Some(VibeRuleSet::load(path)?)
        }
        None => None,
    };

    info!("Opening catalog at {:?}...", config.db_path);
    let pipeline = RequestPipeline::from_config(&config)?;
    let mut session = Session::default();

    InnerCli::command().print_long_help()?;

    let editor_config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<CommandHelper, FileHistory>::with_config(editor_config)?;
    rl.set_helper(Some(CommandHelper::new()));

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &pipeline, rules.as_ref(), &mut session).await {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        eprintln!("Error: {}", err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
