use std::{io::BufRead, path::{Path, PathBuf}, sync::Arc};

use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::WrapErr;
use rustyline::{DefaultEditor, error::ReadlineError};
use serde::Serialize;
use tokio::{runtime::Runtime, sync::watch};
use tracing::{debug, error, metadata::LevelFilter};
use tracing_subscriber::EnvFilter;

use client_common::{CheckReport, Checker, Config, HibpClient, MockedRangeSource, RangeSource, RenderSink, check_once};
use common::{
    consts,
    indication::{Advisory, IndicationState},
    range::Exposure,
    strength::{Strength, StrengthRule},
};

#[derive(Parser, Debug)]
#[command(name = "pwcheck", version, about = "Checks passwords against a breach corpus without ever sending them")]
struct Cli {
    #[arg(long, global = true, help = "Config file (defaults to ./pwcheck.toml when present)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Use an offline synthetic corpus instead of the range API")]
    mock: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every submitted line as if it had just been typed (default)
    Watch,
    /// Check a single password read from stdin
    Check {
        #[arg(long, help = "Output machine-readable JSON")]
        json: bool,
    },
}

fn setup_logger() -> eyre::Result<()> {

    let filter = EnvFilter::from_default_env()
        // Set the base level when not matched by other directives to WARN.
        .add_directive(LevelFilter::WARN.into())
        .add_directive("client_common=info".parse()?)
        .add_directive("pwcheck=debug".parse()?)
    ;

    // stdout is for results
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
    .with_max_level(tracing::Level::TRACE)
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .finish();

    tracing::subscriber::set_global_default(subscriber)
        .wrap_err("setting default subscriber failed")?;

    Ok(())
}

async fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    match path {
        Some(path) => Config::load(path).await,
        None if Path::new(consts::CONFIG_PATH).exists() => Config::load(consts::CONFIG_PATH).await,
        None => Ok(Config::default()),
    }
}

fn range_source(config: &Config, mock: bool) -> eyre::Result<Arc<dyn RangeSource>> {
    if mock {
        Ok(Arc::new(MockedRangeSource::new()))
    } else {
        Ok(Arc::new(HibpClient::new(config)?))
    }
}

struct TerminalSink;

impl RenderSink for TerminalSink {
    fn render(&self, state: IndicationState, advisories: &[Advisory]) {
        let label = state.to_string();
        let label = match state {
            IndicationState::Neutral => label.as_str().dimmed(),
            IndicationState::Success => label.as_str().green().bold(),
            IndicationState::Warning => label.as_str().yellow().bold(),
        };
        println!("[{}]", label);
        for advisory in advisories {
            println!("  - {}", advisory);
        }
    }
}

#[derive(Serialize, Debug)]
struct JsonReport {
    indication: IndicationState,
    exposure: Option<Exposure>,
    strength: Option<Strength>,
    violated_rules: Vec<StrengthRule>,
    advisories: Vec<String>,
}

impl From<Option<CheckReport>> for JsonReport {
    fn from(report: Option<CheckReport>) -> Self {
        match report {
            Some(report) => Self {
                indication: report.indication.state,
                exposure: Some(report.exposure),
                strength: Some(report.verdict.strength()),
                violated_rules: report.verdict.violated_rules().to_vec(),
                advisories: report.indication.advisories.iter().map(ToString::to_string).collect(),
            },
            None => Self {
                indication: IndicationState::Neutral,
                exposure: None,
                strength: None,
                violated_rules: Vec::new(),
                advisories: Vec::new(),
            },
        }
    }
}

fn run_watch(rt: &Runtime, source: Arc<dyn RangeSource>, config: &Config) -> eyre::Result<()> {
    let _guard = rt.enter();

    let (input, rx) = watch::channel(String::new());
    let checker = Checker::new(source, rx, Arc::new(TerminalSink), config);

    // no history file: every entry is a password
    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                input.send_replace(line);
                // results render themselves, nothing to wait for
                let _ = checker.on_keystroke();
            },
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break
            },
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break
            },
            Err(err) => {
                error!("{:?}", err);
                break
            }
        }
    }
    Ok(())
}

fn run_check(rt: &Runtime, source: Arc<dyn RangeSource>, config: &Config, json: bool) -> eyre::Result<()> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)
        .wrap_err("failed to read the password from stdin")?;
    let password = line.trim_end_matches(&['\r', '\n'][..]);

    let report = rt.block_on(check_once(source.as_ref(), &config.strength_policy(), &config.presenter(), password));

    if json {
        println!("{}", serde_json::to_string_pretty(&JsonReport::from(report))?);
    } else {
        match report {
            Some(report) => TerminalSink.render(report.indication.state, &report.indication.advisories),
            None => TerminalSink.render(IndicationState::Neutral, &[]),
        }
    }
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    setup_logger()?;

    let cli = Cli::parse();

    // one worker drives the timers and lookups while this thread waits on the terminal
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    let config = rt.block_on(load_config(cli.config.as_deref()))?;
    debug!(?config, mock = cli.mock, "config loaded");
    let source = range_source(&config, cli.mock)?;

    match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => run_watch(&rt, source, &config),
        Command::Check { json } => run_check(&rt, source, &config, json),
    }
}
