//! parley - chat with Claude from the terminal

mod commands;
mod config;
mod ui;

use clap::Parser;
use parley_ai::{AnthropicCapability, ChatOptions, DEFAULT_MODEL};
use parley_chat::{
    CapabilitySlot, ChatSession, ERROR_TEXT, GREETING, ReadinessWaiter, TurnDriver, TurnOutcome,
};
use std::io::{self, Write};
use std::sync::Arc;

use config::{Config, ReadinessMode};

/// parley - chat with Claude from the terminal
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: claude-sonnet-4-6)
    #[arg(short, long)]
    model: Option<String>,

    /// Send a single message, print the reply and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// How long a message waits for the backend, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Check interval for --readiness poll, in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// How to wait for the backend
    #[arg(long, value_enum)]
    readiness: Option<ReadinessMode>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("parley=debug,parley_ai=debug,parley_chat=debug")
            .with_writer(io::stderr)
            .init();
    }

    if args.init_config {
        match Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let mut cfg = Config::load();

    // CLI args take precedence over the file
    if let Some(ms) = args.timeout_ms {
        cfg.readiness.timeout_ms = Some(ms);
    }
    if let Some(ms) = args.poll_interval_ms {
        cfg.readiness.poll_interval_ms = Some(ms);
    }
    if let Some(mode) = args.readiness {
        cfg.readiness.mode = Some(mode);
    }
    let model = args
        .model
        .or(cfg.model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let use_tui = !args.no_tui && cfg.tui.unwrap_or(true);

    let Some(api_key) = cfg.api_key() else {
        eprintln!("Error: No API key found for Anthropic");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  1. Set API key: export ANTHROPIC_API_KEY=your-key");
        eprintln!("  2. Add to config: parley --init-config");
        std::process::exit(1);
    };

    let slot = CapabilitySlot::new();
    spawn_bootstrap(slot.clone(), &cfg, api_key);

    let waiter = ReadinessWaiter::new(slot)
        .with_strategy(cfg.readiness.strategy())
        .with_timeout(cfg.readiness.timeout());
    tracing::debug!(
        %model,
        strategy = ?waiter.strategy(),
        timeout_ms = waiter.timeout().as_millis() as u64,
        "starting"
    );
    let driver = TurnDriver::new(waiter, ChatOptions::streaming(&model));
    let session = ChatSession::new(cfg.greeting.clone().unwrap_or_else(|| GREETING.to_string()));

    if let Some(command) = args.command {
        return run_command(session, &driver, &command).await;
    }

    if use_tui {
        let view = ui::ChatView::new(session, &model, "Anthropic");
        return ui::run_tui(view, driver).await;
    }

    run_interactive(session, &driver).await
}

/// Build the backend off the main task and publish it once it is usable
fn spawn_bootstrap(slot: CapabilitySlot, cfg: &Config, api_key: String) {
    let base_url = cfg.base_url.clone();
    let max_tokens = cfg.max_tokens;

    tokio::spawn(async move {
        let mut capability = AnthropicCapability::new(api_key);
        if let Some(url) = base_url {
            capability = capability.with_base_url(url);
        }
        if let Some(max) = max_tokens {
            capability = capability.with_max_tokens(max);
        }
        slot.install(Arc::new(capability));
    });
}

/// Run one turn, writing fragments to `out` as they arrive
async fn stream_reply(
    session: &mut ChatSession,
    driver: &TurnDriver,
    prompt: &str,
    out: &mut impl Write,
) -> anyhow::Result<Option<TurnOutcome>> {
    let Some(turn) = session.submit(prompt) else {
        return Ok(None);
    };

    let mut write_error = None;
    let outcome = session
        .drive(driver.start(turn), |update| {
            if let Some(text) = update.fragment_text() {
                if let Err(e) = write!(out, "{}", text).and_then(|_| out.flush()) {
                    write_error.get_or_insert(e);
                }
            }
        })
        .await;
    if let Some(e) = write_error {
        return Err(e.into());
    }

    match outcome {
        Some(TurnOutcome::Completed) => writeln!(out)?,
        _ => {
            // Partial text may already be on screen; the error goes below it
            writeln!(out)?;
            writeln!(out, "{}", ERROR_TEXT)?;
        }
    }
    Ok(outcome)
}

async fn run_command(mut session: ChatSession, driver: &TurnDriver, command: &str) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    match stream_reply(&mut session, driver, command, &mut stdout).await? {
        Some(outcome) if outcome.is_success() => Ok(()),
        Some(outcome) => {
            tracing::debug!(?outcome, "turn failed");
            std::process::exit(1);
        }
        None => {
            eprintln!("Error: Prompt is empty");
            std::process::exit(1);
        }
    }
}

async fn run_interactive(mut session: ChatSession, driver: &TurnDriver) -> anyhow::Result<()> {
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("parley ({})", driver.options().model);
        eprintln!();
    }
    if let Some(greeting) = session.messages().first() {
        println!("{}", greeting.content);
        println!();
    }

    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = commands::execute_command(input) {
            match result {
                commands::CommandResult::NewChat => {
                    session.new_chat();
                    println!("Started a new conversation.");
                    println!();
                    println!("{}", session.conversation().greeting());
                }
                commands::CommandResult::Exit => break,
                commands::CommandResult::Message(msg) => println!("{}", msg),
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            println!();
            continue;
        }

        stream_reply(&mut session, driver, input, &mut stdout).await?;
        println!();
    }

    Ok(())
}
