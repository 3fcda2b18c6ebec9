//! plume - terminal front end for a streaming chat service

mod config;

use std::io::Write;

use clap::Parser;
use plume_client::{ChatClient, Conversation, TurnUpdate};
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_ENDPOINT: &str = "http://localhost:8111";

/// plume - chat with a streaming inference service
#[derive(Parser, Debug)]
#[command(name = "plume")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the inference service
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Run in non-interactive mode with a single message
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Print the reasoning trace while it streams
    #[arg(long)]
    show_reasoning: bool,

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

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("plume=debug")
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
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

    // Load config file
    let cfg = config::Config::load();

    let endpoint = args
        .endpoint
        .or(cfg.endpoint)
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let show_reasoning = args.show_reasoning || cfg.show_reasoning.unwrap_or(false);

    let client = ChatClient::new(endpoint);
    let mut conversation = Conversation::new();

    // Single-shot mode
    if let Some(command) = args.command {
        let ok = run_turn(&client, &mut conversation, &command, show_reasoning, args.verbose).await;
        if !ok {
            std::process::exit(1);
        }
        return Ok(());
    }

    let user_name = match cfg.user_name {
        Some(name) => name,
        None => client.fetch_user_name().await,
    };
    println!("Connected to {} (Ctrl-D to quit)", client.base_url());

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}> ", user_name);
        std::io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            println!();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        run_turn(&client, &mut conversation, &line, show_reasoning, args.verbose).await;
    }

    Ok(())
}

/// Run one turn and print its output as it streams. Returns false when the
/// turn failed; the conversation stays usable either way.
async fn run_turn(
    client: &ChatClient,
    conversation: &mut Conversation,
    text: &str,
    show_reasoning: bool,
    verbose: bool,
) -> bool {
    let Some(request) = conversation.start_turn(text) else {
        return false;
    };

    let mut printer = Printer::new(show_reasoning, verbose);
    match client.send(&request).await {
        Ok(records) => {
            conversation
                .consume(records, |update| printer.handle(update))
                .await;
        }
        Err(error) => conversation.fail_turn(error.to_string()),
    }
    printer.finish();

    if let Some(error) = conversation.messages().last().and_then(|m| m.error.as_ref()) {
        eprintln!("Error: {}", error);
        return false;
    }
    true
}

/// Streams turn updates to the terminal, keeping the reasoning trace dim
/// and visually separate from the final content.
struct Printer {
    show_reasoning: bool,
    verbose: bool,
    in_reasoning: bool,
}

impl Printer {
    fn new(show_reasoning: bool, verbose: bool) -> Self {
        Self {
            show_reasoning,
            verbose,
            in_reasoning: false,
        }
    }

    fn handle(&mut self, update: &TurnUpdate) {
        match update {
            TurnUpdate::Reasoning(fragment) => {
                if self.show_reasoning {
                    if !self.in_reasoning {
                        print!("\x1b[2m");
                        self.in_reasoning = true;
                    }
                    print!("{}", fragment);
                }
            }
            TurnUpdate::Content(fragment) => {
                self.end_reasoning();
                print!("{}", fragment);
            }
            TurnUpdate::PromptTokens(tokens) => {
                if self.verbose {
                    eprintln!("[context: {} tokens]", tokens);
                }
            }
            TurnUpdate::Finished => {
                self.end_reasoning();
                println!();
            }
        }
        let _ = std::io::stdout().flush();
    }

    /// Reset terminal state after an aborted turn.
    fn finish(&mut self) {
        if self.in_reasoning {
            self.end_reasoning();
            let _ = std::io::stdout().flush();
        }
    }

    fn end_reasoning(&mut self) {
        if self.in_reasoning {
            println!("\x1b[0m");
            self.in_reasoning = false;
        }
    }
}
