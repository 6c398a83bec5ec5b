//! Terminal chat REPL for the Assembly.

use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use assembly::bridge::HttpBridgeClient;
use assembly::personas::all_personas;
use assembly::speech::NoopSpeech;
use assembly::{Controller, CredentialResolver, GeminiClient, LocalStore, SendOutcome};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Interval of the transcript autosave safety net.
const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(10);

/// Assembly: persona chat front end for the Gemini API.
#[derive(Parser)]
#[command(name = "assembly", version, about)]
struct Cli {
    /// Data directory for transcript/settings/key snapshots
    /// (default: ~/.assembly).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the Gemini API base URL.
    #[arg(long)]
    api_base: Option<String>,

    /// Base URL of the MuseScore bridge endpoint.
    #[arg(long, default_value = "http://localhost:3000")]
    bridge_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Users can override with RUST_LOG=debug to see everything.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("assembly=info")),
        )
        .init();

    let cli = Cli::parse();

    let store = match cli.data_dir {
        Some(dir) => LocalStore::new(dir),
        None => LocalStore::at_default_location(),
    };
    let credentials = CredentialResolver::new(store.clone());
    let mut client = GeminiClient::new(credentials.clone());
    if let Some(base) = cli.api_base {
        client = client.with_base_url(base);
    }

    let mut controller = Controller::new(
        store,
        credentials,
        Box::new(client),
        Box::new(HttpBridgeClient::new(cli.bridge_url)),
        Box::new(NoopSpeech),
    );

    println!("Assembly v{}", env!("CARGO_PKG_VERSION"));
    if let Some(welcome) = controller.transcript().last() {
        println!("\n{}\n", welcome.text);
    }
    println!("Type /help for commands.\n");
    drain_toasts(&mut controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut autosave = tokio::time::interval(AUTOSAVE_INTERVAL);
    autosave.tick().await; // First tick fires immediately.

    loop {
        prompt(&controller);
        let line = loop {
            tokio::select! {
                line = lines.next_line() => break line?,
                _ = autosave.tick() => controller.flush(),
            }
        };
        let Some(line) = line else { break };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if !handle_input(&mut controller, input).await {
            break;
        }
        drain_toasts(&mut controller);
    }

    controller.flush();
    Ok(())
}

/// Processes one line of input. Returns `false` to exit the REPL.
async fn handle_input(controller: &mut Controller, input: &str) -> bool {
    match input.split_whitespace().next() {
        Some("/quit" | "/exit") => return false,
        Some("/help") => print_help(),
        Some("/personas") => {
            for persona in all_personas() {
                println!("  {:<8} {} — {}", persona.id, persona.name, persona.role);
            }
        }
        Some("/persona") => match input.split_whitespace().nth(1) {
            Some(id) => controller.change_persona(id),
            None => println!("usage: /persona <id>"),
        },
        Some("/model") => match input.split_whitespace().nth(1) {
            Some(model) => controller.change_model(model),
            None => println!("current model: {}", controller.settings().selected_model),
        },
        Some("/key") => match input.split_whitespace().nth(1) {
            Some(key) => controller.set_api_key(key),
            None => println!("usage: /key <api-key>"),
        },
        Some("/new") => {
            controller.reset_conversation();
            if let Some(welcome) = controller.transcript().last() {
                println!("\n{}\n", welcome.text);
            }
        }
        _ => {
            let persona = controller.active_persona();
            print!("{} > ", persona.name);
            flush_stdout();
            let outcome = controller
                .send_message(input, None, None, |chunk| {
                    print!("{chunk}");
                    flush_stdout();
                })
                .await;
            match outcome {
                SendOutcome::Completed => println!(),
                SendOutcome::Failed { message } => println!("{message}"),
                SendOutcome::Bridge => {
                    if let Some(last) = controller.transcript().last() {
                        println!("{}", last.text);
                    }
                }
                SendOutcome::Rejected { reason } => println!("{reason}"),
            }
        }
    }
    true
}

fn prompt(controller: &Controller) {
    print!("[{}] you> ", controller.active_persona().id);
    flush_stdout();
}

fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

/// Prints pending toasts once each.
fn drain_toasts(controller: &mut Controller) {
    let pending: Vec<_> = controller
        .toasts_mut()
        .active()
        .iter()
        .map(|t| (t.id, t.message.clone()))
        .collect();
    for (id, message) in pending {
        println!("[!] {message}");
        controller.toasts_mut().dismiss(id);
    }
}

fn print_help() {
    println!(
        "\
commands:
  /personas        list available personas
  /persona <id>    switch the active persona
  /model [id]      show or change the model
  /key <api-key>   store a Gemini API key
  /new             clear the conversation
  /ms <prompt>     send a MuseScore bridge command
  /quit            exit"
    );
}
