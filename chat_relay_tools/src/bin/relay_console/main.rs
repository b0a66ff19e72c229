use std::{io::Write, sync::Arc};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use anyhow::Result;
use chat_relay_lib::{ChatRequest, RelayConfig, RelayEvent, RelayService, LOG_TARGET};
use futures::StreamExt;

// Prints fragments as they arrive; returns false if the stream reported an error.
async fn stream_reply(service: Arc<RelayService>, message: String) -> Result<bool> {
    let mut events = service.reply_stream(message);
    let mut stdout = std::io::stdout();
    let mut ok = true;
    while let Some(event) = events.next().await {
        match event {
            RelayEvent::Fragment(text) => {
                print!("{text}");
                stdout.flush()?;
            }
            RelayEvent::Error(message) => {
                println!("\nRelay error: {message}");
                ok = false;
            }
            RelayEvent::Done => println!(),
        }
    }
    Ok(ok)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = RelayConfig::load();
    let service = Arc::new(RelayService::from_config(&cfg)?);
    tracing::info!(target: LOG_TARGET, "console using model {}", cfg.model);

    println!("Welcome to the chat relay console. Type 'exit' to quit.");
    let mut rl = DefaultEditor::new()?;
    loop {
        let readline = rl.readline("\n>> ");
        match readline {
            Ok(line) => {
                if line.trim().eq_ignore_ascii_case("exit") {
                    println!("Goodbye!");
                    break;
                }

                let request = ChatRequest {
                    message: Some(line.clone()),
                };
                let message = match request.validated() {
                    Ok(message) => message.to_string(),
                    Err(_) => continue,
                };
                let _ = rl.add_history_entry(line.as_str());

                if !stream_reply(service.clone(), message).await? {
                    tracing::warn!(target: LOG_TARGET, "reply ended with an error");
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
