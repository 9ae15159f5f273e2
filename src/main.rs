//! Mastermind shell — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at configured level
//!   4. Open the state store (load + migrate the durable blob)
//!   5. Select the transport (native bridge if present, else HTTP)
//!   6. Run the console front end until Ctrl-C
//!
//! The console loop is a stand-in for the GUI presentation layer: it renders
//! store state and issues store mutations, nothing more.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use mastermind::config;
use mastermind::error::AppError;
use mastermind::logger;
use mastermind::orchestrator::Orchestrator;
use mastermind::state::{Message, Role, StateStore};
use mastermind::transport::{HttpTransport, NativeBridge, Transport};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::init(&config.log_level)?;

    info!(
        app_name = %config.app_name,
        work_dir = %config.work_dir.display(),
        base_url = %config.backend.base_url,
        "config loaded"
    );

    let store = Arc::new(StateStore::open(&config.work_dir));

    // Capability flag decides once; no per-call re-probing. When the native
    // runtime is embedded it registers its operations on the bridge here.
    let bridge = config.backend.native_bridge.then(NativeBridge::new);
    let transport = Transport::select(bridge, HttpTransport::new(&config.backend.base_url));
    info!(transport = transport.kind(), "transport selected");

    let orchestrator = Orchestrator::new(store.clone(), transport);
    console(&store, &orchestrator).await
}

/// Minimal console front end: one line in, one assistant reply out.
async fn console(store: &Arc<StateStore>, orchestrator: &Orchestrator) -> Result<(), AppError> {
    println!("─────────────────────────────────");
    println!(" Mastermind console  (Ctrl-C to quit)");
    println!("─────────────────────────────────");

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        print!("> ");
        use std::io::Write as _;
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => {
                println!();
                info!("shutdown signal received");
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }

                let chat_id = active_or_new_chat(store);
                let message = Message::user(text);
                store.add_message(&chat_id, message.clone());

                match orchestrator.process_message(&chat_id, &message).await {
                    Ok(()) => print_last_reply(store, &chat_id),
                    Err(AppError::Busy) => {
                        println!("(still processing the previous message)");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    Ok(())
}

/// Resolve the chat to talk in: the active one if it still exists, else a
/// fresh chat which becomes active.
fn active_or_new_chat(store: &StateStore) -> String {
    let state = store.snapshot();
    if let Some(id) = state.active_chat {
        // The pointer may be stale; null-check against the live collection.
        if state.chats.iter().any(|chat| chat.id == id) {
            return id;
        }
    }

    store.create_chat();
    let state = store.snapshot();
    let id = state
        .chats
        .last()
        .map(|chat| chat.id.clone())
        .unwrap_or_default();
    store.set_active_chat(id.clone());
    id
}

fn print_last_reply(store: &StateStore, chat_id: &str) {
    let state = store.snapshot();
    let Some(chat) = state.chats.iter().find(|chat| chat.id == chat_id) else {
        return;
    };
    let Some(reply) = chat
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
    else {
        return;
    };
    if let Some(error) = &reply.error {
        println!("! {error}");
    }
    println!("{}", reply.content);
}
