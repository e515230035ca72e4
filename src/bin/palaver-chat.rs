//! Interactive terminal client for a palaver chat server.
//!
//! This binary provides a REPL for chatting: sign in, pick a chat, and type.
//! Messages pushed by the server appear in the transcript while the prompt
//! is active.
//!
//! # Usage
//!
//! ```bash
//! # Point at a server (or set PALAVER_URL)
//! palaver-chat --url https://chat.example.com/api
//!
//! # Disable colors (useful for piping output)
//! palaver-chat --no-color
//! ```
//!
//! # Commands
//!
//! - `/login <user> <pass>` - Sign in and load your chats
//! - `/register <user> <pass>` - Create a new account
//! - `/chats` - Refresh and list the chat directory
//! - `/open <id>` - Open a chat and follow it live
//! - `/create <name>` - Create a new group chat
//! - `/who` - Show how many users are online
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application
//!
//! Anything that does not start with `/` is sent to the open chat.

use arrrg::CommandLine;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, ExternalPrinter};
use tokio::sync::mpsc;

use palaver::chat::{
    ChatArgs, ChatCommand, ChatConfig, ClientSession, PlainTextRenderer, Renderer, SessionStats,
    SessionView, help_text, parse_command,
};
use palaver::render::format_live_event;
use palaver::{Chat, ChatService, LiveEvent};

/// Main entry point for the palaver-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("palaver-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;

    let client = ChatService::with_options(config.base_url.clone(), Some(config.timeout))?;
    let mut session = ClientSession::new(client);
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    println!("Palaver chat");
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline(&prompt(&session.stats()));

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Login { username, password } => {
                            match session.login(&username, &password).await {
                                Ok(outcome) => {
                                    renderer.print_info(&format!("Logged in as {username}."));
                                    if let Some(online) = outcome.online_users {
                                        renderer
                                            .print_notice(&format!("{online} users online."));
                                    }
                                    print_chat_list(&mut renderer, session.chats());
                                }
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::Register { username, password } => {
                            match session.register(&username, &password).await {
                                Ok(()) => renderer.print_info(&format!(
                                    "Registered {username}. You can now /login."
                                )),
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::Chats => match session.load_chats().await {
                            Ok(()) => print_chat_list(&mut renderer, session.chats()),
                            Err(err) => report_failure(&mut renderer, &session, &err),
                        },
                        ChatCommand::Open(chat_id) => {
                            let Some(name) = session
                                .chats()
                                .iter()
                                .find(|chat| chat.id == chat_id)
                                .map(|chat| chat.name.clone())
                            else {
                                renderer.print_error(&format!(
                                    "No chat with id {chat_id}; run /chats to list them"
                                ));
                                continue;
                            };
                            match session.open_chat(chat_id, &name).await {
                                Ok(events) => {
                                    renderer.print_info(&format!("--- {name} ---"));
                                    renderer.print_transcript(session.history());
                                    spawn_live_printer(
                                        rl.create_external_printer()?,
                                        events,
                                        use_color,
                                    );
                                }
                                Err(err) => report_failure(&mut renderer, &session, &err),
                            }
                        }
                        ChatCommand::Create(name) => match session.create_chat(&name).await {
                            Ok(()) => {
                                renderer.print_info(&format!("Created chat {name}."));
                                print_chat_list(&mut renderer, session.chats());
                            }
                            Err(err) => report_failure(&mut renderer, &session, &err),
                        },
                        ChatCommand::Who => match session.online_user_count().await {
                            Ok(count) => renderer.print_info(&format!("{count} users online.")),
                            // Presence is non-critical; a notice is enough.
                            Err(err) => renderer
                                .print_notice(&format!("Online count unavailable: {err}")),
                        },
                        ChatCommand::Stats => {
                            print_stats(&session.stats());
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular input - send to the open chat
                match session.send_message(line).await {
                    Ok(true) => {}
                    Ok(false) => {
                        renderer.print_info("Open a chat with /open <id> before sending messages.");
                    }
                    Err(err) => {
                        report_failure(&mut renderer, &session, &err);
                        renderer.print_notice(
                            "The message was not sent; recall it with the up arrow to retry.",
                        );
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Prompt string for the current view.
fn prompt(stats: &SessionStats) -> String {
    match stats.view {
        SessionView::Unauthenticated => "guest> ".to_string(),
        SessionView::ChatList => "chat> ".to_string(),
        SessionView::ChatOpen => match &stats.active_chat {
            Some(chat) => format!("{}> ", chat.name),
            None => "chat> ".to_string(),
        },
    }
}

/// Prints errors, plus a hint when the failure expired the session.
fn report_failure(
    renderer: &mut PlainTextRenderer,
    session: &ClientSession,
    err: &palaver::Error,
) {
    renderer.print_error(&err.to_string());
    if !session.is_authenticated() {
        renderer.print_notice("Session expired. Use /login <user> <pass> to sign in again.");
    }
}

fn print_chat_list(renderer: &mut PlainTextRenderer, chats: &[Chat]) {
    if chats.is_empty() {
        renderer.print_info("No chats yet; start one with /create <name>.");
        return;
    }
    renderer.print_info("Chats:");
    for chat in chats {
        renderer.print_info(&format!("  [{}] {}", chat.id, chat.name));
    }
}

fn print_stats(stats: &SessionStats) {
    println!("    Session Statistics:");
    let view = match stats.view {
        SessionView::Unauthenticated => "unauthenticated",
        SessionView::ChatList => "chat list",
        SessionView::ChatOpen => "chat open",
    };
    println!("      View: {}", view);
    match &stats.active_chat {
        Some(chat) => println!("      Active chat: {} (id {})", chat.name, chat.id),
        None => println!("      Active chat: (none)"),
    }
    println!("      Chats loaded: {}", stats.chat_count);
    println!("      History length: {}", stats.history_len);
    println!("      Requests issued: {}", stats.request_count);
}

/// Forwards live events to the terminal while the prompt is active.
///
/// The task ends when the feed's handle is closed (the channel senders are
/// dropped with the aborted reader task).
fn spawn_live_printer<P>(mut printer: P, mut events: mpsc::Receiver<LiveEvent>, use_color: bool)
where
    P: ExternalPrinter + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let _ = printer.print(format_live_event(&event, use_color));
        }
    });
}
