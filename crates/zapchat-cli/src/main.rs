//! # zapchat-cli
//!
//! Line-oriented shell over the ZapChat backend.  Stands in for the web
//! client: every command maps onto one facade operation, and a bus
//! subscription prints live events as they are published.

mod config;

use std::io::{self, BufRead, Write};

use tracing::info;
use tracing_subscriber::EnvFilter;

use zapchat_backend::{Backend, ChatEvent, EventKind, ProfileUpdate};
use zapchat_shared::constants::APP_NAME;
use zapchat_shared::types::{ChatId, MessageType, StoryMediaType};

use crate::config::CliConfig;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,zapchat_store=info,zapchat_backend=info")),
        )
        .init();

    info!("Starting {} shell v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = CliConfig::from_env();
    let backend = match &config.data_dir {
        Some(dir) => Backend::open_at(dir)?,
        None => Backend::new()?,
    };

    // Live view: print events the way the web client re-renders on them.
    let _messages = backend.bus().subscribe(EventKind::MessageReceived, |event| {
        if let ChatEvent::MessageReceived(m) = event {
            println!("  << [{}] {}", m.chat_id, m.content);
        }
    });
    let _refreshes = backend
        .bus()
        .subscribe(EventKind::Refresh, |_| println!("  (refresh)"));

    if let Some(email) = &config.auto_login {
        match backend.login(email) {
            Ok(user) => println!("signed in as {}", user.display_name),
            Err(e) => eprintln!("auto-login failed: {e}"),
        }
    }

    println!("{APP_NAME} shell. Type 'help' for commands.");
    repl(&backend)
}

fn repl(backend: &Backend) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(()); // EOF
        }

        let mut parts = line.trim().splitn(3, ' ');
        let command = parts.next().unwrap_or("");
        let arg = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("");

        let result = match command {
            "" => Ok(()),
            "help" => {
                print_help();
                Ok(())
            }
            "quit" | "exit" => return Ok(()),
            "login" => backend.login(arg).map(|user| {
                println!("signed in as {} <{}>", user.display_name, user.email);
            }),
            "logout" => backend.logout(),
            "whoami" => backend.current_user().map(|user| match user {
                Some(u) => println!("{} <{}>", u.display_name, u.email),
                None => println!("signed out"),
            }),
            "users" => backend.users().map(|users| {
                for u in users {
                    let presence = if u.is_online { "online" } else { "offline" };
                    println!("{:10} {} ({presence})", u.id, u.display_name);
                }
            }),
            "chats" => backend.chats().map(|chats| {
                for c in chats {
                    let pin = if c.is_pinned { "*" } else { " " };
                    let name = c.name.as_deref().unwrap_or("(direct)");
                    let last = c
                        .last_message
                        .as_ref()
                        .map(|m| m.content.as_str())
                        .unwrap_or("");
                    println!("{pin} {:12} {:20} {last}", c.id, name);
                }
            }),
            "messages" => backend.messages(&ChatId::from(arg)).map(|messages| {
                for m in messages {
                    let body = if m.is_deleted { "(deleted)" } else { m.content.as_str() };
                    let edited = if m.is_edited { " (edited)" } else { "" };
                    println!("[{}] {}: {body}{edited}", m.created_at.format("%H:%M"), m.sender_id);
                }
            }),
            "send" => backend
                .send_message(&ChatId::from(arg), rest, MessageType::Text, None)
                .map(|_| ()),
            "pin" => backend.pin_chat(&ChatId::from(arg), rest != "off"),
            "read" => backend.mark_chat_read(&ChatId::from(arg)),
            "group" => backend
                .create_group(arg, &rest.split_whitespace().map(Into::into).collect::<Vec<_>>())
                .map(|chat| println!("created group {}", chat.id)),
            "stories" => backend.stories().map(|stories| {
                for s in stories {
                    println!(
                        "{:12} by {} until {} ({} viewers)",
                        s.id,
                        s.user_id,
                        s.expires_at.format("%H:%M"),
                        s.viewers.len()
                    );
                }
            }),
            "post" => {
                let media = if rest == "video" {
                    StoryMediaType::Video
                } else {
                    StoryMediaType::Image
                };
                backend.post_story(arg, media).map(|s| {
                    println!("story {} up for 24h", s.id);
                })
            }
            "status" => backend
                .update_profile(ProfileUpdate {
                    status_message: Some(format!("{arg} {rest}").trim().to_string()),
                    ..ProfileUpdate::default()
                })
                .map(|_| ()),
            other => {
                println!("unknown command '{other}', try 'help'");
                Ok(())
            }
        };

        if let Err(e) = result {
            eprintln!("error: {e}");
        }
    }
}

fn print_help() {
    println!(
        "\
commands:
  login <email>            sign in as a seeded user
  logout / whoami
  users                    list accounts
  chats                    list chats, pinned first
  messages <chat-id>       show a chat's history
  send <chat-id> <text>    send a text message
  pin <chat-id> [off]      pin or unpin a chat
  read <chat-id>           clear the unread counter
  group <name> <ids...>    create a group chat
  stories                  list visible stories
  post <url> [video]       post a story (24h)
  status <text>            set your status message
  quit"
    );
}
