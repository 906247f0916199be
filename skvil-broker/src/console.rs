//! Operator console: an interactive command source on the broker's stdin.
//!
//! A thin adapter over Send/Broadcast with the reserved `broker` sender.
//! Failures are reported locally on stdout; nothing here raises into the
//! state engine.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use skvil_core::message::{BROKER_SENDER, MessageKind};

use crate::state::BrokerState;

/// Parsed console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Agents,
    /// `@<id> <text>`: targeted operator message.
    Direct { to: String, text: String },
    /// Any other non-empty line: operator broadcast.
    Broadcast { text: String },
    Empty,
}

pub fn parse_command(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Empty;
    }
    if line == "/help" {
        return ConsoleCommand::Help;
    }
    if line == "/agents" {
        return ConsoleCommand::Agents;
    }
    if let Some(rest) = line.strip_prefix('@') {
        let (to, text) = match rest.split_once(char::is_whitespace) {
            Some((to, text)) => (to, text.trim()),
            None => (rest, ""),
        };
        return ConsoleCommand::Direct {
            to: to.to_string(),
            text: text.to_string(),
        };
    }
    ConsoleCommand::Broadcast {
        text: line.to_string(),
    }
}

/// Read stdin lines until EOF or shutdown, dispatching each command.
pub async fn run_console(state: BrokerState, mut shutdown: watch::Receiver<bool>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => dispatch(&state, parse_command(&line)).await,
                    Ok(None) => return,
                    Err(_) => return,
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

async fn dispatch(state: &BrokerState, command: ConsoleCommand) {
    match command {
        ConsoleCommand::Empty => {}
        ConsoleCommand::Help => {
            println!("commands:");
            println!("  /help            show this help");
            println!("  /agents          list registered agents");
            println!("  @<id> <text>     send <text> to agent <id>");
            println!("  <text>           broadcast <text> to every agent");
        }
        ConsoleCommand::Agents => {
            let agents = state.agents().await;
            if agents.is_empty() {
                println!("no agents registered");
                return;
            }
            for agent in agents {
                println!(
                    "  {}  {}  project={}  last seen {}",
                    agent.id,
                    agent.name,
                    agent.project,
                    agent.last_seen.format("%H:%M:%S")
                );
            }
        }
        ConsoleCommand::Direct { to, text } => {
            if text.is_empty() {
                println!("usage: @<id> <text>");
                return;
            }
            match state.send(BROKER_SENDER, &to, &text, MessageKind::Text).await {
                Ok(message_id) => println!("sent to {to} ({message_id})"),
                Err(err) => println!("send failed: {err}"),
            }
        }
        ConsoleCommand::Broadcast { text } => {
            match state.broadcast(BROKER_SENDER, &text, MessageKind::Text).await {
                Ok(sent_to) => println!("broadcast sent to {sent_to} agent(s)"),
                Err(err) => println!("broadcast failed: {err}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_slash_commands() {
        assert_eq!(parse_command("/help"), ConsoleCommand::Help);
        assert_eq!(parse_command(" /agents "), ConsoleCommand::Agents);
    }

    #[test]
    fn at_prefix_targets_an_agent() {
        assert_eq!(
            parse_command("@alpha deploy is live"),
            ConsoleCommand::Direct {
                to: "alpha".into(),
                text: "deploy is live".into()
            }
        );
        // Bare @id parses with empty text; dispatch reports usage locally.
        assert_eq!(
            parse_command("@alpha"),
            ConsoleCommand::Direct {
                to: "alpha".into(),
                text: String::new()
            }
        );
    }

    #[test]
    fn anything_else_broadcasts() {
        assert_eq!(
            parse_command("standup in five"),
            ConsoleCommand::Broadcast {
                text: "standup in five".into()
            }
        );
        assert_eq!(parse_command("   "), ConsoleCommand::Empty);
    }
}
