//! Terminal buyer client for the bazaar market.
//!
//! Connects to the server, joins with a display name, and turns stdin
//! commands into protocol messages:
//!
//!   LIST               show the current inventory
//!   BUY <item> <n>     buy n units of the active item
//!   LEAVE              leave the market
//!
//! Inbound notifications are rendered as plain text. Thin glue only; all
//! marketplace rules live on the server.

use anyhow::{Context, Result};
use bazaar::protocol::{self, ClientMessage, ServerMessage};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_args() -> (String, String) {
    let args: Vec<String> = std::env::args().collect();
    let mut name = None;
    let mut addr = format!(
        "{}:{}",
        bazaar::config::DEFAULT_HOST,
        bazaar::config::DEFAULT_PORT
    );
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--name" => {
                name = args.get(i + 1).cloned();
                i += 2;
            }
            "--addr" => {
                if let Some(val) = args.get(i + 1) {
                    addr = val.clone();
                }
                i += 2;
            }
            _ => i += 1,
        }
    }
    let Some(name) = name else {
        eprintln!("Usage: bazaar-buyer --name <name> [--addr <host:port>]");
        std::process::exit(2);
    };
    (name, addr)
}

fn init_logging_stderr() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();
}

async fn send(write_half: &mut OwnedWriteHalf, message: &ClientMessage) -> Result<()> {
    let line = protocol::to_line(message)?;
    write_half
        .write_all(line.as_bytes())
        .await
        .context("Failed to send message to server")
}

fn render(line: &str) {
    let message: ServerMessage = match protocol::from_line(line) {
        Ok(message) => message,
        // Notifications we don't understand are skipped, not fatal.
        Err(_) => return,
    };
    match message {
        ServerMessage::Welcome => println!("Connected to the market."),
        ServerMessage::ListResponse { inventory } => {
            println!("--- Current market inventory ---");
            if inventory.is_empty() {
                println!("  (no items)");
            }
            for (item, amount) in inventory {
                println!("  {item}: {amount} units");
            }
        }
        ServerMessage::Item {
            item,
            amount_left,
            time_left,
        } => {
            println!("Now selling: {item} ({amount_left} units, {time_left}s left)");
        }
        ServerMessage::TimeLeft { time_left } => println!("  {time_left}s left"),
        ServerMessage::Update { item, amount_left } => {
            println!("Inventory update: {item} has {amount_left} units left");
        }
        ServerMessage::SoldOut { item } => println!("{item} is sold out!"),
        ServerMessage::Confirm {
            item,
            amount_bought,
        } => println!("Purchase confirmed: {amount_bought} x {item}"),
        ServerMessage::Fail { message } => println!("{message}"),
    }
}

/// Turn one line of user input into a message, or print usage help.
fn parse_command(input: &str) -> Option<ClientMessage> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    match parts.as_slice() {
        [] => None,
        [cmd] if cmd.eq_ignore_ascii_case("LIST") => Some(ClientMessage::List),
        [cmd] if cmd.eq_ignore_ascii_case("LEAVE") => Some(ClientMessage::Leave),
        [cmd, item, amount] if cmd.eq_ignore_ascii_case("BUY") => match amount.parse() {
            Ok(amount) => Some(ClientMessage::Buy {
                item: (*item).to_string(),
                amount,
            }),
            Err(_) => {
                println!("Usage: BUY <item> <amount>");
                None
            }
        },
        _ => {
            println!("Commands: LIST, BUY <item> <amount>, LEAVE");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (name, addr) = parse_args();
    init_logging_stderr();

    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("Failed to connect to market at {addr}"))?;
    println!("{name} connected to the market at {addr}.");

    let (read_half, mut write_half) = stream.into_split();
    let mut server_lines = BufReader::new(read_half).lines();
    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();

    send(&mut write_half, &ClientMessage::Join { name }).await?;

    loop {
        tokio::select! {
            line = server_lines.next_line() => {
                match line {
                    Ok(Some(line)) => render(&line),
                    Ok(None) | Err(_) => {
                        println!("Disconnected from market.");
                        break;
                    }
                }
            }
            line = stdin_lines.next_line() => {
                let Ok(Some(input)) = line else { break };
                let Some(message) = parse_command(&input) else { continue };
                let leaving = message == ClientMessage::Leave;
                send(&mut write_half, &message).await?;
                if leaving {
                    println!("Leaving the market.");
                    break;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_buy() {
        assert_eq!(
            parse_command("buy flour 3"),
            Some(ClientMessage::Buy {
                item: "flour".into(),
                amount: 3
            })
        );
    }

    #[test]
    fn test_parse_command_list_and_leave() {
        assert_eq!(parse_command("LIST"), Some(ClientMessage::List));
        assert_eq!(parse_command("leave"), Some(ClientMessage::Leave));
    }

    #[test]
    fn test_parse_command_rejects_garbage() {
        assert_eq!(parse_command("BUY flour"), None);
        assert_eq!(parse_command("dance"), None);
        assert_eq!(parse_command(""), None);
    }
}
