#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for waiting on automated test e-mails

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use zeta_inbox::{Mailbox, MailboxSettings, PollPolicy, Purpose, load_settings};

#[derive(Parser)]
#[command(name = "zeta-inbox")]
#[command(about = "Wait for automated test e-mails and print their tokens")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON account list; falls back to IMAP_* environment variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Wait for an e-mail and print its tokens
    Wait {
        /// activation, password-reset or invitation
        #[arg(value_parser = parse_purpose)]
        purpose: Purpose,

        /// Sender address
        #[arg(long)]
        from: String,

        /// Recipient address
        #[arg(long)]
        to: String,

        /// Account (login user) to search; defaults to the first one
        #[arg(long)]
        account: Option<String>,

        /// Seconds between polls
        #[arg(long, default_value = "5")]
        interval: u64,

        /// Seconds before giving up
        #[arg(long, default_value = "120")]
        timeout: u64,
    },

    /// List configured accounts
    Accounts,
}

fn parse_purpose(s: &str) -> Result<Purpose, String> {
    s.parse().map_err(|e: zeta_inbox::Error| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let accounts = match &args.config {
        Some(path) => load_settings(path).await?,
        None => vec![MailboxSettings::from_env()?],
    };

    match &args.command {
        Command::Wait {
            purpose,
            from,
            to,
            account,
            interval,
            timeout,
        } => {
            let policy = PollPolicy::new(
                Duration::from_secs(*interval),
                Duration::from_secs(*timeout),
            );
            let settings = pick_account(accounts, account.as_deref())?;
            let mailbox = Mailbox::new(settings).with_policy(policy);
            cmd_wait(&mailbox, &args, *purpose, from, to).await?;
        }
        Command::Accounts => {
            cmd_accounts(&accounts, &args)?;
        }
    }

    Ok(())
}

fn pick_account(
    accounts: Vec<MailboxSettings>,
    wanted: Option<&str>,
) -> anyhow::Result<MailboxSettings> {
    let mut accounts = accounts.into_iter();
    match wanted {
        None => accounts
            .next()
            .ok_or_else(|| anyhow::anyhow!("no accounts configured")),
        Some(user) => accounts
            .find(|s| s.user.eq_ignore_ascii_case(user))
            .ok_or_else(|| anyhow::anyhow!("no account configured for {user}")),
    }
}

async fn cmd_wait(
    mailbox: &Mailbox,
    args: &Args,
    purpose: Purpose,
    from: &str,
    to: &str,
) -> anyhow::Result<()> {
    let tokens = mailbox.await_purpose(purpose, from, to).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        print_tokens(purpose, &tokens);
    }

    Ok(())
}

fn cmd_accounts(accounts: &[MailboxSettings], args: &Args) -> anyhow::Result<()> {
    if args.json {
        let listed: Vec<serde_json::Value> = accounts
            .iter()
            .map(|s| {
                serde_json::json!({
                    "user": s.user,
                    "host": s.host,
                    "port": s.port(),
                    "conn": s.conn.get(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listed)?);
    } else {
        println!("{:<32} {:<28} {}", "User", "Host", "Conn");
        println!("{}", "-".repeat(70));
        for s in accounts {
            println!(
                "{:<32} {:<28} {}",
                s.user,
                format!("{}:{}", s.host, s.port()),
                s.conn
            );
        }
    }
    Ok(())
}

fn print_tokens(purpose: Purpose, tokens: &serde_json::Value) {
    let Some(items) = tokens.as_array() else {
        return;
    };
    for item in items {
        match purpose {
            Purpose::Activation | Purpose::PasswordReset => {
                println!(
                    "key={} code={}",
                    item["key"].as_str().unwrap_or_default(),
                    item["code"].as_str().unwrap_or_default()
                );
            }
            Purpose::Invitation => {
                println!("id={}", item.as_str().unwrap_or_default());
            }
        }
    }
    println!("\n{} {} e-mail(s)", items.len(), purpose);
}
