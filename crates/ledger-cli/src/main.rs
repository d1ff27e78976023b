use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::crypto::{public_key_hex, sign_message};
use ledger_core::signing_message;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign a transfer with a secret key and submit it
    Submit {
        /// Hex-encoded secp256k1 secret key of the sender
        #[arg(long, env = "LEDGER_SECRET_KEY")]
        secret_key: String,
        /// Recipient
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long)]
        amount: u64,
        /// Defaults to the current unix time
        #[arg(long)]
        timestamp: Option<u64>,
    },
    /// Show the balance of an address
    Balance {
        address: String,
    },
    /// List every transaction touching an address
    History {
        address: String,
    },
    /// Ask the node to mine pending transactions
    Mine {
        #[arg(long)]
        reward_address: String,
    },
    /// Print the address (public key) for a secret key
    Address {
        #[arg(long, env = "LEDGER_SECRET_KEY")]
        secret_key: String,
    },
}

#[derive(Serialize)]
struct Tx {
    from: String,
    to: String,
    amount: u64,
    timestamp: u64,
    signature: String,
}

fn signed_transfer(secret_key: &str, to: String, amount: u64, timestamp: u64) -> Result<Tx> {
    let from = public_key_hex(secret_key).context("deriving sender address")?;
    let signature = sign_message(secret_key, &signing_message(&from, &to, amount, timestamp))
        .context("signing transfer")?;
    Ok(Tx {
        from,
        to,
        amount,
        timestamp,
        signature,
    })
}

async fn print_response(res: reqwest::Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    println!("{body}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();
    match cli.cmd {
        Command::Submit {
            secret_key,
            to,
            amount,
            timestamp,
        } => {
            let timestamp = match timestamp {
                Some(ts) => ts,
                None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
            };
            let tx = signed_transfer(&secret_key, to, amount, timestamp)?;
            debug!("submitting transfer from {}", tx.from);
            let res = client.post(format!("{node}/tx")).json(&tx).send().await?;
            print_response(res).await?;
        }
        Command::Balance { address } => {
            let res = client
                .get(format!("{node}/address/{address}/balance"))
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::History { address } => {
            let res = client
                .get(format!("{node}/address/{address}/transactions"))
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Mine { reward_address } => {
            let res = client
                .post(format!("{node}/mine"))
                .json(&serde_json::json!({ "reward_address": reward_address }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Command::Address { secret_key } => {
            println!("{}", public_key_hex(&secret_key)?);
        }
    }
    Ok(())
}
