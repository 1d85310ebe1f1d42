// hwallet — command-line front end for hidden wallet
//
// Cross-platform (macOS, Linux, Windows) interface over hiddenwallet-core:
// tiered key protection, privacy-routed transfers and relay submission.

mod addresses;
mod config;

use addresses::{AddressBook, StoredAddress};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use hiddenwallet_core::{
    obfuscate_address, HiddenWallet, HistoryQuery, LocalSigner, RelayRouter, RelayRouterConfig,
    RpcClientFactory, SecurityLevel, TransactionOptions, TransferReceipt,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "hwallet")]
#[command(about = "Hidden Wallet — privacy-routed transfers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create config and a signing keypair
    Init {
        /// Replace an existing keypair
        #[arg(long)]
        generate_keypair: bool,
        /// basic | standard | high
        #[arg(short, long)]
        level: Option<String>,
    },
    /// Manage hidden addresses
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Send funds through the configured privacy tier
    Send {
        to: String,
        amount: f64,
        /// Skip privacy routing
        #[arg(long)]
        direct: bool,
    },
    /// Show balance of the signing identity
    Balance,
    /// Show recent transactions
    History {
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Only signatures older than this one
        #[arg(short, long)]
        before: Option<String>,
    },
    /// Inspect relay nodes
    Nodes {
        #[command(subcommand)]
        action: NodesAction,
    },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum AddressAction {
    New {
        #[arg(short, long)]
        label: Option<String>,
        /// Seal with this passphrase instead of the master key
        #[arg(short, long)]
        passphrase: Option<String>,
    },
    List,
    Show {
        address: String,
        /// Decrypt the stored key to check it still opens
        #[arg(long)]
        unlock: bool,
        #[arg(short, long)]
        passphrase: Option<String>,
    },
    Remove { address: String },
    /// Send from a hidden address with its own key
    Spend {
        address: String,
        to: String,
        amount: f64,
        #[arg(short, long)]
        passphrase: Option<String>,
    },
}

#[derive(Subcommand)]
enum NodesAction {
    /// Probe every relay node once
    Health,
    /// Measure latency and list nodes fastest first
    Refresh,
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
}

#[derive(Subcommand)]
enum NodeAction {
    Add { url: String },
    Remove { url: String },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            generate_keypair,
            level,
        } => cmd_init(generate_keypair, level).await,
        Commands::Address { action } => cmd_address(action).await,
        Commands::Send { to, amount, direct } => cmd_send(to, amount, direct).await,
        Commands::Balance => cmd_balance().await,
        Commands::History { limit, before } => cmd_history(limit, before).await,
        Commands::Nodes { action } => cmd_nodes(action).await,
        Commands::Config { action } => cmd_config(action).await,
    }
}

fn keypair_file(config: &config::Config) -> Result<PathBuf> {
    match &config.keypair_path {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(config::Config::data_dir()?.join("keypair.json")),
    }
}

fn open_wallet(config: &config::Config, signer: LocalSigner) -> Result<HiddenWallet> {
    let wallet_config = config.effective_wallet()?;
    if wallet_config.master_key.is_none() {
        tracing::warn!("no master key configured; hidden addresses sealed this run cannot be reopened later");
    }
    let factory = RpcClientFactory::with_timeout(RPC_TIMEOUT)?;
    let wallet = HiddenWallet::new(wallet_config, Box::new(signer), Arc::new(factory))?;
    Ok(wallet)
}

async fn connected_wallet(config: &config::Config) -> Result<HiddenWallet> {
    let path = keypair_file(&config)?;
    let signer = LocalSigner::from_file(&path)
        .with_context(|| format!("No keypair at {} (run `hwallet init`)", path.display()))?;
    let mut wallet = open_wallet(config, signer)?;
    wallet.connect().await?;
    Ok(wallet)
}

fn format_time(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

async fn cmd_init(generate_keypair: bool, level: Option<String>) -> Result<()> {
    println!("{}", "Initializing Hidden Wallet...".bold());

    let mut config = config::Config::load()?;
    if let Some(level) = level {
        config.set("security_level", &level)?;
    }

    let path = keypair_file(&config)?;
    let signer = if path.exists() && !generate_keypair {
        println!("{} Keypair already exists", "✓".green());
        LocalSigner::from_file(&path)?
    } else {
        let signer = LocalSigner::generate();
        signer.save_to_file(&path)?;
        println!("{} Keypair written to {}", "✓".green(), path.display());
        signer
    };
    config.set("keypair_path", &path.to_string_lossy())?;

    println!();
    println!("  {:<16} {}", "Address:".bright_cyan(), signer.address());
    println!("  {:<16} {}", "Security level:".bright_cyan(), config.wallet.security_level);
    println!("  {:<16} {}", "Network:".bright_cyan(), config.wallet.network);

    if config.wallet.master_key.is_none() {
        println!();
        println!(
            "{} No master key set. Run {} so hidden addresses survive restarts.",
            "!".yellow(),
            "hwallet config set master_key <secret>".bright_yellow()
        );
    }
    Ok(())
}

async fn cmd_address(action: AddressAction) -> Result<()> {
    let config = config::Config::load()?;
    let book = AddressBook::open(config::Config::data_dir()?.join("addresses"))?;

    match action {
        AddressAction::New { label, passphrase } => {
            if passphrase.is_none() && config.effective_wallet()?.master_key.is_none() {
                anyhow::bail!("No master key configured; pass --passphrase or set master_key first");
            }
            // Sealing needs only the key service, not a signing identity
            let wallet = open_wallet(&config, LocalSigner::generate())?;
            let hidden = wallet.create_hidden_address(passphrase.as_deref())?;

            let mut entry = StoredAddress::new(hidden);
            if let Some(label) = label {
                entry = entry.with_label(label);
            }
            book.add(&entry)?;

            println!("{} Hidden address created", "✓".green());
            println!("  {:<12} {}", "Public key:".bright_cyan(), entry.address.public_key);
            println!("  {:<12} {}", "Tier:".bright_cyan(), wallet.security_level());
        }

        AddressAction::List => {
            let entries = book.list()?;
            if entries.is_empty() {
                println!("{}", "No hidden addresses yet.".dimmed());
                return Ok(());
            }

            println!("{} ({})", "Hidden Addresses".bold(), entries.len());
            println!();
            for entry in entries {
                println!(
                    "  {} {}",
                    entry.display_name().bright_cyan(),
                    format_time(entry.address.created_at as i64).dimmed()
                );
                if entry.label.is_some() {
                    println!("    {}", entry.address.public_key.dimmed());
                }
            }
        }

        AddressAction::Show {
            address,
            unlock,
            passphrase,
        } => {
            let entry = book
                .find(&address)?
                .with_context(|| format!("Hidden address not found: {}", address))?;

            println!("{}", "Hidden Address".bold());
            println!();
            if let Some(label) = &entry.label {
                println!("  {:<12} {}", "Label:".bright_cyan(), label);
            }
            println!("  {:<12} {}", "Public key:".bright_cyan(), entry.address.public_key);
            println!(
                "  {:<12} {}",
                "Created:".bright_cyan(),
                format_time(entry.address.created_at as i64)
            );

            if unlock {
                let wallet = open_wallet(&config, LocalSigner::generate())?;
                let keypair = wallet.unlock_hidden_address(&entry.address, passphrase.as_deref())?;
                println!();
                println!("{} Key opens and matches {}", "✓".green(), obfuscate_address(&keypair.address()));
            }
        }

        AddressAction::Spend {
            address,
            to,
            amount,
            passphrase,
        } => {
            let entry = book
                .find(&address)?
                .with_context(|| format!("Hidden address not found: {}", address))?;
            let mut wallet = open_wallet(&config, LocalSigner::generate())?;
            let signature = wallet
                .send_from_hidden_address(&entry.address, passphrase.as_deref(), &to, amount)
                .await?;

            println!("{} Sent {} from {}", "✓".green(), amount.to_string().bold(), entry.display_name());
            println!("  {:<11} {}", "Signature:".bright_cyan(), signature);
        }

        AddressAction::Remove { address } => {
            let entry = book
                .find(&address)?
                .with_context(|| format!("Hidden address not found: {}", address))?;
            book.remove(&entry.address.public_key)?;
            println!("{} Removed {}", "✓".green(), entry.display_name());
        }
    }

    Ok(())
}

async fn cmd_send(to: String, amount: f64, direct: bool) -> Result<()> {
    let config = config::Config::load()?;
    let mut wallet = connected_wallet(&config).await?;

    let mut options = TransactionOptions::new(to, amount);
    if direct {
        options = options.direct();
    }

    let tier = wallet.security_level();
    println!(
        "Sending {} to {} ({})",
        amount.to_string().bold(),
        options.to.bright_cyan(),
        if direct { "direct".to_string() } else { tier.to_string() }
    );
    if tier == SecurityLevel::High && !direct {
        println!("  {}", "routing through relay nodes, this can take a few seconds".dimmed());
    }

    let receipt = wallet.send_transaction(&options).await?;
    println!("{} Submitted", "✓".green());
    println!("  {:<11} {}", "Signature:".bright_cyan(), receipt.signature);

    if !receipt.is_delivered() {
        let parked = park_intermediate_keys(&config, &wallet, &receipt)?;
        println!(
            "  {} {} hop(s), completing route...",
            "→".bright_cyan(),
            receipt.plan.hop_count()
        );

        match wallet.complete_route(&receipt).await {
            Ok(signatures) => {
                println!("{} Delivered in {} more transaction(s)", "✓".green(), signatures.len());
            }
            Err(e) => {
                if parked {
                    println!(
                        "{} Route incomplete; hop keys are in the address book, recover with {}",
                        "!".yellow(),
                        "hwallet address spend".bright_yellow()
                    );
                }
                return Err(e.into());
            }
        }
    }

    wallet.disconnect().await?;
    Ok(())
}

/// Store sealed hop keys before more funds move, so an interrupted route
/// stays recoverable. Returns whether the keys were stored.
fn park_intermediate_keys(
    config: &config::Config,
    wallet: &HiddenWallet,
    receipt: &TransferReceipt,
) -> Result<bool> {
    if config.effective_wallet()?.master_key.is_none() {
        tracing::warn!("no master key configured; hop keys are not stored");
        return Ok(false);
    }

    let book = AddressBook::open(config::Config::data_dir()?.join("addresses"))?;
    let route: String = receipt.signature.chars().take(8).collect();
    for (i, intermediate) in receipt.plan.intermediates.iter().enumerate() {
        let sealed = wallet.seal_intermediate_key(intermediate, None)?;
        book.add(&StoredAddress::new(sealed).with_label(format!("route-{}-{}", route, i + 1)))?;
    }
    Ok(true)
}

async fn cmd_balance() -> Result<()> {
    let config = config::Config::load()?;
    let mut wallet = connected_wallet(&config).await?;
    let balance = wallet.get_balance().await?;
    let address = wallet
        .get_public_key()
        .map(|a| a.to_string())
        .unwrap_or_default();
    wallet.disconnect().await?;

    println!("{}", address.bright_cyan());
    println!("  {} SOL", balance.to_string().bold());
    Ok(())
}

async fn cmd_history(limit: usize, before: Option<String>) -> Result<()> {
    let config = config::Config::load()?;
    let mut wallet = connected_wallet(&config).await?;
    let records = wallet
        .get_transaction_history(&HistoryQuery { limit, before })
        .await?;
    wallet.disconnect().await?;

    if records.is_empty() {
        println!("{}", "No transactions found.".dimmed());
        return Ok(());
    }

    println!("{} ({})", "Transaction History".bold(), records.len());
    println!();
    for record in records {
        let status = if record.failed { "✗".red() } else { "✓".green() };
        let when = record
            .block_time
            .map(format_time)
            .unwrap_or_else(|| "pending".to_string());
        println!("  {} {} {}", status, record.signature, format!("slot {}", record.slot).dimmed());
        println!("    {}", when.dimmed());
    }
    Ok(())
}

async fn cmd_nodes(action: NodesAction) -> Result<()> {
    let config = config::Config::load()?;
    let wallet_config = config.effective_wallet()?;
    let factory = RpcClientFactory::with_timeout(RPC_TIMEOUT)?;
    let mut router = RelayRouter::new(
        wallet_config.relay_nodes(),
        Arc::new(factory),
        RelayRouterConfig {
            commitment: wallet_config.commitment,
            ..RelayRouterConfig::default()
        },
    );

    match action {
        NodesAction::Health => {
            let report = router.check_all_nodes_health().await;
            let mut report: Vec<_> = report.into_iter().collect();
            report.sort();

            println!("{}", "Relay Node Health".bold());
            println!();
            for (url, healthy) in report {
                let mark = if healthy { "✓".green() } else { "✗".red() };
                println!("  {} {}", mark, url);
            }
        }

        NodesAction::Refresh => {
            router.refresh_health().await;
            let nodes = router.nodes();

            println!("{}", "Relay Nodes (fastest first)".bold());
            println!();
            for node in nodes {
                let latency = match node.latency_ms {
                    Some(ms) => format!("{} ms", ms),
                    None => "unreachable".red().to_string(),
                };
                println!("  {:<48} {:>12}  weight {}", node.url, latency, node.weight);
            }
        }
    }

    Ok(())
}

async fn cmd_config(action: ConfigAction) -> Result<()> {
    let mut config = config::Config::load()?;

    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            let shown = if key == "master_key" { "(set)".to_string() } else { value };
            println!("{} Set {} = {}", "✓".green(), key.bright_cyan(), shown);
        }

        ConfigAction::Get { key } => {
            if let Some(value) = config.get(&key) {
                println!("{} = {}", key.bright_cyan(), value);
            } else {
                anyhow::bail!("Unknown config key: {}", key);
            }
        }

        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            println!();

            for (key, value) in config.list() {
                println!("  {:<20} {}", key.bright_cyan(), value);
            }

            println!();
            print_relay_nodes(&config);
        }

        ConfigAction::Node { action } => match action {
            NodeAction::Add { url } => {
                if config.add_relay_node(url.clone())? {
                    println!("{} Added relay node: {}", "✓".green(), url);
                } else {
                    println!("{} Relay node already configured", "✓".green());
                }
            }

            NodeAction::Remove { url } => {
                let removed = config.remove_relay_node(&url)?;
                if removed == 0 {
                    anyhow::bail!("Relay node not configured: {}", url);
                }
                println!("{} Removed relay node", "✓".green());
            }

            NodeAction::List => print_relay_nodes(&config),
        },
    }

    Ok(())
}

fn print_relay_nodes(config: &config::Config) {
    println!("{}", "Relay nodes:".bold());
    if config.wallet.relay_nodes.is_empty() {
        println!("  {}", "(none configured, using defaults)".dimmed());
        for node in config.wallet.relay_nodes() {
            println!("    {}", node.url.dimmed());
        }
    } else {
        for (i, node) in config.wallet.relay_nodes.iter().enumerate() {
            println!("  {}. {}", i + 1, node);
        }
    }
}
