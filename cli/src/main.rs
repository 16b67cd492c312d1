//! icoctl - operate a crowdsale deployment stored in a data directory
//!
//! Every command loads the `crowdsale` snapshot, performs one operation as
//! the `--from` identity and writes the snapshot back.

mod config;
mod report;

use clap::{Parser, Subcommand};
use ico_crowdsale::{Address, Balance, Crowdsale, FundingSource, TokenLedger};
use ico_storage::{Storage, StorageError, CROWDSALE_SNAPSHOT};
use log::info;
use std::path::{Path, PathBuf};

use crate::config::{parse_amount, ConfigFile};

#[derive(Parser, Debug)]
#[command(name = "icoctl")]
#[command(about = "Crowdsale controller and token ledger", version)]
struct Cli {
    /// Directory holding the deployment snapshot
    #[arg(short, long, default_value = "./ico-data")]
    data_dir: PathBuf,

    /// Unix timestamp to run the operation at (defaults to now)
    #[arg(long)]
    now: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new deployment from a sale configuration file
    Init {
        /// Sale configuration (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Replace an existing deployment
        #[arg(long)]
        force: bool,
    },

    /// Open the sale (owner only)
    Start {
        #[arg(long)]
        from: Address,
    },

    /// Contribute value directly
    Fund {
        #[arg(long)]
        from: Address,

        /// Amount in wei, or with an eth suffix (e.g. 10eth)
        #[arg(long, value_parser = parse_amount)]
        value: Balance,
    },

    /// Credit an off-chain contribution to a beneficiary (owner only)
    FundBtc {
        #[arg(long)]
        from: Address,

        #[arg(long)]
        beneficiary: Address,

        /// ETH-equivalent amount in wei, or with an eth suffix
        #[arg(long, value_parser = parse_amount)]
        value: Balance,
    },

    /// Show the current bonus
    Bonus,

    /// Close the sale and mint the founder allocation (owner only)
    Finish {
        #[arg(long)]
        from: Address,
    },

    /// Token balance of an account
    Balance { address: Address },

    /// Transfer tokens (after the sale has finished)
    Transfer {
        #[arg(long)]
        from: Address,

        #[arg(long)]
        to: Address,

        #[arg(long)]
        amount: Balance,
    },

    /// Sale summary
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        report::failure(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let now = cli.now.unwrap_or_else(current_timestamp);
    let storage = Storage::open(&cli.data_dir)?;

    if let Commands::Init { config, force } = &cli.command {
        let sale = init_deployment(&storage, config, *force)?;
        report::success(&format!(
            "deployment created in {} (controller {})",
            storage.data_dir().display(),
            sale.address()
        ));
        return Ok(());
    }

    let mut sale = storage.load_crowdsale().map_err(|e| match e {
        StorageError::SnapshotNotFound(_) => {
            format!("no deployment in {}; run `icoctl init` first", cli.data_dir.display()).into()
        }
        other => Box::<dyn std::error::Error>::from(other),
    })?;

    let mutated = execute(&mut sale, cli.command, now)?;
    if mutated {
        storage.save_crowdsale(&sale)?;
    }
    Ok(())
}

/// Run a single command; returns whether the deployment changed
fn execute(sale: &mut Crowdsale, command: Commands, now: u64) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        Commands::Init { .. } => unreachable!("handled before loading"),

        Commands::Start { from } => {
            sale.start_ico(&from, now)?;
            report::success("crowdsale started");
            Ok(true)
        }

        Commands::Fund { from, value } => {
            let quote = sale.fund(&from, value, now)?;
            report::purchase(&quote, &from, FundingSource::Direct);
            Ok(true)
        }

        Commands::FundBtc {
            from,
            beneficiary,
            value,
        } => {
            let quote = sale.fund_btc(&from, &beneficiary, value, now)?;
            report::purchase(&quote, &beneficiary, FundingSource::Attested);
            Ok(true)
        }

        Commands::Bonus => {
            let bps = sale.get_bonus(now);
            println!("{} bps ({})", bps, report::format_bonus(bps));
            Ok(false)
        }

        Commands::Finish { from } => {
            let founder_bonus = sale.finish_crowdsale(&from, now)?;
            report::success(&format!(
                "crowdsale finished; {} tokens allocated to {}",
                founder_bonus,
                sale.multisig()
            ));
            Ok(true)
        }

        Commands::Balance { address } => {
            report::balance(&address, sale.balance_of(&address));
            Ok(false)
        }

        Commands::Transfer { from, to, amount } => {
            sale.ledger_mut().transfer(&from, &to, amount)?;
            report::success(&format!("transferred {} from {} to {}", amount, from, to));
            Ok(true)
        }

        Commands::Status { json } => {
            let status = sale.status(now);
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                report::status(&status, sale.address());
            }
            Ok(false)
        }
    }
}

fn init_deployment(
    storage: &Storage,
    config_path: &Path,
    force: bool,
) -> Result<Crowdsale, Box<dyn std::error::Error>> {
    if storage.has_snapshot(CROWDSALE_SNAPSHOT) && !force {
        return Err(format!(
            "deployment already exists in {}; pass --force to replace it",
            storage.data_dir().display()
        )
        .into());
    }

    let config = ConfigFile::load(config_path)?.to_sale_config()?;
    let owner = config.owner;
    let controller = config.controller;

    let mut ledger = TokenLedger::new(owner);
    ledger.set_emission_authority(&owner, controller)?;

    let sale = Crowdsale::new(config, ledger)?;
    storage.save_crowdsale(&sale)?;
    info!("initialised deployment from {}", config_path.display());
    Ok(sale)
}

fn current_timestamp() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
