use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use devnet_harness::setup::{devnet_config, project_root, DevnetVariant};
use devnet_harness::{ports, ChainmainSetup, CronosSetup, Devnet, GethSetup, HermesSetup};

#[derive(Parser)]
#[command(name = "devnet")]
#[command(version, about = "Local blockchain devnet manager", long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,

    /// Data directory for node homes, configs and logs
    #[clap(short = 'd', long, env = "DEVNET_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Verbose logging
    #[clap(short = 'v', long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Initialise and run a Cronos devnet with pystarport
    Cronos {
        #[clap(long, default_value_t = 26650, value_parser = base_port_parser())]
        base_port: u16,

        /// Custom devnet definition (defaults to the project's devnet config)
        #[clap(long)]
        config: Option<PathBuf>,

        /// Chain binary for pystarport to drive
        #[clap(long)]
        chain_binary: Option<String>,

        /// Use the experimental devnet definition
        #[clap(long)]
        experimental: bool,

        /// Boot with ERC20 auto deployment turned off
        #[clap(long)]
        disable_auto_deployment: bool,
    },

    /// Run the chain-main sidecar chain
    Chainmain {
        #[clap(long, default_value_t = 26800, value_parser = base_port_parser())]
        base_port: u16,
    },

    /// Run the Hermes relayer configured in the data directory
    Hermes,

    /// Run a standalone geth node
    Geth {
        #[clap(long, default_value_t = 8545, value_parser = base_port_parser())]
        base_port: u16,
    },

    /// Print the ports derived from a base port
    Ports {
        #[clap(long, default_value_t = 26650, value_parser = base_port_parser())]
        base_port: u16,
    },
}

/// Base ports whose whole validator block stays within 1..=65535
fn base_port_parser() -> clap::builder::RangedI64ValueParser<u16> {
    clap::value_parser!(u16).range(1..=i64::from(ports::MAX_BASE_PORT))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let data_dir = args.data_dir.unwrap_or_else(|| {
        std::env::temp_dir().join(format!("devnet-{}", std::process::id()))
    });

    match args.command {
        Command::Cronos {
            base_port,
            config,
            chain_binary,
            experimental,
            disable_auto_deployment,
        } => {
            let variant = if experimental {
                DevnetVariant::Experimental
            } else {
                DevnetVariant::Default
            };
            let config = config.unwrap_or_else(|| {
                devnet_config(&project_root(), variant, !disable_auto_deployment)
            });
            info!("Using devnet config: {}", config.display());

            prepare(&data_dir)?;
            let mut setup = CronosSetup::new(&data_dir, base_port, config);
            if let Some(binary) = chain_binary {
                setup = setup.chain_binary(binary);
            }
            let cronos = setup.start().context("Failed to start Cronos devnet")?;

            info!("Cronos devnet is up:");
            info!("  • Chain dir: {}", cronos.base_dir().display());
            info!("  • Node RPC:  {}", cronos.node_rpc(0)?);
            info!("  • EVM HTTP:  {}", cronos.w3_http_endpoint(0)?);
            info!("  • EVM WS:    {}", cronos.w3_ws_endpoint(0)?);
            info!("  • Auto deployment: {}", cronos.enable_auto_deployment());
            serve(cronos)
        }
        Command::Chainmain { base_port } => {
            prepare(&data_dir)?;
            let chainmain = ChainmainSetup::new(&data_dir, base_port)
                .start()
                .context("Failed to start chain-main")?;

            info!("chain-main is up:");
            info!("  • Chain dir: {}", chainmain.base_dir().display());
            info!("  • Node RPC:  {}", chainmain.node_rpc(0)?);
            serve(chainmain)
        }
        Command::Hermes => {
            let hermes = HermesSetup::new(&data_dir)
                .start()
                .context("Failed to start Hermes")?;

            info!("Hermes is up:");
            info!("  • Config: {}", hermes.config_path().display());
            for chain in hermes.chain_ids() {
                info!("  • Relaying for: {}", chain);
            }
            serve(hermes)
        }
        Command::Geth { base_port } => {
            prepare(&data_dir)?;
            let setup = GethSetup::new(&data_dir, base_port);
            let log_path = setup.log_path();
            let geth = setup.start().context("Failed to start geth")?;

            info!("geth is up:");
            info!("  • JSON-RPC: {}", geth.w3().endpoint());
            info!("  • Log:      {}", log_path.display());
            serve(geth)
        }
        Command::Ports { base_port } => {
            println!("base port      {}", base_port);
            println!("evm rpc        {}", ports::evmrpc_port(base_port)?);
            println!("evm websocket  {}", ports::evmrpc_ws_port(base_port)?);
            println!("p2p            {}", ports::p2p_port(base_port)?);
            println!("rpc            {}", ports::rpc_port(base_port)?);
            Ok(())
        }
    }
}

fn prepare(data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    info!("Using data directory: {}", data_dir.display());
    Ok(())
}

/// Keep the devnet up until Ctrl+C, then tear it down
fn serve<H>(devnet: Devnet<H>) -> Result<()> {
    info!("");
    info!("Use Ctrl+C to stop the devnet");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;
    let signal = runtime.block_on(tokio::signal::ctrl_c());

    info!("Received shutdown signal, stopping devnet");
    match devnet.teardown() {
        Ok(status) => info!("Devnet stopped ({})", status),
        Err(e) => warn!("Devnet teardown failed: {}", e),
    }

    signal.context("Failed to listen for Ctrl+C")
}
