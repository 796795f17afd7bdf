use std::process::exit;
use std::thread::sleep;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{ensure, Context as _, Result};
use beacon_node::config::{NodeConfig, SpecPreset};
use beacon_node::node::{Message, Node, EXIT_CONFIG_ERROR, EXIT_TRANSITION_FAILURE};
use beacon_node::slot_clock::SlotClock;
use log::{error, info};
use types::config::{Config, MainnetConfig, MinimalConfig};
use types::primitives::H256;

fn main() {
    simple_logger::init().expect("logging can only be initialized once");

    let config = match load_config() {
        Ok(config) => config,
        Err(error) => {
            error!("{:#}", error);
            exit(EXIT_CONFIG_ERROR);
        }
    };

    let code = match config.preset {
        SpecPreset::Mainnet => run::<MainnetConfig>(&config),
        SpecPreset::Minimal => run::<MinimalConfig>(&config),
    };
    exit(code);
}

fn load_config() -> Result<NodeConfig> {
    let mut args = std::env::args().skip(1);
    match args.next() {
        None => Ok(NodeConfig::default()),
        Some(path) => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path))?;
            NodeConfig::from_yaml(&source)
                .with_context(|| format!("cannot parse {}", path))
        }
    }
}

fn run<C: Config>(config: &NodeConfig) -> i32 {
    let eth1_block_hash = match parse_hash(&config.eth1_block_hash) {
        Ok(hash) => hash,
        Err(error) => {
            error!("{:#}", error);
            return EXIT_CONFIG_ERROR;
        }
    };

    let genesis_state = match transition_functions::genesis::initialize_beacon_state::<C>(
        config.genesis_time,
        eth1_block_hash,
        config.validator_count,
    ) {
        Ok(state) => state,
        Err(error) => {
            error!("cannot build the genesis state: {}", error);
            return EXIT_TRANSITION_FAILURE;
        }
    };

    let mut node = match Node::new(genesis_state) {
        Ok(node) => node,
        Err(fatal) => {
            error!("cannot start the node: {:?}", fatal);
            return fatal.exit_code();
        }
    };

    info!("node started; status: {:?}", node.status());

    // Without a network transport the only message source is the clock.
    let clock = SlotClock::new(config.genesis_time, C::seconds_per_slot());
    let mut last_slot = None;
    loop {
        if let Some(slot) = clock.slot_at(unix_now()) {
            if last_slot < Some(slot) && slot > 0 {
                last_slot = Some(slot);
                if let Err(fatal) = node.handle_message(Message::Tick(slot)) {
                    error!("fatal: {:?}", fatal);
                    return fatal.exit_code();
                }
                let (applied, rejected) = node.counters();
                info!(
                    "slot {}: {} blocks applied, {} rejected",
                    slot, applied, rejected
                );
            }
        }
        sleep(Duration::from_secs(clock.seconds_to_next_slot(unix_now())));
    }
}

fn parse_hash(source: &str) -> Result<H256> {
    let stripped = source.trim_start_matches("0x");
    let bytes = hex::decode(stripped).context("eth1 block hash is not valid hex")?;
    ensure!(
        bytes.len() == 32,
        "eth1 block hash has {} bytes, expected 32",
        bytes.len()
    );
    Ok(H256::from_slice(&bytes))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("the clock is past the epoch")
        .as_secs()
}
