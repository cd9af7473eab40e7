use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use shielded_ledger::fee::base_and_fee;
use shielded_ledger::{Blake3Oracle, CommitmentTree, LedgerConfig, NoteCommitment};

#[derive(Parser, Debug)]
#[command(name = "shielded-ledger")]
#[command(about = "off-ledger tooling for the shielded pool", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// split an amount into base and fee
    Fee {
        #[arg(long)]
        amount: u128,

        /// fee in basis points
        #[arg(long, default_value_t = 0)]
        bps: u16,

        /// amount already includes the fee
        #[arg(long)]
        inclusive: bool,
    },

    /// replay commitment insertions and print the resulting root
    Root {
        #[arg(long, default_value_t = shielded_ledger::config::DEFAULT_TREE_DEPTH)]
        depth: u8,

        /// hex-encoded 32-byte commitments, in insertion order
        leaves: Vec<String>,
    },

    /// load and validate a json config
    Config {
        #[arg(long)]
        path: String,
    },
}

fn parse_leaf(s: &str) -> Result<NoteCommitment> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).with_context(|| format!("bad hex: {}", s))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("expected 32 bytes, got {}", b.len()))?;
    Ok(NoteCommitment(bytes))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shielded_ledger=info".into()),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Fee { amount, bps, inclusive } => {
            let (base, fee) = base_and_fee(amount, inclusive, bps)?;
            println!("base: {}", base);
            println!("fee:  {}", fee);
        }
        Command::Root { depth, leaves } => {
            anyhow::ensure!(
                depth > 0 && depth <= shielded_ledger::commitment::MAX_TREE_DEPTH,
                "depth must be in 1..=32"
            );
            let leaves = leaves.iter().map(|s| parse_leaf(s)).collect::<Result<Vec<_>>>()?;

            let mut tree = CommitmentTree::new(Blake3Oracle, depth);
            let insertion = tree.insert_leaves(&leaves);
            info!(count = insertion.count, "replayed leaves");

            println!("tree:  {}", tree.current_tree_number());
            println!("next:  {}", tree.next_free_index());
            println!("root:  {}", tree.current_root());
        }
        Command::Config { path } => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            let config = LedgerConfig::from_json(&json)?;
            info!(path = %path, "config valid");
            println!("{}", config.to_json()?);
        }
    }

    Ok(())
}
