//! Proof Vector Generator
//!
//! Writes one JSON file per fork with a proof vector for every proof kind, for verifier test
//! suites in other languages.

mod vectors;

use std::path::PathBuf;

use anyhow::{Context, Result};
use beacon_proofs::ForkName;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vectors::VectorConfig;

#[derive(Parser, Debug)]
#[command(name = "generate-proof-vectors")]
#[command(about = "Generate SSZ Merkle proof vectors for Deneb, Electra and Fulu")]
struct Args {
    /// Output directory for vector files
    #[arg(short, long, env = "PROOF_VECTORS_DIR", default_value = "test-vectors")]
    output: PathBuf,

    /// Forks to generate (all when omitted)
    #[arg(long = "fork", value_delimiter = ',')]
    forks: Vec<ForkName>,

    /// Validators in the synthetic state
    #[arg(long, env = "PROOF_VECTORS_VALIDATORS", default_value = "16")]
    validators: u64,

    /// Withdrawals in the synthetic block's payload
    #[arg(long, default_value = "4")]
    withdrawals: usize,

    /// Historical summaries in the synthetic state
    #[arg(long, default_value = "4")]
    summaries: u64,
}

fn main() -> Result<()> {
    // Load environment from .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let forks = if args.forks.is_empty() {
        ForkName::ALL.to_vec()
    } else {
        args.forks.clone()
    };
    let config = VectorConfig {
        validators: args.validators,
        withdrawals: args.withdrawals,
        summaries: args.summaries,
    };

    tracing::info!(
        output = %args.output.display(),
        forks = forks.len(),
        validators = config.validators,
        "Generating proof vectors"
    );

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    for fork in forks {
        let vectors = vectors::generate(fork, config)
            .with_context(|| format!("generating {fork} vectors"))?;

        let path = args.output.join(format!("{fork}.json"));
        let json = serde_json::to_string_pretty(&vectors)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;

        tracing::info!(%fork, count = vectors.len(), path = %path.display(), "Wrote proof vectors");
    }

    Ok(())
}
