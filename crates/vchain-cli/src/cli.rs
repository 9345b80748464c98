use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vchain",
    about = "Virtual chain: a block log anchored on a ledger, bodies in a content store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON file holding the in-memory ledger, content store and queue.
    #[arg(long, global = true, default_value = "vchain-sandbox.json")]
    pub sandbox: PathBuf,

    /// Chain account; overrides the configured one.
    #[arg(long, global = true)]
    pub account: Option<String>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the content address of a file's bytes
    Address(AddressArgs),
    /// Print the hex anchor memo for a content address
    Memo(MemoArgs),
    /// Generate a signing key and print its account
    Keygen,
    /// List the chain's anchor transactions
    Anchors,
    /// Print the assembled chain as JSON
    Assemble,
    /// Assemble the chain and check its continuity
    Verify,
    /// Build the next block from queued operations
    Build(BuildArgs),
    /// Queue an operation for the next block
    Enqueue(EnqueueArgs),
}

#[derive(Args)]
pub struct AddressArgs {
    pub path: PathBuf,
}

#[derive(Args)]
pub struct MemoArgs {
    pub address: String,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Hex-encoded ed25519 secret key of the chain account.
    #[arg(long)]
    pub secret: String,
    /// Prepare the block without publishing or anchoring it.
    #[arg(long)]
    pub dry_run: bool,
    /// Also write the serialized block into this directory.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct EnqueueArgs {
    #[arg(long)]
    pub op_code: String,
    #[arg(long)]
    pub creator: String,
    /// Operation payload as a JSON object.
    #[arg(long, default_value = "{}")]
    pub data: String,
}
