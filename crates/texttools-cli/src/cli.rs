use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use texttools_submit::Operation;

#[derive(Parser, Debug)]
#[command(name = "texttools", version, about = "Send text-tool requests to a rollups InputBox")]
pub struct Cli {
    /// TOML config file (network and contract addresses)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint of the node, overrides the config
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the hex payload for an operation and text
    Encode(PayloadArgs),
    /// Decode a hex payload back into operation and text
    Decode {
        payload: String,
    },
    /// List wallet connectors offered by the node
    Connectors,
    /// Connect, submit one input to the InputBox, disconnect
    Submit(SubmitArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PayloadArgs {
    /// One of: stats, shout, palindrome
    #[arg(long, default_value = "stats", value_parser = parse_operation)]
    pub op: Operation,

    #[arg(long, default_value = "Cartesi top!")]
    pub text: String,
}

#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,

    /// dApp (target) contract address
    #[arg(long)]
    pub dapp: Option<String>,

    /// InputBox (queue) contract address
    #[arg(long)]
    pub input_box: Option<String>,
}

fn parse_operation(s: &str) -> Result<Operation, String> {
    s.parse().map_err(|e: texttools_types::TextToolsError| {
        let names: Vec<&str> = Operation::ALL.iter().map(|op| op.as_str()).collect();
        format!("{e} (expected one of: {})", names.join(", "))
    })
}
