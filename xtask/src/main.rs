//! Automation for the poolwatch workspace.
//!
//! Run with `cargo xtask <command>`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

/// Library crates checked individually with default features.
const LIBRARY_CRATES: [&str; 3] = ["poolwatch-config", "poolwatch-intercept", "poolwatch-testing"];

#[derive(Parser)]
#[command(name = "xtask", about = "Checks and fuzzing for the poolwatch crates")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Formatting, clippy and the full test matrix
    Ci,
    /// Verify rustfmt output is up to date
    Fmt,
    /// Deny clippy warnings in every crate and target
    Clippy,
    /// Test with the serde feature on, then each library crate without it
    Test,
    /// Build API docs for the library crates
    Doc,
    /// Fuzz the connection overrides parser
    Fuzz {
        /// Time budget in seconds
        #[arg(default_value_t = 60)]
        seconds: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;
    sh.change_dir(workspace_root()?);

    match cli.command {
        Command::Ci => {
            fmt(&sh)?;
            clippy(&sh)?;
            test(&sh)?;
            println!("poolwatch CI passed");
        }
        Command::Fmt => fmt(&sh)?,
        Command::Clippy => clippy(&sh)?,
        Command::Test => test(&sh)?,
        Command::Doc => doc(&sh)?,
        Command::Fuzz { seconds } => fuzz(&sh, seconds)?,
    }

    Ok(())
}

/// xtask lives one level below the workspace root.
fn workspace_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask manifest has no parent directory")
}

fn fmt(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo fmt --all -- --check").run()?;
    Ok(())
}

fn clippy(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo clippy --workspace --all-features --all-targets -- -D warnings").run()?;
    Ok(())
}

fn test(sh: &Shell) -> Result<()> {
    cmd!(sh, "cargo test --workspace --all-features").run()?;
    for krate in LIBRARY_CRATES {
        cmd!(sh, "cargo test -p {krate}").run()?;
    }
    Ok(())
}

fn doc(sh: &Shell) -> Result<()> {
    let packages: Vec<String> = LIBRARY_CRATES.iter().map(|krate| format!("-p={krate}")).collect();
    cmd!(sh, "cargo doc --no-deps --all-features {packages...}").run()?;
    Ok(())
}

fn fuzz(sh: &Shell, seconds: u64) -> Result<()> {
    let budget = format!("-max_total_time={seconds}");
    let _dir = sh.push_dir("fuzz");
    cmd!(sh, "cargo +nightly fuzz run parse_overrides -- {budget}").run()?;
    Ok(())
}
