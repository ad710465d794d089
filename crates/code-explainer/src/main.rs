//! Explains code snippets and answers programming questions in the
//! terminal.

#[macro_use]
extern crate tracing;

use std::io::IsTerminal as _;
use std::process::ExitCode;

use anyhow::Context as _;
use code_explainer::{Config, Explainer, Repl};
use owo_colors::{OwoColorize, Stream};
use tokio::io;
use tracing::Instrument;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let label = "error:"
                .if_supports_color(Stream::Stderr, |text| text.bright_red());
            eprintln!("{label} {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("invalid configuration")?;
    debug!(?config, "loaded configuration");

    let explainer = Explainer::from_config(&config)
        .context("failed to open the conversation session")?;

    let stdin = io::BufReader::new(io::stdin());
    let mut repl = Repl::new(stdin, std::io::stdout())
        .with_spinner(std::io::stderr().is_terminal());
    repl.run(&explainer)
        .instrument(info_span!("Code Snippet Explainer"))
        .await?;
    Ok(())
}
