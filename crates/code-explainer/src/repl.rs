//! The interactive loop on the terminal.

use std::io::{self, Write};
use std::time::Duration;

use code_explainer_core::RunOutcome;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::explainer::Explainer;

const BANNER: &str = "Code Snippet Explainer";
const CONTINUE_PROMPT: &str = "Exit or Continue?: ";
const TRIPWIRE_NOTICE: &str = "Guardrail tripwire triggered";
const TRIPWIRE_PROMPT: &str = "Exit: ";

/// Errors that end the loop.
#[derive(Debug, thiserror::Error)]
pub enum ReplError {
    /// Reading the input or writing the output failed.
    #[error("terminal i/o failed: {0}")]
    Io(#[from] io::Error),
    /// A turn failed.
    #[error(transparent)]
    Turn(#[from] code_explainer_core::Error),
}

/// What the loop does after a turn.
enum Flow {
    /// The answer was printed.
    Answered,
    /// The turn tripped and the user chose to go on with a new input.
    Restart,
    /// The user chose to leave after a trip.
    Exit,
}

/// The request/response loop over a line reader and an output.
pub struct Repl<R, W> {
    input: R,
    output: W,
    spinner: bool,
}

impl<R, W> Repl<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// Creates a loop reading lines from `input` and printing to `output`.
    #[inline]
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            spinner: false,
        }
    }

    /// Shows a spinner on stderr while a turn is in flight.
    #[inline]
    pub fn with_spinner(mut self, spinner: bool) -> Self {
        self.spinner = spinner;
        self
    }

    /// Returns the output.
    #[inline]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs until `exit` is entered at an exit prompt or the input ends.
    pub async fn run(
        &mut self,
        explainer: &Explainer,
    ) -> Result<(), ReplError> {
        writeln!(self.output, "{BANNER}")?;
        writeln!(self.output)?;

        loop {
            let Some(snippet) = self.prompt("").await? else {
                break;
            };
            writeln!(self.output)?;
            match self.turn(explainer, &snippet).await? {
                Flow::Answered => {}
                Flow::Restart => continue,
                Flow::Exit => break,
            }

            let Some(reply) = self.prompt(CONTINUE_PROMPT).await? else {
                break;
            };
            writeln!(self.output)?;
            if is_exit(&reply) {
                break;
            }
            if let Flow::Exit = self.turn(explainer, &reply).await? {
                break;
            }
        }

        debug!("interaction loop finished");
        Ok(())
    }

    /// Runs one turn and prints its answer. A tripped turn is answered with
    /// the tripwire prompt instead.
    async fn turn(
        &mut self,
        explainer: &Explainer,
        input: &str,
    ) -> Result<Flow, ReplError> {
        let spinner = self.spinner.then(start_spinner);
        let outcome = explainer.ask(input).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        match outcome? {
            RunOutcome::Completed(result) => {
                writeln!(self.output, "{}", result.final_output)?;
                writeln!(self.output)?;
                Ok(Flow::Answered)
            }
            RunOutcome::Tripped(tripped) => {
                debug!(guardrail = %tripped.guardrail, "turn tripped");
                writeln!(self.output, "{TRIPWIRE_NOTICE}")?;
                match self.prompt(TRIPWIRE_PROMPT).await? {
                    Some(reply) if !is_exit(&reply) => Ok(Flow::Restart),
                    _ => Ok(Flow::Exit),
                }
            }
        }
    }

    /// Prints `prompt` and reads one line without its terminator. Returns
    /// `None` at the end of the input.
    async fn prompt(
        &mut self,
        prompt: &str,
    ) -> Result<Option<String>, ReplError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

#[inline]
fn is_exit(reply: &str) -> bool {
    reply.eq_ignore_ascii_case("exit")
}

fn start_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {wide_msg}") {
        spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
