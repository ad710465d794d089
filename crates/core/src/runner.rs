
use std::fmt::Write as _;
use std::sync::Arc;

use code_explainer_model::ModelMessage;
use serde_json::Value;
use tracing::Instrument;

use crate::agent::Agent;
use crate::error::Result;
use crate::model_client::ModelClient;
use crate::router::{Route, RouteClassifier};
use crate::session::{Session, SessionItem};

/// The output one tool produced during a turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutput {
    /// Name of the tool.
    pub tool: String,
    /// What the tool returned.
    pub output: String,
}

/// A turn that went all the way through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnResult {
    /// The answer for the user.
    pub final_output: String,
    /// Name of the agent that produced the answer.
    pub last_agent: String,
    /// The route the turn actually took.
    pub route: Route,
    /// Outputs of the tools invoked in this turn, in invocation order.
    ///
    /// These are never written to the session.
    pub tool_outputs: Vec<ToolOutput>,
}

/// A turn aborted by an input guardrail.
#[derive(Clone, Debug, PartialEq)]
pub struct GuardrailTripped {
    /// Name of the guardrail that triggered.
    pub guardrail: String,
    /// What the guardrail produced to reach its decision.
    pub output_info: Value,
}

/// How a turn ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    /// The turn produced an answer, which has been added to the session.
    Completed(TurnResult),
    /// A guardrail aborted the turn. Nothing was added to the session and
    /// no tool or hand-off ran.
    Tripped(GuardrailTripped),
}

impl RunOutcome {
    /// Returns the answer of a completed turn.
    #[inline]
    pub fn final_output(&self) -> Option<&str> {
        match self {
            RunOutcome::Completed(result) => Some(&result.final_output),
            RunOutcome::Tripped(_) => None,
        }
    }
}

#[derive(Debug)]
enum TurnStage {
    Guarded,
    Route,
    Explain,
    Handoff,
    Direct,
    Done {
        last_agent: String,
        final_output: String,
    },
    Aborted(GuardrailTripped),
}

impl TurnStage {
    fn label(&self) -> &'static str {
        match self {
            TurnStage::Guarded => "guarded",
            TurnStage::Route => "route",
            TurnStage::Explain => "explain",
            TurnStage::Handoff => "handoff",
            TurnStage::Direct => "direct",
            TurnStage::Done { .. } => "done",
            TurnStage::Aborted(_) => "aborted",
        }
    }
}

/// The mutable part of a turn while it moves through its stages.
struct Turn<'a> {
    agent: &'a Agent,
    input: &'a str,
    /// Session history followed by the current input.
    context: Vec<ModelMessage>,
    route: Route,
    tool_outputs: Vec<ToolOutput>,
}

/// Drives one agent through a turn.
///
/// A turn first checks every input guardrail of the agent, then routes the
/// input: to the agent's tools followed by a synthesis answer, to the
/// agent's first hand-off target, or to the agent itself. Tools always run
/// one after another in the order they were registered.
pub struct Runner {
    client: ModelClient,
    router: Arc<dyn RouteClassifier>,
}

impl Runner {
    /// Creates a runner that samples from `client` and asks `router` which
    /// path a turn takes.
    #[inline]
    pub fn new<R: RouteClassifier + 'static>(
        client: ModelClient,
        router: R,
    ) -> Self {
        Self {
            client,
            router: Arc::new(router),
        }
    }

    /// Runs `agent` on `input` within `session`.
    ///
    /// On completion, the input and the answer are appended to the session.
    /// Model and storage errors abort the turn without touching the session.
    pub async fn run(
        &self,
        agent: &Agent,
        input: &str,
        session: &Session,
    ) -> Result<RunOutcome> {
        self.run_turn(agent, input, session)
            .instrument(info_span!("turn", agent = %agent.name()))
            .await
    }

    async fn run_turn(
        &self,
        agent: &Agent,
        input: &str,
        session: &Session,
    ) -> Result<RunOutcome> {
        let mut context: Vec<_> = session
            .items()
            .await?
            .iter()
            .map(SessionItem::to_message)
            .collect();
        context.push(ModelMessage::User(input.to_owned()));
        trace!("turn context has {} messages", context.len());

        let mut turn = Turn {
            agent,
            input,
            context,
            route: Route::Direct,
            tool_outputs: vec![],
        };

        let mut stage = TurnStage::Guarded;
        loop {
            let next = match stage {
                TurnStage::Guarded => self.check_guardrails(&turn).await?,
                TurnStage::Route => self.route(&mut turn).await?,
                TurnStage::Explain => self.explain(&mut turn).await?,
                TurnStage::Handoff => self.hand_off(&turn).await?,
                TurnStage::Direct => self.answer_directly(&turn).await?,
                TurnStage::Done {
                    last_agent,
                    final_output,
                } => {
                    session
                        .add_items(&[
                            SessionItem::user(turn.input),
                            SessionItem::assistant(final_output.clone()),
                        ])
                        .await?;
                    return Ok(RunOutcome::Completed(TurnResult {
                        final_output,
                        last_agent,
                        route: turn.route,
                        tool_outputs: turn.tool_outputs,
                    }));
                }
                TurnStage::Aborted(tripped) => {
                    return Ok(RunOutcome::Tripped(tripped));
                }
            };
            debug!(from = stage.label(), to = next.label(), "turn stage changed");
            stage = next;
        }
    }

    async fn check_guardrails(&self, turn: &Turn<'_>) -> Result<TurnStage> {
        for guardrail in turn.agent.input_guardrails() {
            let outcome = guardrail.check(&self.client, &turn.context).await?;
            if outcome.tripwire_triggered {
                info!(guardrail = guardrail.name(), "guardrail tripwire triggered");
                return Ok(TurnStage::Aborted(GuardrailTripped {
                    guardrail: guardrail.name().to_owned(),
                    output_info: outcome.output_info,
                }));
            }
        }
        Ok(TurnStage::Route)
    }

    async fn route(&self, turn: &mut Turn<'_>) -> Result<TurnStage> {
        let agent = turn.agent;
        if agent.tools().is_empty() && agent.handoffs().is_empty() {
            turn.route = Route::Direct;
            return Ok(TurnStage::Direct);
        }

        let route = match self.router.classify(&self.client, &turn.context).await? {
            Route::Explain if agent.tools().is_empty() => Route::Direct,
            Route::Handoff if agent.handoffs().is_empty() => Route::Direct,
            route => route,
        };
        turn.route = route;
        Ok(match route {
            Route::Explain => TurnStage::Explain,
            Route::Handoff => TurnStage::Handoff,
            Route::Direct => TurnStage::Direct,
        })
    }

    async fn explain(&self, turn: &mut Turn<'_>) -> Result<TurnStage> {
        for tool in turn.agent.tools() {
            debug!(tool = tool.name(), "invoking tool");
            let output = tool.call(&self.client, turn.input).await?;
            turn.tool_outputs.push(ToolOutput {
                tool: tool.name().to_owned(),
                output,
            });
        }

        let mut context = turn.context.clone();
        context.push(ModelMessage::System(tool_report(&turn.tool_outputs)));
        let final_output = turn.agent.respond(&self.client, &context).await?;
        Ok(TurnStage::Done {
            last_agent: turn.agent.name().to_owned(),
            final_output,
        })
    }

    async fn hand_off(&self, turn: &Turn<'_>) -> Result<TurnStage> {
        // `route` only picks this stage when a hand-off target exists.
        let Some(target) = turn.agent.handoffs().first() else {
            return Ok(TurnStage::Direct);
        };
        debug!(target = target.name(), "handing off");
        let final_output = target.respond(&self.client, &turn.context).await?;
        Ok(TurnStage::Done {
            last_agent: target.name().to_owned(),
            final_output,
        })
    }

    async fn answer_directly(&self, turn: &Turn<'_>) -> Result<TurnStage> {
        let final_output = turn.agent.respond(&self.client, &turn.context).await?;
        Ok(TurnStage::Done {
            last_agent: turn.agent.name().to_owned(),
            final_output,
        })
    }
}

/// Renders the tool outputs as the system message for the synthesis call.
fn tool_report(outputs: &[ToolOutput]) -> String {
    let mut report = String::from(
        "The tools produced the following outputs for the latest user \
         message. Combine them into one answer.",
    );
    for ToolOutput { tool, output } in outputs {
        let _ = write!(report, "\n\n[{tool}]\n{output}");
    }
    report
}
