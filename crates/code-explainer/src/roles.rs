//! The agents of the explainer and how they are wired together.

use std::sync::Arc;

use code_explainer_core::{Agent, AgentBuilder};

use crate::config::RoleModels;
use crate::guardrail::{GuardrailVerdict, ProgrammingGuardrail};

/// Instructions of the guardrail agent.
pub const GUARDRAIL_INSTRUCTIONS: &str = "Check if the user asks about \
    anything besides programming and explaining code snippets.";

/// Instructions of the code explainer agent.
pub const EXPLAINER_INSTRUCTIONS: &str = "You explain code snippets provided \
    to you thoroughly and concisely. You point out errors if there are any, \
    and give suggestions if needed.";

/// Instructions of the language detector agent.
pub const DETECTOR_INSTRUCTIONS: &str = "Your job is to tell the user in \
    which programming language is the received code written in.";

/// Instructions of the fallback programming agent.
pub const FALLBACK_INSTRUCTIONS: &str = "You answer questions about \
    programming concisely and thoroughly.";

/// Instructions of the triage agent.
pub const TRIAGE_INSTRUCTIONS: &str = "Your job is to provide the answer to \
    the proposed question related to programming using tools that are \
    provided to you. You will use the Code Explainer Agent to explain code \
    snippets sent to you, and then you will use the Language Detector Agent \
    to detect the programming language that the snippet is written in. You \
    answer only after using both tools. If the user asks anything else thats \
    not explaining code snippets, you will hand the convo off to Programming \
    Agent! You only answer to questions related to programming!";

/// Tool name of the code explainer.
pub const EXPLAINER_TOOL: &str = "code_explainer";
/// Tool name of the language detector.
pub const DETECTOR_TOOL: &str = "language_detector";

/// The five agents, built once at startup.
pub struct Agents {
    /// Classifies whether an input is about programming.
    pub guardrail: Arc<Agent>,
    /// Explains code snippets, used as a tool.
    pub explainer: Arc<Agent>,
    /// Names the language of a snippet, used as a tool.
    pub detector: Arc<Agent>,
    /// Answers programming questions without a snippet.
    pub fallback: Arc<Agent>,
    /// The entry agent of every turn.
    pub triage: Arc<Agent>,
}

impl Agents {
    /// Builds every agent with the given model overrides.
    pub fn build(models: &RoleModels) -> Self {
        let guardrail = AgentBuilder::with_name("Guardrail Agent")
            .with_instructions(GUARDRAIL_INSTRUCTIONS)
            .with_output_type::<GuardrailVerdict>();
        let guardrail = Arc::new(
            with_model(guardrail, models.guardrail.as_deref()).build(),
        );

        let explainer = AgentBuilder::with_name("Code Explainer Agent")
            .with_instructions(EXPLAINER_INSTRUCTIONS);
        let explainer = Arc::new(
            with_model(explainer, models.explainer.as_deref()).build(),
        );

        let detector = AgentBuilder::with_name("Language Detector")
            .with_instructions(DETECTOR_INSTRUCTIONS);
        let detector =
            Arc::new(with_model(detector, models.detector.as_deref()).build());

        let fallback = AgentBuilder::with_name("Programming Agent")
            .with_instructions(FALLBACK_INSTRUCTIONS);
        let fallback =
            Arc::new(with_model(fallback, models.fallback.as_deref()).build());

        // The explainer must stay registered before the detector.
        let triage = AgentBuilder::with_name("Triage Agent")
            .with_instructions(TRIAGE_INSTRUCTIONS)
            .with_tool(explainer.as_tool(EXPLAINER_TOOL, "explain code snippets"))
            .with_tool(detector.as_tool(
                DETECTOR_TOOL,
                "detect in what programming language the code snippet is in",
            ))
            .with_handoff(Arc::clone(&fallback))
            .with_input_guardrail(ProgrammingGuardrail::new(Arc::clone(
                &guardrail,
            )));
        let triage =
            Arc::new(with_model(triage, models.triage.as_deref()).build());

        Self {
            guardrail,
            explainer,
            detector,
            fallback,
            triage,
        }
    }
}

#[inline]
fn with_model(builder: AgentBuilder, model: Option<&str>) -> AgentBuilder {
    match model {
        Some(model) => builder.with_model(model),
        None => builder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiring() {
        let agents = Agents::build(&RoleModels {
            guardrail: Some("tiny-model".to_owned()),
            ..Default::default()
        });

        assert_eq!(agents.guardrail.model(), Some("tiny-model"));
        assert_eq!(agents.triage.model(), None);

        let tools: Vec<_> =
            agents.triage.tools().iter().map(|tool| tool.name()).collect();
        assert_eq!(tools, vec![EXPLAINER_TOOL, DETECTOR_TOOL]);

        let handoffs = agents.triage.handoffs();
        assert_eq!(handoffs.len(), 1);
        assert_eq!(handoffs[0].name(), "Programming Agent");

        assert_eq!(agents.triage.input_guardrails().len(), 1);
        assert!(agents.explainer.tools().is_empty());
        assert!(agents.fallback.input_guardrails().is_empty());
    }
}
