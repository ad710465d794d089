//! Route classifiers for the triage agent.
//!
//! Inputs containing a code snippet are explained with the tools, anything
//! else is handed off to the programming agent.

use async_trait::async_trait;
use code_explainer_core::router::{Route, RouteClassifier};
use code_explainer_core::{Agent, AgentBuilder, ModelClient, Result};
use code_explainer_model::ModelMessage;
use schemars::JsonSchema;
use serde::Deserialize;

/// Instructions of the model router.
pub const ROUTER_INSTRUCTIONS: &str = "Decide whether the latest user message \
    contains a code snippet that should be explained. Questions about \
    programming without any code do not count as snippets.";

/// Leading tokens of a line that almost always start code. Matched case
/// sensitively, since prose lines start with a capital letter.
const CODE_LINE_PREFIXES: &[&str] = &[
    "def ", "fn ", "pub fn ", "async fn ", "function ", "class ", "struct ",
    "impl ", "#include", "import ", "package ", "func ", "public class ",
    "int main", "SELECT ", "<?php", "#!/", "console.log", "println!",
    "printf(", "print(",
];

/// Leading keywords shared with prose. They only count when the rest of the
/// line carries one of [`STATEMENT_SYMBOLS`].
const STATEMENT_PREFIXES: &[&str] = &[
    "let ", "const ", "var ", "for ", "while ", "return ", "echo ", "if ",
];

const STATEMENT_SYMBOLS: &str = "=;:{}()$|";

/// Characters that are rare in prose and common in code.
const CODE_SYMBOLS: &str = "{}[]();=<>";

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct RouteDecision {
    contains_code_snippet: bool,
}

/// Asks the model whether the input contains a code snippet.
pub struct ModelRouteClassifier {
    agent: Agent,
}

impl ModelRouteClassifier {
    /// Creates a classifier sampling from `model`, or the provider default.
    pub fn new(model: Option<&str>) -> Self {
        let mut builder = AgentBuilder::with_name("Router")
            .with_instructions(ROUTER_INSTRUCTIONS)
            .with_output_type::<RouteDecision>();
        if let Some(model) = model {
            builder = builder.with_model(model);
        }
        Self {
            agent: builder.build(),
        }
    }
}

#[async_trait]
impl RouteClassifier for ModelRouteClassifier {
    async fn classify(
        &self,
        client: &ModelClient,
        context: &[ModelMessage],
    ) -> Result<Route> {
        let decision: RouteDecision =
            self.agent.respond_as(client, context).await?;
        debug!(?decision, "route decision");
        Ok(snippet_route(decision.contains_code_snippet))
    }
}

/// Detects code snippets locally, without a model call.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicRouteClassifier;

#[async_trait]
impl RouteClassifier for HeuristicRouteClassifier {
    async fn classify(
        &self,
        _client: &ModelClient,
        context: &[ModelMessage],
    ) -> Result<Route> {
        let input = context.last().map(ModelMessage::content).unwrap_or("");
        Ok(snippet_route(looks_like_code(input)))
    }
}

#[inline]
fn snippet_route(contains_code_snippet: bool) -> Route {
    if contains_code_snippet {
        Route::Explain
    } else {
        Route::Handoff
    }
}

/// Returns whether `input` most likely contains source code.
pub fn looks_like_code(input: &str) -> bool {
    if input.contains("```") {
        return true;
    }

    if input.lines().map(str::trim_start).any(is_code_line) {
        return true;
    }
    if input.contains('=') && input.contains(';') {
        return true;
    }

    let (mut visible, mut symbols) = (0usize, 0usize);
    for ch in input.chars().filter(|ch| !ch.is_whitespace()) {
        visible += 1;
        if CODE_SYMBOLS.contains(ch) {
            symbols += 1;
        }
    }
    symbols >= 4 && symbols * 8 >= visible
}

fn is_code_line(line: &str) -> bool {
    if CODE_LINE_PREFIXES
        .iter()
        .any(|prefix| line.starts_with(prefix))
    {
        return true;
    }
    let statement = STATEMENT_PREFIXES.iter().any(|prefix| {
        line.strip_prefix(prefix).is_some_and(|rest| {
            rest.contains(|ch| STATEMENT_SYMBOLS.contains(ch))
        })
    });
    statement || is_assignment(line)
}

/// `name = value`, where the name is a plain or dotted identifier and the
/// operator is not `==`.
fn is_assignment(line: &str) -> bool {
    let Some((target, value)) = line.split_once('=') else {
        return false;
    };
    let target = target.trim_end();
    let starts_ident = target
        .chars()
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    starts_ident
        && target
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.'))
        && !value.starts_with('=')
        && !value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use code_explainer_test_model::TestModelProvider;

    use super::*;

    #[test]
    fn test_looks_like_code() {
        assert!(looks_like_code("def f(x): return x+1"));
        assert!(looks_like_code("```\nx = 1\n```"));
        assert!(looks_like_code("Why does this fail?\n  fn main() {}"));
        assert!(looks_like_code("int add(int a, int b) { return a + b; }"));
        assert!(looks_like_code("#include <stdio.h>"));
        assert!(looks_like_code("let x = 5;"));
        assert!(looks_like_code("const total = a + b;"));
        assert!(looks_like_code("var n = 10;"));
        assert!(looks_like_code("x = [i * 2 for i in nums]"));
        assert!(looks_like_code("result.value = compute(a)"));
        assert!(looks_like_code("echo $HOME | wc -c"));
        assert!(looks_like_code("for i in range(3): print(i)"));
        assert!(looks_like_code("while (n > 0) n--;"));
        assert!(looks_like_code("return a + b;"));
        assert!(looks_like_code("int y = 3;"));

        assert!(!looks_like_code("How do I reverse a list in Python?"));
        assert!(!looks_like_code(
            "What is the difference between a class and a struct?"
        ));
        assert!(!looks_like_code("Select the fastest sorting algorithm."));
        assert!(!looks_like_code("Explain closures (briefly)."));
        assert!(!looks_like_code("let me know how closures work"));
        assert!(!looks_like_code("for loops in Rust?"));
        assert!(!looks_like_code("while learning Rust, I got stuck"));
        assert!(!looks_like_code("What does x = 5 mean in math?"));
        assert!(!looks_like_code(""));
    }

    #[tokio::test]
    async fn test_heuristic_uses_latest_input() {
        let client = ModelClient::new(TestModelProvider::default());
        let context = [
            ModelMessage::User("def f(x): return x+1".to_owned()),
            ModelMessage::Assistant("It adds one.".to_owned()),
            ModelMessage::User("What is recursion?".to_owned()),
        ];
        let route = HeuristicRouteClassifier
            .classify(&client, &context)
            .await
            .unwrap();
        assert_eq!(route, Route::Handoff);
        let route = HeuristicRouteClassifier
            .classify(&client, &context[..1])
            .await
            .unwrap();
        assert_eq!(route, Route::Explain);
    }

    #[tokio::test]
    async fn test_model_decision() {
        let mut provider = TestModelProvider::default();
        provider.respond_text(
            ROUTER_INSTRUCTIONS,
            "{\"contains_code_snippet\": true}",
        );
        let log = provider.log();
        let client = ModelClient::new(provider);

        let route = ModelRouteClassifier::new(Some("small-model"))
            .classify(&client, &[ModelMessage::User("x = 1".to_owned())])
            .await
            .unwrap();
        assert_eq!(route, Route::Explain);
        assert_eq!(log.requests()[0].model.as_deref(), Some("small-model"));
    }
}
