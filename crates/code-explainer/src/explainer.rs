use std::sync::Arc;

use code_explainer_core::session::{Session, SessionStore, SqliteSessionStore};
use code_explainer_core::{Agent, ModelClient, Result, RunOutcome, Runner};
use code_explainer_openai_model::OpenAIProvider;

use crate::config::{Config, RouterKind, SessionLocation};
use crate::roles::Agents;
use crate::routing::{HeuristicRouteClassifier, ModelRouteClassifier};

/// The assembled explainer: a runner, the triage agent and the session
/// every turn is added to.
pub struct Explainer {
    runner: Runner,
    triage: Arc<Agent>,
    session: Session,
}

impl Explainer {
    /// Assembles an explainer from its parts.
    #[inline]
    pub fn new(runner: Runner, agents: &Agents, session: Session) -> Self {
        Self {
            runner,
            triage: Arc::clone(&agents.triage),
            session,
        }
    }

    /// Connects to the model service and opens the session store
    /// described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client =
            ModelClient::new(OpenAIProvider::new(config.openai_config()));
        let runner = match config.router {
            RouterKind::Model => Runner::new(
                client,
                ModelRouteClassifier::new(config.models.triage.as_deref()),
            ),
            RouterKind::Heuristic => {
                Runner::new(client, HeuristicRouteClassifier)
            }
        };

        let store: Arc<dyn SessionStore> = match &config.session_location {
            SessionLocation::File(path) => {
                Arc::new(SqliteSessionStore::open(path)?)
            }
            SessionLocation::Memory => {
                Arc::new(SqliteSessionStore::open_in_memory()?)
            }
        };
        let session = Session::new(config.session_id.clone(), store);
        info!(
            session = session.id(),
            router = ?config.router,
            "explainer ready"
        );

        Ok(Self::new(runner, &Agents::build(&config.models), session))
    }

    /// Runs one turn of the triage agent on `input`.
    #[inline]
    pub async fn ask(&self, input: &str) -> Result<RunOutcome> {
        self.runner.run(&self.triage, input, &self.session).await
    }

    /// Returns the session turns are added to.
    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }
}
