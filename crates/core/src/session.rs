//! Durable conversation history.

mod memory;
mod sqlite;

use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;
use code_explainer_model::ModelMessage;
use serde::{Deserialize, Serialize};

use crate::error::Result;
pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Who produced a session item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person at the terminal.
    User,
    /// The agent that answered the turn.
    Assistant,
}

/// One `(role, content)` entry of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionItem {
    /// Who produced the item.
    pub role: Role,
    /// The text of the item.
    pub content: String,
}

impl SessionItem {
    /// Creates a user item.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant item.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Converts the item into a model message.
    #[inline]
    pub fn to_message(&self) -> ModelMessage {
        match self.role {
            Role::User => ModelMessage::User(self.content.clone()),
            Role::Assistant => ModelMessage::Assistant(self.content.clone()),
        }
    }
}

/// Storage that keeps the ordered items of many sessions.
///
/// Items of one session are returned in the order they were added.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the items of a session. With `limit`, only the latest
    /// `limit` items are returned, still oldest first.
    async fn get_items(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SessionItem>>;

    /// Appends items to a session, creating it if needed.
    async fn add_items(
        &self,
        session_id: &str,
        items: &[SessionItem],
    ) -> Result<()>;

    /// Removes and returns the latest item of a session.
    async fn pop_item(&self, session_id: &str) -> Result<Option<SessionItem>>;

    /// Removes every item of a session.
    async fn clear_session(&self, session_id: &str) -> Result<()>;
}

/// A handle to one conversation in a [`SessionStore`].
///
/// The handle is passed to every run so that follow-up turns see the
/// earlier ones. Clones refer to the same conversation.
#[derive(Clone)]
pub struct Session {
    id: String,
    store: Arc<dyn SessionStore>,
}

impl Session {
    /// Creates a handle for the session `id` in `store`.
    #[inline]
    pub fn new<S: Into<String>>(id: S, store: Arc<dyn SessionStore>) -> Self {
        Self {
            id: id.into(),
            store,
        }
    }

    /// Returns the session id.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns every item of this session.
    #[inline]
    pub async fn items(&self) -> Result<Vec<SessionItem>> {
        self.store.get_items(&self.id, None).await
    }

    /// Appends items to this session.
    #[inline]
    pub async fn add_items(&self, items: &[SessionItem]) -> Result<()> {
        self.store.add_items(&self.id, items).await
    }

    /// Removes and returns the latest item.
    #[inline]
    pub async fn pop_item(&self) -> Result<Option<SessionItem>> {
        self.store.pop_item(&self.id).await
    }

    /// Removes every item.
    #[inline]
    pub async fn clear(&self) -> Result<()> {
        self.store.clear_session(&self.id).await
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
