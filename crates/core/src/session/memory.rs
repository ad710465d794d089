use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{SessionItem, SessionStore};
use crate::error::{Error, Result};

/// A session store that lives only as long as the process.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Vec<SessionItem>>>,
}

impl MemorySessionStore {
    #[inline]
    fn with_sessions<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Vec<SessionItem>>) -> T,
    ) -> Result<T> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| Error::StorageTask("session map poisoned".to_owned()))?;
        Ok(f(&mut sessions))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_items(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SessionItem>> {
        self.with_sessions(|sessions| {
            let Some(items) = sessions.get(session_id) else {
                return vec![];
            };
            let skip = limit.map_or(0, |limit| items.len().saturating_sub(limit));
            items[skip..].to_vec()
        })
    }

    async fn add_items(
        &self,
        session_id: &str,
        items: &[SessionItem],
    ) -> Result<()> {
        self.with_sessions(|sessions| {
            sessions
                .entry(session_id.to_owned())
                .or_default()
                .extend_from_slice(items);
        })
    }

    async fn pop_item(&self, session_id: &str) -> Result<Option<SessionItem>> {
        self.with_sessions(|sessions| {
            sessions.get_mut(session_id).and_then(Vec::pop)
        })
    }

    async fn clear_session(&self, session_id: &str) -> Result<()> {
        self.with_sessions(|sessions| {
            sessions.remove(session_id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limit_keeps_latest() {
        let store = MemorySessionStore::default();
        let items = [
            SessionItem::user("one"),
            SessionItem::assistant("two"),
            SessionItem::user("three"),
        ];
        store.add_items("s", &items).await.unwrap();

        let latest = store.get_items("s", Some(2)).await.unwrap();
        assert_eq!(latest, items[1..].to_vec());
        assert_eq!(store.get_items("s", Some(10)).await.unwrap().len(), 3);
        assert!(store.get_items("other", None).await.unwrap().is_empty());

        assert_eq!(
            store.pop_item("s").await.unwrap(),
            Some(SessionItem::user("three"))
        );
        store.clear_session("s").await.unwrap();
        assert!(store.get_items("s", None).await.unwrap().is_empty());
    }
}
