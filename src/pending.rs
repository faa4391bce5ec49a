use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use teloxide::types::{FileId, MessageEntity};
use tokio::sync::Mutex;

/// What the user submitted, by kind. Media is held as the Telegram file id —
/// the bot never downloads the bytes, it re-sends the handle.
#[derive(Debug, Clone)]
pub enum PendingContent {
    Text,
    Photo { file_id: FileId },
    Video { file_id: FileId },
}

impl PendingContent {
    pub fn kind(&self) -> &'static str {
        match self {
            PendingContent::Text => "text",
            PendingContent::Photo { .. } => "photo",
            PendingContent::Video { .. } => "video",
        }
    }
}

/// One user's not-yet-confirmed submission.
#[derive(Debug, Clone)]
pub struct PendingItem {
    pub content: PendingContent,
    /// Display text for text messages, caption for media. Already translated.
    pub text: String,
    /// Formatting spans valid for `text`.
    pub entities: Vec<MessageEntity>,
    pub created_at: DateTime<Utc>,
}

impl PendingItem {
    pub fn new(content: PendingContent, text: String, entities: Vec<MessageEntity>) -> Self {
        Self {
            content,
            text,
            entities,
            created_at: Utc::now(),
        }
    }
}

/// Single-slot holding area, one pending item per user.
///
/// Every operation locks the whole map, so the handler path and the periodic
/// sweep never observe a half-updated slot. Last write wins on `put`.
pub struct PendingStore {
    ttl: Duration,
    slots: Mutex<HashMap<u64, PendingItem>>,
}

impl PendingStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs as i64),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Store `item` for `user_id`, replacing any previous submission.
    pub async fn put(&self, user_id: u64, item: PendingItem) {
        let mut slots = self.slots.lock().await;
        slots.insert(user_id, item);
    }

    pub async fn get(&self, user_id: u64) -> Option<PendingItem> {
        let slots = self.slots.lock().await;
        slots.get(&user_id).cloned()
    }

    /// Remove-and-return. Confirmation claims the item through this so a
    /// concurrent sweep cannot drop it between the yes-reply and the send.
    pub async fn take(&self, user_id: u64) -> Option<PendingItem> {
        let mut slots = self.slots.lock().await;
        slots.remove(&user_id)
    }

    #[allow(dead_code)]
    pub async fn remove(&self, user_id: u64) {
        let mut slots = self.slots.lock().await;
        slots.remove(&user_id);
    }

    /// Drop every item older than the TTL. Returns how many were dropped.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|_, item| now - item.created_at < self.ttl);
        before - slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_item(text: &str) -> PendingItem {
        PendingItem::new(PendingContent::Text, text.to_string(), Vec::new())
    }

    #[tokio::test]
    async fn put_overwrites_previous_slot() {
        let store = PendingStore::new(120);

        store.put(7, text_item("first")).await;
        store.put(7, text_item("second")).await;

        let item = store.get(7).await.unwrap();
        assert_eq!(item.text, "second");
    }

    #[tokio::test]
    async fn take_empties_the_slot() {
        let store = PendingStore::new(120);

        store.put(7, text_item("hello")).await;
        assert!(store.take(7).await.is_some());
        assert!(store.take(7).await.is_none());
        assert!(store.get(7).await.is_none());
    }

    #[tokio::test]
    async fn sweep_drops_only_expired_items() {
        let store = PendingStore::new(120);

        let mut old = text_item("old");
        old.created_at = Utc::now() - Duration::seconds(300);
        store.put(1, old).await;
        store.put(2, text_item("fresh")).await;

        let dropped = store.sweep(Utc::now()).await;

        assert_eq!(dropped, 1);
        assert!(store.get(1).await.is_none());
        assert!(store.get(2).await.is_some());
    }

    #[tokio::test]
    async fn sweep_at_exact_ttl_boundary_drops() {
        let store = PendingStore::new(120);

        let mut item = text_item("boundary");
        let now = Utc::now();
        item.created_at = now - Duration::seconds(120);
        store.put(1, item).await;

        assert_eq!(store.sweep(now).await, 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = PendingStore::new(120);

        store.put(9, text_item("bye")).await;
        store.remove(9).await;
        store.remove(9).await;
        assert!(store.get(9).await.is_none());
    }
}
