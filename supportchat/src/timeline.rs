use chrono::Utc;

use crate::message::{Message, MessageDraft, MessageId};

/// Append-only, except for the single loading placeholder.
#[derive(Debug, Default)]
pub struct Timeline {
    messages: Vec<Message>,
    next_id: u64,
    loading: Option<MessageId>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, draft: MessageDraft) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);

        self.messages.push(Message {
            id,
            kind: draft.kind,
            content: draft.content,
            timestamp: Utc::now(),
            status: draft.status,
        });

        id
    }

    /// Appends an empty company message marked as the loading placeholder,
    /// replacing any placeholder that is still showing.
    pub fn push_loading(&mut self) -> MessageId {
        self.remove_loading();
        let id = self.push(MessageDraft::company("", None));
        self.loading = Some(id);
        id
    }

    pub fn remove_loading(&mut self) -> bool {
        match self.loading.take() {
            Some(id) => {
                self.messages.retain(|m| m.id != id);
                true
            }
            None => false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
