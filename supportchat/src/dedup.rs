use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct QuestionDeduplicator {
    processed: HashSet<i64>,
}

impl QuestionDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_processed(&self, id: i64) -> bool {
        self.processed.contains(&id)
    }

    /// Returns `false` when `id` was already recorded.
    pub fn mark_processed(&mut self, id: i64) -> bool {
        self.processed.insert(id)
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}
