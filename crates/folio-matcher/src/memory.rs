//! Topics already covered in the current conversation.

/// Topic keys discussed so far, in first-seen order.
///
/// Owned by one matcher; a new chat starts with a fresh memory.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    discussed: Vec<String>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `topic`. Returns true when it had already been discussed.
    pub fn recall(&mut self, topic: &str) -> bool {
        if self.contains(topic) {
            return true;
        }
        self.discussed.push(topic.to_string());
        false
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.discussed.iter().any(|t| t == topic)
    }

    pub fn topics(&self) -> &[String] {
        &self.discussed
    }

    pub fn len(&self) -> usize {
        self.discussed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discussed.is_empty()
    }

    pub fn clear(&mut self) {
        self.discussed.clear();
    }
}
