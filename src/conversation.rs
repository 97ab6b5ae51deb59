use crate::events::{ChatMessage, ConversationRole, TurnRole};

/// Ordered transcript of one chat session.
///
/// Index 0 always holds the system directive. Everything after it is
/// appended through [`Conversation::append`], which only accepts turn roles,
/// so the transcript can never gain a second system message or shrink.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::new(ConversationRole::System, system_prompt)],
        }
    }

    /// Append a message to the end of the transcript
    pub fn append(&mut self, role: TurnRole, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role.into(), content));
    }

    /// Full ordered sequence, system directive included
    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages shown to the user (system directive hidden)
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.messages[1..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        // the system directive is always present
        false
    }

    /// Number of completed user/assistant exchanges
    pub fn turns(&self) -> usize {
        self.transcript()
            .iter()
            .filter(|m| m.role == ConversationRole::Assistant)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_holds_only_system_message() {
        let conversation = Conversation::new("be nice");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.all()[0].role, ConversationRole::System);
        assert_eq!(conversation.all()[0].content, "be nice");
        assert!(conversation.transcript().is_empty());
    }

    #[test]
    fn test_append_keeps_order_after_system_message() {
        let mut conversation = Conversation::new("sys");
        conversation.append(TurnRole::User, "안녕");
        conversation.append(TurnRole::Assistant, "상윤아 내말을 들어봐! 안녕 😄");

        let all = conversation.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].role, ConversationRole::System);
        assert_eq!(all[1].role, ConversationRole::User);
        assert_eq!(all[1].content, "안녕");
        assert_eq!(all[2].role, ConversationRole::Assistant);
        assert_eq!(all[2].content, "상윤아 내말을 들어봐! 안녕 😄");
    }

    #[test]
    fn test_transcript_skips_system_message() {
        let mut conversation = Conversation::new("sys");
        conversation.append(TurnRole::User, "hi");

        let transcript = conversation.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].content, "hi");
    }

    #[test]
    fn test_turns_counts_assistant_replies() {
        let mut conversation = Conversation::new("sys");
        assert_eq!(conversation.turns(), 0);
        conversation.append(TurnRole::User, "a");
        assert_eq!(conversation.turns(), 0);
        conversation.append(TurnRole::Assistant, "b");
        conversation.append(TurnRole::User, "c");
        conversation.append(TurnRole::Assistant, "d");
        assert_eq!(conversation.turns(), 2);
    }

    #[test]
    fn test_serialized_messages_omit_timestamp() {
        let conversation = Conversation::new("sys");
        let json = serde_json::to_value(conversation.all()).unwrap();
        assert_eq!(json, serde_json::json!([{"role": "system", "content": "sys"}]));
    }
}
