use tracing::{debug, info};
use uuid::Uuid;

use crate::accumulator::{Reply, ResponseAccumulator};
use crate::conversation::Conversation;
use crate::events::{ChatMessage, TurnRole};
use crate::llm::CompletionEndpoint;

/// State owned by one UI session.
///
/// The conversation is created lazily by [`ChatSession::initialize`] and
/// lives until the session is dropped.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    system_prompt: String,
    conversation: Option<Conversation>,
}

impl ChatSession {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            system_prompt: system_prompt.into(),
            conversation: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Create the conversation with only the system directive. No-op when
    /// it already exists.
    pub fn initialize(&mut self) -> &mut Conversation {
        let id = self.id;
        let system_prompt = &self.system_prompt;
        self.conversation.get_or_insert_with(|| {
            info!(session = %id, "conversation started");
            Conversation::new(system_prompt.clone())
        })
    }

    pub fn append(&mut self, role: TurnRole, content: impl Into<String>) {
        self.initialize().append(role, content);
    }

    /// Full ordered sequence, empty before [`initialize`](Self::initialize)
    pub fn all(&self) -> &[ChatMessage] {
        self.conversation.as_ref().map(Conversation::all).unwrap_or(&[])
    }

    /// Messages to display, system directive hidden
    pub fn transcript(&self) -> &[ChatMessage] {
        self.conversation
            .as_ref()
            .map(Conversation::transcript)
            .unwrap_or(&[])
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// Record the user's text before a reply is requested
    pub fn begin_turn(&mut self, input: impl Into<String>) {
        let input = input.into();
        debug!(session = %self.id, len = input.len(), "user message");
        self.append(TurnRole::User, input);
    }

    /// Record the reply text as the assistant's turn
    pub fn finish_turn(&mut self, reply: &Reply) {
        if let Some(text) = reply.text() {
            self.append(TurnRole::Assistant, text);
        }
    }

    /// One full interaction: append the user text, wait for the reply,
    /// append it.
    ///
    /// When the accumulator is disabled nothing is appended and
    /// [`Reply::Unavailable`] is returned.
    pub async fn submit<E: CompletionEndpoint>(
        &mut self,
        input: impl Into<String>,
        accumulator: &ResponseAccumulator<E>,
    ) -> Reply {
        if !accumulator.is_available() {
            return Reply::Unavailable;
        }

        self.begin_turn(input);
        let reply = accumulator.respond(self.all()).await;
        self.finish_turn(&reply);
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::testing::ScriptedEndpoint;
    use crate::error::CompletionError;
    use crate::events::ConversationRole;
    use crate::llm::ChatCompletionChunk;
    use crate::prompts::{FALLBACK_REPLY, SYSTEM_MESSAGE};

    #[test]
    fn test_initialize_is_idempotent() {
        let mut session = ChatSession::new(SYSTEM_MESSAGE);
        assert!(session.all().is_empty());

        session.initialize();
        session.initialize();

        assert_eq!(session.all().len(), 1);
        assert_eq!(session.all()[0].role, ConversationRole::System);
        assert_eq!(session.all()[0].content, SYSTEM_MESSAGE);
    }

    #[test]
    fn test_initialize_does_not_reset_existing_conversation() {
        let mut session = ChatSession::new("sys");
        session.append(TurnRole::User, "hello");
        session.initialize();
        assert_eq!(session.all().len(), 2);
    }

    #[test]
    fn test_user_then_assistant_follow_system_message() {
        let mut session = ChatSession::new("sys");
        session.initialize();
        session.append(TurnRole::User, "question");
        session.append(TurnRole::Assistant, "answer");

        let all = session.all();
        assert_eq!(all.len(), 3);
        assert_eq!((all[1].role, all[1].content.as_str()), (ConversationRole::User, "question"));
        assert_eq!((all[2].role, all[2].content.as_str()), (ConversationRole::Assistant, "answer"));
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_n_submissions_grow_by_two_each() {
        let accumulator = ResponseAccumulator::new(ScriptedEndpoint::deltas(&["응", "!"]), "m");
        let mut session = ChatSession::new("sys");
        session.initialize();

        for n in 1..=4 {
            let reply = session.submit(format!("msg {}", n), &accumulator).await;
            assert_eq!(reply, Reply::Completed("응!".to_string()));
            assert_eq!(session.all().len(), 1 + 2 * n);
            assert_eq!(session.all()[0].role, ConversationRole::System);
        }
        assert_eq!(session.conversation().unwrap().turns(), 4);
    }

    #[tokio::test]
    async fn test_failed_call_appends_fallback() {
        let endpoint = ScriptedEndpoint::items(vec![
            Ok(ChatCompletionChunk::text("partial")),
            Err(CompletionError::Stream("boom".to_string())),
        ]);
        let accumulator = ResponseAccumulator::new(endpoint, "m");
        let mut session = ChatSession::new("sys");

        let reply = session.submit("hi", &accumulator).await;
        assert!(matches!(reply, Reply::Failed(_)));
        assert_eq!(session.all().len(), 3);
        assert_eq!(session.all()[2].content, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_unavailable_client_leaves_conversation_untouched() {
        let accumulator = ResponseAccumulator::<ScriptedEndpoint>::disabled("m");
        let mut session = ChatSession::new("sys");
        session.initialize();

        let reply = session.submit("hi", &accumulator).await;
        assert_eq!(reply, Reply::Unavailable);
        assert_eq!(session.all().len(), 1);
    }

    #[tokio::test]
    async fn test_request_includes_previous_turns() {
        let endpoint = ScriptedEndpoint::deltas(&["ok"]);
        let accumulator = ResponseAccumulator::new(endpoint.clone(), "m");
        let mut session = ChatSession::new("sys");

        session.submit("first", &accumulator).await;
        session.submit("second", &accumulator).await;

        let request = endpoint.last_request.lock().unwrap().clone().unwrap();
        let contents: Vec<_> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["sys", "first", "ok", "second"]);
    }
}
