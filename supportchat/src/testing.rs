//! Scripted [`SupportApi`] and fixtures for orchestrator tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use shared::{
    Answer, AnswerOption, AnswerType, ChatSetting, Conversation, ConversationState, Question,
    RagResult, RatingType, SupportApi, TransportError,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Create(String),
    Get(String),
    Reply(String, String),
    Rate(String, RatingType),
    Track(String, String),
}

#[derive(Default)]
struct Script {
    creates: VecDeque<Result<Conversation, TransportError>>,
    replies: VecDeque<Result<Conversation, TransportError>>,
    get_failures: VecDeque<TransportError>,
    get_delay: Option<Duration>,
    served: Option<Conversation>,
    rating_failure: Option<TransportError>,
    calls: Vec<Call>,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    script: Mutex<Script>,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on_create(&self, result: Result<Conversation, TransportError>) {
        self.script.lock().unwrap().creates.push_back(result);
    }

    pub(crate) fn on_reply(&self, result: Result<Conversation, TransportError>) {
        self.script.lock().unwrap().replies.push_back(result);
    }

    /// The snapshot every subsequent fetch returns.
    pub(crate) fn serve(&self, conversation: Conversation) {
        self.script.lock().unwrap().served = Some(conversation);
    }

    pub(crate) fn fail_next_get(&self, error: TransportError) {
        self.script.lock().unwrap().get_failures.push_back(error);
    }

    /// Every fetch takes `delay` of (virtual) time before answering.
    pub(crate) fn delay_gets(&self, delay: Duration) {
        self.script.lock().unwrap().get_delay = Some(delay);
    }

    pub(crate) fn fail_ratings(&self, error: TransportError) {
        self.script.lock().unwrap().rating_failure = Some(error);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub(crate) fn gets(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Get(_)))
            .count()
    }

    pub(crate) fn fetched_tokens(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Get(token) => Some(token),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn ratings(&self) -> Vec<(String, RatingType)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Rate(token, rating) => Some((token, rating)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SupportApi for FakeApi {
    async fn create_conversation(&self, content: &str) -> Result<Conversation, TransportError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Create(content.to_string()));
        script
            .creates
            .pop_front()
            .unwrap_or(Err(TransportError::Status(500)))
    }

    async fn get_conversation(&self, token: &str) -> Result<Conversation, TransportError> {
        let delay = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Get(token.to_string()));
            script.get_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut script = self.script.lock().unwrap();
        if let Some(error) = script.get_failures.pop_front() {
            return Err(error);
        }
        script.served.clone().ok_or(TransportError::Status(404))
    }

    async fn reply_to_conversation(
        &self,
        token: &str,
        content: &str,
    ) -> Result<Conversation, TransportError> {
        let mut script = self.script.lock().unwrap();
        script
            .calls
            .push(Call::Reply(token.to_string(), content.to_string()));
        script
            .replies
            .pop_front()
            .unwrap_or(Err(TransportError::Status(500)))
    }

    async fn rate_conversation(
        &self,
        token: &str,
        rating: RatingType,
    ) -> Result<Conversation, TransportError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Rate(token.to_string(), rating));
        if let Some(error) = script.rating_failure.clone() {
            return Err(error);
        }
        let mut conversation = script
            .served
            .clone()
            .unwrap_or_else(|| conversation(token, ConversationState::Top1, vec![]));
        conversation.rating_type_id = rating;
        Ok(conversation)
    }

    async fn track_url_access(&self, token: &str, url: &str) -> Result<(), TransportError> {
        let mut script = self.script.lock().unwrap();
        script
            .calls
            .push(Call::Track(token.to_string(), url.to_string()));
        Ok(())
    }
}

pub(crate) fn setting() -> ChatSetting {
    ChatSetting {
        welcome_message: "Welcome! How can we help?".into(),
        matched_message: "We hope this answered your question.".into(),
        unmatched_message: "Sorry, we could not find an answer.".into(),
        monthly_limit_message: "The monthly chat limit has been reached.".into(),
        monthly_limit_url: None,
        chat_available: true,
        monthly_limit_exceeded: false,
        header_label: None,
    }
}

pub(crate) fn conversation(
    token: &str,
    state: ConversationState,
    questions: Vec<Question>,
) -> Conversation {
    Conversation {
        token: token.to_string(),
        cid: format!("CID-{token}"),
        state,
        rating_type_id: RatingType::None,
        questions,
        contact_page_url: None,
    }
}

pub(crate) fn pending(id: i64, content: &str) -> Question {
    Question {
        id,
        content: content.to_string(),
        answer: None,
        rag_results: vec![],
    }
}

pub(crate) fn answered(
    id: i64,
    content: &str,
    answer_type: AnswerType,
    rag_results: Vec<RagResult>,
) -> Question {
    Question {
        id,
        content: content.to_string(),
        answer: Some(Answer {
            id: Some(id * 10),
            content: format!("answer to {content}"),
            answer_type,
            options: vec![],
            rag_results: vec![],
        }),
        rag_results,
    }
}

pub(crate) fn with_options(mut question: Question, options: &[&str]) -> Question {
    if let Some(answer) = question.answer.as_mut() {
        answer.options = options
            .iter()
            .map(|o| AnswerOption {
                content: o.to_string(),
                simple_content: o.to_string(),
            })
            .collect();
    }
    question
}

pub(crate) fn rag(score: f64) -> RagResult {
    RagResult {
        question: format!("faq {score}"),
        answer: format!("faq answer {score}"),
        score,
        related_url: Some(format!("https://example.com/faq/{score}")),
    }
}
