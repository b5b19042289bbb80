use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use shared::{ChatSetting, Conversation, ConversationState, RatingType, SupportApi, TransportError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::classifier::{ErrorClassifier, FailureCategory, FAILURE_REVEAL_DELAY};
use crate::config::OrchestratorConfig;
use crate::dedup::QuestionDeduplicator;
use crate::message::{
    with_terminator, ConversationStatus, Message, MessageDraft, MessageId, MessageKind,
};
use crate::poller::{self, PollControl, Poller};
use crate::rating::{RatingController, RatingState};
use crate::scheduler::{self, RevealTarget};
use crate::sequencer::{self, RevealStep};
use crate::timeline::Timeline;

pub struct Orchestrator<A: SupportApi + 'static> {
    shared: Arc<Shared<A>>,
}

struct Shared<A> {
    api: Arc<A>,
    setting: ChatSetting,
    config: OrchestratorConfig,
    inner: Mutex<Inner>,
    revision: watch::Sender<u64>,
    this: Weak<Shared<A>>,
}

struct Inner {
    timeline: Timeline,
    conversation: Option<Conversation>,
    dedup: QuestionDeduplicator,
    ratings: RatingController,
    poller: Poller,
    creating: bool,
    replying: bool,
}

enum Outgoing {
    Create,
    Reply(String),
}

impl<A: SupportApi + 'static> Orchestrator<A> {
    pub fn new(api: Arc<A>, setting: ChatSetting, config: OrchestratorConfig) -> Self {
        let mut timeline = Timeline::new();
        timeline.push(MessageDraft::company(setting.welcome_message.clone(), None));

        if setting.monthly_limit_exceeded {
            let notice = ErrorClassifier::new(&setting, &config).monthly_limit_message();
            timeline.push(MessageDraft::company(notice, None));
        } else if !setting.chat_available {
            timeline.push(MessageDraft::company(
                config.chat_unavailable_message.clone(),
                None,
            ));
        }

        let (revision, _) = watch::channel(0);
        let poller = Poller::new(config.poll_interval);

        let shared = Arc::new_cyclic(|this| Shared {
            api,
            setting,
            inner: Mutex::new(Inner {
                timeline,
                conversation: None,
                dedup: QuestionDeduplicator::new(),
                ratings: RatingController::new(),
                poller,
                creating: false,
                replying: false,
            }),
            config,
            revision,
            this: this.clone(),
        });

        Self { shared }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock().timeline.messages().to_vec()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    pub fn conversation(&self) -> Option<Conversation> {
        self.shared.lock().conversation.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.shared.lock().poller.is_running()
    }

    pub fn is_creating(&self) -> bool {
        self.shared.lock().creating
    }

    pub fn is_replying(&self) -> bool {
        self.shared.lock().replying
    }

    pub fn accepts_input(&self) -> bool {
        let inner = self.shared.lock();
        self.shared.is_available() && !inner.creating && !inner.replying
    }

    pub fn rating_state(&self, id: MessageId) -> Option<RatingState> {
        self.shared.lock().ratings.state(id)
    }

    /// Returns `false` without doing anything when the message can't be sent right now.
    pub async fn send_message(&self, content: &str) -> bool {
        let content = content.trim();
        if content.is_empty() || !self.shared.is_available() {
            return false;
        }

        let (outgoing, superseded) = {
            let mut guard = self.shared.lock();
            let inner = &mut *guard;
            if inner.creating || inner.replying {
                return false;
            }

            let superseded = inner
                .ratings
                .discard_pending(self.shared.config.send_default_rating_on_discard);

            inner.timeline.push(MessageDraft::user(content));
            inner.timeline.push_loading();

            let outgoing = match &inner.conversation {
                Some(c) if c.state == ConversationState::ReplyWaiting => {
                    inner.replying = true;
                    Outgoing::Reply(c.token.clone())
                }
                _ => {
                    inner.creating = true;
                    Outgoing::Create
                }
            };

            (outgoing, superseded)
        };
        self.shared.bump();

        if let Some(token) = superseded {
            self.shared.submit_rating_in_background(token, RatingType::None);
        }

        let result = match &outgoing {
            Outgoing::Create => {
                info!("creating conversation");
                self.shared.api.create_conversation(content).await
            }
            Outgoing::Reply(token) => {
                info!(token = %token, "replying to conversation");
                self.shared.api.reply_to_conversation(token, content).await
            }
        };

        match result {
            Ok(conversation) => {
                self.shared
                    .accept_sent(conversation, matches!(outgoing, Outgoing::Reply(_)))
            }
            Err(err) => self.shared.fail_sent(&err),
        }

        true
    }

    /// Rates the pending Rating Message. Returns whether the rating was accepted.
    pub async fn rate(&self, rating: RatingType) -> bool {
        let token = {
            let mut inner = self.shared.lock();
            match inner.ratings.submit_pending(rating) {
                Ok(token) => token,
                Err(rejected) => {
                    debug!(%rejected, "rating ignored");
                    return false;
                }
            }
        };
        self.shared.bump();

        if self.shared.submit_rating(&token, rating).await && rating != RatingType::None {
            if let Some(thanks) = &self.shared.config.thank_you_message {
                let status = self
                    .shared
                    .lock()
                    .conversation
                    .as_ref()
                    .map(ConversationStatus::of);
                self.shared.reveal(MessageDraft::company(thanks.clone(), status));
            }
        }

        true
    }

    pub fn select_option(&self, content: &str) -> String {
        with_terminator(content, self.shared.config.option_terminator)
    }

    /// Reports that the user opened `url` from a message. Failures are logged only.
    pub async fn track_url(&self, url: &str) {
        let token = self.shared.lock().conversation.as_ref().map(|c| c.token.clone());
        let Some(token) = token else {
            warn!(url, "no conversation to attribute url access to");
            return;
        };

        if let Err(err) = self.shared.api.track_url_access(&token, url).await {
            warn!(url, error = %err, "failed to track url access");
        }
    }

    pub fn start(&self) {
        let mut inner = self.shared.lock();
        self.shared.ensure_polling(&mut inner);
    }

    pub fn stop(&self) {
        self.shared.lock().poller.stop();
    }

    pub async fn force_poll(&self) {
        self.shared.poll_once().await;
        self.start();
    }

    /// Leaves the chat: stops polling and settles any pending rating.
    pub async fn close(&self) {
        let superseded = {
            let mut inner = self.shared.lock();
            inner.poller.stop();
            inner
                .ratings
                .discard_pending(self.shared.config.send_default_rating_on_discard)
        };

        if let Some(token) = superseded {
            self.shared.submit_rating(&token, RatingType::None).await;
        }
    }
}

impl<A: SupportApi + 'static> Drop for Orchestrator<A> {
    fn drop(&mut self) {
        self.shared.lock().poller.stop();
    }
}

impl<A: SupportApi + 'static> Shared<A> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    fn is_available(&self) -> bool {
        self.setting.chat_available && !self.setting.monthly_limit_exceeded
    }

    fn accept_sent(&self, mut conversation: Conversation, replied: bool) {
        if replied && conversation.state == ConversationState::ReplyWaiting {
            // The server may echo the pre-reply state; keep polling until it moves on.
            conversation.state = ConversationState::ReplyReceived;
        }
        info!(
            token = %conversation.token,
            state = ?conversation.state,
            questions = conversation.questions.len(),
            "conversation accepted message"
        );

        let pending = {
            let mut inner = self.lock();
            inner.creating = false;
            inner.replying = false;
            let pending = self.absorb(&mut inner, conversation);
            self.ensure_polling(&mut inner);
            pending
        };

        self.bump();
        self.schedule(pending);
    }

    fn fail_sent(&self, err: &TransportError) {
        let classified = ErrorClassifier::new(&self.setting, &self.config).classify(err);
        error!(
            error = %err,
            category = %classified.category,
            retryable = classified.category.is_retryable(),
            "failed to send message"
        );

        {
            let mut inner = self.lock();
            inner.creating = false;
            inner.replying = false;
            inner.timeline.remove_loading();
        }
        self.bump();

        self.schedule(vec![vec![RevealStep {
            delay: FAILURE_REVEAL_DELAY,
            draft: MessageDraft::company(classified.message, Some(ConversationStatus::failed())),
        }]]);
    }

    // Delayed steps are returned so they can be scheduled after the lock is released.
    fn absorb(&self, inner: &mut Inner, conversation: Conversation) -> Vec<Vec<RevealStep>> {
        let mut pending = Vec::new();

        for question in &conversation.questions {
            if question.answer.is_none() || inner.dedup.has_processed(question.id) {
                continue;
            }

            inner.timeline.remove_loading();
            inner.dedup.mark_processed(question.id);

            let steps = sequencer::sequence(question, &conversation, &self.setting, &self.config);
            info!(
                question = question.id,
                state = ?conversation.state,
                steps = steps.len(),
                "sequencing answered question"
            );

            let (now, later) = scheduler::split_immediate(steps);
            for draft in now {
                Self::push(inner, draft);
            }
            pending.push(later);
        }

        inner.conversation = Some(conversation);
        pending
    }

    fn push(inner: &mut Inner, draft: MessageDraft) {
        let token = match &draft.kind {
            MessageKind::Rating { token, .. } => Some(token.clone()),
            _ => None,
        };

        let id = inner.timeline.push(draft);
        if let Some(token) = token {
            inner.ratings.register(id, token);
        }
    }

    fn schedule(&self, pending: Vec<Vec<RevealStep>>) {
        for steps in pending {
            scheduler::spawn(self.this.clone(), steps);
        }
    }

    fn ensure_polling(&self, inner: &mut Inner) {
        let interval = poller::refresh_interval(
            inner.conversation.as_ref(),
            true,
            self.config.poll_interval,
        );
        if interval.is_none() || inner.poller.is_running() {
            return;
        }

        debug!(interval = ?self.config.poll_interval, "starting poller");
        let this = self.this.clone();
        inner.poller.start(move || {
            let this = this.clone();
            async move {
                match this.upgrade() {
                    Some(shared) => shared.poll_once().await,
                    None => PollControl::Stop,
                }
            }
        });
    }

    async fn poll_once(&self) -> PollControl {
        let token = {
            let inner = self.lock();
            match &inner.conversation {
                Some(c) if c.state.needs_polling() => c.token.clone(),
                _ => return PollControl::Stop,
            }
        };

        let conversation = match self.api.get_conversation(&token).await {
            Ok(conversation) => conversation,
            Err(err) => {
                warn!(token = %token, error = %err, "poll failed; keeping previous snapshot");
                return PollControl::Continue;
            }
        };
        debug!(token = %token, state = ?conversation.state, "polled conversation");

        let (control, pending) = {
            let mut inner = self.lock();
            if inner.conversation.as_ref().map(|c| c.token.as_str()) != Some(token.as_str()) {
                debug!(token = %token, "conversation replaced while polling; discarding result");
                return PollControl::Continue;
            }

            let control = if conversation.state.needs_polling() {
                PollControl::Continue
            } else {
                PollControl::Stop
            };
            (control, self.absorb(&mut inner, conversation))
        };

        self.bump();
        self.schedule(pending);
        control
    }

    async fn submit_rating(&self, token: &str, rating: RatingType) -> bool {
        match self.api.rate_conversation(token, rating).await {
            Ok(_) => {
                info!(token, ?rating, "conversation rated");
                true
            }
            Err(err) => {
                warn!(
                    token,
                    ?rating,
                    error = %err,
                    category = %FailureCategory::RatingSubmissionFailure,
                    "failed to submit rating"
                );
                false
            }
        }
    }

    fn submit_rating_in_background(&self, token: String, rating: RatingType) {
        let this = self.this.clone();
        tokio::spawn(async move {
            if let Some(shared) = this.upgrade() {
                shared.submit_rating(&token, rating).await;
            }
        });
    }
}

impl<A: SupportApi + 'static> RevealTarget for Shared<A> {
    fn reveal(&self, draft: MessageDraft) {
        Self::push(&mut self.lock(), draft);
        self.bump();
    }
}
