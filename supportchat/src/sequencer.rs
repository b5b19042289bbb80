use std::time::Duration;

use shared::{AnswerType, ChatSetting, Conversation, ConversationState, Question, RagResult};

use crate::config::OrchestratorConfig;
use crate::message::{ConversationStatus, FaqTile, MessageDraft, MessageKind};

pub const TILES_DELAY: Duration = Duration::from_millis(500);
pub const RESOLUTION_AFTER_TILES_DELAY: Duration = Duration::from_millis(300);
pub const OPTIONS_DELAY: Duration = Duration::from_millis(300);
pub const UNMATCHED_RESOLUTION_DELAY: Duration = Duration::from_millis(1000);
pub const RATING_DELAY: Duration = Duration::from_millis(500);
pub const SEPARATOR_DELAY: Duration = Duration::from_millis(500);

/// Minimum score (exclusive) for a result to count as a top1 match.
pub const TOP1_SCORE_THRESHOLD: f64 = 0.7;
pub const TOP3_TILE_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RevealStep {
    pub delay: Duration,
    pub draft: MessageDraft,
}

impl RevealStep {
    fn now(draft: MessageDraft) -> Self {
        Self::after(Duration::ZERO, draft)
    }

    fn after(delay: Duration, draft: MessageDraft) -> Self {
        Self { delay, draft }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Branch<'a> {
    RankedMultiMatch(Vec<&'a RagResult>),
    SingleAnswer,
}

pub fn branch<'a>(question: &'a Question, state: ConversationState) -> Branch<'a> {
    let Some(answer) = &question.answer else {
        return Branch::SingleAnswer;
    };
    let results = question.ranked_results();

    let qualifying: Vec<&RagResult> = match (state, answer.answer_type) {
        (ConversationState::Top3, AnswerType::Top3Match) => {
            results.iter().take(TOP3_TILE_LIMIT).collect()
        }
        (ConversationState::Top1, AnswerType::Top1Match) => results
            .iter()
            .filter(|r| r.score > TOP1_SCORE_THRESHOLD)
            .collect(),
        _ => Vec::new(),
    };

    if qualifying.is_empty() {
        Branch::SingleAnswer
    } else {
        Branch::RankedMultiMatch(qualifying)
    }
}

/// Builds the reveal sequence for `question`, or nothing if it has no answer yet.
pub fn sequence(
    question: &Question,
    conversation: &Conversation,
    setting: &ChatSetting,
    config: &OrchestratorConfig,
) -> Vec<RevealStep> {
    let Some(answer) = &question.answer else {
        return Vec::new();
    };
    let status = ConversationStatus::of(conversation);

    let mut steps = vec![RevealStep::now(MessageDraft::company(
        answer.content.clone(),
        Some(status.clone()),
    ))];

    match branch(question, conversation.state) {
        Branch::RankedMultiMatch(results) => {
            let tiles = results
                .into_iter()
                .map(|r| tile(r, config))
                .collect::<Vec<_>>();

            steps.push(RevealStep::after(
                TILES_DELAY,
                MessageDraft {
                    kind: MessageKind::FaqTiles { tiles },
                    content: String::new(),
                    status: Some(status),
                },
            ));
            closing_steps(
                &mut steps,
                RESOLUTION_AFTER_TILES_DELAY,
                conversation,
                setting,
                config,
            );
        }
        Branch::SingleAnswer => {
            if !answer.options.is_empty() {
                steps.push(RevealStep::after(
                    OPTIONS_DELAY,
                    MessageDraft {
                        kind: MessageKind::Options {
                            question_id: question.id,
                            options: answer.options.clone(),
                        },
                        content: config.options_header.clone(),
                        status: Some(status),
                    },
                ));
            }

            if conversation.state == ConversationState::Unmatched {
                closing_steps(
                    &mut steps,
                    UNMATCHED_RESOLUTION_DELAY,
                    conversation,
                    setting,
                    config,
                );
            }
        }
    }

    steps
}

fn closing_steps(
    steps: &mut Vec<RevealStep>,
    resolution_delay: Duration,
    conversation: &Conversation,
    setting: &ChatSetting,
    config: &OrchestratorConfig,
) {
    let status = ConversationStatus::of(conversation);

    steps.push(RevealStep::after(
        resolution_delay,
        MessageDraft::company(
            resolution_content(conversation, setting, config),
            Some(status.clone()),
        ),
    ));

    if conversation.state != ConversationState::Unmatched {
        steps.push(RevealStep::after(
            RATING_DELAY,
            MessageDraft {
                kind: MessageKind::Rating {
                    token: conversation.token.clone(),
                    state: conversation.state,
                },
                content: config.rating_prompt.clone(),
                status: Some(status.clone()),
            },
        ));
    }

    steps.push(RevealStep::after(
        SEPARATOR_DELAY,
        MessageDraft {
            kind: MessageKind::Separator,
            content: config.separator_message.clone(),
            status: Some(status),
        },
    ));
}

pub fn resolution_content(
    conversation: &Conversation,
    setting: &ChatSetting,
    config: &OrchestratorConfig,
) -> String {
    let template = if conversation.state == ConversationState::Unmatched {
        &setting.unmatched_message
    } else {
        &setting.matched_message
    };

    let mut content = format!(
        "{template}\n\n{}: {}",
        config.reference_label, conversation.cid
    );
    if let Some(url) = &conversation.contact_page_url {
        content.push_str(&format!(
            "\n\n<a href=\"{url}\" target=\"_blank\">{}</a>",
            config.contact_link_label
        ));
    }

    content
}

fn tile(result: &RagResult, config: &OrchestratorConfig) -> FaqTile {
    FaqTile {
        question: result.question.clone(),
        answer: result.answer.clone(),
        score: result.score,
        related_url: result.related_url.clone(),
        related_link: result
            .related_url
            .as_ref()
            .map(|url| config.related_link_template.replace("{url}", url)),
    }
}

#[cfg(test)]
mod tests {
    use shared::{Answer, AnswerOption, RatingType};

    use super::*;

    fn setting() -> ChatSetting {
        ChatSetting {
            welcome_message: "Welcome".into(),
            matched_message: "Glad we could help.".into(),
            unmatched_message: "Sorry, no match.".into(),
            ..ChatSetting::default()
        }
    }

    fn rag(score: f64, url: Option<&str>) -> RagResult {
        RagResult {
            question: format!("q{score}"),
            answer: format!("a{score}"),
            score,
            related_url: url.map(str::to_string),
        }
    }

    fn conversation(state: ConversationState, question: Question) -> Conversation {
        Conversation {
            token: "tok".into(),
            cid: "C-42".into(),
            state,
            rating_type_id: RatingType::None,
            questions: vec![question],
            contact_page_url: None,
        }
    }

    fn question(answer_type: AnswerType, results: Vec<RagResult>) -> Question {
        Question {
            id: 1,
            content: "help".into(),
            answer: Some(Answer {
                id: Some(10),
                content: "Here is the answer".into(),
                answer_type,
                options: vec![],
                rag_results: results,
            }),
            rag_results: vec![],
        }
    }

    fn labels(steps: &[RevealStep]) -> Vec<&'static str> {
        steps.iter().map(|s| s.draft.kind.label()).collect()
    }

    fn delays(steps: &[RevealStep]) -> Vec<u64> {
        steps.iter().map(|s| s.delay.as_millis() as u64).collect()
    }

    #[test]
    fn top3_reveals_answer_tiles_resolution_rating_separator() {
        let q = question(
            AnswerType::Top3Match,
            vec![rag(0.9, None), rag(0.8, None), rag(0.6, None), rag(0.5, None)],
        );
        let convo = conversation(ConversationState::Top3, q.clone());

        let steps = sequence(&q, &convo, &setting(), &OrchestratorConfig::default());

        assert_eq!(
            labels(&steps),
            ["company", "faq_tiles", "company", "rating", "separator"]
        );
        assert_eq!(delays(&steps), [0, 500, 300, 500, 500]);
        let MessageKind::FaqTiles { tiles } = &steps[1].draft.kind else {
            panic!("expected tiles");
        };
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[2].score, 0.6);
    }

    #[test]
    fn top1_keeps_only_results_above_threshold() {
        let q = question(
            AnswerType::Top1Match,
            vec![
                rag(0.95, Some("https://example.com/a")),
                rag(0.71, None),
                rag(0.7, None),
            ],
        );
        let convo = conversation(ConversationState::Top1, q.clone());

        let steps = sequence(&q, &convo, &setting(), &OrchestratorConfig::default());

        let MessageKind::FaqTiles { tiles } = &steps[1].draft.kind else {
            panic!("expected tiles");
        };
        assert_eq!(tiles.len(), 2);
        assert!(tiles[0]
            .related_link
            .as_deref()
            .unwrap()
            .contains("https://example.com/a"));
        assert_eq!(tiles[1].related_link, None);
    }

    #[test]
    fn top1_without_qualifying_score_falls_back() {
        let q = question(AnswerType::Top1Match, vec![rag(0.4, None)]);
        let convo = conversation(ConversationState::Top1, q.clone());

        assert_eq!(branch(&q, convo.state), Branch::SingleAnswer);
        let steps = sequence(&q, &convo, &setting(), &OrchestratorConfig::default());
        assert_eq!(labels(&steps), ["company"]);
    }

    #[test]
    fn top3_with_no_results_falls_back() {
        let q = question(AnswerType::Top3Match, vec![]);
        let convo = conversation(ConversationState::Top3, q.clone());

        assert_eq!(branch(&q, convo.state), Branch::SingleAnswer);
    }

    #[test]
    fn mismatched_answer_type_is_single_answer() {
        let q = question(AnswerType::Additional, vec![rag(0.99, None)]);
        let convo = conversation(ConversationState::Top3, q.clone());

        assert_eq!(branch(&q, convo.state), Branch::SingleAnswer);
    }

    #[test]
    fn unmatched_skips_rating_but_keeps_separator() {
        let mut q = question(AnswerType::Unmatched, vec![]);
        q.answer.as_mut().unwrap().options = vec![AnswerOption {
            content: "How do I change my plan".into(),
            simple_content: "Change plan".into(),
        }];
        let convo = conversation(ConversationState::Unmatched, q.clone());

        let steps = sequence(&q, &convo, &setting(), &OrchestratorConfig::default());

        assert_eq!(labels(&steps), ["company", "options", "company", "separator"]);
        assert_eq!(delays(&steps), [0, 300, 1000, 500]);
        assert!(steps[2].draft.content.starts_with("Sorry, no match."));
    }

    #[test]
    fn reply_waiting_answer_with_options() {
        let mut q = question(AnswerType::Additional, vec![]);
        q.answer.as_mut().unwrap().options = vec![AnswerOption {
            content: "Cancel my order".into(),
            simple_content: "Cancel".into(),
        }];
        let convo = conversation(ConversationState::ReplyWaiting, q.clone());

        let steps = sequence(&q, &convo, &setting(), &OrchestratorConfig::default());

        assert_eq!(labels(&steps), ["company", "options"]);
    }

    #[test]
    fn resolution_carries_reference_and_contact_link() {
        let q = question(AnswerType::Top1Match, vec![rag(0.9, None)]);
        let mut convo = conversation(ConversationState::Top1, q);
        convo.contact_page_url = Some("https://example.com/contact".into());

        let content = resolution_content(&convo, &setting(), &OrchestratorConfig::default());

        assert!(content.starts_with("Glad we could help."));
        assert!(content.contains("Reference ID: C-42"));
        assert!(content.contains("href=\"https://example.com/contact\""));
    }

    #[test]
    fn unanswered_question_produces_nothing() {
        let q = Question {
            id: 2,
            content: "pending".into(),
            answer: None,
            rag_results: vec![],
        };
        let convo = conversation(ConversationState::AnswerPreparing, q.clone());

        assert!(sequence(&q, &convo, &setting(), &OrchestratorConfig::default()).is_empty());
    }
}
