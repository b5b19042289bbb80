use std::sync::Weak;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::message::MessageDraft;
use crate::sequencer::RevealStep;

pub trait RevealTarget: Send + Sync + 'static {
    fn reveal(&self, draft: MessageDraft);
}

/// Splits off the leading steps that have no delay, so they can be applied
/// in the same critical section that produced them.
pub fn split_immediate(steps: Vec<RevealStep>) -> (Vec<MessageDraft>, Vec<RevealStep>) {
    let mut steps = steps.into_iter().peekable();
    let mut immediate = Vec::new();

    while let Some(step) = steps.next_if(|s| s.delay.is_zero()) {
        immediate.push(step.draft);
    }

    (immediate, steps.collect())
}

/// Remaining steps are dropped once the target is gone.
pub fn spawn<T: RevealTarget>(target: Weak<T>, steps: Vec<RevealStep>) -> Option<JoinHandle<()>> {
    if steps.is_empty() {
        return None;
    }

    Some(tokio::spawn(async move {
        let total = steps.len();

        for (index, step) in steps.into_iter().enumerate() {
            tokio::time::sleep(step.delay).await;

            let Some(target) = target.upgrade() else {
                debug!(dropped = total - index, "reveal target gone; dropping remaining steps");
                return;
            };
            debug!(kind = step.draft.kind.label(), step = index + 1, total, "revealing message");
            target.reveal(step.draft);
        }
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl RevealTarget for Recorder {
        fn reveal(&self, draft: MessageDraft) {
            self.0.lock().unwrap().push(draft.content);
        }
    }

    fn step(ms: u64, content: &str) -> RevealStep {
        RevealStep {
            delay: Duration::from_millis(ms),
            draft: MessageDraft::company(content, None),
        }
    }

    #[test]
    fn leading_zero_delays_are_immediate() {
        let (now, later) = split_immediate(vec![step(0, "a"), step(0, "b"), step(300, "c"), step(0, "d")]);

        assert_eq!(now.len(), 2);
        assert_eq!(later.len(), 2);
        assert_eq!(later[1].draft.content, "d");
    }

    #[tokio::test(start_paused = true)]
    async fn steps_are_revealed_in_order_after_their_delays() {
        let recorder = Arc::new(Recorder::default());
        let handle = spawn(
            Arc::downgrade(&recorder),
            vec![step(500, "tiles"), step(300, "resolution")],
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(recorder.0.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(*recorder.0.lock().unwrap(), ["tiles"]);

        handle.await.unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), ["tiles", "resolution"]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_target_discards_remaining_steps() {
        let recorder = Arc::new(Recorder::default());
        let revealed = recorder.0.clone();
        let handle = spawn(
            Arc::downgrade(&recorder),
            vec![step(0, "early"), step(500, "late"), step(300, "later")],
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*revealed.lock().unwrap(), ["early"]);

        drop(recorder);
        handle.await.unwrap();

        assert_eq!(*revealed.lock().unwrap(), ["early"]);
    }

    #[test]
    fn nothing_to_schedule() {
        let recorder = Arc::new(Recorder::default());
        assert!(spawn(Arc::downgrade(&recorder), Vec::new()).is_none());
    }
}
