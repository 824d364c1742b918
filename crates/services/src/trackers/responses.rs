use course_core::model::{ComponentKind, DraftSet, SyncPolicy};

use super::{CompletionGate, ProgressCommand};

const KIND: ComponentKind = ComponentKind::WritingPrompts;

/// Completes the writing component once every prompt has a long-enough
/// answer. Drafts themselves are persisted by the caller, never synced.
#[derive(Debug, Clone)]
pub struct ResponseCompletionTracker {
    prompt_count: usize,
    min_chars: usize,
    drafts: DraftSet,
    gate: CompletionGate,
}

impl ResponseCompletionTracker {
    #[must_use]
    pub fn new(policy: &SyncPolicy, prompt_count: usize, drafts: DraftSet, completed: bool) -> Self {
        Self {
            prompt_count,
            min_chars: policy.min_response_chars(),
            drafts,
            gate: if completed {
                CompletionGate::closed()
            } else {
                CompletionGate::default()
            },
        }
    }

    #[must_use]
    pub fn drafts(&self) -> &DraftSet {
        &self.drafts
    }

    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.prompt_count
    }

    #[must_use]
    pub fn qualifying(&self) -> Vec<usize> {
        self.drafts.qualifying(self.prompt_count, self.min_chars)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.gate.is_closed()
    }

    /// Evaluate drafts restored from storage at mount time.
    pub fn on_mount(&mut self) -> Option<ProgressCommand> {
        self.evaluate()
    }

    /// Apply an edit. Indices outside the prompt list are ignored.
    pub fn edit(&mut self, prompt_index: usize, text: impl Into<String>) -> Option<ProgressCommand> {
        if prompt_index >= self.prompt_count {
            return None;
        }
        self.drafts.set(prompt_index, text);
        self.evaluate()
    }

    /// Manual completion shares the gate with the derived one.
    pub fn mark_complete_manually(&mut self) -> Option<ProgressCommand> {
        self.gate
            .try_close()
            .then_some(ProgressCommand::MarkComplete { kind: KIND })
    }

    /// Completion was submitted elsewhere; later edits stay silent.
    pub fn close_gate(&mut self) {
        self.gate.close();
    }

    fn evaluate(&mut self) -> Option<ProgressCommand> {
        if self.gate.is_closed() || !self.drafts.all_qualify(self.prompt_count, self.min_chars) {
            return None;
        }
        self.mark_complete_manually()
    }
}
