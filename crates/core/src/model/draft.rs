use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One learner answer to a writing prompt, held only in local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftResponse {
    pub prompt_index: usize,
    pub text: String,
}

impl DraftResponse {
    /// A response qualifies once it has at least `min_chars` characters.
    #[must_use]
    pub fn is_qualifying(&self, min_chars: usize) -> bool {
        qualifies(&self.text, min_chars)
    }
}

/// All draft answers for one class, keyed by prompt index.
///
/// Serialized as a JSON object: `{"0": "first answer", "2": "third answer"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftSet {
    responses: BTreeMap<usize, String>,
}

impl DraftSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the answer for a prompt.
    pub fn set(&mut self, prompt_index: usize, text: impl Into<String>) {
        self.responses.insert(prompt_index, text.into());
    }

    #[must_use]
    pub fn get(&self, prompt_index: usize) -> Option<&str> {
        self.responses.get(&prompt_index).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn responses(&self) -> impl Iterator<Item = DraftResponse> + '_ {
        self.responses.iter().map(|(index, text)| DraftResponse {
            prompt_index: *index,
            text: text.clone(),
        })
    }

    /// Indices in `0..prompt_count` whose answer qualifies.
    #[must_use]
    pub fn qualifying(&self, prompt_count: usize, min_chars: usize) -> Vec<usize> {
        (0..prompt_count)
            .filter(|index| self.get(*index).is_some_and(|text| qualifies(text, min_chars)))
            .collect()
    }

    /// True when there is at least one prompt and every prompt qualifies.
    #[must_use]
    pub fn all_qualify(&self, prompt_count: usize, min_chars: usize) -> bool {
        prompt_count > 0 && self.qualifying(prompt_count, min_chars).len() == prompt_count
    }
}

fn qualifies(text: &str, min_chars: usize) -> bool {
    text.chars().count() >= min_chars
}
