/// Backend models tried for every credential, most preferred first.
pub const DEFAULT_MODEL_CANDIDATES: &[&str] = &[
    "gemini-3-flash-preview",
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash",
];

/// Fixed, non-empty, ordered list of model identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidates {
    ids: Vec<String>,
}

impl ModelCandidates {
    /// Returns `None` for an empty list; dispatch needs at least one model.
    pub fn new<I, S>(ids: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        (!ids.is_empty()).then_some(Self { ids })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }
}

impl Default for ModelCandidates {
    fn default() -> Self {
        Self {
            ids: DEFAULT_MODEL_CANDIDATES
                .iter()
                .map(|id| (*id).to_string())
                .collect(),
        }
    }
}
