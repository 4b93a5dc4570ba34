use serde::Serialize;

/// Aggregated view of questionnaire progress, useful for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub total: usize,
    pub issued: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Progress of a session whose pointer is at `index` in a `total`-question catalog.
    #[must_use]
    pub fn at(index: u32, total: usize) -> Self {
        let issued = usize::try_from(index).unwrap_or(usize::MAX).min(total);
        Self {
            total,
            issued,
            remaining: total - issued,
            is_complete: issued == total,
        }
    }
}
