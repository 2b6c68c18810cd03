use serde::{Deserialize, Serialize};

use super::RetrievedRecord;

/// Retrieval mode selector. Hybrid runs vector first, then full-text, and
/// merges with id-dedup so semantically close hits win ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Vector,
    Fulltext,
    #[default]
    Hybrid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub q: String,
    #[serde(default)]
    pub mode: SearchMode,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<RetrievedRecord>,
    pub total: u32,
    pub timing_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_defaults_to_hybrid() {
        let req: SearchRequest = serde_json::from_str(r#"{"q": "こんにちは"}"#).unwrap();
        assert_eq!(req.mode, SearchMode::Hybrid);
        assert!(req.limit.is_none());
    }

    #[test]
    fn test_mode_parses_lowercase() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"q": "hello", "mode": "vector", "limit": 3}"#).unwrap();
        assert_eq!(req.mode, SearchMode::Vector);
        assert_eq!(req.limit, Some(3));
    }
}
