use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted outcome of one successful pipeline run.
///
/// The camelCase field names are the durable wire format; external tooling
/// reads these documents, so names and nullability must not change.
/// Records are written exactly once and only ever rewritten whole via an
/// idempotent upsert keyed on `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRecord {
    /// UUID v4, generated fresh per pipeline run. Document key and partition key.
    pub id: String,
    pub original_image_name: String,
    pub original_image_url: String,
    /// None when no overlay was rendered.
    pub processed_image_url: Option<String>,
    pub original_text: String,
    pub translated_text: String,
    /// Fixed-length vector aligned to the configured embedding model,
    /// or None when embedding generation failed or was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub original_lang: String,
    pub translated_lang: String,
    /// Immutable UTC creation timestamp, shared with the blob names.
    pub created_at: DateTime<Utc>,
}

/// Read-only projection returned by retrieval. `similarity_score` is a
/// cosine distance (smaller = more similar) and is only present on
/// vector-ranked hits; pure full-text hits carry None.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedRecord {
    pub id: String,
    pub original_image_name: String,
    pub original_image_url: String,
    pub processed_image_url: Option<String>,
    pub original_text: String,
    pub translated_text: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_serializes_camel_case_wire_names() {
        let record = TranslationRecord {
            id: "2b1d".to_string(),
            original_image_name: "photo 1.png".to_string(),
            original_image_url: "http://localhost/images/photo_1.png".to_string(),
            processed_image_url: None,
            original_text: "HELLO".to_string(),
            translated_text: "こんにちは".to_string(),
            embedding: None,
            original_lang: "en".to_string(),
            translated_lang: "ja".to_string(),
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["originalImageName"], "photo 1.png");
        assert_eq!(value["originalLang"], "en");
        assert!(value.get("originalText").is_some());
        assert!(value.get("translatedText").is_some());
        assert!(value.get("createdAt").is_some());
        // null, not absent: processedImageUrl nullability is part of the contract
        assert!(value.get("processedImageUrl").unwrap().is_null());
        // embedding is omitted entirely when absent
        assert!(value.get("embedding").is_none());
    }

    #[test]
    fn test_retrieved_record_omits_score_for_fulltext_hits() {
        let record = RetrievedRecord {
            id: "abc".to_string(),
            original_image_name: "x.png".to_string(),
            original_image_url: "http://localhost/x.png".to_string(),
            processed_image_url: None,
            original_text: "HELLO".to_string(),
            translated_text: "こんにちは".to_string(),
            created_at: Utc::now(),
            similarity_score: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("similarityScore").is_none());
    }
}
