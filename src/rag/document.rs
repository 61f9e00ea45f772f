use serde::{Deserialize, Serialize};

/// Open metadata record attached to each document.
///
/// All fields are optional; the scraper fills in whatever it extracted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub people_mentioned: Vec<String>,
}

/// A unit of embedded text stored in a `VectorStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    pub embedding: Vec<f32>,
}

/// A raw scraped content item, produced by the external collection process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub people_mentioned: Vec<String>,
}

impl RawContent {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub(crate) fn into_metadata(self) -> DocumentMetadata {
        DocumentMetadata {
            url: self.url,
            topic: self.topic,
            sentiment: self.sentiment,
            date: self.date,
            context: self.context,
            knowledge_domain: self.knowledge_domain,
            people_mentioned: self.people_mentioned,
        }
    }
}

/// A document paired with its similarity score for one query.
///
/// Scores are cosine similarities in `[-1, 1]`; ranked lists sort by
/// descending score with ascending document id as the tie-break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub document: Document,
    pub score: f32,
}
