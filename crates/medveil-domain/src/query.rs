//! Query module - the unit of intake

use serde::{Deserialize, Serialize};

/// A client query after intake
///
/// The document text, when present, is text already extracted from an upload;
/// this crate never sees the upload itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// The user's question
    pub question: String,

    /// Extracted document text, if the user attached one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,

    /// Client session identifier (never logged in clear)
    pub session_id: String,
}

impl Query {
    /// Create a query without an attached document
    pub fn new(question: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            document: None,
            session_id: session_id.into(),
        }
    }

    /// Attach document text; blank text is treated as no document
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        let document = document.into();
        self.document = if document.trim().is_empty() {
            None
        } else {
            Some(document)
        };
        self
    }

    /// Document text followed by the question
    pub fn combined_text(&self) -> String {
        match &self.document {
            Some(doc) => format!("{}\n\n{}", doc.trim_end(), self.question),
            None => self.question.clone(),
        }
    }

    /// Number of characters the query carries in total
    pub fn char_len(&self) -> usize {
        self.question.chars().count()
            + self
                .document
                .as_deref()
                .map(|d| d.chars().count())
                .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_text_without_document() {
        let query = Query::new("What does high TSH mean?", "session-1");
        assert_eq!(query.combined_text(), "What does high TSH mean?");
    }

    #[test]
    fn test_combined_text_with_document() {
        let query = Query::new("Is this serious?", "session-1").with_document("TSH: 9.1 (high)\n");
        assert_eq!(query.combined_text(), "TSH: 9.1 (high)\n\nIs this serious?");
    }

    #[test]
    fn test_blank_document_is_dropped() {
        let query = Query::new("q", "s").with_document("   \n");
        assert!(query.document.is_none());
    }
}
