//! Chat prompt assembly for medical queries

use medveil_domain::{Article, ChatMessage};

/// System message sent with every medical query
pub const MEDICAL_SYSTEM_PROMPT: &str = "You are a medical AI assistant providing general health information.

IMPORTANT GUIDELINES:
1. Always recommend seeking professional medical care for serious symptoms
2. Do not provide specific diagnoses; suggest possibilities and recommend evaluation
3. For emergencies (chest pain, difficulty breathing, severe bleeding), advise immediate emergency care
4. Remind users that AI cannot replace a licensed healthcare provider
5. Be empathetic, clear, and use accessible language
6. If symptoms are concerning, prioritize safety and recommend professional evaluation

Provide helpful, accurate information while maintaining appropriate medical boundaries.";

const TRUNCATION_MARKER: &str = "\n[document truncated]";

/// Builds the message list for one inference call
pub struct PromptBuilder<'a> {
    question: &'a str,
    document: Option<&'a str>,
    articles: &'a [Article],
    max_document_chars: usize,
}

impl<'a> PromptBuilder<'a> {
    /// Start a prompt for a question
    pub fn new(question: &'a str) -> Self {
        Self {
            question,
            document: None,
            articles: &[],
            max_document_chars: usize::MAX,
        }
    }

    /// Include patient document text, cut to `max_chars` characters
    pub fn with_document(mut self, document: Option<&'a str>, max_chars: usize) -> Self {
        self.document = document.filter(|d| !d.trim().is_empty());
        self.max_document_chars = max_chars;
        self
    }

    /// Include retrieved literature
    pub fn with_articles(mut self, articles: &'a [Article]) -> Self {
        self.articles = articles;
        self
    }

    /// Build the system and user messages
    pub fn build(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(MEDICAL_SYSTEM_PROMPT),
            ChatMessage::user(self.user_message()),
        ]
    }

    fn user_message(&self) -> String {
        let mut message = String::new();

        // 1. Patient document
        if let Some(document) = self.document {
            message.push_str("Patient-provided document:\n---\n");
            message.push_str(&truncate_chars(document.trim_end(), self.max_document_chars));
            message.push_str("\n---\n\n");
        }

        // 2. Literature with citation instructions
        if !self.articles.is_empty() {
            message.push_str("Relevant medical literature:\n");
            for (i, article) in self.articles.iter().enumerate() {
                message.push_str(&format!(
                    "[{}] {} PMID: {}\n",
                    i + 1,
                    article.citation(),
                    article.id
                ));
            }
            message.push_str(
                "\nWhere these articles inform your answer, cite them inline as [n] \
                 and include the PMID of each source you cite.\n\n",
            );
        }

        // 3. The question
        if self.document.is_some() || !self.articles.is_empty() {
            message.push_str("Question: ");
        }
        message.push_str(self.question);
        message
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medveil_domain::Role;

    #[test]
    fn test_plain_question() {
        let messages = PromptBuilder::new("Is a daily aspirin safe?").build();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "Is a daily aspirin safe?");
    }

    #[test]
    fn test_literature_block_and_citation_instruction() {
        let mut article = Article::new("31415926", "Iron deficiency in adults");
        article.journal = Some("Lancet".to_string());
        article.year = Some("2021".to_string());
        let articles = vec![article, Article::new("27182818", "Macrocytosis review")];

        let messages = PromptBuilder::new("Why am I tired?")
            .with_articles(&articles)
            .build();
        let user = &messages[1].content;

        assert!(user.contains("[1] Iron deficiency in adults (Lancet, 2021) PMID: 31415926"));
        assert!(user.contains("[2] Macrocytosis review PMID: 27182818"));
        assert!(user.contains("cite them inline as [n]"));
        assert!(user.ends_with("Question: Why am I tired?"));
    }

    #[test]
    fn test_document_truncated() {
        let document = "é".repeat(50);
        let messages = PromptBuilder::new("q")
            .with_document(Some(&document), 10)
            .build();
        let user = &messages[1].content;
        assert!(user.contains(&format!("{}{}", "é".repeat(10), TRUNCATION_MARKER)));
        assert!(!user.contains(&"é".repeat(11)));
    }

    #[test]
    fn test_blank_document_ignored() {
        let messages = PromptBuilder::new("q").with_document(Some("  \n"), 100).build();
        assert_eq!(messages[1].content, "q");
    }
}
