//! MedVeil Extractor
//!
//! Turns a patient document and question into literature search terms, and
//! assembles the chat prompt sent to the inference provider.
//!
//! # Architecture
//!
//! ```text
//! document + question → KeywordExtractor → KeywordSet → (literature search)
//!                                                          ↓
//! document + question + articles → PromptBuilder → [ChatMessage]
//! ```
//!
//! Extraction is purely pattern based. Lab findings paired with a direction
//! word ("hemoglobin ... low") map to clinical concepts; condition, symptom
//! and biomarker vocabulary are picked up directly; age and sex become
//! demographic terms. If nothing matches, the longest words of the question
//! are used instead. Extraction never fails once the extractor is built.
//!
//! # Example Usage
//!
//! ```
//! use medveil_extractor::KeywordExtractor;
//!
//! let extractor = KeywordExtractor::new().unwrap();
//! let keywords = extractor.extract(
//!     Some("Hemoglobin: 9.1 g/dL (low)\nMCV: 108 fL (high)"),
//!     "What could explain these results?",
//! );
//! assert!(keywords.contains("anemia"));
//! assert!(keywords.contains("macrocytic anemia"));
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod keywords;
mod prompt;
mod vocabulary;


pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use keywords::KeywordExtractor;
pub use prompt::{PromptBuilder, MEDICAL_SYSTEM_PROMPT};
