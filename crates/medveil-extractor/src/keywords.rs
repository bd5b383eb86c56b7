//! Pattern-based keyword extraction

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::vocabulary::{
    BIOMARKERS, CONDITIONS, FEMALE_WORDS, FINDING_RULES, MALE_WORDS, STOPWORDS,
};
use medveil_domain::KeywordSet;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

struct CompiledFinding {
    /// Marker then direction; group 1 is the direction word
    forward: Regex,
    /// Direction then marker; group 1 is the direction word
    reverse: Regex,
    concept: &'static str,
}

/// Extracts literature search terms from a document and question
///
/// Candidate groups are tried in priority order: lab findings, condition and
/// symptom vocabulary, biomarker vocabulary, then demographics. When none of
/// them match, the longest non-stopword words of the question are used. The
/// result never holds more than [`KeywordSet::MAX_KEYWORDS`] terms.
pub struct KeywordExtractor {
    findings: Vec<CompiledFinding>,
    conditions: Regex,
    biomarkers: Regex,
    age: Regex,
    sex: Regex,
    word: Regex,
    stopwords: HashSet<&'static str>,
    fallback_keywords: usize,
}

impl KeywordExtractor {
    /// Build an extractor with default settings
    pub fn new() -> Result<Self, ExtractorError> {
        Self::with_config(&ExtractorConfig::default())
    }

    /// Build an extractor from configuration
    pub fn with_config(config: &ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;

        // The gap between marker and direction stays on one line and inside one
        // list item, so "hemoglobin low, MCV high" does not pair "low" with MCV.
        let gap = format!("[^\\n;,]{{0,{}}}?", config.finding_window);
        let findings = FINDING_RULES
            .iter()
            .map(|rule| {
                let marker = rule.marker;
                let direction = rule.direction.words();
                Ok(CompiledFinding {
                    forward: Regex::new(&format!(
                        r"(?i)\b(?:{marker})\b{gap}\b({direction})\b"
                    ))?,
                    reverse: Regex::new(&format!(
                        r"(?i)\b({direction})\b{gap}\b(?:{marker})\b"
                    ))?,
                    concept: rule.concept,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            findings,
            conditions: vocabulary_pattern(CONDITIONS)?,
            biomarkers: vocabulary_pattern(BIOMARKERS)?,
            age: Regex::new(
                r"(?i)\b(\d{1,3})[\s-]*(?:years?|yrs?)[\s-]*old\b|\b(\d{1,3})\s*(?:yo|y/o)\b|\bage[d:]?\s*(\d{1,3})\b",
            )?,
            sex: Regex::new(&format!(r"(?i)\b(?:({MALE_WORDS})|({FEMALE_WORDS}))\b"))?,
            word: Regex::new(r"[a-z0-9]+(?:['-][a-z0-9]+)*")?,
            stopwords: STOPWORDS.iter().copied().collect(),
            fallback_keywords: config.fallback_keywords,
        })
    }

    /// Extract search terms from optional document text and the question
    pub fn extract(&self, document: Option<&str>, question: &str) -> KeywordSet {
        let text = match document {
            Some(doc) if !doc.trim().is_empty() => format!("{}\n{}", doc, question),
            _ => question.to_string(),
        };

        let mut candidates = self.findings(&text);
        candidates.extend(vocabulary_matches(&self.conditions, &text));
        candidates.extend(vocabulary_matches(&self.biomarkers, &text));
        candidates.extend(self.demographics(&text));

        let keywords = if candidates.is_empty() {
            KeywordSet::from_candidates(self.longest_words(question))
        } else {
            KeywordSet::from_candidates(candidates)
        };

        debug!(count = keywords.len(), "Extracted search keywords");
        keywords
    }

    fn findings(&self, text: &str) -> Vec<String> {
        let mut matched = vec![false; self.findings.len()];
        let mut claimed = HashSet::new();

        for (i, finding) in self.findings.iter().enumerate() {
            for caps in finding.forward.captures_iter(text) {
                if let Some(direction) = caps.get(1) {
                    claimed.insert(direction.start());
                    matched[i] = true;
                }
            }
        }

        // A direction word that already follows its own marker is not
        // paired again with the marker after it.
        for (i, finding) in self.findings.iter().enumerate() {
            if matched[i] {
                continue;
            }
            matched[i] = finding
                .reverse
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .any(|direction| !claimed.contains(&direction.start()));
        }

        self.findings
            .iter()
            .zip(matched)
            .filter(|(_, hit)| *hit)
            .map(|(finding, _)| finding.concept.to_string())
            .collect()
    }

    fn demographics(&self, text: &str) -> Vec<String> {
        let mut terms = Vec::new();

        let age = self.age.captures(text).and_then(|caps| {
            (1..=3)
                .filter_map(|i| caps.get(i))
                .find_map(|m| m.as_str().parse::<u32>().ok())
        });
        if let Some(age) = age.filter(|age| *age <= 120) {
            terms.push(age_group(age).to_string());
        }

        for caps in self.sex.captures_iter(text) {
            if caps.get(1).is_some() {
                terms.push("male".to_string());
            } else if caps.get(2).is_some() {
                terms.push("female".to_string());
            }
        }

        terms
    }

    fn longest_words(&self, question: &str) -> Vec<String> {
        let lowered = question.to_lowercase();
        let mut seen = HashSet::new();
        let mut words: Vec<&str> = self
            .word
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|w| w.chars().count() >= 3)
            .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
            .filter(|w| !self.stopwords.contains(*w))
            .filter(|w| seen.insert(*w))
            .collect();

        // Stable sort keeps first-appearance order among equal lengths.
        words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        words
            .into_iter()
            .take(self.fallback_keywords)
            .map(str::to_string)
            .collect()
    }
}

fn age_group(age: u32) -> &'static str {
    match age {
        0..=17 => "pediatric",
        18..=64 => "adult",
        _ => "elderly",
    }
}

fn vocabulary_pattern(terms: &[&str]) -> Result<Regex, regex::Error> {
    let mut sorted: Vec<&str> = terms.to_vec();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()));
    let alternation = sorted
        .iter()
        .map(|term| regex::escape(term).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
}

fn vocabulary_matches(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .find_iter(text)
        .map(|m| {
            m.as_str()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .collect()
}
