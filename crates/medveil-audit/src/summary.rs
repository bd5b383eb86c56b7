//! Aggregates and compliance findings computed from stored entries

use chrono::{DateTime, Utc};
use medveil_domain::{AuditEntry, EventType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error share above which the error-rate check warns
const ERROR_RATE_WARN: f64 = 0.05;

/// Counts and averages over a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    /// Window start
    pub window_start: DateTime<Utc>,
    /// Window end
    pub window_end: DateTime<Utc>,
    /// Entries in the window
    pub total_events: usize,
    /// Entries per event type
    pub by_event_type: BTreeMap<String, usize>,
    /// Completed medical queries
    pub medical_queries: usize,
    /// Error entries
    pub errors: usize,
    /// Attestation verifications
    pub attestation_verifications: usize,
    /// Audited HTTP requests
    pub api_requests: usize,
    /// Client-submitted events
    pub client_events: usize,
    /// Explicit encrypt/decrypt calls
    pub encryption_operations: usize,
    /// Queries whose response was sealed
    pub encrypted_queries: usize,
    /// Queries answered in plaintext
    pub plaintext_queries: usize,
    /// Mean query processing time
    pub avg_processing_time_ms: f64,
    /// Summed query processing time
    pub total_processing_time_ms: f64,
    /// Mean response length in characters
    pub avg_response_length: f64,
    /// Longest query preview seen, in characters
    pub max_preview_chars: usize,
}

/// Aggregate the entries that fall inside `[since, until]`
pub fn summarize(entries: &[AuditEntry], since: DateTime<Utc>, until: DateTime<Utc>) -> AuditSummary {
    let mut by_type: BTreeMap<EventType, usize> = BTreeMap::new();
    let mut encrypted = 0;
    let mut plaintext = 0;
    let mut processing = Vec::new();
    let mut response_lengths = Vec::new();
    let mut max_preview_chars = 0;

    let in_window = entries
        .iter()
        .filter(|e| e.timestamp >= since && e.timestamp <= until);

    for entry in in_window {
        *by_type.entry(entry.event_type).or_default() += 1;

        if entry.event_type != EventType::MedicalQuery {
            continue;
        }
        match entry.detail_bool("encryption_enabled") {
            Some(true) => encrypted += 1,
            _ => plaintext += 1,
        }
        if let Some(ms) = entry.detail_f64("processing_time_ms") {
            processing.push(ms);
        }
        if let Some(len) = entry.detail_f64("response_length") {
            response_lengths.push(len);
        }
        if let Some(preview) = entry.details.get("query_preview").and_then(|v| v.as_str()) {
            max_preview_chars = max_preview_chars.max(preview.chars().count());
        }
    }

    let count = |t: EventType| by_type.get(&t).copied().unwrap_or(0);
    let total_processing: f64 = processing.iter().sum();

    AuditSummary {
        window_start: since,
        window_end: until,
        total_events: by_type.values().sum(),
        by_event_type: by_type
            .iter()
            .map(|(t, n)| (t.as_str().to_string(), *n))
            .collect(),
        medical_queries: count(EventType::MedicalQuery),
        errors: count(EventType::Error),
        attestation_verifications: count(EventType::AttestationVerification),
        api_requests: count(EventType::ApiRequest),
        client_events: count(EventType::ClientEvent),
        encryption_operations: count(EventType::EncryptionOperation),
        encrypted_queries: encrypted,
        plaintext_queries: plaintext,
        avg_processing_time_ms: mean(total_processing, processing.len()),
        total_processing_time_ms: total_processing,
        avg_response_length: mean(response_lengths.iter().sum(), response_lengths.len()),
        max_preview_chars,
    }
}

fn mean(sum: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Outcome of one compliance check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    /// Check satisfied
    Pass,
    /// Needs attention
    Warn,
    /// Informational only
    Info,
}

/// One compliance check result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceFinding {
    /// Check identifier
    pub check: String,
    /// Outcome
    pub status: FindingStatus,
    /// Explanation with the numbers behind it
    pub detail: String,
}

/// Compliance report over a summary window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// When the report was generated
    pub generated_at: DateTime<Utc>,
    /// Aggregates the findings derive from
    pub summary: AuditSummary,
    /// Individual checks
    pub findings: Vec<ComplianceFinding>,
    /// `true` when no check warns
    pub compliant: bool,
}

fn finding(check: &str, status: FindingStatus, detail: String) -> ComplianceFinding {
    ComplianceFinding {
        check: check.to_string(),
        status,
        detail,
    }
}

/// Derive compliance findings from a summary
///
/// `preview_limit` is the configured preview length; a longer preview in the
/// log means raw query text leaked into it.
pub fn compliance_report(summary: AuditSummary, preview_limit: usize) -> ComplianceReport {
    let mut findings = Vec::new();

    findings.push(finding(
        "query_audit_coverage",
        FindingStatus::Info,
        format!(
            "{} completed queries and {} failures recorded",
            summary.medical_queries, summary.errors
        ),
    ));

    findings.push(if summary.max_preview_chars <= preview_limit {
        finding(
            "phi_minimization",
            FindingStatus::Pass,
            format!("Query previews are at most {} characters", preview_limit),
        )
    } else {
        finding(
            "phi_minimization",
            FindingStatus::Warn,
            format!(
                "A query preview of {} characters exceeds the {}-character limit",
                summary.max_preview_chars, preview_limit
            ),
        )
    });

    findings.push(if summary.plaintext_queries == 0 {
        finding(
            "response_encryption",
            FindingStatus::Pass,
            format!("All {} queries returned sealed responses", summary.encrypted_queries),
        )
    } else {
        finding(
            "response_encryption",
            FindingStatus::Warn,
            format!(
                "{} of {} queries returned plaintext responses",
                summary.plaintext_queries, summary.medical_queries
            ),
        )
    });

    let attempts = summary.medical_queries + summary.errors;
    let error_rate = mean(summary.errors as f64, attempts);
    findings.push(finding(
        "error_rate",
        if error_rate > ERROR_RATE_WARN {
            FindingStatus::Warn
        } else {
            FindingStatus::Pass
        },
        format!("{:.1}% of {} attempts failed", error_rate * 100.0, attempts),
    ));

    findings.push(if summary.medical_queries > 0 && summary.attestation_verifications == 0 {
        finding(
            "attestation_checks",
            FindingStatus::Warn,
            "No attestation verifications recorded while queries were served".to_string(),
        )
    } else {
        finding(
            "attestation_checks",
            FindingStatus::Pass,
            format!(
                "{} attestation verifications recorded",
                summary.attestation_verifications
            ),
        )
    });

    let compliant = findings.iter().all(|f| f.status != FindingStatus::Warn);
    ComplianceReport {
        generated_at: Utc::now(),
        summary,
        findings,
        compliant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn query(ms: i64, encrypted: bool, response_length: i64, preview: &str) -> AuditEntry {
        AuditEntry::new(EventType::MedicalQuery)
            .with_detail("processing_time_ms", ms)
            .with_detail("encryption_enabled", encrypted)
            .with_detail("response_length", response_length)
            .with_detail("query_preview", preview)
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (Utc::now() - Duration::hours(1), Utc::now() + Duration::minutes(1))
    }

    #[test]
    fn test_summary_counts_and_averages() {
        let entries = vec![
            query(100, true, 400, "I have chest pain"),
            query(300, false, 200, "Headache"),
            AuditEntry::new(EventType::Error),
            AuditEntry::new(EventType::AttestationVerification),
            AuditEntry::at(EventType::Error, Utc::now() - Duration::hours(5)),
        ];
        let (since, until) = window();
        let summary = summarize(&entries, since, until);

        assert_eq!(summary.total_events, 4);
        assert_eq!(summary.medical_queries, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.encrypted_queries, 1);
        assert_eq!(summary.plaintext_queries, 1);
        assert_eq!(summary.avg_processing_time_ms, 200.0);
        assert_eq!(summary.total_processing_time_ms, 400.0);
        assert_eq!(summary.avg_response_length, 300.0);
        assert_eq!(summary.by_event_type.get("medical_query"), Some(&2));
        assert_eq!(summary.max_preview_chars, 17);
    }

    #[test]
    fn test_empty_window() {
        let (since, until) = window();
        let summary = summarize(&[], since, until);
        assert_eq!(summary.total_events, 0);
        assert_eq!(summary.avg_processing_time_ms, 0.0);
    }

    #[test]
    fn test_report_warns_on_plaintext_and_missing_attestation() {
        let (since, until) = window();
        let summary = summarize(&[query(50, false, 10, "short")], since, until);
        let report = compliance_report(summary, 32);

        let status = |check: &str| {
            report
                .findings
                .iter()
                .find(|f| f.check == check)
                .map(|f| f.status)
        };
        assert_eq!(status("response_encryption"), Some(FindingStatus::Warn));
        assert_eq!(status("attestation_checks"), Some(FindingStatus::Warn));
        assert_eq!(status("phi_minimization"), Some(FindingStatus::Pass));
        assert!(!report.compliant);
    }

    #[test]
    fn test_report_compliant_when_clean() {
        let (since, until) = window();
        let entries = vec![
            query(50, true, 10, "short"),
            AuditEntry::new(EventType::AttestationVerification),
        ];
        let report = compliance_report(summarize(&entries, since, until), 32);
        assert!(report.compliant);
    }

    #[test]
    fn test_long_preview_flagged() {
        let (since, until) = window();
        let long = "x".repeat(80);
        let report = compliance_report(summarize(&[query(1, true, 1, &long)], since, until), 32);
        assert!(report
            .findings
            .iter()
            .any(|f| f.check == "phi_minimization" && f.status == FindingStatus::Warn));
    }
}
