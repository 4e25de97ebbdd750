//! Model Response Normalizer: turns a free-form model completion into a `LetterRecord`.
//!
//! Flow: invoke model → clean reply → strict parse → (on syntax error) fallback span parse
//!       → required-key check → record validation.
//!
//! Every stage is a pure function over an immutable string. Failures keep the raw and
//! cleaned model text so a bad reply can be diagnosed without asking the model again.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::letter::prompts::{system_prompt, user_prompt};
use crate::letter::record::{json_type_name, LetterRecord};
use crate::llm_client::{LlmError, ModelAvailability};

/// Keys the model must always return. Checked before any field-level validation.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "your_name",
    "your_email",
    "your_phone",
    "company_name",
    "position_title",
    "body_paragraphs",
];

const EM_DASH: char = '\u{2014}';

// ────────────────────────────────────────────────────────────────────────────
// Result and error types
// ────────────────────────────────────────────────────────────────────────────

/// How the record was recovered from the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// The whole cleaned reply parsed as JSON.
    High,
    /// Only the `{ … }` span inside the reply parsed.
    Medium,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLetter {
    pub record: LetterRecord,
    pub confidence: Confidence,
}

/// The model's reply before and after cleaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelTranscript {
    pub raw: String,
    pub cleaned: String,
}

#[derive(Debug, Clone, Error)]
pub enum NormalizationError {
    #[error("AI analysis failed: {message}")]
    ModelUnavailable { message: String },

    #[error("AI returned empty response")]
    EmptyResponse { transcript: ModelTranscript },

    #[error("AI returned {found} instead of expected dictionary")]
    UnexpectedShape {
        found: &'static str,
        transcript: ModelTranscript,
    },

    #[error("Missing required fields: {fields:?}")]
    MissingFields {
        fields: Vec<&'static str>,
        transcript: ModelTranscript,
    },

    #[error("Data validation error: {field}: {message}")]
    FieldValidation {
        field: &'static str,
        message: String,
        transcript: ModelTranscript,
    },

    #[error("Failed to parse AI response as JSON: {message}")]
    UnparsableResponse {
        message: String,
        transcript: ModelTranscript,
    },
}

impl NormalizationError {
    /// The reply that caused the failure. `None` when the model never answered.
    pub fn transcript(&self) -> Option<&ModelTranscript> {
        match self {
            NormalizationError::ModelUnavailable { .. } => None,
            NormalizationError::EmptyResponse { transcript }
            | NormalizationError::UnexpectedShape { transcript, .. }
            | NormalizationError::MissingFields { transcript, .. }
            | NormalizationError::FieldValidation { transcript, .. }
            | NormalizationError::UnparsableResponse { transcript, .. } => Some(transcript),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalizer
// ────────────────────────────────────────────────────────────────────────────

/// Runs one model call per `normalize` and validates the reply.
#[derive(Clone)]
pub struct LetterNormalizer {
    model: ModelAvailability,
}

impl LetterNormalizer {
    pub fn new(model: ModelAvailability) -> Self {
        Self { model }
    }

    /// Why `normalize` cannot run, if it cannot.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.model {
            ModelAvailability::Available(_) => None,
            ModelAvailability::Unavailable { reason } => Some(reason.as_str()),
        }
    }

    pub async fn normalize(
        &self,
        resume_text: &str,
        job_description_text: &str,
    ) -> Result<NormalizedLetter, NormalizationError> {
        let invoker = match &self.model {
            ModelAvailability::Available(invoker) => invoker,
            ModelAvailability::Unavailable { reason } => {
                return Err(NormalizationError::ModelUnavailable {
                    message: reason.clone(),
                })
            }
        };

        let system = system_prompt();
        let user = user_prompt(resume_text, job_description_text);

        info!("Sending cover letter request to model");
        let raw = match invoker.complete(&system, &user).await {
            Ok(raw) => raw,
            // A null completion is an empty reply, not a provider failure.
            Err(LlmError::EmptyContent) => String::new(),
            Err(e) => {
                warn!("Model call failed: {e}");
                return Err(NormalizationError::ModelUnavailable {
                    message: e.to_string(),
                });
            }
        };
        debug!(
            "Model reply received: {} chars, starts with {:?}",
            raw.len(),
            preview(&raw)
        );

        normalize_reply(raw)
    }
}

/// Everything after the model call. Deterministic, so it is tested directly.
pub fn normalize_reply(raw: String) -> Result<NormalizedLetter, NormalizationError> {
    if raw.trim().is_empty() {
        return Err(NormalizationError::EmptyResponse {
            transcript: ModelTranscript {
                raw,
                cleaned: String::new(),
            },
        });
    }

    let cleaned = clean_reply(&raw);
    let transcript = ModelTranscript { raw, cleaned };

    let (value, confidence) = match serde_json::from_str::<Value>(&transcript.cleaned) {
        Ok(value) => (value, Confidence::High),
        Err(strict_err) => {
            debug!("Strict JSON parse failed: {strict_err}; trying embedded object");
            match parse_embedded_object(&transcript.cleaned) {
                Some(value) => (value, Confidence::Medium),
                None => {
                    return Err(NormalizationError::UnparsableResponse {
                        message: strict_err.to_string(),
                        transcript,
                    })
                }
            }
        }
    };

    let record = validate_reply(&value, transcript)?;
    warn_on_em_dashes(&record);
    info!("Model reply normalized with {} confidence", confidence.as_str());

    Ok(NormalizedLetter { record, confidence })
}

// ────────────────────────────────────────────────────────────────────────────
// Cleaning
// ────────────────────────────────────────────────────────────────────────────

/// Trim → strip code fences → strip a single pair of wrapping quotes.
pub fn clean_reply(raw: &str) -> String {
    let unfenced = strip_code_fences(raw.trim());
    strip_wrapping_quotes(&unfenced).to_string()
}

/// A leading ```json fence removes every ```json and ``` in the text;
/// a leading bare ``` fence removes every ```.
fn strip_code_fences(text: &str) -> String {
    if text.starts_with("```json") {
        text.replace("```json", "").replace("```", "").trim().to_string()
    } else if text.starts_with("```") {
        text.replace("```", "").trim().to_string()
    } else {
        text.to_string()
    }
}

/// Drops the outer quotes only when they are the only two `"` in the text.
fn strip_wrapping_quotes(text: &str) -> &str {
    let is_wrapped = text.len() >= 2
        && text.starts_with('"')
        && text.ends_with('"')
        && text.matches('"').count() == 2;
    if is_wrapped {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing and validation
// ────────────────────────────────────────────────────────────────────────────

/// Greedy first-`{`-to-last-`}` span, parsed as JSON. Only objects count.
fn parse_embedded_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}

fn validate_reply(
    value: &Value,
    transcript: ModelTranscript,
) -> Result<LetterRecord, NormalizationError> {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            return Err(NormalizationError::UnexpectedShape {
                found: json_type_name(value),
                transcript,
            })
        }
    };

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !obj.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(NormalizationError::MissingFields {
            fields: missing,
            transcript,
        });
    }

    LetterRecord::from_object(obj).map_err(|e| NormalizationError::FieldValidation {
        field: e.field,
        message: e.message,
        transcript,
    })
}

/// The prompt forbids em dashes; a reply that still has them is accepted but logged.
fn warn_on_em_dashes(record: &LetterRecord) {
    let offending: Vec<usize> = record
        .body_paragraphs()
        .iter()
        .enumerate()
        .filter(|(_, p)| p.contains(EM_DASH))
        .map(|(i, _)| i)
        .collect();
    if !offending.is_empty() {
        warn!(
            "Model used em dashes despite instructions in paragraphs {:?}",
            offending
        );
    }
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::llm_client::ModelInvoker;

    /// Deterministic model: returns a canned reply and records the prompts it saw.
    struct StubModel {
        reply: Option<String>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl StubModel {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelInvoker for StubModel {
        async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(LlmError::Api {
                    status: 401,
                    message: "Bad credentials".to_string(),
                }),
            }
        }
    }

    /// Provider answered, but with `content: null`.
    struct NullContentModel;

    #[async_trait]
    impl ModelInvoker for NullContentModel {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            Err(LlmError::EmptyContent)
        }
    }

    fn normalizer(model: Arc<StubModel>) -> LetterNormalizer {
        LetterNormalizer::new(ModelAvailability::Available(model))
    }

    fn valid_reply() -> Value {
        json!({
            "file_name": "cover letter/Acme.docx",
            "your_name": "Jane Doe",
            "your_address": "1 Main St",
            "your_email": "Jane.Doe@Example.COM",
            "your_phone": "555-0100",
            "employer_name": "Hiring Manager",
            "company_name": "Acme Corp",
            "company_address": "Company Address",
            "position_title": "Senior Engineer",
            "body_paragraphs": ["One.", "Two.", "Three."]
        })
    }

    fn valid_reply_text() -> String {
        serde_json::to_string_pretty(&valid_reply()).unwrap()
    }

    // ── cleaning ──

    #[test]
    fn test_clean_reply_strips_json_fence() {
        let inner = valid_reply_text();
        let fenced = format!("```json\n{inner}\n```");
        assert_eq!(clean_reply(&fenced), inner);
    }

    #[test]
    fn test_clean_reply_strips_bare_fence() {
        let fenced = "  ```\n{\"a\": 1}\n```  ";
        assert_eq!(clean_reply(fenced), "{\"a\": 1}");
    }

    #[test]
    fn test_clean_reply_leaves_clean_json_alone() {
        let inner = valid_reply_text();
        assert_eq!(clean_reply(&inner), inner);
        assert_eq!(clean_reply(&clean_reply(&inner)), inner);
    }

    #[test]
    fn test_clean_reply_strips_single_pair_of_quotes() {
        assert_eq!(clean_reply("\"hello\""), "hello");
    }

    #[test]
    fn test_clean_reply_keeps_quotes_when_more_than_two() {
        assert_eq!(clean_reply("\"a\" and \"b\""), "\"a\" and \"b\"");
    }

    #[test]
    fn test_clean_reply_lone_quote_is_untouched() {
        assert_eq!(clean_reply("\""), "\"");
    }

    #[test]
    fn test_fence_only_removed_when_leading() {
        let text = "Here you go ```json {\"a\": 1}```";
        assert_eq!(clean_reply(text), text);
    }

    // ── strict parse ──

    #[test]
    fn test_valid_reply_is_high_confidence() {
        let result = normalize_reply(valid_reply_text()).unwrap();
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.record.your_name(), "Jane Doe");
        assert_eq!(result.record.your_email(), "Jane.Doe@Example.COM");
        assert_eq!(result.record.file_name(), Some("cover_letter_Acme.docx"));
        assert_eq!(result.record.body_paragraphs(), ["One.", "Two.", "Three."]);
    }

    #[test]
    fn test_fenced_reply_matches_unfenced_reply() {
        let plain = normalize_reply(valid_reply_text()).unwrap();
        let fenced = normalize_reply(format!("```json\n{}\n```", valid_reply_text())).unwrap();
        assert_eq!(plain, fenced);
    }

    #[test]
    fn test_top_level_array_is_unexpected_shape() {
        let err = normalize_reply("[1, 2, 3]".to_string()).unwrap_err();
        match err {
            NormalizationError::UnexpectedShape { found, transcript } => {
                assert_eq!(found, "array");
                assert_eq!(transcript.cleaned, "[1, 2, 3]");
            }
            other => panic!("expected UnexpectedShape, got {other:?}"),
        }
    }

    #[test]
    fn test_number_reply_is_unexpected_shape() {
        let err = normalize_reply("42".to_string()).unwrap_err();
        assert!(matches!(
            err,
            NormalizationError::UnexpectedShape { found: "number", .. }
        ));
    }

    #[test]
    fn test_missing_email_lists_only_email() {
        let mut reply = valid_reply();
        reply.as_object_mut().unwrap().remove("your_email");
        let err = normalize_reply(reply.to_string()).unwrap_err();
        match err {
            NormalizationError::MissingFields { fields, .. } => {
                assert_eq!(fields, vec!["your_email"]);
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_fields_take_priority_over_invalid_values() {
        let mut reply = valid_reply();
        reply["your_phone"] = json!("");
        reply.as_object_mut().unwrap().remove("company_name");
        reply.as_object_mut().unwrap().remove("body_paragraphs");
        let err = normalize_reply(reply.to_string()).unwrap_err();
        match err {
            NormalizationError::MissingFields { fields, .. } => {
                assert_eq!(fields, vec!["company_name", "body_paragraphs"]);
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_employer_name_is_not_defaulted() {
        let mut reply = valid_reply();
        reply.as_object_mut().unwrap().remove("employer_name");
        let err = normalize_reply(reply.to_string()).unwrap_err();
        assert!(matches!(
            err,
            NormalizationError::FieldValidation {
                field: "employer_name",
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_email_is_field_validation() {
        let mut reply = valid_reply();
        reply["your_email"] = json!("not-an-email");
        let err = normalize_reply(reply.to_string()).unwrap_err();
        match err {
            NormalizationError::FieldValidation {
                field, transcript, ..
            } => {
                assert_eq!(field, "your_email");
                assert!(transcript.raw.contains("not-an-email"));
            }
            other => panic!("expected FieldValidation, got {other:?}"),
        }
    }

    // ── fallback ──

    #[test]
    fn test_prefixed_reply_recovers_with_medium_confidence() {
        let reply = format!("Here is your letter:\n{}", valid_reply_text());
        let result = normalize_reply(reply).unwrap();
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.record.company_name(), "Acme Corp");
    }

    #[test]
    fn test_fallback_still_checks_required_fields() {
        let mut reply = valid_reply();
        reply.as_object_mut().unwrap().remove("your_phone");
        let text = format!("Sure! {reply} Hope this helps.");
        let err = normalize_reply(text).unwrap_err();
        assert!(matches!(err, NormalizationError::MissingFields { ref fields, .. } if fields == &vec!["your_phone"]));
    }

    #[test]
    fn test_unparsable_reply_keeps_raw_and_cleaned() {
        let raw = "```json\n{\"your_name\": \"Jane\",\n```".to_string();
        let err = normalize_reply(raw.clone()).unwrap_err();
        match err {
            NormalizationError::UnparsableResponse { transcript, .. } => {
                assert_eq!(transcript.raw, raw);
                assert_eq!(transcript.cleaned, "{\"your_name\": \"Jane\",");
            }
            other => panic!("expected UnparsableResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_prose_without_braces_is_unparsable() {
        let err = normalize_reply("I cannot help with that.".to_string()).unwrap_err();
        assert!(matches!(
            err,
            NormalizationError::UnparsableResponse { .. }
        ));
    }

    #[test]
    fn test_reversed_braces_are_unparsable() {
        let err = normalize_reply("} nope {".to_string()).unwrap_err();
        assert!(matches!(
            err,
            NormalizationError::UnparsableResponse { .. }
        ));
    }

    #[test]
    fn test_em_dash_is_advisory_only() {
        let mut reply = valid_reply();
        reply["body_paragraphs"] = json!(["Rust \u{2014} and more."]);
        let result = normalize_reply(reply.to_string()).unwrap();
        assert!(result.record.body_paragraphs()[0].contains('\u{2014}'));
    }

    // ── model invocation ──

    #[tokio::test]
    async fn test_normalize_sends_both_texts_to_model() {
        let model = StubModel::replying(&valid_reply_text());
        let result = normalizer(model.clone())
            .normalize("RESUME TEXT", "JOB TEXT")
            .await
            .unwrap();
        assert_eq!(result.confidence, Confidence::High);

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.contains("valid JSON"));
        assert!(seen[0].1.contains("RESUME TEXT"));
        assert!(seen[0].1.contains("JOB TEXT"));
    }

    #[tokio::test]
    async fn test_whitespace_reply_is_empty_response() {
        let err = normalizer(StubModel::replying("  \n\t "))
            .normalize("r", "j")
            .await
            .unwrap_err();
        match err {
            NormalizationError::EmptyResponse { transcript } => {
                assert_eq!(transcript.raw, "  \n\t ");
                assert!(transcript.cleaned.is_empty());
            }
            other => panic!("expected EmptyResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_null_content_is_empty_response() {
        let normalizer =
            LetterNormalizer::new(ModelAvailability::Available(Arc::new(NullContentModel)));
        let err = normalizer.normalize("r", "j").await.unwrap_err();
        match &err {
            NormalizationError::EmptyResponse { transcript } => {
                assert!(transcript.raw.is_empty());
                assert!(transcript.cleaned.is_empty());
            }
            other => panic!("expected EmptyResponse, got {other:?}"),
        }
        assert_eq!(err.to_string(), "AI returned empty response");
    }

    #[tokio::test]
    async fn test_model_error_is_model_unavailable() {
        let err = normalizer(StubModel::failing())
            .normalize("r", "j")
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizationError::ModelUnavailable { .. }));
        assert!(err.transcript().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_model_is_never_called() {
        let normalizer = LetterNormalizer::new(ModelAvailability::Unavailable {
            reason: "missing token".to_string(),
        });
        let err = normalizer.normalize("r", "j").await.unwrap_err();
        match err {
            NormalizationError::ModelUnavailable { message } => {
                assert_eq!(message, "missing token");
            }
            other => panic!("expected ModelUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_confidence_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Confidence::High).unwrap(), "\"high\"");
        assert_eq!(
            serde_json::to_string(&Confidence::Medium).unwrap(),
            "\"medium\""
        );
    }
}
