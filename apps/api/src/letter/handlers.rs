use axum::{
    extract::{Multipart, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::extract::upload::{extract_upload, read_file, UploadedFile};
use crate::extract::FileType;
use crate::letter::normalizer::{Confidence, NormalizedLetter};
use crate::letter::record::LetterRecord;
use crate::render::handlers::docx_download;
use crate::routes::endpoint_listing;
use crate::state::AppState;

pub const ENDPOINTS: [(&str, &str); 3] = [
    (
        "/generate-ai-cover-letter",
        "POST - Upload resume + job description for AI analysis",
    ),
    (
        "/analyze-documents",
        "POST - Analyze documents and return extracted data (no file generation)",
    ),
    ("/health", "GET - Health check"),
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/analyze-documents", post(handle_analyze_documents))
        .route(
            "/generate-ai-cover-letter",
            post(handle_generate_ai_cover_letter),
        )
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub extracted_data: Option<LetterRecord>,
    pub error_message: Option<String>,
    pub ai_confidence: Option<Confidence>,
}

/// Multipart fields of the analysis endpoints.
#[derive(Debug, Default)]
struct AnalysisForm {
    resume: Option<UploadedFile>,
    job_description: Option<UploadedFile>,
    job_description_text: Option<String>,
}

/// GET /api/ai/
pub async fn handle_root() -> Json<Value> {
    Json(json!({
        "message": "AI-Powered Cover Letter Generator",
        "version": env!("CARGO_PKG_VERSION"),
        "features": [
            "AI analysis of resumes and job descriptions",
            "Automatic data extraction",
            "Personalized cover letter generation",
            "DOCX file output"
        ],
        "endpoints": endpoint_listing("", &ENDPOINTS),
    }))
}

/// GET /api/ai/health
pub async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "ai_service": ai_service_status(&state),
        "message": "AI-powered cover letter generator is running"
    }))
}

pub fn ai_service_status(state: &AppState) -> &'static str {
    match state.normalizer.unavailable_reason() {
        None => "GitHub AI Models available",
        Some(_) => "No AI service available (check GITHUB_TOKEN)",
    }
}

/// POST /api/ai/analyze-documents
pub async fn handle_analyze_documents(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisResponse>, AppError> {
    let response = match analyze(&state, multipart).await? {
        Ok(NormalizedLetter { record, confidence }) => AnalysisResponse {
            success: true,
            extracted_data: Some(record),
            error_message: None,
            ai_confidence: Some(confidence),
        },
        Err(message) => AnalysisResponse {
            success: false,
            extracted_data: None,
            error_message: Some(message),
            ai_confidence: None,
        },
    };
    Ok(Json(response))
}

/// POST /api/ai/generate-ai-cover-letter
/// Same inputs as analyze-documents; a failed analysis is a 400.
pub async fn handle_generate_ai_cover_letter(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let letter = analyze(&state, multipart)
        .await?
        .map_err(AppError::Validation)?;
    info!(
        confidence = letter.confidence.as_str(),
        company = letter.record.company_name(),
        "Rendering AI cover letter"
    );
    docx_download(letter.record, state.config.output_dir.clone()).await
}

/// Reads both documents and runs the normalizer.
///
/// The outer error is an HTTP-level rejection (no model, bad input). The inner error
/// is an analysis failure message, reported in the response body.
async fn analyze(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<Result<NormalizedLetter, String>, AppError> {
    if let Some(reason) = state.normalizer.unavailable_reason() {
        return Err(AppError::ServiceUnavailable(reason.to_string()));
    }

    let form = read_analysis_form(&mut multipart).await?;
    let resume = form
        .resume
        .ok_or_else(|| AppError::Validation("Resume file is required".to_string()))?;

    let resume_text = match resume_text(&resume).await? {
        Ok(text) => text,
        Err(message) => return Ok(Err(message)),
    };

    let job_description_text = match (form.job_description_text, form.job_description) {
        (Some(text), _) => text,
        (None, Some(upload)) => {
            if FileType::from_extension(&upload.extension()).is_err() {
                return Err(AppError::Validation(
                    "Job description must be PDF or DOCX".to_string(),
                ));
            }
            match document_text(&upload).await? {
                Ok(text) => text,
                Err(message) => return Ok(Err(message)),
            }
        }
        (None, None) => {
            return Err(AppError::Validation(
                "Must provide either job_description file or job_description_text".to_string(),
            ))
        }
    };

    if resume_text.trim().is_empty() {
        return Err(AppError::Validation("Resume text is empty".to_string()));
    }
    if job_description_text.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description text is empty".to_string(),
        ));
    }

    info!(
        resume_chars = resume_text.len(),
        job_description_chars = job_description_text.len(),
        "Analyzing documents"
    );
    let outcome = state
        .normalizer
        .normalize(&resume_text, &job_description_text)
        .await
        .map_err(|e| {
            warn!("Normalization failed: {e}");
            if let Some(transcript) = e.transcript() {
                debug!(raw = %transcript.raw, cleaned = %transcript.cleaned, "Rejected model reply");
            }
            e.to_string()
        });
    Ok(outcome)
}

async fn read_analysis_form(multipart: &mut Multipart) -> Result<AnalysisForm, AppError> {
    let mut form = AnalysisForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("resume") => form.resume = Some(read_file(field, "resume.txt").await?),
            Some("job_description") => {
                // Browsers send an empty part for an untouched file input.
                let upload = read_file(field, "").await?;
                if !upload.filename.is_empty() || !upload.bytes.is_empty() {
                    form.job_description = Some(upload);
                }
            }
            Some("job_description_text") => {
                let text = field.text().await?;
                if !text.is_empty() {
                    form.job_description_text = Some(text);
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Plain-text resumes (`.txt` or no extension) are decoded as UTF-8; PDF and DOCX
/// go through the extractor. Anything else is rejected.
async fn resume_text(upload: &UploadedFile) -> Result<Result<String, String>, AppError> {
    let extension = upload.extension();
    if extension.is_empty() || extension == ".txt" {
        return Ok(String::from_utf8(upload.bytes.to_vec())
            .map_err(|e| format!("Analysis failed: resume is not valid UTF-8 text: {e}")));
    }
    if FileType::from_extension(&extension).is_err() {
        return Err(AppError::Validation(
            "Resume must be PDF, DOCX, or text".to_string(),
        ));
    }
    document_text(upload).await
}

async fn document_text(upload: &UploadedFile) -> Result<Result<String, String>, AppError> {
    let outcome = extract_upload(upload)
        .await?
        .map(|doc| doc.full_text)
        .map_err(|e| {
            warn!(filename = %upload.filename, "Extraction failed: {e}");
            format!("Analysis failed: {e}")
        });
    Ok(outcome)
}
