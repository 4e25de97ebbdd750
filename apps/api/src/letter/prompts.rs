// All LLM prompt constants for the cover letter module.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{FORMATTING_RULES, JSON_ONLY_INSTRUCTION};

/// System prompt role line. The JSON-only instruction is appended by `system_prompt()`.
const LETTER_SYSTEM_ROLE: &str = "You are a helpful assistant that extracts structured \
    information from resumes and job descriptions for generating a personalized cover letter.

You must analyze the provided resume and job description, then extract the required \
information and generate professional cover letter body paragraphs.";

/// Letter extraction prompt template.
/// Replace: {resume_text}, {job_description}, {formatting_rules}
pub const LETTER_PROMPT_TEMPLATE: &str = r#"Here is the resume:

{resume_text}

Here is the job description:

{job_description}

Please extract the following information and generate a personalized cover letter:

Required fields to extract/generate:
- file_name: Generate a suitable filename (e.g., "cover_letter_CompanyName_Position.docx")
- your_name: Extract from resume
- your_address: Extract from resume
- your_email: Extract from resume
- your_phone: Extract from resume
- employer_name: Extract from job description (hiring manager name) or use "Hiring Manager"
- company_name: Extract from job description
- company_address: Extract from job description or use "Company Address"
- position_title: Extract from job description
- body_paragraphs: Generate 3-4 professional cover letter body paragraphs that:
  1. Show enthusiasm for the specific role and company
  2. Highlight relevant experience and skills from the resume that match the job requirements
  3. Demonstrate knowledge of the company/role from the job description
  4. Include specific examples of achievements that align with the job needs

{formatting_rules}

Return the result in this exact JSON format:
{
  "file_name": "cover_letter_example.docx",
  "your_name": "Full Name",
  "your_address": "Complete Address",
  "your_email": "email@example.com",
  "your_phone": "Phone Number",
  "employer_name": "Hiring Manager Name or 'Hiring Manager'",
  "company_name": "Company Name",
  "company_address": "Company Address",
  "position_title": "Job Title",
  "body_paragraphs": [
    "First paragraph expressing interest and mentioning how you learned about the position...",
    "Second paragraph highlighting relevant experience and skills...",
    "Third paragraph demonstrating company knowledge and cultural fit...",
    "Fourth paragraph with call to action and closing..."
  ]
}"#;

pub fn system_prompt() -> String {
    format!("{LETTER_SYSTEM_ROLE}\n\n{JSON_ONLY_INSTRUCTION}")
}

/// Fills the template back to front (the resume slot precedes the job slot), so
/// placeholder-like text inside either document is never substituted.
pub fn user_prompt(resume_text: &str, job_description: &str) -> String {
    LETTER_PROMPT_TEMPLATE
        .replacen("{formatting_rules}", FORMATTING_RULES, 1)
        .replacen("{job_description}", job_description, 1)
        .replacen("{resume_text}", resume_text, 1)
}
