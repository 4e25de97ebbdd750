// Cover letter analysis
// Prompts the model with resume and job description text and turns its reply into
// a validated LetterRecord.

pub mod handlers;
pub mod normalizer;
pub mod prompts;
pub mod record;
