// Prompt fragments shared by every module that talks to the model.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_INSTRUCTION: &str = "IMPORTANT: Always return your response as valid JSON \
    format with the exact structure requested. Do not include any markdown formatting or \
    code blocks - just pure JSON.";

/// Punctuation rules appended to every prompt that asks for prose.
pub const FORMATTING_RULES: &str = "IMPORTANT FORMATTING RULES:
- Do NOT use em dashes (\u{2014}) anywhere in the text
- Use regular hyphens (-) for compound words and ranges
- Use commas, periods, and semicolons for punctuation
- Keep sentences clear and professional without special characters
- Use standard business letter formatting and language";
