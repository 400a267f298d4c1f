// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt fragment for plain comma-separated list output.
pub const LIST_ONLY_SYSTEM: &str = "You are a precise extraction assistant. \
    Respond with a single line of comma-separated values only. \
    Do NOT number the items. \
    Do NOT include any text before or after the list.";
