//! Registry of the OpenRouter models the bot is allowed to use.

/// One selectable backend model.
pub struct SupportedModel {
    /// Identifier sent to the completion API.
    pub id: &'static str,
    /// Human-readable label shown in `/models`.
    pub label: &'static str,
}

/// All models users may select with `/model`.
pub const SUPPORTED_MODELS: &[SupportedModel] = &[
    SupportedModel { id: "claude-instant-1", label: "Claude Instant, Anthropic" },
    SupportedModel { id: "gemini-pro", label: "Gemini Pro, Google" },
    SupportedModel { id: "mistral-7b-instruct", label: "Mistral 7B" },
    SupportedModel { id: "llama2-70b", label: "Llama 2 70B" },
    SupportedModel { id: "j2-light", label: "J2-Light" },
];

/// Model used for users who never ran `/model`.
pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Look up a model id and return the registry's canonical string.
pub fn canonical(id: &str) -> Option<&'static str> {
    SUPPORTED_MODELS.iter().find(|m| m.id == id).map(|m| m.id)
}

pub fn is_valid(id: &str) -> bool {
    canonical(id).is_some()
}
