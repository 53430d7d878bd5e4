//! Per-request cost estimates

/// USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input: f64,
    pub output: f64,
}

const OPENROUTER: Pricing = Pricing { input: 1.0, output: 1.0 };
const FALLBACK: Pricing = Pricing { input: 1.0, output: 2.0 };

/// Price list for a provider and exact model name
pub fn pricing(provider: &str, model: &str) -> Pricing {
    let listed = match (provider, model) {
        ("anthropic-direct", "claude-3-5-sonnet") => Some((3.0, 15.0)),
        ("anthropic-direct", "claude-3-haiku") => Some((0.25, 1.25)),
        ("anthropic-direct", "claude-3-opus") => Some((15.0, 75.0)),
        ("openai-direct", "gpt-4o") => Some((2.5, 10.0)),
        ("openai-direct", "gpt-4o-mini") => Some((0.15, 0.60)),
        ("openai-direct", "gpt-4-turbo") => Some((10.0, 30.0)),
        ("z-ai-pro", "glm-4-plus") => Some((0.5, 0.5)),
        ("z-ai-pro", "glm-4") => Some((0.1, 0.1)),
        _ => None,
    };

    match listed {
        Some((input, output)) => Pricing { input, output },
        None if provider == "openrouter" => OPENROUTER,
        None => FALLBACK,
    }
}

/// Estimated USD cost of one completion
#[allow(clippy::cast_precision_loss)]
pub fn estimate_cost(provider: &str, model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let price = pricing(provider, model);

    (prompt_tokens as f64 / 1_000_000.0) * price.input + (completion_tokens as f64 / 1_000_000.0) * price.output
}
