//! Static per-model pricing and cost calculation
//!
//! Rates are USD per 1M tokens. The table is immutable and shared by every
//! query; unknown (provider, model) pairs are charged at a deliberately high
//! default rate so that an unpriced model trips the cost guardrail early
//! rather than late.

use super::config::ProviderKind;

/// Input/output rates in USD per 1M tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let cost = (input_tokens as f64 * self.input_per_million
            + output_tokens as f64 * self.output_per_million)
            / 1_000_000.0;
        cost.max(0.0)
    }
}

/// Rate used for models missing from the table
pub const DEFAULT_PRICING: ModelPricing = ModelPricing::new(15.0, 75.0);

const PRICE_TABLE: &[(ProviderKind, &str, ModelPricing)] = &[
    (ProviderKind::OpenAI, "gpt-4o", ModelPricing::new(2.50, 10.00)),
    (ProviderKind::OpenAI, "gpt-4o-mini", ModelPricing::new(0.15, 0.60)),
    (ProviderKind::OpenAI, "gpt-4.1", ModelPricing::new(2.00, 8.00)),
    (ProviderKind::OpenAI, "gpt-4.1-mini", ModelPricing::new(0.40, 1.60)),
    (ProviderKind::OpenAI, "gpt-4.1-nano", ModelPricing::new(0.10, 0.40)),
    (ProviderKind::OpenAI, "gpt-4-turbo", ModelPricing::new(10.00, 30.00)),
    (ProviderKind::Anthropic, "claude-3-5-haiku", ModelPricing::new(0.80, 4.00)),
    (ProviderKind::Anthropic, "claude-3-5-sonnet", ModelPricing::new(3.00, 15.00)),
    (ProviderKind::Anthropic, "claude-3-7-sonnet", ModelPricing::new(3.00, 15.00)),
    (ProviderKind::Anthropic, "claude-sonnet-4", ModelPricing::new(3.00, 15.00)),
    (ProviderKind::Anthropic, "claude-3-opus", ModelPricing::new(15.00, 75.00)),
    (ProviderKind::Anthropic, "claude-opus-4", ModelPricing::new(15.00, 75.00)),
];

/// Look up the rates for a (provider, model) pair.
///
/// A model matches a table entry exactly or as a dated/aliased variant
/// (`claude-3-5-sonnet-20241022`, `claude-3-5-haiku-latest`); the longest
/// matching entry wins so `gpt-4o-mini` is never priced as `gpt-4o`.
pub fn pricing_for(provider: ProviderKind, model: &str) -> ModelPricing {
    PRICE_TABLE
        .iter()
        .filter(|(kind, name, _)| {
            *kind == provider
                && (model == *name
                    || model
                        .strip_prefix(name)
                        .is_some_and(|rest| rest.starts_with('-')))
        })
        .max_by_key(|(_, name, _)| name.len())
        .map(|(_, _, pricing)| *pricing)
        .unwrap_or(DEFAULT_PRICING)
}

/// USD cost of a call: (input * input_rate + output * output_rate) / 1e6
pub fn calculate_cost(
    provider: ProviderKind,
    model: &str,
    input_tokens: u64,
    output_tokens: u64,
) -> f64 {
    pricing_for(provider, model).cost(input_tokens, output_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_tokens_cost_nothing() {
        for provider in [ProviderKind::OpenAI, ProviderKind::Anthropic] {
            for model in ["gpt-4o", "claude-3-5-sonnet", "never-heard-of-it", ""] {
                assert_eq!(calculate_cost(provider, model, 0, 0), 0.0);
            }
        }
    }

    #[test]
    fn test_known_model_cost() {
        // 1M input at 0.15 + 1M output at 0.60
        let cost = calculate_cost(ProviderKind::OpenAI, "gpt-4o-mini", 1_000_000, 1_000_000);
        assert!((cost - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_longest_prefix_wins() {
        assert_eq!(
            pricing_for(ProviderKind::OpenAI, "gpt-4o-mini"),
            ModelPricing::new(0.15, 0.60)
        );
        assert_eq!(
            pricing_for(ProviderKind::OpenAI, "gpt-4o-2024-08-06"),
            ModelPricing::new(2.50, 10.00)
        );
        assert_eq!(
            pricing_for(ProviderKind::Anthropic, "claude-3-5-haiku-latest"),
            ModelPricing::new(0.80, 4.00)
        );
    }

    #[test]
    fn test_unknown_pairs_use_default_rate() {
        assert_eq!(pricing_for(ProviderKind::OpenAI, "o9-preview"), DEFAULT_PRICING);
        // Model names are scoped by provider
        assert_eq!(pricing_for(ProviderKind::Anthropic, "gpt-4o"), DEFAULT_PRICING);
        // A bare prefix without a separator is a different model
        assert_eq!(pricing_for(ProviderKind::OpenAI, "gpt-4oX"), DEFAULT_PRICING);
    }

    #[test]
    fn test_default_rate_is_conservative() {
        for (_, _, pricing) in PRICE_TABLE {
            assert!(DEFAULT_PRICING.input_per_million >= pricing.input_per_million);
            assert!(DEFAULT_PRICING.output_per_million >= pricing.output_per_million);
        }
    }

    #[test]
    fn test_cost_is_never_negative() {
        assert!(calculate_cost(ProviderKind::Anthropic, "claude-3-opus", 12, 34) > 0.0);
        assert!(calculate_cost(ProviderKind::OpenAI, "unknown", u64::MAX, 0) >= 0.0);
    }
}
