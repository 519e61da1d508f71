//! Context-tier packing — fitting candidate context into a token budget.
//!
//! A tier is a labeled, prioritized block of text competing for space in
//! the model's context window. Packing walks tiers from highest priority
//! down, including whole tiers while they fit, truncating the first tier
//! that doesn't, and discarding everything after it. The walk is greedy
//! and deterministic: identical inputs always produce identical outputs.

use crate::tokens::{count_tokens, truncate_to_tokens};
use serde::{Deserialize, Serialize};

/// A labeled slice of candidate context.
///
/// `tokens` is always derived from `content` — tiers are constructed
/// through [`ContextPacker::make_tier`] or rebuilt by the packer after
/// truncation, never patched by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTier {
    /// Display label (e.g. "System Prompt")
    pub label: String,

    /// The text content
    pub content: String,

    /// Token count of `content`
    pub tokens: usize,

    /// Higher priority is kept first. Ties keep input order.
    pub priority: i32,
}

/// The outcome of packing tiers into a budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackResult {
    /// Included tiers, descending by priority, input order on ties
    pub packed: Vec<ContextTier>,

    /// Sum of `tokens` over `packed`; never exceeds the budget
    pub total_tokens: usize,

    /// True only when the *highest-priority* tier itself was truncated —
    /// the budget was too small even for the most important content.
    pub overflow: bool,
}

/// Packs context tiers against a model's BPE encoding.
///
/// Stateless apart from the model name — create one and reuse it; calls
/// are safe to make repeatedly and concurrently.
#[derive(Debug, Clone)]
pub struct ContextPacker {
    model: String,
}

impl ContextPacker {
    /// Create a packer for the given model's encoding.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    /// Build a tier with its token count derived from the content.
    pub fn make_tier(
        &self,
        label: impl Into<String>,
        content: impl Into<String>,
        priority: i32,
    ) -> ContextTier {
        let content = content.into();
        let tokens = count_tokens(&content, &self.model);
        ContextTier {
            label: label.into(),
            content,
            tokens,
            priority,
        }
    }

    /// Pack tiers into `max_tokens`, reporting totals and overflow.
    ///
    /// Algorithm:
    /// 1. Stable-sort descending by priority.
    /// 2. If everything fits, return all tiers unchanged.
    /// 3. Otherwise walk in priority order: include whole tiers while
    ///    they fit; truncate the first that doesn't and stop — lower
    ///    priority tiers are not considered even if decode rounding left
    ///    slack in the budget.
    ///
    /// `overflow` is true iff the highest-priority tier was the one
    /// truncated. Total function: every input, including an empty tier
    /// list or a zero budget, has a defined output.
    pub fn pack_context(&self, tiers: &[ContextTier], max_tokens: usize) -> PackResult {
        let (packed, total_tokens, overflow) = self.pack_walk(tiers, max_tokens);
        PackResult {
            packed,
            total_tokens,
            overflow,
        }
    }

    /// Coarser variant of [`pack_context`](Self::pack_context) for
    /// callers that only need the final tier list.
    ///
    /// Makes byte-for-byte the same inclusion and truncation decisions;
    /// only the returned metadata differs.
    pub fn compress_to_fit(&self, tiers: &[ContextTier], max_tokens: usize) -> Vec<ContextTier> {
        self.pack_walk(tiers, max_tokens).0
    }

    /// The shared walk behind both public operations.
    fn pack_walk(
        &self,
        tiers: &[ContextTier],
        max_tokens: usize,
    ) -> (Vec<ContextTier>, usize, bool) {
        if tiers.is_empty() {
            return (Vec::new(), 0, false);
        }

        let mut sorted: Vec<ContextTier> = tiers.to_vec();
        // Stable sort: equal priorities keep their input order.
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));

        let total: usize = sorted.iter().map(|t| t.tokens).sum();
        if total <= max_tokens {
            return (sorted, total, false);
        }

        let mut packed = Vec::new();
        let mut used = 0usize;
        let mut overflow = false;

        for (i, tier) in sorted.into_iter().enumerate() {
            let remaining = max_tokens - used;

            if tier.tokens <= remaining {
                used += tier.tokens;
                packed.push(tier);
            } else if remaining > 0 {
                let truncated_content = truncate_to_tokens(&tier.content, remaining, &self.model);
                // Decoding a token prefix can land short of `remaining`;
                // the recount is the authoritative size.
                let actual = count_tokens(&truncated_content, &self.model);

                if actual > 0 {
                    used += actual;
                    packed.push(ContextTier {
                        label: tier.label,
                        content: truncated_content,
                        tokens: actual,
                        priority: tier.priority,
                    });
                }

                if i == 0 {
                    overflow = true;
                }

                tracing::debug!(
                    used,
                    budget = max_tokens,
                    overflow,
                    "Budget exhausted, dropping lower-priority tiers"
                );
                break;
            } else {
                // Exactly at budget: this tier and everything below is out.
                break;
            }
        }

        (packed, used, overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "gpt-4o-mini";

    fn packer() -> ContextPacker {
        ContextPacker::new(MODEL)
    }

    /// Prose long enough that every tier has a healthy token count.
    fn prose(sentence: &str, repeats: usize) -> String {
        sentence.repeat(repeats)
    }

    #[test]
    fn make_tier_derives_token_count() {
        let p = packer();
        let tier = p.make_tier("System Prompt", "You are a careful novelist.", 100);
        assert_eq!(tier.label, "System Prompt");
        assert_eq!(tier.priority, 100);
        assert_eq!(tier.tokens, count_tokens(&tier.content, MODEL));
        assert!(tier.tokens > 0);
    }

    #[test]
    fn make_tier_empty_content() {
        let tier = packer().make_tier("Empty", "", 50);
        assert_eq!(tier.tokens, 0);
    }

    #[test]
    fn empty_tier_list_is_empty_result() {
        let result = packer().pack_context(&[], 100);
        assert!(result.packed.is_empty());
        assert_eq!(result.total_tokens, 0);
        assert!(!result.overflow);
    }

    #[test]
    fn under_budget_returns_all_tiers_unchanged() {
        let p = packer();
        let tiers = vec![
            p.make_tier("System", "System prompt text", 100),
            p.make_tier("Recent", "Recent story text", 90),
            p.make_tier("History", "Older story text", 50),
        ];
        let total: usize = tiers.iter().map(|t| t.tokens).sum();

        let result = p.pack_context(&tiers, total + 100);
        assert_eq!(result.packed.len(), 3);
        assert_eq!(result.total_tokens, total);
        assert!(!result.overflow);
        for (packed, original) in result.packed.iter().zip(&tiers) {
            assert_eq!(packed, original);
        }
    }

    #[test]
    fn sorts_by_priority_descending() {
        let p = packer();
        let tiers = vec![
            p.make_tier("Low", "low priority", 30),
            p.make_tier("High", "high priority", 100),
            p.make_tier("Medium", "medium priority", 70),
        ];

        let result = p.pack_context(&tiers, 10_000);
        let labels: Vec<&str> = result.packed.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["High", "Medium", "Low"]);
    }

    #[test]
    fn equal_priorities_keep_input_order() {
        let p = packer();
        let tiers = vec![
            p.make_tier("First", "first text", 50),
            p.make_tier("Second", "second text", 50),
            p.make_tier("Third", "third text", 50),
        ];

        let result = p.pack_context(&tiers, 10_000);
        let labels: Vec<&str> = result.packed.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["First", "Second", "Third"]);
    }

    #[test]
    fn middle_tier_truncated_lower_tier_absent() {
        // Mirrors: A fits whole, B truncated to the remainder, C absent.
        let p = packer();
        let a = p.make_tier("A", prose("The keep stood on the hill. ", 4), 100);
        let b = p.make_tier("B", prose("Rain fell over the valley all night. ", 6), 90);
        let c = p.make_tier("C", prose("Long ago the river ran dry. ", 8), 50);

        // Budget: all of A plus roughly half of B.
        let budget = a.tokens + b.tokens / 2;
        let result = p.pack_context(&[a.clone(), b.clone(), c], budget);

        assert_eq!(result.packed.len(), 2);
        assert_eq!(result.packed[0], a);
        assert_eq!(result.packed[1].label, "B");
        assert!(result.packed[1].tokens < b.tokens);
        assert!(result.total_tokens <= budget);
        assert!(!result.overflow, "only the top tier sets overflow");
        assert!(!result.packed.iter().any(|t| t.label == "C"));
    }

    #[test]
    fn top_tier_truncation_sets_overflow() {
        let p = packer();
        let tier = p.make_tier("System", prose("An overly long system prompt. ", 20), 100);
        assert!(tier.tokens > 10);

        let result = p.pack_context(std::slice::from_ref(&tier), 10);
        assert!(result.overflow);
        assert_eq!(result.packed.len(), 1);
        assert!(result.packed[0].tokens <= 10);
        assert!(result.total_tokens <= 10);
    }

    #[test]
    fn zero_budget_packs_nothing() {
        let p = packer();
        let tiers = vec![p.make_tier("System", "some content", 100)];
        let result = p.pack_context(&tiers, 0);
        assert!(result.packed.is_empty());
        assert_eq!(result.total_tokens, 0);
    }

    #[test]
    fn budget_is_never_exceeded() {
        let p = packer();
        let tiers = vec![
            p.make_tier("A", prose("First block of story context. ", 10), 100),
            p.make_tier("B", prose("Second block of story context. ", 10), 90),
            p.make_tier("C", prose("Third block of story context. ", 10), 80),
        ];

        for budget in [0, 1, 7, 25, 60, 150, 10_000] {
            let result = p.pack_context(&tiers, budget);
            assert!(
                result.total_tokens <= budget,
                "budget {budget} exceeded: {}",
                result.total_tokens
            );
            let sum: usize = result.packed.iter().map(|t| t.tokens).sum();
            assert_eq!(sum, result.total_tokens);
        }
    }

    #[test]
    fn truncated_tier_input_is_not_mutated() {
        let p = packer();
        let tier = p.make_tier("System", prose("Immutable input content. ", 20), 100);
        let original = tier.clone();

        let _ = p.pack_context(std::slice::from_ref(&tier), 5);
        assert_eq!(tier, original);
    }

    #[test]
    fn no_tiers_after_truncation_point() {
        // Even if decode rounding leaves slack, the walk stops at the
        // first truncated tier.
        let p = packer();
        let a = p.make_tier("A", prose("Alpha content for the packer. ", 12), 100);
        let b = p.make_tier("B", "tiny", 90);

        let budget = a.tokens - 3;
        let result = p.pack_context(&[a, b.clone()], budget);

        assert!(result.packed.iter().all(|t| t.label != "B"));
        assert!(result.overflow);
    }

    #[test]
    fn compress_to_fit_agrees_with_pack_context() {
        let p = packer();
        let tiers = vec![
            p.make_tier("System", prose("System prompt for the story. ", 6), 100),
            p.make_tier("Recent", prose("The most recent passage of text. ", 9), 90),
            p.make_tier("History", prose("Everything that came before it. ", 14), 50),
        ];

        for budget in [0, 10, 35, 80, 500] {
            let packed = p.pack_context(&tiers, budget);
            let compressed = p.compress_to_fit(&tiers, budget);

            assert_eq!(packed.packed.len(), compressed.len(), "budget {budget}");
            for (a, b) in packed.packed.iter().zip(&compressed) {
                assert_eq!(a.label, b.label);
                assert_eq!(a.content, b.content);
                assert_eq!(a.tokens, b.tokens);
            }
        }
    }

    #[test]
    fn compress_to_fit_empty_input() {
        assert!(packer().compress_to_fit(&[], 100).is_empty());
    }

    #[test]
    fn packing_is_deterministic() {
        let p = packer();
        let tiers = vec![
            p.make_tier("A", prose("Some repeating story text. ", 8), 100),
            p.make_tier("B", prose("More repeating story text. ", 8), 90),
        ];
        let budget = tiers[0].tokens + 3;

        let first = p.pack_context(&tiers, budget);
        let second = p.pack_context(&tiers, budget);
        assert_eq!(first.packed, second.packed);
        assert_eq!(first.total_tokens, second.total_tokens);
        assert_eq!(first.overflow, second.overflow);
    }
}
