//! Token counting and truncation using tiktoken-rs.
//!
//! Encodings are resolved per model name and cached; unrecognized model
//! names fall back to `o200k_base` rather than failing. Truncation keeps
//! the *first* N tokens of the input — callers that want a suffix must
//! slice before calling.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use tiktoken_rs::{get_bpe_from_model, o200k_base, CoreBPE};

/// Cache of resolved encoders, keyed by model name. Building a BPE table
/// is expensive; resolving a model twice must not pay it twice.
static ENCODER_CACHE: OnceLock<RwLock<HashMap<String, Arc<CoreBPE>>>> = OnceLock::new();

fn encoder_cache() -> &'static RwLock<HashMap<String, Arc<CoreBPE>>> {
    ENCODER_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Resolve the encoding for a model, falling back to `o200k_base` for
/// unknown names.
fn encoding_for_model(model: &str) -> Arc<CoreBPE> {
    if let Some(bpe) = encoder_cache()
        .read()
        .expect("encoder cache poisoned")
        .get(model)
    {
        return Arc::clone(bpe);
    }

    let bpe = match get_bpe_from_model(model) {
        Ok(bpe) => Arc::new(bpe),
        Err(_) => {
            tracing::debug!(model, "Unknown model name, falling back to o200k_base");
            Arc::new(o200k_base().expect("o200k_base tables are embedded"))
        }
    };

    encoder_cache()
        .write()
        .expect("encoder cache poisoned")
        .insert(model.to_string(), Arc::clone(&bpe));
    bpe
}

/// Count tokens in `text` using the BPE encoding for `model`.
///
/// Empty text is 0 tokens without touching the encoder.
pub fn count_tokens(text: &str, model: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let bpe = encoding_for_model(model);
    bpe.encode_with_special_tokens(text).len()
}

/// Truncate `text` to at most `max_tokens` tokens.
///
/// Returns the input unchanged when it already fits. Otherwise keeps the
/// first `max_tokens` encoded tokens and decodes them back to text. A
/// token prefix can end inside a multi-byte character; the boundary is
/// backed off until it decodes, so the result's token count is what
/// `count_tokens` says it is — recompute it, don't assume `max_tokens`.
pub fn truncate_to_tokens(text: &str, max_tokens: usize, model: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let bpe = encoding_for_model(model);
    let tokens = bpe.encode_with_special_tokens(text);

    if tokens.len() <= max_tokens {
        return text.to_string();
    }

    let mut end = max_tokens;
    loop {
        if end == 0 {
            return String::new();
        }
        match bpe.decode(tokens[..end].to_vec()) {
            Ok(decoded) => return decoded,
            Err(_) => end -= 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "gpt-4o-mini";

    #[test]
    fn empty_text_is_zero_tokens() {
        assert_eq!(count_tokens("", MODEL), 0);
    }

    #[test]
    fn simple_text_counts() {
        let count = count_tokens("Hello, world!", MODEL);
        assert!(count > 0);
        assert!(count < 10);
    }

    #[test]
    fn unknown_model_falls_back() {
        let known = count_tokens("some prose to count", MODEL);
        let unknown = count_tokens("some prose to count", "not-a-real-model");
        assert!(unknown > 0);
        // Both resolve to o200k-family encodings for this input.
        assert_eq!(known, unknown);
    }

    #[test]
    fn truncate_is_identity_when_under_limit() {
        let text = "A short sentence.";
        let count = count_tokens(text, MODEL);
        assert_eq!(truncate_to_tokens(text, count, MODEL), text);
        assert_eq!(truncate_to_tokens(text, count + 100, MODEL), text);
    }

    #[test]
    fn truncate_empty_text() {
        assert_eq!(truncate_to_tokens("", 10, MODEL), "");
    }

    #[test]
    fn truncate_to_zero_tokens() {
        assert_eq!(truncate_to_tokens("some text here", 0, MODEL), "");
    }

    #[test]
    fn truncated_count_never_exceeds_limit() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(50);
        for n in [1, 5, 17, 100] {
            let truncated = truncate_to_tokens(&text, n, MODEL);
            assert!(
                count_tokens(&truncated, MODEL) <= n,
                "limit {n} violated"
            );
        }
    }

    #[test]
    fn truncation_keeps_prefix_not_suffix() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let truncated = truncate_to_tokens(text, 3, MODEL);
        assert!(text.starts_with(&truncated));
        assert!(truncated.contains("alpha"));
        assert!(!truncated.contains("kappa"));
    }

    #[test]
    fn multibyte_text_truncates_cleanly() {
        let text = "これは長い日本語のテキストです。".repeat(20);
        let truncated = truncate_to_tokens(&text, 10, MODEL);
        // Must be valid UTF-8 (guaranteed by String) and within budget.
        assert!(count_tokens(&truncated, MODEL) <= 10);
        assert!(text.starts_with(&truncated));
    }
}
