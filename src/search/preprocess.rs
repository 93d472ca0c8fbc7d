//! Query preprocessing for smart search: tokenization, case-splitting,
//! abbreviation expansion, a small stemmer, and a stop-word list.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").unwrap());

/// Case-folded word-boundary tokens, the same shape used to build and
/// query the lexical index.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text).map(|m| m.as_str().to_lowercase()).collect()
}

/// Word-boundary tokens with original casing preserved, needed by
/// [`split_camel_case`] before [`tokenize`] has already folded it away.
fn raw_words(text: &str) -> Vec<String> {
    WORD.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "or", "that", "the", "to", "was", "were", "will", "with",
    ]
    .into_iter()
    .collect()
});

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

pub fn drop_stop_words(words: &[String]) -> Vec<String> {
    words.iter().filter(|w| !is_stop_word(w)).cloned().collect()
}

/// Split `fooBarBaz` into `["foo", "Bar", "Baz"]` at lower→upper and
/// letter→digit boundaries.
pub fn split_camel_case(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = word.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        let boundary = i > 0
            && ((c.is_uppercase() && chars[i - 1].is_lowercase())
                || (c.is_uppercase() && i + 1 < chars.len() && chars[i + 1].is_lowercase() && chars[i - 1].is_uppercase()));
        if boundary && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

pub fn split_snake_or_kebab(word: &str) -> Vec<String> {
    word.split(['_', '-']).filter(|s| !s.is_empty()).map(|s| s.to_string()).collect()
}

/// Common code abbreviations expanded into their full word, so a query
/// for `cfg` also matches documents spelling out `configuration`.
static ABBREVIATIONS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("cfg", "config"),
        ("config", "configuration"),
        ("db", "database"),
        ("auth", "authentication"),
        ("env", "environment"),
        ("impl", "implementation"),
        ("init", "initialize"),
        ("msg", "message"),
        ("pkg", "package"),
        ("repo", "repository"),
        ("req", "request"),
        ("res", "response"),
        ("ctx", "context"),
        ("fn", "function"),
        ("err", "error"),
        ("idx", "index"),
        ("num", "number"),
        ("args", "arguments"),
        ("param", "parameter"),
    ]
});

pub fn expand_abbreviation(word: &str) -> Option<&'static str> {
    ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == word).map(|(_, full)| *full)
}

/// A small rule-based stemmer: strip a handful of common English/code
/// suffixes. Not Porter-complete, just enough to fold `parsing`/`parsed`
/// toward `pars` so near-miss matches survive.
pub fn stem(word: &str) -> String {
    for suffix in ["ational", "ization", "ing", "edly", "ies", "ed", "es", "ly", "s"] {
        if word.len() > suffix.len() + 2 {
            if let Some(stripped) = word.strip_suffix(suffix) {
                return stripped.to_string();
            }
        }
    }
    word.to_string()
}

/// Build the ranked list of query variations a smart search fans out
/// over: the raw tokenization, then progressively more aggressive
/// rewrites (case-split, abbreviation expansion, stemming, stop-word
/// removal). Earlier variations are weighted higher by the caller.
pub fn query_variations(query: &str) -> Vec<Vec<String>> {
    let raw = tokenize(query);
    if raw.is_empty() {
        return Vec::new();
    }

    let mut variations = vec![raw.clone()];

    let mut split: Vec<String> = Vec::new();
    for word in raw_words(query) {
        let camel_parts = split_camel_case(&word);
        for part in camel_parts {
            let snake_parts = split_snake_or_kebab(&part);
            if snake_parts.len() > 1 {
                split.extend(snake_parts);
            } else {
                split.push(part);
            }
        }
    }
    let split: Vec<String> = split.into_iter().map(|s| s.to_lowercase()).collect();
    if !split.is_empty() && split != raw {
        variations.push(split.clone());
    }

    let expanded: Vec<String> = split.iter().map(|w| expand_abbreviation(w).map(str::to_string).unwrap_or_else(|| w.clone())).collect();
    if expanded != split {
        variations.push(expanded);
    }

    let stemmed: Vec<String> = raw.iter().map(|w| stem(w)).collect();
    if stemmed != raw {
        variations.push(stemmed);
    }

    let without_stop_words = drop_stop_words(&raw);
    if !without_stop_words.is_empty() && without_stop_words != raw {
        variations.push(without_stop_words);
    }

    variations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_folds_case_and_splits_on_word_boundaries() {
        assert_eq!(tokenize("Parse_File(x)"), vec!["parse_file", "x"]);
    }

    #[test]
    fn split_camel_case_finds_word_boundaries() {
        assert_eq!(split_camel_case("fooBarBaz"), vec!["foo", "Bar", "Baz"]);
        assert_eq!(split_camel_case("parseHTTPRequest"), vec!["parse", "HTTP", "Request"]);
    }

    #[test]
    fn split_snake_and_kebab_on_separators() {
        assert_eq!(split_snake_or_kebab("max_concurrent_tasks"), vec!["max", "concurrent", "tasks"]);
        assert_eq!(split_snake_or_kebab("dry-run"), vec!["dry", "run"]);
    }

    #[test]
    fn expands_known_abbreviations() {
        assert_eq!(expand_abbreviation("cfg"), Some("config"));
        assert_eq!(expand_abbreviation("nonsense"), None);
    }

    #[test]
    fn stem_strips_common_suffixes() {
        assert_eq!(stem("parsing"), "pars");
        assert_eq!(stem("tokens"), "token");
    }

    #[test]
    fn query_variations_includes_raw_and_never_empty_for_nonempty_query() {
        let variations = query_variations("parseHTTPRequest");
        assert!(!variations.is_empty());
        assert_eq!(variations[0], vec!["parsehttprequest".to_string()]);
    }

    #[test]
    fn query_variations_empty_for_blank_query() {
        assert!(query_variations("   ").is_empty());
    }
}
