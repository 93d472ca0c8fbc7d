//! Incremental BM25+TF-IDF hybrid lexical search over a `doc_key →
//! content` map.
//!
//! Deliberately hand-rolled rather than built on `tantivy`: the index
//! here is small (source file bodies, not a general document store), and
//! needs synchronous, fine-grained `update_document`/`remove_document`
//! that react to a single file changing, not batch commits.

mod preprocess;

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};

#[derive(Debug, Clone, Default)]
struct DocStats {
    tokens: Vec<String>,
    length: usize,
    term_counts: HashMap<String, usize>,
}

/// A BM25+TF-IDF hybrid index over a fixed document-key space. Every
/// public method that touches the index takes `&self`/`&mut self`
/// directly; the `async` entry points exist so a caller can run build or
/// query work on a blocking pool without stalling an executor, not
/// because the scoring itself suspends.
#[derive(Debug)]
pub struct LexicalIndex {
    k1: f64,
    b: f64,
    candidate_threshold: usize,
    worker_count: usize,

    doc_stats: HashMap<String, DocStats>,
    doc_contents: HashMap<String, String>,
    inverted_index: HashMap<String, BTreeSet<String>>,
    idf: HashMap<String, f64>,
    avg_doc_length: f64,
    built: bool,
}

impl LexicalIndex {
    pub fn new(settings: &SearchConfig) -> Self {
        Self {
            k1: settings.k1,
            b: settings.b,
            candidate_threshold: settings.candidate_threshold,
            worker_count: settings.worker_count.max(1),
            doc_stats: HashMap::new(),
            doc_contents: HashMap::new(),
            inverted_index: HashMap::new(),
            idf: HashMap::new(),
            avg_doc_length: 0.0,
            built: false,
        }
    }

    /// Tokenize every document in chunks sized `docs / worker_count` on
    /// `rayon`'s pool (via `spawn_blocking`, so an async caller never
    /// blocks its own executor thread), then merge the per-chunk output
    /// into the index's global structures.
    pub async fn build(&mut self, documents: HashMap<String, String>) -> SearchResult<()> {
        let chunk_size = (documents.len() / self.worker_count).max(1);
        let entries: Vec<(String, String)> = documents.into_iter().collect();

        let chunks: Vec<Vec<(String, String)>> = entries.chunks(chunk_size).map(|c| c.to_vec()).collect();
        let results = tokio::task::spawn_blocking(move || {
            use rayon::prelude::*;
            chunks.into_par_iter().map(tokenize_chunk).collect::<Vec<_>>()
        })
        .await
        .map_err(|e| SearchError::IndexWrite { reason: e.to_string() })?;

        self.doc_stats.clear();
        self.doc_contents.clear();
        self.inverted_index.clear();

        for chunk in results {
            for (key, content, stats) in chunk {
                for term in stats.term_counts.keys() {
                    self.inverted_index.entry(term.clone()).or_default().insert(key.clone());
                }
                self.doc_contents.insert(key.clone(), content);
                self.doc_stats.insert(key, stats);
            }
        }

        self.recompute_idf();
        self.recompute_avg_doc_length();
        self.built = true;
        Ok(())
    }

    fn recompute_idf(&mut self) {
        let n = self.doc_stats.len().max(1) as f64;
        self.idf = self
            .inverted_index
            .iter()
            .map(|(term, docs)| (term.clone(), (n / docs.len().max(1) as f64).ln()))
            .collect();
    }

    fn recompute_avg_doc_length(&mut self) {
        if self.doc_stats.is_empty() {
            self.avg_doc_length = 0.0;
            return;
        }
        let total: usize = self.doc_stats.values().map(|s| s.length).sum();
        self.avg_doc_length = total as f64 / self.doc_stats.len() as f64;
    }

    /// Recompute every term's IDF from current inverted-set sizes.
    /// `update_document`/`remove_document` can let per-term IDFs drift
    /// slightly out of date between calls; this brings them current.
    pub fn incremental_rebuild(&mut self) {
        self.recompute_idf();
        self.recompute_avg_doc_length();
    }

    /// Insert or replace one document's contribution to the index.
    pub fn update_document(&mut self, key: impl Into<String>, content: impl Into<String>) {
        let key = key.into();
        let content = content.into();

        if self.doc_stats.contains_key(&key) {
            self.purge_document(&key);
        }

        let tokens = preprocess::tokenize(&content);
        let mut term_counts = HashMap::new();
        for token in &tokens {
            *term_counts.entry(token.clone()).or_insert(0) += 1;
        }
        for term in term_counts.keys() {
            self.inverted_index.entry(term.clone()).or_default().insert(key.clone());
            self.idf.entry(term.clone()).or_insert_with(|| {
                let n = (self.doc_stats.len() + 1).max(1) as f64;
                (n / self.inverted_index[term].len().max(1) as f64).ln()
            });
        }

        let stats = DocStats { length: tokens.len(), tokens, term_counts };
        self.doc_stats.insert(key.clone(), stats);
        self.doc_contents.insert(key, content);
        self.recompute_avg_doc_length();
        self.built = true;
    }

    pub fn remove_document(&mut self, key: &str) {
        self.purge_document(key);
        self.doc_contents.remove(key);
        self.recompute_avg_doc_length();
    }

    fn purge_document(&mut self, key: &str) {
        let Some(stats) = self.doc_stats.remove(key) else { return };
        for term in stats.term_counts.keys() {
            if let Some(docs) = self.inverted_index.get_mut(term) {
                docs.remove(key);
                if docs.is_empty() {
                    self.inverted_index.remove(term);
                    self.idf.remove(term);
                }
            }
        }
    }

    fn tf(&self, key: &str, term: &str) -> f64 {
        let Some(stats) = self.doc_stats.get(key) else { return 0.0 };
        if stats.length == 0 {
            return 0.0;
        }
        *stats.term_counts.get(term).unwrap_or(&0) as f64 / stats.length as f64
    }

    /// BM25+TF-IDF hybrid score for one candidate against a query's term
    /// counts: `0.7 * bm25 + 0.3 * tfidf`.
    fn score_candidate(&self, key: &str, query_term_counts: &HashMap<String, usize>) -> f64 {
        let Some(stats) = self.doc_stats.get(key) else { return 0.0 };
        let len = stats.length as f64;
        let avg_len = self.avg_doc_length.max(1.0);

        let mut bm25 = 0.0;
        let mut tfidf = 0.0;
        for (term, &qtc) in query_term_counts {
            let Some(&idf) = self.idf.get(term) else { continue };
            let tf_raw = *stats.term_counts.get(term).unwrap_or(&0) as f64;
            if tf_raw == 0.0 {
                continue;
            }
            let denom = tf_raw + self.k1 * (1.0 - self.b + self.b * len / avg_len);
            bm25 += idf * (tf_raw * (self.k1 + 1.0)) / denom;
            tfidf += self.tf(key, term) * idf * qtc as f64;
        }
        0.7 * bm25 + 0.3 * tfidf
    }

    /// Score a raw query against the index and return the top `k`
    /// `(doc_key, score)` pairs, descending. Scores candidates in
    /// parallel chunks once the candidate set exceeds
    /// `settings.search.candidate_threshold`.
    pub async fn query(&self, query: &str, top_k: usize) -> SearchResult<Vec<(String, f64)>> {
        if !self.built {
            return Err(SearchError::IndexNotReady);
        }
        let tokens = preprocess::tokenize(query);
        if tokens.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let mut query_term_counts: HashMap<String, usize> = HashMap::new();
        for token in &tokens {
            *query_term_counts.entry(token.clone()).or_insert(0) += 1;
        }

        let mut candidates: HashSet<String> = HashSet::new();
        for term in query_term_counts.keys() {
            if let Some(docs) = self.inverted_index.get(term) {
                candidates.extend(docs.iter().cloned());
            }
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let candidate_list: Vec<String> = candidates.into_iter().collect();
        let scored: Vec<(String, f64)> = if candidate_list.len() > self.candidate_threshold {
            use rayon::prelude::*;
            candidate_list.par_iter().map(|key| (key.clone(), self.score_candidate(key, &query_term_counts))).collect()
        } else {
            candidate_list.iter().map(|key| (key.clone(), self.score_candidate(key, &query_term_counts))).collect()
        };

        Ok(top_k_by_score(scored, top_k))
    }

    /// Case-folded substring occurrence count per document, normalized by
    /// `count / (len + 1)`, descending, top `k`.
    pub async fn search_exact(&self, query: &str, top_k: usize) -> SearchResult<Vec<(String, f64)>> {
        if !self.built {
            return Err(SearchError::IndexNotReady);
        }
        let needle = query.to_lowercase();
        if needle.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let scored: Vec<(String, f64)> = self
            .doc_contents
            .iter()
            .map(|(key, content)| {
                let haystack = content.to_lowercase();
                let count = haystack.matches(needle.as_str()).count();
                let len = self.doc_stats.get(key).map(|s| s.length).unwrap_or(0);
                (key.clone(), count as f64 / (len as f64 + 1.0))
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();

        Ok(top_k_by_score(scored, top_k))
    }

    /// Fan out a raw query across preprocessing variations (camelCase
    /// split, snake/kebab split, abbreviation expansion, stemming,
    /// stop-word removal) plus an exact-substring pass, and fuse the
    /// results: `score = Σ_i (score_i · weight_i) / appearance_count`,
    /// where variation `i` is weighted `1/(i+1)` and an exact match adds
    /// `score · exact_match_boost`.
    pub async fn smart_search(&self, query: &str, top_k: usize, exact_match_boost: f64) -> SearchResult<Vec<(String, f64)>> {
        let variations = preprocess::query_variations(query);
        if variations.is_empty() {
            return Ok(Vec::new());
        }

        let mut fused: HashMap<String, f64> = HashMap::new();
        let mut appearances: HashMap<String, usize> = HashMap::new();

        for (i, variation) in variations.iter().enumerate() {
            let joined = variation.join(" ");
            let weight = 1.0 / (i as f64 + 1.0);
            let Ok(results) = self.query(&joined, top_k.max(20)).await else { continue };
            for (key, score) in results {
                *fused.entry(key.clone()).or_insert(0.0) += score * weight;
                *appearances.entry(key).or_insert(0) += 1;
            }
        }

        if let Ok(exact) = self.search_exact(query, top_k.max(20)).await {
            for (key, score) in exact {
                *fused.entry(key.clone()).or_insert(0.0) += score * exact_match_boost;
                appearances.entry(key).or_insert(1);
            }
        }

        let scored: Vec<(String, f64)> =
            fused.into_iter().map(|(key, total)| {
                let count = *appearances.get(&key).unwrap_or(&1) as f64;
                (key, total / count.max(1.0))
            }).collect();

        Ok(top_k_by_score(scored, top_k))
    }
}

fn tokenize_chunk(chunk: Vec<(String, String)>) -> Vec<(String, String, DocStats)> {
    chunk
        .into_iter()
        .map(|(key, content)| {
            let tokens = preprocess::tokenize(&content);
            let mut term_counts = HashMap::new();
            for token in &tokens {
                *term_counts.entry(token.clone()).or_insert(0) += 1;
            }
            let stats = DocStats { length: tokens.len(), tokens, term_counts };
            (key, content, stats)
        })
        .collect()
}

/// Select the top `k` entries by score, descending, breaking ties by key
/// for determinism. Uses a bounded max-heap-style partial sort rather
/// than a full sort when the candidate set is much larger than `k`.
fn top_k_by_score(mut scored: Vec<(String, f64)>, top_k: usize) -> Vec<(String, f64)> {
    if scored.len() > top_k.saturating_mul(4).max(64) {
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(top_k);
        return scored;
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SearchConfig {
        crate::config::Settings::default().search
    }

    fn sample_docs() -> HashMap<String, String> {
        let mut docs = HashMap::new();
        docs.insert("a.py".to_string(), "def parse_config(path): return load(path)".to_string());
        docs.insert("b.py".to_string(), "def connect_database(url): return Database(url)".to_string());
        docs.insert("c.py".to_string(), "class Widget: pass".to_string());
        docs
    }

    #[tokio::test]
    async fn query_before_build_errors() {
        let index = LexicalIndex::new(&settings());
        let err = index.query("parse", 5).await;
        assert!(matches!(err, Err(SearchError::IndexNotReady)));
    }

    #[tokio::test]
    async fn query_ranks_matching_document_first() {
        let mut index = LexicalIndex::new(&settings());
        index.build(sample_docs()).await.unwrap();

        let results = index.query("parse config", 5).await.unwrap();
        assert_eq!(results[0].0, "a.py");
    }

    #[tokio::test]
    async fn empty_query_errors() {
        let mut index = LexicalIndex::new(&settings());
        index.build(sample_docs()).await.unwrap();
        let err = index.query("   ", 5).await;
        assert!(matches!(err, Err(SearchError::EmptyQuery)));
    }

    #[tokio::test]
    async fn update_document_makes_new_content_searchable() {
        let mut index = LexicalIndex::new(&settings());
        index.build(sample_docs()).await.unwrap();
        index.update_document("d.py", "def unique_marker_term(): pass");

        let results = index.query("unique_marker_term", 5).await.unwrap();
        assert_eq!(results[0].0, "d.py");
    }

    #[tokio::test]
    async fn remove_document_drops_it_from_results() {
        let mut index = LexicalIndex::new(&settings());
        index.build(sample_docs()).await.unwrap();
        index.remove_document("a.py");

        let results = index.query("parse config", 5).await.unwrap();
        assert!(!results.iter().any(|(key, _)| key == "a.py"));
    }

    #[tokio::test]
    async fn smart_search_matches_camel_case_query_against_snake_case_document() {
        let mut index = LexicalIndex::new(&settings());
        index.build(sample_docs()).await.unwrap();

        let results = index.smart_search("parseConfig", 5, 0.5).await.unwrap();
        assert!(results.iter().any(|(key, _)| key == "a.py"));
    }

    #[tokio::test]
    async fn exact_search_scores_by_occurrence_count() {
        let mut index = LexicalIndex::new(&settings());
        index.build(sample_docs()).await.unwrap();

        let results = index.search_exact("database", 5).await.unwrap();
        assert_eq!(results[0].0, "b.py");
    }
}
