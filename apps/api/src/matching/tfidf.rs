//! TF-IDF vectors over unigrams and bigrams with cosine similarity.
//!
//! Tokens are lowercase runs of two or more word characters; English stop words are
//! dropped before bigrams are formed. Term frequency is sublinear (`1 + ln tf`), IDF is
//! smoothed (`ln((1 + n) / (1 + df)) + 1`) and every vector is L2-normalised.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

pub type SparseVector = HashMap<String, f64>;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
    "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
    "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere",
    "are", "around", "as", "at", "be", "became", "because", "become", "becomes", "been",
    "before", "being", "below", "beside", "besides", "between", "beyond", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "done", "down", "due", "during",
    "each", "eg", "either", "else", "elsewhere", "enough", "etc", "even", "ever", "every",
    "everyone", "everything", "everywhere", "except", "few", "for", "former", "from",
    "further", "had", "has", "have", "he", "hence", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "however", "ie", "if", "in", "indeed", "into", "is", "it",
    "its", "itself", "just", "last", "latter", "least", "less", "many", "may", "me",
    "meanwhile", "might", "more", "moreover", "most", "mostly", "much", "must", "my",
    "myself", "neither", "never", "nevertheless", "next", "no", "nobody", "none", "nor",
    "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only",
    "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over",
    "own", "per", "perhaps", "please", "rather", "re", "same", "seem", "seemed", "seems",
    "several", "she", "should", "since", "so", "some", "somehow", "someone", "something",
    "sometime", "sometimes", "somewhere", "still", "such", "than", "that", "the", "their",
    "them", "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore",
    "these", "they", "this", "those", "though", "through", "throughout", "thus", "to",
    "together", "too", "toward", "towards", "under", "until", "up", "upon", "us", "very",
    "via", "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever",
    "where", "whereas", "whereby", "wherever", "whether", "which", "while", "who",
    "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without",
    "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

fn token_pattern() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("valid regex"))
}

/// Lowercase tokens with stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !stop_words().contains(t))
        .map(str::to_string)
        .collect()
}

/// Unigrams followed by adjacent-token bigrams.
pub fn terms(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let bigrams: Vec<String> = tokens
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect();
    let mut terms = tokens;
    terms.extend(bigrams);
    terms
}

#[derive(Debug, Clone, Default)]
pub struct TfIdfModel {
    idf: HashMap<String, f64>,
}

impl TfIdfModel {
    /// Learns document frequencies from every document's term list.
    pub fn fit(documents: &[Vec<String>]) -> Self {
        let n = documents.len() as f64;
        let mut df: HashMap<&str, usize> = HashMap::new();
        for doc in documents {
            let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
            for term in unique {
                *df.entry(term).or_default() += 1;
            }
        }

        let idf = df
            .into_iter()
            .map(|(term, count)| {
                let weight = ((1.0 + n) / (1.0 + count as f64)).ln() + 1.0;
                (term.to_string(), weight)
            })
            .collect();
        Self { idf }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    /// L2-normalised TF-IDF vector. Terms outside the fitted vocabulary are ignored.
    pub fn vectorize(&self, terms: &[String]) -> SparseVector {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for term in terms {
            *counts.entry(term.as_str()).or_default() += 1;
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .filter_map(|(term, tf)| {
                let idf = self.idf.get(term)?;
                Some((term.to_string(), (1.0 + (tf as f64).ln()) * idf))
            })
            .collect();

        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for weight in vector.values_mut() {
                *weight /= norm;
            }
        }
        vector
    }
}

/// Cosine similarity in `[0, 1]`; zero when either vector is empty.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, w)| large.get(term).map(|v| w * v))
        .sum();
    let norm_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b = b.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        assert_eq!(
            tokenize("We are looking for a Rust engineer, 5+ years in C"),
            vec!["looking", "rust", "engineer", "years"]
        );
    }

    #[test]
    fn test_terms_include_bigrams() {
        assert_eq!(
            terms("machine learning engineer"),
            vec![
                "machine",
                "learning",
                "engineer",
                "machine learning",
                "learning engineer"
            ]
        );
    }

    #[test]
    fn test_identical_documents_have_similarity_one() {
        let docs = vec![terms("rust backend services"), terms("frontend react design")];
        let model = TfIdfModel::fit(&docs);
        let a = model.vectorize(&docs[0]);
        let b = model.vectorize(&terms("rust backend services"));
        assert!((cosine(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_documents_have_similarity_zero() {
        let docs = vec![terms("rust backend"), terms("watercolour painting")];
        let model = TfIdfModel::fit(&docs);
        let a = model.vectorize(&docs[0]);
        let b = model.vectorize(&docs[1]);
        assert_eq!(cosine(&a, &b), 0.0);
    }

    #[test]
    fn test_rare_terms_weigh_more_than_common_ones() {
        let docs = vec![
            terms("team python"),
            terms("team java"),
            terms("team golang"),
        ];
        let model = TfIdfModel::fit(&docs);
        let vector = model.vectorize(&docs[0]);
        assert!(vector["python"] > vector["team"]);
    }

    #[test]
    fn test_vectors_are_unit_length() {
        let docs = vec![terms("rust rust rust tokio axum"), terms("go gin")];
        let model = TfIdfModel::fit(&docs);
        let norm: f64 = model
            .vectorize(&docs[0])
            .values()
            .map(|w| w * w)
            .sum::<f64>()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!(model.vectorize(&[]).is_empty());
    }
}
