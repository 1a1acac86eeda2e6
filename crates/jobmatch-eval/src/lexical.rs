//! TF-IDF vectorizer for the lexical baseline.
//!
//! Tokens are lowercase runs of alphanumeric characters, at least two
//! characters long, with English stop words removed. The vocabulary keeps
//! the `max_features` terms with the highest corpus frequency (ties broken
//! alphabetically). Weights are raw term counts times the smoothed inverse
//! document frequency `ln((1 + n) / (1 + df)) + 1`, and every vector is
//! L2-normalised, so the dot product of two vectors is their cosine
//! similarity.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Default vocabulary cap.
pub const DEFAULT_MAX_FEATURES: usize = 5000;

/// English stop-word list used by [`TfIdfVectorizer::fit`].
pub fn english_stop_words() -> HashSet<String> {
    stop_words::get(stop_words::LANGUAGE::English)
        .iter()
        .map(|w| w.to_string())
        .collect()
}

/// Split `text` into normalised tokens.
pub fn tokenize<'a>(
    text: &'a str,
    stop_words: &'a HashSet<String>,
) -> impl Iterator<Item = String> + 'a {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().nth(1).is_some())
        .map(str::to_lowercase)
        .filter(move |t| !stop_words.contains(t))
}

/// Sparse, L2-normalised term-weight vector, sorted by term id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Cosine similarity with another normalised vector.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j, mut sum) = (0, 0, 0.0);
        while i < self.entries.len() && j < other.entries.len() {
            let (a, wa) = self.entries[i];
            let (b, wb) = other.entries[j];
            match a.cmp(&b) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Fitted TF-IDF model.
#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    stop_words: HashSet<String>,
}

impl TfIdfVectorizer {
    /// Fit on `documents` with the English stop-word list.
    pub fn fit<S: AsRef<str>>(documents: &[S], max_features: usize) -> Self {
        Self::fit_with_stop_words(documents, max_features, english_stop_words())
    }

    pub fn fit_with_stop_words<S: AsRef<str>>(
        documents: &[S],
        max_features: usize,
        stop_words: HashSet<String>,
    ) -> Self {
        let mut frequency: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let mut seen = HashSet::new();
            for token in tokenize(doc.as_ref(), &stop_words) {
                *frequency.entry(token.clone()).or_insert(0) += 1;
                if seen.insert(token.clone()) {
                    *document_frequency.entry(token).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = frequency.into_iter().collect();
        ranked.sort_by(|(ta, fa), (tb, fb)| fb.cmp(fa).then_with(|| ta.cmp(tb)));
        ranked.truncate(max_features);

        // Term ids follow alphabetical order.
        let kept: BTreeMap<String, usize> = ranked
            .into_iter()
            .map(|(term, _)| {
                let df = document_frequency.get(&term).copied().unwrap_or(0);
                (term, df)
            })
            .collect();

        let n = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (id, (term, df)) in kept.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, id);
        }

        log::debug!(
            "Fitted TF-IDF on {} document(s), vocabulary {}",
            documents.len(),
            vocabulary.len()
        );
        Self {
            vocabulary,
            idf,
            stop_words,
        }
    }

    /// Number of terms kept.
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Inverse document frequency of `term`, if it is in the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&id| self.idf[id])
    }

    /// Vectorize `text`. Text with no vocabulary terms yields an empty
    /// vector, which scores 0 against everything.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokenize(text, &self.stop_words) {
            if let Some(&id) = self.vocabulary.get(&token) {
                *counts.entry(id).or_insert(0.0) += 1.0;
            }
        }
        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(id, tf)| (id, tf * self.idf[id]))
            .collect();
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }
        SparseVector { entries }
    }
}
