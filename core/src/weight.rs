use crate::{DocumentTermMatrix, Triplet, Weighting};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A tidy row with its tf-idf statistics bound alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfIdf {
    pub document: String,
    pub term: String,
    pub value: f64,
    pub tf: f64,
    pub idf: f64,
    pub tf_idf: f64,
}

/// tidytext-style tf-idf over a tidy table: `tf = value / document total`,
/// `idf = ln(documents / documents containing term)`. Input order is kept.
pub fn bind_tf_idf(triplets: &[Triplet]) -> Vec<TfIdf> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    let mut containing: HashMap<&str, HashSet<&str>> = HashMap::new();
    for t in triplets {
        *totals.entry(&t.document).or_insert(0.0) += t.value;
        if t.value != 0.0 {
            containing.entry(&t.term).or_default().insert(&t.document);
        }
    }
    let n_docs = totals.len() as f64;

    triplets
        .iter()
        .map(|t| {
            let total = totals[t.document.as_str()];
            let tf = if total != 0.0 { t.value / total } else { 0.0 };
            let df = containing.get(t.term.as_str()).map_or(0, |d| d.len());
            let idf = if df > 0 { (n_docs / df as f64).ln() } else { 0.0 };
            TfIdf { document: t.document.clone(), term: t.term.clone(), value: t.value, tf, idf, tf_idf: tf * idf }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TfIdfOptions {
    /// Use `ln(1 + N/df)` instead of `ln(N/df)`.
    pub smoothed_idf: bool,
    /// Scale each document row to unit L2 norm.
    pub normalize: bool,
}

impl Default for TfIdfOptions {
    fn default() -> Self { Self { smoothed_idf: false, normalize: true } }
}

/// Log-scaled tf-idf over the matrix: `tf = 1 + ln(raw)` for positive counts,
/// optional cosine normalization per document. Cells that come out as zero
/// (e.g. a term present in every document) are dropped.
pub fn weight_tf_idf(dtm: &DocumentTermMatrix, options: &TfIdfOptions) -> DocumentTermMatrix {
    let n = dtm.n_documents().max(1) as f64;
    let idf: Vec<f64> = dtm
        .document_frequency()
        .into_iter()
        .map(|df_t| {
            let df_t = df_t.max(1) as f64;
            if options.smoothed_idf { (1.0 + n / df_t).ln() } else { (n / df_t).ln() }
        })
        .collect();
    let tf = |raw: f64| if raw > 0.0 { 1.0 + raw.ln() } else { 0.0 };

    let mut weighted = dtm.matrix().map_nonzero(|_, c, raw| tf(raw) * idf[c]);
    if options.normalize {
        let mut norms: Vec<f64> = vec![0.0; weighted.nrows()];
        for (r, _, w) in weighted.iter() {
            norms[r] += w * w;
        }
        for norm in norms.iter_mut() {
            *norm = norm.sqrt();
            if *norm == 0.0 { *norm = 1.0; }
        }
        weighted = weighted.map_nonzero(|r, _, w| w / norms[r]);
    }

    tracing::debug!(documents = dtm.n_documents(), nnz = weighted.nnz(), "applied tf-idf weighting");
    DocumentTermMatrix::from_parts_unchecked(weighted, dtm.documents().to_vec(), dtm.terms().to_vec())
        .with_weighting(Weighting::TfIdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cast_dtm, CastOptions};

    fn approx(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

    #[test]
    fn bind_tf_idf_matches_tidytext_definition() {
        let rows = vec![Triplet::new("a", "cat", 3.0), Triplet::new("a", "dog", 1.0), Triplet::new("b", "cat", 2.0)];
        let out = bind_tf_idf(&rows);
        assert!(approx(out[0].tf, 0.75));
        assert!(approx(out[0].idf, 0.0));
        assert!(approx(out[1].idf, 2f64.ln()));
        assert!(approx(out[1].tf_idf, 0.25 * 2f64.ln()));
        assert!(approx(out[2].tf, 1.0));
    }

    #[test]
    fn weight_drops_ubiquitous_terms_and_normalizes_rows() {
        let rows = vec![Triplet::new("a", "cat", 3.0), Triplet::new("a", "dog", 1.0), Triplet::new("b", "cat", 2.0)];
        let dtm = cast_dtm(rows, &CastOptions::default()).unwrap();
        let w = weight_tf_idf(&dtm, &TfIdfOptions::default());
        assert_eq!(w.weighting(), Weighting::TfIdf);
        // "cat" appears in both documents: idf 0, cell removed
        assert_eq!(w.get("a", "cat"), Some(0.0));
        assert!(approx(w.get("a", "dog").unwrap(), 1.0));
        assert_eq!(w.nnz(), 1);
        assert_eq!(w.documents(), dtm.documents());
    }

    #[test]
    fn smoothed_idf_keeps_ubiquitous_terms() {
        let rows = vec![Triplet::new("a", "cat", 1.0), Triplet::new("b", "cat", 1.0)];
        let dtm = cast_dtm(rows, &CastOptions::default()).unwrap();
        let opts = TfIdfOptions { smoothed_idf: true, normalize: false };
        let w = weight_tf_idf(&dtm, &opts);
        assert!(approx(w.get("a", "cat").unwrap(), 2f64.ln()));
    }
}
