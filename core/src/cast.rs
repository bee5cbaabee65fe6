use crate::matrix::AssembleError;
use crate::{ColumnSpec, DocumentTermMatrix, Error, Result, SparseMatrix, Triplet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// What to do when the same (document, term) pair shows up more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with [`Error::DuplicateKey`].
    #[default]
    Error,
    /// Add the values together.
    Sum,
}

/// Order of row and column labels in the cast matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelOrder {
    /// Order of first occurrence in the input.
    #[default]
    FirstSeen,
    /// Byte-wise lexicographic order.
    Sorted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CastOptions {
    pub duplicates: DuplicatePolicy,
    pub order: LabelOrder,
    /// Fail with [`Error::EmptyInput`] instead of returning a 0x0 matrix.
    pub reject_empty: bool,
}

/// Interns labels and hands out dense indices in first-seen order.
#[derive(Default)]
struct Labels {
    index: HashMap<String, usize>,
    names: Vec<String>,
}

impl Labels {
    fn intern(&mut self, label: String) -> usize {
        if let Some(&i) = self.index.get(&label) {
            return i;
        }
        let i = self.names.len();
        self.index.insert(label.clone(), i);
        self.names.push(label);
        i
    }

    /// Final label list plus a map from interned index to output position.
    fn finish(self, order: LabelOrder) -> (Vec<String>, Vec<usize>) {
        let n = self.names.len();
        match order {
            LabelOrder::FirstSeen => (self.names, (0..n).collect()),
            LabelOrder::Sorted => {
                let mut perm: Vec<usize> = (0..n).collect();
                perm.sort_by(|&a, &b| self.names[a].cmp(&self.names[b]));
                let mut position = vec![0usize; n];
                for (new, &old) in perm.iter().enumerate() {
                    position[old] = new;
                }
                let mut names: Vec<Option<String>> = self.names.into_iter().map(Some).collect();
                let sorted = perm.iter().filter_map(|&old| names[old].take()).collect();
                (sorted, position)
            }
        }
    }
}

/// Cast tidy triplets into a document-term matrix.
///
/// Every distinct document becomes a row and every distinct term a column,
/// including ones whose only values are zero. Zero cells are not stored.
/// Duplicates and label order follow `options`. Either the whole matrix is
/// returned or an error; there are no partial results.
pub fn cast_dtm<I>(triplets: I, options: &CastOptions) -> Result<DocumentTermMatrix>
where
    I: IntoIterator<Item = Triplet>,
{
    let mut documents = Labels::default();
    let mut terms = Labels::default();
    let mut coords = Vec::new();
    for (row, t) in triplets.into_iter().enumerate() {
        if !t.value.is_finite() {
            return Err(Error::Schema { row, message: format!("value must be finite, got {}", t.value) });
        }
        let r = documents.intern(t.document);
        let c = terms.intern(t.term);
        coords.push((r, c, t.value));
    }

    if options.reject_empty && (documents.names.is_empty() || terms.names.is_empty()) {
        return Err(Error::EmptyInput);
    }

    let (documents, row_pos) = documents.finish(options.order);
    let (terms, col_pos) = terms.finish(options.order);
    for coord in coords.iter_mut() {
        coord.0 = row_pos[coord.0];
        coord.1 = col_pos[coord.1];
    }

    let sum = options.duplicates == DuplicatePolicy::Sum;
    let matrix = SparseMatrix::assemble(documents.len(), terms.len(), coords, sum).map_err(|e| match e {
        AssembleError::Duplicate { row, col } => {
            Error::DuplicateKey { document: documents[row].clone(), term: terms[col].clone() }
        }
        AssembleError::NonFinite { entry, row, col } => Error::Schema {
            row: entry,
            message: format!("summed value for ({:?}, {:?}) is not finite", documents[row], terms[col]),
        },
    })?;
    tracing::debug!(documents = documents.len(), terms = terms.len(), nnz = matrix.nnz(), "cast document-term matrix");
    Ok(DocumentTermMatrix::from_parts_unchecked(matrix, documents, terms))
}

/// Validate loosely typed JSON rows against `columns`, then cast them.
pub fn cast_rows<'a, I>(rows: I, columns: &ColumnSpec, options: &CastOptions) -> Result<DocumentTermMatrix>
where
    I: IntoIterator<Item = &'a Value>,
{
    let triplets = columns.parse_rows(rows)?;
    cast_dtm(triplets, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn triplets(rows: &[(&str, &str, f64)]) -> Vec<Triplet> {
        rows.iter().map(|&(d, t, v)| Triplet::new(d, t, v)).collect()
    }

    #[test]
    fn first_seen_order_is_default() {
        let dtm = cast_dtm(triplets(&[("b", "z", 1.0), ("a", "y", 1.0), ("b", "x", 1.0)]), &CastOptions::default()).unwrap();
        assert_eq!(dtm.documents(), &["b".to_string(), "a".to_string()]);
        assert_eq!(dtm.terms(), &["z".to_string(), "y".to_string(), "x".to_string()]);
    }

    #[test]
    fn sorted_order_remaps_cells() {
        let opts = CastOptions { order: LabelOrder::Sorted, ..Default::default() };
        let dtm = cast_dtm(triplets(&[("b", "z", 1.0), ("a", "y", 2.0), ("b", "x", 3.0)]), &opts).unwrap();
        assert_eq!(dtm.documents(), &["a".to_string(), "b".to_string()]);
        assert_eq!(dtm.terms(), &["x".to_string(), "y".to_string(), "z".to_string()]);
        assert_eq!(dtm.get("a", "y"), Some(2.0));
        assert_eq!(dtm.get("b", "x"), Some(3.0));
        assert_eq!(dtm.get("b", "z"), Some(1.0));
        assert_eq!(dtm.matrix().get(0, 1), Some(2.0));
    }

    #[test]
    fn zero_values_keep_labels_but_store_nothing() {
        let dtm = cast_dtm(triplets(&[("a", "x", 0.0), ("b", "y", 1.0)]), &CastOptions::default()).unwrap();
        assert_eq!(dtm.n_documents(), 2);
        assert_eq!(dtm.n_terms(), 2);
        assert_eq!(dtm.nnz(), 1);
    }

    #[test]
    fn summed_duplicates_that_cancel_are_not_stored() {
        let opts = CastOptions { duplicates: DuplicatePolicy::Sum, ..Default::default() };
        let dtm = cast_dtm(triplets(&[("a", "x", 2.0), ("a", "x", -2.0)]), &opts).unwrap();
        assert_eq!(dtm.nnz(), 0);
        assert_eq!(dtm.get("a", "x"), Some(0.0));
    }

    #[test]
    fn non_finite_values_are_schema_errors() {
        let err = cast_dtm(triplets(&[("a", "x", 1.0), ("a", "y", f64::INFINITY)]), &CastOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Schema { row: 1, .. }));
    }

    #[test]
    fn summed_duplicates_must_stay_finite() {
        let opts = CastOptions { duplicates: DuplicatePolicy::Sum, ..Default::default() };
        let rows = triplets(&[("d", "t", 1e308), ("d", "u", 1.0), ("d", "t", 1e308)]);
        let err = cast_dtm(rows, &opts).unwrap_err();
        assert!(matches!(err, Error::Schema { row: 2, .. }), "{err:?}");

        // the same values are fine while they cancel out
        let dtm = cast_dtm(triplets(&[("d", "t", 1e308), ("d", "t", -1e308)]), &opts).unwrap();
        assert_eq!(dtm.get("d", "t"), Some(0.0));
    }

    #[test]
    fn reject_empty_is_opt_in() {
        assert!(cast_dtm(Vec::new(), &CastOptions::default()).is_ok());
        let opts = CastOptions { reject_empty: true, ..Default::default() };
        assert_eq!(cast_dtm(Vec::new(), &opts).unwrap_err(), Error::EmptyInput);
    }

    #[test]
    fn cast_rows_fails_whole_batch_on_bad_row() {
        let rows = vec![
            json!({"document": "a", "term": "x", "value": 1}),
            json!({"document": "a", "value": 1}),
        ];
        let err = cast_rows(&rows, &ColumnSpec::default(), &CastOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Schema { row: 1, .. }));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: CastOptions = serde_json::from_value(json!({"duplicates": "sum"})).unwrap();
        assert_eq!(opts.duplicates, DuplicatePolicy::Sum);
        assert_eq!(opts.order, LabelOrder::FirstSeen);
        assert!(!opts.reject_empty);
    }
}
