use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Raw compressed-sparse-row arrays, as exchanged with other numeric code
/// and as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrParts {
    pub nrows: usize,
    pub ncols: usize,
    pub row_ptr: Vec<usize>,
    pub col_idx: Vec<usize>,
    pub values: Vec<f64>,
}

/// Sparse matrix in compressed sparse row (CSR) layout.
///
/// Row `r` owns `col_idx[row_ptr[r]..row_ptr[r + 1]]` and the matching slice
/// of `values`; column indices are strictly increasing inside a row. Memory is
/// proportional to the stored entries plus the row count. Matrices assembled
/// from triplets never store zeros; matrices built with [`SparseMatrix::from_csr_parts`]
/// may, and every consumer in this crate treats a stored zero as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CsrParts", into = "CsrParts")]
pub struct SparseMatrix {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl TryFrom<CsrParts> for SparseMatrix {
    type Error = Error;
    fn try_from(p: CsrParts) -> Result<Self> {
        Self::from_csr_parts(p.nrows, p.ncols, p.row_ptr, p.col_idx, p.values)
    }
}

impl From<SparseMatrix> for CsrParts {
    fn from(m: SparseMatrix) -> Self {
        CsrParts { nrows: m.nrows, ncols: m.ncols, row_ptr: m.row_ptr, col_idx: m.col_idx, values: m.values }
    }
}

impl SparseMatrix {
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self { nrows, ncols, row_ptr: vec![0; nrows + 1], col_idx: Vec::new(), values: Vec::new() }
    }

    /// Adopt CSR arrays produced elsewhere after checking their structure.
    pub fn from_csr_parts(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if row_ptr.len().checked_sub(1) != Some(nrows) {
            return Err(Error::Shape(format!("row_ptr has length {} for {nrows} rows", row_ptr.len())));
        }
        if col_idx.len() != values.len() {
            return Err(Error::Shape(format!(
                "col_idx has {} entries but values has {}",
                col_idx.len(),
                values.len()
            )));
        }
        if row_ptr[0] != 0 || row_ptr[nrows] != col_idx.len() {
            return Err(Error::Shape("row_ptr must start at 0 and end at the entry count".into()));
        }
        for r in 0..nrows {
            let (start, end) = (row_ptr[r], row_ptr[r + 1]);
            if start > end || end > col_idx.len() {
                return Err(Error::Shape(format!("row_ptr is not monotone at row {r}")));
            }
            let cols = &col_idx[start..end];
            if let Some(&c) = cols.iter().find(|&&c| c >= ncols) {
                return Err(Error::Shape(format!("column index {c} out of bounds in row {r} ({ncols} columns)")));
            }
            if cols.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::Shape(format!("column indices of row {r} are not strictly increasing")));
            }
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(Error::Shape(format!("non-finite stored value {v}")));
        }
        Ok(Self { nrows, ncols, row_ptr, col_idx, values })
    }

    /// Build from (row, col, value) coordinates. Duplicate coordinates are
    /// rejected and zero values are not stored.
    pub fn from_triplets<I>(nrows: usize, ncols: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut coords = Vec::new();
        for (r, c, v) in entries {
            if r >= nrows || c >= ncols {
                return Err(Error::Shape(format!("entry ({r}, {c}) outside a {nrows}x{ncols} matrix")));
            }
            if !v.is_finite() {
                return Err(Error::Shape(format!("non-finite value {v} at ({r}, {c})")));
            }
            coords.push((r, c, v));
        }
        Self::assemble(nrows, ncols, coords, false).map_err(|e| match e {
            AssembleError::Duplicate { row, col } => Error::Shape(format!("duplicate entry at ({row}, {col})")),
            AssembleError::NonFinite { row, col, .. } => Error::Shape(format!("non-finite sum at ({row}, {col})")),
        })
    }

    /// Sort coordinates into CSR. On a repeated coordinate either sum or
    /// report it, depending on `sum_duplicates`. Indices must be in bounds.
    pub(crate) fn assemble(
        nrows: usize,
        ncols: usize,
        coords: Vec<(usize, usize, f64)>,
        sum_duplicates: bool,
    ) -> std::result::Result<Self, AssembleError> {
        // stable sort keeps repeated coordinates in input order
        let mut keyed: Vec<(usize, usize, f64, usize)> =
            coords.into_iter().enumerate().map(|(i, (r, c, v))| (r, c, v, i)).collect();
        keyed.sort_by_key(|&(r, c, _, _)| (r, c));
        let mut merged: Vec<(usize, usize, f64)> = Vec::with_capacity(keyed.len());
        for (r, c, v, entry) in keyed {
            match merged.last_mut() {
                Some(last) if last.0 == r && last.1 == c => {
                    if !sum_duplicates {
                        return Err(AssembleError::Duplicate { row: r, col: c });
                    }
                    last.2 += v;
                    if !last.2.is_finite() {
                        return Err(AssembleError::NonFinite { entry, row: r, col: c });
                    }
                }
                _ => merged.push((r, c, v)),
            }
        }

        let mut row_ptr = vec![0usize; nrows + 1];
        let mut col_idx = Vec::with_capacity(merged.len());
        let mut values = Vec::with_capacity(merged.len());
        for (r, c, v) in merged {
            if v == 0.0 { continue; }
            row_ptr[r + 1] += 1;
            col_idx.push(c);
            values.push(v);
        }
        for r in 0..nrows {
            row_ptr[r + 1] += row_ptr[r];
        }
        Ok(Self { nrows, ncols, row_ptr, col_idx, values })
    }

    pub fn nrows(&self) -> usize { self.nrows }
    pub fn ncols(&self) -> usize { self.ncols }
    pub fn shape(&self) -> (usize, usize) { (self.nrows, self.ncols) }

    /// Stored entries, including any explicit zeros.
    pub fn nnz(&self) -> usize { self.values.len() }

    pub fn count_nonzero(&self) -> usize { self.values.iter().filter(|v| **v != 0.0).count() }

    /// Stored entries of row `r` as (column, value). Panics if `r` is out of range.
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (start, end) = (self.row_ptr[r], self.row_ptr[r + 1]);
        self.col_idx[start..end].iter().copied().zip(self.values[start..end].iter().copied())
    }

    /// Row-major walk over the stored entries, columns ascending within a row.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.nrows).flat_map(move |r| self.row(r).map(move |(c, v)| (r, c, v)))
    }

    /// `None` outside the matrix, `Some(0.0)` for an unstored cell.
    pub fn get(&self, r: usize, c: usize) -> Option<f64> {
        if r >= self.nrows || c >= self.ncols {
            return None;
        }
        let (start, end) = (self.row_ptr[r], self.row_ptr[r + 1]);
        let value = match self.col_idx[start..end].binary_search(&c) {
            Ok(i) => self.values[start + i],
            Err(_) => 0.0,
        };
        Some(value)
    }

    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.nrows).map(|r| self.row(r).map(|(_, v)| v).sum()).collect()
    }

    pub fn col_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.ncols];
        for (&c, &v) in self.col_idx.iter().zip(&self.values) {
            sums[c] += v;
        }
        sums
    }

    /// Number of non-zero entries in each column.
    pub fn col_nnz(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.ncols];
        for (&c, &v) in self.col_idx.iter().zip(&self.values) {
            if v != 0.0 { counts[c] += 1; }
        }
        counts
    }

    /// CSR of the transpose, i.e. the CSC layout of `self`.
    pub fn transpose(&self) -> SparseMatrix {
        let nnz = self.nnz();
        let mut row_ptr = vec![0usize; self.ncols + 1];
        for &c in &self.col_idx {
            row_ptr[c + 1] += 1;
        }
        for c in 0..self.ncols {
            row_ptr[c + 1] += row_ptr[c];
        }
        let mut next = row_ptr.clone();
        let mut col_idx = vec![0usize; nnz];
        let mut values = vec![0.0; nnz];
        for (r, c, v) in self.iter() {
            let slot = next[c];
            col_idx[slot] = r;
            values[slot] = v;
            next[c] += 1;
        }
        SparseMatrix { nrows: self.ncols, ncols: self.nrows, row_ptr, col_idx, values }
    }

    /// Rewrite every stored entry through `f`; results equal to zero are dropped.
    pub fn map_nonzero<F>(&self, mut f: F) -> SparseMatrix
    where
        F: FnMut(usize, usize, f64) -> f64,
    {
        let mut row_ptr = Vec::with_capacity(self.nrows + 1);
        let mut col_idx = Vec::with_capacity(self.nnz());
        let mut values = Vec::with_capacity(self.nnz());
        row_ptr.push(0);
        for r in 0..self.nrows {
            for (c, v) in self.row(r) {
                if v == 0.0 { continue; }
                let w = f(r, c, v);
                if w != 0.0 {
                    col_idx.push(c);
                    values.push(w);
                }
            }
            row_ptr.push(col_idx.len());
        }
        SparseMatrix { nrows: self.nrows, ncols: self.ncols, row_ptr, col_idx, values }
    }

    /// Keep only the listed columns (ascending, unique), renumbered from 0.
    pub fn select_columns(&self, keep: &[usize]) -> Result<SparseMatrix> {
        if keep.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Shape("selected columns must be strictly increasing".into()));
        }
        if let Some(&c) = keep.last() {
            if c >= self.ncols {
                return Err(Error::Shape(format!("column {c} out of bounds ({} columns)", self.ncols)));
            }
        }
        let mut remap: Vec<Option<usize>> = vec![None; self.ncols];
        for (new, &old) in keep.iter().enumerate() {
            remap[old] = Some(new);
        }
        let mut row_ptr = Vec::with_capacity(self.nrows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for r in 0..self.nrows {
            for (c, v) in self.row(r) {
                if let Some(new) = remap[c] {
                    col_idx.push(new);
                    values.push(v);
                }
            }
            row_ptr.push(col_idx.len());
        }
        Ok(SparseMatrix { nrows: self.nrows, ncols: keep.len(), row_ptr, col_idx, values })
    }

    pub fn into_csr_parts(self) -> CsrParts { self.into() }
}

/// Why coordinates could not be assembled into a [`SparseMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssembleError {
    Duplicate { row: usize, col: usize },
    /// Summing repeated coordinates left the finite range; `entry` is the
    /// input position of the value that pushed it over.
    NonFinite { entry: usize, row: usize, col: usize },
}

/// How the cells of a [`DocumentTermMatrix`] were computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    #[default]
    TermFrequency,
    TfIdf,
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weighting::TermFrequency => write!(f, "term frequency (tf)"),
            Weighting::TfIdf => write!(f, "term frequency - inverse document frequency (tf-idf)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DtmParts {
    pub matrix: SparseMatrix,
    pub documents: Vec<String>,
    pub terms: Vec<String>,
    #[serde(default)]
    pub weighting: Weighting,
}

/// Sparse matrix with one row per document and one column per term.
///
/// Label lookups go through hash maps built alongside the label vectors, so
/// [`DocumentTermMatrix::get`] by label is O(1) plus a binary search in the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DtmParts", into = "DtmParts")]
pub struct DocumentTermMatrix {
    matrix: SparseMatrix,
    documents: Vec<String>,
    terms: Vec<String>,
    weighting: Weighting,
    document_lookup: HashMap<String, usize>,
    term_lookup: HashMap<String, usize>,
}

impl TryFrom<DtmParts> for DocumentTermMatrix {
    type Error = Error;
    fn try_from(p: DtmParts) -> Result<Self> {
        Ok(Self::new(p.matrix, p.documents, p.terms)?.with_weighting(p.weighting))
    }
}

impl From<DocumentTermMatrix> for DtmParts {
    fn from(d: DocumentTermMatrix) -> Self {
        DtmParts { matrix: d.matrix, documents: d.documents, terms: d.terms, weighting: d.weighting }
    }
}

impl DocumentTermMatrix {
    /// Attach row and column labels to a matrix. Labels must match the shape
    /// and be unique on each axis.
    pub fn new(matrix: SparseMatrix, documents: Vec<String>, terms: Vec<String>) -> Result<Self> {
        if documents.len() != matrix.nrows() {
            return Err(Error::Shape(format!(
                "{} document labels for {} rows",
                documents.len(),
                matrix.nrows()
            )));
        }
        if terms.len() != matrix.ncols() {
            return Err(Error::Shape(format!("{} term labels for {} columns", terms.len(), matrix.ncols())));
        }
        let document_lookup = index_labels("document", &documents)?;
        let term_lookup = index_labels("term", &terms)?;
        Ok(Self { matrix, documents, terms, weighting: Weighting::TermFrequency, document_lookup, term_lookup })
    }

    /// Labels must already be unique and match the shape.
    pub(crate) fn from_parts_unchecked(matrix: SparseMatrix, documents: Vec<String>, terms: Vec<String>) -> Self {
        let document_lookup = documents.iter().cloned().zip(0..).collect();
        let term_lookup = terms.iter().cloned().zip(0..).collect();
        Self { matrix, documents, terms, weighting: Weighting::TermFrequency, document_lookup, term_lookup }
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn matrix(&self) -> &SparseMatrix { &self.matrix }
    pub fn documents(&self) -> &[String] { &self.documents }
    pub fn terms(&self) -> &[String] { &self.terms }
    pub fn weighting(&self) -> Weighting { self.weighting }
    pub fn n_documents(&self) -> usize { self.documents.len() }
    pub fn n_terms(&self) -> usize { self.terms.len() }
    pub fn nnz(&self) -> usize { self.matrix.nnz() }
    pub fn count_nonzero(&self) -> usize { self.matrix.count_nonzero() }

    pub fn document_index(&self, document: &str) -> Option<usize> {
        self.document_lookup.get(document).copied()
    }

    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.term_lookup.get(term).copied()
    }

    /// Cell value by label; `None` when either label is unknown.
    pub fn get(&self, document: &str, term: &str) -> Option<f64> {
        let r = self.document_index(document)?;
        let c = self.term_index(term)?;
        self.matrix.get(r, c)
    }

    /// Fraction of cells that are zero; 0.0 when the matrix has no cells.
    pub fn sparsity(&self) -> f64 {
        let cells = self.n_documents() as f64 * self.n_terms() as f64;
        if cells == 0.0 {
            return 0.0;
        }
        1.0 - self.count_nonzero() as f64 / cells
    }

    pub fn document_totals(&self) -> Vec<f64> { self.matrix.row_sums() }

    pub fn term_totals(&self) -> Vec<f64> { self.matrix.col_sums() }

    /// Number of documents in which each term has a non-zero value.
    pub fn document_frequency(&self) -> Vec<usize> { self.matrix.col_nnz() }

    /// Drop terms that are missing from too many documents. A term survives
    /// when its document frequency exceeds `n_documents * (1 - max_sparsity)`.
    pub fn remove_sparse_terms(&self, max_sparsity: f64) -> Result<Self> {
        if !(max_sparsity > 0.0 && max_sparsity < 1.0) {
            return Err(Error::InvalidOption {
                name: "max_sparsity",
                message: format!("must lie strictly between 0 and 1, got {max_sparsity}"),
            });
        }
        let threshold = self.n_documents() as f64 * (1.0 - max_sparsity);
        let keep: Vec<usize> = self
            .document_frequency()
            .iter()
            .enumerate()
            .filter(|&(_, &df)| df as f64 > threshold)
            .map(|(c, _)| c)
            .collect();
        let terms = keep.iter().map(|&c| self.terms[c].clone()).collect();
        let matrix = self.matrix.select_columns(&keep)?;
        tracing::debug!(kept = keep.len(), dropped = self.n_terms() - keep.len(), "removed sparse terms");
        Ok(Self::from_parts_unchecked(matrix, self.documents.clone(), terms).with_weighting(self.weighting))
    }

    pub fn into_parts(self) -> (SparseMatrix, Vec<String>, Vec<String>) {
        (self.matrix, self.documents, self.terms)
    }
}

fn index_labels(axis: &str, labels: &[String]) -> Result<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        if index.insert(label.clone(), i).is_some() {
            return Err(Error::Shape(format!("duplicate {axis} label {label:?}")));
        }
    }
    Ok(index)
}

impl fmt::Display for DocumentTermMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells = self.n_documents() as u128 * self.n_terms() as u128;
        let nonzero = self.count_nonzero() as u128;
        writeln!(f, "<<DocumentTermMatrix (documents: {}, terms: {})>>", self.n_documents(), self.n_terms())?;
        writeln!(f, "Non-/sparse entries: {}/{}", nonzero, cells - nonzero)?;
        writeln!(f, "Sparsity           : {}%", (self.sparsity() * 100.0).round() as u64)?;
        write!(f, "Weighting          : {}", self.weighting)
    }
}
