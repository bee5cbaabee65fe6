//! Conversions between tidy (document, term, value) tables and sparse
//! document-term matrices, plus the tokenizing, weighting and sentiment
//! steps that usually sit around them.

pub mod cast;
pub mod error;
pub mod matrix;
pub mod persist;
pub mod sentiment;
pub mod tidy;
pub mod tokenizer;
pub mod triplet;
pub mod weight;

pub use cast::{cast_dtm, cast_rows, CastOptions, DuplicatePolicy, LabelOrder};
pub use error::{Error, Result};
pub use matrix::{CsrParts, DocumentTermMatrix, DtmParts, SparseMatrix, Weighting};
pub use tidy::{tidy, tidy_with_meta, TidyRecord};
pub use triplet::{ColumnSpec, MetaTable, Triplet};
