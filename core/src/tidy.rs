use crate::{DocumentTermMatrix, MetaTable, Triplet};
use serde::Serialize;
use serde_json::{Map, Value};

/// A tidy triplet widened with the document's metadata fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TidyRecord {
    #[serde(flatten)]
    pub triplet: Triplet,
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

/// One triplet per non-zero cell, rows in matrix order and columns ascending
/// within each row. Stored zeros are skipped.
pub fn tidy(dtm: &DocumentTermMatrix) -> Vec<Triplet> {
    let (documents, terms) = (dtm.documents(), dtm.terms());
    let out: Vec<Triplet> = dtm
        .matrix()
        .iter()
        .filter(|&(_, _, v)| v != 0.0)
        .map(|(r, c, value)| Triplet { document: documents[r].clone(), term: terms[c].clone(), value })
        .collect();
    tracing::debug!(records = out.len(), "tidied document-term matrix");
    out
}

/// Like [`tidy`], with every field of `meta` joined on the document label.
/// Documents without metadata get `null` for each field.
pub fn tidy_with_meta(dtm: &DocumentTermMatrix, meta: &MetaTable) -> Vec<TidyRecord> {
    tidy(dtm)
        .into_iter()
        .map(|triplet| {
            let row = meta.get(&triplet.document);
            let widened = meta
                .fields()
                .iter()
                .map(|field| {
                    let value = row.and_then(|r| r.get(field)).cloned().unwrap_or(Value::Null);
                    (field.clone(), value)
                })
                .collect();
            TidyRecord { triplet, meta: widened }
        })
        .collect()
}
