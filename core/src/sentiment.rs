use crate::{Error, Result, Triplet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

pub const POSITIVE: &str = "positive";
pub const NEGATIVE: &str = "negative";

/// Immutable word -> sentiment category mapping, loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    entries: HashMap<String, String>,
}

impl Lexicon {
    /// A word may be listed twice only with the same category.
    pub fn from_pairs<I, W, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (W, S)>,
        W: Into<String>,
        S: Into<String>,
    {
        let mut entries: HashMap<String, String> = HashMap::new();
        for (row, (word, sentiment)) in pairs.into_iter().enumerate() {
            let (word, sentiment) = (word.into(), sentiment.into());
            match entries.get(&word) {
                Some(existing) if *existing != sentiment => {
                    return Err(Error::Schema {
                        row,
                        message: format!("word {word:?} listed as both {existing:?} and {sentiment:?}"),
                    })
                }
                Some(_) => {}
                None => {
                    entries.insert(word, sentiment);
                }
            }
        }
        Ok(Self { entries })
    }

    /// Build from JSON rows such as `{"word": "abandon", "sentiment": "negative"}`.
    pub fn from_rows<'a, I>(rows: I, word_column: &str, sentiment_column: &str) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let pairs = rows
            .into_iter()
            .enumerate()
            .map(|(row, record)| -> Result<(String, String)> {
                let field = |name: &str| {
                    record.get(name).and_then(Value::as_str).map(str::to_string).ok_or_else(|| Error::Schema {
                        row,
                        message: format!("lexicon column {name:?} missing or not a string"),
                    })
                };
                Ok((field(word_column)?, field(sentiment_column)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_pairs(pairs)
    }

    pub fn get(&self, term: &str) -> Option<&str> { self.entries.get(term).map(String::as_str) }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn categories(&self) -> BTreeSet<&str> { self.entries.values().map(String::as_str).collect() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentMatch {
    pub document: String,
    pub term: String,
    pub value: f64,
    pub sentiment: String,
}

/// Inner join of a tidy table with the lexicon on the term.
pub fn join_sentiments(triplets: &[Triplet], lexicon: &Lexicon) -> Vec<SentimentMatch> {
    triplets
        .iter()
        .filter_map(|t| {
            lexicon.get(&t.term).map(|s| SentimentMatch {
                document: t.document.clone(),
                term: t.term.clone(),
                value: t.value,
                sentiment: s.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSentiment {
    pub document: String,
    pub positive: f64,
    pub negative: f64,
    pub net: f64,
}

/// Value-weighted positive and negative totals per document, in first-seen
/// order. Categories other than positive/negative are ignored.
pub fn document_sentiment(matches: &[SentimentMatch]) -> Vec<DocumentSentiment> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<DocumentSentiment> = Vec::new();
    for m in matches {
        let i = *slots.entry(m.document.as_str()).or_insert_with(|| {
            out.push(DocumentSentiment { document: m.document.clone(), positive: 0.0, negative: 0.0, net: 0.0 });
            out.len() - 1
        });
        match m.sentiment.as_str() {
            POSITIVE => out[i].positive += m.value,
            NEGATIVE => out[i].negative += m.value,
            _ => {}
        }
    }
    for d in out.iter_mut() {
        d.net = d.positive - d.negative;
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermContribution {
    pub term: String,
    pub sentiment: String,
    pub total: f64,
}

/// Total value per (term, sentiment), largest first, ties broken by term.
pub fn term_contributions(matches: &[SentimentMatch]) -> Vec<TermContribution> {
    let mut totals: HashMap<(&str, &str), f64> = HashMap::new();
    for m in matches {
        *totals.entry((m.term.as_str(), m.sentiment.as_str())).or_insert(0.0) += m.value;
    }
    let mut out: Vec<TermContribution> = totals
        .into_iter()
        .map(|((term, sentiment), total)| TermContribution { term: term.to_string(), sentiment: sentiment.to_string(), total })
        .collect();
    out.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.term.cmp(&b.term))
            .then_with(|| a.sentiment.cmp(&b.sentiment))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bing() -> Lexicon {
        Lexicon::from_pairs([("good", POSITIVE), ("great", POSITIVE), ("bad", NEGATIVE), ("fear", "fear")]).unwrap()
    }

    #[test]
    fn conflicting_entries_are_rejected() {
        assert!(Lexicon::from_pairs([("good", POSITIVE), ("good", POSITIVE)]).is_ok());
        let err = Lexicon::from_pairs([("good", POSITIVE), ("good", NEGATIVE)]).unwrap_err();
        assert!(matches!(err, Error::Schema { row: 1, .. }));
    }

    #[test]
    fn loads_from_rows() {
        let rows = vec![json!({"word": "good", "sentiment": "positive"}), json!({"word": "bad"})];
        assert!(Lexicon::from_rows(&rows, "word", "sentiment").is_err());
        let lex = Lexicon::from_rows(&rows[..1], "word", "sentiment").unwrap();
        assert_eq!(lex.get("good"), Some(POSITIVE));
        assert_eq!(lex.len(), 1);
    }

    #[test]
    fn scores_documents_and_terms() {
        let rows = vec![
            Triplet::new("d1", "good", 2.0),
            Triplet::new("d1", "bad", 3.0),
            Triplet::new("d1", "table", 9.0),
            Triplet::new("d2", "great", 1.0),
            Triplet::new("d2", "fear", 4.0),
            Triplet::new("d2", "good", 1.0),
        ];
        let matches = join_sentiments(&rows, &bing());
        assert_eq!(matches.len(), 5);

        let docs = document_sentiment(&matches);
        assert_eq!(docs[0], DocumentSentiment { document: "d1".into(), positive: 2.0, negative: 3.0, net: -1.0 });
        assert_eq!(docs[1], DocumentSentiment { document: "d2".into(), positive: 2.0, negative: 0.0, net: 2.0 });

        let terms = term_contributions(&matches);
        assert_eq!(terms[0].term, "fear");
        assert_eq!(terms[1].term, "bad");
        assert_eq!(terms[2].term, "good");
        assert_eq!(terms[2].total, 3.0);
    }
}
