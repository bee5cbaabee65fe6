use crate::{MetaTable, Result, Triplet};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// A raw document of a corpus. Fields other than `id` and `text` are kept
/// as metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(alias = "body")]
    pub text: String,
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), meta: Map::new() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerOptions {
    pub remove_stopwords: bool,
    pub stem: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self { Self { remove_stopwords: true, stem: true } }
}

/// One token per row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub document: String,
    pub term: String,
    pub position: usize,
}

/// Tokenize text into (term, position) using NFKC normalization, lowercase, stopword removal, and stemming.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    tokenize_with(text, &TokenizerOptions::default())
}

/// Same as [`tokenize`], with stopword removal and stemming switchable.
/// Positions count every word, including dropped stopwords.
pub fn tokenize_with(text: &str, options: &TokenizerOptions) -> Vec<(String, usize)> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for (pos, mat) in RE.find_iter(&normalized).enumerate() {
        let token = mat.as_str();
        if options.remove_stopwords && is_stopword(token) { continue; }
        let term = if options.stem { STEMMER.stem(token).to_string() } else { token.to_string() };
        tokens.push((term, pos));
    }
    tokens
}

pub fn unnest_tokens<'a, I>(docs: I, options: &TokenizerOptions) -> Vec<Token>
where
    I: IntoIterator<Item = &'a Document>,
{
    docs.into_iter()
        .flat_map(|doc| {
            tokenize_with(&doc.text, options)
                .into_iter()
                .map(move |(term, position)| Token { document: doc.id.clone(), term, position })
        })
        .collect()
}

/// Count tokens per (document, term); output keeps first-seen order.
pub fn count_terms(tokens: &[Token]) -> Vec<Triplet> {
    let mut slots: HashMap<(&str, &str), usize> = HashMap::new();
    let mut out: Vec<Triplet> = Vec::new();
    for tok in tokens {
        match slots.get(&(tok.document.as_str(), tok.term.as_str())) {
            Some(&i) => out[i].value += 1.0,
            None => {
                slots.insert((tok.document.as_str(), tok.term.as_str()), out.len());
                out.push(Triplet::new(tok.document.clone(), tok.term.clone(), 1.0));
            }
        }
    }
    out
}

/// Metadata side table from the documents' extra fields.
pub fn corpus_metadata<'a, I>(docs: I) -> Result<MetaTable>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut table = MetaTable::new();
    for (row, doc) in docs.into_iter().enumerate() {
        table.insert_at(row, doc.id.clone(), doc.meta.clone())?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_count_dropped_stopwords() {
        let t = tokenize("The rally faded in the afternoon");
        assert_eq!(t, vec![("ralli".to_string(), 1), ("fade".to_string(), 2), ("afternoon".to_string(), 5)]);
    }

    #[test]
    fn options_switch_off_stemming_and_stopwords() {
        let opts = TokenizerOptions { remove_stopwords: false, stem: false };
        let words: Vec<String> = tokenize_with("The cats ran", &opts).into_iter().map(|(w, _)| w).collect();
        assert_eq!(words, vec!["the", "cats", "ran"]);
    }

    #[test]
    fn counts_per_document_in_first_seen_order() {
        let docs = vec![Document::new("a", "dog cat dog"), Document::new("b", "cat")];
        let opts = TokenizerOptions { remove_stopwords: true, stem: false };
        let counts = count_terms(&unnest_tokens(&docs, &opts));
        assert_eq!(
            counts,
            vec![Triplet::new("a", "dog", 2.0), Triplet::new("a", "cat", 1.0), Triplet::new("b", "cat", 1.0)]
        );
    }

    #[test]
    fn document_accepts_body_alias_and_keeps_meta() {
        let doc: Document = serde_json::from_str(r#"{"id":"x","body":"hi","heading":"H"}"#).unwrap();
        assert_eq!(doc.text, "hi");
        let meta = corpus_metadata([&doc]).unwrap();
        assert_eq!(meta.get("x").unwrap()["heading"], "H");
    }
}
