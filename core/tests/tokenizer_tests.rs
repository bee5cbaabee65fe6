use tidycast_core::tokenizer::{count_terms, tokenize, tokenize_with, unnest_tokens, Document, TokenizerOptions};

#[test]
fn headline_terms_fold_case_and_unicode_forms() {
    let plain = TokenizerOptions { remove_stopwords: true, stem: false };
    // decomposed accents and fullwidth letters, as scraped wire copy often has
    let words: Vec<String> =
        tokenize_with("ＮＹＳＥ opens at Cafe\u{301} Mu\u{308}ller", &plain).into_iter().map(|(w, _)| w).collect();
    assert_eq!(words, vec!["nyse", "opens", "caf\u{e9}", "m\u{fc}ller"]);

    let stemmed: Vec<String> = tokenize("Stocks TRADED higher; trading resumed").into_iter().map(|(w, _)| w).collect();
    assert_eq!(stemmed.iter().filter(|w| *w == "trade").count(), 2, "{stemmed:?}");
    assert!(stemmed.contains(&"stock".to_string()));
}

#[test]
fn stopwords_never_reach_the_counts() {
    let docs = vec![Document::new("ap3", "The storm and the flood were over by Monday")];
    let counts = count_terms(&unnest_tokens(&docs, &TokenizerOptions { remove_stopwords: true, stem: false }));
    let terms: Vec<&str> = counts.iter().map(|t| t.term.as_str()).collect();
    assert_eq!(terms, vec!["storm", "flood", "monday"]);

    let kept = count_terms(&unnest_tokens(&docs, &TokenizerOptions { remove_stopwords: false, stem: false }));
    assert_eq!(kept.iter().find(|t| t.term == "the").map(|t| t.value), Some(2.0));
}

#[test]
fn counts_feed_the_caster() {
    let docs = vec![
        Document::new("ap1", "Markets rallied as markets reopened"),
        Document::new("ap2", "Rain fell on the markets"),
    ];
    let counts = count_terms(&unnest_tokens(&docs, &TokenizerOptions::default()));
    let dtm = tidycast_core::cast_dtm(counts, &Default::default()).unwrap();
    assert_eq!(dtm.documents(), &["ap1".to_string(), "ap2".to_string()]);
    assert_eq!(dtm.get("ap1", "market"), Some(2.0));
    assert_eq!(dtm.get("ap2", "market"), Some(1.0));
    assert_eq!(dtm.get("ap1", "rain"), Some(0.0));
}
