use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tidycast_core::persist::{load_matrix, read_records, save_matrix, save_meta, write_jsonl, MetaFile, StorePaths};
use tidycast_core::sentiment::{document_sentiment, join_sentiments, term_contributions, Lexicon};
use tidycast_core::tokenizer::{corpus_metadata, count_terms, unnest_tokens, Document, TokenizerOptions};
use tidycast_core::weight::{weight_tf_idf, TfIdfOptions};
use tidycast_core::{cast_rows, tidy, tidy_with_meta, CastOptions, ColumnSpec, DocumentTermMatrix, DuplicatePolicy, LabelOrder, MetaTable};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "tidycast")]
#[command(about = "Convert tidy text tables to document-term matrices and back", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Tokenize JSON/JSONL documents and count terms per document
    Count {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output JSONL of (document, term, value) rows
        #[arg(long)]
        output: String,
        /// Also write the documents' extra fields as JSONL metadata
        #[arg(long)]
        meta_output: Option<String>,
        #[arg(long, default_value_t = false)]
        keep_stopwords: bool,
        #[arg(long, default_value_t = false)]
        no_stem: bool,
    },
    /// Cast a tidy JSON/JSONL table into a matrix store directory
    Cast {
        #[arg(long)]
        input: String,
        /// Output matrix store directory
        #[arg(long)]
        output: String,
        /// JSON file with cast options (duplicates, order, reject_empty)
        #[arg(long)]
        config: Option<String>,
        #[arg(long, default_value = "document")]
        document_column: String,
        #[arg(long, default_value = "term")]
        term_column: String,
        #[arg(long, default_value = "value")]
        value_column: String,
        /// Sum repeated (document, term) pairs instead of failing
        #[arg(long, default_value_t = false)]
        sum_duplicates: bool,
        /// Sort labels instead of keeping first-seen order
        #[arg(long, default_value_t = false)]
        sort_labels: bool,
        #[arg(long, default_value_t = false)]
        reject_empty: bool,
    },
    /// Write a stored matrix back out as tidy JSONL
    Tidy {
        /// Matrix store directory
        #[arg(long)]
        matrix: String,
        #[arg(long)]
        output: String,
        /// JSON/JSONL metadata to join on the document label
        #[arg(long)]
        meta: Option<String>,
        #[arg(long, default_value = "document")]
        meta_key: String,
    },
    /// Apply log tf-idf weighting to a stored matrix
    Weight {
        #[arg(long)]
        matrix: String,
        #[arg(long)]
        output: String,
        /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
        #[arg(long, default_value_t = false)]
        smoothed_idf: bool,
        #[arg(long, default_value_t = false)]
        no_normalize: bool,
    },
    /// Drop terms missing from more than the given share of documents
    Prune {
        #[arg(long)]
        matrix: String,
        #[arg(long)]
        output: String,
        #[arg(long)]
        max_sparsity: f64,
    },
    /// Join a tidy table with a sentiment lexicon and score it
    Sentiment {
        #[arg(long)]
        input: String,
        /// Lexicon JSON/JSONL with one word per row
        #[arg(long, env = "TIDYCAST_LEXICON")]
        lexicon: String,
        #[arg(long)]
        output: String,
        #[arg(long, default_value = "word")]
        word_column: String,
        #[arg(long, default_value = "sentiment")]
        sentiment_column: String,
        /// Report per-term contributions instead of per-document scores
        #[arg(long, default_value_t = false)]
        by_term: bool,
    },
    /// Print a summary of a stored matrix
    Inspect {
        #[arg(long)]
        matrix: String,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Count { input, output, meta_output, keep_stopwords, no_stem } => {
            let opts = TokenizerOptions { remove_stopwords: !keep_stopwords, stem: !no_stem };
            count_documents(Path::new(&input), Path::new(&output), meta_output.as_deref().map(Path::new), &opts)?;
        }
        Commands::Cast {
            input,
            output,
            config,
            document_column,
            term_column,
            value_column,
            sum_duplicates,
            sort_labels,
            reject_empty,
        } => {
            let mut options = load_cast_options(config.as_deref().map(Path::new))?;
            if sum_duplicates { options.duplicates = DuplicatePolicy::Sum; }
            if sort_labels { options.order = LabelOrder::Sorted; }
            if reject_empty { options.reject_empty = true; }
            let columns = ColumnSpec::new(document_column, term_column, value_column);
            cast_file(Path::new(&input), Path::new(&output), &columns, &options)?;
        }
        Commands::Tidy { matrix, output, meta, meta_key } => {
            let meta = meta.as_deref().map(|m| (Path::new(m), meta_key.as_str()));
            tidy_store(Path::new(&matrix), Path::new(&output), meta)?;
        }
        Commands::Weight { matrix, output, smoothed_idf, no_normalize } => {
            let opts = TfIdfOptions { smoothed_idf, normalize: !no_normalize };
            let dtm = load_matrix(&StorePaths::new(&matrix))?;
            write_store(Path::new(&output), &weight_tf_idf(&dtm, &opts))?;
        }
        Commands::Prune { matrix, output, max_sparsity } => {
            let dtm = load_matrix(&StorePaths::new(&matrix))?;
            write_store(Path::new(&output), &dtm.remove_sparse_terms(max_sparsity)?)?;
        }
        Commands::Sentiment { input, lexicon, output, word_column, sentiment_column, by_term } => {
            let lexicon = load_lexicon(Path::new(&lexicon), &word_column, &sentiment_column)?;
            score_sentiment(Path::new(&input), &lexicon, Path::new(&output), by_term)?;
        }
        Commands::Inspect { matrix } => {
            println!("{}", inspect_store(Path::new(&matrix))?);
        }
    }
    Ok(())
}

/// Cast options from an optional JSON file; missing keys take their defaults.
pub fn load_cast_options(config: Option<&Path>) -> Result<CastOptions> {
    match config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?)
        }
        None => Ok(CastOptions::default()),
    }
}

fn collect_inputs(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        // directory walk order is platform dependent; labels are first-seen
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn read_documents(input: &Path) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    for file in collect_inputs(input) {
        for record in read_records(&file)? {
            let doc: Document =
                serde_json::from_value(record).with_context(|| format!("bad document in {}", file.display()))?;
            docs.push(doc);
        }
    }
    Ok(docs)
}

/// Tokenize and count; returns the number of (document, term) rows written.
pub fn count_documents(input: &Path, output: &Path, meta_output: Option<&Path>, opts: &TokenizerOptions) -> Result<usize> {
    let docs = read_documents(input)?;
    // metadata rules only apply when a side table is written
    let meta = meta_output.map(|_| corpus_metadata(&docs)).transpose()?;
    let counts = count_terms(&unnest_tokens(&docs, opts));
    write_jsonl(output, &counts)?;
    tracing::info!(documents = docs.len(), rows = counts.len(), "counted terms");

    if let (Some(path), Some(table)) = (meta_output, meta) {
        let rows: Vec<Value> = docs
            .iter()
            .map(|doc| {
                let mut row = Map::new();
                row.insert("document".into(), Value::String(doc.id.clone()));
                if let Some(fields) = table.get(&doc.id) {
                    row.extend(fields.clone());
                }
                Value::Object(row)
            })
            .collect();
        write_jsonl(path, &rows)?;
        tracing::info!(fields = table.fields().len(), "wrote document metadata");
    }
    Ok(counts.len())
}

pub fn cast_file(input: &Path, output: &Path, columns: &ColumnSpec, options: &CastOptions) -> Result<DocumentTermMatrix> {
    let rows = read_records(input)?;
    let dtm = cast_rows(&rows, columns, options)?;
    write_store(output, &dtm)?;
    Ok(dtm)
}

fn write_store(output: &Path, dtm: &DocumentTermMatrix) -> Result<()> {
    let paths = StorePaths::new(output);
    save_matrix(&paths, dtm)?;
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".into());
    save_meta(&paths, &MetaFile::describe(dtm, created_at))?;
    tracing::info!(output = %output.display(), "matrix store written");
    Ok(())
}

/// Returns the number of tidy rows written.
pub fn tidy_store(matrix: &Path, output: &Path, meta: Option<(&Path, &str)>) -> Result<usize> {
    let dtm = load_matrix(&StorePaths::new(matrix))?;
    let written = match meta {
        Some((path, key)) => {
            let table = MetaTable::from_rows(&read_records(path)?, key)?;
            let rows = tidy_with_meta(&dtm, &table);
            write_jsonl(output, &rows)?;
            rows.len()
        }
        None => {
            let rows = tidy(&dtm);
            write_jsonl(output, &rows)?;
            rows.len()
        }
    };
    tracing::info!(rows = written, output = %output.display(), "tidy table written");
    Ok(written)
}

/// The tm-style summary printed by `inspect`.
pub fn inspect_store(matrix: &Path) -> Result<String> {
    let dtm = load_matrix(&StorePaths::new(matrix))?;
    Ok(dtm.to_string())
}

pub fn load_lexicon(path: &Path, word_column: &str, sentiment_column: &str) -> Result<Lexicon> {
    let lexicon = Lexicon::from_rows(&read_records(path)?, word_column, sentiment_column)?;
    tracing::info!(words = lexicon.len(), "loaded lexicon");
    Ok(lexicon)
}

/// Returns the number of rows written.
pub fn score_sentiment(input: &Path, lexicon: &Lexicon, output: &Path, by_term: bool) -> Result<usize> {
    let triplets = ColumnSpec::default().parse_rows(&read_records(input)?)?;
    let matches = join_sentiments(&triplets, lexicon);
    if by_term {
        let rows = term_contributions(&matches);
        write_jsonl(output, &rows)?;
        Ok(rows.len())
    } else {
        let rows = document_sentiment(&matches);
        write_jsonl(output, &rows)?;
        Ok(rows.len())
    }
}
