use crate::DocumentTermMatrix;
use anyhow::{Context, Result};
use bincode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub documents: usize,
    pub terms: usize,
    pub entries: usize,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    pub fn describe(dtm: &DocumentTermMatrix, created_at: String) -> Self {
        Self { documents: dtm.n_documents(), terms: dtm.n_terms(), entries: dtm.nnz(), created_at, version: 1 }
    }
}

/// Layout of a matrix store directory.
pub struct StorePaths {
    pub root: PathBuf,
}

impl StorePaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn matrix(&self) -> PathBuf { self.root.join("matrix.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

pub fn save_matrix(paths: &StorePaths, dtm: &DocumentTermMatrix) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.matrix())?;
    let bytes = bincode::serialize(dtm)?;
    f.write_all(&bytes)?;
    tracing::info!(root = %paths.root.display(), documents = dtm.n_documents(), terms = dtm.n_terms(), "saved matrix");
    Ok(())
}

/// Structure and labels are re-validated on the way in.
pub fn load_matrix(paths: &StorePaths) -> Result<DocumentTermMatrix> {
    let mut f = File::open(paths.matrix()).with_context(|| format!("opening {}", paths.matrix().display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let dtm: DocumentTermMatrix = bincode::deserialize(&buf)?;
    tracing::info!(root = %paths.root.display(), documents = dtm.n_documents(), terms = dtm.n_terms(), "loaded matrix");
    Ok(dtm)
}

pub fn save_meta(paths: &StorePaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &StorePaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Read JSON records: `.jsonl` line by line (blank lines skipped), anything
/// else as a JSON array or a single object.
pub fn read_records(path: &Path) -> Result<Vec<Value>> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(f);
    if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        let mut out = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            let v: Value = serde_json::from_str(&line).with_context(|| format!("{}:{}", path.display(), i + 1))?;
            out.push(v);
        }
        return Ok(out);
    }
    let json: Value = serde_json::from_reader(reader)?;
    Ok(match json {
        Value::Array(arr) => arr,
        other => vec![other],
    })
}

pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    for r in records {
        serde_json::to_writer(&mut w, r)?;
        w.write_all(b"\n")?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cast_dtm, CastOptions, Triplet};
    use tempfile::tempdir;

    #[test]
    fn matrix_survives_save_and_load() {
        let dir = tempdir().unwrap();
        let paths = StorePaths::new(dir.path());
        let dtm = cast_dtm(vec![Triplet::new("a", "x", 1.0), Triplet::new("b", "y", 2.0)], &CastOptions::default()).unwrap();
        save_matrix(&paths, &dtm).unwrap();
        save_meta(&paths, &MetaFile::describe(&dtm, "2024-01-01T00:00:00Z".into())).unwrap();
        assert_eq!(load_matrix(&paths).unwrap(), dtm);
        assert_eq!(load_meta(&paths).unwrap().entries, 2);
    }

    #[test]
    fn reads_json_and_jsonl() {
        let dir = tempdir().unwrap();
        let jsonl = dir.path().join("rows.jsonl");
        std::fs::write(&jsonl, "{\"a\":1}\n\n{\"a\":2}\n").unwrap();
        assert_eq!(read_records(&jsonl).unwrap().len(), 2);

        let json = dir.path().join("rows.json");
        std::fs::write(&json, "{\"a\":1}").unwrap();
        assert_eq!(read_records(&json).unwrap().len(), 1);
    }
}
