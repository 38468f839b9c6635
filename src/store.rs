use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::domain::Document;
use crate::error::HarvestError;

/// A named set of JSON documents.
pub trait Collection {
    fn name(&self) -> &str;
    fn insert_one(&self, document: Document) -> Result<(), HarvestError>;
    /// Writes every document or none of them.
    fn insert_many(&self, documents: Vec<Document>) -> Result<usize, HarvestError>;
    fn find_all(&self) -> Result<Vec<Document>, HarvestError>;
    fn count(&self) -> Result<usize, HarvestError>;
}

impl<C: Collection + ?Sized> Collection for &C {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn insert_one(&self, document: Document) -> Result<(), HarvestError> {
        (**self).insert_one(document)
    }

    fn insert_many(&self, documents: Vec<Document>) -> Result<usize, HarvestError> {
        (**self).insert_many(documents)
    }

    fn find_all(&self) -> Result<Vec<Document>, HarvestError> {
        (**self).find_all()
    }

    fn count(&self) -> Result<usize, HarvestError> {
        (**self).count()
    }
}

/// Root directory holding one sub-directory per database.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, HarvestError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.data_dir().join("impactu-harvest")).ok()
            })
            .ok_or_else(|| HarvestError::Filesystem("unable to resolve data directory".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn collection_path(&self, database: &str, collection: &str) -> Utf8PathBuf {
        self.root.join(database).join(format!("{collection}.jsonl"))
    }

    pub fn collection(&self, database: &str, collection: &str) -> JsonlCollection {
        JsonlCollection::new(collection, self.collection_path(database, collection))
    }
}

/// File-backed collection storing one JSON document per line.
#[derive(Debug, Clone)]
pub struct JsonlCollection {
    name: String,
    path: Utf8PathBuf,
}

impl JsonlCollection {
    pub fn new(name: &str, path: Utf8PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path,
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<&Utf8Path, HarvestError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| HarvestError::Filesystem("invalid collection path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        Ok(parent)
    }
}

impl Collection for JsonlCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert_one(&self, document: Document) -> Result<(), HarvestError> {
        self.ensure_parent()?;
        let line = encode_line(&document)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        file.write_all(&line)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        Ok(())
    }

    fn insert_many(&self, documents: Vec<Document>) -> Result<usize, HarvestError> {
        if documents.is_empty() {
            return Ok(0);
        }
        self.ensure_parent()?;
        let mut batch = Vec::new();
        for document in &documents {
            batch.extend(encode_line(document)?);
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let committed = file
            .metadata()
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?
            .len();
        if let Err(err) = file.write_all(&batch).and_then(|()| file.sync_data()) {
            // Cut a partial batch back to the last committed line.
            let _ = file.set_len(committed);
            return Err(HarvestError::Filesystem(err.to_string()));
        }
        Ok(documents.len())
    }

    fn find_all(&self) -> Result<Vec<Document>, HarvestError> {
        if !self.path.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let file = File::open(self.path.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let mut documents = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|err| HarvestError::Filesystem(err.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let document: Document = serde_json::from_str(&line).map_err(|err| {
                HarvestError::Store(format!("{}:{}: {err}", self.path, index + 1))
            })?;
            documents.push(document);
        }
        Ok(documents)
    }

    fn count(&self) -> Result<usize, HarvestError> {
        Ok(self.find_all()?.len())
    }
}

/// In-process collection.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    name: String,
    documents: Mutex<Vec<Document>>,
    bulk_writes: Mutex<usize>,
}

impl MemoryCollection {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_documents(name: &str, documents: Vec<Document>) -> Self {
        Self {
            name: name.to_string(),
            documents: Mutex::new(documents),
            bulk_writes: Mutex::new(0),
        }
    }

    /// Number of `insert_many` calls that reached the collection.
    pub fn bulk_writes(&self) -> usize {
        self.bulk_writes.lock().map(|guard| *guard).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Document>>, HarvestError> {
        self.documents
            .lock()
            .map_err(|_| HarvestError::Store(format!("collection {} is poisoned", self.name)))
    }
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert_one(&self, document: Document) -> Result<(), HarvestError> {
        self.lock()?.push(document);
        Ok(())
    }

    fn insert_many(&self, documents: Vec<Document>) -> Result<usize, HarvestError> {
        let inserted = documents.len();
        self.lock()?.extend(documents);
        if let Ok(mut writes) = self.bulk_writes.lock() {
            *writes += 1;
        }
        Ok(inserted)
    }

    fn find_all(&self) -> Result<Vec<Document>, HarvestError> {
        Ok(self.lock()?.clone())
    }

    fn count(&self) -> Result<usize, HarvestError> {
        Ok(self.lock()?.len())
    }
}

fn encode_line(document: &Document) -> Result<Vec<u8>, HarvestError> {
    let mut line =
        serde_json::to_vec(document).map_err(|err| HarvestError::Store(err.to_string()))?;
    line.push(b'\n');
    Ok(line)
}
