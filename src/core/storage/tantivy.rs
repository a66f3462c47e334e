//! Tantivy-backed BM25 engine.
//!
//! Documents live in an in-RAM Tantivy index with every field
//! stored, so hits are rebuilt straight from the doc store. An
//! id-keyed document map alongside serves counts and persistence.
//! Persisting writes the map as a versioned JSON snapshot;
//! restoring replays the snapshot into a fresh index.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock};

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING, TEXT};
use tantivy::tokenizer::TokenStream;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use crate::core::error::{IndexError, Result};
use crate::core::storage::engine::{EngineQuery, IndexEngine, RestoreOutcome};
use crate::core::types::{Document, SearchHit, SearchProperty};

/// Current snapshot format
/// Version 1: documents array with camelCase fields
pub const SNAPSHOT_VERSION: u32 = 1;

/// Writer arena; a single indexing thread keeps RAM use flat
const WRITER_MEMORY_BYTES: usize = 20_000_000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    format_version: u32,
    documents: Vec<&'a Document>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    format_version: u32,
    documents: Vec<Document>,
}

/// Schema field handles
#[derive(Debug, Clone, Copy)]
struct Fields {
    id: Field,
    content: Field,
    file_path: Field,
    language: Field,
    start_line: Field,
    end_line: Field,
    chunk_index: Field,
    updated_at: Field,
}

/// Create the Tantivy schema for chunk documents
///
/// Fields:
/// - id: Document id (STRING | STORED), used for replace/delete
/// - content: Full-text searchable chunk text (TEXT | STORED)
/// - file_path: Tokenized relative path (TEXT | STORED)
/// - language: Language tag (STRING | STORED)
/// - start_line, end_line, chunk_index: Chunk position (u64, STORED)
/// - updated_at: Indexing timestamp (date, STORED)
fn create_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();

    let fields = Fields {
        id: builder.add_text_field("id", STRING | STORED),
        content: builder.add_text_field("content", TEXT | STORED),
        file_path: builder.add_text_field("file_path", TEXT | STORED),
        language: builder.add_text_field("language", STRING | STORED),
        start_line: builder.add_u64_field("start_line", STORED),
        end_line: builder.add_u64_field("end_line", STORED),
        chunk_index: builder.add_u64_field("chunk_index", STORED),
        updated_at: builder.add_date_field("updated_at", STORED),
    };

    (builder.build(), fields)
}

/// BM25 engine over an in-RAM Tantivy index
pub struct TantivyEngine {
    index: Index,
    fields: Fields,
    reader: IndexReader,

    /// Serializes every mutation
    writer: Mutex<IndexWriter>,

    documents: RwLock<BTreeMap<String, Document>>,
}

impl std::fmt::Debug for TantivyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyEngine")
            .field("documents", &self.count())
            .finish()
    }
}

impl TantivyEngine {
    fn lock_writer(&self) -> Result<MutexGuard<'_, IndexWriter>> {
        self.writer
            .lock()
            .map_err(|_| IndexError::Engine("Index writer lock poisoned".to_string()))
    }

    /// Commit pending writer operations and make them searchable
    fn commit(&self, writer: &mut IndexWriter) -> Result<()> {
        writer
            .commit()
            .map_err(|e| IndexError::Engine(format!("Failed to commit: {e}")))?;
        self.reader
            .reload()
            .map_err(|e| IndexError::Engine(format!("Failed to reload reader: {e}")))
    }

    fn field_for(&self, property: SearchProperty) -> Field {
        match property {
            SearchProperty::Content => self.fields.content,
            SearchProperty::FilePath => self.fields.file_path,
        }
    }

    /// Tokenize with the analyzer used for the text fields
    fn tokenize(&self, text: &str) -> Vec<String> {
        let Some(mut analyzer) = self.index.tokenizers().get("default") else {
            return Vec::new();
        };

        let mut tokens = Vec::new();
        let mut stream = analyzer.token_stream(text);
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        tokens
    }

    /// Distinct query terms a document matches in the searched fields
    fn matched_terms(&self, document: &Document, properties: &[SearchProperty], terms: &[String]) -> usize {
        let mut doc_terms = HashSet::new();
        for property in properties {
            let text = match property {
                SearchProperty::Content => &document.content,
                SearchProperty::FilePath => &document.file_path,
            };
            doc_terms.extend(self.tokenize(text));
        }
        terms.iter().filter(|t| doc_terms.contains(*t)).count()
    }

    /// Rebuild a document from its stored fields
    fn to_document(&self, doc: &TantivyDocument) -> Option<Document> {
        let f = self.fields;
        let updated_at = doc
            .get_first(f.updated_at)
            .and_then(|v| v.as_datetime())
            .and_then(|d| chrono::DateTime::from_timestamp_micros(d.into_timestamp_micros()))
            .unwrap_or_else(Utc::now);

        Some(Document {
            id: Self::extract_text(doc, f.id)?,
            file_path: Self::extract_text(doc, f.file_path)?,
            content: Self::extract_text(doc, f.content).unwrap_or_default(),
            language: Self::extract_text(doc, f.language).unwrap_or_default(),
            start_line: Self::extract_usize(doc, f.start_line),
            end_line: Self::extract_usize(doc, f.end_line),
            chunk_index: Self::extract_usize(doc, f.chunk_index),
            updated_at,
        })
    }

    fn extract_text(doc: &TantivyDocument, field: Field) -> Option<String> {
        doc.get_first(field)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    fn extract_usize(doc: &TantivyDocument, field: Field) -> usize {
        doc.get_first(field)
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize
    }

    fn read_documents(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Document>>> {
        self.documents
            .read()
            .map_err(|_| IndexError::Engine("Document store lock poisoned".to_string()))
    }

    fn write_documents(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Document>>> {
        self.documents
            .write()
            .map_err(|_| IndexError::Engine("Document store lock poisoned".to_string()))
    }
}

/// Minimum number of distinct query terms a hit must contain
fn required_terms(term_count: usize, threshold: f32) -> usize {
    let threshold = threshold.clamp(0.0, 1.0) as f64;
    let required = (term_count as f64 * (1.0 - threshold)).ceil() as usize;
    required.clamp(1, term_count.max(1))
}

/// Temp file written next to `path` and renamed over it
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl IndexEngine for TantivyEngine {
    fn create() -> Result<Self> {
        let (schema, fields) = create_schema();
        let index = Index::create_in_ram(schema);

        let writer = index
            .writer_with_num_threads(1, WRITER_MEMORY_BYTES)
            .map_err(|e| IndexError::Engine(format!("Failed to create writer: {e}")))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| IndexError::Engine(format!("Failed to create reader: {e}")))?;

        Ok(Self {
            index,
            fields,
            reader,
            writer: Mutex::new(writer),
            documents: RwLock::new(BTreeMap::new()),
        })
    }

    fn insert_many(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut writer = self.lock_writer()?;
        let f = self.fields;

        for document in documents {
            // Replace any earlier generation of the same chunk
            writer.delete_term(Term::from_field_text(f.id, &document.id));
            writer
                .add_document(doc!(
                    f.id => document.id.as_str(),
                    f.content => document.content.as_str(),
                    f.file_path => document.file_path.as_str(),
                    f.language => document.language.as_str(),
                    f.start_line => document.start_line as u64,
                    f.end_line => document.end_line as u64,
                    f.chunk_index => document.chunk_index as u64,
                    f.updated_at => tantivy::DateTime::from_timestamp_micros(
                        document.updated_at.timestamp_micros()
                    ),
                ))
                .map_err(|e| IndexError::Engine(format!("Failed to add document: {e}")))?;
        }

        writer
            .commit()
            .map_err(|e| IndexError::Engine(format!("Failed to commit: {e}")))?;

        {
            let mut store = self.write_documents()?;
            for document in documents {
                store.insert(document.id.clone(), document.clone());
            }
        }

        self.reader
            .reload()
            .map_err(|e| IndexError::Engine(format!("Failed to reload reader: {e}")))
    }

    fn remove_many(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut writer = self.lock_writer()?;
        for id in ids {
            writer.delete_term(Term::from_field_text(self.fields.id, id));
        }
        self.commit(&mut writer)?;

        let mut store = self.write_documents()?;
        for id in ids {
            store.remove(id);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut writer = self.lock_writer()?;
        writer
            .delete_all_documents()
            .map_err(|e| IndexError::Engine(format!("Failed to clear index: {e}")))?;
        self.commit(&mut writer)?;

        self.write_documents()?.clear();
        Ok(())
    }

    fn count(&self) -> usize {
        self.documents.read().map(|store| store.len()).unwrap_or(0)
    }

    fn search(&self, term: &str, query: &EngineQuery) -> Result<Vec<SearchHit>> {
        if query.limit == 0 || self.count() == 0 {
            return Ok(Vec::new());
        }

        let mut seen_properties = HashSet::new();
        let mut properties = query.properties.clone();
        properties.retain(|property| seen_properties.insert(*property));
        if properties.is_empty() {
            properties = EngineQuery::default().properties;
        }

        let mut terms = self.tokenize(term);
        let mut seen = HashSet::new();
        terms.retain(|t| seen.insert(t.clone()));
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let required = required_terms(terms.len(), query.threshold);
        let all_required = required == terms.len();
        let occur = if all_required { Occur::Must } else { Occur::Should };

        // One clause per term, satisfied by any searched field
        let clauses: Vec<(Occur, Box<dyn Query>)> = terms
            .iter()
            .map(|t| {
                let per_field: Vec<(Occur, Box<dyn Query>)> = properties
                    .iter()
                    .map(|p| {
                        let term = Term::from_field_text(self.field_for(*p), t);
                        let q: Box<dyn Query> =
                            Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                        (Occur::Should, q)
                    })
                    .collect();
                let q: Box<dyn Query> = Box::new(BooleanQuery::new(per_field));
                (occur, q)
            })
            .collect();
        let boolean_query = BooleanQuery::new(clauses);

        // Partial matching is filtered after ranking, so look at every candidate
        let needs_filter = !all_required && required > 1;
        let fetch = if needs_filter { self.count() } else { query.limit };

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&boolean_query, &TopDocs::with_limit(fetch))
            .map_err(|e| IndexError::Engine(format!("Search failed: {e}")))?;

        let mut hits = Vec::new();
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| IndexError::Engine(format!("Failed to retrieve document: {e}")))?;

            let Some(document) = self.to_document(&doc) else {
                continue;
            };

            if needs_filter && self.matched_terms(&document, &properties, &terms) < required {
                continue;
            }

            hits.push(SearchHit { document, score });
            if hits.len() >= query.limit {
                break;
            }
        }

        Ok(hits)
    }

    fn persist(&self, path: &Path) -> Result<()> {
        let store = self.read_documents()?;
        let snapshot = SnapshotRef {
            format_version: SNAPSHOT_VERSION,
            documents: store.values().collect(),
        };

        let tmp = temp_path(path);
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut out, &snapshot)?;
            out.flush()?;
        }
        fs::rename(&tmp, path)?;

        tracing::debug!("Persisted {} documents to {:?}", store.len(), path);
        Ok(())
    }

    fn restore(path: &Path) -> RestoreOutcome<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return RestoreOutcome::FileMissing
            }
            Err(e) => return RestoreOutcome::Corrupt(format!("Failed to read index file: {e}")),
        };

        let snapshot: Snapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => return RestoreOutcome::Corrupt(format!("Invalid index file: {e}")),
        };

        if snapshot.format_version != SNAPSHOT_VERSION {
            return RestoreOutcome::Corrupt(format!(
                "Unsupported index format version {} (current: v{})",
                snapshot.format_version, SNAPSHOT_VERSION
            ));
        }

        let engine = match Self::create() {
            Ok(engine) => engine,
            Err(e) => return RestoreOutcome::Corrupt(e.to_string()),
        };
        if let Err(e) = engine.insert_many(&snapshot.documents) {
            return RestoreOutcome::Corrupt(e.to_string());
        }

        RestoreOutcome::Restored(engine)
    }
}
