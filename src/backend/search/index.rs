/**
 * Full-Text Index
 *
 * A tantivy index over the string properties of a `SearchSchema`. Every
 * property is a `TEXT` field run through tantivy's default analyzer; the
 * JSON document rides along in a stored `_source` field and the id in a raw
 * `_id` field so it can be deleted by term.
 *
 * A query token matches whole terms (BM25 scored) and every term it is a
 * prefix of (constant score), so full-word hits outrank prefix-only ones.
 * Writes are committed immediately and the reader is reloaded by hand.
 */

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value as _, STORED, STRING, TEXT};
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use crate::backend::search::SearchError;
use crate::backend::store::document::new_id;

pub const DEFAULT_LIMIT: usize = 10;

const ID_FIELD: &str = "_id";
const SOURCE_FIELD: &str = "_source";
const WRITER_HEAP_BYTES: usize = 20_000_000;

/// Indexed properties of one search key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSchema {
    pub key: String,
    pub properties: Vec<String>,
}

impl SearchSchema {
    pub fn new<I, S>(key: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }

    fn tantivy_schema(&self) -> Schema {
        let mut builder = Schema::builder();
        builder.add_text_field(ID_FIELD, STRING | STORED);
        builder.add_text_field(SOURCE_FIELD, STORED);
        for property in &self.properties {
            builder.add_text_field(property, TEXT);
        }
        builder.build()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub term: String,
    /// Properties to match; all schema properties when absent
    #[serde(default)]
    pub properties: Option<Vec<String>>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl SearchParams {
    pub fn term(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub id: String,
    pub score: f64,
    pub document: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    /// Total matches before `offset`/`limit`
    pub count: usize,
    pub hits: Vec<Hit>,
    pub elapsed_micros: u128,
}

pub struct SearchIndex {
    schema: SearchSchema,
    index: Index,
    reader: IndexReader,
    writer: IndexWriter,
    f_id: Field,
    f_source: Field,
    fields: Vec<(String, Field)>,
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("schema", &self.schema)
            .field("docs", &self.len())
            .finish()
    }
}

impl SearchIndex {
    /// Index kept in memory only
    pub fn new(schema: SearchSchema) -> Result<Self, SearchError> {
        let index = Index::create_in_ram(schema.tantivy_schema());
        Self::from_index(index, schema)
    }

    /// Fresh index in `dir`; whatever was there is wiped
    pub fn create(dir: impl AsRef<Path>, schema: SearchSchema) -> Result<Self, SearchError> {
        let dir = dir.as_ref();
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)?;
        let index = Index::create_in_dir(dir, schema.tantivy_schema())?;
        Self::from_index(index, schema)
    }

    /// Open the index in `dir`; the key is the directory name
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SearchError> {
        let dir = dir.as_ref();
        let key = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| SearchError::UnknownIndex(dir.display().to_string()))?;
        let index = Index::open_in_dir(dir)?;
        let properties: Vec<String> = index
            .schema()
            .fields()
            .map(|(_, entry)| entry.name().to_string())
            .filter(|name| name != ID_FIELD && name != SOURCE_FIELD)
            .collect();
        Self::from_index(index, SearchSchema::new(key, properties))
    }

    fn from_index(index: Index, schema: SearchSchema) -> Result<Self, SearchError> {
        let tantivy_schema = index.schema();
        let f_id = tantivy_schema.get_field(ID_FIELD)?;
        let f_source = tantivy_schema.get_field(SOURCE_FIELD)?;
        let fields = schema
            .properties
            .iter()
            .map(|p| -> Result<(String, Field), SearchError> {
                Ok((p.clone(), tantivy_schema.get_field(p)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;

        Ok(Self {
            schema,
            index,
            reader,
            writer,
            f_id,
            f_source,
            fields,
        })
    }

    pub fn schema(&self) -> &SearchSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.reader.searcher().num_docs() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> Result<bool, SearchError> {
        let query = TermQuery::new(Term::from_field_text(self.f_id, id), IndexRecordOption::Basic);
        Ok(self.reader.searcher().search(&query, &Count)? > 0)
    }

    /// Commit pending writes and make them visible to searches
    pub fn commit(&mut self) -> Result<(), SearchError> {
        self.writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// Index a document; its `id` is used when present, otherwise one is made
    pub fn insert(&mut self, value: Value) -> Result<String, SearchError> {
        let Value::Object(mut document) = value else {
            return Err(SearchError::InvalidDocument("expected a JSON object".to_string()));
        };

        let id = match document.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            None | Some(Value::Null) => new_id(),
            Some(other) => {
                return Err(SearchError::InvalidDocument(format!("invalid id {}", other)));
            }
        };
        if self.contains(&id)? {
            return Err(SearchError::DuplicateId(id));
        }
        document.insert("id".to_string(), Value::String(id.clone()));

        let mut doc = TantivyDocument::new();
        doc.add_text(self.f_id, &id);
        for (property, field) in &self.fields {
            match document.get(property) {
                None | Some(Value::Null) => {}
                Some(Value::String(text)) => doc.add_text(*field, text),
                Some(other) => {
                    return Err(SearchError::InvalidDocument(format!(
                        "property `{}` must be a string, got {}",
                        property, other
                    )));
                }
            }
        }
        doc.add_text(self.f_source, serde_json::to_string(&document)?);

        self.writer.add_document(doc)?;
        self.commit()?;
        Ok(id)
    }

    pub fn remove(&mut self, id: &str) -> Result<bool, SearchError> {
        if !self.contains(id)? {
            return Ok(false);
        }
        self.writer.delete_term(Term::from_field_text(self.f_id, id));
        self.commit()?;
        Ok(true)
    }

    pub fn search(&self, params: &SearchParams) -> Result<SearchResults, SearchError> {
        let started = Instant::now();
        let fields = match &params.properties {
            Some(properties) => properties
                .iter()
                .map(|p| {
                    self.fields
                        .iter()
                        .find(|(name, _)| name == p)
                        .map(|(_, field)| *field)
                        .ok_or_else(|| SearchError::UnknownProperty(p.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => self.fields.iter().map(|(_, field)| *field).collect(),
        };

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for field in fields {
            for token in self.tokens(field, &params.term)? {
                let term = Term::from_field_text(field, &token);
                clauses.push((
                    Occur::Should,
                    Box::new(TermQuery::new(term.clone(), IndexRecordOption::WithFreqs)),
                ));
                clauses.push((Occur::Should, Box::new(FuzzyTermQuery::new_prefix(term, 0, true))));
            }
        }
        let match_all = params.term.trim().is_empty();
        let query: Box<dyn Query> = if match_all {
            Box::new(AllQuery)
        } else {
            Box::new(BooleanQuery::new(clauses))
        };

        let searcher = self.reader.searcher();
        let everything = TopDocs::with_limit((searcher.num_docs() as usize).max(1));
        let mut scored = Vec::new();
        for (score, address) in searcher.search(&*query, &everything)? {
            let doc: TantivyDocument = searcher.doc(address)?;
            let id = doc
                .get_first(self.f_id)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let document = match doc.get_first(self.f_source).and_then(|v| v.as_str()) {
                Some(raw) => serde_json::from_str(raw)?,
                None => Value::Object(Map::new()),
            };
            let score = if match_all { 0.0 } else { f64::from(score) };
            scored.push(Hit { id, score, document });
        }
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));

        let count = scored.len();
        let hits = scored
            .into_iter()
            .skip(params.offset.unwrap_or(0))
            .take(params.limit.unwrap_or(DEFAULT_LIMIT))
            .collect();

        Ok(SearchResults {
            count,
            hits,
            elapsed_micros: started.elapsed().as_micros(),
        })
    }

    /// Run `text` through the analyzer the field was indexed with
    fn tokens(&self, field: Field, text: &str) -> Result<Vec<String>, SearchError> {
        let mut analyzer = self.index.tokenizer_for_field(field)?;
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        stream.process(&mut |token| tokens.push(token.text.clone()));
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index() -> SearchIndex {
        let mut index = SearchIndex::new(SearchSchema::new("users", ["name", "bio"])).unwrap();
        index
            .insert(json!({"id": "1", "name": "Alice Smith", "bio": "rust developer"}))
            .unwrap();
        index
            .insert(json!({"id": "2", "name": "Bob Stone", "bio": "loves rustic furniture and rust"}))
            .unwrap();
        index
            .insert(json!({"id": "3", "name": "Carol", "bio": "go developer"}))
            .unwrap();
        index
    }

    #[test]
    fn test_prefix_match() {
        let results = index().search(&SearchParams::term("rus")).unwrap();
        assert_eq!(results.count, 2);
        let ids: Vec<_> = results.hits.iter().map(|h| h.id.as_str()).collect();
        assert!(ids.contains(&"1") && ids.contains(&"2"));
        assert!(results.hits.iter().all(|h| h.score > 0.0));
    }

    #[test]
    fn test_whole_word_outranks_prefix() {
        let results = index().search(&SearchParams::term("car")).unwrap();
        assert_eq!(results.count, 1);

        let results = index().search(&SearchParams::term("stone sm")).unwrap();
        assert_eq!(results.count, 2);
        assert_eq!(results.hits[0].id, "2");
        assert!(results.hits[0].score > results.hits[1].score);
    }

    #[test]
    fn test_case_insensitive_and_document_returned() {
        let results = index().search(&SearchParams::term("ALICE")).unwrap();
        assert_eq!(results.count, 1);
        assert_eq!(results.hits[0].document["bio"], "rust developer");
        assert_eq!(results.hits[0].document["id"], "1");
    }

    #[test]
    fn test_empty_term_returns_everything() {
        let results = index().search(&SearchParams::default()).unwrap();
        assert_eq!(results.count, 3);
        assert!(results.hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_properties_restrict_match() {
        let params = SearchParams {
            term: "developer".into(),
            properties: Some(vec!["name".into()]),
            ..Default::default()
        };
        assert_eq!(index().search(&params).unwrap().count, 0);

        let params = SearchParams {
            term: "x".into(),
            properties: Some(vec!["email".into()]),
            ..Default::default()
        };
        assert!(matches!(index().search(&params), Err(SearchError::UnknownProperty(_))));
    }

    #[test]
    fn test_limit_and_offset() {
        let params = SearchParams {
            term: String::new(),
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        };
        let results = index().search(&params).unwrap();
        assert_eq!(results.count, 3);
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0].id, "2");
    }

    #[test]
    fn test_remove() {
        let mut index = index();
        assert!(index.remove("1").unwrap());
        assert!(!index.remove("1").unwrap());
        let results = index.search(&SearchParams::term("alice")).unwrap();
        assert_eq!(results.count, 0);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_insert_rejects_bad_documents() {
        let mut index = index();
        assert!(matches!(
            index.insert(json!({"id": "1", "name": "dup"})),
            Err(SearchError::DuplicateId(_))
        ));
        assert!(index.insert(json!({"name": 5})).is_err());
        assert!(index.insert(json!("text")).is_err());

        let id = index.insert(json!({"name": "Dave"})).unwrap();
        assert_eq!(id.len(), 32);
        assert!(index.contains(&id).unwrap());
    }

    #[test]
    fn test_open_recovers_schema_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users");
        {
            let mut index =
                SearchIndex::create(&path, SearchSchema::new("users", ["name", "bio"])).unwrap();
            index.insert(json!({"id": "1", "name": "Alice"})).unwrap();
        }

        let index = SearchIndex::open(&path).unwrap();
        assert_eq!(index.schema(), &SearchSchema::new("users", ["name", "bio"]));
        assert_eq!(index.len(), 1);
        assert!(SearchIndex::open(dir.path().join("missing")).is_err());
    }
}
