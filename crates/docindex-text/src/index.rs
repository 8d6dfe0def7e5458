use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tantivy::directory::{Directory, MmapDirectory, RamDirectory, INDEX_WRITER_LOCK};
use tantivy::schema::Schema;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument};
use tracing::{debug, error, info, warn};

use docindex_core::config::IndexSettings;
use docindex_core::types::{DocumentValueMap, FieldDefinition, IndexSchema};
use docindex_core::{Error, Result};

use crate::codec::FieldSet;
use crate::tantivy_utils::{build_engine_schema, schema_from_engine, AnalyzerConfig};

/// Default writer memory budget.
pub const DEFAULT_WRITER_HEAP_BYTES: usize = 50_000_000;
/// The engine refuses smaller per-thread budgets.
const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;

/// Where an index lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
	Path(PathBuf),
	InMemory,
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Location::Path(p) => write!(f, "{}", p.display()),
			Location::InMemory => f.write_str(docindex_core::config::IN_MEMORY_LOCATION),
		}
	}
}

impl From<&IndexSettings> for Location {
	fn from(s: &IndexSettings) -> Self {
		s.path().map_or(Location::InMemory, Location::Path)
	}
}

/// How `open_writer` treats existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
	/// Discard whatever is there.
	Create,
	/// Require an existing index.
	Append,
	CreateOrAppend,
}

/// A storage location. Clones share storage and the single-writer guard.
#[derive(Clone)]
pub struct IndexHandle {
	inner: Arc<HandleInner>,
}

struct HandleInner {
	location: Location,
	ram: Mutex<RamDirectory>,
	writer_active: AtomicBool,
	writer_heap_bytes: usize,
}

impl fmt::Debug for IndexHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("IndexHandle")
			.field("location", &self.inner.location)
			.field("writer_active", &self.inner.writer_active.load(Ordering::Acquire))
			.finish()
	}
}

impl IndexHandle {
	pub fn open(location: Location) -> Result<Self> {
		Self::open_with_heap(location, DEFAULT_WRITER_HEAP_BYTES)
	}

	pub fn in_memory() -> Self {
		Self::build(Location::InMemory, DEFAULT_WRITER_HEAP_BYTES)
	}

	pub fn from_settings(settings: &IndexSettings) -> Result<Self> {
		Self::open_with_heap(Location::from(settings), settings.writer_heap_bytes)
	}

	pub fn open_with_heap(location: Location, writer_heap_bytes: usize) -> Result<Self> {
		if let Location::Path(p) = &location {
			if p.exists() && !p.is_dir() {
				return Err(Error::resource(format!("{} exists and is not a directory", p.display())));
			}
		}
		Ok(Self::build(location, writer_heap_bytes))
	}

	fn build(location: Location, writer_heap_bytes: usize) -> Self {
		Self {
			inner: Arc::new(HandleInner {
				location,
				ram: Mutex::new(RamDirectory::create()),
				writer_active: AtomicBool::new(false),
				writer_heap_bytes: writer_heap_bytes.max(MIN_WRITER_HEAP_BYTES),
			}),
		}
	}

	pub fn location(&self) -> &Location {
		&self.inner.location
	}

	/// Open the single writer for this location.
	///
	/// `schema` is used when a new index is created. Appending keeps the
	/// schema the index was created with.
	pub fn open_writer(&self, schema: &IndexSchema, analyzer: &AnalyzerConfig, mode: OpenMode) -> Result<Writer> {
		let lease = WriterLease::acquire(&self.inner)?;
		let index = match mode {
			OpenMode::Create => self.create_index(schema)?,
			OpenMode::Append => self
				.open_existing()?
				.ok_or_else(|| Error::resource(format!("no index to append to at {}", self.inner.location)))?,
			OpenMode::CreateOrAppend => match self.open_existing()? {
				Some(index) => index,
				None => self.create_index(schema)?,
			},
		};
		analyzer.register(&index);

		let logical = load_logical_schema(&index)?.unwrap_or_else(|| schema.clone());
		if mode != OpenMode::Create && logical != *schema && !schema.is_empty() {
			warn!(location = %self.inner.location, "appending with the schema stored in the index; the supplied schema differs");
		}
		let fields = FieldSet::new(&logical, &index.schema())?;
		let writer: IndexWriter<TantivyDocument> = index
			.writer_with_num_threads(1, self.inner.writer_heap_bytes)
			.map_err(|e| Error::resource(format!("opening writer at {}: {}", self.inner.location, e)))?;
		info!(location = %self.inner.location, ?mode, fields = fields.len(), "writer opened");
		Ok(Writer { writer: Some(writer), fields, schema: logical, pending: 0, location: self.inner.location.clone(), _lease: lease })
	}

	/// Open a point-in-time reader. `Ok(None)` means there is no index here yet.
	pub fn open_reader(&self) -> Result<Option<Reader>> {
		let Some(index) = self.open_existing()? else {
			debug!(location = %self.inner.location, "no index present");
			return Ok(None);
		};
		let reader = index
			.reader_builder()
			.reload_policy(ReloadPolicy::Manual)
			.try_into()
			.map_err(|e| Error::resource(format!("opening reader at {}: {}", self.inner.location, e)))?;
		let engine_schema = index.schema();
		let schema = match load_logical_schema(&index)? {
			Some(s) => s,
			None => schema_from_engine(&engine_schema)?,
		};
		let searcher = reader.searcher();
		debug!(location = %self.inner.location, docs = searcher.num_docs(), "reader opened");
		Ok(Some(Reader { _reader: reader, searcher, schema, engine_schema }))
	}

	fn open_existing(&self) -> Result<Option<Index>> {
		let dir: Box<dyn Directory> = match &self.inner.location {
			Location::Path(p) => {
				if !p.exists() { return Ok(None); }
				Box::new(open_mmap(p)?)
			}
			Location::InMemory => Box::new(self.ram().clone()),
		};
		let exists = Index::exists(&*dir).map_err(Error::resource)?;
		if !exists { return Ok(None); }
		Index::open(dir).map(Some).map_err(|e| Error::resource(format!("opening index at {}: {}", self.inner.location, e)))
	}

	fn create_index(&self, schema: &IndexSchema) -> Result<Index> {
		let engine_schema = build_engine_schema(schema)?;
		let index = match &self.inner.location {
			Location::Path(p) => {
				clear_directory(p)?;
				Index::create(open_mmap(p)?, engine_schema, tantivy::IndexSettings::default())
			}
			Location::InMemory => {
				let fresh = RamDirectory::create();
				*self.ram() = fresh.clone();
				Index::create(fresh, engine_schema, tantivy::IndexSettings::default())
			}
		}
		.map_err(|e| Error::resource(format!("creating index at {}: {}", self.inner.location, e)))?;
		info!(location = %self.inner.location, "created empty index");
		Ok(index)
	}

	fn ram(&self) -> std::sync::MutexGuard<'_, RamDirectory> {
		self.inner.ram.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

fn open_mmap(p: &Path) -> Result<MmapDirectory> {
	MmapDirectory::open(p).map_err(|e| Error::resource(format!("opening directory {}: {}", p.display(), e)))
}

/// Files the engine keeps outside its managed list.
const META_FILE: &str = "meta.json";
const MANAGED_FILE: &str = ".managed.json";
/// Prefix of the engine's lock files.
const LOCK_PREFIX: &str = ".tantivy-";

/// Make `p` ready for a fresh index.
///
/// An existing index loses only the files the engine manages; anything else
/// in the directory is left alone. A non-empty directory that holds no index
/// is refused. Also refuses while another writer (e.g. another process)
/// holds the engine's writer lock.
fn clear_directory(p: &Path) -> Result<()> {
	if !p.exists() {
		std::fs::create_dir_all(p)?;
		return Ok(());
	}
	let dir = open_mmap(p)?;
	if Index::exists(&dir).map_err(Error::resource)? {
		let _lock = dir
			.acquire_lock(&INDEX_WRITER_LOCK)
			.map_err(|e| Error::resource(format!("{} is locked by another writer: {}", p.display(), e)))?;
		let mut files = managed_files(p)?;
		files.push(PathBuf::from(META_FILE));
		files.push(PathBuf::from(MANAGED_FILE));
		for file in files {
			match std::fs::remove_file(p.join(&file)) {
				Ok(()) => {}
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
				Err(e) => return Err(Error::resource(format!("removing {}: {}", p.join(&file).display(), e))),
			}
		}
		debug!(location = %p.display(), "discarded existing index files");
		return Ok(());
	}
	for entry in std::fs::read_dir(p)? {
		let name = entry?.file_name();
		if !name.to_string_lossy().starts_with(LOCK_PREFIX) {
			return Err(Error::resource(format!(
				"{} is not empty and holds no index; refusing to create one there",
				p.display()
			)));
		}
	}
	Ok(())
}

/// Segment files listed by the engine. Missing or unreadable lists yield none.
fn managed_files(p: &Path) -> Result<Vec<PathBuf>> {
	let raw = match std::fs::read_to_string(p.join(MANAGED_FILE)) {
		Ok(raw) => raw,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
		Err(e) => return Err(e.into()),
	};
	match serde_json::from_str::<Vec<PathBuf>>(&raw) {
		Ok(files) => Ok(files.into_iter().filter(|f| f.is_relative() && f.components().count() == 1).collect()),
		Err(e) => {
			warn!(error = %e, location = %p.display(), "unreadable managed file list");
			Ok(Vec::new())
		}
	}
}

/// Logical schema persisted in the last commit payload, if any.
fn load_logical_schema(index: &Index) -> Result<Option<IndexSchema>> {
	let metas = index.load_metas().map_err(Error::resource)?;
	let Some(payload) = metas.payload else { return Ok(None) };
	match serde_json::from_str::<Vec<FieldDefinition>>(&payload) {
		Ok(defs) => IndexSchema::new(defs).map(Some),
		Err(e) => {
			warn!(error = %e, "ignoring unreadable schema payload");
			Ok(None)
		}
	}
}

/// Held by a `Writer`; releases the handle's writer slot on drop.
struct WriterLease {
	handle: Arc<HandleInner>,
}

impl WriterLease {
	fn acquire(handle: &Arc<HandleInner>) -> Result<Self> {
		handle
			.writer_active
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.map_err(|_| Error::resource(format!("a writer is already open at {}", handle.location)))?;
		Ok(Self { handle: Arc::clone(handle) })
	}
}

impl Drop for WriterLease {
	fn drop(&mut self) {
		self.handle.writer_active.store(false, Ordering::Release);
	}
}

/// The single writer of an index location.
///
/// Documents become visible to readers opened after [`Writer::commit`] or
/// [`Writer::close`]. Dropping an unclosed writer commits as well; failures
/// on that path can only be logged.
pub struct Writer {
	writer: Option<IndexWriter<TantivyDocument>>,
	fields: FieldSet,
	schema: IndexSchema,
	pending: u64,
	location: Location,
	_lease: WriterLease,
}

impl fmt::Debug for Writer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Writer")
			.field("location", &self.location)
			.field("pending", &self.pending)
			.field("open", &self.writer.is_some())
			.finish()
	}
}

impl Writer {
	pub fn schema(&self) -> &IndexSchema {
		&self.schema
	}

	/// Documents added since the last commit.
	pub fn pending(&self) -> u64 {
		self.pending
	}

	pub fn add_document(&mut self, values: &DocumentValueMap) -> Result<()> {
		let doc = self.fields.bind(values)?;
		self.engine()?.add_document(doc).map_err(Error::resource)?;
		self.pending += 1;
		Ok(())
	}

	pub fn add_documents<'a, I>(&mut self, docs: I) -> Result<usize>
	where
		I: IntoIterator<Item = &'a DocumentValueMap>,
	{
		let mut count = 0;
		for values in docs {
			self.add_document(values)?;
			count += 1;
		}
		Ok(count)
	}

	/// Remove every document, effective at the next commit.
	pub fn delete_all(&mut self) -> Result<()> {
		self.engine()?.delete_all_documents().map_err(Error::resource)?;
		Ok(())
	}

	pub fn commit(&mut self) -> Result<()> {
		let pending = self.pending;
		let writer = self.writer.as_mut().ok_or_else(|| Error::resource("writer already closed"))?;
		commit_with_schema(writer, &self.schema)?;
		info!(location = %self.location, documents = pending, "committed");
		self.pending = 0;
		Ok(())
	}

	/// Commit and release the location.
	pub fn close(mut self) -> Result<()> {
		self.commit()?;
		if let Some(writer) = self.writer.take() {
			writer.wait_merging_threads().map_err(Error::resource)?;
		}
		Ok(())
	}

	fn engine(&mut self) -> Result<&mut IndexWriter<TantivyDocument>> {
		self.writer.as_mut().ok_or_else(|| Error::resource("writer already closed"))
	}
}

impl Drop for Writer {
	fn drop(&mut self) {
		if let Some(mut writer) = self.writer.take() {
			match commit_with_schema(&mut writer, &self.schema) {
				Ok(()) => debug!(location = %self.location, documents = self.pending, "committed on drop"),
				Err(e) => error!(location = %self.location, error = %e, "commit on drop failed"),
			}
		}
	}
}

fn commit_with_schema(writer: &mut IndexWriter<TantivyDocument>, schema: &IndexSchema) -> Result<()> {
	let payload = serde_json::to_string(schema).map_err(|e| Error::resource(format!("encoding schema payload: {e}")))?;
	let mut prepared = writer.prepare_commit().map_err(Error::resource)?;
	prepared.set_payload(&payload);
	prepared.commit().map_err(Error::resource)?;
	Ok(())
}

/// A point-in-time snapshot of an index. Cheap to clone and safe to share
/// across threads; it never observes commits made after it was opened.
#[derive(Clone)]
pub struct Reader {
	_reader: IndexReader,
	searcher: Searcher,
	schema: IndexSchema,
	engine_schema: Schema,
}

impl fmt::Debug for Reader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Reader").field("num_docs", &self.num_docs()).field("schema", &self.schema).finish()
	}
}

impl Reader {
	pub fn num_docs(&self) -> u64 {
		self.searcher.num_docs()
	}

	pub fn schema(&self) -> &IndexSchema {
		&self.schema
	}

	pub(crate) fn searcher(&self) -> &Searcher {
		&self.searcher
	}

	pub(crate) fn engine_schema(&self) -> &Schema {
		&self.engine_schema
	}
}
