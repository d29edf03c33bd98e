//! Import pipeline driver.
//!
//! One [`Asset`] is one all-or-nothing import: container split, document
//! parse, required-extension gate, buffer materialization, reference
//! resolution and extension dispatch all happen up front; accessor
//! decoding stays lazy behind the session cache. Any failure aborts the
//! whole operation and the partially built state is dropped.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use memmap2::Mmap;
use tracing::{debug, info_span};

use crate::decode::{DecodeCache, DecodedAccessor, Decoder};
use crate::document::Document;
use crate::ext::{Augment, Registry};
use crate::glb;
use crate::resolve::{resolve, Graph};
use crate::scene::{RecordingHost, SceneBuilder, SceneHost};
use crate::util::{EntityKind, EntityRef, Error, ErrorKind, Result};

/// Collaborator interface for buffers whose data lives behind an
/// external URI. The core never touches the filesystem or network for
/// buffer data itself.
pub trait BufferFetch {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>>;
}

/// Refuses every external URI; for fully self-contained documents.
pub struct NoFetch;

impl BufferFetch for NoFetch {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("external buffer {uri:?} requires a fetch collaborator"),
        )))
    }
}

/// Resolves relative URIs against a base directory.
pub struct DirFetch {
    base: PathBuf,
}

impl DirFetch {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl BufferFetch for DirFetch {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.base.join(uri))?)
    }
}

/// A fully loaded, validated document plus its materialized buffers.
///
/// The asset exclusively owns every entity array for the lifetime of
/// the import; everything is dropped together.
#[derive(Debug)]
pub struct Asset {
    document: Document,
    graph: Graph,
    augment: Augment,
    buffers: Vec<Arc<[u8]>>,
    cache: DecodeCache,
}

impl Asset {
    /// Import from raw bytes: either a bare JSON document or a binary
    /// container.
    pub fn from_bytes(bytes: &[u8], fetch: &dyn BufferFetch, registry: &Registry) -> Result<Self> {
        let _span = info_span!("import").entered();

        let (json, bin) = if glb::is_binary(bytes) {
            let chunks = glb::split(bytes)?;
            (chunks.json, chunks.bin)
        } else {
            (std::str::from_utf8(bytes)?.to_string(), None)
        };

        let document = Document::from_json(&json)?;
        registry.check_required(&document)?;

        let buffers = materialize_buffers(&document, bin, fetch)?;
        let graph = resolve(&document)?;
        let augment = registry.dispatch(&document)?;

        debug!(
            buffers = buffers.len(),
            nodes = document.nodes.len(),
            meshes = document.meshes.len(),
            "import resolved"
        );

        Ok(Self {
            document,
            graph,
            augment,
            buffers,
            cache: DecodeCache::new(),
        })
    }

    /// Import a self-contained document with the standard extension set.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(bytes, &NoFetch, &Registry::standard())
    }

    /// Import from a file, resolving external buffers next to it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &Registry::standard())
    }

    /// Import from a file with a custom extension registry.
    pub fn open_with(path: impl AsRef<Path>, registry: &Registry) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let fetch = DirFetch::new(path.parent().unwrap_or_else(|| Path::new(".")));
        // Safety: mapped read-only for the duration of the parse.
        match unsafe { Mmap::map(&file) } {
            Ok(map) => Self::from_bytes(&map, &fetch, registry),
            // Zero-length files and exotic filesystems fall back to a read
            Err(_) => Self::from_bytes(&std::fs::read(path)?, &fetch, registry),
        }
    }

    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[inline]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[inline]
    pub fn augment(&self) -> &Augment {
        &self.augment
    }

    /// Materialized bytes of buffer `index`.
    #[inline]
    pub fn buffer(&self, index: usize) -> &Arc<[u8]> {
        &self.buffers[index]
    }

    /// Decode accessor `index` (lazy, cached per session).
    pub fn decode(&self, index: usize) -> Result<Arc<DecodedAccessor>> {
        Decoder::new(&self.document, &self.buffers, &self.cache).decode(index)
    }

    /// Eagerly decode every accessor in parallel.
    pub fn decode_all(&self) -> Result<()> {
        let _span = info_span!("decode_all").entered();
        Decoder::new(&self.document, &self.buffers, &self.cache).decode_all()
    }

    /// Drive the host through one scene.
    pub fn build_scene<H: SceneHost>(&self, scene: usize, host: &mut H) -> Result<()> {
        SceneBuilder::new(self, host).build_scene(scene)
    }

    /// Drive the host through the document's default scene (the declared
    /// one, else scene 0; a document without scenes builds nothing).
    pub fn build_default_scene<H: SceneHost>(&self, host: &mut H) -> Result<()> {
        match self.document.scene {
            Some(scene) => self.build_scene(scene, host),
            None if !self.document.scenes.is_empty() => self.build_scene(0, host),
            None => Ok(()),
        }
    }
}

/// Resolve every buffer's data source into bytes.
fn materialize_buffers(
    doc: &Document,
    bin: Option<Vec<u8>>,
    fetch: &dyn BufferFetch,
) -> Result<Vec<Arc<[u8]>>> {
    let mut bin = bin;
    doc.buffers
        .iter()
        .enumerate()
        .map(|(i, buffer)| {
            let entity = EntityRef::new(EntityKind::Buffer, i);
            let mut data: Vec<u8> = match &buffer.uri {
                None => {
                    if i != 0 {
                        return Err(Error::schema(
                            entity,
                            "only buffer 0 may use the binary chunk",
                        ));
                    }
                    bin.take().ok_or_else(|| {
                        Error::schema(entity, "buffer has no uri and no binary chunk")
                    })?
                }
                Some(uri) if uri.starts_with("data:") => decode_data_uri(uri, entity)?,
                Some(uri) => fetch.fetch(uri)?,
            };
            if data.len() < buffer.byte_length {
                return Err(Error::schema(
                    entity,
                    format!(
                        "{} bytes of data for declared byteLength {}",
                        data.len(),
                        buffer.byte_length
                    ),
                ));
            }
            // Chunk alignment may pad the source past the declared length.
            data.truncate(buffer.byte_length);
            Ok(Arc::from(data))
        })
        .collect()
}

/// Decode a base64 `data:` URI payload.
fn decode_data_uri(uri: &str, entity: EntityRef) -> Result<Vec<u8>> {
    let rest = uri.strip_prefix("data:").unwrap_or(uri);
    let Some((mime, payload)) = rest.split_once(',') else {
        return Err(Error::schema(entity, "malformed data URI"));
    };
    if !mime.ends_with(";base64") {
        return Err(Error::schema(entity, "data URI without base64 encoding"));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::schema(entity, format!("invalid base64 payload: {e}")))
}

/// Pass/fail outcome of one file in a batch run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Pass,
    Fail,
}

/// Outcome of importing one file, with the first failing error kind and
/// location when it failed.
pub struct ReportEntry {
    pub path: PathBuf,
    pub error: Option<Error>,
}

impl ReportEntry {
    pub fn status(&self) -> Status {
        if self.error.is_none() {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(Error::kind)
    }

    pub fn location(&self) -> Option<EntityRef> {
        self.error.as_ref().and_then(Error::location)
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "PASS  {}", self.path.display()),
            Some(error) => {
                write!(f, "FAIL  {}  {}", self.path.display(), error.kind())?;
                if let Some(entity) = error.location() {
                    write!(f, " at {entity}")?;
                }
                write!(f, ": {error}")
            }
        }
    }
}

/// Batch diagnostics over a corpus of input files.
///
/// Each file runs the entire pipeline - import, full decode, and a
/// scene build against a recording host - so regressions anywhere in
/// the chain surface as failures.
pub struct Report {
    pub entries: Vec<ReportEntry>,
}

impl Report {
    pub fn run<I, P>(paths: I, registry: &Registry) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let entries = paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref().to_path_buf();
                let error = import_fully(&path, registry).err();
                ReportEntry { path, error }
            })
            .collect();
        Self { entries }
    }

    pub fn passed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status() == Status::Pass)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        write!(f, "{} passed, {} failed", self.passed(), self.failed())
    }
}

/// Exercise the whole pipeline for one file.
fn import_fully(path: &Path, registry: &Registry) -> Result<()> {
    let asset = Asset::open_with(path, registry)?;
    asset.decode_all()?;
    let mut host = RecordingHost::default();
    for scene in 0..asset.document().scenes.len() {
        asset.build_scene(scene, &mut host)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_decoding() {
        let entity = EntityRef::new(EntityKind::Buffer, 0);
        let data = decode_data_uri("data:application/octet-stream;base64,AQID", entity).unwrap();
        assert_eq!(data, vec![1, 2, 3]);

        assert!(decode_data_uri("data:text/plain,hello", entity).is_err());
        assert!(decode_data_uri("data:application/octet-stream;base64,!!!", entity).is_err());
    }

    #[test]
    fn test_no_fetch_refuses() {
        let err = NoFetch.fetch("mesh.bin").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_buffer_shorter_than_declared() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"uri": "data:application/octet-stream;base64,AQID", "byteLength": 16}]
        }"#;
        let err = Asset::from_slice(json.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
        assert_eq!(err.location().unwrap().kind, EntityKind::Buffer);
    }

    #[test]
    fn test_external_buffer_needs_collaborator() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"uri": "mesh.bin", "byteLength": 4}]
        }"#;
        let err = Asset::from_slice(json.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
