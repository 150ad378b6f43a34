use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::backend::{validate_name, TableKind, TableSnapshot, TableStorage};
use crate::error::{StoreError, StoreResult};

const MAGIC: &str = "arbor-table v1";
const EXTENSION: &str = "tbl";

/// Directory-of-files table storage.
///
/// Each table lives in `<root>/trees/<name>.tbl` or `<root>/maps/<name>.tbl`.
///
/// On-disk format:
/// ```text
/// arbor-table v1 crc32=<8 lowercase hex digits>\n
/// <JSON-serialized TableSnapshot>
/// ```
///
/// The checksum covers the JSON payload. Files are written to a temporary
/// file in the same directory and renamed into place, so a reader sees
/// either the old table or the new one.
pub struct FileTables {
    root: PathBuf,
}

impl FileTables {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, kind: TableKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    fn table_path(&self, kind: TableKind, name: &str) -> PathBuf {
        self.dir(kind).join(format!("{name}.{EXTENSION}"))
    }
}

/// Frame a snapshot as header line plus payload.
fn encode_table(snapshot: &TableSnapshot) -> StoreResult<Vec<u8>> {
    let payload =
        serde_json::to_vec(snapshot).map_err(|e| StoreError::Translation(e.to_string()))?;
    let crc = crc32fast::hash(&payload);
    let mut bytes = format!("{MAGIC} crc32={crc:08x}\n").into_bytes();
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Verify the header and checksum, then parse the payload.
fn decode_table(name: &str, bytes: &[u8]) -> StoreResult<TableSnapshot> {
    let corrupt = |reason: String| StoreError::Corrupt {
        name: name.to_string(),
        reason,
    };

    let newline = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| corrupt("missing header line".into()))?;
    let (header, payload) = (&bytes[..newline], &bytes[newline + 1..]);

    let header =
        std::str::from_utf8(header).map_err(|_| corrupt("header is not UTF-8".into()))?;
    let hex = header
        .strip_prefix(MAGIC)
        .and_then(|rest| rest.strip_prefix(" crc32="))
        .ok_or_else(|| corrupt(format!("unrecognized header '{header}'")))?;
    let expected =
        u32::from_str_radix(hex, 16).map_err(|_| corrupt(format!("bad checksum '{hex}'")))?;

    let computed = crc32fast::hash(payload);
    if computed != expected {
        return Err(corrupt(format!(
            "checksum mismatch: expected {expected:08x}, computed {computed:08x}"
        )));
    }

    serde_json::from_slice(payload).map_err(|e| corrupt(e.to_string()))
}

impl TableStorage for FileTables {
    fn prepare(&self) -> StoreResult<()> {
        for kind in [TableKind::Tree, TableKind::Map] {
            fs::create_dir_all(self.dir(kind))?;
        }
        debug!(root = %self.root.display(), "prepared table directories");
        Ok(())
    }

    fn load_table(&self, kind: TableKind, name: &str) -> StoreResult<Option<TableSnapshot>> {
        validate_name(name)?;
        let path = self.table_path(kind, name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match decode_table(name, &bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "rejected corrupt table");
                Err(err)
            }
        }
    }

    fn save_table(&self, kind: TableKind, name: &str, snapshot: &TableSnapshot) -> StoreResult<()> {
        validate_name(name)?;
        let dir = self.dir(kind);
        fs::create_dir_all(&dir)?;
        let bytes = encode_table(snapshot)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        let path = self.table_path(kind, name);
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(path = %path.display(), entries = snapshot.len(), bytes = bytes.len(), "saved table");
        Ok(())
    }

    fn delete_table(&self, kind: TableKind, name: &str) -> StoreResult<bool> {
        validate_name(name)?;
        match fs::remove_file(self.table_path(kind, name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn table_names(&self, kind: TableKind) -> StoreResult<Vec<String>> {
        let entries = match fs::read_dir(self.dir(kind)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) => names.push(stem.to_string()),
                None => warn!(path = %path.display(), "skipping table with non UTF-8 name"),
            }
        }
        names.sort();
        Ok(names)
    }
}
