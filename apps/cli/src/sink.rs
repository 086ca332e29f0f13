// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON Lines output: one `<table>.jsonl` per table, plus
//! `<table>.patches.jsonl` for column updates issued after the rows.

use citydb_lite_importer::{ImporterKind, Patch, Row, StorageSink, WriteError};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Stream {
    Rows(ImporterKind),
    Patches(ImporterKind),
}

impl Stream {
    fn file_name(self) -> String {
        match self {
            Stream::Rows(kind) => format!("{}.jsonl", kind.table()),
            Stream::Patches(kind) => format!("{}.patches.jsonl", kind.table()),
        }
    }
}

pub struct JsonLinesSink {
    dir: PathBuf,
    files: Mutex<FxHashMap<Stream, BufWriter<File>>>,
}

impl JsonLinesSink {
    /// Create `dir` if needed. Existing table files are truncated on first
    /// write.
    pub fn create(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            files: Mutex::new(FxHashMap::default()),
        })
    }

    /// Append a whole batch or nothing: every item is serialized before
    /// the file is touched.
    fn append<T: Serialize>(&self, stream: Stream, items: &[T]) -> Result<(), WriteError> {
        let mut buf = Vec::new();
        for item in items {
            serde_json::to_writer(&mut buf, item)
                .map_err(|err| WriteError::Rejected(err.to_string()))?;
            buf.push(b'\n');
        }

        let mut files = self.files.lock();
        let out = match files.entry(stream) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let file = File::create(self.dir.join(stream.file_name()))?;
                e.insert(BufWriter::new(file))
            }
        };
        out.write_all(&buf)?;
        Ok(())
    }

    /// Flush every open file.
    pub fn close(&self) -> std::io::Result<()> {
        for out in self.files.lock().values_mut() {
            out.flush()?;
        }
        Ok(())
    }
}

impl StorageSink for JsonLinesSink {
    fn write(&self, kind: ImporterKind, rows: Vec<Row>) -> Result<(), WriteError> {
        self.append(Stream::Rows(kind), &rows)
    }

    fn patch(&self, kind: ImporterKind, patches: Vec<Patch>) -> Result<(), WriteError> {
        self.append(Stream::Patches(kind), &patches)
    }
}
