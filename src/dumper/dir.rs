use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::Sink;
use crate::error::MultiError;
use crate::objects::{self, Page};

/// Writes objects into a directory tree, one JSON object per line:
///
/// - `objects-<Kind>[.<group>].json` gets every object of that kind;
/// - namespaced objects also go to `split/<namespace>/__all__.json` and
///   `split/<namespace>/<Kind>[.<group>].json`.
///
/// Files are created on first write and stay open until [`DirDumper::close`]
/// (or drop). Not safe for concurrent use.
pub struct DirDumper {
    dir: PathBuf,
    open_files: HashMap<PathBuf, BufWriter<File>>,
    buf: Vec<u8>,
}

impl DirDumper {
    /// Creates `dir` (and parents) if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
        Ok(Self {
            dir,
            open_files: HashMap::new(),
            buf: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Flush and close every open file. All failures are reported together.
    pub fn close(mut self) -> Result<(), MultiError> {
        let mut errs = MultiError::default();
        for (path, mut file) in self.open_files.drain() {
            if let Err(e) = file.flush() {
                errs.push(anyhow::Error::new(e).context(format!("failed to close {}", path.display())));
            }
        }
        errs.into_result()
    }

    fn write_to_file(&mut self, path: PathBuf, line: &[u8]) -> Result<()> {
        let file = self.file(path)?;
        file.write_all(line).context("failed to copy to file")
    }

    fn file(&mut self, path: PathBuf) -> Result<&mut BufWriter<File>> {
        use std::collections::hash_map::Entry;

        match self.open_files.entry(path) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let path = e.key();
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create directory {}", parent.display())
                    })?;
                }
                let f = File::create(path)
                    .with_context(|| format!("failed to create file {}", path.display()))?;
                Ok(e.insert(BufWriter::new(f)))
            }
        }
    }
}

impl Sink for DirDumper {
    fn deliver(&mut self, page: &Page) -> Result<()> {
        let mut errs = MultiError::default();
        for obj in &page.items {
            self.buf.clear();
            if let Err(e) = serde_json::to_writer(&mut self.buf, obj) {
                errs.push(anyhow::Error::new(e).context("failed to encode object"));
                continue;
            }
            self.buf.push(b'\n');
            let line = std::mem::take(&mut self.buf);
            let gk = objects::group_kind(obj);

            let all = self.dir.join(format!("objects-{gk}.json"));
            if let Err(e) = self.write_to_file(all, &line) {
                errs.push(e);
            }

            let ns = objects::namespace(obj);
            if !ns.is_empty() {
                if is_path_segment(ns) {
                    let split = self.dir.join("split").join(ns);
                    for name in ["__all__.json".to_string(), format!("{gk}.json")] {
                        if let Err(e) = self.write_to_file(split.join(name), &line) {
                            errs.push(e);
                        }
                    }
                } else {
                    errs.push(anyhow::anyhow!(
                        "refusing to split {} into namespace directory {ns:?}",
                        objects::name(obj)
                    ));
                }
            }
            self.buf = line;
        }
        errs.into_result()?;
        Ok(())
    }
}

/// Namespaces are DNS labels; anything else must not escape the dump root.
fn is_path_segment(s: &str) -> bool {
    s != "." && s != ".." && !s.contains(['/', '\\'])
}
