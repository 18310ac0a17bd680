//! Sinks that persist listed pages.
//!
//! A sink may see the same object more than once: some API servers repeat
//! items across continuation pages, and nothing upstream deduplicates.

mod dir;

use std::io::Write;

use anyhow::{Context, Result};

use crate::objects::Page;

pub use dir::DirDumper;

/// Receives every page the enumerator fetches. Called sequentially, never
/// concurrently.
pub trait Sink {
    fn deliver(&mut self, page: &Page) -> Result<()>;
}

impl<F> Sink for F
where
    F: FnMut(&Page) -> Result<()>,
{
    fn deliver(&mut self, page: &Page) -> Result<()> {
        self(page)
    }
}

/// Writes each page as one JSON list document per line.
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn deliver(&mut self, page: &Page) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &page.to_list()).context("Failed to encode page")?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
