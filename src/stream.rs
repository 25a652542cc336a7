//! The quad stream contract at the format boundary. Codecs implement
//! these traits; the engine only ever sees quads flowing through them.

use crate::error::Result;
use crate::model::Quad;
use crate::writer::QuadWriter;

/// A source of quads. End of stream is `Ok(None)`.
pub trait Reader {
    fn read_quad(&mut self) -> Result<Option<Quad>>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A sink of quads. `write_quads` is the batch fast path; the default
/// just loops.
pub trait Writer {
    fn write_quad(&mut self, q: Quad) -> Result<()>;

    fn write_quads(&mut self, quads: Vec<Quad>) -> Result<usize> {
        let n = quads.len();
        for q in quads {
            self.write_quad(q)?;
        }
        Ok(n)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

const COPY_BATCH: usize = 10_000;

/// Pumps every quad from `src` into `dst`, batched, returning the
/// number copied.
pub fn copy(dst: &mut dyn Writer, src: &mut dyn Reader) -> Result<u64> {
    let mut total = 0u64;
    let mut batch = Vec::with_capacity(COPY_BATCH);
    loop {
        match src.read_quad()? {
            Some(q) => {
                batch.push(q);
                if batch.len() == COPY_BATCH {
                    total += dst.write_quads(std::mem::take(&mut batch))? as u64;
                    batch.reserve(COPY_BATCH);
                }
            }
            None => {
                if !batch.is_empty() {
                    total += dst.write_quads(batch)? as u64;
                }
                return Ok(total);
            }
        }
    }
}

/// Reader over an in-memory list of quads.
pub struct SliceReader {
    quads: Vec<Quad>,
    at: usize,
}

impl SliceReader {
    pub fn new(quads: Vec<Quad>) -> SliceReader {
        SliceReader { quads, at: 0 }
    }
}

impl Reader for SliceReader {
    fn read_quad(&mut self) -> Result<Option<Quad>> {
        if self.at >= self.quads.len() {
            return Ok(None);
        }
        let q = self.quads[self.at].clone();
        self.at += 1;
        Ok(Some(q))
    }
}

/// Writer that collects quads in memory.
#[derive(Default)]
pub struct VecWriter {
    quads: Vec<Quad>,
}

impl VecWriter {
    pub fn new() -> VecWriter {
        VecWriter::default()
    }

    pub fn into_quads(self) -> Vec<Quad> {
        self.quads
    }
}

impl Writer for VecWriter {
    fn write_quad(&mut self, q: Quad) -> Result<()> {
        self.quads.push(q);
        Ok(())
    }
}

/// Adapter feeding a store writer from a quad stream: loading a dump
/// is `copy(&mut StoreSink::new(&mut w), &mut reader)`.
pub struct StoreSink<'a> {
    writer: &'a mut dyn QuadWriter,
}

impl<'a> StoreSink<'a> {
    pub fn new(writer: &'a mut dyn QuadWriter) -> StoreSink<'a> {
        StoreSink { writer }
    }
}

impl Writer for StoreSink<'_> {
    fn write_quad(&mut self, q: Quad) -> Result<()> {
        self.writer.add_quad(q)
    }

    fn write_quads(&mut self, quads: Vec<Quad>) -> Result<usize> {
        let n = quads.len();
        self.writer.add_quad_set(quads)?;
        Ok(n)
    }
}
