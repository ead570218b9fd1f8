use std::io::Read;

/// Reader wrapper that feeds every byte it yields into an MD5 state, so the
/// digest of the written destination comes out of the same pass that wrote
/// it. There is never a separate re-read to hash.
pub struct Md5Reader<R> {
    inner: R,
    context: md5::Context,
}

impl<R: Read> Md5Reader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            context: md5::Context::new(),
        }
    }

    /// Hex digest of everything read so far. Consumes the reader.
    pub fn finalize(self) -> String {
        format!("{:x}", self.context.compute())
    }
}

impl<R: Read> Read for Md5Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.context.consume(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
#[path = "tests/md5_stream_tests.rs"]
mod tests;
