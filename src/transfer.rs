use std::io::{self, Write};

use crate::term::Term;

/// MIME type offered for both clipboard and primary selections.
pub const MIME_TEXT_UTF8: &str = "text/plain;charset=utf-8";

/// Framing emitted around pasted content when bracketed-paste mode is set.
pub const BRACKETED_PASTE_BEGIN: &[u8] = b"\x1b[200~";
pub const BRACKETED_PASTE_END: &[u8] = b"\x1b[201~";

/// Channels finalized selections are published through. The grid core emits
/// opaque byte strings; the window-system layer owns the actual transport.
pub trait TransferSink {
    fn publish_primary(&mut self, text: &[u8]);
    fn publish_clipboard(&mut self, text: &[u8]);
}

#[derive(Debug, PartialEq, Eq)]
pub enum SendStatus {
    /// Everything was written.
    Done,
    /// The writer is full; call `drain` again from a writable callback.
    Remain,
}

/// A selection payload draining through a non-blocking writer. Bytes the
/// kernel will not take stay queued; the owner retries from its writable-fd
/// callback and drops the context on completion or fd death.
#[derive(Debug)]
pub struct SendContext {
    data: Vec<u8>,
    idx: usize,
}

impl SendContext {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, idx: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.idx
    }

    /// Write as much as possible. `WouldBlock` is not an error: the rest of
    /// the payload stays queued. Real errors abandon the transfer.
    pub fn drain(&mut self, writer: &mut dyn Write) -> io::Result<SendStatus> {
        while self.idx < self.data.len() {
            match writer.write(&self.data[self.idx..]) {
                Ok(0) => {
                    let err = io::Error::new(io::ErrorKind::WriteZero, "selection fd closed");
                    tracing::warn!(
                        "failed to write {} bytes of selection data: {}",
                        self.remaining(),
                        err
                    );
                    return Err(err);
                }
                Ok(n) => self.idx += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(SendStatus::Remain),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(
                        "failed to write {} bytes of selection data: {}",
                        self.remaining(),
                        e
                    );
                    return Err(e);
                }
            }
        }
        Ok(SendStatus::Done)
    }
}

/// Receive side of a clipboard/primary transfer: forwards chunks to a byte
/// callback while rewriting `\r\n` to `\n`, including pairs split across
/// chunk boundaries.
#[derive(Debug, Default)]
pub struct ReceiveContext {
    pending_cr: bool,
}

impl ReceiveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8], cb: &mut dyn FnMut(&[u8])) {
        let mut chunk = chunk;
        if self.pending_cr {
            self.pending_cr = false;
            if chunk.first() == Some(&b'\n') {
                cb(b"\n");
                chunk = &chunk[1..];
            } else {
                cb(b"\r");
            }
        }

        let mut seg = 0;
        let mut i = 0;
        while i < chunk.len() {
            if chunk[i] != b'\r' {
                i += 1;
                continue;
            }
            if i + 1 == chunk.len() {
                // The pair may straddle the chunk boundary.
                if seg < i {
                    cb(&chunk[seg..i]);
                }
                self.pending_cr = true;
                seg = i + 1;
                i += 1;
            } else if chunk[i + 1] == b'\n' {
                if seg < i {
                    cb(&chunk[seg..i]);
                }
                cb(b"\n");
                seg = i + 2;
                i += 2;
            } else {
                i += 1;
            }
        }
        if seg < chunk.len() {
            cb(&chunk[seg..]);
        }
    }

    /// EOF: flush a dangling carriage return.
    pub fn finish(&mut self, cb: &mut dyn FnMut(&[u8])) {
        if self.pending_cr {
            self.pending_cr = false;
            cb(b"\r");
        }
    }
}

impl Term {
    /// Start delivering pasted content to the child.
    pub fn paste_begin(&mut self, child: &mut dyn Write) -> io::Result<()> {
        if self.modes.bracketed_paste {
            child.write_all(BRACKETED_PASTE_BEGIN)?;
        }
        Ok(())
    }

    /// Finish a paste, closing the bracketed-paste frame.
    pub fn paste_end(&mut self, child: &mut dyn Write) -> io::Result<()> {
        if self.modes.bracketed_paste {
            child.write_all(BRACKETED_PASTE_END)?;
        }
        Ok(())
    }

    /// Paste a complete buffer: normalize line endings, frame it when
    /// bracketed-paste mode is set, and write it to the child sink.
    pub fn paste(&mut self, data: &[u8], child: &mut dyn Write) -> io::Result<()> {
        self.paste_begin(child)?;

        let mut result = Ok(());
        let mut ctx = ReceiveContext::new();
        ctx.feed(data, &mut |bytes| {
            if result.is_ok() {
                result = child.write_all(bytes);
            }
        });
        ctx.finish(&mut |bytes| {
            if result.is_ok() {
                result = child.write_all(bytes);
            }
        });
        result?;

        self.paste_end(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn receive_all(chunks: &[&[u8]]) -> Vec<u8> {
        let mut ctx = ReceiveContext::new();
        let mut out = Vec::new();
        for chunk in chunks {
            ctx.feed(chunk, &mut |bytes| out.extend_from_slice(bytes));
        }
        ctx.finish(&mut |bytes| out.extend_from_slice(bytes));
        out
    }

    #[test]
    fn crlf_is_rewritten_within_a_chunk() {
        assert_eq!(receive_all(&[b"a\r\nb"]), b"a\nb");
    }

    #[test]
    fn crlf_is_rewritten_across_chunk_boundaries() {
        assert_eq!(receive_all(&[b"a\r", b"\nb"]), b"a\nb");
    }

    #[test]
    fn lone_carriage_returns_pass_through() {
        assert_eq!(receive_all(&[b"a\rb"]), b"a\rb");
        assert_eq!(receive_all(&[b"a\r", b"b"]), b"a\rb");
    }

    #[test]
    fn dangling_carriage_return_flushes_at_eof() {
        assert_eq!(receive_all(&[b"a\r"]), b"a\r");
    }

    /// Writer that accepts a bounded number of bytes, then signals
    /// `WouldBlock` like a full pipe.
    struct ThrottledWriter {
        written: Vec<u8>,
        budget: usize,
    }

    impl Write for ThrottledWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "full"));
            }
            let n = buf.len().min(self.budget);
            self.written.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn send_context_queues_on_would_block_and_resumes() {
        let mut writer = ThrottledWriter { written: Vec::new(), budget: 4 };
        let mut ctx = SendContext::new(b"selection".to_vec());

        assert_eq!(ctx.drain(&mut writer).unwrap(), SendStatus::Remain);
        assert_eq!(writer.written, b"sele");
        assert_eq!(ctx.remaining(), 5);

        // Writable again: the queued tail goes out.
        writer.budget = 16;
        assert_eq!(ctx.drain(&mut writer).unwrap(), SendStatus::Done);
        assert_eq!(writer.written, b"selection");
    }

    #[test]
    fn send_context_reports_real_errors() {
        struct BrokenPipe;
        impl Write for BrokenPipe {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let mut ctx = SendContext::new(b"x".to_vec());
        assert!(ctx.drain(&mut BrokenPipe).is_err());
    }

    #[test]
    fn paste_is_framed_when_bracketed_mode_is_set() {
        let mut t = Term::new(4, 8, &Config::default());
        t.modes.bracketed_paste = true;
        let mut child = Vec::new();
        t.paste(b"hi\r\nthere", &mut child).unwrap();
        assert_eq!(child, b"\x1b[200~hi\nthere\x1b[201~");
    }

    #[test]
    fn paste_is_unframed_without_bracketed_mode() {
        let mut t = Term::new(4, 8, &Config::default());
        let mut child = Vec::new();
        t.paste(b"plain", &mut child).unwrap();
        assert_eq!(child, b"plain");
    }

    #[test]
    fn mime_type_matches_the_wire_contract() {
        assert_eq!(MIME_TEXT_UTF8, "text/plain;charset=utf-8");
    }
}
