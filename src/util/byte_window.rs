use std::io::Error as IoError;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::stream::Stream;
use hyper::body::Bytes;

/// Where the window currently sits relative to the bytes seen so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WindowState {
    /// Still consuming bytes that precede the window.
    Before,
    /// Emitting bytes inside the window.
    Within,
    /// The window is exhausted; nothing further is emitted.
    Done,
}

/// Stream adapter that passes through only the bytes in `[start, end)` of
/// the underlying stream.
///
/// The adapter never buffers or reassembles input. Each polled chunk is
/// dropped, clipped with `Bytes::slice`, or passed on whole, based on a
/// running offset. Chunk boundaries may fall anywhere relative to the
/// window, including both window edges landing inside a single chunk. Once
/// the window is exhausted the stream ends and the input is not polled
/// again.
pub struct ByteWindow<S> {
    inner: S,
    start: u64,
    end: u64,
    offset: u64,
    state: WindowState,
}

impl<S> ByteWindow<S> {
    /// Create a window over `[start, end)` of `inner`. For an inclusive
    /// byte range `from-to`, pass `end = to + 1`.
    pub fn new(inner: S, start: u64, end: u64) -> Self {
        Self {
            inner,
            start,
            end,
            offset: 0,
            state: WindowState::Before,
        }
    }
}

impl<S> Stream for ByteWindow<S>
where
    S: Stream<Item = Result<Bytes, IoError>> + Unpin,
{
    type Item = Result<Bytes, IoError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.state == WindowState::Done {
                return Poll::Ready(None);
            }

            let chunk = match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(chunk)) => chunk,
                // Upstream error, or EOF before the window was exhausted.
                other => return Poll::Ready(other),
            };

            // Offset of the chunk's first byte within the input.
            let base = this.offset;
            this.offset += chunk.len() as u64;

            let clipped = match this.state {
                WindowState::Before if this.offset > this.start => {
                    let lo = (this.start - base) as usize;
                    if this.offset >= this.end {
                        // Both edges land in this chunk.
                        this.state = WindowState::Done;
                        chunk.slice(lo..(this.end - base) as usize)
                    } else {
                        this.state = WindowState::Within;
                        chunk.slice(lo..)
                    }
                }
                WindowState::Within if this.offset >= this.end => {
                    this.state = WindowState::Done;
                    chunk.slice(..(this.end - base) as usize)
                }
                WindowState::Within => chunk,
                // Everything so far precedes the window.
                _ => continue,
            };

            if clipped.is_empty() {
                continue;
            }
            return Poll::Ready(Some(Ok(clipped)));
        }
    }
}
