use std::{
    io::Error as IoError,
    mem::MaybeUninit,
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::stream::Stream;
use hyper::body::Bytes;
use tokio::{
    fs::File,
    io::{AsyncRead, ReadBuf},
};

const BUF_SIZE: usize = 8 * 1024;

/// Wraps an `AsyncRead`, like a tokio `File`, and implements a stream of
/// `Bytes`s running from the current position to the end of the file.
///
/// Chunks are at most 8 KiB; their exact sizes depend on what each read
/// returns.
pub struct FileBytesStream<F = File> {
    file: F,
    buf: Box<[MaybeUninit<u8>; BUF_SIZE]>,
}

impl<F> FileBytesStream<F> {
    /// Create a new stream from the given file.
    pub fn new(file: F) -> Self {
        Self {
            file,
            buf: Box::new([MaybeUninit::uninit(); BUF_SIZE]),
        }
    }
}

impl<F> Stream for FileBytesStream<F>
where
    F: AsyncRead + Unpin,
{
    type Item = Result<Bytes, IoError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        let Self {
            ref mut file,
            ref mut buf,
        } = *self;

        let mut read_buf = ReadBuf::uninit(&mut buf[..]);
        match Pin::new(file).poll_read(cx, &mut read_buf) {
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled();
                if filled.is_empty() {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(Bytes::copy_from_slice(filled))))
                }
            }
            Poll::Ready(Err(e)) => Poll::Ready(Some(Err(e))),
            Poll::Pending => Poll::Pending,
        }
    }
}
