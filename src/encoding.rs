//! Content-coding negotiation and the streaming gzip encoder.

use std::io::{Error as IoError, Write};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::BytesMut;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::stream::Stream;
use hyper::body::Bytes;

/// Content codings this server can apply to a response body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentEncoding {
    /// The gzip coding, the only one supported.
    Gzip,
}

impl ContentEncoding {
    /// The token used in `Accept-Encoding` and `Content-Encoding`.
    pub fn name(self) -> &'static str {
        match self {
            ContentEncoding::Gzip => "gzip",
        }
    }
}

/// Pick the first coding the client listed that this server supports.
///
/// The header is read as comma-separated tokens, in client order. Tokens
/// are compared exactly after trimming whitespace; quality parameters are
/// not interpreted, so `gzip;q=0` is simply an unrecognized token.
pub fn select_encoding(accept_encoding: &str) -> Option<ContentEncoding> {
    accept_encoding
        .split(',')
        .map(str::trim)
        .find_map(|token| match token {
            "gzip" => Some(ContentEncoding::Gzip),
            _ => None,
        })
}

struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
        }
    }

    fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Stream adapter that gzip-compresses an inner stream of `Bytes`.
///
/// Every upstream chunk is pushed through the encoder and whatever
/// compressed output is ready gets emitted; small inputs may produce
/// nothing until later. When the input ends, the encoder is finished once
/// and the trailing gzip block is flushed out. The compressed length is
/// unknown up front, so responses using this stream carry no
/// `Content-Length`.
pub struct GzipStream<S> {
    inner: S,
    encoder: Option<GzEncoder<Writer>>,
}

impl<S> GzipStream<S> {
    /// Wrap `inner`, compressing at the default level.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            encoder: Some(GzEncoder::new(Writer::new(), Compression::default())),
        }
    }
}

impl<S> Stream for GzipStream<S>
where
    S: Stream<Item = Result<Bytes, IoError>> + Unpin,
{
    type Item = Result<Bytes, IoError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.encoder.is_none() {
                return Poll::Ready(None);
            }

            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(chunk)) => {
                    if let Some(encoder) = this.encoder.as_mut() {
                        if let Err(err) = encoder.write_all(&chunk) {
                            return Poll::Ready(Some(Err(err)));
                        }
                        let compressed = encoder.get_mut().take();
                        if !compressed.is_empty() {
                            return Poll::Ready(Some(Ok(compressed)));
                        }
                    }
                }
                Some(Err(err)) => return Poll::Ready(Some(Err(err))),
                None => {
                    // Input exhausted: finish exactly once.
                    if let Some(encoder) = this.encoder.take() {
                        return match encoder.finish() {
                            Ok(writer) => Poll::Ready(Some(Ok(writer.buf.freeze()))),
                            Err(err) => Poll::Ready(Some(Err(err))),
                        };
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{stream, StreamExt};
    use std::io::Read;

    #[test]
    fn first_supported_token_wins() {
        assert_eq!(select_encoding("gzip"), Some(ContentEncoding::Gzip));
        assert_eq!(select_encoding("identity, gzip"), Some(ContentEncoding::Gzip));
        assert_eq!(select_encoding(" gzip , br"), Some(ContentEncoding::Gzip));
        assert_eq!(select_encoding("br, deflate"), None);
        assert_eq!(select_encoding("gzip;q=0"), None);
        assert_eq!(select_encoding(""), None);
    }

    #[tokio::test]
    async fn compresses_a_chunked_stream() {
        let chunks: Vec<Result<Bytes, IoError>> = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"compressed ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let mut stream = GzipStream::new(stream::iter(chunks));

        let mut compressed = Vec::new();
        while let Some(chunk) = stream.next().await {
            compressed.extend_from_slice(&chunk.unwrap());
        }

        let mut decoded = String::new();
        flate2::read::GzDecoder::new(&compressed[..])
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "hello compressed world");
    }

    #[tokio::test]
    async fn empty_input_still_produces_a_valid_stream() {
        let mut stream = GzipStream::new(stream::iter(
            Vec::<Result<Bytes, IoError>>::new(),
        ));

        let mut compressed = Vec::new();
        while let Some(chunk) = stream.next().await {
            compressed.extend_from_slice(&chunk.unwrap());
        }

        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(&compressed[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert!(decoded.is_empty());
    }
}
