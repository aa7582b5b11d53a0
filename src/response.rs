//! Response composition: the per-request decision pipeline.

use std::path::Path;

use http::{header, HeaderMap, Method, Request, Response, StatusCode};
use hyper::Body;
use tokio::fs::File;

use crate::cache::{compute_etag, is_fresh};
use crate::config::ServerConfig;
use crate::encoding::{select_encoding, GzipStream};
use crate::error::AppError;
use crate::listing::{read_dir_entries, render_index};
use crate::range::parse_range;
use crate::resolve::{open_with_metadata, resolve_target, FileMetadata};
use crate::util::{ByteWindow, FileBytesStream};

/// The pieces of a request the pipeline reads, extracted once up front.
/// Built per request and discarded with the response.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Request method.
    pub method: Method,
    /// URL path, still percent-encoded.
    pub path: String,
    /// Trimmed `Origin` header, when present and non-empty.
    pub origin: Option<String>,
    /// Raw `Range` header.
    pub range: Option<String>,
    /// Raw `If-None-Match` header.
    pub if_none_match: Option<String>,
    /// Raw `If-Modified-Since` header.
    pub if_modified_since: Option<String>,
    /// Raw `Accept-Encoding` header.
    pub accept_encoding: Option<String>,
    /// Whether the query string asks for `download=true`.
    pub download: bool,
}

impl RequestContext {
    /// Extract the relevant fields from a request. The body is never read.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let headers = req.headers();
        RequestContext {
            method: req.method().clone(),
            path: req.uri().path().to_owned(),
            origin: header_string(headers, header::ORIGIN)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            range: header_string(headers, header::RANGE),
            if_none_match: header_string(headers, header::IF_NONE_MATCH),
            if_modified_since: header_string(headers, header::IF_MODIFIED_SINCE),
            accept_encoding: header_string(headers, header::ACCEPT_ENCODING),
            download: wants_download(req.uri().query()),
        }
    }
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Whether the query string carries `download=true`, value compared
/// case-insensitively. Only the first `download` parameter counts.
fn wants_download(query: Option<&str>) -> bool {
    let query = match query {
        Some(query) => query,
        None => return false,
    };
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "download")
        .map(|(_, value)| value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Run the pipeline for one request.
///
/// Checks run in a fixed order, each able to short-circuit: method (non-GET
/// answers 305), origin allow-list, path resolution, filesystem lookup.
/// A regular file then goes down the file branch (range, then freshness,
/// then encoding); a directory renders a listing when those are enabled and
/// is rejected with 400 otherwise, as is any other kind of target.
pub async fn compose(
    config: &ServerConfig,
    ctx: &RequestContext,
) -> Result<Response<Body>, AppError> {
    if ctx.method != Method::GET {
        return Err(AppError::unsupported_method(&ctx.method));
    }

    let allow_origin = validate_origin(config, ctx.origin.as_deref())?;
    let target = resolve_target(&config.root, &ctx.path)?;
    let (file, meta) = open_with_metadata(&target).await.map_err(AppError::from_io)?;

    if meta.is_file {
        serve_file(config, ctx, &target, file, &meta, allow_origin)
    } else if meta.is_dir && config.list_dir {
        drop(file);
        serve_listing(config, &target, allow_origin).await
    } else {
        Err(AppError::not_a_file())
    }
}

/// Check the `Origin` header against the allow-list, and pick the
/// `Access-Control-Allow-Origin` value: `*` when everything is allowed,
/// otherwise the echoed origin.
fn validate_origin<'a>(
    config: &ServerConfig,
    origin: Option<&'a str>,
) -> Result<&'a str, AppError> {
    if config.allowed_origins.is_empty() {
        return Ok("*");
    }
    match origin {
        Some(origin) if config.allowed_origins.iter().any(|allowed| allowed == origin) => {
            Ok(origin)
        }
        _ => Err(AppError::invalid_origin()),
    }
}

fn serve_file(
    config: &ServerConfig,
    ctx: &RequestContext,
    target: &Path,
    file: File,
    meta: &FileMetadata,
    allow_origin: &str,
) -> Result<Response<Body>, AppError> {
    let etag = compute_etag(meta);
    let mime = mime_guess::from_path(target).first_or_octet_stream();

    let mut builder = Response::builder()
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CACHE_CONTROL, "public")
        .header(header::ETAG, etag.as_str())
        .header(header::LAST_MODIFIED, httpdate::fmt_http_date(meta.modified));

    if ctx.download {
        let filename = target.file_name().unwrap_or_default().to_string_lossy();
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        );
    }

    // A range request bypasses the freshness check: the client asking for a
    // window wants bytes, not a 304.
    if let Some(range) = &ctx.range {
        let range = parse_range(range, meta.size).map_err(|_| AppError::invalid_range())?;
        let window = ByteWindow::new(FileBytesStream::new(file), range.from, range.to + 1);
        return builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_LENGTH, range.len())
            .header(
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", range.from, range.to, meta.size),
            )
            .body(Body::wrap_stream(window))
            .map_err(|_| AppError::internal());
    }

    if is_fresh(
        ctx.if_none_match.as_deref(),
        ctx.if_modified_since.as_deref(),
        &etag,
        meta.modified,
        config.no_cache,
    ) {
        return builder
            .status(StatusCode::NOT_MODIFIED)
            .body(Body::empty())
            .map_err(|_| AppError::internal());
    }

    let stream = FileBytesStream::new(file);
    match ctx.accept_encoding.as_deref().and_then(select_encoding) {
        // Compressed output has no predictable length; hyper switches to
        // chunked transfer.
        Some(encoding) => builder
            .header(header::CONTENT_ENCODING, encoding.name())
            .body(Body::wrap_stream(GzipStream::new(stream)))
            .map_err(|_| AppError::internal()),
        None => builder
            .header(header::CONTENT_LENGTH, meta.size)
            .body(Body::wrap_stream(stream))
            .map_err(|_| AppError::internal()),
    }
}

async fn serve_listing(
    config: &ServerConfig,
    target: &Path,
    allow_origin: &str,
) -> Result<Response<Body>, AppError> {
    let entries = read_dir_entries(&config.root, target)
        .await
        .map_err(AppError::from_io)?;
    let rel = target.strip_prefix(&config.root).unwrap_or_else(|_| Path::new(""));
    let html = render_index(rel, &entries);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Body::from(html))
        .map_err(|_| AppError::internal())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_flag_parsing() {
        assert!(wants_download(Some("download=true")));
        assert!(wants_download(Some("download=TRUE")));
        assert!(wants_download(Some("a=1&download=true")));
        assert!(!wants_download(Some("download=false")));
        assert!(!wants_download(Some("download=false&download=true")));
        assert!(!wants_download(Some("a=1")));
        assert!(!wants_download(None));
    }

    #[test]
    fn origin_validation() {
        let open = ServerConfig::new(".");
        assert_eq!(validate_origin(&open, None).unwrap(), "*");
        assert_eq!(validate_origin(&open, Some("http://x.example")).unwrap(), "*");

        let restricted = ServerConfig::new(".")
            .with_allowed_origins(vec!["http://ok.example".to_owned()]);
        assert_eq!(
            validate_origin(&restricted, Some("http://ok.example")).unwrap(),
            "http://ok.example"
        );
        assert!(validate_origin(&restricted, None).is_err());
        assert!(validate_origin(&restricted, Some("http://no.example")).is_err());
    }
}
