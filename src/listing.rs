//! HTML directory listings.

use std::io::Error as IoError;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped when a filesystem name is placed in an `href`.
const HREF_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'%')
    .add(b'?')
    .add(b'#');

const SIZE_UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];

/// One child of a listed directory.
#[derive(Clone, Debug)]
pub struct DirectoryEntry {
    /// Name within the directory.
    pub filename: String,
    /// Path relative to the served root, used to build the entry's link.
    pub filepath: PathBuf,
    /// Length in bytes.
    pub size: u64,
    /// Creation time, where the filesystem records one.
    pub created: Option<SystemTime>,
    /// Whether the entry is itself a directory.
    pub is_dir: bool,
}

/// Collect the children of `dir`, stat'ing each one. The order is whatever
/// the filesystem enumerates.
pub async fn read_dir_entries(root: &Path, dir: &Path) -> Result<Vec<DirectoryEntry>, IoError> {
    let mut entries = Vec::new();
    let mut reader = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = reader.next_entry().await? {
        let metadata = entry.metadata().await?;
        let filename = entry.file_name().to_string_lossy().into_owned();
        let filepath = match entry.path().strip_prefix(root) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => PathBuf::from(&filename),
        };

        entries.push(DirectoryEntry {
            filename,
            filepath,
            size: metadata.len(),
            created: metadata.created().ok(),
            is_dir: metadata.is_dir(),
        });
    }

    Ok(entries)
}

/// Render the HTML index for a directory.
///
/// `rel` is the directory's path relative to the served root; at the root
/// itself (empty `rel`) the parent link is omitted. Every entry links to
/// its percent-encoded path, prefixed with an icon and followed by its
/// size, plus its creation time when known.
pub fn render_index(rel: &Path, entries: &[DirectoryEntry]) -> String {
    let title = format!("Content of /{}", rel.display());
    let mut items = String::new();

    if let Some(parent) = parent_href(rel) {
        items.push_str(&format!(
            "<li>\u{1F814} <a href=\"{}\">Parent Directory</a></li>\n",
            parent
        ));
    }

    for entry in entries {
        let icon = if entry.is_dir { "\u{1F4C1}" } else { "\u{1F4C4}" };
        let target = format!("/{}", entry.filepath.display());
        let href = utf8_percent_encode(&target, HREF_ENCODE_SET);
        let created = match entry.created {
            Some(time) => format!(" - Created {}", httpdate::fmt_http_date(time)),
            None => String::new(),
        };
        items.push_str(&format!(
            "<li>{} <a href=\"{}\">{}</a> ({}){}</li>\n",
            icon,
            href,
            entry.filename,
            human_readable_size(entry.size),
            created
        ));
    }

    format!(
        "<html>\n<head><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n<ul>\n{items}</ul>\n</body>\n</html>\n",
        title = title,
        items = items
    )
}

/// Link to the listed directory's parent, `None` at the root itself.
fn parent_href(rel: &Path) -> Option<String> {
    if rel.as_os_str().is_empty() {
        return None;
    }
    let parent = rel.parent().unwrap_or_else(|| Path::new(""));
    Some(format!(
        "/{}",
        utf8_percent_encode(&parent.display().to_string(), HREF_ENCODE_SET)
    ))
}

/// Format a byte count with 1024-based units and two decimals.
pub fn human_readable_size(size: u64) -> String {
    if size == 0 {
        return "0.00 B".to_owned();
    }
    let exponent = ((size as f64).ln() / 1024f64.ln()) as usize;
    let exponent = exponent.min(SIZE_UNITS.len() - 1);
    format!(
        "{:.2} {}",
        size as f64 / 1024f64.powi(exponent as i32),
        SIZE_UNITS[exponent]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_formatting() {
        assert_eq!(human_readable_size(0), "0.00 B");
        assert_eq!(human_readable_size(10), "10.00 B");
        assert_eq!(human_readable_size(1023), "1023.00 B");
        assert_eq!(human_readable_size(1536), "1.50 kB");
        assert_eq!(human_readable_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(human_readable_size(3 * 1024 * 1024 * 1024), "3.00 GB");
        // Beyond the last unit, terabytes keep counting up.
        assert_eq!(
            human_readable_size(2048 * 1024 * 1024 * 1024 * 1024),
            "2048.00 TB"
        );
    }

    #[test]
    fn root_listing_has_no_parent_link() {
        let html = render_index(Path::new(""), &[]);
        assert!(!html.contains("Parent Directory"));
        assert!(html.contains("<title>Content of /</title>"));
    }

    #[test]
    fn nested_listing_links_to_parent() {
        let html = render_index(Path::new("a/b"), &[]);
        assert!(html.contains("<a href=\"/a\">Parent Directory</a>"));

        let html = render_index(Path::new("a"), &[]);
        assert!(html.contains("<a href=\"/\">Parent Directory</a>"));
    }

    #[test]
    fn entries_render_with_icons_and_sizes() {
        let entries = [
            DirectoryEntry {
                filename: "notes.txt".to_owned(),
                filepath: PathBuf::from("docs/notes.txt"),
                size: 1536,
                created: None,
                is_dir: false,
            },
            DirectoryEntry {
                filename: "img".to_owned(),
                filepath: PathBuf::from("docs/img"),
                size: 4096,
                created: None,
                is_dir: true,
            },
        ];
        let html = render_index(Path::new("docs"), &entries);
        assert!(html.contains("\u{1F4C4} <a href=\"/docs/notes.txt\">notes.txt</a> (1.50 kB)"));
        assert!(html.contains("\u{1F4C1} <a href=\"/docs/img\">img</a>"));
    }

    #[test]
    fn hrefs_are_percent_encoded() {
        let entries = [DirectoryEntry {
            filename: "with space.txt".to_owned(),
            filepath: PathBuf::from("with space.txt"),
            size: 1,
            created: None,
            is_dir: false,
        }];
        let html = render_index(Path::new(""), &entries);
        assert!(html.contains("href=\"/with%20space.txt\""));
        assert!(html.contains(">with space.txt</a>"));
    }
}
