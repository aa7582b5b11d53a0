use std::path::PathBuf;

/// Server settings, immutable once the server starts.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host the listener binds to.
    pub host: String,
    /// Port the listener binds to.
    pub port: u16,
    /// Root directory files are served out of.
    pub root: PathBuf,
    /// Render an HTML listing when the target is a directory. When off,
    /// directory requests are rejected with 400.
    pub list_dir: bool,
    /// Disable conditional caching: the server never answers 304.
    pub no_cache: bool,
    /// Origins allowed to read responses. Empty means every origin is
    /// allowed.
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Settings for serving `root` on `localhost:8000`, with listings and
    /// CORS restrictions off and caching on.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ServerConfig {
            host: "localhost".to_owned(),
            port: 8000,
            root: root.into(),
            list_dir: false,
            no_cache: false,
            allowed_origins: Vec::new(),
        }
    }

    /// Set the host to bind to.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port to bind to.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable directory listings.
    pub fn with_listing(mut self, list_dir: bool) -> Self {
        self.list_dir = list_dir;
        self
    }

    /// Enable or disable the no-cache mode.
    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    /// Set the origin allow-list. A list containing `*` collapses to the
    /// empty list, allowing every origin.
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = if origins.iter().any(|origin| origin == "*") {
            Vec::new()
        } else {
            origins
        };
        self
    }
}
