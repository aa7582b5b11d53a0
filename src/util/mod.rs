mod byte_window;
mod file_bytes_stream;

pub use self::byte_window::*;
pub use self::file_bytes_stream::*;
