//! Limits applied while decoding a request body.

/// Default maximum size of a body handed to a typed parser (50MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 50 * 1024 * 1024;

/// Default maximum number of parts in a multipart body.
pub const DEFAULT_MAX_PARTS: usize = 1000;

/// Default maximum size of a single uploaded file (10MB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Limits used by [`parse_body`](crate::parse_body).
///
/// Raw pass-through bodies (no or unparseable content-type) are never limited,
/// since nothing is decoded for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyConfig {
    max_body_size: usize,
    max_parts: usize,
    max_file_size: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self { max_body_size: DEFAULT_MAX_BODY_SIZE, max_parts: DEFAULT_MAX_PARTS, max_file_size: DEFAULT_MAX_FILE_SIZE }
    }
}

impl BodyConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum body size accepted by the typed parsers.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the maximum number of multipart parts.
    #[must_use]
    pub fn max_parts(mut self, count: usize) -> Self {
        self.max_parts = count;
        self
    }

    /// Set the maximum size of one uploaded file.
    #[must_use]
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    #[must_use]
    pub fn get_max_body_size(&self) -> usize {
        self.max_body_size
    }

    #[must_use]
    pub fn get_max_parts(&self) -> usize {
        self.max_parts
    }

    #[must_use]
    pub fn get_max_file_size(&self) -> usize {
        self.max_file_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BodyConfig::new();
        assert_eq!(config.get_max_body_size(), DEFAULT_MAX_BODY_SIZE);
        assert_eq!(config.get_max_parts(), DEFAULT_MAX_PARTS);
        assert_eq!(config.get_max_file_size(), DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn builder() {
        let config = BodyConfig::new().max_body_size(16).max_parts(2).max_file_size(4);
        assert_eq!(config.get_max_body_size(), 16);
        assert_eq!(config.get_max_parts(), 2);
        assert_eq!(config.get_max_file_size(), 4);
    }
}
