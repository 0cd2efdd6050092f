//! Configuration options for a codec.

/// Configuration options for encoding and decoding.
///
/// # Example
///
/// ```
/// use flatrecord_core::codec::CodecOptions;
///
/// let options = CodecOptions {
///     force_defaults: true,
///     file_identifier: Some(*b"FREC"),
///     ..CodecOptions::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecOptions {
    /// Write inline fields even when they equal their default.
    ///
    /// Decoding substitutes defaults either way, so this only changes the
    /// size of the output.
    ///
    /// Default: false
    pub force_defaults: bool,

    /// Initial capacity of the output buffer, in bytes.
    ///
    /// Default: 1024
    pub initial_capacity: usize,

    /// A 4-byte identifier written after the root offset, and required to
    /// match when decoding.
    ///
    /// Must be valid UTF-8.
    ///
    /// Default: None
    pub file_identifier: Option<[u8; 4]>,

    /// Maximum nesting of tables, the root included.
    ///
    /// Encoding rejects deeper records before writing anything, and
    /// decoding rejects deeper buffers, so whatever encodes also decodes.
    ///
    /// Default: 128
    pub max_depth: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            force_defaults: false,
            initial_capacity: 1024,
            file_identifier: None,
            max_depth: 128,
        }
    }
}
