//! Error types for `wldkit`

use thiserror::Error;

/// The error type for `wldkit` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error.
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    // ==================== Archive Errors ====================
    /// The requested file was not found in the archive.
    #[error("file not found in archive: {0}")]
    FileNotFound(String),

    // ==================== WLD Envelope Errors ====================
    /// The input is not a WLD stream (bad magic word).
    #[error("invalid WLD magic: expected 0x54503D02, found {0:#010x}")]
    InvalidWldMagic(u32),

    /// The WLD version word selects neither the old nor the new sub-format.
    #[error("unsupported WLD version: {0:#010x}")]
    UnsupportedWldVersion(u32),

    /// A fragment entry claimed more payload bytes than the stream holds.
    #[error("unexpected end of file")]
    UnexpectedEof,

    /// A registered fragment decoder rejected its payload.
    #[error("fragment {index} (type {code:#04x}) failed to decode: {message}")]
    FragmentDecode {
        /// 1-based position of the fragment in the stream.
        index: u32,
        /// The fragment type code.
        code: i32,
        /// Decoder failure description.
        message: String,
    },

    // ==================== Reference Resolution Errors ====================
    /// A positional reference points at a missing fragment or one of the
    /// wrong kind.
    #[error("fragment ref {index} resolves to {found}, expected {expected}")]
    BadFragmentRef {
        /// The 1-based index that was referenced.
        index: u32,
        /// Kind actually found at that index (or "nothing").
        found: String,
        /// Kind the referencing fragment required.
        expected: &'static str,
    },

    /// A `NameRef` does not resolve to an entry in the name table.
    #[error("fragment {index} carries name ref {name_ref} with no matching name table entry")]
    BadNameRef {
        /// 1-based fragment index carrying the reference.
        index: u32,
        /// The unresolvable name reference.
        name_ref: i32,
    },

    // ==================== Logical Emission Errors ====================
    /// A tag reference could not be resolved during logical→raw emission.
    #[error("tag \"{tag}\" ({kind}) not found, referenced by \"{referenced_by}\"")]
    TagNotFound {
        /// The unresolvable tag.
        tag: String,
        /// Kind of record the tag was expected to name.
        kind: &'static str,
        /// Tag of the record holding the dangling reference.
        referenced_by: String,
    },

    /// Emission re-entered a record that is still being emitted.
    #[error("reference cycle detected while emitting {kind} \"{tag}\"")]
    CycleDetected {
        /// Kind of the record closing the cycle.
        kind: &'static str,
        /// Tag of the record closing the cycle.
        tag: String,
    },

    // ==================== WCE Grammar Errors ====================
    /// The ascii reader met a keyword it did not expect.
    #[error("wce line {line}: expected {expected}, found {found}")]
    WceGrammar {
        /// 1-based line number in the current file.
        line: usize,
        /// The keyword the grammar required next.
        expected: String,
        /// The token actually read.
        found: String,
    },

    /// The ascii reader could not interpret a property value.
    #[error("wce line {line}: {message}")]
    WceParse {
        /// 1-based line number in the current file.
        line: usize,
        /// Parse failure description.
        message: String,
    },
}

/// A specialized Result type for `wldkit` operations.
pub type Result<T> = std::result::Result<T, Error>;
