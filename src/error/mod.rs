//! Error types and diagnostics.
//!
//! Malformed *individual constructs* (a comment containing `--`, a start tag
//! no grammar accepts, a name that is not a name token) are rejected with an
//! [`Error`]. Malformed *document structure* is never an error: the reducer
//! repairs it and reports what it did as [`ParseDiagnostic`] warnings.

use std::fmt;

/// Severity level for a parse diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// A repair the parser applied silently (implicit close, relocation).
    Warning,
    /// A construct that was kept but is likely not what the author meant.
    Error,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location within the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl SourceLocation {
    /// Computes the line and column of `byte_offset` within `input`.
    ///
    /// Offsets past the end of the input are clamped to the end.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn locate(input: &str, byte_offset: usize) -> Self {
        let mut end = byte_offset.min(input.len());
        while !input.is_char_boundary(end) {
            end -= 1;
        }
        let before = &input[..end];
        let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |p| p + 1);
        let column = before[line_start..].chars().count() + 1;
        Self {
            line: line as u32,
            column: column as u32,
            byte_offset,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single repair recorded while balancing tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    /// The severity of this diagnostic.
    pub severity: ErrorSeverity,
    /// Human-readable message.
    pub message: String,
    /// Where in the source the repaired construct starts.
    pub location: SourceLocation,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} at {}", self.severity, self.message, self.location)
    }
}

/// The kind of leaf construct that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    /// `<!-- ... -->`
    Comment,
    /// `<?target ... ?>`
    ProcessingInstruction,
    /// `<!DOCTYPE ...>`
    DocType,
    /// `<?xml version=... ?>`
    XmlDeclaration,
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comment => write!(f, "comment"),
            Self::ProcessingInstruction => write!(f, "processing instruction"),
            Self::DocType => write!(f, "document type declaration"),
            Self::XmlDeclaration => write!(f, "XML declaration"),
        }
    }
}

/// Every failure the engine can report.
///
/// All variants are local and synchronous; none is retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A namespace prefix that is not a name token, or a declaration that
    /// binds the reserved `xmlns` prefix.
    InvalidNamespaceDeclaration {
        /// The offending prefix (`None` for the default namespace).
        prefix: Option<String>,
        /// The URI it was being bound to.
        uri: String,
    },
    /// One start tag uses the same prefix for two different URIs.
    InconsistentNamespaceUse {
        /// The prefix bound twice.
        prefix: String,
        /// The first URI seen.
        first: String,
        /// The conflicting URI.
        second: String,
    },
    /// An attribute name resolved to a non-empty namespace without a prefix.
    UnprefixedGlobalAttribute {
        /// Universal name of the attribute (`{uri}local`).
        name: String,
    },
    /// A name, prefix or attribute name that is not a valid name token.
    InvalidName {
        /// The rejected text.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// A comment, processing instruction, doctype or XML declaration whose
    /// syntax is invalid.
    MalformedConstruct {
        /// Which construct failed.
        kind: ConstructKind,
        /// The offending raw text.
        raw: String,
        /// Where it starts, when it came from parsed input.
        location: Option<SourceLocation>,
    },
    /// A fragment the tokenizer claimed as a tag that neither the strict nor
    /// the lenient tag grammar accepts.
    UnrecognizedConstruct {
        /// The offending raw text.
        raw: String,
        /// Where it starts, when it came from parsed input.
        location: Option<SourceLocation>,
    },
    /// A substitution addresses a node together with one of its descendants.
    ConflictingSubstitution {
        /// Rendering of the conflicting ancestor path.
        path: String,
    },
    /// A substitution that cannot be applied to the addressed position.
    InvalidSubstitution {
        /// Why the substitution was rejected.
        reason: String,
    },
    /// Structural nesting exceeded the configured limit.
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },
    /// An output charset label no encoder is available for.
    UnsupportedCharset {
        /// The requested label.
        label: String,
    },
    /// Input bytes that are not valid in the charset they were declared in.
    UndecodableInput {
        /// The charset the bytes were decoded as.
        charset: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNamespaceDeclaration { prefix, uri } => match prefix {
                Some(p) => write!(f, "invalid namespace declaration: prefix {p:?} for {uri:?}"),
                None => write!(f, "invalid default namespace declaration: {uri:?}"),
            },
            Self::InconsistentNamespaceUse {
                prefix,
                first,
                second,
            } => write!(
                f,
                "inconsistent namespace use: {prefix} is used as {first:?} and {second:?}"
            ),
            Self::UnprefixedGlobalAttribute { name } => {
                write!(f, "global attribute without namespace prefix: {name}")
            }
            Self::InvalidName { name, reason } => write!(f, "invalid name {name:?}: {reason}"),
            Self::MalformedConstruct {
                kind,
                raw,
                location,
            } => {
                write!(f, "malformed {kind}: {raw:?}")?;
                if let Some(loc) = location {
                    write!(f, " at {loc}")?;
                }
                Ok(())
            }
            Self::UnrecognizedConstruct { raw, location } => {
                write!(f, "cannot recognize as start tag or empty tag: {raw:?}")?;
                if let Some(loc) = location {
                    write!(f, " at {loc}")?;
                }
                Ok(())
            }
            Self::ConflictingSubstitution { path } => {
                write!(f, "cannot substitute a node under substituting tree: {path}")
            }
            Self::InvalidSubstitution { reason } => write!(f, "invalid substitution: {reason}"),
            Self::DepthExceeded { limit } => {
                write!(f, "maximum nesting depth exceeded ({limit})")
            }
            Self::UnsupportedCharset { label } => write!(f, "unsupported charset: {label}"),
            Self::UndecodableInput { charset } => {
                write!(f, "malformed byte sequence for charset {charset}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
