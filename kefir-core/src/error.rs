//! The closed error-kind set shared by every pipeline stage (spec §7).
//!
//! Every public function in this crate returns a [`KefirResult`]. There is no
//! local recovery beyond the one case spec.md calls out explicitly (scope
//! lookups falling back to an enclosing scope on [`KefirError::NotFound`]);
//! everything else propagates to the driver, which decides whether to
//! surface a diagnostic or abort.

use std::fmt;

/// A source location attached to user-visible diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number, or 0 if unknown (e.g. synthesized nodes).
    pub line: u32,
    /// 1-based column number, or 0 if unknown.
    pub column: u32,
}

impl SourceLocation {
    /// A location for nodes synthesized by a pipeline stage rather than
    /// parsed from source text.
    pub const UNKNOWN: SourceLocation = SourceLocation { line: 0, column: 0 };

    /// Construct a concrete location.
    pub fn new(line: u32, column: u32) -> Self {
        SourceLocation { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The closed set of error kinds produced anywhere in the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum KefirError {
    /// A caller passed an argument that violates the callee's contract.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A container was asked to perform an operation incompatible with its
    /// current state (e.g. appending to a finalized optimizer block).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The request itself cannot be satisfied regardless of state (e.g. an
    /// unsupported type conversion).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A change was requested that conflicts with previously established
    /// facts (e.g. an incompatible redeclaration).
    #[error("invalid change: {0}")]
    InvalidChange(String),

    /// A lookup found nothing. Recoverable: scope resolution falls back to
    /// the enclosing scope on this error.
    #[error("not found: {0}")]
    NotFound(String),

    /// General-purpose heap allocation failed.
    #[error("memory allocation failure")]
    MemAllocFailure,

    /// Allocation of a specific object kind (arena slot, spill region) failed.
    #[error("object allocation failure: {0}")]
    ObjAllocFailure(String),

    /// A user-visible semantic diagnostic, with source location.
    #[error("{location}: {message}")]
    AnalysisError {
        /// Where in the source the error was detected.
        location: SourceLocation,
        /// Human-readable diagnostic text.
        message: String,
    },

    /// Produced by the front-end; the core never emits this itself but
    /// accepts it from upstream collaborators without re-wrapping it.
    #[error("syntax error: {0}")]
    SyntaxError(String),

    /// A feature gate: recognized but unimplemented (e.g. bit-precise case
    /// labels, spec.md open question #1).
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// An internal invariant was violated; this always indicates a bug in
    /// this crate rather than in the input program.
    #[error("internal error: {0}")]
    InternalError(String),
}

/// The pipeline-wide result alias.
pub type KefirResult<T> = Result<T, KefirError>;

impl KefirError {
    /// Build an [`KefirError::AnalysisError`] at `loc`.
    pub fn analysis(loc: SourceLocation, message: impl Into<String>) -> Self {
        KefirError::AnalysisError {
            location: loc,
            message: message.into(),
        }
    }
}
