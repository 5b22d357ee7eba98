pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors raised while compiling one functional mapping.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("unknown expression type '{0}'")]
    UnknownExpressionType(String),
    #[error("unknown function class '{0}'")]
    UnknownFunctionClass(String),
    /// A variable is read but never assigned in the same functional mapping.
    #[error("variable '{0}' is read but never assigned in this mapping")]
    UnresolvedVariable(String),
    #[error("unresolved dictionary entry '{0}'")]
    UnresolvedDictionaryEntry(String),
    /// A fixed-arity function was called with the wrong number of arguments.
    #[error("{function_class} expects {expected} argument(s), got {actual}")]
    ArgumentArityMismatch {
        function_class: String,
        expected: usize,
        actual: usize,
    },
    #[error("unknown transformer '{0}'")]
    UnknownTransformer(String),
    /// A function argument has a shape the block cannot represent.
    #[error("invalid argument to {function_class}: {reason}")]
    InvalidArgument {
        function_class: String,
        reason: String,
    },
    /// A statement node matches none of the statement shapes.
    #[error("unrecognized statement: {0}")]
    InvalidStatement(String),
    /// A node lacks a key its variant requires.
    #[error("malformed {node}: missing '{field}'")]
    MissingField {
        node: &'static str,
        field: &'static str,
    },
    #[error("malformed {node}: expected an object, got {found}")]
    MalformedNode { node: &'static str, found: String },
    /// Two functional mappings sanitize to the same output key.
    #[error("destination key '{0}' is produced by more than one functional mapping")]
    DuplicateDestination(String),
    /// An output key that would not stay inside the output directory as a file name.
    #[error("destination key '{0}' cannot be used as a file name")]
    UnsafeFileName(String),
}
