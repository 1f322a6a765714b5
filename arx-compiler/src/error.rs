use std::fmt;

/// The link step refused to finalize the module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// The module is marked executable but the manifest has no `App.Main`.
    #[error("executable module has no App.Main entry point")]
    MissingMain,

    /// A call site names a method the manifest does not contain.
    #[error("unresolved method name `{0}`")]
    UnresolvedMethod(String),
}

/// A recoverable code-generation diagnostic. Generation continues with a
/// best-effort emission; warnings are collected on the output and mirrored
/// through `tracing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenWarning {
    /// An identifier resolved neither to a local nor to a field; `LIT 0`
    /// was emitted in its place.
    UnknownIdentifier {
        /// Enclosing class.
        class: String,
        /// Offending name.
        name: String,
    },
    /// An identifier was used outside any class context.
    IdentifierOutsideClass {
        /// Offending name.
        name: String,
    },
    /// `new` names a class the module does not declare; the constructor
    /// call was skipped.
    UnknownClass {
        /// Offending class name.
        name: String,
    },
    /// A jump references a label that was never bound; the operand was left
    /// unresolved.
    UnboundLabel {
        /// Offending label id.
        label: u32,
    },
}

impl fmt::Display for CodegenWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownIdentifier { class, name } => {
                write!(f, "unknown identifier `{name}` in class `{class}`; emitting 0")
            }
            Self::IdentifierOutsideClass { name } => {
                write!(f, "identifier `{name}` used outside a class context; emitting 0")
            }
            Self::UnknownClass { name } => {
                write!(f, "unknown class `{name}` in new-expression; constructor skipped")
            }
            Self::UnboundLabel { label } => {
                write!(f, "label {label} was created but never bound")
            }
        }
    }
}
