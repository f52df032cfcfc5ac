use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error as ThisError;

/// Classified failure modes of the assembly engine. All of these travel
/// through [`anyhow::Error`](crate::Error) like every other error in the
/// crate; callers that care about the class recover it with `downcast_ref`.
#[derive(Debug, ThisError)]
pub enum PackagingError {
    /// Malformed recipe grammar or directive suffix.
    #[error("invalid recipe: {0}")]
    Parse(String),

    /// One or more recipe validation failures, reported together.
    #[error("recipe validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The recipe architectures and the target architecture don't intersect.
    #[error("architecture `{target}` is not supported by this recipe (supports: {supported})")]
    Architecture { target: String, supported: String },

    /// A stat, read, open or create failed while walking or writing.
    #[error("{op} `{}`", .path.display())]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Archive or metadata encoding failed for the named entry.
    #[error("{op} `{entry}`")]
    Encoding {
        entry: String,
        op: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A timestamp left the unsigned 32-bit range RPM headers require.
    #[error("timestamp {0} does not fit into an unsigned 32-bit field")]
    Overflow(i64),
}

impl PackagingError {
    pub fn fs(op: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Filesystem {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn encoding(
        entry: impl Into<String>,
        op: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Encoding {
            entry: entry.into(),
            op,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_survive_anyhow_roundtrip() {
        let err: crate::Error = PackagingError::Overflow(-1).into();
        match err.downcast_ref::<PackagingError>() {
            Some(PackagingError::Overflow(secs)) => assert_eq!(*secs, -1),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn validation_error_lists_every_problem() {
        let err = PackagingError::Validation(vec!["a".into(), "b".into()]);
        let msg = err.to_string();
        assert!(msg.contains("a") && msg.contains("b"));
    }
}
