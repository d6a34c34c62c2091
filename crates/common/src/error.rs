use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A document (config file, payload) could not be decoded.
    #[error("invalid {format}: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn parse(format: &'static str, source: impl std::fmt::Display) -> Self {
        Self::Parse {
            format,
            message: source.to_string(),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ── Context helpers ─────────────────────────────────────────────────────────

/// Error types that can be built from a plain message string.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` trait adding `.with_context()` to
/// `Result`, prefixing the source error with a lazily built message.
///
/// Must be invoked in a module that defines `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`.
///
/// ```ignore
/// // crates/config/src/error.rs
/// saju_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let ctx: String = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_the_format() {
        let err = Error::parse("toml", "expected `=`");
        assert_eq!(err.to_string(), "invalid toml: expected `=`");
    }

    #[test]
    fn io_errors_stay_transparent() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.to_string(), "gone");
    }

    mod with_context {
        use super::super::{Error, Result};

        crate::impl_context!();

        #[test]
        fn prefixes_the_source_message() {
            let failed: std::result::Result<(), &str> = Err("permission denied");
            let err = failed
                .with_context(|| "failed to read saju.toml")
                .unwrap_err();
            assert!(matches!(err, Error::Message(_)));
            assert_eq!(err.to_string(), "failed to read saju.toml: permission denied");
        }

        #[test]
        fn leaves_ok_untouched() {
            let ok: std::result::Result<u8, &str> = Ok(7);
            let value: Result<u8> = ok.with_context(|| "unused");
            assert_eq!(value.unwrap(), 7);
        }
    }
}
