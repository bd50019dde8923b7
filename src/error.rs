use thiserror::Error;

/// Errors that can occur while building invoices.
///
/// Every one of these aborts the conversion. Bad rows are never skipped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A required field is missing or malformed.
    ///
    /// `line` is the 1-based line of the source file, when known.
    #[error("{}invalid input: {message}", .line.map(|n| format!("line {n}: ")).unwrap_or_default())]
    Validation { line: Option<u64>, message: String },

    /// The shipping-rate table has no fee for this destination and size.
    ///
    /// `line` is the order-sheet line that asked for it, when known.
    #[error("{}no shipping fee for region {region:?}, size {size:?}", .line.map(|n| format!("line {n}: ")).unwrap_or_default())]
    Lookup {
        line: Option<u64>,
        region: String,
        size: String,
    },

    /// A date given on the command line could not be parsed.
    #[error("bad date format: {0:?} (expected yyyy-mm-dd or yyyy/M/d)")]
    Format(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            line: None,
            message: message.into(),
        }
    }

    /// Attaches a source line number to a validation or lookup error that
    /// lacks one.
    #[must_use]
    pub(crate) fn at_line(self, n: Option<u64>) -> Self {
        match self {
            Self::Validation { line: None, message } => Self::Validation { line: n, message },
            Self::Lookup {
                line: None,
                region,
                size,
            } => Self::Lookup {
                line: n,
                region,
                size,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_line_fn_adds_line_number_to_validation_and_lookup_errors() {
        let err = Error::validation("missing invoice id").at_line(Some(7));
        assert_eq!(err.to_string(), "line 7: invalid input: missing invoice id");

        let err = Error::Lookup {
            line: None,
            region: "沖縄".into(),
            size: "80".into(),
        }
        .at_line(Some(7));
        assert!(matches!(err, Error::Lookup { line: Some(7), .. }));
        assert_eq!(
            err.to_string(),
            "line 7: no shipping fee for region \"沖縄\", size \"80\""
        );

        let err = Error::Format("1/6".into()).at_line(Some(7));
        assert_eq!(err.to_string(), "bad date format: \"1/6\" (expected yyyy-mm-dd or yyyy/M/d)");
    }

    #[test]
    fn at_line_fn_keeps_an_existing_line_number() {
        let err = Error::Validation {
            line: Some(3),
            message: "bad".into(),
        }
        .at_line(Some(9));
        assert_eq!(err.to_string(), "line 3: invalid input: bad");
    }
}
