use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Recoverable input problems (a malformed log line, a statement missing from its
/// instruction table, a causally impossible path, an unknown mnemonic) never surface
/// here; they are counted in the run report instead. What remains are conditions
/// that make the whole run meaningless.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - Corrupted instruction table or descriptor
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Json`] - Instruction table deserialization errors
/// - [`Error::Csv`] - Output writing errors
///
/// # Examples
///
/// ```rust,no_run
/// use taintpath::{Error, ExtractConfig, PathExtractor};
/// use taintpath::dalvik::InstructionResolver;
/// use std::path::Path;
///
/// let resolver = InstructionResolver::new("classes");
/// let extractor = PathExtractor::new(ExtractConfig::default());
/// match extractor.run(Path::new("log.txt"), &resolver, Path::new("out")) {
///     Ok(report) => println!("{} paths", report.paths),
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(e) => eprintln!("Extraction failed: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged beyond local recovery.
    ///
    /// Carries the source location at which the problem was detected, which makes
    /// reports from corrupt instruction tables traceable.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while reading logs and tables or
    /// while writing path files.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// An instruction table could not be deserialized.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// A CSV output file could not be written.
    #[error("{0}")]
    Csv(#[from] csv::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
