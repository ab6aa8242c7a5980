//! Editor-facing outputs of the front end.
//!
//! Every entry point takes a snapshot plus a parsed file and returns
//! plain data records an IDE integration layer can render: highlight
//! spans, completion proposals, function hints, link targets. The
//! intended split is a foreground thread issuing on-demand requests and
//! a background worker running whole-file highlight passes; background
//! runs carry a [`CancelToken`] and abandon their output when cancelled.

pub mod cancel;
pub mod complete;
pub mod highlight;
pub mod hint;
pub mod navigate;

pub use cancel::CancelToken;
pub use complete::complete_at;
pub use highlight::{highlight_file, HighlightKind, HighlightSpan, MAX_SEMANTIC_FILE_BYTES};
pub use hint::{function_hint_at, FunctionHint};
pub use navigate::{definition_at, LinkTarget};
