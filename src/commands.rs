//! CLI subcommands. Each writes a human-readable report for one repository.

pub mod status;
pub mod sync;
pub mod unlock;

/// Render an error followed by its causes, one per line.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string().replace('\n', "\n    "));
        source = cause.source();
    }
    out
}
