//! Terminal output
//!
//! Results go to the destination path, never to stdout. The only thing the
//! tool prints itself is a single error line on stderr.

use console::{Term, style};

use kmstool_core::Error;

/// Print `error: <stage>: <detail>` on stderr
pub fn error(err: &Error) {
    let term = Term::stderr();
    let line = format_error(err, term.features().colors_supported());
    // Nothing useful left to do if stderr is gone
    let _ = term.write_line(&line);
}

fn format_error(err: &Error, colors: bool) -> String {
    let label = style("error:").red().bold().force_styling(colors);
    format!("{label} {err}")
}
