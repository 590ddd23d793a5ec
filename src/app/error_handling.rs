//! Fatal error reporting

use crate::error::{exit_codes, ReportError};
use tracing::error;

/// Exit code for an error, taken from the first [`ReportError`] in its chain
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ReportError>())
        .map_or(exit_codes::GENERAL_ERROR, ReportError::exit_code)
}

/// Print the error and exit with its status code
///
/// The full cause chain is printed at `-v` and above.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {:#}", error);

    eprintln!("Error: {error:#}");
    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code_for(&error))
}
