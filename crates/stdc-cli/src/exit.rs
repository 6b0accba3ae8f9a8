// Exit codes for scripting and CI triage
use stdc_format::FormatError;

use crate::config::ConfigError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_GENERIC_FAIL: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_INCOMPLETE: i32 = 3;

/// Map a failed run to its exit code by looking through the error chain.
pub fn code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(format_err) = cause.downcast_ref::<FormatError>() {
            return match format_err {
                FormatError::IncompleteConversion { .. } => EXIT_INCOMPLETE,
                FormatError::SamePath(_) => EXIT_USAGE,
                _ => EXIT_GENERIC_FAIL,
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return EXIT_USAGE;
        }
    }
    EXIT_GENERIC_FAIL
}
