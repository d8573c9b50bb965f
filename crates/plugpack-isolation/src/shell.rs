//! Shell quoting and script assembly for containerised commands.
//!
//! Scripts are handed to `/bin/bash -l -c` inside the container as a single
//! argument, so only values spliced into the script text need quoting.

use std::borrow::Cow;

use crate::error::IsolationError;

/// Separator used to chain script steps so the first failure aborts the run.
const STEP_SEPARATOR: &str = " && ";

/// Quotes a value so bash reads it back as one literal word.
///
/// # Errors
///
/// Returns [`IsolationError::Quote`] when the value contains a NUL byte,
/// which no shell word can represent.
///
/// ```
/// use plugpack_isolation::shell;
///
/// let quoted = shell::quote("name; rm -rf /").expect("quotable");
/// assert_eq!(shlex::split(&quoted), Some(vec![String::from("name; rm -rf /")]));
/// ```
pub fn quote(value: &str) -> Result<String, IsolationError> {
    shlex::try_quote(value)
        .map(Cow::into_owned)
        .map_err(|_| IsolationError::Quote {
            value: value.to_owned(),
        })
}

/// Joins script steps with `&&`.
pub fn chain<I, S>(steps: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    steps
        .into_iter()
        .map(|step| step.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(STEP_SEPARATOR)
}
