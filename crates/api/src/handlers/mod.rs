pub mod generation;
pub mod images;
pub mod projects;

use validator::Validate;

use crate::error::AppResult;

/// Run `validator` rules on a request body.
pub(crate) fn validated<T: Validate>(input: T) -> AppResult<T> {
    input.validate()?;
    Ok(input)
}
