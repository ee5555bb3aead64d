use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConstraintError {
    #[error("could not create version constraint from `{constraint}`: {reason}")]
    InvalidRange { constraint: String, reason: String },

    #[error("invalid version regex `{constraint}`: {source}")]
    InvalidRegex {
        constraint: String,
        #[source]
        source: regex::Error,
    },
}
