use thiserror::Error;

pub mod task;

#[cfg(test)]
pub mod test_util;

/// Failures the domain reports to driving adapters
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to {action}: the task store could not be reached: {cause}")]
    StoreUnavailable {
        action: String,
        #[source]
        cause: anyhow::Error,
    },
    #[error("failed to {action}: the task store rejected the record: {cause}")]
    ConstraintViolation {
        action: String,
        #[source]
        cause: anyhow::Error,
    },
}

/// Failures reported by driven adapters
#[derive(Error, Debug)]
pub enum DrivenPortError {
    #[error("a communication failure occurred: {0}")]
    StoreUnavailable(anyhow::Error),
    #[error("the store refused to persist the record: {0}")]
    ConstraintViolation(anyhow::Error),
}

impl DrivenPortError {
    /// Converts this DrivenPortError to a domain error with some extra info on the [action]
    /// being taken when communicating over the port
    fn into_error_trying_to(self, action: &str) -> Error {
        match self {
            Self::StoreUnavailable(cause) => Error::StoreUnavailable {
                action: action.into(),
                cause,
            },
            Self::ConstraintViolation(cause) => Error::ConstraintViolation {
                action: action.into(),
                cause,
            },
        }
    }
}
