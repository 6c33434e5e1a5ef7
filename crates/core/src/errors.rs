use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("data access failure: {0}")]
    DataAccess(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("assist provider failure: {0}")]
    Assist(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, trace_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, trace_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, trace_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn trace_id(&self) -> &str {
        match self {
            Self::BadRequest { trace_id, .. }
            | Self::ServiceUnavailable { trace_id, .. }
            | Self::Internal { trace_id, .. } => trace_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, trace_id: impl Into<String>) -> InterfaceError {
        let trace_id = trace_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { trace_id: id, .. }
            | InterfaceError::ServiceUnavailable { trace_id: id, .. }
            | InterfaceError::Internal { trace_id: id, .. } => *id = trace_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::InvariantViolation(_)) => Self::Internal {
                message: "response contract violated".to_owned(),
                trace_id: "unassigned".to_owned(),
            },
            ApplicationError::InvalidInput(message) => {
                Self::BadRequest { message, trace_id: "unassigned".to_owned() }
            }
            ApplicationError::DataAccess(message) | ApplicationError::Assist(message) => {
                Self::ServiceUnavailable { message, trace_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, trace_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_bad_request_with_trace_id() {
        let mapped = ApplicationError::InvalidInput("bad location".to_owned())
            .into_interface("trace-123");
        assert_eq!(
            mapped,
            InterfaceError::BadRequest {
                message: "bad location".to_owned(),
                trace_id: "trace-123".to_owned(),
            }
        );
    }

    #[test]
    fn data_access_maps_to_service_unavailable() {
        let mapped =
            ApplicationError::DataAccess("catalog fetch failed".to_owned()).into_interface("t");
        assert!(matches!(mapped, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(mapped.trace_id(), "t");
    }
}
