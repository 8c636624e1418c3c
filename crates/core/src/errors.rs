use thiserror::Error;

use crate::config::ConfigError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("data error: {0}")]
    Data(String),
    #[error("product `{sku}` is not in the current catalog")]
    ProductNotFound { sku: String },
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl ApplicationError {
    /// Stable machine-readable class used in command outcomes and logs.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::Data(_)) => "data",
            Self::Domain(DomainError::ProductNotFound { .. }) => "not_found",
            Self::Domain(DomainError::CatalogUnavailable(_)) => "service_unavailable",
            Self::Domain(DomainError::InvariantViolation(_)) => "invariant_violation",
            Self::Persistence(_) => "persistence",
            Self::Configuration(_) => "configuration",
            Self::Conflict(_) => "conflict",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "Product not found in dataset.",
            Self::Conflict { .. } => "Another run is already in progress. Try again later.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::Data(message)) => {
                Self::BadRequest { message, correlation_id }
            }
            ApplicationError::Domain(error @ DomainError::ProductNotFound { .. }) => {
                Self::NotFound { message: error.to_string(), correlation_id }
            }
            ApplicationError::Domain(DomainError::CatalogUnavailable(message))
            | ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Conflict(message) => Self::Conflict { message, correlation_id },
            ApplicationError::Domain(DomainError::InvariantViolation(message))
            | ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn data_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::Data("limit must be at least 1".into()))
            .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn unknown_product_maps_to_not_found() {
        let interface =
            ApplicationError::from(DomainError::ProductNotFound { sku: "sku-404".to_owned() })
                .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert!(interface.message().contains("sku-404"));
    }

    #[test]
    fn unavailable_catalog_and_persistence_map_to_service_unavailable() {
        let catalog = ApplicationError::from(DomainError::CatalogUnavailable(
            "catalog has not been built".to_owned(),
        ))
        .into_interface("req-3");
        let persistence = ApplicationError::Persistence("database lock timeout".to_owned())
            .into_interface("req-3");

        assert!(matches!(catalog, InterfaceError::ServiceUnavailable { .. }));
        assert!(matches!(persistence, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            persistence.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("missing thresholds artifact".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn error_classes_are_stable() {
        assert_eq!(ApplicationError::from(DomainError::Data(String::new())).error_class(), "data");
        assert_eq!(ApplicationError::Conflict(String::new()).error_class(), "conflict");
        assert_eq!(ApplicationError::Configuration(String::new()).error_class(), "configuration");
    }
}
