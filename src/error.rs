//! Error types for the IQtec sunblind integration.

/// Errors reported by a [`SunblindController`](crate::SunblindController).
///
/// These come from the controller library itself and propagate unchanged out
/// of cover commands.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The controller answered with an API-level error.
    #[error("API error: {0}")]
    Api(String),

    /// The controller could not be reached.
    #[error("Connection to {host} failed: {reason}")]
    Connection {
        /// Host address of the controller.
        host: String,
        /// Transport failure description.
        reason: String,
    },

    /// No sunblind is registered under the given address.
    #[error("Unknown sunblind address: {0}")]
    UnknownDevice(String),

    /// A sunblind is already registered under the given address.
    #[error("Sunblind {0} already registered")]
    DuplicateDevice(String),

    /// The controller reported a tilt range that cannot be converted.
    #[error("Invalid full tilt value {0} (must be greater than zero)")]
    InvalidTiltRange(i32),
}

/// The single error raised by a failed poll tick.
///
/// Wraps the message of whatever the controller library reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct UpdateFailed(pub String);

impl UpdateFailed {
    pub(crate) fn from_controller(err: &ControllerError) -> Self {
        Self(format!("Error while communicating with API: {}", err))
    }
}

/// Errors raised while loading or validating the integration configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid TOML or does not match the schema.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required string field was empty.
    #[error("{field} must not be empty ({context})")]
    EmptyField {
        /// Field name.
        field: &'static str,
        /// Where the field was found.
        context: String,
    },

    /// Two covers of one controller share an address.
    #[error("Duplicate cover address {address} on controller {host}")]
    DuplicateAddress {
        /// Controller host.
        host: String,
        /// Repeated cover address.
        address: String,
    },

    /// The poll interval was zero.
    #[error("poll_interval_secs must be greater than zero (controller {host})")]
    InvalidPollInterval {
        /// Controller host.
        host: String,
    },

    /// No controller was configured.
    #[error("No controllers configured")]
    NoControllers,
}

/// Errors raised while composing the integration.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Every configured controller failed to set up.
    #[error("No controller could be set up")]
    NoControllers,
}
