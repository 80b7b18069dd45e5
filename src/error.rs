//! Error types for mdns-alias.

use std::fmt;

use thiserror::Error;

/// Errors that can stop the alias publisher.
#[derive(Debug, Error)]
pub enum AliasError {
    /// IO error (signal registration, stdout, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded or deserialized
    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// The responder session failed or could not be established
    #[error("Responder error: {0}")]
    Responder(#[from] ResponderError),

    /// Adding or committing the CNAME records failed
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Nothing left to publish after alias validation
    #[error("No aliases to publish: {0}")]
    Usage(String),
}

/// Errors reported by the mDNS responder.
#[derive(Debug, Error)]
pub enum ResponderError {
    /// The responder rejected an operation with an error code.
    #[error("{op}: {code}")]
    Code {
        /// Operation that failed (e.g. "AddRecord").
        op: &'static str,
        /// Responder error code.
        code: ErrorCode,
    },

    /// D-Bus transport error not mapped to a responder error code.
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    /// The event stream from the responder closed unexpectedly.
    #[error("responder event stream closed")]
    Closed,
}

impl ResponderError {
    /// Build an error for `op` failing with `code`.
    pub fn code(op: &'static str, code: ErrorCode) -> Self {
        Self::Code { op, code }
    }
}

/// Failure while populating or committing the record group.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The record group could not be created.
    #[error("Failed creating new entry group: {0}")]
    CreateGroup(#[source] ResponderError),

    /// A CNAME record could not be added.
    #[error("Failed publishing DNS-SD CNAME {alias}: {source}")]
    AddRecord {
        /// Alias whose record was rejected.
        alias: String,
        /// Underlying responder error.
        #[source]
        source: ResponderError,
    },

    /// The group could not be committed.
    #[error("Failed to commit entry group: {0}")]
    Commit(#[source] ResponderError),

    /// The group could not be reset.
    #[error("Failed to reset entry group: {0}")]
    Reset(#[source] ResponderError),
}

/// Numeric error code reported by the responder.
///
/// Codes follow the avahi-daemon numbering: zero is success, failures are
/// negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// No error.
    pub const OK: Self = Self(0);
    /// Generic failure.
    pub const FAILURE: Self = Self(-1);
    /// Local name collision.
    pub const COLLISION: Self = Self(-8);
    /// Unexpected D-Bus error.
    pub const DBUS_ERROR: Self = Self(-22);
    /// Lost connection to the daemon.
    pub const DISCONNECTED: Self = Self(-23);
    /// Daemon not running.
    pub const NO_DAEMON: Self = Self(-26);

    /// Avahi's D-Bus error names, indexed by `-code`.
    const DBUS_NAMES: [&'static str; 35] = [
        "org.freedesktop.Avahi.Success",
        "org.freedesktop.Avahi.Failure",
        "org.freedesktop.Avahi.BadStateError",
        "org.freedesktop.Avahi.InvalidHostNameError",
        "org.freedesktop.Avahi.InvalidDomainNameError",
        "org.freedesktop.Avahi.NoNetworkError",
        "org.freedesktop.Avahi.InvalidTTLError",
        "org.freedesktop.Avahi.IsPatternError",
        "org.freedesktop.Avahi.CollisionError",
        "org.freedesktop.Avahi.InvalidRecordError",
        "org.freedesktop.Avahi.InvalidServiceNameError",
        "org.freedesktop.Avahi.InvalidServiceTypeError",
        "org.freedesktop.Avahi.InvalidPortError",
        "org.freedesktop.Avahi.InvalidKeyError",
        "org.freedesktop.Avahi.InvalidAddressError",
        "org.freedesktop.Avahi.TimeoutError",
        "org.freedesktop.Avahi.TooManyClientsError",
        "org.freedesktop.Avahi.TooManyObjectsError",
        "org.freedesktop.Avahi.TooManyEntriesError",
        "org.freedesktop.Avahi.OSError",
        "org.freedesktop.DBus.Error.AccessDenied",
        "org.freedesktop.Avahi.InvalidOperationError",
        "org.freedesktop.Avahi.DBusError",
        "org.freedesktop.Avahi.DisconnectedError",
        "org.freedesktop.Avahi.NoMemoryError",
        "org.freedesktop.Avahi.InvalidObjectError",
        "org.freedesktop.Avahi.NoDaemonError",
        "org.freedesktop.Avahi.InvalidInterfaceError",
        "org.freedesktop.Avahi.InvalidProtocolError",
        "org.freedesktop.Avahi.InvalidFlagsError",
        "org.freedesktop.Avahi.NotFoundError",
        "org.freedesktop.Avahi.InvalidConfigurationError",
        "org.freedesktop.Avahi.VersionMismatchError",
        "org.freedesktop.Avahi.InvalidServiceSubtypeError",
        "org.freedesktop.Avahi.InvalidPacketError",
    ];

    const DESCRIPTIONS: [&'static str; 35] = [
        "OK",
        "Operation failed",
        "Bad state",
        "Invalid host name",
        "Invalid domain name",
        "No suitable network protocol available",
        "Invalid DNS TTL",
        "Resource record key is pattern",
        "Local name collision",
        "Invalid record",
        "Invalid service name",
        "Invalid service type",
        "Invalid port number",
        "Invalid record key",
        "Invalid address",
        "Timeout reached",
        "Too many clients",
        "Too many objects",
        "Too many entries",
        "OS Error",
        "Access denied",
        "Invalid operation",
        "An unexpected D-Bus error occurred",
        "Daemon connection failed",
        "Memory exhausted",
        "The object passed in was not valid",
        "Daemon not running",
        "Invalid interface index",
        "Invalid protocol specification",
        "Invalid flags",
        "Not found",
        "Invalid configuration",
        "Version mismatch",
        "Invalid service subtype",
        "Invalid packet",
    ];

    /// Human-readable description of this code.
    pub fn describe(self) -> &'static str {
        self.index()
            .and_then(|i| Self::DESCRIPTIONS.get(i))
            .copied()
            .unwrap_or("Invalid Error Code")
    }

    /// Map a D-Bus error name back to a responder error code.
    ///
    /// Names outside the Avahi namespace map to [`ErrorCode::DBUS_ERROR`].
    pub fn from_dbus_name(name: &str) -> Self {
        match name {
            "" => return Self::OK,
            "org.freedesktop.DBus.Error.ServiceUnknown"
            | "org.freedesktop.DBus.Error.NameHasNoOwner" => return Self::NO_DAEMON,
            _ => {}
        }
        Self::DBUS_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self(-(i as i32)))
            .unwrap_or(Self::DBUS_ERROR)
    }

    fn index(self) -> Option<usize> {
        if self.0 > 0 {
            return None;
        }
        usize::try_from(self.0.unsigned_abs()).ok()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

impl From<&zbus::Error> for ErrorCode {
    fn from(err: &zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, _, _) => Self::from_dbus_name(name.as_str()),
            _ => Self::DBUS_ERROR,
        }
    }
}
