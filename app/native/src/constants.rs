//! Application-wide constants.

/// Application name, used for config/cache directories and the socket name.
pub const APP_NAME: &str = "micswitch";

/// Bundle-style identifier used for cache directories.
pub const APP_BUNDLE_ID: &str = "com.micswitch.daemon";

/// Key under which the preferred input device is persisted.
pub const PREFERENCE_KEY: &str = "selectedInputDeviceID";

/// Placeholder used when a device name cannot be read.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";
