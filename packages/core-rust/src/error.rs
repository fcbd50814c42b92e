/// Registration rejected because a key or handler was missing.
///
/// These are programming errors. The panicking registration methods turn
/// them into an immediate halt; the `try_*` methods return them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("centra: sentinel must not be empty")]
    MissingSentinel,
    #[error("centra: handler must not be empty")]
    MissingHandler,
}
