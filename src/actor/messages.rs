//! Actor message definitions.

/// Messages to the reload supervisor.
#[derive(Debug)]
pub enum ReloadMsg {
    /// A debounced source-change pulse; also sent once at startup.
    Pulse,
    /// Kill the runtime child and stop.
    Shutdown,
}
