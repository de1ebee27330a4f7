//! Events that drive the gate

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    Submit { text: String },

    // Service events
    AppendSucceeded,
    AppendFailed,

    /// The in-flight submit was dropped by its caller
    AppendAbandoned,
}
