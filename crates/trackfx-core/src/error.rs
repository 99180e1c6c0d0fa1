//! Error types for processor lifecycle and chain operations.
//!
//! Only control-side operations (initialization, group creation, chain edits)
//! return errors. Finalize paths report a plain `bool` and realtime paths
//! never fail: they degrade to pass-through instead.

/// Errors that can occur while configuring or initializing processing.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Sample rate is not finite, not positive, or above the supported maximum.
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f64),
    /// Channel count exceeds the instance arity or the global limit.
    #[error("invalid channel count {requested} (maximum {max})")]
    InvalidChannelCount { requested: usize, max: usize },
    /// A channel map without channels was supplied.
    #[error("channel map is empty")]
    EmptyChannelMap,
    /// Operation requires a prior initialize call.
    #[error("processor is not initialized")]
    NotInitialized,
    /// Offline processing was initialized twice without finalize.
    #[error("processor is already initialized")]
    AlreadyInitialized,
    /// Realtime processing was finalized; the realtime lifecycle is over.
    #[error("realtime processing was finalized")]
    Finalized,
    /// Group table is full.
    #[error("group capacity of {0} reached")]
    GroupCapacity(usize),
    /// The DSP kernel could not be created for the requested configuration.
    #[error("effect kernel unavailable: {0}")]
    KernelUnavailable(String),
    /// Settings blob could not be encoded or decoded.
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),
    /// Settings layout does not match the effect's parameters.
    #[error("settings layout mismatch: {0}")]
    SettingsLayout(String),
    /// Command ring towards the audio context is full.
    #[error("command queue is full")]
    QueueFull,
    /// Effect chain holds its maximum number of effects.
    #[error("effect chain is full ({0} effects)")]
    ChainFull(usize),
    /// Chain position is out of range.
    #[error("invalid chain position {0}")]
    InvalidPosition(usize),
    /// Effect identifier is not part of the chain.
    #[error("unknown effect {0}")]
    UnknownEffect(u64),
    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for processor operations.
pub type ProcessorResult<T> = std::result::Result<T, ProcessorError>;
