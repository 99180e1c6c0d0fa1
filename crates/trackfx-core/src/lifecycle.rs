//! Instance and group lifecycle state machines.
//!
//! # State Transitions
//!
//! ```text
//! Uninitialized --[initialize]--> Initialized --[first block]--> Processing
//!                                                                  |    ^
//!                                               [settings inactive] |    | [settings active]
//!                                                                  v    |
//!                                                                 Bypassed
//!
//! any state --[realtime finalize]--> Finalized (terminal)
//! ```
//!
//! Offline processing reuses the same states but returns to `Uninitialized`
//! on finalize, so an instance can apply an effect to several tracks in turn.
//! Groups additionally move to `Suspended` while the transport is stopped and
//! to `Faulted` when their kernel reports a fault.

/// Lifecycle of an instance (offline and realtime paths are tracked apart).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// No sample rate bound, no kernel state.
    #[default]
    Uninitialized,
    /// Sample rate bound, nothing processed yet.
    Initialized,
    /// Processing blocks through the kernel.
    Processing,
    /// Forwarding audio while the settings are inactive.
    Bypassed,
    /// Torn down for good.
    Finalized,
}

impl LifecycleState {
    /// Whether processing calls are accepted.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized | Self::Processing | Self::Bypassed)
    }

    /// Whether an initialize call is accepted in this state.
    #[inline]
    pub fn can_initialize(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }

    /// State after a block was handled with the given active flag.
    ///
    /// States that do not accept blocks are returned unchanged.
    #[inline]
    pub fn after_block(self, active: bool) -> Self {
        match self {
            Self::Initialized | Self::Processing | Self::Bypassed => {
                if active {
                    Self::Processing
                } else {
                    Self::Bypassed
                }
            }
            other => other,
        }
    }
}

/// Lifecycle of one realtime processing group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupState {
    /// Kernel created, not yet fed.
    #[default]
    Initialized,
    /// Processing blocks through the kernel.
    Processing,
    /// Forwarding audio with latency alignment.
    Bypassed,
    /// Transport stopped; buffers kept.
    Suspended,
    /// Kernel reported a fault; audio passes through until resume.
    Faulted,
}

impl GroupState {
    /// Whether blocks should reach the kernel's `process()`.
    #[inline]
    pub fn runs_kernel(&self) -> bool {
        matches!(self, Self::Initialized | Self::Processing | Self::Bypassed)
    }

    /// State after a block was handled with the given active flag.
    #[inline]
    pub fn after_block(self, active: bool) -> Self {
        match self {
            Self::Initialized | Self::Processing | Self::Bypassed => {
                if active {
                    Self::Processing
                } else {
                    Self::Bypassed
                }
            }
            other => other,
        }
    }

    /// State after the instance resumes.
    #[inline]
    pub fn resumed(self) -> Self {
        match self {
            Self::Suspended | Self::Faulted => Self::Processing,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_uninitialized() {
        let state = LifecycleState::default();
        assert!(!state.is_initialized());
        assert!(state.can_initialize());
    }

    #[test]
    fn test_processing_bypass_toggle() {
        let state = LifecycleState::Initialized.after_block(true);
        assert_eq!(state, LifecycleState::Processing);
        let state = state.after_block(false);
        assert_eq!(state, LifecycleState::Bypassed);
        let state = state.after_block(true);
        assert_eq!(state, LifecycleState::Processing);
    }

    #[test]
    fn test_finalized_is_terminal() {
        let state = LifecycleState::Finalized;
        assert!(!state.is_initialized());
        assert!(!state.can_initialize());
        assert_eq!(state.after_block(true), LifecycleState::Finalized);
    }

    #[test]
    fn test_group_suspend_and_resume() {
        let state = GroupState::Suspended;
        assert!(!state.runs_kernel());
        assert_eq!(state.after_block(true), GroupState::Suspended);
        assert_eq!(state.resumed(), GroupState::Processing);
    }

    #[test]
    fn test_group_fault_clears_on_resume() {
        let state = GroupState::Faulted;
        assert!(!state.runs_kernel());
        assert_eq!(state.resumed(), GroupState::Processing);
        assert_eq!(GroupState::Bypassed.resumed(), GroupState::Bypassed);
    }
}
