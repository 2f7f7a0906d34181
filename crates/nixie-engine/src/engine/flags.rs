//! Engine lifecycle state.

use crate::NixieError;

/// Visibility and lifecycle flags, checked at the top of every frame.
#[derive(Debug, Copy, Clone)]
pub struct EngineFlags {
    /// The surface is on screen; hidden engines skip all rendering.
    pub visible: bool,
    /// The simulation advances; paused engines still composite.
    pub running: bool,
    /// Set once, by destroy. No operation works afterwards.
    pub destroyed: bool,
}

impl EngineFlags {
    pub fn new() -> Self {
        Self {
            visible: true,
            running: true,
            destroyed: false,
        }
    }

    pub fn ensure_alive(&self) -> Result<(), NixieError> {
        if self.destroyed {
            Err(NixieError::Destroyed)
        } else {
            Ok(())
        }
    }

    /// Whether pointer events should raise disturbances right now.
    pub fn pointer_enabled(&self, interactive: bool) -> bool {
        interactive && self.visible && self.running && !self.destroyed
    }
}

impl Default for EngineFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// What one frame does for an engine in a given state.
///
/// Derived from the flags at the top of `step`, before any GPU work: a
/// paused engine still composites but leaves the field untouched, a hidden
/// engine or an empty surface box does nothing at all.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FramePlan {
    pub diffuse: bool,
    pub composite: bool,
}

impl FramePlan {
    pub fn for_state(flags: &EngineFlags, surface_empty: bool) -> Self {
        if flags.destroyed || !flags.visible || surface_empty {
            return Self {
                diffuse: false,
                composite: false,
            };
        }
        Self {
            diffuse: flags.running,
            composite: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_flags_are_alive_and_interactive() {
        let flags = EngineFlags::new();
        assert!(flags.ensure_alive().is_ok());
        assert!(flags.pointer_enabled(true));
        assert!(!flags.pointer_enabled(false));
    }

    #[test]
    fn destroyed_engines_reject_everything() {
        let mut flags = EngineFlags::new();
        flags.destroyed = true;
        assert!(matches!(flags.ensure_alive(), Err(NixieError::Destroyed)));
        assert!(!flags.pointer_enabled(true));
    }

    #[test]
    fn paused_or_hidden_engines_ignore_the_pointer() {
        let mut flags = EngineFlags::new();
        flags.running = false;
        assert!(!flags.pointer_enabled(true));

        flags.running = true;
        flags.visible = false;
        assert!(!flags.pointer_enabled(true));
    }

    #[test]
    fn running_frames_diffuse_then_composite() {
        let flags = EngineFlags::new();
        assert_eq!(
            FramePlan::for_state(&flags, false),
            FramePlan {
                diffuse: true,
                composite: true,
            }
        );
    }

    #[test]
    fn paused_frames_composite_without_diffusing() {
        let mut flags = EngineFlags::new();
        flags.running = false;
        assert_eq!(
            FramePlan::for_state(&flags, false),
            FramePlan {
                diffuse: false,
                composite: true,
            }
        );
    }

    #[test]
    fn hidden_or_degenerate_frames_do_nothing() {
        let idle = FramePlan {
            diffuse: false,
            composite: false,
        };

        let mut flags = EngineFlags::new();
        flags.visible = false;
        assert_eq!(FramePlan::for_state(&flags, false), idle);

        let flags = EngineFlags::new();
        assert_eq!(FramePlan::for_state(&flags, true), idle);
    }
}
