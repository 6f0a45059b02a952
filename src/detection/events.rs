//! Derives trap-collision and target-reached state transitions.

use log::{info, warn};

use crate::detection::classifier::Blob;

/// Target counts as reached when the player is strictly closer than this.
pub const TARGET_RADIUS: f64 = 50.0;

/// A state transition observed during one detection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    EnteredTrap,
    ExitedTrap,
    TargetReached,
    TargetLost,
}

/// Current derived state, mutated once per cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventState {
    pub is_in_trap: bool,
    pub target_reached: bool,
}

/// Turns tracked positions into debounced state transitions.
///
/// Both flags use entry/exit hysteresis: an event fires only when the flag
/// flips, never on every frame the condition holds. Unknown positions leave
/// the corresponding flag untouched, since the condition cannot be evaluated.
pub struct EventEngine {
    state: EventState,
}

impl Default for EventEngine {
    fn default() -> Self {
        Self { state: EventState::default() }
    }
}

impl EventEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EventState {
        self.state
    }

    /// Compute the new state from this cycle's positions, returning every
    /// transition that occurred.
    pub fn derive(
        &mut self,
        player_pos: Option<(i32, i32)>,
        target_pos: Option<(i32, i32)>,
        trap_boxes: &[Blob],
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();

        let Some((px, py)) = player_pos else {
            return events;
        };

        let in_trap = trap_boxes.iter().any(|trap| trap.contains_point(px, py));
        if in_trap && !self.state.is_in_trap {
            warn!("player stepped into a trap at ({}, {})", px, py);
            events.push(GameEvent::EnteredTrap);
        } else if !in_trap && self.state.is_in_trap {
            info!("player left the trap");
            events.push(GameEvent::ExitedTrap);
        }
        self.state.is_in_trap = in_trap;

        if let Some((tx, ty)) = target_pos {
            let distance = (((px - tx) as f64).powi(2) + ((py - ty) as f64).powi(2)).sqrt();
            // Same threshold both directions; a point sitting exactly on the
            // boundary can chatter between frames.
            let reached = distance < TARGET_RADIUS;
            if reached && !self.state.target_reached {
                info!("player reached the target (distance {:.1})", distance);
                events.push(GameEvent::TargetReached);
            } else if !reached && self.state.target_reached {
                events.push(GameEvent::TargetLost);
            }
            self.state.target_reached = reached;
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trap(x: i32, y: i32, w: i32, h: i32) -> Blob {
        Blob { x, y, width: w, height: h, area: (w * h) as u32 }
    }

    #[test]
    fn entering_and_leaving_a_trap_fires_once_each() {
        let mut engine = EventEngine::new();
        let traps = [trap(90, 90, 30, 30)];

        assert_eq!(engine.derive(Some((100, 100)), None, &traps), vec![GameEvent::EnteredTrap]);
        assert!(engine.state().is_in_trap);

        // Still inside: hysteresis suppresses a repeat.
        assert!(engine.derive(Some((110, 105)), None, &traps).is_empty());
        assert!(engine.state().is_in_trap);

        assert_eq!(engine.derive(Some((200, 200)), None, &traps), vec![GameEvent::ExitedTrap]);
        assert!(!engine.state().is_in_trap);
    }

    #[test]
    fn trap_containment_is_boundary_inclusive() {
        let mut engine = EventEngine::new();
        let traps = [trap(90, 90, 30, 30)];
        assert_eq!(engine.derive(Some((120, 120)), None, &traps), vec![GameEvent::EnteredTrap]);
    }

    #[test]
    fn any_trap_box_keeps_the_flag_set() {
        let mut engine = EventEngine::new();
        let first = [trap(0, 0, 20, 20), trap(100, 100, 20, 20)];
        engine.derive(Some((10, 10)), None, &first);
        assert!(engine.state().is_in_trap);

        // Player now sits in the second box only; no transition.
        assert!(engine.derive(Some((110, 110)), None, &first).is_empty());
        assert!(engine.state().is_in_trap);
    }

    #[test]
    fn unknown_player_leaves_state_untouched() {
        let mut engine = EventEngine::new();
        let traps = [trap(90, 90, 30, 30)];
        engine.derive(Some((100, 100)), None, &traps);
        assert!(engine.state().is_in_trap);

        assert!(engine.derive(None, Some((0, 0)), &[]).is_empty());
        assert!(engine.state().is_in_trap);
    }

    #[test]
    fn target_reached_within_radius() {
        let mut engine = EventEngine::new();
        let events = engine.derive(Some((100, 100)), Some((120, 100)), &[]);
        assert_eq!(events, vec![GameEvent::TargetReached]);
        assert!(engine.state().target_reached);

        // Moving away past the same threshold loses the target.
        let events = engine.derive(Some((100, 100)), Some((200, 100)), &[]);
        assert_eq!(events, vec![GameEvent::TargetLost]);
        assert!(!engine.state().target_reached);
    }

    #[test]
    fn distance_exactly_at_radius_is_not_reached() {
        let mut engine = EventEngine::new();
        let events = engine.derive(Some((100, 100)), Some((150, 100)), &[]);
        assert!(events.is_empty());
        assert!(!engine.state().target_reached);
    }

    #[test]
    fn unknown_target_leaves_target_state_untouched() {
        let mut engine = EventEngine::new();
        engine.derive(Some((100, 100)), Some((110, 100)), &[]);
        assert!(engine.state().target_reached);

        assert!(engine.derive(Some((100, 100)), None, &[]).is_empty());
        assert!(engine.state().target_reached);
    }

    #[test]
    fn simultaneous_trap_and_target_transitions() {
        let mut engine = EventEngine::new();
        let traps = [trap(95, 95, 10, 10)];
        let events = engine.derive(Some((100, 100)), Some((110, 100)), &traps);
        assert_eq!(events, vec![GameEvent::EnteredTrap, GameEvent::TargetReached]);
    }
}
