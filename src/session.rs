//! Interactive editing of a rest/deformed triangulation pair.
//!
//! The host application converts pointer events to model-space points and
//! forwards them here. Insertions and removals are mirrored into both
//! triangulations so they stay index-aligned; drags only move the point in
//! the active triangulation.

use glam::DVec3;

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::triangulation::Triangulation;
use crate::warp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Selected(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Grab a point, or place a new one.
    Primary,
    /// Remove the point under the pointer.
    Secondary,
}

/// What a pointer event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    Nothing,
    Selected(usize),
    Inserted(usize),
    Removed(usize),
    Moved(usize),
}

/// Owns both triangulations of a warp together with the pointer selection.
#[derive(Debug, Clone)]
pub struct EditSession {
    config: SessionConfig,
    rest: Triangulation,
    deformed: Triangulation,
    apply_warp: bool,
    selection: Selection,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl EditSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            rest: Triangulation::new(config.triangulation),
            deformed: Triangulation::new(config.triangulation),
            apply_warp: true,
            selection: Selection::None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn rest(&self) -> &Triangulation {
        &self.rest
    }

    pub fn deformed(&self) -> &Triangulation {
        &self.deformed
    }

    /// The triangulation pointer edits act on: the deformed one while the
    /// warp is applied, the rest one otherwise.
    pub fn active(&self) -> &Triangulation {
        if self.apply_warp {
            &self.deformed
        } else {
            &self.rest
        }
    }

    pub fn inactive(&self) -> &Triangulation {
        if self.apply_warp {
            &self.rest
        } else {
            &self.deformed
        }
    }

    fn active_mut(&mut self) -> &mut Triangulation {
        if self.apply_warp {
            &mut self.deformed
        } else {
            &mut self.rest
        }
    }

    fn inactive_mut(&mut self) -> &mut Triangulation {
        if self.apply_warp {
            &mut self.rest
        } else {
            &mut self.deformed
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn apply_warp(&self) -> bool {
        self.apply_warp
    }

    pub fn set_apply_warp(&mut self, apply_warp: bool) {
        self.apply_warp = apply_warp;
    }

    pub fn toggle_warp(&mut self) {
        self.apply_warp = !self.apply_warp;
    }

    /// Live point of the active triangulation within the pick radius of `p`.
    pub fn pick(&self, p: DVec3) -> Option<usize> {
        self.active()
            .nearest_point(p.truncate())
            .filter(|(_, d)| *d <= self.config.pick_radius)
            .map(|(i, _)| i)
    }

    /// Add a control point at `p` in the active triangulation, and at its
    /// warped equivalent in the inactive one. Both get the same index.
    ///
    /// Nothing changes unless both insertions are accepted.
    pub fn insert_control_point(&mut self, p: DVec3) -> Result<usize> {
        self.active().validate_insert(p)?;

        let twin = match warp::warp_point(self.active(), self.inactive(), p) {
            Ok(q) => q,
            Err(e) => {
                log::debug!("no warped twin for ({}, {}): {e}", p.x, p.y);
                p
            }
        };
        self.inactive().validate_insert(twin)?;

        let index = self.active_mut().insert_point(p)?;
        let other = match self.inactive_mut().insert_point(twin) {
            Ok(other) => other,
            Err(e) => panic!("validated twin of point {index} was refused: {e}"),
        };
        assert_eq!(index, other, "rest and deformed triangulations diverged");

        Ok(index)
    }

    /// Remove a control point from both triangulations.
    pub fn remove_control_point(&mut self, index: usize) -> Result<()> {
        self.rest.validate_remove(index)?;
        self.deformed.validate_remove(index)?;

        self.deformed.remove_point(index)?;
        self.rest.remove_point(index)?;

        if self.selection == Selection::Selected(index) {
            self.selection = Selection::None;
        }
        Ok(())
    }

    /// Move a control point in the active triangulation only. Positions
    /// within the pick radius of another point are refused.
    pub fn move_control_point(&mut self, index: usize, to: DVec3) -> Result<()> {
        self.active().validate_move(index, to)?;

        if let Some((other, distance)) = self.active().nearest_point_except(to.truncate(), index) {
            if distance <= self.config.pick_radius {
                return Err(Error::ProximityViolation {
                    index: other,
                    distance,
                });
            }
        }

        self.active_mut().move_point(index, to)
    }

    pub fn pointer_down(&mut self, p: DVec3, button: PointerButton) -> Result<PointerOutcome> {
        let picked = self.pick(p);
        self.selection = Selection::None;

        match (button, picked) {
            (PointerButton::Secondary, None) => Ok(PointerOutcome::Nothing),
            (PointerButton::Secondary, Some(index)) => {
                self.remove_control_point(index)?;
                Ok(PointerOutcome::Removed(index))
            }
            (PointerButton::Primary, Some(index)) => {
                self.selection = Selection::Selected(index);
                Ok(PointerOutcome::Selected(index))
            }
            (PointerButton::Primary, None) => {
                let index = self.insert_control_point(p)?;
                self.selection = Selection::Selected(index);
                Ok(PointerOutcome::Inserted(index))
            }
        }
    }

    /// Drag the selected point, if any.
    pub fn pointer_move(&mut self, p: DVec3) -> Result<PointerOutcome> {
        let Selection::Selected(index) = self.selection else {
            return Ok(PointerOutcome::Nothing);
        };
        self.move_control_point(index, p)?;
        Ok(PointerOutcome::Moved(index))
    }

    pub fn pointer_up(&mut self) {
        self.selection = Selection::None;
    }

    /// Put every deformed point back at its rest position.
    pub fn reset_positions(&mut self) {
        self.deformed = self.rest.clone();
    }

    /// Drop all control points from both triangulations.
    pub fn reset_all(&mut self) {
        self.rest = Triangulation::new(self.config.triangulation);
        self.deformed = self.rest.clone();
        self.selection = Selection::None;
    }

    /// Mesh positions to draw: warped while the warp is applied, the input
    /// otherwise.
    pub fn deform_mesh(&self, positions: &[DVec3]) -> Result<Vec<DVec3>> {
        if self.apply_warp {
            warp::warp_positions_par(&self.rest, &self.deformed, positions)
        } else {
            Ok(positions.to_vec())
        }
    }
}

// =============================================================================
