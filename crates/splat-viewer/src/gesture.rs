//! Normalized gesture events and the interpreter that turns them into
//! camera updates.

use crate::camera::CameraState;
use glam::Vec2;

/// Recognizer phase for continuous two-finger gestures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GesturePhase {
    Began,
    Changed,
    Ended,
    Cancelled,
}

/// Receives the normalized input of a hosting view.
///
/// Positions are in view pixels. `scale` and `delta_rad` are incremental
/// since the previous event of the same gesture.
pub trait GestureListener {
    fn pointer_down(&mut self, position: Vec2);
    fn pointer_move(&mut self, position: Vec2);
    fn pointer_up(&mut self);
    fn pinch(&mut self, scale: f32, phase: GesturePhase);
    fn rotate(&mut self, delta_rad: f32, position: Vec2, phase: GesturePhase);
}

/// Sole writer of the [`CameraState`].
#[derive(Debug, Default)]
pub struct GestureInterpreter {
    camera: CameraState,
    last_touch: Option<Vec2>,
    twist_anchor: Option<Vec2>,
}

impl GestureInterpreter {
    pub fn new(camera: CameraState) -> Self {
        Self {
            camera,
            last_touch: None,
            twist_anchor: None,
        }
    }

    #[inline]
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.last_touch.is_some()
    }
}

impl GestureListener for GestureInterpreter {
    fn pointer_down(&mut self, position: Vec2) {
        self.last_touch = Some(position);
    }

    fn pointer_move(&mut self, position: Vec2) {
        let Some(last) = self.last_touch else {
            return;
        };
        self.camera.apply_pan(position - last);
        self.last_touch = Some(position);
    }

    fn pointer_up(&mut self) {
        self.last_touch = None;
    }

    fn pinch(&mut self, scale: f32, phase: GesturePhase) {
        if phase == GesturePhase::Changed {
            self.camera.apply_pinch(scale);
        }
    }

    fn rotate(&mut self, delta_rad: f32, position: Vec2, phase: GesturePhase) {
        match phase {
            GesturePhase::Changed => {
                if let Some(anchor) = self.twist_anchor {
                    self.camera
                        .apply_two_finger_rotation(delta_rad, position - anchor);
                }
                self.twist_anchor = Some(position);
            }
            GesturePhase::Began | GesturePhase::Ended | GesturePhase::Cancelled => {
                self.twist_anchor = None;
            }
        }
    }
}
