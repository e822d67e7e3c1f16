//! Translates winit window events into [`GestureListener`] calls.

use crate::gesture::{GestureListener, GesturePhase};
use glam::Vec2;
use std::f32::consts::{PI, TAU};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent};

/// Zoom factor per wheel notch.
pub const WHEEL_ZOOM_STEP: f32 = 1.1;
/// Pixel scroll deltas per wheel notch.
const PIXELS_PER_LINE: f32 = 120.0;
/// Fingers closer than this cannot give a stable pinch ratio.
const MIN_SPAN_PX: f32 = 1.0;

fn gesture_phase(phase: TouchPhase) -> GesturePhase {
    match phase {
        TouchPhase::Started => GesturePhase::Began,
        TouchPhase::Moved => GesturePhase::Changed,
        TouchPhase::Ended => GesturePhase::Ended,
        TouchPhase::Cancelled => GesturePhase::Cancelled,
    }
}

/// Wraps an angle difference into (-π, π].
fn wrap_angle(rad: f32) -> f32 {
    let r = (rad + PI).rem_euclid(TAU) - PI;
    if r <= -PI {
        r + TAU
    } else {
        r
    }
}

#[derive(Clone, Copy, Debug)]
struct TwoFinger {
    span: f32,
    angle: f32,
}

impl TwoFinger {
    fn measure(a: Vec2, b: Vec2) -> Self {
        let d = b - a;
        Self {
            span: d.length(),
            angle: d.y.atan2(d.x),
        }
    }
}

/// Host-side input state: mouse button, cursor and active touches.
#[derive(Debug, Default)]
pub struct WindowGestures {
    cursor: Vec2,
    mouse_down: bool,
    touches: Vec<(u64, Vec2)>,
    two_finger: Option<TwoFinger>,
}

impl WindowGestures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the event was turned into a gesture.
    pub fn handle_event(&mut self, event: &WindowEvent, listener: &mut impl GestureListener) -> bool {
        match event {
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.mouse_button(*state == ElementState::Pressed, listener);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32), listener);
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                self.wheel(lines, listener);
                true
            }
            WindowEvent::TouchpadMagnify { delta, phase, .. } => {
                self.magnify(*delta as f32, *phase, listener);
                true
            }
            WindowEvent::TouchpadRotate { delta, phase, .. } => {
                self.touchpad_rotate(*delta, *phase, listener);
                true
            }
            WindowEvent::Touch(Touch {
                id, phase, location, ..
            }) => {
                self.touch(*id, *phase, Vec2::new(location.x as f32, location.y as f32), listener);
                true
            }
            _ => false,
        }
    }

    pub fn mouse_button(&mut self, pressed: bool, listener: &mut impl GestureListener) {
        if pressed == self.mouse_down {
            return;
        }
        self.mouse_down = pressed;
        if pressed {
            listener.pointer_down(self.cursor);
        } else {
            listener.pointer_up();
        }
    }

    pub fn cursor_moved(&mut self, position: Vec2, listener: &mut impl GestureListener) {
        self.cursor = position;
        if self.mouse_down {
            listener.pointer_move(position);
        }
    }

    /// Positive `lines` (wheel away from the user) zooms in.
    pub fn wheel(&mut self, lines: f32, listener: &mut impl GestureListener) {
        if lines != 0.0 && lines.is_finite() {
            listener.pinch(WHEEL_ZOOM_STEP.powf(lines), GesturePhase::Changed);
        }
    }

    /// `delta` is the magnification change since the previous event.
    pub fn magnify(&mut self, delta: f32, phase: TouchPhase, listener: &mut impl GestureListener) {
        let scale = match phase {
            TouchPhase::Moved => 1.0 + delta,
            _ => 1.0,
        };
        listener.pinch(scale, gesture_phase(phase));
    }

    /// `delta_deg` is counter-clockwise; listeners take clockwise radians.
    pub fn touchpad_rotate(&mut self, delta_deg: f32, phase: TouchPhase, listener: &mut impl GestureListener) {
        listener.rotate(-delta_deg.to_radians(), self.cursor, gesture_phase(phase));
    }

    pub fn touch(&mut self, id: u64, phase: TouchPhase, position: Vec2, listener: &mut impl GestureListener) {
        match phase {
            TouchPhase::Started => self.touch_started(id, position, listener),
            TouchPhase::Moved => self.touch_moved(id, position, listener),
            TouchPhase::Ended | TouchPhase::Cancelled => self.touch_ended(id, phase, listener),
        }
    }

    fn touch_started(&mut self, id: u64, position: Vec2, listener: &mut impl GestureListener) {
        // A third finger is ignored.
        if self.touches.len() >= 2 || self.touches.iter().any(|(t, _)| *t == id) {
            return;
        }
        self.touches.push((id, position));

        if let [(_, a), (_, b)] = self.touches[..] {
            listener.pointer_up();
            self.two_finger = Some(TwoFinger::measure(a, b));
            listener.pinch(1.0, GesturePhase::Began);
            listener.rotate(0.0, (a + b) * 0.5, GesturePhase::Began);
        } else {
            listener.pointer_down(position);
        }
    }

    fn touch_moved(&mut self, id: u64, position: Vec2, listener: &mut impl GestureListener) {
        let Some(slot) = self.touches.iter_mut().find(|(t, _)| *t == id) else {
            return;
        };
        slot.1 = position;

        match self.touches[..] {
            [(_, only)] => listener.pointer_move(only),
            [(_, a), (_, b)] => {
                let now = TwoFinger::measure(a, b);
                let centroid = (a + b) * 0.5;
                if let Some(prev) = self.two_finger {
                    if prev.span >= MIN_SPAN_PX && now.span >= MIN_SPAN_PX {
                        listener.pinch(now.span / prev.span, GesturePhase::Changed);
                    }
                    listener.rotate(wrap_angle(now.angle - prev.angle), centroid, GesturePhase::Changed);
                }
                self.two_finger = Some(now);
            }
            _ => {}
        }
    }

    fn touch_ended(&mut self, id: u64, phase: TouchPhase, listener: &mut impl GestureListener) {
        let Some(index) = self.touches.iter().position(|(t, _)| *t == id) else {
            return;
        };
        let was_two_finger = self.touches.len() == 2;
        let centroid = self.touches.iter().map(|(_, p)| *p).sum::<Vec2>() / self.touches.len() as f32;
        self.touches.remove(index);

        if was_two_finger {
            // No new pointer_down, so the remaining finger does not pan.
            self.two_finger = None;
            let phase = gesture_phase(phase);
            listener.pinch(1.0, phase);
            listener.rotate(0.0, centroid, phase);
        } else {
            listener.pointer_up();
        }
    }
}
