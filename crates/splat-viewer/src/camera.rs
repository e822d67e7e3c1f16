use glam::{Mat4, UVec2, Vec2, Vec3};
use std::f32::consts::PI;

pub const MIN_FOV_DEG: f32 = 15.0;
pub const MAX_FOV_DEG: f32 = 90.0;
pub const DEFAULT_FOV_DEG: f32 = 50.0;
pub const NEAR_Z: f32 = 0.1;
pub const FAR_Z: f32 = 100.0;
/// Distance from the eye to the model origin along the view axis.
pub const MODEL_CENTER_Z: f32 = -8.0;
/// Degrees of rotation per pixel of drag.
pub const DEFAULT_SENSITIVITY: f32 = 0.5;

/// How a two-finger twist picks the accumulator it feeds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TwistMode {
    /// Horizontal-dominant drag feeds `y_rotation`, otherwise `x_rotation`.
    #[default]
    DragDominant,
    /// Always turn about the view's up axis (`x_rotation`).
    UpAxis,
}

/// Pixel-space viewport with a 0..1 depth range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// Everything a model needs to draw one view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportDescriptor {
    pub viewport: Viewport,
    pub projection: Mat4,
    pub view: Mat4,
    pub screen_size: UVec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewProjection {
    pub view: Mat4,
    pub projection: Mat4,
}

/// Orbit-style camera state driven by gestures.
///
/// `x_rotation` is fed by horizontal drags and turns the model about +Y;
/// `y_rotation` is fed by vertical drags and turns it about -X. Both are
/// radians and unbounded.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraState {
    pub x_rotation: f32,
    pub y_rotation: f32,
    fov_deg: f32,
    pub model_center_z: f32,
    pub sensitivity: f32,
    pub twist_mode: TwistMode,
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(DEFAULT_FOV_DEG)
    }
}

impl CameraState {
    pub fn new(fov_deg: f32) -> Self {
        Self {
            x_rotation: 0.0,
            y_rotation: 0.0,
            fov_deg: clamp_fov(fov_deg),
            model_center_z: MODEL_CENTER_Z,
            sensitivity: DEFAULT_SENSITIVITY,
            twist_mode: TwistMode::default(),
        }
    }

    #[inline]
    pub fn fov_deg(&self) -> f32 {
        self.fov_deg
    }

    /// Dragging right turns the view right; dragging down tilts it up.
    pub fn apply_pan(&mut self, delta: Vec2) {
        self.x_rotation += (delta.x * self.sensitivity).to_radians();
        self.y_rotation -= (delta.y * self.sensitivity).to_radians();
    }

    /// `scale > 1` (fingers apart) narrows the field of view.
    pub fn apply_pinch(&mut self, scale: f32) {
        if !scale.is_finite() || scale <= 0.0 {
            return;
        }
        self.fov_deg = clamp_fov(self.fov_deg / scale);
    }

    /// `drag` is the pointer displacement since the previous twist sample.
    pub fn apply_two_finger_rotation(&mut self, delta_rad: f32, drag: Vec2) {
        match self.twist_mode {
            TwistMode::DragDominant if drag.x.abs() > drag.y.abs() => {
                self.y_rotation += delta_rad;
            }
            TwistMode::DragDominant | TwistMode::UpAxis => {
                self.x_rotation += delta_rad;
            }
        }
    }

    pub fn view_projection(&self, aspect_ratio: f32) -> ViewProjection {
        let aspect = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            aspect_ratio
        } else {
            1.0
        };

        let projection = Mat4::perspective_rh(self.fov_deg.to_radians(), aspect, NEAR_Z, FAR_Z);

        let rotation = Mat4::from_axis_angle(Vec3::Y, self.x_rotation)
            * Mat4::from_axis_angle(Vec3::NEG_X, self.y_rotation);
        let translation = Mat4::from_translation(Vec3::new(0.0, 0.0, self.model_center_z));
        // Source files are stored with the opposite up direction to the
        // render target's.
        let up_correction = Mat4::from_rotation_z(PI);

        ViewProjection {
            view: translation * rotation * up_correction,
            projection,
        }
    }

    /// Full-target descriptor for a drawable of `size` pixels.
    pub fn viewport(&self, size: UVec2) -> ViewportDescriptor {
        let size = size.max(UVec2::ONE);
        let vp = self.view_projection(size.x as f32 / size.y as f32);

        ViewportDescriptor {
            viewport: Viewport {
                x: 0.0,
                y: 0.0,
                width: size.x as f32,
                height: size.y as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            },
            projection: vp.projection,
            view: vp.view,
            screen_size: size,
        }
    }
}

#[inline]
fn clamp_fov(deg: f32) -> f32 {
    if deg.is_nan() {
        return DEFAULT_FOV_DEG;
    }
    deg.clamp(MIN_FOV_DEG, MAX_FOV_DEG)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn square_aspect_gives_symmetric_projection() {
        let camera = CameraState::new(50.0);
        let vp = camera.view_projection(1.0);

        assert!((vp.projection.x_axis.x - vp.projection.y_axis.y).abs() < EPS);
        let f = 1.0 / (25.0f32.to_radians()).tan();
        assert!((vp.projection.y_axis.y - f).abs() < EPS);
    }

    #[test]
    fn wide_aspect_shrinks_horizontal_scale() {
        let vp = CameraState::default().view_projection(2.0);
        assert!((vp.projection.x_axis.x * 2.0 - vp.projection.y_axis.y).abs() < EPS);
    }

    #[test]
    fn degenerate_aspect_falls_back_to_square() {
        let camera = CameraState::default();
        assert_eq!(camera.view_projection(0.0), camera.view_projection(1.0));
        assert_eq!(camera.view_projection(f32::NAN), camera.view_projection(1.0));
    }

    #[test]
    fn rest_view_flips_up_and_pushes_model_back() {
        let vp = CameraState::default().view_projection(1.0);

        let origin = vp.view.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 0.0, MODEL_CENTER_Z)).length() < EPS);

        // The 180 degree correction about Z maps model +Y to view -Y.
        let up = vp.view.transform_vector3(Vec3::Y);
        assert!((up - Vec3::NEG_Y).length() < EPS);
    }

    #[test]
    fn rest_view_puts_origin_inside_the_depth_range() {
        let vp = CameraState::default().view_projection(1.0);
        let clip = vp.projection * vp.view * Vec3::ZERO.extend(1.0);
        let ndc_z = clip.z / clip.w;
        assert!(clip.w > 0.0);
        assert!((0.0..=1.0).contains(&ndc_z));
    }

    #[test]
    fn pan_follows_sign_convention() {
        let mut camera = CameraState::default();
        camera.apply_pan(Vec2::new(10.0, 0.0));
        assert!((camera.x_rotation - 5.0f32.to_radians()).abs() < EPS);
        assert_eq!(camera.y_rotation, 0.0);

        camera.apply_pan(Vec2::new(0.0, 10.0));
        assert!((camera.y_rotation + 5.0f32.to_radians()).abs() < EPS);
    }

    #[test]
    fn pinch_out_zooms_in() {
        let mut camera = CameraState::new(60.0);
        camera.apply_pinch(1.5);
        assert!((camera.fov_deg() - 40.0).abs() < 1e-4);
        camera.apply_pinch(0.8);
        assert!((camera.fov_deg() - 50.0).abs() < 1e-4);
    }

    #[test]
    fn pinch_is_clamped() {
        let mut camera = CameraState::default();
        for _ in 0..20 {
            camera.apply_pinch(2.0);
            assert!(camera.fov_deg() >= MIN_FOV_DEG);
        }
        assert_eq!(camera.fov_deg(), MIN_FOV_DEG);

        for _ in 0..20 {
            camera.apply_pinch(0.5);
            assert!(camera.fov_deg() <= MAX_FOV_DEG);
        }
        assert_eq!(camera.fov_deg(), MAX_FOV_DEG);
    }

    #[test]
    fn pinch_ignores_degenerate_scales() {
        let mut camera = CameraState::default();
        for s in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            camera.apply_pinch(s);
        }
        assert_eq!(camera.fov_deg(), DEFAULT_FOV_DEG);
    }

    #[test]
    fn initial_fov_is_clamped() {
        assert_eq!(CameraState::new(5.0).fov_deg(), MIN_FOV_DEG);
        assert_eq!(CameraState::new(120.0).fov_deg(), MAX_FOV_DEG);
    }

    // The same twist lands on a different axis depending on how the fingers
    // happened to drift.
    #[test]
    fn twist_axis_depends_on_drag_direction() {
        let mut camera = CameraState::default();
        camera.apply_two_finger_rotation(0.25, Vec2::new(8.0, 2.0));
        assert_eq!(camera.y_rotation, 0.25);
        assert_eq!(camera.x_rotation, 0.0);

        camera.apply_two_finger_rotation(0.5, Vec2::new(1.0, -3.0));
        assert_eq!(camera.x_rotation, 0.5);

        // Ties go to the vertical branch.
        camera.apply_two_finger_rotation(0.5, Vec2::new(2.0, 2.0));
        assert_eq!(camera.x_rotation, 1.0);
        assert_eq!(camera.y_rotation, 0.25);
    }

    #[test]
    fn up_axis_twist_ignores_drag() {
        let mut camera = CameraState {
            twist_mode: TwistMode::UpAxis,
            ..CameraState::default()
        };
        camera.apply_two_finger_rotation(0.3, Vec2::new(100.0, 0.0));
        assert_eq!(camera.x_rotation, 0.3);
        assert_eq!(camera.y_rotation, 0.0);
    }

    #[test]
    fn viewport_covers_drawable() {
        let desc = CameraState::default().viewport(UVec2::new(800, 600));
        assert_eq!(desc.viewport.width, 800.0);
        assert_eq!(desc.viewport.height, 600.0);
        assert_eq!(desc.screen_size, UVec2::new(800, 600));
        assert_eq!(desc.projection, CameraState::default().view_projection(800.0 / 600.0).projection);
    }
}
