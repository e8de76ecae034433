use nalgebra as na;
use na::{matrix, vector, Matrix4, Vector3};

/// Pitch is kept this far away (in radians) from +-90 degrees, where the
/// view basis would collapse onto the world up axis.
const PITCH_MARGIN: f32 = 0.01;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - PITCH_MARGIN;

/// Free-look camera owning placement (position, yaw, pitch) and projection
/// parameters (field of view, aspect ratio, near and far planes).
/// View and projection matrices are pure functions of the current state and
/// are recomputed on every call, so they can never go stale.
pub struct Camera {
    position: Vector3<f32>,
    theta: f32, // Yaw in radians.
    phi: f32,   // Pitch in radians, clamped away from the poles.
    width: f32,
    height: f32,
    aspect_ratio: f32,
    angle_of_view: f32, // Vertical field of view in radians.
    z_near: f32,
    z_far: f32,
}

impl Camera {
    pub fn new() -> Camera {
        return Camera {
            position: vector![0.0, 0.0, 0.0],
            theta: 0.0,
            phi: 0.0,
            width: 1920.0,
            height: 1080.0,
            aspect_ratio: 1920.0 / 1080.0,
            angle_of_view: 1.04719, // 60 degrees.
            z_near: 0.001,
            z_far: 100.0,
        };
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    /// Sets yaw from degrees.
    pub fn set_theta(&mut self, degrees: f32) {
        self.theta = degrees.to_radians();
    }

    /// Sets pitch from degrees, clamped away from +-90 degrees.
    pub fn set_phi(&mut self, degrees: f32) {
        self.phi = degrees.to_radians().clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width;
        self.aspect_ratio = self.width / self.height;
    }

    pub fn set_height(&mut self, height: f32) {
        self.height = height;
        self.aspect_ratio = self.width / self.height;
    }

    /// Sets the vertical field of view from degrees.
    pub fn set_angle_of_view(&mut self, degrees: f32) {
        self.angle_of_view = degrees.to_radians();
    }

    pub fn set_z_near(&mut self, z_near: f32) {
        self.z_near = z_near;
    }

    pub fn set_z_far(&mut self, z_far: f32) {
        self.z_far = z_far;
    }

    pub fn get_position(&self) -> Vector3<f32> {
        return self.position;
    }

    /// Yaw in radians.
    pub fn get_theta(&self) -> f32 {
        return self.theta;
    }

    /// Pitch in radians.
    pub fn get_phi(&self) -> f32 {
        return self.phi;
    }

    /// Unit view direction; at zero yaw and pitch the camera looks down -Z.
    pub fn get_direction(&self) -> Vector3<f32> {
        return vector![
            self.theta.sin() * self.phi.cos(),
            self.phi.sin(),
            -self.theta.cos() * self.phi.cos()
        ];
    }

    pub fn get_right(&self) -> Vector3<f32> {
        return vector![0.0, 1.0, 0.0].cross(&self.get_direction()).normalize();
    }

    pub fn get_up(&self) -> Vector3<f32> {
        return self.get_direction().cross(&self.get_right());
    }

    /// Look-at style right-handed view matrix built from the camera basis.
    /// The camera position maps to the origin and the view direction to -Z,
    /// matching the projection below.
    pub fn get_view_matrix(&self) -> Matrix4<f32> {
        let direction = self.get_direction();
        let right = self.get_right();
        let up = self.get_up();
        return matrix![
            right.x, right.y, right.z, -right.dot(&self.position);
            up.x, up.y, up.z, -up.dot(&self.position);
            -direction.x, -direction.y, -direction.z, direction.dot(&self.position);
            0.0, 0.0, 0.0, 1.0
        ];
    }

    /// Right-handed perspective projection mapping view-space depth onto
    /// [-1, 1] after the w-divide: -z_near to -1 and -z_far to +1.
    /// Inverted planes (z_near >= z_far) are a caller error.
    pub fn get_projection_matrix(&self) -> Matrix4<f32> {
        debug_assert!(self.z_near < self.z_far);
        let f = 1.0 / (self.angle_of_view * 0.5).tan();
        let depth_scale = (self.z_far + self.z_near) / (self.z_near - self.z_far);
        let depth_offset = 2.0 * self.z_far * self.z_near / (self.z_near - self.z_far);
        return matrix![
            f / self.aspect_ratio, 0.0, 0.0, 0.0;
            0.0, f, 0.0, 0.0;
            0.0, 0.0, depth_scale, depth_offset;
            0.0, 0.0, -1.0, 0.0
        ];
    }
}

impl Default for Camera {
    fn default() -> Self {
        return Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn direction_is_unit_length_across_the_pitch_range() {
        let mut camera = Camera::new();
        for theta in (-180..=180).step_by(45) {
            for phi in (-85..=85).step_by(17) {
                camera.set_theta(theta as f32);
                camera.set_phi(phi as f32);
                let direction = camera.get_direction();
                assert!((direction.norm() - 1.0).abs() < EPSILON);
            }
        }
    }

    #[test]
    fn right_is_orthogonal_to_direction() {
        let mut camera = Camera::new();
        for theta in (-180..=180).step_by(30) {
            for phi in (-85..=85).step_by(17) {
                camera.set_theta(theta as f32);
                camera.set_phi(phi as f32);
                let dot = camera.get_right().dot(&camera.get_direction());
                assert!(dot.abs() < EPSILON);
            }
        }
    }

    #[test]
    fn pitch_is_clamped_away_from_the_poles() {
        let mut camera = Camera::new();
        camera.set_phi(90.0);
        assert!(camera.get_phi() < std::f32::consts::FRAC_PI_2);
        assert!(camera.get_right().norm().is_finite());
        camera.set_phi(-120.0);
        assert!(camera.get_phi() > -std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn view_matrix_maps_camera_position_to_the_origin() {
        let mut camera = Camera::new();
        camera.set_position(vector![3.0, -2.0, 7.0]);
        camera.set_theta(40.0);
        camera.set_phi(-25.0);
        let transformed = camera.get_view_matrix() * camera.get_position().push(1.0);
        assert!(transformed.x.abs() < EPSILON);
        assert!(transformed.y.abs() < EPSILON);
        assert!(transformed.z.abs() < EPSILON);
        assert!((transformed.w - 1.0).abs() < EPSILON);
    }

    #[test]
    fn projection_maps_near_and_far_planes_to_ndc_extremes() {
        let mut camera = Camera::new();
        camera.set_z_near(0.5);
        camera.set_z_far(50.0);
        let projection = camera.get_projection_matrix();

        let near = projection * vector![0.0, 0.0, -0.5, 1.0];
        assert!((near.z / near.w + 1.0).abs() < EPSILON);

        let far = projection * vector![0.0, 0.0, -50.0, 1.0];
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn aspect_ratio_follows_width_and_height() {
        let mut camera = Camera::new();
        camera.set_width(200.0);
        camera.set_height(100.0);
        let projection = camera.get_projection_matrix();
        // m11 / m00 recovers the aspect ratio.
        assert!((projection[(1, 1)] / projection[(0, 0)] - 2.0).abs() < EPSILON);
    }
}
