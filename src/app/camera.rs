use std::f32::consts::FRAC_PI_2;

use eframe::egui::{Pos2, Rect, pos2};
use glam::{Mat4, Vec2, Vec3, vec2, vec3};

use crate::config::CameraConfig;

use super::scene::SceneError;

const ELEVATION_LIMIT: f32 = FRAC_PI_2 - 0.05;
const MIN_VIEWPORT_SIDE: f32 = 8.0;

/// Screen-space area the galaxy is drawn into.
#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct Viewport {
    rect: Rect,
}

impl Viewport {
    pub(in crate::app) fn new(rect: Rect) -> Result<Self, SceneError> {
        let finite = rect.min.x.is_finite()
            && rect.min.y.is_finite()
            && rect.max.x.is_finite()
            && rect.max.y.is_finite();
        if !finite || rect.width() < MIN_VIEWPORT_SIDE || rect.height() < MIN_VIEWPORT_SIDE {
            return Err(SceneError::ViewportUnavailable {
                width: rect.width(),
                height: rect.height(),
            });
        }
        Ok(Self { rect })
    }

    pub(in crate::app) fn rect(&self) -> Rect {
        self.rect
    }

    pub(in crate::app) fn aspect(&self) -> f32 {
        self.rect.width() / self.rect.height()
    }

    pub(in crate::app) fn to_ndc(&self, screen: Pos2) -> Vec2 {
        vec2(
            ((screen.x - self.rect.left()) / self.rect.width()) * 2.0 - 1.0,
            1.0 - ((screen.y - self.rect.top()) / self.rect.height()) * 2.0,
        )
    }

    pub(in crate::app) fn to_screen(&self, ndc: Vec2) -> Pos2 {
        pos2(
            self.rect.left() + (ndc.x + 1.0) * 0.5 * self.rect.width(),
            self.rect.top() + (1.0 - ndc.y) * 0.5 * self.rect.height(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub(in crate::app) fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    pub(in crate::app) fn intersect_plane(&self, point: Vec3, normal: Vec3) -> Option<Vec3> {
        let denominator = self.direction.dot(normal);
        if denominator.abs() <= 1e-6 {
            return None;
        }
        let distance = (point - self.origin).dot(normal) / denominator;
        (distance >= 0.0 && distance.is_finite()).then(|| self.at(distance))
    }
}

#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct Projection {
    pub screen: Pos2,
    pub view_depth: f32,
    pub pixels_per_unit: f32,
}

/// Camera orbiting a target point; elevation is bounded to avoid flipping over the pole.
#[derive(Clone, Debug)]
pub(in crate::app) struct OrbitCamera {
    target: Vec3,
    azimuth: f32,
    elevation: f32,
    distance: f32,
    config: CameraConfig,
}

impl OrbitCamera {
    pub(in crate::app) fn new(config: CameraConfig) -> Self {
        let min_distance = config.min_distance.max(1.0);
        let max_distance = config.max_distance.max(min_distance);
        let config = CameraConfig {
            min_distance,
            max_distance,
            fov_degrees: config.fov_degrees.clamp(10.0, 120.0),
            ..config
        };

        Self {
            target: Vec3::ZERO,
            azimuth: 0.6,
            elevation: 0.35,
            distance: config.initial_distance.clamp(min_distance, max_distance),
            config,
        }
    }

    pub(in crate::app) fn distance(&self) -> f32 {
        self.distance
    }

    pub(in crate::app) fn elevation(&self) -> f32 {
        self.elevation
    }

    pub(in crate::app) fn eye(&self) -> Vec3 {
        let horizontal = self.elevation.cos();
        self.target
            + vec3(
                horizontal * self.azimuth.sin(),
                self.elevation.sin(),
                horizontal * self.azimuth.cos(),
            ) * self.distance
    }

    pub(in crate::app) fn forward(&self) -> Vec3 {
        (self.target - self.eye()).normalize_or_zero()
    }

    fn fov(&self) -> f32 {
        self.config.fov_degrees.to_radians()
    }

    fn near_far(&self) -> (f32, f32) {
        let near = (self.distance * 0.01).max(0.5);
        (near, self.distance * 4.0 + 20_000.0)
    }

    pub(in crate::app) fn view_projection(&self, aspect: f32) -> Mat4 {
        let (near, far) = self.near_far();
        let projection = Mat4::perspective_rh(self.fov(), aspect, near, far);
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        projection * view
    }

    pub(in crate::app) fn orbit(&mut self, delta: Vec2) {
        let sensitivity = self.config.orbit_sensitivity;
        self.azimuth = (self.azimuth - delta.x * sensitivity).rem_euclid(std::f32::consts::TAU);
        self.elevation = (self.elevation + delta.y * sensitivity).clamp(-ELEVATION_LIMIT, ELEVATION_LIMIT);
    }

    pub(in crate::app) fn zoom(&mut self, scroll: f32) {
        if !scroll.is_finite() {
            return;
        }
        let factor = (-scroll * self.config.zoom_sensitivity).exp();
        self.distance = (self.distance * factor).clamp(self.config.min_distance, self.config.max_distance);
    }

    /// Re-centers on the centroid of `positions` and backs off until they fit.
    pub(in crate::app) fn frame(&mut self, positions: &[Vec3]) {
        let finite = positions.iter().filter(|position| position.is_finite());
        let (sum, count) = finite.clone().fold((Vec3::ZERO, 0usize), |(sum, count), position| {
            (sum + *position, count + 1)
        });
        if count == 0 {
            return;
        }

        let centroid = sum / count as f32;
        let radius = finite
            .map(|position| position.distance(centroid))
            .fold(0.0_f32, f32::max)
            .max(40.0);
        self.target = centroid;
        let fit = radius / (self.fov() * 0.5).tan() * 1.15;
        self.distance = fit.clamp(self.config.min_distance, self.config.max_distance);
    }

    pub(in crate::app) fn ray_from_ndc(&self, ndc: Vec2, aspect: f32) -> Option<Ray> {
        let inverse = self.view_projection(aspect).inverse();
        let near = inverse.project_point3(vec3(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(vec3(ndc.x, ndc.y, 1.0));
        let direction = (far - near).normalize_or_zero();
        if !near.is_finite() || direction == Vec3::ZERO {
            return None;
        }
        Some(Ray {
            origin: near,
            direction,
        })
    }

    pub(in crate::app) fn project(&self, world: Vec3, viewport: &Viewport) -> Option<Projection> {
        let clip = self.view_projection(viewport.aspect()) * world.extend(1.0);
        if clip.w <= 1e-5 || !clip.is_finite() {
            return None;
        }

        let ndc = clip.truncate() / clip.w;
        let view_depth = (world - self.eye()).dot(self.forward());
        if view_depth <= 0.0 {
            return None;
        }

        let half_height = viewport.rect().height() * 0.5;
        let pixels_per_unit = half_height / ((self.fov() * 0.5).tan() * view_depth);
        Some(Projection {
            screen: viewport.to_screen(vec2(ndc.x, ndc.y)),
            view_depth,
            pixels_per_unit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 600.0))).expect("viewport")
    }

    #[test]
    fn degenerate_viewport_is_reported() {
        let error = Viewport::new(Rect::from_min_max(pos2(0.0, 0.0), pos2(0.0, 300.0)))
            .expect_err("zero width");
        assert!(matches!(error, SceneError::ViewportUnavailable { .. }));
    }

    #[test]
    fn ndc_round_trips_through_screen_space() {
        let viewport = viewport();
        let screen = pos2(200.0, 450.0);
        let back = viewport.to_screen(viewport.to_ndc(screen));
        assert!((back.x - screen.x).abs() < 1e-3 && (back.y - screen.y).abs() < 1e-3);
        assert_eq!(viewport.to_ndc(pos2(400.0, 300.0)), Vec2::ZERO);
    }

    #[test]
    fn center_ray_points_at_the_target() {
        let camera = OrbitCamera::new(CameraConfig::default());
        let ray = camera.ray_from_ndc(Vec2::ZERO, viewport().aspect()).expect("ray");
        assert!(ray.direction.dot(camera.forward()) > 0.999);
    }

    #[test]
    fn projected_point_unprojects_onto_the_same_ray() {
        let camera = OrbitCamera::new(CameraConfig::default());
        let viewport = viewport();
        let world = vec3(60.0, -25.0, 40.0);
        let projection = camera.project(world, &viewport).expect("in front of camera");
        let ray = camera
            .ray_from_ndc(viewport.to_ndc(projection.screen), viewport.aspect())
            .expect("ray");
        let closest = ray.at((world - ray.origin).dot(ray.direction));
        assert!(closest.distance(world) < 0.5);
    }

    #[test]
    fn elevation_and_zoom_are_clamped() {
        let mut camera = OrbitCamera::new(CameraConfig::default());
        camera.orbit(vec2(0.0, 1.0e6));
        assert!(camera.elevation() <= ELEVATION_LIMIT);
        camera.zoom(1.0e6);
        assert_eq!(camera.distance(), CameraConfig::default().min_distance);
        camera.zoom(-1.0e6);
        assert_eq!(camera.distance(), CameraConfig::default().max_distance);
    }

    #[test]
    fn points_behind_the_camera_do_not_project() {
        let camera = OrbitCamera::new(CameraConfig::default());
        let behind = camera.eye() - camera.forward() * 50.0;
        assert!(camera.project(behind, &viewport()).is_none());
    }

    #[test]
    fn plane_intersection_respects_ray_direction() {
        let ray = Ray {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
        };
        assert_eq!(ray.intersect_plane(vec3(0.0, 0.0, 5.0), Vec3::Z), Some(vec3(0.0, 0.0, 5.0)));
        assert_eq!(ray.intersect_plane(vec3(0.0, 0.0, -5.0), Vec3::Z), None);
        assert_eq!(ray.intersect_plane(Vec3::ZERO, Vec3::X), None);
    }
}
