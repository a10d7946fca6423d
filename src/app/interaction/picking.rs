use glam::Vec3;

use super::super::camera::Ray;
use super::super::highlight::Target;
use super::super::scene::SceneGraph;

/// Link tolerance widens with ray distance so thin segments stay clickable when far away.
const LINK_TOLERANCE_PER_UNIT: f32 = 0.004;

pub(super) fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let offset = ray.origin - center;
    let half_b = offset.dot(ray.direction);
    let c = offset.length_squared() - radius * radius;
    let discriminant = half_b * half_b - c;
    if discriminant < 0.0 || !discriminant.is_finite() {
        return None;
    }

    let root = discriminant.sqrt();
    let near = -half_b - root;
    if near >= 0.0 {
        return Some(near);
    }
    let far = -half_b + root;
    (far >= 0.0).then_some(far)
}

/// Closest approach between a ray and a segment as `(ray distance, gap)`.
pub(super) fn ray_segment(ray: &Ray, start: Vec3, end: Vec3) -> (f32, f32) {
    let span = end - start;
    let span_sq = span.length_squared();
    if span_sq <= 1e-8 {
        let along = (start - ray.origin).dot(ray.direction).max(0.0);
        return (along, ray.at(along).distance(start));
    }

    let cross = ray.direction.dot(span);
    let denominator = span_sq - cross * cross;
    let offset = ray.origin - start;
    let mut segment_t = if denominator <= 1e-8 {
        0.0
    } else {
        ((span.dot(offset) - cross * ray.direction.dot(offset)) / denominator).clamp(0.0, 1.0)
    };

    let along = (start + span * segment_t - ray.origin)
        .dot(ray.direction)
        .max(0.0);
    segment_t = ((ray.at(along) - start).dot(span) / span_sq).clamp(0.0, 1.0);
    let closest = start + span * segment_t;
    (along, ray.at(along).distance(closest))
}

pub(super) fn pick_node(scene: &SceneGraph, ray: &Ray) -> Option<usize> {
    scene
        .nodes()
        .iter()
        .filter_map(|visual| {
            ray_sphere(ray, visual.pick.center, visual.pick.radius).map(|distance| (visual.node, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(node, _)| node)
}

pub(super) fn pick_link(scene: &SceneGraph, ray: &Ray) -> Option<usize> {
    scene
        .links()
        .iter()
        .filter_map(|visual| {
            let (along, gap) = ray_segment(ray, visual.pick.start, visual.pick.end);
            let tolerance = visual.pick.radius.max(along * LINK_TOLERANCE_PER_UNIT);
            (gap <= tolerance).then_some((visual.link, gap))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(link, _)| link)
}

/// Nodes take priority; links are only tested when no node is under the ray.
pub(super) fn pick(scene: &SceneGraph, ray: &Ray) -> Option<Target> {
    pick_node(scene, ray)
        .map(Target::Node)
        .or_else(|| pick_link(scene, ray).map(Target::Link))
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    fn ray_along_z() -> Ray {
        Ray {
            origin: vec3(0.0, 0.0, -10.0),
            direction: Vec3::Z,
        }
    }

    #[test]
    fn sphere_hit_reports_entry_distance() {
        let distance = ray_sphere(&ray_along_z(), Vec3::ZERO, 2.0).expect("hit");
        assert!((distance - 8.0).abs() < 1e-4);
        assert!(ray_sphere(&ray_along_z(), vec3(5.0, 0.0, 0.0), 2.0).is_none());
    }

    #[test]
    fn sphere_behind_ray_is_missed() {
        assert!(ray_sphere(&ray_along_z(), vec3(0.0, 0.0, -30.0), 2.0).is_none());
    }

    #[test]
    fn ray_from_inside_sphere_hits_exit_point() {
        let ray = Ray {
            origin: Vec3::ZERO,
            direction: Vec3::X,
        };
        let distance = ray_sphere(&ray, Vec3::ZERO, 3.0).expect("exit hit");
        assert!((distance - 3.0).abs() < 1e-4);
    }

    #[test]
    fn segment_gap_measures_perpendicular_distance() {
        let (_, gap) = ray_segment(&ray_along_z(), vec3(-5.0, 1.5, 0.0), vec3(5.0, 1.5, 0.0));
        assert!((gap - 1.5).abs() < 1e-4);
    }

    #[test]
    fn segment_gap_clamps_to_endpoints() {
        let (_, gap) = ray_segment(&ray_along_z(), vec3(3.0, 0.0, 0.0), vec3(9.0, 0.0, 0.0));
        assert!((gap - 3.0).abs() < 1e-4);
    }
}
