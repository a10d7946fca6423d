use eframe::egui::{Align2, Color32, FontId, Painter, Stroke, vec2};

use crate::payload::GraphData;
use crate::util::short_label;

use super::super::camera::{OrbitCamera, Viewport};
use super::super::render_utils::{circle_visible, with_opacity};
use super::{SceneError, SceneGraph};

const MIN_SCREEN_RADIUS: f32 = 1.5;
const MAX_SCREEN_RADIUS: f32 = 64.0;
const LABEL_CHARS: usize = 28;

/// Draws links then nodes far to near; returns how many nodes were visible.
pub(in crate::app) fn paint_scene(
    painter: &Painter,
    viewport: &Viewport,
    camera: &OrbitCamera,
    scene: &mut SceneGraph,
    data: &GraphData,
    label_all: bool,
) -> Result<usize, SceneError> {
    if !camera.view_projection(viewport.aspect()).is_finite() {
        return Err(SceneError::DegenerateProjection);
    }

    let SceneGraph {
        nodes,
        links,
        ambient,
        emphasized,
        scratch,
        ..
    } = scene;

    scratch.projections.clear();
    scratch
        .projections
        .extend(nodes.iter().map(|visual| camera.project(visual.pick.center, viewport)));
    let projections = &scratch.projections;

    let draw_link = |slot: usize| {
        let Some(visual) = links.get(slot) else {
            return;
        };
        let (Some(Some(start)), Some(Some(end))) =
            (projections.get(visual.source), projections.get(visual.target))
        else {
            return;
        };
        let color = with_opacity(visual.style.color, visual.style.opacity);
        if visual.glow {
            painter.line_segment(
                [start.screen, end.screen],
                Stroke::new(visual.style.width * 3.0, with_opacity(visual.style.color, 0.18)),
            );
        }
        painter.line_segment([start.screen, end.screen], Stroke::new(visual.style.width, color));
    };
    for &slot in ambient.iter() {
        draw_link(slot);
    }
    for &slot in emphasized.iter() {
        draw_link(slot);
    }

    scratch.draw_order.clear();
    scratch
        .draw_order
        .extend((0..nodes.len()).filter(|slot| projections[*slot].is_some()));
    scratch.draw_order.sort_by(|a, b| {
        let depth = |slot: usize| projections[slot].map_or(0.0, |projection| projection.view_depth);
        depth(*b).total_cmp(&depth(*a))
    });

    let rect = viewport.rect();
    let mut drawn = 0;
    for &slot in &scratch.draw_order {
        let (Some(visual), Some(projection)) = (nodes.get(slot), projections[slot]) else {
            continue;
        };
        let radius = (visual.pick.radius * projection.pixels_per_unit)
            .clamp(MIN_SCREEN_RADIUS, MAX_SCREEN_RADIUS);
        let outline = (visual.outline.radius * projection.pixels_per_unit)
            .clamp(radius + 0.5, MAX_SCREEN_RADIUS + 4.0);
        if !circle_visible(rect, projection.screen, outline) {
            continue;
        }

        painter.circle_stroke(
            projection.screen,
            outline,
            Stroke::new(1.2, with_opacity(visual.outline.color, 0.55)),
        );
        painter.circle_filled(projection.screen, radius, visual.style.color);
        drawn += 1;

        if (label_all || visual.style.tier.shows_label())
            && let Some(node) = data.nodes.get(visual.node)
        {
            painter.text(
                projection.screen + vec2(outline + 4.0, 0.0),
                Align2::LEFT_CENTER,
                short_label(&node.label, LABEL_CHARS),
                FontId::proportional(12.0),
                Color32::from_rgb(226, 230, 240),
            );
        }
    }

    Ok(drawn)
}
