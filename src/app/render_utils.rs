use eframe::egui::{Color32, Painter, Pos2, Rect, pos2};

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

/// Multiplies the color channels; values above 1 brighten and saturate at white.
pub(super) fn scale_brightness(color: Color32, factor: f32) -> Color32 {
    let factor = factor.max(0.0);
    if factor <= 1.0 {
        return Color32::from_rgb(
            (color.r() as f32 * factor) as u8,
            (color.g() as f32 * factor) as u8,
            (color.b() as f32 * factor) as u8,
        );
    }

    let boosted = Color32::from_rgb(
        (color.r() as f32 * factor).min(255.0) as u8,
        (color.g() as f32 * factor).min(255.0) as u8,
        (color.b() as f32 * factor).min(255.0) as u8,
    );
    blend_color(boosted, Color32::WHITE, (factor - 1.0) * 0.25)
}

pub(super) fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    Color32::from_rgba_unmultiplied(
        color.r(),
        color.g(),
        color.b(),
        (opacity.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect) {
    const STAR_COUNT: usize = 140;

    painter.rect_filled(rect, 0.0, Color32::from_rgb(9, 11, 20));

    for index in 0..STAR_COUNT {
        let step = index as f32 + 1.0;
        let x = (step * 0.754_877_7).fract();
        let y = (step * 0.569_840_3).fract();
        let glow = (step * 0.381_966).fract();
        let brightness = (90.0 + glow * 110.0) as u8;
        painter.circle_filled(
            pos2(rect.left() + x * rect.width(), rect.top() + y * rect.height()),
            0.6 + glow * 0.9,
            Color32::from_rgba_unmultiplied(brightness, brightness, 255, 120),
        );
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}
