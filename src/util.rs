use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::{Vec3, vec3};

fn unit_from_bits(bits: u64) -> f32 {
    let value = ((bits & 0x1f_ffff) as f64 / 0x1f_ffff as f64) as f32;
    (value * 2.0) - 1.0
}

/// Deterministic point in `[-1, 1]^3` derived from an id, used to seed layouts.
pub fn stable_triple(id: &str) -> Vec3 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    vec3(
        unit_from_bits(hash),
        unit_from_bits(hash >> 21),
        unit_from_bits(hash >> 42),
    )
}

pub fn short_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_owned();
    }

    let mut short = label
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_triple_is_deterministic_and_bounded() {
        let first = stable_triple("Jorge Luis Borges");
        let second = stable_triple("Jorge Luis Borges");
        assert_eq!(first, second);
        for value in first.to_array() {
            assert!((-1.0..=1.0).contains(&value));
        }
        assert_ne!(stable_triple("Ficciones"), stable_triple("El Aleph"));
    }

    #[test]
    fn short_label_truncates_on_char_boundaries() {
        assert_eq!(short_label("Aleph", 10), "Aleph");
        assert_eq!(short_label("Tlön, Uqbar, Orbis Tertius", 6), "Tlön,…");
    }
}
