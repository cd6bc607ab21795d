//! Unit conversion and rough print-time estimation.

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Default infill used by [`estimate_print_minutes_default`].
pub const DEFAULT_INFILL_PERCENT: f64 = 15.0;

pub const DEFAULT_LAYER_HEIGHT_MM: f64 = 0.2;

const AVG_SPEED_MM_PER_SEC: f64 = 100.0;
const TRAVEL_OVERHEAD_FACTOR: f64 = 1.3;
const WARM_UP_SECS: f64 = 300.0;
const MIN_ESTIMATE_MINUTES: u32 = 10;

pub fn inches_to_mm(inches: f64) -> f64 {
    inches * MM_PER_INCH
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

/// Rough FDM print-time estimate in whole minutes.
///
/// Treats each layer as a square of the per-layer volume and traces its
/// perimeter at a fixed average speed, scaled up for infill and travel,
/// plus a fixed warm-up. Never returns less than 10 minutes.
pub fn estimate_print_minutes(
    volume_mm3: f64,
    height_mm: f64,
    infill_percent: f64,
    layer_height_mm: f64,
) -> u32 {
    let layers = if layer_height_mm > 0.0 {
        (height_mm / layer_height_mm).max(0.0)
    } else {
        0.0
    };
    let volume_per_layer = if layers > 0.0 {
        volume_mm3.abs() / layers
    } else {
        0.0
    };

    let perimeter_per_layer = volume_per_layer.sqrt() * 4.0;
    let infill_factor = 1.0 + infill_percent / 100.0;
    let secs_per_layer = perimeter_per_layer / AVG_SPEED_MM_PER_SEC * infill_factor;

    let total_secs = layers * secs_per_layer * TRAVEL_OVERHEAD_FACTOR + WARM_UP_SECS;
    let minutes = (total_secs / 60.0).floor();
    if !minutes.is_finite() {
        return MIN_ESTIMATE_MINUTES;
    }
    (minutes.min(u32::MAX as f64) as u32).max(MIN_ESTIMATE_MINUTES)
}

/// [`estimate_print_minutes`] at 15% infill and 0.2 mm layers.
pub fn estimate_print_minutes_default(volume_mm3: f64, height_mm: f64) -> u32 {
    estimate_print_minutes(
        volume_mm3,
        height_mm,
        DEFAULT_INFILL_PERCENT,
        DEFAULT_LAYER_HEIGHT_MM,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_inches_is_152_4_mm() {
        assert!((inches_to_mm(6.0) - 152.4).abs() < 1e-9);
        assert!((mm_to_inches(152.4) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn small_parts_hit_the_floor() {
        assert_eq!(estimate_print_minutes_default(1_000.0, 10.0), 10);
        assert_eq!(estimate_print_minutes_default(0.0, 0.0), 10);
    }

    #[test]
    fn estimate_matches_reference_cube() {
        // 100 mm cube: 500 layers of 2000 mm^3, perimeter ~178.9 mm per
        // layer, 2.057 s per layer with infill: 1028.6 s * 1.3 + 300 s.
        let minutes = estimate_print_minutes_default(1_000_000.0, 100.0);
        assert_eq!(minutes, 27);
    }

    #[test]
    fn estimate_grows_with_volume() {
        let small = estimate_print_minutes_default(50_000.0, 40.0);
        let large = estimate_print_minutes_default(2_000_000.0, 150.0);
        assert!(large > small);
    }
}
