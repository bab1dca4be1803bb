use proptest::prelude::*;
use sound_painter_core::{
    channel::{decode_samples, encode_samples},
    render::geometry::ribbon_points,
    sampler::dominant_index,
    PaintSize, Sentinel,
};

fn sentinel() -> impl Strategy<Value = Sentinel> {
    prop_oneof![Just(Sentinel::Zero), Just(Sentinel::NegativeOne)]
}

fn sample_or_gap() -> impl Strategy<Value = f32> {
    prop_oneof![
        4 => -1.0f32..=1.0,
        1 => Just(f32::INFINITY),
        1 => Just(f32::NEG_INFINITY),
        1 => Just(f32::NAN),
    ]
}

proptest! {
    #[test]
    fn ribbon_x_strictly_increases(
        values in prop::collection::vec(-1.0f32..=1.0, 2..512),
        width in 1.0f32..4000.0,
        height in 1.0f32..2000.0,
    ) {
        let points = ribbon_points(&values, PaintSize { width, height });
        prop_assert_eq!(points.len(), values.len());
        for pair in points.windows(2) {
            prop_assert!(pair[0].x < pair[1].x);
        }
    }

    #[test]
    fn codec_keeps_finite_values_and_collapses_the_rest(
        values in prop::collection::vec(sample_or_gap(), 1..256),
        sentinel in sentinel(),
    ) {
        let decoded = decode_samples(&encode_samples(&values), sentinel);
        prop_assert_eq!(decoded.len(), values.len());
        for (original, restored) in values.iter().zip(&decoded) {
            if original.is_finite() {
                prop_assert_eq!(original, restored);
            } else {
                prop_assert_eq!(*restored, sentinel.value());
            }
        }
    }

    #[test]
    fn dominant_index_ignores_positive_scaling(
        magnitudes in prop::collection::vec(-120.0f32..0.0, 1..128),
        exponent in -6i32..=6,
    ) {
        // Powers of two scale exactly, so the ordering of bins is preserved.
        let scale = 2.0f32.powi(exponent);
        let scaled: Vec<f32> = magnitudes.iter().map(|m| m * scale).collect();
        prop_assert_eq!(dominant_index(&scaled), dominant_index(&magnitudes));
    }
}
