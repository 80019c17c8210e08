use proptest::prelude::*;
use vitals_relay::decoder::{decode_str, normalize_timestamp};
use vitals_relay::{AxisMode, SeriesBuffer};

proptest! {
    #[test]
    fn test_timestamp_units_normalize_to_seconds(secs in 1_000_000_000i64..2_000_000_000i64) {
        let expected = secs as f64;
        for scaled in [expected, expected * 1e3, expected * 1e6, expected * 1e9] {
            let normalized = normalize_timestamp(scaled);
            prop_assert!((normalized - expected).abs() < 1e-3, "{} -> {}", scaled, normalized);
        }
    }

    #[test]
    fn test_json_value_round_trips(
        secs in 1_000_000_000u64..2_000_000_000u64,
        value in -1.0e6f64..1.0e6f64,
    ) {
        let payload = serde_json::json!({"timestamp": secs, "value": value}).to_string();
        let sample = decode_str(&payload).unwrap();

        prop_assert_eq!(sample.timestamp(), Some(secs as f64));
        let decoded = sample.get("value").and_then(|v| v.as_float()).unwrap();
        prop_assert!((decoded - value).abs() <= value.abs() * 1e-12);
    }

    #[test]
    fn test_buffer_never_exceeds_capacity(
        capacity in 1usize..32,
        values in prop::collection::vec(-500.0f64..500.0, 0..100),
    ) {
        let mut buffer = SeriesBuffer::new(capacity).unwrap();
        for (i, value) in values.iter().enumerate() {
            let sample = decode_str(&format!("timestamp={};value={}", 1_700_000_000 + i, value)).unwrap();
            buffer.append(&sample);
            prop_assert!(buffer.series("value").map_or(0, |s| s.len()) <= capacity);
        }

        let kept: Vec<f64> = buffer
            .series("value")
            .unwrap_or_default()
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        let start = values.len().saturating_sub(capacity);
        prop_assert_eq!(kept, values[start..].to_vec());
    }

    #[test]
    fn test_shared_axis_series_stay_aligned(
        fields in prop::collection::vec(prop::sample::select(vec!["hr", "sys", "dia"]), 1..60),
    ) {
        let mut buffer = SeriesBuffer::with_options(10, AxisMode::Shared, ["type"]).unwrap();
        for (i, field) in fields.iter().enumerate() {
            let sample = decode_str(&format!("timestamp={};{}=1", 1_700_000_000 + i, field)).unwrap();
            buffer.append(&sample);
        }

        let snapshot = buffer.snapshot();
        let lengths: Vec<usize> = snapshot.iter().map(|(_, points)| points.len()).collect();
        prop_assert!(lengths.windows(2).all(|w| w[0] == w[1]));
        prop_assert!(lengths.iter().all(|&len| len <= 10));
    }
}
