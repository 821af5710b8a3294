use crate::audio::compute_levels;

/// WHAT: Level metering reports RMS and peak of a frame batch
/// WHY: Presentation layers animate from these numbers
#[test]
fn given_known_signal_when_computing_levels_then_rms_and_peak_correct() {
    // Given: A constant half-scale signal
    let samples = vec![0.5f32; 480];

    // When: Computing levels
    let reading = compute_levels(&samples);

    // Then: RMS and peak both equal the amplitude
    assert!((reading.rms - 0.5).abs() < 1e-6);
    assert!((reading.peak - 0.5).abs() < 1e-6);
}

/// WHAT: Levels clamp to [0, 1] for out-of-range samples
/// WHY: A misbehaving driver must not break level consumers
#[test]
fn given_clipped_signal_when_computing_levels_then_clamped() {
    // Given: Samples beyond full scale
    let samples = vec![2.0f32, -3.0, 2.5];

    // When: Computing levels
    let reading = compute_levels(&samples);

    // Then: Both readings are clamped
    assert!((reading.rms - 1.0).abs() < f32::EPSILON);
    assert!((reading.peak - 1.0).abs() < f32::EPSILON);
}

/// WHAT: An empty batch reads as silence
/// WHY: Avoids NaN from a zero-length RMS division
#[test]
fn given_empty_batch_when_computing_levels_then_zero() {
    // Given/When: Levels over no samples
    let reading = compute_levels(&[]);

    // Then: Silence, not NaN
    assert_eq!(reading.rms, 0.0);
    assert_eq!(reading.peak, 0.0);
}

/// WHAT: Peak picks the largest absolute amplitude
/// WHY: Negative excursions count the same as positive ones
#[test]
fn given_negative_peak_when_computing_levels_then_absolute_value_used() {
    // Given: A signal whose loudest sample is negative
    let samples = vec![0.1f32, -0.8, 0.3];

    // When: Computing levels
    let reading = compute_levels(&samples);

    // Then: The peak reflects the negative excursion
    assert!((reading.peak - 0.8).abs() < 1e-6);
}
