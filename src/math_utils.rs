/// Mathematical utility functions for the column simulation.

/// Assert that the deviation between two values is less than a threshold
///
/// Calculates the percentage deviation between `actual` and `expected`, then
/// asserts that this deviation is less than the specified `max_deviation`.
#[macro_export]
macro_rules! assert_deviation {
    ($actual:expr, $expected:expr, $max_deviation:expr) => {{
        let actual_val = $actual;
        let expected_val = $expected;
        let max_dev = $max_deviation;
        let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

        if actual_deviation >= max_dev {
            panic!(
                "assertion failed: deviation {:.2}% >= {:.2}%\n  actual: {:?},\n  expected: {:?}",
                actual_deviation, max_dev, actual_val, expected_val
            );
        }
    }};
    ($actual:expr, $expected:expr, $max_deviation:expr, $($arg:tt)+) => {{
        let actual_val = $actual;
        let expected_val = $expected;
        let max_dev = $max_deviation;
        let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

        if actual_deviation >= max_dev {
            panic!(
                "assertion failed: deviation {:.2}% >= {:.2}%: {}\n  actual: {:?},\n  expected: {:?}",
                actual_deviation, max_dev, format_args!($($arg)+), actual_val, expected_val
            );
        }
    }};
}

/// Linear interpolation between two values
///
/// # Arguments
/// * `a` - Start value
/// * `b` - End value
/// * `ratio` - Interpolation ratio (0.0 = a, 1.0 = b)
///
/// # Examples
/// ```
/// use frost_column_rust::math_utils::lerp;
///
/// assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
/// assert_eq!(lerp(100.0, 200.0, 0.25), 125.0);
/// ```
pub fn lerp(a: f64, b: f64, ratio: f64) -> f64 {
    a + (b - a) * ratio
}

/// Calculate the percentage deviation between two values
///
/// Returns the percentage difference of `actual` from `expected`, using the
/// expected value as the reference for the percentage calculation.
///
/// # Examples
/// ```
/// use frost_column_rust::math_utils::deviation;
///
/// // 105 is 5% higher than 100
/// assert_eq!(deviation(105.0, 100.0), 5.0);
/// ```
pub fn deviation(actual: f64, expected: f64) -> f64 {
    if expected.abs() < f64::EPSILON {
        if actual.abs() < f64::EPSILON {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        ((actual - expected).abs() / expected.abs()) * 100.0
    }
}
