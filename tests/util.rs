/// Check whether two floats have a relative difference of at most 5e-5 times the larger magnitude, or are both within
/// 1e-9 of zero.
#[macro_export]
macro_rules! assert_floats_near_equal {
    ($val1:expr, $val2:expr, $msg:expr) => {{
        let a: f64 = $val1;
        let b: f64 = $val2;
        let scale = a.abs().max(b.abs());
        let within = (a - b).abs() <= 1e-9 || (a - b).abs() <= 0.00005 * scale;
        assert!(within, "{}: {} vs {}", $msg, a, b);
    }};
}
