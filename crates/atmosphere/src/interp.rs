/// Piecewise-linear interpolation of `(xp, fp)` at `x`.
///
/// `xp` must be strictly increasing and the same length as `fp`. Outside
/// `[xp[0], xp[last]]` the result clamps to the boundary value. Returns NaN
/// for empty input.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 || x.is_nan() {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }

    // First index whose step is above x; x > xp[0] so hi >= 1.
    let hi = xp[..n].partition_point(|&step| step <= x);
    let lo = hi - 1;
    if xp[lo] == x {
        return fp[lo];
    }
    fp[lo] + (x - xp[lo]) * (fp[hi] - fp[lo]) / (xp[hi] - xp[lo])
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::HEIGHT_STEPS_M;

    const XP: [f64; 2] = [100.0, 200.0];
    const FP: [f64; 2] = [10.0, 20.0];

    #[test]
    fn test_midpoint() {
        assert_eq!(interp(150.0, &XP, &FP), 15.0);
    }

    #[test]
    fn test_clamps_below_and_above() {
        assert_eq!(interp(50.0, &XP, &FP), 10.0);
        assert_eq!(interp(300.0, &XP, &FP), 20.0);
        assert_eq!(interp(f64::NEG_INFINITY, &XP, &FP), 10.0);
    }

    #[test]
    fn test_exact_steps_return_stored_values() {
        let fp: Vec<f64> = (0..HEIGHT_STEPS_M.len()).map(|i| i as f64 * 1.5).collect();
        for (i, &h) in HEIGHT_STEPS_M.iter().enumerate() {
            assert_eq!(interp(h, &HEIGHT_STEPS_M, &fp), fp[i]);
        }
    }

    #[test]
    fn test_matches_formula_between_steps() {
        let fp: Vec<f64> = (0..HEIGHT_STEPS_M.len()).map(|i| i as f64).collect();
        // 2000 m sits between 1900 (index 6) and 3000 (index 7).
        let expected = 6.0 + (2000.0 - 1900.0) / (3000.0 - 1900.0);
        assert!((interp(2000.0, &HEIGHT_STEPS_M, &fp) - expected).abs() < 1e-12);
        // 215 m between 110 (0) and 320 (1).
        assert!((interp(215.0, &HEIGHT_STEPS_M, &fp) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(interp(1.0, &[], &[]).is_nan());
        assert!(interp(f64::NAN, &XP, &FP).is_nan());
        assert_eq!(interp(7.0, &[5.0], &[42.0]), 42.0);
    }
}
