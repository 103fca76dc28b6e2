#[inline(always)]
pub fn logsumexp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY && b == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if a > b {
        a + (b - a).exp().ln_1p()
    } else {
        b + (a - b).exp().ln_1p()
    }
}

/// Computes `log(Σ exp(x_i))` shifted by the maximum element.
///
/// Returns `-inf` for an empty slice or when every element is `-inf`.
#[inline]
pub fn logsumexp_slice(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY || max == f64::INFINITY {
        return max;
    }
    let mut total = 0.0;
    for &x in xs {
        total += (x - max).exp();
    }
    max + total.ln()
}

/// `log(1 + exp(x))` without overflow for large `x`.
#[inline(always)]
pub fn log1p_exp(x: f64) -> f64 {
    logsumexp(0.0, x)
}

#[inline(always)]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
