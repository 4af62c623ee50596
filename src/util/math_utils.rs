/**
Returns the value only if it is finite. NaN and infinities become `None`,
so invalid arithmetic is carried as an undefined cell.
 */
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/**
Arithmetic mean of the defined values, ignoring `None`.

## Returns
`None` when no value is defined.
 */
pub fn mean_defined<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        finite(sum / count as f64)
    }
}

/**
Compounded return of a sequence of period returns: the product of
`(1 + r)` minus one. Undefined periods contribute a 0% return.

## Returns
`None` when no period is defined or the product is not finite.
 */
pub fn compound_defined<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut any = false;
    let product = values.into_iter().fold(1.0, |acc, v| match v {
        Some(r) => {
            any = true;
            acc * (1.0 + r)
        }
        None => acc,
    });
    if any {
        finite(product - 1.0)
    } else {
        None
    }
}

/**
Natural log of `1 + r`. Undefined for returns at or below -100%.
 */
pub fn log_return(r: f64) -> Option<f64> {
    if r <= -1.0 {
        None
    } else {
        finite(r.ln_1p())
    }
}

/**
Rounds to `decimals` places, breaking ties to even.
 */
pub fn round_dp(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/**
Scales a fraction to a percentage rounded to two decimals.
 */
pub fn to_percent(value: f64) -> f64 {
    round_dp(value * 100.0, 2)
}
