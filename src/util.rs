/// Checks that a numerical value lies in the interval `[a,b]`, returning
/// [`Error::InvalidConfig`](crate::Error::InvalidConfig) with a helpful message if not
///
/// ### Example
/// ```ignore
/// let value = 2.0;
/// ensure_interval!(value, 0.0, 1.0)?;
/// ```
/// This fails with the message "Invalid value for \`value\`. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! ensure_interval {
    ($var:expr, $a:expr, $b:expr) => {
        $crate::error::ensure($var >= $a && $var <= $b, || {
            format!(
                "Invalid value for `{}`. Must be in the interval [{}, {}].",
                stringify!($var),
                $a,
                $b,
            )
        })
    };
}

/// Checks that a time step is finite and strictly positive
pub(crate) fn ensure_dt(dt: f32) -> crate::Result<()> {
    crate::error::ensure(dt.is_finite() && dt > 0.0, || {
        format!("Time step must be finite and positive, got {dt}")
    })
}
