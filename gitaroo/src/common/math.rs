use std::ops::{Add, BitAnd, Not, Sub};

/// Rounds `value` up to a multiple of `align`, where `align` is a power of two.
pub fn align<T, U>(value: T, align: U) -> U
where
    T: Into<U>,
    U: From<u8> + Add<Output = U> + Sub<Output = U> + BitAnd<Output = U> + Not<Output = U> + Copy,
{
    (value.into() + align - 1.into()) & !(align - 1.into())
}

/// Converts `value` to `i16`, saturating at `[i16::MIN, i16::MAX]` and otherwise truncating
/// toward zero.
pub fn clamp_f64_to_i16(value: f64) -> i16 {
    if value <= f64::from(i16::MIN) {
        i16::MIN
    } else if value >= f64::from(i16::MAX) {
        i16::MAX
    } else {
        value.trunc() as i16
    }
}
