//! Attribute validation shared by every audio object.
//!
//! Float attributes are checked against closed or open intervals, integer
//! attributes against closed ranges, and boolean attributes accept any value
//! through [`Truthy`] coercion: only "null" and `false` are falsey.

use std::fmt;

use num_traits::Float;

use crate::error::{AudioError, Result};

/// A three-component real vector (position, velocity, orientation axes)
pub type Vec3 = [f32; 3];

/// An interval with independently open or closed ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f32,
    pub upper: f32,
    pub lower_open: bool,
    pub upper_open: bool,
}

impl Bounds {
    /// `[lower, upper]`
    pub const fn closed(lower: f32, upper: f32) -> Self {
        Self {
            lower,
            upper,
            lower_open: false,
            upper_open: false,
        }
    }

    /// `[lower, +inf)`
    pub const fn at_least(lower: f32) -> Self {
        Self {
            lower,
            upper: f32::INFINITY,
            lower_open: false,
            upper_open: true,
        }
    }

    /// `(lower, +inf)`
    pub const fn greater_than(lower: f32) -> Self {
        Self {
            lower,
            upper: f32::INFINITY,
            lower_open: true,
            upper_open: true,
        }
    }

    /// Check a value against this interval
    pub fn validate(&self, attribute: &'static str, value: f32) -> Result<f32> {
        validate_bounded_float(
            attribute,
            value,
            self.lower,
            self.upper,
            self.lower_open,
            self.upper_open,
        )
    }
}

/// Validate a float against an interval.
///
/// NaN never passes. An infinite bound is treated as absent regardless of
/// its open flag.
pub fn validate_bounded_float<T>(
    attribute: &'static str,
    value: T,
    lower: T,
    upper: T,
    lower_open: bool,
    upper_open: bool,
) -> Result<T>
where
    T: Float + fmt::Display,
{
    let reject = || {
        let bounds = format!(
            "{}{}, {}{}",
            if lower_open { '(' } else { '[' },
            lower,
            if upper.is_infinite() {
                "+inf".to_string()
            } else {
                upper.to_string()
            },
            if upper_open { ')' } else { ']' },
        );
        AudioError::invalid_parameter(attribute, value, bounds)
    };

    if value.is_nan() {
        return Err(reject());
    }

    let below = if lower.is_infinite() {
        false
    } else if lower_open {
        value <= lower
    } else {
        value < lower
    };
    let above = if upper.is_infinite() {
        false
    } else if upper_open {
        value >= upper
    } else {
        value > upper
    };

    if below || above {
        Err(reject())
    } else {
        Ok(value)
    }
}

/// Validate an integer against a closed range
pub fn validate_int_range(attribute: &'static str, value: i64, lower: i64, upper: i64) -> Result<i64> {
    if value < lower || value > upper {
        return Err(AudioError::invalid_parameter(
            attribute,
            value,
            format!("an integer in [{}, {}]", lower, upper),
        ));
    }
    Ok(value)
}

/// Validate every component of a vector
pub fn validate_vec3(attribute: &'static str, value: Vec3) -> Result<Vec3> {
    if value.iter().any(|c| c.is_nan()) {
        return Err(AudioError::invalid_parameter(
            attribute,
            format!("{:?}", value),
            "three real components",
        ));
    }
    Ok(value)
}

/// Truthiness of a value handed to a boolean attribute setter.
///
/// `None` and `false` are falsey. Every other value, including `0` and `""`,
/// is truthy. `Some(v)` takes the truthiness of `v`.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().map_or(false, Truthy::is_truthy)
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

impl Truthy for str {
    fn is_truthy(&self) -> bool {
        true
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        true
    }
}

macro_rules! always_truthy {
    ($($ty:ty),*) => {
        $(
            impl Truthy for $ty {
                fn is_truthy(&self) -> bool {
                    true
                }
            }
        )*
    };
}

always_truthy!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, char);

/// Coerce any value to a boolean attribute value
pub fn coerce_boolean<T: Truthy + ?Sized>(value: &T) -> bool {
    value.is_truthy()
}
