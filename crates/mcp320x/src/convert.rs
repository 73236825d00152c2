//! Conversion between raw codes and millivolts.
//!
//! Both directions round to the nearest integer (halves round up). Raw codes
//! above [`MAX_CODE`] and voltages above `vref` are clamped, so results always
//! stay within `0..=vref` and `0..=MAX_CODE`. With rounding in both
//! directions `to_digital(to_analog(x))` is within one code of `x` for any
//! reference of 1.4 V or more.

use crate::MAX_CODE;

/// Converts a raw conversion result to millivolts for the reference `vref` (mV).
pub fn to_analog(raw: u16, vref: u16) -> u16 {
    let raw = u32::from(raw.min(MAX_CODE));
    let full_scale = u32::from(MAX_CODE);

    // raw <= full_scale, so the result never exceeds vref
    ((raw * u32::from(vref) + full_scale / 2) / full_scale) as u16
}

/// Converts a voltage in millivolts to the code the chip would report for the reference `vref` (mV).
pub fn to_digital(mv: u16, vref: u16) -> u16 {
    if vref == 0 {
        return 0;
    }

    let vref = u32::from(vref);
    let mv = u32::from(mv).min(vref);

    ((mv * u32::from(MAX_CODE) + vref / 2) / vref) as u16
}

/// Voltage represented by one code step, in µV.
pub fn analog_resolution(vref: u16) -> u32 {
    u32::from(vref) * 1000 / u32::from(MAX_CODE)
}
