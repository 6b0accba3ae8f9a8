//! Bit-level encoders for the 16-bit float formats.
//!
//! Layouts:
//! - binary16 (`F16`): 1 sign, 5 exponent, 10 fraction bits.
//! - bfloat16 (`BF16`): 1 sign, 8 exponent, 7 fraction bits (upper half of an f32).

use half::{bf16, f16};

/// Multiplier applied before truncating to bfloat16. Truncation alone always
/// rounds toward zero; nudging the magnitude up first keeps the mean error
/// close to that of round-to-nearest.
pub const BF16_CORRECTION: f32 = 1.001957;

/// Quiet NaN pattern emitted for any NaN input (sign bit preserved).
pub const F16_NAN: u16 = 0x7E00;
/// Positive infinity in binary16.
pub const F16_INFINITY: u16 = 0x7C00;
/// Sign bit shared by both 16-bit formats.
pub const SIGN_BIT_16: u16 = 0x8000;

/// Encode an `f32` as IEEE-754 binary16 bits with round-to-nearest-even.
///
/// Magnitudes above the binary16 range saturate to infinity. Subnormal
/// results are produced exactly: scaling by `2^112` then `2^-110` moves the
/// value so that adding a per-exponent bias performs the rounding in f32
/// arithmetic, after which the half-precision fields are read off the sum.
pub fn f32_to_f16_bits(value: f32) -> u16 {
    let scale_to_inf = f32::from_bits(0x7780_0000);
    let scale_to_zero = f32::from_bits(0x0880_0000);

    let bits = value.to_bits();
    let shl1 = bits << 1;
    let sign = bits & 0x8000_0000;
    let bias = (shl1 & 0xFF00_0000).max(0x7100_0000);

    let base = (value.abs() * scale_to_inf) * scale_to_zero
        + f32::from_bits((bias >> 1) + 0x0780_0000);
    let base_bits = base.to_bits();
    let exp_bits = (base_bits >> 13) & 0x0000_7C00;
    let mantissa_bits = base_bits & 0x0000_0FFF;
    let nonsign = exp_bits + mantissa_bits;

    let magnitude = if shl1 > 0xFF00_0000 { u32::from(F16_NAN) } else { nonsign };
    ((sign >> 16) | magnitude) as u16
}

/// Encode an `f32` as bfloat16 bits: apply [`BF16_CORRECTION`] and keep the
/// upper 16 bits of the result.
pub fn f32_to_bf16_bits(value: f32) -> u16 {
    let corrected = value * BF16_CORRECTION;
    (corrected.to_bits() >> 16) as u16
}

/// Decode binary16 bits to `f32` (exact).
pub fn f16_bits_to_f32(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

/// Decode bfloat16 bits to `f32` (exact).
pub fn bf16_bits_to_f32(bits: u16) -> f32 {
    bf16::from_bits(bits).to_f32()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f16_exact_values() {
        assert_eq!(f32_to_f16_bits(0.0), 0x0000);
        assert_eq!(f32_to_f16_bits(-0.0), 0x8000);
        assert_eq!(f32_to_f16_bits(1.0), 0x3C00);
        assert_eq!(f32_to_f16_bits(-2.0), 0xC000);
        assert_eq!(f32_to_f16_bits(0.5), 0x3800);
        assert_eq!(f32_to_f16_bits(65504.0), 0x7BFF);
    }

    #[test]
    fn f16_subnormals() {
        // Smallest positive subnormal: 2^-24.
        assert_eq!(f32_to_f16_bits(2f32.powi(-24)), 0x0001);
        // Largest subnormal: 1023 * 2^-24.
        assert_eq!(f32_to_f16_bits(1023.0 * 2f32.powi(-24)), 0x03FF);
        // Half of the smallest subnormal ties to even (zero).
        assert_eq!(f32_to_f16_bits(2f32.powi(-25)), 0x0000);
        // Slightly above the tie rounds up.
        assert_eq!(f32_to_f16_bits(2f32.powi(-25) * 1.5), 0x0001);
    }

    #[test]
    fn f16_round_to_nearest_even() {
        // 1 + 2^-11 is exactly halfway between 1.0 and the next half; ties to even.
        assert_eq!(f32_to_f16_bits(1.0 + 2f32.powi(-11)), 0x3C00);
        // 1 + 3 * 2^-11 is halfway between odd 0x3C01 and even 0x3C02.
        assert_eq!(f32_to_f16_bits(1.0 + 3.0 * 2f32.powi(-11)), 0x3C02);
    }

    #[test]
    fn f16_overflow_and_specials() {
        assert_eq!(f32_to_f16_bits(65520.0), F16_INFINITY);
        assert_eq!(f32_to_f16_bits(1.0e9), F16_INFINITY);
        assert_eq!(f32_to_f16_bits(f32::MAX), F16_INFINITY);
        assert_eq!(f32_to_f16_bits(f32::INFINITY), F16_INFINITY);
        assert_eq!(f32_to_f16_bits(f32::NEG_INFINITY), F16_INFINITY | SIGN_BIT_16);
        assert_eq!(f32_to_f16_bits(f32::NAN) & !SIGN_BIT_16, F16_NAN);
    }

    #[test]
    fn bf16_known_values() {
        assert_eq!(f32_to_bf16_bits(0.0), 0x0000);
        assert_eq!(f32_to_bf16_bits(1.0), 0x3F80);
        assert_eq!(f32_to_bf16_bits(-2.0), 0xC000);
        assert_eq!(f32_to_bf16_bits(f32::INFINITY), 0x7F80);
    }

    #[test]
    fn bf16_correction_lifts_truncation() {
        // 1.00390625 sits exactly on a bf16 step (0x3F81); a value just
        // below it truncates down without the correction but not with it.
        let just_below = f32::from_bits(0x3F80_FFFF);
        assert_eq!(just_below.to_bits() >> 16, 0x3F80);
        assert_eq!(f32_to_bf16_bits(just_below), 0x3F81);
    }

    #[test]
    fn decoders_invert_exact_values() {
        assert_eq!(f16_bits_to_f32(0x3C00), 1.0);
        assert_eq!(f16_bits_to_f32(0x0001), 2f32.powi(-24));
        assert_eq!(bf16_bits_to_f32(0x3F80), 1.0);
        assert_eq!(bf16_bits_to_f32(0xC000), -2.0);
    }
}
