//! Mathematical constants

/// 0.5 ln(2π)
pub const HALF_LN_2PI: f64 = 0.918_938_533_204_672_7;
/// 2π²
pub const TWO_PI_SQUARED: f64 = 19.739_208_802_178_716;
/// 4π²
pub const FOUR_PI_SQUARED: f64 = 39.478_417_604_357_43;
