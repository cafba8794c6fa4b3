/// Spherical harmonics DC term to 8-bit colour conversion
use crate::point_cloud::Colour;
use constants::colour::SH_C0;

/// Map one DC coefficient to a byte: clamp((0.5 + C0 * dc) * 255, 0, 255).
pub fn sh_dc_to_byte(dc: f64) -> u8 {
    ((0.5 + SH_C0 * dc) * 255.0).clamp(0.0, 255.0) as u8
}

pub fn sh_dc_to_colour(dc: [f64; 3]) -> Colour {
    Colour::new(sh_dc_to_byte(dc[0]), sh_dc_to_byte(dc[1]), sh_dc_to_byte(dc[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dc_is_mid_grey() {
        assert_eq!(sh_dc_to_byte(0.0), 127);
    }

    #[test]
    fn saturates_at_both_ends() {
        assert_eq!(sh_dc_to_byte(100.0), 255);
        assert_eq!(sh_dc_to_byte(-100.0), 0);
    }

    #[test]
    fn unit_dc() {
        // (0.5 + 0.2820948) * 255 = 199.43
        assert_eq!(sh_dc_to_byte(1.0), 199);
    }
}
