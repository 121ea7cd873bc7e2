//! Fletcher-32 checksum used for both header frames and block payloads.
//!
//! The sums are accumulated one byte at a time (not in 16-bit words) and
//! folded back to 16 bits every 360 bytes, which keeps both accumulators
//! well inside `u32` for any input length.

/// Largest run of bytes summed before the accumulators are folded.
const FOLD_INTERVAL: usize = 360;

/// Compute the 32-bit Fletcher checksum of `data`.
///
/// The result is `sum2 << 16 | sum1`. An empty slice yields `0xFFFF_FFFF`.
pub fn fletcher32(data: &[u8]) -> u32 {
    let mut sum1: u32 = 0xffff;
    let mut sum2: u32 = 0xffff;

    for run in data.chunks(FOLD_INTERVAL) {
        for &byte in run {
            sum1 += byte as u32;
            sum2 += sum1;
        }
        sum1 = (sum1 & 0xffff) + (sum1 >> 16);
        sum2 = (sum2 & 0xffff) + (sum2 >> 16);
    }

    sum1 = (sum1 & 0xffff) + (sum1 >> 16);
    sum2 = (sum2 & 0xffff) + (sum2 >> 16);
    (sum2 << 16) | sum1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(fletcher32(&[]), 0xffff_ffff);
    }

    #[test]
    fn known_vectors() {
        assert_eq!(fletcher32(&[0x01]), 0x0001_0001);
        assert_eq!(fletcher32(&[0x01, 0x02]), 0x0004_0003);
    }

    #[test]
    fn long_input_matches_modular_reference() {
        let data = vec![0xffu8; 1 << 20];
        let (mut s1, mut s2) = (0xffffu64, 0xffffu64);
        for &b in &data {
            s1 = (s1 + b as u64) % 65535;
            s2 = (s2 + s1) % 65535;
        }
        let sum = fletcher32(&data);
        assert_eq!((sum & 0xffff) as u64 % 65535, s1);
        assert_eq!((sum >> 16) as u64 % 65535, s2);
    }

    #[test]
    fn single_byte_change_is_detected() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7) as u8).collect();
        let orig = fletcher32(&data);
        for pos in [0, 1, 359, 360, 361, 999] {
            let mut copy = data.clone();
            copy[pos] ^= 0x5a;
            assert_ne!(fletcher32(&copy), orig, "flip at {pos} went unnoticed");
        }
    }
}
