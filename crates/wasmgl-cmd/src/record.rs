use bytemuck::{Pod, Zeroable};

/// Number of `i32` words per record: opcode + seven operands.
pub const RECORD_WORDS: usize = 8;

/// Size of one record in bytes.
pub const RECORD_SIZE: usize = RECORD_WORDS * 4;

/// One fixed-width command record as it sits in guest memory.
///
/// Layout is `[op, a0, a1, a2, a3, a4, a5, a6]`, little-endian `i32`.
/// Float operands carry the raw IEEE-754 bit pattern of an `f32`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Pod, Zeroable)]
pub struct RawRecord {
    pub op: i32,
    pub args: [i32; RECORD_WORDS - 1],
}

impl RawRecord {
    #[inline]
    pub const fn new(op: i32, args: [i32; RECORD_WORDS - 1]) -> Self {
        Self { op, args }
    }

    /// Reads one record from an arbitrarily aligned byte slice.
    ///
    /// Returns `None` if `bytes` is shorter than [`RECORD_SIZE`].
    #[inline]
    pub fn read_unaligned(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..RECORD_SIZE)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    /// Operand `i` reinterpreted as an `f32` bit pattern.
    #[inline]
    pub fn arg_f32(&self, i: usize) -> f32 {
        f32::from_bits(self.args[i] as u32)
    }
}

/// Encodes an `f32` operand as its bit pattern.
#[inline]
pub fn f32_bits(v: f32) -> i32 {
    v.to_bits() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_32_bytes() {
        assert_eq!(std::mem::size_of::<RawRecord>(), RECORD_SIZE);
    }

    #[test]
    fn read_unaligned_from_odd_offset() {
        let rec = RawRecord::new(8, [4, 0, 3, 0, 0, 0, 0]);
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(bytemuck::bytes_of(&rec));
        assert_eq!(RawRecord::read_unaligned(&bytes[1..]), Some(rec));
    }

    #[test]
    fn read_unaligned_short_slice() {
        assert_eq!(RawRecord::read_unaligned(&[0u8; RECORD_SIZE - 1]), None);
    }

    #[test]
    fn float_bits_preserve_exact_value() {
        for v in [0.1f32, -0.0, f32::MIN_POSITIVE, f32::MAX, 1.0e-45] {
            let rec = RawRecord::new(0, [f32_bits(v), 0, 0, 0, 0, 0, 0]);
            assert_eq!(rec.arg_f32(0).to_bits(), v.to_bits());
        }
    }

    #[test]
    fn float_bits_preserve_nan_payload() {
        let nan = f32::from_bits(0x7fc0_1234);
        let rec = RawRecord::new(0, [f32_bits(nan), 0, 0, 0, 0, 0, 0]);
        assert_eq!(rec.arg_f32(0).to_bits(), 0x7fc0_1234);
    }
}
