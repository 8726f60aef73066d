use crate::{
    hardware::{Memory, RegFile},
    isa::Reg,
};

// little endian
pub fn get_u64(binary: &[u8]) -> u64 {
    let mut res = 0;
    for (i, byte) in binary.iter().enumerate().take(8) {
        res += (*byte as u64) << (i * 8);
    }
    res
}
pub fn put_u64(binary: &mut [u8], val: u64) {
    for (i, byte) in binary.iter_mut().enumerate().take(8) {
        *byte = (val >> (i * 8)) as u8;
    }
}

/// Aligned 8-byte words that differ between two memories, as
/// `(address, left, right)`. Only the common prefix is compared.
pub fn mem_diff(left: &Memory, right: &Memory) -> Vec<(u64, u64, u64)> {
    left.as_bytes()
        .chunks(8)
        .zip(right.as_bytes().chunks(8))
        .enumerate()
        .filter_map(|(i, (l, r))| {
            let (l, r) = (get_u64(l), get_u64(r));
            (l != r).then_some(((i as u64) << 3, l, r))
        })
        .collect()
}

/// Registers whose values differ, as `(register, left, right)`.
pub fn reg_diff(left: &RegFile, right: &RegFile) -> Vec<(Reg, u64, u64)> {
    left.iter()
        .zip(right.iter())
        .filter(|((_, l), (_, r))| l != r)
        .map(|((reg, l), (_, r))| (reg, l, r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_diff_words() {
        let left = Memory::new(32);
        let mut right = left.clone();
        right.write(0x11, &[0xab]).unwrap();
        right.write_u64(0x18, 5).unwrap();
        assert_eq!(
            mem_diff(&left, &right),
            vec![(0x10, 0, 0xab00), (0x18, 0, 5)]
        );
    }

    #[test]
    fn test_reg_diff() {
        let left = RegFile::default();
        let mut right = left;
        right.set(Reg::RSP, 0x100);
        assert_eq!(reg_diff(&left, &right), vec![(Reg::RSP, 0, 0x100)]);
    }
}
