/// Express a count per 100 residues of a protein of `length` residues
#[inline]
pub fn per_hundred(count: u64, length: u32) -> f64 {
    count as f64 / f64::from(length) * 100.0
}

/// Locus family encoded in a result file name, i.e. everything before the
/// first `_` (`DQA1_2_spike.out` -> `DQA1`)
#[inline]
pub fn family_of(file_name: &str) -> &str {
    file_name.split('_').next().unwrap_or(file_name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn density() {
        assert_eq!(per_hundred(75, 75), 100.0);
        assert_eq!(per_hundred(0, 419), 0.0);
        assert!((per_hundred(55, 1273) - 4.3205).abs() < 1e-4);
    }

    #[test]
    fn family_from_name() {
        assert_eq!(family_of("DQA1_2_spike.out"), "DQA1");
        assert_eq!(family_of("DRB1.out"), "DRB1.out");
        assert_eq!(family_of(""), "");
    }
}
