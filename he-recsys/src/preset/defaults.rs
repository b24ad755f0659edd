use lazy_static::lazy_static;
use std::collections::BTreeMap;

use crate::params::{Scheme, SchemeConfig};

/// Ring degree of both default configurations.
pub const DEFAULT_POLY_MODULUS_DEGREE: usize = 8192;
/// Fixed-point scale of the default approximate configuration.
pub const DEFAULT_GLOBAL_SCALE: f64 = (1u64 << 40) as f64;
/// Prime plaintext modulus of the default exact configuration.
pub const DEFAULT_PLAINTEXT_MODULUS: u64 = 1032193;

lazy_static! {
    /// Coefficient-modulus chains for the exact scheme, keyed by the smallest
    /// ring degree each chain serves. The last prime is the key-switching prime.
    pub static ref EXACT_INTEGER_CHAINS: BTreeMap<usize, Vec<u32>> = {
        let mut map = BTreeMap::new();

        map.insert(8, vec![60, 60, 60]);
        map.insert(8192, vec![60, 60, 60, 60]);
        map.insert(16384, vec![60, 60, 60, 60, 60]);
        map.insert(32768, vec![60, 60, 60, 60, 60, 60]);

        map
    };

    /// Degree 8192, chain `[60, 40, 40, 60]`, scale 2^40: one rescale for the
    /// aggregation, one for the dot product.
    pub static ref APPROX_REAL_DEFAULT: SchemeConfig = SchemeConfig {
        scheme: Scheme::ApproxReal,
        poly_modulus_degree: DEFAULT_POLY_MODULUS_DEGREE,
        coeff_mod_bit_sizes: Some(vec![60, 40, 40, 60]),
        plaintext_modulus: None,
        global_scale: Some(DEFAULT_GLOBAL_SCALE),
    };

    pub static ref EXACT_INTEGER_DEFAULT: SchemeConfig = SchemeConfig {
        scheme: Scheme::ExactInteger,
        poly_modulus_degree: DEFAULT_POLY_MODULUS_DEGREE,
        coeff_mod_bit_sizes: None,
        plaintext_modulus: Some(DEFAULT_PLAINTEXT_MODULUS),
        global_scale: None,
    };
}

/// Default exact-scheme chain for `degree`.
pub fn default_exact_chain(degree: usize) -> Vec<u32> {
    EXACT_INTEGER_CHAINS
        .range(..=degree)
        .next_back()
        .map(|(_, chain)| chain.clone())
        .unwrap_or_else(|| vec![60, 60, 60])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_exact_chain_lookup() {
        assert_eq!(default_exact_chain(16), vec![60, 60, 60]);
        assert_eq!(default_exact_chain(4096), vec![60, 60, 60]);
        assert_eq!(default_exact_chain(8192).len(), 4);
        assert_eq!(default_exact_chain(32768).len(), 6);
    }

    #[test]
    fn test_default_configs_are_consistent() {
        assert_eq!(APPROX_REAL_DEFAULT.scheme, Scheme::ApproxReal);
        assert_eq!(APPROX_REAL_DEFAULT.global_scale, Some(2f64.powi(40)));
        assert_eq!(EXACT_INTEGER_DEFAULT.scheme, Scheme::ExactInteger);
        assert!(EXACT_INTEGER_DEFAULT.global_scale.is_none());
    }
}
