//! Scheme configuration and the validated parameter set derived from it.

use std::fmt;

use num_bigint::BigInt;
use num_traits::One;
use serde::{Deserialize, Serialize};

use crate::errors::HeRecError;
use crate::preset::defaults::{
    APPROX_REAL_DEFAULT, EXACT_INTEGER_DEFAULT, default_exact_chain,
};
use crate::ring::Ring;
use crate::ring::primes::generate_primes;

/// Smallest accepted ring degree.
pub const MIN_POLY_MODULUS_DEGREE: usize = 8;
/// Largest accepted ring degree.
pub const MAX_POLY_MODULUS_DEGREE: usize = 32768;
/// Longest accepted coefficient-modulus chain, special prime included.
pub const MAX_CHAIN_LENGTH: usize = 8;
/// Slack, in bits, kept above the worst-case exact-scheme noise estimate.
pub const EXACT_NOISE_MARGIN_BITS: f64 = 8.0;

/// Bits of ciphertext modulus the exact scheme needs for one scalar
/// multiplication followed by one ciphertext product.
///
/// The scalar step wraps the plaintext modulo `t`, leaving noise near `t^2`;
/// the product then multiplies the noise by about `t * N^2`, and the result
/// must stay below `Q / 2t`.
pub fn exact_noise_budget_bits(plaintext_modulus: u64, degree: usize) -> f64 {
    4.0 * (plaintext_modulus as f64).log2() + 2.0 * (degree as f64).log2() + EXACT_NOISE_MARGIN_BITS
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    /// Approximate arithmetic on real numbers.
    #[serde(rename = "APPROX_REAL")]
    ApproxReal,
    /// Exact arithmetic modulo a prime plaintext modulus.
    #[serde(rename = "EXACT_INTEGER")]
    ExactInteger,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::ApproxReal => write!(f, "APPROX_REAL"),
            Scheme::ExactInteger => write!(f, "EXACT_INTEGER"),
        }
    }
}

/// Caller-facing configuration, exactly the recognised options.
///
/// ```
/// # use he_recsys::params::{Scheme, SchemeConfig};
/// let config = SchemeConfig::from_json(
///     r#"{"scheme": "EXACT_INTEGER", "polyModulusDegree": 4096, "plaintextModulus": 65537}"#,
/// ).unwrap();
/// assert_eq!(config.scheme, Scheme::ExactInteger);
/// assert_eq!(config.plaintext_modulus, Some(65537));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemeConfig {
    pub scheme: Scheme,
    pub poly_modulus_degree: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coeff_mod_bit_sizes: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plaintext_modulus: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_scale: Option<f64>,
}

impl SchemeConfig {
    pub fn approx_real(degree: usize, coeff_mod_bit_sizes: Vec<u32>, global_scale: f64) -> Self {
        SchemeConfig {
            scheme: Scheme::ApproxReal,
            poly_modulus_degree: degree,
            coeff_mod_bit_sizes: Some(coeff_mod_bit_sizes),
            plaintext_modulus: None,
            global_scale: Some(global_scale),
        }
    }

    pub fn exact_integer(degree: usize, plaintext_modulus: u64) -> Self {
        SchemeConfig {
            scheme: Scheme::ExactInteger,
            poly_modulus_degree: degree,
            coeff_mod_bit_sizes: None,
            plaintext_modulus: Some(plaintext_modulus),
            global_scale: None,
        }
    }

    pub fn approx_real_default() -> Self {
        APPROX_REAL_DEFAULT.clone()
    }

    pub fn exact_integer_default() -> Self {
        EXACT_INTEGER_DEFAULT.clone()
    }

    pub fn from_json(json: &str) -> Result<Self, HeRecError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, HeRecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Validated parameters: the concrete prime chain plus the scheme-specific
/// plaintext settings. Immutable once built.
#[derive(Debug, Clone)]
pub struct EncryptionParams {
    pub scheme: Scheme,
    pub degree: usize,
    /// `q_0 .. q_{L-1}`.
    pub data_primes: Vec<u64>,
    /// Key-switching prime `P`, never part of a ciphertext modulus.
    pub special_prime: u64,
    /// Plaintext field, exact scheme only.
    pub plaintext: Option<Ring>,
    /// Fresh encoding scale, approximate scheme only.
    pub scale: Option<f64>,
    /// `Q_l = q_0 * .. * q_l` for every level `l`.
    level_moduli: Vec<BigInt>,
    /// `Q_{L-1} * P`.
    key_modulus: BigInt,
}

impl EncryptionParams {
    pub fn try_from_config(config: &SchemeConfig) -> Result<Self, HeRecError> {
        let degree = config.poly_modulus_degree;
        if !degree.is_power_of_two()
            || !(MIN_POLY_MODULUS_DEGREE..=MAX_POLY_MODULUS_DEGREE).contains(&degree)
        {
            return Err(HeRecError::InvalidParameters(format!(
                "polyModulusDegree must be a power of two in [{}, {}], got {}",
                MIN_POLY_MODULUS_DEGREE, MAX_POLY_MODULUS_DEGREE, degree
            )));
        }

        let bit_sizes = match (config.scheme, &config.coeff_mod_bit_sizes) {
            (_, Some(sizes)) => sizes.clone(),
            (Scheme::ExactInteger, None) => default_exact_chain(degree),
            (Scheme::ApproxReal, None) => {
                return Err(HeRecError::InvalidParameters(
                    "APPROX_REAL requires coeffModBitSizes".to_string(),
                ));
            }
        };
        if bit_sizes.len() < 2 || bit_sizes.len() > MAX_CHAIN_LENGTH {
            return Err(HeRecError::InvalidParameters(format!(
                "coeffModBitSizes must hold between 2 and {} entries, got {}",
                MAX_CHAIN_LENGTH,
                bit_sizes.len()
            )));
        }

        let mut primes = generate_primes(&bit_sizes)?;
        let special_prime = primes.pop().ok_or_else(|| {
            HeRecError::InternalError("Prime chain unexpectedly empty".to_string())
        })?;
        let data_primes = primes;

        let mut level_moduli = Vec::with_capacity(data_primes.len());
        let mut acc = BigInt::one();
        for &q in &data_primes {
            acc *= BigInt::from(q);
            level_moduli.push(acc.clone());
        }
        let key_modulus = &acc * BigInt::from(special_prime);

        let (plaintext, scale) = match config.scheme {
            Scheme::ApproxReal => {
                if config.plaintext_modulus.is_some() {
                    return Err(HeRecError::InvalidParameters(
                        "plaintextModulus is not an APPROX_REAL option".to_string(),
                    ));
                }
                let scale = config.global_scale.ok_or_else(|| {
                    HeRecError::InvalidParameters("APPROX_REAL requires globalScale".to_string())
                })?;
                if !scale.is_finite() || scale <= 1.0 {
                    return Err(HeRecError::InvalidParameters(format!(
                        "globalScale must be finite and greater than 1, got {}",
                        scale
                    )));
                }
                if scale.log2() >= bit_sizes[0] as f64 {
                    return Err(HeRecError::InvalidParameters(format!(
                        "globalScale 2^{:.1} does not fit the {}-bit first prime",
                        scale.log2(),
                        bit_sizes[0]
                    )));
                }
                // Each product is rescaled by one middle prime.
                let rescale_bits = &bit_sizes[1..bit_sizes.len() - 1];
                if let Some(&bits) = rescale_bits.iter().find(|&&b| scale.log2() > b as f64) {
                    return Err(HeRecError::InvalidParameters(format!(
                        "globalScale 2^{:.1} exceeds the {}-bit rescaling prime",
                        scale.log2(),
                        bits
                    )));
                }
                (None, Some(scale))
            }
            Scheme::ExactInteger => {
                if config.global_scale.is_some() {
                    return Err(HeRecError::InvalidParameters(
                        "globalScale is not an EXACT_INTEGER option".to_string(),
                    ));
                }
                let t = config.plaintext_modulus.ok_or_else(|| {
                    HeRecError::InvalidParameters(
                        "EXACT_INTEGER requires plaintextModulus".to_string(),
                    )
                })?;
                if t < 3 {
                    return Err(HeRecError::InvalidParameters(format!(
                        "plaintextModulus must be at least 3, got {}",
                        t
                    )));
                }
                let ring = Ring::try_with(t).map_err(|_| {
                    HeRecError::InvalidParameters(format!("plaintextModulus {} is not prime", t))
                })?;
                if data_primes.iter().any(|&q| q <= t) {
                    return Err(HeRecError::InvalidParameters(format!(
                        "plaintextModulus {} must be smaller than every coefficient prime",
                        t
                    )));
                }
                if data_primes.len() < 2 {
                    return Err(HeRecError::InvalidParameters(
                        "EXACT_INTEGER needs at least two data primes".to_string(),
                    ));
                }
                let needed = exact_noise_budget_bits(t, degree);
                let available = acc.bits() as f64;
                if available < needed {
                    return Err(HeRecError::InvalidParameters(format!(
                        "a {}-bit coefficient modulus leaves no noise room for plaintextModulus {} \
                         at degree {} (needs {:.0} bits)",
                        available, t, degree, needed
                    )));
                }
                (Some(ring), None)
            }
        };

        Ok(EncryptionParams {
            scheme: config.scheme,
            degree,
            data_primes,
            special_prime,
            plaintext,
            scale,
            level_moduli,
            key_modulus,
        })
    }

    /// Index of the top level; fresh ciphertexts live there.
    pub fn max_level(&self) -> usize {
        self.data_primes.len() - 1
    }

    /// `Q_level`.
    pub fn modulus_at(&self, level: usize) -> Result<&BigInt, HeRecError> {
        self.level_moduli.get(level).ok_or_else(|| {
            HeRecError::InternalError(format!(
                "Level {} outside the chain of {} data primes",
                level,
                self.data_primes.len()
            ))
        })
    }

    /// Modulus of the top level.
    pub fn data_modulus(&self) -> &BigInt {
        &self.level_moduli[self.max_level()]
    }

    /// Modulus the key-switching keys live under.
    pub fn key_modulus(&self) -> &BigInt {
        &self.key_modulus
    }

    pub fn special_modulus(&self) -> BigInt {
        BigInt::from(self.special_prime)
    }

    pub fn plaintext_ring(&self) -> Result<Ring, HeRecError> {
        self.plaintext.ok_or_else(|| {
            HeRecError::InvalidParameters(format!("{} has no plaintext modulus", self.scheme))
        })
    }
}
