//! Encrypting plaintext feature vectors and decrypting results.
//!
//! Vectors are coefficient-packed: entry `i` becomes coefficient `i` of the
//! plaintext polynomial, so a vector of dimension `d` needs `d <= N`.

use crate::context::EncryptionContext;
use crate::errors::HeRecError;
use crate::rlwe::Ciphertext;
use crate::rlwe::encryption;

/// Opaque ciphertext handle bound to one context. Operations return new
/// handles and never modify their inputs.
#[derive(Debug, Clone)]
pub struct EncryptedVector {
    context_id: u64,
    dim: usize,
    ciphertext: Ciphertext,
}

impl EncryptedVector {
    pub(crate) fn new(context_id: u64, dim: usize, ciphertext: Ciphertext) -> Self {
        EncryptedVector {
            context_id,
            dim,
            ciphertext,
        }
    }

    /// Number of meaningful slots, fixed at encryption time.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    /// Remaining modulus-chain level.
    pub fn level(&self) -> usize {
        self.ciphertext.level
    }

    pub(crate) fn ciphertext(&self) -> &Ciphertext {
        &self.ciphertext
    }
}

/// Encrypts `values` under the context's public key.
///
/// Under `EXACT_INTEGER` every entry must already be an integer in
/// `[0, plaintextModulus)`; negative or fractional values fail with
/// `ValueOutOfRange` instead of being wrapped. Use [`quantize`] to map reals
/// into that range explicitly.
pub fn encrypt(ctx: &EncryptionContext, values: &[f64]) -> Result<EncryptedVector, HeRecError> {
    let backend = ctx.backend();
    let plain = backend.encode(values)?;
    let ciphertext = encryption::encrypt(
        ctx.params(),
        &ctx.keys().public_key,
        &plain,
        backend.fresh_scale(),
    )?;

    Ok(EncryptedVector::new(ctx.id(), values.len(), ciphertext))
}

/// Decrypts `vector`, which requires the owning context's secret key.
///
/// `APPROX_REAL` results are approximate; `EXACT_INTEGER` results are exact
/// residues in `[0, plaintextModulus)`.
pub fn decrypt(ctx: &EncryptionContext, vector: &EncryptedVector) -> Result<Vec<f64>, HeRecError> {
    ctx.check_owns(vector.context_id)?;
    let secret_key = ctx.secret_key()?;
    let noisy = encryption::decrypt(ctx.params(), secret_key, &vector.ciphertext)?;

    ctx.backend()
        .decode(&noisy, &vector.ciphertext, vector.dim)
}

/// Maps reals to residues modulo `t`: `round(v * factor)`, negatives wrapped
/// to `t - |x|`. Values whose magnitude reaches `t/2` cannot be recovered by
/// [`centered_lift`] and fail with `ValueOutOfRange`.
///
/// # Example
///
/// ```
/// # use he_recsys::codec::{centered_lift, quantize};
/// let q = quantize(&[1.25, -0.5], 100.0, 65537).unwrap();
/// assert_eq!(q, vec![125.0, 65487.0]);
/// assert_eq!(centered_lift(65487, 65537), -50);
/// ```
pub fn quantize(values: &[f64], factor: f64, t: u64) -> Result<Vec<f64>, HeRecError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(HeRecError::InvalidParameters(format!(
            "quantization factor must be positive, got {}",
            factor
        )));
    }
    let half = (t / 2) as f64;

    values
        .iter()
        .map(|&v| {
            let scaled = (v * factor).round();
            if !scaled.is_finite() || scaled.abs() > half {
                return Err(HeRecError::ValueOutOfRange(format!(
                    "{} quantizes to {} outside (-{}, {}]",
                    v, scaled, half, half
                )));
            }
            Ok(if scaled < 0.0 { scaled + t as f64 } else { scaled })
        })
        .collect()
}

/// Inverse of the wraparound in [`quantize`]: residues above `t/2` are read
/// as negatives.
pub fn centered_lift(value: u64, t: u64) -> i64 {
    let value = value % t;
    if value > t / 2 {
        value as i64 - t as i64
    } else {
        value as i64
    }
}
