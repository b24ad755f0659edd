use crate::errors::HeRecError;
use crate::params::EncryptionParams;
use crate::ring::Poly;
use crate::ring::sampling::{sample_error, sample_ternary};

use super::ciphertext::Ciphertext;
use super::keys::{PublicKey, SecretKey};

/// Public-key encryption of an already encoded plaintext at the top level.
pub fn encrypt(
    params: &EncryptionParams,
    public_key: &PublicKey,
    plain: &Poly,
    scale: f64,
) -> Result<Ciphertext, HeRecError> {
    let q = params.data_modulus();
    let u = sample_ternary(params.degree);
    let e0 = sample_error(params.degree)?;
    let e1 = sample_error(params.degree)?;

    let c0 = public_key.b.mul(&u).add(&e0).add(plain).reduce(q);
    let c1 = public_key.a.mul(&u).add(&e1).reduce(q);

    Ok(Ciphertext {
        c0,
        c1,
        level: params.max_level(),
        scale,
    })
}

/// `c0 + c1*s mod Q_level`, coefficients in `[0, Q_level)`.
pub fn decrypt(
    params: &EncryptionParams,
    secret_key: &SecretKey,
    ct: &Ciphertext,
) -> Result<Poly, HeRecError> {
    let q = params.modulus_at(ct.level)?;
    Ok(ct.c0.add(&ct.c1.mul(&secret_key.poly)).reduce(q))
}
