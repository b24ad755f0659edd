//! Hybrid key switching with one special prime `P`.
//!
//! The input is split into its residues modulo each data prime of the level,
//! every residue is multiplied with the matching key component modulo
//! `Q_level * P`, and the sum is divided by `P`.

use num_bigint::BigInt;

use crate::errors::HeRecError;
use crate::params::EncryptionParams;
use crate::ring::Poly;

use super::ciphertext::Ciphertext;
use super::keys::{EvaluationKeys, KeySwitchKey};

/// Returns `(k0, k1)` with `k0 + k1*s ~ d*s' (mod Q_level)`.
pub fn switch_key(
    params: &EncryptionParams,
    key: &KeySwitchKey,
    d: &Poly,
    level: usize,
) -> Result<(Poly, Poly), HeRecError> {
    let q = params.modulus_at(level)?;
    let special = params.special_modulus();
    let qp = q * &special;
    let d = d.reduce(q);

    let mut acc0 = Poly::zero(params.degree);
    let mut acc1 = Poly::zero(params.degree);
    for (&prime, (b, a)) in params.data_primes[..=level]
        .iter()
        .zip(key.components.iter())
    {
        let r = d.reduce(&BigInt::from(prime));
        acc0 = acc0.add(&r.mul(&b.reduce(&qp)));
        acc1 = acc1.add(&r.mul(&a.reduce(&qp)));
    }

    let mod_down = |p: Poly| p.centered(&qp).div_round(&special).reduce(q);
    Ok((mod_down(acc0), mod_down(acc1)))
}

/// Folds the `s^2` component of a tensored ciphertext back onto `s`.
pub fn relinearize(
    params: &EncryptionParams,
    keys: &EvaluationKeys,
    d0: &Poly,
    d1: &Poly,
    d2: &Poly,
    level: usize,
    scale: f64,
) -> Result<Ciphertext, HeRecError> {
    let q = params.modulus_at(level)?;
    let (k0, k1) = switch_key(params, &keys.relin_key, d2, level)?;

    Ok(Ciphertext {
        c0: d0.add(&k0).reduce(q),
        c1: d1.add(&k1).reduce(q),
        level,
        scale,
    })
}

/// Applies `X -> X^galois_elt` to the encrypted plaintext, keeping the result
/// decryptable under the original secret key.
pub fn apply_galois(
    params: &EncryptionParams,
    keys: &EvaluationKeys,
    ct: &Ciphertext,
    galois_elt: usize,
) -> Result<Ciphertext, HeRecError> {
    let q = params.modulus_at(ct.level)?;
    let key = keys.galois_keys.get(galois_elt)?;

    let c0 = ct.c0.automorphism(galois_elt);
    let c1 = ct.c1.automorphism(galois_elt);
    let (k0, k1) = switch_key(params, key, &c1, ct.level)?;

    Ok(Ciphertext {
        c0: c0.add(&k0).reduce(q),
        c1: k1,
        level: ct.level,
        scale: ct.scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::params::SchemeConfig;
    use crate::rlwe::encryption::{decrypt, encrypt};
    use crate::rlwe::keys::{generate_keys, reversal_galois_element};

    #[test]
    fn test_galois_reverses_plaintext() -> Result<(), HeRecError> {
        let params = EncryptionParams::try_from_config(&SchemeConfig::approx_real(
            16,
            vec![60, 40, 40, 60],
            2f64.powi(30),
        ))?;
        let (sk, keys) = generate_keys(&params)?;

        let delta = 1i64 << 30;
        let mut plain = vec![0i64; 16];
        plain[0] = delta;
        plain[1] = 2 * delta;
        plain[2] = 3 * delta;
        let ct = encrypt(&params, &keys.public_key, &Poly::from_i64(&plain), delta as f64)?;

        let rotated = apply_galois(&params, &keys, &ct, reversal_galois_element(16))?;
        let q = params.modulus_at(rotated.level)?;
        let decrypted = decrypt(&params, &sk, &rotated)?.centered(q);

        // 1 + 2X + 3X^2 -> 1 - 3X^14 - 2X^15
        let expect = |i: usize, v: i64| {
            let diff = &decrypted.coeffs[i] - BigInt::from(v * delta);
            assert!(diff.magnitude() < &num_bigint::BigUint::from(1u64 << 20), "coeff {}", i);
        };
        expect(0, 1);
        expect(14, -3);
        expect(15, -2);
        expect(5, 0);
        Ok(())
    }
}
