use num_bigint::BigInt;

use crate::errors::HeRecError;
use crate::params::EncryptionParams;
use crate::ring::Poly;

/// A pair `(c0, c1)` with `c0 + c1 * s = m + e (mod Q_level)`.
///
/// `scale` is the factor the plaintext carries; the exact scheme keeps it at 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Ciphertext {
    pub c0: Poly,
    pub c1: Poly,
    pub level: usize,
    pub scale: f64,
}

impl Ciphertext {
    /// Encryption of zero without randomness; the additive identity.
    pub fn transparent_zero(degree: usize, level: usize, scale: f64) -> Self {
        Ciphertext {
            c0: Poly::zero(degree),
            c1: Poly::zero(degree),
            level,
            scale,
        }
    }

    pub fn degree(&self) -> usize {
        self.c0.degree()
    }

    /// Drops to a lower level by plain reduction; `Q_level` divides the
    /// current modulus so the decryption equation survives unchanged.
    pub fn mod_switch_to(
        &self,
        params: &EncryptionParams,
        level: usize,
    ) -> Result<Ciphertext, HeRecError> {
        if level > self.level {
            return Err(HeRecError::InternalError(format!(
                "Cannot switch from level {} up to level {}",
                self.level, level
            )));
        }
        if level == self.level {
            return Ok(self.clone());
        }

        let q = params.modulus_at(level)?;
        Ok(Ciphertext {
            c0: self.c0.reduce(q),
            c1: self.c1.reduce(q),
            level,
            scale: self.scale,
        })
    }

    /// Divides by the top prime of the current level with rounding, moving
    /// one level down and dividing the scale by that prime.
    pub fn rescale(&self, params: &EncryptionParams) -> Result<Ciphertext, HeRecError> {
        if self.level == 0 {
            return Err(HeRecError::ModulusChainExhausted(
                "ciphertext already sits on the last data prime".to_string(),
            ));
        }

        let q_level = params.modulus_at(self.level)?;
        let q_next = params.modulus_at(self.level - 1)?;
        let prime = params.data_primes[self.level];
        let divisor = BigInt::from(prime);

        let rescale = |p: &Poly| p.centered(q_level).div_round(&divisor).reduce(q_next);

        Ok(Ciphertext {
            c0: rescale(&self.c0),
            c1: rescale(&self.c1),
            level: self.level - 1,
            scale: self.scale / prime as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::params::SchemeConfig;

    #[test]
    fn test_mod_switch_rejects_upward() -> Result<(), HeRecError> {
        let params = EncryptionParams::try_from_config(&SchemeConfig::approx_real(
            16,
            vec![60, 40, 40, 60],
            2f64.powi(30),
        ))?;
        let zero = Ciphertext::transparent_zero(16, 1, 1.0);
        assert!(zero.mod_switch_to(&params, 2).is_err());
        assert_eq!(zero.mod_switch_to(&params, 0)?.level, 0);
        Ok(())
    }

    #[test]
    fn test_rescale_at_bottom_is_exhausted() -> Result<(), HeRecError> {
        let params = EncryptionParams::try_from_config(&SchemeConfig::approx_real(
            16,
            vec![60, 40, 60],
            2f64.powi(30),
        ))?;
        let zero = Ciphertext::transparent_zero(16, 0, 2f64.powi(30));
        assert!(matches!(
            zero.rescale(&params),
            Err(HeRecError::ModulusChainExhausted(_))
        ));
        Ok(())
    }
}
