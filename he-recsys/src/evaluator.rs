//! Homomorphic operations on [`EncryptedVector`]s: zero, add, scalar
//! multiply and dot product. None of them needs the secret key.

use crate::codec::EncryptedVector;
use crate::context::EncryptionContext;
use crate::errors::HeRecError;
use crate::rlwe::Ciphertext;
use crate::rlwe::keys::reversal_galois_element;
use crate::rlwe::keyswitch::apply_galois;
use crate::scheme::{Scalar, check_fits};

impl EncryptionContext {
    /// Additive identity of dimension `dim`: a noiseless encryption of zeros
    /// at the top level with the fresh scale.
    pub fn zero(&self, dim: usize) -> Result<EncryptedVector, HeRecError> {
        check_fits(self.params(), dim)?;
        let ciphertext = Ciphertext::transparent_zero(
            self.params().degree,
            self.params().max_level(),
            self.backend().fresh_scale(),
        );
        Ok(EncryptedVector::new(self.id(), dim, ciphertext))
    }

    pub fn add(
        &self,
        a: &EncryptedVector,
        b: &EncryptedVector,
    ) -> Result<EncryptedVector, HeRecError> {
        self.check_pair(a, b)?;
        let sum = self.backend().add(a.ciphertext(), b.ciphertext())?;
        Ok(EncryptedVector::new(self.id(), a.dim(), sum))
    }

    pub fn multiply_scalar(
        &self,
        v: &EncryptedVector,
        scalar: Scalar,
    ) -> Result<EncryptedVector, HeRecError> {
        self.check_owns(v.context_id())?;
        let product = self.backend().multiply_scalar(v.ciphertext(), scalar)?;
        Ok(EncryptedVector::new(self.id(), v.dim(), product))
    }

    /// Encrypted `sum_i u_i * v_i`, returned as a vector of dimension 1.
    ///
    /// `v` is mapped through `X -> X^-1`, which puts `v_i` on `X^-i`; the
    /// constant coefficient of `u * v(X^-1)` is then the inner product.
    pub fn dot(
        &self,
        u: &EncryptedVector,
        v: &EncryptedVector,
    ) -> Result<EncryptedVector, HeRecError> {
        self.check_pair(u, v)?;
        let reversed = apply_galois(
            self.params(),
            self.keys(),
            v.ciphertext(),
            reversal_galois_element(self.params().degree),
        )?;
        let product = self
            .backend()
            .multiply(self.keys(), u.ciphertext(), &reversed)?;
        Ok(EncryptedVector::new(self.id(), 1, product))
    }

    fn check_pair(&self, a: &EncryptedVector, b: &EncryptedVector) -> Result<(), HeRecError> {
        self.check_owns(a.context_id())?;
        self.check_owns(b.context_id())?;
        if a.dim() != b.dim() {
            return Err(HeRecError::DimensionMismatch(format!(
                "operands have dimensions {} and {}",
                a.dim(),
                b.dim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::{decrypt, encrypt};
    use crate::context::{EncryptionContext, create_context};
    use crate::errors::HeRecError;
    use crate::params::SchemeConfig;
    use crate::scheme::Scalar;

    use quickcheck::{QuickCheck, TestResult};
    use std::sync::OnceLock;

    fn approx() -> Result<EncryptionContext, HeRecError> {
        create_context(&SchemeConfig::approx_real(32, vec![60, 40, 40, 60], 2f64.powi(40)))
    }

    fn exact() -> &'static EncryptionContext {
        static CTX: OnceLock<EncryptionContext> = OnceLock::new();
        CTX.get_or_init(|| {
            create_context(&SchemeConfig::exact_integer(16, 65537))
                .unwrap_or_else(|e| panic!("context: {}", e))
        })
    }

    #[test]
    fn test_zero_decrypts_to_zeros() -> Result<(), HeRecError> {
        let ctx = approx()?;
        let zero = ctx.zero(4)?;
        assert_eq!(decrypt(&ctx, &zero)?, vec![0.0; 4]);
        assert!(matches!(ctx.zero(33), Err(HeRecError::DimensionMismatch(_))));
        Ok(())
    }

    #[test]
    fn test_dot_approx() -> Result<(), HeRecError> {
        let ctx = approx()?;
        let u = encrypt(&ctx, &[1.0, 2.0, -0.5])?;
        let v = encrypt(&ctx, &[4.0, 0.25, 2.0])?;
        let d = ctx.dot(&u, &v)?;

        assert_eq!(d.dim(), 1);
        let score = decrypt(&ctx, &d)?[0];
        assert!((score - 3.5).abs() < 1e-3, "got {}", score);
        Ok(())
    }

    #[test]
    fn test_dot_after_scalar_multiply() -> Result<(), HeRecError> {
        let ctx = approx()?;
        let u = encrypt(&ctx, &[1.0, 0.0])?;
        let v = encrypt(&ctx, &[4.0, 0.0])?;
        let half = ctx.multiply_scalar(&v, Scalar::Real(0.5))?;
        assert_eq!(half.level(), v.level() - 1);
        let dot = ctx.dot(&u, &half)?;
        assert_eq!(dot.level(), 0);
        let score = decrypt(&ctx, &dot)?[0];
        assert!((score - 2.0).abs() < 1e-3, "got {}", score);
        Ok(())
    }

    #[test]
    fn test_dot_exact() -> Result<(), HeRecError> {
        let ctx = exact();
        let u = encrypt(ctx, &[1.0, 2.0, 3.0])?;
        let v = encrypt(ctx, &[4.0, 5.0, 6.0])?;
        assert_eq!(decrypt(ctx, &ctx.dot(&u, &v)?)?, vec![32.0]);
        Ok(())
    }

    #[test]
    fn test_dimension_mismatch() -> Result<(), HeRecError> {
        let ctx = exact();
        let u = encrypt(ctx, &[1.0, 2.0])?;
        let v = encrypt(ctx, &[1.0])?;
        assert!(matches!(ctx.add(&u, &v), Err(HeRecError::DimensionMismatch(_))));
        assert!(matches!(ctx.dot(&u, &v), Err(HeRecError::DimensionMismatch(_))));
        Ok(())
    }

    #[test]
    fn test_foreign_operand_rejected() -> Result<(), HeRecError> {
        let ctx = exact();
        let other = create_context(&SchemeConfig::exact_integer(16, 65537))?;
        let u = encrypt(ctx, &[1.0])?;
        let v = encrypt(&other, &[1.0])?;
        assert!(matches!(ctx.add(&u, &v), Err(HeRecError::ContextMismatch(_))));
        Ok(())
    }

    #[test]
    fn prop_additivity_exact() {
        fn prop(a: Vec<u16>, b: Vec<u16>) -> TestResult {
            let len = a.len().min(b.len()).min(16);
            if len == 0 {
                return TestResult::discard();
            }
            let ctx = exact();
            let va: Vec<f64> = a[..len].iter().map(|&x| x as f64).collect();
            let vb: Vec<f64> = b[..len].iter().map(|&x| x as f64).collect();

            let result = encrypt(ctx, &va)
                .and_then(|ea| encrypt(ctx, &vb).map(|eb| (ea, eb)))
                .and_then(|(ea, eb)| ctx.add(&ea, &eb))
                .and_then(|sum| decrypt(ctx, &sum));
            match result {
                Ok(sum) => TestResult::from_bool(
                    sum.iter()
                        .zip(va.iter().zip(vb.iter()))
                        .all(|(&s, (&x, &y))| s as u64 == (x as u64 + y as u64) % 65537),
                ),
                Err(e) => TestResult::error(e.to_string()),
            }
        }
        QuickCheck::new()
            .tests(20)
            .quickcheck(prop as fn(Vec<u16>, Vec<u16>) -> TestResult);
    }
}
