//! Exact negacyclic products through a multi-prime number-theoretic transform.
//!
//! Both operands are reduced modulo enough NTT-friendly primes to hold the
//! exact integer result, multiplied point-wise in the transformed domain and
//! recombined with the Chinese remainder theorem.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

use crate::errors::HeRecError;

use super::math::Ring;
use super::poly::Poly;
use super::primes::ntt_primes;

/// Primes prepared per degree; bounds the size of exact products
/// (`16 * 61` bits) this path can represent.
pub const MAX_NTT_PRIMES: usize = 16;
const NTT_PRIME_BITS: u64 = 61;

lazy_static! {
    static ref PLANS: Mutex<HashMap<usize, Arc<NttPlan>>> = Mutex::new(HashMap::new());
}

/// Transform tables for one prime. Powers of `psi` (a primitive `2n`-th root of
/// unity) are stored in bit-reversed order.
#[derive(Debug)]
struct PrimeTable {
    ring: Ring,
    psi_rev: Vec<u64>,
    psi_inv_rev: Vec<u64>,
    n_inv: u64,
}

#[derive(Debug)]
pub struct NttPlan {
    n: usize,
    tables: Vec<PrimeTable>,
}

fn bit_reverse(value: usize, bits: u32) -> usize {
    if bits == 0 {
        return 0;
    }
    value.reverse_bits() >> (usize::BITS - bits)
}

impl PrimeTable {
    fn new(prime: u64, n: usize) -> Result<Self, HeRecError> {
        let ring = Ring::try_with(prime)?;
        let psi = ring.primitive_root(2 * n as u64)?;
        let psi_inv = ring.inv(psi)?;
        let log_n = n.trailing_zeros();

        let mut psi_rev = vec![0u64; n];
        let mut psi_inv_rev = vec![0u64; n];
        let mut power = 1u64;
        let mut power_inv = 1u64;
        for i in 0..n {
            let r = bit_reverse(i, log_n);
            psi_rev[r] = power;
            psi_inv_rev[r] = power_inv;
            power = ring.mul(power, psi);
            power_inv = ring.mul(power_inv, psi_inv);
        }

        Ok(Self {
            ring,
            psi_rev,
            psi_inv_rev,
            n_inv: ring.inv(n as u64)?,
        })
    }

    /// Cooley-Tukey forward transform, natural order in, bit-reversed out.
    fn forward(&self, a: &mut [u64]) {
        let n = a.len();
        let mut t = n;
        let mut m = 1;
        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let s = self.psi_rev[m + i];
                for j in j1..j1 + t {
                    let u = a[j];
                    let v = self.ring.mul(a[j + t], s);
                    a[j] = self.ring.add(u, v);
                    a[j + t] = self.ring.sub(u, v);
                }
            }
            m <<= 1;
        }
    }

    /// Gentleman-Sande inverse transform, bit-reversed in, natural order out.
    fn inverse(&self, a: &mut [u64]) {
        let n = a.len();
        let mut t = 1;
        let mut m = n;
        while m > 1 {
            let h = m >> 1;
            let mut j1 = 0;
            for i in 0..h {
                let s = self.psi_inv_rev[h + i];
                for j in j1..j1 + t {
                    let u = a[j];
                    let v = a[j + t];
                    a[j] = self.ring.add(u, v);
                    a[j + t] = self.ring.mul(self.ring.sub(u, v), s);
                }
                j1 += 2 * t;
            }
            t <<= 1;
            m = h;
        }
        for x in a.iter_mut() {
            *x = self.ring.mul(*x, self.n_inv);
        }
    }

    fn residues(&self, poly: &Poly) -> Vec<u64> {
        let p = BigInt::from(self.ring.modulus());
        poly.coeffs
            .iter()
            .map(|c| c.mod_floor(&p).to_u64().unwrap_or_default())
            .collect()
    }

    /// Negacyclic product of two polynomials modulo this prime.
    fn multiply(&self, a: &Poly, b: &Poly) -> Vec<u64> {
        let mut fa = self.residues(a);
        let mut fb = self.residues(b);
        self.forward(&mut fa);
        self.forward(&mut fb);
        for (x, y) in fa.iter_mut().zip(fb.iter()) {
            *x = self.ring.mul(*x, *y);
        }
        self.inverse(&mut fa);
        fa
    }
}

impl NttPlan {
    pub fn new(n: usize, prime_count: usize) -> Result<Self, HeRecError> {
        if n < 2 || !n.is_power_of_two() {
            return Err(HeRecError::InvalidParameters(format!(
                "NTT size must be a power of two, got {}",
                n
            )));
        }

        let tables = ntt_primes(n, prime_count)?
            .into_iter()
            .map(|p| PrimeTable::new(p, n))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { n, tables })
    }

    /// Shared plan for degree `n`, built on first use.
    pub fn for_degree(n: usize) -> Result<Arc<NttPlan>, HeRecError> {
        let mut plans = PLANS
            .lock()
            .map_err(|_| HeRecError::InternalError("NTT plan cache poisoned".into()))?;

        if let Some(plan) = plans.get(&n) {
            return Ok(plan.clone());
        }

        log::debug!("Preparing NTT plan for degree {}", n);
        let plan = Arc::new(NttPlan::new(n, MAX_NTT_PRIMES)?);
        plans.insert(n, plan.clone());
        Ok(plan)
    }

    /// Exact product, or `None` when the result would not fit the prepared primes.
    pub fn multiply(&self, a: &Poly, b: &Poly) -> Option<Poly> {
        if a.degree() != self.n || b.degree() != self.n {
            return None;
        }

        // |c_k| <= n * max|a| * max|b|; one extra bit for the sign.
        let needed_bits = a.max_abs().bits() + b.max_abs().bits() + self.n.trailing_zeros() as u64 + 2;
        let count = needed_bits.div_ceil(NTT_PRIME_BITS).max(1) as usize;
        if count > self.tables.len() {
            return None;
        }
        let tables = &self.tables[..count];

        let residues: Vec<Vec<u64>> = tables.iter().map(|t| t.multiply(a, b)).collect();

        // CRT basis: x = sum r_i * (M/p_i) * [(M/p_i)^-1]_{p_i} mod M
        let modulus = tables
            .iter()
            .fold(BigInt::one(), |acc, t| acc * BigInt::from(t.ring.modulus()));
        let half = &modulus >> 1u32;
        let mut basis = Vec::with_capacity(count);
        for t in tables {
            let p = BigInt::from(t.ring.modulus());
            let cofactor = &modulus / &p;
            let cofactor_mod_p = cofactor.mod_floor(&p).to_u64()?;
            let inv = t.ring.inv(cofactor_mod_p).ok()?;
            basis.push(cofactor * BigInt::from(inv));
        }

        let coeffs = (0..self.n)
            .map(|k| {
                let mut x = BigInt::zero();
                for (r, e) in residues.iter().zip(basis.iter()) {
                    x += e * BigInt::from(r[k]);
                }
                let x = x.mod_floor(&modulus);
                if x > half { x - &modulus } else { x }
            })
            .collect();

        Some(Poly { coeffs })
    }
}

/// Exact negacyclic product through the shared plan for the operands' degree.
pub fn negacyclic_product(a: &Poly, b: &Poly) -> Option<Poly> {
    let plan = NttPlan::for_degree(a.degree()).ok()?;
    plan.multiply(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;
    use rand::Rng;

    fn random_poly(n: usize, bits: u32) -> Poly {
        let mut rng = rand::rng();
        let coeffs = (0..n)
            .map(|_| {
                let mut c = BigInt::from(rng.random::<u64>());
                for _ in 1..bits.div_ceil(64) {
                    c = (c << 64) + BigInt::from(rng.random::<u64>());
                }
                if rng.random::<bool>() { -c } else { c }
            })
            .collect();
        Poly { coeffs }
    }

    #[test]
    fn test_forward_inverse_identity() -> Result<(), HeRecError> {
        let plan = NttPlan::new(16, 1)?;
        let table = &plan.tables[0];
        let original: Vec<u64> = (0..16u64).map(|i| i * 1_000_003 + 7).collect();
        let mut data = original.clone();
        table.forward(&mut data);
        table.inverse(&mut data);
        assert_eq!(data, original);
        Ok(())
    }

    #[test]
    fn test_ntt_matches_schoolbook_big_coefficients() -> Result<(), HeRecError> {
        let n = 128;
        let plan = NttPlan::new(n, MAX_NTT_PRIMES)?;
        let a = random_poly(n, 240);
        let b = random_poly(n, 180);

        let expected = a.mul_schoolbook(&b);
        let actual = plan.multiply(&a, &b).ok_or_else(|| {
            HeRecError::InternalError("product unexpectedly exceeded plan".into())
        })?;
        assert_eq!(actual, expected);
        Ok(())
    }

    #[test]
    fn test_poly_mul_dispatches_to_ntt() {
        let n = 256;
        let a = random_poly(n, 64);
        let b = random_poly(n, 64);
        assert_eq!(a.mul(&b), a.mul_schoolbook(&b));
    }

    #[test]
    fn test_oversized_product_is_rejected() -> Result<(), HeRecError> {
        let plan = NttPlan::new(8, 1)?;
        let a = random_poly(8, 128);
        assert!(plan.multiply(&a, &a).is_none());
        Ok(())
    }

    #[quickcheck]
    fn prop_ntt_matches_schoolbook(a: Vec<i64>, b: Vec<i64>) -> TestResult {
        let n = 64;
        if a.is_empty() || b.is_empty() {
            return TestResult::discard();
        }
        let pad = |v: &[i64]| Poly::from_i64(&(0..n).map(|i| v[i % v.len()]).collect::<Vec<_>>());
        let (pa, pb) = (pad(&a), pad(&b));

        let Ok(plan) = NttPlan::for_degree(n) else {
            return TestResult::error("NTT plan construction failed");
        };
        match plan.multiply(&pa, &pb) {
            Some(product) => TestResult::from_bool(product == pa.mul_schoolbook(&pb)),
            None => TestResult::failed(),
        }
    }
}
