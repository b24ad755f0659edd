use std::sync::OnceLock;

use he_recsys::codec::{decrypt, encrypt};
use he_recsys::{EncryptionContext, HeRecError, Scalar, SchemeConfig, create_context};

use quickcheck::{QuickCheck, TestResult};

const T: u64 = 1032193;

fn approx() -> &'static EncryptionContext {
    static CTX: OnceLock<EncryptionContext> = OnceLock::new();
    CTX.get_or_init(|| {
        create_context(&SchemeConfig::approx_real(32, vec![60, 40, 40, 60], 2f64.powi(40)))
            .unwrap_or_else(|e| panic!("context: {}", e))
    })
}

fn exact() -> &'static EncryptionContext {
    static CTX: OnceLock<EncryptionContext> = OnceLock::new();
    CTX.get_or_init(|| {
        create_context(&SchemeConfig::exact_integer(32, T))
            .unwrap_or_else(|e| panic!("context: {}", e))
    })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-3 * b.abs().max(1.0)
}

fn to_reals(raw: &[i32]) -> Vec<f64> {
    raw.iter().take(32).map(|&x| x as f64 / 1000.0).collect()
}

#[test]
fn approx_round_trip() {
    fn prop(raw: Vec<i32>) -> TestResult {
        let values = to_reals(&raw);
        match encrypt(approx(), &values).and_then(|v| decrypt(approx(), &v)) {
            Ok(out) => TestResult::from_bool(
                out.len() == values.len() && out.iter().zip(&values).all(|(&a, &b)| close(a, b)),
            ),
            Err(e) => TestResult::error(e.to_string()),
        }
    }
    QuickCheck::new()
        .tests(25)
        .quickcheck(prop as fn(Vec<i32>) -> TestResult);
}

#[test]
fn approx_additivity() {
    fn prop(a: Vec<i32>, b: Vec<i32>) -> TestResult {
        let len = a.len().min(b.len());
        let (va, vb) = (to_reals(&a[..len]), to_reals(&b[..len]));
        let ctx = approx();

        let run = || -> Result<Vec<f64>, HeRecError> {
            let sum = ctx.add(&encrypt(ctx, &va)?, &encrypt(ctx, &vb)?)?;
            decrypt(ctx, &sum)
        };
        match run() {
            Ok(out) => TestResult::from_bool(
                out.iter()
                    .zip(va.iter().zip(&vb))
                    .all(|(&s, (&x, &y))| close(s, x + y)),
            ),
            Err(e) => TestResult::error(e.to_string()),
        }
    }
    QuickCheck::new()
        .tests(25)
        .quickcheck(prop as fn(Vec<i32>, Vec<i32>) -> TestResult);
}

#[test]
fn exact_round_trip() {
    fn prop(raw: Vec<u32>) -> TestResult {
        let values: Vec<f64> = raw.iter().take(32).map(|&x| (x as u64 % T) as f64).collect();
        match encrypt(exact(), &values).and_then(|v| decrypt(exact(), &v)) {
            Ok(out) => TestResult::from_bool(out == values),
            Err(e) => TestResult::error(e.to_string()),
        }
    }
    QuickCheck::new()
        .tests(25)
        .quickcheck(prop as fn(Vec<u32>) -> TestResult);
}

#[test]
fn exact_scalar_by_reciprocal() {
    fn prop(raw: Vec<u32>, n: u32) -> TestResult {
        let n = n as u64 % T;
        if n == 0 || raw.is_empty() {
            return TestResult::discard();
        }
        let ctx = exact();
        let values: Vec<u64> = raw.iter().take(32).map(|&x| x as u64 % T).collect();
        let reals: Vec<f64> = values.iter().map(|&x| x as f64).collect();

        let run = || -> Result<(u64, Vec<f64>), HeRecError> {
            let Scalar::Modular(inv) = ctx.reciprocal(n)? else {
                return Err(HeRecError::InternalError("expected a modular scalar".into()));
            };
            let scaled = ctx.multiply_scalar(&encrypt(ctx, &reals)?, Scalar::Modular(inv))?;
            Ok((inv, decrypt(ctx, &scaled)?))
        };
        match run() {
            Ok((inv, out)) => {
                let mulmod = |a: u64, b: u64| (a as u128 * b as u128 % T as u128) as u64;
                TestResult::from_bool(
                    mulmod(n, inv) == 1
                        && out
                            .iter()
                            .zip(&values)
                            .all(|(&o, &v)| o as u64 == mulmod(v, inv)),
                )
            }
            Err(e) => TestResult::error(e.to_string()),
        }
    }
    QuickCheck::new()
        .tests(25)
        .quickcheck(prop as fn(Vec<u32>, u32) -> TestResult);
}

#[test]
fn approx_scalar_needs_a_level() -> Result<(), HeRecError> {
    let ctx = create_context(&SchemeConfig::approx_real(16, vec![60, 60], 2f64.powi(40)))?;
    let v = encrypt(&ctx, &[1.0])?;
    assert!(matches!(
        ctx.multiply_scalar(&v, Scalar::Real(0.5)),
        Err(HeRecError::ModulusChainExhausted(_))
    ));
    Ok(())
}
