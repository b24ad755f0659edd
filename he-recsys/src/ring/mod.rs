//! # Ring Arithmetic Module
//!
//! Provides the prime field [`Ring`] used for plaintext moduli and NTT primes,
//! and [`Poly`], an element of `Z[X]/(X^N + 1)` with arbitrary-precision
//! coefficients that every ciphertext component is built from.

pub mod math;
pub mod ntt;
pub mod poly;
pub mod primes;
pub mod sampling;

pub use math::Ring;
pub use poly::Poly;
