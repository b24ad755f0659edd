//! Ring-LWE building blocks shared by both schemes: ciphertexts, key material,
//! public-key encryption and key switching.

pub mod ciphertext;
pub mod encryption;
pub mod keys;
pub mod keyswitch;

pub use ciphertext::Ciphertext;
pub use keys::{EvaluationKeys, SecretKey};
