//! Encryption context: validated parameters, the selected backend and the key
//! material, shared by reference with every operation.

use std::fmt;
use std::sync::Arc;

use rand::random;

use crate::errors::HeRecError;
use crate::params::{EncryptionParams, Scheme, SchemeConfig};
use crate::rlwe::keys::generate_keys;
use crate::rlwe::{EvaluationKeys, SecretKey};
use crate::scheme::{HomomorphicScheme, Scalar, scheme_for};

/// Owns (or, for a public view, borrows through `Arc`) everything one
/// encrypted computation needs.
///
/// Cloning is cheap and keeps the identity: clones and public views of one
/// context interoperate, independently created contexts never do.
#[derive(Clone)]
pub struct EncryptionContext {
    id: u64,
    params: Arc<EncryptionParams>,
    scheme: Arc<dyn HomomorphicScheme>,
    keys: Arc<EvaluationKeys>,
    secret_key: Option<Arc<SecretKey>>,
}

/// Validates `config`, derives the modulus chain and generates fresh keys,
/// including the relinearization and Galois keys the dot product needs.
///
/// # Errors
///
/// `HeRecError::InvalidParameters` when the configuration does not describe a
/// usable instance of its scheme.
pub fn create_context(config: &SchemeConfig) -> Result<EncryptionContext, HeRecError> {
    let params = Arc::new(EncryptionParams::try_from_config(config)?);
    let scheme = scheme_for(params.clone())?;

    log::debug!(
        "Creating {} context: degree {}, {} data primes, special prime {} bits",
        params.scheme,
        params.degree,
        params.data_primes.len(),
        64 - params.special_prime.leading_zeros()
    );

    let (secret_key, keys) = generate_keys(&params)?;
    let id = random::<u64>();
    log::info!("Context {:016x} ready ({})", id, params.scheme);

    Ok(EncryptionContext {
        id,
        params,
        scheme,
        keys: Arc::new(keys),
        secret_key: Some(Arc::new(secret_key)),
    })
}

impl EncryptionContext {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn scheme(&self) -> Scheme {
        self.params.scheme
    }

    pub fn params(&self) -> &EncryptionParams {
        &self.params
    }

    pub fn has_secret_key(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Same identity and evaluation keys, no secret key. Safe to hand to the
    /// aggregation and scoring side.
    pub fn public_view(&self) -> EncryptionContext {
        EncryptionContext {
            secret_key: None,
            ..self.clone()
        }
    }

    /// `1/n` for the approximate scheme, `n^-1 mod t` for the exact one.
    ///
    /// # Errors
    ///
    /// `HeRecError::NoInverse` when `n` is 0 (or a multiple of `t`).
    pub fn reciprocal(&self, n: u64) -> Result<Scalar, HeRecError> {
        self.scheme.reciprocal(n)
    }

    /// Plaintext modulus of the exact scheme.
    pub fn plaintext_modulus(&self) -> Option<u64> {
        self.params.plaintext.map(|ring| ring.modulus())
    }

    pub(crate) fn backend(&self) -> &dyn HomomorphicScheme {
        self.scheme.as_ref()
    }

    pub(crate) fn keys(&self) -> &EvaluationKeys {
        &self.keys
    }

    pub(crate) fn secret_key(&self) -> Result<&SecretKey, HeRecError> {
        self.secret_key
            .as_deref()
            .ok_or(HeRecError::MissingSecretKey)
    }

    pub(crate) fn check_owns(&self, context_id: u64) -> Result<(), HeRecError> {
        if context_id != self.id {
            return Err(HeRecError::ContextMismatch(format!(
                "vector belongs to context {:016x}, operation runs under {:016x}",
                context_id, self.id
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("id", &format_args!("{:016x}", self.id))
            .field("scheme", &self.params.scheme)
            .field("degree", &self.params.degree)
            .field("data_primes", &self.params.data_primes)
            .field("has_secret_key", &self.has_secret_key())
            .finish()
    }
}
