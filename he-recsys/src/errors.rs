#[derive(thiserror::Error, Debug)]
pub enum HeRecError {
    /// Scheme configuration is malformed, incomplete or belongs to the other scheme.
    #[error("InvalidParameters: {0}")]
    InvalidParameters(String),
    /// A plaintext value cannot be represented under the active scheme
    /// (negative, fractional or too large for the exact plaintext modulus, or non-finite).
    #[error("ValueOutOfRange: {0}")]
    ValueOutOfRange(String),
    /// An edge or node registration would join two nodes of the same class.
    #[error("CrossClassViolation: {0}")]
    CrossClassViolation(String),
    #[error("UnknownNode: {0}")]
    UnknownNode(String),
    /// Operands of differing length, or a vector that does not fit the ring.
    #[error("DimensionMismatch: {0}")]
    DimensionMismatch(String),
    #[error("MissingSecretKey: decryption requires a context holding the secret key")]
    MissingSecretKey,
    /// Operands produced under different context instances.
    #[error("ContextMismatch: {0}")]
    ContextMismatch(String),
    #[error("ScaleMismatch: {0}")]
    ScaleMismatch(String),
    /// A rescale was needed but the ciphertext already sits on the last data prime.
    #[error("ModulusChainExhausted: {0}")]
    ModulusChainExhausted(String),
    /// Error when trying to find a modular inverse that doesn't exist.
    #[error("NoInverse: {0}")]
    NoInverse(String),
    #[error("InternalError: {0}")]
    InternalError(String),

    #[error("Data serialization: {0}")]
    SerializationError(#[from] serde_json::Error),
}
