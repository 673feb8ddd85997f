use chatdigest_core::error::ProviderError;
use thiserror::Error;

/// Why a summary could not be produced.
#[derive(Debug, Clone, Error)]
pub enum SummarizeError {
    /// The inference backend was unreachable or returned an error.
    #[error("Inference service unavailable: {0}")]
    ServiceUnavailable(#[from] ProviderError),

    /// The backend answered with blank output.
    #[error("Inference service returned an empty summary")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_convert() {
        let err: SummarizeError = ProviderError::ModelNotFound("mistral".into()).into();
        assert!(err.to_string().contains("mistral"));
    }
}
