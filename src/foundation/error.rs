pub type NoisefieldResult<T> = Result<T, NoisefieldError>;

#[derive(thiserror::Error, Debug)]
pub enum NoisefieldError {
    #[error("surface error: {0}")]
    Surface(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NoisefieldError {
    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            NoisefieldError::surface("x")
                .to_string()
                .contains("surface error:")
        );
        assert!(
            NoisefieldError::validation("x")
                .to_string()
                .contains("validation error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = NoisefieldError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
