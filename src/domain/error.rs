use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("identifier `{input}` is not a username, account uuid or internal id")]
    InvalidIdentifier { input: String },
}

impl DomainError {
    pub fn invalid_identifier(input: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            input: input.into(),
        }
    }
}
