use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
	#[error("subject must be non-empty after trimming")]
	InvalidSubject,
}
