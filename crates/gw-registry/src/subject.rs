use crate::error::RegistryError;

/// Trims a client-supplied subject and rejects it if nothing is left.
///
/// Subjects are opaque to the registry: no wildcard expansion, no
/// dot-segment validation. The bus decides what a subject means.
pub fn normalize_subject(raw: &str) -> Result<String, RegistryError> {
	let trimmed = raw.trim();
	if trimmed.is_empty() {
		return Err(RegistryError::InvalidSubject);
	}
	Ok(trimmed.to_string())
}
