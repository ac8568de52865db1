//! Profile naming rules
//!
//! Profiles are turned into CMake build types (`thread-sanitizer` becomes
//! `THREAD_SANITIZER`), so their names are restricted to characters that survive
//! that transformation unambiguously.

use crate::{Result, TaskError};

/// Whether `profile` only uses lowercase ASCII letters, digits and hyphens
pub fn is_valid_profile(profile: &str) -> bool {
    !profile.is_empty()
        && profile
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Reject profile names that cannot be mapped to a build type
pub fn validate_profile(profile: &str) -> Result<()> {
    if is_valid_profile(profile) {
        Ok(())
    } else {
        Err(TaskError::InvalidProfile(profile.to_string()))
    }
}

/// Derive the build-type identifier for a profile
///
/// # Errors
///
/// Returns [`TaskError::InvalidProfile`] if the name contains anything other than
/// lowercase letters, digits and hyphens.
pub fn build_type(profile: &str) -> Result<String> {
    validate_profile(profile)?;
    Ok(profile.replace('-', "_").to_ascii_uppercase())
}
