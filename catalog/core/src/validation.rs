//! Input Validation
//!
//! Name and address checks applied before anything is written to a store.
//!
//! - Queue names: 1..=`max_queue_name_length` characters from `[A-Za-z0-9_-]`
//! - Project ids: 1..=`max_project_id_length` bytes, any characters
//! - Backend uris: `scheme://address` with an RFC 3986 scheme and a non-empty
//!   address

use crate::config::ValidationConfig;
use crate::error::{CatalogError, Result};

/// Check a queue name against the configured limits
///
/// # Errors
///
/// Returns [`CatalogError::InvalidQueueName`] when the name is empty, too long,
/// or contains characters outside `[A-Za-z0-9_-]`.
pub fn validate_queue_name(name: &str, limits: &ValidationConfig) -> Result<()> {
    let reject = |reason: String| {
        Err(CatalogError::InvalidQueueName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return reject("name is empty".to_string());
    }
    if name.len() > limits.max_queue_name_length {
        return reject(format!(
            "longer than {} characters",
            limits.max_queue_name_length
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return reject(format!("character {bad:?} is not allowed"));
    }
    Ok(())
}

/// Check a project id against the configured limits
///
/// # Errors
///
/// Returns [`CatalogError::InvalidProject`] when the id is empty or too long.
pub fn validate_project(project: &str, limits: &ValidationConfig) -> Result<()> {
    if project.is_empty() {
        return Err(CatalogError::InvalidProject("project id is empty".to_string()));
    }
    if project.len() > limits.max_project_id_length {
        return Err(CatalogError::InvalidProject(format!(
            "project id longer than {} characters",
            limits.max_project_id_length
        )));
    }
    Ok(())
}

/// Split a backend uri into `(scheme, address)`
///
/// Returns `None` unless the uri looks like `scheme://address`, where the
/// scheme starts with a letter and continues with letters, digits, `+`, `-`
/// or `.`, and the address is non-empty.
#[must_use]
pub fn split_uri(uri: &str) -> Option<(&str, &str)> {
    let (scheme, address) = uri.split_once("://")?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    if address.is_empty() {
        return None;
    }
    Some((scheme, address))
}
