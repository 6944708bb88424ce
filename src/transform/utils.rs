//! Skip rules shared by both transform directions

use super::TransformOptions;
use crate::metadata::{ClassMetadata, PropertyMetadata};
use std::collections::BTreeSet;

fn overlaps(requested: &[String], declared: &BTreeSet<String>) -> bool {
    requested.iter().any(|g| declared.contains(g))
}

/// Whether a property is dropped by its exclusion or group rules
///
/// An excluded property survives only when one of its groups is requested.
/// With a group filter active, a property carrying groups survives only when
/// one of them is requested. Properties without metadata are never dropped
/// here.
pub fn should_exclude_property(
    property: Option<&PropertyMetadata>,
    options: &TransformOptions,
) -> bool {
    let Some(property) = property else {
        return false;
    };
    let requested = options.groups.as_deref();

    if property.is_excluded()
        && (property.groups().is_empty()
            || !requested.is_some_and(|r| overlaps(r, property.groups())))
    {
        return true;
    }

    matches!(requested, Some(r) if !property.groups().is_empty() && !overlaps(r, property.groups()))
}

/// Whether undeclared keys are dropped; the option overrides the schema flag
pub fn should_exclude_extraneous(options: &TransformOptions, class: Option<&ClassMetadata>) -> bool {
    options
        .exclude_extraneous_values
        .unwrap_or_else(|| class.is_some_and(ClassMetadata::exclude_extraneous_values))
}
