//! Checks that must hold before a devfile can be flattened

use semver::Version;

use super::{CreateFailure, StageResult};
use crate::domain::devfile::{scalar_to_string, DevfileDocument};

/// The only devfile schema version workspaces are created from
pub const REQUIRED_DEVFILE_SCHEMA_VERSION: &str = "2.2.0";

pub fn validate(devfile: &DevfileDocument) -> StageResult<()> {
    validate_schema_version(devfile)?;
    validate_parent(devfile)?;
    Ok(())
}

fn validate_schema_version(devfile: &DevfileDocument) -> Result<(), CreateFailure> {
    let raw = devfile
        .get("schemaVersion")
        .map(scalar_to_string)
        .unwrap_or_default();

    let Some(version) = parse_version(&raw) else {
        return Err(CreateFailure::PreFlattenDevfileValidationFailed(format!(
            "Invalid 'schemaVersion' '{}'",
            raw
        )));
    };

    let required = Version::new(2, 2, 0);
    if version != required {
        return Err(CreateFailure::PreFlattenDevfileValidationFailed(format!(
            "'schemaVersion' '{}' is not supported, it must be '{}'",
            raw, REQUIRED_DEVFILE_SCHEMA_VERSION
        )));
    }

    Ok(())
}

/// Parse a version leniently, accepting `major.minor` as `major.minor.0`
fn parse_version(raw: &str) -> Option<Version> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    Version::parse(raw)
        .ok()
        .or_else(|| Version::parse(&format!("{}.0", raw)).ok())
}

fn validate_parent(devfile: &DevfileDocument) -> Result<(), CreateFailure> {
    if devfile.get("parent").is_some() {
        return Err(CreateFailure::PreFlattenDevfileValidationFailed(
            "Inheriting from 'parent' is not yet supported".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::create::StageError;

    fn message(yaml: &str) -> Option<String> {
        let devfile = DevfileDocument::parse(yaml).expect("Failed to parse devfile");
        match validate(&devfile) {
            Ok(()) => None,
            Err(StageError::Failed(CreateFailure::PreFlattenDevfileValidationFailed(m))) => Some(m),
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    #[test]
    fn test_supported_version_passes() {
        assert_eq!(message("schemaVersion: 2.2.0\ncomponents: []\n"), None);
        assert_eq!(message("schemaVersion: '2.2.0'\n"), None);
    }

    #[test]
    fn test_other_versions_are_not_supported() {
        assert_eq!(
            message("schemaVersion: 2.1.0\n").as_deref(),
            Some("'schemaVersion' '2.1.0' is not supported, it must be '2.2.0'")
        );
        assert_eq!(
            message("schemaVersion: 2.3.0-alpha\n").as_deref(),
            Some("'schemaVersion' '2.3.0-alpha' is not supported, it must be '2.2.0'")
        );
    }

    #[test]
    fn test_short_version_is_padded() {
        // YAML reads 2.2 as a float, rendered back as "2.2"
        assert_eq!(message("schemaVersion: 2.2\n"), None);
        assert_eq!(
            message("schemaVersion: 2.1\n").as_deref(),
            Some("'schemaVersion' '2.1' is not supported, it must be '2.2.0'")
        );
    }

    #[test]
    fn test_invalid_versions() {
        assert_eq!(
            message("schemaVersion: example\n").as_deref(),
            Some("Invalid 'schemaVersion' 'example'")
        );
        assert_eq!(
            message("components: []\n").as_deref(),
            Some("Invalid 'schemaVersion' ''")
        );
    }

    #[test]
    fn test_parent_is_rejected() {
        assert_eq!(
            message("schemaVersion: 2.2.0\nparent:\n  id: nodejs\n").as_deref(),
            Some("Inheriting from 'parent' is not yet supported")
        );
    }

    #[test]
    fn test_version_is_checked_before_parent() {
        assert_eq!(
            message("schemaVersion: 1.0.0\nparent:\n  id: nodejs\n").as_deref(),
            Some("'schemaVersion' '1.0.0' is not supported, it must be '2.2.0'")
        );
    }
}
