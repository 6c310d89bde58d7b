//! Aviso sobre strings de versión que no siguen SemVer.
//!
//! Acepta un prefijo opcional con la versión del juego (`mc1.8-`, `1.8.9-`),
//! seguido de `MAJOR.MINOR[.PATCH...]`, pre-release y build metadata.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

static VERSION_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:mc)?(\d+(?:.\d+)+)-)?((?:0|[1-9][0-9]*)(?:\.(?:0|[1-9][0-9]*))+)(?:-([\da-z\-]+(?:\.[\da-z\-]+)*))?(?:\+([\da-z\-]+(?:\.[\da-z\-]+)*))?$").ok()
});

pub fn is_semver_like(version: &str) -> bool {
    VERSION_PATTERN.as_ref().is_some_and(|re| re.is_match(version))
}

/// Nunca falla la build: sólo registra dos avisos si la versión no encaja.
/// Devuelve si la versión es válida.
pub fn check_version_string(version: &str) -> bool {
    if is_semver_like(version) {
        return true;
    }
    warn!("Version string '{version}' does not match SemVer specification");
    warn!("You should try SemVer : http://semver.org/");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_prefixed_versions() {
        for v in ["1.0", "1.0.0", "mc1.8-1.2.3", "1.8.9-2.0.0-beta.1", "2.1.0+build.7", "1.7.10-10.13.4-rc1+b3"] {
            assert!(check_version_string(v), "{v}");
        }
    }

    #[test]
    fn rejects_non_semver() {
        for v in ["", "unspecified", "1", "01.2", "v1.0.0", "1.0_beta"] {
            assert!(!check_version_string(v), "{v}");
        }
    }
}
