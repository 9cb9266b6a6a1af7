//! Proxy type naming.

use thiserror::Error;

/// Prefix of every generated proxy type name.
pub const PROXY_PREFIX: &str = "WeakProxy_";

/// Reasons a proxy name cannot be derived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    /// The qualified name does not start with its package.
    #[error("Type '{qualified}' is not inside package '{package}'")]
    NotInPackage {
        /// Qualified type name.
        qualified: String,
        /// Declared package.
        package: String,
    },

    /// Nothing is left once the package is removed.
    #[error("Type '{qualified}' has no name inside its package")]
    Empty {
        /// Qualified type name.
        qualified: String,
    },
}

/// Derive the proxy type name for `qualified` declared in `package`.
///
/// The package and the separator after it are removed, every remaining
/// separator (`::`, `.`, `$`) becomes `_`, and [`PROXY_PREFIX`] is
/// prepended. An empty package means `qualified` is already relative.
///
/// ```
/// use tether_codegen::proxy_name;
///
/// assert_eq!(proxy_name("crate::audio::Mixer", "crate::audio").unwrap(), "WeakProxy_Mixer");
/// assert_eq!(proxy_name("Outer.Inner", "").unwrap(), "WeakProxy_Outer_Inner");
/// ```
///
/// # Errors
///
/// Returns [`NamingError`] if `qualified` is not inside `package`.
pub fn proxy_name(qualified: &str, package: &str) -> Result<String, NamingError> {
    let relative = if package.is_empty() {
        qualified
    } else {
        qualified
            .strip_prefix(package)
            .and_then(strip_separator)
            .ok_or_else(|| NamingError::NotInPackage {
                qualified: qualified.to_string(),
                package: package.to_string(),
            })?
    };

    if relative.is_empty() {
        return Err(NamingError::Empty {
            qualified: qualified.to_string(),
        });
    }

    let flattened = relative.replace("::", "_").replace(['.', '$'], "_");
    Ok(format!("{PROXY_PREFIX}{flattened}"))
}

fn strip_separator(rest: &str) -> Option<&str> {
    rest.strip_prefix("::")
        .or_else(|| rest.strip_prefix('.'))
        .or_else(|| rest.strip_prefix('$'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_package() {
        assert_eq!(
            proxy_name("crate::events::user::BrOne", "crate::events::user").unwrap(),
            "WeakProxy_BrOne"
        );
    }

    #[test]
    fn test_flattens_nested_names() {
        assert_eq!(
            proxy_name("crate::ui::panel::Header", "crate::ui").unwrap(),
            "WeakProxy_panel_Header"
        );
        assert_eq!(
            proxy_name("com.example.Outer$Inner", "com.example").unwrap(),
            "WeakProxy_Outer_Inner"
        );
    }

    #[test]
    fn test_empty_package() {
        assert_eq!(proxy_name("BrOne", "").unwrap(), "WeakProxy_BrOne");
    }

    #[test]
    fn test_not_in_package() {
        let err = proxy_name("crate::b::Thing", "crate::a").unwrap_err();
        assert!(matches!(err, NamingError::NotInPackage { .. }));
    }

    #[test]
    fn test_prefix_without_separator_rejected() {
        // `crate::ab` starts with `crate::a` but is not inside it.
        let err = proxy_name("crate::ab::Thing", "crate::a").unwrap_err();
        assert!(matches!(err, NamingError::NotInPackage { .. }));
    }

    #[test]
    fn test_package_only_rejected() {
        let err = proxy_name("crate::a::", "crate::a").unwrap_err();
        assert!(matches!(err, NamingError::Empty { .. }));
        assert!(proxy_name("crate::a", "crate::a").is_err());
    }
}
