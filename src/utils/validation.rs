use crate::utils::error::{DeployError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(DeployError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(DeployError::InvalidConfigValue {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(DeployError::InvalidConfigValue {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(DeployError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(DeployError::InvalidConfigValue {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| DeployError::MissingConfig {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DeployError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// `group:artifact` or `group:*`.
pub fn validate_library_pattern(field_name: &str, pattern: &str) -> Result<()> {
    match pattern.split_once(':') {
        Some((group, artifact))
            if !group.trim().is_empty() && !artifact.trim().is_empty() && !artifact.contains(':') =>
        {
            Ok(())
        }
        _ => Err(DeployError::InvalidConfigValue {
            field: field_name.to_string(),
            value: pattern.to_string(),
            reason: "Expected `group:artifact` or `group:*`".to_string(),
        }),
    }
}

/// Treats whitespace-only optional strings as absent.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("container", "http://localhost:7112/").is_ok());
        assert!(validate_url("container", "").is_err());
        assert!(validate_url("container", "not a url").is_err());
        assert!(validate_url("container", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_library_pattern() {
        assert!(validate_library_pattern("runtime.system_libraries", "org.slf4j:*").is_ok());
        assert!(validate_library_pattern("runtime.system_libraries", "io.netty:netty-all").is_ok());
        assert!(validate_library_pattern("runtime.system_libraries", "netty").is_err());
        assert!(validate_library_pattern("runtime.system_libraries", ":x").is_err());
        assert!(validate_library_pattern("runtime.system_libraries", "a:b:c").is_err());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  x ")), Some("x"));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }
}
