use std::env;
use std::str::FromStr;

use tracing::warn;

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// Empty segments are dropped, so an unset variable yields an empty vector.
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Reads and parses an environment variable, falling back to `default` when it
/// is unset or does not parse.
pub fn get_env_var_or<T>(var: &str, default: T) -> T
where
    T: FromStr,
{
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring unparsable value '{}' for {}", raw, var);
                default
            }
        },
        _ => default,
    }
}

/// Reads a string environment variable, treating blank values as unset.
pub fn get_env_string(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Interprets common truthy spellings (`1`, `true`, `yes`, `on`).
pub fn get_env_flag(var: &str) -> bool {
    get_env_string(var)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fallbacks() {
        env::set_var("DIRSYNC_TEST_WORKERS", "12");
        assert_eq!(get_env_var_or("DIRSYNC_TEST_WORKERS", 25usize), 12);

        env::set_var("DIRSYNC_TEST_WORKERS_BAD", "lots");
        assert_eq!(get_env_var_or("DIRSYNC_TEST_WORKERS_BAD", 25usize), 25);

        assert_eq!(get_env_var_or("DIRSYNC_TEST_UNSET_VAR", 3usize), 3);
    }

    #[test]
    fn test_vec_and_flag() {
        env::set_var("DIRSYNC_TEST_CONVERTER", "python  html2table.py ");
        assert_eq!(
            get_env_var_as_vec("DIRSYNC_TEST_CONVERTER", ' '),
            vec!["python".to_string(), "html2table.py".to_string()]
        );

        env::set_var("DIRSYNC_TEST_FLAG", "Yes");
        assert!(get_env_flag("DIRSYNC_TEST_FLAG"));
        assert!(!get_env_flag("DIRSYNC_TEST_FLAG_UNSET"));
    }
}
