use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WINDIR_TOKEN: Regex = Regex::new(r"(?i)%(windir|systemroot)%\\?").unwrap();
}

/// Expand `%NAME%` tokens using `lookup`. Unknown names and unpaired `%`
/// are left as they are.
pub fn expand_env_tokens<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('%') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                match lookup(name).filter(|_| !name.is_empty()) {
                    Some(value) => {
                        result.push_str(&value);
                        rest = &after[end + 1..];
                    }
                    None => {
                        // keep the opening % and retry from the closing one
                        result.push('%');
                        result.push_str(name);
                        rest = &after[end..];
                    }
                }
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}

/// Expand Windows-style environment variables (%VAR%) from the process environment
pub fn parse_windows_env_vars(path: &str) -> String {
    expand_env_tokens(path, |name| std::env::var(name).ok())
}

/// Replace a `%windir%` or `%SystemRoot%` token with `<drive>\windows\`.
///
/// Run-key data is read from the registry of the host being examined, so
/// the token is resolved against the configured system drive rather than
/// the examiner's environment.
pub fn resolve_windir_token(path: &str, system_drive: &str) -> String {
    let replacement = format!("{}\\windows\\", system_drive.trim_end_matches('\\'));
    WINDIR_TOKEN
        .replace_all(path, regex::NoExpand(&replacement))
        .into_owned()
}
