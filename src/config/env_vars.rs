/// Expand environment variables in a configuration reference.
///
/// Handles Windows-style `%VAR%`, Unix-style `$VAR` and `${VAR}`. Unknown
/// variables are left untouched so a failed lookup still names them.
pub fn expand_env_vars(text: &str) -> String {
    expand_with(text, |name| std::env::var(name).ok())
}

/// Expand variables using an arbitrary lookup
pub fn expand_with<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(['%', '$']) {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let (name, consumed) = if let Some(after) = tail.strip_prefix("${") {
            match after.find('}') {
                Some(end) => (&after[..end], end + 3),
                None => ("", 0),
            }
        } else if let Some(after) = tail.strip_prefix('$') {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end + 1)
        } else {
            let after = &tail[1..];
            match after.find('%') {
                Some(end) if end > 0 && !after[..end].contains(char::is_whitespace) => {
                    (&after[..end], end + 2)
                }
                _ => ("", 0),
            }
        };

        match (consumed, lookup(name)) {
            (0, _) => {
                result.push_str(&tail[..1]);
                rest = &tail[1..];
            }
            (_, Some(value)) if !name.is_empty() => {
                result.push_str(&value);
                rest = &tail[consumed..];
            }
            _ => {
                result.push_str(&tail[..consumed.max(1)]);
                rest = &tail[consumed.max(1)..];
            }
        }
    }

    result.push_str(rest);
    result
}

/// Normalize path separators for the current OS
pub fn normalize_path_for_os(path: &str) -> String {
    if cfg!(windows) {
        path.replace('/', "\\")
    } else {
        path.replace('\\', "/")
    }
}
