/// Expand `${NAME}` placeholders from the process environment.
///
/// Unset variables and malformed placeholders are kept verbatim, so a
/// missing secret shows up as a literal `${NAME}` rather than an empty value.
pub fn substitute_env(input: &str) -> String {
    expand(input, |name| std::env::var(name).ok())
}

fn is_var_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn expand(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        let value = if is_var_name(name) {
            lookup(name)
        } else {
            None
        };
        match value {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
