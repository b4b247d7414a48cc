use std::sync::OnceLock;

use regex::Regex;

/// Expand `{{ env.VAR }}` placeholders in raw config text
///
/// `{{ env.VAR | default("fallback") }}` substitutes the fallback when the
/// variable is unset. A placeholder without a default for an unset variable
/// is an error. TOML comment lines pass through untouched so commented-out
/// settings do not fail the load.
pub fn expand_env(input: &str) -> Result<String, String> {
    fn re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| {
            Regex::new(r#"\{\{\s*env\.([A-Za-z0-9_]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
                .expect("placeholder regex is valid")
        })
    }

    let mut output = String::with_capacity(input.len());
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        if line.trim_start().starts_with('#') {
            output.push_str(line);
        } else {
            let mut err = None;
            let expanded = re().replace_all(line, |caps: &regex::Captures<'_>| {
                let var = &caps[1];
                match std::env::var(var) {
                    Ok(value) => value,
                    Err(_) => caps.get(2).map_or_else(
                        || {
                            err = Some(format!("environment variable not found: `{var}`"));
                            String::new()
                        },
                        |default| default.as_str().to_owned(),
                    ),
                }
            });
            if let Some(err) = err {
                return Err(err);
            }
            output.push_str(&expanded);
        }

        if lines.peek().is_some() || input.ends_with('\n') {
            output.push('\n');
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let input = "ttl_seconds = 60";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn expands_set_variable() {
        temp_env::with_var("RELAY_KEY", Some("sk-test"), || {
            let out = expand_env("api_key = \"{{ env.RELAY_KEY }}\"").unwrap();
            assert_eq!(out, "api_key = \"sk-test\"");
        });
    }

    #[test]
    fn missing_variable_errors() {
        temp_env::with_var_unset("RELAY_MISSING", || {
            let err = expand_env("api_key = \"{{ env.RELAY_MISSING }}\"").unwrap_err();
            assert!(err.contains("RELAY_MISSING"));
        });
    }

    #[test]
    fn default_applies_when_unset() {
        temp_env::with_var_unset("RELAY_OPT", || {
            let out = expand_env("base_url = \"{{ env.RELAY_OPT | default(\"http://localhost\") }}\"").unwrap();
            assert_eq!(out, "base_url = \"http://localhost\"");
        });
    }

    #[test]
    fn default_ignored_when_set() {
        temp_env::with_var("RELAY_OPT", Some("http://real"), || {
            let out = expand_env("base_url = \"{{ env.RELAY_OPT | default(\"http://localhost\") }}\"").unwrap();
            assert_eq!(out, "base_url = \"http://real\"");
        });
    }

    #[test]
    fn comment_lines_skip_expansion() {
        temp_env::with_var_unset("RELAY_MISSING", || {
            let input = "# api_key = \"{{ env.RELAY_MISSING }}\"\nttl_seconds = 60";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }

    #[test]
    fn trailing_newline_preserved() {
        let input = "ttl_seconds = 60\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }
}
