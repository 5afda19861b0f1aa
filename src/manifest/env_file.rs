//! Generated `export` file sourced by the agent's shell.

use std::collections::BTreeMap;

use super::{ItemSource, Result, SyncItem};
use crate::layout::AGENT_OWNER;

/// Quote a value for POSIX sh using single quotes.
pub(crate) fn shell_quote(val: &str) -> String {
    format!("'{}'", val.replace('\'', "'\"'\"'"))
}

/// Resolve a configured value. `$NAME` reads NAME from the host (None if unset),
/// `$$rest` is the literal `$rest`, anything else is used verbatim.
pub(crate) fn resolve_env_value(
    val: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Option<String> {
    if let Some(rest) = val.strip_prefix("$$") {
        Some(format!("${}", rest))
    } else if let Some(var_name) = val.strip_prefix('$') {
        lookup(var_name)
    } else {
        Some(val.to_string())
    }
}

/// Render `export NAME='value'` lines, sorted by name. `None` when nothing remains.
pub fn render_env_file(
    env: &BTreeMap<String, String>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Option<String> {
    let mut out = String::new();
    for (name, val) in env {
        match resolve_env_value(val, lookup) {
            Some(resolved) => {
                out.push_str(&format!("export {}={}\n", name, shell_quote(&resolved)));
            }
            None => tracing::debug!("{} references an unset host variable, omitting", name),
        }
    }
    (!out.is_empty()).then_some(out)
}

pub struct EnvFile<'a> {
    env: &'a BTreeMap<String, String>,
    dest: &'a str,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> EnvFile<'a> {
    pub fn new(
        env: &'a BTreeMap<String, String>,
        dest: &'a str,
        lookup: &'a dyn Fn(&str) -> Option<String>,
    ) -> Self {
        Self { env, dest, lookup }
    }
}

impl ItemSource for EnvFile<'_> {
    fn items(&self) -> Result<Vec<SyncItem>> {
        Ok(render_env_file(self.env, self.lookup)
            .map(|content| SyncItem::new(content, self.dest, "0644", AGENT_OWNER))
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn host(name: &str) -> Option<String> {
        match name {
            "X" => Some("valueX".to_string()),
            "EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn test_shell_quote_simple() {
        assert_eq!(shell_quote("hello"), "'hello'");
    }

    #[test]
    fn test_shell_quote_single_quote() {
        assert_eq!(shell_quote("it's"), "'it'\"'\"'s'");
    }

    #[test]
    fn test_shell_quote_keeps_dollar_literal() {
        assert_eq!(shell_quote("$HOME `x`"), "'$HOME `x`'");
    }

    #[test]
    fn test_render_sorted() {
        let out = render_env_file(&env(&[("ZED", "1"), ("ALPHA", "2")]), &host).unwrap();
        assert_eq!(out, "export ALPHA='2'\nexport ZED='1'\n");
    }

    #[test]
    fn test_host_reference_expanded() {
        let out = render_env_file(&env(&[("TOKEN", "$X")]), &host).unwrap();
        assert_eq!(out, "export TOKEN='valueX'\n");
    }

    #[test]
    fn test_unset_host_reference_omitted() {
        let out = render_env_file(&env(&[("TOKEN", "$UNSET_VAR"), ("A", "b")]), &host).unwrap();
        assert!(!out.contains("TOKEN"));
        assert!(out.contains("export A='b'"));
    }

    #[test]
    fn test_set_but_empty_host_reference_kept() {
        let out = render_env_file(&env(&[("TOKEN", "$EMPTY")]), &host).unwrap();
        assert_eq!(out, "export TOKEN=''\n");
    }

    #[test]
    fn test_double_dollar_escape() {
        let out = render_env_file(&env(&[("PRICE", "$$5")]), &host).unwrap();
        assert_eq!(out, "export PRICE='$5'\n");
    }

    #[test]
    fn test_empty_result_yields_no_item() {
        let vars = env(&[("TOKEN", "$UNSET_VAR")]);
        assert!(render_env_file(&vars, &host).is_none());
        let items = EnvFile::new(&vars, "/home/agent/.sandbox-env", &host)
            .items()
            .unwrap();
        assert!(items.is_empty());
        assert!(EnvFile::new(&BTreeMap::new(), "/x", &host)
            .items()
            .unwrap()
            .is_empty());
    }
}
