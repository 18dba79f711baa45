//! Text templates for commit messages, PR text, branch names and file contents
//!
//! Supported syntax:
//! - `{{ name }}` / `{{ a.b.c }}`: value lookup, error if missing
//! - `{{#if path}}...{{/if}}`: kept when the value is truthy
//! - `{{#each path}}...{{/each}}`: repeated per array item, item bound to `this`
//!
//! Blocks of the same kind do not nest. [`render`] fails on unknown
//! variables; [`render_lenient`] keeps them, along with `${{ ... }}`.

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static EACH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{#each\s+([A-Za-z0-9_.\-]+)\s*\}\}(.*?)\{\{/each\}\}")
        .expect("valid each regex")
});

static IF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{#if\s+([A-Za-z0-9_.\-]+)\s*\}\}(.*?)\{\{/if\}\}").expect("valid if regex")
});

static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("valid var regex"));

/// How a `{{ name }}` with no value is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unknown {
    Error,
    Keep,
}

/// Render `template` against a JSON context
///
/// An unknown variable is an error.
pub fn render(template: &str, context: &Value) -> Result<String> {
    render_with(template, context, Unknown::Error)
}

/// Render synced file contents
///
/// Unknown variables and `${{ ... }}` expressions are left as written, so
/// workflow files pass through untouched apart from known variables.
pub fn render_lenient(template: &str, context: &Value) -> Result<String> {
    render_with(template, context, Unknown::Keep)
}

fn render_with(template: &str, context: &Value, unknown: Unknown) -> Result<String> {
    let expanded = replace_all(&EACH_RE, template, |caps| {
        let path = &caps[1];
        let items = match lookup(context, path) {
            None | Some(Value::Null) => return Ok(String::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(Error::Template(format!("'{path}' is not a list")));
            }
        };

        let mut out = String::new();
        for item in items {
            out.push_str(&render_with(&caps[2], &with_this(context, item), unknown)?);
        }
        Ok(out)
    })?;

    let conditioned = replace_all(&IF_RE, &expanded, |caps| {
        if lookup(context, &caps[1]).is_some_and(is_truthy) {
            render_with(&caps[2], context, unknown)
        } else {
            Ok(String::new())
        }
    })?;

    replace_all(&VAR_RE, &conditioned, |caps| {
        let whole = &caps[0];
        let path = &caps[1];
        if unknown == Unknown::Keep {
            let start = caps.get(0).map_or(0, |m| m.start());
            if conditioned[..start].ends_with('$') {
                return Ok(whole.to_string());
            }
        }
        match (lookup(context, path), unknown) {
            (Some(value), _) => Ok(display(value)),
            (None, Unknown::Keep) => Ok(whole.to_string()),
            (None, Unknown::Error) => {
                Err(Error::Template(format!("unknown variable '{path}'")))
            }
        }
    })
}

/// Like `Regex::replace_all`, but the replacement may fail
fn replace_all<F>(re: &Regex, input: &str, mut replace: F) -> Result<String>
where
    F: FnMut(&Captures<'_>) -> Result<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in re.captures_iter(input) {
        let m = caps.get(0).expect("group 0 always matches");
        out.push_str(&input[last..m.start()]);
        out.push_str(&replace(&caps)?);
        last = m.end();
    }
    out.push_str(&input[last..]);
    Ok(out)
}

fn with_this(context: &Value, item: &Value) -> Value {
    let mut map = match context {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    map.insert("this".to_string(), item.clone());
    Value::Object(map)
}

/// Walk a dotted path through objects (and arrays by numeric index)
pub fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_variables_with_and_without_spaces() {
        let ctx = json!({"prefix": "files-sync", "repository": "acme/api", "index": 2});
        let out = render("{{prefix}}/{{ repository }}/pattern-{{ index }}", &ctx).unwrap();
        assert_eq!(out, "files-sync/acme/api/pattern-2");
    }

    #[test]
    fn test_render_nested_lookup() {
        let ctx = json!({"source": {"repository": "acme/templates"}});
        assert_eq!(
            render("from {{ source.repository }}", &ctx).unwrap(),
            "from acme/templates"
        );
    }

    #[test]
    fn test_unknown_variable_is_template_error() {
        let err = render("{{ nope }}", &json!({})).unwrap_err();
        assert!(matches!(err, Error::Template(msg) if msg.contains("nope")));
    }

    #[test]
    fn test_each_binds_this() {
        let ctx = json!({"changes": [{"to": "a.yml"}, {"to": "b.yml"}]});
        let out = render("{{#each changes}}- {{ this.to }}\n{{/each}}", &ctx).unwrap();
        assert_eq!(out, "- a.yml\n- b.yml\n");
    }

    #[test]
    fn test_each_over_missing_list_renders_nothing() {
        assert_eq!(render("[{{#each changes}}x{{/each}}]", &json!({})).unwrap(), "[]");
    }

    #[test]
    fn test_each_over_scalar_is_error() {
        assert!(render("{{#each n}}x{{/each}}", &json!({"n": 3})).is_err());
    }

    #[test]
    fn test_if_inside_each_sees_item() {
        let ctx = json!({"changes": [
            {"to": "a", "pull_request": {"number": 7}},
            {"to": "b", "pull_request": null}
        ]});
        let out = render(
            "{{#each changes}}{{ this.to }}{{#if this.pull_request}}#{{ this.pull_request.number }}{{/if}};{{/each}}",
            &ctx,
        )
        .unwrap();
        assert_eq!(out, "a#7;b;");
    }

    #[test]
    fn test_if_falsy_values() {
        let ctx = json!({"empty": "", "zero": 0, "list": [], "yes": true});
        let out = render(
            "{{#if empty}}1{{/if}}{{#if zero}}2{{/if}}{{#if list}}3{{/if}}{{#if missing}}4{{/if}}{{#if yes}}5{{/if}}",
            &ctx,
        )
        .unwrap();
        assert_eq!(out, "5");
    }

    #[test]
    fn test_text_without_placeholders_is_untouched() {
        let text = "name: CI\non: [push]\n";
        assert_eq!(render(text, &json!({})).unwrap(), text);
    }

    #[test]
    fn test_lenient_keeps_unknown_and_workflow_expressions() {
        let ctx = json!({"team": "core", "github": {"sha": "shadowed"}});
        let text = "team: {{ team }}\nrun: echo ${{ github.sha }} {{ other }}\n";

        assert_eq!(
            render_lenient(text, &ctx).unwrap(),
            "team: core\nrun: echo ${{ github.sha }} {{ other }}\n"
        );
        assert!(render(text, &json!({"team": "core"})).is_err());
    }

    #[test]
    fn test_lenient_still_rejects_each_over_scalar() {
        assert!(render_lenient("{{#each n}}x{{/each}}", &json!({"n": 3})).is_err());
    }
}
