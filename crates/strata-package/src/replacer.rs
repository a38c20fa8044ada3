use serde::{Deserialize, Serialize};

/// Placeholder for the package name in template scripts.
pub const EXTENSION_NAME_PLACEHOLDER: &str = "launchql-extension-name";

/// Schema name used in templates and the logical name it is renamed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMapping {
    /// Schema name as it appears in the template scripts.
    pub schema_name: String,
    /// Logical name combined with the package name.
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacerOptions {
    #[serde(default)]
    pub schemas: Vec<SchemaMapping>,
    /// Package name.
    pub name: String,
}

/// Ordered literal substitutions.
///
/// Rules run in list order, each on the output of the previous one. Schema
/// rules come before the generic package-name rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Replacer {
    pub replace: Vec<(String, String)>,
}

impl Replacer {
    pub fn apply(&self, text: &str) -> String {
        self.replace
            .iter()
            .fold(text.to_string(), |acc, (pattern, replacement)| {
                if pattern.is_empty() {
                    acc
                } else {
                    acc.replace(pattern.as_str(), replacement)
                }
            })
    }
}

pub fn make_replacer(options: &ReplacerOptions) -> Replacer {
    let mut replace: Vec<(String, String)> = options
        .schemas
        .iter()
        .map(|schema| {
            (
                schema.schema_name.clone(),
                snake_case(&format!("{}_{}", options.name, schema.name)),
            )
        })
        .collect();
    replace.push((EXTENSION_NAME_PLACEHOLDER.to_string(), options.name.clone()));
    Replacer { replace }
}

/// Lowercase words joined by `_`; word breaks are non-alphanumerics,
/// lower-to-upper case transitions and the edges of digit runs.
pub fn snake_case(value: &str) -> String {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Class {
        Lower,
        Upper,
        Digit,
    }
    let class = |ch: char| {
        if ch.is_ascii_digit() {
            Class::Digit
        } else if ch.is_uppercase() {
            Class::Upper
        } else {
            Class::Lower
        }
    };

    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len() + 4);
    let mut previous: Option<Class> = None;

    for (idx, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            previous = None;
            continue;
        }
        let current = class(ch);
        let next = chars.get(idx + 1).copied().filter(|c| c.is_alphanumeric()).map(class);
        // Digit runs are words of their own; `XMLHttp` splits before `Http`.
        let boundary = match previous {
            None => true,
            Some(prev) => {
                (prev == Class::Digit) != (current == Class::Digit)
                    || (prev == Class::Lower && current == Class::Upper)
                    || (prev == Class::Upper
                        && current == Class::Upper
                        && next == Some(Class::Lower))
            }
        };
        if boundary && !out.is_empty() {
            out.push('_');
        }
        previous = Some(current);
        out.extend(ch.to_lowercase());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ReplacerOptions {
        ReplacerOptions {
            schemas: vec![
                SchemaMapping {
                    schema_name: "launchql-extension-name-public".to_string(),
                    name: "public".to_string(),
                },
                SchemaMapping {
                    schema_name: "app_private".to_string(),
                    name: "private".to_string(),
                },
            ],
            name: "my-ext".to_string(),
        }
    }

    #[test]
    fn snake_case_splits_words() {
        assert_eq!(snake_case("my-ext_public"), "my_ext_public");
        assert_eq!(snake_case("MyExt Private"), "my_ext_private");
        assert_eq!(snake_case("--already__snake--"), "already_snake");
        assert_eq!(snake_case("v2Api"), "v_2_api");
        assert_eq!(snake_case("app2"), "app_2");
        assert_eq!(snake_case("XMLHttp"), "xml_http");
    }

    #[test]
    fn rules_are_ordered_schema_first() {
        let replacer = make_replacer(&options());
        let patterns: Vec<&str> = replacer
            .replace
            .iter()
            .map(|(pattern, _)| pattern.as_str())
            .collect();
        assert_eq!(
            patterns,
            vec![
                "launchql-extension-name-public",
                "app_private",
                EXTENSION_NAME_PLACEHOLDER
            ]
        );
    }

    #[test]
    fn schema_rule_wins_over_generic_name_rule() {
        let replacer = make_replacer(&options());
        let sql = "create schema \"launchql-extension-name-public\";\n\
                   grant usage on schema app_private to \"launchql-extension-name\";";
        assert_eq!(
            replacer.apply(sql),
            "create schema \"my_ext_public\";\n\
             grant usage on schema my_ext_private to \"my-ext\";"
        );
    }

    #[test]
    fn reversing_the_rules_changes_the_result() {
        let mut reversed = make_replacer(&options());
        reversed.replace.reverse();
        let sql = "create schema \"launchql-extension-name-public\";";
        assert_eq!(reversed.apply(sql), "create schema \"my-ext-public\";");
        assert_ne!(reversed.apply(sql), make_replacer(&options()).apply(sql));
    }
}
