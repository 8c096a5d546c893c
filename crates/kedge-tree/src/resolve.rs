//! Tag resolution: mapping untagged nodes onto the YAML 1.1 type space.
//!
//! The composer and serializer both consume the [`TagResolver`] seam; the
//! rule set itself is injected at construction so pipelines never share
//! mutable registries.

use std::collections::HashMap;

use regex::Regex;

pub const DEFAULT_SCALAR_TAG: &str = "tag:yaml.org,2002:str";
pub const DEFAULT_SEQUENCE_TAG: &str = "tag:yaml.org,2002:seq";
pub const DEFAULT_MAPPING_TAG: &str = "tag:yaml.org,2002:map";

/// The three node kinds a tag can be resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
}

/// Decides the tag of an untagged node.
///
/// Must be deterministic and side-effect free: the serializer re-resolves
/// values while writing to decide whether a tag can stay implicit, and
/// round-tripping depends on both sides agreeing.
pub trait TagResolver {
    /// Resolve a tag for a node of `kind`. `value` is the scalar text
    /// (`None` for collections); `implicit` is the (plain, non-plain) pair
    /// carried on scalar events.
    fn resolve(&self, kind: NodeKind, value: Option<&str>, implicit: (bool, bool)) -> String;
}

struct ImplicitRule {
    tag: &'static str,
    pattern: Regex,
}

/// The YAML 1.1 implicit-typing rule table.
///
/// Each rule is a regular expression from the YAML 1.1 type repository,
/// dispatched on the first character of the value. Covers bool (including
/// `yes/no/on/off`), int (binary, octal, decimal, hex, sexagesimal), float
/// (including sexagesimal and `.inf`/`.nan`), null, timestamp, the merge
/// key `<<`, the value key `=`, and the `!`/`&`/`*` guard.
pub struct CoreResolver {
    rules: Vec<ImplicitRule>,
    by_first: HashMap<char, Vec<usize>>,
    empty_rules: Vec<usize>,
}

impl CoreResolver {
    /// Build the standard YAML 1.1 rule table.
    pub fn new() -> Self {
        let mut resolver = Self {
            rules: Vec::new(),
            by_first: HashMap::new(),
            empty_rules: Vec::new(),
        };
        resolver.add_rule(
            "tag:yaml.org,2002:bool",
            r"^(?:yes|Yes|YES|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF)$",
            "yYnNtTfFoO",
            false,
        );
        resolver.add_rule(
            "tag:yaml.org,2002:float",
            r"^(?:[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+][0-9]+)?|\.[0-9_]+(?:[eE][-+][0-9]+)?|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
            "-+0123456789.",
            false,
        );
        resolver.add_rule(
            "tag:yaml.org,2002:int",
            r"^(?:[-+]?0b[0-1_]+|[-+]?0[0-7_]+|[-+]?(?:0|[1-9][0-9_]*)|[-+]?0x[0-9a-fA-F_]+|[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+)$",
            "-+0123456789",
            false,
        );
        resolver.add_rule("tag:yaml.org,2002:merge", r"^(?:<<)$", "<", false);
        resolver.add_rule("tag:yaml.org,2002:null", r"^(?:~|null|Null|NULL|)$", "~nN", true);
        resolver.add_rule(
            "tag:yaml.org,2002:timestamp",
            r"^(?:[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]|[0-9][0-9][0-9][0-9]-[0-9][0-9]?-[0-9][0-9]?(?:[Tt]|[ \t]+)[0-9][0-9]?:[0-9][0-9]:[0-9][0-9](?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9][0-9]?(?::[0-9][0-9])?))?)$",
            "0123456789",
            false,
        );
        resolver.add_rule("tag:yaml.org,2002:value", r"^(?:=)$", "=", false);
        resolver.add_rule("tag:yaml.org,2002:yaml", r"^(?:!|&|\*)$", "!&*", false);
        resolver
    }

    /// Register an additional implicit rule. `first` lists the characters a
    /// matching value can start with; `matches_empty` also applies the rule
    /// to the empty string.
    pub fn add_rule(&mut self, tag: &'static str, pattern: &str, first: &str, matches_empty: bool) {
        let index = self.rules.len();
        self.rules.push(ImplicitRule {
            tag,
            pattern: Regex::new(pattern).expect("implicit rule pattern must be valid"),
        });
        for ch in first.chars() {
            self.by_first.entry(ch).or_default().push(index);
        }
        if matches_empty {
            self.empty_rules.push(index);
        }
    }

    fn resolve_scalar(&self, value: &str) -> &'static str {
        let candidates = if value.is_empty() {
            Some(&self.empty_rules)
        } else {
            value.chars().next().and_then(|ch| self.by_first.get(&ch))
        };
        if let Some(candidates) = candidates {
            for &index in candidates {
                let rule = &self.rules[index];
                if rule.pattern.is_match(value) {
                    return rule.tag;
                }
            }
        }
        DEFAULT_SCALAR_TAG
    }
}

impl Default for CoreResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TagResolver for CoreResolver {
    fn resolve(&self, kind: NodeKind, value: Option<&str>, implicit: (bool, bool)) -> String {
        match kind {
            NodeKind::Scalar => {
                if implicit.0 {
                    self.resolve_scalar(value.unwrap_or("")).to_string()
                } else {
                    DEFAULT_SCALAR_TAG.to_string()
                }
            }
            NodeKind::Sequence => DEFAULT_SEQUENCE_TAG.to_string(),
            NodeKind::Mapping => DEFAULT_MAPPING_TAG.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(value: &str) -> String {
        CoreResolver::new().resolve(NodeKind::Scalar, Some(value), (true, false))
    }

    #[test]
    fn test_bool_forms() {
        for value in ["yes", "No", "TRUE", "false", "on", "Off"] {
            assert_eq!(resolve(value), "tag:yaml.org,2002:bool", "{value}");
        }
        // YAML 1.2 would say these are strings; 1.1 semantics apply here.
        assert_eq!(resolve("y"), "tag:yaml.org,2002:str");
    }

    #[test]
    fn test_int_forms() {
        for value in ["0", "42", "-17", "+3", "0b1010", "0x1F", "017", "190:20:30", "1_000"] {
            assert_eq!(resolve(value), "tag:yaml.org,2002:int", "{value}");
        }
    }

    #[test]
    fn test_float_forms() {
        for value in ["3.14", "-0.5", "6.8523015e+5", ".inf", "-.Inf", ".nan", "190:20:30.15"] {
            assert_eq!(resolve(value), "tag:yaml.org,2002:float", "{value}");
        }
    }

    #[test]
    fn test_null_forms() {
        for value in ["~", "null", "Null", "NULL", ""] {
            assert_eq!(resolve(value), "tag:yaml.org,2002:null", "{value:?}");
        }
    }

    #[test]
    fn test_timestamp_forms() {
        for value in ["2002-12-14", "2001-12-15T02:59:43.1Z", "2001-12-14 21:59:43.10 -5"] {
            assert_eq!(resolve(value), "tag:yaml.org,2002:timestamp", "{value}");
        }
    }

    #[test]
    fn test_merge_and_value_keys() {
        assert_eq!(resolve("<<"), "tag:yaml.org,2002:merge");
        assert_eq!(resolve("="), "tag:yaml.org,2002:value");
    }

    #[test]
    fn test_plain_strings_fall_through() {
        for value in ["hello", "12 monkeys", "-", "0xg1", "2002-12"] {
            assert_eq!(resolve(value), "tag:yaml.org,2002:str", "{value}");
        }
    }

    #[test]
    fn test_non_plain_scalars_resolve_to_str() {
        let resolver = CoreResolver::new();
        assert_eq!(
            resolver.resolve(NodeKind::Scalar, Some("123"), (false, true)),
            "tag:yaml.org,2002:str"
        );
    }

    #[test]
    fn test_collections() {
        let resolver = CoreResolver::new();
        assert_eq!(
            resolver.resolve(NodeKind::Sequence, None, (true, false)),
            DEFAULT_SEQUENCE_TAG
        );
        assert_eq!(
            resolver.resolve(NodeKind::Mapping, None, (true, false)),
            DEFAULT_MAPPING_TAG
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = CoreResolver::new();
        for value in ["42", "yes", "~", "x"] {
            let first = resolver.resolve(NodeKind::Scalar, Some(value), (true, false));
            let second = resolver.resolve(NodeKind::Scalar, Some(value), (true, false));
            assert_eq!(first, second);
        }
    }
}
