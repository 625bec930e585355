//! Change a function's prototype: return type, name, a parameter's
//! type/name, or add/remove a parameter. Grounded in
//! `original_source/core/refactorings/function_prototype/change_function_prototype.py`
//! and its `PrototypeModifier` helpers (`replace_return_type`,
//! `replace_function_name`, `replace_parameter_type`,
//! `replace_parameter_name`, `add_parameter`, `remove_parameter`), which
//! together cover every sub-change this module applies. The prototype-span
//! search itself uses the symbol table to locate a prototype rather than
//! re-scanning source text from scratch.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::edits::{Edit, EditGenerator};
use crate::errors::Result;
use crate::oracle::OracleProfile;
use crate::symbol::SymbolTable;

/// One requested mutation to a function's prototype text, carried on a
/// `change_prototype` job request since "what to change a prototype to"
/// isn't discoverable from the repository the way a qualifier occurrence
/// is — it's caller intent, submitted over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrototypeChange {
    ReturnType { qualified_name: String, new_type: String },
    Rename { qualified_name: String, new_name: String },
    ParameterType { qualified_name: String, index: usize, new_type: String },
    ParameterName { qualified_name: String, index: usize, new_name: String },
    /// `index: None` appends at the end, matching `add_parameter`'s
    /// `position == -1` default.
    AddParameter {
        qualified_name: String,
        index: Option<usize>,
        param_type: String,
        param_name: String,
    },
    RemoveParameter { qualified_name: String, index: usize },
}

impl PrototypeChange {
    fn qualified_name(&self) -> &str {
        match self {
            PrototypeChange::ReturnType { qualified_name, .. }
            | PrototypeChange::Rename { qualified_name, .. }
            | PrototypeChange::ParameterType { qualified_name, .. }
            | PrototypeChange::ParameterName { qualified_name, .. }
            | PrototypeChange::AddParameter { qualified_name, .. }
            | PrototypeChange::RemoveParameter { qualified_name, .. } => qualified_name,
        }
    }

    /// Rough success-probability hint: return-type and signature-shape
    /// changes (rename, add/remove parameter) are the least likely to
    /// preserve semantics across every call site, parameter-name changes
    /// (no ABI effect at all) the most.
    fn success_probability(&self) -> f32 {
        match self {
            PrototypeChange::ReturnType { .. } => 0.3,
            PrototypeChange::Rename { .. } => 0.3,
            PrototypeChange::ParameterType { .. } => 0.5,
            PrototypeChange::ParameterName { .. } => 0.85,
            PrototypeChange::AddParameter { .. } => 0.2,
            PrototypeChange::RemoveParameter { .. } => 0.2,
        }
    }
}

/// Applies a fixed worklist of `PrototypeChange`s, one per yielded edit.
/// Unlike the qualifier/MS-macro generators this one is driven by an
/// explicit change list rather than scanning the repository for
/// occurrences, since "what prototype to change to" isn't discoverable —
/// it's the caller's intent.
pub struct PrototypeChangeGenerator {
    changes: Vec<PrototypeChange>,
}

impl PrototypeChangeGenerator {
    pub fn new(changes: Vec<PrototypeChange>) -> Self {
        Self { changes }
    }
}

impl EditGenerator for PrototypeChangeGenerator {
    fn id(&self) -> &'static str {
        "change_prototype"
    }

    fn name(&self) -> &'static str {
        "Change Function Prototype"
    }

    fn generate<'a>(
        &'a self,
        _repo_path: &'a Path,
        symbols: &'a SymbolTable,
    ) -> Box<dyn Iterator<Item = Result<Edit>> + 'a> {
        Box::new(
            self.changes
                .iter()
                .filter_map(move |change| apply_change(change, symbols)),
        )
    }
}

fn apply_change(change: &PrototypeChange, symbols: &SymbolTable) -> Option<Result<Edit>> {
    let symbol = symbols.get(change.qualified_name())?;
    let function = symbol.as_function()?;
    let file = function.header.file.clone();

    let original_content = match std::fs::read_to_string(&file) {
        Ok(c) => c,
        Err(e) => return Some(Err(e.into())),
    };

    let span = prototype_span(&original_content, function.header.span.start);
    let Some((start_byte, end_byte)) = span else {
        return None;
    };

    let original_span = &original_content[start_byte..end_byte];
    let new_span = match rewrite_prototype(original_span, change) {
        Some(s) => s,
        None => return None,
    };

    if new_span == original_span {
        return None;
    }

    let mut new_content = String::with_capacity(original_content.len());
    new_content.push_str(&original_content[..start_byte]);
    new_content.push_str(&new_span);
    new_content.push_str(&original_content[end_byte..]);

    if let Err(e) = std::fs::write(&file, &new_content) {
        return Some(Err(e.into()));
    }

    Some(Ok(Edit {
        file: file.clone(),
        commit_message: format!(
            "Change prototype of {} in {}",
            change.qualified_name(),
            file.display()
        ),
        oracle_profile: OracleProfile::O0,
        success_probability: change.success_probability(),
        original_content,
    }))
}

/// Byte range of the prototype: from the start of the symbol's recorded
/// line, extending until the first `;` or `{` is seen (the end of the
/// declaration/definition header).
fn prototype_span(content: &str, start_line: usize) -> Option<(usize, usize)> {
    let mut line_start_byte = 0usize;
    let mut current_line = 1usize;

    for line in content.split_inclusive('\n') {
        if current_line == start_line {
            break;
        }
        line_start_byte += line.len();
        current_line += 1;
    }
    if current_line != start_line {
        return None;
    }

    let rest = &content[line_start_byte..];
    let end_offset = rest.find([';', '{'])?;
    Some((line_start_byte, line_start_byte + end_offset + 1))
}

fn rewrite_prototype(span: &str, change: &PrototypeChange) -> Option<String> {
    let open = span.find('(')?;
    let close = span.rfind(')')?;

    match change {
        PrototypeChange::ReturnType { new_type, .. } => {
            let before_paren = &span[..open];
            let name_start = before_paren
                .rfind(|c: char| c.is_whitespace() || c == '*' || c == '&')
                .map_or(0, |i| i + 1);
            Some(format!("{new_type} {}", &span[name_start..]))
        }
        PrototypeChange::Rename { new_name, .. } => {
            let before_paren = &span[..open];
            let old_name = before_paren.split_whitespace().last()?;
            let new_qualified = match old_name.rfind("::") {
                Some(idx) => format!("{}::{}", &old_name[..idx], new_name),
                None => new_name.clone(),
            };
            let new_before = replace_last_occurrence(before_paren, old_name, &new_qualified);
            Some(format!("{new_before}{}", &span[open..]))
        }
        PrototypeChange::ParameterType { index, new_type, .. } => {
            let params = split_params(&span[open + 1..close]);
            let mut params = params;
            let (_, name) = params.get(*index)?.clone();
            params[*index] = (new_type.clone(), name);
            Some(rejoin(span, open, close, &params))
        }
        PrototypeChange::ParameterName { index, new_name, .. } => {
            let params = split_params(&span[open + 1..close]);
            let mut params = params;
            let (ty, _) = params.get(*index)?.clone();
            params[*index] = (ty, new_name.clone());
            Some(rejoin(span, open, close, &params))
        }
        PrototypeChange::AddParameter { index, param_type, param_name, .. } => {
            let mut params = split_params(&span[open + 1..close]);
            let pos = index.unwrap_or(params.len()).min(params.len());
            params.insert(pos, (param_type.clone(), param_name.clone()));
            Some(rejoin(span, open, close, &params))
        }
        PrototypeChange::RemoveParameter { index, .. } => {
            let mut params = split_params(&span[open + 1..close]);
            if *index >= params.len() {
                return None;
            }
            params.remove(*index);
            Some(rejoin(span, open, close, &params))
        }
    }
}

/// Replace the last occurrence of `needle` in `haystack` with `replacement`,
/// mirroring `str.rsplit(needle, 1)` in the source this ports.
fn replace_last_occurrence(haystack: &str, needle: &str, replacement: &str) -> String {
    match haystack.rfind(needle) {
        Some(idx) => format!("{}{replacement}{}", &haystack[..idx], &haystack[idx + needle.len()..]),
        None => haystack.to_string(),
    }
}

fn split_params(params_str: &str) -> Vec<(String, String)> {
    params_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|param| {
            let split_at = param
                .rfind(|c: char| c.is_whitespace() || c == '*' || c == '&')
                .map_or(0, |i| i + 1);
            (
                param[..split_at].trim().to_string(),
                param[split_at..].trim().to_string(),
            )
        })
        .collect()
}

fn rejoin(span: &str, open: usize, close: usize, params: &[(String, String)]) -> String {
    let rendered = params
        .iter()
        .map(|(ty, name)| if name.is_empty() { ty.clone() } else { format!("{ty} {name}") })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({rendered}){}", &span[..open], &span[close + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prototype_span_extends_to_semicolon() {
        let content = "namespace ns {\nint add(int a, int b);\n}\n";
        let (start, end) = prototype_span(content, 2).unwrap();
        assert_eq!(&content[start..end], "int add(int a, int b);");
    }

    #[test]
    fn rewrite_return_type_preserves_name_and_params() {
        let rewritten = rewrite_prototype(
            "int add(int a, int b);",
            &PrototypeChange::ReturnType {
                qualified_name: "ns::add".into(),
                new_type: "long".into(),
            },
        )
        .unwrap();
        assert_eq!(rewritten, "long add(int a, int b);");
    }

    #[test]
    fn rewrite_parameter_name_only_touches_that_parameter() {
        let rewritten = rewrite_prototype(
            "int add(int a, int b);",
            &PrototypeChange::ParameterName {
                qualified_name: "ns::add".into(),
                index: 1,
                new_name: "second".into(),
            },
        )
        .unwrap();
        assert_eq!(rewritten, "int add(int a, int second);");
    }

    #[test]
    fn rewrite_rename_preserves_return_type_and_params() {
        let rewritten = rewrite_prototype(
            "int add(int a, int b);",
            &PrototypeChange::Rename {
                qualified_name: "ns::add".into(),
                new_name: "sum".into(),
            },
        )
        .unwrap();
        assert_eq!(rewritten, "int sum(int a, int b);");
    }

    #[test]
    fn rewrite_rename_preserves_namespace_qualifier() {
        let rewritten = rewrite_prototype(
            "int ns::add(int a, int b);",
            &PrototypeChange::Rename {
                qualified_name: "ns::add".into(),
                new_name: "sum".into(),
            },
        )
        .unwrap();
        assert_eq!(rewritten, "int ns::sum(int a, int b);");
    }

    #[test]
    fn rewrite_add_parameter_appends_at_end_by_default() {
        let rewritten = rewrite_prototype(
            "int add(int a, int b);",
            &PrototypeChange::AddParameter {
                qualified_name: "ns::add".into(),
                index: None,
                param_type: "int".into(),
                param_name: "c".into(),
            },
        )
        .unwrap();
        assert_eq!(rewritten, "int add(int a, int b, int c);");
    }

    #[test]
    fn rewrite_add_parameter_inserts_at_given_index() {
        let rewritten = rewrite_prototype(
            "int add(int a, int b);",
            &PrototypeChange::AddParameter {
                qualified_name: "ns::add".into(),
                index: Some(0),
                param_type: "int".into(),
                param_name: "z".into(),
            },
        )
        .unwrap();
        assert_eq!(rewritten, "int add(int z, int a, int b);");
    }

    #[test]
    fn rewrite_remove_parameter_drops_only_that_one() {
        let rewritten = rewrite_prototype(
            "int add(int a, int b, int c);",
            &PrototypeChange::RemoveParameter {
                qualified_name: "ns::add".into(),
                index: 1,
            },
        )
        .unwrap();
        assert_eq!(rewritten, "int add(int a, int c);");
    }

    #[test]
    fn rewrite_remove_parameter_out_of_range_is_rejected() {
        let rewritten = rewrite_prototype(
            "int add(int a);",
            &PrototypeChange::RemoveParameter {
                qualified_name: "ns::add".into(),
                index: 5,
            },
        );
        assert!(rewritten.is_none());
    }
}
