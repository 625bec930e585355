//! Replace Microsoft-specific syntax with portable macros backed by a
//! generated compatibility header. A faithful port of
//! `original_source/core/mods/ms_macro_replacement.py`'s two-pass
//! algorithm: scan every source file first to decide which macros are
//! needed, emit one header edit, then replace one occurrence at a time
//! across all files, re-reading from disk before each match so line
//! numbers stay valid after earlier edits in the same file commit.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::edits::{list_source_files, Edit, EditGenerator};
use crate::errors::Result;
use crate::oracle::OracleProfile;
use crate::symbol::SymbolTable;

pub const HEADER_NAME: &str = "levelup_msvc_compat.h";

struct MacroDef {
    macro_name: &'static str,
    msvc: &'static str,
    other: &'static str,
    has_arg: bool,
    needs_cstdint: bool,
}

/// Ordered `(pattern, macro)` table, mirroring `PATTERNS` in the source —
/// order matters only for scan determinism, since every pattern is tried
/// against every file regardless of order.
fn patterns() -> &'static [(&'static str, &'static str)] {
    &[
        (r"__forceinline", "LEVELUP_FORCEINLINE"),
        (r"__declspec\s*\(\s*dllexport\s*\)", "LEVELUP_DECLSPEC_DLLEXPORT"),
        (r"__declspec\s*\(\s*dllimport\s*\)", "LEVELUP_DECLSPEC_DLLIMPORT"),
        (r"__declspec\s*\(\s*nothrow\s*\)", "LEVELUP_DECLSPEC_NOTHROW"),
        (r"__declspec\s*\(\s*noreturn\s*\)", "LEVELUP_DECLSPEC_NORETURN"),
        (
            r"__declspec\s*\(\s*align\s*\(\s*(\d+)\s*\)\s*\)",
            "LEVELUP_DECLSPEC_ALIGN",
        ),
        (r"__declspec\s*\(\s*novtable\s*\)", "LEVELUP_DECLSPEC_NOVTABLE"),
        (r"__assume\s*\(", "LEVELUP_ASSUME"),
        (r"__int8", "LEVELUP_INT8"),
        (r"__int16", "LEVELUP_INT16"),
        (r"__int32", "LEVELUP_INT32"),
        (r"__int64", "LEVELUP_INT64"),
    ]
}

fn macro_defs() -> &'static [MacroDef] {
    static DEFS: OnceLock<Vec<MacroDef>> = OnceLock::new();
    DEFS.get_or_init(|| {
        vec![
            MacroDef { macro_name: "LEVELUP_FORCEINLINE", msvc: "__forceinline", other: "inline", has_arg: false, needs_cstdint: false },
            MacroDef { macro_name: "LEVELUP_DECLSPEC_DLLEXPORT", msvc: "__declspec(dllexport)", other: "", has_arg: false, needs_cstdint: false },
            MacroDef { macro_name: "LEVELUP_DECLSPEC_DLLIMPORT", msvc: "__declspec(dllimport)", other: "", has_arg: false, needs_cstdint: false },
            MacroDef { macro_name: "LEVELUP_DECLSPEC_NOTHROW", msvc: "__declspec(nothrow)", other: "", has_arg: false, needs_cstdint: false },
            MacroDef { macro_name: "LEVELUP_DECLSPEC_NORETURN", msvc: "__declspec(noreturn)", other: "", has_arg: false, needs_cstdint: false },
            MacroDef { macro_name: "LEVELUP_DECLSPEC_ALIGN", msvc: "__declspec(align(x))", other: "", has_arg: true, needs_cstdint: false },
            MacroDef { macro_name: "LEVELUP_DECLSPEC_NOVTABLE", msvc: "__declspec(novtable)", other: "", has_arg: false, needs_cstdint: false },
            MacroDef { macro_name: "LEVELUP_ASSUME", msvc: "__assume", other: "(void)", has_arg: true, needs_cstdint: false },
            MacroDef { macro_name: "LEVELUP_INT8", msvc: "__int8", other: "int8_t", has_arg: false, needs_cstdint: true },
            MacroDef { macro_name: "LEVELUP_INT16", msvc: "__int16", other: "int16_t", has_arg: false, needs_cstdint: true },
            MacroDef { macro_name: "LEVELUP_INT32", msvc: "__int32", other: "int32_t", has_arg: false, needs_cstdint: true },
            MacroDef { macro_name: "LEVELUP_INT64", msvc: "__int64", other: "int64_t", has_arg: false, needs_cstdint: true },
        ]
    })
}

fn find_def(name: &str) -> Option<&'static MacroDef> {
    macro_defs().iter().find(|d| d.macro_name == name)
}

pub struct MsMacroReplacementGenerator;

impl MsMacroReplacementGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MsMacroReplacementGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl EditGenerator for MsMacroReplacementGenerator {
    fn id(&self) -> &'static str {
        "ms_macro_replacement"
    }

    fn name(&self) -> &'static str {
        "MS Macro Replacement"
    }

    fn generate<'a>(
        &'a self,
        repo_path: &'a Path,
        _symbols: &'a SymbolTable,
    ) -> Box<dyn Iterator<Item = Result<Edit>> + 'a> {
        let files = list_source_files(repo_path);
        let repo_path = repo_path.to_path_buf();

        let mut used_macros = BTreeSet::new();
        let mut needs_cstdint = false;
        for file in &files {
            scan_file_for_macros(file, &mut used_macros, &mut needs_cstdint);
        }

        if used_macros.is_empty() {
            return Box::new(std::iter::empty());
        }

        let header_path = repo_path.join(HEADER_NAME);
        let header_contents = generate_header(&used_macros, needs_cstdint);

        let header_edit = match std::fs::write(&header_path, &header_contents) {
            Ok(()) => Edit {
                file: header_path.clone(),
                commit_message: format!("Add {HEADER_NAME} with macro definitions"),
                oracle_profile: OracleProfile::O0,
                success_probability: 1.0,
                original_content: String::new(),
            },
            Err(e) => return Box::new(std::iter::once(Err(e.into()))),
        };

        let state = RefCell::new(FileProcessState::default());
        Box::new(
            std::iter::once(Ok(header_edit)).chain(files.into_iter().flat_map(move |file| {
                process_file_edits(file, &state)
            })),
        )
    }
}

fn scan_file_for_macros(file: &Path, used_macros: &mut BTreeSet<&'static str>, needs_cstdint: &mut bool) {
    let Ok(content) = std::fs::read_to_string(file) else {
        return;
    };
    for (pattern, macro_name) in patterns() {
        let base_macro = macro_name.split('(').next().unwrap_or(macro_name);
        let Ok(regex) = Regex::new(&format!(r"\b{pattern}\b")) else {
            continue;
        };
        if regex.is_match(&content) {
            used_macros.insert(base_macro);
            if find_def(base_macro).is_some_and(|d| d.needs_cstdint) {
                *needs_cstdint = true;
            }
        }
    }
}

fn generate_header(used_macros: &BTreeSet<&'static str>, needs_cstdint: bool) -> String {
    let mut lines = vec![
        "#ifndef LEVELUP_MSVC_COMPAT_H".to_string(),
        "#define LEVELUP_MSVC_COMPAT_H".to_string(),
        String::new(),
    ];
    if needs_cstdint {
        lines.push("#include <cstdint>".to_string());
        lines.push(String::new());
    }
    lines.push("#ifdef _MSC_VER".to_string());
    lines.push("  // MSVC: Use native Microsoft extensions".to_string());
    for macro_name in used_macros {
        if let Some(def) = find_def(macro_name) {
            if def.has_arg {
                match *macro_name {
                    "LEVELUP_DECLSPEC_ALIGN" => {
                        lines.push(format!("  #define {macro_name}(x) __declspec(align(x))"))
                    }
                    "LEVELUP_ASSUME" => {
                        lines.push(format!("  #define {macro_name}(expr) __assume(expr)"))
                    }
                    _ => {}
                }
            } else {
                lines.push(format!("  #define {macro_name} {}", def.msvc));
            }
        }
    }
    lines.push("#else".to_string());
    lines.push("  // Clang/GCC: Use standards-compliant or best-effort equivalents".to_string());
    for macro_name in used_macros {
        if let Some(def) = find_def(macro_name) {
            if def.has_arg {
                match *macro_name {
                    "LEVELUP_DECLSPEC_ALIGN" => lines.push(format!("  #define {macro_name}(x)")),
                    "LEVELUP_ASSUME" => {
                        lines.push(format!("  #define {macro_name}(expr) (void)(expr)"))
                    }
                    _ => {}
                }
            } else {
                lines.push(format!("  #define {macro_name} {}", def.other));
            }
        }
    }
    lines.push("#endif".to_string());
    lines.push(String::new());
    lines.push("#endif // LEVELUP_MSVC_COMPAT_H".to_string());
    lines.push(String::new());
    lines.join("\n")
}

/// Per-generator-run state: which files have already had the include
/// inserted, so `process_file_edits` doesn't re-check on every call.
#[derive(Default)]
struct FileProcessState {
    include_inserted: BTreeSet<PathBuf>,
}

fn process_file_edits(
    file: PathBuf,
    state: &RefCell<FileProcessState>,
) -> Box<dyn Iterator<Item = Result<Edit>>> {
    let Ok(content) = std::fs::read_to_string(&file) else {
        return Box::new(std::iter::empty());
    };

    let needs_changes = patterns().iter().any(|(pattern, _)| {
        Regex::new(&format!(r"\b{pattern}\b"))
            .map(|r| r.is_match(&content))
            .unwrap_or(false)
    });
    if !needs_changes {
        return Box::new(std::iter::empty());
    }

    let mut edits = Vec::new();

    let include_line = format!("#include \"{HEADER_NAME}\"");
    if !content.contains(&include_line) {
        if let Some(edit) = insert_include(&file, &content, &include_line) {
            edits.push(edit);
        }
        state.borrow_mut().include_inserted.insert(file.clone());
    }

    for (pattern, macro_name) in patterns() {
        loop {
            let Ok(current) = std::fs::read_to_string(&file) else {
                break;
            };
            let cleaned = remove_strings_and_comments(&current);
            let Ok(regex) = Regex::new(&format!(r"\b{pattern}\b")) else {
                break;
            };
            let Some(m) = regex.find(&cleaned) else {
                break;
            };

            let line_num = cleaned[..m.start()].matches('\n').count() + 1;
            let matched_text = &current[m.start()..m.end()];
            let replacement = if *macro_name == "LEVELUP_DECLSPEC_ALIGN" {
                let digits = regex
                    .captures(matched_text)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str())
                    .unwrap_or("0");
                format!("LEVELUP_DECLSPEC_ALIGN({digits})")
            } else {
                macro_name.to_string()
            };

            let mut new_content = String::with_capacity(current.len());
            new_content.push_str(&current[..m.start()]);
            new_content.push_str(&replacement);
            new_content.push_str(&current[m.end()..]);

            let base_macro = macro_name.split('(').next().unwrap_or(macro_name);
            let commit_message = format!(
                "Replace '{matched_text}' with {base_macro} at {}:{line_num}",
                file.display()
            );

            match std::fs::write(&file, &new_content) {
                Ok(()) => edits.push(Ok(Edit {
                    file: file.clone(),
                    commit_message,
                    oracle_profile: OracleProfile::O0,
                    success_probability: 0.9,
                    original_content: current,
                })),
                Err(e) => {
                    edits.push(Err(e.into()));
                    break;
                }
            }
        }
    }

    Box::new(edits.into_iter())
}

fn insert_include(file: &Path, content: &str, include_line: &str) -> Option<Result<Edit>> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut insert_pos = 0usize;
    let mut in_block_comment = false;

    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim();
        if stripped.contains("/*") {
            in_block_comment = true;
        }
        if stripped.contains("*/") {
            in_block_comment = false;
            insert_pos = i + 1;
            continue;
        }
        if in_block_comment || stripped.is_empty() || stripped.starts_with("//") {
            insert_pos = i + 1;
            continue;
        }
        break;
    }

    let mut new_lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
    new_lines.insert(insert_pos, include_line.to_string());
    let new_content = new_lines.join("\n");

    if let Err(e) = std::fs::write(file, &new_content) {
        return Some(Err(e.into()));
    }

    Some(Ok(Edit {
        file: file.to_path_buf(),
        commit_message: format!(
            "Add {HEADER_NAME} include to {}",
            file.file_name().and_then(|n| n.to_str()).unwrap_or("file")
        ),
        oracle_profile: OracleProfile::O0,
        success_probability: 1.0,
        original_content: content.to_string(),
    }))
}

/// Blank out string/char literals and comments so pattern matches never
/// land inside them, while preserving byte offsets (replacement text is
/// the same length as the original, all spaces).
fn remove_strings_and_comments(content: &str) -> String {
    fn blank_matches(input: &str, re: &Regex) -> String {
        let mut out = String::with_capacity(input.len());
        let mut last = 0;
        for m in re.find_iter(input) {
            out.push_str(&input[last..m.start()]);
            out.push_str(&" ".repeat(m.as_str().chars().count()));
            last = m.end();
        }
        out.push_str(&input[last..]);
        out
    }

    static STRING_RE: OnceLock<Regex> = OnceLock::new();
    static CHAR_RE: OnceLock<Regex> = OnceLock::new();
    static BLOCK_COMMENT_RE: OnceLock<Regex> = OnceLock::new();
    static LINE_COMMENT_RE: OnceLock<Regex> = OnceLock::new();

    let string_re = STRING_RE.get_or_init(|| Regex::new(r#""(?:[^"\\]|\\.)*""#).unwrap());
    let char_re = CHAR_RE.get_or_init(|| Regex::new(r"'(?:[^'\\]|\\.)*'").unwrap());
    let block_re =
        BLOCK_COMMENT_RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
    let line_re = LINE_COMMENT_RE.get_or_init(|| Regex::new(r"//[^\n]*").unwrap());

    let result = blank_matches(content, string_re);
    let result = blank_matches(&result, char_re);
    let result = blank_matches(&result, block_re);
    blank_matches(&result, line_re)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_includes_only_used_macros_sorted() {
        let mut used = BTreeSet::new();
        used.insert("LEVELUP_FORCEINLINE");
        used.insert("LEVELUP_INT8");
        let header = generate_header(&used, true);
        assert!(header.contains("#include <cstdint>"));
        assert!(header.contains("#define LEVELUP_FORCEINLINE __forceinline"));
        assert!(header.contains("#define LEVELUP_INT8 int8_t"));
        assert!(!header.contains("LEVELUP_ASSUME"));
    }

    #[test]
    fn remove_strings_and_comments_preserves_offsets() {
        let content = r#"int x = 1; // __forceinline in a comment
const char* s = "__forceinline in a string";
__forceinline void f();"#;
        let cleaned = remove_strings_and_comments(content);
        assert_eq!(cleaned.len(), content.len());
        assert!(!cleaned.contains("__forceinline in a comment"));
        assert!(!cleaned.contains("__forceinline in a string"));
        assert!(cleaned.contains("__forceinline void f();"));
    }

    #[test]
    fn scan_detects_macro_usage_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.cpp");
        std::fs::write(&file, "__forceinline void f() {}\n").unwrap();

        let mut used = BTreeSet::new();
        let mut needs_cstdint = false;
        scan_file_for_macros(&file, &mut used, &mut needs_cstdint);
        assert!(used.contains("LEVELUP_FORCEINLINE"));
        assert!(!needs_cstdint);
    }
}
