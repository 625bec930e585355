//! Function-body extraction from raw assembly listings, one routine per
//! backend format. Grounded line-for-line in
//! `original_source/core/validators/asm_validator.py`'s
//! `_extract_functions_msvc`/`_extract_functions_clang`.

use std::collections::BTreeMap;

/// Which assembler dialect a listing is in, or `Unknown` if neither
/// backend's markers are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmFormat {
    Msvc,
    Clang,
    Unknown,
}

/// Detect dialect from characteristic markers: MSVC brackets function
/// bodies in `PROC`/`ENDP`, Clang emits `.globl`/`.text` directives.
pub fn detect_format(asm: &str) -> AsmFormat {
    if asm.is_empty() {
        return AsmFormat::Unknown;
    }
    if asm.contains(" PROC") && asm.contains(" ENDP") {
        return AsmFormat::Msvc;
    }
    if asm.contains(".globl") || asm.contains(".text") {
        return AsmFormat::Clang;
    }
    AsmFormat::Unknown
}

/// Collapse runs of whitespace to single spaces, matching Python's
/// `' '.join(line.split())`.
fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

const MSVC_METADATA_PREFIXES: &[&str] = &["_TEXT", "pdata", "xdata", "CONST", "DD ", "DQ "];

/// Extract named function bodies from an MSVC listing (`PROC`/`ENDP`
/// delimited), returning an ordered map so the caller's output is
/// deterministic.
pub fn extract_functions_msvc(asm: &str) -> BTreeMap<String, Vec<String>> {
    let mut functions = BTreeMap::new();
    let mut current_func: Option<String> = None;
    let mut current_body: Vec<String> = Vec::new();

    for raw_line in asm.lines() {
        let mut line = raw_line.trim_end().to_string();
        if let Some(idx) = line.find(';') {
            line.truncate(idx);
            line = line.trim_end().to_string();
        }
        let line = collapse_whitespace(&line);
        if line.is_empty() {
            continue;
        }

        if line.contains(" PROC") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 && parts[1] == "PROC" {
                current_func = Some(parts[0].to_string());
                current_body = Vec::new();
            }
            continue;
        }

        if line.contains(" ENDP") && current_func.is_some() {
            if let Some(name) = current_func.take() {
                functions.insert(name, current_body);
            }
            current_body = Vec::new();
            continue;
        }

        if current_func.is_some() {
            if MSVC_METADATA_PREFIXES.iter().any(|p| line.starts_with(p)) {
                continue;
            }
            if line.contains("$ =") {
                continue;
            }
            current_body.push(line);
        }
    }

    functions
}

const CLANG_SKIP_PREFIXES: &[&str] = &[
    ".seh_",
    ".def",
    ".scl",
    ".type",
    ".endef",
    ".p2align",
    ".file",
    ".intel_syntax",
    "@feat.00",
    ".L",
    ".cfi_",
];

/// Extract named function bodies from a Clang listing (label-delimited,
/// `.globl`/`.section`/`.addrsig` as the end markers).
pub fn extract_functions_clang(asm: &str) -> BTreeMap<String, Vec<String>> {
    let mut functions = BTreeMap::new();
    let mut current_func: Option<String> = None;
    let mut current_body: Vec<String> = Vec::new();
    let mut in_debug_section = false;

    for raw_line in asm.lines() {
        let line = raw_line.trim_end();

        if line.trim_start().starts_with(".section") && line.to_lowercase().contains("debug") {
            in_debug_section = true;
            continue;
        }
        if in_debug_section {
            let trimmed = line.trim_start();
            if trimmed.starts_with(".text") || trimmed.starts_with(".globl") {
                in_debug_section = false;
            } else {
                continue;
            }
        }

        let mut line = line.to_string();
        if let Some(idx) = line.find('#') {
            line.truncate(idx);
            line = line.trim_end().to_string();
        }
        let line = collapse_whitespace(&line);
        if line.is_empty() {
            continue;
        }

        if line.ends_with(':') && !line.starts_with('.') {
            let func_name = line[..line.len() - 1].trim().trim_matches('"').to_string();
            if !func_name.starts_with(".L") && !func_name.starts_with(".seh") {
                current_func = Some(func_name);
                current_body = Vec::new();
            }
            continue;
        }

        if current_func.is_some() {
            if line.starts_with(".globl") || line.starts_with(".addrsig") || line.starts_with(".section") {
                if !current_body.is_empty() {
                    if let Some(name) = current_func.take() {
                        functions.insert(name, current_body);
                    }
                }
                current_func = None;
                current_body = Vec::new();
                continue;
            }

            if CLANG_SKIP_PREFIXES.iter().any(|p| line.starts_with(p)) {
                continue;
            }

            current_body.push(line);
        }
    }

    if let Some(name) = current_func {
        if !current_body.is_empty() {
            functions.insert(name, current_body);
        }
    }

    functions
}

/// Extract function bodies, auto-detecting dialect. An undetectable format
/// yields an empty map rather than an error: the caller treats it as an
/// `Unknown` verdict, not a crash.
pub fn extract_functions(asm: &str) -> BTreeMap<String, Vec<String>> {
    match detect_format(asm) {
        AsmFormat::Msvc => extract_functions_msvc(asm),
        AsmFormat::Clang => extract_functions_clang(asm),
        AsmFormat::Unknown => BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_msvc_format() {
        let asm = "foo PROC\nmov eax, 1\nfoo ENDP\n";
        assert_eq!(detect_format(asm), AsmFormat::Msvc);
    }

    #[test]
    fn detects_clang_format() {
        let asm = ".globl foo\n.text\nfoo:\nret\n";
        assert_eq!(detect_format(asm), AsmFormat::Clang);
    }

    #[test]
    fn msvc_extraction_skips_metadata_and_locals() {
        let asm = "\
_TEXT SEGMENT
foo PROC
x$ = 8
mov eax, DWORD PTR x$[rsp]
ret 0
foo ENDP
_TEXT ENDS
";
        let funcs = extract_functions_msvc(asm);
        assert_eq!(funcs.len(), 1);
        let body = &funcs["foo"];
        assert_eq!(body, &vec!["mov eax, DWORD PTR x$[rsp]".to_string(), "ret 0".to_string()]);
    }

    #[test]
    fn clang_extraction_handles_quoted_mangled_names() {
        let asm = "\
.text
.globl \"?add@@YAHHH@Z\"
\"?add@@YAHHH@Z\":
.seh_proc \"?add@@YAHHH@Z\"
mov eax, ecx
add eax, edx
ret
.seh_endproc
.addrsig
";
        let funcs = extract_functions_clang(asm);
        assert_eq!(funcs.len(), 1);
        assert_eq!(
            funcs["?add@@YAHHH@Z"],
            vec!["mov eax, ecx".to_string(), "add eax, edx".to_string(), "ret".to_string()]
        );
    }

    #[test]
    fn clang_extraction_skips_debug_sections() {
        let asm = "\
.text
.globl foo
foo:
ret
.section .debug_info,\"dr\"
garbage that must not appear
.text
";
        let funcs = extract_functions_clang(asm);
        assert_eq!(funcs["foo"], vec!["ret".to_string()]);
    }
}
