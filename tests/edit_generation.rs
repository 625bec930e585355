//! Integration tests that drive the `EditLibrary`'s generators over a
//! scratch directory the way a job would: list files, apply one edit,
//! check the edit carries enough to validate and revert it.

use std::fs;

use levelup_core::edits::EditLibrary;
use levelup_core::symbol::SymbolTable;

fn write_source(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn add_override_generator_yields_one_edit_per_call_and_writes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    write_source(
        dir.path(),
        "widget.h",
        "class Widget {\npublic:\n  virtual void draw();\n};\n",
    );

    let library = EditLibrary::with_builtins();
    let generator = library.get("add_override").unwrap();
    let symbols = SymbolTable::new();

    let edits: Vec<_> = generator
        .generate(dir.path(), &symbols)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(edits.len(), 1);
    let edit = &edits[0];
    assert!(edit.commit_message.contains("override"));
    assert!(edit.original_content.contains("virtual void draw();"));

    let on_disk = fs::read_to_string(&edit.file).unwrap();
    assert!(on_disk.contains("virtual void draw() override;"));
    assert_ne!(on_disk, edit.original_content);
}

#[test]
fn remove_inline_generator_strips_the_keyword_once() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "math.cpp", "inline int square(int x) { return x * x; }\n");

    let library = EditLibrary::with_builtins();
    let generator = library.get("remove_inline").unwrap();
    let symbols = SymbolTable::new();

    let edits: Vec<_> = generator
        .generate(dir.path(), &symbols)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(edits.len(), 1);
    let on_disk = fs::read_to_string(&edits[0].file).unwrap();
    assert_eq!(on_disk, "int square(int x) { return x * x; }\n");
}

#[test]
fn ms_macro_generator_produces_a_header_edit_before_any_file_edit() {
    let dir = tempfile::tempdir().unwrap();
    write_source(
        dir.path(),
        "legacy.cpp",
        "__forceinline int add(int a, int b) { return a + b; }\n",
    );

    let library = EditLibrary::with_builtins();
    let generator = library.get("ms_macro_replacement").unwrap();
    let symbols = SymbolTable::new();

    let edits: Vec<_> = generator
        .generate(dir.path(), &symbols)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert!(edits.len() >= 2);
    assert!(edits[0].file.to_string_lossy().ends_with("levelup_msvc_compat.h"));

    let header = fs::read_to_string(&edits[0].file).unwrap();
    assert!(header.contains("LEVELUP_FORCEINLINE"));

    let patched = fs::read_to_string(dir.path().join("legacy.cpp")).unwrap();
    assert!(patched.contains("LEVELUP_FORCEINLINE"));
    assert!(patched.contains("levelup_msvc_compat.h"));
}

#[test]
fn unknown_mod_type_is_rejected_by_the_library() {
    let library = EditLibrary::with_builtins();
    assert!(library.get("does_not_exist").is_err());
}
