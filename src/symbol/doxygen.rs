//! Doxygen-backed symbol extraction: write a minimal Doxyfile, invoke the
//! `doxygen` binary, and walk its generated XML into `Symbol` values.
//!
//! Grounded in `original_source/core/doxygen/doxygen_parser.py` and
//! `doxygen_runner.py`. The Python implementation keeps an unexpanded and a
//! macro-expanded XML pass merged by `(qualified_name, file, line)`; this
//! port keeps only the unexpanded pass, since the oracle (not the symbol
//! table) is where macro expansion actually matters for this engine.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::config::ToolchainConfig;
use crate::errors::{LevelupError, Result};
use crate::symbol::types::{ClassSymbol, EnumSymbol, FunctionSymbol, LineSpan, Symbol, SymbolHeader};

/// Compound kinds Doxygen's `index.xml` lists that this parser cares about.
const RELEVANT_COMPOUND_KINDS: &[&str] = &["file", "class", "struct", "namespace"];

/// Extracts symbols from a directory of C++ sources.
///
/// A `SymbolParser` implementation owns the decision of how to discover
/// symbols; callers (the `SymbolTable`, the edit generators) only depend on
/// this trait so that a faster or narrower parser can stand in for tests.
pub trait SymbolParser {
    fn parse(&self, source_root: &Path) -> Result<Vec<Symbol>>;
}

/// Runs `doxygen` against a generated Doxyfile and parses its XML output.
pub struct DoxygenParser {
    binary: PathBuf,
}

impl DoxygenParser {
    pub fn new(toolchain: &ToolchainConfig) -> Self {
        Self {
            binary: toolchain.doxygen_binary(),
        }
    }

    fn write_doxyfile(&self, source_root: &Path, xml_out: &Path) -> Result<PathBuf> {
        let doxyfile = xml_out.join("Doxyfile");
        let contents = format!(
            "INPUT = {input}\n\
             OUTPUT_DIRECTORY = {output}\n\
             GENERATE_XML = YES\n\
             GENERATE_HTML = NO\n\
             GENERATE_LATEX = NO\n\
             RECURSIVE = YES\n\
             QUIET = YES\n\
             WARN_IF_UNDOCUMENTED = NO\n\
             EXTRACT_ALL = YES\n\
             EXTRACT_PRIVATE = YES\n\
             EXTRACT_STATIC = YES\n\
             REFERENCES_RELATION = YES\n\
             REFERENCED_BY_RELATION = YES\n",
            input = source_root.display(),
            output = xml_out.display(),
        );
        std::fs::write(&doxyfile, contents)?;
        Ok(doxyfile)
    }
}

impl SymbolParser for DoxygenParser {
    fn parse(&self, source_root: &Path) -> Result<Vec<Symbol>> {
        let xml_dir = tempfile::tempdir()?;
        let doxyfile = self.write_doxyfile(source_root, xml_dir.path())?;

        let status = Command::new(&self.binary)
            .arg(&doxyfile)
            .current_dir(xml_dir.path())
            .status()
            .map_err(|e| LevelupError::Workspace(format!("failed to run doxygen: {e}")))?;
        if !status.success() {
            return Err(LevelupError::Workspace(format!(
                "doxygen exited with {status}"
            )));
        }

        let index = xml_dir.path().join("xml").join("index.xml");
        if !index.exists() {
            return Err(LevelupError::Workspace(format!(
                "doxygen did not produce {}",
                index.display()
            )));
        }
        parse_xml_tree(&xml_dir.path().join("xml"))
    }
}

/// Walk `index.xml`, then every referenced compound file, collecting symbols.
fn parse_xml_tree(xml_dir: &Path) -> Result<Vec<Symbol>> {
    let mut symbols = Vec::new();
    for (refid, kind) in list_compounds(&xml_dir.join("index.xml"))? {
        if !RELEVANT_COMPOUND_KINDS.contains(&kind.as_str()) {
            continue;
        }
        let compound_file = xml_dir.join(format!("{refid}.xml"));
        if compound_file.exists() {
            symbols.extend(parse_compound_file(&compound_file, &kind)?);
        }
    }
    Ok(symbols)
}

/// Read `<compound refid="..." kind="...">` entries out of `index.xml`.
fn list_compounds(index_file: &Path) -> Result<Vec<(String, String)>> {
    let data = std::fs::read_to_string(index_file)?;
    let mut reader = Reader::from_str(&data);
    reader.config_mut().trim_text(true);

    let mut compounds = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"compound" => {
                let mut refid = None;
                let mut kind = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"refid" => refid = Some(attr.unescape_value()?.into_owned()),
                        b"kind" => kind = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(refid), Some(kind)) = (refid, kind) {
                    compounds.push((refid, kind));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(LevelupError::Workspace(format!(
                    "malformed doxygen index.xml: {e}"
                )))
            }
        }
        buf.clear();
    }
    Ok(compounds)
}

/// A flattened view of one `<memberdef>` element, built incrementally while
/// walking the event stream so nested `<param>`/`<location>` elements can be
/// attributed to the member currently open.
#[derive(Default)]
struct MemberBuilder {
    kind: String,
    id: String,
    name: String,
    qualified_name: String,
    return_type: String,
    params: Vec<(String, String)>,
    file: String,
    line: usize,
    body_end: usize,
    calls: HashSet<String>,
    called_by: HashSet<String>,
    in_type: bool,
    in_name: bool,
    in_qualifiedname: bool,
    current_param_type: Option<String>,
    current_param_name: Option<String>,
    in_param_type: bool,
    in_param_declname: bool,
}

/// Parse one compound XML file (`classFoo.xml`, `namespaceBar.xml`, a
/// `.cpp`/`.h` file's own compound) into the symbols it defines.
fn parse_compound_file(path: &Path, compound_kind: &str) -> Result<Vec<Symbol>> {
    let data = std::fs::read_to_string(path)?;
    let mut reader = Reader::from_str(&data);
    reader.config_mut().trim_text(true);

    let mut symbols = Vec::new();
    let mut buf = Vec::new();

    let mut compound_name = String::new();
    let mut compound_file = String::new();
    let mut in_compoundname = false;

    let mut current: Option<MemberBuilder> = None;
    let mut member_depth = 0u32;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = e.name();
                match tag.as_ref() {
                    b"compoundname" => in_compoundname = true,
                    b"location" if current.is_none() => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"file" {
                                compound_file = attr.unescape_value()?.into_owned();
                            }
                        }
                    }
                    b"memberdef" if current.is_none() => {
                        let mut kind = String::new();
                        let mut id = String::new();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"kind" => kind = attr.unescape_value()?.into_owned(),
                                b"id" => id = attr.unescape_value()?.into_owned(),
                                _ => {}
                            }
                        }
                        current = Some(MemberBuilder {
                            kind,
                            id,
                            file: compound_file.clone(),
                            ..Default::default()
                        });
                        member_depth = 1;
                    }
                    b"name" if current.is_some() => {
                        current.as_mut().unwrap().in_name = true;
                    }
                    b"qualifiedname" if current.is_some() => {
                        current.as_mut().unwrap().in_qualifiedname = true;
                    }
                    b"type" if current.is_some() => {
                        let m = current.as_mut().unwrap();
                        if m.in_param_type || m.current_param_type.is_some() {
                            m.in_param_type = true;
                        } else {
                            m.in_type = true;
                        }
                    }
                    b"param" if current.is_some() => {
                        let m = current.as_mut().unwrap();
                        m.current_param_type = Some(String::new());
                        m.current_param_name = Some(String::new());
                    }
                    b"declname" if current.is_some() => {
                        current.as_mut().unwrap().in_param_declname = true;
                    }
                    b"location" if current.is_some() => {
                        let m = current.as_mut().unwrap();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"file" => m.file = attr.unescape_value()?.into_owned(),
                                b"line" => {
                                    m.line = attr.unescape_value()?.parse().unwrap_or(0)
                                }
                                b"bodyend" => {
                                    m.body_end = attr.unescape_value()?.parse().unwrap_or(0)
                                }
                                _ => {}
                            }
                        }
                    }
                    b"references" if current.is_some() => {
                        let m = current.as_mut().unwrap();
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"refid" {
                                m.calls.insert(attr.unescape_value()?.into_owned());
                            }
                        }
                    }
                    b"referencedby" if current.is_some() => {
                        let m = current.as_mut().unwrap();
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"refid" {
                                m.called_by.insert(attr.unescape_value()?.into_owned());
                            }
                        }
                    }
                    b"memberdef" => member_depth += 1,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"location" {
                    if let Some(m) = current.as_mut() {
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"file" => m.file = attr.unescape_value()?.into_owned(),
                                b"line" => {
                                    m.line = attr.unescape_value()?.parse().unwrap_or(0)
                                }
                                b"bodyend" => {
                                    m.body_end = attr.unescape_value()?.parse().unwrap_or(0)
                                }
                                _ => {}
                            }
                        }
                    } else {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"file" {
                                compound_file = attr.unescape_value()?.into_owned();
                            }
                        }
                    }
                } else if e.name().as_ref() == b"references" {
                    if let Some(m) = current.as_mut() {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"refid" {
                                m.calls.insert(attr.unescape_value()?.into_owned());
                            }
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let text = quick_xml::escape::unescape(
                    &t.decode().map_err(quick_xml::Error::from)?,
                )
                .map_err(quick_xml::Error::from)?
                .into_owned();
                if in_compoundname {
                    compound_name.push_str(&text);
                } else if let Some(m) = current.as_mut() {
                    if m.in_param_declname {
                        if let Some(n) = m.current_param_name.as_mut() {
                            n.push_str(&text);
                        }
                    } else if m.in_param_type {
                        if let Some(t) = m.current_param_type.as_mut() {
                            t.push_str(&text);
                        }
                    } else if m.in_qualifiedname {
                        m.qualified_name.push_str(&text);
                    } else if m.in_name {
                        m.name.push_str(&text);
                    } else if m.in_type {
                        m.return_type.push_str(&text);
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"compoundname" => in_compoundname = false,
                b"name" => {
                    if let Some(m) = current.as_mut() {
                        m.in_name = false;
                    }
                }
                b"qualifiedname" => {
                    if let Some(m) = current.as_mut() {
                        m.in_qualifiedname = false;
                    }
                }
                b"type" => {
                    if let Some(m) = current.as_mut() {
                        if m.current_param_type.is_some() {
                            m.in_param_type = false;
                        } else {
                            m.in_type = false;
                        }
                    }
                }
                b"declname" => {
                    if let Some(m) = current.as_mut() {
                        m.in_param_declname = false;
                    }
                }
                b"param" => {
                    if let Some(m) = current.as_mut() {
                        let ptype = m.current_param_type.take().unwrap_or_default();
                        let pname = m.current_param_name.take().unwrap_or_default();
                        if !ptype.is_empty() {
                            m.params.push((ptype, pname));
                        }
                    }
                }
                b"memberdef" => {
                    member_depth -= 1;
                    if member_depth == 0 {
                        if let Some(m) = current.take() {
                            if let Some(symbol) =
                                finish_member(m, &compound_name, compound_kind)
                            {
                                symbols.push(symbol);
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(LevelupError::Workspace(format!(
                    "malformed doxygen compound xml {}: {e}",
                    path.display()
                )))
            }
        }
        buf.clear();
    }

    Ok(symbols)
}

fn finish_member(m: MemberBuilder, compound_name: &str, compound_kind: &str) -> Option<Symbol> {
    if m.name.is_empty() {
        return None;
    }
    let qualified_name = if !m.qualified_name.is_empty() {
        m.qualified_name
    } else if !compound_name.is_empty() {
        format!("{compound_name}::{}", m.name)
    } else {
        m.name.clone()
    };

    let header = SymbolHeader {
        id: m.id,
        simple_name: m.name,
        qualified_name,
        file: PathBuf::from(m.file),
        span: LineSpan::new(m.line, if m.body_end > 0 { m.body_end } else { m.line }),
    };

    match m.kind.as_str() {
        "function" => Some(Symbol::Function(FunctionSymbol {
            header,
            return_type: m.return_type.trim().to_string(),
            parameters: m.params,
            member_of: (compound_kind == "class" || compound_kind == "struct")
                .then(|| compound_name.to_string()),
            calls: m.calls,
            called_by: m.called_by,
        })),
        "enum" => Some(Symbol::Enum(EnumSymbol { header })),
        _ => None,
    }
}

/// A compound-level `class`/`struct` symbol, parsed straight from
/// `<compounddef kind="class|struct">` without going through a memberdef.
pub(crate) fn class_symbol_from_compound(
    compound_name: &str,
    file: &str,
    line_start: usize,
    line_end: usize,
    is_struct: bool,
    doxygen_id: &str,
) -> Symbol {
    Symbol::Class(ClassSymbol {
        header: SymbolHeader {
            id: doxygen_id.to_string(),
            simple_name: compound_name
                .rsplit("::")
                .next()
                .unwrap_or(compound_name)
                .to_string(),
            qualified_name: compound_name.to_string(),
            file: PathBuf::from(file),
            span: LineSpan::new(line_start, line_end),
        },
        is_struct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_compounds_filters_nothing_itself() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index.xml");
        std::fs::write(
            &index,
            r#"<?xml version="1.0"?>
            <doxygenindex>
              <compound refid="classWidget" kind="class"><name>Widget</name></compound>
              <compound refid="dir_a" kind="dir"><name>a</name></compound>
            </doxygenindex>"#,
        )
        .unwrap();

        let compounds = list_compounds(&index).unwrap();
        assert_eq!(
            compounds,
            vec![
                ("classWidget".to_string(), "class".to_string()),
                ("dir_a".to_string(), "dir".to_string())
            ]
        );
    }

    #[test]
    fn parse_compound_file_extracts_function_with_params_and_refs() {
        let dir = tempfile::tempdir().unwrap();
        let compound = dir.path().join("namespacens.xml");
        std::fs::write(
            &compound,
            r#"<?xml version="1.0"?>
            <doxygen>
              <compounddef id="namespacens" kind="namespace">
                <compoundname>ns</compoundname>
                <sectiondef kind="func">
                  <memberdef kind="function" id="ns_1add">
                    <type>int</type>
                    <name>add</name>
                    <qualifiedname>ns::add</qualifiedname>
                    <param>
                      <type>int</type>
                      <declname>a</declname>
                    </param>
                    <param>
                      <type>int</type>
                      <declname>b</declname>
                    </param>
                    <references refid="ns_1helper">helper</references>
                    <location file="math.cpp" line="10" bodyend="14"/>
                  </memberdef>
                </sectiondef>
              </compounddef>
            </doxygen>"#,
        )
        .unwrap();

        let symbols = parse_compound_file(&compound, "namespace").unwrap();
        assert_eq!(symbols.len(), 1);
        let func = symbols[0].as_function().unwrap();
        assert_eq!(func.header.qualified_name, "ns::add");
        assert_eq!(func.return_type, "int");
        assert_eq!(
            func.parameters,
            vec![("int".to_string(), "a".to_string()), ("int".to_string(), "b".to_string())]
        );
        assert_eq!(func.header.file, PathBuf::from("math.cpp"));
        assert_eq!(func.header.span, LineSpan::new(10, 14));
        assert!(func.calls.contains("ns_1helper"));
    }
}
