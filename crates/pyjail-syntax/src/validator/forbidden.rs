//! Denylist enforcement over the syntax tree.
//!
//! The scan is purely syntactic. Import aliases are resolved across the
//! whole module without regard to scope or control flow, which errs towards
//! flagging.

use std::collections::HashMap;
use std::fmt;

use tree_sitter::Node;

use super::policy::Denylist;
use crate::position::Location;
use crate::walk::{Visit, node_text, preorder};

/// A denied name and the way the script used it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ForbiddenConstruct {
    /// `import m` or `from m import x` where `m` or a parent package is
    /// denied.
    Import(String),
    /// `from m import x` where `m.x` is a denied attribute or builtin.
    ImportedName(String),
    /// Any reference to a denied builtin.
    Builtin(String),
    /// Access to a denied qualified or bare attribute.
    Attribute(String),
}

impl fmt::Display for ForbiddenConstruct {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Import(module) => write!(formatter, "import of module '{module}'"),
            Self::ImportedName(path) => write!(formatter, "import of '{path}'"),
            Self::Builtin(name) => write!(formatter, "use of builtin '{name}'"),
            Self::Attribute(path) => write!(formatter, "access to attribute '{path}'"),
        }
    }
}

/// Where a forbidden construct first appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenUse {
    /// What was used.
    pub construct: ForbiddenConstruct,
    /// First occurrence in the script.
    pub location: Location,
}

impl fmt::Display for ForbiddenUse {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} at {}", self.construct, self.location)
    }
}

/// Lists every distinct forbidden construct in source order.
pub(super) fn find_forbidden(
    module: Node<'_>,
    source: &str,
    denylist: &Denylist,
) -> Vec<ForbiddenUse> {
    let mut scan = Scan {
        source,
        denylist,
        aliases: ImportAliases::collect(module, source),
        max_path_depth: denylist.max_attribute_depth(),
        found: Vec::new(),
    };
    for visit in preorder(module) {
        scan.inspect(&visit);
    }
    scan.found
}

struct Scan<'a> {
    source: &'a str,
    denylist: &'a Denylist,
    aliases: ImportAliases,
    max_path_depth: usize,
    found: Vec<ForbiddenUse>,
}

impl Scan<'_> {
    fn inspect(&mut self, visit: &Visit<'_>) {
        let node = visit.node;
        match node.kind() {
            "import_statement" => self.inspect_import(node),
            "import_from_statement" => self.inspect_import_from(node),
            "attribute" => self.inspect_attribute(visit),
            "identifier" if is_reference(visit) => {
                let name = node_text(node, self.source);
                if self.denylist.denies_call(name) {
                    self.record(ForbiddenConstruct::Builtin(name.to_owned()), node);
                }
            }
            _ => {}
        }
    }

    fn inspect_import(&mut self, statement: Node<'_>) {
        let mut cursor = statement.walk();
        let modules: Vec<_> = statement
            .children_by_field_name("name", &mut cursor)
            .filter_map(|name| imported_path(name, self.source))
            .collect();
        for module in modules {
            if let Some(denied) = self.denylist.denied_module(&module) {
                self.record(ForbiddenConstruct::Import(denied.to_owned()), statement);
            }
        }
    }

    fn inspect_import_from(&mut self, statement: Node<'_>) {
        let Some(module) = statement
            .child_by_field_name("module_name")
            .filter(|name| name.kind() == "dotted_name")
            .map(|name| dotted_text(name, self.source))
        else {
            return;
        };

        if let Some(denied) = self.denylist.denied_module(&module) {
            self.record(ForbiddenConstruct::Import(denied.to_owned()), statement);
            return;
        }

        let mut cursor = statement.walk();
        let names: Vec<_> = statement
            .children_by_field_name("name", &mut cursor)
            .filter_map(|name| imported_path(name, self.source))
            .collect();
        for name in names {
            let qualified = format!("{module}.{name}");
            let is_builtin = module == "builtins" && self.denylist.denies_call(&name);
            if is_builtin || self.denylist.denies_attribute(&qualified) {
                self.record(ForbiddenConstruct::ImportedName(qualified), statement);
            }
        }

        let has_wildcard = statement
            .named_children(&mut cursor)
            .any(|child| child.kind() == "wildcard_import");
        if has_wildcard && self.denylist.has_attributes_under(&module) {
            self.record(ForbiddenConstruct::ImportedName(format!("{module}.*")), statement);
        }
    }

    fn inspect_attribute(&mut self, visit: &Visit<'_>) {
        let node = visit.node;
        if let Some(attribute) = node.child_by_field_name("attribute") {
            let name = node_text(attribute, self.source);
            if self.denylist.denies_attribute(name) {
                self.record(ForbiddenConstruct::Attribute(name.to_owned()), node);
            }
        }

        // Qualified paths are checked once, from the outermost attribute.
        let is_inner = visit.parent_kind() == Some("attribute") && visit.field == Some("object");
        if is_inner {
            return;
        }
        let Some(segments) = attribute_chain(node, self.source) else {
            return;
        };
        let mut path = String::new();
        for (depth, segment) in segments.iter().enumerate().take(self.max_path_depth) {
            if depth == 0 {
                path.push_str(self.aliases.resolve(segment));
                continue;
            }
            path.push('.');
            path.push_str(segment);
            if self.denylist.denies_attribute(&path) {
                self.record(ForbiddenConstruct::Attribute(path.clone()), node);
            }
        }
    }

    fn record(&mut self, construct: ForbiddenConstruct, node: Node<'_>) {
        if self.found.iter().any(|seen| seen.construct == construct) {
            return;
        }
        self.found.push(ForbiddenUse {
            construct,
            location: Location::of(node),
        });
    }
}

/// Local names bound by imports, mapped to the qualified path they denote.
#[derive(Debug, Default)]
struct ImportAliases(HashMap<String, String>);

impl ImportAliases {
    fn collect(module: Node<'_>, source: &str) -> Self {
        let mut aliases = HashMap::new();
        for visit in preorder(module) {
            let statement = visit.node;
            let prefix = match statement.kind() {
                "import_statement" => None,
                "import_from_statement" => match statement
                    .child_by_field_name("module_name")
                    .filter(|name| name.kind() == "dotted_name")
                {
                    Some(name) => Some(dotted_text(name, source)),
                    None => continue,
                },
                _ => continue,
            };

            let mut cursor = statement.walk();
            for name in statement.children_by_field_name("name", &mut cursor) {
                let Some(path) = imported_path(name, source) else {
                    continue;
                };
                let qualified = match &prefix {
                    Some(module) => format!("{module}.{path}"),
                    None => path.clone(),
                };
                let local = match name.child_by_field_name("alias") {
                    Some(alias) => node_text(alias, source).to_owned(),
                    None if prefix.is_some() => path,
                    // `import a.b` binds `a`.
                    None => {
                        let head = path.split('.').next().unwrap_or_default().to_owned();
                        aliases.insert(head.clone(), head);
                        continue;
                    }
                };
                aliases.insert(local, qualified);
            }
        }
        Self(aliases)
    }

    fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.0.get(name).map_or(name, String::as_str)
    }
}

/// Dotted path named by an import clause, with any alias stripped.
fn imported_path(name: Node<'_>, source: &str) -> Option<String> {
    match name.kind() {
        "dotted_name" => Some(dotted_text(name, source)),
        "aliased_import" => name
            .child_by_field_name("name")
            .map(|inner| dotted_text(inner, source)),
        _ => None,
    }
}

/// Joins a `dotted_name`'s identifiers, ignoring interior whitespace.
fn dotted_text(node: Node<'_>, source: &str) -> String {
    if node.kind() != "dotted_name" {
        return node_text(node, source).to_owned();
    }
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .map(|part| node_text(part, source))
        .collect::<Vec<_>>()
        .join(".")
}

/// Splits `a.b.c` into its segments; `None` unless the chain starts with a
/// plain name.
fn attribute_chain<'src>(node: Node<'_>, source: &'src str) -> Option<Vec<&'src str>> {
    let mut segments = Vec::new();
    let mut current = node;
    loop {
        match current.kind() {
            "attribute" => {
                segments.push(node_text(current.child_by_field_name("attribute")?, source));
                current = current.child_by_field_name("object")?;
            }
            "identifier" => {
                segments.push(node_text(current, source));
                break;
            }
            _ => return None,
        }
    }
    segments.reverse();
    Some(segments)
}

/// Whether an identifier reads a name rather than defining or labelling one.
fn is_reference(visit: &Visit<'_>) -> bool {
    match (visit.parent_kind(), visit.field) {
        (
            Some(
                "function_definition"
                | "class_definition"
                | "default_parameter"
                | "typed_default_parameter"
                | "keyword_argument",
            ),
            Some("name"),
        )
        | (Some("attribute"), Some("attribute"))
        | (
            Some(
                "parameters"
                | "lambda_parameters"
                | "typed_parameter"
                | "dotted_name"
                | "aliased_import",
            ),
            _,
        ) => false,
        (Some("list_splat_pattern" | "dictionary_splat_pattern"), _) => !matches!(
            visit.grandparent_kind(),
            Some("parameters" | "lambda_parameters" | "typed_parameter")
        ),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parser;
    use rstest::rstest;

    fn scan(source: &str) -> Vec<ForbiddenConstruct> {
        let mut parser = Parser::new().expect("parser init");
        let parsed = parser.parse(source).expect("parse");
        find_forbidden(parsed.root_node(), source, &Denylist::default())
            .into_iter()
            .map(|found| found.construct)
            .collect()
    }

    #[rstest]
    #[case("import subprocess\n", ForbiddenConstruct::Import("subprocess".into()))]
    #[case("import ctypes.util\n", ForbiddenConstruct::Import("ctypes".into()))]
    #[case("import json, socket as s\n", ForbiddenConstruct::Import("socket".into()))]
    #[case("from importlib import import_module\n", ForbiddenConstruct::Import("importlib".into()))]
    #[case("from os import system\n", ForbiddenConstruct::ImportedName("os.system".into()))]
    #[case("from os import popen as p\n", ForbiddenConstruct::ImportedName("os.popen".into()))]
    #[case("from os import *\n", ForbiddenConstruct::ImportedName("os.*".into()))]
    #[case("from builtins import eval\n", ForbiddenConstruct::ImportedName("builtins.eval".into()))]
    #[case("x = eval('1')\n", ForbiddenConstruct::Builtin("eval".into()))]
    #[case("run = exec\n", ForbiddenConstruct::Builtin("exec".into()))]
    #[case("f = lambda: __import__('os')\n", ForbiddenConstruct::Builtin("__import__".into()))]
    #[case("s = f'{getattr(x, \"y\")}'\n", ForbiddenConstruct::Builtin("getattr".into()))]
    #[case("import os\nos.system('ls')\n", ForbiddenConstruct::Attribute("os.system".into()))]
    #[case("import os as o\no.system('ls')\n", ForbiddenConstruct::Attribute("os.system".into()))]
    #[case("import sys\nm = sys.modules\n", ForbiddenConstruct::Attribute("sys.modules".into()))]
    #[case("x = ().__class__.__bases__\n", ForbiddenConstruct::Attribute("__bases__".into()))]
    #[case("g = main.__globals__\n", ForbiddenConstruct::Attribute("__globals__".into()))]
    #[case("import posix\nposix.fork()\n", ForbiddenConstruct::Import("posix".into()))]
    #[case("import _posixsubprocess\n", ForbiddenConstruct::Import("_posixsubprocess".into()))]
    #[case("import os\nos.setsid()\n", ForbiddenConstruct::Attribute("os.setsid".into()))]
    #[case(
        "import os\nos.spawnvp(os.P_NOWAIT, 'sh', ['sh'])\n",
        ForbiddenConstruct::Attribute("os.spawnvp".into())
    )]
    #[case("from os import spawnlpe\n", ForbiddenConstruct::ImportedName("os.spawnlpe".into()))]
    #[case("import os\nos._exit(125)\n", ForbiddenConstruct::Attribute("os._exit".into()))]
    fn flags_forbidden_constructs(#[case] source: &str, #[case] expected: ForbiddenConstruct) {
        let found = scan(source);
        assert!(found.contains(&expected), "{expected:?} not in {found:?}");
    }

    #[rstest]
    #[case("import json\nimport math as m\nfrom collections import Counter\n")]
    #[case("def eval(x):\n    return x\n")]
    #[case("class compile:\n    pass\n")]
    #[case("def f(exec=1, *globals, **vars):\n    return 0\n")]
    #[case("print('eval exec __import__ os.system')\n")]
    #[case("# eval(input())\nx = 1\n")]
    #[case("config.system = 'linux'\n")]
    #[case("result = dict(eval=1, compile=2)\n")]
    #[case("from os import path\nroot = path.join('a', 'b')\n")]
    #[case("import os.path\nroot = os.path.join('a', 'b')\n")]
    #[case("f = lambda locals=0: 1\n")]
    fn ignores_harmless_code(#[case] source: &str) {
        assert_eq!(scan(source), Vec::new());
    }

    #[test]
    fn reports_each_construct_once_in_source_order() {
        let source = "import os\nx = eval('1')\nos.system('a')\ny = eval('2')\n";
        assert_eq!(
            scan(source),
            vec![
                ForbiddenConstruct::Builtin("eval".into()),
                ForbiddenConstruct::Attribute("os.system".into()),
            ]
        );
    }

    #[test]
    fn session_escape_and_spawn_are_both_reported() {
        let source = "import os\n\ndef main():\n    os.setsid()\n    os.spawnvp(os.P_WAIT, 'sh', ['sh'])\n";
        assert_eq!(
            scan(source),
            vec![
                ForbiddenConstruct::Attribute("os.setsid".into()),
                ForbiddenConstruct::Attribute("os.spawnvp".into()),
            ]
        );
    }

    #[test]
    fn records_first_location() {
        let source = "x = 1\ny = exec\n";
        let mut parser = Parser::new().expect("parser init");
        let parsed = parser.parse(source).expect("parse");
        let found = find_forbidden(parsed.root_node(), source, &Denylist::default());
        let first = found.first().expect("one construct");
        assert_eq!(first.location, Location { line: 2, column: 5 });
        assert_eq!(first.to_string(), "use of builtin 'exec' at line 2, column 5");
    }
}
