//! Locating the script's `main()` entry point.

use tree_sitter::Node;

use super::verdict::{Rejection, RejectionReason};
use crate::walk::node_text;

const ENTRY_POINT: &str = "main";

/// Checks that the module defines a callable top-level `main()`.
///
/// Only module-level definitions count, decorated or not. When `main` is
/// defined more than once, the last definition wins, as it would at runtime.
pub(super) fn check_entry_point(module: Node<'_>, source: &str) -> Result<(), Rejection> {
    let mut cursor = module.walk();
    let main = module
        .named_children(&mut cursor)
        .filter_map(top_level_function)
        .filter(|function| {
            function
                .child_by_field_name("name")
                .is_some_and(|name| node_text(name, source) == ENTRY_POINT)
        })
        .last()
        .ok_or_else(|| missing_main("script must define main() as a top-level function"))?;

    if main.child(0).is_some_and(|first| first.kind() == "async") {
        return Err(missing_main(
            "script must define main() as a regular function, not `async def`",
        ));
    }

    if let Some(parameter) = main
        .child_by_field_name("parameters")
        .and_then(|parameters| first_required_parameter(parameters, source))
    {
        return Err(missing_main(format!(
            "script must define main() without required arguments; \
             parameter '{parameter}' has no default"
        )));
    }

    Ok(())
}

fn top_level_function(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "function_definition" => Some(node),
        "decorated_definition" => node
            .child_by_field_name("definition")
            .filter(|definition| definition.kind() == "function_definition"),
        _ => None,
    }
}

fn first_required_parameter<'src>(parameters: Node<'_>, source: &'src str) -> Option<&'src str> {
    let mut cursor = parameters.walk();
    parameters
        .named_children(&mut cursor)
        .find_map(|parameter| match parameter.kind() {
            "identifier" | "tuple_pattern" => Some(parameter),
            "typed_parameter" => parameter
                .named_child(0)
                .filter(|inner| inner.kind() == "identifier"),
            _ => None,
        })
        .map(|parameter| node_text(parameter, source))
}

fn missing_main(detail: impl Into<String>) -> Rejection {
    Rejection::new(RejectionReason::MissingMain, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parser;
    use rstest::rstest;

    fn check(source: &str) -> Result<(), Rejection> {
        let mut parser = Parser::new().expect("parser init");
        let parsed = parser.parse(source).expect("parse");
        check_entry_point(parsed.root_node(), source)
    }

    #[rstest]
    #[case("def main():\n    return 1\n")]
    #[case("def main(limit=3, *args, **kwargs):\n    return limit\n")]
    #[case("def main(*, verbose=False):\n    return verbose\n")]
    #[case("def main(x: int = 1):\n    return x\n")]
    #[case("def cache(f):\n    return f\n\n@cache\ndef main():\n    return 2\n")]
    #[case("def main(x):\n    return x\n\ndef main():\n    return 1\n")]
    fn accepts_callable_main(#[case] source: &str) {
        assert_eq!(check(source), Ok(()));
    }

    #[rstest]
    #[case("def foo():\n    return {'x': 1}\n", "top-level")]
    #[case("class App:\n    def main(self):\n        return 1\n", "top-level")]
    #[case("if True:\n    def main():\n        return 1\n", "top-level")]
    #[case("main = lambda: 1\n", "top-level")]
    #[case("async def main():\n    return 1\n", "async")]
    #[case("def main(x):\n    return x\n", "'x'")]
    #[case("def main(x: int):\n    return x\n", "'x'")]
    #[case("def main(*, key):\n    return key\n", "'key'")]
    #[case("def main():\n    return 1\n\ndef main(y):\n    return y\n", "'y'")]
    fn rejects_unusable_main(#[case] source: &str, #[case] fragment: &str) {
        let rejection = check(source).expect_err("must reject");
        assert_eq!(rejection.reason(), RejectionReason::MissingMain);
        assert!(rejection.detail().contains("must define main()"));
        assert!(
            rejection.detail().contains(fragment),
            "{fragment:?} not in {:?}",
            rejection.detail()
        );
    }
}
