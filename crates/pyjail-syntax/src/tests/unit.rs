//! Unit tests for whole-script validation.

use rstest::{fixture, rstest};

use crate::{RejectionReason, ValidationPolicy, ValidationVerdict, Validator};

#[fixture]
fn validator() -> Validator {
    Validator::new(ValidationPolicy::default()).expect("validator")
}

fn reason_of(verdict: &ValidationVerdict) -> Option<RejectionReason> {
    verdict.rejection().map(|rejection| rejection.reason())
}

#[rstest]
fn accepts_well_formed_script(validator: Validator) {
    let source = "def main():\n    print(\"hello from sandbox\")\n    return {\"message\": \"success\"}\n";
    let verdict = validator.validate(source);
    let ValidationVerdict::Accepted(script) = verdict else {
        panic!("expected acceptance, got {verdict:?}");
    };
    assert_eq!(script.source(), source);
    assert_eq!(script.function_definitions(), 1);
}

#[rstest]
fn rejects_oversized_script_before_parsing(validator: Validator) {
    let source = format!("def main(:\n{}", "#".repeat(200_001));
    let verdict = validator.validate(&source);
    assert_eq!(reason_of(&verdict), Some(RejectionReason::TooLarge));
}

#[test]
fn size_limit_is_inclusive() {
    let source = "def main():\n    return 1\n";
    let policy = ValidationPolicy::default().with_max_script_bytes(source.len());
    let validator = Validator::new(policy).expect("validator");
    assert!(validator.validate(source).is_accepted());

    let tighter = ValidationPolicy::default().with_max_script_bytes(source.len() - 1);
    let validator = Validator::new(tighter).expect("validator");
    assert_eq!(
        reason_of(&validator.validate(source)),
        Some(RejectionReason::TooLarge)
    );
}

#[rstest]
#[case("def main(:\n    return 1\n")]
#[case("def main()\n    return 1\n")]
#[case("def main():\n    return {'a': 1\n")]
fn rejects_malformed_scripts(validator: Validator, #[case] source: &str) {
    let verdict = validator.validate(source);
    let rejection = verdict.rejection().expect("rejected");
    assert_eq!(rejection.reason(), RejectionReason::SyntaxError);
    assert!(rejection.detail().starts_with("line "), "{}", rejection.detail());
}

#[rstest]
fn syntax_is_checked_before_entry_point(validator: Validator) {
    let verdict = validator.validate("def helper(:\n    pass\n");
    assert_eq!(reason_of(&verdict), Some(RejectionReason::SyntaxError));
}

#[rstest]
#[case("def foo():\n    return {\"x\": 1}\n")]
#[case("")]
#[case("   \n")]
fn requires_main(validator: Validator, #[case] source: &str) {
    let verdict = validator.validate(source);
    let rejection = verdict.rejection().expect("rejected");
    assert_eq!(rejection.reason(), RejectionReason::MissingMain);
    assert!(rejection.detail().contains("must define main"));
}

#[test]
fn enforces_function_definition_budget() {
    let helpers: String = (0..3)
        .map(|index| format!("def helper_{index}():\n    return {index}\n"))
        .collect();
    let source = format!("{helpers}def main():\n    return helper_0()\n");
    let policy = ValidationPolicy::default().with_max_function_definitions(3);
    let validator = Validator::new(policy).expect("validator");

    let rejection = validator
        .validate(&source)
        .into_result()
        .expect_err("over budget");
    assert_eq!(rejection.reason(), RejectionReason::TooLarge);
    assert_eq!(rejection.detail(), "too many function definitions (4 > 3)");
}

#[rstest]
#[case("import subprocess\ndef main():\n    return 1\n", "import of module 'subprocess'")]
#[case("def main():\n    return eval('1 + 1')\n", "use of builtin 'eval'")]
#[case("import os\ndef main():\n    return os.system('id')\n", "access to attribute 'os.system'")]
#[case(
    "def main():\n    return [c for c in ().__class__.__base__.__subclasses__()]\n",
    "access to attribute '__base__'"
)]
fn rejects_forbidden_constructs_even_with_main(
    validator: Validator,
    #[case] source: &str,
    #[case] fragment: &str,
) {
    let verdict = validator.validate(source);
    let rejection = verdict.rejection().expect("rejected");
    assert_eq!(rejection.reason(), RejectionReason::ForbiddenConstruct);
    assert!(
        rejection.detail().contains(fragment),
        "{fragment:?} not in {:?}",
        rejection.detail()
    );
}

#[test]
fn caps_reported_constructs() {
    let body: String = ["eval", "exec", "compile", "globals", "locals", "vars", "breakpoint"]
        .iter()
        .map(|name| format!("    {name}\n"))
        .collect();
    let source = format!("def main():\n{body}    return 1\n");
    let validator = Validator::new(ValidationPolicy::default()).expect("validator");
    let rejection = validator
        .validate(&source)
        .into_result()
        .expect_err("forbidden");
    assert!(rejection.detail().ends_with("(and 2 more)"), "{}", rejection.detail());
}

#[test]
fn deeply_nested_expressions_do_not_exhaust_the_stack() {
    let depth = 5_000;
    let source = format!(
        "def main():\n    return {}1{}\n",
        "(".repeat(depth),
        ")".repeat(depth)
    );
    let validator = Validator::new(ValidationPolicy::default()).expect("validator");
    let verdict = validator.validate(&source);
    assert!(
        verdict.is_accepted() || reason_of(&verdict) == Some(RejectionReason::SyntaxError),
        "{verdict:?}"
    );
}
