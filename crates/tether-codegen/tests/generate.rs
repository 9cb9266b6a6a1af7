//! End-to-end generation from JSON declarations, as `tether-gen` drives it.

use tether_codegen::{
    DiagnosticKind, EmitOptions, Generator, InvalidDeclaration, Severity, SubscriberClassDecl,
};

const DECLS: &str = r#"[
    {
        "qualified_name": "crate::play::user::BrTwo",
        "package": "crate::play::user",
        "methods": [
            {
                "owner": "crate::play::user::BrTwo",
                "name": "on_tick",
                "params": [{ "ty": "crate::play::Tick", "kind": "object" }],
                "visibility": "crate",
                "markers": { "weak_subscribe": true, "weak_concurrent": true }
            }
        ]
    },
    {
        "qualified_name": "crate::play::user::BrOne",
        "package": "crate::play::user",
        "methods": [
            {
                "owner": "crate::play::user::BrOne",
                "name": "m_one1",
                "params": [{ "ty": "i64", "kind": "object" }],
                "visibility": "public",
                "markers": { "weak_subscribe": true }
            },
            {
                "owner": "crate::play::user::BrOne",
                "name": "m_one2",
                "params": [{ "ty": "String", "kind": "object" }],
                "visibility": "public",
                "markers": { "weak_subscribe": true, "weak_concurrent": true }
            }
        ]
    }
]"#;

#[test]
fn test_generate_and_write_crate_wide() {
    let generator = Generator::new(EmitOptions::crate_wide());
    let report = generator.generate_json(DECLS).unwrap();
    assert!(report.is_success(), "{:?}", report.diagnostics);

    let out = tempfile::tempdir().unwrap();
    let written = report.write_to(out.path()).unwrap();
    let expected_dir = out.path().join("play").join("user");
    assert_eq!(
        written,
        [
            expected_dir.join("WeakProxy_BrOne.rs"),
            expected_dir.join("WeakProxy_BrTwo.rs"),
        ]
    );

    let br_one = std::fs::read_to_string(&written[0]).unwrap();
    let body = br_one.split_once("\n\n").map(|(_, body)| body).unwrap();
    let file: syn::File = syn::parse_str(body).unwrap();
    assert_eq!(file.items.len(), 6);
}

#[test]
fn test_rewriting_is_byte_identical() {
    let generator = Generator::new(EmitOptions::crate_wide());
    let out = tempfile::tempdir().unwrap();

    let first = generator.generate_json(DECLS).unwrap();
    let paths = first.write_to(out.path()).unwrap();
    let before: Vec<String> = paths
        .iter()
        .map(|p| std::fs::read_to_string(p).unwrap())
        .collect();

    let mut decls: Vec<SubscriberClassDecl> = serde_json::from_str(DECLS).unwrap();
    decls.reverse();
    generator.generate(decls).write_to(out.path()).unwrap();
    let after: Vec<String> = paths
        .iter()
        .map(|p| std::fs::read_to_string(p).unwrap())
        .collect();

    assert_eq!(before, after);
}

#[test]
fn test_private_method_unreachable_from_crate_wide_proxy() {
    let json = DECLS.replace(r#""visibility": "crate""#, r#""visibility": "private""#);
    let report = Generator::new(EmitOptions::crate_wide())
        .generate_json(&json)
        .unwrap();

    assert!(!report.is_success());
    let error = report.errors().next().unwrap();
    assert_eq!(error.severity, Severity::Error);
    assert_eq!(error.class, "crate::play::user::BrTwo");
    assert!(matches!(
        error.kind,
        DiagnosticKind::Invalid(InvalidDeclaration::NotForwardable { .. })
    ));
    assert_eq!(report.proxies.len(), 1);
}
