use std::path::{Path, PathBuf};

use stylebake::{parse, MemoryLoader, ResolveError, Resolver, Value};

/// Resolves `expr` as the export of an entry module whose other lines are
/// `prelude`.
fn resolve(loader: &MemoryLoader, prelude: &str, expr: &str) -> Result<Value, ResolveError> {
    let source = format!("{prelude}\nexport const result = {expr};");
    let module = parse(&source).unwrap();
    let mut resolver = Resolver::new(loader);
    let id = resolver.add_entry("src/entry.js", &source, &module);
    resolver.export_value(id, "result")
}

fn theme_loader() -> MemoryLoader {
    MemoryLoader::new()
        .with_file(
            "src/theme/colors.js",
            "export const primary = '#0055FF';\nexport default { muted: '#999' };",
        )
        .with_file(
            "src/theme/index.js",
            "export * from './colors';\nexport { default as palette } from './colors';\nexport * as sizes from './sizes';",
        )
        .with_file(
            "src/theme/sizes.js",
            "const base = 4;\nexport const small = base * 2;\nexport const large = `${base * 4}px`;",
        )
        .with_file(
            "src/helpers.js",
            "import { small } from './theme/sizes';\nexport const spacing = () => ({ padding: small, margin: small / 2 });\nexport function shade(color) { return color; }",
        )
}

#[test]
fn multi_hop_re_exports() {
    let loader = theme_loader();
    let value = resolve(&loader, "import { primary, palette } from './theme';", "[primary, palette.muted]").unwrap();
    assert_eq!(
        value,
        Value::Array(vec![Value::Str("#0055FF".into()), Value::Str("#999".into())])
    );
}

#[test]
fn namespace_re_exports_and_templates() {
    let loader = theme_loader();
    let value = resolve(&loader, "import { sizes } from './theme';", "sizes.large").unwrap();
    assert_eq!(value, Value::Str("16px".into()));
    let value = resolve(&loader, "import * as t from './theme';", "t.sizes.small + 1").unwrap();
    assert_eq!(value, Value::Num(9.0));
}

#[test]
fn zero_argument_helper_calls() {
    let loader = theme_loader();
    let value = resolve(&loader, "import { spacing } from './helpers';", "{ ...spacing(), color: 'red' }").unwrap();
    assert_eq!(value.get("padding"), Some(Value::Num(8.0)));
    assert_eq!(value.get("margin"), Some(Value::Num(4.0)));
    assert_eq!(value.get("color"), Some(Value::Str("red".into())));
}

#[test]
fn helper_calls_with_arguments_are_refused() {
    let loader = theme_loader();
    let err = resolve(&loader, "import { shade } from './helpers';", "shade('red')").unwrap_err();
    assert!(err.to_string().contains("immediately-invoked"), "{err}");
}

#[test]
fn immediately_invoked_functions_fold() {
    let loader = MemoryLoader::new();
    let value = resolve(&loader, "", "((n) => ({ width: n * 10 }))(3)").unwrap();
    assert_eq!(value.get("width"), Some(Value::Num(30.0)));
}

#[test]
fn destructured_bindings() {
    let loader = theme_loader();
    let value = resolve(
        &loader,
        "import { palette } from './theme';\nconst { muted: grey, missing = 'none' } = palette;\nconst [first, , third] = [1, 2, 3];",
        "[grey, missing, first + third]",
    )
    .unwrap();
    assert_eq!(
        value,
        Value::Array(vec![
            Value::Str("#999".into()),
            Value::Str("none".into()),
            Value::Num(4.0),
        ])
    );
}

#[test]
fn mutable_and_reassigned_bindings_fail_closed() {
    let loader = MemoryLoader::new();
    let err = resolve(&loader, "let color = 'red';", "color").unwrap_err();
    assert!(err.to_string().contains("declared with `let`"), "{err}");

    let err = resolve(&loader, "const theme = { c: 'red' };\ntheme.c = 'blue';", "theme.c").unwrap_err();
    assert!(err.to_string().contains("reassigned"), "{err}");
}

#[test]
fn external_packages_are_dynamic() {
    let loader = MemoryLoader::new();
    let err = resolve(&loader, "import { tokens } from 'design-system';", "tokens.red").unwrap_err();
    assert!(matches!(err, ResolveError::UnresolvableExpression { .. }));
}

#[test]
fn circular_re_exports_terminate() {
    let loader = MemoryLoader::new()
        .with_file("src/a.js", "export { x } from './b';")
        .with_file("src/b.js", "export { x } from './a';");
    let err = resolve(&loader, "import { x } from './a';", "x").unwrap_err();
    assert!(matches!(err, ResolveError::UnresolvableExpression { .. }));
}

#[test]
fn included_files_are_recorded() {
    let loader = theme_loader();
    let source = "import { sizes, primary } from './theme';\nexport const v = [sizes.small, primary];";
    let module = parse(source).unwrap();
    let mut resolver = Resolver::new(&loader);
    let id = resolver.add_entry("src/entry.js", source, &module);
    resolver.export_value(id, "v").unwrap();
    let mut files = resolver.included_files();
    files.sort();
    assert_eq!(
        files,
        vec![
            PathBuf::from("src/theme/colors.js"),
            PathBuf::from("src/theme/index.js"),
            PathBuf::from("src/theme/sizes.js"),
        ]
    );
    assert_eq!(resolver.module_path(id), Path::new("src/entry.js"));
}

#[test]
fn parse_errors_in_dependencies_name_the_file() {
    let loader = MemoryLoader::new().with_file("src/bad.js", "export const = 1;");
    let err = resolve(&loader, "import { x } from './bad';", "x").unwrap_err();
    let ResolveError::Parse { file, .. } = &err else {
        panic!("expected a parse error, got {err}");
    };
    assert_eq!(file, &PathBuf::from("src/bad.js"));
}
