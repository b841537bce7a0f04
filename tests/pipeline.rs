use std::path::PathBuf;

use stylebake::ast::{Child, Element, ExprKind, Item, Module, Stmt, Visit};
use stylebake::{
    merge_class_names, Compiler, Emission, MemoryLoader, Options, StyleBakeError, StyleDirectory,
};

const IMPORT: &str = "import { css } from '@stylebake/react';\n";

fn compiler(options: Options) -> Compiler<MemoryLoader> {
    Compiler::new(options, MemoryLoader::new()).unwrap()
}

fn extracting() -> Options {
    Options {
        extract: true,
        ..Options::default()
    }
}

#[derive(Default)]
struct Elements(Vec<Element>);

impl Visit for Elements {
    fn visit_element(&mut self, element: &Element) {
        self.0.push(element.clone());
        stylebake::ast::walk_element(self, element);
    }
}

fn elements(module: &Module) -> Vec<Element> {
    let mut found = Elements::default();
    found.visit_module(module);
    found.0
}

fn top_level_consts(module: &Module) -> Vec<String> {
    module
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Stmt(Stmt::Var(decl)) => decl.declarators[0]
                .pattern
                .bound_names()
                .first()
                .map(|n| (*n).to_owned()),
            _ => None,
        })
        .collect()
}

#[test]
fn repeated_styles_extract_to_one_rule() {
    let source = format!(
        "{IMPORT}export const A = () => <p css={{css({{ color: 'blue' }})}}>a</p>;\nexport const B = () => <span css={{css({{ color: 'blue' }})}}>b</span>;"
    );
    let output = compiler(extracting()).transform_source("src/ab.jsx", &source).unwrap();
    assert_eq!(output.style_rules.len(), 1);
    assert!(output.style_rules[0].ends_with("{color:blue}"));
    assert_eq!(output.elements.len(), 2);
    assert_eq!(output.elements[0].class_name, output.elements[1].class_name);

    let names: Vec<String> = elements(&output.module).into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["p", "span"]);
    assert!(top_level_consts(&output.module).is_empty());
}

#[test]
fn padding_shorthand_and_later_longhand() {
    let source = format!("{IMPORT}const x = <div css={{{{ padding: '10px 20px', paddingLeft: 5 }}}} />;");
    let output = compiler(Options::default()).transform_source("src/p.jsx", &source).unwrap();
    let styles = &output.elements[0];
    assert_eq!(styles.classes.len(), 5);
    assert_eq!(output.rules.len(), 5);
    let bodies: Vec<&str> = output
        .rules
        .iter()
        .map(|r| &r.css[r.css.find('{').unwrap() + 1..r.css.len() - 1])
        .collect();
    assert_eq!(
        bodies,
        vec![
            "padding-top:10px",
            "padding-right:20px",
            "padding-bottom:10px",
            "padding-left:20px",
            "padding-left:5px",
        ]
    );
    // Both left rules are emitted; the explicit one wins by class order.
    let explicit = &styles.classes[4].0;
    let derived = &styles.classes[3].0;
    assert!(styles.class_name.split(' ').any(|c| c == explicit));
    assert!(!styles.class_name.split(' ').any(|c| c == derived));
    assert_eq!(styles.classes.iter().map(|(_, order)| *order).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn let_bindings_fail_the_file() {
    let source = format!("{IMPORT}let color = 'red';\nconst x = <div css={{{{ color }}}} />;");
    let err = compiler(Options::default())
        .transform_source("src/l.jsx", &source)
        .unwrap_err();
    let StyleBakeError::Resolve(err) = err else {
        panic!("expected a resolve error, got {err}");
    };
    let location = err.location().unwrap();
    assert_eq!(location.file, PathBuf::from("src/l.jsx"));
    assert_eq!(location.line, 3);
    assert!(err.to_string().contains("not statically analyzable"), "{err}");
}

#[test]
fn baked_output_carries_islands_until_extracted() {
    let source = format!("{IMPORT}const x = <div css={{{{ color: 'red' }}}} className=\"card\" />;");
    let output = compiler(Options::default()).transform_source("src/i.jsx", &source).unwrap();
    let names: Vec<String> = elements(&output.module).into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["CC", "CS", "div"]);
    assert_eq!(top_level_consts(&output.module), vec!["_0".to_owned(), "x".to_owned()]);

    let sheet = elements(&output.module).remove(1);
    let Some(Child::Expr(list)) = sheet.children.first() else {
        panic!("sheet has no rule list");
    };
    assert!(matches!(&list.kind, ExprKind::Array(items) if items.len() == 1));
}

#[test]
fn extraction_policies() {
    let source = format!(
        "{IMPORT}const x = <a css={{{{ color: 'red', '@media (min-width: 40em)': {{ color: 'blue' }} }}}} />;"
    );

    let inline = compiler(Options {
        style_sheet_path: Some("@stylebake/webpack-loader/css".into()),
        ..extracting()
    })
    .transform_source("src/x.jsx", &source)
    .unwrap();
    let imports: Vec<&str> = inline
        .module
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Import(import) if import.source.contains("?style=") => Some(import.source.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(imports.len(), 2);
    assert!(imports[1].contains("%40media%20%28min-width%3A40em%29"));

    let dir = tempfile::tempdir().unwrap();
    let emitted = compiler(Options {
        extract_styles_to_directory: Some(StyleDirectory {
            source: PathBuf::from("src"),
            dest: dir.path().to_path_buf(),
        }),
        ..extracting()
    })
    .transform_source("src/x.jsx", &source)
    .unwrap();
    let sheet = emitted.stylesheet.unwrap();
    assert_eq!(std::fs::read_to_string(dir.path().join("x.compiled.css")).unwrap(), sheet.css);
    assert!(sheet.css.starts_with("._"));
    assert!(sheet.css.lines().nth(1).unwrap().starts_with("@media (min-width:40em)"));

    let metadata = compiler(extracting()).transform_source("src/x.jsx", &source).unwrap();
    assert_eq!(metadata.style_rules.len(), 2);
    assert!(metadata.stylesheet.is_none());
    assert_eq!(Options::default().emission(), None);
    assert_eq!(extracting().emission(), Some(Emission::Metadata));
}

#[test]
fn existing_class_names_are_merged_at_runtime() {
    let source = format!("{IMPORT}const x = <div css={{{{ color: 'red' }}}} className={{props.className}} />;");
    let output = compiler(Options::default()).transform_source("src/m.jsx", &source).unwrap();
    let div = elements(&output.module).remove(2);
    assert_eq!(div.attrs.len(), 1);
    // What the runtime merge would produce for a caller override.
    let own = &output.elements[0].class_name;
    let override_class = format!("{}zzzz", &own[..5]);
    assert_eq!(merge_class_names([own.as_str(), override_class.as_str()]), override_class);
}

#[test]
fn files_without_style_imports_pass_through() {
    let source = "export const x = <div css={{ color: 'red' }} />;";
    let output = compiler(extracting()).transform_source("src/n.jsx", source).unwrap();
    assert!(output.rules.is_empty());
    assert!(output.style_rules.is_empty());
    assert_eq!(output.module, stylebake::parse(source).unwrap());
}
