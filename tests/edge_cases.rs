use stylebake::{Compiler, MemoryLoader, NormalizeError, Options, StyleBakeError, TransformOutput};

fn compile(style: &str) -> Result<TransformOutput, StyleBakeError> {
    let source = format!(
        "import {{ css }} from '@stylebake/react';\nexport const X = () => <div css={{{style}}} />;"
    );
    Compiler::new(Options::default(), MemoryLoader::new())
        .unwrap()
        .transform_source("src/x.jsx", &source)
}

/// Rule texts with each rule's own class replaced by `c`.
fn rules(style: &str) -> Vec<String> {
    compile(style)
        .unwrap()
        .rules
        .iter()
        .map(|r| r.css.replace(&format!(".{}", r.class_name), ".c"))
        .collect()
}

#[test]
fn empty_style_object() {
    let output = compile("{}").unwrap();
    assert!(output.rules.is_empty());
    assert_eq!(output.elements.len(), 1);
    assert_eq!(output.elements[0].class_name, "");
}

#[test]
fn empty_content_is_quoted() {
    assert_eq!(rules("{ '::before': { content: '' } }"), vec![".c::before{content:\"\"}"]);
    assert_eq!(
        rules("{ '::after': { content: 'new' } }"),
        vec![".c::after{content:\"new\"}"]
    );
    assert_eq!(
        rules("{ '::after': { content: 'attr(title)' } }"),
        vec![".c::after{content:attr(title)}"]
    );
}

#[test]
fn important_values() {
    assert_eq!(rules("{ color: 'red !important' }"), vec![".c{color:red!important}"]);
    assert_eq!(rules("{ color: 'red  ! IMPORTANT' }"), vec![".c{color:red!important}"]);
}

#[test]
fn variables_block_shorthand_expansion() {
    assert_eq!(rules("{ margin: 'var(--gap)' }"), vec![".c{margin:var(--gap)}"]);
    assert_eq!(
        rules("{ '--gap': '4px', gap: 'var(--gap)' }"),
        vec![".c{--gap:4px}", ".c{gap:var(--gap)}"]
    );
}

#[test]
fn vendor_prefixes_and_unitless_numbers() {
    assert_eq!(
        rules("{ WebkitLineClamp: 2, msFlexPositive: 1, MozTabSize: 4, zIndex: 10, width: 0, top: 1.5 }"),
        vec![
            ".c{-webkit-line-clamp:2}",
            ".c{-ms-flex-positive:1}",
            ".c{-moz-tab-size:4}",
            ".c{z-index:10}",
            ".c{width:0}",
            ".c{top:1.5px}",
        ]
    );
}

#[test]
fn comma_selectors_split_into_one_rule_each() {
    assert_eq!(
        rules("{ ':hover, :focus': { color: 'red' } }"),
        vec![".c:hover{color:red}", ".c:focus{color:red}"]
    );
    assert_eq!(
        rules("{ ':is(a, b) &': { color: 'red' } }"),
        vec![":is(a,b) .c{color:red}"]
    );
}

#[test]
fn empty_selector_is_an_error() {
    let err = compile("{ ':hover,': { color: 'red' } }").unwrap_err();
    let StyleBakeError::Normalize { location, source } = err else {
        panic!("expected a normalize error");
    };
    assert_eq!(location.line, 2);
    assert_eq!(
        source,
        NormalizeError::EmptySelector {
            key: ":hover,".into()
        }
    );
}

#[test]
fn deeply_nested_at_rules_and_selectors() {
    assert_eq!(
        rules(
            "{ '@supports (display: grid)': { '@media (min-width: 500px)': { '&:hover': { '> span': { display: 'grid' } } } } }"
        ),
        vec!["@supports (display:grid){@media (min-width:500px){.c:hover > span{display:grid}}}"]
    );
}

#[test]
fn nullish_and_boolean_values_are_dropped() {
    assert_eq!(
        rules("{ color: null, margin: undefined, display: false && 'none', width: '' , top: 0 }"),
        vec![".c{top:0}"]
    );
}

#[test]
fn object_and_function_values_are_rejected() {
    let err = compile("{ color: ['red'] }").unwrap_err();
    assert!(err.to_string().ends_with("value of 'color' must be a string or number, found array"), "{err}");
    let err = compile("{ color: () => 'red' }").unwrap_err();
    assert!(err.to_string().contains("found function"), "{err}");
}

#[test]
fn uppercase_hex_and_whitespace_collapse() {
    assert_eq!(
        rules("{ border: '1px   solid  #ABCDEF', boxShadow: '0 0 0 1px rgba( 0, 0, 0, .5 )' }"),
        vec![
            ".c{border:1px solid #abcdef}",
            ".c{box-shadow:0 0 0 1px rgba(0,0,0,.5)}",
        ]
    );
}

#[test]
fn equal_declarations_in_different_contexts_get_distinct_classes() {
    let output = compile("{ color: 'red', ':hover': { color: 'red' } }").unwrap();
    assert_eq!(output.rules.len(), 2);
    assert_ne!(output.rules[0].class_name, output.rules[1].class_name);
    // Same property in the same context means the same group.
    let output = compile("{ color: 'red', ':hover': { color: 'blue' } }").unwrap();
    assert_ne!(output.rules[0].class_name[..5], output.rules[1].class_name[..5]);
}
