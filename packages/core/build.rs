use serde_json::Value;
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const MANIFEST: &str = "manifests/datamodels-1.0.0.json";

fn main() {
    println!("cargo:rerun-if-changed={}", MANIFEST);

    let text = fs::read_to_string(MANIFEST).unwrap();
    let manifest: Value = serde_json::from_str(&text).unwrap();

    let mut out = String::new();
    let mut names = Vec::new();

    for decl in manifest["tags"].as_array().into_iter().flatten() {
        let tag_uri = decl["tag_uri"].as_str().unwrap();
        let class = match decl["class"].as_str() {
            Some(class) => class.to_string(),
            None => class_name_for_tag(tag_name(tag_uri)),
        };
        let node = match decl["kind"].as_str().unwrap_or("object") {
            "object" => "ObjectNode",
            "list" => "ListNode",
            "enum" => "EnumNode",
            "scalar" => "ScalarNode",
            other => panic!("unknown node kind '{}' for {}", other, tag_uri),
        };
        let doc = decl["description"].as_str().unwrap_or(&class).to_string();
        emit(&mut out, &class, node, Some(tag_uri), &doc);
        names.push(class);
    }

    for decl in manifest["implied"].as_array().into_iter().flatten() {
        let class = decl["class"].as_str().unwrap().to_string();
        let owners: Vec<String> = decl["implied_by"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|owner| {
                format!(
                    "`{}.{}`",
                    owner["class"].as_str().unwrap(),
                    owner["field"].as_str().unwrap()
                )
            })
            .collect();
        let doc = match decl["description"].as_str() {
            Some(description) => format!("{}\n///\n/// Implied by {}", description, owners.join(", ")),
            None => format!("Implied by {}", owners.join(", ")),
        };
        emit(&mut out, &class, "ObjectNode", None, &doc);
        names.push(class);
    }

    writeln!(out, "/// Every class with a generated typed node").unwrap();
    writeln!(out, "pub const GENERATED_CLASS_NAMES: &[&str] = &[").unwrap();
    for name in &names {
        writeln!(out, "    {:?},", name).unwrap();
    }
    writeln!(out, "];").unwrap();

    let dest = Path::new(&env::var("OUT_DIR").unwrap()).join("generated_nodes.rs");
    fs::write(dest, out).unwrap();
}

fn emit(out: &mut String, class: &str, node: &str, tag: Option<&str>, doc: &str) {
    writeln!(out, "/// {}", doc).unwrap();
    if let Some(tag) = tag {
        writeln!(out, "///\n/// Tag: `{}`", tag).unwrap();
    }
    writeln!(out, "#[derive(Debug, Clone, PartialEq)]").unwrap();
    writeln!(out, "pub struct {} {{\n    node: {},\n}}\n", class, node).unwrap();

    let tag = match tag {
        Some(tag) => format!("Some({:?})", tag),
        None => "None".to_string(),
    };
    writeln!(
        out,
        "impl TypedNode for {class} {{
    type Node = {node};
    const CLASS_NAME: &'static str = {class:?};
    const TAG: Option<&'static str> = {tag};

    fn wrap(node: {node}) -> Self {{
        Self {{ node }}
    }}

    fn as_node(&self) -> &{node} {{
        &self.node
    }}

    fn as_node_mut(&mut self) -> &mut {node} {{
        &mut self.node
    }}

    fn into_node(self) -> {node} {{
        self.node
    }}
}}

impl std::ops::Deref for {class} {{
    type Target = {node};

    fn deref(&self) -> &{node} {{
        &self.node
    }}
}}

impl std::ops::DerefMut for {class} {{
    fn deref_mut(&mut self) -> &mut {node} {{
        &mut self.node
    }}
}}

impl From<{class}> for Value {{
    fn from(typed: {class}) -> Value {{
        Value::from(typed.node)
    }}
}}
"
    )
    .unwrap();
}

/// `https://.../science_raw-1.0.0` -> `science_raw`
fn tag_name(tag_uri: &str) -> &str {
    let last = tag_uri.rsplit('/').next().unwrap_or(tag_uri);
    last.rsplit_once('-').map(|(name, _)| name).unwrap_or(last)
}

fn class_name_for_tag(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
