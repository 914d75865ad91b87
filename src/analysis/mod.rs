//! Syntactic usage detection for external packages.
//!
//! Each file is parsed into a tree-sitter syntax tree. Import declarations
//! and `require()` declarators produce a table of locally-bound names; a
//! single traversal then marks bindings referenced anywhere in the file.
//!
//! Detection is deliberately scope-blind: any textual occurrence of a
//! matching identifier counts. An unrelated local variable sharing a name
//! keeps a package alive, which is the cheaper failure mode compared to
//! removing a dependency that is actually used.

use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use tree_sitter::{Node, Parser};

/// Analysis errors, reported per file; the scan of remaining files continues
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("Failed to parse source")]
    Parse,
    #[error("Tree-sitter grammar initialization failed")]
    LanguageInit,
}

/// Source dialect, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    /// JavaScript, including JSX
    JavaScript,
    TypeScript,
    /// TypeScript with JSX
    Tsx,
}

impl SourceLanguage {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" => Some(SourceLanguage::JavaScript),
            "ts" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            _ => None,
        }
    }
}

/// One locally-bound name introduced by an import or require
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// Package identity the binding came from
    pub package: String,
    /// Name the binding is visible under in this file
    pub local_name: String,
    /// Whether any usage signal matched this binding
    pub used: bool,
    /// Number of matching references seen
    pub usage_count: u32,
}

/// Per-file analysis result
#[derive(Debug, Default)]
pub struct FileAnalysis {
    used: Vec<String>,
    /// Binding table, kept for diagnostics
    pub bindings: Vec<ImportBinding>,
}

impl FileAnalysis {
    /// Package identities classified used in this file, in first-seen order
    pub fn used_packages(&self) -> &[String] {
        &self.used
    }

    /// Imported packages with no used binding (heuristic marks excluded)
    pub fn unused_packages(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.bindings
            .iter()
            .filter(|b| !self.bindings.iter().any(|o| o.package == b.package && o.used))
            .filter(|b| seen.insert(b.package.as_str()))
            .map(|b| b.package.as_str())
            .collect()
    }

    fn mark_used(&mut self, package: &str) {
        if !self.used.iter().any(|p| p == package) {
            self.used.push(package.to_string());
        }
    }
}

/// Project-wide used-package set, unioned across files.
///
/// Insertion-ordered by first sighting; rebuilt from scratch every cycle.
#[derive(Debug, Default, Clone)]
pub struct UsedPackages {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl UsedPackages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, package: &str) -> bool {
        if self.seen.insert(package.to_string()) {
            self.order.push(package.to_string());
            true
        } else {
            false
        }
    }

    pub fn contains(&self, package: &str) -> bool {
        self.seen.contains(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Union a file's result into the project-wide set
    pub fn merge(&mut self, analysis: &FileAnalysis) {
        for package in analysis.used_packages() {
            self.insert(package);
        }
    }
}

/// Resolve a module specifier to its package identity.
///
/// The identity is the first path segment, except scoped specifiers which
/// keep two segments (`@scope/name/sub` -> `@scope/name`). Relative and
/// absolute specifiers resolve to nothing.
pub fn package_identity(specifier: &str) -> Option<String> {
    if specifier.is_empty() || specifier.starts_with('.') || specifier.starts_with('/') {
        return None;
    }

    if let Some(rest) = specifier.strip_prefix('@') {
        let mut parts = rest.splitn(3, '/');
        let scope = parts.next()?;
        let name = parts.next()?;
        if scope.is_empty() || name.is_empty() {
            return None;
        }
        Some(format!("@{scope}/{name}"))
    } else {
        specifier.split('/').next().map(str::to_string)
    }
}

/// Parses source files and classifies imported packages as used or unused
pub struct SourceAnalyzer {
    js: Parser,
    ts: Parser,
    tsx: Parser,
}

impl SourceAnalyzer {
    pub fn new() -> Result<Self, AnalyzeError> {
        let mut js = Parser::new();
        js.set_language(&tree_sitter_javascript::LANGUAGE.into())
            .map_err(|_| AnalyzeError::LanguageInit)?;

        let mut ts = Parser::new();
        ts.set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .map_err(|_| AnalyzeError::LanguageInit)?;

        let mut tsx = Parser::new();
        tsx.set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())
            .map_err(|_| AnalyzeError::LanguageInit)?;

        Ok(Self { js, ts, tsx })
    }

    /// Analyze one file on disk
    pub fn analyze_file(&mut self, path: &Path) -> Result<FileAnalysis, AnalyzeError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let language = SourceLanguage::from_extension(ext)
            .ok_or_else(|| AnalyzeError::UnsupportedExtension(ext.to_string()))?;
        let contents = std::fs::read_to_string(path)?;
        self.analyze_source(&contents, language)
    }

    /// Analyze raw source content
    pub fn analyze_source(
        &mut self,
        source: &str,
        language: SourceLanguage,
    ) -> Result<FileAnalysis, AnalyzeError> {
        let parser = match language {
            SourceLanguage::JavaScript => &mut self.js,
            SourceLanguage::TypeScript => &mut self.ts,
            SourceLanguage::Tsx => &mut self.tsx,
        };

        let tree = parser.parse(source, None).ok_or(AnalyzeError::Parse)?;
        let root = tree.root_node();

        let mut analysis = FileAnalysis {
            used: Vec::new(),
            bindings: collect_bindings(root, source),
        };

        let mut has_jsx = false;
        detect_usage(root, source, &mut analysis, &mut has_jsx);

        // Any markup element implies the framework dependency, imported or not
        if has_jsx {
            analysis.mark_used("react");
        }

        debug!(
            "analyzed: {} bindings, {} used packages",
            analysis.bindings.len(),
            analysis.used.len()
        );

        Ok(analysis)
    }
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Extract the value of a string literal node (strips the quotes)
fn string_value(node: Node, source: &str) -> String {
    node_text(node, source)
        .trim_matches(['"', '\'', '`'])
        .to_string()
}

/// Build the import-binding table: ES import declarations plus variable
/// declarators initialized by `require("literal")`.
fn collect_bindings(node: Node, source: &str) -> Vec<ImportBinding> {
    let mut bindings = Vec::new();
    collect_bindings_into(node, source, &mut bindings);
    bindings
}

fn collect_bindings_into(node: Node, source: &str, bindings: &mut Vec<ImportBinding>) {
    match node.kind() {
        "import_statement" => {
            if let Some(package) = import_source_identity(node, source) {
                for local in import_clause_locals(node, source) {
                    push_binding(bindings, &package, &local);
                }
            }
            return;
        }
        "variable_declarator" => {
            if let Some(specifier) = require_specifier(node, source) {
                if let Some(package) = package_identity(&specifier) {
                    if let Some(name_node) = node.child_by_field_name("name") {
                        for local in pattern_locals(name_node, source) {
                            push_binding(bindings, &package, &local);
                        }
                    }
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_bindings_into(child, source, bindings);
    }
}

fn push_binding(bindings: &mut Vec<ImportBinding>, package: &str, local: &str) {
    bindings.push(ImportBinding {
        package: package.to_string(),
        local_name: local.to_string(),
        used: false,
        usage_count: 0,
    });
}

/// Package identity of an import statement's source, if it is external
fn import_source_identity(node: Node, source: &str) -> Option<String> {
    let source_node = node.child_by_field_name("source")?;
    package_identity(&string_value(source_node, source))
}

/// Local names bound by an import clause: default, namespace, and named
fn import_clause_locals(import: Node, source: &str) -> Vec<String> {
    let mut locals = Vec::new();
    let mut cursor = import.walk();

    for child in import.children(&mut cursor) {
        if child.kind() != "import_clause" {
            continue;
        }
        let mut clause_cursor = child.walk();
        for part in child.children(&mut clause_cursor) {
            match part.kind() {
                "identifier" => locals.push(node_text(part, source).to_string()),
                "namespace_import" => {
                    let mut ns_cursor = part.walk();
                    for ns_child in part.children(&mut ns_cursor) {
                        if ns_child.kind() == "identifier" {
                            locals.push(node_text(ns_child, source).to_string());
                        }
                    }
                }
                "named_imports" => {
                    let mut named_cursor = part.walk();
                    for spec in part.children(&mut named_cursor) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        // `foo as bar` binds bar; plain `foo` binds foo
                        let local = spec
                            .child_by_field_name("alias")
                            .or_else(|| spec.child_by_field_name("name"));
                        if let Some(local) = local {
                            locals.push(node_text(local, source).to_string());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    locals
}

/// If this declarator is `<pattern> = require("literal")`, return the specifier
fn require_specifier(declarator: Node, source: &str) -> Option<String> {
    let value = declarator.child_by_field_name("value")?;
    if value.kind() != "call_expression" {
        return None;
    }
    let function = value.child_by_field_name("function")?;
    if function.kind() != "identifier" || node_text(function, source) != "require" {
        return None;
    }
    let args = value.child_by_field_name("arguments")?;
    if args.kind() != "arguments" {
        return None;
    }
    let mut cursor = args.walk();
    for arg in args.children(&mut cursor) {
        if arg.kind() == "string" {
            return Some(string_value(arg, source));
        }
    }
    None
}

/// Local names bound by a declarator pattern: a plain identifier, or each
/// destructured property name
fn pattern_locals(pattern: Node, source: &str) -> Vec<String> {
    match pattern.kind() {
        "identifier" => vec![node_text(pattern, source).to_string()],
        "object_pattern" => {
            let mut locals = Vec::new();
            let mut cursor = pattern.walk();
            for prop in pattern.children(&mut cursor) {
                match prop.kind() {
                    "shorthand_property_identifier_pattern" => {
                        locals.push(node_text(prop, source).to_string());
                    }
                    "pair_pattern" => {
                        if let Some(value) = prop.child_by_field_name("value") {
                            if value.kind() == "identifier" {
                                locals.push(node_text(value, source).to_string());
                            }
                        }
                    }
                    "object_assignment_pattern" => {
                        if let Some(left) = prop.child_by_field_name("left") {
                            if left.kind() == "shorthand_property_identifier_pattern" {
                                locals.push(node_text(left, source).to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
            locals
        }
        _ => Vec::new(),
    }
}

/// Single traversal over the tree collecting usage signals
fn detect_usage(node: Node, source: &str, analysis: &mut FileAnalysis, has_jsx: &mut bool) {
    match node.kind() {
        // Bindings were collected separately; nothing inside an import
        // declaration is a reference.
        "import_statement" => return,

        "jsx_element" => {
            *has_jsx = true;
        }
        "jsx_opening_element" | "jsx_self_closing_element" => {
            if node.kind() == "jsx_self_closing_element" {
                *has_jsx = true;
            }
            if let Some(name) = node.child_by_field_name("name") {
                if name.kind() == "identifier" {
                    mark_reference(analysis, node_text(name, source));
                }
            }
        }

        "call_expression" => {
            // Tagged template on a `styled.xxx` member marks the styling
            // library even when it was never imported.
            if is_styled_tagged_template(node, source) {
                analysis.mark_used("styled-components");
            }
        }

        "member_expression" => {
            if let Some(object) = node.child_by_field_name("object") {
                if object.kind() == "identifier" {
                    mark_reference(analysis, node_text(object, source));
                }
            }
        }

        "variable_declarator" => {
            if require_specifier(node, source).is_some() {
                // The left-hand binding of a require declarator is not a
                // reference; only look inside the initializer.
                if let Some(value) = node.child_by_field_name("value") {
                    detect_usage(value, source, analysis, has_jsx);
                }
                return;
            }
        }

        // Bare identifier occurrences, including type positions, member
        // properties and object-literal shorthands. Scope-blind on purpose.
        "identifier" | "type_identifier" | "property_identifier"
        | "shorthand_property_identifier" => {
            if !is_excluded_identifier(node) {
                mark_reference(analysis, node_text(node, source));
            }
            return;
        }

        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        detect_usage(child, source, analysis, has_jsx);
    }
}

/// Identifiers that are declarations or already counted elsewhere
fn is_excluded_identifier(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        // Left-hand side of any declarator is a binding, not a reference
        "variable_declarator" => parent
            .child_by_field_name("name")
            .is_some_and(|name| name.id() == node.id()),
        // The object is handled by the member_expression arm
        "member_expression" => parent
            .child_by_field_name("object")
            .is_some_and(|object| object.id() == node.id()),
        _ => false,
    }
}

fn mark_reference(analysis: &mut FileAnalysis, name: &str) {
    let mut matched = None;
    for binding in &mut analysis.bindings {
        if binding.local_name == name {
            binding.used = true;
            binding.usage_count += 1;
            matched = Some(binding.package.clone());
        }
    }
    if let Some(package) = matched {
        analysis.mark_used(&package);
    }
}

/// `styled.button`...`` — a tagged template whose tag object is literally
/// named `styled`
fn is_styled_tagged_template(call: Node, source: &str) -> bool {
    let Some(args) = call.child_by_field_name("arguments") else {
        return false;
    };
    if args.kind() != "template_string" {
        return false;
    }
    let Some(function) = call.child_by_field_name("function") else {
        return false;
    };
    if function.kind() != "member_expression" {
        return false;
    }
    function
        .child_by_field_name("object")
        .is_some_and(|object| object.kind() == "identifier" && node_text(object, source) == "styled")
}
