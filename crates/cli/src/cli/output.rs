//! Output formatting for multiple formats
//!
//! Every command builds a serializable report from the [`PomTree`] and hands it
//! to an [`OutputFormatter`], which renders JSON, YAML or human-readable text.
//!
//! # Example
//!
//! ```ignore
//! use pomtree_cli::cli::output::{OutputFormat, OutputFormatter, TreeReport};
//!
//! let report = TreeReport::from_tree(&tree);
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_tree(&report)?);
//! ```

use anyhow::{Context, Result};
use pomtree_model::{Dependency, ModuleDependencies, NodeId, PomTree};
use serde::Serialize;
use std::path::{Path, PathBuf};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";
const BRANCH: &str = "\u{251C}\u{2500} ";
const LAST_BRANCH: &str = "\u{2514}\u{2500} ";
const PIPE: &str = "\u{2502}  ";
const GAP: &str = "   ";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// One module of the aggregation tree.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub coordinates: String,
    pub packaging: String,
    pub path: PathBuf,
    /// Coordinates of the in-project inheritance parent.
    pub parent: Option<String>,
    pub degraded: bool,
    pub modules: Vec<ModuleReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DegradedReport {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AmbiguousReport {
    pub child: String,
    pub candidates: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeReport {
    pub root: Option<ModuleReport>,
    pub module_count: usize,
    pub degraded: Vec<DegradedReport>,
    pub ambiguous_parents: Vec<AmbiguousReport>,
}

impl TreeReport {
    pub fn from_tree(tree: &PomTree) -> Self {
        Self {
            root: tree.root().map(|root| module_report(tree, root)),
            module_count: tree.len(),
            degraded: tree
                .degraded()
                .iter()
                .map(|d| DegradedReport {
                    path: d.path.clone(),
                    error: d.error.to_string(),
                })
                .collect(),
            ambiguous_parents: tree
                .ambiguous_parents()
                .iter()
                .map(|a| AmbiguousReport {
                    child: tree.pom(a.child).to_string(),
                    candidates: a
                        .candidates
                        .iter()
                        .map(|c| tree.pom(*c).path().to_path_buf())
                        .collect(),
                })
                .collect(),
        }
    }
}

fn module_report(tree: &PomTree, id: NodeId) -> ModuleReport {
    let pom = tree.pom(id);
    ModuleReport {
        coordinates: pom.to_string(),
        packaging: pom.packaging().to_string(),
        path: pom.path().to_path_buf(),
        parent: tree.inheritance_parent(id).map(|p| tree.pom(p).to_string()),
        degraded: tree.degraded().iter().any(|d| d.id == id),
        modules: tree
            .aggregated(id)
            .iter()
            .map(|child| module_report(tree, *child))
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DependencyReport {
    Flat(Vec<Dependency>),
    ByModule(Vec<ModuleDependencies>),
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyEntry {
    pub name: String,
    pub value: String,
    pub resolved: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertiesReport {
    pub module: String,
    pub path: PathBuf,
    pub properties: Vec<PropertyEntry>,
}

impl PropertiesReport {
    pub fn from_module(tree: &PomTree, id: NodeId) -> Self {
        let pom = tree.pom(id);
        let properties = pom
            .raw_properties()
            .iter()
            .map(|(name, value)| PropertyEntry {
                name: name.clone(),
                value: value.clone(),
                resolved: tree
                    .resolved_property(id, name)
                    .unwrap_or_else(|| value.clone()),
            })
            .collect();

        Self {
            module: pom.to_string(),
            path: pom.path().to_path_buf(),
            properties,
        }
    }
}

/// Output formatter for command reports
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Creates a new output formatter with the specified format
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_tree(&self, report: &TreeReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report, "tree"),
            OutputFormat::Yaml => to_yaml(report, "tree"),
            OutputFormat::Human => Ok(self.format_tree_human(report)),
        }
    }

    pub fn format_dependencies(&self, report: &DependencyReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report, "dependencies"),
            OutputFormat::Yaml => to_yaml(report, "dependencies"),
            OutputFormat::Human => Ok(self.format_dependencies_human(report)),
        }
    }

    pub fn format_properties(&self, report: &PropertiesReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report, "properties"),
            OutputFormat::Yaml => to_yaml(report, "properties"),
            OutputFormat::Human => Ok(self.format_properties_human(report)),
        }
    }

    pub fn format_repositories(&self, urls: &[&str]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&urls, "repositories"),
            OutputFormat::Yaml => to_yaml(&urls, "repositories"),
            OutputFormat::Human => Ok(titled_list(
                "Repositories",
                urls.iter().map(|u| u.to_string()),
            )),
        }
    }

    pub fn format_paths(&self, paths: &[&Path]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&paths, "paths"),
            OutputFormat::Yaml => to_yaml(&paths, "paths"),
            OutputFormat::Human => Ok(titled_list(
                "Descriptors",
                paths.iter().map(|p| p.display().to_string()),
            )),
        }
    }

    // Human-readable formatting methods

    fn format_tree_human(&self, report: &TreeReport) -> String {
        let mut output = String::new();
        output.push_str("Module Tree\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        if let Some(root) = &report.root {
            output.push_str(&module_line(root));
            output.push('\n');
            render_children(&mut output, &root.modules, "");
        }
        output.push_str(&format!("\n{} modules\n", report.module_count));

        if !report.degraded.is_empty() {
            output.push_str("\n\u{26A0} Degraded descriptors:\n");
            for degraded in &report.degraded {
                output.push_str(&format!(
                    "  - {}: {}\n",
                    degraded.path.display(),
                    degraded.error
                ));
            }
        }

        if !report.ambiguous_parents.is_empty() {
            output.push_str("\n\u{26A0} Ambiguous inheritance parents:\n");
            for ambiguous in &report.ambiguous_parents {
                output.push_str(&format!("  - {} matches:\n", ambiguous.child));
                for candidate in &ambiguous.candidates {
                    output.push_str(&format!("      {}\n", candidate.display()));
                }
            }
        }

        output
    }

    fn format_dependencies_human(&self, report: &DependencyReport) -> String {
        match report {
            DependencyReport::Flat(dependencies) => titled_list(
                "Dependencies",
                dependencies.iter().map(|d| d.to_string()),
            ),
            DependencyReport::ByModule(modules) => {
                let mut output = String::new();
                output.push_str("Dependencies by Module\n");
                output.push_str(RULE);
                output.push('\n');

                for module in modules {
                    output.push_str(&format!("\n{}\n", module.path.display()));
                    if module.dependencies.is_empty() {
                        output.push_str(&format!("{}(none)\n", LAST_BRANCH));
                        continue;
                    }
                    for (i, dep) in module.dependencies.iter().enumerate() {
                        let is_last = i == module.dependencies.len() - 1;
                        let connector = if is_last { LAST_BRANCH } else { BRANCH };
                        output.push_str(&format!("{}{}\n", connector, dep));
                    }
                }
                output
            }
        }
    }

    fn format_properties_human(&self, report: &PropertiesReport) -> String {
        let mut output = String::new();
        output.push_str(&format!("Properties of {}\n", report.module));
        output.push_str(RULE);
        output.push_str("\n\n");

        if report.properties.is_empty() {
            output.push_str("(none declared)\n");
            return output;
        }

        let width = report
            .properties
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0);
        for property in &report.properties {
            if property.resolved == property.value {
                output.push_str(&format!("{:width$}  {}\n", property.name, property.value));
            } else {
                output.push_str(&format!(
                    "{:width$}  {}  \u{2192} {}\n",
                    property.name, property.value, property.resolved
                ));
            }
        }
        output
    }
}

fn render_children(output: &mut String, modules: &[ModuleReport], prefix: &str) {
    for (i, module) in modules.iter().enumerate() {
        let is_last = i == modules.len() - 1;
        let connector = if is_last { LAST_BRANCH } else { BRANCH };
        output.push_str(&format!("{}{}{}\n", prefix, connector, module_line(module)));

        let nested = format!("{}{}", prefix, if is_last { GAP } else { PIPE });
        render_children(output, &module.modules, &nested);
    }
}

fn module_line(module: &ModuleReport) -> String {
    if module.degraded {
        return format!("(degraded) {}", module.path.display());
    }

    let mut line = module.coordinates.clone();
    if !module.packaging.is_empty() {
        line.push_str(&format!(" [{}]", module.packaging));
    }
    if let Some(parent) = &module.parent {
        line.push_str(&format!(" \u{2190} {}", parent));
    }
    line
}

fn titled_list(title: &str, items: impl Iterator<Item = String>) -> String {
    let mut output = String::new();
    output.push_str(title);
    output.push('\n');
    output.push_str(RULE);
    output.push('\n');

    let mut count = 0;
    for item in items {
        output.push_str(&format!("  {}\n", item));
        count += 1;
    }
    output.push_str(&format!("\n{} total\n", count));
    output
}

fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {} to JSON", what))
}

fn to_yaml<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
}
