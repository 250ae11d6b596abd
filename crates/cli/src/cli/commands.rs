use clap::{Args, Parser, Subcommand, ValueEnum};
use pomtree_model::{NodeId, PomTree};
use std::path::PathBuf;

/// Maven multi-module project inspector
#[derive(Parser, Debug)]
#[command(
    name = "pomtree",
    about = "Inspect the module tree, dependencies and properties of a Maven project",
    version,
    author,
    long_about = "pomtree reads a root pom.xml, follows its <modules> into every submodule and \
                  links each descriptor to its <parent>. Dependency versions are resolved \
                  through inherited ${...} properties without contacting any repository."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Enable debug logging"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Show the aggregation tree",
        long_about = "Prints every module in aggregation order together with its inheritance \
                      parent, followed by descriptors that failed to load and children whose \
                      parent coordinates matched more than one module.\n\n\
                      Examples:\n  \
                      pomtree tree\n  \
                      pomtree tree /path/to/project\n  \
                      pomtree tree --format json"
    )]
    Tree(TreeArgs),

    #[command(
        about = "List dependencies",
        long_about = "Lists versioned dependencies of every module with ${...} versions \
                      resolved along each module's inheritance chain.\n\n\
                      Examples:\n  \
                      pomtree deps\n  \
                      pomtree deps --raw\n  \
                      pomtree deps --dynamic\n  \
                      pomtree deps --by-module --format yaml"
    )]
    Deps(DepsArgs),

    #[command(
        about = "Show the properties of one module",
        long_about = "Prints the declared properties of a module next to their resolved values.\n\n\
                      Examples:\n  \
                      pomtree properties\n  \
                      pomtree properties --module acme-core\n  \
                      pomtree properties --module org.acme:acme-core"
    )]
    Properties(PropertiesArgs),

    #[command(about = "List repository URLs in first-seen order")]
    Repos(ProjectArgs),

    #[command(about = "List descriptor paths in aggregation order")]
    Paths(ProjectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(
        value_name = "PATH",
        help = "Root pom.xml or the directory holding it (defaults to current directory)"
    )]
    pub project_path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DepsArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(
        long,
        conflicts_with_all = ["dynamic", "by_module"],
        help = "Show declared versions without resolving properties"
    )]
    pub raw: bool,

    #[arg(
        long,
        conflicts_with = "by_module",
        help = "Only RELEASE, LATEST and SNAPSHOT versions"
    )]
    pub dynamic: bool,

    #[arg(long, help = "Group resolved dependencies by descriptor path")]
    pub by_module: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PropertiesArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(
        short = 'm',
        long,
        value_name = "MODULE",
        value_parser = parse_module_selector,
        help = "Module as groupId:artifactId or artifactId (defaults to the root)"
    )]
    pub module: Option<ModuleSelector>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

/// How a module is named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSelector {
    Coordinates {
        group_id: String,
        artifact_id: String,
    },
    Artifact(String),
}

impl ModuleSelector {
    /// First matching module in aggregation order.
    pub fn select(&self, tree: &PomTree) -> Option<NodeId> {
        match self {
            ModuleSelector::Coordinates {
                group_id,
                artifact_id,
            } => tree.find(group_id, artifact_id),
            ModuleSelector::Artifact(artifact_id) => {
                tree.find_by_artifact(artifact_id).first().copied()
            }
        }
    }
}

impl std::fmt::Display for ModuleSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleSelector::Coordinates {
                group_id,
                artifact_id,
            } => write!(f, "{}:{}", group_id, artifact_id),
            ModuleSelector::Artifact(artifact_id) => write!(f, "{}", artifact_id),
        }
    }
}

fn parse_module_selector(s: &str) -> Result<ModuleSelector, String> {
    let s = s.trim();
    let invalid = || {
        format!(
            "Invalid module: '{}'. Expected groupId:artifactId or artifactId",
            s
        )
    };

    match s.split_once(':') {
        None if !s.is_empty() => Ok(ModuleSelector::Artifact(s.to_string())),
        None => Err(invalid()),
        Some((group, artifact))
            if !group.is_empty() && !artifact.is_empty() && !artifact.contains(':') =>
        {
            Ok(ModuleSelector::Coordinates {
                group_id: group.to_string(),
                artifact_id: artifact.to_string(),
            })
        }
        Some(_) => Err(invalid()),
    }
}
