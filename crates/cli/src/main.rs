use pomtree_cli::cli::commands::{CliArgs, Commands, DepsArgs, ProjectArgs, PropertiesArgs, TreeArgs};
use pomtree_cli::cli::output::{
    DependencyReport, OutputFormat, OutputFormatter, PropertiesReport, TreeReport,
};
use pomtree_cli::{NAME, VERSION};
use pomtree_core::logging;
use pomtree_core::{PomtreeConfig, RealFileSystem};
use pomtree_model::{PomTree, PomTreeBuilder};

use anyhow::Result;
use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::process;
use tracing::{debug, error, info, warn, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Tree(tree_args) => handle_tree(tree_args, args.quiet),
        Commands::Deps(deps_args) => handle_deps(deps_args, args.quiet),
        Commands::Properties(props_args) => handle_properties(props_args, args.quiet),
        Commands::Repos(project) => handle_repos(project, args.quiet),
        Commands::Paths(project) => handle_paths(project, args.quiet),
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let mut config = logging::config_from_env();

    if let Some(level_str) = &args.log_level {
        config.level = logging::parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }

    logging::init_logging(config);
}

/// Builds the tree for `args`, logging every fatal condition.
fn load_tree(args: &ProjectArgs) -> Option<PomTree> {
    let project_path = match &args.project_path {
        Some(path) => path.clone(),
        None => match env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                error!("Failed to get current directory: {}", e);
                return None;
            }
        },
    };
    debug!("Project path: {}", project_path.display());

    let config = match PomtreeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("\nPlease check your POMTREE_* environment variables.");
            return None;
        }
    };
    debug!("{}", config);

    let fs = RealFileSystem::new();
    let tree = PomTreeBuilder::new(&fs, &config).and_then(|builder| builder.build(&project_path));
    match tree {
        Ok(tree) => {
            info!("Loaded {} modules from {}", tree.len(), project_path.display());
            for degraded in tree.degraded() {
                warn!("Skipped {}: {}", degraded.path.display(), degraded.error);
            }
            Some(tree)
        }
        Err(e) => {
            error!("Failed to build module tree: {}", e);
            None
        }
    }
}

/// Writes `output` to the requested file or stdout.
fn emit(output: Result<String>, destination: &Option<PathBuf>, quiet: bool) -> i32 {
    let output = match output {
        Ok(out) => out,
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            return 1;
        }
    };

    if let Some(output_file) = destination {
        match std::fs::write(output_file, &output) {
            Ok(_) => {
                info!("Output written to: {}", output_file.display());
                if !quiet {
                    println!("Output written to: {}", output_file.display());
                }
            }
            Err(e) => {
                error!("Failed to write output to file: {}", e);
                return 1;
            }
        }
    } else {
        println!("{}", output.trim_end());
    }

    0
}

fn formatter(project: &ProjectArgs) -> OutputFormatter {
    let format: OutputFormat = project.format.into();
    OutputFormatter::new(format)
}

fn handle_tree(args: &TreeArgs, quiet: bool) -> i32 {
    let Some(tree) = load_tree(&args.project) else {
        return 1;
    };

    let report = TreeReport::from_tree(&tree);
    emit(
        formatter(&args.project).format_tree(&report),
        &args.project.output,
        quiet,
    )
}

fn handle_deps(args: &DepsArgs, quiet: bool) -> i32 {
    let Some(tree) = load_tree(&args.project) else {
        return 1;
    };

    let report = if args.raw {
        DependencyReport::Flat(tree.raw_dependencies().into_iter().cloned().collect())
    } else if args.dynamic {
        DependencyReport::Flat(tree.dynamic_dependencies())
    } else if args.by_module {
        DependencyReport::ByModule(tree.dependencies_by_path())
    } else {
        DependencyReport::Flat(tree.dependencies())
    };

    emit(
        formatter(&args.project).format_dependencies(&report),
        &args.project.output,
        quiet,
    )
}

fn handle_properties(args: &PropertiesArgs, quiet: bool) -> i32 {
    let Some(tree) = load_tree(&args.project) else {
        return 1;
    };

    let module = match &args.module {
        Some(selector) => match selector.select(&tree) {
            Some(id) => id,
            None => {
                error!("Module not found in project: {}", selector);
                return 1;
            }
        },
        None => match tree.root() {
            Some(root) => root,
            None => {
                error!("Project has no modules");
                return 1;
            }
        },
    };

    let report = PropertiesReport::from_module(&tree, module);
    emit(
        formatter(&args.project).format_properties(&report),
        &args.project.output,
        quiet,
    )
}

fn handle_repos(args: &ProjectArgs, quiet: bool) -> i32 {
    let Some(tree) = load_tree(args) else {
        return 1;
    };

    emit(
        formatter(args).format_repositories(&tree.repository_urls()),
        &args.output,
        quiet,
    )
}

fn handle_paths(args: &ProjectArgs, quiet: bool) -> i32 {
    let Some(tree) = load_tree(args) else {
        return 1;
    };

    emit(formatter(args).format_paths(&tree.paths()), &args.output, quiet)
}
