//! Aggregation and inheritance trees over one arena of descriptors.
//!
//! Nodes are stored in aggregation pre-order, so arena order is also the
//! traversal order every consumer query reports. Both trees are expressed as
//! [`NodeId`] links into that arena.

use crate::dependency::Dependency;
use crate::error::{ExtractError, TreeError};
use crate::extractor::{Extraction, PomExtractor};
use crate::pom::Pom;
use crate::resolve;
use pomtree_core::{FileSystem, PomtreeConfig};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct PomNode {
    pom: Pom,
    aggregation_parent: Option<NodeId>,
    aggregated: Vec<NodeId>,
    inheritance_parent: Option<NodeId>,
    inheritance_children: Vec<NodeId>,
}

impl PomNode {
    fn new(pom: Pom, aggregation_parent: Option<NodeId>) -> Self {
        Self {
            pom,
            aggregation_parent,
            aggregated: Vec::new(),
            inheritance_parent: None,
            inheritance_children: Vec::new(),
        }
    }

    pub fn pom(&self) -> &Pom {
        &self.pom
    }
}

/// A node whose descriptor could not be extracted.
#[derive(Debug, Clone, Serialize)]
pub struct DegradedPom {
    pub id: NodeId,
    pub path: PathBuf,
    pub error: ExtractError,
}

/// A child whose parent coordinates matched more than one node. Every
/// candidate lists the child; the child's parent link is the last candidate.
#[derive(Debug, Clone, Serialize)]
pub struct AmbiguousParent {
    pub child: NodeId,
    pub candidates: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleDependencies {
    pub path: PathBuf,
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, Default)]
pub struct PomTree {
    nodes: Vec<PomNode>,
    degraded: Vec<DegradedPom>,
    ambiguous: Vec<AmbiguousParent>,
}

impl PomTree {
    #[cfg(test)]
    pub(crate) fn from_poms(poms: Vec<Pom>) -> Self {
        Self {
            nodes: poms.into_iter().map(|p| PomNode::new(p, None)).collect(),
            ..Default::default()
        }
    }

    fn push(&mut self, extraction: Extraction, aggregation_parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let pom = match extraction {
            Extraction::Extracted(pom) => pom,
            Extraction::Degraded { pom, error } => {
                self.degraded.push(DegradedPom {
                    id,
                    path: pom.path().to_path_buf(),
                    error,
                });
                pom
            }
        };
        self.nodes.push(PomNode::new(pom, aggregation_parent));
        id
    }

    pub(crate) fn link_inheritance_parent(&mut self, child: NodeId, parent: NodeId) {
        self.nodes[child.0].inheritance_parent = Some(parent);
        self.nodes[parent.0].inheritance_children.push(child);
    }

    /// Joins every child's parent coordinates against an identity index.
    fn link_inheritance(&mut self) {
        let mut index: HashMap<(String, String), Vec<NodeId>> = HashMap::new();
        for id in self.ids() {
            let (group, artifact) = self.pom(id).identity();
            index
                .entry((group.to_string(), artifact.to_string()))
                .or_default()
                .push(id);
        }

        for child in self.ids() {
            let pom = self.pom(child);
            if !pom.has_parent() {
                continue;
            }

            let key = (
                pom.parent_group_id().to_string(),
                pom.parent_artifact_id().to_string(),
            );
            let candidates: Vec<NodeId> = index
                .get(&key)
                .map(|ids| ids.iter().copied().filter(|c| *c != child).collect())
                .unwrap_or_default();

            if candidates.is_empty() {
                debug!(
                    pom = %pom,
                    parent = %format!("{}:{}", key.0, key.1),
                    "Inheritance parent is outside the project"
                );
                continue;
            }

            for &parent in &candidates {
                self.link_inheritance_parent(child, parent);
            }

            if candidates.len() > 1 {
                warn!(
                    pom = %self.pom(child),
                    candidates = candidates.len(),
                    "Multiple inheritance-parent candidates; using the last in module order"
                );
                self.ambiguous.push(AmbiguousParent { child, candidates });
            }
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(NodeId(0))
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&PomNode> {
        self.nodes.get(id.0)
    }

    /// Panics on an id from another tree.
    pub fn pom(&self, id: NodeId) -> &Pom {
        &self.nodes[id.0].pom
    }

    /// Node ids in aggregation pre-order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn poms(&self) -> Vec<&Pom> {
        self.nodes.iter().map(|n| &n.pom).collect()
    }

    pub fn aggregated(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].aggregated
    }

    pub fn aggregation_parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].aggregation_parent
    }

    pub fn inheritance_parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].inheritance_parent
    }

    pub fn inheritance_children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].inheritance_children
    }

    /// `id` followed by its inheritance ancestors, nearest first.
    pub fn inheritance_chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut seen: HashSet<NodeId> = HashSet::from([id]);
        let mut current = id;
        while let Some(parent) = self.inheritance_parent(current) {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Walks the aggregation links from the root.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root().into_iter().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.aggregated(id).iter().rev().copied());
        }
        order
    }

    /// First node, in module order, with this identity.
    pub fn find(&self, group_id: &str, artifact_id: &str) -> Option<NodeId> {
        self.ids()
            .find(|id| self.pom(*id).identity() == (group_id, artifact_id))
    }

    pub fn find_by_artifact(&self, artifact_id: &str) -> Vec<NodeId> {
        self.ids()
            .filter(|id| self.pom(*id).artifact_id() == artifact_id)
            .collect()
    }

    pub fn resolved_dependencies(&self, id: NodeId) -> Vec<Dependency> {
        resolve::resolved_dependencies(self, id)
    }

    pub fn resolved_property(&self, id: NodeId, name: &str) -> Option<String> {
        resolve::resolved_property(self, id, name)
    }

    /// Declared dependencies of every node that carry a version.
    pub fn raw_dependencies(&self) -> Vec<&Dependency> {
        self.nodes
            .iter()
            .flat_map(|n| n.pom.raw_dependencies())
            .filter(|dep| dep.has_version())
            .collect()
    }

    pub fn dependencies(&self) -> Vec<Dependency> {
        self.ids()
            .flat_map(|id| self.resolved_dependencies(id))
            .collect()
    }

    pub fn dynamic_dependencies(&self) -> Vec<Dependency> {
        self.dependencies()
            .into_iter()
            .filter(Dependency::is_dynamic)
            .collect()
    }

    pub fn dependencies_by_path(&self) -> Vec<ModuleDependencies> {
        self.ids()
            .map(|id| ModuleDependencies {
                path: self.pom(id).path().to_path_buf(),
                dependencies: self.resolved_dependencies(id),
            })
            .collect()
    }

    /// Distinct repository URLs in first-seen order.
    pub fn repository_urls(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .flat_map(|n| n.pom.repository_urls())
            .map(String::as_str)
            .filter(|url| seen.insert(*url))
            .collect()
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.nodes.iter().map(|n| n.pom.path()).collect()
    }

    pub fn degraded(&self) -> &[DegradedPom] {
        &self.degraded
    }

    pub fn ambiguous_parents(&self) -> &[AmbiguousParent] {
        &self.ambiguous
    }
}

/// Loads a project from its root descriptor.
pub struct PomTreeBuilder<'a> {
    fs: &'a dyn FileSystem,
    extractor: PomExtractor,
    descriptor_name: String,
    max_depth: usize,
}

impl<'a> PomTreeBuilder<'a> {
    pub fn new(fs: &'a dyn FileSystem, config: &PomtreeConfig) -> Result<Self, TreeError> {
        config.validate()?;
        Ok(Self {
            fs,
            extractor: PomExtractor::new(config),
            descriptor_name: config.descriptor_name.clone(),
            max_depth: config.max_module_depth,
        })
    }

    /// `path` is the root descriptor or the directory holding it.
    pub fn build(&self, path: &Path) -> Result<PomTree, TreeError> {
        let root = self.root_descriptor(path)?;
        debug!(root = %root.display(), "Building descriptor tree");

        // Every module is expected to use the root's file name.
        let file_name = root
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.descriptor_name.clone());

        let mut tree = PomTree::default();
        let mut ancestors = Vec::new();
        self.aggregate(root, None, 0, &file_name, &mut ancestors, &mut tree)?;
        tree.link_inheritance();

        info!(
            modules = tree.len(),
            degraded = tree.degraded().len(),
            ambiguous = tree.ambiguous_parents().len(),
            "Descriptor tree built"
        );
        Ok(tree)
    }

    fn root_descriptor(&self, path: &Path) -> Result<PathBuf, TreeError> {
        let candidate = if self.fs.is_dir(path) {
            path.join(&self.descriptor_name)
        } else {
            path.to_path_buf()
        };

        if !self.fs.is_file(&candidate) {
            return Err(TreeError::RootDescriptorMissing(candidate));
        }

        Ok(self
            .fs
            .canonicalize(&candidate)
            .unwrap_or_else(|_| normalize_path(&candidate)))
    }

    fn aggregate(
        &self,
        path: PathBuf,
        aggregation_parent: Option<NodeId>,
        depth: usize,
        file_name: &str,
        ancestors: &mut Vec<PathBuf>,
        tree: &mut PomTree,
    ) -> Result<NodeId, TreeError> {
        if ancestors.contains(&path) {
            return Err(TreeError::ModuleCycle { path });
        }
        if depth > self.max_depth {
            return Err(TreeError::DepthExceeded {
                path,
                limit: self.max_depth,
            });
        }

        let extraction = self.extractor.extract_file(self.fs, &path);
        let id = tree.push(extraction, aggregation_parent);

        let pom = tree.pom(id);
        if !pom.is_aggregator() || pom.modules().is_empty() {
            return Ok(id);
        }

        let modules = pom.modules().to_vec();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        ancestors.push(path);
        for module in &modules {
            let module_path = normalize_path(&self.fs.module_descriptor(&dir, module, file_name));
            let child =
                self.aggregate(module_path, Some(id), depth + 1, file_name, ancestors, tree)?;
            tree.nodes[id.0].aggregated.push(child);
        }
        ancestors.pop();

        Ok(id)
    }
}

/// Folds `.` and `..` without touching the file system.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomtree_core::config::{DEFAULT_CENTRAL_URL, DEFAULT_TEST_PLUGIN};
    use pomtree_core::MockFileSystem;

    fn test_config() -> PomtreeConfig {
        PomtreeConfig {
            descriptor_name: "pom.xml".to_string(),
            central_url: DEFAULT_CENTRAL_URL.to_string(),
            test_plugin: DEFAULT_TEST_PLUGIN.to_string(),
            max_module_depth: 8,
            max_file_size_bytes: 65_536,
            log_level: "info".to_string(),
        }
    }

    fn build(fs: &MockFileSystem) -> Result<PomTree, TreeError> {
        PomTreeBuilder::new(fs, &test_config())
            .unwrap()
            .build(Path::new("/mock"))
    }

    fn aggregator(artifact: &str, modules: &[&str], extra: &str) -> String {
        let modules: String = modules
            .iter()
            .map(|m| format!("<module>{}</module>", m))
            .collect();
        format!(
            "<project><groupId>org.acme</groupId><artifactId>{}</artifactId><version>1.0</version>\
             <packaging>pom</packaging><modules>{}</modules>{}</project>",
            artifact, modules, extra
        )
    }

    fn child(artifact: &str, parent: &str, extra: &str) -> String {
        format!(
            "<project><parent><groupId>org.acme</groupId><artifactId>{}</artifactId><version>1.0</version></parent>\
             <artifactId>{}</artifactId>{}</project>",
            parent, artifact, extra
        )
    }

    #[test]
    fn test_two_node_project_resolves_child_dependency() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "pom.xml",
            &aggregator("root", &["child"], "<properties><rev>1.2</rev></properties>"),
        );
        fs.add_file(
            "child/pom.xml",
            &child(
                "child",
                "root",
                "<dependencies><dependency><groupId>org.x</groupId><artifactId>lib</artifactId>\
                 <version>${rev}</version></dependency></dependencies>",
            ),
        );

        let tree = build(&fs).unwrap();
        assert_eq!(tree.len(), 2);

        let root = tree.root().unwrap();
        let module = tree.find("org.acme", "child").unwrap();
        assert_eq!(tree.inheritance_parent(module), Some(root));
        assert_eq!(tree.inheritance_children(root), [module]);
        assert_eq!(tree.aggregation_parent(module), Some(root));

        let deps = tree.resolved_dependencies(module);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].version, "1.2");
    }

    #[test]
    fn test_inheritance_links_across_aggregation_subtrees() {
        let fs = MockFileSystem::new();
        fs.add_file("pom.xml", &aggregator("root", &["platform", "apps"], ""));
        fs.add_file(
            "platform/pom.xml",
            &child("platform", "root", "<properties><spring.version>6.1.0</spring.version></properties>"),
        );
        fs.add_file(
            "apps/pom.xml",
            &aggregator("apps", &["web"], ""),
        );
        fs.add_file(
            "apps/web/pom.xml",
            &child("web", "platform", ""),
        );

        let tree = build(&fs).unwrap();
        let web = tree.find("org.acme", "web").unwrap();
        let apps = tree.find("org.acme", "apps").unwrap();
        let platform = tree.find("org.acme", "platform").unwrap();

        assert_eq!(tree.aggregation_parent(web), Some(apps));
        assert_eq!(tree.inheritance_parent(web), Some(platform));
        assert_eq!(tree.inheritance_chain(web), vec![web, platform]);
        assert_eq!(
            resolve::find_property_value(&tree, web, "spring.version"),
            Some("6.1.0".to_string())
        );
        // apps declares no parent block
        assert_eq!(tree.inheritance_parent(apps), None);
    }

    #[test]
    fn test_pre_order_matches_arena_order() {
        let fs = MockFileSystem::new();
        fs.add_file("pom.xml", &aggregator("root", &["a", "b"], ""));
        fs.add_file("a/pom.xml", &aggregator("a", &["a1", "a2"], ""));
        fs.add_file("a/a1/pom.xml", &child("a1", "a", ""));
        fs.add_file("a/a2/pom.xml", &child("a2", "a", ""));
        fs.add_file("b/pom.xml", &child("b", "root", ""));

        let tree = build(&fs).unwrap();
        let order: Vec<NodeId> = tree.ids().collect();
        assert_eq!(tree.pre_order(), order);

        let names: Vec<&str> = tree.poms().iter().map(|p| p.artifact_id()).collect();
        assert_eq!(names, vec!["root", "a", "a1", "a2", "b"]);

        let again = build(&fs).unwrap();
        assert_eq!(again.paths(), tree.paths());
    }

    #[test]
    fn test_duplicate_parent_candidates_all_linked() {
        let fs = MockFileSystem::new();
        fs.add_file("pom.xml", &aggregator("root", &["base-one", "base-two", "leaf"], ""));
        fs.add_file("base-one/pom.xml", &child("base", "root", ""));
        fs.add_file("base-two/pom.xml", &child("base", "root", ""));
        fs.add_file("leaf/pom.xml", &child("leaf", "base", ""));

        let tree = build(&fs).unwrap();
        let leaf = tree.find("org.acme", "leaf").unwrap();
        let bases = tree.find_by_artifact("base");
        assert_eq!(bases.len(), 2);

        for base in &bases {
            assert_eq!(tree.inheritance_children(*base), [leaf]);
        }
        assert_eq!(tree.inheritance_parent(leaf), Some(bases[1]));

        let ambiguous = tree.ambiguous_parents();
        assert_eq!(ambiguous.len(), 1);
        assert_eq!(ambiguous[0].child, leaf);
        assert_eq!(ambiguous[0].candidates, bases);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let fs = MockFileSystem::new();
        fs.add_dir("empty");

        let err = PomTreeBuilder::new(&fs, &test_config())
            .unwrap()
            .build(Path::new("/mock/empty"))
            .unwrap_err();
        assert!(matches!(err, TreeError::RootDescriptorMissing(p) if p == Path::new("/mock/empty/pom.xml")));
    }

    #[test]
    fn test_broken_module_degrades_without_aborting() {
        let fs = MockFileSystem::new();
        fs.add_file("pom.xml", &aggregator("root", &["broken", "gone", "ok"], ""));
        fs.add_file("broken/pom.xml", "<project><groupId>oops</project>");
        fs.add_file("ok/pom.xml", &child("ok", "root", ""));

        let tree = build(&fs).unwrap();
        assert_eq!(tree.len(), 4);

        let degraded = tree.degraded();
        assert_eq!(degraded.len(), 2);
        assert!(matches!(degraded[0].error, ExtractError::Parse(_)));
        assert!(matches!(degraded[1].error, ExtractError::Read { .. }));
        assert!(tree.pom(degraded[0].id).is_empty());

        let ok = tree.find("org.acme", "ok").unwrap();
        assert_eq!(tree.inheritance_parent(ok), tree.root());
    }

    #[test]
    fn test_module_cycle_detected() {
        let fs = MockFileSystem::new();
        fs.add_file("pom.xml", &aggregator("root", &["loop"], ""));
        fs.add_file("loop/pom.xml", &aggregator("loop", &[".."], ""));

        let err = build(&fs).unwrap_err();
        assert!(matches!(err, TreeError::ModuleCycle { path } if path == Path::new("/mock/pom.xml")));
    }

    #[test]
    fn test_sibling_module_via_parent_dir() {
        let fs = MockFileSystem::new();
        fs.add_file("build/pom.xml", &aggregator("root", &["../lib"], ""));
        fs.add_file("lib/pom.xml", &child("lib", "root", ""));

        let tree = PomTreeBuilder::new(&fs, &test_config())
            .unwrap()
            .build(Path::new("/mock/build/pom.xml"))
            .unwrap();

        assert_eq!(tree.paths()[1], Path::new("/mock/lib/pom.xml"));
        assert!(tree.degraded().is_empty());
    }

    #[test]
    fn test_modules_use_root_file_name() {
        let fs = MockFileSystem::new();
        fs.add_file("build.xml", &aggregator("root", &["child"], ""));
        fs.add_file("child/build.xml", &child("child", "root", ""));
        fs.add_file("child/pom.xml", &child("decoy", "root", ""));

        let tree = PomTreeBuilder::new(&fs, &test_config())
            .unwrap()
            .build(Path::new("/mock/build.xml"))
            .unwrap();

        assert_eq!(
            tree.paths(),
            vec![Path::new("/mock/build.xml"), Path::new("/mock/child/build.xml")]
        );
        assert!(tree.degraded().is_empty());
        assert!(tree.find("org.acme", "child").is_some());
    }

    #[test]
    fn test_depth_limit() {
        let fs = MockFileSystem::new();
        fs.add_file("pom.xml", &aggregator("root", &["a"], ""));
        fs.add_file("a/pom.xml", &aggregator("a", &["b"], ""));
        fs.add_file("a/b/pom.xml", &child("b", "a", ""));

        let config = PomtreeConfig {
            max_module_depth: 1,
            ..test_config()
        };
        let err = PomTreeBuilder::new(&fs, &config)
            .unwrap()
            .build(Path::new("/mock"))
            .unwrap_err();
        assert!(matches!(err, TreeError::DepthExceeded { limit: 1, .. }));
    }

    #[test]
    fn test_non_aggregator_modules_ignored() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "pom.xml",
            "<project><groupId>g</groupId><artifactId>jar</artifactId><modules><module>x</module></modules></project>",
        );

        let tree = build(&fs).unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_tree_wide_queries() {
        let fs = MockFileSystem::new();
        fs.add_file(
            "pom.xml",
            &aggregator(
                "root",
                &["svc"],
                "<properties><rev>2.0-SNAPSHOT</rev></properties>\
                 <repositories><repository><url>https://repo.acme.org/m2</url></repository></repositories>\
                 <dependencyManagement><dependencies>\
                 <dependency><groupId>org.x</groupId><artifactId>bom</artifactId><version>1.0</version></dependency>\
                 </dependencies></dependencyManagement>",
            ),
        );
        fs.add_file(
            "svc/pom.xml",
            &child(
                "svc",
                "root",
                "<repositories><repository><url>https://repo.acme.org/m2/</url></repository></repositories>\
                 <dependencies>\
                 <dependency><groupId>org.x</groupId><artifactId>bom</artifactId></dependency>\
                 <dependency><groupId>org.acme</groupId><artifactId>shared</artifactId><version>${rev}</version></dependency>\
                 <dependency><groupId>org.y</groupId><artifactId>edge</artifactId><version>LATEST</version></dependency>\
                 </dependencies>",
            ),
        );

        let tree = build(&fs).unwrap();

        assert_eq!(tree.raw_dependencies().len(), 3);
        let versions: Vec<String> = tree.dependencies().into_iter().map(|d| d.version).collect();
        assert_eq!(versions, vec!["1.0", "2.0-SNAPSHOT", "LATEST"]);

        let dynamic: Vec<String> = tree
            .dynamic_dependencies()
            .into_iter()
            .map(|d| d.artifact_id)
            .collect();
        assert_eq!(dynamic, vec!["shared", "edge"]);

        let by_path = tree.dependencies_by_path();
        assert_eq!(by_path.len(), 2);
        assert_eq!(by_path[1].path, PathBuf::from("/mock/svc/pom.xml"));
        assert_eq!(by_path[1].dependencies.len(), 2);

        assert_eq!(
            tree.repository_urls(),
            vec!["https://repo.acme.org/m2/", DEFAULT_CENTRAL_URL]
        );
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./pom.xml")),
            PathBuf::from("/a/c/pom.xml")
        );
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    }
}
