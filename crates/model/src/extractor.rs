//! Maps one descriptor document onto a [`Pom`].

use crate::dependency::Dependency;
use crate::document::{child_element, child_value, text_content, PomDocument};
use crate::error::ExtractError;
use crate::pom::Pom;
use pomtree_core::{FileSystem, PomtreeConfig};
use roxmltree::Node;
use std::path::Path;
use tracing::{debug, warn};

/// Placeholders that refer back to the declaring project, each checked only
/// against its own field. Dependencies using them are dropped at extraction
/// time.
const SELF_GROUP_TOKEN: &str = "project.groupId";
const SELF_ARTIFACT_TOKEN: &str = "project.artifactId";
const SELF_VERSION_TOKENS: [&str; 2] = ["project.version", "project.parent.version"];

/// Outcome of extracting one descriptor.
#[derive(Debug, Clone)]
pub enum Extraction {
    Extracted(Pom),
    /// The document could not be used; `pom` carries only the path.
    Degraded { pom: Pom, error: ExtractError },
}

impl Extraction {
    pub fn pom(&self) -> &Pom {
        match self {
            Extraction::Extracted(pom) | Extraction::Degraded { pom, .. } => pom,
        }
    }

    pub fn into_pom(self) -> Pom {
        match self {
            Extraction::Extracted(pom) | Extraction::Degraded { pom, .. } => pom,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Extraction::Degraded { .. })
    }

    pub fn error(&self) -> Option<&ExtractError> {
        match self {
            Extraction::Extracted(_) => None,
            Extraction::Degraded { error, .. } => Some(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PomExtractor {
    central_url: String,
    test_plugin: String,
    max_file_size: usize,
}

impl PomExtractor {
    pub fn new(config: &PomtreeConfig) -> Self {
        Self {
            central_url: config.central_repository(),
            test_plugin: config.test_plugin.clone(),
            max_file_size: config.max_file_size_bytes,
        }
    }

    pub fn extract_file(&self, fs: &dyn FileSystem, path: &Path) -> Extraction {
        match fs.metadata(path) {
            Ok(meta) if meta.len() > self.max_file_size as u64 => {
                return degrade(
                    path,
                    String::new(),
                    ExtractError::TooLarge {
                        path: path.to_path_buf(),
                        size: meta.len(),
                        limit: self.max_file_size,
                    },
                );
            }
            Ok(_) => {}
            Err(e) => {
                return degrade(
                    path,
                    String::new(),
                    ExtractError::Read {
                        path: path.to_path_buf(),
                        message: format!("{:#}", e),
                    },
                )
            }
        }

        match fs.read_to_string(path) {
            Ok(text) => self.extract_str(path, &text),
            Err(e) => degrade(
                path,
                String::new(),
                ExtractError::Read {
                    path: path.to_path_buf(),
                    message: format!("{:#}", e),
                },
            ),
        }
    }

    pub fn extract_str(&self, path: &Path, text: &str) -> Extraction {
        let raw = canonicalize_text(text);

        let doc = match PomDocument::parse(&raw) {
            Ok(doc) => doc,
            Err(error) => return degrade(path, raw.clone(), error),
        };

        let root_name = doc.root().tag_name().name().to_string();
        if root_name != "project" {
            drop(doc);
            return degrade(path, raw, ExtractError::UnexpectedRoot(root_name));
        }

        let mut pom = Pom::empty(path);
        pom.packaging = doc.value("/project/packaging");
        self.add_parent_coordinates(&doc, &mut pom);
        self.add_coordinates(&doc, &mut pom);
        self.add_properties(&doc, &mut pom);
        self.add_modules(&doc, &mut pom);
        self.add_dependencies(&doc, &mut pom);
        self.add_test_configurations(&doc, &mut pom);
        self.add_repository_urls(&doc, &mut pom);
        drop(doc);
        pom.raw = raw;

        debug!(
            path = %path.display(),
            pom = %pom,
            dependencies = pom.dependencies.len(),
            modules = pom.modules.len(),
            "Extracted descriptor"
        );
        Extraction::Extracted(pom)
    }

    fn add_parent_coordinates(&self, doc: &PomDocument<'_>, pom: &mut Pom) {
        pom.parent_group_id = doc.value("/project/parent/groupId");
        pom.parent_artifact_id = doc.value("/project/parent/artifactId");
        pom.parent_version = doc.value("/project/parent/version");
    }

    /// Missing own coordinates fall back to the literal `<parent>` block.
    fn add_coordinates(&self, doc: &PomDocument<'_>, pom: &mut Pom) {
        pom.group_id = or_fallback(doc.value("/project/groupId"), &pom.parent_group_id);
        pom.artifact_id = or_fallback(doc.value("/project/artifactId"), &pom.parent_artifact_id);
        pom.version = or_fallback(doc.value("/project/version"), &pom.parent_version);
    }

    fn add_properties(&self, doc: &PomDocument<'_>, pom: &mut Pom) {
        for node in doc.nodes("/project/properties/*") {
            let name = node.tag_name().name().to_string();
            let value = text_content(node).trim().to_string();
            pom.raw_properties.insert(name, value);
        }
    }

    fn add_modules(&self, doc: &PomDocument<'_>, pom: &mut Pom) {
        for node in doc.nodes("/project/modules/module") {
            let module = text_content(node).trim().to_string();
            if module.is_empty() {
                debug!(path = %pom.path.display(), "Skipping blank <module> entry");
                continue;
            }
            pom.modules.push(module);
        }
    }

    fn add_dependencies(&self, doc: &PomDocument<'_>, pom: &mut Pom) {
        let declared = doc.root().children().filter(|c| c.is_element()).flat_map(|section| {
            let lists: Vec<Node<'_, '_>> = match section.tag_name().name() {
                "dependencies" => vec![section],
                "dependencyManagement" => section
                    .children()
                    .filter(|c| c.is_element() && c.tag_name().name() == "dependencies")
                    .collect(),
                _ => Vec::new(),
            };
            lists.into_iter().flat_map(|l| {
                l.children()
                    .filter(|d| d.is_element() && d.tag_name().name() == "dependency")
            })
        });

        for node in declared {
            let dependency = read_dependency(node);
            if is_self_referential(&dependency) {
                debug!(
                    path = %pom.path.display(),
                    dependency = %dependency,
                    "Dropping self-referential dependency"
                );
                continue;
            }
            pom.dependencies.push(dependency);
        }
    }

    fn add_test_configurations(&self, doc: &PomDocument<'_>, pom: &mut Pom) {
        let Some(plugin) = doc
            .descendants("plugin")
            .into_iter()
            .find(|p| child_value(*p, "artifactId") == self.test_plugin)
        else {
            return;
        };

        let Some(configuration) = child_element(plugin, "configuration") else {
            return;
        };

        for item in configuration.children().filter(|c| c.is_element()) {
            let value = text_content(item);
            let value = value.trim();
            if !value.is_empty() {
                pom.test_configurations
                    .insert(item.tag_name().name().to_string(), value.to_string());
            }
        }
    }

    fn add_repository_urls(&self, doc: &PomDocument<'_>, pom: &mut Pom) {
        for node in doc.nodes("/project/repositories/repository/url") {
            let url = text_content(node).trim().to_string();
            if !url.is_empty() {
                pom.add_repository_url(&url);
            }
        }
        pom.add_repository_url(&self.central_url);
    }
}

fn degrade(path: &Path, raw: String, error: ExtractError) -> Extraction {
    warn!(path = %path.display(), error = %error, "Descriptor degraded to empty content");
    let mut pom = Pom::empty(path);
    pom.raw = raw;
    Extraction::Degraded { pom, error }
}

fn or_fallback(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn read_dependency(node: Node<'_, '_>) -> Dependency {
    let mut dependency = Dependency::default();
    for child in node.children().filter(|c| c.is_element()) {
        let value = text_content(child).trim().to_string();
        match child.tag_name().name() {
            "groupId" => dependency.group_id = value,
            "artifactId" => dependency.artifact_id = value,
            "version" => dependency.version = value,
            _ => {}
        }
    }
    dependency
}

fn is_self_referential(dependency: &Dependency) -> bool {
    dependency.group_id.contains(SELF_GROUP_TOKEN)
        || dependency.artifact_id.contains(SELF_ARTIFACT_TOKEN)
        || SELF_VERSION_TOKENS
            .iter()
            .any(|token| dependency.version.contains(*token))
}

/// Strips a byte-order mark and normalises line endings to `\n`.
fn canonicalize_text(text: &str) -> String {
    text.trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomtree_core::config::{DEFAULT_CENTRAL_URL, DEFAULT_TEST_PLUGIN};
    use pomtree_core::MockFileSystem;

    fn extractor() -> PomExtractor {
        PomExtractor {
            central_url: DEFAULT_CENTRAL_URL.to_string(),
            test_plugin: DEFAULT_TEST_PLUGIN.to_string(),
            max_file_size: 4096,
        }
    }

    fn extract(xml: &str) -> Pom {
        let extraction = extractor().extract_str(Path::new("/repo/pom.xml"), xml);
        assert!(!extraction.is_degraded(), "{:?}", extraction.error());
        extraction.into_pom()
    }

    #[test]
    fn test_coordinates_and_packaging() {
        let pom = extract(
            r#"<project>
                <groupId>org.acme</groupId>
                <artifactId>root</artifactId>
                <version>1.0</version>
                <packaging>pom</packaging>
            </project>"#,
        );

        assert_eq!(pom.identity(), ("org.acme", "root"));
        assert_eq!(pom.version(), "1.0");
        assert!(pom.is_aggregator());
        assert!(!pom.has_parent());
    }

    #[test]
    fn test_coordinates_fall_back_to_parent_block() {
        let pom = extract(
            r#"<project>
                <parent>
                    <groupId>org.acme</groupId>
                    <artifactId>root</artifactId>
                    <version>2.1</version>
                </parent>
                <artifactId>core</artifactId>
            </project>"#,
        );

        assert_eq!(pom.group_id(), "org.acme");
        assert_eq!(pom.artifact_id(), "core");
        assert_eq!(pom.version(), "2.1");
        assert!(pom.has_parent());
        assert_eq!(pom.parent_identity(), ("org.acme", "root"));
    }

    #[test]
    fn test_properties_and_modules() {
        let pom = extract(
            r#"<project>
                <groupId>g</groupId><artifactId>a</artifactId>
                <properties>
                    <rev>1.2</rev>
                    <cuda.version>9.1</cuda.version>
                    <backend>nd4j-cuda-${cuda.version}</backend>
                </properties>
                <modules><module>core</module><module> </module><module>api</module></modules>
            </project>"#,
        );

        assert_eq!(pom.raw_property("rev"), Some("1.2"));
        assert_eq!(pom.raw_property("backend"), Some("nd4j-cuda-${cuda.version}"));
        assert_eq!(pom.raw_properties().len(), 3);
        assert_eq!(pom.modules(), ["core", "api"]);
    }

    #[test]
    fn test_dependencies_from_both_sections_in_document_order() {
        let pom = extract(
            r#"<project>
                <groupId>g</groupId><artifactId>a</artifactId>
                <dependencyManagement>
                    <dependencies>
                        <dependency>
                            <groupId>org.junit</groupId>
                            <artifactId>junit-bom</artifactId>
                            <version>5.10.0</version>
                            <type>pom</type>
                        </dependency>
                    </dependencies>
                </dependencyManagement>
                <dependencies>
                    <dependency>
                        <groupId>org.slf4j</groupId>
                        <artifactId>slf4j-api</artifactId>
                        <version>${slf4j.version}</version>
                    </dependency>
                    <dependency>
                        <groupId>org.slf4j</groupId>
                        <artifactId>slf4j-api</artifactId>
                    </dependency>
                </dependencies>
            </project>"#,
        );

        let deps = pom.raw_dependencies();
        assert_eq!(deps.len(), 3);
        assert_eq!(deps[0].artifact_id, "junit-bom");
        assert_eq!(deps[1].version, "${slf4j.version}");
        assert_eq!(deps[2].version, "");
    }

    #[test]
    fn test_self_referential_dependencies_rejected() {
        let pom = extract(
            r#"<project>
                <groupId>g</groupId><artifactId>a</artifactId>
                <dependencies>
                    <dependency><groupId>${project.groupId}</groupId><artifactId>x</artifactId><version>1</version></dependency>
                    <dependency><groupId>g</groupId><artifactId>${project.artifactId}-api</artifactId><version>1</version></dependency>
                    <dependency><groupId>g</groupId><artifactId>y</artifactId><version>${project.version}</version></dependency>
                    <dependency><groupId>g</groupId><artifactId>z</artifactId><version>${project.parent.version}</version></dependency>
                    <dependency><groupId>g</groupId><artifactId>kept</artifactId><version>${rev}</version></dependency>
                </dependencies>
            </project>"#,
        );

        assert_eq!(pom.raw_dependencies().len(), 1);
        assert_eq!(pom.raw_dependencies()[0].artifact_id, "kept");
    }

    #[test]
    fn test_self_reference_tokens_only_checked_in_their_own_field() {
        let pom = extract(
            r#"<project>
                <groupId>g</groupId><artifactId>a</artifactId>
                <dependencies>
                    <dependency><groupId>g</groupId><artifactId>rev-pinned</artifactId><version>${project.groupId.rev}</version></dependency>
                    <dependency><groupId>g</groupId><artifactId>${project.version}-tools</artifactId><version>1</version></dependency>
                    <dependency><groupId>${project.artifactId}</groupId><artifactId>b</artifactId><version>1</version></dependency>
                </dependencies>
            </project>"#,
        );

        let kept: Vec<&str> = pom
            .raw_dependencies()
            .iter()
            .map(|d| d.artifact_id.as_str())
            .collect();
        assert_eq!(kept, vec!["rev-pinned", "${project.version}-tools", "b"]);
    }

    #[test]
    fn test_every_managed_dependency_block_is_read() {
        let pom = extract(
            r#"<project>
                <groupId>g</groupId><artifactId>a</artifactId>
                <dependencyManagement>
                    <dependencies>
                        <dependency><groupId>org.x</groupId><artifactId>first</artifactId><version>1</version></dependency>
                    </dependencies>
                    <dependencies>
                        <dependency><groupId>org.x</groupId><artifactId>second</artifactId><version>2</version></dependency>
                    </dependencies>
                </dependencyManagement>
            </project>"#,
        );

        let managed: Vec<&str> = pom
            .raw_dependencies()
            .iter()
            .map(|d| d.artifact_id.as_str())
            .collect();
        assert_eq!(managed, vec!["first", "second"]);
    }

    #[test]
    fn test_test_runner_configuration() {
        let pom = extract(
            r#"<project>
                <groupId>g</groupId><artifactId>a</artifactId>
                <build><plugins>
                    <plugin>
                        <artifactId>maven-compiler-plugin</artifactId>
                        <configuration><release>17</release></configuration>
                    </plugin>
                    <plugin>
                        <groupId>org.apache.maven.plugins</groupId>
                        <artifactId>maven-surefire-plugin</artifactId>
                        <configuration>
                            <forkCount> 2 </forkCount>
                            <skipTests></skipTests>
                            <includes><include>**/*Test.java</include></includes>
                        </configuration>
                    </plugin>
                </plugins></build>
            </project>"#,
        );

        let config = pom.test_configurations();
        assert_eq!(config.len(), 2);
        assert_eq!(config.get("forkCount").map(String::as_str), Some("2"));
        assert_eq!(
            config.get("includes").map(String::as_str),
            Some("**/*Test.java")
        );
        assert!(!config.contains_key("release"));
    }

    #[test]
    fn test_missing_test_runner_leaves_configuration_empty() {
        let pom = extract(
            r#"<project><groupId>g</groupId><artifactId>a</artifactId>
                <build><plugins><plugin><artifactId>maven-surefire-plugin</artifactId></plugin></plugins></build>
            </project>"#,
        );
        assert!(pom.test_configurations().is_empty());
    }

    #[test]
    fn test_repository_urls_end_with_central() {
        let pom = extract(
            r#"<project><groupId>g</groupId><artifactId>a</artifactId>
                <repositories>
                    <repository><id>acme</id><url>https://repo.acme.org/maven</url></repository>
                    <repository><id>central</id><url>https://repo1.maven.org/maven2</url></repository>
                </repositories>
            </project>"#,
        );

        assert_eq!(
            pom.repository_urls(),
            ["https://repo.acme.org/maven/", DEFAULT_CENTRAL_URL]
        );
    }

    #[test]
    fn test_no_repositories_yields_only_central() {
        let pom = extract("<project><groupId>g</groupId><artifactId>a</artifactId></project>");
        assert_eq!(pom.repository_urls(), [DEFAULT_CENTRAL_URL]);
    }

    #[test]
    fn test_raw_text_is_canonicalised() {
        let pom = extract("\u{feff}<project>\r\n<groupId>g</groupId>\r\n</project>");
        assert_eq!(pom.raw(), "<project>\n<groupId>g</groupId>\n</project>");
    }

    #[test]
    fn test_malformed_document_degrades() {
        let extraction =
            extractor().extract_str(Path::new("/repo/pom.xml"), "<project><groupId>g</project>");

        assert!(extraction.is_degraded());
        assert!(matches!(extraction.error(), Some(ExtractError::Parse(_))));
        let pom = extraction.into_pom();
        assert!(pom.is_empty());
        assert_eq!(pom.packaging(), "");
        assert!(pom.repository_urls().is_empty());
    }

    #[test]
    fn test_foreign_root_degrades() {
        let extraction = extractor().extract_str(Path::new("/repo/pom.xml"), "<settings/>");
        assert_eq!(
            extraction.error(),
            Some(&ExtractError::UnexpectedRoot("settings".to_string()))
        );
    }

    #[test]
    fn test_extract_file_missing_and_oversized() {
        let fs = MockFileSystem::new();
        fs.add_file("big/pom.xml", &"x".repeat(5000));

        let missing = extractor().extract_file(&fs, Path::new("/mock/none/pom.xml"));
        assert!(matches!(missing.error(), Some(ExtractError::Read { .. })));

        let big = extractor().extract_file(&fs, Path::new("/mock/big/pom.xml"));
        assert!(matches!(
            big.error(),
            Some(ExtractError::TooLarge { size: 5000, .. })
        ));
    }
}
