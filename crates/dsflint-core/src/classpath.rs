//! Class lookup across the plugin's resource tree
//!
//! Service and listener rules need to know whether a declared class ships
//! with the plugin and what it extends or implements. The index resolves
//! binary class names against the conventional class roots of archives and
//! exploded projects and follows declared super-type chains through classes
//! available in the same tree. Parsed classes are cached; the cache supports
//! concurrent get-or-create with single initialisation per name.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::classfile::ClassFile;
use crate::provider::ResourceProvider;

/// Conventional roots under which compiled classes live, in search order
pub const CLASS_ROOTS: [&str; 3] = ["", "target/classes/", "build/classes/java/main/"];

/// Name-keyed access to the plugin's class files
pub struct ClassIndex<'a> {
    provider: &'a dyn ResourceProvider,
    cache: DashMap<String, Option<Arc<ClassFile>>>,
}

impl<'a> ClassIndex<'a> {
    pub fn new(provider: &'a dyn ResourceProvider) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
        }
    }

    /// Entry path of a class, if it exists under any class root
    pub fn find_entry(&self, binary_name: &str) -> Option<String> {
        let relative = format!("{}.class", binary_name.replace('.', "/"));
        CLASS_ROOTS
            .iter()
            .map(|root| format!("{root}{relative}"))
            .find(|candidate| self.provider.exists(candidate))
    }

    pub fn contains(&self, binary_name: &str) -> bool {
        self.load(binary_name).is_some()
    }

    /// Load and parse a class by binary name; results are cached
    pub fn load(&self, binary_name: &str) -> Option<Arc<ClassFile>> {
        self.cache
            .entry(binary_name.to_string())
            .or_insert_with(|| {
                let entry = self.find_entry(binary_name)?;
                let bytes = self.provider.open(&entry).ok()?;
                match ClassFile::parse(&entry, &bytes) {
                    Ok(class) => Some(Arc::new(class)),
                    Err(err) => {
                        debug!(%binary_name, %err, "class entry unparsable");
                        None
                    }
                }
            })
            .clone()
    }

    /// Whether the class's declared super-type chain reaches one of the
    /// target type names
    ///
    /// The walk follows super classes and interfaces transitively through
    /// classes available in the index. Types absent from the tree (API or
    /// JDK classes) terminate their branch; they still count when their
    /// name itself is a target.
    pub fn reaches(&self, class: &ClassFile, targets: &[&str]) -> bool {
        let mut queue: Vec<String> = class.super_types().map(str::to_string).collect();
        let mut seen = std::collections::HashSet::new();
        while let Some(name) = queue.pop() {
            if targets.contains(&name.as_str()) {
                return true;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(super_class) = self.load(&name) {
                queue.extend(super_class.super_types().map(str::to_string));
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DirProvider;
    use crate::test_helpers::ClassFileBuilder;
    use std::fs;

    #[test]
    fn finds_classes_under_conventional_roots() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("target/classes/org/example");
        fs::create_dir_all(&root).unwrap();
        fs::write(
            root.join("Service.class"),
            ClassFileBuilder::new("org.example.Service").build(),
        )
        .unwrap();

        let provider = DirProvider::new(dir.path());
        let index = ClassIndex::new(&provider);
        assert_eq!(
            index.find_entry("org.example.Service").unwrap(),
            "target/classes/org/example/Service.class"
        );
        assert!(index.contains("org.example.Service"));
        assert!(!index.contains("org.example.Absent"));
    }

    #[test]
    fn reaches_walks_transitive_super_types() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("org/example");
        fs::create_dir_all(&root).unwrap();
        fs::write(
            root.join("Base.class"),
            ClassFileBuilder::new("org.example.Base")
                .interface("org.camunda.bpm.engine.delegate.JavaDelegate")
                .build(),
        )
        .unwrap();
        fs::write(
            root.join("Impl.class"),
            ClassFileBuilder::new("org.example.Impl")
                .super_class("org.example.Base")
                .build(),
        )
        .unwrap();

        let provider = DirProvider::new(dir.path());
        let index = ClassIndex::new(&provider);
        let class = index.load("org.example.Impl").unwrap();
        assert!(index.reaches(&class, &["org.camunda.bpm.engine.delegate.JavaDelegate"]));
        assert!(!index.reaches(&class, &["dev.dsf.bpe.v2.activity.ServiceTask"]));
    }
}
