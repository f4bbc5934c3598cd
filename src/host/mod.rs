//! Host modules: the binary modules a compiled script may link against.
//!
//! The process keeps one registry of loaded modules behind a read/write lock.
//! Compilations never hold on to it; each compile request takes a fresh
//! snapshot through a [`ModuleLister`].

pub mod corlib;

use std::path::PathBuf;
use std::sync::LazyLock;

use parking_lot::RwLock;
use serde::Serialize;

use crate::compilation::types::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MemberKind {
    Method,
    Field,
    Property,
    Constructor,
}

/// One member of a host type.
///
/// `ty` is the return type of a method and the value type of a field or
/// property. A `variadic` method accepts any number of extra arguments after
/// `params`.
#[derive(Debug)]
pub struct HostMember {
    pub name: &'static str,
    pub kind: MemberKind,
    pub is_static: bool,
    pub params: &'static [TypeRef],
    pub variadic: bool,
    pub ty: TypeRef,
}

#[derive(Debug)]
pub struct HostType {
    pub full_name: &'static str,
    pub base: Option<&'static str>,
    pub members: &'static [HostMember],
}

impl HostType {
    pub fn namespace(&self) -> &'static str {
        self.full_name.rsplit_once('.').map_or("", |(ns, _)| ns)
    }

    pub fn name(&self) -> &'static str {
        self.full_name.rsplit_once('.').map_or(self.full_name, |(_, n)| n)
    }

    pub fn members_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'static HostMember> + 'a {
        self.members.iter().filter(move |m| m.name == name && m.kind != MemberKind::Constructor)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &'static HostMember> {
        self.members.iter().filter(|m| m.kind == MemberKind::Constructor)
    }
}

/// A loaded binary module and the types it exports.
#[derive(Debug, Clone)]
pub struct HostModule {
    pub name: String,
    /// On-disk location; `None` for in-memory modules.
    pub location: Option<PathBuf>,
    /// Generated at runtime rather than loaded from disk.
    pub dynamic: bool,
    pub types: &'static [HostType],
}

impl HostModule {
    pub fn new(name: impl Into<String>, types: &'static [HostType]) -> Self {
        Self {
            name: name.into(),
            location: None,
            dynamic: false,
            types,
        }
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn into_dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    /// Static, with a resolvable on-disk location.
    pub fn is_referenceable(&self) -> bool {
        !self.dynamic
            && self
                .location
                .as_ref()
                .is_some_and(|path| !path.as_os_str().is_empty())
    }
}

/// Enumerates the modules currently available to the host.
pub trait ModuleLister: Send + Sync {
    fn loaded_modules(&self) -> Vec<HostModule>;
}

static REGISTRY: LazyLock<RwLock<Vec<HostModule>>> = LazyLock::new(|| RwLock::new(vec![corlib::module()]));

/// Add `module` to the process registry, replacing any module of the same name.
pub fn register_module(module: HostModule) {
    let mut modules = REGISTRY.write();
    if let Some(existing) = modules.iter_mut().find(|m| m.name == module.name) {
        *existing = module;
    } else {
        modules.push(module);
    }
}

/// The process-wide registry, seeded with the core library.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessModules;

impl ModuleLister for ProcessModules {
    fn loaded_modules(&self) -> Vec<HostModule> {
        REGISTRY.read().clone()
    }
}

/// A fixed module set.
#[derive(Debug, Clone, Default)]
pub struct FixedModules {
    modules: Vec<HostModule>,
}

impl FixedModules {
    pub fn new(modules: Vec<HostModule>) -> Self {
        Self { modules }
    }

    /// Just the core library.
    pub fn core() -> Self {
        Self::new(vec![corlib::module()])
    }
}

impl ModuleLister for FixedModules {
    fn loaded_modules(&self) -> Vec<HostModule> {
        self.modules.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    static NO_TYPES: &[HostType] = &[];

    #[test]
    fn referenceable_needs_location_and_static() {
        let on_disk = HostModule::new("A", NO_TYPES).with_location("/lib/a.dll");
        assert!(on_disk.is_referenceable());
        assert!(!HostModule::new("B", NO_TYPES).is_referenceable());
        assert!(!HostModule::new("C", NO_TYPES).with_location("").is_referenceable());
        assert!(!on_disk.into_dynamic().is_referenceable());
    }

    #[test]
    fn process_registry_seeded_with_core_library() {
        let modules = ProcessModules.loaded_modules();
        assert!(modules.iter().any(|m| m.name == corlib::MODULE_NAME));
    }

    #[test]
    fn register_replaces_by_name() {
        register_module(HostModule::new("Test.RegisterReplaces", NO_TYPES));
        register_module(HostModule::new("Test.RegisterReplaces", NO_TYPES).with_location("/tmp/x.dll"));
        let modules = ProcessModules.loaded_modules();
        let matching: Vec<_> = modules.iter().filter(|m| m.name == "Test.RegisterReplaces").collect();
        assert_eq!(matching.len(), 1);
        assert!(matching[0].location.is_some());
    }

    #[test]
    fn type_name_parts() {
        let ty = corlib::find("System.IO.StringWriter").unwrap();
        assert_eq!(ty.namespace(), "System.IO");
        assert_eq!(ty.name(), "StringWriter");
        assert_eq!(ty.base, Some("System.IO.TextWriter"));
    }
}
