//! The runtime core library module.
//!
//! Single source of truth for the host types scripts can call: adding a
//! member means adding ONE entry here; binding and the `references` CLI
//! listing both read from this table.

use std::path::PathBuf;

use super::{HostMember, HostModule, HostType, MemberKind};
use crate::compilation::types::TypeRef;

pub const MODULE_NAME: &str = "System.Runtime";

/// The core library, located at the running executable.
pub fn module() -> HostModule {
    module_at(std::env::current_exe())
}

fn module_at(location: std::io::Result<PathBuf>) -> HostModule {
    let module = HostModule::new(MODULE_NAME, TYPES);
    match location {
        Ok(path) => module.with_location(path),
        Err(e) => {
            tracing::warn!(
                module = MODULE_NAME,
                error = %e,
                "core library has no location and will not be referenced"
            );
            module
        }
    }
}

pub fn find(full_name: &str) -> Option<&'static HostType> {
    TYPES.iter().find(|t| t.full_name == full_name)
}

const fn instance(name: &'static str, params: &'static [TypeRef], ty: TypeRef) -> HostMember {
    HostMember { name, kind: MemberKind::Method, is_static: false, params, variadic: false, ty }
}

const fn stat(name: &'static str, params: &'static [TypeRef], ty: TypeRef) -> HostMember {
    HostMember { name, kind: MemberKind::Method, is_static: true, params, variadic: false, ty }
}

/// Static method taking `params` followed by any number of objects.
const fn stat_params(name: &'static str, params: &'static [TypeRef], ty: TypeRef) -> HostMember {
    HostMember { name, kind: MemberKind::Method, is_static: true, params, variadic: true, ty }
}

const fn instance_params(name: &'static str, params: &'static [TypeRef], ty: TypeRef) -> HostMember {
    HostMember { name, kind: MemberKind::Method, is_static: false, params, variadic: true, ty }
}

const fn property(name: &'static str, is_static: bool, ty: TypeRef) -> HostMember {
    HostMember { name, kind: MemberKind::Property, is_static, params: &[], variadic: false, ty }
}

const fn field(name: &'static str, ty: TypeRef) -> HostMember {
    HostMember { name, kind: MemberKind::Field, is_static: true, params: &[], variadic: false, ty }
}

const fn ctor(params: &'static [TypeRef]) -> HostMember {
    HostMember { name: ".ctor", kind: MemberKind::Constructor, is_static: false, params, variadic: false, ty: TypeRef::Void }
}

const TEXT_WRITER: TypeRef = TypeRef::Host("System.IO.TextWriter");
const STRING_BUILDER: TypeRef = TypeRef::Host("System.Text.StringBuilder");

pub static TYPES: &[HostType] = &[
    // ── Primitives ──────────────────────────────────────────────
    HostType {
        full_name: "System.Object",
        base: None,
        members: &[
            instance("ToString", &[], TypeRef::String),
            instance("Equals", &[TypeRef::Object], TypeRef::Bool),
            instance("GetHashCode", &[], TypeRef::Int),
            ctor(&[]),
        ],
    },
    HostType {
        full_name: "System.String",
        base: Some("System.Object"),
        members: &[
            property("Length", false, TypeRef::Int),
            instance("ToUpper", &[], TypeRef::String),
            instance("ToLower", &[], TypeRef::String),
            instance("Trim", &[], TypeRef::String),
            instance("Contains", &[TypeRef::String], TypeRef::Bool),
            instance("StartsWith", &[TypeRef::String], TypeRef::Bool),
            instance("EndsWith", &[TypeRef::String], TypeRef::Bool),
            instance("IndexOf", &[TypeRef::String], TypeRef::Int),
            instance("Substring", &[TypeRef::Int], TypeRef::String),
            instance("Substring", &[TypeRef::Int, TypeRef::Int], TypeRef::String),
            instance("Replace", &[TypeRef::String, TypeRef::String], TypeRef::String),
            stat("IsNullOrEmpty", &[TypeRef::String], TypeRef::Bool),
            stat_params("Concat", &[], TypeRef::String),
            stat_params("Format", &[TypeRef::String], TypeRef::String),
            stat_params("Join", &[TypeRef::String], TypeRef::String),
            field("Empty", TypeRef::String),
        ],
    },
    HostType {
        full_name: "System.Int32",
        base: Some("System.Object"),
        members: &[
            stat("Parse", &[TypeRef::String], TypeRef::Int),
            field("MaxValue", TypeRef::Int),
            field("MinValue", TypeRef::Int),
        ],
    },
    HostType {
        full_name: "System.Int64",
        base: Some("System.Object"),
        members: &[
            stat("Parse", &[TypeRef::String], TypeRef::Long),
            field("MaxValue", TypeRef::Long),
            field("MinValue", TypeRef::Long),
        ],
    },
    HostType {
        full_name: "System.Double",
        base: Some("System.Object"),
        members: &[
            stat("Parse", &[TypeRef::String], TypeRef::Double),
            stat("IsNaN", &[TypeRef::Double], TypeRef::Bool),
            field("NaN", TypeRef::Double),
        ],
    },
    HostType {
        full_name: "System.Boolean",
        base: Some("System.Object"),
        members: &[stat("Parse", &[TypeRef::String], TypeRef::Bool)],
    },
    HostType {
        full_name: "System.Char",
        base: Some("System.Object"),
        members: &[
            stat("IsDigit", &[TypeRef::Char], TypeRef::Bool),
            stat("IsLetter", &[TypeRef::Char], TypeRef::Bool),
            stat("IsWhiteSpace", &[TypeRef::Char], TypeRef::Bool),
        ],
    },
    // ── System ──────────────────────────────────────────────────
    HostType {
        full_name: "System.Console",
        base: Some("System.Object"),
        members: &[
            stat("Write", &[TypeRef::Object], TypeRef::Void),
            stat_params("Write", &[TypeRef::String], TypeRef::Void),
            stat("WriteLine", &[], TypeRef::Void),
            stat("WriteLine", &[TypeRef::Object], TypeRef::Void),
            stat_params("WriteLine", &[TypeRef::String], TypeRef::Void),
            stat("ReadLine", &[], TypeRef::String),
            property("Out", true, TEXT_WRITER),
        ],
    },
    HostType {
        full_name: "System.Math",
        base: Some("System.Object"),
        members: &[
            stat("Abs", &[TypeRef::Double], TypeRef::Double),
            stat("Sqrt", &[TypeRef::Double], TypeRef::Double),
            stat("Floor", &[TypeRef::Double], TypeRef::Double),
            stat("Ceiling", &[TypeRef::Double], TypeRef::Double),
            stat("Round", &[TypeRef::Double], TypeRef::Double),
            stat("Pow", &[TypeRef::Double, TypeRef::Double], TypeRef::Double),
            stat("Max", &[TypeRef::Double, TypeRef::Double], TypeRef::Double),
            stat("Min", &[TypeRef::Double, TypeRef::Double], TypeRef::Double),
            field("PI", TypeRef::Double),
            field("E", TypeRef::Double),
        ],
    },
    HostType {
        full_name: "System.Convert",
        base: Some("System.Object"),
        members: &[
            stat("ToInt32", &[TypeRef::Object], TypeRef::Int),
            stat("ToInt64", &[TypeRef::Object], TypeRef::Long),
            stat("ToDouble", &[TypeRef::Object], TypeRef::Double),
            stat("ToBoolean", &[TypeRef::Object], TypeRef::Bool),
            stat("ToString", &[TypeRef::Object], TypeRef::String),
        ],
    },
    HostType {
        full_name: "System.Environment",
        base: Some("System.Object"),
        members: &[
            property("NewLine", true, TypeRef::String),
            property("TickCount", true, TypeRef::Int),
            property("MachineName", true, TypeRef::String),
        ],
    },
    // ── System.IO ───────────────────────────────────────────────
    HostType {
        full_name: "System.IO.TextWriter",
        base: Some("System.Object"),
        members: &[
            instance("Write", &[TypeRef::Object], TypeRef::Void),
            instance_params("Write", &[TypeRef::String], TypeRef::Void),
            instance("WriteLine", &[], TypeRef::Void),
            instance("WriteLine", &[TypeRef::Object], TypeRef::Void),
            instance_params("WriteLine", &[TypeRef::String], TypeRef::Void),
            instance("Flush", &[], TypeRef::Void),
        ],
    },
    HostType {
        full_name: "System.IO.StringWriter",
        base: Some("System.IO.TextWriter"),
        members: &[ctor(&[])],
    },
    // ── System.Text ─────────────────────────────────────────────
    HostType {
        full_name: "System.Text.StringBuilder",
        base: Some("System.Object"),
        members: &[
            ctor(&[]),
            ctor(&[TypeRef::String]),
            instance("Append", &[TypeRef::Object], STRING_BUILDER),
            instance("AppendLine", &[], STRING_BUILDER),
            instance("AppendLine", &[TypeRef::String], STRING_BUILDER),
            instance("Clear", &[], STRING_BUILDER),
            property("Length", false, TypeRef::Int),
        ],
    },
];
