//! Structural metadata for the classes and methods under test.
//!
//! Both types are produced once by the external structural extractor and
//! deserialized from its JSON output. The engine never mutates them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Class Kind
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl ClassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Record => "record",
            Self::Annotation => "annotation",
        }
    }
}

impl std::fmt::Display for ClassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Class Info
// =============================================================================

/// Per-class description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassInfo {
    /// Package name without the `package` keyword; empty for the default package
    pub package: String,
    pub class_name: String,
    /// Full import lines, e.g. `import java.util.List;`
    pub imports: Vec<String>,
    /// Method signature -> stable method id
    pub method_sigs: BTreeMap<String, String>,
    pub methods: Vec<MethodInfo>,
    /// Declaration line, e.g. `public class Calc extends Base`
    pub signature: String,
    pub kind: ClassKind,
    pub is_abstract: bool,
    pub constructors: Vec<String>,
    pub fields: Vec<String>,
    /// Fully-qualified names of classes this class depends on
    pub dependencies: Vec<String>,
}

impl ClassInfo {
    /// Fully-qualified class name
    pub fn full_name(&self) -> String {
        if self.package.is_empty() {
            self.class_name.clone()
        } else {
            format!("{}.{}", self.package, self.class_name)
        }
    }

    pub fn method_by_id(&self, id: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.id == id)
    }

    /// All overloads sharing `name`, in declaration order
    pub fn methods_named(&self, name: &str) -> Vec<&MethodInfo> {
        self.methods.iter().filter(|m| m.name == name).collect()
    }

    /// True when more than one method in this class carries `name`
    pub fn is_overloaded(&self, name: &str) -> bool {
        self.methods.iter().filter(|m| m.name == name).count() > 1
    }

    /// Public, non-constructor, non-accessor methods: the ones worth testing
    pub fn testable_methods(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods
            .iter()
            .filter(|m| m.is_public && !m.is_constructor && !m.is_accessor)
    }

    /// Whether whole-project mode should schedule this class at all
    pub fn is_eligible(&self) -> bool {
        if matches!(self.kind, ClassKind::Interface | ClassKind::Annotation) {
            return false;
        }
        if self.is_abstract {
            return false;
        }
        self.testable_methods().next().is_some()
    }

    /// Signatures of all public methods, sorted, for dependency briefs
    pub fn public_method_signatures(&self) -> Vec<&str> {
        let mut sigs: Vec<&str> = self
            .methods
            .iter()
            .filter(|m| m.is_public && !m.is_constructor)
            .map(|m| m.signature.as_str())
            .collect();
        sigs.sort_unstable();
        sigs
    }
}

// =============================================================================
// Method Info
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MethodInfo {
    pub name: String,
    /// Declaration signature, e.g. `public int add(int a, int b)`
    pub signature: String,
    /// Stable id within the owning class
    pub id: String,
    /// Simple name of the owning class
    pub class_name: String,
    pub source: String,
    pub is_public: bool,
    pub is_constructor: bool,
    /// Plain getter or setter
    pub is_accessor: bool,
    /// Fully-qualified names of classes referenced by the body
    pub dependencies: Vec<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn method(class: &str, name: &str, id: &str) -> MethodInfo {
        MethodInfo {
            name: name.to_string(),
            signature: format!("public int {}(int a, int b)", name),
            id: id.to_string(),
            class_name: class.to_string(),
            source: format!(
                "public int {}(int a, int b) {{\n    return a + b;\n}}",
                name
            ),
            is_public: true,
            ..Default::default()
        }
    }

    /// `com.x.Calc` with a single `add(int,int)` method, id "3"
    pub fn calc() -> ClassInfo {
        let add = method("Calc", "add", "3");
        ClassInfo {
            package: "com.x".to_string(),
            class_name: "Calc".to_string(),
            imports: vec!["import java.util.List;".to_string()],
            method_sigs: BTreeMap::from([(add.signature.clone(), add.id.clone())]),
            methods: vec![add],
            signature: "public class Calc".to_string(),
            constructors: vec!["public Calc()".to_string()],
            ..Default::default()
        }
    }
}
