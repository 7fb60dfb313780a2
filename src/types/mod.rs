pub mod error;
pub mod model;

pub use error::{ErrorCategory, ErrorClassifier, ForgeError, LlmError, Result};
pub use model::{ClassInfo, ClassKind, MethodInfo};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;
use std::path::PathBuf;

use crate::constants::prompt::{TEST_NAME_SEPARATOR, TEST_NAME_SUFFIX};

/// Name of a generated test class, qualified by the package of the class under test
///
/// The fully-qualified form is unique per job and keys every path the job
/// writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestName {
    package: String,
    name: String,
}

impl TestName {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Derive the test name for `method` of `class`.
    ///
    /// Tokens are `[class, method, (id when overloaded), "Test"]`. When that
    /// still equals the name derived for a sibling method (`add` overload 3
    /// against a method called `add_3`), the id is appended once more.
    pub fn derive(class: &ClassInfo, method: &MethodInfo) -> Self {
        let base = base_name(class, method);
        let collides = class
            .methods
            .iter()
            .any(|other| other.id != method.id && base_name(class, other) == base);

        let name = if collides {
            [
                class.class_name.as_str(),
                base_middle(class, method).as_str(),
                method.id.as_str(),
                TEST_NAME_SUFFIX,
            ]
            .join(TEST_NAME_SEPARATOR)
        } else {
            base
        };
        Self::new(&class.package, name)
    }

    /// Simple class name of the test
    pub fn simple(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Package-qualified name; the bare name for the default package
    pub fn full_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    /// Source path relative to a test source root
    pub fn source_path(&self) -> PathBuf {
        let mut path: PathBuf = self.package.split('.').filter(|s| !s.is_empty()).collect();
        path.push(format!("{}.java", self.name));
        path
    }
}

/// Method part of the name: the method name, plus the id for overloads
fn base_middle(class: &ClassInfo, method: &MethodInfo) -> String {
    if class.is_overloaded(&method.name) {
        format!("{}{}{}", method.name, TEST_NAME_SEPARATOR, method.id)
    } else {
        method.name.clone()
    }
}

fn base_name(class: &ClassInfo, method: &MethodInfo) -> String {
    [
        class.class_name.as_str(),
        base_middle(class, method).as_str(),
        TEST_NAME_SUFFIX,
    ]
    .join(TEST_NAME_SEPARATOR)
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

#[cfg(test)]
mod newtype_tests {
    use super::model::fixtures::{calc, method};
    use super::*;

    #[test]
    fn test_test_name_for_unique_method() {
        let calc = calc();
        let name = TestName::derive(&calc, &calc.methods[0]);
        assert_eq!(name.simple(), "Calc_add_Test");
        assert_eq!(name.full_name(), "com.x.Calc_add_Test");
        assert_eq!(
            name.source_path(),
            PathBuf::from("com/x/Calc_add_Test.java")
        );
    }

    #[test]
    fn test_test_name_for_overloads_is_unique() {
        let mut calc = calc();
        calc.methods.push(method("Calc", "add", "4"));

        let first = TestName::derive(&calc, &calc.methods[0]);
        let second = TestName::derive(&calc, &calc.methods[1]);
        assert_eq!(first.simple(), "Calc_add_3_Test");
        assert_eq!(second.simple(), "Calc_add_4_Test");
        assert_ne!(first, second);
    }

    #[test]
    fn test_test_name_overload_against_suffixed_sibling() {
        let mut calc = calc();
        calc.methods.push(method("Calc", "add", "4"));
        calc.methods.push(method("Calc", "add_3", "7"));

        let names: Vec<String> = calc
            .methods
            .iter()
            .map(|m| TestName::derive(&calc, m).simple().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["Calc_add_3_3_Test", "Calc_add_4_Test", "Calc_add_3_7_Test"]
        );
    }

    #[test]
    fn test_test_name_default_package() {
        let name = TestName::new("", "Calc_add_Test");
        assert_eq!(name.full_name(), "Calc_add_Test");
        assert_eq!(name.to_string(), "Calc_add_Test");
        assert_eq!(name.source_path(), PathBuf::from("Calc_add_Test.java"));
    }
}
