//! Prompt Construction
//!
//! Owns the per-job `PromptInfo` and renders it into role-tagged messages.
//!
//! ## Design
//!
//! - `set_context` is deterministic: identical inputs produce identical
//!   prompts (dependency briefs are sorted)
//! - Every `generate` resets the size estimate and sums one estimate per
//!   message, before any provider call
//! - A recorded failure switches the template to the repair variant

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::ai::{Message, PromptTemplates, TokenBudget};
use crate::constants::prompt::MAX_DEPENDENCY_BRIEFS;
use crate::index::SharedRepository;
use crate::types::{ClassInfo, ForgeError, MethodInfo, Result, TestName};
use crate::validation::{Stage, ValidationOutcome};

// =============================================================================
// Prompt Info
// =============================================================================

/// Mutable per-job aggregate; exactly one lives per job
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub class_info: Arc<ClassInfo>,
    pub method_info: MethodInfo,
    /// Rendered briefs of dependency classes, sorted by name
    pub dependency_briefs: Vec<String>,
    pub test_name: TestName,
    /// Latest failing candidate, set once validation has failed
    pub unit_test: Option<String>,
    pub failed_stage: Option<Stage>,
    pub diagnostics: Option<String>,
    pub round: u32,
}

impl PromptInfo {
    pub fn has_dependencies(&self) -> bool {
        !self.dependency_briefs.is_empty()
    }

    pub fn is_repair(&self) -> bool {
        self.unit_test.is_some()
    }
}

// =============================================================================
// Prompt Constructor
// =============================================================================

pub struct PromptConstructor {
    repository: SharedRepository,
    budget: TokenBudget,
    max_error_chars: usize,
    info: Option<PromptInfo>,
}

impl PromptConstructor {
    pub fn new(repository: SharedRepository, max_prompt_tokens: usize, max_error_chars: usize) -> Self {
        Self {
            repository,
            budget: TokenBudget::new(max_prompt_tokens),
            max_error_chars,
            info: None,
        }
    }

    /// Build a fresh PromptInfo for one method
    pub fn set_context(
        &mut self,
        class_info: Arc<ClassInfo>,
        method_info: &MethodInfo,
        include_dependencies: bool,
    ) {
        let dependency_briefs = if include_dependencies {
            self.dependency_briefs(&class_info, method_info)
        } else {
            Vec::new()
        };

        self.info = Some(PromptInfo {
            test_name: TestName::derive(&class_info, method_info),
            class_info,
            method_info: method_info.clone(),
            dependency_briefs,
            unit_test: None,
            failed_stage: None,
            diagnostics: None,
            round: 0,
        });
    }

    pub fn prompt_info(&self) -> Option<&PromptInfo> {
        self.info.as_ref()
    }

    pub fn test_name(&self) -> Option<&TestName> {
        self.info.as_ref().map(|i| &i.test_name)
    }

    /// Store a failing candidate so the next `generate` renders a repair prompt
    pub fn record_failure(&mut self, candidate: &str, outcome: &ValidationOutcome, round: u32) -> Result<()> {
        let max_error_chars = self.max_error_chars;
        let info = self.info.as_mut().ok_or(ForgeError::NotInitialized)?;
        info.unit_test = Some(candidate.to_string());
        info.failed_stage = outcome.failed_stage();
        info.diagnostics = outcome
            .diagnostics()
            .map(|d| truncate_chars(d, max_error_chars));
        info.round = round;
        Ok(())
    }

    /// Render the current PromptInfo and recompute the size estimate
    pub fn generate(&mut self) -> Result<Vec<Message>> {
        let info = self.info.as_ref().ok_or(ForgeError::NotInitialized)?;
        let messages = vec![
            Message::system(PromptTemplates::system()),
            Message::user(render_user_prompt(info)),
        ];

        let tokens = self
            .budget
            .recompute(messages.iter().map(|m| m.content.as_str()));
        debug!(
            "{}: prompt for round {} estimated at {} tokens",
            info.test_name, info.round, tokens
        );
        Ok(messages)
    }

    /// Strictly above the ceiling; equality still fits
    pub fn is_exceed_max_tokens(&self) -> bool {
        self.budget.is_exceeded()
    }

    pub fn token_count(&self) -> usize {
        self.budget.current()
    }

    pub fn max_prompt_tokens(&self) -> usize {
        self.budget.ceiling()
    }

    fn dependency_briefs(&self, class_info: &ClassInfo, method_info: &MethodInfo) -> Vec<String> {
        let source = if method_info.dependencies.is_empty() {
            &class_info.dependencies
        } else {
            &method_info.dependencies
        };
        let own = class_info.full_name();
        let names: BTreeSet<&String> = source.iter().filter(|d| **d != own).collect();

        names
            .into_iter()
            .filter_map(|fqn| match self.repository.class_info(fqn) {
                Ok(Some(dep)) => Some(class_brief(&dep)),
                Ok(None) => None,
                Err(e) => {
                    warn!("Skipping dependency {}: {}", fqn, e);
                    None
                }
            })
            .take(MAX_DEPENDENCY_BRIEFS)
            .collect()
    }
}

// =============================================================================
// Rendering
// =============================================================================

fn render_user_prompt(info: &PromptInfo) -> String {
    let class = &info.class_info;
    let method = &info.method_info;
    let test_name = info.test_name.simple();

    let mut builder = if info.is_repair() {
        PromptTemplates::repair(test_name, &method.signature)
    } else {
        PromptTemplates::unit_test(test_name, &method.signature)
    };

    builder = builder
        .context_item(
            "Package",
            if class.package.is_empty() {
                "(default)"
            } else {
                class.package.as_str()
            },
        )
        .context_item("Class", &class.class_name)
        .context_item("Method", &method.signature)
        .context_item("Test class", &info.test_name.full_name())
        .section("Class under test", "")
        .code("java", &class_skeleton(class))
        .section("Method under test", "")
        .code("java", &method.source);

    if info.has_dependencies() {
        builder = builder.section("Dependencies", "");
        for brief in &info.dependency_briefs {
            builder = builder.code("java", brief);
        }
    }

    if let Some(unit_test) = &info.unit_test {
        let stage = info
            .failed_stage
            .map(|s| s.to_string())
            .unwrap_or_else(|| "validation".to_string());
        builder = builder
            .section("Failing test", "")
            .code("java", unit_test)
            .section(
                &format!("Diagnostics ({} stage)", stage),
                info.diagnostics.as_deref().unwrap_or("(none)"),
            );
    }

    builder
        .text("Return the complete test class in a single ```java code block.")
        .build()
}

/// Class signature, fields, constructors and method signatures
fn class_skeleton(class: &ClassInfo) -> String {
    let mut out = String::new();
    for import in &class.imports {
        out.push_str(import.trim());
        out.push('\n');
    }
    if !class.imports.is_empty() {
        out.push('\n');
    }
    out.push_str(&skeleton_body(class, class.methods.iter().map(|m| m.signature.as_str())));
    out
}

/// Compact outline of a dependency class: public API only
fn class_brief(class: &ClassInfo) -> String {
    skeleton_body(class, class.public_method_signatures().into_iter())
}

fn skeleton_body<'a>(class: &ClassInfo, methods: impl Iterator<Item = &'a str>) -> String {
    let header = if class.signature.is_empty() {
        format!("{} {}", class.kind, class.class_name)
    } else {
        class.signature.trim().to_string()
    };

    let mut out = format!("{} {{\n", header);
    for field in &class.fields {
        out.push_str(&format!("    {}\n", field.trim()));
    }
    for ctor in &class.constructors {
        out.push_str(&format!("    {};\n", ctor.trim().trim_end_matches(';')));
    }
    for sig in methods {
        out.push_str(&format!("    {};\n", sig.trim().trim_end_matches(';')));
    }
    out.push('}');
    out
}

/// Keep at most `max` characters, on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}\n... (truncated)", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Role;
    use crate::index::InMemoryClassRepository;
    use crate::types::model::fixtures::calc;

    fn constructor_with(classes: Vec<ClassInfo>, ceiling: usize) -> PromptConstructor {
        PromptConstructor::new(Arc::new(InMemoryClassRepository::new(classes)), ceiling, 200)
    }

    fn helper_class() -> ClassInfo {
        ClassInfo {
            package: "com.x.util".to_string(),
            class_name: "Adder".to_string(),
            signature: "public class Adder".to_string(),
            methods: vec![MethodInfo {
                name: "plus".to_string(),
                signature: "public int plus(int a, int b)".to_string(),
                id: "0".to_string(),
                is_public: true,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_without_context_fails() {
        let mut constructor = constructor_with(vec![], 2600);
        let err = constructor.generate().unwrap_err();
        assert!(matches!(err, ForgeError::NotInitialized));
    }

    #[test]
    fn test_generate_renders_method_and_test_name() {
        let calc = calc();
        let mut constructor = constructor_with(vec![calc.clone()], 2600);
        constructor.set_context(Arc::new(calc.clone()), &calc.methods[0], false);

        let messages = constructor.generate().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("Calc_add_Test"));
        assert!(messages[1].content.contains("public int add(int a, int b)"));
        assert!(!messages[1].content.contains("Failing test"));
        assert_eq!(
            constructor.test_name().map(|t| t.full_name()),
            Some("com.x.Calc_add_Test".to_string())
        );
    }

    #[test]
    fn test_set_context_is_deterministic() {
        let mut calc = calc();
        calc.dependencies = vec!["com.x.util.Adder".to_string(), "java.util.List".to_string()];
        let classes = vec![calc.clone(), helper_class()];

        let render = || {
            let mut constructor = constructor_with(classes.clone(), 2600);
            constructor.set_context(Arc::new(calc.clone()), &calc.methods[0], true);
            constructor.generate().unwrap()
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_dependency_briefs_included_on_request() {
        let mut calc = calc();
        calc.dependencies = vec!["com.x.util.Adder".to_string()];
        let classes = vec![calc.clone(), helper_class()];

        let mut with_deps = constructor_with(classes.clone(), 2600);
        with_deps.set_context(Arc::new(calc.clone()), &calc.methods[0], true);
        assert!(with_deps.prompt_info().unwrap().has_dependencies());
        let messages = with_deps.generate().unwrap();
        assert!(messages[1].content.contains("public int plus(int a, int b);"));

        let mut without = constructor_with(classes, 2600);
        without.set_context(Arc::new(calc.clone()), &calc.methods[0], false);
        assert!(!without.prompt_info().unwrap().has_dependencies());
    }

    #[test]
    fn test_estimate_recomputed_not_accumulated() {
        let calc = calc();
        let mut constructor = constructor_with(vec![], 2600);
        constructor.set_context(Arc::new(calc.clone()), &calc.methods[0], false);

        constructor.generate().unwrap();
        let first = constructor.token_count();
        constructor.generate().unwrap();
        assert_eq!(constructor.token_count(), first);
        assert!(first > 0);
    }

    #[test]
    fn test_ceiling_comparison() {
        let calc = calc();
        let mut sizing = constructor_with(vec![], 100_000);
        sizing.set_context(Arc::new(calc.clone()), &calc.methods[0], false);
        sizing.generate().unwrap();
        let cost = sizing.token_count();

        let mut exact = constructor_with(vec![], cost);
        exact.set_context(Arc::new(calc.clone()), &calc.methods[0], false);
        exact.generate().unwrap();
        assert!(!exact.is_exceed_max_tokens());

        let mut under = constructor_with(vec![], cost - 1);
        under.set_context(Arc::new(calc.clone()), &calc.methods[0], false);
        under.generate().unwrap();
        assert!(under.is_exceed_max_tokens());
    }

    #[test]
    fn test_repair_variant_includes_failure() {
        let calc = calc();
        let mut constructor = constructor_with(vec![], 100_000);
        constructor.set_context(Arc::new(calc.clone()), &calc.methods[0], false);

        let long_error = "x".repeat(500);
        constructor
            .record_failure(
                "public class Calc_add_Test { /*broken*/ }",
                &ValidationOutcome::CompileFail {
                    diagnostics: long_error,
                },
                1,
            )
            .unwrap();

        let messages = constructor.generate().unwrap();
        let user = &messages[1].content;
        assert!(user.contains("Failing test"));
        assert!(user.contains("/*broken*/"));
        assert!(user.contains("Diagnostics (compile stage)"));
        assert!(user.contains("(truncated)"));
        assert!(!user.contains(&"x".repeat(201)));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 2), "hé\n... (truncated)");
    }
}
