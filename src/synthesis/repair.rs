//! Repair
//!
//! Two tiers:
//!
//! - `rule_based_repair`: pure textual fixups applied to every candidate
//!   before it is validated. Never fails and is idempotent.
//! - `Repair::llm_based_repair`: one bounded round of validate, re-prompt
//!   and regenerate. The caller owns the round counter.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::generator::Generator;
use super::log::{RunEvent, SharedRunLog};
use super::prompt::PromptConstructor;
use crate::types::{ClassInfo, ForgeError, Result, TestName};
use crate::validation::{ValidationOutcome, Validator, parse_java};

// =============================================================================
// Rule-based repair
// =============================================================================

static PACKAGE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^package\s+[\w.]+\s*;$").expect("PACKAGE_LINE_RE regex should compile")
});

static IMPORT_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^import\s+(static\s+)?[\w.]+(\.\*)?\s*;$")
        .expect("IMPORT_LINE_RE regex should compile")
});

/// Declaration kinds that can appear directly under `program`
const TOP_LEVEL_TYPE_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

/// Unindented declarations; used when the parse tree has no usable root
static TOP_LEVEL_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^((?:(?:public|abstract|final|sealed|strictfp)\s+)*)(?:class|interface|enum|record)\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("TOP_LEVEL_DECL_RE regex should compile")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE regex should compile"));

/// Normalize a candidate so that its package, imports and declared type
/// name line up with the expected test.
///
/// Output layout is canonical (package, blank, imports, blank, body), which
/// makes a second application a no-op.
pub fn rule_based_repair(code: &str, test: &TestName, class: &ClassInfo) -> String {
    if code.trim().is_empty() {
        return code.to_string();
    }

    let mut imports: Vec<String> = Vec::new();
    let mut body_lines: Vec<&str> = Vec::new();
    for line in code.lines() {
        let trimmed = line.trim();
        if PACKAGE_LINE_RE.is_match(trimmed) {
            continue;
        }
        if IMPORT_LINE_RE.is_match(trimmed) {
            push_unique(&mut imports, normalize_import(trimmed));
            continue;
        }
        body_lines.push(line);
    }
    for import in &class.imports {
        let normalized = normalize_import(import);
        if IMPORT_LINE_RE.is_match(&normalized) {
            push_unique(&mut imports, normalized);
        }
    }

    let body = rename_test_type(body_lines.join("\n").trim(), test.simple(), &class.class_name);

    let mut out = String::new();
    if !test.package().is_empty() {
        out.push_str(&format!("package {};\n\n", test.package()));
    }
    if !imports.is_empty() {
        for import in &imports {
            out.push_str(import);
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str(body.trim());
    out.push('\n');
    out
}

fn normalize_import(line: &str) -> String {
    let line = line.trim();
    let line = if line.starts_with("import ") {
        line.to_string()
    } else {
        format!("import {}", line)
    };
    let line = WHITESPACE_RE.replace_all(&line, " ");
    let line = line.trim_end_matches(';').trim_end();
    format!("{};", line)
}

fn push_unique(imports: &mut Vec<String>, import: String) {
    if !imports.contains(&import) {
        imports.push(import);
    }
}

/// Rename the primary declared type to `expected`.
///
/// The primary type is the first public top-level declaration, or the first
/// top-level declaration when none is public. Nested types never qualify.
/// Every whole-word occurrence is renamed (constructors, self references)
/// unless the old name is the class under test, in which case only the
/// declaration itself changes.
fn rename_test_type(body: &str, expected: &str, class_under_test: &str) -> String {
    let Some((start, end)) = primary_type_name(body) else {
        return body.to_string();
    };
    let current = &body[start..end];
    if current == expected {
        return body.to_string();
    }

    debug!("Renaming test type {} -> {}", current, expected);
    if current == class_under_test {
        let mut renamed = String::with_capacity(body.len() + expected.len());
        renamed.push_str(&body[..start]);
        renamed.push_str(expected);
        renamed.push_str(&body[end..]);
        return renamed;
    }

    match Regex::new(&format!(r"\b{}\b", regex::escape(current))) {
        Ok(word) => word.replace_all(body, expected).into_owned(),
        Err(_) => body.to_string(),
    }
}

/// Byte range of the primary top-level type name in `body`
fn primary_type_name(body: &str) -> Option<(usize, usize)> {
    let mut declarations = parsed_declarations(body).unwrap_or_default();
    if declarations.is_empty() {
        declarations = TOP_LEVEL_DECL_RE
            .captures_iter(body)
            .filter_map(|c| {
                let name = c.get(2)?;
                let is_public = c.get(1).is_some_and(|m| m.as_str().contains("public"));
                Some((is_public, name.start(), name.end()))
            })
            .collect();
    }

    declarations
        .iter()
        .find(|(is_public, _, _)| *is_public)
        .or_else(|| declarations.first())
        .map(|&(_, start, end)| (start, end))
}

/// `(is_public, name_start, name_end)` for each direct child of `program`
fn parsed_declarations(body: &str) -> Option<Vec<(bool, usize, usize)>> {
    let tree = parse_java(body).ok()?;
    let root = tree.root_node();

    let mut declarations = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if !TOP_LEVEL_TYPE_KINDS.contains(&child.kind()) {
            continue;
        }
        let Some(name) = child.child_by_field_name("name") else {
            continue;
        };
        let mut inner = child.walk();
        let is_public = child
            .named_children(&mut inner)
            .filter(|c| c.kind() == "modifiers")
            .any(|m| {
                let mut tokens = m.walk();
                m.children(&mut tokens).any(|t| t.kind() == "public")
            });
        declarations.push((is_public, name.start_byte(), name.end_byte()));
    }
    Some(declarations)
}

// =============================================================================
// LLM-based repair
// =============================================================================

/// Result of one `llm_based_repair` call
#[derive(Debug, Clone, PartialEq)]
pub enum RepairStep {
    /// Input passed validation; returned unchanged, no provider call
    Passed { code: String },
    /// Input failed; the reply was rule-repaired into a new candidate
    Regenerated {
        code: String,
        outcome: ValidationOutcome,
    },
    /// Repair prompt above the ceiling; input returned unchanged
    BudgetExceeded {
        code: String,
        outcome: ValidationOutcome,
    },
    /// Reply had no code block; input returned unchanged
    ExtractionFailed {
        code: String,
        outcome: ValidationOutcome,
    },
}

impl RepairStep {
    pub fn code(&self) -> &str {
        match self {
            Self::Passed { code }
            | Self::Regenerated { code, .. }
            | Self::BudgetExceeded { code, .. }
            | Self::ExtractionFailed { code, .. } => code,
        }
    }

    /// Validation outcome of the input candidate
    pub fn outcome(&self) -> &ValidationOutcome {
        match self {
            Self::Passed { .. } => &ValidationOutcome::Pass,
            Self::Regenerated { outcome, .. }
            | Self::BudgetExceeded { outcome, .. }
            | Self::ExtractionFailed { outcome, .. } => outcome,
        }
    }
}

#[derive(Clone)]
pub struct Repair {
    validator: Validator,
    generator: Generator,
    log: SharedRunLog,
}

impl Repair {
    pub fn new(validator: Validator, generator: Generator, log: SharedRunLog) -> Self {
        Self {
            validator,
            generator,
            log,
        }
    }

    /// One repair round over `code`.
    ///
    /// Provider failures propagate unchanged; they are not retried here.
    pub async fn llm_based_repair(
        &self,
        constructor: &mut PromptConstructor,
        code: &str,
        round: u32,
    ) -> Result<RepairStep> {
        let info = constructor.prompt_info().ok_or(ForgeError::NotInitialized)?;
        let test = info.test_name.clone();
        let class = info.class_info.clone();
        let label = test.full_name();

        let outcome = self.validator.validate(code, &test).await?;
        self.log.record(RunEvent::Validated {
            test: label.clone(),
            round,
            failed_stage: outcome.failed_stage(),
        });
        if outcome.is_pass() {
            return Ok(RepairStep::Passed {
                code: code.to_string(),
            });
        }

        constructor.record_failure(code, &outcome, round)?;
        let messages = constructor.generate()?;
        if constructor.is_exceed_max_tokens() {
            self.log.record(RunEvent::PromptSkipped {
                test: label,
                round,
                tokens: constructor.token_count(),
                ceiling: constructor.max_prompt_tokens(),
            });
            return Ok(RepairStep::BudgetExceeded {
                code: code.to_string(),
                outcome,
            });
        }

        let generated = self.generator.generate(&messages).await?;
        if generated.is_empty() {
            self.log.record(RunEvent::ExtractionFailed { test: label, round });
            return Ok(RepairStep::ExtractionFailed {
                code: code.to_string(),
                outcome,
            });
        }

        self.log.record(RunEvent::Generated { test: label, round });
        Ok(RepairStep::Regenerated {
            code: rule_based_repair(&generated, &test, &class),
            outcome,
        })
    }
}
