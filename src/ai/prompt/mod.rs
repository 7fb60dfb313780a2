//! Prompt Builder System
//!
//! Standardized prompt construction for LLM interactions.
//!
//! ## Design Principles
//!
//! 1. **Role Definition**: Clear AI role for each task
//! 2. **Structured Objectives**: Numbered goals
//! 3. **Context Sections**: Ordered key-value facts
//! 4. **Focus Enforcement**: Keep the reply on the target method
//! 5. **Anti-Patterns**: Explicit bad examples
//!
//! Rendering is deterministic: the same builder calls always produce the same
//! text, so prompt size estimates are reproducible.

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Context with key-value pairs, in insertion order
    Context(Vec<(String, String)>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Code block with language
    Code { language: String, content: String },
    /// Focus enforcement with restrictions
    Focus {
        target: String,
        restrictions: Vec<String>,
    },
    /// Anti-patterns with good/bad examples
    AntiPatterns { bad: Vec<String>, good: Vec<String> },
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    /// Add objectives section
    pub fn objectives(mut self, objectives: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.into_iter().map(String::from).collect(),
        ));
        self
    }

    /// Add a context item; items share the first context section
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        let existing = self.sections.iter_mut().find_map(|section| match section {
            PromptSection::Context(items) => Some(items),
            _ => None,
        });
        match existing {
            Some(items) => items.push((key.to_string(), value.to_string())),
            None => self.sections.push(PromptSection::Context(vec![(
                key.to_string(),
                value.to_string(),
            )])),
        }
        self
    }

    /// Add text section
    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Add code block
    pub fn code(mut self, language: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Code {
            language: language.to_string(),
            content: content.to_string(),
        });
        self
    }

    /// Add focus enforcement section
    pub fn focus(mut self, target: &str, restrictions: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Focus {
            target: target.to_string(),
            restrictions: restrictions.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Add anti-patterns section
    pub fn anti_patterns(mut self, bad: Vec<&str>, good: Vec<&str>) -> Self {
        self.sections.push(PromptSection::AntiPatterns {
            bad: bad.into_iter().map(String::from).collect(),
            good: good.into_iter().map(String::from).collect(),
        });
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Context(items) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in items {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Code { language, content } => {
                    prompt.push_str(&format!("```{}\n", language));
                    prompt.push_str(&content);
                    prompt.push_str("\n```\n\n");
                }
                PromptSection::Focus {
                    target,
                    restrictions,
                } => {
                    prompt.push_str("<FOCUS>\n");
                    prompt.push_str(&format!("IMPORTANT: Focus EXCLUSIVELY on: {}\n", target));
                    for restriction in restrictions {
                        prompt.push_str(&format!("- {}\n", restriction));
                    }
                    prompt.push_str("</FOCUS>\n\n");
                }
                PromptSection::AntiPatterns { bad, good } => {
                    prompt.push_str("## ANTI-PATTERNS\n\n");
                    prompt.push_str("<what_not_to_do>\n");
                    for example in bad {
                        prompt.push_str(&format!("WRONG: {}\n", example));
                    }
                    prompt.push_str("</what_not_to_do>\n\n");
                    prompt.push_str("<what_to_do>\n");
                    for example in good {
                        prompt.push_str(&format!("CORRECT: {}\n", example));
                    }
                    prompt.push_str("</what_to_do>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Preset prompt templates for test synthesis
pub struct PromptTemplates;

impl PromptTemplates {
    /// System framing shared by every synthesis request
    pub fn system() -> String {
        PromptBuilder::new()
            .role(
                "Java developer",
                "writing JUnit 5 unit tests that compile and pass on the first run",
            )
            .anti_patterns(
                vec![
                    "Explaining the test in prose instead of returning code",
                    "Returning several classes or partial snippets",
                    "Calling private members of the class under test",
                ],
                vec![
                    "Return exactly one complete test class in a single ```java block",
                    "Use only the public API shown in the prompt",
                ],
            )
            .build()
    }

    /// Template for first-round generation of a test class
    pub fn unit_test(test_name: &str, method: &str) -> PromptBuilder {
        PromptBuilder::new()
            .objectives(vec![
                &format!("Write a JUnit 5 test class named {}", test_name),
                "Cover normal behavior, boundary values and error handling",
                "Give every test method at least one meaningful assertion",
                "Include the package declaration and all required imports",
            ])
            .focus(
                method,
                vec![
                    "Do NOT test other methods except as setup",
                    "Do NOT invent classes or methods that are not shown",
                ],
            )
    }

    /// Template for repairing a failing test class
    pub fn repair(test_name: &str, method: &str) -> PromptBuilder {
        PromptBuilder::new()
            .objectives(vec![
                &format!("Fix the test class {} so that it compiles and passes", test_name),
                "Keep the test intent; change only what the diagnostics require",
                "Return the complete corrected class",
            ])
            .focus(
                method,
                vec![
                    "Do NOT delete assertions merely to make the test pass",
                    "Do NOT rename the test class",
                ],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_prompt() {
        let prompt = PromptBuilder::new()
            .role("Java developer", "unit testing")
            .objectives(vec!["Write tests", "Cover edge cases"])
            .build();

        assert!(prompt.contains("<ROLE>"));
        assert!(prompt.contains("Java developer"));
        assert!(prompt.contains("<OBJECTIVES>"));
        assert!(prompt.contains("1. Write tests"));
        assert!(prompt.contains("2. Cover edge cases"));
    }

    #[test]
    fn test_focus_section() {
        let prompt = PromptBuilder::new()
            .focus("add(int, int)", vec!["Do NOT speculate", "Stay focused"])
            .build();

        assert!(prompt.contains("<FOCUS>"));
        assert!(prompt.contains("add(int, int)"));
        assert!(prompt.contains("Do NOT speculate"));
    }

    #[test]
    fn test_context_items_keep_insertion_order() {
        let prompt = PromptBuilder::new()
            .context_item("Package", "com.x")
            .context_item("Class", "Calc")
            .context_item("Method", "add")
            .build();

        let package = prompt.find("**Package**: com.x").unwrap();
        let class = prompt.find("**Class**: Calc").unwrap();
        let method = prompt.find("**Method**: add").unwrap();
        assert!(package < class && class < method);
        assert_eq!(prompt.matches("# Context").count(), 1);
    }

    #[test]
    fn test_build_is_deterministic() {
        let build = || {
            PromptTemplates::unit_test("Calc_add_Test", "add")
                .context_item("Class", "Calc")
                .code("java", "public int add(int a, int b) { return a + b; }")
                .build()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_templates() {
        let generate = PromptTemplates::unit_test("Calc_add_Test", "add").build();
        assert!(generate.contains("Calc_add_Test"));
        assert!(generate.contains("<FOCUS>"));

        let repair = PromptTemplates::repair("Calc_add_Test", "add").build();
        assert!(repair.contains("compiles and passes"));

        assert!(PromptTemplates::system().contains("```java"));
    }
}
