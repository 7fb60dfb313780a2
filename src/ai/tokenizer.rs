//! Token Counting and Budget Management
//!
//! Provides token estimation for prompt size control.
//!
//! ## Strategy
//! - Estimate every prompt before it is sent to the provider
//! - Sum one estimate per message; reset before each new prompt
//! - A prompt whose estimate is strictly above the ceiling is never sent

use tracing::debug;

/// Code-aware token estimator for Java-heavy prompts
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter;

impl TokenCounter {
    /// Estimate token count for a string
    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.count_code_aware(text)
    }

    /// Code-aware counting
    /// - Punctuation and operators are individual tokens
    /// - Identifiers cost roughly one token per four characters
    fn count_code_aware(&self, text: &str) -> usize {
        let mut tokens = 0;
        let mut word_len = 0;

        for ch in text.chars() {
            match ch {
                '(' | ')' | '{' | '}' | '[' | ']' | ';' | ':' | ',' | '.' | '+' | '-' | '*'
                | '/' | '=' | '<' | '>' | '!' | '&' | '|' | '@' | '#' | '$' | '%' | '^' | '~'
                | '?' | '\\' | '"' | '\'' => {
                    tokens += word_tokens(word_len);
                    word_len = 0;
                    tokens += 1;
                }
                c if c.is_whitespace() => {
                    tokens += word_tokens(word_len);
                    word_len = 0;
                }
                c => word_len += c.len_utf8(),
            }
        }
        tokens += word_tokens(word_len);

        tokens.max(1)
    }
}

fn word_tokens(len: usize) -> usize {
    match len {
        0 => 0,
        1..=4 => 1,
        5..=8 => 2,
        _ => len.div_ceil(4),
    }
}

// =============================================================================
// Token Budget
// =============================================================================

/// Running size estimate of one prompt, compared against a fixed ceiling
#[derive(Debug, Clone)]
pub struct TokenBudget {
    ceiling: usize,
    current: usize,
    counter: TokenCounter,
}

impl TokenBudget {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            current: 0,
            counter: TokenCounter,
        }
    }

    /// Estimate `text` without touching the running total
    pub fn estimate(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Add the estimate of `text` to the running total and return it
    pub fn add(&mut self, text: &str) -> usize {
        let tokens = self.counter.count(text);
        self.current += tokens;
        tokens
    }

    /// Replace the running total with the sum over `parts`
    pub fn recompute<'a>(&mut self, parts: impl IntoIterator<Item = &'a str>) -> usize {
        self.reset();
        for part in parts {
            self.add(part);
        }
        debug!("Prompt estimate: {}/{} tokens", self.current, self.ceiling);
        self.current
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Strictly above the ceiling; equality still fits
    pub fn is_exceeded(&self) -> bool {
        self.current > self.ceiling
    }

    pub fn remaining(&self) -> usize {
        self.ceiling.saturating_sub(self.current)
    }
}
