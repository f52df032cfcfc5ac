//! Shell-syntax recipe parser.
//!
//! The grammar is the assignment/array/function subset of a PKGBUILD:
//! `KEY=VAL`, `KEY=(v1 v2 ...)`, `NAME() { ... }` and `#` comments. Nothing
//! is executed. Two passes over the file:
//!
//! 1. top-level assignments, evaluated with shell-style expansion against the
//!    process environment and previously recorded top-level variables;
//! 2. top-level function declarations, stored as raw bodies. Assignments
//!    inside function bodies never leak into pass 1; runtime-only names like
//!    `${srcdir}` must not be captured at parse time.

use crate::error::PackagingError;
use crate::recipe::directive::Directive;
use crate::recipe::expand::expand;
use crate::recipe::metadata::{BuildArch, DistroId};
use crate::recipe::Recipe;
use crate::Result;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::trace;

pub struct Parser {
    distro: DistroId,
    target_arch: BuildArch,
}

impl Parser {
    pub fn new(distro: DistroId, target_arch: BuildArch) -> Self {
        Self {
            distro,
            target_arch,
        }
    }

    pub fn parse_file(&self, path: &Path) -> Result<Recipe> {
        let text = fs::read_to_string(path)
            .map_err(|e| PackagingError::fs("reading recipe", path, e))?;
        self.parse_str(&text)
    }

    pub fn parse_str(&self, text: &str) -> Result<Recipe> {
        let mut recipe = Recipe::default();
        recipe.metadata.distro = self.distro.clone();

        let mut vars: HashMap<String, String> = HashMap::new();
        let mut functions: Vec<(String, String)> = Vec::new();
        let mut problems: Vec<String> = Vec::new();
        let mut scanner = Scanner::new(text);

        // pass 1: top-level assignments (function bodies are captured raw and
        // handled in pass 2 below)
        loop {
            scanner.skip_blank();
            let Some(c) = scanner.cur() else { break };

            if !(c.is_ascii_alphabetic() || c == '_') {
                return Err(PackagingError::Parse(format!(
                    "unexpected character `{}` on line {}",
                    c, scanner.line
                ))
                .into());
            }
            let name = scanner.read_name();

            match scanner.cur() {
                Some('=') => {
                    scanner.bump();
                    if scanner.cur() == Some('(') {
                        scanner.bump();
                        let values = scanner.read_array(&vars)?;
                        trace!(key = %name, entries = values.len(), "array assignment");
                        vars.insert(name.clone(), values.join(" "));
                        self.apply_array(&mut recipe, &name, values, &mut problems)?;
                    } else {
                        let value = scanner.read_word(&vars, false)?;
                        trace!(key = %name, "scalar assignment");
                        vars.insert(name.clone(), value.clone());
                        self.apply_scalar(&mut recipe, &name, value)?;
                    }
                }
                _ => {
                    scanner.skip_inline_ws();
                    if scanner.cur() != Some('(') {
                        return Err(PackagingError::Parse(format!(
                            "expected `=` or `()` after `{}` on line {}",
                            name, scanner.line
                        ))
                        .into());
                    }
                    scanner.bump();
                    scanner.skip_inline_ws();
                    if scanner.cur() != Some(')') {
                        return Err(PackagingError::Parse(format!(
                            "malformed function declaration `{}` on line {}",
                            name, scanner.line
                        ))
                        .into());
                    }
                    scanner.bump();
                    scanner.skip_blank();
                    if scanner.cur() != Some('{') {
                        return Err(PackagingError::Parse(format!(
                            "expected `{{` after `{}()` on line {}",
                            name, scanner.line
                        ))
                        .into());
                    }
                    scanner.bump();
                    let body = scanner.read_function_body(&name)?;
                    functions.push((name, body));
                }
            }
        }

        // pass 2: function bodies
        let mut fn_priorities: HashMap<String, i32> = HashMap::new();
        for (name, body) in functions {
            let directive = Directive::parse(&name)?;
            let priority = directive.priority(&self.distro, self.target_arch);
            if priority < 0 || !wins(&mut fn_priorities, directive.base, priority) {
                continue;
            }
            let slot = match directive.base {
                "prepare" => &mut recipe.functions.prepare,
                "build" => &mut recipe.functions.build,
                "package" => &mut recipe.functions.package,
                "preinst" => &mut recipe.scriptlets.pre_install,
                "postinst" => &mut recipe.scriptlets.post_install,
                "prerm" => &mut recipe.scriptlets.pre_remove,
                "postrm" => &mut recipe.scriptlets.post_remove,
                "pretrans" => &mut recipe.scriptlets.pre_trans,
                "posttrans" => &mut recipe.scriptlets.post_trans,
                // helper functions are legal in recipes, only the external
                // shell cares about them
                _ => continue,
            };
            *slot = body;
        }

        recipe.metadata.process_options();

        if !problems.is_empty() {
            return Err(PackagingError::Parse(problems.join("; ")).into());
        }

        Ok(recipe)
    }

    fn apply_scalar(&self, recipe: &mut Recipe, key: &str, value: String) -> Result<()> {
        let directive = Directive::parse(key)?;
        // pkgver and pkgrel are distribution-invariant
        if matches!(directive.base, "pkgver" | "pkgrel") && directive.distro_tag.is_some() {
            return Ok(());
        }
        let priority = directive.priority(&self.distro, self.target_arch);
        recipe.metadata.apply_scalar(directive.base, value, priority);
        Ok(())
    }

    fn apply_array(
        &self,
        recipe: &mut Recipe,
        key: &str,
        values: Vec<String>,
        problems: &mut Vec<String>,
    ) -> Result<()> {
        let directive = Directive::parse(key)?;
        if matches!(directive.base, "pkgver" | "pkgrel") && directive.distro_tag.is_some() {
            return Ok(());
        }
        let priority = directive.priority(&self.distro, self.target_arch);
        if let Err(e) = recipe.metadata.apply_array(directive.base, values, priority) {
            problems.push(e.to_string());
        }
        Ok(())
    }
}

fn wins(priorities: &mut HashMap<String, i32>, key: &str, priority: i32) -> bool {
    match priorities.get(key) {
        Some(&stored) if priority < stored => false,
        _ => {
            priorities.insert(key.to_string(), priority);
            true
        }
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn cur(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) {
        if self.cur() == Some('\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    /// Skips whitespace (including newlines) and `#` comments.
    fn skip_blank(&mut self) {
        while let Some(c) = self.cur() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.cur() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn skip_inline_ws(&mut self) {
        while matches!(self.cur(), Some(c) if c == ' ' || c == '\t') {
            self.bump();
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while matches!(self.cur(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Reads one (possibly quoted) word, expanding variables in unquoted and
    /// double-quoted segments. In array context `)` also terminates the word.
    fn read_word(&mut self, vars: &HashMap<String, String>, in_array: bool) -> Result<String> {
        let mut word = String::new();
        loop {
            match self.cur() {
                None => break,
                Some(c) if c.is_whitespace() => break,
                Some(')') if in_array => break,
                Some('\'') => {
                    self.bump();
                    loop {
                        match self.cur() {
                            Some('\'') => {
                                self.bump();
                                break;
                            }
                            Some(c) => {
                                word.push(c);
                                self.bump();
                            }
                            None => {
                                return Err(PackagingError::Parse(format!(
                                    "unterminated single quote on line {}",
                                    self.line
                                ))
                                .into())
                            }
                        }
                    }
                }
                Some('"') => {
                    self.bump();
                    let mut raw = String::new();
                    loop {
                        match self.cur() {
                            Some('"') => {
                                self.bump();
                                break;
                            }
                            Some('\\') => {
                                self.bump();
                                match self.cur() {
                                    Some(c @ ('"' | '\\' | '$' | '`')) => {
                                        raw.push(c);
                                        self.bump();
                                    }
                                    Some('\n') => self.bump(),
                                    Some(c) => {
                                        raw.push('\\');
                                        raw.push(c);
                                        self.bump();
                                    }
                                    None => {}
                                }
                            }
                            Some(c) => {
                                raw.push(c);
                                self.bump();
                            }
                            None => {
                                return Err(PackagingError::Parse(format!(
                                    "unterminated double quote on line {}",
                                    self.line
                                ))
                                .into())
                            }
                        }
                    }
                    word.push_str(&expand(&raw, vars));
                }
                Some('\\') => {
                    self.bump();
                    match self.cur() {
                        // backslash-newline joins lines
                        Some('\n') => self.bump(),
                        Some(c) => {
                            word.push(c);
                            self.bump();
                        }
                        None => {}
                    }
                }
                Some(_) => {
                    let start = self.pos;
                    while let Some(c) = self.cur() {
                        if c.is_whitespace()
                            || c == '\''
                            || c == '"'
                            || c == '\\'
                            || (in_array && c == ')')
                        {
                            break;
                        }
                        self.bump();
                    }
                    let raw: String = self.chars[start..self.pos].iter().collect();
                    word.push_str(&expand(&raw, vars));
                }
            }
        }
        Ok(word)
    }

    /// Reads array elements up to the closing parenthesis.
    fn read_array(&mut self, vars: &HashMap<String, String>) -> Result<Vec<String>> {
        let mut elements = Vec::new();
        loop {
            self.skip_blank();
            match self.cur() {
                None => {
                    return Err(PackagingError::Parse(format!(
                        "unterminated array on line {}",
                        self.line
                    ))
                    .into())
                }
                Some(')') => {
                    self.bump();
                    return Ok(elements);
                }
                Some(_) => elements.push(self.read_word(vars, true)?),
            }
        }
    }

    /// Captures a function body verbatim up to the matching closing brace.
    /// Nothing inside is evaluated.
    fn read_function_body(&mut self, name: &str) -> Result<String> {
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.cur() {
            match c {
                '\'' => {
                    self.bump();
                    while let Some(c) = self.cur() {
                        self.bump();
                        if c == '\'' {
                            break;
                        }
                    }
                }
                '"' => {
                    self.bump();
                    while let Some(c) = self.cur() {
                        self.bump();
                        if c == '\\' {
                            self.bump();
                        } else if c == '"' {
                            break;
                        }
                    }
                }
                '\\' => {
                    self.bump();
                    self.bump();
                }
                '#' => {
                    while let Some(c) = self.cur() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '{' => {
                    depth += 1;
                    self.bump();
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let body: String = self.chars[start..self.pos].iter().collect();
                        self.bump();
                        return Ok(body.trim_matches('\n').trim_end().to_string());
                    }
                    self.bump();
                }
                _ => self.bump(),
            }
        }
        Err(PackagingError::Parse(format!("unterminated body of `{}()`", name)).into())
    }
}
