// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Find the calls to the check functions of a translation unit and report the ones whose
//! condition is a constant.

use crate::defines::Defines;
use crate::error::Result;
use crate::eval::Evaluator;
use crate::lexer::{self, Comment, Punct, Token, TokenKind};
use crate::machine_model::{DataModel, MachineModel};
use crate::parser::parse_expression;
use crate::verify::{VerifyOutcome, verify};
use dyncheck_metadata::{CheckSite, CheckVerdict, Diagnostic, FileReport, Location};
use tracing::{debug, debug_span};

pub const ALWAYS_FAILS: &str = "dynamic check will always fail";
pub const ALWAYS_HOLDS: &str = "dynamic check will always succeed";
pub const TOO_MANY_ARGUMENTS: &str = "too many arguments to dynamic check";
pub const TOO_FEW_ARGUMENTS: &str = "too few arguments to dynamic check";

/// Names recognized as check functions when none are configured.
pub const DEFAULT_CHECK_FUNCTIONS: &[&str] = &["dynamic_check", "_Dynamic_check"];

/// Keywords that can precede the name of a function in its declaration.
const DECLARATION_KEYWORDS: &[&str] = &[
    "void", "_Bool", "bool", "char", "short", "int", "long", "unsigned", "signed", "float",
    "double", "extern", "static", "inline", "_Noreturn", "__attribute__",
];

/// What happens to the diagnostics of checks that always fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WarningLevel {
    /// Dropped.
    Allow,
    #[default]
    Warn,
    /// Reported as errors.
    Deny,
}

#[derive(Debug, Clone)]
pub struct CheckerConfig {
    pub check_functions: Vec<String>,
    /// `NAME` or `NAME=VALUE` definitions, added after the prelude.
    pub defines: Vec<String>,
    /// Also report checks that can never fail.
    pub report_redundant: bool,
    pub warnings: WarningLevel,
    pub data_model: DataModel,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            check_functions: DEFAULT_CHECK_FUNCTIONS.iter().map(|name| name.to_string()).collect(),
            defines: Vec::new(),
            report_redundant: false,
            warnings: WarningLevel::default(),
            data_model: DataModel::default(),
        }
    }
}

/// The result of analyzing one translation unit.
#[derive(Debug)]
pub struct Analysis {
    pub report: FileReport,
    /// Every comment of the file, for verification.
    pub comments: Vec<Comment>,
}

pub struct StaticChecker {
    config: CheckerConfig,
    model: MachineModel,
    defines: Defines,
}

impl StaticChecker {
    pub fn new(config: CheckerConfig) -> Result<Self> {
        let mut defines = Defines::with_prelude()?;
        for definition in &config.defines {
            defines.define(definition)?;
        }
        let model = MachineModel::new(config.data_model);
        Ok(StaticChecker { config, model, defines })
    }

    pub fn check_source(&self, file: &str, src: &str) -> Result<FileReport> {
        Ok(self.analyze(file, src)?.report)
    }

    pub fn verify_source(&self, file: &str, src: &str) -> Result<VerifyOutcome> {
        let analysis = self.analyze(file, src)?;
        Ok(verify(&analysis.report, &analysis.comments))
    }

    pub fn analyze(&self, file: &str, src: &str) -> Result<Analysis> {
        let _span = debug_span!("analyze", file).entered();
        let lexed = lexer::tokenize(file, src)?;
        let tokens = &lexed.tokens;
        let mut defines = self.defines.clone();
        let mut directives = lexed.directives.iter().peekable();
        let mut report = FileReport::new(file);

        let mut index = 0;
        while index < tokens.len() {
            // Definitions are visible from the token that follows them.
            while let Some(directive) = directives.next_if(|directive| directive.position <= index)
            {
                defines.apply(directive);
            }
            let Some(close) = self.call_site(tokens, index) else {
                index += 1;
                continue;
            };
            self.check_call(src, &defines, &tokens[index], &tokens[index + 2..close], &mut report);
            // Nested calls are checked on their own.
            index += 2;
        }

        report.diagnostics.sort_by(|a, b| a.location.cmp(&b.location));
        debug!(sites = report.sites.len(), diagnostics = report.diagnostics.len(), "analyzed");
        Ok(Analysis { report, comments: lexed.comments })
    }

    /// If `tokens[index]` starts a call to a check function, the index of its closing
    /// parenthesis.
    fn call_site(&self, tokens: &[Token], index: usize) -> Option<usize> {
        let name = tokens[index].ident()?;
        if !self.config.check_functions.iter().any(|function| function == name) {
            return None;
        }
        if !tokens.get(index + 1)?.is_punct(Punct::LParen) {
            return None;
        }
        if let Some(previous) = index.checked_sub(1).map(|previous| &tokens[previous]) {
            let is_declaration =
                previous.ident().is_some_and(|ident| DECLARATION_KEYWORDS.contains(&ident));
            let is_member = previous.is_punct(Punct::Dot) || previous.is_punct(Punct::Arrow);
            if is_declaration || is_member {
                return None;
            }
        }
        matching_paren(tokens, index + 1)
    }

    fn check_call(
        &self,
        src: &str,
        defines: &Defines,
        callee: &Token,
        arguments: &[Token],
        report: &mut FileReport,
    ) {
        let location = Location::new(report.file.clone(), callee.line, callee.column);
        let arguments = split_arguments(arguments);
        let condition = match arguments.as_slice() {
            [condition] => *condition,
            [] => {
                report.diagnostics.push(Diagnostic::error(location, TOO_FEW_ARGUMENTS));
                return;
            }
            _ => {
                report.diagnostics.push(Diagnostic::error(location, TOO_MANY_ARGUMENTS));
                return;
            }
        };

        let verdict = match parse_expression(&defines.expand(condition)) {
            Ok(expr) => CheckVerdict::from_constant(Evaluator::new(&self.model).condition(&expr)),
            Err(err) => {
                debug!(%location, %err, "unparsed_condition");
                CheckVerdict::Unknown
            }
        };
        let text = source_text(src, condition);
        debug!(%location, condition = %text, %verdict, "check_site");

        match verdict {
            CheckVerdict::AlwaysFails => match self.config.warnings {
                WarningLevel::Allow => {}
                WarningLevel::Warn => {
                    report.diagnostics.push(Diagnostic::warning(location.clone(), ALWAYS_FAILS))
                }
                WarningLevel::Deny => {
                    report.diagnostics.push(Diagnostic::error(location.clone(), ALWAYS_FAILS))
                }
            },
            CheckVerdict::AlwaysHolds if self.config.report_redundant => {
                report.diagnostics.push(Diagnostic::note(location.clone(), ALWAYS_HOLDS))
            }
            CheckVerdict::AlwaysHolds | CheckVerdict::Unknown => {}
        }
        report.sites.push(CheckSite {
            location,
            callee: callee.ident().unwrap_or_default().to_string(),
            condition: text,
            verdict,
        });
    }
}

/// Index of the parenthesis that closes the one at `open`.
fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::Punct(Punct::LParen) => depth += 1,
            TokenKind::Punct(Punct::RParen) => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split call arguments on the commas that are not nested in brackets.
fn split_arguments(tokens: &[Token]) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
            TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => {
                depth = depth.saturating_sub(1)
            }
            TokenKind::Punct(Punct::Comma) if depth == 0 => {
                arguments.push(&tokens[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    arguments.push(&tokens[start..]);
    arguments
}

/// The source text covered by `tokens`.
fn source_text(src: &str, tokens: &[Token]) -> String {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => {
            src.get(first.span.start..last.span.end).unwrap_or_default().to_string()
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyncheck_metadata::Severity;

    fn check(src: &str) -> FileReport {
        check_with(CheckerConfig::default(), src)
    }

    fn check_with(config: CheckerConfig, src: &str) -> FileReport {
        StaticChecker::new(config).unwrap().check_source("t.c", src).unwrap()
    }

    fn verdicts(src: &str) -> Vec<CheckVerdict> {
        check(src).sites.into_iter().map(|site| site.verdict).collect()
    }

    #[test]
    fn check_always_failing_call() {
        let src = "int main(void) {\n  dynamic_check(false);\n  return 0;\n}\n";
        let report = check(src);
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::warning(Location::new("t.c", 2, 3), ALWAYS_FAILS)]
        );
        assert_eq!(report.sites.len(), 1);
        assert_eq!(report.sites[0].condition, "false");
        assert_eq!(report.sites[0].callee, "dynamic_check");
        assert_eq!(report.sites[0].verdict, CheckVerdict::AlwaysFails);
    }

    #[test]
    fn check_passing_and_runtime_calls() {
        let report = check("void f(int x) { dynamic_check(true); dynamic_check(x > 0); }");
        assert!(report.diagnostics.is_empty());
        assert_eq!(
            report.sites.iter().map(|site| site.verdict).collect::<Vec<_>>(),
            vec![CheckVerdict::AlwaysHolds, CheckVerdict::Unknown]
        );
    }

    #[test]
    fn check_folded_conditions() {
        assert_eq!(
            verdicts(
                "dynamic_check(1 - 1);\n\
                 dynamic_check(0u - 1 < 0);\n\
                 dynamic_check(sizeof(int) == 2);\n\
                 dynamic_check(NULL);\n\
                 dynamic_check(p && 0);\n\
                 dynamic_check(\"message\" && 0);\n\
                 dynamic_check((_Bool)2);\n"
            ),
            vec![CheckVerdict::AlwaysFails; 6]
                .into_iter()
                .chain([CheckVerdict::AlwaysHolds])
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn check_defines_in_order() {
        let src = "\
dynamic_check(LIMIT);
#define LIMIT 0
dynamic_check(LIMIT);
#undef LIMIT
#define LIMIT 4
dynamic_check(LIMIT > 2);
#define CHECK(c) c
dynamic_check(CHECK(0));
";
        assert_eq!(
            verdicts(src),
            vec![
                CheckVerdict::Unknown,
                CheckVerdict::AlwaysFails,
                CheckVerdict::AlwaysHolds,
                CheckVerdict::Unknown
            ]
        );
    }

    #[test]
    fn check_command_line_defines() {
        let config = CheckerConfig { defines: vec!["DEBUG=0".into()], ..Default::default() };
        let report = check_with(config, "dynamic_check(DEBUG);");
        assert_eq!(report.count(Severity::Warning), 1);
        let config = CheckerConfig { defines: vec!["9=0".into()], ..Default::default() };
        assert!(StaticChecker::new(config).is_err());
    }

    #[test]
    fn check_arity() {
        let report = check("dynamic_check();\ndynamic_check(a, b);\ndynamic_check(f(a, b));");
        assert_eq!(
            report.diagnostics,
            vec![
                Diagnostic::error(Location::new("t.c", 1, 1), TOO_FEW_ARGUMENTS),
                Diagnostic::error(Location::new("t.c", 2, 1), TOO_MANY_ARGUMENTS),
            ]
        );
        assert_eq!(report.sites.len(), 1);
    }

    #[test]
    fn check_declarations_and_members_are_skipped() {
        let src =
            "void dynamic_check(_Bool c);\nextern void _Dynamic_check(int);\ns.dynamic_check(0);\n";
        assert!(check(src).sites.is_empty());
    }

    #[test]
    fn check_nested_calls() {
        let report = check("dynamic_check((dynamic_check(0), 1));");
        assert_eq!(report.sites.len(), 2);
        assert_eq!(report.sites[0].verdict, CheckVerdict::AlwaysHolds);
        assert_eq!(report.sites[1].verdict, CheckVerdict::AlwaysFails);
        assert_eq!(report.diagnostics[0].location.column, 16);
    }

    #[test]
    fn check_warning_levels() {
        let src = "dynamic_check(0); dynamic_check(1);";
        let allow = CheckerConfig { warnings: WarningLevel::Allow, ..Default::default() };
        assert!(check_with(allow, src).diagnostics.is_empty());

        let deny = CheckerConfig { warnings: WarningLevel::Deny, ..Default::default() };
        let report = check_with(deny, src);
        assert!(report.has_errors());
        assert_eq!(report.diagnostics[0].message, ALWAYS_FAILS);

        let redundant = CheckerConfig { report_redundant: true, ..Default::default() };
        let report = check_with(redundant, src);
        assert_eq!(report.count(Severity::Warning), 1);
        assert_eq!(report.count(Severity::Note), 1);
        assert_eq!(report.diagnostics[1].message, ALWAYS_HOLDS);
    }

    #[test]
    fn check_custom_functions() {
        let config =
            CheckerConfig { check_functions: vec!["my_assert".into()], ..Default::default() };
        let report = check_with(config, "my_assert(0); dynamic_check(0);");
        assert_eq!(report.sites.len(), 1);
        assert_eq!(report.sites[0].callee, "my_assert");
    }

    #[test]
    fn check_data_model() {
        let src = "dynamic_check(sizeof(long) == 8);";
        let ilp32 = CheckerConfig { data_model: DataModel::Ilp32, ..Default::default() };
        assert_eq!(check_with(ilp32, src).sites[0].verdict, CheckVerdict::AlwaysFails);
        assert_eq!(check(src).sites[0].verdict, CheckVerdict::AlwaysHolds);
    }

    #[test]
    fn check_long_double_size_per_data_model() {
        let src = "dynamic_check(sizeof(long double) == 8);";
        let llp64 = CheckerConfig { data_model: DataModel::Llp64, ..Default::default() };
        let report = check_with(llp64, src);
        assert_eq!(report.sites[0].verdict, CheckVerdict::AlwaysHolds);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn check_string_literal_sizes() {
        let src = r#"
            void f(void) {
                dynamic_check(sizeof L"ab" == 12);
                dynamic_check(sizeof u"ab" == 6);
                dynamic_check(sizeof "\xff" == 2);
                dynamic_check(sizeof "\xff" == 3);
            }
        "#;
        let report = check(src);
        assert_eq!(
            report.sites.iter().map(|site| site.verdict).collect::<Vec<_>>(),
            vec![
                CheckVerdict::AlwaysHolds,
                CheckVerdict::AlwaysHolds,
                CheckVerdict::AlwaysHolds,
                CheckVerdict::AlwaysFails
            ]
        );
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].location.line, 6);
    }

    #[test]
    fn check_deeply_nested_condition() {
        let nested = |depth| format!("{}0{}", "(".repeat(depth), ")".repeat(depth));
        let src = format!("dynamic_check({});\ndynamic_check({});", nested(20), nested(5000));
        let report = check(&src);
        assert_eq!(
            report.sites.iter().map(|site| site.verdict).collect::<Vec<_>>(),
            vec![CheckVerdict::AlwaysFails, CheckVerdict::Unknown]
        );
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].location.line, 1);
    }

    #[test]
    fn check_unbalanced_call() {
        let report = check("dynamic_check(0;");
        assert!(report.sites.is_empty());
    }

    #[test]
    fn check_lexical_errors() {
        let checker = StaticChecker::new(CheckerConfig::default()).unwrap();
        assert!(checker.check_source("t.c", "/* open").is_err());
    }

    #[test]
    fn check_verify_source() {
        let checker = StaticChecker::new(CheckerConfig::default()).unwrap();
        let src = "dynamic_check(false); // expected-warning {{dynamic check will always fail}}\n";
        assert!(checker.verify_source("t.c", src).unwrap().is_success());
        let src = "dynamic_check(true); // expected-warning {{dynamic check will always fail}}\n";
        assert!(!checker.verify_source("t.c", src).unwrap().is_success());
    }
}
