// SPDX-License-Identifier: MPL-2.0

//! Renders a failed resolution as a numbered, human-readable proof.
//!
//! The failure's root clause carries a derivation DAG: external clauses at
//! the leaves, learned clauses at the nodes, each node remembering the two
//! clauses it was resolved from. The writer walks that DAG bottom-up,
//! inlines derivations used once, and assigns line numbers only to the
//! derivations referenced again later, so the proof stays as short as the
//! sharing allows.

use std::sync::Arc;

use crate::clause::{Cause, Clause};
use crate::package::PackageDep;
use crate::term::Term;
use crate::type_aliases::{Map, Set};

const WIDTH: usize = 78;

pub(crate) fn render(root: &Arc<Clause>) -> String {
    ProofWriter::new(root).write()
}

fn ptr(clause: &Arc<Clause>) -> usize {
    Arc::as_ptr(clause) as usize
}

fn is_derived(clause: &Clause) -> bool {
    matches!(clause.cause(), Cause::Conflict { .. })
}

/// How to disambiguate a package name that occurs with several identities.
#[derive(Clone, Copy, Debug)]
enum Ambiguity {
    BySource,
    ByDescription,
}

struct ProofWriter<'a> {
    root: &'a Arc<Clause>,
    /// How many times each clause is referenced in the derivation DAG.
    ref_counts: Map<usize, usize>,
    /// Line numbers assigned so far, by clause identity.
    line_numbers: Map<usize, usize>,
    next_number: usize,
    /// Buffered output: optional line number plus unwrapped text.
    lines: Vec<(Option<usize>, String)>,
    /// Names that need a source or description to tell instances apart.
    ambiguous: Map<String, Ambiguity>,
}

impl<'a> ProofWriter<'a> {
    fn new(root: &'a Arc<Clause>) -> Self {
        let mut ref_counts = Map::default();
        let mut tuples: Map<String, Set<(String, String)>> = Map::default();
        let mut seen = Set::default();
        scan(root, &mut ref_counts, &mut tuples, &mut seen);
        let mut ambiguous = Map::default();
        for (name, instances) in tuples {
            if instances.len() > 1 {
                let sources: Set<&String> = instances.iter().map(|(source, _)| source).collect();
                let how = if sources.len() > 1 {
                    Ambiguity::BySource
                } else {
                    Ambiguity::ByDescription
                };
                ambiguous.insert(name, how);
            }
        }
        Self {
            root,
            ref_counts,
            line_numbers: Map::default(),
            next_number: 1,
            lines: Vec::new(),
            ambiguous,
        }
    }

    fn write(mut self) -> String {
        let root = self.root;
        if is_derived(root) {
            self.visit(root, true, false);
        } else {
            let text = format!("Because {}, version solving failed.", self.phrase(root));
            self.lines.push((None, text));
        }
        self.format()
    }

    /// Writes the proof of one derived clause, recursing into whichever
    /// predecessors have not been written yet.
    fn visit(&mut self, clause: &Arc<Clause>, conclusion: bool, forced: bool) {
        let numbered = conclusion || forced || self.ref_count(clause) > 1;
        let conjunction = if conclusion { "So," } else { "And" };
        let this_phrase = if conclusion {
            "version solving failed".to_string()
        } else {
            self.phrase(clause)
        };
        let Cause::Conflict { conflict, other } = clause.cause() else {
            unreachable!("only derived clauses are visited")
        };
        match (is_derived(conflict), is_derived(other)) {
            (true, true) => {
                let conflict_line = self.line_numbers.get(&ptr(conflict)).copied();
                let other_line = self.line_numbers.get(&ptr(other)).copied();
                match (conflict_line, other_line) {
                    (Some(a), Some(b)) => {
                        let text = format!(
                            "Because {} ({a}) and {} ({b}), {this_phrase}.",
                            self.phrase(conflict),
                            self.phrase(other)
                        );
                        self.emit(clause, numbered, text);
                    }
                    (Some(a), None) => {
                        self.visit(other, false, false);
                        let text = format!(
                            "{conjunction} because {} ({a}), {this_phrase}.",
                            self.phrase(conflict)
                        );
                        self.emit(clause, numbered, text);
                    }
                    (None, Some(b)) => {
                        self.visit(conflict, false, false);
                        let text = format!(
                            "{conjunction} because {} ({b}), {this_phrase}.",
                            self.phrase(other)
                        );
                        self.emit(clause, numbered, text);
                    }
                    (None, None) => {
                        // With one collapsible side, both proofs read as a
                        // linear chain concluded by "Thus".
                        if self.is_collapsible(conflict) {
                            self.visit(other, false, false);
                            self.visit(conflict, false, false);
                            self.emit(clause, numbered, format!("Thus, {this_phrase}."));
                        } else if self.is_collapsible(other) {
                            self.visit(conflict, false, false);
                            self.visit(other, false, false);
                            self.emit(clause, numbered, format!("Thus, {this_phrase}."));
                        } else {
                            self.visit(conflict, false, true);
                            let line = self.line_numbers[&ptr(conflict)];
                            self.visit(other, false, false);
                            let text = format!(
                                "{conjunction} because {} ({line}), {this_phrase}.",
                                self.phrase(conflict)
                            );
                            self.emit(clause, numbered, text);
                        }
                    }
                }
            }
            (false, false) => {
                let text = format!(
                    "Because {} and {}, {this_phrase}.",
                    self.phrase(conflict),
                    self.phrase(other)
                );
                self.emit(clause, numbered, text);
            }
            _ => {
                let (derived, external) = if is_derived(conflict) {
                    (conflict, other)
                } else {
                    (other, conflict)
                };
                if let Some(line) = self.line_numbers.get(&ptr(derived)).copied() {
                    let text = format!(
                        "Because {} ({line}) and {}, {this_phrase}.",
                        self.phrase(derived),
                        self.phrase(external)
                    );
                    self.emit(clause, numbered, text);
                } else if self.is_collapsible(derived) {
                    // Skip the intermediate conclusion and cite the derived
                    // clause's own external evidence directly.
                    let Cause::Conflict {
                        conflict: inner_a,
                        other: inner_b,
                    } = derived.cause()
                    else {
                        unreachable!("collapsible clauses are derived")
                    };
                    let (inner_derived, inner_external) = if is_derived(inner_a) {
                        (inner_a, inner_b)
                    } else {
                        (inner_b, inner_a)
                    };
                    self.visit(inner_derived, false, false);
                    let text = format!(
                        "{conjunction} because {} and {}, {this_phrase}.",
                        self.phrase(inner_external),
                        self.phrase(external)
                    );
                    self.emit(clause, numbered, text);
                } else {
                    self.visit(derived, false, false);
                    let text =
                        format!("{conjunction} because {}, {this_phrase}.", self.phrase(external));
                    self.emit(clause, numbered, text);
                }
            }
        }
    }

    /// A derivation can be folded into its single consumer when it is used
    /// once, has exactly one derived predecessor, and that predecessor has
    /// not been given a line of its own.
    fn is_collapsible(&self, clause: &Arc<Clause>) -> bool {
        if self.ref_count(clause) > 1 {
            return false;
        }
        let Cause::Conflict { conflict, other } = clause.cause() else {
            return false;
        };
        match (is_derived(conflict), is_derived(other)) {
            (true, true) | (false, false) => false,
            _ => {
                let derived = if is_derived(conflict) { conflict } else { other };
                !self.line_numbers.contains_key(&ptr(derived))
            }
        }
    }

    fn ref_count(&self, clause: &Arc<Clause>) -> usize {
        self.ref_counts.get(&ptr(clause)).copied().unwrap_or(0)
    }

    fn emit(&mut self, clause: &Arc<Clause>, numbered: bool, text: String) {
        if numbered {
            let number = self.next_number;
            self.next_number += 1;
            self.line_numbers.insert(ptr(clause), number);
            self.lines.push((Some(number), text));
        } else {
            self.lines.push((None, text));
        }
    }

    /// One clause as a sentence fragment.
    fn phrase(&self, clause: &Clause) -> String {
        let negative = clause.terms().iter().find(|term| term.is_negative());
        let positive = clause.terms().iter().find(|term| !term.is_negative());
        match clause.cause() {
            Cause::Root(root) => match positive {
                Some(term) => {
                    format!("{} depends on {}", root.name, self.object(term.dep()))
                }
                None => self.terms_phrase(clause),
            },
            Cause::Dependency => match (negative, positive) {
                (Some(depender), Some(target)) => format!(
                    "{} depends on {}",
                    self.subject(depender.dep()),
                    self.object(target.dep())
                ),
                (Some(depender), None) => format!(
                    "{} depends on a package that cannot be selected",
                    self.subject(depender.dep())
                ),
                _ => self.terms_phrase(clause),
            },
            Cause::NoVersions => match negative {
                Some(term) => format!(
                    "no versions of {} match {}",
                    self.name(term.dep()),
                    term.dep().constraint
                ),
                None => self.terms_phrase(clause),
            },
            Cause::UnknownPackage => match negative {
                Some(term) => format!("{} doesn't exist", self.name(term.dep())),
                None => self.terms_phrase(clause),
            },
            Cause::Sdk { kind, constraint } => {
                let Some(term) = negative else {
                    return self.terms_phrase(clause);
                };
                match constraint {
                    Some(constraint) => format!(
                        "{} requires {kind} SDK version {constraint}",
                        self.subject(term.dep())
                    ),
                    None => format!("{} requires the Flutter SDK", self.subject(term.dep())),
                }
            }
            Cause::Conflict { .. } => self.terms_phrase(clause),
        }
    }

    /// The generic phrasing of a clause by its terms: negative terms are
    /// antecedents, positive terms consequents.
    fn terms_phrase(&self, clause: &Clause) -> String {
        let negatives: Vec<&Term> = clause.terms().iter().filter(|t| t.is_negative()).collect();
        let positives: Vec<&Term> = clause.terms().iter().filter(|t| !t.is_negative()).collect();
        match (negatives.as_slice(), positives.as_slice()) {
            ([], []) => "version solving failed".to_string(),
            ([negative], []) => format!("{} is forbidden", self.subject(negative.dep())),
            ([], [positive]) => format!("{} is required", self.subject(positive.dep())),
            ([negative], [positive]) => format!(
                "{} requires {}",
                self.subject(negative.dep()),
                self.object(positive.dep())
            ),
            ([first, second], []) => format!(
                "{} is incompatible with {}",
                self.subject(first.dep()),
                self.subject(second.dep())
            ),
            _ => {
                let list = |terms: &[&Term], separator: &str| {
                    terms
                        .iter()
                        .map(|term| self.subject(term.dep()))
                        .collect::<Vec<_>>()
                        .join(separator)
                };
                if negatives.is_empty() {
                    format!("one of {} is required", list(&positives, " or "))
                } else if positives.is_empty() {
                    format!("{} are incompatible", list(&negatives, " and "))
                } else {
                    format!(
                        "if {} then {}",
                        list(&negatives, " and "),
                        list(&positives, " or ")
                    )
                }
            }
        }
    }

    /// A dependency in subject position: "every version of foo",
    /// "foo 1.0.0", "foo >=1.0.0 <2.0.0".
    fn subject(&self, dep: &PackageDep) -> String {
        if dep.constraint.is_any() {
            format!("every version of {}", self.name(dep))
        } else if let Some(version) = dep.constraint.as_exact() {
            format!("{} {version}", self.name(dep))
        } else {
            format!("{} {}", self.name(dep), dep.constraint)
        }
    }

    /// A dependency in object position: "foo", "foo 1.0.0",
    /// "foo >=1.0.0 <2.0.0".
    fn object(&self, dep: &PackageDep) -> String {
        if dep.constraint.is_any() {
            self.name(dep)
        } else if let Some(version) = dep.constraint.as_exact() {
            format!("{} {version}", self.name(dep))
        } else {
            format!("{} {}", self.name(dep), dep.constraint)
        }
    }

    /// A package name, annotated when several instances share it.
    fn name(&self, dep: &PackageDep) -> String {
        match self.ambiguous.get(&dep.package.name) {
            None => dep.package.name.clone(),
            Some(Ambiguity::BySource) => {
                format!("{} from {}", dep.package.name, dep.package.source)
            }
            Some(Ambiguity::ByDescription) => format!(
                "{} from {} ({})",
                dep.package.name, dep.package.source, dep.package.description
            ),
        }
    }

    fn format(&self) -> String {
        let gutter = self
            .lines
            .iter()
            .filter_map(|(number, _)| *number)
            .max()
            .map(|highest| format!("({highest}) ").len())
            .unwrap_or(0);
        let mut output = String::new();
        for (number, text) in &self.lines {
            let mut prefix = match number {
                Some(number) => format!("({number})"),
                None => String::new(),
            };
            while prefix.len() < gutter {
                prefix.push(' ');
            }
            for (index, line) in word_wrap(text, WIDTH.saturating_sub(gutter))
                .into_iter()
                .enumerate()
            {
                if index == 0 {
                    output.push_str(&prefix);
                } else {
                    output.push_str(&" ".repeat(gutter));
                }
                output.push_str(&line);
                output.push('\n');
            }
        }
        output.trim_end().to_string()
    }
}

/// Records term identities and counts derivation references.
fn scan(
    clause: &Arc<Clause>,
    counts: &mut Map<usize, usize>,
    tuples: &mut Map<String, Set<(String, String)>>,
    seen: &mut Set<usize>,
) {
    if !seen.insert(ptr(clause)) {
        return;
    }
    for term in clause.terms() {
        tuples
            .entry(term.package().name.clone())
            .or_default()
            .insert((term.package().source.clone(), term.package().description.clone()));
    }
    if let Cause::Conflict { conflict, other } = clause.cause() {
        for predecessor in [conflict, other] {
            *counts.entry(ptr(predecessor)).or_insert(0) += 1;
            scan(predecessor, counts, tuples, seen);
        }
    }
}

fn word_wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{PackageDep, PackageRef};
    use crate::term::Term;

    fn dep(name: &str, constraint: &str) -> PackageDep {
        PackageDep::hosted(name, constraint.parse().unwrap())
    }

    fn requirement(name: &str, constraint: &str) -> Arc<Clause> {
        Arc::new(Clause::requirement(
            dep(name, constraint),
            PackageRef::hosted("root"),
        ))
    }

    fn dependency(from: (&str, &str), to: (&str, &str)) -> Arc<Clause> {
        Arc::new(Clause::dependency(dep(from.0, from.1), dep(to.0, to.1)))
    }

    #[test]
    fn external_root_renders_a_single_sentence() {
        let root = requirement("foo", "^1.0.0");
        assert_eq!(
            render(&root),
            "Because root depends on foo ^1.0.0, version solving failed."
        );
    }

    #[test]
    fn two_external_causes_render_in_one_line() {
        let conflict = dependency(("bar", "any"), ("foo", ">=2.0.0"));
        let other = requirement("foo", ">=1.0.0 <2.0.0");
        let root = Arc::new(Clause::contradiction(conflict, other));
        assert_eq!(
            render(&root).replace('\n', " "),
            "Because every version of bar depends on foo >=2.0.0 and root depends on \
             foo >=1.0.0 <2.0.0, version solving failed."
        );
    }

    #[test]
    fn single_use_derivations_are_inlined() {
        let bar_requirement = requirement("bar", "^1.0.0");
        let bar_dep = dependency(("bar", "any"), ("foo", ">=2.0.0"));
        let learned = Arc::new(
            Clause::derived(
                vec![Term::positive(dep("foo", ">=2.0.0"))],
                bar_requirement,
                bar_dep,
            )
            .unwrap(),
        );
        let foo_requirement = requirement("foo", "^1.0.0");
        let root = Arc::new(Clause::contradiction(learned, foo_requirement));
        let report = render(&root).replace('\n', " ");
        assert!(
            report.contains("foo >=2.0.0 is required"),
            "unexpected report:\n{report}"
        );
        assert!(
            report.ends_with("version solving failed."),
            "unexpected report:\n{report}"
        );
        // Nothing is referenced twice, so no line numbers appear.
        assert!(!report.contains("(1)"), "unexpected report:\n{report}");
    }

    #[test]
    fn ambiguous_names_are_annotated() {
        let hosted = requirement("foo", "^1.0.0");
        let from_git = Arc::new(Clause::prohibition(
            PackageDep::new(
                PackageRef::new("foo", "git", "https://example.com/foo"),
                "any".parse().unwrap(),
            ),
            Cause::UnknownPackage,
        ));
        let root = Arc::new(Clause::contradiction(from_git, hosted));
        let report = render(&root).replace('\n', " ");
        assert!(
            report.contains("foo from git doesn't exist"),
            "unexpected report:\n{report}"
        );
        assert!(
            report.contains("foo from hosted"),
            "unexpected report:\n{report}"
        );
    }

    #[test]
    fn long_lines_wrap_with_the_gutter_preserved() {
        let clause = dependency(
            ("extraordinarily_long_package_name", ">=1.0.0 <2.0.0"),
            ("another_very_long_package_name", ">=3.0.0 <4.0.0"),
        );
        let other = requirement("another_very_long_package_name", "^1.0.0");
        let root = Arc::new(Clause::contradiction(clause, other));
        let report = render(&root);
        for line in report.lines() {
            assert!(line.len() <= WIDTH, "line too long: {line:?}");
        }
    }
}
