// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Class table construction and inheritance queries.
//!
//! The [`ClassTable`] is the single source of truth for which classes exist,
//! how they inherit, and which members they carry. It is built once, before
//! any expression is type checked:
//!
//! 1. Pre-seed the built-in classes (`Object`, `IO`, `Int`, `String`, `Bool`).
//! 2. Insert user classes in source order, reporting duplicates.
//! 3. Validate the inheritance graph: undefined parents and cycles.
//! 4. Resolve each class's attribute layout, inherited slots first.
//!
//! Structural errors (a duplicate class, an undefined parent, an inheritance
//! cycle) mark the table *unsound*. Expression checking and evaluation are
//! skipped for unsound tables, since inheritance queries would have no
//! reliable answer.
//!
//! Every inheritance walk carries a visited set, so a cyclic parent chain can
//! never hang a query even on an unsound table.

use crate::ast::{ClassDefinition, Feature, Program};
use crate::source_analysis::{Diagnostic, DiagnosticCategory, DiagnosticContext, Span};
use ecow::EcoString;
use std::collections::{HashMap, HashSet};

mod builtins;

/// A method signature as recorded in the class table.
///
/// Signatures are all the type checker needs for dispatch; method bodies
/// stay in the AST and are only visited when their declaring class is
/// checked or a call is evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    /// The method name.
    pub name: EcoString,
    /// Declared formal parameter types, in declaration order.
    pub parameter_types: Vec<EcoString>,
    /// Declared return type. May be `SELF_TYPE`.
    pub return_type: EcoString,
    /// The class whose definition supplied this signature. For an inherited
    /// method this is an ancestor, not the class the lookup started from.
    pub declaring_class: EcoString,
}

impl MethodSignature {
    /// The number of formal parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

/// An attribute declared directly on a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    /// The attribute name.
    pub name: EcoString,
    /// The declared type. May be `SELF_TYPE`.
    pub declared_type: EcoString,
    /// The span of the attribute's name, for diagnostics.
    pub span: Span,
}

/// One slot in a class's resolved attribute layout.
///
/// The layout lists every attribute an instance carries, inherited slots
/// first in ancestor declaration order. A redeclaration in a subclass
/// replaces the inherited slot in place rather than appending a new one,
/// so a name appears at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSlot {
    /// The attribute name.
    pub name: EcoString,
    /// The declared type of the winning declaration.
    pub declared_type: EcoString,
    /// The class whose declaration (and initialiser) this slot carries.
    pub declaring_class: EcoString,
}

/// Everything the analyser knows about one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// The class name.
    pub name: EcoString,
    /// The parent class. `None` only for `Object`; a class declared without
    /// an `inherits` clause gets `Object` here.
    pub parent: Option<EcoString>,
    /// Attributes declared directly on this class, in declaration order.
    pub attributes: Vec<AttributeInfo>,
    /// Methods declared directly on this class, keyed by name.
    pub methods: HashMap<EcoString, MethodSignature>,
    /// The full attribute layout including inherited slots. Empty until the
    /// table is built and only resolved for sound tables.
    pub layout: Vec<AttributeSlot>,
    /// Whether this is a pre-seeded built-in class.
    pub builtin: bool,
}

/// The class table: every known class and the inheritance queries the type
/// checker and evaluator ask of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTable {
    classes: HashMap<EcoString, ClassDescriptor>,
    sound: bool,
}

impl ClassTable {
    /// Builds the class table for a program, returning the table together
    /// with any structural diagnostics.
    ///
    /// The table is always fully populated, even when diagnostics were
    /// reported; callers must consult [`ClassTable::is_sound`] before
    /// trusting inheritance queries for anything beyond error reporting.
    #[must_use]
    pub fn build(program: &Program) -> (Self, Vec<Diagnostic>) {
        let mut table = Self::with_builtins();
        let mut diagnostics = Vec::new();
        table.add_program_classes(program, &mut diagnostics);
        table.validate_hierarchy(program, &mut diagnostics);
        if table.sound {
            table.check_attribute_redefinitions(program, &mut diagnostics);
            table.resolve_layouts();
        }
        (table, diagnostics)
    }

    /// Creates a table containing only the built-in classes.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self {
            classes: builtins::builtin_classes(),
            sound: true,
        }
    }

    /// Whether the inheritance graph is well-formed: no duplicate classes,
    /// no undefined parents, no cycles.
    #[must_use]
    pub fn is_sound(&self) -> bool {
        self.sound
    }

    /// Looks up a class by name.
    #[must_use]
    pub fn get_class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name)
    }

    /// Whether a class with this name exists.
    #[must_use]
    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// All known class names, built-ins included, in no particular order.
    pub fn class_names(&self) -> impl Iterator<Item = &EcoString> {
        self.classes.keys()
    }

    /// The inheritance chain starting at `name` and ending at the root,
    /// both inclusive: `Circle` gives `[Circle, Shape, Object]`.
    ///
    /// The walk stops at an unknown class or on revisiting one, so the
    /// result is finite even for broken hierarchies.
    #[must_use]
    pub fn ancestry(&self, name: &str) -> Vec<EcoString> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(EcoString::from(name));
        while let Some(cls) = current {
            if !visited.insert(cls.clone()) {
                break;
            }
            current = self.classes.get(cls.as_str()).and_then(|d| d.parent.clone());
            chain.push(cls);
        }
        chain
    }

    /// Whether `sub` conforms to `superclass`: they are the same class, or
    /// `superclass` appears on `sub`'s parent chain.
    ///
    /// Both arguments must be concrete class names; the type checker
    /// resolves `SELF_TYPE` before asking.
    #[must_use]
    pub fn is_subtype(&self, sub: &str, superclass: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(EcoString::from(sub));
        while let Some(cls) = current {
            if cls == superclass {
                return true;
            }
            if !visited.insert(cls.clone()) {
                return false;
            }
            current = self.classes.get(cls.as_str()).and_then(|d| d.parent.clone());
        }
        false
    }

    /// The least common ancestor of two classes: the most specific class
    /// both conform to. Falls back to `Object` when the chains never meet,
    /// which also covers unknown class names.
    ///
    /// Both arguments must be concrete class names; the type checker
    /// resolves `SELF_TYPE` before asking.
    #[must_use]
    pub fn join(&self, first: &str, second: &str) -> EcoString {
        if first == second {
            return first.into();
        }
        let left = self.ancestry(first);
        let mut visited = HashSet::new();
        let mut current = Some(EcoString::from(second));
        while let Some(cls) = current {
            if left.contains(&cls) {
                return cls;
            }
            if !visited.insert(cls.clone()) {
                break;
            }
            current = self.classes.get(cls.as_str()).and_then(|d| d.parent.clone());
        }
        "Object".into()
    }

    /// Resolves a method by walking the parent chain from `class_name`,
    /// nearest declaration first. Returns `None` if no class on the chain
    /// declares it.
    #[must_use]
    pub fn find_method(&self, class_name: &str, method: &str) -> Option<&MethodSignature> {
        let mut visited = HashSet::new();
        let mut current = Some(EcoString::from(class_name));
        while let Some(cls) = current {
            if !visited.insert(cls.clone()) {
                break;
            }
            let descriptor = self.classes.get(cls.as_str())?;
            if let Some(signature) = descriptor.methods.get(method) {
                return Some(signature);
            }
            current = descriptor.parent.clone();
        }
        None
    }

    /// Resolves an attribute against a class's layout, inherited slots
    /// included.
    #[must_use]
    pub fn find_attribute(&self, class_name: &str, attribute: &str) -> Option<&AttributeSlot> {
        self.classes
            .get(class_name)?
            .layout
            .iter()
            .find(|slot| slot.name == attribute)
    }

    /// Checks that the program has an entry point: a `Main` class whose
    /// parent chain reaches a `main` method.
    ///
    /// Run after expression checking so the entry-point diagnostics come
    /// last, and skipped entirely for unsound tables.
    #[must_use]
    pub fn check_entry_point(&self, program: &Program) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if !self.has_class("Main") {
            diagnostics.push(
                Diagnostic::error("Program has no `Main` class", program.span)
                    .with_hint("Execution starts at `Main.main()`")
                    .with_category(DiagnosticCategory::EntryPoint),
            );
            return diagnostics;
        }
        if self.find_method("Main", "main").is_none() {
            let span = program
                .classes
                .iter()
                .find(|class| class.name.name == "Main")
                .map_or(program.span, |class| class.name.span);
            diagnostics.push(
                Diagnostic::error("Class `Main` has no `main` method", span)
                    .with_hint("Execution starts at `Main.main()`")
                    .with_category(DiagnosticCategory::EntryPoint)
                    .with_context(DiagnosticContext::class("Main")),
            );
        }
        diagnostics
    }

    /// Inserts the program's classes in source order. The first definition
    /// of a name wins; later ones (including attempts to redefine a
    /// built-in) are reported and ignored wholesale, so a duplicate's
    /// features are never merged into the kept class.
    fn add_program_classes(&mut self, program: &Program, diagnostics: &mut Vec<Diagnostic>) {
        for class in &program.classes {
            let name = class.name.name.clone();
            if let Some(existing) = self.classes.get(name.as_str()) {
                let diagnostic =
                    Diagnostic::error(format!("Duplicate class `{name}`"), class.name.span)
                        .with_category(DiagnosticCategory::Hierarchy)
                        .with_context(DiagnosticContext::class(name.clone()));
                let diagnostic = if existing.builtin {
                    diagnostic
                        .with_hint(format!("`{name}` is a built-in class and cannot be redefined"))
                } else {
                    diagnostic.with_hint("The first definition is kept; this one is ignored")
                };
                diagnostics.push(diagnostic);
                self.sound = false;
                continue;
            }
            let descriptor = Self::descriptor_from_class(class, diagnostics);
            self.classes.insert(name, descriptor);
        }
    }

    /// Builds a descriptor from one class definition, reporting duplicate
    /// features. Within a class the later definition of a name wins, but a
    /// redeclared attribute keeps the first declaration's position.
    fn descriptor_from_class(
        class: &ClassDefinition,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ClassDescriptor {
        let class_name = class.name.name.clone();
        let mut attributes: Vec<AttributeInfo> = Vec::new();
        let mut methods: HashMap<EcoString, MethodSignature> = HashMap::new();
        let mut method_spans: HashMap<EcoString, Span> = HashMap::new();

        for feature in &class.features {
            match feature {
                Feature::Method(method) => {
                    if let Some(first) = method_spans.get(&method.name.name) {
                        diagnostics.push(
                            Diagnostic::warning(
                                format!(
                                    "Duplicate method `{}` in class `{class_name}`",
                                    method.name.name
                                ),
                                method.name.span,
                            )
                            .with_hint(format!(
                                "Already defined at offset {}; the later definition is used",
                                first.start()
                            ))
                            .with_category(DiagnosticCategory::Hierarchy)
                            .with_context(DiagnosticContext::class(class_name.clone())),
                        );
                    } else {
                        method_spans.insert(method.name.name.clone(), method.name.span);
                    }
                    methods.insert(
                        method.name.name.clone(),
                        MethodSignature {
                            name: method.name.name.clone(),
                            parameter_types: method
                                .formals
                                .iter()
                                .map(|formal| formal.declared_type.name.clone())
                                .collect(),
                            return_type: method.return_type.name.clone(),
                            declaring_class: class_name.clone(),
                        },
                    );
                }
                Feature::Attribute(attribute) => {
                    let info = AttributeInfo {
                        name: attribute.name.name.clone(),
                        declared_type: attribute.declared_type.name.clone(),
                        span: attribute.name.span,
                    };
                    if let Some(position) =
                        attributes.iter().position(|existing| existing.name == info.name)
                    {
                        diagnostics.push(
                            Diagnostic::warning(
                                format!(
                                    "Duplicate attribute `{}` in class `{class_name}`",
                                    info.name
                                ),
                                attribute.name.span,
                            )
                            .with_hint(format!(
                                "Already defined at offset {}; the later definition is used",
                                attributes[position].span.start()
                            ))
                            .with_category(DiagnosticCategory::Hierarchy)
                            .with_context(DiagnosticContext::class(class_name.clone())),
                        );
                        attributes[position] = info;
                    } else {
                        attributes.push(info);
                    }
                }
            }
        }

        ClassDescriptor {
            name: class_name,
            parent: Some(
                class
                    .parent
                    .as_ref()
                    .map_or_else(|| "Object".into(), |parent| parent.name.clone()),
            ),
            attributes,
            methods,
            layout: Vec::new(),
            builtin: false,
        }
    }

    /// Validates the inheritance graph: every declared parent must exist,
    /// and no parent chain may revisit a class.
    ///
    /// Each cycle is reported once, against the first class in source order
    /// whose walk discovers it; other classes on or leading into that cycle
    /// are recorded silently so their walks do not repeat the report.
    fn validate_hierarchy(&mut self, program: &Program, diagnostics: &mut Vec<Diagnostic>) {
        let mut checked: HashSet<EcoString> = HashSet::new();
        let mut cyclic: HashSet<EcoString> = HashSet::new();
        for class in &program.classes {
            let name = &class.name.name;
            if !checked.insert(name.clone()) {
                continue;
            }
            let Some(descriptor) = self.classes.get(name.as_str()) else {
                continue;
            };
            if descriptor.builtin {
                // A rejected redefinition of a built-in; the built-in's own
                // chain needs no validation.
                continue;
            }
            if let Some(parent) = descriptor.parent.clone() {
                if !self.classes.contains_key(parent.as_str()) {
                    let span = class.parent.as_ref().map_or(class.name.span, |p| p.span);
                    diagnostics.push(
                        Diagnostic::error(
                            format!("Cannot inherit from undefined class `{parent}`"),
                            span,
                        )
                        .with_category(DiagnosticCategory::Hierarchy)
                        .with_context(DiagnosticContext::class(name.clone())),
                    );
                    self.sound = false;
                    continue;
                }
            }

            let mut visited: HashSet<EcoString> = HashSet::new();
            let mut current = Some(name.clone());
            let mut hit_cycle = false;
            while let Some(cls) = current {
                if cyclic.contains(&cls) {
                    hit_cycle = true;
                    break;
                }
                if !visited.insert(cls.clone()) {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("Inheritance cycle detected involving class `{cls}`"),
                            class.name.span,
                        )
                        .with_hint("Every inheritance chain must reach `Object`")
                        .with_category(DiagnosticCategory::Hierarchy)
                        .with_context(DiagnosticContext::class(name.clone())),
                    );
                    self.sound = false;
                    hit_cycle = true;
                    break;
                }
                current = self.classes.get(cls.as_str()).and_then(|d| d.parent.clone());
            }
            if hit_cycle {
                cyclic.extend(visited);
            }
        }
    }

    /// Warns when a class redeclares an attribute it inherits. The
    /// redeclaration replaces the inherited slot during layout resolution,
    /// so this is suspicious rather than fatal. Only runs on sound tables.
    fn check_attribute_redefinitions(&self, program: &Program, diagnostics: &mut Vec<Diagnostic>) {
        let mut checked: HashSet<EcoString> = HashSet::new();
        for class in &program.classes {
            let name = &class.name.name;
            if !checked.insert(name.clone()) {
                continue;
            }
            let Some(descriptor) = self.classes.get(name.as_str()) else {
                continue;
            };
            if descriptor.builtin {
                continue;
            }
            for attribute in &descriptor.attributes {
                if let Some(ancestor) = self.declaring_ancestor(descriptor, &attribute.name) {
                    diagnostics.push(
                        Diagnostic::warning(
                            format!(
                                "Attribute `{}` in class `{name}` redefines an attribute inherited from `{ancestor}`",
                                attribute.name
                            ),
                            attribute.span,
                        )
                        .with_hint("The subclass declaration replaces the inherited slot")
                        .with_category(DiagnosticCategory::Hierarchy)
                        .with_context(DiagnosticContext::class(name.clone())),
                    );
                }
            }
        }
    }

    /// The nearest strict ancestor of `descriptor` declaring an attribute
    /// with this name, if any.
    fn declaring_ancestor(&self, descriptor: &ClassDescriptor, attribute: &str) -> Option<EcoString> {
        let mut visited = HashSet::new();
        let mut current = descriptor.parent.clone();
        while let Some(cls) = current {
            if !visited.insert(cls.clone()) {
                break;
            }
            let ancestor = self.classes.get(cls.as_str())?;
            if ancestor.attributes.iter().any(|a| a.name == attribute) {
                return Some(cls);
            }
            current = ancestor.parent.clone();
        }
        None
    }

    /// Resolves every user class's attribute layout: inherited slots first
    /// in ancestor declaration order, with redeclarations replacing the
    /// inherited slot in place. Only runs on sound tables, where every
    /// chain is known to reach `Object`.
    fn resolve_layouts(&mut self) {
        let names: Vec<EcoString> = self.classes.keys().cloned().collect();
        for name in names {
            if self.classes.get(name.as_str()).is_some_and(|d| d.builtin) {
                continue;
            }
            let chain = self.ancestry(&name);
            let mut layout: Vec<AttributeSlot> = Vec::new();
            for ancestor in chain.iter().rev() {
                let Some(descriptor) = self.classes.get(ancestor.as_str()) else {
                    continue;
                };
                for attribute in &descriptor.attributes {
                    let slot = AttributeSlot {
                        name: attribute.name.clone(),
                        declared_type: attribute.declared_type.clone(),
                        declaring_class: ancestor.clone(),
                    };
                    if let Some(position) = layout.iter().position(|s| s.name == slot.name) {
                        layout[position] = slot;
                    } else {
                        layout.push(slot);
                    }
                }
            }
            if let Some(descriptor) = self.classes.get_mut(name.as_str()) {
                descriptor.layout = layout;
            }
        }
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}
