//! Pretty-printer from the model back to MOSDL notation.
//!
//! The output parses back to an equal model. Declarations keep model order;
//! references are printed unqualified whenever that resolves to the same
//! target from the printing scope.

use serde::{Deserialize, Serialize};

use crate::model::{
    Area, CapabilitySet, DataType, ErrorDefinition, ErrorReference, Field, Operation, Scope,
    Service, Specification, Stage, TypeReference,
};
use crate::notation::doc::{render_lines, unit_line};
use crate::notation::lexer::escape_string;

const INDENT: &str = "    ";

/// Where comments go in the printed notation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DocMode {
    /// One tagged doc block per declaration covering all its members.
    Bulk,
    /// Every comment next to what it documents.
    #[default]
    Inline,
    /// No comments at all.
    Suppress,
}

pub fn print(spec: &Specification, mode: DocMode) -> String {
    let mut printer = Printer {
        spec,
        mode,
        out: String::new(),
        depth: 0,
    };
    printer.unit();
    printer.out
}

struct Printer<'a> {
    spec: &'a Specification,
    mode: DocMode,
    out: String,
    depth: usize,
}

impl<'a> Printer<'a> {
    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn open(&mut self, header: &str) {
        self.line(&format!("{header} {{"));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth -= 1;
        self.line("}");
    }

    fn doc_block(&mut self, comment: Option<&str>, tags: &[(String, &str)]) {
        if self.mode == DocMode::Suppress {
            return;
        }
        for text in render_lines(comment, tags) {
            if text.is_empty() {
                self.line("///");
            } else {
                self.line(&format!("/// {text}"));
            }
        }
    }

    /// Own comment of a declaration whose members are documented separately.
    fn own_doc(&mut self, comment: Option<&str>) {
        self.doc_block(comment, &[]);
    }

    /// Trailing string literal for a member comment in inline mode.
    fn trailing(&self, comment: Option<&str>) -> String {
        match (self.mode, comment) {
            (DocMode::Inline, Some(text)) => format!(" {}", escape_string(text)),
            _ => String::new(),
        }
    }

    fn bulk(&self) -> bool {
        self.mode == DocMode::Bulk
    }

    fn type_ref(&self, reference: &TypeReference, scope: Scope<'_>) -> String {
        let element = reference.element();
        let mut text = if self.spec.resolve_type(scope, &reference.name).as_ref() == Some(&element) {
            reference.name.clone()
        } else {
            match &reference.service {
                Some(service) => format!("{}.{}.{}", reference.area, service, reference.name),
                None => format!("{}.{}", reference.area, reference.name),
            }
        };
        if reference.list {
            text.push_str("[]");
        }
        text
    }

    fn error_ref_name(&self, error: &ErrorReference, scope: Scope<'_>) -> String {
        let target = self.spec.resolve_error(scope, &error.name);
        let same = target.is_some_and(|t| t.area == error.area && t.service == error.service);
        if same {
            error.name.clone()
        } else {
            error.qualified_name()
        }
    }

    fn unit(&mut self) {
        if self.mode != DocMode::Suppress
            && let Some(comment) = self.spec.comment()
        {
            for text in comment.split('\n') {
                if text.is_empty() {
                    self.line("//!");
                } else {
                    self.line(&format!("//! {}", unit_line(text)));
                }
            }
            self.line("");
        }
        for (idx, area) in self.spec.areas().iter().enumerate() {
            if idx > 0 {
                self.line("");
            }
            self.area(area);
        }
    }

    fn area(&mut self, area: &Area) {
        let scope = Scope::area(&area.name);
        self.own_doc(area.comment.as_deref());
        self.open(&format!("AREA {} {} {}", area.name, area.number, area.version));
        let mut first = true;
        for data_type in &area.data_types {
            self.separate(&mut first);
            self.data_type(data_type, scope);
        }
        if !area.errors.is_empty() {
            self.separate(&mut first);
            self.errors_def(&area.errors, scope);
        }
        for service in &area.services {
            self.separate(&mut first);
            self.service(area, service);
        }
        self.close();
    }

    fn separate(&mut self, first: &mut bool) {
        if !*first {
            self.line("");
        }
        *first = false;
    }

    fn service(&mut self, area: &Area, service: &Service) {
        let scope = Scope::service(&area.name, &service.name);
        self.own_doc(service.comment.as_deref());
        self.open(&format!("SERVICE {} {}", service.name, service.number));
        let mut first = true;
        for data_type in &service.data_types {
            self.separate(&mut first);
            self.data_type(data_type, scope);
        }
        if !service.errors.is_empty() {
            self.separate(&mut first);
            self.errors_def(&service.errors, scope);
        }
        for cs in &service.capability_sets {
            self.separate(&mut first);
            self.capability_set(cs, scope);
        }
        self.close();
    }

    fn capability_set(&mut self, cs: &CapabilitySet, scope: Scope<'_>) {
        self.own_doc(cs.comment.as_deref());
        self.open(&format!("CAPABILITYSET {}", cs.number));
        for (idx, op) in cs.operations.iter().enumerate() {
            if idx > 0 {
                self.line("");
            }
            self.operation(op, scope);
        }
        self.close();
    }

    fn operation(&mut self, op: &Operation, scope: Scope<'_>) {
        let blocks = op.messages.stage_blocks();
        if self.bulk() {
            let mut tags = Vec::new();
            for (name, stage) in &blocks {
                if let Some(comment) = stage.comment.as_deref() {
                    tags.push((name.to_string(), comment));
                }
                for field in &stage.fields {
                    if let Some(comment) = field.comment.as_deref() {
                        tags.push((format!("{name}.{}", field.name), comment));
                    }
                }
            }
            self.doc_block(op.comment.as_deref(), &tags);
        } else {
            self.own_doc(op.comment.as_deref());
        }

        let mut header = format!("{} {} {}", op.pattern().keyword(), op.name, op.number);
        if op.supports_replay {
            header.push_str(" REPLAY");
        }
        self.open(&header);
        for (name, stage) in blocks {
            self.stage(name, stage, scope);
        }
        if let Some(errors) = op.messages.errors()
            && !errors.is_empty()
        {
            if self.bulk() {
                let tags: Vec<(String, &str)> = errors
                    .iter()
                    .filter_map(|e| e.comment.as_deref().map(|c| (e.name.clone(), c)))
                    .collect();
                self.doc_block(None, &tags);
            }
            self.open("ERRORS");
            for error in errors {
                let mut text = self.error_ref_name(error, scope);
                if let Some(extra) = &error.extra_information {
                    text.push_str(&format!(" EXTRA {}", self.type_ref(extra, scope)));
                }
                text.push_str(&self.trailing(error.comment.as_deref()));
                self.line(&text);
            }
            self.close();
        }
        self.close();
    }

    fn stage(&mut self, name: &str, stage: &Stage, scope: Scope<'_>) {
        if !self.bulk() {
            self.own_doc(stage.comment.as_deref());
        }
        if stage.fields.is_empty() {
            self.line(&format!("{name} {{ }}"));
            return;
        }
        self.open(name);
        self.fields(&stage.fields, scope);
        self.close();
    }

    fn fields(&mut self, fields: &[Field], scope: Scope<'_>) {
        for field in fields {
            let mut text = format!("{}: {}", field.name, self.type_ref(&field.type_ref, scope));
            if field.nullable {
                text.push('?');
            }
            text.push_str(&self.trailing(field.comment.as_deref()));
            self.line(&text);
        }
    }

    fn errors_def(&mut self, errors: &[ErrorDefinition], scope: Scope<'_>) {
        if self.bulk() {
            let tags: Vec<(String, &str)> = errors
                .iter()
                .filter_map(|e| e.comment.as_deref().map(|c| (e.name.clone(), c)))
                .collect();
            self.doc_block(None, &tags);
        }
        self.open("ERRORS");
        for error in errors {
            let mut text = format!("{} {}", error.name, error.number);
            if let Some(extra) = &error.extra_information {
                text.push_str(&format!(" EXTRA {}", self.type_ref(extra, scope)));
            }
            text.push_str(&self.trailing(error.comment.as_deref()));
            self.line(&text);
        }
        self.close();
    }

    fn data_type(&mut self, data_type: &DataType, scope: Scope<'_>) {
        match data_type {
            DataType::Fundamental(t) => {
                self.own_doc(t.comment.as_deref());
                let mut text = format!("FUNDAMENTAL {}", t.name);
                if let Some(parent) = &t.extends {
                    text.push_str(&format!(" EXTENDS {}", self.type_ref(parent, scope)));
                }
                self.line(&text);
            }
            DataType::Attribute(t) => {
                self.own_doc(t.comment.as_deref());
                let mut text = format!("ATTRIBUTE {}", t.name);
                if let Some(sf) = t.short_form {
                    text.push_str(&format!(" {sf}"));
                }
                self.line(&text);
            }
            DataType::Enumeration(t) => {
                if self.bulk() {
                    let tags: Vec<(String, &str)> = t
                        .items
                        .iter()
                        .filter_map(|i| i.comment.as_deref().map(|c| (i.value.clone(), c)))
                        .collect();
                    self.doc_block(t.comment.as_deref(), &tags);
                } else {
                    self.own_doc(t.comment.as_deref());
                }
                let mut header = format!("ENUM {}", t.name);
                if let Some(sf) = t.short_form {
                    header.push_str(&format!(" {sf}"));
                }
                self.open(&header);
                for item in &t.items {
                    let mut text = item.value.clone();
                    if let Some(n) = item.numeric_value {
                        text.push_str(&format!(" = {n}"));
                    }
                    text.push_str(&self.trailing(item.comment.as_deref()));
                    self.line(&text);
                }
                self.close();
            }
            DataType::Composite(t) => {
                if self.bulk() {
                    let tags: Vec<(String, &str)> = t
                        .fields
                        .iter()
                        .filter_map(|f| f.comment.as_deref().map(|c| (f.name.clone(), c)))
                        .collect();
                    self.doc_block(t.comment.as_deref(), &tags);
                } else {
                    self.own_doc(t.comment.as_deref());
                }
                let mut header = format!("COMPOSITE {}", t.name);
                if let Some(sf) = t.short_form {
                    header.push_str(&format!(" {sf}"));
                }
                if let Some(parent) = &t.extends {
                    header.push_str(&format!(" EXTENDS {}", self.type_ref(parent, scope)));
                }
                if t.fields.is_empty() {
                    self.line(&format!("{header} {{ }}"));
                    return;
                }
                self.open(&header);
                self.fields(&t.fields, scope);
                self.close();
            }
        }
    }
}
