//! Recursive-descent parser from tokens to draft declarations.
//!
//! In recovery mode a failing declaration is recorded, skipped up to its
//! closing brace (or the next declaration keyword) and parsing continues.

use std::sync::Arc;

use crate::error::{Location, ParseError, SemanticError, SyntaxError};
use crate::model::types::DISCRIMINANT_NAME;
use crate::model::InteractionPattern;
use crate::notation::ast::*;
use crate::notation::doc::{self, DocBlock, single_comment};
use crate::notation::lexer::{Keyword, Lexer, Token, TokenKind, TokenKind as TK};

/// Parse one source file into a draft unit plus the recovered diagnostics.
pub fn parse_source(
    source: &str,
    file: Option<Arc<str>>,
    recover: bool,
) -> Result<(UnitDraft, Vec<ParseError>), ParseError> {
    let lexed = Lexer::new(source, file).tokenize();
    let mut diagnostics = Vec::new();
    for err in lexed.errors {
        if !recover {
            return Err(err.into());
        }
        diagnostics.push(err.into());
    }

    let mut parser = Parser::new(&lexed.tokens, recover);
    let mut unit = parser.parse_unit()?;
    if !lexed.unit_doc.is_empty() {
        unit.comment = Some(
            lexed
                .unit_doc
                .iter()
                .map(|line| doc::parse_unit_line(line))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }
    diagnostics.extend(parser.diagnostics);
    Ok((unit, diagnostics))
}

enum Member {
    Service(ServiceDraft),
    Type(TypeDraft),
    Errors(Vec<ErrorDefDraft>),
    CapabilitySet(CapabilitySetDraft),
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    recover: bool,
    diagnostics: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with `Eof`, as produced by the lexer.
    pub fn new(tokens: &'a [Token], recover: bool) -> Self {
        Parser {
            tokens,
            pos: 0,
            recover,
            diagnostics: Vec::new(),
        }
    }

    fn curr(&self) -> &'a Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn location(&self) -> Location {
        self.curr().location.clone()
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.curr().kind == *kind
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        SyntaxError::new(
            self.location(),
            format!("expected {expected}, found {}", self.curr().kind),
        )
        .into()
    }

    fn consume(&mut self, expected: &TokenKind) -> Result<(), ParseError> {
        if self.at(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn consume_keyword(&mut self, kw: Keyword) -> Result<Location, ParseError> {
        let location = self.location();
        self.consume(&TK::Keyword(kw))?;
        Ok(location)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Identifiers; keywords are accepted too wherever a name is expected.
    fn parse_name(&mut self, what: &str) -> Result<String, ParseError> {
        let name = match &self.curr().kind {
            TK::Ident(name) => name.clone(),
            TK::Keyword(kw) => kw.as_str().to_string(),
            _ => return Err(self.unexpected(what)),
        };
        self.advance();
        Ok(name)
    }

    fn parse_int(&mut self, what: &str) -> Result<u32, ParseError> {
        if let TK::IntLit(value) = self.curr().kind {
            self.advance();
            Ok(value)
        } else {
            Err(self.unexpected(what))
        }
    }

    fn parse_positive(&mut self, kind: &'static str, name: &str) -> Result<u32, ParseError> {
        let location = self.location();
        let value = self.parse_int(&format!("{kind} number"))?;
        if value == 0 {
            return Err(SemanticError::NonPositiveNumber {
                kind,
                name: name.to_string(),
                location: Some(location),
            }
            .into());
        }
        Ok(value)
    }

    fn parse_opt_int(&mut self) -> Option<u32> {
        if let TK::IntLit(value) = self.curr().kind {
            self.advance();
            Some(value)
        } else {
            None
        }
    }

    fn parse_opt_string(&mut self) -> Option<String> {
        if let TK::StringLit(value) = &self.curr().kind {
            self.advance();
            Some(value.clone())
        } else {
            None
        }
    }

    fn parse_doc(&mut self) -> Result<Option<DocBlock>, ParseError> {
        let mut lines = Vec::new();
        while let TK::DocLine(text) = &self.curr().kind {
            lines.push((text.clone(), self.location()));
            self.advance();
        }
        if lines.is_empty() {
            return Ok(None);
        }
        Ok(Some(DocBlock::parse(&lines)?))
    }

    /// Doc block of a declaration that has no tagged members.
    fn plain_doc(doc: Option<DocBlock>) -> Result<Option<String>, ParseError> {
        match doc {
            Some(doc) => Ok(doc.finish()?),
            None => Ok(None),
        }
    }

    fn reject_dangling_doc(&self, doc: Option<DocBlock>) -> Result<(), ParseError> {
        match doc {
            Some(doc) => Err(SyntaxError::new(
                doc.location,
                "doc comment is not followed by a declaration",
            )
            .into()),
            None => Ok(()),
        }
    }

    /// Record `result`'s error in recovery mode and skip the declaration that
    /// started at token `start`.
    fn recovering<T>(
        &mut self,
        start: usize,
        result: Result<T, ParseError>,
    ) -> Result<Option<T>, ParseError> {
        match result {
            Ok(item) => Ok(Some(item)),
            Err(err) if self.recover => {
                self.diagnostics.push(err);
                self.synchronize(start);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn synchronize(&mut self, start: usize) {
        self.pos = start;
        while matches!(self.curr().kind, TK::DocLine(_)) {
            self.advance();
        }
        if !self.at(&TK::Eof) {
            self.advance();
        }
        let mut depth = 0usize;
        loop {
            match &self.curr().kind {
                TK::Eof => break,
                TK::LBrace => depth += 1,
                TK::RBrace if depth == 0 => break,
                TK::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                }
                TK::DocLine(_) if depth == 0 => break,
                TK::Keyword(kw) if depth == 0 && kw.starts_declaration() => break,
                _ => {}
            }
            self.advance();
        }
    }

    fn expect_body_end(&self, container: &str) -> Result<(), ParseError> {
        if self.at(&TK::Eof) {
            return Err(SyntaxError::new(
                self.location(),
                format!("unexpected end of file inside {container}"),
            )
            .into());
        }
        Ok(())
    }

    pub fn parse_unit(&mut self) -> Result<UnitDraft, ParseError> {
        let mut unit = UnitDraft::default();
        while !self.at(&TK::Eof) {
            let start = self.pos;
            let result = self.parse_area();
            if let Some(area) = self.recovering(start, result)? {
                unit.areas.push(area);
            }
        }
        Ok(unit)
    }

    fn parse_area(&mut self) -> Result<AreaDraft, ParseError> {
        let doc = self.parse_doc()?;
        if self.at(&TK::Eof) {
            self.reject_dangling_doc(doc)?;
            return Err(self.unexpected("AREA"));
        }
        let location = self.consume_keyword(Keyword::Area)?;
        let name = self.parse_name("area name")?;
        let number = self.parse_positive("area", &name)?;
        let version = self.parse_positive("area version", &name)?;
        self.consume(&TK::LBrace)?;

        let mut area = AreaDraft {
            comment: Self::plain_doc(doc)?,
            name,
            number,
            version,
            data_types: Vec::new(),
            errors: Vec::new(),
            services: Vec::new(),
            location,
        };

        while !self.at(&TK::RBrace) {
            self.expect_body_end("an AREA")?;
            let start = self.pos;
            let result = self.parse_member(false);
            match self.recovering(start, result)? {
                Some(Member::Service(service)) => area.services.push(service),
                Some(Member::Type(data_type)) => area.data_types.push(data_type),
                Some(Member::Errors(errors)) => area.errors.extend(errors),
                Some(Member::CapabilitySet(_)) | None => {}
            }
        }
        self.consume(&TK::RBrace)?;
        Ok(area)
    }

    /// A member of an area (`in_service == false`) or service body.
    fn parse_member(&mut self, in_service: bool) -> Result<Member, ParseError> {
        let doc = self.parse_doc()?;
        let TK::Keyword(kw) = self.curr().kind else {
            self.reject_dangling_doc(doc)?;
            return Err(self.unexpected("a declaration"));
        };
        match kw {
            Keyword::Service if !in_service => Ok(Member::Service(self.parse_service(doc)?)),
            Keyword::CapabilitySet if in_service => {
                Ok(Member::CapabilitySet(self.parse_capability_set(doc)?))
            }
            Keyword::Composite | Keyword::Enum | Keyword::Attribute | Keyword::Fundamental => {
                let data_type = self.parse_data_type(doc)?;
                let misplaced = matches!(
                    data_type.body,
                    TypeBody::Fundamental { .. } | TypeBody::Attribute { .. }
                );
                if in_service && misplaced {
                    return Err(SemanticError::MisplacedType {
                        kind: kw_kind(kw),
                        name: data_type.name,
                        scope: "a service".to_string(),
                        location: Some(data_type.location),
                    }
                    .into());
                }
                Ok(Member::Type(data_type))
            }
            Keyword::Errors => Ok(Member::Errors(self.parse_errors_def(doc)?)),
            _ => Err(self.unexpected("a declaration")),
        }
    }

    fn parse_service(&mut self, doc: Option<DocBlock>) -> Result<ServiceDraft, ParseError> {
        let location = self.consume_keyword(Keyword::Service)?;
        let name = self.parse_name("service name")?;
        let number = self.parse_positive("service", &name)?;
        self.consume(&TK::LBrace)?;

        let mut service = ServiceDraft {
            comment: Self::plain_doc(doc)?,
            name,
            number,
            data_types: Vec::new(),
            errors: Vec::new(),
            capability_sets: Vec::new(),
            location,
        };

        while !self.at(&TK::RBrace) {
            self.expect_body_end("a SERVICE")?;
            let start = self.pos;
            let result = self.parse_member(true);
            match self.recovering(start, result)? {
                Some(Member::CapabilitySet(cs)) => service.capability_sets.push(cs),
                Some(Member::Type(data_type)) => service.data_types.push(data_type),
                Some(Member::Errors(errors)) => service.errors.extend(errors),
                Some(Member::Service(_)) | None => {}
            }
        }
        self.consume(&TK::RBrace)?;
        Ok(service)
    }

    fn parse_capability_set(
        &mut self,
        doc: Option<DocBlock>,
    ) -> Result<CapabilitySetDraft, ParseError> {
        let location = self.consume_keyword(Keyword::CapabilitySet)?;
        let number_at = self.location();
        let number = self.parse_int("capability set number")?;
        if number == 0 {
            return Err(SemanticError::NonPositiveNumber {
                kind: "capability set",
                name: number.to_string(),
                location: Some(number_at),
            }
            .into());
        }
        self.consume(&TK::LBrace)?;

        let mut cs = CapabilitySetDraft {
            number,
            comment: Self::plain_doc(doc)?,
            operations: Vec::new(),
            location,
        };
        while !self.at(&TK::RBrace) {
            self.expect_body_end("a CAPABILITYSET")?;
            let start = self.pos;
            let result = self.parse_operation();
            if let Some(op) = self.recovering(start, result)? {
                cs.operations.push(op);
            }
        }
        self.consume(&TK::RBrace)?;
        Ok(cs)
    }

    fn parse_operation(&mut self) -> Result<OperationDraft, ParseError> {
        let doc = self.parse_doc()?;
        let location = self.location();
        let pattern = match &self.curr().kind {
            TK::Keyword(kw) => InteractionPattern::from_keyword(kw.as_str()),
            _ => None,
        };
        let Some(pattern) = pattern else {
            self.reject_dangling_doc(doc)?;
            return Err(self.unexpected("an operation"));
        };
        self.advance();

        let name = self.parse_name("operation name")?;
        let number = self.parse_positive("operation", &name)?;
        let supports_replay = self.eat(&TK::Keyword(Keyword::Replay));
        self.consume(&TK::LBrace)?;

        let names = pattern.stage_names();
        let mut stages = vec![StageDraft::default(); names.len()];
        let mut next_stage = 0;
        let mut errors = Vec::new();

        loop {
            let stage_doc = self.parse_doc()?;
            match (&self.curr().kind, self.peek_kind()) {
                (TK::Ident(stage_name), Some(TK::LBrace)) => {
                    let at = self.location();
                    let Some(idx) = names.iter().position(|n| *n == stage_name.as_str()) else {
                        return Err(SyntaxError::new(
                            at,
                            format!(
                                "`{stage_name}` is not a stage of {} operations (expected {})",
                                pattern.keyword(),
                                names.join(", ")
                            ),
                        )
                        .into());
                    };
                    if idx < next_stage {
                        return Err(SyntaxError::new(
                            at,
                            format!("stage `{stage_name}` is repeated or out of order"),
                        )
                        .into());
                    }
                    self.advance();
                    stages[idx] = self.parse_stage_body(stage_doc)?;
                    next_stage = idx + 1;
                }
                (TK::Keyword(Keyword::Errors), _) => {
                    if !pattern.has_errors() {
                        return Err(SyntaxError::new(
                            self.location(),
                            "SEND operations cannot declare errors",
                        )
                        .into());
                    }
                    errors = self.parse_errors_ref(stage_doc)?;
                    if !self.at(&TK::RBrace) {
                        return Err(self.unexpected("`}` after the ERRORS block"));
                    }
                }
                (TK::RBrace, _) => {
                    self.reject_dangling_doc(stage_doc)?;
                    break;
                }
                _ => {
                    self.reject_dangling_doc(stage_doc)?;
                    return Err(self.unexpected("a stage, ERRORS or `}`"));
                }
            }
        }
        self.consume(&TK::RBrace)?;

        let mut operation = OperationDraft {
            pattern,
            name,
            number,
            comment: None,
            supports_replay,
            stages,
            errors,
            location,
        };
        if let Some(mut doc) = doc {
            for (stage_name, stage) in names.iter().zip(operation.stages.iter_mut()) {
                let tagged = doc.take(stage_name);
                let what = format!("stage `{stage_name}`");
                stage.comment = single_comment(stage.comment.take(), tagged, &what, &doc.location)?;
                for field in &mut stage.fields {
                    let tagged = doc.take(&format!("{stage_name}.{}", field.name));
                    let what = format!("field `{}`", field.name);
                    field.comment = single_comment(field.comment.take(), tagged, &what, &field.location)?;
                }
            }
            for error in &mut operation.errors {
                let Some(name) = error.target.parts.last() else {
                    continue;
                };
                let tagged = doc.take(name);
                let what = format!("error `{name}`");
                error.comment =
                    single_comment(error.comment.take(), tagged, &what, &error.target.location)?;
            }
            operation.comment = doc.finish()?;
        }
        Ok(operation)
    }

    fn parse_stage_body(&mut self, doc: Option<DocBlock>) -> Result<StageDraft, ParseError> {
        self.consume(&TK::LBrace)?;
        let fields = self.parse_fields("a stage")?;
        Ok(StageDraft {
            comment: Self::plain_doc(doc)?,
            fields,
        })
    }

    /// Fields up to and including the closing brace.
    fn parse_fields(&mut self, container: &str) -> Result<Vec<FieldDraft>, ParseError> {
        let mut fields = Vec::new();
        loop {
            let doc = self.parse_doc()?;
            if self.at(&TK::RBrace) {
                self.reject_dangling_doc(doc)?;
                break;
            }
            self.expect_body_end(container)?;
            fields.push(self.parse_field(doc)?);
        }
        self.consume(&TK::RBrace)?;
        Ok(fields)
    }

    fn parse_field(&mut self, doc: Option<DocBlock>) -> Result<FieldDraft, ParseError> {
        let location = self.location();
        let name = self.parse_name("field name")?;
        self.consume(&TK::Colon)?;
        let type_ref = self.parse_ref("a type name", true)?;
        let nullable = self.eat(&TK::Question);
        let trailing = self.parse_opt_string();
        let what = format!("field `{name}`");
        let comment = single_comment(Self::plain_doc(doc)?, trailing, &what, &location)?;
        Ok(FieldDraft {
            name,
            type_ref,
            nullable,
            comment,
            location,
        })
    }

    fn parse_ref(&mut self, what: &str, allow_list: bool) -> Result<RawRef, ParseError> {
        let location = self.location();
        let mut parts = vec![self.parse_name(what)?];
        while self.at(&TK::Dot) {
            if parts.len() == 3 {
                return Err(SyntaxError::new(
                    self.location(),
                    "references have at most three parts (Area.Service.Name)",
                )
                .into());
            }
            self.advance();
            parts.push(self.parse_name(what)?);
        }
        let list = allow_list && self.eat(&TK::LBracket);
        if list {
            self.consume(&TK::RBracket)?;
        }
        Ok(RawRef {
            parts,
            list,
            location,
        })
    }

    fn parse_extends(&mut self) -> Result<Option<RawRef>, ParseError> {
        if self.eat(&TK::Keyword(Keyword::Extends)) {
            Ok(Some(self.parse_ref("a parent type", false)?))
        } else {
            Ok(None)
        }
    }

    fn parse_extra(&mut self) -> Result<Option<RawRef>, ParseError> {
        if self.eat(&TK::Keyword(Keyword::Extra)) {
            Ok(Some(self.parse_ref("an extra information type", true)?))
        } else {
            Ok(None)
        }
    }

    fn parse_data_type(&mut self, doc: Option<DocBlock>) -> Result<TypeDraft, ParseError> {
        let location = self.location();
        let TK::Keyword(kw) = self.curr().kind else {
            return Err(self.unexpected("a data type"));
        };
        self.advance();
        let name = self.parse_name("type name")?;

        let (body, comment) = match kw {
            Keyword::Fundamental => {
                let extends = self.parse_extends()?;
                let trailing = self.parse_opt_string();
                let comment = single_comment(Self::plain_doc(doc)?, trailing, &name, &location)?;
                (TypeBody::Fundamental { extends }, comment)
            }
            Keyword::Attribute => {
                let short_form = self.parse_short_form("attribute", &name)?;
                let trailing = self.parse_opt_string();
                let comment = single_comment(Self::plain_doc(doc)?, trailing, &name, &location)?;
                (TypeBody::Attribute { short_form }, comment)
            }
            Keyword::Enum => {
                let short_form = self.parse_short_form("enumeration", &name)?;
                self.consume(&TK::LBrace)?;
                let mut items = self.parse_items()?;
                let comment = match doc {
                    Some(mut doc) => {
                        for item in &mut items {
                            let tagged = doc.take(&item.value);
                            let what = format!("item `{}`", item.value);
                            item.comment =
                                single_comment(item.comment.take(), tagged, &what, &item.location)?;
                        }
                        doc.finish()?
                    }
                    None => None,
                };
                (TypeBody::Enumeration { short_form, items }, comment)
            }
            Keyword::Composite => {
                let short_form_at = self.location();
                let short_form = self.parse_opt_int();
                if short_form == Some(0) {
                    return Err(SemanticError::InconsistentDiscriminant {
                        composite: name,
                        reason: "short form must be positive".to_string(),
                        location: Some(short_form_at),
                    }
                    .into());
                }
                let extends = self.parse_extends()?;
                self.consume(&TK::LBrace)?;
                let mut fields = self.parse_fields("a COMPOSITE")?;
                if let Some(field) = fields.iter().find(|f| f.name == DISCRIMINANT_NAME) {
                    return Err(SemanticError::InconsistentDiscriminant {
                        composite: name,
                        reason: format!(
                            "field `{}` collides with the discriminant attribute",
                            DISCRIMINANT_NAME
                        ),
                        location: Some(field.location.clone()),
                    }
                    .into());
                }
                let comment = match doc {
                    Some(mut doc) => {
                        for field in &mut fields {
                            let tagged = doc.take(&field.name);
                            let what = format!("field `{}`", field.name);
                            field.comment =
                                single_comment(field.comment.take(), tagged, &what, &field.location)?;
                        }
                        doc.finish()?
                    }
                    None => None,
                };
                let body = TypeBody::Composite {
                    short_form,
                    extends,
                    fields,
                };
                (body, comment)
            }
            _ => return Err(self.unexpected("a data type")),
        };

        Ok(TypeDraft {
            name,
            comment,
            body,
            location,
        })
    }

    fn parse_short_form(
        &mut self,
        kind: &'static str,
        name: &str,
    ) -> Result<Option<u32>, ParseError> {
        if matches!(self.curr().kind, TK::IntLit(_)) {
            Ok(Some(self.parse_positive(kind, name)?))
        } else {
            Ok(None)
        }
    }

    fn parse_items(&mut self) -> Result<Vec<ItemDraft>, ParseError> {
        let mut items = Vec::new();
        loop {
            let doc = self.parse_doc()?;
            if self.at(&TK::RBrace) {
                self.reject_dangling_doc(doc)?;
                break;
            }
            self.expect_body_end("an ENUM")?;
            let location = self.location();
            let value = self.parse_name("enumeration item")?;
            let numeric_value = if self.eat(&TK::Equals) {
                Some(self.parse_int("item value")?)
            } else {
                None
            };
            let trailing = self.parse_opt_string();
            let what = format!("item `{value}`");
            let comment = single_comment(Self::plain_doc(doc)?, trailing, &what, &location)?;
            items.push(ItemDraft {
                value,
                numeric_value,
                comment,
                location,
            });
        }
        self.consume(&TK::RBrace)?;
        Ok(items)
    }

    /// The doc block in front of an ERRORS block only tags its entries.
    fn errors_doc(doc: Option<DocBlock>) -> Result<Option<DocBlock>, ParseError> {
        match doc {
            Some(doc) if doc.comment.is_some() => Err(SyntaxError::new(
                doc.location,
                "an ERRORS block has no comment of its own; tag its entries with `@NAME`",
            )
            .into()),
            other => Ok(other),
        }
    }

    fn parse_errors_def(&mut self, doc: Option<DocBlock>) -> Result<Vec<ErrorDefDraft>, ParseError> {
        let mut doc = Self::errors_doc(doc)?;
        self.consume_keyword(Keyword::Errors)?;
        self.consume(&TK::LBrace)?;
        let mut errors = Vec::new();
        loop {
            let entry_doc = self.parse_doc()?;
            if self.at(&TK::RBrace) {
                self.reject_dangling_doc(entry_doc)?;
                break;
            }
            self.expect_body_end("an ERRORS block")?;
            let location = self.location();
            let name = self.parse_name("error name")?;
            let number = self.parse_positive("error", &name)?;
            let extra_information = self.parse_extra()?;
            let trailing = self.parse_opt_string();
            let what = format!("error `{name}`");
            let mut comment = single_comment(Self::plain_doc(entry_doc)?, trailing, &what, &location)?;
            if let Some(block) = doc.as_mut() {
                comment = single_comment(comment, block.take(&name), &what, &location)?;
            }
            errors.push(ErrorDefDraft {
                name,
                number,
                comment,
                extra_information,
                location,
            });
        }
        self.consume(&TK::RBrace)?;
        if let Some(block) = doc {
            block.finish()?;
        }
        Ok(errors)
    }

    /// Error references; leaves the operation's closing brace in place.
    fn parse_errors_ref(&mut self, doc: Option<DocBlock>) -> Result<Vec<ErrorRefDraft>, ParseError> {
        let mut doc = Self::errors_doc(doc)?;
        self.consume_keyword(Keyword::Errors)?;
        self.consume(&TK::LBrace)?;
        let mut errors = Vec::new();
        loop {
            let entry_doc = self.parse_doc()?;
            if self.at(&TK::RBrace) {
                self.reject_dangling_doc(entry_doc)?;
                break;
            }
            self.expect_body_end("an ERRORS block")?;
            let target = self.parse_ref("an error name", false)?;
            let extra_information = self.parse_extra()?;
            let trailing = self.parse_opt_string();
            let what = format!("error `{}`", target.dotted());
            let mut comment =
                single_comment(Self::plain_doc(entry_doc)?, trailing, &what, &target.location)?;
            if let (Some(block), Some(name)) = (doc.as_mut(), target.parts.last()) {
                comment = single_comment(comment, block.take(name), &what, &target.location)?;
            }
            errors.push(ErrorRefDraft {
                target,
                comment,
                extra_information,
            });
        }
        self.consume(&TK::RBrace)?;
        if let Some(block) = doc {
            block.finish()?;
        }
        Ok(errors)
    }
}

fn kw_kind(kw: Keyword) -> &'static str {
    match kw {
        Keyword::Fundamental => "fundamental",
        Keyword::Attribute => "attribute",
        Keyword::Enum => "enumeration",
        _ => "composite",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(source: &str) -> UnitDraft {
        let (unit, diagnostics) = parse_source(source, None, false).unwrap();
        assert!(diagnostics.is_empty());
        unit
    }

    fn parse_err(source: &str) -> ParseError {
        parse_source(source, None, false).unwrap_err()
    }

    #[test]
    fn test_area_with_members() {
        let unit = parse(indoc! {r#"
            //! The unit.
            /// An area.
            AREA Demo 42 3 {
                ATTRIBUTE Tiny 1 "small"
                ENUM Color 2 {
                    RED = 1
                    GREEN "go"
                }
                ERRORS {
                    BAD 7 EXTRA String "bad things"
                }
                SERVICE Svc 1 {
                    COMPOSITE Point 3 EXTENDS MAL.Composite {
                        x: Integer
                        y: Integer? "optional"
                    }
                }
            }
        "#});
        assert_eq!(unit.comment.as_deref(), Some("The unit."));
        let area = &unit.areas[0];
        assert_eq!((area.name.as_str(), area.number, area.version), ("Demo", 42, 3));
        assert_eq!(area.comment.as_deref(), Some("An area."));
        assert_eq!(area.data_types.len(), 2);
        assert_eq!(area.errors[0].comment.as_deref(), Some("bad things"));
        let service = &area.services[0];
        let TypeBody::Composite { fields, extends, short_form } = &service.data_types[0].body else {
            panic!("expected composite");
        };
        assert_eq!(*short_form, Some(3));
        assert_eq!(extends.as_ref().map(RawRef::dotted).as_deref(), Some("MAL.Composite"));
        assert!(!fields[0].nullable);
        assert!(fields[1].nullable);
        assert_eq!(fields[1].comment.as_deref(), Some("optional"));
    }

    #[test]
    fn test_operation_stages_and_tags() {
        let unit = parse(indoc! {r#"
            AREA A 1 1 {
                SERVICE S 1 {
                    CAPABILITYSET 1 {
                        /// Does work.
                        /// @request the input
                        /// @response.out the result
                        /// @FAILED when it fails
                        REQUEST work 1 REPLAY {
                            request { in: String[] }
                            response { out: Integer? }
                            ERRORS { FAILED }
                        }
                        PROGRESS slow 2 {
                            update { pct: UOctet }
                        }
                    }
                }
            }
        "#});
        let ops = &unit.areas[0].services[0].capability_sets[0].operations;
        let work = &ops[0];
        assert!(work.supports_replay);
        assert_eq!(work.comment.as_deref(), Some("Does work."));
        assert_eq!(work.stages[0].comment.as_deref(), Some("the input"));
        assert!(work.stages[0].fields[0].type_ref.list);
        assert_eq!(work.stages[1].fields[0].comment.as_deref(), Some("the result"));
        assert_eq!(work.errors[0].comment.as_deref(), Some("when it fails"));

        let slow = &ops[1];
        assert_eq!(slow.stages.len(), 4);
        assert!(slow.stages[0].fields.is_empty());
        assert_eq!(slow.stages[2].fields[0].name, "pct");
    }

    #[test]
    fn test_keywords_usable_as_names() {
        let unit = parse("AREA A 1 1 { ENUM Kind 1 { SEND REQUEST } }");
        let TypeBody::Enumeration { items, .. } = &unit.areas[0].data_types[0].body else {
            panic!("expected enumeration");
        };
        assert_eq!(items[1].value, "REQUEST");
    }

    #[test]
    fn test_stage_out_of_order() {
        let err = parse_err(indoc! {"
            AREA A 1 1 { SERVICE S 1 { CAPABILITYSET 1 {
                REQUEST op 1 { response { } request { } }
            } } }
        "});
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn test_unknown_stage() {
        let err = parse_err("AREA A 1 1 { SERVICE S 1 { CAPABILITYSET 1 { SEND op 1 { update { } } } } }");
        assert!(err.to_string().contains("not a stage of SEND"));
    }

    #[test]
    fn test_send_cannot_declare_errors() {
        let err = parse_err("AREA A 1 1 { SERVICE S 1 { CAPABILITYSET 1 { SEND op 1 { ERRORS { X } } } } }");
        assert!(err.to_string().contains("cannot declare errors"));
    }

    #[test]
    fn test_attribute_in_service_is_misplaced() {
        let err = parse_err("AREA A 1 1 { SERVICE S 1 { ATTRIBUTE Odd 1 } }");
        assert!(matches!(
            err,
            ParseError::Semantic(SemanticError::MisplacedType { .. })
        ));
    }

    #[test]
    fn test_zero_number_rejected_with_location() {
        let err = parse_err("AREA A 0 1 { }");
        assert!(matches!(
            err,
            ParseError::Semantic(SemanticError::NonPositiveNumber { .. })
        ));
        assert_eq!(err.location().map(|l| l.column), Some(8));
    }

    #[test]
    fn test_discriminant_field_rejected() {
        let err = parse_err("AREA A 1 1 { COMPOSITE C 1 { type: Integer } }");
        assert!(matches!(
            err,
            ParseError::Semantic(SemanticError::InconsistentDiscriminant { .. })
        ));
    }

    #[test]
    fn test_comment_given_twice() {
        let err = parse_err("AREA A 1 1 { COMPOSITE C 1 {\n/// doc\nx: Integer \"inline\"\n} }");
        assert!(err.to_string().contains("documented twice"));
    }

    #[test]
    fn test_recovery_skips_broken_declarations() {
        let source = indoc! {"
            AREA A 1 1 {
                COMPOSITE Broken 1 { x Integer }
                COMPOSITE Fine 2 { y: Integer }
                ENUM AlsoBroken { = }
                ENUM Ok 3 { ONE }
            }
            AREA B 2 1 { @ }
        "};
        let (unit, diagnostics) = parse_source(source, None, true).unwrap();
        assert_eq!(diagnostics.len(), 3);
        let names: Vec<_> = unit.areas[0].data_types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Fine", "Ok"]);
        assert_eq!(unit.areas.len(), 2);
    }

    #[test]
    fn test_dangling_doc_rejected() {
        let err = parse_err("AREA A 1 1 { /// orphan\n }");
        assert!(err.to_string().contains("not followed by a declaration"));
    }
}
