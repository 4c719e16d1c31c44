//! Specification hierarchy: areas, services, capability sets, operations.

use crate::error::SemanticError;
use crate::model::types::{DataType, ErrorDefinition, ErrorReference, Field};
use crate::model::resolve::NameIndex;
use crate::model::validate;

/// A validated, immutable MO service specification.
///
/// The only way to obtain one is [`Specification::new`], which enforces the
/// structural invariants. Consumers get read-only access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    comment: Option<String>,
    areas: Vec<Area>,
    names: NameIndex,
}

impl Specification {
    pub fn new(comment: Option<String>, areas: Vec<Area>) -> Result<Self, SemanticError> {
        validate::check_areas(&areas)?;
        let names = NameIndex::of_areas(&areas);
        Ok(Self {
            comment,
            areas,
            names,
        })
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn area(&self, name: &str) -> Option<&Area> {
        self.areas.iter().find(|a| a.name == name)
    }

    pub(crate) fn names(&self) -> &NameIndex {
        &self.names
    }

    /// The same specification with every comment removed.
    pub fn without_comments(&self) -> Specification {
        Specification {
            comment: None,
            areas: self.areas.iter().map(Area::without_comments).collect(),
            names: self.names.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    pub name: String,
    pub number: u32,
    pub version: u32,
    pub comment: Option<String>,
    pub data_types: Vec<DataType>,
    pub errors: Vec<ErrorDefinition>,
    pub services: Vec<Service>,
}

impl Area {
    pub fn data_type(&self, name: &str) -> Option<&DataType> {
        self.data_types.iter().find(|t| t.name() == name)
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn error(&self, name: &str) -> Option<&ErrorDefinition> {
        self.errors.iter().find(|e| e.name == name)
    }

    fn without_comments(&self) -> Area {
        Area {
            comment: None,
            data_types: self.data_types.iter().map(strip_data_type).collect(),
            errors: self.errors.iter().map(strip_error).collect(),
            services: self.services.iter().map(Service::without_comments).collect(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub number: u32,
    pub comment: Option<String>,
    pub data_types: Vec<DataType>,
    pub errors: Vec<ErrorDefinition>,
    pub capability_sets: Vec<CapabilitySet>,
}

impl Service {
    pub fn data_type(&self, name: &str) -> Option<&DataType> {
        self.data_types.iter().find(|t| t.name() == name)
    }

    pub fn error(&self, name: &str) -> Option<&ErrorDefinition> {
        self.errors.iter().find(|e| e.name == name)
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.capability_sets.iter().flat_map(|cs| cs.operations.iter())
    }

    fn without_comments(&self) -> Service {
        Service {
            comment: None,
            data_types: self.data_types.iter().map(strip_data_type).collect(),
            errors: self.errors.iter().map(strip_error).collect(),
            capability_sets: self
                .capability_sets
                .iter()
                .map(|cs| CapabilitySet {
                    number: cs.number,
                    comment: None,
                    operations: cs.operations.iter().map(Operation::without_comments).collect(),
                })
                .collect(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet {
    pub number: u32,
    pub comment: Option<String>,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub number: u32,
    pub comment: Option<String>,
    pub supports_replay: bool,
    pub messages: Messages,
}

impl Operation {
    pub fn pattern(&self) -> InteractionPattern {
        self.messages.pattern()
    }

    fn without_comments(&self) -> Operation {
        let strip_stage = |stage: &Stage| Stage {
            comment: None,
            fields: stage.fields.iter().map(strip_field).collect(),
        };
        let errors = self
            .messages
            .errors()
            .unwrap_or_default()
            .iter()
            .map(|e| ErrorReference {
                comment: None,
                ..e.clone()
            })
            .collect();
        let stages = self
            .messages
            .stage_blocks()
            .into_iter()
            .map(|(_, stage)| strip_stage(stage))
            .collect();
        Operation {
            comment: None,
            messages: Messages::assemble(self.pattern(), stages, errors),
            ..self.clone()
        }
    }
}

/// One message stage: a comment plus the ordered body fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    pub comment: Option<String>,
    pub fields: Vec<Field>,
}

impl Stage {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            comment: None,
            fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionPattern {
    Send,
    Submit,
    Request,
    Invoke,
    Progress,
    PubSub,
}

impl InteractionPattern {
    pub const ALL: [InteractionPattern; 6] = [
        InteractionPattern::Send,
        InteractionPattern::Submit,
        InteractionPattern::Request,
        InteractionPattern::Invoke,
        InteractionPattern::Progress,
        InteractionPattern::PubSub,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            InteractionPattern::Send => "SEND",
            InteractionPattern::Submit => "SUBMIT",
            InteractionPattern::Request => "REQUEST",
            InteractionPattern::Invoke => "INVOKE",
            InteractionPattern::Progress => "PROGRESS",
            InteractionPattern::PubSub => "PUBSUB",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.keyword() == keyword)
    }

    /// Names of the stage blocks declared for this pattern, in fixed order.
    pub fn stage_names(self) -> &'static [&'static str] {
        match self {
            InteractionPattern::Send => &["send"],
            InteractionPattern::Submit => &["submit"],
            InteractionPattern::Request => &["request", "response"],
            InteractionPattern::Invoke => &["invoke", "acknowledgement", "response"],
            InteractionPattern::Progress => &["progress", "acknowledgement", "update", "response"],
            InteractionPattern::PubSub => &["publishNotify"],
        }
    }

    pub fn has_errors(self) -> bool {
        !matches!(self, InteractionPattern::Send)
    }
}

/// A single message of an operation as it travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionStage {
    Send,
    Submit,
    Request,
    RequestResponse,
    Invoke,
    InvokeAck,
    InvokeResponse,
    Progress,
    ProgressAck,
    ProgressUpdate,
    ProgressResponse,
    PubSubPublish,
    PubSubNotify,
}

impl InteractionStage {
    pub fn name(self) -> &'static str {
        match self {
            InteractionStage::Send => "SEND",
            InteractionStage::Submit => "SUBMIT",
            InteractionStage::Request => "REQUEST",
            InteractionStage::RequestResponse => "REQUEST_RESPONSE",
            InteractionStage::Invoke => "INVOKE",
            InteractionStage::InvokeAck => "INVOKE_ACK",
            InteractionStage::InvokeResponse => "INVOKE_RESPONSE",
            InteractionStage::Progress => "PROGRESS",
            InteractionStage::ProgressAck => "PROGRESS_ACK",
            InteractionStage::ProgressUpdate => "PROGRESS_UPDATE",
            InteractionStage::ProgressResponse => "PROGRESS_RESPONSE",
            InteractionStage::PubSubPublish => "PUBSUB_PUBLISH",
            InteractionStage::PubSubNotify => "PUBSUB_NOTIFY",
        }
    }
}

/// Pattern-specific message payload of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Messages {
    Send {
        send: Stage,
    },
    Submit {
        submit: Stage,
        errors: Vec<ErrorReference>,
    },
    Request {
        request: Stage,
        response: Stage,
        errors: Vec<ErrorReference>,
    },
    Invoke {
        invoke: Stage,
        acknowledgement: Stage,
        response: Stage,
        errors: Vec<ErrorReference>,
    },
    Progress {
        progress: Stage,
        acknowledgement: Stage,
        update: Stage,
        response: Stage,
        errors: Vec<ErrorReference>,
    },
    PubSub {
        publish_notify: Stage,
        errors: Vec<ErrorReference>,
    },
}

impl Messages {
    /// Build the payload for `pattern` from stage blocks given in
    /// [`InteractionPattern::stage_names`] order. Missing blocks are empty;
    /// errors are dropped for SEND.
    pub fn assemble(
        pattern: InteractionPattern,
        stages: Vec<Stage>,
        errors: Vec<ErrorReference>,
    ) -> Messages {
        let mut stages = stages.into_iter();
        let mut next = || stages.next().unwrap_or_default();
        match pattern {
            InteractionPattern::Send => Messages::Send { send: next() },
            InteractionPattern::Submit => Messages::Submit {
                submit: next(),
                errors,
            },
            InteractionPattern::Request => Messages::Request {
                request: next(),
                response: next(),
                errors,
            },
            InteractionPattern::Invoke => Messages::Invoke {
                invoke: next(),
                acknowledgement: next(),
                response: next(),
                errors,
            },
            InteractionPattern::Progress => Messages::Progress {
                progress: next(),
                acknowledgement: next(),
                update: next(),
                response: next(),
                errors,
            },
            InteractionPattern::PubSub => Messages::PubSub {
                publish_notify: next(),
                errors,
            },
        }
    }

    pub fn pattern(&self) -> InteractionPattern {
        match self {
            Messages::Send { .. } => InteractionPattern::Send,
            Messages::Submit { .. } => InteractionPattern::Submit,
            Messages::Request { .. } => InteractionPattern::Request,
            Messages::Invoke { .. } => InteractionPattern::Invoke,
            Messages::Progress { .. } => InteractionPattern::Progress,
            Messages::PubSub { .. } => InteractionPattern::PubSub,
        }
    }

    /// Error references; `None` for SEND, which cannot declare any.
    pub fn errors(&self) -> Option<&[ErrorReference]> {
        match self {
            Messages::Send { .. } => None,
            Messages::Submit { errors, .. }
            | Messages::Request { errors, .. }
            | Messages::Invoke { errors, .. }
            | Messages::Progress { errors, .. }
            | Messages::PubSub { errors, .. } => Some(errors),
        }
    }

    /// Declared stage blocks with their block names.
    pub fn stage_blocks(&self) -> Vec<(&'static str, &Stage)> {
        let names = self.pattern().stage_names();
        let stages: Vec<&Stage> = match self {
            Messages::Send { send } => vec![send],
            Messages::Submit { submit, .. } => vec![submit],
            Messages::Request {
                request, response, ..
            } => vec![request, response],
            Messages::Invoke {
                invoke,
                acknowledgement,
                response,
                ..
            } => vec![invoke, acknowledgement, response],
            Messages::Progress {
                progress,
                acknowledgement,
                update,
                response,
                ..
            } => vec![progress, acknowledgement, update, response],
            Messages::PubSub { publish_notify, .. } => vec![publish_notify],
        };
        names.iter().copied().zip(stages).collect()
    }

    /// Wire messages of the operation. PUBSUB yields the shared field list
    /// twice, once for publish and once for notify.
    pub fn stages(&self) -> Vec<(InteractionStage, &Stage)> {
        use InteractionStage as S;
        match self {
            Messages::Send { send } => vec![(S::Send, send)],
            Messages::Submit { submit, .. } => vec![(S::Submit, submit)],
            Messages::Request {
                request, response, ..
            } => vec![(S::Request, request), (S::RequestResponse, response)],
            Messages::Invoke {
                invoke,
                acknowledgement,
                response,
                ..
            } => vec![
                (S::Invoke, invoke),
                (S::InvokeAck, acknowledgement),
                (S::InvokeResponse, response),
            ],
            Messages::Progress {
                progress,
                acknowledgement,
                update,
                response,
                ..
            } => vec![
                (S::Progress, progress),
                (S::ProgressAck, acknowledgement),
                (S::ProgressUpdate, update),
                (S::ProgressResponse, response),
            ],
            Messages::PubSub { publish_notify, .. } => vec![
                (S::PubSubPublish, publish_notify),
                (S::PubSubNotify, publish_notify),
            ],
        }
    }
}

fn strip_field(field: &Field) -> Field {
    Field {
        comment: None,
        ..field.clone()
    }
}

fn strip_error(error: &ErrorDefinition) -> ErrorDefinition {
    ErrorDefinition {
        comment: None,
        ..error.clone()
    }
}

fn strip_data_type(data_type: &DataType) -> DataType {
    use crate::model::types::{Attribute, Composite, EnumItem, Enumeration, Fundamental};
    match data_type {
        DataType::Fundamental(t) => DataType::Fundamental(Fundamental {
            comment: None,
            ..t.clone()
        }),
        DataType::Attribute(t) => DataType::Attribute(Attribute {
            comment: None,
            ..t.clone()
        }),
        DataType::Enumeration(t) => DataType::Enumeration(Enumeration {
            comment: None,
            items: t
                .items
                .iter()
                .map(|i| EnumItem {
                    comment: None,
                    ..i.clone()
                })
                .collect(),
            ..t.clone()
        }),
        DataType::Composite(t) => DataType::Composite(Composite {
            comment: None,
            fields: t.fields.iter().map(strip_field).collect(),
            ..t.clone()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Field, TypeReference};

    #[test]
    fn test_pubsub_yields_publish_and_notify() {
        let messages = Messages::assemble(
            InteractionPattern::PubSub,
            vec![Stage::new(vec![Field::new("v", TypeReference::mal("Integer"))])],
            vec![],
        );
        let stages: Vec<_> = messages.stages().into_iter().map(|(s, _)| s).collect();
        assert_eq!(
            stages,
            vec![InteractionStage::PubSubPublish, InteractionStage::PubSubNotify]
        );
        assert_eq!(messages.stage_blocks().len(), 1);
    }

    #[test]
    fn test_assemble_fills_missing_stages() {
        let messages = Messages::assemble(InteractionPattern::Progress, vec![], vec![]);
        let blocks = messages.stage_blocks();
        assert_eq!(
            blocks.iter().map(|(n, _)| *n).collect::<Vec<_>>(),
            vec!["progress", "acknowledgement", "update", "response"]
        );
        assert!(blocks.iter().all(|(_, s)| s.fields.is_empty()));
    }

    #[test]
    fn test_send_has_no_errors() {
        let messages = Messages::assemble(InteractionPattern::Send, vec![], vec![]);
        assert!(messages.errors().is_none());
        assert!(!InteractionPattern::Send.has_errors());
    }
}
