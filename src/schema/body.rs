//! Message body composition per interaction stage.

use crate::model::{Field, InteractionStage, TypeReference};

pub const SUBSCRIPTION_ID: &str = "subscriptionId";
pub const UPDATE_HEADERS: &str = "updateHeaders";

/// `{op}_{STAGE}_Body`
pub fn body_type_name(operation: &str, stage: InteractionStage) -> String {
    format!("{operation}_{}_{}", stage.name(), super::mapping::BODY_TYPE)
}

/// Fields making up the body of `stage`.
///
/// PUBSUB publish and notify carry every declared field in list form behind
/// the update headers; notify additionally starts with the subscription id.
pub fn body_fields(stage: InteractionStage, declared: &[Field]) -> Vec<Field> {
    match stage {
        InteractionStage::PubSubPublish | InteractionStage::PubSubNotify => {
            let mut fields = Vec::with_capacity(declared.len() + 2);
            if stage == InteractionStage::PubSubNotify {
                fields.push(Field::new(SUBSCRIPTION_ID, TypeReference::mal("Identifier")));
            }
            fields.push(Field::new(
                UPDATE_HEADERS,
                TypeReference::mal("UpdateHeader").into_list(),
            ));
            fields.extend(declared.iter().map(|field| Field {
                type_ref: field.type_ref.element().into_list(),
                ..field.clone()
            }));
            fields
        }
        _ => declared.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> Vec<Field> {
        vec![
            Field::new("f1", TypeReference::new("A", "Thing")),
            Field::new("f2", TypeReference::mal("String").into_list()).nullable(),
        ]
    }

    fn shape(fields: &[Field]) -> Vec<(String, String)> {
        fields
            .iter()
            .map(|f| (f.name.clone(), f.type_ref.to_string()))
            .collect()
    }

    #[test]
    fn test_notify_prepends_subscription_and_headers() {
        let fields = body_fields(InteractionStage::PubSubNotify, &declared());
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["subscriptionId", "updateHeaders", "f1", "f2"]);
        assert!(fields[2..].iter().all(|f| f.type_ref.list));
        assert!(fields[3].nullable);
    }

    #[test]
    fn test_publish_prepends_headers_only() {
        let fields = body_fields(InteractionStage::PubSubPublish, &declared());
        assert_eq!(
            shape(&fields),
            vec![
                ("updateHeaders".to_string(), "MAL.UpdateHeader[]".to_string()),
                ("f1".to_string(), "A.Thing[]".to_string()),
                ("f2".to_string(), "MAL.String[]".to_string()),
            ]
        );
    }

    #[test]
    fn test_other_stages_keep_declared_fields() {
        let fields = body_fields(InteractionStage::RequestResponse, &declared());
        assert_eq!(fields, declared());
        assert_eq!(
            body_type_name("doIt", InteractionStage::RequestResponse),
            "doIt_REQUEST_RESPONSE_Body"
        );
    }
}
