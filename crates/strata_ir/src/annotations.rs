//! Annotations attached to operations and ports.
//!
//! An annotation may target a single node of an aggregate through its
//! `target_field` field ID. When a value is decomposed, each leaf keeps only
//! the annotations that fall inside its field range, rebased to the leaf.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marks a declaration that must survive optimization under its own name.
pub const DONT_TOUCH_CLASS: &str = "firrtl.transforms.DontTouchAnnotation";

/// Cross-module signal driver; tracks its own `fieldID` member.
pub const SIGNAL_DRIVER_CLASS: &str = "sifive.enterprise.grandcentral.SignalDriverAnnotation";

/// Member holding the field offset of a [`SIGNAL_DRIVER_CLASS`] annotation.
pub const FIELD_ID_MEMBER: &str = "fieldID";

/// One annotation: a class name plus free-form JSON members.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Annotation {
    /// The annotation class.
    pub class: String,
    /// The field ID this annotation applies to; `None` means the whole value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field: Option<u32>,
    /// Every other member, carried through untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub members: Map<String, Value>,
}

impl Annotation {
    /// Creates a whole-value annotation of the given class.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            target_field: None,
            members: Map::new(),
        }
    }

    /// Creates a dont-touch annotation.
    pub fn dont_touch() -> Self {
        Self::new(DONT_TOUCH_CLASS)
    }

    /// Targets the node `field_id` of an aggregate.
    pub fn on_field(mut self, field_id: u32) -> Self {
        self.target_field = Some(field_id);
        self
    }

    /// Sets a member.
    pub fn with_member(mut self, key: impl Into<String>, value: Value) -> Self {
        self.members.insert(key.into(), value);
        self
    }

    /// Returns `true` for dont-touch annotations.
    pub fn is_dont_touch(&self) -> bool {
        self.class == DONT_TOUCH_CLASS
    }

    /// Annotations that track field offsets in their own members.
    pub fn is_field_sensitive(&self) -> bool {
        self.class == SIGNAL_DRIVER_CLASS
    }

    /// Reads an unsigned integer member.
    pub fn member_u64(&self, key: &str) -> Option<u64> {
        self.members.get(key).and_then(Value::as_u64)
    }

    /// Adds `field_id` to the `fieldID` member of field-sensitive annotations.
    fn offset_field_member(&self, field_id: u32) -> Annotation {
        let mut anno = self.clone();
        if field_id == 0 || !self.is_field_sensitive() {
            return anno;
        }
        let total = u64::from(field_id) + self.member_u64(FIELD_ID_MEMBER).unwrap_or(0);
        anno.members.insert(FIELD_ID_MEMBER.to_string(), Value::from(total));
        anno
    }
}

/// Returns `true` if any annotation is a dont-touch.
pub fn has_dont_touch(annos: &[Annotation]) -> bool {
    annos.iter().any(Annotation::is_dont_touch)
}

/// The annotations that apply to the child spanning field IDs
/// `[field_id, field_id + child_max_field_id]`, rebased onto that child.
///
/// Whole-value annotations go to every child; field-targeted ones go only to
/// the child that contains their target.
pub fn filter_for_field(
    annos: &[Annotation],
    field_id: u32,
    child_max_field_id: u32,
) -> Vec<Annotation> {
    let mut out = Vec::new();
    for anno in annos {
        let Some(target) = anno.target_field else {
            out.push(anno.offset_field_member(field_id));
            continue;
        };
        if target == 0 {
            out.push(Annotation {
                target_field: None,
                ..anno.clone()
            });
            continue;
        }
        if target < field_id || target > field_id + child_max_field_id {
            continue;
        }
        let rebased = target - field_id;
        out.push(Annotation {
            target_field: (rebased != 0).then_some(rebased),
            ..anno.clone()
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_value_annotations_reach_every_child() {
        let annos = vec![Annotation::dont_touch()];
        assert_eq!(filter_for_field(&annos, 1, 0), annos);
        assert_eq!(filter_for_field(&annos, 2, 3), annos);
    }

    #[test]
    fn targeted_annotation_is_rebased() {
        let annos = vec![Annotation::new("x").on_field(4)];
        // Child spans 2..=5; the target lands at offset 2 inside it.
        let kept = filter_for_field(&annos, 2, 3);
        assert_eq!(kept[0].target_field, Some(2));
        // A leaf exactly at the target drops the member.
        let leaf = filter_for_field(&annos, 4, 0);
        assert_eq!(leaf[0].target_field, None);
        assert!(filter_for_field(&annos, 1, 0).is_empty());
    }

    #[test]
    fn zero_target_behaves_as_whole_value() {
        let annos = vec![Annotation::new("x").on_field(0)];
        let kept = filter_for_field(&annos, 3, 0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].target_field, None);
    }

    #[test]
    fn signal_driver_accumulates_field_member() {
        let annos = vec![Annotation::new(SIGNAL_DRIVER_CLASS)
            .with_member(FIELD_ID_MEMBER, Value::from(1))];
        let kept = filter_for_field(&annos, 3, 0);
        assert_eq!(kept[0].member_u64(FIELD_ID_MEMBER), Some(4));
        let other = filter_for_field(&[Annotation::new("y")], 3, 0);
        assert!(other[0].members.is_empty());
    }

    #[test]
    fn serde_skips_empty_parts() {
        let json = serde_json::to_string(&Annotation::dont_touch()).unwrap();
        assert_eq!(json, r#"{"class":"firrtl.transforms.DontTouchAnnotation"}"#);
        let back: Annotation =
            serde_json::from_str(r#"{"class":"c","target_field":2,"members":{"k":"v"}}"#).unwrap();
        assert_eq!(back.target_field, Some(2));
        assert!(has_dont_touch(&[Annotation::dont_touch()]));
    }
}
