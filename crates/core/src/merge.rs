//! Metafield merge: source over target, never deleting target-only keys.

use indexmap::IndexMap;

use crate::types::{Metafield, MetafieldInput, RawMetafield};

/// A key whose source type differs from the type already stored on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    /// `namespace.key`.
    pub key: String,
    /// Type currently on the target.
    pub target_type: String,
    /// Type written by the source.
    pub source_type: String,
}

/// The merged `metafieldsSet` inputs for one owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeResult {
    /// Inputs in write order: target keys first, then new source keys.
    pub inputs: Vec<MetafieldInput>,
    /// Collisions where the source replaced the target's type.
    pub type_mismatches: Vec<TypeMismatch>,
}

impl MergeResult {
    /// Overlay forced values. They replace any merged value unconditionally.
    #[must_use]
    pub fn with_forced(mut self, owner_id: &str, forced: &[Metafield]) -> Self {
        for metafield in forced {
            let input = MetafieldInput {
                owner_id: owner_id.to_owned(),
                namespace: metafield.namespace.clone(),
                key: metafield.key.clone(),
                metafield_type: metafield.metafield_type.as_str().to_owned(),
                value: metafield.value.clone(),
            };
            let key = input.key_path();
            match self.inputs.iter_mut().find(|i| i.key_path() == key) {
                Some(existing) => *existing = input,
                None => self.inputs.push(input),
            }
        }
        self
    }

    /// Whether there is anything to write.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

fn split_key(key: &str) -> (&str, &str) {
    key.split_once('.').unwrap_or((key, ""))
}

/// Merge source metafields over the target's existing set.
///
/// On collision the source value and type replace the target's. Keys only
/// the target holds survive unchanged. Records with a missing namespace,
/// key or type, or a null value, are ignored on both sides.
#[must_use]
pub fn merge_metafields(
    owner_id: &str,
    source: &[RawMetafield],
    target: &[RawMetafield],
) -> MergeResult {
    let mut merged: IndexMap<String, (String, String)> = IndexMap::new();
    for metafield in target {
        if let Some((key, metafield_type, value)) = metafield.complete() {
            merged.insert(key, (metafield_type.to_owned(), value.to_owned()));
        }
    }

    let mut type_mismatches = Vec::new();
    for metafield in source {
        let Some((key, metafield_type, value)) = metafield.complete() else {
            continue;
        };
        if let Some((target_type, _)) = merged.get(&key) {
            if target_type != metafield_type {
                type_mismatches.push(TypeMismatch {
                    key: key.clone(),
                    target_type: target_type.clone(),
                    source_type: metafield_type.to_owned(),
                });
            }
        }
        merged.insert(key, (metafield_type.to_owned(), value.to_owned()));
    }

    let inputs = merged
        .into_iter()
        .map(|(key, (metafield_type, value))| {
            let (namespace, key) = split_key(&key);
            MetafieldInput {
                owner_id: owner_id.to_owned(),
                namespace: namespace.to_owned(),
                key: key.to_owned(),
                metafield_type,
                value,
            }
        })
        .collect();

    MergeResult {
        inputs,
        type_mismatches,
    }
}
