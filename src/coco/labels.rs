// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::collections::HashMap;

use crate::coco::records::CocoCategory;
use crate::constant::SUPERCATEGORY;
use crate::error::SorrelError;

/// A stable mapping from label names to 1-based category ids
///
/// Ids are dense and assigned in input order, so two jobs built from the
/// same ordered vocabulary always agree on category ids. Duplicate names
/// are rejected rather than silently overwriting an earlier id.
///
/// # Examples
///
/// ```
/// use sorrel::coco::LabelRegistry;
///
/// let registry = LabelRegistry::new(["bg", "weed"]).unwrap();
/// assert_eq!(registry.get("bg"), Some(1));
/// assert_eq!(registry.get("weed"), Some(2));
/// assert_eq!(registry.get("leaf"), None);
///
/// let registry = LabelRegistry::new(["bg", "bg"]);
/// assert!(registry.is_err());
/// ```
#[derive(Debug, Clone)]
pub struct LabelRegistry {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl LabelRegistry {
    /// Build a registry from an ordered label vocabulary
    ///
    /// # Arguments
    ///
    /// * `labels` - Distinct label names in id order
    pub fn new<I, S>(labels: I) -> Result<Self, SorrelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = labels.into_iter().map(Into::into).collect();

        let mut ids = HashMap::with_capacity(names.len());

        for (index, name) in names.iter().enumerate() {
            if ids.insert(name.clone(), index as u32 + 1).is_some() {
                return Err(SorrelError::LabelError(format!(
                    "Duplicate label in vocabulary: {}",
                    name
                )));
            }
        }

        Ok(Self { names, ids })
    }

    /// Look up the category id for a label name
    pub fn get(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// Number of labels in the vocabulary
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the vocabulary is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Label names in id order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The full category list for this vocabulary
    ///
    /// Every label is emitted whether or not any annotation used it, so
    /// category ids stay comparable across converted sub-datasets that
    /// share a vocabulary.
    pub fn categories(&self) -> Vec<CocoCategory> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| CocoCategory {
                supercategory: SUPERCATEGORY.to_string(),
                id: index as u32 + 1,
                name: name.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_ids_dense_and_ordered() {
        let labels = ["capsicum", "rockmelon", "weed", "leaf"];
        let registry = LabelRegistry::new(labels).unwrap();

        for (index, label) in labels.iter().enumerate() {
            assert_eq!(registry.get(label), Some(index as u32 + 1));
        }

        let ids: BTreeSet<u32> = registry.categories().iter().map(|c| c.id).collect();
        assert_eq!(ids, (1..=labels.len() as u32).collect::<BTreeSet<u32>>());
    }

    #[test]
    fn test_categories_emitted_in_full() {
        let registry = LabelRegistry::new(["bg", "weed"]).unwrap();
        let categories = registry.categories();

        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "bg");
        assert_eq!(categories[0].supercategory, "none");
        assert_eq!(categories[1].id, 2);
    }
}
