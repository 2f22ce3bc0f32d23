use crate::catalog::TripCatalogEntry;
use crate::domain::Driver;

pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for Driver {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for TripCatalogEntry {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Picker state. An id can be chosen before the entity behind it is known;
/// `resolve` settles it once a result list containing that id arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    Unselected,
    PendingResolution(String),
    Resolved(T),
}

impl<T: Identified + Clone> Selection<T> {
    pub fn select_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.selected_id() != Some(id.as_str()) {
            *self = Selection::PendingResolution(id);
        }
    }

    pub fn select(&mut self, entity: T) {
        *self = Selection::Resolved(entity);
    }

    pub fn clear(&mut self) {
        *self = Selection::Unselected;
    }

    /// Returns true when a pending id was found in `results`. Other states are left as they are.
    pub fn resolve(&mut self, results: &[T]) -> bool {
        let Selection::PendingResolution(id) = self else {
            return false;
        };

        match results.iter().find(|entity| entity.id() == id.as_str()) {
            Some(entity) => {
                *self = Selection::Resolved(entity.clone());
                true
            }
            None => false,
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        match self {
            Selection::Unselected => None,
            Selection::PendingResolution(id) => Some(id.as_str()),
            Selection::Resolved(entity) => Some(entity.id()),
        }
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Selection::Resolved(entity) => Some(entity),
            _ => None,
        }
    }
}

/// Drops candidates already taken elsewhere in the form.
pub fn exclude_selected<'a, T: Identified>(candidates: &'a [T], excluded: &[&str]) -> Vec<&'a T> {
    candidates
        .iter()
        .filter(|candidate| !excluded.contains(&candidate.id()))
        .collect()
}
