use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Foreign-key lists served by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LookupKind {
    Shop,
    Category,
    Vehicle,
    Employee,
}

impl LookupKind {
    pub fn resource(self) -> &'static str {
        match self {
            LookupKind::Shop => "shops",
            LookupKind::Category => "categories",
            LookupKind::Vehicle => "vehicles",
            LookupKind::Employee => "employees",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LookupKind::Shop => "Shop",
            LookupKind::Category => "Category",
            LookupKind::Vehicle => "Vehicle",
            LookupKind::Employee => "Employee",
        }
    }

    /// Query parameter used when a list is filtered by this lookup.
    pub fn filter_param(self) -> &'static str {
        match self {
            LookupKind::Shop => "shopId",
            LookupKind::Category => "categoryId",
            LookupKind::Vehicle => "vehicleId",
            LookupKind::Employee => "employeeId",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupItem {
    pub id: u64,
    #[serde(alias = "plateNumber", alias = "fullName")]
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Lookups {
    items: HashMap<LookupKind, Vec<LookupItem>>,
}

impl Lookups {
    pub fn insert(&mut self, kind: LookupKind, mut items: Vec<LookupItem>) {
        items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        self.items.insert(kind, items);
    }

    pub fn options(&self, kind: LookupKind) -> &[LookupItem] {
        self.items.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Display name for an id; unknown ids render as `#<id>`.
    pub fn name(&self, kind: LookupKind, id: u64) -> String {
        self.options(kind)
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    /// The option after (or before) `current`, wrapping around.
    pub fn cycle(&self, kind: LookupKind, current: Option<u64>, forward: bool) -> Option<u64> {
        let options = self.options(kind);
        if options.is_empty() {
            return None;
        }

        let position = current.and_then(|id| options.iter().position(|item| item.id == id));
        let next = match (position, forward) {
            (None, true) => 0,
            (None, false) => options.len() - 1,
            (Some(i), true) => (i + 1) % options.len(),
            (Some(i), false) => (i + options.len() - 1) % options.len(),
        };
        Some(options[next].id)
    }
}
