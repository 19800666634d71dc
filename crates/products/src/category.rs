use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use demeter_core::{DomainResult, Record, uuid_id, validate};

uuid_id!(CategoryId, "CategoryId");

/// Product category; categories form a forest through `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Category {
    type Id = CategoryId;
    const KIND: &'static str = "categories";
    const ENTITY: &'static str = "Category";
    const UNIQUE: &'static [&'static [&'static str]] = &[&["name"]];

    fn id(&self) -> CategoryId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
}

impl Category {
    pub fn create(req: CreateCategoryRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: CategoryId::new(),
            name: validate::required_text("name", &req.name, 120)?,
            description: validate::optional_text("description", req.description.as_deref(), 1000)?,
            parent_id: req.parent_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, req: UpdateCategoryRequest, now: DateTime<Utc>) -> DomainResult<()> {
        let name = req
            .name
            .as_deref()
            .map(|n| validate::required_text("name", n, 120))
            .transpose()?;
        let description = match req.description.as_deref() {
            Some(d) => Some(validate::optional_text("description", Some(d), 1000)?),
            None => None,
        };

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(parent_id) = req.parent_id {
            self.parent_id = Some(parent_id);
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Would re-parenting `id` under `new_parent` close a loop?
///
/// Walks the ancestor chain of `new_parent` through `categories`. A chain that
/// is longer than the number of categories is itself a loop and counts as one.
pub fn would_create_cycle(categories: &[Category], id: CategoryId, new_parent: CategoryId) -> bool {
    let parents: HashMap<CategoryId, Option<CategoryId>> =
        categories.iter().map(|c| (c.id, c.parent_id)).collect();

    let mut cursor = Some(new_parent);
    let mut steps = 0usize;
    while let Some(current) = cursor {
        if current == id {
            return true;
        }
        steps += 1;
        if steps > parents.len() {
            return true;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, parent: Option<CategoryId>) -> Category {
        Category::create(
            CreateCategoryRequest {
                name: name.into(),
                description: None,
                parent_id: parent,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn detects_direct_and_indirect_cycles() {
        let root = category("Plants", None);
        let child = category("Succulents", Some(root.id));
        let grandchild = category("Cacti", Some(child.id));
        let all = vec![root.clone(), child.clone(), grandchild.clone()];

        assert!(would_create_cycle(&all, root.id, root.id));
        assert!(would_create_cycle(&all, root.id, grandchild.id));
        assert!(!would_create_cycle(&all, grandchild.id, root.id));
    }

    #[test]
    fn unrelated_parent_is_fine() {
        let a = category("Tools", None);
        let b = category("Soil", None);
        assert!(!would_create_cycle(&[a.clone(), b.clone()], a.id, b.id));
    }

    #[test]
    fn blank_name_rejected() {
        let err = Category::create(
            CreateCategoryRequest {
                name: "  ".into(),
                description: None,
                parent_id: None,
            },
            Utc::now(),
        );
        assert!(err.is_err());
    }
}
