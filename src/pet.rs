//! The pet record and its insert payload.

use serde::{Deserialize, Serialize};

/// A stored pet. `id` is assigned by the store on insert and never changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Pet {
    pub id: i64,
    pub name: String,
}

impl Pet {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Pet {
            id,
            name: name.into(),
        }
    }
}

impl From<(i64, String)> for Pet {
    fn from((id, name): (i64, String)) -> Self {
        Pet { id, name }
    }
}

/// Insert payload. Any `id` in the request body is dropped during deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NewPet {
    pub name: String,
}

impl NewPet {
    pub fn new(name: impl Into<String>) -> Self {
        NewPet { name: name.into() }
    }

    pub fn with_id(self, id: i64) -> Pet {
        Pet { id, name: self.name }
    }
}

/// Update payload. The id may come from the body or from the path.
#[derive(Clone, Debug, Deserialize)]
pub struct PetBody {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}
