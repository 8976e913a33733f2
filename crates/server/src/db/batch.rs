//! Atomic write batches.

/// Maximum number of writes a single batch may stage.
pub const MAX_BATCH_WRITES: usize = 500;

/// Reference to a document within a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

/// Deletes staged for one atomic commit.
///
/// Committed with [`DocumentDb::commit`](super::DocumentDb::commit): either
/// every staged delete applies or none does. Deleting a document that does not
/// exist is a no-op.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    deletes: Vec<DocumentRef>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a delete.
    pub fn delete(&mut self, collection: impl Into<String>, id: impl Into<String>) {
        self.deletes.push(DocumentRef {
            collection: collection.into(),
            id: id.into(),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deletes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty()
    }

    #[must_use]
    pub fn deletes(&self) -> &[DocumentRef] {
        &self.deletes
    }

    /// Distinct collections touched by the batch, in staging order.
    #[must_use]
    pub fn collections(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for r in &self.deletes {
            if !seen.contains(&r.collection) {
                seen.push(r.collection.clone());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collections_are_distinct() {
        let mut batch = WriteBatch::new();
        batch.delete("ratings", "a");
        batch.delete("ratings", "b");
        batch.delete("stores", "c");
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.collections(), vec!["ratings", "stores"]);
    }
}
