//! Sort specifications

use bson::{doc, Bson, Document as BsonDocument};

use crate::encode::EncodeContext;
use crate::Result;

/// Direction (or computed order) of a sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
    /// `{ $meta: "textScore" }`
    TextScore,
}

/// A single sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    field: String,
    order: SortOrder,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }

    /// Insertion order
    pub fn natural_ascending() -> Self {
        Self::ascending("$natural")
    }

    pub fn natural_descending() -> Self {
        Self::descending("$natural")
    }

    /// Sort by text search relevance, stored under `field`
    pub fn meta_text_score(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::TextScore,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// The value written for this key
    pub fn order_value(&self) -> Bson {
        match self.order {
            SortOrder::Ascending => Bson::Int32(1),
            SortOrder::Descending => Bson::Int32(-1),
            SortOrder::TextScore => Bson::Document(doc! { "$meta": "textScore" }),
        }
    }
}

/// Combine sort keys into one sort document, translating field names.
///
/// `$natural` and text-score keys are never translated.
pub fn sort_document(sorts: &[Sort], ctx: &EncodeContext<'_>) -> Result<BsonDocument> {
    let mut out = BsonDocument::new();
    for sort in sorts {
        let field = if sort.field.starts_with('$') || sort.order == SortOrder::TextScore {
            sort.field.clone()
        } else {
            ctx.path(&sort.field)?
        };
        out.insert(field, sort.order_value());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::EntityModel;

    #[test]
    fn test_sort_document_order_preserved() {
        let sorts = vec![Sort::descending("score"), Sort::ascending("name")];
        let document = sort_document(&sorts, &EncodeContext::detached()).unwrap();
        let keys: Vec<&String> = document.keys().collect();
        assert_eq!(keys, vec!["score", "name"]);
        assert_eq!(document, doc! { "score": -1, "name": 1 });
    }

    #[test]
    fn test_natural_and_meta() {
        let sorts = vec![Sort::natural_descending(), Sort::meta_text_score("relevance")];
        let document = sort_document(&sorts, &EncodeContext::detached()).unwrap();
        assert_eq!(
            document,
            doc! { "$natural": -1, "relevance": { "$meta": "textScore" } }
        );
    }

    #[test]
    fn test_translated_and_validated() {
        let model = EntityModel::builder("Game")
            .mapped_property("gameId", "game_id")
            .build();
        let ctx = EncodeContext::new(&model, true);
        let document = sort_document(&[Sort::ascending("gameId")], &ctx).unwrap();
        assert_eq!(document, doc! { "game_id": 1 });
        assert!(sort_document(&[Sort::ascending("nope")], &ctx).is_err());
    }
}
