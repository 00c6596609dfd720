//! Encoding context shared by filters, updates and pipeline stages

use crate::mapping::EntityModel;
use crate::Result;

/// Where builders look up stored field names while encoding.
///
/// A detached context has no model: every path is written as given.
#[derive(Debug, Clone, Copy)]
pub struct EncodeContext<'a> {
    model: Option<&'a EntityModel>,
    validate: bool,
}

impl<'a> EncodeContext<'a> {
    pub fn new(model: &'a EntityModel, validate: bool) -> Self {
        Self {
            model: Some(model),
            validate,
        }
    }

    /// Context without a model; paths are not translated
    pub fn detached() -> Self {
        Self {
            model: None,
            validate: false,
        }
    }

    pub fn model(&self) -> Option<&'a EntityModel> {
        self.model
    }

    pub fn validates(&self) -> bool {
        self.validate
    }

    /// Same model, path validation switched off
    pub fn lenient(&self) -> Self {
        Self {
            model: self.model,
            validate: false,
        }
    }

    /// Context for paths relative to the elements at `path` (`$elemMatch`,
    /// `$pull` conditions). Falls back to no model when `path` is not embedded.
    pub fn nested(&self, path: &str) -> Self {
        match self.model.and_then(|model| model.embedded_at(path)) {
            Some(model) => Self {
                model: Some(model),
                validate: self.validate,
            },
            None => Self::detached(),
        }
    }

    /// Translate a property path to its stored form
    pub fn path(&self, path: &str) -> Result<String> {
        match self.model {
            Some(model) => model.translate_path(path, self.validate),
            None => Ok(path.to_string()),
        }
    }

    /// Translate a field reference inside an expression; never fails
    pub fn field_ref(&self, path: &str) -> String {
        let path = path.strip_prefix('$').unwrap_or(path);
        // `$$var` references and unknown paths stay as written
        if path.starts_with('$') {
            return format!("${}", path);
        }
        let translated = match self.model {
            Some(model) => model
                .translate_path(path, false)
                .unwrap_or_else(|_| path.to_string()),
            None => path.to_string(),
        };
        format!("${}", translated)
    }
}

impl Default for EncodeContext<'_> {
    fn default() -> Self {
        Self::detached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> EntityModel {
        EntityModel::builder("Game")
            .mapped_property("gameId", "game_id")
            .property("score")
            .build()
    }

    #[test]
    fn test_detached_passthrough() {
        let ctx = EncodeContext::detached();
        assert_eq!(ctx.path("anything.at.all").unwrap(), "anything.at.all");
        assert_eq!(ctx.field_ref("score"), "$score");
        assert_eq!(ctx.field_ref("$score"), "$score");
    }

    #[test]
    fn test_translating_context() {
        let model = model();
        let ctx = EncodeContext::new(&model, true);
        assert_eq!(ctx.path("gameId").unwrap(), "game_id");
        assert!(ctx.path("missing").is_err());
        assert!(ctx.lenient().path("missing").is_ok());
        assert_eq!(ctx.field_ref("$gameId"), "$game_id");
        assert_eq!(ctx.field_ref("$$ROOT"), "$$ROOT");
    }

    #[test]
    fn test_nested_context() {
        let address = EntityModel::builder("Address")
            .mapped_property("zipCode", "zip")
            .build();
        let model = EntityModel::builder("Person")
            .embedded("addresses", address)
            .property("tags")
            .build();
        let ctx = EncodeContext::new(&model, true);

        let nested = ctx.nested("addresses");
        assert_eq!(nested.path("zipCode").unwrap(), "zip");
        assert!(nested.validates());

        // scalar arrays have no model to translate through
        let scalars = ctx.nested("tags");
        assert!(scalars.model().is_none());
        assert_eq!(scalars.path("anything").unwrap(), "anything");
    }
}
