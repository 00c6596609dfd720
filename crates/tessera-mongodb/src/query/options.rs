//! Options for find, delete, update and find-and-modify operations

use std::time::Duration;

use bson::{Bson, Document as BsonDocument};
use mongodb::options::{
    FindOneAndDeleteOptions, FindOneAndUpdateOptions, FindOneOptions,
    FindOptions as DriverFindOptions, ReturnDocument,
};

use super::sort::{sort_document, Sort};
use crate::encode::EncodeContext;
use crate::Result;

/// Options for a find query
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    sort: Vec<Sort>,
    skip: Option<u64>,
    limit: Option<i64>,
    projection: Vec<(String, bool)>,
    batch_size: Option<u32>,
    comment: Option<String>,
    max_time: Option<Duration>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sort key; keys apply in the order added
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Project only the included fields (plus `_id`)
    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.projection.push((field.into(), true));
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.projection.push((field.into(), false));
        self
    }

    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn sorts(&self) -> &[Sort] {
        &self.sort
    }

    pub fn get_skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn get_limit(&self) -> Option<i64> {
        self.limit
    }

    /// Encoded sort document, `None` when unsorted
    pub fn sort_document(&self, ctx: &EncodeContext<'_>) -> Result<Option<BsonDocument>> {
        if self.sort.is_empty() {
            return Ok(None);
        }
        sort_document(&self.sort, ctx).map(Some)
    }

    /// Encoded projection, `None` when every field is returned
    pub fn projection(&self, ctx: &EncodeContext<'_>) -> Result<Option<BsonDocument>> {
        if self.projection.is_empty() {
            return Ok(None);
        }
        let mut out = BsonDocument::new();
        for (field, include) in &self.projection {
            out.insert(ctx.path(field)?, if *include { 1 } else { 0 });
        }
        Ok(Some(out))
    }

    /// Driver options for `find`
    pub fn to_find_options(&self, ctx: &EncodeContext<'_>) -> Result<DriverFindOptions> {
        let mut options = DriverFindOptions::default();
        options.sort = self.sort_document(ctx)?;
        options.projection = self.projection(ctx)?;
        options.skip = self.skip;
        options.limit = self.limit;
        options.batch_size = self.batch_size;
        options.comment = self.comment.clone().map(Bson::String);
        options.max_time = self.max_time;
        Ok(options)
    }

    /// Driver options for `find_one`; limit and batch size do not apply
    pub fn to_find_one_options(&self, ctx: &EncodeContext<'_>) -> Result<FindOneOptions> {
        let mut options = FindOneOptions::default();
        options.sort = self.sort_document(ctx)?;
        options.projection = self.projection(ctx)?;
        options.skip = self.skip;
        options.comment = self.comment.clone().map(Bson::String);
        options.max_time = self.max_time;
        Ok(options)
    }

    /// Driver options for `find_one_and_delete`
    pub fn to_find_and_delete_options(
        &self,
        ctx: &EncodeContext<'_>,
    ) -> Result<FindOneAndDeleteOptions> {
        let mut options = FindOneAndDeleteOptions::default();
        options.sort = self.sort_document(ctx)?;
        options.projection = self.projection(ctx)?;
        options.max_time = self.max_time;
        options.comment = self.comment.clone().map(Bson::String);
        Ok(options)
    }
}

/// Options for [`Query::delete`](super::Query::delete)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Delete every match instead of the first
    pub multi: bool,
}

impl DeleteOptions {
    pub fn multi() -> Self {
        Self { multi: true }
    }
}

/// Options for [`Update::execute`](super::Update::execute)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Update every match instead of the first
    pub multi: bool,
    /// Insert a document when nothing matches
    pub upsert: bool,
}

impl UpdateOptions {
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub fn upsert(mut self) -> Self {
        self.upsert = true;
        self
    }
}

/// Options for [`Modify::execute`](super::Modify::execute)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifyOptions {
    /// Return the document after the update (default) or before it
    pub return_new: bool,
    pub upsert: bool,
}

impl Default for ModifyOptions {
    fn default() -> Self {
        Self {
            return_new: true,
            upsert: false,
        }
    }
}

impl ModifyOptions {
    pub fn return_old(mut self) -> Self {
        self.return_new = false;
        self
    }

    pub fn upsert(mut self) -> Self {
        self.upsert = true;
        self
    }

    pub(crate) fn to_driver(
        self,
        find: &FindOptions,
        ctx: &EncodeContext<'_>,
    ) -> Result<FindOneAndUpdateOptions> {
        let mut options = FindOneAndUpdateOptions::default();
        options.sort = find.sort_document(ctx)?;
        options.projection = find.projection(ctx)?;
        options.upsert = Some(self.upsert);
        options.return_document = Some(if self.return_new {
            ReturnDocument::After
        } else {
            ReturnDocument::Before
        });
        Ok(options)
    }
}
