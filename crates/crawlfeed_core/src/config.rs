//! Traversal configuration.

use crate::acl::AccessRights;
use crawlfeed_checkpoint::Collation;

/// Configuration shared by the content and security traversals.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// Maximum number of records requested per Change Source query.
    pub batch_hint: usize,
    /// Page size for folder content and sub-folder enumeration.
    pub page_size: usize,
    /// Identifier ordering of the object store's database.
    pub collation: Collation,
    /// Rights that make an access entry relevant to search.
    pub viewable_rights: AccessRights,
    /// Suffix appended to a folder id to form its ACL document id.
    pub acl_id_suffix: String,
    /// Whether the custom delete query is part of the content traversal.
    pub track_custom_deletes: bool,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            batch_hint: 500,
            page_size: 500,
            collation: Collation::Lexical,
            viewable_rights: AccessRights::VIEWABLE,
            acl_id_suffix: "-FLDR".to_string(),
            track_custom_deletes: true,
        }
    }
}

impl TraversalConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch hint. Zero is raised to one.
    #[must_use]
    pub fn with_batch_hint(mut self, batch_hint: usize) -> Self {
        self.batch_hint = batch_hint.max(1);
        self
    }

    /// Sets the enumeration page size. Zero is raised to one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the identifier collation.
    #[must_use]
    pub fn with_collation(mut self, collation: Collation) -> Self {
        self.collation = collation;
        self
    }

    /// Sets the viewable rights mask.
    #[must_use]
    pub fn with_viewable_rights(mut self, rights: AccessRights) -> Self {
        self.viewable_rights = rights;
        self
    }

    /// Sets the ACL document id suffix.
    #[must_use]
    pub fn with_acl_id_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.acl_id_suffix = suffix.into();
        self
    }

    /// Enables or disables the custom delete stream.
    #[must_use]
    pub fn with_custom_deletes(mut self, enabled: bool) -> Self {
        self.track_custom_deletes = enabled;
        self
    }
}
