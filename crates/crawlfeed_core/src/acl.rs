//! Access-control entries and effective ACL resolution.

use bitflags::bitflags;
use crawlfeed_checkpoint::{ObjectId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

bitflags! {
    /// Bitset of repository access rights.
    ///
    /// Serialized as flag names, e.g. `"READ | VIEW_CONTENT"`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AccessRights: u32 {
        /// Read properties.
        const READ = 1;
        /// Modify properties.
        const WRITE = 1 << 1;
        /// View document content.
        const VIEW_CONTENT = 1 << 7;
        /// Delete the object.
        const DELETE = 1 << 16;
        /// Rights that make an object visible in search results.
        const VIEWABLE = Self::READ.bits() | Self::VIEW_CONTENT.bits();
    }
}

/// Whether an entry grants or denies its rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Grants the rights.
    Allow,
    /// Denies the rights.
    Deny,
}

/// Where an entry on an object came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionSource {
    /// Set on the object itself.
    Direct,
    /// Inherited from a parent.
    Parent,
    /// Applied from a security template.
    Template,
}

/// Kind of security principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// A single user.
    User,
    /// A group of users.
    Group,
}

/// A named user or group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Principal name as known to the repository.
    pub name: String,
    /// User or group.
    pub kind: PrincipalKind,
}

impl Principal {
    /// Creates a user principal.
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PrincipalKind::User,
        }
    }

    /// Creates a group principal.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PrincipalKind::Group,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PrincipalKind::User => write!(f, "user:{}", self.name),
            PrincipalKind::Group => write!(f, "group:{}", self.name),
        }
    }
}

/// One access-control entry captured from a folder or document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessEntry {
    /// Who the entry applies to.
    pub principal: Principal,
    /// Grant or deny.
    pub access_type: AccessType,
    /// Origin of the entry.
    pub source: PermissionSource,
    /// Rights granted or denied.
    pub rights: AccessRights,
}

impl AccessEntry {
    /// Creates an entry.
    pub fn new(
        principal: Principal,
        access_type: AccessType,
        source: PermissionSource,
        rights: AccessRights,
    ) -> Self {
        Self {
            principal,
            access_type,
            source,
            rights,
        }
    }

    /// Creates an entry allowing the viewable rights.
    pub fn allow(principal: Principal, source: PermissionSource) -> Self {
        Self::new(principal, AccessType::Allow, source, AccessRights::VIEWABLE)
    }

    /// Creates an entry denying the viewable rights.
    pub fn deny(principal: Principal, source: PermissionSource) -> Self {
        Self::new(principal, AccessType::Deny, source, AccessRights::VIEWABLE)
    }

    /// Returns true if the entry grants or denies any of `viewable`.
    #[must_use]
    pub fn is_relevant(&self, viewable: AccessRights) -> bool {
        self.rights.intersects(viewable)
    }
}

/// Resolved allow/deny principal sets for one folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveAcl {
    /// Users allowed to view.
    pub allow_users: BTreeSet<Principal>,
    /// Users denied.
    pub deny_users: BTreeSet<Principal>,
    /// Groups allowed to view.
    pub allow_groups: BTreeSet<Principal>,
    /// Groups denied.
    pub deny_groups: BTreeSet<Principal>,
}

impl EffectiveAcl {
    /// Resolves the effective ACL from a folder's entries.
    ///
    /// Entries without any of the `viewable` rights are discarded. A
    /// principal with a direct entry ignores its parent and template entries.
    /// Template entries count as parent entries. If the remaining entries for
    /// one principal both allow and deny, deny wins.
    #[must_use]
    pub fn resolve(entries: &[AccessEntry], viewable: AccessRights) -> Self {
        let relevant: Vec<&AccessEntry> = entries
            .iter()
            .filter(|entry| entry.is_relevant(viewable))
            .collect();

        let direct: HashSet<&Principal> = relevant
            .iter()
            .filter(|entry| entry.source == PermissionSource::Direct)
            .map(|entry| &entry.principal)
            .collect();

        let mut decisions: BTreeMap<&Principal, AccessType> = BTreeMap::new();
        for entry in &relevant {
            let inherited = entry.source != PermissionSource::Direct;
            if inherited && direct.contains(&entry.principal) {
                continue;
            }
            let decision = decisions
                .entry(&entry.principal)
                .or_insert(entry.access_type);
            if entry.access_type == AccessType::Deny {
                *decision = AccessType::Deny;
            }
        }

        let mut acl = EffectiveAcl::default();
        for (principal, decision) in decisions {
            let set = match (principal.kind, decision) {
                (PrincipalKind::User, AccessType::Allow) => &mut acl.allow_users,
                (PrincipalKind::User, AccessType::Deny) => &mut acl.deny_users,
                (PrincipalKind::Group, AccessType::Allow) => &mut acl.allow_groups,
                (PrincipalKind::Group, AccessType::Deny) => &mut acl.deny_groups,
            };
            set.insert(principal.clone());
        }
        acl
    }

    /// Returns true if no principal is allowed or denied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allow_users.is_empty()
            && self.deny_users.is_empty()
            && self.allow_groups.is_empty()
            && self.deny_groups.is_empty()
    }
}

/// How an ACL combines with the ACL it inherits from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AclInheritanceType {
    /// The child's decision wins over the parent's.
    ChildOverrides,
    /// The parent's decision wins over the child's.
    ParentOverrides,
    /// Both must permit.
    AndBothPermit,
}

/// The access-control document emitted for one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AclDocument {
    /// Document identifier: folder id plus a fixed suffix.
    pub id: ObjectId,
    /// Folder the ACL was resolved for.
    pub folder_id: ObjectId,
    /// Folder modification time.
    pub modify_time: Timestamp,
    /// Always [`AclInheritanceType::ChildOverrides`] for folder ACLs.
    pub inheritance: AclInheritanceType,
    /// Resolved principals.
    #[serde(flatten)]
    pub acl: EffectiveAcl,
    /// Documents contained in the folder.
    pub documents: Vec<ObjectId>,
}

impl AclDocument {
    /// Creates a folder ACL document.
    ///
    /// The document is self-contained: it carries no reference to a parent
    /// ACL document.
    pub fn for_folder(
        folder_id: ObjectId,
        suffix: &str,
        modify_time: Timestamp,
        acl: EffectiveAcl,
        documents: Vec<ObjectId>,
    ) -> Self {
        Self {
            id: folder_id.with_suffix(suffix),
            folder_id,
            modify_time,
            inheritance: AclInheritanceType::ChildOverrides,
            acl,
            documents,
        }
    }
}
