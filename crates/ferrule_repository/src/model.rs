//! Well-known content model names.

use ferrule_foundation::QName;

/// Content model namespace.
pub const CONTENT_URI: &str = "http://www.ferrule.org/model/content/1.0";

/// System model namespace.
pub const SYSTEM_URI: &str = "http://www.ferrule.org/model/system/1.0";

// =============================================================================
// Types
// =============================================================================

/// Root node of a store.
pub const TYPE_STORE_ROOT: QName = QName::from_static(SYSTEM_URI, "storeroot");

/// Generic folder.
pub const TYPE_FOLDER: QName = QName::from_static(CONTENT_URI, "folder");

/// Generic content item.
pub const TYPE_CONTENT: QName = QName::from_static(CONTENT_URI, "content");

/// Folder holding the configuration of an actionable node.
pub const TYPE_CONFIGURATIONS: QName = QName::from_static(CONTENT_URI, "configurations");

/// Folder holding per-store system configuration.
pub const TYPE_SYSTEM_FOLDER: QName = QName::from_static(CONTENT_URI, "systemfolder");

// =============================================================================
// Aspects
// =============================================================================

/// Marks a node that can carry rules.
pub const ASPECT_ACTIONABLE: QName = QName::from_static(CONTENT_URI, "actionable");

/// Applied to copies, pointing back at the source node.
pub const ASPECT_COPIED_FROM: QName = QName::from_static(CONTENT_URI, "copiedfrom");

/// Title and description.
pub const ASPECT_TITLED: QName = QName::from_static(CONTENT_URI, "titled");

/// Node is under version control.
pub const ASPECT_VERSIONABLE: QName = QName::from_static(CONTENT_URI, "versionable");

// =============================================================================
// Associations
// =============================================================================

/// Folder containment.
pub const ASSOC_CONTAINS: QName = QName::from_static(CONTENT_URI, "contains");

/// System children of a store root.
pub const ASSOC_CHILDREN: QName = QName::from_static(SYSTEM_URI, "children");

/// Actionable node to its configuration folder.
pub const ASSOC_CONFIGURATIONS: QName = QName::from_static(CONTENT_URI, "configurations");

// =============================================================================
// Properties
// =============================================================================

/// Node name.
pub const PROP_NAME: QName = QName::from_static(CONTENT_URI, "name");

/// Node title.
pub const PROP_TITLE: QName = QName::from_static(CONTENT_URI, "title");

/// Node description.
pub const PROP_DESCRIPTION: QName = QName::from_static(CONTENT_URI, "description");

/// Source of a copy.
pub const PROP_COPY_REFERENCE: QName = QName::from_static(CONTENT_URI, "copyReference");

// =============================================================================
// Child association names
// =============================================================================

/// Name of the per-store system configuration folder under the root.
pub const CHILD_SYSTEM_CONFIGURATION: QName =
    QName::from_static(SYSTEM_URI, "systemconfiguration");

/// Name of a configuration folder under the system configuration folder.
pub const CHILD_CONFIGURATIONS: QName = QName::from_static(SYSTEM_URI, "configurations");
