//! Group principal.

use serde::{Deserialize, Serialize};

/// A named principal with no implicit membership column — membership is a
/// grant (`permission = member`), not a field on this struct. Groups can
/// also be the grantee of grants on other resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}
