//! Deploy endpoint DTOs

use serde::{Deserialize, Serialize};

/// JSON body of every `/deploy/{token}` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResponse {
    pub message: String,
}
