//! ---
//! ve_section: "02-grid-simulation"
//! ve_subsection: "module"
//! ve_type: "source"
//! ve_scope: "code"
//! ve_description: "Physical grid model and tick pipeline."
//! ve_version: "v0.0.0-prealpha"
//! ve_owner: "tbd"
//! ---
use thiserror::Error;

use crate::fault::FaultKind;
use crate::grid::ComponentId;

pub type Result<T> = std::result::Result<T, GridError>;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid grid configuration: {reason}")]
    Configuration { reason: String },
    #[error("component {0} not found")]
    UnknownComponent(ComponentId),
    #[error("fault kind '{fault}' cannot target {component}")]
    UnsupportedFault {
        fault: FaultKind,
        component: ComponentId,
    },
    #[error("component {component} produced a non-finite result and was forced out of service")]
    Degenerate { component: ComponentId },
}

impl GridError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
