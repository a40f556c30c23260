//! Governance-owned protocol parameters.
//!
//! The ceilings every registry consults at check time, plus the governance
//! address itself. Setters are owner-gated and validate before writing.

use ers_core::{Address, ErsError, Role};
use serde::{Deserialize, Serialize};

use crate::config::{validate_gateway_url, ProtocolConfig};

/// Runtime-adjustable protocol parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Account allowed to administer the protocol.
    pub governance: Address,
    /// Ceiling on a new chip's primary-service timelock, relative to its
    /// project's creation.
    pub max_lockin_period: u64,
    /// Service-change signature validity window, in blocks.
    pub max_block_window: u64,
    /// Seconds after project creation during which the claim root may change.
    pub project_update_window: u64,
    /// Gateway URL templates for off-chain lookups.
    pub gateway_urls: Vec<String>,
}

impl ProtocolParams {
    /// Parameters seeded from a validated configuration.
    pub fn from_config(config: &ProtocolConfig, governance: Address) -> Self {
        Self {
            governance,
            max_lockin_period: config.max_lockin_period,
            max_block_window: config.max_block_window,
            project_update_window: config.project_update_window,
            gateway_urls: config.gateway_urls.clone(),
        }
    }

    /// Reject any caller other than governance.
    pub fn require_governance(&self, caller: &Address) -> Result<(), ErsError> {
        if *caller != self.governance {
            return Err(ErsError::unauthorized(Role::Governance, *caller));
        }
        Ok(())
    }

    /// Change the lock-in ceiling.
    pub fn set_max_lockin_period(&mut self, caller: &Address, value: u64) -> Result<(), ErsError> {
        self.require_governance(caller)?;
        if value == 0 {
            return Err(ErsError::ZeroValue {
                field: "max_lockin_period",
            });
        }
        self.max_lockin_period = value;
        Ok(())
    }

    /// Change the signature block window.
    pub fn set_max_block_window(&mut self, caller: &Address, value: u64) -> Result<(), ErsError> {
        self.require_governance(caller)?;
        if value == 0 {
            return Err(ErsError::ZeroValue {
                field: "max_block_window",
            });
        }
        self.max_block_window = value;
        Ok(())
    }

    /// Change the project claim-root update window.
    pub fn set_project_update_window(
        &mut self,
        caller: &Address,
        value: u64,
    ) -> Result<(), ErsError> {
        self.require_governance(caller)?;
        self.project_update_window = value;
        Ok(())
    }

    /// Replace the gateway URL list.
    pub fn set_gateway_urls(&mut self, caller: &Address, urls: Vec<String>) -> Result<(), ErsError> {
        self.require_governance(caller)?;
        for url in &urls {
            validate_gateway_url(url).map_err(|e| ErsError::Malformed {
                what: "gateway url",
                reason: e.to_string(),
            })?;
        }
        self.gateway_urls = urls;
        Ok(())
    }

    /// Hand governance to another account.
    pub fn transfer_governance(&mut self, caller: &Address, new: Address) -> Result<(), ErsError> {
        self.require_governance(caller)?;
        ers_core::require_nonzero_address(&new, "governance")?;
        self.governance = new;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ers_core::ErrorKind;

    fn params() -> (ProtocolParams, Address) {
        let gov = Address::new([0x60; 20]);
        (ProtocolParams::from_config(&ProtocolConfig::default(), gov), gov)
    }

    #[test]
    fn test_setters_require_governance() {
        let (mut p, _) = params();
        let err = p.set_max_block_window(&Address::new([1; 20]), 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_setters_validate() {
        let (mut p, gov) = params();
        assert_eq!(
            p.set_max_lockin_period(&gov, 0).unwrap_err().kind(),
            ErrorKind::Shape
        );
        p.set_max_block_window(&gov, 7).unwrap();
        assert_eq!(p.max_block_window, 7);
        assert!(p.set_gateway_urls(&gov, vec!["nope".into()]).is_err());
        p.set_gateway_urls(&gov, vec!["https://gw.test".into()]).unwrap();
        assert_eq!(p.gateway_urls.len(), 1);
    }

    #[test]
    fn test_transfer_governance() {
        let (mut p, gov) = params();
        let next = Address::new([0x61; 20]);
        assert!(p.transfer_governance(&gov, Address::ZERO).is_err());
        p.transfer_governance(&gov, next).unwrap();
        assert!(p.require_governance(&gov).is_err());
        assert!(p.require_governance(&next).is_ok());
    }
}
