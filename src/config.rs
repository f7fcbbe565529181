//! Node configuration
//!
//! The addressable identity of this mount node is resolved once by the
//! caller (from its parameter store) and passed in at construction.

/// Addressable system/component identity used to filter inbound commands
///
/// An unresolved field leaves the corresponding filter permissive, so a
/// node without a configured address accepts commands for any target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeAddress {
    pub system_id: Option<u8>,
    pub component_id: Option<u8>,
}

impl NodeAddress {
    /// Create a fully resolved address
    pub fn new(system_id: u8, component_id: u8) -> Self {
        Self {
            system_id: Some(system_id),
            component_id: Some(component_id),
        }
    }

    /// Check whether a command addressed to `target_system`/`target_component`
    /// is meant for this node
    ///
    /// A target component of 0 is a broadcast to all components of the
    /// target system.
    pub fn accepts(&self, target_system: u8, target_component: u8) -> bool {
        let system_ok = self.system_id.map_or(true, |id| id == target_system);
        let component_ok = target_component == 0
            || self.component_id.map_or(true, |id| id == target_component);

        system_ok && component_ok
    }
}
