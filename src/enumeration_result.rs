// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{DeviceIdentity, DeviceStrings, HardwareNode, WalkIssue};
use std::collections::HashMap;

/// The outcome of one topology walk.
#[derive(Debug, Default)]
pub struct EnumerationResult {
    // leaf devices which could be identified, keyed by `USB\VID_xxxx&PID_xxxx\<suffix>`
    pub devices: HashMap<DeviceIdentity, DeviceStrings>,
    // one root per host controller
    pub tree: Vec<HardwareNode>,
    pub issues: Vec<WalkIssue>,
    //
    // ports reporting DeviceConnected, and ports reporting a hub
    pub devices_connected: u32,
    pub hubs: u32,
}

impl EnumerationResult {
    pub fn device(&self, identity: &str) -> Option<&DeviceStrings> {
        self.devices.get(identity)
    }

    pub fn render_tree(&self) -> String {
        let mut output = String::new();
        for root in &self.tree {
            root.render_into(&mut output, 0);
        }
        output
    }
}
