// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

use crate::{
    size_negotiated_query::{QueryRequest, SizeNegotiatedQuery},
    ConnectionStatus,
    EnumerateError,
    EnumerationResult,
    ExternalHubInfo,
    HardwareNode,
    HostControllerInfo,
    HostControllerInterface,
    HubInfo,
    HubInformation,
    IssueSeverity,
    NodeError,
    NodeInfo,
    NodeLocation,
    PortEnumerator,
    PortResult,
    UsbIoControl,
    WalkIssue,
    WalkOption,
};
#[cfg(target_os = "windows")]
use crate::Win32UsbIoControl;
use log::{debug, info, warn};

const ROOT_HUB_LABEL: &str = "RootHub";

pub struct UsbTopologyEnumerator {
}
//
impl UsbTopologyEnumerator {
    #[cfg(target_os = "windows")]
    pub fn enumerate_usb_topology() -> Result<EnumerationResult, EnumerateError> {
        let options = vec![WalkOption::IncludeConfigurationDescriptors, WalkOption::IncludeStringDescriptors, WalkOption::ResolveDeviceInstanceIds];

        UsbTopologyEnumerator::enumerate_usb_topology_with_options(&Win32UsbIoControl::new(), options)
    }
    //
    /// Walks every host controller reachable through `io`.  Only a failure to list the host controllers fails
    /// the call; every other failure is recorded as a WalkIssue and the walk continues with the next sibling.
    pub fn enumerate_usb_topology_with_options<T: UsbIoControl>(io: &T, options: Vec<WalkOption>) -> Result<EnumerationResult, EnumerateError> {
        let host_controllers = io.enumerate_host_controllers()?;
        debug!("found {} USB host controller interface(s)", host_controllers.len());

        let mut walker = TreeWalker {
            io,
            query: SizeNegotiatedQuery::new(io),
            ports: PortEnumerator::new(io, &options),
            result: EnumerationResult::default(),
        };
        for host_controller in host_controllers {
            if let Some(node) = walker.enumerate_host_controller(host_controller) {
                walker.result.tree.push(node);
            }
        }

        let result = walker.result;
        info!(
            "USB topology: {} host controller(s), {} device(s) connected, {} external hub(s), {} identified device(s), {} issue(s)",
            result.tree.len(),
            result.devices_connected,
            result.hubs,
            result.devices.len(),
            result.issues.len()
        );
        Ok(result)
    }
}

// the state of a single walk; nothing here outlives the call which created it
struct TreeWalker<'a, T: UsbIoControl> {
    io: &'a T,
    query: SizeNegotiatedQuery<'a, T>,
    ports: PortEnumerator<'a, T>,
    result: EnumerationResult,
}

impl<'a, T: UsbIoControl> TreeWalker<'a, T> {
    fn record_issue(&mut self, location: NodeLocation, severity: IssueSeverity, error: NodeError) {
        match severity {
            IssueSeverity::Degraded => debug!("{} ({}): {}", location, severity, error),
            _ => warn!("{} ({}): {}", location, severity, error),
        }
        self.result.issues.push(WalkIssue { location, severity, error });
    }

    fn enumerate_host_controller(&mut self, host_controller: HostControllerInterface) -> Option<HardwareNode> {
        let location = NodeLocation { host_controller: host_controller.device_path.clone(), hub_name: None, port: None };

        // NOTE: the host controller handle is only needed for its two name queries; it is closed (dropped) at the end of this block
        let (driver_key_name, root_hub_name) = {
            let handle = match self.io.open(&host_controller.device_path) {
                Ok(value) => value,
                Err(win32_error) => {
                    self.record_issue(location, IssueSeverity::SubtreeAborted, NodeError::OpenFailed(host_controller.device_path, win32_error));
                    return None;
                },
            };

            let driver_key_name = match self.query.query_name(&handle, &QueryRequest::hcd_driver_key_name()) {
                Ok(value) => Some(value),
                Err(error) => {
                    self.record_issue(location.clone(), IssueSeverity::Degraded, error.into());
                    None
                },
            };
            let root_hub_name = match self.query.query_name(&handle, &QueryRequest::root_hub_name()) {
                Ok(value) => Some(value),
                Err(error) => {
                    self.record_issue(location.clone(), IssueSeverity::SubtreeAborted, error.into());
                    None
                },
            };
            (driver_key_name, root_hub_name)
        };

        let mut children = Vec::<HardwareNode>::new();
        if let Some(root_hub_name) = &root_hub_name {
            match self.enumerate_hub(&location.host_controller, root_hub_name) {
                Ok((hub, hub_children)) => {
                    children.push(HardwareNode { label: ROOT_HUB_LABEL.to_string(), info: NodeInfo::RootHub(hub), children: hub_children });
                },
                Err(error) => {
                    let hub_location = NodeLocation { hub_name: Some(root_hub_name.clone()), ..location.clone() };
                    self.record_issue(hub_location, IssueSeverity::SubtreeAborted, error);
                },
            }
        }

        let info = HostControllerInfo {
            device_path: host_controller.device_path.clone(),
            driver_key_name,
            device_instance_id: host_controller.device_instance_id,
            bus_number: host_controller.bus_number,
            address: host_controller.address,
            root_hub_name,
        };
        Some(HardwareNode { label: host_controller.device_path, info: NodeInfo::HostController(info), children })
    }

    // opens the hub, classifies its ports, closes the hub and then descends into any external hubs found
    fn enumerate_hub(&mut self, host_controller: &str, hub_name: &str) -> Result<(HubInfo, Vec<HardwareNode>), NodeError> {
        let (information, port_results) = {
            let device_path = format!("\\\\.\\{}", hub_name);
            let handle = self.io.open(&device_path).map_err(|win32_error| NodeError::OpenFailed(device_path.clone(), win32_error))?;

            let buffer = self.query.query(&handle, &QueryRequest::node_information())?;
            let information = HubInformation::decode(&buffer)?;
            debug!("hub {}: {} port(s), bus powered: {}", hub_name, information.number_of_ports, information.is_bus_powered);

            let port_results = self.ports.enumerate_ports(&handle, information.number_of_ports);
            (information, port_results)
        };

        let mut children = Vec::<HardwareNode>::new();
        for port_result in port_results {
            let location = NodeLocation {
                host_controller: host_controller.to_string(),
                hub_name: Some(hub_name.to_string()),
                port: Some(port_result.port()),
            };

            match port_result {
                PortResult::Empty(_) => {},
                PortResult::Device(device, degraded) => {
                    if device.connection.status == ConnectionStatus::DeviceConnected {
                        self.result.devices_connected += 1;
                    }
                    for error in degraded {
                        self.record_issue(location.clone(), IssueSeverity::Degraded, error);
                    }
                    if let Some(identity) = &device.identity {
                        self.result.devices.insert(identity.clone(), device.device_strings());
                    }
                    children.push(HardwareNode { label: device.label(), info: NodeInfo::Device(device), children: Vec::new() });
                },
                PortResult::Hub(external_hub, degraded) => {
                    self.result.devices_connected += 1;
                    self.result.hubs += 1;
                    for error in degraded {
                        self.record_issue(location.clone(), IssueSeverity::Degraded, error);
                    }

                    // NOTE: no depth limit is applied; hub chaining depth is bounded by the hardware
                    match self.enumerate_hub(host_controller, &external_hub.hub_name) {
                        Ok((hub, hub_children)) => {
                            let label = format!("[Port{}] ExternalHub", external_hub.connection.connection_index);
                            let info = ExternalHubInfo {
                                connection: external_hub.connection,
                                hub,
                                driver_key_name: external_hub.driver_key_name,
                                device_instance_id: external_hub.device_instance_id,
                            };
                            children.push(HardwareNode { label, info: NodeInfo::ExternalHub(info), children: hub_children });
                        },
                        Err(error) => {
                            self.record_issue(location, IssueSeverity::SubtreeAborted, error);
                        },
                    }
                },
                PortResult::Skipped(_, error) => {
                    self.result.devices_connected += 1;
                    self.record_issue(location, IssueSeverity::Skipped, error);
                },
                PortResult::Failed(_, connection, error) => {
                    if let Some(connection) = connection {
                        if connection.status == ConnectionStatus::DeviceConnected {
                            self.result.devices_connected += 1;
                        }
                        if connection.device_is_hub {
                            self.result.hubs += 1;
                        }
                    }
                    self.record_issue(location, IssueSeverity::SubtreeAborted, error);
                },
            }
        }

        Ok((HubInfo { hub_name: hub_name.to_string(), information }, children))
    }
}
