// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

mod support;

use support::{FakeDevice, FakeUsbHost, ERROR_FILE_NOT_FOUND, ERROR_GEN_FAILURE};
use win_usb_topology::{
    ConnectionStatus,
    DescriptorError,
    DeviceSpeed,
    EnumerateError,
    EnumerationResult,
    HardwareNode,
    IssueSeverity,
    NodeError,
    NodeInfo,
    PortEnumerator,
    PortResult,
    QueryError,
    QueryKind,
    StringError,
    UsbIoControl,
    UsbTopologyEnumerator,
    WalkOption,
};

const HOST_CONTROLLER: &str = "\\\\?\\pci#ven_8086&dev_a36d&subsys_00000000&rev_10#3&11583659&0&a0#{3abf6f2d-71c4-462a-8a92-1e6861e6af27}";
const ROOT_HUB: &str = "USB#ROOT_HUB30#4&2ae6a2c0&0&0#{f18a0e88-c30c-11d0-8815-00a0c906bed8}";
const EXTERNAL_HUB: &str = "USB#VID_05E3&PID_0610#6&1c5bb1e6&0&4#{f18a0e88-c30c-11d0-8815-00a0c906bed8}";

fn all_options() -> Vec<WalkOption> {
    vec![WalkOption::IncludeConfigurationDescriptors, WalkOption::IncludeStringDescriptors, WalkOption::ResolveDeviceInstanceIds]
}

fn walk(host: &FakeUsbHost) -> EnumerationResult {
    UsbTopologyEnumerator::enumerate_usb_topology_with_options(host, all_options()).unwrap()
}

fn root_hub(result: &EnumerationResult) -> &HardwareNode {
    let host_controller = &result.tree[0];
    assert_eq!(host_controller.children.len(), 1);
    &host_controller.children[0]
}

#[test]
fn hub_with_empty_ports_and_a_nested_hub() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 4)
        .with_device(ROOT_HUB, 2, FakeDevice::new(0x046d, 0xc077, "5&2b1e9f6&0&2").with_product("USB Optical Mouse"))
        .with_external_hub(ROOT_HUB, 4, EXTERNAL_HUB, 2)
        .with_device(EXTERNAL_HUB, 1, FakeDevice::new(0x0781, 0x5581, "4C530001230520118474"));

    let result = walk(&host);
    assert!(result.issues.is_empty(), "unexpected issues: {:?}", result.issues);

    let root_hub = root_hub(&result);
    assert_eq!(root_hub.label, "RootHub");
    assert_eq!(root_hub.children.len(), 2);
    assert!(root_hub.child_at_port(1).is_none());
    assert!(root_hub.child_at_port(3).is_none());

    let mouse = root_hub.child_at_port(2).unwrap();
    assert_eq!(mouse.label, "[Port2] USB Optical Mouse");
    assert!(mouse.children.is_empty());

    let external_hub = root_hub.child_at_port(4).unwrap();
    assert_eq!(external_hub.label, "[Port4] ExternalHub");
    match &external_hub.info {
        NodeInfo::ExternalHub(info) => {
            assert_eq!(info.hub.hub_name, EXTERNAL_HUB);
            assert_eq!(info.hub.information.number_of_ports, 2);
            assert!(info.connection.device_is_hub);
        },
        other => panic!("expected an external hub, found {:?}", other),
    }
    assert_eq!(external_hub.children.len(), 1);
    assert_eq!(external_hub.children[0].port(), Some(1));

    // exactly two leaf devices, in port order
    let devices = result.tree[0].devices();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].connection.connection_index, 2);
    assert_eq!(devices[1].connection.connection_index, 1);
    assert_eq!(devices[1].connection.device_descriptor.unwrap().vendor_id, 0x0781);

    assert_eq!(result.devices_connected, 3);
    assert_eq!(result.hubs, 1);
    assert_eq!(result.devices.len(), 2);
}

#[test]
fn identities_are_keyed_by_lower_case_vendor_and_product() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 2)
        .with_device(ROOT_HUB, 1, FakeDevice::new(0x1234, 0x5678, "ABC123").with_product("Widget"))
        .with_device(ROOT_HUB, 2, FakeDevice::new(0xabcd, 0xef01, "5&1f0a&0&2"));

    let result = walk(&host);

    let widget = result.device("USB\\VID_1234&PID_5678\\ABC123").unwrap();
    assert_eq!(widget.manufacturer.as_deref(), Some("Contoso"));
    assert_eq!(widget.product.as_deref(), Some("Widget"));
    assert_eq!(widget.serial_number.as_deref(), Some("ABC123"));

    // the PnP instance id carries upper-case hex; the identity does not
    assert!(result.device("USB\\VID_abcd&PID_ef01\\5&1f0a&0&2").is_some());
    assert!(result.device("USB\\VID_ABCD&PID_EF01\\5&1f0a&0&2").is_none());

    let identity = result.devices.keys().find(|identity| identity.vendor_id() == 0xabcd).unwrap();
    assert_eq!(identity.product_id(), 0xef01);
    assert_eq!(identity.suffix(), "5&1f0a&0&2");
}

#[test]
fn a_suspended_device_is_skipped_and_its_sibling_is_kept() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 2)
        .with_device(ROOT_HUB, 1, FakeDevice::new(0x0bda, 0x8153, "000001").suspended())
        .with_device(ROOT_HUB, 2, FakeDevice::new(0x046d, 0xc31c, "6&3a5b&0&2").with_product("USB Keyboard"));

    let result = walk(&host);

    assert!(result.device("USB\\VID_0bda&PID_8153\\000001").is_none());
    assert!(result.device("USB\\VID_046d&PID_c31c\\6&3a5b&0&2").is_some());

    let root_hub = root_hub(&result);
    assert!(root_hub.child_at_port(1).is_none());
    assert_eq!(root_hub.child_at_port(2).unwrap().label, "[Port2] USB Keyboard");

    assert_eq!(result.issues.len(), 1);
    let issue = &result.issues[0];
    assert_eq!(issue.severity, IssueSeverity::Skipped);
    assert_eq!(issue.location.port, Some(1));
    assert_eq!(issue.location.hub_name.as_deref(), Some(ROOT_HUB));
    match &issue.error {
        NodeError::String(StringError::LanguageListUnavailable(error)) => assert_eq!(error.win32_error(), Some(ERROR_GEN_FAILURE)),
        other => panic!("unexpected error {:?}", other),
    }

    // the skipped device is present on the bus, so it still counts as connected
    assert_eq!(result.devices_connected, 2);
}

#[test]
fn every_handle_is_closed_and_only_one_is_open_at_a_time() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 4)
        .with_device(ROOT_HUB, 1, FakeDevice::new(0x046d, 0xc077, "1"))
        .with_external_hub(ROOT_HUB, 3, EXTERNAL_HUB, 4)
        .with_device(EXTERNAL_HUB, 2, FakeDevice::new(0x0781, 0x5581, "2"));

    let result = walk(&host);
    assert_eq!(result.tree[0].devices().len(), 2);

    assert_eq!(host.open_handles(), 0);
    assert_eq!(host.max_open_handles(), 1);
}

#[test]
fn legacy_hub_drivers_fall_back_to_the_original_connection_query() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 1)
        .with_legacy_hub(ROOT_HUB)
        .with_device(ROOT_HUB, 1, FakeDevice::new(0x04b4, 0x0008, "LEGACY1"));

    let result = walk(&host);
    assert!(result.issues.is_empty(), "unexpected issues: {:?}", result.issues);

    let devices = result.tree[0].devices();
    assert_eq!(devices.len(), 1);
    assert!(devices[0].connection.legacy);
    assert_eq!(devices[0].connection.speed, DeviceSpeed::Full);
    assert!(result.device("USB\\VID_04b4&PID_0008\\LEGACY1").is_some());

    let kinds: Vec<QueryKind> = host.queries_for_port(&format!("\\\\.\\{}", ROOT_HUB), 1).iter().map(|query| query.kind).take(2).collect();
    assert_eq!(kinds, vec![QueryKind::NodeConnectionInformationEx, QueryKind::NodeConnectionInformation]);
}

#[test]
fn failing_to_list_host_controllers_is_fatal() {
    let host = FakeUsbHost::new().with_host_controller(HOST_CONTROLLER, ROOT_HUB, 1).failing_enumeration(5);
    let result = UsbTopologyEnumerator::enumerate_usb_topology_with_options(&host, all_options());
    assert!(matches!(result, Err(EnumerateError::Win32Error(5))));
    assert!(host.queries().is_empty());
}

#[test]
fn an_unopenable_host_controller_does_not_stop_the_walk() {
    let host = FakeUsbHost::new()
        .with_unopenable_host_controller("\\\\?\\pci#ven_1b21&dev_1242#missing")
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 1)
        .with_device(ROOT_HUB, 1, FakeDevice::new(0x046d, 0xc077, "7"));

    let result = walk(&host);

    assert_eq!(result.tree.len(), 1);
    assert_eq!(result.tree[0].label, HOST_CONTROLLER);
    assert_eq!(result.devices.len(), 1);

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].severity, IssueSeverity::SubtreeAborted);
    assert!(matches!(result.issues[0].error, NodeError::OpenFailed(_, 2)));
}

#[test]
fn a_device_which_failed_to_come_up_is_reported_without_descriptor_requests() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 2)
        .with_failed_port(ROOT_HUB, 1, ConnectionStatus::DeviceNotEnoughPower)
        .with_device(ROOT_HUB, 2, FakeDevice::new(0x046d, 0xc077, "8"));

    let result = walk(&host);

    let failed = root_hub(&result).child_at_port(1).unwrap();
    assert_eq!(failed.label, format!("[Port1] {}", ConnectionStatus::DeviceNotEnoughPower));
    match &failed.info {
        NodeInfo::Device(device) => {
            assert_eq!(device.connection.status, ConnectionStatus::DeviceNotEnoughPower);
            assert!(device.identity.is_none());
            assert!(device.configuration.is_none());
        },
        other => panic!("expected a device, found {:?}", other),
    }

    let descriptor_requests = host
        .queries_for_port(&format!("\\\\.\\{}", ROOT_HUB), 1)
        .into_iter()
        .filter(|query| query.kind == QueryKind::DescriptorFromNodeConnection)
        .count();
    assert_eq!(descriptor_requests, 0);

    assert_eq!(result.devices.len(), 1);
    assert_eq!(result.devices_connected, 1);
}

#[test]
fn a_missing_string_degrades_the_device() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 1)
        .with_device(ROOT_HUB, 1, FakeDevice::new(0x1234, 0x0001, "NOPRODUCT").without_string(2));

    let result = walk(&host);

    let strings = result.device("USB\\VID_1234&PID_0001\\NOPRODUCT").unwrap();
    assert_eq!(strings.manufacturer.as_deref(), Some("Contoso"));
    assert_eq!(strings.product, None);

    let device = root_hub(&result).child_at_port(1).unwrap();
    assert_eq!(device.label, "[Port1] 1234:0001");

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].severity, IssueSeverity::Degraded);
    assert!(matches!(result.issues[0].error, NodeError::String(StringError::Query { index: 2, .. })));
}

#[test]
fn each_string_descriptor_is_requested_once() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 1)
        .with_device(ROOT_HUB, 1, FakeDevice::new(0x1234, 0x0002, "ONCE"));

    let result = walk(&host);
    let device = &result.tree[0].devices()[0];
    assert_eq!(device.strings.primary_language_id(), Some(support::LANGUAGE_EN_US));
    // manufacturer, product, serial number and the interface string
    assert_eq!(device.strings.len(), 4);
    assert_eq!(device.strings.get(4), Some("Boot Mouse"));

    let mut string_requests: Vec<u8> = host
        .queries_for_port(&format!("\\\\.\\{}", ROOT_HUB), 1)
        .iter()
        .filter_map(|query| query.descriptor)
        .filter(|(descriptor_type, _, _)| *descriptor_type == 3)
        .map(|(_, index, _)| index)
        .collect();
    string_requests.sort_unstable();
    assert_eq!(string_requests, vec![0, 1, 2, 3, 4]);
}

#[test]
fn configuration_descriptors_are_read_in_two_steps() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 1)
        .with_device(ROOT_HUB, 1, FakeDevice::new(0x1234, 0x0003, "CONFIG"));

    let result = walk(&host);
    let configuration = result.tree[0].devices()[0].configuration.clone().unwrap();
    assert_eq!(configuration.total_length, 34);
    assert_eq!(configuration.interfaces().count(), 1);
    assert_eq!(configuration.sub_descriptors.len(), 3);

    let configuration_requests = host
        .queries_for_port(&format!("\\\\.\\{}", ROOT_HUB), 1)
        .into_iter()
        .filter(|query| matches!(query.descriptor, Some((2, 0, _))))
        .count();
    assert_eq!(configuration_requests, 2);
}

#[test]
fn without_options_only_the_topology_is_read() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 2)
        .with_device(ROOT_HUB, 2, FakeDevice::new(0x1234, 0x0004, "BARE"));

    let result = UsbTopologyEnumerator::enumerate_usb_topology_with_options(&host, Vec::new()).unwrap();

    let devices = result.tree[0].devices();
    assert_eq!(devices.len(), 1);
    assert!(devices[0].configuration.is_none());
    assert!(devices[0].strings.is_empty());
    assert!(devices[0].device_instance_id.is_none());
    assert!(devices[0].driver_key_name.is_some());
    // no instance id, no identity
    assert!(result.devices.is_empty());
    assert_eq!(result.devices_connected, 1);

    assert!(host.queries().iter().all(|query| query.kind != QueryKind::DescriptorFromNodeConnection));
}

#[test]
fn the_rendered_tree_is_indented_by_depth() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 2)
        .with_external_hub(ROOT_HUB, 1, EXTERNAL_HUB, 1)
        .with_device(EXTERNAL_HUB, 1, FakeDevice::new(0x1234, 0x0005, "TREE").with_product("Gamepad"));

    let rendered = walk(&host).render_tree();
    let expected = format!("{}\n  RootHub\n    [Port1] ExternalHub\n      [Port1] Gamepad\n", HOST_CONTROLLER);
    assert_eq!(rendered, expected);
}

#[test]
fn port_enumerator_classifies_each_port() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 4)
        .with_device(ROOT_HUB, 1, FakeDevice::new(0x1234, 0x0006, "P1"))
        .with_external_hub(ROOT_HUB, 2, EXTERNAL_HUB, 2)
        .with_device(ROOT_HUB, 4, FakeDevice::new(0x1234, 0x0007, "P4").suspended());

    let options = all_options();
    let ports = PortEnumerator::new(&host, &options);
    let handle = host.open(&format!("\\\\.\\{}", ROOT_HUB)).unwrap();
    let results = ports.enumerate_ports(&handle, 4);

    assert_eq!(results.iter().map(PortResult::port).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert!(matches!(&results[0], PortResult::Device(device, degraded) if device.identity.is_some() && degraded.is_empty()));
    assert!(matches!(&results[1], PortResult::Hub(hub, _) if hub.hub_name == EXTERNAL_HUB && hub.device_instance_id.is_some()));
    assert!(matches!(&results[2], PortResult::Empty(3)));
    assert!(matches!(&results[3], PortResult::Skipped(4, NodeError::String(_))));

    // a port beyond the hub's port count is rejected by the hub driver
    assert!(matches!(
        ports.enumerate_port(&handle, 9),
        PortResult::Failed(9, None, NodeError::Query(QueryError::Win32Error(QueryKind::NodeConnectionInformationEx, ERROR_GEN_FAILURE)))
    ));

    drop(handle);
    assert_eq!(host.open_handles(), 0);
}

#[test]
fn an_external_hub_which_cannot_be_opened_aborts_only_its_subtree() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 3)
        .with_device(ROOT_HUB, 1, FakeDevice::new(0x1234, 0x0101, "LEFT"))
        .with_external_hub(ROOT_HUB, 2, EXTERNAL_HUB, 2)
        .with_device(EXTERNAL_HUB, 1, FakeDevice::new(0x1234, 0x0102, "HIDDEN"))
        .with_unopenable_hub(EXTERNAL_HUB)
        .with_device(ROOT_HUB, 3, FakeDevice::new(0x1234, 0x0103, "RIGHT"));

    let result = walk(&host);

    let root_hub = root_hub(&result);
    assert!(root_hub.child_at_port(1).is_some());
    assert!(root_hub.child_at_port(2).is_none());
    assert!(root_hub.child_at_port(3).is_some());
    assert!(result.device("USB\\VID_1234&PID_0101\\LEFT").is_some());
    assert!(result.device("USB\\VID_1234&PID_0103\\RIGHT").is_some());
    assert!(result.device("USB\\VID_1234&PID_0102\\HIDDEN").is_none());

    assert_eq!(result.issues.len(), 1);
    let issue = &result.issues[0];
    assert_eq!(issue.severity, IssueSeverity::SubtreeAborted);
    assert_eq!(issue.location.port, Some(2));
    assert!(matches!(&issue.error, NodeError::OpenFailed(device_path, ERROR_FILE_NOT_FOUND) if device_path.ends_with(EXTERNAL_HUB)));

    // the hub was seen on its port even though it could not be walked
    assert_eq!(result.hubs, 1);
    assert_eq!(result.devices_connected, 3);
    assert_eq!(host.open_handles(), 0);
}

#[test]
fn a_hub_failing_after_it_was_opened_is_closed() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 2)
        .with_external_hub(ROOT_HUB, 1, EXTERNAL_HUB, 4)
        .with_failing_node_information(EXTERNAL_HUB, ERROR_GEN_FAILURE)
        .with_device(ROOT_HUB, 2, FakeDevice::new(0x1234, 0x0201, "SIBLING"));

    let result = walk(&host);

    let hub_path = format!("\\\\.\\{}", EXTERNAL_HUB);
    assert!(host.queries().iter().any(|query| query.target == hub_path && query.kind == QueryKind::NodeInformation));
    assert_eq!(host.open_handles(), 0);
    assert_eq!(host.max_open_handles(), 1);

    assert!(root_hub(&result).child_at_port(1).is_none());
    assert!(result.device("USB\\VID_1234&PID_0201\\SIBLING").is_some());
    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].severity, IssueSeverity::SubtreeAborted);
    assert!(matches!(
        result.issues[0].error,
        NodeError::Query(QueryError::Win32Error(QueryKind::NodeInformation, ERROR_GEN_FAILURE))
    ));
}

#[test]
fn a_malformed_configuration_fails_only_that_device() {
    // a zero-length descriptor right after the configuration header
    let malformed = vec![9, 2, 13, 0, 1, 1, 0, 0x80, 50, 0, 4, 0, 0];
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 2)
        .with_device(ROOT_HUB, 1, FakeDevice::new(0x1234, 0x0301, "BROKEN").with_configuration(malformed))
        .with_device(ROOT_HUB, 2, FakeDevice::new(0x1234, 0x0302, "HEALTHY"));

    let result = walk(&host);

    assert!(root_hub(&result).child_at_port(1).is_none());
    assert!(result.device("USB\\VID_1234&PID_0301\\BROKEN").is_none());
    assert!(result.device("USB\\VID_1234&PID_0302\\HEALTHY").is_some());

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].severity, IssueSeverity::SubtreeAborted);
    assert_eq!(result.issues[0].location.port, Some(1));
    assert!(matches!(result.issues[0].error, NodeError::Descriptor(DescriptorError::InvalidSubDescriptorLength(9, 0))));

    // both ports report a connected device
    assert_eq!(result.devices_connected, 2);
    assert_eq!(result.hubs, 0);
    assert_eq!(host.open_handles(), 0);
}

#[test]
fn a_hub_without_a_name_is_still_counted() {
    let host = FakeUsbHost::new()
        .with_host_controller(HOST_CONTROLLER, ROOT_HUB, 2)
        .with_nameless_hub(ROOT_HUB, 1)
        .with_device(ROOT_HUB, 2, FakeDevice::new(0x1234, 0x0401, "NEXT"));

    let result = walk(&host);

    assert_eq!(result.hubs, 1);
    assert_eq!(result.devices_connected, 2);
    assert_eq!(result.devices.len(), 1);
    assert_eq!(result.issues.len(), 1);
    assert!(matches!(result.issues[0].error, NodeError::Query(QueryError::EmptyName(QueryKind::NodeConnectionName))));
}
