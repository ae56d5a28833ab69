// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkOption {
    // fetch and decode the active configuration descriptor of each leaf device
    IncludeConfigurationDescriptors,
    // resolve manufacturer/product/serial (and interface) string descriptors
    IncludeStringDescriptors,
    // map driver key names to PnP device instance ids; identity keys depend on this
    ResolveDeviceInstanceIds,
}
