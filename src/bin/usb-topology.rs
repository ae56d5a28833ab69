// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

// prints the USB topology of this machine; set RUST_LOG=debug for a per-port trace

#[cfg(target_os = "windows")]
fn main() {
    use win_usb_topology::UsbTopologyEnumerator;

    env_logger::init();

    let result = match UsbTopologyEnumerator::enumerate_usb_topology() {
        Ok(value) => value,
        Err(error) => {
            eprintln!("usb-topology: {}", error);
            std::process::exit(1);
        },
    };

    print!("{}", result.render_tree());
    println!();
    println!("{} device(s) connected, {} external hub(s)", result.devices_connected, result.hubs);

    let mut identities: Vec<_> = result.devices.iter().collect();
    identities.sort_by(|left, right| left.0.as_str().cmp(right.0.as_str()));
    for (identity, strings) in identities {
        println!(
            "{}  {}{}",
            identity,
            strings.display_name().unwrap_or_default(),
            strings.serial_number.as_ref().map(|serial_number| format!(" (serial {})", serial_number)).unwrap_or_default()
        );
    }

    for issue in &result.issues {
        eprintln!("{}", issue);
    }
}

#[cfg(not(target_os = "windows"))]
fn main() {
    env_logger::init();
    eprintln!("usb-topology: USB topology enumeration is only supported on Windows");
    std::process::exit(1);
}
