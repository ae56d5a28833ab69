// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

mod connection_status;
pub use connection_status::ConnectionStatus;

mod device_speed;
pub use device_speed::DeviceSpeed;

mod query_kind;
pub use query_kind::QueryKind;

mod walk_option;
pub use walk_option::WalkOption;
