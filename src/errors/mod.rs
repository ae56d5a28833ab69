// Copyright (c) ScaleFS LLC; used with permission
// Licensed under the MIT License

mod buffer_bounds_error;
pub use buffer_bounds_error::BufferBoundsError;

mod descriptor_error;
pub use descriptor_error::DescriptorError;

mod enumerate_error;
pub use enumerate_error::EnumerateError;

mod identity_error;
pub use identity_error::IdentityError;

mod node_error;
pub use node_error::NodeError;

mod query_error;
pub use query_error::QueryError;

mod string_error;
pub use string_error::StringError;
