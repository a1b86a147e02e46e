//! # vkboot
//!
//! Ownership-safe wrappers around the Vulkan bootstrap objects.
//!
//! # Usage
//!
//! vkboot provides you with owning wrappers around the objects needed before any rendering or compute work can
//! happen: the [Instance](context::Instance), the [Device](context::Device) and the device's
//! [queues](context::Queue). Those wrappers take care of destroying their handles exactly once, in the right order.
//! Each has a builder ([InstanceBuilder](context::InstanceBuilder), [DeviceBuilder](context::DeviceBuilder)) that
//! collects the creation parameters and can be reused.
//!
//! All calls into Vulkan go through the [Driver](driver::Driver) trait. [AshDriver](driver::AshDriver) loads the
//! system's Vulkan loader at runtime.
//!
//! Structures that are not sensitive to lifetime requirements (like create info) are not wrapped.

pub use ash;

///Structures you need to get starting. Basically [Instance](context::Instance) and [Device](context::Device) creation,
/// physical device queries and debug listeners.
pub mod context;

///The native layer every wrapper calls into.
pub mod driver;

mod error;
pub use error::{
    DeviceError, InstanceError, NativeCallError, PreconditionError, VkbootError, describe_result,
};

pub fn version_major() -> u32 {
    env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0)
}

pub fn version_minor() -> u32 {
    env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0)
}

pub fn version_patch() -> u32 {
    env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0)
}

///Crate version as `major.minor.patch`.
pub fn version_string() -> String {
    format!("{}.{}.{}", version_major(), version_minor(), version_patch())
}
