//! ## Driver
//!
//! Every call vkboot makes into Vulkan goes through the [Driver] trait. The wrappers in [context](crate::context)
//! never talk to a loader directly, they only hold an `Arc<dyn Driver>` and the raw handles it handed out.
//!
//! The default implementation, [AshDriver], loads the Vulkan loader at runtime via [ash::Entry::load] and keeps the
//! per-instance and per-device dispatch tables around for as long as the handle lives.
//!
//! Only the bootstrap entry points are exposed: instance and device creation/destruction, physical device and queue
//! queries and the (optional) debug-report extension.

use ash::vk;

mod ash_driver;
pub use ash_driver::AshDriver;

#[cfg(test)]
pub(crate) mod mock;

///Debug-report entry points of a single instance. Resolved at runtime, see [Driver::load_debug_report].
pub trait DebugReportFns: Send + Sync {
    fn create_debug_report_callback(
        &self,
        create_info: &vk::DebugReportCallbackCreateInfoEXT<'_>,
    ) -> Result<vk::DebugReportCallbackEXT, vk::Result>;

    fn destroy_debug_report_callback(&self, callback: vk::DebugReportCallbackEXT);
}

///The native layer. Implemented by [AshDriver] for real hardware.
///
/// Handles passed in are always ones previously returned by the same driver.
pub trait Driver: Send + Sync {
    fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo<'_>,
    ) -> Result<vk::Instance, vk::Result>;

    fn destroy_instance(&self, instance: vk::Instance);

    ///Raw two-call enumeration. If `physical_devices` is `None` only `count` is written. Otherwise
    /// at most `count` handles are written and `count` is updated to the number actually written.
    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
        count: &mut u32,
        physical_devices: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result;

    fn get_physical_device_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties;

    fn get_physical_device_queue_family_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties>;

    fn create_device(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        create_info: &vk::DeviceCreateInfo<'_>,
    ) -> Result<vk::Device, vk::Result>;

    fn get_device_queue(&self, device: vk::Device, family_index: u32, queue_index: u32)
    -> vk::Queue;

    fn destroy_device(&self, device: vk::Device);

    ///Looks up `vkCreateDebugReportCallbackEXT` and `vkDestroyDebugReportCallbackEXT` by name. Returns `None`
    /// if either is not available on this instance, which usually means the extension was not enabled.
    fn load_debug_report(&self, instance: vk::Instance) -> Option<Box<dyn DebugReportFns>>;
}
