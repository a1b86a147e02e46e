//! ## Context
//!
//! Before any work can be submitted in Vulkan, three kinds of objects have to exist: an [Instance] which represents
//! the connection to the Vulkan implementation, a logical [Device] created on one of the instance's
//! [physical devices](PhysicalDevice), and the device's [queues](Queue).
//!
//! Each owning object has a matching builder ([InstanceBuilder], [DeviceBuilder]) which collects the verbose creation
//! parameters, issues exactly one creation call and hands the result to the owning wrapper. The wrappers are not
//! clonable, destroy their handle exactly once when dropped and can be emptied via `take`.
//!
//! Since instance and device usually live together, [Ctx] bundles both and drops them in the correct order.
//!
//! # Examples
//! ```no_run
//! use vkboot::context::{DeviceBuilder, Instance};
//!
//! let mut instance_builder = Instance::load()?;
//! instance_builder.with_application_name("demo").with_api_version(1, 0, 0);
//! let instance = instance_builder.create()?;
//!
//! let physical_device = instance.enumerate_physical_devices()?.remove(0);
//! let family = physical_device.queue_families().remove(0);
//!
//! let mut device_builder = DeviceBuilder::new();
//! device_builder
//!     .select_physical_device(&physical_device)
//!     .add_queues(&family, vec![1.0]);
//! let device = device_builder.create()?;
//! # Ok::<(), vkboot::VkbootError>(())
//! ```

mod instance;
pub use instance::{Instance, InstanceBuilder, InstanceInfo};

mod device;
pub use device::{Device, DeviceBuilder};

mod queue;
pub use queue::{Queue, QueueRequest};

mod physical_device;
pub use physical_device::{PhysicalDevice, PhysicalDeviceFilter, PhysicalDeviceType, QueueFamily};

mod debugger;
#[cfg(feature = "logging")]
pub use debugger::LogCallback;
pub use debugger::{
    CallbackData, DebugCallback, DebugRegistration, debug_report_trampoline, report_flags,
};

use crate::VkbootError;

///An instance together with one device created on it. Fields drop in declaration order, so the device always goes
/// before the instance.
#[derive(Debug)]
pub struct Ctx {
    ///Vulkan device including associated queues.
    pub device: Device,
    ///The vulkan instance used for the context.
    pub instance: Instance,
}

impl Ctx {
    ///Creates a context with one queue of the best suited graphics family on the Vulkan loader of the system.
    /// If `use_validation` is set, the validation layer is enabled and a [LogCallback] is attached.
    #[cfg(feature = "logging")]
    pub fn new_default_headless(use_validation: bool) -> Result<Self, VkbootError> {
        let mut instance_builder = Instance::load()?;
        if use_validation {
            instance_builder.enable_validation();
        }
        let mut ctx = Self::new_default_from_builder(&instance_builder)?;
        if use_validation {
            ctx.instance
                .set_debug_listener(Some(std::sync::Arc::new(LogCallback)), true)?;
        }
        Ok(ctx)
    }

    ///Creates the instance described by `instance_builder`, picks the most preferable physical device with a graphics
    /// queue and creates a device with one queue of the first such family.
    pub fn new_default_from_builder(
        instance_builder: &InstanceBuilder,
    ) -> Result<Self, VkbootError> {
        let instance = instance_builder.create()?;

        let mut candidates = instance
            .create_physical_device_filter()?
            .filter_queue_flags(ash::vk::QueueFlags::GRAPHICS)
            .sort_by_preference()
            .release();

        if candidates.is_empty() {
            #[cfg(feature = "logging")]
            log::error!("No physical device with a graphics queue found");
            return Err(VkbootError::Other(
                "No physical device with a graphics queue found".to_owned(),
            ));
        }
        let physical_device = candidates.remove(0);

        #[cfg(feature = "logging")]
        log::info!("Selected device: {:?}", physical_device);

        let Some(family) = physical_device
            .queue_families()
            .into_iter()
            .find(|f| f.has_graphics_support())
        else {
            return Err(VkbootError::Other(format!(
                "{} has no graphics queue family",
                physical_device.device_name()
            )));
        };

        let device = DeviceBuilder::new()
            .select_physical_device(&physical_device)
            .add_queues(&family, vec![1.0])
            .create()?;

        Ok(Ctx { device, instance })
    }
}
