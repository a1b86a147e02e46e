use std::{fmt::Debug, sync::Arc};

use ash::vk;

use crate::driver::Driver;

///Category of a physical device as reported by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysicalDeviceType {
    Other,
    IntegratedGpu,
    DiscreteGpu,
    VirtualGpu,
    Cpu,
}

impl PhysicalDeviceType {
    ///Lower is better. Used when sorting device candidates.
    pub fn preference(&self) -> u32 {
        match self {
            PhysicalDeviceType::DiscreteGpu => 0,
            PhysicalDeviceType::VirtualGpu => 1,
            PhysicalDeviceType::IntegratedGpu => 2,
            PhysicalDeviceType::Cpu => 3,
            PhysicalDeviceType::Other => 4,
        }
    }
}

impl From<vk::PhysicalDeviceType> for PhysicalDeviceType {
    fn from(ty: vk::PhysicalDeviceType) -> Self {
        match ty {
            vk::PhysicalDeviceType::INTEGRATED_GPU => PhysicalDeviceType::IntegratedGpu,
            vk::PhysicalDeviceType::DISCRETE_GPU => PhysicalDeviceType::DiscreteGpu,
            vk::PhysicalDeviceType::VIRTUAL_GPU => PhysicalDeviceType::VirtualGpu,
            vk::PhysicalDeviceType::CPU => PhysicalDeviceType::Cpu,
            _ => PhysicalDeviceType::Other,
        }
    }
}

///Read-only snapshot of a physical device's properties, taken when the device was enumerated.
///
/// Only valid while the [Instance](crate::context::Instance) it was enumerated from is alive.
#[derive(Clone)]
pub struct PhysicalDevice {
    driver: Arc<dyn Driver>,
    instance: vk::Instance,
    handle: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
}

impl Debug for PhysicalDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalDevice")
            .field("handle", &self.handle)
            .field("name", &self.device_name())
            .field("type", &self.device_type())
            .finish_non_exhaustive()
    }
}

impl PhysicalDevice {
    ///Queries the properties of `handle` and wraps them.
    pub fn new(
        driver: Arc<dyn Driver>,
        instance: vk::Instance,
        handle: vk::PhysicalDevice,
    ) -> Self {
        let properties = if handle != vk::PhysicalDevice::null() {
            driver.get_physical_device_properties(instance, handle)
        } else {
            vk::PhysicalDeviceProperties::default()
        };

        PhysicalDevice {
            driver,
            instance,
            handle,
            properties,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.handle != vk::PhysicalDevice::null()
    }

    pub fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    ///Instance this device was enumerated from.
    pub fn instance(&self) -> vk::Instance {
        self.instance
    }

    pub(crate) fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    ///Supported Vulkan version, packed as by [vk::make_api_version].
    pub fn api_version(&self) -> u32 {
        self.properties.api_version
    }

    ///Vendor specific driver version.
    pub fn driver_version(&self) -> u32 {
        self.properties.driver_version
    }

    pub fn vendor_id(&self) -> u32 {
        self.properties.vendor_id
    }

    pub fn device_id(&self) -> u32 {
        self.properties.device_id
    }

    pub fn device_type(&self) -> PhysicalDeviceType {
        self.properties.device_type.into()
    }

    ///UTF-8 name of the device, without the trailing nul bytes.
    pub fn device_name(&self) -> String {
        let bytes: &[u8] = bytemuck::cast_slice(self.properties.device_name.as_slice());
        match std::ffi::CStr::from_bytes_until_nul(bytes) {
            Ok(name) => name.to_string_lossy().into_owned(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    pub fn pipeline_cache_uuid(&self) -> [u8; vk::UUID_SIZE] {
        self.properties.pipeline_cache_uuid
    }

    pub fn limits(&self) -> &vk::PhysicalDeviceLimits {
        &self.properties.limits
    }

    pub fn sparse_properties(&self) -> &vk::PhysicalDeviceSparseProperties {
        &self.properties.sparse_properties
    }

    ///Queries all queue families of this device. The family index is the position in the returned list.
    pub fn queue_families(&self) -> Vec<QueueFamily> {
        if !self.is_valid() {
            return Vec::new();
        }
        self.driver
            .get_physical_device_queue_family_properties(self.instance, self.handle)
            .into_iter()
            .enumerate()
            .map(|(idx, properties)| QueueFamily::new(idx as u32, properties))
            .collect()
    }
}

///Properties of one queue family of a physical device.
#[derive(Clone, Copy, Debug)]
pub struct QueueFamily {
    index: u32,
    pub properties: vk::QueueFamilyProperties,
}

impl QueueFamily {
    pub fn new(index: u32, properties: vk::QueueFamilyProperties) -> Self {
        QueueFamily { index, properties }
    }

    ///Index of this family on its physical device.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn has_graphics_support(&self) -> bool {
        self.properties.queue_flags.contains(vk::QueueFlags::GRAPHICS)
    }

    pub fn has_compute_support(&self) -> bool {
        self.properties.queue_flags.contains(vk::QueueFlags::COMPUTE)
    }

    ///Graphics and compute families can always transfer, even if they do not report the transfer bit.
    pub fn has_transfer_support(&self) -> bool {
        self.properties.queue_flags.intersects(
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
        )
    }

    pub fn has_sparse_binding_support(&self) -> bool {
        self.properties
            .queue_flags
            .contains(vk::QueueFlags::SPARSE_BINDING)
    }

    pub fn queue_count(&self) -> u32 {
        self.properties.queue_count
    }

    ///Number of meaningful bits in timestamps written on this family. 0 means no timestamp support.
    pub fn timestamp_valid_bits(&self) -> u32 {
        self.properties.timestamp_valid_bits
    }

    ///(0,0,0) means only whole mip levels can be transferred.
    pub fn min_image_transfer_granularity(&self) -> vk::Extent3D {
        self.properties.min_image_transfer_granularity
    }
}

///Filter that lets you select a sub-set of all physical devices.
/// Usually created from [Instance::create_physical_device_filter](crate::context::Instance::create_physical_device_filter).
pub struct PhysicalDeviceFilter {
    ///All remaining devices.
    pub pdevices: Vec<PhysicalDevice>,
}

impl PhysicalDeviceFilter {
    pub fn new(pdevices: Vec<PhysicalDevice>) -> Self {
        PhysicalDeviceFilter { pdevices }
    }

    ///removes all devices that are not of `dev_type`.
    pub fn filter_type(mut self, dev_type: PhysicalDeviceType) -> Self {
        self.pdevices.retain(|dev| dev.device_type() == dev_type);
        self
    }

    ///removes all devices that have no queue family with all of `flags`
    pub fn filter_queue_flags(mut self, flags: vk::QueueFlags) -> Self {
        self.pdevices.retain(|dev| {
            dev.queue_families().iter().any(|family| {
                #[cfg(feature = "logging")]
                log::trace!("Checking {:?} for {:?}", family.properties.queue_flags, flags);
                family.properties.queue_flags.contains(flags)
            })
        });
        self
    }

    ///Custom filter on the cached properties
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: FnMut(&PhysicalDevice) -> bool,
    {
        self.pdevices = self.pdevices.into_iter().filter(filter).collect();
        self
    }

    ///Orders the devices discrete GPUs first, then virtual, integrated, CPU and others.
    pub fn sort_by_preference(mut self) -> Self {
        self.pdevices
            .sort_by_key(|dev| dev.device_type().preference());
        self
    }

    ///Releases the remaining devices.
    pub fn release(self) -> Vec<PhysicalDevice> {
        self.pdevices
    }
}
