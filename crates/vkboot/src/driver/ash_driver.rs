use std::sync::Mutex;

use ahash::AHashMap;
use ash::vk;

use super::{DebugReportFns, Driver};
use crate::error::InstanceError;

///[Driver] implementation on top of ash.
///
/// Keeps the entry point, and the dispatch tables of every live instance and device, keyed by their raw handle.
/// Tables are dropped again when the handle is destroyed.
pub struct AshDriver {
    pub entry: ash::Entry,
    instances: Mutex<AHashMap<vk::Instance, ash::Instance>>,
    devices: Mutex<AHashMap<vk::Device, ash::Device>>,
}

impl AshDriver {
    ///Loads the system's Vulkan loader via [Entry::load](ash::Entry::load).
    pub fn load() -> Result<Self, InstanceError> {
        let entry = unsafe { ash::Entry::load()? };
        Ok(Self::from_entry(entry))
    }

    ///Uses an already loaded entry point.
    pub fn from_entry(entry: ash::Entry) -> Self {
        AshDriver {
            entry,
            instances: Mutex::new(AHashMap::default()),
            devices: Mutex::new(AHashMap::default()),
        }
    }

    fn instance(&self, handle: vk::Instance) -> Option<ash::Instance> {
        let table = self.instances.lock().ok()?.get(&handle).cloned();
        #[cfg(feature = "logging")]
        if table.is_none() {
            log::error!("Instance {:?} is unknown to this driver", handle);
        }
        table
    }

    fn device(&self, handle: vk::Device) -> Option<ash::Device> {
        let table = self.devices.lock().ok()?.get(&handle).cloned();
        #[cfg(feature = "logging")]
        if table.is_none() {
            log::error!("Device {:?} is unknown to this driver", handle);
        }
        table
    }
}

impl Driver for AshDriver {
    fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo<'_>,
    ) -> Result<vk::Instance, vk::Result> {
        let instance = unsafe { self.entry.create_instance(create_info, None)? };
        let handle = instance.handle();
        match self.instances.lock() {
            Ok(mut instances) => {
                instances.insert(handle, instance);
                Ok(handle)
            }
            Err(_) => {
                unsafe { instance.destroy_instance(None) };
                Err(vk::Result::ERROR_INITIALIZATION_FAILED)
            }
        }
    }

    fn destroy_instance(&self, instance: vk::Instance) {
        let table = self
            .instances
            .lock()
            .ok()
            .and_then(|mut instances| instances.remove(&instance));
        if let Some(table) = table {
            unsafe { table.destroy_instance(None) };
        } else {
            #[cfg(feature = "logging")]
            log::warn!("Could not destroy unknown instance {:?}", instance);
        }
    }

    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
        count: &mut u32,
        physical_devices: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result {
        let Some(table) = self.instance(instance) else {
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        };
        let ptr = match physical_devices {
            Some(buffer) => {
                *count = (*count).min(buffer.len() as u32);
                buffer.as_mut_ptr()
            }
            None => std::ptr::null_mut(),
        };
        unsafe { (table.fp_v1_0().enumerate_physical_devices)(instance, count, ptr) }
    }

    fn get_physical_device_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        match self.instance(instance) {
            Some(table) => unsafe { table.get_physical_device_properties(physical_device) },
            None => vk::PhysicalDeviceProperties::default(),
        }
    }

    fn get_physical_device_queue_family_properties(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        match self.instance(instance) {
            Some(table) => unsafe {
                table.get_physical_device_queue_family_properties(physical_device)
            },
            None => Vec::new(),
        }
    }

    fn create_device(
        &self,
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        create_info: &vk::DeviceCreateInfo<'_>,
    ) -> Result<vk::Device, vk::Result> {
        let table = self
            .instance(instance)
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        let device = unsafe { table.create_device(physical_device, create_info, None)? };
        let handle = device.handle();
        match self.devices.lock() {
            Ok(mut devices) => {
                devices.insert(handle, device);
                Ok(handle)
            }
            Err(_) => {
                unsafe { device.destroy_device(None) };
                Err(vk::Result::ERROR_INITIALIZATION_FAILED)
            }
        }
    }

    fn get_device_queue(
        &self,
        device: vk::Device,
        family_index: u32,
        queue_index: u32,
    ) -> vk::Queue {
        match self.device(device) {
            Some(table) => unsafe { table.get_device_queue(family_index, queue_index) },
            None => vk::Queue::null(),
        }
    }

    fn destroy_device(&self, device: vk::Device) {
        let table = self
            .devices
            .lock()
            .ok()
            .and_then(|mut devices| devices.remove(&device));
        if let Some(table) = table {
            unsafe { table.destroy_device(None) };
        } else {
            #[cfg(feature = "logging")]
            log::warn!("Could not destroy unknown device {:?}", device);
        }
    }

    fn load_debug_report(&self, instance: vk::Instance) -> Option<Box<dyn DebugReportFns>> {
        let table = self.instance(instance)?;
        //ash would load panicking stubs for missing functions, so check by name first.
        let create = unsafe {
            self.entry
                .get_instance_proc_addr(instance, c"vkCreateDebugReportCallbackEXT".as_ptr())
        };
        let destroy = unsafe {
            self.entry
                .get_instance_proc_addr(instance, c"vkDestroyDebugReportCallbackEXT".as_ptr())
        };
        if create.is_none() || destroy.is_none() {
            #[cfg(feature = "logging")]
            log::warn!("Debug report extension is not available on {:?}", instance);
            return None;
        }

        Some(Box::new(ash::ext::debug_report::Instance::new(&self.entry, &table)))
    }
}

#[allow(deprecated)]
impl DebugReportFns for ash::ext::debug_report::Instance {
    fn create_debug_report_callback(
        &self,
        create_info: &vk::DebugReportCallbackCreateInfoEXT<'_>,
    ) -> Result<vk::DebugReportCallbackEXT, vk::Result> {
        unsafe {
            ash::ext::debug_report::Instance::create_debug_report_callback(self, create_info, None)
        }
    }

    fn destroy_debug_report_callback(&self, callback: vk::DebugReportCallbackEXT) {
        unsafe {
            ash::ext::debug_report::Instance::destroy_debug_report_callback(self, callback, None)
        }
    }
}
