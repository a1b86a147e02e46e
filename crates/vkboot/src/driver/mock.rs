//! Recording [Driver] used by the unit tests. Hands out fake handles, counts creation and destruction calls
//! and can fire debug-report events into registered callbacks.

use std::{
    ffi::{CStr, CString, c_char, c_void},
    sync::{Arc, Mutex, MutexGuard},
};

use ash::vk::{self, Handle};

use super::{DebugReportFns, Driver};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordedInstanceInfo {
    pub has_application_info: bool,
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    pub api_version: u32,
    pub layers: Vec<String>,
    pub extensions: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct RecordedDeviceInfo {
    pub physical_device: vk::PhysicalDevice,
    ///(family, priorities) per queue create info.
    pub queues: Vec<(u32, Vec<f32>)>,
    pub layers: Vec<String>,
    pub extensions: Vec<String>,
    pub features: Option<vk::PhysicalDeviceFeatures>,
}

pub struct MockAdapter {
    pub handle: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
}

struct RegisteredCallback {
    handle: vk::DebugReportCallbackEXT,
    flags: vk::DebugReportFlagsEXT,
    callback: vk::PFN_vkDebugReportCallbackEXT,
    user_data: usize,
}

#[derive(Default)]
pub struct MockState {
    next_handle: u64,

    pub fail_create_instance: Option<vk::Result>,
    pub fail_create_device: Option<vk::Result>,
    ///Fails the n-th call (0 based) to `enumerate_physical_devices` with the given code.
    pub fail_enumerate: Option<(usize, vk::Result)>,
    pub debug_report_available: bool,
    pub fail_debug_report: Option<vk::Result>,

    pub adapters: Vec<MockAdapter>,

    pub create_instance_calls: usize,
    pub enumerate_calls: usize,
    pub create_device_calls: usize,
    pub live_instances: Vec<vk::Instance>,
    pub destroyed_instances: Vec<vk::Instance>,
    pub live_devices: Vec<vk::Device>,
    pub destroyed_devices: Vec<vk::Device>,
    ///(device, family, index) of every queue lookup.
    pub queue_lookups: Vec<(vk::Device, u32, u32)>,
    pub last_instance_info: Option<RecordedInstanceInfo>,
    pub last_device_info: Option<RecordedDeviceInfo>,

    callbacks: Vec<RegisteredCallback>,
    pub registered_callbacks: usize,
    pub destroyed_callbacks: usize,
    ///Set when a debug callback was destroyed after its instance.
    pub callback_outlived_instance: bool,
}

impl MockState {
    fn next<H: Handle>(&mut self) -> H {
        self.next_handle += 1;
        H::from_raw(self.next_handle)
    }

    pub fn add_adapter(
        &mut self,
        queue_families: Vec<vk::QueueFamilyProperties>,
    ) -> vk::PhysicalDevice {
        let handle = self.next();
        let mut properties = vk::PhysicalDeviceProperties {
            api_version: vk::make_api_version(0, 1, 3, 0),
            driver_version: 42,
            vendor_id: 0x1002,
            device_id: 0x73bf,
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            ..Default::default()
        };
        for (dst, src) in properties.device_name.iter_mut().zip(b"Mock GPU".iter()) {
            *dst = *src as c_char;
        }
        properties.pipeline_cache_uuid = [7; vk::UUID_SIZE];
        self.adapters.push(MockAdapter {
            handle,
            properties,
            queue_families,
        });
        handle
    }

    pub fn live_callbacks(&self) -> usize {
        self.callbacks.len()
    }
}

#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn as_driver(&self) -> Arc<dyn Driver> {
        Arc::new(self.clone())
    }

    ///Fires a debug event into every registered callback whose flags match. Returns each callback's answer.
    pub fn emit(
        &self,
        flags: vk::DebugReportFlagsEXT,
        layer: &str,
        message: &str,
    ) -> Vec<vk::Bool32> {
        let targets: Vec<(vk::PFN_vkDebugReportCallbackEXT, usize)> = self
            .state()
            .callbacks
            .iter()
            .filter(|c| c.flags.intersects(flags))
            .map(|c| (c.callback, c.user_data))
            .collect();

        let layer = CString::new(layer).unwrap();
        let message = CString::new(message).unwrap();
        targets
            .into_iter()
            .filter_map(|(callback, user_data)| {
                callback.map(|f| unsafe {
                    f(
                        flags,
                        vk::DebugReportObjectTypeEXT::DEVICE,
                        0xdead,
                        17,
                        -3,
                        layer.as_ptr(),
                        message.as_ptr(),
                        user_data as *mut c_void,
                    )
                })
            })
            .collect()
    }
}

unsafe fn read_names(names: *const *const c_char, count: u32) -> Vec<String> {
    if count == 0 || names.is_null() {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(names, count as usize) }
        .iter()
        .map(|n| unsafe { read_str(*n) })
        .collect()
}

unsafe fn read_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}

impl Driver for MockDriver {
    fn create_instance(
        &self,
        create_info: &vk::InstanceCreateInfo<'_>,
    ) -> Result<vk::Instance, vk::Result> {
        let mut state = self.state();
        state.create_instance_calls += 1;

        let mut info = RecordedInstanceInfo::default();
        unsafe {
            if let Some(app) = create_info.p_application_info.as_ref() {
                info.has_application_info = true;
                info.application_name = read_str(app.p_application_name);
                info.application_version = app.application_version;
                info.engine_name = read_str(app.p_engine_name);
                info.engine_version = app.engine_version;
                info.api_version = app.api_version;
            }
            info.layers = read_names(
                create_info.pp_enabled_layer_names,
                create_info.enabled_layer_count,
            );
            info.extensions = read_names(
                create_info.pp_enabled_extension_names,
                create_info.enabled_extension_count,
            );
        }
        state.last_instance_info = Some(info);

        if let Some(code) = state.fail_create_instance {
            return Err(code);
        }
        let handle = state.next();
        state.live_instances.push(handle);
        Ok(handle)
    }

    fn destroy_instance(&self, instance: vk::Instance) {
        let mut state = self.state();
        if !state.callbacks.is_empty() {
            //Callbacks must be gone before the instance.
            state.callback_outlived_instance = true;
        }
        state.live_instances.retain(|i| *i != instance);
        state.destroyed_instances.push(instance);
    }

    fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
        count: &mut u32,
        physical_devices: Option<&mut [vk::PhysicalDevice]>,
    ) -> vk::Result {
        let mut state = self.state();
        let call = state.enumerate_calls;
        state.enumerate_calls += 1;
        if let Some((failing, code)) = state.fail_enumerate {
            if failing == call {
                return code;
            }
        }
        if !state.live_instances.contains(&instance) {
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        }

        match physical_devices {
            None => {
                *count = state.adapters.len() as u32;
                vk::Result::SUCCESS
            }
            Some(buffer) => {
                let written = (*count as usize).min(buffer.len()).min(state.adapters.len());
                for (dst, adapter) in buffer.iter_mut().zip(state.adapters.iter()).take(written) {
                    *dst = adapter.handle;
                }
                *count = written as u32;
                if written < state.adapters.len() {
                    vk::Result::INCOMPLETE
                } else {
                    vk::Result::SUCCESS
                }
            }
        }
    }

    fn get_physical_device_properties(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        self.state()
            .adapters
            .iter()
            .find(|a| a.handle == physical_device)
            .map(|a| a.properties)
            .unwrap_or_default()
    }

    fn get_physical_device_queue_family_properties(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        self.state()
            .adapters
            .iter()
            .find(|a| a.handle == physical_device)
            .map(|a| a.queue_families.clone())
            .unwrap_or_default()
    }

    fn create_device(
        &self,
        _instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        create_info: &vk::DeviceCreateInfo<'_>,
    ) -> Result<vk::Device, vk::Result> {
        let mut state = self.state();
        state.create_device_calls += 1;

        let mut info = RecordedDeviceInfo {
            physical_device,
            ..Default::default()
        };
        unsafe {
            if create_info.queue_create_info_count > 0 {
                let queues = std::slice::from_raw_parts(
                    create_info.p_queue_create_infos,
                    create_info.queue_create_info_count as usize,
                );
                info.queues = queues
                    .iter()
                    .map(|q| {
                        let priorities = std::slice::from_raw_parts(
                            q.p_queue_priorities,
                            q.queue_count as usize,
                        );
                        (q.queue_family_index, priorities.to_vec())
                    })
                    .collect();
            }
            #[allow(deprecated)]
            {
                info.layers = read_names(
                    create_info.pp_enabled_layer_names,
                    create_info.enabled_layer_count,
                );
            }
            info.extensions = read_names(
                create_info.pp_enabled_extension_names,
                create_info.enabled_extension_count,
            );
            info.features = create_info.p_enabled_features.as_ref().copied();
        }
        state.last_device_info = Some(info);

        if let Some(code) = state.fail_create_device {
            return Err(code);
        }
        let handle = state.next();
        state.live_devices.push(handle);
        Ok(handle)
    }

    fn get_device_queue(
        &self,
        device: vk::Device,
        family_index: u32,
        queue_index: u32,
    ) -> vk::Queue {
        let mut state = self.state();
        state.queue_lookups.push((device, family_index, queue_index));
        state.next()
    }

    fn destroy_device(&self, device: vk::Device) {
        let mut state = self.state();
        state.live_devices.retain(|d| *d != device);
        state.destroyed_devices.push(device);
    }

    fn load_debug_report(&self, _instance: vk::Instance) -> Option<Box<dyn DebugReportFns>> {
        if self.state().debug_report_available {
            Some(Box::new(self.clone()))
        } else {
            None
        }
    }
}

impl DebugReportFns for MockDriver {
    fn create_debug_report_callback(
        &self,
        create_info: &vk::DebugReportCallbackCreateInfoEXT<'_>,
    ) -> Result<vk::DebugReportCallbackEXT, vk::Result> {
        let mut state = self.state();
        if let Some(code) = state.fail_debug_report {
            return Err(code);
        }
        let handle = state.next();
        state.callbacks.push(RegisteredCallback {
            handle,
            flags: create_info.flags,
            callback: create_info.pfn_callback,
            user_data: create_info.p_user_data as usize,
        });
        state.registered_callbacks += 1;
        Ok(handle)
    }

    fn destroy_debug_report_callback(&self, callback: vk::DebugReportCallbackEXT) {
        let mut state = self.state();
        state.callbacks.retain(|c| c.handle != callback);
        state.destroyed_callbacks += 1;
    }
}
