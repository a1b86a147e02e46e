use std::{ffi::CString, fmt::Debug, sync::Arc};

use ash::vk;

use super::{PhysicalDevice, Queue, QueueFamily, QueueRequest};
use crate::{
    driver::Driver,
    error::{DeviceError, NativeCallError, PreconditionError},
};

///Helper that lets you setup the physical device, queues, features and extensions before creating the actual
/// device.
///
/// Queue requests are per creation and cleared by a successful [create](DeviceBuilder::create). Everything else stays
/// until [reset](DeviceBuilder::reset).
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    physical_device: Option<PhysicalDevice>,
    queues: Vec<QueueRequest>,
    layers: Vec<String>,
    extensions: Vec<String>,
    features: Option<vk::PhysicalDeviceFeatures>,
}

impl DeviceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    ///Selects the physical device the device is created on. Drops all queue requests, since family indices are only
    /// meaningful for one physical device.
    pub fn select_physical_device(&mut self, physical_device: &PhysicalDevice) -> &mut Self {
        self.queues.clear();
        self.physical_device = Some(physical_device.clone());
        self
    }

    ///Requests `priorities.len()` queues of `family`, each with its priority. An empty list is ignored.
    ///
    /// Repeated requests for the same family are merged into one, so the new queues get the next free indices of
    /// that family and keep the position of the family's first request.
    pub fn add_queues(&mut self, family: &QueueFamily, priorities: Vec<f32>) -> &mut Self {
        if priorities.is_empty() {
            return self;
        }

        let family_index = family.index();
        let existing = self.queues.iter().position(|q| q.family_index == family_index);
        let requested = match existing {
            Some(idx) => {
                let request = &mut self.queues[idx];
                request.priorities.extend(priorities);
                request.priorities.len()
            }
            None => {
                let count = priorities.len();
                self.queues.push(QueueRequest {
                    family_index,
                    priorities,
                });
                count
            }
        };

        #[cfg(feature = "logging")]
        if requested > family.queue_count() as usize {
            log::warn!(
                "Requested {} queues of family {}, but it only has {}",
                requested,
                family_index,
                family.queue_count()
            );
        }
        #[cfg(not(feature = "logging"))]
        let _ = requested;

        self
    }

    ///Adds a device layer. Device layers are deprecated, but still forwarded for older implementations.
    pub fn add_layer(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if self.layers.contains(&name) {
            #[cfg(feature = "logging")]
            log::warn!("Tried to enable device layer twice: {:?}", name);
            return self;
        }
        self.layers.push(name);
        self
    }

    ///Adds a device extension, if it was not added yet.
    pub fn add_extension(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if self.extensions.contains(&name) {
            #[cfg(feature = "logging")]
            log::warn!("Tried to enable device extension twice: {:?}", name);
            return self;
        }
        self.extensions.push(name);
        self
    }

    ///Sets the enabled features. If never called, no feature structure is passed at all, which is not the same as
    /// passing one with everything disabled.
    pub fn set_enabled_features(&mut self, features: vk::PhysicalDeviceFeatures) -> &mut Self {
        self.features = Some(features);
        self
    }

    ///Allows changing the features in place, starting from the current (or all-disabled) set.
    pub fn with_features(
        &mut self,
        mapping: impl FnOnce(&mut vk::PhysicalDeviceFeatures),
    ) -> &mut Self {
        mapping(self.features.get_or_insert_with(Default::default));
        self
    }

    ///Resets the builder to its freshly created state.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    pub fn physical_device(&self) -> Option<&PhysicalDevice> {
        self.physical_device.as_ref()
    }

    pub fn queue_requests(&self) -> &[QueueRequest] {
        &self.queues
    }

    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn enabled_features(&self) -> Option<&vk::PhysicalDeviceFeatures> {
        self.features.as_ref()
    }

    ///Creates the device and fetches all requested queues, in request order.
    ///
    /// Needs a selected physical device and at least one queue request.
    pub fn create(&mut self) -> Result<Device, DeviceError> {
        let physical_device = match &self.physical_device {
            Some(pd) if pd.is_valid() => pd,
            Some(_) => return Err(PreconditionError::InvalidAdapter.report().into()),
            None => return Err(PreconditionError::NoAdapterSelected.report().into()),
        };
        if self.queues.is_empty() {
            return Err(PreconditionError::NoQueueRequests.report().into());
        }
        let driver = physical_device.driver().clone();

        let layers = self
            .layers
            .iter()
            .map(|l| CString::new(l.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let extensions = self
            .extensions
            .iter()
            .map(|e| CString::new(e.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        #[cfg(feature = "logging")]
        {
            log::info!("Device creation on {:?}:", physical_device.device_name());
            for q in &self.queues {
                log::info!(
                    "  Family {}: {} queue(s) {:?}",
                    q.family_index,
                    q.priorities.len(),
                    q.priorities
                );
            }
            log::info!("  Extensions:");
            for e in &self.extensions {
                log::info!("    {:?}", e);
            }
        }

        let layer_ptrs = layers.iter().map(|l| l.as_ptr()).collect::<Vec<_>>();
        let extension_ptrs = extensions.iter().map(|e| e.as_ptr()).collect::<Vec<_>>();
        let queue_infos = self
            .queues
            .iter()
            .map(|q| q.as_create_info())
            .collect::<Vec<_>>();

        #[allow(deprecated)]
        let mut create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs);
        if let Some(features) = &self.features {
            create_info = create_info.enabled_features(features);
        }

        let handle = driver
            .create_device(physical_device.instance(), physical_device.handle(), &create_info)
            .map_err(|code| NativeCallError::new("create-device", code))?;

        let queues = self
            .queues
            .iter()
            .flat_map(|request| {
                (0..request.priorities.len() as u32).map(move |queue_index| {
                    (request.family_index, queue_index)
                })
            })
            .map(|(family_index, queue_index)| {
                Queue::new(
                    family_index,
                    queue_index,
                    driver.get_device_queue(handle, family_index, queue_index),
                )
            })
            .collect();

        self.queues.clear();

        Ok(Device {
            driver: Some(driver),
            handle,
            queues,
        })
    }
}

///Owning wrapper of a logical device, together with the queues fetched at creation.
///
/// Like [Instance](crate::context::Instance) it is either valid or empty, destroys its handle exactly once and drops the
/// old handle first when assigned over. The queue list never changes after creation.
#[derive(Default)]
pub struct Device {
    driver: Option<Arc<dyn Driver>>,
    handle: vk::Device,
    queues: Vec<Queue>,
}

impl Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("handle", &self.handle)
            .field("queues", &self.queues)
            .finish_non_exhaustive()
    }
}

impl Device {
    ///Wraps an existing device handle and its queues, taking ownership of the device.
    ///
    /// # Safety
    ///
    /// `handle` must have been created by `driver` and must not be owned by anything else. The queues have to
    /// belong to that device.
    pub unsafe fn from_raw(
        driver: Arc<dyn Driver>,
        handle: vk::Device,
        queues: Vec<Queue>,
    ) -> Self {
        Device {
            driver: Some(driver),
            handle,
            queues,
        }
    }

    ///Returns true if this device owns a handle.
    pub fn is_valid(&self) -> bool {
        self.driver.is_some() && self.handle != vk::Device::null()
    }

    ///The owned handle, or a null handle if empty. Ownership is not transferred.
    pub fn handle(&self) -> vk::Device {
        self.handle
    }

    ///All queues, in the order they were requested.
    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }

    ///Returns the first queue for the given family, if there is any.
    pub fn first_queue_for_family(&self, family: u32) -> Option<&Queue> {
        self.queues.iter().find(|q| q.family_index == family)
    }

    ///Moves the handle and queues out, leaving `self` empty.
    pub fn take(&mut self) -> Device {
        std::mem::take(self)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            if self.handle != vk::Device::null() {
                driver.destroy_device(self.handle);
            }
        }
        self.handle = vk::Device::null();
    }
}
