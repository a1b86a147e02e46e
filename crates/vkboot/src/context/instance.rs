use std::{ffi::CString, fmt::Debug, sync::Arc};

use ash::vk;

use crate::{
    driver::{AshDriver, Driver},
    error::{InstanceError, NativeCallError, PreconditionError},
};

use super::{
    PhysicalDeviceFilter,
    debugger::{DebugCallback, DebugRegistration},
    physical_device::PhysicalDevice,
};

///Everything an [InstanceBuilder] collects before creation. `Default` is the state of a fresh builder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceInfo {
    ///Set as soon as any application, engine or API field was touched. Otherwise no application info is passed.
    pub use_app_info: bool,
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    ///Packed via [vk::make_api_version]. 0 is treated as 1.0.0 by the loader.
    pub api_version: u32,
    pub layers: Vec<String>,
    pub extensions: Vec<String>,
}

///Instance configuration as well as the driver it is created on. Usually this struct is created via [Instance::load].
///
/// The builder is not consumed by [create](InstanceBuilder::create), so the same configuration can create several instances.
pub struct InstanceBuilder {
    pub driver: Arc<dyn Driver>,
    info: InstanceInfo,
}

impl InstanceBuilder {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        InstanceBuilder {
            driver,
            info: InstanceInfo::default(),
        }
    }

    ///Current configuration.
    pub fn info(&self) -> &InstanceInfo {
        &self.info
    }

    pub fn with_application_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.info.use_app_info = true;
        self.info.application_name = name.into();
        self
    }

    pub fn with_application_version(&mut self, version: u32) -> &mut Self {
        self.info.use_app_info = true;
        self.info.application_version = version;
        self
    }

    pub fn with_engine_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.info.use_app_info = true;
        self.info.engine_name = name.into();
        self
    }

    pub fn with_engine_version(&mut self, version: u32) -> &mut Self {
        self.info.use_app_info = true;
        self.info.engine_version = version;
        self
    }

    ///Sets the Vulkan version the application targets.
    pub fn with_api_version(&mut self, major: u32, minor: u32, patch: u32) -> &mut Self {
        self.info.use_app_info = true;
        self.info.api_version = vk::make_api_version(0, major, minor, patch);
        self
    }

    ///adds a layer with the given name, if it was not added yet.
    pub fn with_layer(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if self.info.layers.contains(&name) {
            #[cfg(feature = "logging")]
            log::warn!("Tried to enable layer twice: {:?}", name);
            return self;
        }
        self.info.layers.push(name);
        self
    }

    ///adds an extension with the given name, if it was not added yet.
    pub fn with_extension(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if self.info.extensions.contains(&name) {
            #[cfg(feature = "logging")]
            log::warn!("Tried to enable extension twice: {:?}", name);
            return self;
        }

        #[cfg(feature = "logging")]
        log::info!("Enabling instance-extension: {:?}", name);
        self.info.extensions.push(name);
        self
    }

    ///Enables the Khronos validation layer and the debug-report extension needed for
    /// [Instance::set_debug_listener].
    pub fn enable_validation(&mut self) -> &mut Self {
        self.with_layer("VK_LAYER_KHRONOS_validation");
        self.with_extension(ash::ext::debug_report::NAME.to_string_lossy())
    }

    ///Resets the builder to its freshly created state.
    pub fn reset(&mut self) -> &mut Self {
        self.info = InstanceInfo::default();
        self
    }

    ///Creates the instance from the current information. The builder is left untouched, also on failure.
    pub fn create(&self) -> Result<Instance, InstanceError> {
        let info = &self.info;

        let application_name = CString::new(info.application_name.as_str())?;
        let engine_name = CString::new(info.engine_name.as_str())?;
        let layers = info
            .layers
            .iter()
            .map(|l| CString::new(l.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let extensions = info
            .extensions
            .iter()
            .map(|e| CString::new(e.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        //at this point, if we are logging, write out instance creation data
        #[cfg(feature = "logging")]
        {
            log::info!("Instance creation:");
            if info.use_app_info {
                log::info!(
                    "  Application: {:?} v{}, Engine: {:?} v{}",
                    info.application_name,
                    info.application_version,
                    info.engine_name,
                    info.engine_version
                );
                log::info!(
                    "  Vulkan version: {}.{}.{}",
                    vk::api_version_major(info.api_version),
                    vk::api_version_minor(info.api_version),
                    vk::api_version_patch(info.api_version),
                );
            }
            log::info!("  Layers:");
            for l in &info.layers {
                log::info!("    {:?}", l);
            }
            log::info!("  Extensions:");
            for e in &info.extensions {
                log::info!("    {:?}", e);
            }
        }

        let layer_ptrs = layers.iter().map(|l| l.as_ptr()).collect::<Vec<_>>();
        let extension_ptrs = extensions.iter().map(|e| e.as_ptr()).collect::<Vec<_>>();

        let app_info = vk::ApplicationInfo::default()
            .application_name(&application_name)
            .application_version(info.application_version)
            .engine_name(&engine_name)
            .engine_version(info.engine_version)
            .api_version(info.api_version);

        let mut create_info = vk::InstanceCreateInfo::default()
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs);
        if info.use_app_info {
            create_info = create_info.application_info(&app_info);
        }

        let handle = self
            .driver
            .create_instance(&create_info)
            .map_err(|code| NativeCallError::new("create-context", code))?;

        Ok(Instance {
            driver: Some(self.driver.clone()),
            handle,
            debug: None,
        })
    }
}

///Owning wrapper of a Vulkan instance.
///
/// An instance is either *valid* and owns exactly one native handle, or *empty* (see [Default] and [take](Instance::take)).
/// A valid instance destroys its handle exactly once when dropped, after unregistering its debug listener.
/// Assigning over a valid instance drops, and therefore destroys, the old handle first.
///
/// # Safety
///
/// This struct is un-clonable for a reason. All [Device](crate::context::Device)s created from physical devices of this
/// instance must be dropped before the instance.
#[derive(Default)]
pub struct Instance {
    driver: Option<Arc<dyn Driver>>,
    handle: vk::Instance,
    //Declared after the handle, but dropped explicitly before it.
    debug: Option<DebugRegistration>,
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("handle", &self.handle)
            .field("debug_listener", &self.debug.is_some())
            .finish_non_exhaustive()
    }
}

impl Instance {
    ///Creates a builder on top of the system's Vulkan loader, loaded via [Entry::load](ash::Entry::load).
    pub fn load() -> Result<InstanceBuilder, InstanceError> {
        Ok(InstanceBuilder::new(Arc::new(AshDriver::load()?)))
    }

    ///Wraps an existing handle and takes ownership of it.
    ///
    /// # Safety
    ///
    /// `handle` must have been created by `driver`, and must not be owned by anything else.
    pub unsafe fn from_raw(driver: Arc<dyn Driver>, handle: vk::Instance) -> Self {
        Instance {
            driver: Some(driver),
            handle,
            debug: None,
        }
    }

    ///Returns true if this instance owns a handle.
    pub fn is_valid(&self) -> bool {
        self.driver.is_some() && self.handle != vk::Instance::null()
    }

    ///The owned handle, or a null handle if empty. Ownership is not transferred.
    pub fn handle(&self) -> vk::Instance {
        self.handle
    }

    pub fn driver(&self) -> Option<&Arc<dyn Driver>> {
        self.driver.as_ref()
    }

    ///Moves the handle (and debug listener) out, leaving `self` empty.
    pub fn take(&mut self) -> Instance {
        std::mem::take(self)
    }

    fn valid_driver(&self) -> Result<&Arc<dyn Driver>, PreconditionError> {
        match &self.driver {
            Some(driver) if self.handle != vk::Instance::null() => Ok(driver),
            _ => Err(PreconditionError::InvalidContext.report()),
        }
    }

    ///Enumerates all physical devices. Fails without calling into Vulkan if the instance is empty.
    pub fn enumerate_physical_devices(&self) -> Result<Vec<PhysicalDevice>, InstanceError> {
        let driver = self.valid_driver()?;

        let mut count = 0u32;
        let result = driver.enumerate_physical_devices(self.handle, &mut count, None);
        if result != vk::Result::SUCCESS {
            return Err(NativeCallError::new("enumerate-physical-adapters", result).into());
        }

        let mut handles = vec![vk::PhysicalDevice::null(); count as usize];
        //The count may have changed in between. Anything but success, including INCOMPLETE, is an error.
        let result = driver.enumerate_physical_devices(
            self.handle,
            &mut count,
            Some(handles.as_mut_slice()),
        );
        if result != vk::Result::SUCCESS {
            return Err(NativeCallError::new("enumerate-physical-adapters", result).into());
        }
        handles.truncate(count as usize);

        Ok(handles
            .into_iter()
            .map(|handle| PhysicalDevice::new(driver.clone(), self.handle, handle))
            .collect())
    }

    ///Enumerates the physical devices and wraps them in a filter.
    pub fn create_physical_device_filter(&self) -> Result<PhysicalDeviceFilter, InstanceError> {
        Ok(PhysicalDeviceFilter::new(self.enumerate_physical_devices()?))
    }

    ///Sets the single debug listener of this instance. Any previous listener is unregistered first.
    /// Passing `None` only unregisters.
    ///
    /// Errors and debug messages are always reported; `verbose` adds information, warnings and performance warnings.
    /// Requires the debug-report extension (see [InstanceBuilder::enable_validation]), otherwise fails with
    /// `ERROR_EXTENSION_NOT_PRESENT`.
    pub fn set_debug_listener(
        &mut self,
        listener: Option<Arc<dyn DebugCallback>>,
        verbose: bool,
    ) -> Result<(), InstanceError> {
        let driver = self.valid_driver()?.clone();

        if self.debug.take().is_some() {
            #[cfg(feature = "logging")]
            log::debug!("Unregistered debug listener of {:?}", self.handle);
        }

        let Some(listener) = listener else {
            return Ok(());
        };

        let loader = driver.load_debug_report(self.handle).ok_or_else(|| {
            NativeCallError::new("set-debug-listener", vk::Result::ERROR_EXTENSION_NOT_PRESENT)
        })?;
        let registration = DebugRegistration::register(loader, listener, verbose)
            .map_err(|code| NativeCallError::new("set-debug-listener", code))?;

        #[cfg(feature = "logging")]
        log::debug!(
            "Registered debug listener {:?} on {:?} (verbose: {})",
            registration.handle(),
            self.handle,
            verbose
        );
        self.debug = Some(registration);
        Ok(())
    }

    pub fn has_debug_listener(&self) -> bool {
        self.debug.is_some()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        //The registration belongs to the instance and must go first.
        self.debug = None;
        if let Some(driver) = self.driver.take() {
            if self.handle != vk::Instance::null() {
                driver.destroy_instance(self.handle);
            }
        }
        self.handle = vk::Instance::null();
    }
}
