use std::ffi::NulError;

use ash::{LoadingError, vk};

use thiserror::Error;

///Maps a native status code to a human readable description. Unknown codes map to a generic message.
pub fn describe_result(code: vk::Result) -> &'static str {
    match code {
        vk::Result::SUCCESS => "Command completed successfully.",
        vk::Result::NOT_READY => "A fence or query has not yet completed.",
        vk::Result::TIMEOUT => "A wait operation has not completed in the specified time.",
        vk::Result::EVENT_SET => "An event is signaled.",
        vk::Result::EVENT_RESET => "An event is unsignaled.",
        vk::Result::INCOMPLETE => "A return array was too small for the result.",
        vk::Result::ERROR_OUT_OF_HOST_MEMORY => "A host memory allocation has failed.",
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => "A device memory allocation has failed.",
        vk::Result::ERROR_INITIALIZATION_FAILED => {
            "Initialization of an object could not be completed."
        }
        vk::Result::ERROR_DEVICE_LOST => "The logical or physical device has been lost.",
        vk::Result::ERROR_MEMORY_MAP_FAILED => "Mapping of a memory object has failed.",
        vk::Result::ERROR_LAYER_NOT_PRESENT => "A requested layer is not present.",
        vk::Result::ERROR_EXTENSION_NOT_PRESENT => "A requested extension is not supported.",
        vk::Result::ERROR_FEATURE_NOT_PRESENT => "A requested feature is not supported.",
        vk::Result::ERROR_INCOMPATIBLE_DRIVER => {
            "The requested API version is not supported by the driver."
        }
        vk::Result::ERROR_TOO_MANY_OBJECTS => "Too many objects of the type have been created.",
        vk::Result::ERROR_FORMAT_NOT_SUPPORTED => "A requested format is not supported.",
        vk::Result::ERROR_FRAGMENTED_POOL => "A pool allocation failed due to fragmentation.",
        _ => "Unhandled error code.",
    }
}

fn describe(code: &vk::Result) -> &'static str {
    describe_result(*code)
}

///Raised whenever a call into the native layer does not return success. Carries the raw status code,
/// so callers can recover (for instance drop an unsupported extension and retry).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unhandled event at {call_site}. {}", describe(.code))]
pub struct NativeCallError {
    pub call_site: &'static str,
    pub code: vk::Result,
}

impl NativeCallError {
    pub fn new(call_site: &'static str, code: vk::Result) -> Self {
        #[cfg(feature = "logging")]
        log::error!("{} failed with {:?}", call_site, code);

        NativeCallError { call_site, code }
    }

    pub fn code(&self) -> vk::Result {
        self.code
    }

    pub fn message(&self) -> &'static str {
        describe_result(self.code)
    }
}

///Misuse of a builder or wrapper. Always a programming defect, never an environment condition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Operation requires a valid instance, but the instance is empty")]
    InvalidContext,
    #[error("No physical device was selected before creating the device")]
    NoAdapterSelected,
    #[error("Selected physical device handle is null")]
    InvalidAdapter,
    #[error("Device creation needs at least one queue request")]
    NoQueueRequests,
}

impl PreconditionError {
    pub(crate) fn report(self) -> Self {
        #[cfg(feature = "logging")]
        log::error!("Precondition violated: {}", self);
        self
    }
}

#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("Vulkan error: {0}")]
    Native(#[from] NativeCallError),
    #[error("Precondition error: {0}")]
    Precondition(#[from] PreconditionError),
    #[error("Failed to load Vulkan entry point: {0}")]
    EntryLoading(#[from] LoadingError),
    #[error("Name contains an interior nul byte: {0}")]
    InvalidName(#[from] NulError),
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Vulkan error: {0}")]
    Native(#[from] NativeCallError),
    #[error("Precondition error: {0}")]
    Precondition(#[from] PreconditionError),
    #[error("Name contains an interior nul byte: {0}")]
    InvalidName(#[from] NulError),
}

impl InstanceError {
    ///Returns the native status code if the error originated in the native layer.
    pub fn native_code(&self) -> Option<vk::Result> {
        match self {
            InstanceError::Native(e) => Some(e.code),
            _ => None,
        }
    }
}

impl DeviceError {
    ///Returns the native status code if the error originated in the native layer.
    pub fn native_code(&self) -> Option<vk::Result> {
        match self {
            DeviceError::Native(e) => Some(e.code),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum VkbootError {
    #[error("Device error: {0}")]
    DeviceError(#[from] DeviceError),
    #[error("Instance error: {0}")]
    InstanceError(#[from] InstanceError),
    #[error("Other error: {0}")]
    Other(String),
}
