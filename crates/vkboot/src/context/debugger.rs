use std::{
    borrow::Cow,
    ffi::{CStr, c_char, c_void},
    sync::Arc,
};

use ash::vk;
use const_cstr::const_cstr;

use crate::driver::DebugReportFns;

const_cstr! {
    UNKNOWNLAYER = "unknown layer";
    NOMSG = "no message";
}

///One debug-report event as delivered by the validation layers.
#[derive(Clone, Debug)]
pub struct CallbackData<'a> {
    pub flags: vk::DebugReportFlagsEXT,
    pub object_type: vk::DebugReportObjectTypeEXT,
    pub object: u64,
    pub location: usize,
    pub message_code: i32,
    pub layer_prefix: Cow<'a, str>,
    pub message: Cow<'a, str>,
}

///Receives debug messages of an [Instance](crate::context::Instance), see
/// [Instance::set_debug_listener](crate::context::Instance::set_debug_listener).
pub trait DebugCallback: Send + Sync {
    ///Called for every reported event. Returning true asks the layer to abort the offending call. The Vulkan
    /// specification discourages this, since it makes validated builds behave differently.
    fn on_message(&self, data: &CallbackData<'_>) -> bool;
}

impl<F> DebugCallback for F
where
    F: Fn(&CallbackData<'_>) -> bool + Send + Sync,
{
    fn on_message(&self, data: &CallbackData<'_>) -> bool {
        self(data)
    }
}

///Listener that forwards every message to the `log` crate, never aborting.
#[cfg(feature = "logging")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LogCallback;

#[cfg(feature = "logging")]
impl DebugCallback for LogCallback {
    fn on_message(&self, data: &CallbackData<'_>) -> bool {
        if data.flags.contains(vk::DebugReportFlagsEXT::ERROR) {
            log::error!("[{}: {}]: {}", data.layer_prefix, data.message_code, data.message);
        } else if data.flags.intersects(
            vk::DebugReportFlagsEXT::WARNING | vk::DebugReportFlagsEXT::PERFORMANCE_WARNING,
        ) {
            log::warn!("[{}: {}]: {}", data.layer_prefix, data.message_code, data.message);
        } else if data.flags.contains(vk::DebugReportFlagsEXT::INFORMATION) {
            log::info!("[{}: {}]: {}", data.layer_prefix, data.message_code, data.message);
        } else {
            log::trace!("[{}: {}]: {}", data.layer_prefix, data.message_code, data.message);
        }
        false
    }
}

///Severity mask a listener is registered with. Errors and debug messages are always included.
pub fn report_flags(verbose: bool) -> vk::DebugReportFlagsEXT {
    let flags = vk::DebugReportFlagsEXT::ERROR | vk::DebugReportFlagsEXT::DEBUG;
    if verbose {
        flags
            | vk::DebugReportFlagsEXT::INFORMATION
            | vk::DebugReportFlagsEXT::WARNING
            | vk::DebugReportFlagsEXT::PERFORMANCE_WARNING
    } else {
        flags
    }
}

unsafe fn lossy<'a>(ptr: *const c_char, fallback: &'static CStr) -> Cow<'a, str> {
    if ptr.is_null() {
        fallback.to_string_lossy()
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy()
    }
}

///The external callback registered with the debug-report extension. `p_user_data` must point to the
/// `Arc<dyn DebugCallback>` owned by the matching [DebugRegistration]. The listener's answer is returned unchanged.
pub unsafe extern "system" fn debug_report_trampoline(
    flags: vk::DebugReportFlagsEXT,
    object_type: vk::DebugReportObjectTypeEXT,
    object: u64,
    location: usize,
    message_code: i32,
    p_layer_prefix: *const c_char,
    p_message: *const c_char,
    p_user_data: *mut c_void,
) -> vk::Bool32 {
    if p_user_data.is_null() {
        #[cfg(feature = "logging")]
        log::error!("DebugReport: Got message, but no listener!");
        return vk::FALSE;
    }

    let listener = unsafe { &*(p_user_data as *const Arc<dyn DebugCallback>) };
    let data = CallbackData {
        flags,
        object_type,
        object,
        location,
        message_code,
        layer_prefix: unsafe { lossy(p_layer_prefix, UNKNOWNLAYER.as_cstr()) },
        message: unsafe { lossy(p_message, NOMSG.as_cstr()) },
    };

    if listener.on_message(&data) {
        vk::TRUE
    } else {
        vk::FALSE
    }
}

///An active debug-report callback together with the listener it points to. Dropping it unregisters the callback
/// first and releases the listener afterwards.
pub struct DebugRegistration {
    loader: Box<dyn DebugReportFns>,
    callback: vk::DebugReportCallbackEXT,
    //Boxed so the address handed to the layer stays stable.
    listener: Box<Arc<dyn DebugCallback>>,
}

impl DebugRegistration {
    ///Registers `listener` through `loader`.
    pub fn register(
        loader: Box<dyn DebugReportFns>,
        listener: Arc<dyn DebugCallback>,
        verbose: bool,
    ) -> Result<Self, vk::Result> {
        let listener = Box::new(listener);
        let user_data = &*listener as *const Arc<dyn DebugCallback> as *mut c_void;
        let info = vk::DebugReportCallbackCreateInfoEXT::default()
            .flags(report_flags(verbose))
            .pfn_callback(Some(debug_report_trampoline))
            .user_data(user_data);

        let callback = loader.create_debug_report_callback(&info)?;

        Ok(DebugRegistration {
            loader,
            callback,
            listener,
        })
    }

    pub fn listener(&self) -> &Arc<dyn DebugCallback> {
        &self.listener
    }

    pub fn handle(&self) -> vk::DebugReportCallbackEXT {
        self.callback
    }
}

impl Drop for DebugRegistration {
    fn drop(&mut self) {
        self.loader.destroy_debug_report_callback(self.callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{ffi::CString, sync::Mutex};

    struct Recorder {
        seen: Mutex<Vec<(vk::DebugReportFlagsEXT, String, String, i32)>>,
        answer: bool,
    }

    impl DebugCallback for Recorder {
        fn on_message(&self, data: &CallbackData<'_>) -> bool {
            self.seen.lock().unwrap().push((
                data.flags,
                data.layer_prefix.to_string(),
                data.message.to_string(),
                data.message_code,
            ));
            self.answer
        }
    }

    fn call(
        listener: &Arc<dyn DebugCallback>,
        layer: *const c_char,
        msg: *const c_char,
    ) -> vk::Bool32 {
        unsafe {
            debug_report_trampoline(
                vk::DebugReportFlagsEXT::WARNING,
                vk::DebugReportObjectTypeEXT::INSTANCE,
                1,
                2,
                99,
                layer,
                msg,
                listener as *const Arc<dyn DebugCallback> as *mut c_void,
            )
        }
    }

    #[test]
    fn trampoline_relays_event_and_answer() {
        for answer in [false, true] {
            let recorder = Arc::new(Recorder {
                seen: Mutex::new(Vec::new()),
                answer,
            });
            let listener: Arc<dyn DebugCallback> = recorder.clone();
            let layer = CString::new("Validation").unwrap();
            let msg = CString::new("bad things").unwrap();

            let result = call(&listener, layer.as_ptr(), msg.as_ptr());
            assert_eq!(result, if answer { vk::TRUE } else { vk::FALSE });

            let seen = recorder.seen.lock().unwrap();
            assert_eq!(
                seen.as_slice(),
                &[(
                    vk::DebugReportFlagsEXT::WARNING,
                    "Validation".to_string(),
                    "bad things".to_string(),
                    99
                )]
            );
        }
    }

    #[test]
    fn trampoline_tolerates_null_strings() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            answer: false,
        });
        let listener: Arc<dyn DebugCallback> = recorder.clone();
        call(&listener, std::ptr::null(), std::ptr::null());

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].1, "unknown layer");
        assert_eq!(seen[0].2, "no message");
    }

    #[test]
    fn trampoline_without_listener_does_not_abort() {
        let result = unsafe {
            debug_report_trampoline(
                vk::DebugReportFlagsEXT::ERROR,
                vk::DebugReportObjectTypeEXT::UNKNOWN,
                0,
                0,
                0,
                std::ptr::null(),
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
    }

    #[test]
    fn verbose_widens_mask() {
        let quiet = report_flags(false);
        assert!(quiet.contains(vk::DebugReportFlagsEXT::ERROR | vk::DebugReportFlagsEXT::DEBUG));
        assert!(!quiet.intersects(vk::DebugReportFlagsEXT::WARNING));

        let verbose = report_flags(true);
        assert!(verbose.contains(
            vk::DebugReportFlagsEXT::INFORMATION
                | vk::DebugReportFlagsEXT::WARNING
                | vk::DebugReportFlagsEXT::PERFORMANCE_WARNING
        ));
    }

    #[cfg(feature = "logging")]
    #[test]
    fn log_callback_never_aborts() {
        let listener: Arc<dyn DebugCallback> = Arc::new(LogCallback);
        let msg = CString::new("x").unwrap();
        assert_eq!(call(&listener, msg.as_ptr(), msg.as_ptr()), vk::FALSE);
    }

    #[test]
    fn closures_are_listeners() {
        let listener: Arc<dyn DebugCallback> =
            Arc::new(|data: &CallbackData<'_>| data.message_code == 99);
        let msg = CString::new("x").unwrap();
        assert_eq!(call(&listener, msg.as_ptr(), msg.as_ptr()), vk::TRUE);
    }
}
