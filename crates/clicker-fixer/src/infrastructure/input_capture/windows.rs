//! Interception driver backend.
//!
//! The Interception kernel driver sits below the Windows input stack and
//! hands every filtered stroke to user mode together with the device it came
//! from.  A stroke that is received but not sent back is swallowed.
//!
//! `interception.dll` is loaded with `LoadLibraryW` when the source opens,
//! so a missing library or driver is reported as a [`CaptureError`] instead
//! of a loader failure before `main` runs.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for the driver library's C ABI
//! and the Win32 loader calls.  All `unsafe` blocks are annotated with
//! `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::ffi::c_void;
use std::time::Duration;

use clicker_core::{DeviceClass, DeviceId, KeyState, RawInputEvent};
use tracing::{debug, info};
use windows::core::{s, w};
use windows::Win32::Foundation::{FreeLibrary, HMODULE};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

use super::{CaptureError, InputSource, Received};

const LIBRARY_NAME: &str = "interception.dll";

/// Filter mask selecting every keyboard state (make, break, E0, E1, …).
const FILTER_KEY_ALL: u16 = 0xFFFF;

/// Hardware id buffer size in UTF-16 units.
const HARDWARE_ID_CAPACITY: usize = 512;

type Context = *mut c_void;
type Predicate = unsafe extern "C" fn(device: i32) -> i32;

type CreateContextFn = unsafe extern "C" fn() -> Context;
type DestroyContextFn = unsafe extern "C" fn(Context);
type SetFilterFn = unsafe extern "C" fn(Context, Option<Predicate>, u16);
type WaitWithTimeoutFn = unsafe extern "C" fn(Context, u32) -> i32;
type ReceiveFn = unsafe extern "C" fn(Context, i32, *mut Stroke, u32) -> i32;
type SendFn = unsafe extern "C" fn(Context, i32, *const Stroke, u32) -> i32;
type GetHardwareIdFn = unsafe extern "C" fn(Context, i32, *mut c_void, u32) -> u32;
type IsKeyboardFn = unsafe extern "C" fn(i32) -> i32;

/// One driver stroke, sized like the library's `InterceptionStroke` (the
/// larger mouse layout) so a receive never writes past the buffer.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct Stroke {
    code: u16,
    state: u16,
    information: u32,
    mouse_tail: [u32; 3],
}

/// Resolved entry points of `interception.dll`.
struct DriverApi {
    module: HMODULE,
    create_context: CreateContextFn,
    destroy_context: DestroyContextFn,
    set_filter: SetFilterFn,
    wait_with_timeout: WaitWithTimeoutFn,
    receive: ReceiveFn,
    send: SendFn,
    get_hardware_id: GetHardwareIdFn,
    is_keyboard: IsKeyboardFn,
}

macro_rules! resolve {
    ($module:expr, $name:literal, $ty:ty) => {{
        // SAFETY: `$module` is a live module handle; the name is a
        // NUL-terminated literal produced by `s!`.
        let proc = unsafe { GetProcAddress($module, s!($name)) };
        match proc {
            // SAFETY: the export has the C signature `$ty` documented by the
            // Interception library header.
            Some(f) => unsafe { std::mem::transmute::<unsafe extern "system" fn() -> isize, $ty>(f) },
            None => return Err(CaptureError::MissingSymbol($name)),
        }
    }};
}

impl DriverApi {
    fn load() -> Result<Self, CaptureError> {
        // SAFETY: loading a DLL by name; the library has no DllMain side
        // effects beyond its own initialisation.
        let module = unsafe { LoadLibraryW(w!("interception.dll")) }.map_err(|e| {
            CaptureError::LibraryUnavailable {
                library: LIBRARY_NAME.to_string(),
                reason: format!(
                    "{e}; copy {LIBRARY_NAME} next to the executable or into {}",
                    std::env::current_dir()
                        .map(|d| d.display().to_string())
                        .unwrap_or_else(|_| "the working directory".to_string())
                ),
            }
        })?;

        let api = (|| {
            Ok(Self {
                module,
                create_context: resolve!(module, "interception_create_context", CreateContextFn),
                destroy_context: resolve!(module, "interception_destroy_context", DestroyContextFn),
                set_filter: resolve!(module, "interception_set_filter", SetFilterFn),
                wait_with_timeout: resolve!(module, "interception_wait_with_timeout", WaitWithTimeoutFn),
                receive: resolve!(module, "interception_receive", ReceiveFn),
                send: resolve!(module, "interception_send", SendFn),
                get_hardware_id: resolve!(module, "interception_get_hardware_id", GetHardwareIdFn),
                is_keyboard: resolve!(module, "interception_is_keyboard", IsKeyboardFn),
            })
        })();

        if api.is_err() {
            // SAFETY: `module` came from LoadLibraryW above and is not used again.
            unsafe {
                let _ = FreeLibrary(module);
            }
        }
        api
    }
}

/// [`InputSource`] backed by the Interception driver.
pub struct InterceptionSource {
    api: DriverApi,
    context: Context,
}

// SAFETY: the driver context is an opaque handle that the library allows to
// be used from any thread; this type is only ever used by one thread at a
// time (it is moved into the dispatcher thread and owned there).
unsafe impl Send for InterceptionSource {}

impl InterceptionSource {
    /// Loads the driver library, creates a context, and installs a filter
    /// capturing every keyboard stroke.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::LibraryUnavailable`] or
    /// [`CaptureError::MissingSymbol`] when the DLL cannot be used, and
    /// [`CaptureError::ContextCreationFailed`] when the driver is not
    /// installed (or the machine was not rebooted after installing it).
    pub fn open() -> Result<Self, CaptureError> {
        let api = DriverApi::load()?;

        // SAFETY: FFI call with no arguments.
        let context = unsafe { (api.create_context)() };
        if context.is_null() {
            // SAFETY: module is owned by `api` and released exactly once here.
            unsafe {
                let _ = FreeLibrary(api.module);
            }
            return Err(CaptureError::ContextCreationFailed);
        }

        // SAFETY: `context` is non-null; the predicate is the library's own
        // keyboard predicate.
        unsafe { (api.set_filter)(context, Some(api.is_keyboard), FILTER_KEY_ALL) };

        info!("Interception driver context created; capturing all keyboard strokes");
        Ok(Self { api, context })
    }

    fn is_keyboard(&self, device: i32) -> bool {
        // SAFETY: pure predicate on the device number.
        unsafe { (self.api.is_keyboard)(device) != 0 }
    }
}

impl InputSource for InterceptionSource {
    fn receive(&mut self, timeout: Duration) -> Result<Received, CaptureError> {
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);

        // SAFETY: `self.context` stays valid until Drop.
        let device = unsafe { (self.api.wait_with_timeout)(self.context, millis) };
        if device <= 0 {
            return Ok(Received::Idle);
        }

        let mut stroke = Stroke::default();
        // SAFETY: `stroke` is a writable buffer of one full-size stroke.
        let count = unsafe { (self.api.receive)(self.context, device, &mut stroke, 1) };
        if count <= 0 {
            return Err(CaptureError::Receive(format!(
                "driver returned {count} strokes for device {device}"
            )));
        }

        let class = if self.is_keyboard(device) {
            DeviceClass::Keyboard
        } else {
            DeviceClass::Mouse
        };

        Ok(Received::Event(RawInputEvent {
            device: DeviceId(device),
            class,
            code: stroke.code,
            state: KeyState::from_raw(stroke.state),
            information: stroke.information,
        }))
    }

    fn pass_through(&mut self, event: &RawInputEvent) -> Result<(), CaptureError> {
        let stroke = Stroke {
            code: event.code,
            state: event.state.to_raw(),
            information: event.information,
            mouse_tail: [0; 3],
        };
        // SAFETY: `stroke` is a readable buffer of one full-size stroke.
        let sent = unsafe { (self.api.send)(self.context, event.device.0, &stroke, 1) };
        if sent <= 0 {
            return Err(CaptureError::PassThrough {
                device: event.device,
                reason: format!("driver accepted {sent} strokes"),
            });
        }
        Ok(())
    }

    fn hardware_id(&mut self, device: DeviceId) -> Option<String> {
        let mut buf = [0u16; HARDWARE_ID_CAPACITY];
        // SAFETY: the buffer size is passed in bytes, as the library expects.
        let written = unsafe {
            (self.api.get_hardware_id)(
                self.context,
                device.0,
                buf.as_mut_ptr().cast(),
                (buf.len() * std::mem::size_of::<u16>()) as u32,
            )
        } as usize;
        if written == 0 {
            debug!("no hardware id for {device}");
            return None;
        }

        // The driver returns a multi-string; the first entry is the id.
        let units = &buf[..(written / 2).min(buf.len())];
        let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
        Some(String::from_utf16_lossy(&units[..end]))
    }
}

impl Drop for InterceptionSource {
    fn drop(&mut self) {
        // SAFETY: context and module are released exactly once, context first.
        unsafe {
            (self.api.destroy_context)(self.context);
            let _ = FreeLibrary(self.api.module);
        }
        debug!("Interception driver context destroyed");
    }
}
