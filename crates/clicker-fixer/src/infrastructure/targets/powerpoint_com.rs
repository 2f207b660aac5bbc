//! Office automation over COM late binding (`IDispatch`).
//!
//! Every call looks up the running `PowerPoint.Application` object through
//! the running object table, walks `SlideShowWindows(1).View`, and drops all
//! interface pointers before returning.  Nothing COM-owned outlives a call,
//! so the automation object can move between threads; COM itself is
//! initialised once per calling thread.
//!
//! # Safety
//!
//! `unsafe` is confined to COM calls.  All `unsafe` blocks are annotated
//! with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::cell::Cell;
use std::iter;

use windows::core::{w, IUnknown, Interface, GUID, PCWSTR, VARIANT};
use windows::Win32::System::Com::{
    CLSIDFromProgID, CoInitializeEx, IDispatch, COINIT_APARTMENTTHREADED, DISPATCH_FLAGS,
    DISPATCH_METHOD, DISPATCH_PROPERTYGET, DISPPARAMS,
};
use windows::Win32::System::Ole::GetActiveObject;

use super::powerpoint::{AutomationError, SlideShowAutomation, SlideShowState};

const LOCALE_USER_DEFAULT: u32 = 0x0400;

thread_local! {
    static COM_READY: Cell<bool> = const { Cell::new(false) };
}

fn ensure_com() {
    COM_READY.with(|ready| {
        if ready.get() {
            return;
        }
        // SAFETY: initialises COM for the calling thread; never paired with
        // CoUninitialize because the thread keeps using COM until it exits.
        // RPC_E_CHANGED_MODE means COM is already usable on this thread.
        let _ = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        ready.set(true);
    });
}

fn call_error(call: &'static str) -> impl Fn(windows::core::Error) -> AutomationError {
    move |e| AutomationError::Call {
        call,
        reason: e.message().to_string(),
    }
}

/// Late-bound member access on one `IDispatch`.
struct Dispatch(IDispatch);

impl Dispatch {
    fn member_id(&self, name: &'static str) -> Result<i32, AutomationError> {
        let wide: Vec<u16> = name.encode_utf16().chain(iter::once(0)).collect();
        let names = [PCWSTR(wide.as_ptr())];
        let mut id = 0i32;
        // SAFETY: `names` points at one NUL-terminated UTF-16 string that
        // outlives the call; `id` receives exactly one DISPID.
        unsafe {
            self.0
                .GetIDsOfNames(&GUID::zeroed(), names.as_ptr(), 1, LOCALE_USER_DEFAULT, &mut id)
        }
        .map_err(call_error(name))?;
        Ok(id)
    }

    fn invoke(
        &self,
        name: &'static str,
        flags: DISPATCH_FLAGS,
        args: &mut [VARIANT],
    ) -> Result<VARIANT, AutomationError> {
        let id = self.member_id(name)?;
        let params = DISPPARAMS {
            rgvarg: args.as_mut_ptr(),
            rgdispidNamedArgs: std::ptr::null_mut(),
            cArgs: args.len() as u32,
            cNamedArgs: 0,
        };
        let mut result = VARIANT::default();
        // SAFETY: `params` borrows `args` for the duration of the call and
        // `result` is a valid, initialised VARIANT.
        unsafe {
            self.0.Invoke(
                id,
                &GUID::zeroed(),
                LOCALE_USER_DEFAULT,
                flags,
                &params,
                Some(&mut result),
                None,
                None,
            )
        }
        .map_err(call_error(name))?;
        Ok(result)
    }

    fn get(&self, name: &'static str) -> Result<VARIANT, AutomationError> {
        self.invoke(name, DISPATCH_PROPERTYGET, &mut [])
    }

    fn get_object(&self, name: &'static str) -> Result<Dispatch, AutomationError> {
        Self::from_variant(name, &self.get(name)?)
    }

    fn get_i32(&self, name: &'static str) -> Result<i32, AutomationError> {
        i32::try_from(&self.get(name)?).map_err(call_error(name))
    }

    fn call(&self, name: &'static str) -> Result<(), AutomationError> {
        self.invoke(name, DISPATCH_METHOD, &mut []).map(drop)
    }

    fn from_variant(name: &'static str, value: &VARIANT) -> Result<Dispatch, AutomationError> {
        let unknown = IUnknown::try_from(value).map_err(call_error(name))?;
        let dispatch = unknown.cast::<IDispatch>().map_err(call_error(name))?;
        Ok(Dispatch(dispatch))
    }
}

/// [`SlideShowAutomation`] backed by the running PowerPoint instance.
#[derive(Debug, Default)]
pub struct ComSlideShowAutomation;

impl ComSlideShowAutomation {
    pub fn new() -> Self {
        Self
    }

    fn application(&self) -> Result<Dispatch, AutomationError> {
        ensure_com();
        // SAFETY: the ProgID is a static NUL-terminated wide string.
        let clsid = unsafe { CLSIDFromProgID(w!("PowerPoint.Application")) }
            .map_err(|_| AutomationError::NotRunning)?;

        let mut unknown: Option<IUnknown> = None;
        // SAFETY: `clsid` is valid for the call; `unknown` receives an owned
        // interface pointer on success.
        unsafe { GetActiveObject(&clsid, None, &mut unknown) }
            .map_err(|_| AutomationError::NotRunning)?;
        let unknown = unknown.ok_or(AutomationError::NotRunning)?;
        let app = unknown
            .cast::<IDispatch>()
            .map_err(call_error("PowerPoint.Application"))?;
        Ok(Dispatch(app))
    }

    fn first_view(&self) -> Result<Dispatch, AutomationError> {
        let windows = self.application()?.get_object("SlideShowWindows")?;
        if windows.get_i32("Count")? < 1 {
            return Err(AutomationError::NoSlideShow);
        }
        let first = windows.invoke("Item", DISPATCH_METHOD, &mut [VARIANT::from(1i32)])?;
        Dispatch::from_variant("Item", &first)?.get_object("View")
    }
}

impl SlideShowAutomation for ComSlideShowAutomation {
    fn slide_show_count(&self) -> Result<u32, AutomationError> {
        let count = self
            .application()?
            .get_object("SlideShowWindows")?
            .get_i32("Count")?;
        Ok(u32::try_from(count).unwrap_or(0))
    }

    fn state(&self) -> Result<SlideShowState, AutomationError> {
        Ok(SlideShowState::from_raw(self.first_view()?.get_i32("State")?))
    }

    fn next(&self) -> Result<(), AutomationError> {
        self.first_view()?.call("Next")
    }

    fn previous(&self) -> Result<(), AutomationError> {
        self.first_view()?.call("Previous")
    }
}
