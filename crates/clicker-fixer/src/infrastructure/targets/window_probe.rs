//! Top-level window enumeration with the Win32 API.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Win32 FFI calls.  All
//! `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::path::Path;

use windows::core::{BOOL, PWSTR};
use windows::Win32::Foundation::{CloseHandle, HWND, LPARAM};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClassNameW, GetWindowThreadProcessId, IsWindowVisible,
};

use super::propresenter::{ProbeError, WindowProbe};

/// Longest window class name Win32 allows.
const MAX_CLASS_NAME: usize = 256;
const MAX_IMAGE_PATH: usize = 1024;

/// Finds a top-level window by class name and owning process name.
pub struct Win32WindowProbe {
    process_name: String,
    window_class: String,
}

impl Win32WindowProbe {
    pub fn new(process_name: &str, window_class: &str) -> Self {
        Self {
            process_name: process_name.to_string(),
            window_class: window_class.to_string(),
        }
    }

    fn owned_by_process(&self, hwnd: HWND) -> bool {
        let mut pid = 0u32;
        // SAFETY: `hwnd` came from EnumWindows; `pid` is a valid out pointer.
        unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
        if pid == 0 {
            return false;
        }
        process_image_stem(pid)
            .is_some_and(|stem| stem.eq_ignore_ascii_case(&self.process_name))
    }
}

impl WindowProbe for Win32WindowProbe {
    fn output_window_visible(&self) -> Result<Option<bool>, ProbeError> {
        for hwnd in top_level_windows()? {
            if class_name(hwnd).as_deref() == Some(self.window_class.as_str())
                && self.owned_by_process(hwnd)
            {
                // SAFETY: plain query on a window handle.
                return Ok(Some(unsafe { IsWindowVisible(hwnd) }.as_bool()));
            }
        }
        Ok(None)
    }
}

fn top_level_windows() -> Result<Vec<HWND>, ProbeError> {
    unsafe extern "system" fn collect(hwnd: HWND, lparam: LPARAM) -> BOOL {
        // SAFETY: `lparam` is the `&mut Vec<HWND>` passed below, alive for
        // the whole EnumWindows call.
        let windows = unsafe { &mut *(lparam.0 as *mut Vec<HWND>) };
        windows.push(hwnd);
        BOOL(1)
    }

    let mut windows: Vec<HWND> = Vec::new();
    // SAFETY: the callback only touches `windows` through `lparam`.
    unsafe { EnumWindows(Some(collect), LPARAM(&mut windows as *mut Vec<HWND> as isize)) }
        .map_err(|e| ProbeError::Enumeration(e.to_string()))?;
    Ok(windows)
}

fn class_name(hwnd: HWND) -> Option<String> {
    let mut buf = [0u16; MAX_CLASS_NAME];
    // SAFETY: `buf` is a writable buffer; the length is taken from the slice.
    let len = unsafe { GetClassNameW(hwnd, &mut buf) };
    (len > 0).then(|| String::from_utf16_lossy(&buf[..len as usize]))
}

fn process_image_stem(pid: u32) -> Option<String> {
    // SAFETY: the handle is closed below on every path.
    let process = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }.ok()?;

    let mut buf = [0u16; MAX_IMAGE_PATH];
    let mut len = buf.len() as u32;
    // SAFETY: `buf` holds `len` UTF-16 units; `len` is updated in place.
    let queried = unsafe {
        QueryFullProcessImageNameW(process, PROCESS_NAME_WIN32, PWSTR(buf.as_mut_ptr()), &mut len)
    };
    // SAFETY: `process` was opened above and is not used afterwards.
    unsafe {
        let _ = CloseHandle(process);
    }
    queried.ok()?;

    let path = String::from_utf16_lossy(&buf[..len as usize]);
    Path::new(&path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}
