//! Window location: enumerating top-level windows and resolving the capture
//! region. All locator failures degrade to a fallback region, never abort.

use crate::core::coords::Region;
use crate::core::error::DetectorError;

/// Opaque top-level window handle (HWND value on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    pub rect: Region,
}

/// External collaborator that knows about windows, the cursor and the screen.
pub trait WindowLocator {
    /// All visible, titled, reasonably sized top-level windows, sorted by
    /// title length (shortest first, the original tool's listing order).
    fn list_windows(&self) -> Result<Vec<WindowInfo>, DetectorError>;

    fn window_rect(&self, handle: WindowHandle) -> Option<Region>;

    fn window_exists(&self, handle: WindowHandle) -> bool;

    fn cursor_pos(&self) -> Option<(i32, i32)>;

    /// Primary display size in pixels.
    fn screen_size(&self) -> (i32, i32);

    /// First window whose title contains `substring`, case-insensitively.
    fn find_by_title(&self, substring: &str) -> Result<Option<WindowInfo>, DetectorError> {
        let needle = substring.to_lowercase();
        Ok(self
            .list_windows()?
            .into_iter()
            .find(|window| window.title.to_lowercase().contains(&needle)))
    }

    /// Degraded capture region centered on the primary display.
    fn fallback_region(&self) -> Region {
        let (width, height) = self.screen_size();
        Region::centered_fallback(width, height)
    }
}

#[cfg(windows)]
pub use win32::Win32WindowLocator;

#[cfg(windows)]
mod win32 {
    use super::*;

    use windows::Win32::Foundation::{BOOL, HWND, LPARAM, POINT, RECT, TRUE};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, GetCursorPos, GetSystemMetrics, GetWindowRect, GetWindowTextW, IsWindow,
        IsWindowVisible, SM_CXSCREEN, SM_CYSCREEN,
    };

    /// Smaller windows than this are tool palettes and notification toasts,
    /// not capture candidates.
    const MIN_WINDOW_SIZE: i32 = 50;

    pub struct Win32WindowLocator;

    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let windows = &mut *(lparam.0 as *mut Vec<WindowInfo>);

        if IsWindowVisible(hwnd).as_bool() {
            let mut buf = [0u16; 512];
            let len = GetWindowTextW(hwnd, &mut buf) as usize;
            if len > 0 {
                let title = String::from_utf16_lossy(&buf[..len]);
                let mut rect = RECT::default();
                if GetWindowRect(hwnd, &mut rect).is_ok() {
                    let width = rect.right - rect.left;
                    let height = rect.bottom - rect.top;
                    if width > MIN_WINDOW_SIZE && height > MIN_WINDOW_SIZE {
                        windows.push(WindowInfo {
                            handle: WindowHandle(hwnd.0),
                            title,
                            rect: Region::new(rect.left, rect.top, width, height),
                        });
                    }
                }
            }
        }
        TRUE
    }

    impl WindowLocator for Win32WindowLocator {
        fn list_windows(&self) -> Result<Vec<WindowInfo>, DetectorError> {
            let mut windows: Vec<WindowInfo> = Vec::new();
            unsafe {
                EnumWindows(
                    Some(enum_callback),
                    LPARAM(&mut windows as *mut Vec<WindowInfo> as isize),
                )
                .map_err(|e| DetectorError::WindowEnum(e.to_string()))?;
            }
            windows.sort_by_key(|window| window.title.len());
            Ok(windows)
        }

        fn window_rect(&self, handle: WindowHandle) -> Option<Region> {
            unsafe {
                let mut rect = RECT::default();
                if GetWindowRect(HWND(handle.0), &mut rect).is_ok() {
                    Some(Region::new(
                        rect.left,
                        rect.top,
                        rect.right - rect.left,
                        rect.bottom - rect.top,
                    ))
                } else {
                    None
                }
            }
        }

        fn window_exists(&self, handle: WindowHandle) -> bool {
            unsafe { IsWindow(HWND(handle.0)).as_bool() }
        }

        fn cursor_pos(&self) -> Option<(i32, i32)> {
            unsafe {
                let mut point = POINT::default();
                if GetCursorPos(&mut point).is_ok() {
                    Some((point.x, point.y))
                } else {
                    None
                }
            }
        }

        fn screen_size(&self) -> (i32, i32) {
            unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
        }
    }
}
