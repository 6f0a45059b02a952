//! Frame acquisition. Capture failures are transient: the loop logs and
//! retries after a short backoff without advancing any detection state.

use crate::core::coords::Region;
use crate::core::error::DetectorError;
use crate::detection::classifier::Frame;

/// External collaborator producing frames for a screen region.
pub trait FrameSource {
    fn capture(&mut self, region: Region) -> Result<Frame, DetectorError>;
}

#[cfg(windows)]
pub use gdi::GdiFrameSource;

#[cfg(windows)]
mod gdi {
    use super::*;

    use image::{ImageBuffer, Rgb};
    use windows::Win32::Foundation::HWND;
    use windows::Win32::Graphics::Gdi::{
        BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
        GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS,
        SRCCOPY,
    };

    /// Capture a screen region using BitBlt from the desktop device context.
    /// Note: this captures visible pixels, so the region should be on-screen.
    pub struct GdiFrameSource;

    impl GdiFrameSource {
        pub fn new() -> Self {
            Self
        }
    }

    impl FrameSource for GdiFrameSource {
        fn capture(&mut self, region: Region) -> Result<Frame, DetectorError> {
            if region.is_empty() {
                return Err(DetectorError::Capture(format!("empty capture region {region}")));
            }
            let width = region.width;
            let height = region.height;

            unsafe {
                let hdc = GetDC(HWND(0));
                if hdc.is_invalid() {
                    return Err(DetectorError::Capture("failed to get desktop device context".into()));
                }

                let mem_dc = CreateCompatibleDC(hdc);
                if mem_dc.is_invalid() {
                    let _ = ReleaseDC(HWND(0), hdc);
                    return Err(DetectorError::Capture("failed to create compatible DC".into()));
                }

                let bitmap = CreateCompatibleBitmap(hdc, width, height);
                if bitmap.is_invalid() {
                    let _ = DeleteDC(mem_dc);
                    let _ = ReleaseDC(HWND(0), hdc);
                    return Err(DetectorError::Capture("failed to create compatible bitmap".into()));
                }

                let old_bitmap = SelectObject(mem_dc, bitmap);

                let blit = BitBlt(mem_dc, 0, 0, width, height, hdc, region.x, region.y, SRCCOPY);
                if blit.is_err() {
                    let _ = SelectObject(mem_dc, old_bitmap);
                    let _ = DeleteObject(bitmap);
                    let _ = DeleteDC(mem_dc);
                    let _ = ReleaseDC(HWND(0), hdc);
                    return Err(DetectorError::Capture(
                        "BitBlt failed - could not capture screen region".into(),
                    ));
                }

                let mut bmi = BITMAPINFO {
                    bmiHeader: BITMAPINFOHEADER {
                        biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                        biWidth: width,
                        biHeight: -height, // Negative for top-down bitmap
                        biPlanes: 1,
                        biBitCount: 24, // BGR (3 bytes per pixel)
                        biCompression: BI_RGB.0 as u32,
                        biSizeImage: 0,
                        biXPelsPerMeter: 0,
                        biYPelsPerMeter: 0,
                        biClrUsed: 0,
                        biClrImportant: 0,
                    },
                    bmiColors: [Default::default(); 1],
                };

                // Rows from GetDIBits are padded to 4-byte boundaries.
                let stride = ((width * 3 + 3) / 4 * 4) as usize;
                let mut buffer: Vec<u8> = vec![0; stride * height as usize];

                let scan_lines = GetDIBits(
                    mem_dc,
                    bitmap,
                    0,
                    height as u32,
                    Some(buffer.as_mut_ptr() as *mut _),
                    &mut bmi,
                    DIB_RGB_COLORS,
                );

                let _ = SelectObject(mem_dc, old_bitmap);
                let _ = DeleteObject(bitmap);
                let _ = DeleteDC(mem_dc);
                let _ = ReleaseDC(HWND(0), hdc);

                if scan_lines == 0 {
                    return Err(DetectorError::Capture("failed to get bitmap bits".into()));
                }

                // Convert padded BGR rows to a tight RGB image buffer.
                let mut frame: Frame = ImageBuffer::new(width as u32, height as u32);
                for y in 0..height as usize {
                    let row = &buffer[y * stride..];
                    for x in 0..width as usize {
                        let b = row[x * 3];
                        let g = row[x * 3 + 1];
                        let r = row[x * 3 + 2];
                        frame.put_pixel(x as u32, y as u32, Rgb([r, g, b]));
                    }
                }

                Ok(frame)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Replays a scripted sequence of capture results.
    pub(crate) struct ScriptedFrameSource {
        frames: Vec<Result<Frame, DetectorError>>,
        pub captured_regions: Vec<Region>,
    }

    impl ScriptedFrameSource {
        pub(crate) fn new(frames: Vec<Result<Frame, DetectorError>>) -> Self {
            Self { frames: { let mut f = frames; f.reverse(); f }, captured_regions: Vec::new() }
        }
    }

    impl FrameSource for ScriptedFrameSource {
        fn capture(&mut self, region: Region) -> Result<Frame, DetectorError> {
            self.captured_regions.push(region);
            self.frames
                .pop()
                .unwrap_or_else(|| Err(DetectorError::Capture("script exhausted".into())))
        }
    }
}
