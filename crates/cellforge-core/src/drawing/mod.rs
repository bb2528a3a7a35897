//! Embedded images and their placement on the grid
//!
//! Positions are kept in pixels. Conversion to EMU (the OOXML length unit)
//! happens only when a drawing part is written, via [`px_to_emu`].

mod anchor;
mod collection;
mod image;

pub use anchor::Anchor;
pub use collection::ImageCollection;
pub use image::{Image, ImageFormat, DEFAULT_IMAGE_SIZE_PX};

/// English Metric Units per pixel at 96 DPI
pub const EMU_PER_PIXEL: u64 = 9525;

/// Convert a pixel length to EMU
pub fn px_to_emu(px: u32) -> u64 {
    px as u64 * EMU_PER_PIXEL
}

/// Convert an EMU length back to whole pixels (rounded)
pub fn emu_to_px(emu: u64) -> u32 {
    (emu.saturating_add(EMU_PER_PIXEL / 2) / EMU_PER_PIXEL).min(u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_to_emu() {
        for px in [0u32, 1, 100, 1920, 65_535] {
            assert_eq!(px_to_emu(px), px as u64 * 9525);
            assert_eq!(emu_to_px(px_to_emu(px)), px);
        }
        assert_eq!(px_to_emu(u32::MAX), u32::MAX as u64 * 9525);
    }

    #[test]
    fn test_emu_to_px_saturates() {
        assert_eq!(emu_to_px(u64::MAX), u32::MAX);
        assert_eq!(emu_to_px(0), 0);
        assert_eq!(emu_to_px(4762), 0);
        assert_eq!(emu_to_px(4763), 1);
    }
}
