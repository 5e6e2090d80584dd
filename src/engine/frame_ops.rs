//! Pixel-buffer operations on packed frames

use crate::domain::model::CropRect;

/// Copy `rect` out of a packed frame into `dst`.
///
/// Both buffers may carry row padding, so each side has its own stride in
/// bytes. `bytes_per_pixel` is 3 for RGB24.
pub fn copy_region(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    rect: &CropRect,
    bytes_per_pixel: usize,
) -> Result<(), String> {
    let row_bytes = rect.width() as usize * bytes_per_pixel;
    let x_offset = rect.x1() as usize * bytes_per_pixel;

    if x_offset + row_bytes > src_stride {
        return Err(format!(
            "region {} is wider than the source row ({} bytes)",
            rect, src_stride
        ));
    }
    if row_bytes > dst_stride {
        return Err(format!(
            "destination row of {} bytes cannot hold {} bytes",
            dst_stride, row_bytes
        ));
    }

    for row in 0..rect.height() as usize {
        let src_start = (rect.y1() as usize + row) * src_stride + x_offset;
        let dst_start = row * dst_stride;

        let src_row = src
            .get(src_start..src_start + row_bytes)
            .ok_or_else(|| format!("source frame ends before row {}", rect.y1() as usize + row))?;
        let dst_row = dst
            .get_mut(dst_start..dst_start + row_bytes)
            .ok_or_else(|| format!("destination frame ends before row {}", row))?;

        dst_row.copy_from_slice(src_row);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_region_rgb24() {
        #[rustfmt::skip]
        let src = vec![
            255, 0, 0,    0, 255, 0,    0, 0, 255,   // red green blue
            255, 255, 0,  0, 255, 255,  255, 0, 255, // yellow cyan magenta
        ]; // 3x2 RGB

        let rect = CropRect::new(1, 0, 3, 2, 3, 2).unwrap();
        let mut dst = vec![0u8; 2 * 2 * 3];
        copy_region(&src, 9, &mut dst, 6, &rect, 3).unwrap();

        assert_eq!(&dst[0..6], &[0, 255, 0, 0, 0, 255]);
        assert_eq!(&dst[6..12], &[0, 255, 255, 255, 0, 255]);
    }

    #[test]
    fn test_copy_region_honours_padding() {
        // 2x2 single-byte pixels, rows padded to 4 bytes
        let src = vec![1, 2, 0, 0, 3, 4, 0, 0];
        let rect = CropRect::new(1, 1, 2, 2, 2, 2).unwrap();
        let mut dst = vec![9u8; 8];
        copy_region(&src, 4, &mut dst, 8, &rect, 1).unwrap();
        assert_eq!(dst[0], 4);
        assert_eq!(&dst[1..], &[9; 7]);
    }

    #[test]
    fn test_copy_region_rejects_short_buffers() {
        let src = vec![0u8; 12];
        let rect = CropRect::new(0, 0, 2, 4, 4, 4).unwrap();
        let mut dst = vec![0u8; 32];
        assert!(copy_region(&src, 4, &mut dst, 8, &rect, 1).is_err());

        let rect = CropRect::new(2, 0, 4, 1, 4, 4).unwrap();
        assert!(copy_region(&src, 3, &mut dst, 8, &rect, 1).is_err());
    }
}
