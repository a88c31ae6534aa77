//! Decodes raw capture buffers into [`RgbaImage`], covering every pixel
//! format the capture thread negotiates.

use anyhow::{Context, Result, anyhow, ensure};
use image::RgbaImage;
use nokhwa::{Buffer, utils::FrameFormat};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

/// Decodes one capture buffer into an RGBA image. MJPEG frames take their
/// dimensions from the decoded stream; all other formats use the negotiated
/// resolution.
pub fn decode_camera_buffer(buffer: &Buffer) -> Result<RgbaImage> {
    let resolution = buffer.resolution();
    let width = resolution.width_x;
    let height = resolution.height_y;
    let data = buffer.buffer();

    let (rgba, width, height) = match buffer.source_frame_format() {
        FrameFormat::NV12 => (decode_nv12(data, width, height)?, width, height),
        FrameFormat::YUYV => (decode_yuyv(data, width, height)?, width, height),
        FrameFormat::MJPEG => decode_mjpeg(data)?,
        FrameFormat::RAWRGB => (decode_packed(data, width, height, [0, 1, 2])?, width, height),
        FrameFormat::RAWBGR => (decode_packed(data, width, height, [2, 1, 0])?, width, height),
        FrameFormat::GRAY => (decode_gray(data, width, height)?, width, height),
    };

    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| anyhow!("decoded frame does not match {width}x{height}"))
}

fn ensure_len(data: &[u8], expected: usize, format: &str) -> Result<()> {
    ensure!(
        data.len() >= expected,
        "{format} buffer too small: got {}, expected {expected}",
        data.len()
    );
    Ok(())
}

fn decode_nv12(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_plane_len = width as usize * height as usize;
    let uv_plane_len = y_plane_len / 2;
    ensure_len(data, y_plane_len + uv_plane_len, "NV12")?;

    let mut rgba = vec![0u8; y_plane_len * 4];
    let image = YuvBiPlanarImage {
        y_plane: &data[..y_plane_len],
        y_stride: width,
        uv_plane: &data[y_plane_len..y_plane_len + uv_plane_len],
        uv_stride: width,
        width,
        height,
    };

    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 decode failed: {err:?}"))?;

    Ok(rgba)
}

fn decode_yuyv(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    ensure_len(data, pixels * 2, "YUYV")?;

    let mut rgba = vec![0u8; pixels * 4];
    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };

    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422 decode failed: {err:?}"))?;

    Ok(rgba)
}

fn decode_mjpeg(data: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;

    let info = decoder
        .info()
        .context("MJPEG decoder reported no image info")?;
    let width = u32::try_from(info.width).map_err(|_| anyhow!("MJPEG width out of range"))?;
    let height = u32::try_from(info.height).map_err(|_| anyhow!("MJPEG height out of range"))?;
    ensure_len(&rgba, width as usize * height as usize * 4, "decoded MJPEG")?;

    Ok((rgba, width, height))
}

/// Expands 3-byte pixels to opaque RGBA. `order` gives the source index of
/// each output channel, so `[2, 1, 0]` reads BGR input.
fn decode_packed(data: &[u8], width: u32, height: u32, order: [usize; 3]) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    ensure_len(data, pixels * 3, "packed RGB")?;

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_chunks_exact(3))
        .for_each(|(dst, src)| {
            dst[0] = src[order[0]];
            dst[1] = src[order[1]];
            dst[2] = src[order[2]];
            dst[3] = 255;
        });

    Ok(rgba)
}

fn decode_gray(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = width as usize * height as usize;
    ensure_len(data, pixels, "GRAY")?;

    let mut rgba = vec![0u8; pixels * 4];
    rgba.par_chunks_mut(4)
        .zip(data.par_iter().copied())
        .for_each(|(dst, value)| {
            dst[0] = value;
            dst[1] = value;
            dst[2] = value;
            dst[3] = 255;
        });

    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_order_maps_bgr_to_rgb() {
        let data = [10u8, 20, 30, 40, 50, 60];
        let rgba = decode_packed(&data, 2, 1, [2, 1, 0]).unwrap();
        assert_eq!(rgba, vec![30, 20, 10, 255, 60, 50, 40, 255]);

        let rgba = decode_packed(&data, 2, 1, [0, 1, 2]).unwrap();
        assert_eq!(rgba, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn gray_expands_to_opaque_rgba() {
        let rgba = decode_gray(&[7, 200], 1, 2).unwrap();
        assert_eq!(rgba, vec![7, 7, 7, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn short_buffers_are_rejected() {
        assert!(decode_packed(&[0; 5], 2, 1, [0, 1, 2]).is_err());
        assert!(decode_yuyv(&[0; 3], 2, 1).is_err());
        assert!(decode_nv12(&[0; 4], 2, 2).is_err());
        assert!(decode_gray(&[0; 1], 2, 1).is_err());
    }
}
