use image::{imageops, RgbImage};

use crate::shared::error::ConversionError;
use crate::shared::frame::{CameraFrame, PixelFormat};
use crate::shared::rotation::Rotation;

/// Detector input: upright, contiguous RGB bytes in row-major order.
///
/// Owns its pixels, so the camera frame it came from can be released as soon
/// as the detection settles without the detector holding a borrow.
#[derive(Clone, Debug)]
pub struct InputImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    rotation: Rotation,
    source_index: u64,
}

impl InputImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32, source_index: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * 3,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            rotation: Rotation::Deg0,
            source_index,
        }
    }

    /// Converts a camera buffer to RGB and rotates it upright.
    pub fn from_camera_frame(frame: &CameraFrame) -> Result<Self, ConversionError> {
        let rotation = Rotation::from_degrees(frame.rotation_degrees())?;
        let (format, width, height) = (frame.format(), frame.width(), frame.height());

        let expected = format.buffer_len(width, height);
        if frame.data().len() != expected {
            return Err(ConversionError::BufferSizeMismatch {
                format,
                width,
                height,
                expected,
                actual: frame.data().len(),
            });
        }

        let rgb = to_rgb(frame.data(), format, width, height)?;
        let sensor = RgbImage::from_raw(width, height, rgb).ok_or(
            ConversionError::BufferSizeMismatch {
                format,
                width,
                height,
                expected,
                actual: frame.data().len(),
            },
        )?;

        let upright = match rotation {
            Rotation::Deg0 => sensor,
            Rotation::Deg90 => imageops::rotate90(&sensor),
            Rotation::Deg180 => imageops::rotate180(&sensor),
            Rotation::Deg270 => imageops::rotate270(&sensor),
        };
        let (upright_width, upright_height) = upright.dimensions();

        Ok(Self {
            data: upright.into_raw(),
            width: upright_width,
            height: upright_height,
            rotation,
            source_index: frame.index(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rotation that was applied to bring the sensor image upright.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Index of the camera frame this image was converted from.
    pub fn source_index(&self) -> u64 {
        self.source_index
    }
}

fn to_rgb(
    data: &[u8],
    format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, ConversionError> {
    match format {
        PixelFormat::Rgb8 => Ok(data.to_vec()),
        PixelFormat::Rgba8 => Ok(data
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()),
        PixelFormat::Luma8 => Ok(data.iter().flat_map(|&l| [l, l, l]).collect()),
        PixelFormat::Nv21 => Ok(nv21_to_rgb(data, width as usize, height as usize)),
        PixelFormat::Raw16 => Err(ConversionError::UnsupportedFormat(format)),
    }
}

/// BT.601 full-range YUV to RGB.
fn nv21_to_rgb(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let (luma, chroma) = data.split_at(width * height);
    let chroma_stride = width.div_ceil(2) * 2;
    let mut rgb = Vec::with_capacity(width * height * 3);

    for row in 0..height {
        for col in 0..width {
            let y = luma[row * width + col] as f32;
            let uv = (row / 2) * chroma_stride + (col / 2) * 2;
            let v = chroma[uv] as f32 - 128.0;
            let u = chroma[uv + 1] as f32 - 128.0;

            let r = y + 1.402 * v;
            let g = y - 0.344_136 * u - 0.714_136 * v;
            let b = y + 1.772 * u;
            rgb.extend_from_slice(&[clamp_u8(r), clamp_u8(g), clamp_u8(b)]);
        }
    }
    rgb
}

fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
