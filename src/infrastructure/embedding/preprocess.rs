//! ResNet50 input preparation, matching the Keras pipeline the catalog was embedded with:
//! `load_img(target_size=(224, 224))` (RGB, nearest-neighbour resize) followed by
//! `resnet50.preprocess_input` ("caffe" mode: RGB→BGR, per-channel ImageNet mean
//! subtraction, no scaling).

use image::{imageops::FilterType, ImageFormat};

use crate::domain::DomainError;

/// ImageNet channel means in BGR order.
pub const CAFFE_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

pub const SUPPORTED_FORMATS: [ImageFormat; 2] = [ImageFormat::Png, ImageFormat::Jpeg];

/// A single preprocessed image in NHWC layout with batch size 1 and BGR channels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub height: usize,
    pub width: usize,
    pub data: Vec<f32>,
}

impl ImageTensor {
    pub const CHANNELS: usize = 3;

    pub fn pixel(&self, y: usize, x: usize) -> [f32; 3] {
        let i = (y * self.width + x) * Self::CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Nested `[height][width][channel]` rows, the shape TF Serving expects per instance.
    pub fn to_nested(&self) -> Vec<Vec<[f32; 3]>> {
        (0..self.height)
            .map(|y| (0..self.width).map(|x| self.pixel(y, x)).collect())
            .collect()
    }
}

/// Decodes PNG/JPEG bytes and produces the model input tensor.
///
/// Anything that is not a decodable PNG or JPEG is a [`DomainError::MalformedImage`].
pub fn preprocess(bytes: &[u8], size: u32) -> Result<ImageTensor, DomainError> {
    if bytes.is_empty() {
        return Err(DomainError::malformed_image("image is empty"));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| DomainError::malformed_image("unrecognized image format"))?;
    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(DomainError::malformed_image(format!(
            "unsupported image format {format:?}"
        )));
    }

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| DomainError::malformed_image(format!("failed to decode image: {e}")))?;

    let rgb = decoded
        .resize_exact(size, size, FilterType::Nearest)
        .to_rgb8();

    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    let mut data = Vec::with_capacity(width * height * ImageTensor::CHANNELS);
    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0;
        data.push(b as f32 - CAFFE_MEAN_BGR[0]);
        data.push(g as f32 - CAFFE_MEAN_BGR[1]);
        data.push(r as f32 - CAFFE_MEAN_BGR[2]);
    }

    Ok(ImageTensor {
        height,
        width,
        data,
    })
}
