//! Image preprocessing: letterbox resize and input blob construction.

use anyhow::{bail, Result};
use fast_image_resize::{
    images::{CroppedImageMut, Image as FirImage},
    pixels::PixelType,
    FilterType, ResizeAlg, ResizeOptions, Resizer,
};
use image::RgbImage;
use ndarray::{array, Array2, Array4};

/// Constant fill value for letterbox borders, per channel.
pub const PAD_VALUE: u8 = 114;

pub fn to_fir_image<'a>(mut image: RgbImage) -> FirImage<'a> {
    let (width, height) = image.dimensions();
    let buffer = std::mem::take(&mut image).into_raw();

    FirImage::from_vec_u8(width, height, buffer, PixelType::U8x3)
        .expect("Failed to convert to FirImage")
}

/// Aspect-ratio-preserving resize with constant-colour padding.
///
/// Returns the padded `(target_w, target_h)` image together with the 3x3
/// matrix mapping a point in padded/resized space back to source space:
/// 1/scale on the diagonal and `-half_pad/scale` as the translation terms.
///
/// The caller must guard against empty inputs; a zero-size image is
/// rejected here with an error rather than undefined behaviour.
pub fn letterbox(
    img: &FirImage,
    target_w: u32,
    target_h: u32,
) -> Result<(FirImage<'static>, Array2<f32>)> {
    let (w0, h0) = (img.width(), img.height());
    if w0 == 0 || h0 == 0 {
        bail!("letterbox called with an empty image");
    }

    let scale = (target_w as f32 / w0 as f32).min(target_h as f32 / h0 as f32);
    let new_w = (w0 as f32 * scale).round() as u32;
    let new_h = (h0 as f32 * scale).round() as u32;

    // Split padding into two sides; the -0.1 bias deterministically assigns
    // the smaller half to the top/left edge when the total is odd.
    let half_w = (target_w - new_w) as f32 / 2.;
    let half_h = (target_h - new_h) as f32 / 2.;
    let left = (half_w - 0.1).round() as u32;
    let top = (half_h - 0.1).round() as u32;

    let mut padded = FirImage::from_vec_u8(
        target_w,
        target_h,
        vec![PAD_VALUE; (target_w * target_h * 3) as usize],
        PixelType::U8x3,
    )?;

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    let mut cropped = CroppedImageMut::new(&mut padded, left, top, new_w, new_h)?;
    resizer.resize(img, &mut cropped, &options)?;

    let transform = array![
        [1. / scale, 0., -half_w / scale],
        [0., 1. / scale, -half_h / scale],
        [0., 0., 1.],
    ];

    Ok((padded, transform))
}

/// Converts a padded RGB image into the model input tensor: f32 NCHW,
/// normalized to [0,1], shape `(1, 3, h, w)`. Channels stay in RGB order,
/// which is what the model expects.
pub fn blob_from_image(img: &FirImage) -> Result<Array4<f32>> {
    let buf = img.buffer();
    let w = img.width() as usize;
    let h = img.height() as usize;

    if buf.len() != w * h * 3 {
        bail!("Unexpected buffer size: got {}, expected {}", buf.len(), w * h * 3);
    }

    let hw = w * h;
    let mut out = vec![0.0f32; buf.len()];
    for i in 0..hw {
        let r = buf[3 * i];
        let g = buf[3 * i + 1];
        let b = buf[3 * i + 2];

        out[i] = r as f32 / 255.0;
        out[i + hw] = g as f32 / 255.0;
        out[i + 2 * hw] = b as f32 / 255.0;
    }

    Ok(Array4::from_shape_vec((1, 3, h, w), out)?)
}
