//! Conversion between `OpenCV` `Mat` images and the crate's frames and canvases.

use crate::{canvas::Canvas, frame_processor::Frame, Error, Result};
use ndarray::Array3;
use opencv::core::{Mat, MatTraitConst, Scalar, CV_8UC3};
use opencv::prelude::MatTrait;

/// Convert a captured BGR `Mat` into a [`Frame`]
///
/// An empty `Mat` (failed capture) becomes an empty frame.
///
/// # Errors
/// * Returns error if the Mat is not 8-bit with 3 channels
/// * Returns error if Mat data cannot be accessed
pub fn mat_to_frame(mat: &Mat) -> Result<Frame> {
    if mat.empty() {
        return Ok(Frame::empty());
    }
    Frame::from_bgr(mat_to_array(mat)?)
}

/// Copy an 8-bit three channel `Mat` into a `(rows, cols, 3)` array
///
/// # Errors
/// * Returns error if the Mat is not 8-bit with 3 channels
/// * Returns error if Mat data cannot be accessed
pub fn mat_to_array(mat: &Mat) -> Result<Array3<u8>> {
    if mat.typ() != CV_8UC3 {
        return Err(Error::InvalidInput(format!(
            "Expected an 8-bit 3-channel image, got Mat type {}",
            mat.typ()
        )));
    }

    let rows = usize::try_from(mat.rows()).map_err(|e| Error::InvalidInput(e.to_string()))?;
    let cols = usize::try_from(mat.cols()).map_err(|e| Error::InvalidInput(e.to_string()))?;

    // ROI views are not continuous; copy them into their own buffer first
    let owned;
    let source = if mat.is_continuous() {
        mat
    } else {
        owned = mat.try_clone()?;
        &owned
    };

    Array3::from_shape_vec((rows, cols, 3), source.data_bytes()?.to_vec())
        .map_err(|e| Error::InvalidInput(format!("Failed to create array from Mat: {e}")))
}

/// Copy a frame into a new BGR `Mat`
///
/// # Errors
/// * Returns error if Mat creation fails
pub fn frame_to_mat(frame: &Frame) -> Result<Mat> {
    let standard = frame.pixels().as_standard_layout();
    let data = standard
        .as_slice()
        .ok_or_else(|| Error::InvalidInput("Pixel buffer is not contiguous".to_string()))?;
    bytes_to_mat(frame.height(), frame.width(), data)
}

/// Copy a canvas into a new BGR `Mat` for display
///
/// # Errors
/// * Returns error if Mat creation fails
pub fn canvas_to_mat(canvas: &Canvas) -> Result<Mat> {
    bytes_to_mat(canvas.height(), canvas.width(), canvas.image().as_raw())
}

fn bytes_to_mat(rows: usize, cols: usize, data: &[u8]) -> Result<Mat> {
    if data.len() != rows * cols * 3 {
        return Err(Error::InvalidInput(format!(
            "Expected {} bytes for a {cols}x{rows} BGR image, got {}",
            rows * cols * 3,
            data.len()
        )));
    }
    let height = i32::try_from(rows).map_err(|e| Error::InvalidInput(e.to_string()))?;
    let width = i32::try_from(cols).map_err(|e| Error::InvalidInput(e.to_string()))?;

    let mut mat = Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0))?;
    mat.data_bytes_mut()?.copy_from_slice(data);
    Ok(mat)
}
