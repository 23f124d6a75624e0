//! PNG encoding for RGBA image data.
//!
//! Supports two encoding modes:
//! - **Indexed PNG (color type 3)**: Used when image has ≤256 unique colors.
//!   Banded reflectivity frames almost always qualify.
//! - **RGBA PNG (color type 6)**: Fallback for images with >256 colors.
//!
//! Metadata is written as `tEXt` chunks ahead of the image data.

use std::collections::HashMap;
use std::io::Write;

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Create a PNG image with automatic format selection.
///
/// # Arguments
/// - `pixels`: RGBA pixel data (4 bytes per pixel)
/// - `width`: Image width in pixels
/// - `height`: Image height in pixels
/// - `text`: `(keyword, value)` pairs written as `tEXt` chunks
pub fn create_png_auto(
    pixels: &[u8],
    width: usize,
    height: usize,
    text: &[(&str, &str)],
) -> Result<Vec<u8>, String> {
    check_dimensions(pixels, width, height)?;

    match extract_palette(pixels) {
        Some((palette, indices)) => create_png_indexed(width, height, &palette, &indices, text),
        None => create_png(pixels, width, height, text),
    }
}

fn check_dimensions(pixels: &[u8], width: usize, height: usize) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err(format!("invalid image size {}x{}", width, height));
    }
    if pixels.len() != width * height * 4 {
        return Err(format!(
            "expected {} RGBA bytes for {}x{}, got {}",
            width * height * 4,
            width,
            height,
            pixels.len()
        ));
    }
    Ok(())
}

/// Palette and per-pixel indices, or `None` past 256 colors.
fn extract_palette(pixels: &[u8]) -> Option<(Vec<[u8; 4]>, Vec<u8>)> {
    let mut color_to_index: HashMap<[u8; 4], u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<[u8; 4]> = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for chunk in pixels.chunks_exact(4) {
        let color = [chunk[0], chunk[1], chunk[2], chunk[3]];

        let index = match color_to_index.get(&color) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push(color);
                color_to_index.insert(color, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

fn write_header(png: &mut Vec<u8>, width: usize, height: usize, color_type: u8, text: &[(&str, &str)]) {
    png.extend_from_slice(&PNG_SIGNATURE);

    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(color_type);
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(png, b"IHDR", &ihdr_data);

    for (keyword, value) in text {
        write_text_chunk(png, keyword, value);
    }
}

/// Create an indexed PNG (color type 3) from palette and indices.
pub fn create_png_indexed(
    width: usize,
    height: usize,
    palette: &[[u8; 4]],
    indices: &[u8],
    text: &[(&str, &str)],
) -> Result<Vec<u8>, String> {
    let mut png = Vec::new();
    write_header(&mut png, width, height, 3, text);

    let plte_data: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte_data);

    // tRNS only when some entry is not opaque
    if palette.iter().any(|c| c[3] < 255) {
        let trns_data: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns_data);
    }

    let idat_data = deflate_scanlines(indices, width, height)
        .map_err(|e| format!("IDAT compression failed: {}", e))?;
    write_chunk(&mut png, b"IDAT", &idat_data);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Create a PNG image from RGBA pixel data (color type 6).
pub fn create_png(
    pixels: &[u8],
    width: usize,
    height: usize,
    text: &[(&str, &str)],
) -> Result<Vec<u8>, String> {
    check_dimensions(pixels, width, height)?;

    let mut png = Vec::new();
    write_header(&mut png, width, height, 6, text);

    let idat_data = deflate_scanlines(pixels, width * 4, height)
        .map_err(|e| format!("IDAT compression failed: {}", e))?;
    write_chunk(&mut png, b"IDAT", &idat_data);
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// `tEXt`: Latin-1 keyword (1-79 bytes), NUL, text.
fn write_text_chunk(png: &mut Vec<u8>, keyword: &str, value: &str) {
    let keyword: Vec<u8> = keyword
        .bytes()
        .filter(|b| (32..=126).contains(b))
        .take(79)
        .collect();
    if keyword.is_empty() {
        return;
    }

    let mut data = keyword;
    data.push(0);
    data.extend(value.bytes().filter(|b| *b != 0));
    write_chunk(png, b"tEXt", &data);
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Prefix each `row_bytes` scanline with filter type 0 and deflate.
fn deflate_scanlines(data: &[u8], row_bytes: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let mut uncompressed = Vec::with_capacity(height * (1 + row_bytes));
    for row in data.chunks_exact(row_bytes).take(height) {
        uncompressed.push(0); // filter type: none
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}

/// Read the `tEXt` chunks of an encoded PNG.
pub fn read_text_chunks(png: &[u8]) -> Vec<(String, String)> {
    let mut chunks = Vec::new();
    let mut offset = PNG_SIGNATURE.len();

    while offset + 8 <= png.len() {
        let length =
            u32::from_be_bytes([png[offset], png[offset + 1], png[offset + 2], png[offset + 3]])
                as usize;
        let kind = &png[offset + 4..offset + 8];
        let data_end = offset + 8 + length;
        if data_end + 4 > png.len() {
            break;
        }

        if kind == b"tEXt" {
            let data = &png[offset + 8..data_end];
            if let Some(nul) = data.iter().position(|&b| b == 0) {
                chunks.push((
                    String::from_utf8_lossy(&data[..nul]).into_owned(),
                    String::from_utf8_lossy(&data[nul + 1..]).into_owned(),
                ));
            }
        }

        offset = data_end + 4;
    }

    chunks
}
