use std::{fs::File, io::BufReader, path::Path};

use pcd_core::raster::Raster;
use tiff::{
    decoder::{Decoder, DecodingResult},
    tags::Tag,
};

use crate::ParseError;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GDAL_NODATA: u16 = 42113;

/// Reads the first band of a GeoTIFF canopy height model.
pub fn read_chm(path: &Path) -> Result<Raster, ParseError> {
    let tiff_err = |source| ParseError::Tiff {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(tiff_err)?;
    let (width, height) = decoder.dimensions().map_err(tiff_err)?;
    let (width, height) = (width as usize, height as usize);

    let (pixel_size, origin) = georeference(&mut decoder, path);
    let nodata = decoder
        .find_tag(Tag::from_u16_exhaustive(GDAL_NODATA))
        .ok()
        .flatten()
        .and_then(|value| value.into_string().ok())
        .and_then(|text| parse_nodata(&text));

    let raw: Vec<f64> = match decoder.read_image().map_err(tiff_err)? {
        DecodingResult::F64(v) => v,
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        _ => return Err(ParseError::UnsupportedSampleFormat(path.to_path_buf())),
    };

    let total_pixels = width * height;
    let cells = if total_pixels > 0 && raw.len() > total_pixels {
        let n_bands = raw.len() / total_pixels;
        log::debug!("{:?}: {} interleaved bands, using band 0", path, n_bands);
        raw.into_iter().step_by(n_bands).take(total_pixels).collect()
    } else {
        raw
    };

    log::debug!(
        "read CHM {:?}: {}x{} px, pixel size {:?}, nodata {:?}",
        path,
        width,
        height,
        pixel_size,
        nodata
    );

    Ok(Raster::from_vec(width, height, cells)
        .with_nodata(nodata)
        .with_georeference(pixel_size, origin))
}

fn georeference<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
) -> ([f64; 2], [f64; 2]) {
    let mut pixel_size = [1.0, 1.0];
    let mut origin = [0.0, 0.0];

    let scale = decoder
        .find_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE))
        .ok()
        .flatten()
        .and_then(|value| value.into_f64_vec().ok());
    match scale {
        Some(scale) if scale.len() >= 2 => pixel_size = [scale[0], scale[1]],
        _ => log::warn!("{:?}: no ModelPixelScale tag, assuming 1 m pixels", path),
    }

    let tiepoint = decoder
        .find_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT))
        .ok()
        .flatten()
        .and_then(|value| value.into_f64_vec().ok());
    match tiepoint {
        Some(tie) if tie.len() >= 6 => origin = [tie[3], tie[4]],
        _ => log::warn!("{:?}: no ModelTiepoint tag, assuming origin (0, 0)", path),
    }

    (pixel_size, origin)
}

fn parse_nodata(text: &str) -> Option<f64> {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use tiff::encoder::{colortype, TiffEncoder};

    use super::*;

    #[test]
    fn reads_float_chm() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-10-01_chm.tif");
        let data: Vec<f32> = vec![0.0, 0.5, 1.5, 2.0, 3.0, f32::NAN];
        {
            let mut file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(&mut file).unwrap();
            encoder
                .write_image::<colortype::Gray32Float>(3, 2, &data)
                .unwrap();
        }

        let raster = read_chm(&path).unwrap();
        assert_eq!((raster.width, raster.height), (3, 2));
        assert_eq!(raster.cells[3], 2.0);
        assert_eq!(raster.nodata, None);
        assert_eq!(raster.valid_cells().count(), 5);
        assert_eq!(raster.pixel_size, [1.0, 1.0]);
    }

    #[test]
    fn reads_gdal_nodata_and_georeference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site_a_chm.tif");
        let data: Vec<f32> = vec![1.0, -9999.0, 2.0, 3.0];
        {
            let mut file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(&mut file).unwrap();
            let mut image = encoder
                .new_image::<colortype::Gray32Float>(2, 2)
                .unwrap();
            image
                .encoder()
                .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &[0.5f64, 0.5, 0.0][..])
                .unwrap();
            image
                .encoder()
                .write_tag(
                    Tag::Unknown(MODEL_TIEPOINT),
                    &[0.0f64, 0.0, 0.0, 296000.0, 6427000.0, 0.0][..],
                )
                .unwrap();
            image
                .encoder()
                .write_tag(Tag::Unknown(GDAL_NODATA), "-9999")
                .unwrap();
            image.write_data(&data).unwrap();
        }

        let raster = read_chm(&path).unwrap();
        assert_eq!(raster.nodata, Some(-9999.0));
        assert_eq!(raster.pixel_size, [0.5, 0.5]);
        assert_eq!(raster.origin, [296000.0, 6427000.0]);
        assert_eq!(raster.valid_cells().count(), 3);
        assert_eq!(raster.pixel_area(), 0.25);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_chm(&dir.path().join("none.tif")),
            Err(ParseError::Io(_))
        ));
    }

    #[test]
    fn nodata_text_is_parsed() {
        assert_eq!(parse_nodata("-9999\0"), Some(-9999.0));
        assert_eq!(parse_nodata(" 0 "), Some(0.0));
        assert!(parse_nodata("nan").unwrap().is_nan());
        assert_eq!(parse_nodata("none"), None);
    }
}
